//! Rename across backends: stream copy, then delete the source.
//!
//! Not atomic. A failure while copying leaves the partial destination and an
//! untouched source; a failed delete afterwards leaves two full copies.

use std::io::{self, Read, Write};

use lofs_types::{LofsError, LofsResult, MoveOutcome, OpenMode};

use crate::router::Route;

/// Move `src` to `dst`, which live on different backends.
///
/// Every handle opened here is closed before returning, on every path.
pub(crate) fn move_across(
    src: &Route<'_, '_>,
    dst: &Route<'_, '_>,
    chunk_size: usize,
) -> LofsResult<MoveOutcome> {
    let mut reader = src
        .fs
        .open(src.path, OpenMode::Read)
        .map_err(|e| src.fail("open", e))?;
    let mut writer = dst
        .fs
        .open(dst.path, OpenMode::Write)
        .map_err(|e| dst.fail("open", e))?;

    let copied = match copy_chunked(&mut *reader, &mut *writer, chunk_size) {
        Ok(copied) => copied,
        Err((copied, source)) => {
            tracing::warn!(
                from = %src.tag,
                to = %dst.tag,
                copied,
                error = %source,
                "cross-backend copy interrupted, partial destination left in place"
            );
            return Err(LofsError::PartialMove { copied, source });
        }
    };

    // The source must be closed before it can be deleted.
    drop(writer);
    drop(reader);

    match src.fs.remove(src.path) {
        Ok(()) => {
            tracing::debug!(from = %src.tag, to = %dst.tag, copied, "cross-backend move complete");
            Ok(MoveOutcome::Moved)
        }
        Err(e) => {
            tracing::warn!(
                from = %src.tag,
                path = %src.path.display(),
                error = %e,
                "source kept after cross-backend copy"
            );
            Ok(MoveOutcome::Copied)
        }
    }
}

/// Copy in `chunk_size` steps. On failure, reports how many bytes made it.
fn copy_chunked<R, W>(reader: &mut R, writer: &mut W, chunk_size: usize) -> Result<u64, (u64, io::Error)>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut copied = 0u64;
    loop {
        let n = reader.read(&mut buf).map_err(|e| (copied, e))?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n]).map_err(|e| (copied, e))?;
        copied += n as u64;
    }
    writer.flush().map_err(|e| (copied, e))?;
    Ok(copied)
}
