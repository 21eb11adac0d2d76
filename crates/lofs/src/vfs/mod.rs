//! Storage backends behind the router.
//!
//! - **MemoryFs**: In-memory storage with a fixed capacity (flash stand-in)
//! - **LocalFs**: A directory on the host filesystem (e.g. a mounted card)
//!
//! Backends only ever see backend-relative paths. The router strips the
//! `/lfs` or `/sd` marker before a call reaches them.

mod local;
mod memory;
mod traits;

pub use local::LocalFs;
pub use memory::{MemoryFs, DEFAULT_CAPACITY};
pub use traits::{FileHandle, Filesystem};
