//! End-to-end router tests over real backends.
//!
//! Internal flash is a `MemoryFs`; the card is a `LocalFs` over a temp
//! directory with a software card-detect line.

#![cfg(feature = "removable")]

use std::io::{Read, Write};
use std::sync::Arc;

use lofs::{
    BackendTag, CardDetect, FILE_O_READ, FILE_O_WRITE, LocalFs, LofsError, MemoryFs,
    MoveOutcome, MountPointProbe, PathRouter, RouterConfig,
};
use rstest::{fixture, rstest};
use tempfile::TempDir;

struct Rig {
    router: PathRouter,
    card: Arc<CardDetect>,
    // Held for its Drop.
    _dir: TempDir,
}

#[fixture]
fn rig() -> Rig {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let dir = tempfile::tempdir().unwrap();
    let card = Arc::new(CardDetect::new(true));
    let router = PathRouter::new(MemoryFs::new())
        .with_removable(LocalFs::new(dir.path()), Arc::clone(&card));
    Rig {
        router,
        card,
        _dir: dir,
    }
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn write_file(router: &PathRouter, path: &str, data: &[u8]) {
    let mut f = router.open(path, FILE_O_WRITE).unwrap();
    f.write_all(data).unwrap();
    f.close().unwrap();
}

fn read_file(router: &PathRouter, path: &str) -> Vec<u8> {
    let mut f = router.open(path, FILE_O_READ).unwrap();
    let mut out = Vec::new();
    f.read_to_end(&mut out).unwrap();
    out
}

// =============================================================================
// ROUND TRIPS
// =============================================================================

#[rstest]
fn round_trip_sizes(
    rig: Rig,
    #[values("/lfs", "/sd")] prefix: &str,
    #[values(0, 1, 10, 100, 512, 1024, 2048)] size: usize,
) {
    let path = format!("{prefix}/size_{size}.bin");
    let data = pattern(size);
    write_file(&rig.router, &path, &data);

    let f = rig.router.open(&path, FILE_O_READ).unwrap();
    assert_eq!(f.size().unwrap(), size as u64);
    drop(f);
    assert_eq!(read_file(&rig.router, &path), data);
}

#[rstest]
fn write_truncates_previous_contents(rig: Rig, #[values("/lfs", "/sd")] prefix: &str) {
    let path = format!("{prefix}/again.txt");
    write_file(&rig.router, &path, b"a much longer first version");
    write_file(&rig.router, &path, b"short");
    assert_eq!(read_file(&rig.router, &path), b"short");
}

#[rstest]
fn file_reports_backend(rig: Rig) {
    write_file(&rig.router, "/sd/where.txt", b"card");
    let f = rig.router.open("/sd/where.txt", "r").unwrap();
    assert_eq!(f.backend(), BackendTag::Removable);
    assert_eq!(f.path(), "/sd/where.txt");
}

// =============================================================================
// DIRECTORIES
// =============================================================================

#[rstest]
fn mkdir_list_rmdir(rig: Rig, #[values("/lfs", "/sd")] prefix: &str) {
    let dir = format!("{prefix}/test_dir");
    rig.router.mkdir(&dir).unwrap();
    assert!(rig.router.exists(&dir));
    assert!(rig.router.stat(&dir).unwrap().is_dir());

    write_file(&rig.router, &format!("{dir}/a.txt"), b"1");
    let names: Vec<_> = rig
        .router
        .list(&dir)
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, ["a.txt"]);

    // Not empty yet.
    assert!(rig.router.rmdir(&dir).is_err());
    rig.router.remove(&format!("{dir}/a.txt")).unwrap();
    rig.router.rmdir(&dir).unwrap();
    assert!(!rig.router.exists(&dir));
}

#[rstest]
fn remove_refuses_directories(rig: Rig, #[values("/lfs", "/sd")] prefix: &str) {
    let dir = format!("{prefix}/keep");
    rig.router.mkdir(&dir).unwrap();
    assert!(rig.router.remove(&dir).is_err());
    assert!(rig.router.exists(&dir));
}

#[rstest]
fn remove_missing_fails_every_time(rig: Rig, #[values("/lfs", "/sd")] prefix: &str) {
    let path = format!("{prefix}/nonexistent_file_12345.txt");
    for _ in 0..3 {
        let err = rig.router.remove(&path).unwrap_err();
        assert!(err.is_not_found(), "unexpected error: {err}");
    }
}

// =============================================================================
// RENAME
// =============================================================================

#[rstest]
fn rename_within_backend(rig: Rig, #[values("/lfs", "/sd")] prefix: &str) {
    let from = format!("{prefix}/old_name.txt");
    let to = format!("{prefix}/new_name.txt");
    write_file(&rig.router, &from, b"Test content for rename\n");

    assert_eq!(rig.router.rename(&from, &to).unwrap(), MoveOutcome::Renamed);
    assert!(!rig.router.exists(&from));
    assert_eq!(read_file(&rig.router, &to), b"Test content for rename\n");
}

#[rstest]
#[case::flash_to_card("/lfs/cross.bin", "/sd/cross.bin")]
#[case::card_to_flash("/sd/cross.bin", "/lfs/cross.bin")]
fn rename_across_backends(rig: Rig, #[case] from: &str, #[case] to: &str) {
    // Several chunks plus a tail.
    let data = pattern(1300);
    write_file(&rig.router, from, &data);

    let outcome = rig.router.rename(from, to).unwrap();
    assert_eq!(outcome, MoveOutcome::Moved);
    assert!(outcome.source_removed());
    assert!(!rig.router.exists(from));
    assert_eq!(read_file(&rig.router, to), data);
}

#[rstest]
fn rename_missing_source_creates_nothing(rig: Rig) {
    assert!(rig.router.rename("/lfs/ghost.txt", "/sd/ghost.txt").is_err());
    assert!(!rig.router.exists("/sd/ghost.txt"));
}

// =============================================================================
// PREFIX POLICY
// =============================================================================

#[rstest]
#[case::internal("/lfs/a.txt", BackendTag::Internal)]
#[case::internal_root("/lfs", BackendTag::Internal)]
#[case::removable("/sd/a.txt", BackendTag::Removable)]
#[case::removable_root("/sd", BackendTag::Removable)]
#[case::removable_lookalike("/sdcardfoo", BackendTag::Invalid)]
#[case::internal_lookalike("/lfsx/a", BackendTag::Invalid)]
#[case::wrong_case("/SD/a", BackendTag::Invalid)]
#[case::unprefixed("/config.txt", BackendTag::Invalid)]
#[case::relative("lfs/a.txt", BackendTag::Invalid)]
#[case::empty("", BackendTag::Invalid)]
fn strict_prefix_table(#[case] path: &str, #[case] expected: BackendTag) {
    let router = PathRouter::new(MemoryFs::new());
    assert_eq!(router.backend_of(path), expected);
}

#[rstest]
#[case::internal("/lfs/a.txt", BackendTag::Internal)]
#[case::removable("/sd/a.txt", BackendTag::Removable)]
#[case::unprefixed("/config.txt", BackendTag::Internal)]
#[case::removable_lookalike("/sdcardfoo", BackendTag::Internal)]
#[case::relative("config.txt", BackendTag::Invalid)]
#[case::empty("", BackendTag::Invalid)]
fn legacy_prefix_table(#[case] path: &str, #[case] expected: BackendTag) {
    let router = PathRouter::new(MemoryFs::new()).with_config(RouterConfig::legacy());
    assert_eq!(router.backend_of(path), expected);
}

#[rstest]
fn legacy_paths_share_internal_namespace() {
    let router = PathRouter::new(MemoryFs::new()).with_config(RouterConfig::legacy());
    write_file(&router, "/settings.json", b"{}");
    assert_eq!(read_file(&router, "/lfs/settings.json"), b"{}");
}

#[rstest]
fn overlong_path_is_rejected_not_truncated() {
    let router =
        PathRouter::new(MemoryFs::new()).with_config(RouterConfig::default().with_max_path_len(16));
    assert!(router.mkdir("/lfs/0123456789abcde").is_ok());
    assert!(matches!(
        router.mkdir("/lfs/0123456789abcdef"),
        Err(LofsError::InvalidPath(_))
    ));
    assert!(router.exists("/lfs/0123456789abcde"));
}

// =============================================================================
// AVAILABILITY
// =============================================================================

#[rstest]
fn ejected_card_fails_closed(rig: Rig) {
    write_file(&rig.router, "/sd/log.txt", b"entry");
    write_file(&rig.router, "/lfs/local.txt", b"flash");
    rig.card.eject();

    assert!(!rig.router.is_removable_available());
    assert!(!rig.router.exists("/sd/log.txt"));
    assert!(matches!(
        rig.router.open("/sd/log.txt", FILE_O_READ),
        Err(LofsError::BackendUnavailable(BackendTag::Removable))
    ));
    assert!(rig.router.rename("/lfs/local.txt", "/sd/local.txt").is_err());
    assert_eq!(rig.router.total_bytes("/sd"), 0);
    assert_eq!(rig.router.free_bytes("/sd"), 0);

    // Flash is unaffected and the failed move left its source alone.
    assert_eq!(read_file(&rig.router, "/lfs/local.txt"), b"flash");

    rig.card.insert();
    assert_eq!(read_file(&rig.router, "/sd/log.txt"), b"entry");
}

#[rstest]
fn no_card_configured() {
    let router = PathRouter::new(MemoryFs::new());
    assert!(!router.is_removable_available());
    assert!(!router.exists("/sd"));
    assert!(router.mkdir("/sd/dir").is_err());
}

#[rstest]
fn mount_point_probe_tracks_directory() {
    let dir = tempfile::tempdir().unwrap();
    let mount = dir.path().join("card");
    let router = PathRouter::new(MemoryFs::new())
        .with_removable(LocalFs::new(&mount), MountPointProbe::new(&mount));

    assert!(!router.is_removable_available());
    std::fs::create_dir(&mount).unwrap();
    assert!(router.is_removable_available());
    write_file(&router, "/sd/boot.log", b"ok");
    assert!(mount.join("boot.log").is_file());
}

#[rstest]
fn card_paths_stay_inside_card_root() {
    let dir = tempfile::tempdir().unwrap();
    let mount = dir.path().join("card");
    std::fs::create_dir(&mount).unwrap();
    let router = PathRouter::new(MemoryFs::new())
        .with_removable(LocalFs::new(&mount), CardDetect::new(true));

    assert!(router.open("/sd/nope/../../escaped.txt", FILE_O_WRITE).is_err());
    assert!(router.mkdir("/sd/ghost/../../outside_dir").is_err());
    assert!(!dir.path().join("escaped.txt").exists());
    assert!(!dir.path().join("outside_dir").exists());

    write_file(&router, "/sd/tmp/../inside.txt", b"ok");
    assert!(mount.join("inside.txt").is_file());
}

// =============================================================================
// SPACE
// =============================================================================

#[rstest]
fn space_invariant(rig: Rig, #[values("/lfs", "/sd")] prefix: &str) {
    write_file(&rig.router, &format!("{prefix}/fill.bin"), &pattern(2048));

    let space = rig.router.space(prefix).unwrap();
    assert!(space.total > 0);
    assert!(space.used <= space.total);
    assert_eq!(space.free, space.total - space.used);
}

#[rstest]
fn internal_space_tracks_writes(rig: Rig) {
    let before = rig.router.used_bytes("/lfs");
    write_file(&rig.router, "/lfs/grow.bin", &pattern(1000));
    assert_eq!(rig.router.used_bytes("/lfs"), before + 1000);
    assert_eq!(
        rig.router.free_bytes("/lfs"),
        rig.router.total_bytes("/lfs") - rig.router.used_bytes("/lfs")
    );
}

#[rstest]
fn invalid_path_space_is_zero(rig: Rig) {
    assert_eq!(rig.router.total_bytes("/invalid"), 0);
    assert_eq!(rig.router.used_bytes("nope"), 0);
    assert_eq!(rig.router.free_bytes(""), 0);
}
