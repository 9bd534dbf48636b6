use super::*;
use tempfile::tempdir;

#[test]
fn save_then_load_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.zst");
    let snapshot = Snapshot::new(3, MaterializedState::default(), Utc::now());
    snapshot.save(&path).unwrap();

    let loaded = Snapshot::load(&path).unwrap().unwrap();
    assert_eq!(loaded.seq, 3);
    assert_eq!(loaded.version, CURRENT_SNAPSHOT_VERSION);
}

#[test]
fn load_missing_path_returns_none() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.zst");
    assert!(Snapshot::load(&path).unwrap().is_none());
}

#[test]
fn save_rotates_backup_on_overwrite() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.zst");
    Snapshot::new(1, MaterializedState::default(), Utc::now()).save(&path).unwrap();
    Snapshot::new(2, MaterializedState::default(), Utc::now()).save(&path).unwrap();

    assert!(path.with_extension("bak").exists());
    let loaded = Snapshot::load(&path).unwrap().unwrap();
    assert_eq!(loaded.seq, 2);
}
