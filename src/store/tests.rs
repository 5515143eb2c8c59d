use super::*;
use tempfile::TempDir;

fn sample_manifest() -> IndexManifest {
    IndexManifest {
        embedding_model: "nomic-embed-text:latest".to_string(),
        dimension: 768,
        entry_count: 42,
        created_at: "2025-01-01T00:00:00Z".to_string(),
    }
}

#[test]
fn missing_directory_is_fresh() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let missing = dir.path().join("no-index-here");

    assert_eq!(IndexState::detect(&missing), IndexState::Fresh);
}

#[test]
fn empty_directory_is_fresh() {
    let dir = TempDir::new().expect("Failed to create temp dir");

    assert_eq!(IndexState::detect(dir.path()), IndexState::Fresh);
}

#[test]
fn directory_with_manifest_is_existing() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    sample_manifest().write(dir.path()).expect("write manifest");

    assert_eq!(IndexState::detect(dir.path()), IndexState::Existing);
}

#[test]
fn stale_data_without_manifest_is_fresh() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("leftover.lance"), b"partial").expect("write");

    assert_eq!(IndexState::detect(dir.path()), IndexState::Fresh);
}

#[test]
fn manifest_round_trip() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let manifest = sample_manifest();

    manifest.write(dir.path()).expect("write manifest");
    let read_back = IndexManifest::read(dir.path()).expect("read manifest");

    assert_eq!(read_back, manifest);
}

#[test]
fn unreadable_manifest_is_an_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(dir.path().join(MANIFEST_FILE), "embedding_model = [broken").expect("write");

    assert!(IndexManifest::read(dir.path()).is_err());
}
