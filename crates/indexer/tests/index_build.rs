use assetpack_indexer::{AssetIndex, FileScanner, IndexerError};
use assetpack_reference::Guid;
use std::path::Path;
use tempfile::TempDir;

fn guid(n: u8) -> String {
    format!("{:032x}", u128::from(n) * 0x1111)
}

async fn write_asset(root: &Path, rel: &str, meta: Option<&str>) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.expect("mkdir");
    }
    tokio::fs::write(&path, b"data").await.expect("write asset");
    if let Some(meta) = meta {
        tokio::fs::write(root.join(format!("{rel}.meta")), meta)
            .await
            .expect("write meta");
    }
}

#[tokio::test]
async fn builds_index_from_scanned_sidecars() {
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();
    for n in 0..40u8 {
        write_asset(
            root,
            &format!("Assets/Textures/t{n}.png"),
            Some(&format!("fileFormatVersion: 2\nguid: {}\n", guid(n))),
        )
        .await;
    }
    write_asset(root, "Assets/plain.asset", Some("fileFormatVersion: 2\n")).await;

    let sidecars = FileScanner::new(root)
        .include(["**/*.meta"])
        .scan()
        .expect("scan");
    assert_eq!(sidecars.len(), 41);

    let (index, stats) = AssetIndex::build(sidecars).await;
    assert_eq!(stats.files, 41);
    assert_eq!(stats.guids, 40);
    assert_eq!(stats.without_guid, 1);
    assert!(stats.errors.is_empty());
    assert_eq!(index.len(), 41);

    let found = index.find_path(&Guid::new(guid(7))).expect("indexed");
    assert_eq!(found, root.join("Assets/Textures/t7.png"));
}

#[tokio::test]
async fn unreadable_files_are_skipped_during_bulk_build() {
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();
    write_asset(root, "a.mat", Some(&format!("guid: {}\n", guid(1)))).await;

    let mut index = AssetIndex::new();
    let stats = index
        .add_files([root.join("a.mat.meta"), root.join("ghost.mat.meta")])
        .await;
    assert_eq!(stats.files, 1);
    assert_eq!(stats.errors.len(), 1);
    assert_eq!(index.len(), 1);
}

#[tokio::test]
async fn explicit_add_reports_missing_sidecar() {
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();
    write_asset(root, "tree.prefab", None).await;

    let mut index = AssetIndex::new();
    let err = index
        .add_file(&root.join("tree.prefab"))
        .await
        .expect_err("no sidecar");
    assert!(matches!(err, IndexerError::MissingSidecar(_)));
    assert!(index.is_empty());
}

#[tokio::test]
async fn duplicate_guid_keeps_last_and_counts() {
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path();
    let meta = format!("guid: {}\n", guid(3));
    write_asset(root, "a.png", Some(&meta)).await;
    write_asset(root, "b.png", Some(&meta)).await;

    let mut index = AssetIndex::new();
    let stats = index
        .add_files([root.join("a.png.meta"), root.join("b.png.meta")])
        .await;
    assert_eq!(stats.duplicate_guids, 1);
    assert_eq!(
        index.find_path(&Guid::new(guid(3))),
        Some(root.join("b.png").as_path())
    );
}
