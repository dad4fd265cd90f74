//! End-to-end lifecycle tests against both node store backends.

use cloudvault::storage::BlobStore;
use cloudvault::{
    Database, DeleteOutcome, FileBlobStore, MemoryBlobStore, MemoryNodeStore, NodeRepository,
    NodeService, NodeStore, UploadRequest, VaultError, ViewQuery,
};
use tempfile::TempDir;

const TWO_MB: usize = 2 * 1024 * 1024;

/// Folder cycle, then the two-stage delete of a file inside it.
async fn run_docs_scenario<S: NodeStore>(service: NodeService<S, MemoryBlobStore>) {
    let docs = service.create_folder("Docs", None).await.unwrap();
    let reports = service.create_folder("Reports", Some(docs.id)).await.unwrap();

    let result = service.move_node(docs.id, Some(reports.id)).await;
    assert!(matches!(result, Err(VaultError::CycleDetected)));

    let file = service
        .upload(UploadRequest::new("a.png", "image/png", vec![7u8; TWO_MB]).with_parent(Some(docs.id)))
        .await
        .unwrap();
    assert_eq!(file.size_bytes, TWO_MB as u64);

    let outcome = service.trash(file.id).await.unwrap();
    assert!(matches!(outcome, DeleteOutcome::Trashed(_)));

    let trash = service.view(&ViewQuery::trash()).await.unwrap();
    assert!(trash.iter().any(|n| n.id == file.id));
    let in_docs = service.view(&ViewQuery::folder(Some(docs.id))).await.unwrap();
    assert!(in_docs.iter().all(|n| n.id != file.id));
    assert!(in_docs.iter().any(|n| n.id == reports.id));

    let outcome = service.trash(file.id).await.unwrap();
    assert!(matches!(outcome, DeleteOutcome::Removed(_)));
    assert!(matches!(service.get(file.id).await, Err(VaultError::NotFound(_))));
    assert_eq!(
        service.blobs().delete_log(),
        vec![file.content_ref.clone().unwrap()]
    );
    assert!(service.blobs().is_empty());
}

#[tokio::test]
async fn test_docs_scenario_in_memory() {
    let service = NodeService::new(MemoryNodeStore::new(), MemoryBlobStore::new());
    run_docs_scenario(service).await;
}

#[tokio::test]
async fn test_docs_scenario_sqlite() {
    let db = Database::open_in_memory().await.unwrap();
    let service = NodeService::new(NodeRepository::new(db.pool().clone()), MemoryBlobStore::new());
    run_docs_scenario(service).await;
}

/// Trashing a folder leaves its children active.
async fn run_trash_not_inherited<S: NodeStore>(service: NodeService<S, MemoryBlobStore>) {
    let folder = service.create_folder("Photos", None).await.unwrap();
    let child = service
        .upload(UploadRequest::new("cat.jpg", "image/jpeg", vec![1; 16]).with_parent(Some(folder.id)))
        .await
        .unwrap();

    service.trash(folder.id).await.unwrap();

    assert!(!service.get(child.id).await.unwrap().is_trash);
    let children = service.view(&ViewQuery::folder(Some(folder.id))).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, child.id);

    let root = service.view(&ViewQuery::folder(None)).await.unwrap();
    assert!(root.is_empty());

    // Permanent delete still takes the active child with it.
    service.trash(folder.id).await.unwrap();
    assert!(service.list_all().await.unwrap().is_empty());
    assert_eq!(service.blobs().delete_log().len(), 1);
}

#[tokio::test]
async fn test_trash_not_inherited_in_memory() {
    let service = NodeService::new(MemoryNodeStore::new(), MemoryBlobStore::new());
    run_trash_not_inherited(service).await;
}

#[tokio::test]
async fn test_trash_not_inherited_sqlite() {
    let db = Database::open_in_memory().await.unwrap();
    let service = NodeService::new(NodeRepository::new(db.pool().clone()), MemoryBlobStore::new());
    run_trash_not_inherited(service).await;
}

#[tokio::test]
async fn test_share_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("vault.db");
    let blob_path = temp_dir.path().join("blobs");

    let (file_id, token) = {
        let db = Database::open(&db_path).await.unwrap();
        let service = NodeService::new(
            NodeRepository::new(db.pool().clone()),
            FileBlobStore::new(&blob_path).unwrap(),
        );
        let file = service
            .upload(UploadRequest::new("report.pdf", "application/pdf", b"%PDF-1.7".to_vec()))
            .await
            .unwrap();
        let token = service.share(file.id).await.unwrap();
        db.pool().close().await;
        (file.id, token)
    };

    let db = Database::open(&db_path).await.unwrap();
    let service = NodeService::new(
        NodeRepository::new(db.pool().clone()),
        FileBlobStore::new(&blob_path).unwrap(),
    );

    assert_eq!(service.share(file_id).await.unwrap(), token);
    let shared = service.resolve_share(&token).await.unwrap();
    assert_eq!(shared.name, "report.pdf");
    assert_eq!(shared.mime_type, "application/pdf");
    assert_eq!(service.blobs().get(&shared.content_ref).await.unwrap(), b"%PDF-1.7");
}

#[tokio::test]
async fn test_offline_snapshot_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let snapshot = temp_dir.path().join("nodes.json");

    let folder_id = {
        let store = MemoryNodeStore::open(&snapshot).await.unwrap();
        let service = NodeService::new(store, MemoryBlobStore::new());
        let folder = service.create_folder("Music", None).await.unwrap();
        service.toggle_favorite(folder.id).await.unwrap();
        service
            .update_tags(folder.id, vec!["audio".to_string()])
            .await
            .unwrap();
        folder.id
    };

    let store = MemoryNodeStore::open(&snapshot).await.unwrap();
    let service = NodeService::new(store, MemoryBlobStore::new());
    let folder = service.get(folder_id).await.unwrap();
    assert_eq!(folder.name, "Music");
    assert!(folder.is_favorite);
    assert_eq!(folder.tags, vec!["audio"]);

    let favorites = service.view(&ViewQuery::favorites()).await.unwrap();
    assert_eq!(favorites.len(), 1);
}

#[tokio::test]
async fn test_file_blob_store_released_on_purge() {
    let temp_dir = TempDir::new().unwrap();
    let blobs = FileBlobStore::new(temp_dir.path()).unwrap();
    let service = NodeService::new(MemoryNodeStore::new(), blobs);

    let folder = service.create_folder("tmp", None).await.unwrap();
    let file = service
        .upload(UploadRequest::new("x.txt", "text/plain", b"x".to_vec()).with_parent(Some(folder.id)))
        .await
        .unwrap();
    let content_ref = file.content_ref.unwrap();
    let path = service.blobs().object_path(&content_ref).unwrap();
    assert!(path.exists());

    service.trash(folder.id).await.unwrap();
    let report = service.permanent_delete(folder.id).await.unwrap();
    assert_eq!(report.blobs_released, 1);
    assert!(!path.exists());
}
