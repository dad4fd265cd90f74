//! Concurrency tests for cloudvault.
//!
//! These tests verify that concurrent mutations are validated against the
//! store state at commit time, so racing operations cannot break the tree
//! invariants or overrun the quota.

use std::collections::HashSet;
use std::sync::Arc;

use cloudvault::{
    Database, MemoryBlobStore, NodeId, NodeRepository, NodeService, NodeStore, UploadRequest,
    VaultError,
};

type SqliteService = NodeService<NodeRepository, MemoryBlobStore>;

/// Setup a service over an in-memory SQLite database.
async fn setup_service() -> Arc<SqliteService> {
    let db = Database::open_in_memory().await.unwrap();
    Arc::new(NodeService::new(
        NodeRepository::new(db.pool().clone()),
        MemoryBlobStore::new(),
    ))
}

/// Walk up from `id` and return the number of hops to the root.
///
/// Panics if the chain is longer than the number of nodes.
async fn depth_of<S: NodeStore>(store: &S, id: NodeId, limit: usize) -> usize {
    let mut hops = 0;
    let mut current = store.get(id).await.unwrap().and_then(|n| n.parent_id);
    while let Some(parent) = current {
        hops += 1;
        assert!(hops <= limit, "parent chain above {id} does not terminate");
        current = store.get(parent).await.unwrap().and_then(|n| n.parent_id);
    }
    hops
}

/// Two folders moved into each other at the same time.
///
/// At most one of each pair of moves may succeed.
#[tokio::test]
async fn test_concurrent_cross_moves_never_cycle() {
    let service = setup_service().await;

    const ROUNDS: usize = 20;

    for round in 0..ROUNDS {
        let a = service.create_folder(&format!("a{round}"), None).await.unwrap();
        let b = service.create_folder(&format!("b{round}"), None).await.unwrap();

        let first = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.move_node(a.id, Some(b.id)).await })
        };
        let second = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.move_node(b.id, Some(a.id)).await })
        };

        let results = [first.await.unwrap(), second.await.unwrap()];
        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(succeeded, 1, "round {round}: exactly one move should win");
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(VaultError::CycleDetected))));

        depth_of(service.store(), a.id, 2).await;
        depth_of(service.store(), b.id, 2).await;
    }
}

/// A chain of folders where every folder is concurrently moved under a
/// random other folder.
#[tokio::test]
async fn test_concurrent_moves_keep_tree_acyclic() {
    let service = setup_service().await;

    const NUM_FOLDERS: usize = 12;

    let mut ids = Vec::new();
    for i in 0..NUM_FOLDERS {
        ids.push(service.create_folder(&format!("f{i}"), None).await.unwrap().id);
    }

    let mut handles = Vec::new();
    for (i, &id) in ids.iter().enumerate() {
        for offset in 1..4 {
            let target = ids[(i + offset * 5) % NUM_FOLDERS];
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                service.move_node(id, Some(target)).await
            }));
        }
    }

    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) | Err(VaultError::CycleDetected) | Err(VaultError::SelfMove) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    for &id in &ids {
        depth_of(service.store(), id, NUM_FOLDERS).await;
    }
}

/// Concurrent uploads cannot jointly exceed the quota.
#[tokio::test]
async fn test_concurrent_uploads_respect_quota() {
    let db = Database::open_in_memory().await.unwrap();
    let service = Arc::new(
        NodeService::new(NodeRepository::new(db.pool().clone()), MemoryBlobStore::new())
            .with_quota(100),
    );

    const NUM_UPLOADS: usize = 20;

    let mut handles = Vec::new();
    for i in 0..NUM_UPLOADS {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            let request = UploadRequest::new(format!("file{i}.bin"), "application/octet-stream", vec![0u8; 10]);
            service.upload(request).await
        }));
    }

    let mut accepted = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(VaultError::QuotaExceeded { .. }) => rejected += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(accepted, 10);
    assert_eq!(rejected, 10);
    assert_eq!(service.used_bytes().await.unwrap(), 100);
    assert_eq!(service.blobs().len(), 10);
}

/// Concurrent share requests for one node agree on a single token.
#[tokio::test]
async fn test_concurrent_share_is_idempotent() {
    let service = setup_service().await;
    let file = service
        .upload(UploadRequest::new("a.png", "image/png", vec![1, 2, 3]))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move { service.share(file.id).await }));
    }

    let mut tokens = HashSet::new();
    for handle in handles {
        tokens.insert(handle.await.unwrap().unwrap());
    }
    assert_eq!(tokens.len(), 1);
}
