//! Contract tests shared by every credential store implementation.
//!
//! Each store must serialize concurrent mutations and treat deleting an
//! absent key as a no-op.

use std::sync::Arc;
use tempfile::TempDir;
use tunebridge_credentials::{keys, CredentialStore, FileCredentialStore, MemoryCredentialStore};

async fn assert_lifecycle(store: &dyn CredentialStore) {
    assert!(!store.exists(keys::REFRESH_TOKEN).await);
    store.store("refresh-1", keys::REFRESH_TOKEN).await.unwrap();
    assert_eq!(store.retrieve(keys::REFRESH_TOKEN).await.as_deref(), Some("refresh-1"));
    assert!(store.delete(keys::REFRESH_TOKEN).await.unwrap());
    assert!(!store.delete(keys::REFRESH_TOKEN).await.unwrap());
}

async fn assert_concurrent_writes(store: Arc<dyn CredentialStore>) {
    let mut handles = Vec::new();
    for i in 0..16 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.store(&format!("value-{i}"), &format!("key-{i}")).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    for i in 0..16 {
        assert_eq!(
            store.retrieve(&format!("key-{i}")).await,
            Some(format!("value-{i}"))
        );
    }
}

#[tokio::test]
async fn test_memory_store_contract() {
    let store = MemoryCredentialStore::new();
    assert_lifecycle(&store).await;
    assert_concurrent_writes(Arc::new(MemoryCredentialStore::new())).await;
}

#[tokio::test]
async fn test_file_store_contract() {
    let dir = TempDir::new().unwrap();

    let store = FileCredentialStore::new(dir.path().join("a.json"));
    assert_lifecycle(&store).await;

    let path = dir.path().join("b.json");
    assert_concurrent_writes(Arc::new(FileCredentialStore::new(path.clone()))).await;

    // Every concurrent write must have reached the file.
    let reopened = FileCredentialStore::new(path);
    for i in 0..16 {
        assert!(reopened.exists(&format!("key-{i}")).await);
    }
}
