//! Dashboard client talking to the API through the gateway.

use std::sync::Arc;

use serde_json::Value;

use folio_gateway::auth::{
    AuthenticatedClient, FileStorage, RefreshCoordinator, Storage, REFRESH_TOKEN_KEY, TOKEN_KEY,
};

mod common;

#[tokio::test]
async fn test_refresh_through_gateway_with_file_storage() {
    let backend = common::start_backend().await;
    let gateway = common::start_gateway(common::gateway_config(&backend.base_url())).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials.json");
    let storage = Arc::new(FileStorage::open(&path).unwrap());
    storage.set_item(TOKEN_KEY, "stale").unwrap();
    storage.set_item(REFRESH_TOKEN_KEY, common::VALID_REFRESH).unwrap();

    let observer = Arc::new(common::RecordingObserver::default());
    let client = Arc::new(
        AuthenticatedClient::new(
            &gateway.url("/api"),
            storage,
            Arc::new(RefreshCoordinator::new()),
            observer.clone(),
        )
        .unwrap(),
    );

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.get::<Value>("/profile").await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap()["name"], "Ada");
    }
    assert_eq!(backend.refresh_calls(), 1);

    // A fresh store over the same file sees the rotated pair.
    let reopened = FileStorage::open(&path).unwrap();
    assert_eq!(reopened.get_item(TOKEN_KEY).as_deref(), Some(common::REFRESHED_TOKEN));
    assert_eq!(reopened.get_item(REFRESH_TOKEN_KEY).as_deref(), Some(common::ROTATED_REFRESH));
    assert!(observer.visits().is_empty());

    gateway.shutdown.trigger();
}
