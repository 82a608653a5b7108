use std::sync::Arc;
use toastbox_core::identity::port::IdentityStore;
use toastbox_core::toast::error::ToastError;
use toastbox_dispatch::{IdentityManager, RegisterRequest};
use toastbox_store::mem::MemIdentityStore;
use toastbox_store::sqlite::SqliteIdentityStore;

async fn round_trip(store: Arc<dyn IdentityStore>) {
    let manager = IdentityManager::new(store);

    let id = manager
        .register(
            RegisterRequest::new("Toastbox.Demo")
                .with_display_name("Toastbox Demo")
                .with_icon("C:\\icons\\demo.png")
                .with_icon_background("#0078d4"),
        )
        .await
        .unwrap();
    assert_eq!(id, "Toastbox.Demo");

    let first = manager.lookup(&id).await.unwrap().unwrap();
    assert_eq!(first.display_name, "Toastbox Demo");
    assert_eq!(first.icon_uri.as_deref(), Some("C:\\icons\\demo.png"));
    assert_eq!(first.icon_background, "FF0078D4");
    assert!(first.show_in_settings);
    assert!(first.activator.starts_with('{') && first.activator.ends_with('}'));
    assert_eq!(first.activator.len(), 38);

    // 重新注册覆盖名称与图标
    manager
        .register(
            RegisterRequest::new("Toastbox.Demo")
                .with_display_name("Renamed")
                .hidden_from_settings(),
        )
        .await
        .unwrap();
    let second = manager.lookup(&id).await.unwrap().unwrap();
    assert_eq!(second.display_name, "Renamed");
    assert_eq!(second.icon_uri, None);
    assert_eq!(second.icon_background, "00000000");
    assert!(!second.show_in_settings);
    assert_ne!(second.activator, first.activator);

    assert!(manager.unregister(&id).await.unwrap());
    assert!(manager.lookup(&id).await.unwrap().is_none());
    assert!(!manager.unregister(&id).await.unwrap());
}

#[tokio::test]
async fn test_register_lookup_unregister_in_memory() {
    round_trip(Arc::new(MemIdentityStore::new())).await;
}

#[tokio::test]
async fn test_register_lookup_unregister_sqlite() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let store = SqliteIdentityStore::open(&tmp_dir.path().join("ids.db"))
        .await
        .unwrap();
    round_trip(Arc::new(store)).await;
}

#[tokio::test]
async fn test_display_name_defaults_to_id() {
    let manager = IdentityManager::new(Arc::new(MemIdentityStore::new()));
    manager
        .register(RegisterRequest::new("Plain.App"))
        .await
        .unwrap();
    manager
        .register(RegisterRequest::new("Another.App").with_display_name(""))
        .await
        .unwrap();

    let all = manager.list().await.unwrap();
    let names: Vec<_> = all
        .iter()
        .map(|i| (i.id.as_str(), i.display_name.as_str()))
        .collect();
    assert_eq!(
        names,
        vec![("Another.App", "Another.App"), ("Plain.App", "Plain.App")]
    );
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let store = Arc::new(MemIdentityStore::new());
    let manager = IdentityManager::new(store.clone());

    assert!(matches!(
        manager.register(RegisterRequest::new("")).await,
        Err(ToastError::Identity(_))
    ));
    assert!(matches!(
        manager.register(RegisterRequest::new("a".repeat(130))).await,
        Err(ToastError::Identity(_))
    ));
    assert!(matches!(
        manager
            .register(RegisterRequest::new("Bad.Color").with_icon_background("blue"))
            .await,
        Err(ToastError::Validation(_))
    ));
    assert!(store.list().await.unwrap().is_empty());
}
