use toastbox_core::identity::entity::Identity;
use toastbox_core::identity::port::IdentityStore;
use toastbox_store::mem::MemIdentityStore;
use toastbox_store::sqlite::SqliteIdentityStore;

fn identity(id: &str, name: &str) -> Identity {
    Identity {
        id: id.to_string(),
        display_name: name.to_string(),
        icon_uri: Some("C:\\icons\\app.png".to_string()),
        icon_background: "00000000".to_string(),
        show_in_settings: true,
        activator: "{6F7A1C52-0D4B-4D8A-9E61-0B7C2F0E8A11}".to_string(),
    }
}

async fn exercise(store: &dyn IdentityStore) {
    // 不存在的记录
    assert!(store.get("Foo.Bar").await.unwrap().is_none());
    assert!(!store.delete("Foo.Bar").await.unwrap());

    // 写入后可读
    let first = identity("Foo.Bar", "Foo Bar");
    store.put(&first).await.unwrap();
    assert_eq!(store.get("Foo.Bar").await.unwrap(), Some(first));

    // 覆盖写入
    let mut second = identity("Foo.Bar", "Renamed");
    second.icon_uri = None;
    second.show_in_settings = false;
    store.put(&second).await.unwrap();
    assert_eq!(store.get("Foo.Bar").await.unwrap(), Some(second));

    store.put(&identity("Alpha.App", "Alpha")).await.unwrap();
    let ids: Vec<_> = store
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.id)
        .collect();
    assert_eq!(ids, vec!["Alpha.App".to_string(), "Foo.Bar".to_string()]);

    // 删除后不可读，重复删除是幂等的
    assert!(store.delete("Foo.Bar").await.unwrap());
    assert!(store.get("Foo.Bar").await.unwrap().is_none());
    assert!(!store.delete("Foo.Bar").await.unwrap());
}

#[tokio::test]
async fn test_mem_identity_store() {
    let store = MemIdentityStore::new();
    exercise(&store).await;
}

#[tokio::test]
async fn test_sqlite_identity_store() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let store = SqliteIdentityStore::open(&tmp_dir.path().join("nested").join("ids.db"))
        .await
        .unwrap();
    exercise(&store).await;
}

#[tokio::test]
async fn test_sqlite_identity_store_persists() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("ids.db");
    {
        let store = SqliteIdentityStore::open(&path).await.unwrap();
        store.put(&identity("Persist.App", "Persist")).await.unwrap();
    }
    let reopened = SqliteIdentityStore::open(&path).await.unwrap();
    assert_eq!(
        reopened.get("Persist.App").await.unwrap().map(|i| i.display_name),
        Some("Persist".to_string())
    );
}
