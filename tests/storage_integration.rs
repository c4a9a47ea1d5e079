use std::sync::{Arc, Mutex};

use airprompts_storage::config::StorageConfig;
use airprompts_storage::migration::{LegacyDataAdapter, ManagedKey};
use airprompts_storage::storage::{
    GetOptions, InMemoryLocalStore, InMemoryObjectStore, InMemorySessionStore, SetOptions,
    StorageArea, StorageFacade,
};
use airprompts_storage::StorageError;
use serde_json::{json, Value};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct App {
    adapter: LegacyDataAdapter,
    raw: Arc<InMemoryLocalStore>,
}

fn app_with_quota(quota: Option<usize>) -> App {
    init_logging();
    let raw = Arc::new(match quota {
        Some(units) => InMemoryLocalStore::with_quota(units),
        None => InMemoryLocalStore::new(),
    });
    let config = StorageConfig::builder()
        .namespace("airprompts")
        .large_object_threshold(256)
        .build()
        .unwrap();
    let facade = StorageFacade::builder()
        .config(config)
        .durable(raw.clone())
        .session(Arc::new(InMemorySessionStore::new()))
        .large_objects(Arc::new(InMemoryObjectStore::new()))
        .build();
    let adapter = LegacyDataAdapter::over_durable(Arc::new(facade)).unwrap();
    App { adapter, raw }
}

#[tokio::test]
async fn upgrade_from_a_legacy_profile() {
    let app = app_with_quota(None);
    let legacy = [
        ("airprompts_templates", json!([
            {"id": "t1", "name": "Greeting", "folder_id": "f1", "is_favorite": "true", "created_at": "2023-05-01"},
            {"name": "orphan without id"}
        ])),
        ("workflows-backup", json!([{"id": "w1", "steps": [{"template_id": "t1"}]}])),
        ("ap_folders", json!([{"id": "f1", "name": "Work", "parent_id": null}])),
        ("ui-prefs", json!({"view_mode": "list", "items_per_page": 50})),
        ("user_settings", json!({"display_name": "Ada", "auto_save": false})),
    ];
    for (alias, value) in &legacy {
        app.raw.set_item(alias, &value.to_string()).unwrap();
    }

    let status = app.adapter.check_migration_status();
    assert!(status.needed);
    assert_eq!(status.keys.len(), legacy.len());

    let report = app.adapter.migrate_all().await;
    assert!(report.failed.is_empty(), "{:?}", report.failed);
    assert_eq!(
        report.migrated,
        vec!["templates", "workflows", "folders", "uiPreferences", "userSettings"]
    );
    assert!(!app.adapter.check_migration_status().needed);

    let templates = app.adapter.get_managed(ManagedKey::Templates).await.unwrap();
    assert_eq!(
        templates,
        json!([{
            "id": "t1", "name": "Greeting", "folderId": "f1", "folderIds": ["f1"],
            "favorite": true, "createdAt": "2023-05-01"
        }])
    );
    assert_eq!(
        app.adapter.get("workflows").await.unwrap()[0]["steps"],
        json!([{"templateId": "t1"}])
    );
    assert_eq!(app.adapter.get("snippets").await.unwrap(), json!([]));
    assert_eq!(
        app.adapter.get("uiPreferences").await.unwrap(),
        json!({"viewMode": "list", "itemsPerPage": 50, "theme": "system"})
    );
    assert_eq!(
        app.adapter.get("userSettings").await.unwrap(),
        json!({"displayName": "Ada", "preferences": {"autoSave": false, "confirmDelete": true}})
    );

    // only namespaced keys remain in raw storage
    let keys = app.raw.keys().unwrap();
    assert!(keys.iter().all(|k| k.starts_with("airprompts:")), "{keys:?}");
}

#[tokio::test]
async fn subscribers_follow_writes_made_through_the_adapter() {
    let app = app_with_quota(None);
    let seen: Arc<Mutex<Vec<Value>>> = Arc::default();
    let s = seen.clone();
    let sub = app
        .adapter
        .storage()
        .subscribe("templates", move |v| s.lock().unwrap().push(v.clone()));

    app.raw.set_item("templates", r#"[{"id":"1"}]"#).unwrap();
    app.adapter.get("templates").await.unwrap(); // migration writes through the facade
    app.adapter.set("templates", &json!([])).await.unwrap();
    sub.unsubscribe();
    app.adapter.set("templates", &json!([{"id": "2"}])).await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![json!([{"id": "1", "folderIds": []}]), json!([])]);
}

#[tokio::test]
async fn oversized_values_bypass_the_durable_quota() {
    let app = app_with_quota(Some(200));
    let storage = app.adapter.storage();

    // big enough for the large-object tier, which has no quota
    let big = json!({"body": "x".repeat(1_000)});
    storage.set("big", &big, SetOptions::default()).await.unwrap();
    assert_eq!(storage.get("big", GetOptions::default()).await, Some(big));

    // below the threshold but over the durable quota
    let medium = json!({"body": "y".repeat(190)});
    let err = storage.set("medium", &medium, SetOptions::default()).await.unwrap_err();
    assert!(matches!(err, StorageError::QuotaExceeded { .. }));
    assert!(err.user_message().starts_with("Could not save"));

    // the session tier is unaffected by the durable quota
    storage.set("medium", &medium, SetOptions::temporary()).await.unwrap();
    assert_eq!(storage.get("medium", GetOptions::default()).await, Some(medium));

    let info = storage.storage_info().await;
    assert!(info.large_object > 1_000);
    assert!(info.session > 0);
}

#[tokio::test]
async fn clear_keeps_unmigrated_legacy_data() {
    let app = app_with_quota(None);
    app.raw.set_item("ap_snippets", r#"[{"id":"s"}]"#).unwrap();
    app.adapter.set("templates", &json!([{"id": "t"}])).await.unwrap();

    app.adapter.storage().clear().await.unwrap();

    assert_eq!(app.adapter.get("templates").await.unwrap(), json!([]));
    assert_eq!(app.adapter.check_migration_status().keys, vec!["ap_snippets".to_string()]);
}
