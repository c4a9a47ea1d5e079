//! Opens a SQLite-backed profile, seeds it with data in the old layout and
//! migrates it. Run with `RUST_LOG=debug` to follow what happens.

use std::sync::Arc;

use airprompts_storage::config::StorageConfig;
use airprompts_storage::migration::LegacyDataAdapter;
use airprompts_storage::storage::{
    InMemoryObjectStore, InMemorySessionStore, SqliteLocalStore, StorageArea, StorageFacade,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("profile.db");
    let path = path.to_str().ok_or_else(|| anyhow::anyhow!("non UTF-8 temp path"))?;

    let durable = Arc::new(SqliteLocalStore::new(path, "local")?);
    durable.set_item(
        "airprompts_templates",
        r#"[{"id":"t1","name":"Summarize","folder_id":"inbox","is_favorite":1}]"#,
    )?;
    durable.set_item("ui-prefs", r#"{"view_mode":"grid","sidebar_collapsed":true}"#)?;

    let storage = Arc::new(
        StorageFacade::builder()
            .config(StorageConfig::default())
            .durable(durable)
            .session(Arc::new(InMemorySessionStore::new()))
            .large_objects(Arc::new(InMemoryObjectStore::new()))
            .build(),
    );
    let adapter = LegacyDataAdapter::over_durable(storage.clone())?;

    println!("before: {:?}", adapter.check_migration_status());
    let report = adapter.migrate_all().await;
    println!("report: {}", serde_json::to_string_pretty(&report)?);
    println!("after:  {:?}", adapter.check_migration_status());

    println!("templates: {}", adapter.get("templates").await?);
    println!("metrics: {}", serde_json::to_string(&storage.metrics())?);
    println!("usage:   {}", serde_json::to_string(&storage.storage_info().await)?);

    storage.destroy();
    Ok(())
}
