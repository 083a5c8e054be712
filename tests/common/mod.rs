use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use mira::api::{AssistantApi, HttpAssistantClient};
use mira::config::{ApiConfig, SessionsConfig};
use mira::controller::{ChatController, InitializePolicy};
use mira::session::SessionStore;
use mira::storage::SqliteStorage;

#[allow(dead_code)]
pub fn create_temp_storage() -> (SqliteStorage, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("mira.db");
    let storage =
        SqliteStorage::new_with_path(db_path).expect("failed to create sqlite storage with path");
    (storage, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// API config pointing at `base_url` with fast retries
#[allow(dead_code)]
pub fn api_config(base_url: &str) -> ApiConfig {
    ApiConfig {
        base_url: base_url.to_string(),
        timeout_seconds: 5,
        initialize_max_retries: 1,
        initialize_retry_delay_ms: 10,
    }
}

/// Controller talking HTTP to `base_url`, persisting into a temp SQLite file
#[allow(dead_code)]
pub fn http_controller(base_url: &str) -> (ChatController, TempDir) {
    let (storage, tmp) = create_temp_storage();
    let store = SessionStore::load(Box::new(storage), SessionsConfig::default());
    let config = api_config(base_url);
    let api: Arc<dyn AssistantApi> =
        Arc::new(HttpAssistantClient::new(&config).expect("failed to build client"));
    let controller = ChatController::new(
        api,
        Arc::new(Mutex::new(store)),
        InitializePolicy::from(&config),
    );
    (controller, tmp)
}
