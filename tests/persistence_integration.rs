mod common;

use tempfile::TempDir;

use mira::config::{SessionsConfig, StorageBackend, StorageConfig};
use mira::session::{Message, SessionStore, Source, SourceType};
use mira::storage::{open_store, JsonDirStorage, SnapshotStore, SqliteStorage, MESSAGES_SLOT};

use common::create_temp_storage;

fn answer() -> Message {
    let mut source = Source::new("Warehouses integrate data.");
    source.source = Some("dw.pdf".to_string());
    source.relevance_score = Some("91%".to_string());
    Message::answer(
        "A data warehouse is...",
        Some(SourceType::KnowledgeBase),
        vec![source],
    )
}

fn fill(store: &mut SessionStore) {
    store
        .append(Message::user("What is a data warehouse?"))
        .unwrap();
    store.append(answer()).unwrap();
}

#[test]
fn test_sqlite_state_survives_reopen() {
    let (storage, tmp) = create_temp_storage();
    let db_path = storage.db_path().to_path_buf();

    let (active, messages) = {
        let mut store = SessionStore::load(Box::new(storage), SessionsConfig::default());
        fill(&mut store);
        (
            store.active_session_id().to_string(),
            store.messages().to_vec(),
        )
    };

    let reopened = SqliteStorage::new_with_path(&db_path).unwrap();
    let store = SessionStore::load(Box::new(reopened), SessionsConfig::default());
    assert_eq!(store.active_session_id(), active);
    assert_eq!(store.messages(), messages.as_slice());
    assert_eq!(store.sessions().len(), 1);
    assert_eq!(store.sessions()[0].title, "What is a data warehouse?");
    drop(tmp);
}

#[test]
fn test_json_dir_archived_session_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("snapshots");

    let first_id = {
        let mut store = SessionStore::load(
            Box::new(JsonDirStorage::new(&dir).unwrap()),
            SessionsConfig::default(),
        );
        fill(&mut store);
        let first = store.active_session_id().to_string();
        store.start_new_session().unwrap();
        store.append(Message::user("Second topic")).unwrap();
        first
    };

    let mut store = SessionStore::load(
        Box::new(JsonDirStorage::new(&dir).unwrap()),
        SessionsConfig::default(),
    );
    assert_eq!(store.sessions().len(), 2);
    assert_eq!(store.messages().len(), 1);
    assert_eq!(store.sessions()[0].title, "Second topic");

    store.load_session(&first_id).unwrap();
    assert_eq!(store.messages().len(), 2);
    assert_eq!(store.messages()[1].sources[0].label().as_deref(), Some("dw.pdf"));
}

#[test]
fn test_open_store_honors_backend_and_path() {
    let tmp = TempDir::new().unwrap();

    let sqlite = open_store(&StorageConfig {
        backend: StorageBackend::Sqlite,
        path: Some(tmp.path().join("state.db")),
    })
    .unwrap();
    sqlite.save(MESSAGES_SLOT, "[]").unwrap();
    assert!(tmp.path().join("state.db").exists());

    let json = open_store(&StorageConfig {
        backend: StorageBackend::Json,
        path: Some(tmp.path().join("json")),
    })
    .unwrap();
    json.save(MESSAGES_SLOT, "[]").unwrap();
    assert_eq!(json.load(MESSAGES_SLOT).unwrap().as_deref(), Some("[]"));
}

#[test]
fn test_corrupt_messages_start_empty() {
    let (storage, _tmp) = create_temp_storage();
    storage.save(MESSAGES_SLOT, "{not json").unwrap();

    let store = SessionStore::load(Box::new(storage), SessionsConfig::default());
    assert!(store.messages().is_empty());
}
