use nextgen_core::storage::decode_snapshot;
use nextgen_core::{
    ChatError, ChatSettings, ConversationStore, FileStore, KeyValueStore, MemoryStore,
    MessageStatus, NoticeLevel, Notifier, Settings, StoreEvent,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

const KEY: &str = "chatConversations";

#[derive(Default)]
struct RecordingNotifier {
    notices: Mutex<Vec<(NoticeLevel, String)>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        self.notices.lock().unwrap().push((level, message.to_string()));
    }
}

fn store_on(storage: Arc<dyn KeyValueStore>) -> ConversationStore {
    ConversationStore::new(storage, ChatSettings::default())
}

// ========================================================================
// Round trips
// ========================================================================

#[tokio::test(start_paused = true)]
async fn test_create_persist_rehydrate_roundtrip() {
    let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let store = store_on(storage.clone());
    let created = store.create_conversation().await;
    store.persist().await.unwrap();

    let restored = store_on(storage);
    assert_eq!(restored.rehydrate().await.unwrap(), 1);

    let conv = restored.conversation(&created.id).await.unwrap();
    assert_eq!(conv.title, created.title);
    assert_eq!(conv.last_updated, created.last_updated);
    assert_eq!(conv.messages.len(), 1);
    assert_eq!(conv.messages[0].id, created.messages[0].id);
    assert_eq!(conv.messages[0].content, created.messages[0].content);
    assert_eq!(conv.messages[0].timestamp, created.messages[0].timestamp);
    assert!(restored.active_id().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_mutations_are_saved_without_explicit_persist() {
    let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let store = store_on(storage.clone());
    let conv = store.create_conversation().await;
    store.rename_conversation(&conv.id, "Mis metas").await.unwrap();
    let sent = store.append_user_message(&conv.id, "hola").await.unwrap();
    sent.reply.finished().await;

    let snapshot = decode_snapshot(&storage.get(KEY).unwrap().unwrap()).unwrap();
    let saved = &snapshot.conversations[0];
    assert_eq!(saved.title, "Mis metas");
    assert_eq!(saved.messages.len(), 3);
    assert_eq!(saved.messages[2].status, MessageStatus::Sent);

    store.delete_conversation(&conv.id).await.unwrap();
    let snapshot = decode_snapshot(&storage.get(KEY).unwrap().unwrap()).unwrap();
    assert!(snapshot.conversations.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_file_store_survives_restart() {
    let dir = TempDir::new().unwrap();
    let mut settings = Settings::default();
    settings.storage.data_dir = Some(dir.path().to_path_buf());

    let created = {
        let storage = Arc::new(FileStore::new(settings.storage.resolved_data_dir()).unwrap());
        let store = ConversationStore::from_settings(storage, &settings);
        let conv = store.create_conversation().await;
        store.rename_conversation(&conv.id, "Proyecto de vida").await.unwrap()
    };

    assert!(dir.path().join("chatConversations.json").exists());

    let storage = Arc::new(FileStore::new(dir.path()).unwrap());
    let store = ConversationStore::from_settings(storage, &settings);
    assert_eq!(store.rehydrate().await.unwrap(), 1);
    let conv = store.conversation(&created.id).await.unwrap();
    assert_eq!(conv.title, "Proyecto de vida");
}

#[tokio::test(start_paused = true)]
async fn test_custom_storage_key() {
    let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let store = store_on(storage.clone()).with_key("otherKey");
    store.create_conversation().await;

    assert!(storage.get("otherKey").unwrap().is_some());
    assert!(storage.get(KEY).unwrap().is_none());
}

// ========================================================================
// Rehydrate edge cases
// ========================================================================

#[tokio::test(start_paused = true)]
async fn test_rehydrate_absent_store_is_empty() {
    let store = store_on(Arc::new(MemoryStore::new()));
    assert_eq!(store.rehydrate().await.unwrap(), 0);
    assert!(store.conversations().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rehydrate_blank_value_is_empty() {
    let store = store_on(Arc::new(MemoryStore::with_entry(KEY, "  ")));
    assert_eq!(store.rehydrate().await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_rehydrate_malformed_reports_and_falls_back() {
    let notifier = Arc::new(RecordingNotifier::default());
    let store = store_on(Arc::new(MemoryStore::with_entry(KEY, "{\"version\": 1, \"conv")))
        .with_notifier(notifier.clone());

    let err = store.rehydrate().await.unwrap_err();
    assert!(matches!(err, ChatError::Deserialization(_)));
    assert!(store.conversations().await.is_empty());

    let notices = notifier.notices.lock().unwrap();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].0, NoticeLevel::Warning);
    drop(notices);

    // The store stays usable after a failed rehydrate.
    store.create_conversation().await;
    assert_eq!(store.conversations().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rehydrate_replaces_current_collection() {
    let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let store = store_on(storage.clone());
    let kept = store.create_conversation().await;
    store.persist().await.unwrap();

    // `other` picks up what `store` saved since its previous rehydrate.
    let other = store_on(storage.clone());
    other.rehydrate().await.unwrap();
    store.create_conversation().await;

    assert_eq!(other.rehydrate().await.unwrap(), 2);
    assert!(other.conversation(&kept.id).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_rehydrate_fails_interrupted_replies() {
    let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let store = store_on(storage.clone());
    let conv = store.create_conversation().await;
    let ticket = store
        .simulate_assistant_reply(&conv.id, "uno dos tres")
        .await
        .unwrap();
    let placeholder_id = ticket.placeholder_id.clone();

    // The placeholder was saved while still `sending`.
    let restored = store_on(storage);
    restored.rehydrate().await.unwrap();
    let conv = restored.conversation(&conv.id).await.unwrap();
    let placeholder = conv.message(&placeholder_id).unwrap();
    assert_eq!(placeholder.status, MessageStatus::Error);
    assert_eq!(conv.sending_count(), 0);

    // A new reply can start on the restored conversation.
    restored.append_user_message(&conv.id, "hola").await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_rehydrate_cancels_running_reveals() {
    let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let store = store_on(storage);
    let conv = store.create_conversation().await;
    let ticket = store
        .simulate_assistant_reply(&conv.id, "uno dos tres")
        .await
        .unwrap();

    let placeholder_id = ticket.placeholder_id.clone();
    tokio::time::sleep(Duration::from_millis(150)).await;
    let mut rx = store.subscribe();
    store.rehydrate().await.unwrap();

    let mut cancelled = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let StoreEvent::ReplyCancelled {
            conversation_id,
            placeholder_id,
        } = event
        {
            cancelled.push((conversation_id, placeholder_id));
        }
    }
    assert_eq!(cancelled, vec![(conv.id.clone(), placeholder_id)]);

    assert_eq!(ticket.finished().await, nextgen_core::ReplyPhase::Cancelled);
    tokio::time::sleep(Duration::from_secs(1)).await;
    let conv = store.conversation(&conv.id).await.unwrap();
    assert_eq!(conv.sending_count(), 0);
    assert!(!store.reply_in_progress(&conv.id).await);
}

#[tokio::test(start_paused = true)]
async fn test_rehydrate_migrates_unversioned_layout() {
    let legacy = r#"[{
        "id": "1737969702000",
        "title": "Conversación 1",
        "messages": [
            {"id": "welcome", "role": "assistant", "content": "¡Hola!",
             "timestamp": "2025-01-27T09:21:42.000Z", "status": "sent"},
            {"id": "user-1737969710000", "role": "user", "content": "Hola",
             "timestamp": "2025-01-27T09:21:50.000Z", "status": "sent"}
        ],
        "lastUpdated": "2025-01-27T09:21:50.000Z"
    }]"#;
    let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::with_entry(KEY, legacy));
    let store = store_on(storage.clone());

    assert_eq!(store.rehydrate().await.unwrap(), 1);
    let conv = store.conversation("1737969702000").await.unwrap();
    assert_eq!(conv.messages[1].content, "Hola");

    store.persist().await.unwrap();
    let saved = storage.get(KEY).unwrap().unwrap();
    assert!(saved.starts_with("{\"version\":1"));
}
