//! In-memory session context store
//!
//! One entry per session key: the last detected object, its image, and the
//! most recent question/answer. Entries are bounded in number and dropped
//! after sitting idle; nothing survives a restart.

use crate::config::SessionConfig;
use crate::model::ImageData;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::debug;

/// Object context for one session
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub object_label: String,
    pub image: ImageData,
    pub last_question: Option<String>,
    pub last_answer: Option<String>,
    pub detected_at: DateTime<Utc>,
}

impl SessionEntry {
    fn new(object_label: String, image: ImageData) -> Self {
        Self {
            object_label,
            image,
            last_question: None,
            last_answer: None,
            detected_at: Utc::now(),
        }
    }

    /// Time since the object was detected
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.detected_at
    }
}

/// One detection's entry, independent of the key it was stored under.
///
/// A new detection on the same key installs a fresh slot, so an exchange
/// recorded through an older slot never reaches the newer entry.
#[derive(Clone)]
pub struct SessionSlot(Arc<RwLock<SessionEntry>>);

impl SessionSlot {
    pub fn snapshot(&self) -> SessionEntry {
        self.0
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Remember the latest question/answer for this detection
    pub fn record_exchange(&self, question: String, answer: String) {
        let mut entry = self.0.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        entry.last_question = Some(question);
        entry.last_answer = Some(answer);
    }
}

/// Session store. Concurrent writers to one key race; the last write wins.
pub struct SessionStore {
    // A new detection swaps the slot; an exchange mutates inside it
    entries: Cache<String, SessionSlot>,
}

impl SessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        Self::with_limits(config.max_entries, config.idle_ttl())
    }

    pub fn with_limits(max_entries: u64, idle_ttl: Duration) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .time_to_idle(idle_ttl)
            .build();
        Self { entries }
    }

    /// Create or replace the entry for `key`, forgetting any earlier exchange
    pub async fn put(&self, key: &str, object_label: String, image: ImageData) {
        debug!("Storing session: object={}, image={} bytes", object_label, image.len());
        let entry = SessionEntry::new(object_label, image);
        self.entries
            .insert(key.to_string(), SessionSlot(Arc::new(RwLock::new(entry))))
            .await;
    }

    /// Current slot for `key`
    pub async fn slot(&self, key: &str) -> Option<SessionSlot> {
        self.entries.get(key).await
    }

    /// Snapshot of the entry for `key`
    pub async fn get(&self, key: &str) -> Option<SessionEntry> {
        Some(self.slot(key).await?.snapshot())
    }

    /// Record into whatever entry `key` holds now. Returns false (and does
    /// nothing) when `key` has no entry.
    pub async fn record_exchange(&self, key: &str, question: String, answer: String) -> bool {
        let Some(slot) = self.slot(key).await else {
            return false;
        };
        slot.record_exchange(question, answer);
        true
    }

    /// Approximate number of live entries
    pub fn len(&self) -> u64 {
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply pending evictions so `len` is exact
    pub async fn sync(&self) {
        self.entries.run_pending_tasks().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::with_limits(100, Duration::from_secs(60))
    }

    fn image(bytes: &'static [u8]) -> ImageData {
        ImageData::new(bytes, Some("image/jpeg"))
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        assert!(store().get("nobody").await.is_none());
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = store();
        store.put("k1", "Coke bottle".to_string(), image(b"coke")).await;

        let entry = store.get("k1").await.unwrap();
        assert_eq!(entry.object_label, "Coke bottle");
        assert_eq!(entry.image.bytes().as_ref(), b"coke");
        assert!(entry.last_question.is_none());
        assert!(entry.last_answer.is_none());
    }

    #[tokio::test]
    async fn test_record_exchange_keeps_label_and_image() {
        let store = store();
        store.put("k1", "Coke bottle".to_string(), image(b"coke")).await;

        assert!(store
            .record_exchange("k1", "price?".to_string(), "About $2.".to_string())
            .await);

        let entry = store.get("k1").await.unwrap();
        assert_eq!(entry.object_label, "Coke bottle");
        assert_eq!(entry.image.bytes().as_ref(), b"coke");
        assert_eq!(entry.last_question.as_deref(), Some("price?"));
        assert_eq!(entry.last_answer.as_deref(), Some("About $2."));
    }

    #[tokio::test]
    async fn test_record_exchange_without_entry_is_noop() {
        let store = store();
        assert!(!store
            .record_exchange("ghost", "q".to_string(), "a".to_string())
            .await);
        assert!(store.get("ghost").await.is_none());
    }

    #[tokio::test]
    async fn test_new_detection_replaces_and_clears_exchange() {
        let store = store();
        store.put("k1", "Coke bottle".to_string(), image(b"coke")).await;
        store
            .record_exchange("k1", "name a similar product".to_string(), "Pepsi.".to_string())
            .await;

        store.put("k1", "Stapler".to_string(), image(b"stapler")).await;

        let entry = store.get("k1").await.unwrap();
        assert_eq!(entry.object_label, "Stapler");
        assert_eq!(entry.image.bytes().as_ref(), b"stapler");
        assert!(entry.last_question.is_none());
        assert!(entry.last_answer.is_none());
    }

    #[tokio::test]
    async fn test_stale_slot_does_not_touch_new_detection() {
        let store = store();
        store.put("k1", "Mug".to_string(), image(b"mug")).await;
        let stale = store.slot("k1").await.unwrap();

        store.put("k1", "Stapler".to_string(), image(b"stapler")).await;
        stale.record_exchange("name a similar product".to_string(), "Cup.".to_string());

        let entry = store.get("k1").await.unwrap();
        assert_eq!(entry.object_label, "Stapler");
        assert!(entry.last_question.is_none());
        assert!(entry.last_answer.is_none());
        assert_eq!(stale.snapshot().last_question.as_deref(), Some("name a similar product"));
    }

    #[tokio::test]
    async fn test_redetection_resets_age() {
        let store = store();
        store.put("k1", "Mug".to_string(), image(b"mug")).await;
        let first = store.get("k1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(first.age() >= chrono::Duration::milliseconds(20));

        store.put("k1", "Mug".to_string(), image(b"mug")).await;
        let second = store.get("k1").await.unwrap();
        assert!(second.detected_at > first.detected_at);
        assert!(second.age() < first.age());
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let store = store();
        store.put("a", "Mug".to_string(), image(b"mug")).await;
        store.put("b", "Pen".to_string(), image(b"pen")).await;
        store.record_exchange("a", "q".to_string(), "ans".to_string()).await;

        assert!(store.get("b").await.unwrap().last_question.is_none());
        store.sync().await;
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_idle_entries_expire() {
        let store = SessionStore::with_limits(100, Duration::from_millis(50));
        store.put("k1", "Mug".to_string(), image(b"mug")).await;
        assert!(store.get("k1").await.is_some());

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(store.get("k1").await.is_none());
    }

    #[tokio::test]
    async fn test_capacity_is_bounded() {
        let store = SessionStore::with_limits(2, Duration::from_secs(60));
        for key in ["a", "b", "c", "d", "e"] {
            store.put(key, "Mug".to_string(), image(b"mug")).await;
            store.sync().await;
        }
        assert!(store.len() <= 2);
    }
}
