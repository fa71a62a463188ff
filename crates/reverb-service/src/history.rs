use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reverb_core::{Cache, Clock, HistoryEntry};
use tracing::{debug, error, info};
use uuid::Uuid;

const HISTORY_KEY: &str = "message_history";
const MAX_HISTORY_SIZE: usize = 100;
const PERSIST_TTL: Duration = Duration::from_secs(86_400 * 30);

/// Bounded, newest-first log of processed messages. The in-memory list is
/// authoritative; the whole list is mirrored into the cache on every
/// mutation so a restart can pick it back up. Cache failures are logged
/// and swallowed.
pub struct HistoryStore {
    cache: Arc<dyn Cache>,
    clock: Arc<dyn Clock>,
    op_timeout: Duration,
    entries: Mutex<Vec<HistoryEntry>>,
}

impl HistoryStore {
    /// Builds the store, seeding it from a previously persisted list.
    /// Any load failure (missing key, malformed data, slow cache) falls
    /// back to an empty list rather than failing construction.
    pub async fn load(cache: Arc<dyn Cache>, clock: Arc<dyn Clock>, op_timeout: Duration) -> Self {
        let entries = match tokio::time::timeout(op_timeout, cache.get(HISTORY_KEY)).await {
            Ok(Ok(Some(value))) => match serde_json::from_value::<Vec<HistoryEntry>>(value) {
                Ok(list) => {
                    info!("Loaded {} history entries from cache", list.len());
                    list
                }
                Err(e) => {
                    error!("Failed to decode persisted history: {e}");
                    Vec::new()
                }
            },
            Ok(Ok(None)) => Vec::new(),
            Ok(Err(e)) => {
                error!("Failed to load message history: {e}");
                Vec::new()
            }
            Err(_) => {
                error!("Timed out loading message history");
                Vec::new()
            }
        };

        Self {
            cache,
            clock,
            op_timeout,
            entries: Mutex::new(entries),
        }
    }

    pub async fn add_message(
        &self,
        original: &str,
        processed: &str,
        metadata: HashMap<String, String>,
    ) -> HistoryEntry {
        let entry = HistoryEntry {
            id: Uuid::new_v4().to_string(),
            original_message: original.to_string(),
            processed_message: processed.to_string(),
            timestamp: self.clock.now().timestamp(),
            metadata,
        };

        let snapshot = {
            let mut entries = self.entries.lock().unwrap();
            entries.insert(0, entry.clone());
            entries.truncate(MAX_HISTORY_SIZE);
            debug!(
                "Message {} added to history ({} entries)",
                entry.id,
                entries.len()
            );
            entries.clone()
        };
        self.persist(&snapshot).await;

        entry
    }

    pub fn get_history(&self, limit: usize, offset: usize) -> Vec<HistoryEntry> {
        let entries = self.entries.lock().unwrap();
        entries.iter().skip(offset).take(limit).cloned().collect()
    }

    pub fn get_by_id(&self, id: &str) -> Option<HistoryEntry> {
        let entries = self.entries.lock().unwrap();
        entries.iter().find(|entry| entry.id == id).cloned()
    }

    /// Case-insensitive substring match over either message form,
    /// preserving newest-first order.
    pub fn search(&self, query: &str) -> Vec<HistoryEntry> {
        let needle = query.to_lowercase();
        let entries = self.entries.lock().unwrap();
        entries
            .iter()
            .filter(|entry| {
                entry.original_message.to_lowercase().contains(&needle)
                    || entry.processed_message.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    pub async fn clear(&self) {
        {
            let mut entries = self.entries.lock().unwrap();
            entries.clear();
        }
        self.persist(&[]).await;
        info!("Message history cleared");
    }

    async fn persist(&self, entries: &[HistoryEntry]) {
        let value = match serde_json::to_value(entries) {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to encode message history: {e}");
                return;
            }
        };
        match tokio::time::timeout(self.op_timeout, self.cache.set(HISTORY_KEY, value, PERSIST_TTL))
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Failed to save message history: {e}"),
            Err(_) => error!("Timed out saving message history"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FailingCache, MockClock};
    use chrono::TimeZone;
    use reverb_core::MemoryCache;

    fn clock() -> Arc<MockClock> {
        Arc::new(MockClock::at(
            chrono::Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
        ))
    }

    async fn empty_store() -> HistoryStore {
        HistoryStore::load(
            Arc::new(MemoryCache::new()),
            clock(),
            Duration::from_secs(1),
        )
        .await
    }

    #[tokio::test]
    async fn history_is_capped_at_one_hundred_newest_first() {
        let store = empty_store().await;
        for i in 0..150 {
            store
                .add_message(&format!("msg-{i}"), &format!("ECHO: msg-{i}"), HashMap::new())
                .await;
        }
        let all = store.get_history(1000, 0);
        assert_eq!(all.len(), 100);
        assert_eq!(all[0].original_message, "msg-149");
        assert_eq!(all[99].original_message, "msg-50");
    }

    #[tokio::test]
    async fn paging_and_out_of_range_offset() {
        let store = empty_store().await;
        for i in 0..5 {
            store
                .add_message(&format!("m{i}"), "p", HashMap::new())
                .await;
        }
        let page = store.get_history(2, 1);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].original_message, "m3");
        assert!(store.get_history(10, 50).is_empty());
    }

    #[tokio::test]
    async fn get_by_id_finds_only_existing_entries() {
        let store = empty_store().await;
        let entry = store.add_message("hello", "ECHO: hello", HashMap::new()).await;
        assert_eq!(store.get_by_id(&entry.id).unwrap().id, entry.id);
        assert!(store.get_by_id("nope").is_none());
    }

    #[tokio::test]
    async fn search_is_case_insensitive_over_both_forms() {
        let store = empty_store().await;
        store.add_message("Hello World", "ECHO: Hello World", HashMap::new()).await;
        store.add_message("other", "ECHO: other", HashMap::new()).await;
        store.add_message("more hello", "ECHO: more hello", HashMap::new()).await;

        let hits = store.search("HELLO");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].original_message, "more hello");
        assert_eq!(hits[1].original_message, "Hello World");
        assert!(store.search("absent").is_empty());
    }

    #[tokio::test]
    async fn persisted_history_survives_a_reload() {
        let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new());
        let store =
            HistoryStore::load(Arc::clone(&cache), clock(), Duration::from_secs(1)).await;
        store.add_message("keep me", "ECHO: keep me", HashMap::new()).await;

        let reloaded = HistoryStore::load(cache, clock(), Duration::from_secs(1)).await;
        let all = reloaded.get_history(10, 0);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].original_message, "keep me");
    }

    #[tokio::test]
    async fn malformed_persisted_data_falls_back_to_empty() {
        let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new());
        cache
            .set(HISTORY_KEY, serde_json::json!("not a list"), PERSIST_TTL)
            .await
            .unwrap();
        let store = HistoryStore::load(cache, clock(), Duration::from_secs(1)).await;
        assert!(store.get_history(10, 0).is_empty());
    }

    #[tokio::test]
    async fn cache_failures_leave_memory_authoritative() {
        let store =
            HistoryStore::load(Arc::new(FailingCache), clock(), Duration::from_secs(1)).await;
        store.add_message("still here", "ECHO: still here", HashMap::new()).await;
        assert_eq!(store.get_history(10, 0).len(), 1);
    }

    #[tokio::test]
    async fn clear_empties_the_list() {
        let store = empty_store().await;
        store.add_message("a", "ECHO: a", HashMap::new()).await;
        store.clear().await;
        assert!(store.get_history(10, 0).is_empty());
    }
}
