use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reverb_core::{
    Clock, EchoRequest, EchoResponse, EventBus, HealthReport, HistoryEntry, HistoryPage,
    MessageProcessed, Result, ReverbError, StatsView,
};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::health::HealthEvaluator;
use crate::history::HistoryStore;
use crate::stats::StatsTracker;
use crate::transform::{IndicatorSource, MessageTransformer};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
const STREAM_BUFFER: usize = 16;
const EVENT_BUS_CAPACITY: usize = 64;
const HISTORY_COUNT_PROBE: usize = 1000;

/// The echo endpoint set. Owns the transformer, stats, history and health
/// collaborators; one instance is shared across all in-flight calls.
pub struct EchoService {
    transformer: MessageTransformer,
    stats: Arc<StatsTracker>,
    history: Arc<HistoryStore>,
    health: HealthEvaluator,
    events: Arc<EventBus>,
    clock: Arc<dyn Clock>,
}

impl EchoService {
    pub async fn new(
        cache: Arc<dyn reverb_core::Cache>,
        clock: Arc<dyn Clock>,
        indicators: Arc<dyn IndicatorSource>,
        cache_op_timeout: Duration,
    ) -> Self {
        let stats = Arc::new(StatsTracker::new(Arc::clone(&clock)));
        let history = Arc::new(
            HistoryStore::load(Arc::clone(&cache), Arc::clone(&clock), cache_op_timeout).await,
        );
        let health = HealthEvaluator::new(cache, Arc::clone(&stats), cache_op_timeout);

        Self {
            transformer: MessageTransformer::new(Arc::clone(&clock), indicators),
            stats,
            history,
            health,
            events: Arc::new(EventBus::new(EVENT_BUS_CAPACITY)),
            clock,
        }
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Unary echo. Rejects empty or whitespace-only messages before any
    /// state is touched, so a failed call leaves stats and history exactly
    /// as they were.
    pub async fn echo(&self, request: EchoRequest) -> Result<EchoResponse> {
        info!("Echo request received: {}", request.message);

        if request.message.trim().is_empty() {
            return Err(ReverbError::InvalidInput("message cannot be empty".into()));
        }

        let started = Instant::now();
        let processed = self.transformer.transform(&request.message);
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        self.stats.record(&request.message, elapsed_ms);

        let now = self.clock.now();
        let metadata = HashMap::from([
            (
                "processed_at".to_string(),
                now.format("%Y-%m-%d %H:%M:%S").to_string(),
            ),
            ("request_id".to_string(), Uuid::new_v4().to_string()),
            ("server_version".to_string(), SERVER_VERSION.to_string()),
        ]);

        self.history
            .add_message(&request.message, &processed, metadata.clone())
            .await;

        let mut tags = request.tags.clone();
        tags.push("echoed".into());
        tags.push("processed".into());

        self.events.publish(MessageProcessed {
            original_message: request.message.clone(),
            processed_message: processed.clone(),
            tags: tags.clone(),
        });

        debug!("Echo response sent in {elapsed_ms:.3} ms");

        Ok(EchoResponse {
            message: processed,
            original_message: request.message,
            timestamp: now.timestamp_micros(),
            processing_time_ms: elapsed_ms as u64,
            metadata,
            tags,
        })
    }

    /// Streaming echo. One response per non-empty inbound request, in
    /// arrival order; empty messages are skipped silently. Stats are
    /// updated per item but history is not written on this path. The task
    /// ends when the inbound channel closes, or early when the caller
    /// drops the returned receiver.
    pub fn stream_echo(
        self: &Arc<Self>,
        mut inbound: mpsc::Receiver<EchoRequest>,
    ) -> mpsc::Receiver<EchoResponse> {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let service = Arc::clone(self);

        tokio::spawn(async move {
            info!("Stream echo session started");
            while let Some(request) = inbound.recv().await {
                if request.message.trim().is_empty() {
                    debug!("Skipping empty message in stream");
                    continue;
                }

                let started = Instant::now();
                let processed = service.transformer.transform(&request.message);
                let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                service.stats.record(&request.message, elapsed_ms);

                let response = EchoResponse {
                    message: processed,
                    original_message: request.message,
                    timestamp: service.clock.now().timestamp_micros(),
                    processing_time_ms: elapsed_ms as u64,
                    metadata: HashMap::new(),
                    tags: request.tags,
                };
                if tx.send(response).await.is_err() {
                    break;
                }
            }
            info!("Stream echo session ended");
        });

        rx
    }

    pub fn get_stats(&self, include_detailed: bool) -> StatsView {
        debug!("Stats request received");
        self.stats.snapshot(include_detailed)
    }

    pub fn get_history(&self, limit: i64, offset: i64) -> HistoryPage {
        debug!("Message history request received: limit={limit} offset={offset}");
        let limit = if limit > 0 { limit as usize } else { 10 };
        let offset = if offset >= 0 { offset as usize } else { 0 };

        HistoryPage {
            messages: self.history.get_history(limit, offset),
            total_count: self.history.get_history(HISTORY_COUNT_PROBE, 0).len() as u64,
        }
    }

    pub fn get_history_entry(&self, id: &str) -> Option<HistoryEntry> {
        self.history.get_by_id(id)
    }

    pub fn search_history(&self, query: &str, limit: i64) -> HistoryPage {
        debug!("Message history search request received: query={query}");
        let limit = if limit > 0 { limit as usize } else { 10 };

        let mut matches = self.history.search(query);
        let total_count = matches.len() as u64;
        matches.truncate(limit);

        HistoryPage {
            messages: matches,
            total_count,
        }
    }

    pub async fn clear_history(&self) {
        self.history.clear().await;
    }

    pub async fn health_check(&self, include_details: bool) -> HealthReport {
        self.health.evaluate(include_details).await
    }
}
