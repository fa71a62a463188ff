use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDateTime, Utc};
use reverb_core::{Clock, StatsView};

const RECENT_MESSAGES_MAX: usize = 10;
const HOUR_BUCKET_FORMAT: &str = "%Y-%m-%d %H:00:00";
const ROLLING_WINDOW_HOURS: i64 = 24;

struct StatsInner {
    total_requests: u64,
    total_processing_time_ms: f64,
    request_counts_by_hour: HashMap<String, u64>,
    recent_messages: VecDeque<String>,
}

/// Process-wide request statistics. One instance lives for the lifetime
/// of the service; every mutation happens under a single lock so
/// concurrent echoes never interleave a read-modify-write.
pub struct StatsTracker {
    clock: Arc<dyn Clock>,
    start_time: DateTime<Utc>,
    inner: Mutex<StatsInner>,
}

impl StatsTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let start_time = clock.now();
        Self {
            clock,
            start_time,
            inner: Mutex::new(StatsInner {
                total_requests: 0,
                total_processing_time_ms: 0.0,
                request_counts_by_hour: HashMap::new(),
                recent_messages: VecDeque::new(),
            }),
        }
    }

    /// Records one processed request. Buckets older than the 24 h window
    /// are pruned on every call, so readers only ever see live buckets.
    pub fn record(&self, message: &str, elapsed_ms: f64) {
        let now = self.clock.now();
        let hour_key = now.format(HOUR_BUCKET_FORMAT).to_string();
        let cutoff = (now - chrono::Duration::hours(ROLLING_WINDOW_HOURS)).naive_utc();

        let mut inner = self.inner.lock().unwrap();
        inner.total_requests += 1;
        inner.total_processing_time_ms += elapsed_ms;
        *inner.request_counts_by_hour.entry(hour_key).or_insert(0) += 1;
        inner.request_counts_by_hour.retain(|key, _| {
            NaiveDateTime::parse_from_str(key, "%Y-%m-%d %H:%M:%S")
                .map(|bucket| bucket >= cutoff)
                .unwrap_or(false)
        });

        inner.recent_messages.push_front(message.to_string());
        inner.recent_messages.truncate(RECENT_MESSAGES_MAX);
    }

    pub fn snapshot(&self, detailed: bool) -> StatsView {
        let inner = self.inner.lock().unwrap();
        let average_processing_time_ms = if inner.total_requests > 0 {
            inner.total_processing_time_ms / inner.total_requests as f64
        } else {
            0.0
        };

        StatsView {
            total_requests: inner.total_requests,
            average_processing_time_ms,
            uptime_seconds: (self.clock.now() - self.start_time).num_seconds(),
            request_counts_by_hour: if detailed {
                inner.request_counts_by_hour.clone()
            } else {
                HashMap::new()
            },
            recent_messages: if detailed {
                inner.recent_messages.iter().cloned().collect()
            } else {
                Vec::new()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockClock;
    use chrono::TimeZone;

    fn tracker_at(clock: Arc<MockClock>) -> StatsTracker {
        StatsTracker::new(clock)
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn average_is_zero_before_any_request() {
        let tracker = tracker_at(Arc::new(MockClock::at(start())));
        let view = tracker.snapshot(false);
        assert_eq!(view.total_requests, 0);
        assert_eq!(view.average_processing_time_ms, 0.0);
    }

    #[test]
    fn record_accumulates_counts_and_average() {
        let tracker = tracker_at(Arc::new(MockClock::at(start())));
        tracker.record("a", 10.0);
        tracker.record("b", 20.0);
        let view = tracker.snapshot(false);
        assert_eq!(view.total_requests, 2);
        assert!((view.average_processing_time_ms - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn recent_messages_are_capped_at_ten_newest_first() {
        let tracker = tracker_at(Arc::new(MockClock::at(start())));
        for i in 0..15 {
            tracker.record(&format!("msg-{i}"), 1.0);
        }
        let view = tracker.snapshot(true);
        assert_eq!(view.recent_messages.len(), 10);
        assert_eq!(view.recent_messages[0], "msg-14");
        assert_eq!(view.recent_messages[9], "msg-5");
    }

    #[test]
    fn non_detailed_snapshot_omits_buckets_and_recent() {
        let tracker = tracker_at(Arc::new(MockClock::at(start())));
        tracker.record("a", 1.0);
        let view = tracker.snapshot(false);
        assert!(view.request_counts_by_hour.is_empty());
        assert!(view.recent_messages.is_empty());
    }

    #[test]
    fn buckets_older_than_the_window_are_pruned() {
        let clock = Arc::new(MockClock::at(start()));
        let tracker = tracker_at(Arc::clone(&clock));
        tracker.record("old", 1.0);
        clock.advance(chrono::Duration::hours(25));
        tracker.record("new", 1.0);

        let view = tracker.snapshot(true);
        assert_eq!(view.request_counts_by_hour.len(), 1);
        assert_eq!(
            view.request_counts_by_hour.get("2024-03-02 11:00:00"),
            Some(&1)
        );
        // The counter itself is monotonic; pruning never decrements it.
        assert_eq!(view.total_requests, 2);
    }

    #[test]
    fn uptime_tracks_the_clock() {
        let clock = Arc::new(MockClock::at(start()));
        let tracker = tracker_at(Arc::clone(&clock));
        clock.advance(chrono::Duration::seconds(90));
        assert_eq!(tracker.snapshot(false).uptime_seconds, 90);
    }
}
