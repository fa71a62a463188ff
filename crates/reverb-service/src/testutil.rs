use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reverb_core::{Cache, Clock, Result, ReverbError};

use crate::transform::IndicatorSource;

/// Settable clock for driving time-dependent paths in tests.
pub struct MockClock {
    now: Mutex<DateTime<Utc>>,
}

impl MockClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += delta;
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub struct FixedIndicator(pub &'static str);

impl IndicatorSource for FixedIndicator {
    fn pick(&self) -> &'static str {
        self.0
    }
}

/// Cache backend where every operation fails, for exercising the
/// best-effort persistence and unhealthy paths.
pub struct FailingCache;

#[async_trait]
impl Cache for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<serde_json::Value>> {
        Err(ReverbError::Persistence("cache unreachable".into()))
    }

    async fn set(&self, _key: &str, _value: serde_json::Value, _ttl: Duration) -> Result<()> {
        Err(ReverbError::Persistence("cache unreachable".into()))
    }
}
