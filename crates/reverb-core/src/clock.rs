use chrono::{DateTime, Utc};

/// Wall-clock source. Injected so the transform, stats and history code
/// can be driven deterministically in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
