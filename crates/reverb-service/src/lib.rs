pub mod health;
pub mod history;
pub mod service;
pub mod stats;
pub mod transform;

pub use health::HealthEvaluator;
pub use history::HistoryStore;
pub use service::EchoService;
pub use stats::StatsTracker;
pub use transform::{IndicatorSource, MessageTransformer, RandomIndicator};

#[cfg(test)]
pub(crate) mod testutil;
