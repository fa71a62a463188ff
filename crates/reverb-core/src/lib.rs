pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod event_bus;
pub mod types;

pub use cache::{Cache, MemoryCache};
pub use clock::{Clock, SystemClock};
pub use config::{load_config, ReverbConfig};
pub use error::{Result, ReverbError};
pub use event_bus::{EventBus, MessageProcessed};
pub use types::{
    EchoRequest, EchoResponse, HealthReport, HistoryEntry, HistoryPage, ServingStatus, StatsView,
};
