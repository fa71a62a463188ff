use std::sync::Arc;

use rand::Rng;
use reverb_core::Clock;

pub const INDICATORS: [&str; 5] = ["✓", "⚡", "🚀", "✨", "🎯"];

/// Picks the trailing indicator symbol. Injected so tests can pin it.
pub trait IndicatorSource: Send + Sync {
    fn pick(&self) -> &'static str;
}

pub struct RandomIndicator;

impl IndicatorSource for RandomIndicator {
    fn pick(&self) -> &'static str {
        INDICATORS[rand::thread_rng().gen_range(0..INDICATORS.len())]
    }
}

/// Turns a raw message into its echoed form. Total for non-empty input;
/// emptiness is rejected before this is reached.
pub struct MessageTransformer {
    clock: Arc<dyn Clock>,
    indicators: Arc<dyn IndicatorSource>,
}

impl MessageTransformer {
    pub fn new(clock: Arc<dyn Clock>, indicators: Arc<dyn IndicatorSource>) -> Self {
        Self { clock, indicators }
    }

    pub fn transform(&self, message: &str) -> String {
        format!(
            "ECHO: {message} [Processed at {}] {}",
            self.clock.now().format("%Y-%m-%d %H:%M:%S"),
            self.indicators.pick()
        )
    }
}
