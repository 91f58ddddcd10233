use std::time::{Duration, Instant};
use tracing::info;

/// Logs when a long-running step starts and how long it took.
pub struct Timer {
    label: String,
    start: Instant,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        info!("Starting: {}", label);
        Self { label, start: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!("Finished: {} (took {:.2?})", self.label, self.elapsed());
    }
}

/// `y`/`n` cell for availability tables.
pub fn yes_no(available: bool) -> &'static str {
    if available { "y" } else { "n" }
}
