//! Millisecond session clock.
//!
//! Backed by `tokio::time::Instant` so paused-time tests drive frame
//! timestamps and ticker deadlines from the same source.

use tokio::time::Instant;

pub trait Clock: Send + Sync {
    /// Milliseconds since the clock's origin.  Monotonic.
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn follows_paused_time() {
        let clock = TokioClock::new();
        assert_eq!(clock.now_ms(), 0);
        tokio::time::sleep(Duration::from_millis(2950)).await;
        assert_eq!(clock.now_ms(), 2950);
    }
}
