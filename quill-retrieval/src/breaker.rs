use std::time::Duration;

use tokio::time::Instant;

/// Suppresses retrieval calls to the network path for `cooldown` after a
/// timeout or hard error, routing callers to the lexical fallback instead.
pub struct CircuitBreaker {
    cooldown: Duration,
    tripped_at: Option<Instant>,
}

impl CircuitBreaker {
    pub fn new(cooldown: Duration) -> Self {
        Self { cooldown, tripped_at: None }
    }

    pub fn is_open(&self) -> bool {
        match self.tripped_at {
            Some(at) => at.elapsed() < self.cooldown,
            None => false,
        }
    }

    pub fn trip(&mut self) {
        self.tripped_at = Some(Instant::now());
    }

    pub fn reset(&mut self) {
        self.tripped_at = None;
    }
}
