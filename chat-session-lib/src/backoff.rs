use std::time::Duration;

use shared::protocol::{RECONNECT_INITIAL_MS, RECONNECT_MAX_MS};

/// Exponential reconnect backoff: `min(max, initial * 2^attempt)`.
///
/// The attempt counter advances every time a reconnect is scheduled and only
/// goes back to zero after a channel actually opens. There is no attempt
/// limit; the delay just stays at the cap.
#[derive(Debug, Clone)]
pub struct Backoff {
    attempt: u32,
    initial_ms: u64,
    max_ms: u64,
}

impl Backoff {
    pub fn new() -> Self {
        Self::with_bounds(RECONNECT_INITIAL_MS, RECONNECT_MAX_MS)
    }

    pub fn with_bounds(initial_ms: u64, max_ms: u64) -> Self {
        Self {
            attempt: 0,
            initial_ms,
            max_ms,
        }
    }

    /// Delay for a given attempt number, without touching the counter
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.initial_ms.saturating_mul(factor).min(self.max_ms))
    }

    /// Delay for the next reconnect; advances the counter
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.delay_for(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Called once a channel has opened
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn millis(delays: impl IntoIterator<Item = Duration>) -> Vec<u128> {
        delays.into_iter().map(|d| d.as_millis()).collect()
    }

    #[test]
    fn sequence_doubles_until_cap() {
        let mut backoff = Backoff::new();
        let delays = millis((0..7).map(|_| backoff.next_delay()));
        assert_eq!(delays, vec![500, 1000, 2000, 4000, 8000, 16000, 30000]);
        assert_eq!(backoff.attempt(), 7);
    }

    #[test]
    fn stays_at_cap_forever() {
        let backoff = Backoff::new();
        assert_eq!(backoff.delay_for(20).as_millis(), 30000);
        assert_eq!(backoff.delay_for(64).as_millis(), 30000);
        assert_eq!(backoff.delay_for(u32::MAX).as_millis(), 30000);
    }

    #[test]
    fn reset_starts_over() {
        let mut backoff = Backoff::new();
        backoff.next_delay();
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay().as_millis(), 500);
    }
}
