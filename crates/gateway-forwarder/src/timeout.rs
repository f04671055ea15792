//! The idle-read-timeout / total-deadline-timeout pair guarding a single
//! upstream attempt.
//!
//! Adapted from `tower_resilience_timelimiter::TimeLimiter`'s single
//! `tokio::time::timeout` wrapper: the forwarder needs two independent
//! clocks rather than one — an idle timer that resets on every chunk
//! received, and a deadline that runs from the start of the attempt and
//! never resets. Either one firing ends the attempt the same way the
//! teacher's single timeout does.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct AttemptDeadlines {
    pub idle_read_timeout: Duration,
    pub total_deadline: Duration,
}

/// Tracks the two clocks for one attempt. `idle` resets every time
/// [`AttemptClock::record_chunk`] is called; `deadline` is fixed at
/// construction.
pub struct AttemptClock {
    started_at: Instant,
    last_chunk_at: Instant,
    deadlines: AttemptDeadlines,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineExpired {
    IdleRead,
    TotalDeadline,
}

impl AttemptClock {
    pub fn start(deadlines: AttemptDeadlines) -> Self {
        let now = Instant::now();
        Self {
            started_at: now,
            last_chunk_at: now,
            deadlines,
        }
    }

    pub fn record_chunk(&mut self) {
        self.last_chunk_at = Instant::now();
    }

    /// The shorter of "time left before the idle timer fires" and "time left
    /// before the total deadline fires" — what the next read should be
    /// bounded by.
    pub fn next_wait(&self) -> Duration {
        let idle_remaining = self
            .deadlines
            .idle_read_timeout
            .saturating_sub(self.last_chunk_at.elapsed());
        let total_remaining = self
            .deadlines
            .total_deadline
            .saturating_sub(self.started_at.elapsed());
        idle_remaining.min(total_remaining)
    }

    pub fn expired(&self) -> Option<DeadlineExpired> {
        if self.started_at.elapsed() >= self.deadlines.total_deadline {
            Some(DeadlineExpired::TotalDeadline)
        } else if self.last_chunk_at.elapsed() >= self.deadlines.idle_read_timeout {
            Some(DeadlineExpired::IdleRead)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    fn deadlines() -> AttemptDeadlines {
        AttemptDeadlines {
            idle_read_timeout: Duration::from_millis(30),
            total_deadline: Duration::from_millis(100),
        }
    }

    #[tokio::test]
    async fn fresh_clock_has_not_expired() {
        let clock = AttemptClock::start(deadlines());
        assert!(clock.expired().is_none());
    }

    #[tokio::test]
    async fn idle_timeout_fires_without_chunks() {
        let clock = AttemptClock::start(deadlines());
        sleep(Duration::from_millis(40)).await;
        assert_eq!(clock.expired(), Some(DeadlineExpired::IdleRead));
    }

    #[tokio::test]
    async fn recording_a_chunk_resets_the_idle_timer() {
        let mut clock = AttemptClock::start(deadlines());
        sleep(Duration::from_millis(20)).await;
        clock.record_chunk();
        sleep(Duration::from_millis(20)).await;
        assert!(clock.expired().is_none());
    }

    #[tokio::test]
    async fn total_deadline_fires_even_with_fresh_chunks() {
        let mut clock = AttemptClock::start(deadlines());
        for _ in 0..4 {
            sleep(Duration::from_millis(30)).await;
            clock.record_chunk();
        }
        assert_eq!(clock.expired(), Some(DeadlineExpired::TotalDeadline));
    }
}
