use std::fmt;
use std::time::Duration;

/// Round-trip timing for the exchanges of one session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExchangeStats {
    exchanges: u64,
    failures: u64,
    total: Duration,
    max: Duration,
}

impl ExchangeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_success(&mut self, round_trip: Duration) {
        self.record(round_trip);
    }

    pub(crate) fn record_failure(&mut self, round_trip: Duration) {
        self.failures += 1;
        self.record(round_trip);
    }

    fn record(&mut self, round_trip: Duration) {
        self.exchanges += 1;
        self.total += round_trip;
        self.max = self.max.max(round_trip);
    }

    /// Exchanges attempted, successful or not.
    pub fn exchanges(&self) -> u64 {
        self.exchanges
    }

    /// Exchanges that ended without a valid response.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn successes(&self) -> u64 {
        self.exchanges - self.failures
    }

    /// Mean time from writing a request to the end of the decode attempt.
    pub fn mean_round_trip(&self) -> Option<Duration> {
        let n = u32::try_from(self.exchanges).ok().filter(|n| *n > 0)?;
        Some(self.total / n)
    }

    /// Slowest exchange so far; zero before the first.
    pub fn max_round_trip(&self) -> Duration {
        self.max
    }
}

impl fmt::Display for ExchangeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} exchanges, {} failed",
            self.exchanges, self.failures
        )?;
        if let Some(mean) = self.mean_round_trip() {
            write!(f, ", mean {mean:?}, max {:?}", self.max)?;
        }
        Ok(())
    }
}
