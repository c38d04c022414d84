use std::time::Duration;

const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// What a worker does when the time-series store refuses a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteFailurePolicy {
    /// Stop the worker and bring the process down.
    Fatal,
    /// Log the failure and discard the point.
    DropAndLog,
    /// Retry with exponential backoff, then discard the point.
    Retry {
        max_attempts: u32,
        base_delay: Duration,
    },
}

impl WriteFailurePolicy {
    pub fn max_attempts(&self) -> u32 {
        match self {
            Self::Retry { max_attempts, .. } => (*max_attempts).max(1),
            Self::Fatal | Self::DropAndLog => 1,
        }
    }

    /// Delay to wait after the given failed attempt (1-based), capped at one minute.
    pub fn backoff(&self, failed_attempt: u32) -> Duration {
        match self {
            Self::Retry { base_delay, .. } => {
                let exponent = failed_attempt.saturating_sub(1).min(16);
                base_delay.saturating_mul(1_u32 << exponent).min(MAX_BACKOFF)
            }
            Self::Fatal | Self::DropAndLog => Duration::ZERO,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Fatal => "fatal",
            Self::DropAndLog => "drop",
            Self::Retry { .. } => "retry",
        }
    }
}
