use postwatch_core::CoreError;
use tracing::warn;

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 20;

/// Cumulative allowance of failed requests for one client.
///
/// Failures are never forgiven: a success does not reset the count. Once the
/// count goes past `threshold` every further check fails.
#[derive(Debug, Clone)]
pub struct FailureBudget {
    threshold: u32,
    failures: u32,
}

impl FailureBudget {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            failures: 0,
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn is_exhausted(&self) -> bool {
        self.failures > self.threshold
    }

    /// Counts one failure and reports whether the budget still holds.
    pub fn record_failure(&mut self, operation: &str) -> Result<(), CoreError> {
        self.failures = self.failures.saturating_add(1);
        warn!(
            "{} failed: FAILURE #{} of {} allowed",
            operation, self.failures, self.threshold
        );
        self.check()
    }

    pub fn check(&self) -> Result<(), CoreError> {
        if self.is_exhausted() {
            return Err(CoreError::FailureBudgetExhausted {
                failures: self.failures,
                threshold: self.threshold,
            });
        }
        Ok(())
    }
}

impl Default for FailureBudget {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_THRESHOLD)
    }
}
