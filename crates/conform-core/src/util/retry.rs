//! Bounded retry for validators that drive flaky external tools.

use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{info, warn};

use crate::validators::Verdict;

/// Failure fragments that mark an external tool failure as transient.
pub const TRANSIENT_ERRORS: &[&str] = &[
    "Cannot connect to the Docker daemon",
    "spawn ETXTBSY",
];

/// Number of re-invocations after the first failed attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// When and how often a failed verdict is re-attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_on: Vec<String>,
    /// Base pause between attempts; a small jitter is added on top when non-zero.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_on: TRANSIENT_ERRORS.iter().map(|s| s.to_string()).collect(),
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            retry_on: vec![],
            delay: Duration::ZERO,
        }
    }

    pub fn is_transient(&self, verdict: &Verdict) -> bool {
        !verdict.passed && self.retry_on.iter().any(|m| verdict.message.contains(m.as_str()))
    }

    fn pause(&self) {
        if self.delay.is_zero() {
            return;
        }
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0);
        let jitter = Duration::from_millis(u64::from(nanos % 500));
        thread::sleep(self.delay + jitter);
    }
}

/// Run `attempt` until it passes, fails for a non-transient reason, or the
/// retry budget is spent. The last verdict is returned as-is.
pub fn with_retry<F>(policy: &RetryPolicy, label: &str, mut attempt: F) -> Verdict
where
    F: FnMut() -> Verdict,
{
    let mut retries = 0;
    loop {
        let verdict = attempt();
        if !policy.is_transient(&verdict) {
            return verdict;
        }
        if retries >= policy.max_retries {
            warn!(%label, retries, "retry budget exhausted");
            return verdict;
        }
        retries += 1;
        warn!(%label, "retryable error message found in output");
        info!(%label, "retrying {retries}/{}", policy.max_retries);
        policy.pause();
    }
}
