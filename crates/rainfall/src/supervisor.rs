use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{error, info, warn};

/// Restart limits for a supervised task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    pub max_restarts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            max_restarts: 5,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl RestartPolicy {
    /// Delay before restart number `attempt` (0-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
    }
}

/// Re-runs a failing task with exponential backoff. A task that returns
/// `Ok` is considered finished and is not restarted.
#[derive(Debug, Clone)]
pub struct Supervisor {
    name: String,
    policy: RestartPolicy,
}

impl Supervisor {
    pub fn new(name: impl Into<String>, policy: RestartPolicy) -> Self {
        Self {
            name: name.into(),
            policy,
        }
    }

    /// Run `task` until it succeeds or the restart budget is spent.
    /// Returns the number of restarts used, or the last error.
    pub async fn run<F, Fut, E>(&self, mut task: F) -> Result<u32, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
    {
        let mut restarts = 0;
        loop {
            match task().await {
                Ok(()) => {
                    info!(task = %self.name, restarts, "supervised task finished");
                    return Ok(restarts);
                }
                Err(e) if restarts < self.policy.max_restarts => {
                    let delay = self.policy.backoff(restarts);
                    warn!(task = %self.name, error = %e, ?delay, "supervised task failed, restarting");
                    tokio::time::sleep(delay).await;
                    restarts += 1;
                }
                Err(e) => {
                    error!(task = %self.name, error = %e, restarts, "supervised task failed, giving up");
                    return Err(e);
                }
            }
        }
    }
}
