//! Polling for long-running runs until a terminal state.
//!
//! Triggering a run returns quickly; reaching a terminal state is a
//! separate polling loop. Each poll is an individually-retried remote read.
//! The caller decides what "terminal" means by mapping each poll response
//! into a [`PollState`].

use crate::error::{ClassifiedError, ErrorKind};
use crate::retry::{RetryPolicy, run_with_retry};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// One poll's verdict.
#[derive(Debug, Clone)]
pub enum PollState {
    /// Still running; carries the current status for logging.
    Running(String),
    /// Terminal; carries the final response.
    Terminal(Value),
}

#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(600),
            interval: Duration::from_secs(10),
        }
    }
}

/// Poll until terminal or until the timeout budget runs out. A timeout is a
/// NotReady classification: the resource may well finish later.
pub async fn wait_for_terminal<F, Fut>(
    retry: &RetryPolicy,
    op_name: &str,
    options: WaitOptions,
    mut poll: F,
) -> Result<Value, ClassifiedError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollState, ClassifiedError>>,
{
    let start = Instant::now();
    loop {
        if start.elapsed() > options.timeout {
            return Err(ClassifiedError::new(
                ErrorKind::NotReady,
                format!(
                    "{op_name} did not reach a terminal state within {:?}",
                    options.timeout
                ),
            ));
        }

        match run_with_retry(retry, op_name, || poll()).await? {
            PollState::Terminal(value) => return Ok(value),
            PollState::Running(status) => {
                debug!(
                    operation = op_name,
                    status,
                    elapsed_s = start.elapsed().as_secs(),
                    "still running"
                );
                tokio::time::sleep(options.interval).await;
            }
        }
    }
}
