//! Resource waiting with exponential backoff.
//!
//! Polls an async condition (an EC2 resource reaching a state, a port
//! accepting connections) until it holds, with jittered exponential delays
//! between checks and an overall timeout.

use anyhow::Result;
use backon::{BackoffBuilder, ExponentialBuilder};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for resource waiting with exponential backoff.
#[derive(Debug, Clone)]
pub struct WaitConfig {
    /// Initial delay between checks
    pub initial_delay: Duration,
    /// Maximum delay between checks (cap for exponential growth)
    pub max_delay: Duration,
    /// Maximum total time to wait before timeout
    pub timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            timeout: Duration::from_secs(60),
        }
    }
}

impl WaitConfig {
    /// 2s-15s backoff used for EC2 state polling
    pub fn ec2_polling(timeout: Duration) -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(15),
            timeout,
        }
    }
}

/// Wait for a resource to become ready with exponential backoff.
///
/// `check` returns `Ok(true)` when ready and `Ok(false)` to try again. An
/// error from `check` ends the wait immediately, as does exceeding
/// `config.timeout`.
///
/// # Example
/// ```ignore
/// wait_for_resource(
///     WaitConfig::default(),
///     || async {
///         let ready = check_if_resource_exists().await;
///         Ok(ready)
///     },
///     "my-resource",
/// ).await?;
/// ```
pub async fn wait_for_resource<F, Fut>(
    config: WaitConfig,
    check: F,
    resource_name: &str,
) -> Result<()>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let start = std::time::Instant::now();
    let mut attempts = 0u32;

    let backoff = ExponentialBuilder::default()
        .with_min_delay(config.initial_delay)
        .with_max_delay(config.max_delay)
        .with_factor(2.0)
        .with_jitter()
        .build();

    let mut delays = backoff.into_iter();

    loop {
        attempts += 1;

        if start.elapsed() >= config.timeout {
            anyhow::bail!(
                "Timeout waiting for {} after {:?} ({} attempts)",
                resource_name,
                config.timeout,
                attempts - 1
            );
        }

        match check().await {
            Ok(true) => {
                debug!(resource = %resource_name, attempts, "Resource ready");
                return Ok(());
            }
            Ok(false) => {
                let delay = delays.next().unwrap_or(config.max_delay);
                debug!(
                    resource = %resource_name,
                    attempt = attempts,
                    delay_ms = delay.as_millis(),
                    "Resource not ready, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                warn!(resource = %resource_name, error = ?e, "Resource check failed");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> WaitConfig {
        WaitConfig {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn returns_once_check_succeeds() {
        let calls = AtomicU32::new(0);
        wait_for_resource(
            fast(),
            || async { Ok(calls.fetch_add(1, Ordering::SeqCst) >= 2) },
            "test-resource",
        )
        .await
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn check_error_aborts_the_wait() {
        let calls = AtomicU32::new(0);
        let err = wait_for_resource(
            fast(),
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("snapshot entered error state")
            },
            "test-resource",
        )
        .await
        .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(err.to_string().contains("error state"));
    }

    #[tokio::test]
    async fn times_out_when_never_ready() {
        let config = WaitConfig {
            timeout: Duration::from_millis(30),
            ..fast()
        };
        let err = wait_for_resource(config, || async { Ok(false) }, "never-ready")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Timeout waiting for never-ready"));
    }
}
