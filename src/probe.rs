//! TCP reachability probe
//!
//! Decides the web server is reachable once its port accepts a connection.

use crate::wait::{WaitConfig, wait_for_resource};
use anyhow::Result;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, info};

/// Per-attempt connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Waits for a host to accept TCP connections.
#[allow(async_fn_in_trait)]
#[cfg_attr(test, mockall::automock)]
pub trait ReachabilityProbe: Send + Sync {
    async fn wait_until_reachable(&self, host: &str, port: u16, timeout: Duration) -> Result<()>;
}

/// Probe that opens (and drops) a TCP connection
#[derive(Debug, Clone)]
pub struct TcpProbe {
    initial_delay: Duration,
    max_delay: Duration,
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self::with_delays(Duration::from_secs(2), Duration::from_secs(15))
    }
}

impl TcpProbe {
    /// Probe with custom backoff delays between connection attempts
    pub fn with_delays(initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay,
        }
    }
}

impl ReachabilityProbe for TcpProbe {
    async fn wait_until_reachable(&self, host: &str, port: u16, timeout: Duration) -> Result<()> {
        let addr = format!("{}:{}", host, port);
        info!(
            addr = %addr,
            timeout_secs = timeout.as_secs(),
            "Waiting for server to accept connections"
        );

        let config = WaitConfig {
            initial_delay: self.initial_delay,
            max_delay: self.max_delay,
            timeout,
        };

        wait_for_resource(
            config,
            || async {
                match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr)).await {
                    Ok(Ok(_)) => Ok(true),
                    Ok(Err(e)) => {
                        debug!(addr = %addr, error = %e, "Connection refused or failed");
                        Ok(false)
                    }
                    Err(_) => {
                        debug!(addr = %addr, "Connection attempt timed out");
                        Ok(false)
                    }
                }
            },
            &format!("TCP {}", addr),
        )
        .await?;

        info!(addr = %addr, "Server is reachable");
        Ok(())
    }
}
