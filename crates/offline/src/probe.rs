//! TCP reachability probe.

use crate::connectivity::{Reachability, ReachabilitySource, ReachabilityStream};
use async_stream::stream;
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;

/// Decides reachability by opening (and immediately dropping) a TCP
/// connection to the remote store.
///
/// # Examples
///
/// ```no_run
/// use cumulus_offline::{ConnectivityMonitor, TcpProbe};
/// use std::time::Duration;
///
/// # async fn example() {
/// let probe = TcpProbe::new("files.example.com:443", Duration::from_secs(15), Duration::from_secs(3));
/// let monitor = ConnectivityMonitor::from_source(&probe).await;
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TcpProbe {
    address: String,
    interval: Duration,
    timeout: Duration,
}
impl TcpProbe {
    pub fn new(address: impl Into<String>, interval: Duration, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            interval,
            timeout,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn check(&self) -> Reachability {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(_)) => Reachability::Reachable,
            Ok(Err(error)) => {
                tracing::debug!(address = %self.address, %error, "probe failed");
                Reachability::Unreachable
            },
            Err(_) => {
                tracing::debug!(address = %self.address, "probe timed out");
                Reachability::Unreachable
            },
        }
    }
}

#[async_trait]
impl ReachabilitySource for TcpProbe {
    async fn current(&self) -> Reachability {
        self.check().await
    }

    /// Probes forever, one signal per interval. The first signal comes
    /// straight away.
    fn signals(&self) -> ReachabilityStream<'_> {
        Box::pin(stream! {
            loop {
                yield self.check().await;
                tokio::time::sleep(self.interval).await;
            }
        })
    }
}
