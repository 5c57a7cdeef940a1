//! Serial failover across the resolved endpoints of one server.

use std::net::SocketAddr;
use std::time::Duration;

use log::debug;
use tokio::sync::watch;
use tokio::time::{self, Instant};

use crate::packet::Packet;
use crate::query::cancelled;
use crate::query::single::{self, Exchange, Fault};

/// Default time allotted to a whole endpoint series.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Queries `endpoints` one at a time until one of them succeeds, the list
/// is exhausted, the overall deadline elapses, or the caller cancels.
///
/// A send, receive, or per-attempt timeout failure advances the series to
/// the next endpoint; only the terminal attempt's outcome is reported.
/// The overall deadline is independent of each attempt's own and tears the
/// current attempt down when it fires. Each attempt gets `attempt_timeout`.
///
/// # Panics
///
/// Panics if `endpoints` is empty.
pub async fn run(
    endpoints: &[SocketAddr],
    timeout: Duration,
    attempt_timeout: Duration,
    mut cancel: watch::Receiver<bool>,
) -> Exchange {
    assert!(!endpoints.is_empty(), "no endpoints to query");
    let deadline = Instant::now() + timeout;
    let last = endpoints.len() - 1;
    for (index, &endpoint) in endpoints.iter().enumerate() {
        let attempt_started = Instant::now();
        let watcher = cancel.clone();
        let exchange = tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => Exchange {
                endpoint,
                fault: Some(Fault::Cancelled),
                packet: Packet::default(),
                round_trip: attempt_started.elapsed(),
            },
            () = time::sleep_until(deadline) => {
                debug!("series deadline elapsed while querying {endpoint}");
                return Exchange {
                    endpoint,
                    fault: Some(Fault::Timeout),
                    packet: Packet::default(),
                    round_trip: attempt_started.elapsed(),
                };
            }
            exchange = single::run(endpoint, attempt_timeout, watcher) => exchange,
        };
        match exchange.fault {
            Some(Fault::Send | Fault::Receive | Fault::Timeout) if index < last => {
                debug!("{endpoint} failed with {:?}, advancing", exchange.fault);
            }
            _ => return exchange,
        }
    }
    unreachable!("the last attempt always reports")
}
