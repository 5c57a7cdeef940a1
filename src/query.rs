//! One NTP query from start to end: name resolution, endpoint failover,
//! deadline enforcement, and status mapping.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::net::lookup_host;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;

use crate::packet::Packet;

pub mod series;
pub mod single;

use single::Fault;

/// Default end-to-end query timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// NTP port used when the queried server name does not carry one.
const DEFAULT_PORT: &str = "123";

/// Final status of a NTP query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The server domain name is not resolved.
    ResolveError,
    /// The client packet is not sent to the server.
    SendError,
    /// The server packet is not received by the client.
    ReceiveError,
    /// The query timed out while waiting for the server's packet.
    TimeoutError,
    /// The client cancelled the query.
    Cancelled,
    /// The client received the server's packet successfully.
    Succeeded,
}

/// Everything a finished query reports back to its caller.
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// NTP server name as it was provided by the caller.
    pub server: String,
    /// Address of the endpoint the terminal attempt targeted, if the server
    /// name was resolved and an attempt was reached.
    pub address: Option<SocketAddr>,
    /// Final status of the query.
    pub status: Status,
    /// The server's reply on success, the unsent client packet on a send
    /// error, or a null packet otherwise.
    pub packet: Packet,
    /// Elapsed time of the terminal attempt, or zero if none was reached.
    pub round_trip: Duration,
}

/// Type of query callback.
pub type Callback = Arc<dyn Fn(QueryResult) + Send + Sync>;

/// A cancellable handle to one NTP query in flight.
///
/// The query itself runs as a task on the runtime it was started on; the
/// handle only carries the cancellation signal and a liveness check, so
/// dropping it neither cancels nor detaches the query.
pub struct Query {
    signal: watch::Sender<bool>,
    pub(crate) task: JoinHandle<()>,
}

impl Query {
    /// Starts querying all resolved addresses of `server` one at a time
    /// until success, reporting the result through `callback` exactly once.
    ///
    /// `server` is a domain name or an IP address, optionally along with a
    /// numeric port number in the form `host[:port]`. The default port is
    /// 123. `timeout` is the end-to-end ceiling on the whole query; the
    /// per-attempt and per-series deadlines apply beneath it.
    pub fn start(runtime: &Handle, server: &str, callback: Callback, timeout: Duration) -> Self {
        let (signal, watcher) = watch::channel(false);
        let task = runtime.spawn(run(server.to_owned(), callback, timeout, watcher));
        Self { signal, task }
    }

    /// Cancels the query, reporting [`Status::Cancelled`] to the caller.
    /// Safe to call from any thread, any number of times, at any point of
    /// the query's life.
    pub fn cancel(&self) {
        let _ = self.signal.send(true);
    }

    /// Returns whether the query has finished and its callback has run.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Resolves once the cancellation signal fires. If the signal's sender is
/// gone the query can no longer be cancelled, so the future parks forever
/// instead.
pub(crate) async fn cancelled(signal: &mut watch::Receiver<bool>) {
    if signal.wait_for(|cancel| *cancel).await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn run(server: String, callback: Callback, timeout: Duration, mut cancel: watch::Receiver<bool>) {
    debug!("querying {server} within {timeout:?}");
    let watcher = cancel.clone();
    let result = tokio::select! {
        biased;
        _ = cancelled(&mut cancel) => QueryResult {
            server: server.clone(),
            address: None,
            status: Status::Cancelled,
            packet: Packet::default(),
            round_trip: Duration::ZERO,
        },
        () = time::sleep(timeout) => QueryResult {
            server: server.clone(),
            address: None,
            status: Status::TimeoutError,
            packet: Packet::default(),
            round_trip: Duration::ZERO,
        },
        result = resolve_and_query(&server, watcher) => result,
    };
    debug!("{} finished with {:?}", result.server, result.status);
    callback(result);
}

async fn resolve_and_query(server: &str, cancel: watch::Receiver<bool>) -> QueryResult {
    let endpoints = match resolve(server).await {
        Some(endpoints) => endpoints,
        None => {
            debug!("failed to resolve {server}");
            return QueryResult {
                server: server.to_owned(),
                address: None,
                status: Status::ResolveError,
                packet: Packet::default(),
                round_trip: Duration::ZERO,
            };
        }
    };
    debug!("resolved {server} to {} address(es)", endpoints.len());
    let exchange = series::run(
        &endpoints,
        series::DEFAULT_TIMEOUT,
        single::DEFAULT_TIMEOUT,
        cancel,
    )
    .await;
    QueryResult {
        server: server.to_owned(),
        address: Some(exchange.endpoint),
        status: match exchange.fault {
            None => Status::Succeeded,
            Some(Fault::Send) => Status::SendError,
            Some(Fault::Receive) => Status::ReceiveError,
            Some(Fault::Timeout) => Status::TimeoutError,
            Some(Fault::Cancelled) => Status::Cancelled,
        },
        packet: exchange.packet,
        round_trip: exchange.round_trip,
    }
}

async fn resolve(server: &str) -> Option<Vec<SocketAddr>> {
    let (host, port) = match server.split_once(':') {
        Some((host, port)) => (host, port),
        None => (server, DEFAULT_PORT),
    };
    let port = port.parse::<u16>().ok()?;
    let endpoints: Vec<SocketAddr> = lookup_host((host, port)).await.ok()?.collect();
    if endpoints.is_empty() {
        None
    } else {
        Some(endpoints)
    }
}
