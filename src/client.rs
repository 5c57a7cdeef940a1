//! User-facing multi-query NTP client facade.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::debug;
use tokio::runtime::{Builder, Runtime};

use crate::query::{Callback, Query, DEFAULT_TIMEOUT};

/// An asynchronous multi-query NTP client.
///
/// Typically a `Client` is constructed by passing a [`Callback`] to
/// [`with_callback`](Client::with_callback). Query requests are placed via
/// [`query`](Client::query) from any thread; once a query finishes, the
/// registered callback is invoked exactly once with a
/// [`QueryResult`](crate::QueryResult) carrying:
/// - the NTP server name as it was provided by the caller,
/// - the resolved address, if the server name resolved and an exchange was
///   reached,
/// - a [`Status`](crate::Status) flag indicating the final state of the
///   query,
/// - a [`Packet`](crate::Packet) with the server's reply on success, or a
///   null packet otherwise,
/// - the elapsed time of the terminal exchange.
///
/// A client created with [`new`](Client::new) has no registered callback
/// and discards the results of any queries placed on it; register one via
/// [`set_callback`](Client::set_callback) first.
///
/// The client first resolves the server name; if that fails,
/// [`Status::ResolveError`](crate::Status::ResolveError) is reported.
/// Otherwise it queries the resolved addresses one at a time until success
/// or exhaustion.
///
/// Each placed query has a total timeout, 5 seconds by default, after which
/// it is cancelled and reported with
/// [`Status::TimeoutError`](crate::Status::TimeoutError).
///
/// On drop, the client awaits all pending queries until completion, so it
/// never goes away while it still owes a callback invocation. If faster
/// teardown is needed, call [`cancel`](Client::cancel) first. Because the
/// drop blocks the current thread, a `Client` must not be dropped from
/// within an async context; it is a facade for synchronous callers.
pub struct Client {
    callback: Mutex<Option<Callback>>,
    registry: Mutex<Vec<Query>>,
    runtime: Runtime,
}

impl Client {
    /// Creates a client with no registered callback. Queries are still
    /// issuable, but their results are discarded until a callback is set.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the worker pool cannot be created.
    pub fn new() -> io::Result<Self> {
        Self::build(None)
    }

    /// Creates a client that reports the result of each placed query
    /// through `callback`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the worker pool cannot be created.
    pub fn with_callback(callback: Callback) -> io::Result<Self> {
        Self::build(Some(callback))
    }

    fn build(callback: Option<Callback>) -> io::Result<Self> {
        let runtime = Builder::new_multi_thread().enable_all().build()?;
        Ok(Self {
            callback: Mutex::new(callback),
            registry: Mutex::new(Vec::new()),
            runtime,
        })
    }

    /// Registers a callable for reporting query results back to the caller.
    /// Takes effect for subsequently placed queries; queries already in
    /// flight keep the callback they were started with.
    pub fn set_callback(&self, callback: Callback) {
        *self.callback.lock().unwrap() = Some(callback);
    }

    /// Places a NTP query with the default timeout \[thread-safe\].
    ///
    /// `server` is a domain name or an IP address, optionally along with a
    /// numeric port number in the form `host[:port]`. The default port
    /// is 123.
    pub fn query(&self, server: &str) {
        self.query_with_timeout(server, DEFAULT_TIMEOUT);
    }

    /// Places a NTP query that is cancelled and reported with
    /// [`Status::TimeoutError`](crate::Status::TimeoutError) if it does not
    /// complete within `timeout` \[thread-safe\].
    pub fn query_with_timeout(&self, server: &str, timeout: Duration) {
        let callback = self
            .callback
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Arc::new(|_| {}));
        let mut registry = self.registry.lock().unwrap();
        registry.retain(|query| !query.is_finished());
        registry.push(Query::start(self.runtime.handle(), server, callback, timeout));
    }

    /// Cancels all queries in flight \[thread-safe\]. Idempotent: cancelling
    /// an empty or already-finished set of queries is a no-op.
    pub fn cancel(&self) {
        let mut registry = self.registry.lock().unwrap();
        debug!("cancelling {} tracked query(ies)", registry.len());
        for query in registry.iter() {
            query.cancel();
        }
        registry.retain(|query| !query.is_finished());
    }

    /// Returns the number of tracked queries that have not finished yet
    /// \[thread-safe\].
    #[must_use]
    pub fn pending(&self) -> usize {
        self.registry
            .lock()
            .unwrap()
            .iter()
            .filter(|query| !query.is_finished())
            .count()
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        let queries = std::mem::take(&mut *self.registry.lock().unwrap());
        for query in queries {
            let _ = self.runtime.block_on(query.task);
        }
    }
}
