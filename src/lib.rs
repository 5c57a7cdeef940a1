//! Asynchronous multi-query NTP client
//!
//! # Overview
//!
//! This crate provides an asynchronous client for querying the current time
//! from NTP servers. A [`Client`] accepts any number of concurrent named
//! query requests, fans them out onto a shared worker pool, and reports the
//! outcome of each one exactly once through a registered callback, while
//! every query stays safely cancellable from any thread at any point in
//! flight.
//!
//! Each query resolves its server name, then tries the resolved addresses
//! one at a time until one of them answers: a 48-byte NTP packet is sent
//! over UDP and the reply is raced against a per-attempt deadline (3 s by
//! default), an overall per-series deadline (5 s), and the caller's
//! end-to-end timeout. The caller's timeout is the authoritative ceiling on
//! total wall-clock time; the inner deadlines only matter when they elapse
//! sooner.
//!
//! # Details
//!
//! The layers beneath [`Client`] are public and usable on their own:
//! - [`query::Query`] drives one query on an existing tokio runtime and
//!   hands out a cancellable handle,
//! - [`query::series`] tries a list of resolved endpoints until success,
//! - [`query::single`] performs one UDP exchange with one endpoint,
//! - [`Packet`], [`Timestamp`], and [`coder`] cover the wire format,
//!   including round-trip-delay and clock-offset computation with
//!   era-wraparound handling.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::{mpsc, Arc, Mutex};
//!
//! use antpc::{Client, Status};
//!
//! fn main() -> std::io::Result<()> {
//!     let (sender, receiver) = mpsc::channel();
//!     let sender = Mutex::new(sender);
//!     let client = Client::with_callback(Arc::new(move |result| {
//!         let _ = sender.lock().unwrap().send(result);
//!     }))?;
//!     client.query("pool.ntp.org");
//!     let result = receiver.recv().expect("client gone");
//!     match result.status {
//!         Status::Succeeded => {
//!             println!(
//!                 "{} ({:?}) answered in {:?}",
//!                 result.server, result.address, result.round_trip
//!             );
//!         }
//!         status => eprintln!("{} failed: {status:?}", result.server),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Logging support
//!
//! The crate traces query lifecycle events (resolution, attempts, faults,
//! fallback advancement) at `debug` level through the `log` facade.

pub mod client;
pub mod coder;
pub mod packet;
pub mod query;
pub mod timestamp;

pub use crate::client::Client;
pub use crate::packet::Packet;
pub use crate::query::{Callback, Query, QueryResult, Status};
pub use crate::timestamp::Timestamp;
