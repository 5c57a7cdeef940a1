//! A single NTP exchange with one resolved endpoint.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use chrono::Utc;
use log::debug;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::time::{self, Instant};

use crate::packet::Packet;
use crate::query::cancelled;
use crate::timestamp::Timestamp;

/// Default time allotted to one endpoint exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);

/// Terminal outcome of one endpoint exchange.
#[derive(Debug, Clone)]
pub struct Exchange {
    /// The endpoint the exchange targeted.
    pub endpoint: SocketAddr,
    /// What went wrong, or `None` on success.
    pub fault: Option<Fault>,
    /// The server's reply on success, the unsent client packet on a send
    /// fault, or a null packet otherwise.
    pub packet: Packet,
    /// Elapsed time between starting the exchange and its terminal state.
    pub round_trip: Duration,
}

/// Failure kind of one endpoint exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The client packet could not be transmitted to the endpoint.
    Send,
    /// No valid-length reply arrived from the endpoint.
    Receive,
    /// The exchange deadline elapsed before a reply arrived.
    Timeout,
    /// The exchange was cancelled by the caller.
    Cancelled,
}

/// Sends one client-mode packet to `endpoint` and awaits its reply, racing
/// the whole exchange against the given deadline and the cancellation
/// signal. Reports its terminal state exactly once, as the returned
/// [`Exchange`].
pub async fn run(
    endpoint: SocketAddr,
    timeout: Duration,
    mut cancel: watch::Receiver<bool>,
) -> Exchange {
    let started = Instant::now();
    let deadline = started + timeout;
    tokio::select! {
        biased;
        _ = cancelled(&mut cancel) => Exchange {
            endpoint,
            fault: Some(Fault::Cancelled),
            packet: Packet::default(),
            round_trip: started.elapsed(),
        },
        () = time::sleep_until(deadline) => {
            debug!("exchange with {endpoint} timed out");
            Exchange {
                endpoint,
                fault: Some(Fault::Timeout),
                packet: Packet::default(),
                round_trip: started.elapsed(),
            }
        }
        exchange = transact(endpoint, started) => exchange,
    }
}

async fn transact(endpoint: SocketAddr, started: Instant) -> Exchange {
    let request = Packet::client(Timestamp::from_datetime(Utc::now()));
    let local: SocketAddr = match endpoint {
        SocketAddr::V4(_) => (IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0).into(),
        SocketAddr::V6(_) => (IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0).into(),
    };
    let socket = match UdpSocket::bind(local).await {
        Ok(socket) => socket,
        Err(error) => {
            debug!("binding a socket for {endpoint} failed: {error}");
            return Exchange {
                endpoint,
                fault: Some(Fault::Send),
                packet: request,
                round_trip: started.elapsed(),
            };
        }
    };
    if let Err(error) = socket.send_to(&request.data(), endpoint).await {
        debug!("send to {endpoint} failed: {error}");
        return Exchange {
            endpoint,
            fault: Some(Fault::Send),
            packet: request,
            round_trip: started.elapsed(),
        };
    }
    let mut buffer = [0u8; Packet::SIZE];
    match socket.recv_from(&mut buffer).await {
        Ok((size, _)) if size == Packet::SIZE => Exchange {
            endpoint,
            fault: None,
            packet: Packet::from_data(buffer),
            round_trip: started.elapsed(),
        },
        Ok((size, _)) => {
            debug!("{endpoint} replied with {size} bytes instead of {}", Packet::SIZE);
            Exchange {
                endpoint,
                fault: Some(Fault::Receive),
                packet: Packet::default(),
                round_trip: started.elapsed(),
            }
        }
        Err(error) => {
            debug!("receive from {endpoint} failed: {error}");
            Exchange {
                endpoint,
                fault: Some(Fault::Receive),
                packet: Packet::default(),
                round_trip: started.elapsed(),
            }
        }
    }
}
