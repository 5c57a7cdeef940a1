//! Helpers shared by the integration tests: a scriptable loopback UDP
//! server and a callback recorder.

#![allow(dead_code)]

use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use antpc::{Callback, QueryResult};

/// A scriptable UDP server bound to an ephemeral loopback port, serviced by
/// a background thread until dropped.
pub struct Server {
    addr: SocketAddr,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Server {
    /// Echoes every incoming datagram back to its sender.
    pub fn replay() -> Self {
        Self::spawn(|socket, data, sender| {
            let _ = socket.send_to(data, sender);
        })
    }

    /// Answers every incoming datagram with `payload`, after `delay`.
    pub fn replay_with(payload: Vec<u8>, delay: Duration) -> Self {
        Self::spawn(move |socket, _data, sender| {
            std::thread::sleep(delay);
            let _ = socket.send_to(&payload, sender);
        })
    }

    /// Swallows every incoming datagram without answering.
    pub fn blackhole() -> Self {
        Self::spawn(|_socket, _data, _sender| {})
    }

    fn spawn(handler: impl Fn(&UdpSocket, &[u8], SocketAddr) + Send + 'static) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").expect("bind test server");
        socket
            .set_read_timeout(Some(Duration::from_millis(20)))
            .expect("set test server read timeout");
        let addr = socket.local_addr().expect("test server local address");
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let thread = std::thread::spawn(move || {
            let mut buffer = [0u8; 512];
            while !flag.load(Ordering::Relaxed) {
                if let Ok((size, sender)) = socket.recv_from(&mut buffer) {
                    handler(&socket, &buffer[..size], sender);
                }
            }
        });
        Self {
            addr,
            stop,
            thread: Some(thread),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The server's address as a `host:port` string suitable for a query.
    pub fn host(&self) -> String {
        self.addr.to_string()
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Collects query results delivered through a [`Callback`].
pub struct Recorder {
    sender: UnboundedSender<QueryResult>,
    receiver: UnboundedReceiver<QueryResult>,
}

impl Recorder {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self { sender, receiver }
    }

    /// A callback that records every result it is invoked with.
    pub fn callback(&self) -> Callback {
        let sender = self.sender.clone();
        Arc::new(move |result| {
            let _ = sender.send(result);
        })
    }

    /// Awaits the next recorded result, giving up after 5 seconds.
    pub async fn next(&mut self) -> Option<QueryResult> {
        self.next_within(Duration::from_secs(5)).await
    }

    /// Awaits the next recorded result for at most `window`.
    pub async fn next_within(&mut self, window: Duration) -> Option<QueryResult> {
        tokio::time::timeout(window, self.receiver.recv())
            .await
            .ok()
            .flatten()
    }

    /// Blocks until the next recorded result arrives. Bounded so that a
    /// regression fails the test instead of hanging it.
    pub fn wait(&mut self) -> QueryResult {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Ok(result) = self.receiver.try_recv() {
                return result;
            }
            assert!(Instant::now() < deadline, "no query result within 10 s");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    /// Returns an already-recorded result, if any, without waiting.
    pub fn try_wait(&mut self) -> Option<QueryResult> {
        self.receiver.try_recv().ok()
    }
}
