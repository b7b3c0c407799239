//! Live observation feed over WebSocket
//!
//! `FeedConnection` runs the socket on a worker thread and hands text frames
//! to the owner through a channel. When the socket drops, the worker
//! reconnects with exponential backoff until it succeeds, the attempt budget
//! runs out, or the connection is closed by its owner. Frame parsing and
//! rendering stay with the receiver.

use crate::config::FeedConfig;
use chrono::{DateTime, Utc};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tungstenite::client::IntoClientRequest;
use tungstenite::{Message, WebSocket};

/// How often a blocked read wakes up to check for shutdown
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Limit on the TCP connect and on the opening handshake
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Something that happened on the feed
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Connected { at: DateTime<Utc> },
    Frame(String),
    Disconnected { reason: String },
    /// Reconnect budget exhausted; no more events follow
    GaveUp { attempts: u32 },
}

/// Exponential reconnect delay with an optional attempt limit
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    next: Duration,
    attempts: u32,
    max_attempts: u32,
}

impl Backoff {
    pub fn new(config: &FeedConfig) -> Self {
        let initial = Duration::from_millis(config.initial_backoff_ms);
        Self {
            initial,
            max: Duration::from_millis(config.max_backoff_ms),
            next: initial,
            attempts: 0,
            max_attempts: config.max_attempts,
        }
    }

    /// Delay before the next attempt, or `None` once the budget is spent
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.max_attempts != 0 && self.attempts >= self.max_attempts {
            return None;
        }
        self.attempts += 1;
        let delay = self.next;
        self.next = (self.next * 2).min(self.max);
        Some(delay)
    }

    /// Forget failures after a successful connection
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.next = self.initial;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// Handle to the feed worker, owned by the composition root
pub struct FeedConnection {
    url: String,
    events: Receiver<FeedEvent>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl FeedConnection {
    /// Start connecting to `url` in the background
    pub fn open(url: &str, config: &FeedConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let worker = {
            let url = url.to_string();
            let stop = Arc::clone(&stop);
            let backoff = Backoff::new(config);
            thread::spawn(move || run_worker(&url, backoff, &tx, &stop))
        };

        Self {
            url: url.to_string(),
            events: rx,
            stop,
            worker: Some(worker),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Wait for the next event
    ///
    /// `None` means the worker has exited and no further events will come.
    pub fn next_event(&self, timeout: Duration) -> Option<Result<FeedEvent, RecvTimeoutError>> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Some(Ok(event)),
            Err(RecvTimeoutError::Timeout) => Some(Err(RecvTimeoutError::Timeout)),
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Ask the worker to stop and wait for it
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Feed worker for {} panicked", self.url);
            }
        }
    }
}

impl Drop for FeedConnection {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(url: &str, mut backoff: Backoff, tx: &Sender<FeedEvent>, stop: &AtomicBool) {
    while !stop.load(Ordering::Relaxed) {
        log::info!("Connecting to feed {}", url);
        match connect(url) {
            Ok(mut socket) => {
                backoff.reset();
                log::info!("Connection established: {}", url);
                if tx.send(FeedEvent::Connected { at: Utc::now() }).is_err() {
                    return;
                }

                let reason = pump(&mut socket, tx, stop);
                let _ = socket.close(None);
                match reason {
                    Some(reason) => {
                        log::warn!("Feed disconnected: {}", reason);
                        if tx.send(FeedEvent::Disconnected { reason }).is_err() {
                            return;
                        }
                    }
                    None => return,
                }
            }
            Err(e) => log::warn!("Failed to connect to {}: {}", url, e),
        }

        let Some(delay) = backoff.next_delay() else {
            log::error!("Giving up on {} after {} attempts", url, backoff.attempts());
            let _ = tx.send(FeedEvent::GaveUp {
                attempts: backoff.attempts(),
            });
            return;
        };
        log::debug!("Reconnecting in {:?} (attempt {})", delay, backoff.attempts());
        sleep_unless_stopped(delay, stop);
    }
}

/// Open a plain `ws://` connection, bounded by `CONNECT_TIMEOUT`
fn connect(url: &str) -> Result<WebSocket<TcpStream>, String> {
    let request = url.into_client_request().map_err(|e| e.to_string())?;
    let uri = request.uri();
    if uri.scheme_str() != Some("ws") {
        return Err(format!("unsupported scheme in {} (expected ws://)", url));
    }
    let host = uri
        .host()
        .ok_or_else(|| format!("no host in {}", url))?
        .trim_start_matches('[')
        .trim_end_matches(']');
    let port = uri.port_u16().unwrap_or(80);

    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|e| format!("cannot resolve {}: {}", host, e))?;
    let mut last_error = format!("{} resolved to no addresses", host);
    for addr in addrs {
        let stream = match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
            Ok(stream) => stream,
            Err(e) => {
                last_error = format!("{}: {}", addr, e);
                continue;
            }
        };
        stream
            .set_read_timeout(Some(CONNECT_TIMEOUT))
            .map_err(|e| e.to_string())?;
        return match tungstenite::client(url, stream) {
            Ok((socket, _response)) => Ok(socket),
            Err(e) => Err(format!("handshake with {} failed: {}", addr, e)),
        };
    }
    Err(last_error)
}

/// Forward frames until the socket drops
///
/// Returns the disconnect reason, or `None` when asked to stop or when the
/// receiver has gone away.
fn pump(
    socket: &mut WebSocket<TcpStream>,
    tx: &Sender<FeedEvent>,
    stop: &AtomicBool,
) -> Option<String> {
    if let Err(e) = socket.get_ref().set_read_timeout(Some(POLL_INTERVAL)) {
        log::warn!("Could not set read timeout: {}", e);
    }

    loop {
        if stop.load(Ordering::Relaxed) {
            return None;
        }

        let text = match socket.read() {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    log::warn!("Ignoring non-UTF-8 binary frame");
                    continue;
                }
            },
            Ok(Message::Close(frame)) => {
                return Some(match frame {
                    Some(frame) => format!("closed by peer: {}", frame.reason),
                    None => "closed by peer".to_string(),
                });
            }
            Ok(_) => continue,
            Err(tungstenite::Error::Io(e))
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                continue
            }
            Err(e) => return Some(e.to_string()),
        };

        if tx.send(FeedEvent::Frame(text)).is_err() {
            return None;
        }
    }
}

fn sleep_unless_stopped(delay: Duration, stop: &AtomicBool) {
    let mut remaining = delay;
    while !remaining.is_zero() && !stop.load(Ordering::Relaxed) {
        let step = remaining.min(POLL_INTERVAL);
        thread::sleep(step);
        remaining -= step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn config(max_attempts: u32) -> FeedConfig {
        FeedConfig {
            max_attempts,
            initial_backoff_ms: 100,
            max_backoff_ms: 350,
            ..FeedConfig::default()
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut backoff = Backoff::new(&config(0));
        let delays: Vec<_> = (0..4).filter_map(|_| backoff.next_delay()).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(350),
                Duration::from_millis(350),
            ]
        );
    }

    #[test]
    fn test_backoff_budget_and_reset() {
        let mut backoff = Backoff::new(&config(2));
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_none());

        backoff.reset();
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_non_ws_url_is_rejected() {
        assert!(connect("wss://127.0.0.1:1/").is_err());
        assert!(connect("not a url").is_err());
    }

    #[test]
    fn test_frames_then_reconnect_after_peer_close() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut ws = tungstenite::accept(stream).unwrap();
            ws.send(Message::Text(r#"[1, 2, "A", "red"]"#.into())).unwrap();
            ws.send(Message::Text(r#"[3, 4, "A", "red"]"#.into())).unwrap();
            ws.close(None).unwrap();
            // Wait for the client's close reply
            while ws.read().is_ok() {}

            let (stream, _) = listener.accept().unwrap();
            tungstenite::accept(stream).unwrap()
        });

        let feed = FeedConnection::open(
            &format!("ws://127.0.0.1:{}/", port),
            &FeedConfig {
                max_attempts: 3,
                initial_backoff_ms: 10,
                max_backoff_ms: 10,
                ..FeedConfig::default()
            },
        );

        let mut events = Vec::new();
        while events.len() < 5 {
            match feed.next_event(Duration::from_secs(5)) {
                Some(Ok(event)) => events.push(event),
                _ => break,
            }
        }
        feed.close();

        assert_eq!(events.len(), 5, "events: {:?}", events);
        assert!(matches!(events[0], FeedEvent::Connected { .. }));
        assert_eq!(events[1], FeedEvent::Frame(r#"[1, 2, "A", "red"]"#.into()));
        assert_eq!(events[2], FeedEvent::Frame(r#"[3, 4, "A", "red"]"#.into()));
        assert!(matches!(events[3], FeedEvent::Disconnected { .. }));
        assert!(matches!(events[4], FeedEvent::Connected { .. }));
        let _second = server.join().unwrap();
    }

    #[test]
    fn test_unreachable_feed_gives_up() {
        // Grab a free port, then release it so nothing listens there
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let feed = FeedConnection::open(
            &format!("ws://127.0.0.1:{}/", port),
            &FeedConfig {
                max_attempts: 1,
                initial_backoff_ms: 1,
                max_backoff_ms: 1,
                ..FeedConfig::default()
            },
        );

        let mut gave_up = false;
        while let Some(event) = feed.next_event(Duration::from_secs(5)) {
            if let Ok(FeedEvent::GaveUp { attempts }) = event {
                assert_eq!(attempts, 1);
                gave_up = true;
            }
            if event.is_err() {
                break;
            }
        }
        assert!(gave_up);
        feed.close();
    }
}
