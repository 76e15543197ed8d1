//! Native WebSocket transport for the presence channel.
//!
//! The socket runs on a background thread; commands and events cross over
//! `mpsc` channels so the drawing surface never blocks on the network.

use super::PresenceError;
use super::channel::{PresenceTransport, TransportEvent};
use super::protocol::ServerMessage;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tungstenite::{Message, connect};
use url::Url;

/// How long `disconnect` waits for a connected socket thread to finish.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Commands sent to the WebSocket thread.
enum WsCommand {
    Send(String),
    Close,
}

/// WebSocket client for native platforms.
#[derive(Default)]
pub struct NativeWebSocket {
    /// Channel to send commands to the WebSocket thread.
    cmd_tx: Option<Sender<WsCommand>>,
    /// Channel to receive events from the WebSocket thread.
    event_rx: Option<Receiver<TransportEvent>>,
    /// Handle to the WebSocket thread.
    thread: Option<JoinHandle<()>>,
    /// Set by the thread once the handshake completed.
    connected: Arc<AtomicBool>,
}

impl NativeWebSocket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.cmd_tx.is_some()
    }
}

impl PresenceTransport for NativeWebSocket {
    fn connect(&mut self, url: &str) -> Result<(), PresenceError> {
        if self.cmd_tx.is_some() {
            return Err(PresenceError::AlreadyConnected);
        }

        let parsed = Url::parse(url).map_err(|e| PresenceError::InvalidUrl(format!("{url}: {e}")))?;
        if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
            return Err(PresenceError::InvalidUrl(format!(
                "unsupported scheme: {}",
                parsed.scheme()
            )));
        }

        let (cmd_tx, cmd_rx) = channel::<WsCommand>();
        let (event_tx, event_rx) = channel::<TransportEvent>();
        let url = url.to_string();
        let connected = Arc::new(AtomicBool::new(false));
        self.connected = connected.clone();

        let handle = thread::spawn(move || run_socket(&url, cmd_rx, event_tx, &connected));

        self.cmd_tx = Some(cmd_tx);
        self.event_rx = Some(event_rx);
        self.thread = Some(handle);
        Ok(())
    }

    fn send(&self, msg: &str) -> Result<(), PresenceError> {
        match &self.cmd_tx {
            Some(tx) => tx
                .send(WsCommand::Send(msg.to_string()))
                .map_err(|e| PresenceError::Send(e.to_string())),
            None => Err(PresenceError::NotConnected),
        }
    }

    fn poll_events(&mut self) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        if let Some(rx) = &self.event_rx {
            while let Ok(event) = rx.try_recv() {
                events.push(event);
            }
        }
        events
    }

    fn disconnect(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(WsCommand::Close);
        }
        self.event_rx = None;
        if let Some(handle) = self.thread.take() {
            // A thread still in the handshake is detached right away. Its
            // command queue keeps the pending sends and the close in order.
            if !self.connected.load(Ordering::Acquire) {
                log::debug!("presence socket not connected yet, detaching");
                return;
            }
            // Connected: give it a moment to flush queued sends and the
            // close frame.
            let deadline = Instant::now() + CLOSE_GRACE;
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() && handle.join().is_err() {
                log::error!("presence socket thread panicked");
            }
        }
    }
}

impl Drop for NativeWebSocket {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn run_socket(
    url: &str,
    cmd_rx: Receiver<WsCommand>,
    event_tx: Sender<TransportEvent>,
    connected: &AtomicBool,
) {
    log::info!("presence socket: connecting to {}", url);

    let mut socket = match connect(url) {
        Ok((socket, response)) => {
            log::info!("presence socket connected, status: {}", response.status());
            connected.store(true, Ordering::Release);
            socket
        }
        Err(e) => {
            log::error!("presence socket connection failed: {}", e);
            let _ = event_tx.send(TransportEvent::Error {
                message: format!("Connection failed: {}", e),
            });
            return;
        }
    };
    let _ = event_tx.send(TransportEvent::Connected);

    // Short read timeout keeps the loop responsive to outgoing commands.
    if let tungstenite::stream::MaybeTlsStream::Plain(tcp) = socket.get_mut() {
        let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
        let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
    }

    'outer: loop {
        loop {
            match cmd_rx.try_recv() {
                Ok(WsCommand::Send(msg)) => {
                    log::debug!("presence socket sending: {}", msg);
                    if let Err(e) = socket.send(Message::Text(msg)) {
                        log::error!("presence socket send error: {}", e);
                        break 'outer;
                    }
                }
                Ok(WsCommand::Close) | Err(TryRecvError::Disconnected) => {
                    log::info!("presence socket close requested");
                    let _ = socket.close(None);
                    let _ = socket.flush();
                    break 'outer;
                }
                Err(TryRecvError::Empty) => break,
            }
        }

        match socket.read() {
            Ok(Message::Text(txt)) => match serde_json::from_str::<ServerMessage>(&txt) {
                Ok(msg) => {
                    let _ = event_tx.send(TransportEvent::Message(msg));
                }
                Err(e) => log::warn!("failed to parse presence message {}: {}", txt, e),
            },
            Ok(Message::Ping(data)) => {
                let _ = socket.send(Message::Pong(data));
            }
            Ok(Message::Close(_)) => {
                log::info!("presence socket received close frame");
                break;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => {
                log::error!("presence socket read error: {}", e);
                let _ = event_tx.send(TransportEvent::Error {
                    message: e.to_string(),
                });
                break;
            }
        }
    }

    log::info!("presence socket thread exiting");
    let _ = event_tx.send(TransportEvent::Disconnected);
}
