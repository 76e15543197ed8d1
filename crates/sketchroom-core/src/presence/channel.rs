//! Presence channel state machine.

use super::PresenceError;
use super::protocol::{ClientMessage, ServerMessage};

/// Low-level events from a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Connection established
    Connected,
    /// Connection closed
    Disconnected,
    /// Decoded message from the service
    Message(ServerMessage),
    /// Transport failure
    Error { message: String },
}

/// A bidirectional text-message connection to the presence service.
pub trait PresenceTransport {
    /// Open the connection. Messages sent before it is established are
    /// delivered once it is.
    fn connect(&mut self, url: &str) -> Result<(), PresenceError>;

    /// Queue a text message. Messages are delivered in the order sent.
    fn send(&self, msg: &str) -> Result<(), PresenceError>;

    /// Drain pending events (non-blocking).
    fn poll_events(&mut self) -> Vec<TransportEvent>;

    /// Close the connection after anything already sent.
    fn disconnect(&mut self);
}

/// Connection state of a [`PresenceChannel`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PresenceState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Join confirmed by the service.
    Joined { room_id: String },
}

/// Notifications surfaced to the drawing surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceEvent {
    Connected,
    Joined { room_id: String, participants: usize },
    RoomCreated { user_id: String, room_id: String },
    UserJoined { user_id: String },
    UserLeft { user_id: String },
    Disconnected,
    Error { message: String },
}

/// Membership in one artwork's collaboration room.
///
/// `mount` connects and enters the room; `unmount` announces departure and
/// closes. Dropping a mounted channel unmounts it.
pub struct PresenceChannel<T: PresenceTransport> {
    transport: T,
    url: String,
    room_id: String,
    /// Local participant; `None` while identity is still loading.
    user_id: Option<String>,
    state: PresenceState,
    mounted: bool,
}

impl<T: PresenceTransport> PresenceChannel<T> {
    pub fn new(
        transport: T,
        url: impl Into<String>,
        room_id: impl Into<String>,
        user_id: Option<String>,
    ) -> Self {
        Self {
            transport,
            url: url.into(),
            room_id: room_id.into(),
            user_id,
            state: PresenceState::Disconnected,
            mounted: false,
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn state(&self) -> &PresenceState {
        &self.state
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Connect and enter the room.
    pub fn mount(&mut self) -> Result<(), PresenceError> {
        if self.mounted {
            return Err(PresenceError::AlreadyConnected);
        }

        self.transport.connect(&self.url)?;
        self.mounted = true;
        self.state = PresenceState::Connecting;

        let join = ClientMessage::Join {
            room: self.room_id.clone(),
            user_id: self.user_id.clone(),
        };
        if let Err(e) = self.send(&join) {
            // still mounted: unmount must tear the connection down
            log::warn!("failed to queue join for room {}: {}", self.room_id, e);
            return Err(e);
        }

        log::info!("presence: joining room {}", self.room_id);
        Ok(())
    }

    /// Drain transport events, answering `user_joined` with an acknowledgment.
    pub fn poll(&mut self) -> Vec<PresenceEvent> {
        if !self.mounted {
            return Vec::new();
        }

        let mut out = Vec::new();
        for event in self.transport.poll_events() {
            match event {
                TransportEvent::Connected => {
                    self.state = PresenceState::Connected;
                    out.push(PresenceEvent::Connected);
                }
                TransportEvent::Disconnected => {
                    self.state = PresenceState::Disconnected;
                    out.push(PresenceEvent::Disconnected);
                }
                TransportEvent::Error { message } => {
                    log::warn!("presence transport error: {}", message);
                    self.state = PresenceState::Disconnected;
                    out.push(PresenceEvent::Error { message });
                }
                TransportEvent::Message(msg) => {
                    if let Some(event) = self.handle_message(msg) {
                        out.push(event);
                    }
                }
            }
        }
        out
    }

    fn handle_message(&mut self, msg: ServerMessage) -> Option<PresenceEvent> {
        match msg {
            ServerMessage::Joined {
                room_id,
                participants,
            } => {
                self.state = PresenceState::Joined {
                    room_id: room_id.clone(),
                };
                Some(PresenceEvent::Joined {
                    room_id,
                    participants,
                })
            }
            ServerMessage::RoomCreated { user_id, room_id } => {
                log::info!("{} created room: {}", user_id, room_id);
                Some(PresenceEvent::RoomCreated { user_id, room_id })
            }
            ServerMessage::UserJoined { user_id } => {
                let ack = ClientMessage::LogJoinUser {
                    user_id: user_id.clone(),
                };
                if let Err(e) = self.send(&ack) {
                    log::warn!("failed to acknowledge join of {}: {}", user_id, e);
                }
                log::info!("User {} joined the room", user_id);
                Some(PresenceEvent::UserJoined { user_id })
            }
            ServerMessage::UserLeft { user_id } => {
                log::info!("User {} left the room", user_id);
                Some(PresenceEvent::UserLeft { user_id })
            }
            ServerMessage::Error { message } => Some(PresenceEvent::Error { message }),
        }
    }

    /// Announce departure and close. Does nothing if not mounted.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }

        let bye = ClientMessage::DisconnectUser {
            user_id: self.user_id.clone(),
        };
        if let Err(e) = self.send(&bye) {
            log::warn!("failed to send disconnect for room {}: {}", self.room_id, e);
        }
        self.transport.disconnect();

        self.mounted = false;
        self.state = PresenceState::Disconnected;
        log::info!("presence: left room {}", self.room_id);
    }

    fn send(&self, msg: &ClientMessage) -> Result<(), PresenceError> {
        let json = msg.to_json()?;
        self.transport.send(&json)
    }
}

impl<T: PresenceTransport> Drop for PresenceChannel<T> {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records every call in order so tests can assert on wire traffic.
    #[derive(Default, Clone)]
    struct RecordingTransport {
        log: Rc<RefCell<Vec<String>>>,
        incoming: Rc<RefCell<Vec<TransportEvent>>>,
        fail_connect: bool,
    }

    impl RecordingTransport {
        fn push(&self, event: TransportEvent) {
            self.incoming.borrow_mut().push(event);
        }

        fn log(&self) -> Vec<String> {
            self.log.borrow().clone()
        }
    }

    impl PresenceTransport for RecordingTransport {
        fn connect(&mut self, url: &str) -> Result<(), PresenceError> {
            if self.fail_connect {
                return Err(PresenceError::InvalidUrl(url.to_string()));
            }
            self.log.borrow_mut().push(format!("connect {url}"));
            Ok(())
        }

        fn send(&self, msg: &str) -> Result<(), PresenceError> {
            self.log.borrow_mut().push(msg.to_string());
            Ok(())
        }

        fn poll_events(&mut self) -> Vec<TransportEvent> {
            std::mem::take(&mut *self.incoming.borrow_mut())
        }

        fn disconnect(&mut self) {
            self.log.borrow_mut().push("close".to_string());
        }
    }

    fn channel(transport: RecordingTransport) -> PresenceChannel<RecordingTransport> {
        PresenceChannel::new(transport, "ws://presence/ws", "art-7", Some("me".to_string()))
    }

    #[test]
    fn test_mount_connects_and_joins() {
        let transport = RecordingTransport::default();
        let mut ch = channel(transport.clone());
        ch.mount().unwrap();

        assert_eq!(ch.state(), &PresenceState::Connecting);
        assert_eq!(
            transport.log(),
            vec![
                "connect ws://presence/ws".to_string(),
                r#"{"type":"join","room":"art-7","user_id":"me"}"#.to_string(),
            ]
        );
    }

    #[test]
    fn test_state_transitions() {
        let transport = RecordingTransport::default();
        let mut ch = channel(transport.clone());
        ch.mount().unwrap();

        transport.push(TransportEvent::Connected);
        transport.push(TransportEvent::Message(ServerMessage::Joined {
            room_id: "art-7".to_string(),
            participants: 1,
        }));
        let events = ch.poll();

        assert_eq!(events.len(), 2);
        assert_eq!(
            ch.state(),
            &PresenceState::Joined {
                room_id: "art-7".to_string()
            }
        );

        ch.unmount();
        assert_eq!(ch.state(), &PresenceState::Disconnected);
    }

    #[test]
    fn test_user_joined_is_acknowledged() {
        let transport = RecordingTransport::default();
        let mut ch = channel(transport.clone());
        ch.mount().unwrap();

        transport.push(TransportEvent::Message(ServerMessage::UserJoined {
            user_id: "friend".to_string(),
        }));
        transport.push(TransportEvent::Message(ServerMessage::UserLeft {
            user_id: "other".to_string(),
        }));
        let events = ch.poll();

        assert_eq!(
            events,
            vec![
                PresenceEvent::UserJoined {
                    user_id: "friend".to_string()
                },
                PresenceEvent::UserLeft {
                    user_id: "other".to_string()
                },
            ]
        );
        let acks: Vec<_> = transport
            .log()
            .into_iter()
            .filter(|m| m.contains("log_join_user"))
            .collect();
        assert_eq!(acks, vec![r#"{"type":"log_join_user","user_id":"friend"}"#.to_string()]);
    }

    #[test]
    fn test_unmount_right_after_mount_sends_one_disconnect_before_close() {
        let transport = RecordingTransport::default();
        let mut ch = channel(transport.clone());
        ch.mount().unwrap();
        ch.unmount();
        ch.unmount();

        let log = transport.log();
        let disconnects: Vec<usize> = log
            .iter()
            .enumerate()
            .filter(|(_, m)| m.contains("disconnect_user"))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(disconnects.len(), 1);
        let close = log.iter().position(|m| m == "close").unwrap();
        assert!(disconnects[0] < close);
        assert_eq!(log.iter().filter(|m| *m == "close").count(), 1);
    }

    #[test]
    fn test_drop_unmounts() {
        let transport = RecordingTransport::default();
        {
            let mut ch = channel(transport.clone());
            ch.mount().unwrap();
        }
        let log = transport.log();
        assert_eq!(
            &log[log.len() - 2..],
            &[
                r#"{"type":"disconnect_user","user_id":"me"}"#.to_string(),
                "close".to_string()
            ]
        );
    }

    #[test]
    fn test_failed_connect_leaves_unmounted() {
        let transport = RecordingTransport {
            fail_connect: true,
            ..Default::default()
        };
        let mut ch = channel(transport.clone());
        assert!(ch.mount().is_err());
        assert!(!ch.is_mounted());
        drop(ch);
        assert!(transport.log().is_empty());
    }

    #[test]
    fn test_transport_error_disconnects_without_unmounting() {
        let transport = RecordingTransport::default();
        let mut ch = channel(transport.clone());
        ch.mount().unwrap();

        transport.push(TransportEvent::Error {
            message: "connection reset".to_string(),
        });
        let events = ch.poll();
        assert!(matches!(events[0], PresenceEvent::Error { .. }));
        assert_eq!(ch.state(), &PresenceState::Disconnected);
        assert!(ch.is_mounted());
    }
}
