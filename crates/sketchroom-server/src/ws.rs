//! Per-connection WebSocket handling.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{
    SinkExt, StreamExt,
    stream::SplitSink,
};
use sketchroom_core::presence::{ClientMessage, ServerMessage};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::{AppState, Envelope};

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Room membership of one connection.
struct Membership {
    room_id: String,
    user_id: String,
    rx: broadcast::Receiver<Envelope>,
}

/// One connected client.
struct Connection {
    conn_id: String,
    state: Arc<AppState>,
    membership: Option<Membership>,
}

impl Connection {
    fn new(state: Arc<AppState>) -> Self {
        Self {
            conn_id: Uuid::new_v4().to_string(),
            state,
            membership: None,
        }
    }

    /// Enter a room, leaving the current one first.
    ///
    /// Returns the messages addressed to the joiner alone.
    fn join(&mut self, room_id: String, user_id: Option<String>) -> Vec<ServerMessage> {
        self.leave();

        // participants without a loaded identity are known by connection id
        let user_id = user_id.unwrap_or_else(|| self.conn_id.clone());
        let joined = self.state.join_room(&room_id, &self.conn_id, &user_id);

        let mut direct = vec![ServerMessage::Joined {
            room_id: room_id.clone(),
            participants: joined.participants,
        }];
        if joined.created {
            info!(
                "{} created room: {} ({} rooms active)",
                user_id,
                room_id,
                self.state.room_count()
            );
            direct.push(ServerMessage::RoomCreated {
                user_id: user_id.clone(),
                room_id: room_id.clone(),
            });
        }

        self.state.broadcast(
            &room_id,
            &self.conn_id,
            ServerMessage::UserJoined {
                user_id: user_id.clone(),
            },
        );
        info!("User {} joined room {}", user_id, room_id);

        self.membership = Some(Membership {
            room_id,
            user_id,
            rx: joined.rx,
        });
        direct
    }

    /// Leave the current room, if any, notifying the rest of it.
    fn leave(&mut self) {
        let Some(membership) = self.membership.take() else {
            return;
        };
        let user_id = self
            .state
            .leave_room(&membership.room_id, &self.conn_id)
            .unwrap_or(membership.user_id);
        self.state.broadcast(
            &membership.room_id,
            &self.conn_id,
            ServerMessage::UserLeft {
                user_id: user_id.clone(),
            },
        );
        info!(
            "User {} left room {} ({} remaining)",
            user_id,
            membership.room_id,
            self.state.participant_count(&membership.room_id)
        );
    }

    /// Handle one client message, returning replies for this connection.
    fn handle(&mut self, msg: ClientMessage) -> Vec<ServerMessage> {
        match msg {
            ClientMessage::Join { room, user_id } => self.join(room, user_id),
            ClientMessage::LogJoinUser { user_id } => {
                match &self.membership {
                    Some(m) => info!("{} acknowledged {} in room {}", m.user_id, user_id, m.room_id),
                    None => debug!("join acknowledgment for {} outside a room", user_id),
                }
                Vec::new()
            }
            ClientMessage::DisconnectUser { user_id } => {
                debug!("disconnect_user from {:?} on {}", user_id, self.conn_id);
                self.leave();
                Vec::new()
            }
            ClientMessage::Leave => {
                self.leave();
                Vec::new()
            }
        }
    }

    /// Next notification from the current room that did not originate here.
    async fn next_notification(&mut self) -> Option<ServerMessage> {
        loop {
            let membership = self.membership.as_mut()?;
            match membership.rx.recv().await {
                Ok((from, msg)) if from != self.conn_id => return Some(msg),
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => {
                    warn!("{} lagged behind by {} notifications", self.conn_id, n)
                }
                Err(RecvError::Closed) => {
                    self.membership = None;
                    return None;
                }
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.leave();
    }
}

async fn send_message(sender: &mut SplitSink<WebSocket, Message>, msg: &ServerMessage) -> bool {
    match msg.to_json() {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!("Failed to encode {:?}: {}", msg, e);
            true
        }
    }
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let mut conn = Connection::new(state);
    info!("New connection: {}", conn.conn_id);

    let (mut sender, mut receiver) = socket.split();

    'conn: loop {
        let in_room = conn.membership.is_some();
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let replies = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => conn.handle(client_msg),
                            Err(e) => {
                                warn!("Invalid message from {}: {}", conn.conn_id, e);
                                vec![ServerMessage::Error {
                                    message: format!("Invalid message: {}", e),
                                }]
                            }
                        };
                        for reply in &replies {
                            if !send_message(&mut sender, reply).await {
                                break 'conn;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // Ignore binary and ping/pong
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", conn.conn_id, e);
                        break;
                    }
                }
            }

            Some(msg) = conn.next_notification(), if in_room => {
                if !send_message(&mut sender, &msg).await {
                    break;
                }
            }
        }
    }

    info!("Connection closed: {}", conn.conn_id);
}
