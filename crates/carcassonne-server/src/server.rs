//! WebSocket server and connection handling.

use crate::protocol::{ClientMessage, GameInfo, GameStatus, ServerMessage};
use crate::room::GameRoom;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Server state shared across all connections.
pub struct ServerState {
    /// All hosted games
    pub rooms: DashMap<Uuid, GameRoom>,
    /// Mapping from connection ID to their game ID
    pub player_rooms: DashMap<Uuid, Uuid>,
    /// Mapping from connection ID to their message sender
    pub player_senders: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
    /// Games untouched for this long are evicted
    idle_timeout: Duration,
}

impl ServerState {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            rooms: DashMap::new(),
            player_rooms: DashMap::new(),
            player_senders: DashMap::new(),
            idle_timeout,
        }
    }

    /// Send a message to a specific connection.
    pub fn send_to_player(&self, player_id: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.player_senders.get(&player_id) {
            let _ = sender.send(msg);
        }
    }

    fn send_error(&self, player_id: Uuid, message: impl Into<String>) {
        self.send_to_player(
            player_id,
            ServerMessage::Error {
                message: message.into(),
            },
        );
    }

    /// Broadcast a message to everyone seated in a game.
    pub fn broadcast_to_room(&self, room_id: Uuid, msg: ServerMessage) {
        if let Some(room) = self.rooms.get(&room_id) {
            for player_id in room.players.keys() {
                self.send_to_player(*player_id, msg.clone());
            }
        }
    }

    /// Broadcast a message to everyone seated in a game except one.
    pub fn broadcast_to_room_except(&self, room_id: Uuid, except: Uuid, msg: ServerMessage) {
        if let Some(room) = self.rooms.get(&room_id) {
            for player_id in room.players.keys() {
                if *player_id != except {
                    self.send_to_player(*player_id, msg.clone());
                }
            }
        }
    }

    /// Games that still have open seats.
    pub fn get_waiting_games(&self) -> Vec<GameInfo> {
        self.rooms
            .iter()
            .filter(|r| r.status == GameStatus::Waiting)
            .map(|r| r.to_info())
            .collect()
    }

    /// Drop every finished game and every game idle past the timeout.
    /// Returns the evicted game IDs.
    pub fn evict_stale(&self, now: Instant) -> Vec<Uuid> {
        let stale: Vec<Uuid> = self
            .rooms
            .iter()
            .filter(|r| r.is_stale(now, self.idle_timeout))
            .map(|r| *r.key())
            .collect();

        let mut evicted = Vec::new();
        for room_id in stale {
            let Some((_, room)) = self
                .rooms
                .remove_if(&room_id, |_, r| r.is_stale(now, self.idle_timeout))
            else {
                continue;
            };
            for player_id in room.players.keys() {
                if self
                    .player_rooms
                    .remove_if(player_id, |_, r| *r == room_id)
                    .is_some()
                {
                    self.send_to_player(*player_id, ServerMessage::LeftGame);
                }
            }
            info!(game = %room_id, status = ?room.status, "evicted game");
            evicted.push(room_id);
        }
        evicted
    }
}

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Carcassonne server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Periodically evict stale games.
pub async fn run_eviction(state: Arc<ServerState>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        let evicted = state.evict_stale(Instant::now());
        if !evicted.is_empty() {
            info!("Eviction sweep removed {} game(s)", evicted.len());
        }
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Assign a connection ID
    let player_id = Uuid::new_v4();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.player_senders.insert(player_id, tx);

    let welcome = ServerMessage::Welcome { player_id };
    let msg_text = serde_json::to_string(&welcome)?;
    ws_sender.send(Message::Text(msg_text)).await?;

    // Forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_message(player_id, client_msg, &state),
                Err(e) => {
                    warn!("Invalid message from {}: {}", player_id, text);
                    state.send_error(player_id, format!("Invalid message: {}", e));
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", player_id);
                break;
            }
            Ok(Message::Ping(_)) => {
                state.send_to_player(player_id, ServerMessage::Pong);
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", player_id, e);
                break;
            }
            _ => {}
        }
    }

    handle_disconnect(player_id, &state);
    state.player_senders.remove(&player_id);
    send_task.abort();

    info!("Connection closed for {}", player_id);
    Ok(())
}

/// Handle a client message.
pub(crate) fn handle_message(player_id: Uuid, msg: ClientMessage, state: &ServerState) {
    match msg {
        ClientMessage::CreateGame {
            player_name,
            players_count,
            seed,
        } => {
            if state.player_rooms.contains_key(&player_id) {
                state.send_error(player_id, "Already in a game");
                return;
            }

            let room_id = Uuid::new_v4();
            match GameRoom::new(room_id, player_id, &player_name, players_count, seed) {
                Ok(room) => {
                    let joined = joined_message(&room, player_id);
                    state.rooms.insert(room_id, room);
                    state.player_rooms.insert(player_id, room_id);
                    info!(game = %room_id, players_count, "game created");

                    state.send_to_player(player_id, ServerMessage::GameCreated { game_id: room_id });
                    if let Some(joined) = joined {
                        state.send_to_player(player_id, joined);
                    }
                }
                Err(e) => state.send_error(player_id, e.to_string()),
            }
        }

        ClientMessage::JoinGame {
            game_id,
            player_name,
        } => {
            if state.player_rooms.contains_key(&player_id) {
                state.send_error(player_id, "Already in a game");
                return;
            }

            let Some(mut room) = state.rooms.get_mut(&game_id) else {
                state.send_error(player_id, "Game not found");
                return;
            };

            match room.add_player(player_id, &player_name) {
                Ok(_) => {
                    let joined = joined_message(&room, player_id);
                    let game_info = room.to_info();
                    let started = room.status == GameStatus::InGame;
                    let snapshot = room.get_game_state();
                    let current_player = room.get_current_player();
                    drop(room); // Release lock before broadcasting

                    state.player_rooms.insert(player_id, game_id);
                    if let Some(joined) = joined {
                        state.send_to_player(player_id, joined);
                    }
                    state.broadcast_to_room_except(
                        game_id,
                        player_id,
                        ServerMessage::GameUpdated { game: game_info },
                    );

                    if started {
                        info!(game = %game_id, "game started");
                        state.broadcast_to_room(game_id, ServerMessage::GameState { state: snapshot });
                        state.broadcast_to_room(
                            game_id,
                            ServerMessage::TurnChanged {
                                player_index: current_player,
                            },
                        );
                    }
                }
                Err(e) => {
                    drop(room);
                    state.send_error(player_id, e.to_string());
                }
            }
        }

        ClientMessage::LeaveGame => {
            if leave_current_game(player_id, state) {
                state.send_to_player(player_id, ServerMessage::LeftGame);
            } else {
                state.send_error(player_id, "Not in a game");
            }
        }

        ClientMessage::GameAction { action } => {
            let Some(room_id) = state.player_rooms.get(&player_id).map(|r| *r) else {
                state.send_error(player_id, "Not in a game");
                return;
            };
            let Some(mut room) = state.rooms.get_mut(&room_id) else {
                state.send_error(player_id, "Game not found");
                return;
            };

            match room.apply_action(player_id, action) {
                Ok(events) => {
                    let snapshot = room.get_game_state();
                    let current_player = room.get_current_player();
                    let final_scores = room.final_scores();
                    drop(room);

                    debug!(game = %room_id, events = events.len(), "action applied");

                    // Send action result to the acting player
                    state.send_to_player(
                        player_id,
                        ServerMessage::ActionResult {
                            success: true,
                            events,
                            error: None,
                        },
                    );

                    state.broadcast_to_room(room_id, ServerMessage::GameState { state: snapshot });
                    state.broadcast_to_room(
                        room_id,
                        ServerMessage::TurnChanged {
                            player_index: current_player,
                        },
                    );

                    if let Some(scores) = final_scores {
                        info!(game = %room_id, "game over");
                        state.broadcast_to_room(room_id, ServerMessage::GameOver { scores });
                    }
                }
                Err(e) => {
                    drop(room);
                    state.send_to_player(
                        player_id,
                        ServerMessage::ActionResult {
                            success: false,
                            events: vec![],
                            error: Some(e.to_string()),
                        },
                    );
                }
            }
        }

        ClientMessage::GetValidMeeplePositions { position } => {
            let entity_ids = state
                .player_rooms
                .get(&player_id)
                .map(|r| *r)
                .and_then(|room_id| {
                    state
                        .rooms
                        .get(&room_id)
                        .map(|room| room.valid_meeple_positions(position))
                });

            match entity_ids {
                Some(entity_ids) => state.send_to_player(
                    player_id,
                    ServerMessage::ValidMeeplePositions {
                        position,
                        entity_ids,
                    },
                ),
                None => state.send_error(player_id, "Not in a game"),
            }
        }

        ClientMessage::ListGames => {
            let games = state.get_waiting_games();
            state.send_to_player(player_id, ServerMessage::GameList { games });
        }

        ClientMessage::Ping => {
            state.send_to_player(player_id, ServerMessage::Pong);
        }
    }
}

fn joined_message(room: &GameRoom, player_id: Uuid) -> Option<ServerMessage> {
    let player = room.player(player_id)?;
    Some(ServerMessage::JoinedGame {
        game: room.to_info(),
        player_index: player.player_index,
        color: player.color,
    })
}

/// Take a connection out of its game. Waiting games lose the seat and are
/// removed once empty; running games keep the seat marked disconnected.
/// Returns false if the connection was not in a game.
fn leave_current_game(player_id: Uuid, state: &ServerState) -> bool {
    let Some((_, room_id)) = state.player_rooms.remove(&player_id) else {
        return false;
    };
    let Some(mut room) = state.rooms.get_mut(&room_id) else {
        return true;
    };

    if room.status == GameStatus::Waiting {
        let is_empty = room.remove_player(player_id).unwrap_or(false);
        if is_empty {
            drop(room);
            state.rooms.remove(&room_id);
            info!(game = %room_id, "last player left, game removed");
            return true;
        }
    } else {
        // Keep the seat so turn order holds
        room.set_player_connected(player_id, false);
    }

    let game_info = room.to_info();
    drop(room);
    state.broadcast_to_room_except(room_id, player_id, ServerMessage::GameUpdated { game: game_info });
    true
}

/// Handle player disconnect.
fn handle_disconnect(player_id: Uuid, state: &ServerState) {
    if leave_current_game(player_id, state) {
        debug!("{} left their game on disconnect", player_id);
    }
}
