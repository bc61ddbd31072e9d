//! Transport-free server context.
//!
//! `GameServer` owns every piece of mutable server state (sessions, the
//! simulation and the outgoing sequence counter). The network layer feeds it
//! raw datagrams and the clock, and sends whatever it hands back. Nothing in
//! here touches a socket, so several independent servers can run in one
//! process.

use crate::client_manager::ClientManager;
use crate::config::ServerConfig;
use crate::game::Game;
use log::{debug, error, info, warn};
use shared::protocol::{ConnectAck, ConnectRequest, UNASSIGNED_SLOT};
use shared::{decode, encode, encode_snapshot, GameState, InputState, Message, Packet};
use std::net::SocketAddr;

/// Datagrams the network layer should send.
#[derive(Debug, Clone, PartialEq)]
pub enum GameMessage {
    SendPacket { bytes: Vec<u8>, addr: SocketAddr },
    BroadcastPacket { bytes: Vec<u8>, addrs: Vec<SocketAddr> },
}

pub struct GameServer {
    config: ServerConfig,
    clients: ClientManager,
    game: Game,
    sequence: u32,
}

impl GameServer {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            clients: ClientManager::new(config.timeout_ms()),
            game: Game::new(config.seed),
            sequence: 0,
            config,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn clients(&self) -> &ClientManager {
        &self.clients
    }

    pub fn state(&self) -> &GameState {
        &self.game.state
    }

    pub fn game_mut(&mut self) -> &mut Game {
        &mut self.game
    }

    fn next_sequence(&mut self) -> u32 {
        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        sequence
    }

    fn encode_reply(&mut self, slot: i32, packet: Packet, addr: SocketAddr) -> Option<GameMessage> {
        let message = Message::new(slot, self.next_sequence(), packet);
        match encode(&message) {
            Ok(bytes) => Some(GameMessage::SendPacket { bytes, addr }),
            Err(e) => {
                error!("Failed to encode {:?} for {}: {}", message.packet.kind(), addr, e);
                None
            }
        }
    }

    /// Dispatches one inbound datagram. Returns the reply to send, if any.
    ///
    /// Datagrams that do not decode, or that only the server itself sends,
    /// are dropped.
    pub fn handle_datagram(
        &mut self,
        bytes: &[u8],
        addr: SocketAddr,
        now: u64,
    ) -> Option<GameMessage> {
        let Some(message) = decode(bytes) else {
            warn!("Ignoring malformed datagram ({} bytes) from {}", bytes.len(), addr);
            return None;
        };

        match message.packet {
            Packet::Connect(request) => self.handle_connect(&request, addr, now),
            Packet::Input(input) => {
                self.handle_input(message.slot, &input, now);
                None
            }
            Packet::Disconnect => {
                self.handle_disconnect(message.slot);
                None
            }
            Packet::ConnectAck(_) | Packet::StateSnapshot(_) => {
                warn!("Unexpected {:?} packet from {}", message.packet.kind(), addr);
                None
            }
        }
    }

    fn handle_connect(
        &mut self,
        request: &ConnectRequest,
        addr: SocketAddr,
        now: u64,
    ) -> Option<GameMessage> {
        let name = request.name();

        if let Some(slot) = self.clients.find_slot_by_addr(addr) {
            debug!("Repeated connect from {} ({}), slot {}", addr, name, slot);
            self.clients.touch(slot, now);
            return self.encode_reply(
                slot as i32,
                Packet::ConnectAck(ConnectAck::accepted(slot)),
                addr,
            );
        }

        match self.clients.add_client(addr, name.clone(), now) {
            Some(slot) => {
                self.game.add_player(slot);
                info!(
                    "Player {} ('{}') connected from {} ({} active)",
                    slot,
                    name,
                    addr,
                    self.clients.len()
                );
                self.encode_reply(
                    slot as i32,
                    Packet::ConnectAck(ConnectAck::accepted(slot)),
                    addr,
                )
            }
            None => {
                warn!("Rejected connect from {} ('{}'): server full", addr, name);
                self.encode_reply(
                    UNASSIGNED_SLOT,
                    Packet::ConnectAck(ConnectAck::rejected()),
                    addr,
                )
            }
        }
    }

    fn handle_input(&mut self, slot: i32, input: &InputState, now: u64) {
        let Some(slot) = self.active_slot(slot) else {
            debug!("Dropping input for inactive slot {}", slot);
            return;
        };

        self.clients.touch(slot, now);
        self.game
            .apply_input(slot, input, now, self.config.tick_delta());
    }

    fn handle_disconnect(&mut self, slot: i32) {
        let Some(slot) = self.active_slot(slot) else {
            return;
        };

        self.drop_session(slot);
        info!("Player {} disconnected ({} active)", slot, self.clients.len());
    }

    fn active_slot(&self, slot: i32) -> Option<usize> {
        let slot = usize::try_from(slot).ok()?;
        self.clients.is_active(slot).then_some(slot)
    }

    fn drop_session(&mut self, slot: usize) -> Option<SocketAddr> {
        let session = self.clients.remove_client(slot)?;
        self.game.remove_player(slot);
        Some(session.addr)
    }

    /// Runs one tick: simulate, broadcast the snapshot, then evict silent
    /// sessions. Returns everything to send, snapshot first.
    pub fn tick(&mut self, now: u64) -> Vec<GameMessage> {
        let mut outgoing = Vec::new();

        let report = self.game.update(now, self.config.tick_delta());
        if !report.deaths.is_empty() {
            debug!("Tick {}: players died {:?}", self.game.state.tick, report.deaths);
        }

        if !self.clients.is_empty() {
            let sequence = self.next_sequence();
            match encode_snapshot(sequence, &self.game.state) {
                Ok(bytes) => {
                    let addrs = self
                        .clients
                        .get_client_addrs()
                        .into_iter()
                        .map(|(_, addr)| addr)
                        .collect();
                    outgoing.push(GameMessage::BroadcastPacket { bytes, addrs });
                }
                Err(e) => error!("Failed to encode snapshot for tick {}: {}", self.game.state.tick, e),
            }
        }

        for slot in self.clients.timed_out(now) {
            if let Some(addr) = self.drop_session(slot) {
                info!("Player {} timed out ({} active)", slot, self.clients.len());
                outgoing.extend(self.encode_reply(slot as i32, Packet::Disconnect, addr));
            }
        }

        outgoing
    }

    pub fn log_stats(&self) {
        let state = &self.game.state;
        info!(
            "Tick {}: {} players, {} enemies, {} enemy bullets",
            state.tick,
            state.player_count(),
            state.enemy_count(),
            state.enemy_bullet_count()
        );

        for (slot, player) in state.players.iter() {
            let name = self.clients.get(slot).map_or("?", |s| s.name.as_str());
            info!(
                "  Player {} ('{}'): score {}, health {}, {}",
                slot,
                name,
                player.score,
                player.health,
                if player.alive { "ALIVE" } else { "DEAD" }
            );
        }
    }
}
