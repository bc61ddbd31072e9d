//! Protocol-facing half of the client: handshake, input upload and snapshot
//! intake. Rendering and local input polling live elsewhere.

use crate::error::{ClientError, ClientResult};
use log::{debug, error, info, warn};
use shared::protocol::{ConnectRequest, UNASSIGNED_SLOT};
use shared::{
    decode, encode, tick_is_newer, GameState, InputState, Message, Packet, Player,
    LIVENESS_TIMEOUT_MS, MAX_PACKET_SIZE, TICK_RATE,
};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::{sleep, timeout_at};

const DISCONNECT_REPEATS: usize = 3;
const DISCONNECT_SPACING: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Wait before each handshake resend
    pub retry_interval: Duration,
    pub max_retries: u32,
    /// Overall handshake deadline
    pub connect_timeout: Duration,
    /// Snapshot silence after which the connection counts as lost
    pub liveness_timeout: Duration,
    pub tick_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_secs(1),
            max_retries: 3,
            connect_timeout: Duration::from_secs(5),
            liveness_timeout: Duration::from_millis(LIVENESS_TIMEOUT_MS),
            tick_interval: Duration::from_secs_f64(1.0 / TICK_RATE as f64),
        }
    }
}

pub struct NetworkClient {
    socket: UdpSocket,
    server_addr: SocketAddr,
    config: ClientConfig,

    slot: Option<usize>,
    sequence: u32,
    state: Option<GameState>,
    last_update: Instant,

    snapshots_applied: u64,
    snapshots_skipped: u64,
}

impl NetworkClient {
    /// Resolves `server` (`host:port`) and binds a local ephemeral port.
    pub async fn new(server: &str, config: ClientConfig) -> ClientResult<Self> {
        let server_addr = lookup_host(server)
            .await
            .map_err(|e| ClientError::Resolve(format!("{}: {}", server, e)))?
            .next()
            .ok_or_else(|| ClientError::Resolve(server.to_string()))?;

        let bind_addr = if server_addr.is_ipv6() {
            "[::]:0"
        } else {
            "0.0.0.0:0"
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        info!("Client bound to {}, server {}", socket.local_addr()?, server_addr);

        Ok(Self {
            socket,
            server_addr,
            config,
            slot: None,
            sequence: 0,
            state: None,
            last_update: Instant::now(),
            snapshots_applied: 0,
            snapshots_skipped: 0,
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    pub fn slot(&self) -> Option<usize> {
        self.slot
    }

    /// Latest applied snapshot
    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    /// This client's own player in the latest snapshot
    pub fn local_player(&self) -> Option<&Player> {
        self.state.as_ref()?.players.get(self.slot?)
    }

    fn next_sequence(&mut self) -> u32 {
        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        sequence
    }

    async fn send_message(&mut self, slot: i32, packet: Packet) -> ClientResult<()> {
        let message = Message::new(slot, self.next_sequence(), packet);
        let bytes = encode(&message)?;
        self.socket.send_to(&bytes, self.server_addr).await?;
        Ok(())
    }

    fn reset(&mut self) {
        self.slot = None;
        self.state = None;
    }

    /// Performs the connect handshake and returns the assigned slot.
    ///
    /// The request is resent after 1, 2 and 3 retry intervals and the
    /// attempt is abandoned once the connect timeout passes. An explicit
    /// rejection returns immediately.
    pub async fn connect(&mut self, name: &str) -> ClientResult<usize> {
        let request = encode(&Message::new(
            UNASSIGNED_SLOT,
            self.next_sequence(),
            Packet::Connect(ConnectRequest::new(name)),
        ))?;

        info!("Connecting to {} as '{}'", self.server_addr, name);
        self.socket.send_to(&request, self.server_addr).await?;

        let start = tokio::time::Instant::now();
        let deadline = start + self.config.connect_timeout;
        let mut retries = 0;
        let mut buf = vec![0u8; MAX_PACKET_SIZE];

        loop {
            let next_retry = (retries < self.config.max_retries)
                .then(|| start + self.config.retry_interval * (retries + 1));
            let wake = next_retry.map_or(deadline, |at| at.min(deadline));

            match timeout_at(wake, self.socket.recv_from(&mut buf)).await {
                Ok(Ok((len, from))) => {
                    if from != self.server_addr {
                        debug!("Ignoring datagram from {} during handshake", from);
                        continue;
                    }
                    match decode(&buf[..len]).map(|m| m.packet) {
                        Some(Packet::ConnectAck(ack)) if ack.success => {
                            let slot = usize::try_from(ack.assigned_slot)
                                .map_err(|_| ClientError::Rejected)?;
                            self.slot = Some(slot);
                            self.state = None;
                            self.last_update = Instant::now();
                            info!("Connected to {}, assigned slot {}", self.server_addr, slot);
                            return Ok(slot);
                        }
                        Some(Packet::ConnectAck(_)) => {
                            warn!("Server rejected connection (server full?)");
                            return Err(ClientError::Rejected);
                        }
                        _ => debug!("Ignoring non-ack datagram during handshake"),
                    }
                }
                Ok(Err(e)) => {
                    // e.g. ICMP port unreachable surfacing on the socket
                    debug!("Receive error during handshake: {}", e);
                    if tokio::time::Instant::now() < wake {
                        sleep(Duration::from_millis(10)).await;
                    }
                }
                Err(_) => {}
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                warn!("No response from {} after {:?}", self.server_addr, self.config.connect_timeout);
                return Err(ClientError::Timeout(self.config.connect_timeout));
            }
            if next_retry.is_some_and(|at| now >= at) {
                retries += 1;
                info!("Retry attempt {}/{}...", retries, self.config.max_retries);
                if let Err(e) = self.socket.send_to(&request, self.server_addr).await {
                    error!("Failed to resend connect request: {}", e);
                }
            }
        }
    }

    /// Sends one frame of input. Does nothing while not connected.
    pub async fn send_input(&mut self, input: &InputState) -> ClientResult<()> {
        let Some(slot) = self.slot else {
            return Ok(());
        };
        self.send_message(slot as i32, Packet::Input(*input)).await
    }

    /// Drains every datagram that is already buffered and applies the newest
    /// snapshot among them. Returns true if a snapshot was applied.
    ///
    /// Snapshots older than the one already applied are discarded. A
    /// `Disconnect` from the server drops the connection.
    pub async fn receive_state(&mut self) -> bool {
        if self.slot.is_none() {
            return false;
        }

        // lets the I/O driver mark the socket readable before draining
        tokio::task::yield_now().await;

        let mut buf = vec![0u8; MAX_PACKET_SIZE + 1];
        let mut newest: Option<Box<GameState>> = None;

        loop {
            let (len, from) = match self.socket.try_recv_from(&mut buf) {
                Ok(received) => received,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    error!("Error receiving packet: {}", e);
                    break;
                }
            };
            if from != self.server_addr {
                continue;
            }

            match decode(&buf[..len]).map(|m| m.packet) {
                Some(Packet::StateSnapshot(snapshot)) => {
                    let is_newer = newest
                        .as_ref()
                        .map_or(true, |n| tick_is_newer(snapshot.tick, n.tick));
                    if is_newer {
                        if newest.replace(snapshot).is_some() {
                            self.snapshots_skipped += 1;
                        }
                    } else {
                        self.snapshots_skipped += 1;
                    }
                }
                Some(Packet::Disconnect) => {
                    warn!("Server closed the connection");
                    self.reset();
                    return false;
                }
                Some(other) => debug!("Ignoring unexpected {:?} packet", other.kind()),
                None => debug!("Ignoring malformed datagram ({} bytes)", len),
            }
        }

        let Some(snapshot) = newest else {
            return false;
        };

        let stale = self
            .state
            .as_ref()
            .is_some_and(|current| !tick_is_newer(snapshot.tick, current.tick));
        if stale {
            self.snapshots_skipped += 1;
            return false;
        }

        self.state = Some(*snapshot);
        self.last_update = Instant::now();
        self.snapshots_applied += 1;
        true
    }

    /// False once the server has been silent for longer than the liveness
    /// timeout; the connection is dropped at that point.
    pub fn is_connected(&mut self) -> bool {
        if self.slot.is_none() {
            return false;
        }
        if self.last_update.elapsed() > self.config.liveness_timeout {
            warn!(
                "Connection lost: no update from server for {:?}",
                self.last_update.elapsed()
            );
            self.reset();
            return false;
        }
        true
    }

    /// Age of the latest snapshot minus one tick interval
    pub fn latency_estimate(&self) -> Option<Duration> {
        self.slot?;
        Some(
            self.last_update
                .elapsed()
                .saturating_sub(self.config.tick_interval),
        )
    }

    /// Tells the server this client is leaving. The notice is sent a few
    /// times because any single datagram may be lost.
    pub async fn disconnect(&mut self) {
        let Some(slot) = self.slot else {
            return;
        };

        for i in 0..DISCONNECT_REPEATS {
            if let Err(e) = self.send_message(slot as i32, Packet::Disconnect).await {
                error!("Failed to send disconnect: {}", e);
            }
            if i + 1 < DISCONNECT_REPEATS {
                sleep(DISCONNECT_SPACING).await;
            }
        }

        info!("Disconnected from {}", self.server_addr);
        self.reset();
    }

    pub fn log_stats(&self) {
        let Some(slot) = self.slot else {
            info!("Not connected");
            return;
        };

        info!(
            "Slot {}, last update {:?} ago, {} snapshots applied, {} skipped",
            slot,
            self.last_update.elapsed(),
            self.snapshots_applied,
            self.snapshots_skipped
        );

        if let Some(state) = &self.state {
            info!(
                "Tick {}: {} players, {} enemies, {} enemy bullets",
                state.tick,
                state.player_count(),
                state.enemy_count(),
                state.enemy_bullet_count()
            );
        }

        if let Some(player) = self.local_player() {
            info!(
                "Score {}, health {}, {}",
                player.score,
                player.health,
                if player.alive { "ALIVE" } else { "DEAD" }
            );
        }
    }
}
