//! Server network layer: UDP socket tasks and the fixed-rate tick loop.
//!
//! A receiver task forwards raw datagrams to the tick loop over a channel and
//! a sender task drains the outgoing queue, so socket I/O never blocks the
//! simulation. All state changes still happen on the tick loop, one datagram
//! at a time.

use crate::config::ServerConfig;
use crate::game_server::{GameMessage, GameServer};
use log::{debug, error, info, warn};
use shared::{MAX_PACKET_SIZE, MAX_STEP_DELTA};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { bytes: Vec<u8>, addr: SocketAddr },
}

/// Main server coordinating networking and game simulation
pub struct Server {
    socket: Arc<UdpSocket>,
    game_server: GameServer,
    started: Instant,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: Option<mpsc::UnboundedReceiver<GameMessage>>,
}

impl Server {
    pub async fn new(config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let addr = config.bind_addr();
        let socket = Arc::new(UdpSocket::bind(&addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            game_server: GameServer::new(config),
            started: Instant::now(),
            server_tx,
            server_rx,
            game_tx,
            game_rx: Some(game_rx),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Milliseconds since the server started
    fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            // One spare byte so oversized datagrams are seen as such
            let mut buffer = vec![0u8; MAX_PACKET_SIZE + 1];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        let bytes = buffer[..len].to_vec();
                        if let Err(e) = server_tx.send(ServerMessage::PacketReceived { bytes, addr }) {
                            error!("Failed to send packet to main loop: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let Some(mut game_rx) = self.game_rx.take() else {
            return;
        };
        let socket = Arc::clone(&self.socket);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { bytes, addr } => {
                        if let Err(e) = socket.send_to(&bytes, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { bytes, addrs } => {
                        for addr in addrs {
                            if let Err(e) = socket.send_to(&bytes, addr).await {
                                error!("Failed to send snapshot to {}: {}", addr, e);
                            }
                        }
                    }
                }
            }
        });
    }

    fn queue(&self, message: GameMessage) {
        if let Err(e) = self.game_tx.send(message) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    /// Handles every datagram that has arrived since the last tick
    fn drain_inbound(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(ServerMessage::PacketReceived { bytes, addr }) = self.server_rx.try_recv() {
            let now = self.now_ms();
            if let Some(reply) = self.game_server.handle_datagram(&bytes, addr, now) {
                self.queue(reply);
            }
            handled += 1;
        }
        handled
    }

    /// Main server loop: drain, simulate, broadcast, sweep, then wait for
    /// the next tick boundary.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();

        let config = self.game_server.config().clone();
        let mut tick_interval = interval(config.tick_duration());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_tick = Instant::now();
        let mut last_stats = Instant::now();

        info!(
            "Server started: {} Hz, {} s client timeout",
            config.tick_rate,
            config.timeout.as_secs()
        );

        loop {
            tick_interval.tick().await;

            let tick_start = Instant::now();
            let gap = tick_start.duration_since(last_tick).as_secs_f32();
            last_tick = tick_start;
            if gap > MAX_STEP_DELTA {
                warn!(
                    "Tick loop stalled for {:.0} ms, simulating a single fixed step",
                    gap * 1000.0
                );
            }

            let handled = self.drain_inbound();

            let now = self.now_ms();
            for message in self.game_server.tick(now) {
                self.queue(message);
            }

            if last_stats.elapsed() >= config.stats_interval {
                self.game_server.log_stats();
                last_stats = Instant::now();
            }

            debug!(
                "Tick {} took {:?} ({} datagrams)",
                self.game_server.state().tick,
                tick_start.elapsed(),
                handled
            );
        }
    }
}
