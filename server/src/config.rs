//! Server runtime configuration.

use shared::{LIVENESS_TIMEOUT_MS, MAX_STEP_DELTA, SERVER_PORT, TICK_RATE};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind, e.g. `0.0.0.0`
    pub host: String,
    pub port: u16,
    /// Simulation and broadcast rate in Hz
    pub tick_rate: u32,
    /// Silence after which a session is evicted
    pub timeout: Duration,
    /// Seed for enemy spawn rows and variants; random when unset
    pub seed: Option<u64>,
    /// How often the tick loop logs a stats summary
    pub stats_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: SERVER_PORT,
            tick_rate: TICK_RATE,
            timeout: Duration::from_millis(LIVENESS_TIMEOUT_MS),
            seed: None,
            stats_interval: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }

    /// Fixed step handed to the simulation each tick, never above `MAX_STEP_DELTA`
    pub fn tick_delta(&self) -> f32 {
        (1.0 / self.tick_rate.max(1) as f32).min(MAX_STEP_DELTA)
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}
