//! Scripted input source for the headless client.
//!
//! Stands in for keyboard polling: the plane sweeps up and down across the
//! arena while holding the trigger, which keeps the server's movement,
//! weapon and collision paths busy.

use shared::InputState;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Frames spent moving in one direction before turning around
const SWEEP_FRAMES: u64 = 45;

pub struct InputManager {
    frame: u64,
    firing: bool,
    current_input: InputState,
}

impl InputManager {
    pub fn new(firing: bool) -> Self {
        Self {
            frame: 0,
            firing,
            current_input: InputState::default(),
        }
    }

    /// Produces the input for the next frame
    pub fn update(&mut self) -> InputState {
        let moving_up = (self.frame / SWEEP_FRAMES) % 2 == 0;
        self.frame += 1;

        self.current_input = InputState {
            up: moving_up,
            down: !moving_up,
            left: false,
            right: false,
            firing: self.firing,
            timestamp: Self::get_timestamp(),
        };
        self.current_input
    }

    /// Returns the current input state
    pub fn get_current_input(&self) -> &InputState {
        &self.current_input
    }

    fn get_timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_millis() as u64
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new(true)
    }
}
