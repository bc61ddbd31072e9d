//! Entity records stored in the world pools.
//!
//! All of these are plain data. The rules that move them, damage them and
//! bring them back to life run on the server; the client only reads them out
//! of snapshots.

use crate::pool::Pool;
use crate::{
    spawn_position, Rect, BULLET_HEIGHT, BULLET_WIDTH, ENEMY_HEIGHT, ENEMY_WIDTH,
    MAX_BULLETS_PER_PLAYER, PLAYER_HEIGHT, PLAYER_MAX_HEALTH, PLAYER_WIDTH,
};
use serde::{Deserialize, Serialize};

/// A projectile. Player bullets and enemy bullets share the record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bullet {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

impl Bullet {
    pub fn new(x: f32, y: f32, vx: f32, vy: f32) -> Self {
        Self { x, y, vx, vy }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, BULLET_WIDTH, BULLET_HEIGHT)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub x: f32,
    pub y: f32,
    /// Visual variant, `0..ENEMY_VARIANTS`
    pub variant: u8,
    pub health: i32,
}

impl Enemy {
    pub fn new(x: f32, y: f32, variant: u8) -> Self {
        Self {
            x,
            y,
            variant,
            health: 1,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, ENEMY_WIDTH, ENEMY_HEIGHT)
    }
}

/// Purely visual; expires after a fixed lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Explosion {
    pub x: f32,
    pub y: f32,
    /// Server clock (ms) when the explosion started
    pub started_at: u64,
}

/// Where a player slot is in its lifecycle.
///
/// `Inactive` slots are not in the player pool at all. `Dead` players stay in
/// the pool (and in every snapshot) but ignore input and take no part in
/// collisions until their respawn time passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Inactive,
    Alive,
    Dead,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub slot: u8,
    pub x: f32,
    pub y: f32,
    pub health: i32,
    pub score: u32,
    pub alive: bool,
    pub bullets: Pool<Bullet, MAX_BULLETS_PER_PLAYER>,
    /// Shots fired since the last completed reload
    pub shots_fired: u32,
    pub reloading: bool,
    pub reload_started_at: u64,
    #[serde(with = "fixed_option")]
    pub last_shot_at: Option<u64>,
    #[serde(with = "fixed_option")]
    pub respawn_at: Option<u64>,
}

impl Player {
    /// A freshly joined player at its slot's spawn point with full health and
    /// an empty weapon.
    pub fn new(slot: u8) -> Self {
        let (x, y) = spawn_position(slot as usize);
        Self {
            slot,
            x,
            y,
            health: PLAYER_MAX_HEALTH,
            alive: true,
            ..Self::default()
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, PLAYER_WIDTH, PLAYER_HEIGHT)
    }

    pub fn lifecycle(&self) -> Lifecycle {
        if self.alive {
            Lifecycle::Alive
        } else {
            Lifecycle::Dead
        }
    }
}

/// Per-frame control state sent by a client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub firing: bool,
    /// Client clock in ms; informational only, the server never trusts it
    pub timestamp: u64,
}

/// `Option<u64>` encoded as `(present, value)` so the record keeps a fixed
/// encoded size whether or not the value is set.
mod fixed_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        (value.is_some(), value.unwrap_or(0)).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        let (present, value) = <(bool, u64)>::deserialize(deserializer)?;
        Ok(present.then_some(value))
    }
}
