//! The world aggregate that the server simulates and broadcasts whole every
//! tick.

use crate::entities::{Bullet, Enemy, Explosion, Lifecycle, Player};
use crate::pool::Pool;
use crate::{MAX_ENEMIES, MAX_ENEMY_BULLETS, MAX_EXPLOSIONS, MAX_PLAYERS};
use serde::de::Error as _;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub type PlayerPool = Pool<Player, MAX_PLAYERS>;
pub type EnemyPool = Pool<Enemy, MAX_ENEMIES>;
pub type EnemyBulletPool = Pool<Bullet, MAX_ENEMY_BULLETS>;
pub type ExplosionPool = Pool<Explosion, MAX_EXPLOSIONS>;

/// Every pool plus the tick counter.
///
/// The active counts carried in a snapshot are derived from the pools when
/// encoding and checked against them when decoding, so they can never drift.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameState {
    /// Wraps at `u32::MAX`; compare with [`crate::tick_is_newer`]
    pub tick: u32,
    pub players: PlayerPool,
    pub enemies: EnemyPool,
    pub enemy_bullets: EnemyBulletPool,
    pub explosions: ExplosionPool,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn enemy_count(&self) -> usize {
        self.enemies.len()
    }

    pub fn enemy_bullet_count(&self) -> usize {
        self.enemy_bullets.len()
    }

    pub fn lifecycle(&self, slot: usize) -> Lifecycle {
        self.players
            .get(slot)
            .map_or(Lifecycle::Inactive, Player::lifecycle)
    }

    /// Adds an explosion; dropped silently when the pool is full.
    pub fn add_explosion(&mut self, x: f32, y: f32, now: u64) {
        self.explosions.spawn(Explosion {
            x,
            y,
            started_at: now,
        });
    }
}

impl Serialize for GameState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("GameState", 8)?;
        state.serialize_field("tick", &self.tick)?;
        state.serialize_field("player_count", &(self.player_count() as u32))?;
        state.serialize_field("enemy_count", &(self.enemy_count() as u32))?;
        state.serialize_field("enemy_bullet_count", &(self.enemy_bullet_count() as u32))?;
        state.serialize_field("players", &self.players)?;
        state.serialize_field("enemies", &self.enemies)?;
        state.serialize_field("enemy_bullets", &self.enemy_bullets)?;
        state.serialize_field("explosions", &self.explosions)?;
        state.end()
    }
}

#[derive(Deserialize)]
#[serde(rename = "GameState")]
struct WireState {
    tick: u32,
    player_count: u32,
    enemy_count: u32,
    enemy_bullet_count: u32,
    players: PlayerPool,
    enemies: EnemyPool,
    enemy_bullets: EnemyBulletPool,
    explosions: ExplosionPool,
}

impl<'de> Deserialize<'de> for GameState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireState::deserialize(deserializer)?;

        if wire.player_count as usize != wire.players.len()
            || wire.enemy_count as usize != wire.enemies.len()
            || wire.enemy_bullet_count as usize != wire.enemy_bullets.len()
        {
            return Err(D::Error::custom("snapshot counts disagree with pool occupancy"));
        }

        Ok(GameState {
            tick: wire.tick,
            players: wire.players,
            enemies: wire.enemies,
            enemy_bullets: wire.enemy_bullets,
            explosions: wire.explosions,
        })
    }
}
