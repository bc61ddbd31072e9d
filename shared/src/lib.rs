//! Types and rules shared by the server and the client: arena and entity
//! constants, the fixed-capacity pools, the world snapshot, the player
//! lifecycle and the wire protocol.

pub mod entities;
pub mod pool;
pub mod protocol;
pub mod state;

pub use entities::{Bullet, Enemy, Explosion, InputState, Lifecycle, Player};
pub use pool::Pool;
pub use protocol::{decode, encode, encode_snapshot, Header, Message, Packet, PacketKind};
pub use state::GameState;

pub const ARENA_WIDTH: f32 = 1280.0;
pub const ARENA_HEIGHT: f32 = 720.0;

pub const PLAYER_WIDTH: f32 = 192.0;
pub const PLAYER_HEIGHT: f32 = 65.0;
pub const ENEMY_WIDTH: f32 = 192.0;
pub const ENEMY_HEIGHT: f32 = 65.0;
pub const BULLET_WIDTH: f32 = 40.0;
pub const BULLET_HEIGHT: f32 = 15.0;

pub const MAX_PLAYERS: usize = 4;
pub const MAX_BULLETS_PER_PLAYER: usize = 100;
pub const MAX_ENEMIES: usize = 10;
pub const MAX_ENEMY_BULLETS: usize = 50;
pub const MAX_EXPLOSIONS: usize = 20;

pub const SERVER_PORT: u16 = 9999;
pub const TICK_RATE: u32 = 30;
/// Fixed simulation step in seconds
pub const TICK_DELTA: f32 = 1.0 / TICK_RATE as f32;
/// Upper bound for any single simulation step, in seconds
pub const MAX_STEP_DELTA: f32 = 0.1;
/// Largest datagram either side will send or accept
pub const MAX_PACKET_SIZE: usize = 8192;
/// Silence in either direction longer than this is a disconnect (ms)
pub const LIVENESS_TIMEOUT_MS: u64 = 10_000;

pub const PLAYER_SPEED: f32 = 300.0;
pub const PLAYER_MAX_HEALTH: i32 = 100;
pub const BULLET_SPEED: f32 = 500.0;
pub const SHOOT_INTERVAL_MS: u64 = 200;
pub const SHOTS_BEFORE_RELOAD: u32 = 20;
pub const RELOAD_TIME_MS: u64 = 2000;
pub const RESPAWN_TIME_MS: u64 = 3000;

pub const ENEMY_SPEED: f32 = 300.0;
pub const ENEMY_BULLET_SPEED: f32 = 400.0;
pub const ENEMY_SPAWN_INTERVAL_MS: u64 = 2000;
pub const ENEMY_SHOOT_INTERVAL_MS: u64 = 1500;
pub const ENEMY_VARIANTS: u8 = 6;
/// Enemies spawn with their top edge in `[0, ARENA_HEIGHT - ENEMY_SPAWN_MARGIN)`
pub const ENEMY_SPAWN_MARGIN: f32 = 250.0;
/// Enemies further left than this are despawned
pub const ENEMY_DESPAWN_X: f32 = -200.0;
/// Enemy bullets live until they leave the arena by more than this
pub const ENEMY_BULLET_MARGIN: f32 = 50.0;
pub const EXPLOSION_DURATION_MS: u64 = 500;

pub const KILL_SCORE: u32 = 10;
pub const RAM_DAMAGE: i32 = 20;
pub const ENEMY_BULLET_DAMAGE: i32 = 10;

/// Axis-aligned box used by every overlap test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn get_bounds(&self) -> (f32, f32, f32, f32) {
        (self.x, self.y, self.x + self.w, self.y + self.h)
    }
}

/// Half-open box overlap: boxes that only touch along an edge do not collide.
pub fn check_collision(a: &Rect, b: &Rect) -> bool {
    let (x1, y1, x2, y2) = a.get_bounds();
    let (x3, y3, x4, y4) = b.get_bounds();

    !(x2 <= x3 || x4 <= x1 || y2 <= y3 || y4 <= y1)
}

/// Spawn point of a player slot; also where it respawns.
pub fn spawn_position(slot: usize) -> (f32, f32) {
    let slot = slot as f32;
    (100.0 + slot * 150.0, ARENA_HEIGHT / 2.0 + slot * 50.0 - 100.0)
}

/// Serial-number comparison for the wrapping tick counter.
///
/// Returns true when `a` was produced after `b`, assuming the two are less
/// than half the counter range apart.
pub fn tick_is_newer(a: u32, b: u32) -> bool {
    (a.wrapping_sub(b) as i32) > 0
}
