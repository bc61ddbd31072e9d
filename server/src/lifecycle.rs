//! Player lifecycle transitions: Alive -> Dead on lethal damage, Dead -> Alive
//! once the respawn time has passed. Joining (Inactive -> Alive) and leaving
//! (any -> Inactive) are pool insertions and removals done by the caller.

use log::info;
use shared::{spawn_position, Player, PLAYER_MAX_HEALTH, RESPAWN_TIME_MS};

/// Subtracts `amount` from a living player's health.
///
/// Returns true if this killed the player: health is floored at zero and the
/// respawn timer is armed. Dead players take no damage.
pub fn apply_damage(player: &mut Player, amount: i32, now: u64) -> bool {
    if !player.alive {
        return false;
    }

    player.health -= amount;
    if player.health > 0 {
        return false;
    }

    player.health = 0;
    player.alive = false;
    player.respawn_at = Some(now + RESPAWN_TIME_MS);
    true
}

/// Brings a dead player back once `now` reaches its respawn time.
///
/// Health, position and weapon state are reset; score and bullets already in
/// flight are kept.
pub fn respawn_if_due(player: &mut Player, now: u64) -> bool {
    if player.alive || !player.respawn_at.is_some_and(|at| now >= at) {
        return false;
    }

    let (x, y) = spawn_position(player.slot as usize);
    player.alive = true;
    player.health = PLAYER_MAX_HEALTH;
    player.x = x;
    player.y = y;
    player.shots_fired = 0;
    player.reloading = false;
    player.reload_started_at = 0;
    player.last_shot_at = None;
    player.respawn_at = None;

    info!("Player {} respawned", player.slot);
    true
}
