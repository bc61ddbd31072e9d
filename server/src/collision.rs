//! Collision resolution for one tick.
//!
//! Three passes run in a fixed order:
//! 1. player bullets against enemies,
//! 2. players ramming enemies,
//! 3. enemy bullets against players.
//!
//! Every check sees the pools as left by the checks before it, so an entity
//! removed earlier in the tick cannot be hit again, and a player killed
//! earlier in the tick is no longer a target or an attacker.

use crate::lifecycle::apply_damage;
use log::info;
use shared::{check_collision, Explosion, GameState, ENEMY_BULLET_DAMAGE, KILL_SCORE, RAM_DAMAGE};

/// What happened during one resolution pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollisionReport {
    pub bullet_kills: u32,
    pub rams: u32,
    pub enemy_bullet_hits: u32,
    /// Slots of players killed this pass
    pub deaths: Vec<u8>,
}

pub fn resolve_collisions(state: &mut GameState, now: u64) -> CollisionReport {
    let mut report = CollisionReport::default();
    player_bullets_vs_enemies(state, now, &mut report);
    players_vs_enemies(state, now, &mut report);
    enemy_bullets_vs_players(state, now, &mut report);
    report
}

fn player_bullets_vs_enemies(state: &mut GameState, now: u64, report: &mut CollisionReport) {
    let GameState {
        players,
        enemies,
        explosions,
        ..
    } = state;

    for (_, player) in players.iter_mut() {
        if !player.alive {
            continue;
        }

        for b in 0..player.bullets.capacity() {
            let Some(bullet) = player.bullets.get(b).copied() else {
                continue;
            };

            let hit = enemies
                .iter()
                .find(|(_, enemy)| check_collision(&bullet.rect(), &enemy.rect()))
                .map(|(e, enemy)| (e, enemy.x, enemy.y));

            if let Some((e, ex, ey)) = hit {
                player.bullets.remove(b);
                enemies.remove(e);
                player.score += KILL_SCORE;
                explosions.spawn(Explosion {
                    x: ex,
                    y: ey,
                    started_at: now,
                });
                report.bullet_kills += 1;
            }
        }
    }
}

fn players_vs_enemies(state: &mut GameState, now: u64, report: &mut CollisionReport) {
    for p in 0..state.players.capacity() {
        for e in 0..state.enemies.capacity() {
            let Some(player) = state.players.get(p) else {
                break;
            };
            if !player.alive {
                break;
            }
            let Some(enemy) = state.enemies.get(e).copied() else {
                continue;
            };
            if !check_collision(&player.rect(), &enemy.rect()) {
                continue;
            }

            state.enemies.remove(e);
            state.add_explosion(enemy.x, enemy.y, now);
            report.rams += 1;

            let Some(player) = state.players.get_mut(p) else {
                break;
            };
            player.score += KILL_SCORE;
            if apply_damage(player, RAM_DAMAGE, now) {
                let (px, py, slot, score) = (player.x, player.y, player.slot, player.score);
                state.add_explosion(px, py, now);
                report.deaths.push(slot);
                info!("Player {} killed by collision (score: {})", slot, score);
            }
        }
    }
}

fn enemy_bullets_vs_players(state: &mut GameState, now: u64, report: &mut CollisionReport) {
    for b in 0..state.enemy_bullets.capacity() {
        let Some(bullet) = state.enemy_bullets.get(b).copied() else {
            continue;
        };

        let target = state
            .players
            .iter()
            .find(|(_, player)| player.alive && check_collision(&bullet.rect(), &player.rect()))
            .map(|(p, _)| p);

        let Some(p) = target else {
            continue;
        };

        state.enemy_bullets.remove(b);
        report.enemy_bullet_hits += 1;

        if let Some(player) = state.players.get_mut(p) {
            if apply_damage(player, ENEMY_BULLET_DAMAGE, now) {
                let (px, py, slot, score) = (player.x, player.y, player.slot, player.score);
                state.add_explosion(px, py, now);
                report.deaths.push(slot);
                info!("Player {} killed by enemy fire (score: {})", slot, score);
            }
        }
    }
}
