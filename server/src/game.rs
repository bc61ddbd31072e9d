//! Authoritative simulation step.
//!
//! `Game` owns the world state plus the timers that are not part of any
//! snapshot (enemy spawn and the shared enemy shooting cooldown). All time is
//! server clock milliseconds handed in by the caller.

use crate::collision::{resolve_collisions, CollisionReport};
use crate::lifecycle::respawn_if_due;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{
    Bullet, Enemy, GameState, InputState, Player, ARENA_HEIGHT, ARENA_WIDTH, BULLET_SPEED,
    ENEMY_BULLET_MARGIN, ENEMY_BULLET_SPEED, ENEMY_DESPAWN_X, ENEMY_HEIGHT,
    ENEMY_SHOOT_INTERVAL_MS, ENEMY_SPAWN_INTERVAL_MS, ENEMY_SPAWN_MARGIN, ENEMY_SPEED,
    ENEMY_VARIANTS, EXPLOSION_DURATION_MS, MAX_STEP_DELTA, PLAYER_HEIGHT, PLAYER_SPEED,
    PLAYER_WIDTH, RELOAD_TIME_MS, SHOOT_INTERVAL_MS, SHOTS_BEFORE_RELOAD,
};

pub struct Game {
    pub state: GameState,
    last_enemy_spawn: u64,
    /// One cooldown shared by every enemy
    last_enemy_shot: u64,
    rng: StdRng,
}

impl Game {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            state: GameState::new(),
            last_enemy_spawn: 0,
            last_enemy_shot: 0,
            rng,
        }
    }

    /// Puts a fresh player into `slot`, replacing anything left there.
    pub fn add_player(&mut self, slot: usize) {
        let player = Player::new(slot as u8);
        info!("Added player {} at ({}, {})", slot, player.x, player.y);
        self.state.players.remove(slot);
        self.state.players.insert_at(slot, player);
    }

    pub fn remove_player(&mut self, slot: usize) {
        if self.state.players.remove(slot).is_some() {
            info!("Removed player {}", slot);
        }
    }

    /// Moves a living player and fires if requested.
    ///
    /// Axes are handled independently, so holding two orthogonal directions
    /// moves `PLAYER_SPEED` along each of them.
    pub fn apply_input(&mut self, slot: usize, input: &InputState, now: u64, dt: f32) {
        let Some(player) = self.state.players.get_mut(slot) else {
            return;
        };
        if !player.alive {
            return;
        }

        let dt = dt.clamp(0.0, MAX_STEP_DELTA);
        let vel_x = axis(input.left, input.right) * PLAYER_SPEED;
        let vel_y = axis(input.up, input.down) * PLAYER_SPEED;

        player.x = (player.x + vel_x * dt).clamp(0.0, ARENA_WIDTH - PLAYER_WIDTH);
        player.y = (player.y + vel_y * dt).clamp(0.0, ARENA_HEIGHT - PLAYER_HEIGHT);

        if input.firing {
            try_fire(player, now);
        }
    }

    /// Advances the world by one tick and resolves collisions.
    pub fn update(&mut self, now: u64, dt: f32) -> CollisionReport {
        let dt = dt.clamp(0.0, MAX_STEP_DELTA);

        self.update_players(now, dt);
        self.spawn_enemy(now);
        self.update_enemies(now, dt);
        self.update_enemy_bullets(dt);
        self.expire_explosions(now);

        let report = resolve_collisions(&mut self.state, now);
        self.state.tick = self.state.tick.wrapping_add(1);
        report
    }

    fn update_players(&mut self, now: u64, dt: f32) {
        for (_, player) in self.state.players.iter_mut() {
            respawn_if_due(player, now);

            if player.alive
                && player.reloading
                && now >= player.reload_started_at + RELOAD_TIME_MS
            {
                player.reloading = false;
                player.shots_fired = 0;
                debug!("Player {} reloaded", player.slot);
            }

            for (_, bullet) in player.bullets.iter_mut() {
                bullet.x += bullet.vx * dt;
                bullet.y += bullet.vy * dt;
            }
            player.bullets.retain(|b| {
                (0.0..=ARENA_WIDTH).contains(&b.x) && (0.0..=ARENA_HEIGHT).contains(&b.y)
            });
        }
    }

    fn spawn_enemy(&mut self, now: u64) {
        if now <= self.last_enemy_spawn + ENEMY_SPAWN_INTERVAL_MS || self.state.enemies.is_full() {
            return;
        }

        let y = self.rng.gen_range(0.0..ARENA_HEIGHT - ENEMY_SPAWN_MARGIN).floor();
        let variant = self.rng.gen_range(0..ENEMY_VARIANTS);
        if let Some(index) = self.state.enemies.spawn(Enemy::new(ARENA_WIDTH, y, variant)) {
            self.last_enemy_spawn = now;
            debug!("Enemy {} spawned at y={} (variant {})", index, y, variant);
        }
    }

    fn update_enemies(&mut self, now: u64, dt: f32) {
        let GameState {
            enemies,
            enemy_bullets,
            ..
        } = &mut self.state;

        for (_, enemy) in enemies.iter_mut() {
            enemy.x -= ENEMY_SPEED * dt;

            if now > self.last_enemy_shot + ENEMY_SHOOT_INTERVAL_MS && !enemy_bullets.is_full() {
                let shot = Bullet::new(
                    enemy.x,
                    enemy.y + ENEMY_HEIGHT / 2.0,
                    -ENEMY_BULLET_SPEED,
                    0.0,
                );
                if enemy_bullets.spawn(shot).is_some() {
                    self.last_enemy_shot = now;
                }
            }
        }

        enemies.retain(|enemy| enemy.x >= ENEMY_DESPAWN_X);
    }

    fn update_enemy_bullets(&mut self, dt: f32) {
        for (_, bullet) in self.state.enemy_bullets.iter_mut() {
            bullet.x += bullet.vx * dt;
            bullet.y += bullet.vy * dt;
        }

        let x_range = -ENEMY_BULLET_MARGIN..=ARENA_WIDTH + ENEMY_BULLET_MARGIN;
        let y_range = -ENEMY_BULLET_MARGIN..=ARENA_HEIGHT + ENEMY_BULLET_MARGIN;
        self.state
            .enemy_bullets
            .retain(|b| x_range.contains(&b.x) && y_range.contains(&b.y));
    }

    fn expire_explosions(&mut self, now: u64) {
        self.state
            .explosions
            .retain(|e| now.saturating_sub(e.started_at) <= EXPLOSION_DURATION_MS);
    }
}

/// -1, 0 or 1; opposing keys cancel
fn axis(negative: bool, positive: bool) -> f32 {
    match (negative, positive) {
        (true, false) => -1.0,
        (false, true) => 1.0,
        _ => 0.0,
    }
}

/// Fires one bullet if the weapon is ready. Returns true if a bullet spawned.
fn try_fire(player: &mut Player, now: u64) -> bool {
    if player.reloading || player.shots_fired >= SHOTS_BEFORE_RELOAD {
        return false;
    }
    if player
        .last_shot_at
        .is_some_and(|last| now < last + SHOOT_INTERVAL_MS)
    {
        return false;
    }

    let bullet = Bullet::new(
        player.x + PLAYER_WIDTH,
        player.y + PLAYER_HEIGHT / 2.0,
        BULLET_SPEED,
        0.0,
    );
    if player.bullets.spawn(bullet).is_none() {
        return false;
    }

    player.shots_fired += 1;
    player.last_shot_at = Some(now);
    if player.shots_fired >= SHOTS_BEFORE_RELOAD {
        player.reloading = true;
        player.reload_started_at = now;
        debug!("Player {} reloading", player.slot);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::{spawn_position, Explosion, Lifecycle, MAX_ENEMIES, MAX_ENEMY_BULLETS, TICK_DELTA};

    fn game_with_player(slot: usize) -> Game {
        let mut game = Game::new(Some(7));
        game.add_player(slot);
        game
    }

    fn firing() -> InputState {
        InputState {
            firing: true,
            ..InputState::default()
        }
    }

    #[test]
    fn test_add_and_remove_player() {
        let mut game = game_with_player(2);
        let player = game.state.players.get(2).unwrap();
        assert_eq!((player.x, player.y), spawn_position(2));
        assert_eq!(game.state.lifecycle(2), Lifecycle::Alive);

        game.remove_player(2);
        assert_eq!(game.state.lifecycle(2), Lifecycle::Inactive);
        assert_eq!(game.state.player_count(), 0);
    }

    #[test]
    fn test_add_player_reinitializes_slot() {
        let mut game = game_with_player(0);
        {
            let player = game.state.players.get_mut(0).unwrap();
            player.score = 90;
            player.health = 10;
            player.bullets.spawn(Bullet::new(10.0, 10.0, 500.0, 0.0));
        }
        game.remove_player(0);
        game.add_player(0);

        let player = game.state.players.get(0).unwrap();
        assert_eq!(player.score, 0);
        assert_eq!(player.health, 100);
        assert!(player.bullets.is_empty());
    }

    #[test]
    fn test_axis_movement() {
        let mut game = game_with_player(0);
        let (x0, y0) = spawn_position(0);
        let input = InputState {
            right: true,
            ..InputState::default()
        };
        game.apply_input(0, &input, 0, TICK_DELTA);

        let player = game.state.players.get(0).unwrap();
        assert_approx_eq!(player.x, x0 + PLAYER_SPEED * TICK_DELTA, 1e-3);
        assert_approx_eq!(player.y, y0, 1e-6);
    }

    #[test]
    fn test_opposing_keys_cancel() {
        let mut game = game_with_player(0);
        let (x0, y0) = spawn_position(0);
        let input = InputState {
            up: true,
            down: true,
            left: true,
            right: true,
            ..InputState::default()
        };
        game.apply_input(0, &input, 0, TICK_DELTA);

        let player = game.state.players.get(0).unwrap();
        assert_eq!((player.x, player.y), (x0, y0));
    }

    #[test]
    fn test_diagonal_movement_is_not_normalized() {
        // Documented current behavior: each axis moves at full speed, so the
        // diagonal is sqrt(2) times faster than a single axis.
        let mut game = game_with_player(1);
        let (x0, y0) = spawn_position(1);
        let input = InputState {
            down: true,
            right: true,
            ..InputState::default()
        };
        game.apply_input(1, &input, 0, 0.1);

        let player = game.state.players.get(1).unwrap();
        let distance = ((player.x - x0).powi(2) + (player.y - y0).powi(2)).sqrt();
        assert_approx_eq!(distance, PLAYER_SPEED * 0.1 * 2f32.sqrt(), 1e-2);
    }

    #[test]
    fn test_position_stays_in_arena() {
        let mut game = game_with_player(0);
        let inputs = [
            InputState {
                up: true,
                left: true,
                ..InputState::default()
            },
            InputState {
                down: true,
                right: true,
                ..InputState::default()
            },
        ];

        for input in &inputs {
            for _ in 0..200 {
                game.apply_input(0, input, 0, TICK_DELTA);
                let player = game.state.players.get(0).unwrap();
                assert!(player.x >= 0.0 && player.x <= ARENA_WIDTH - PLAYER_WIDTH);
                assert!(player.y >= 0.0 && player.y <= ARENA_HEIGHT - PLAYER_HEIGHT);
            }
        }

        let player = game.state.players.get(0).unwrap();
        assert_eq!(player.x, ARENA_WIDTH - PLAYER_WIDTH);
        assert_eq!(player.y, ARENA_HEIGHT - PLAYER_HEIGHT);
    }

    #[test]
    fn test_large_delta_is_clamped() {
        let mut game = game_with_player(0);
        let (x0, _) = spawn_position(0);
        let input = InputState {
            right: true,
            ..InputState::default()
        };
        game.apply_input(0, &input, 0, 5.0);

        let player = game.state.players.get(0).unwrap();
        assert_approx_eq!(player.x, x0 + PLAYER_SPEED * MAX_STEP_DELTA, 1e-3);
    }

    #[test]
    fn test_fire_spawns_bullet_at_nose() {
        let mut game = game_with_player(0);
        game.apply_input(0, &firing(), 1_000, TICK_DELTA);

        let player = game.state.players.get(0).unwrap();
        let (_, bullet) = player.bullets.iter().next().unwrap();
        assert_eq!(bullet.x, player.x + PLAYER_WIDTH);
        assert_eq!(bullet.y, player.y + PLAYER_HEIGHT / 2.0);
        assert_eq!(bullet.vx, BULLET_SPEED);
        assert_eq!(player.shots_fired, 1);
        assert_eq!(player.last_shot_at, Some(1_000));
    }

    #[test]
    fn test_fire_interval() {
        let mut game = game_with_player(0);
        game.apply_input(0, &firing(), 1_000, TICK_DELTA);
        game.apply_input(0, &firing(), 1_199, TICK_DELTA);
        assert_eq!(game.state.players.get(0).unwrap().bullets.len(), 1);

        game.apply_input(0, &firing(), 1_200, TICK_DELTA);
        assert_eq!(game.state.players.get(0).unwrap().bullets.len(), 2);
    }

    #[test]
    fn test_shot_cap_starts_reload() {
        let mut game = game_with_player(0);
        let mut now = 0;
        for _ in 0..SHOTS_BEFORE_RELOAD {
            game.apply_input(0, &firing(), now, TICK_DELTA);
            now += SHOOT_INTERVAL_MS;
        }

        let player = game.state.players.get(0).unwrap();
        assert_eq!(player.shots_fired, SHOTS_BEFORE_RELOAD);
        assert!(player.reloading);
        let fired_at = now - SHOOT_INTERVAL_MS;
        assert_eq!(player.reload_started_at, fired_at);

        // refused for the whole reload
        for t in [now, now + 1_000, fired_at + RELOAD_TIME_MS - 1] {
            game.apply_input(0, &firing(), t, TICK_DELTA);
        }
        assert_eq!(
            game.state.players.get(0).unwrap().bullets.len(),
            SHOTS_BEFORE_RELOAD as usize
        );

        game.update(fired_at + RELOAD_TIME_MS, 0.0);
        let player = game.state.players.get(0).unwrap();
        assert!(!player.reloading);
        assert_eq!(player.shots_fired, 0);

        game.apply_input(0, &firing(), fired_at + RELOAD_TIME_MS, TICK_DELTA);
        assert_eq!(game.state.players.get(0).unwrap().shots_fired, 1);
    }

    #[test]
    fn test_dead_player_ignores_input() {
        let mut game = game_with_player(0);
        let (x0, _) = spawn_position(0);
        game.state.players.get_mut(0).unwrap().alive = false;

        let input = InputState {
            right: true,
            firing: true,
            ..InputState::default()
        };
        game.apply_input(0, &input, 1_000, TICK_DELTA);

        let player = game.state.players.get(0).unwrap();
        assert_eq!(player.x, x0);
        assert!(player.bullets.is_empty());
    }

    #[test]
    fn test_input_for_empty_slot_is_ignored() {
        let mut game = Game::new(Some(1));
        game.apply_input(3, &firing(), 0, TICK_DELTA);
        assert_eq!(game.state.player_count(), 0);
    }

    #[test]
    fn test_bullets_advance_and_leave_arena() {
        let mut game = game_with_player(0);
        {
            let player = game.state.players.get_mut(0).unwrap();
            player.bullets.spawn(Bullet::new(100.0, 10.0, BULLET_SPEED, 0.0));
            player.bullets.spawn(Bullet::new(ARENA_WIDTH - 1.0, 10.0, BULLET_SPEED, 0.0));
        }
        game.update(0, 0.1);

        let player = game.state.players.get(0).unwrap();
        assert_eq!(player.bullets.len(), 1);
        let (_, bullet) = player.bullets.iter().next().unwrap();
        assert_approx_eq!(bullet.x, 150.0, 1e-3);
    }

    #[test]
    fn test_tick_increments_by_one() {
        let mut game = Game::new(Some(3));
        for expected in 1..=5 {
            game.update(0, TICK_DELTA);
            assert_eq!(game.state.tick, expected);
        }
    }

    #[test]
    fn test_tick_wraps() {
        let mut game = Game::new(Some(3));
        game.state.tick = u32::MAX;
        game.update(0, TICK_DELTA);
        assert_eq!(game.state.tick, 0);
    }

    #[test]
    fn test_enemy_spawn_interval() {
        let mut game = Game::new(Some(11));
        game.update(ENEMY_SPAWN_INTERVAL_MS, 0.0);
        assert_eq!(game.state.enemy_count(), 0);

        game.update(ENEMY_SPAWN_INTERVAL_MS + 1, 0.0);
        assert_eq!(game.state.enemy_count(), 1);
        let (_, enemy) = game.state.enemies.iter().next().unwrap();
        assert_eq!(enemy.x, ARENA_WIDTH);
        assert!(enemy.y >= 0.0 && enemy.y < ARENA_HEIGHT - ENEMY_SPAWN_MARGIN);
        assert!(enemy.variant < ENEMY_VARIANTS);
        assert_eq!(enemy.health, 1);

        game.update(2 * ENEMY_SPAWN_INTERVAL_MS + 1, 0.0);
        assert_eq!(game.state.enemy_count(), 1);
        game.update(2 * ENEMY_SPAWN_INTERVAL_MS + 2, 0.0);
        assert_eq!(game.state.enemy_count(), 2);
    }

    #[test]
    fn test_enemy_spawn_skipped_when_full() {
        let mut game = Game::new(Some(11));
        while game.state.enemies.spawn(Enemy::new(600.0, 100.0, 0)).is_some() {}

        game.update(10_000, 0.0);
        assert_eq!(game.state.enemy_count(), MAX_ENEMIES);
        // the spawn timer was not consumed
        assert_eq!(game.last_enemy_spawn, 0);
    }

    #[test]
    fn test_seeded_spawns_are_reproducible() {
        let mut a = Game::new(Some(42));
        let mut b = Game::new(Some(42));
        for step in 1..=5 {
            let now = step * (ENEMY_SPAWN_INTERVAL_MS + 1);
            a.update(now, 0.0);
            b.update(now, 0.0);
        }
        assert_eq!(a.state.enemies, b.state.enemies);
    }

    #[test]
    fn test_enemies_drift_and_despawn() {
        let mut game = Game::new(Some(5));
        game.state.enemies.spawn(Enemy::new(500.0, 100.0, 0));
        game.state.enemies.spawn(Enemy::new(-195.0, 300.0, 0));

        game.update(0, 0.1);

        assert_eq!(game.state.enemy_count(), 1);
        let (_, enemy) = game.state.enemies.iter().next().unwrap();
        assert_approx_eq!(enemy.x, 500.0 - ENEMY_SPEED * 0.1, 1e-3);
    }

    #[test]
    fn test_enemy_cooldown_is_shared() {
        // Documented current behavior: one cooldown for all enemies, so only a
        // single enemy fires per interval no matter how many are alive.
        let mut game = Game::new(Some(5));
        for y in [0.0, 150.0, 300.0] {
            game.state.enemies.spawn(Enemy::new(900.0, y, 0));
        }

        game.update(ENEMY_SHOOT_INTERVAL_MS + 1, 0.0);
        assert_eq!(game.state.enemy_bullet_count(), 1);
        let (_, shot) = game.state.enemy_bullets.iter().next().unwrap();
        assert_eq!(shot.y, ENEMY_HEIGHT / 2.0);
        assert_eq!(shot.vx, -ENEMY_BULLET_SPEED);

        game.update(2 * ENEMY_SHOOT_INTERVAL_MS + 1, 0.0);
        assert_eq!(game.state.enemy_bullet_count(), 1);
        game.update(2 * ENEMY_SHOOT_INTERVAL_MS + 2, 0.0);
        assert_eq!(game.state.enemy_bullet_count(), 2);
    }

    #[test]
    fn test_enemy_does_not_fire_when_pool_full() {
        let mut game = Game::new(Some(5));
        game.state.enemies.spawn(Enemy::new(900.0, 0.0, 0));
        while game
            .state
            .enemy_bullets
            .spawn(Bullet::new(600.0, 600.0, 0.0, 0.0))
            .is_some()
        {}

        game.update(ENEMY_SHOOT_INTERVAL_MS + 1, 0.0);
        assert_eq!(game.state.enemy_bullet_count(), MAX_ENEMY_BULLETS);
        assert_eq!(game.last_enemy_shot, 0);
    }

    #[test]
    fn test_enemy_bullets_leave_with_margin() {
        let mut game = Game::new(Some(5));
        game.state.enemy_bullets.spawn(Bullet::new(-40.0, 600.0, -ENEMY_BULLET_SPEED, 0.0));
        game.state.enemy_bullets.spawn(Bullet::new(-45.0, 600.0, -ENEMY_BULLET_SPEED, 0.0));

        game.update(0, 0.02);
        // -48 stays, -53 is gone
        assert_eq!(game.state.enemy_bullet_count(), 1);
    }

    #[test]
    fn test_explosions_expire() {
        let mut game = Game::new(Some(5));
        game.state.explosions.spawn(Explosion {
            x: 0.0,
            y: 0.0,
            started_at: 1_000,
        });

        game.update(1_000 + EXPLOSION_DURATION_MS, 0.0);
        assert_eq!(game.state.explosions.len(), 1);
        game.update(1_001 + EXPLOSION_DURATION_MS, 0.0);
        assert!(game.state.explosions.is_empty());
    }

    #[test]
    fn test_dead_player_respawns_on_update() {
        let mut game = game_with_player(3);
        {
            let player = game.state.players.get_mut(3).unwrap();
            player.alive = false;
            player.health = 0;
            player.x = 5.0;
            player.respawn_at = Some(4_000);
        }

        game.update(3_999, 0.0);
        assert_eq!(game.state.lifecycle(3), Lifecycle::Dead);

        game.update(4_000, 0.0);
        let player = game.state.players.get(3).unwrap();
        assert_eq!(player.lifecycle(), Lifecycle::Alive);
        assert_eq!(player.health, 100);
        assert_eq!((player.x, player.y), spawn_position(3));
    }
}
