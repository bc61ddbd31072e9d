//! Performance benchmarks for critical game systems

use server::collision::resolve_collisions;
use server::game::Game;
use server::{GameServer, ServerConfig};
use shared::protocol::{ConnectRequest, UNASSIGNED_SLOT};
use shared::{
    check_collision, decode, encode, encode_snapshot, Bullet, Enemy, GameState, InputState,
    Message, Packet, Player, Rect, MAX_ENEMIES, MAX_ENEMY_BULLETS, MAX_PLAYERS, TICK_DELTA,
};
use std::net::SocketAddr;
use std::time::Instant;

/// A world with every pool filled to capacity
fn full_world() -> GameState {
    let mut state = GameState::new();
    for slot in 0..MAX_PLAYERS {
        let mut player = Player::new(slot as u8);
        let mut x = 0.0;
        while player
            .bullets
            .spawn(Bullet::new(x, 20.0 + slot as f32 * 150.0, 500.0, 0.0))
            .is_some()
        {
            x += 12.0;
        }
        state.players.insert_at(slot, player);
    }
    let mut y = 0.0;
    while state.enemies.spawn(Enemy::new(1100.0, y, 0)).is_some() {
        y += 45.0;
    }
    while state
        .enemy_bullets
        .spawn(Bullet::new(1000.0, 700.0, -400.0, 0.0))
        .is_some()
    {}
    state
}

/// Benchmarks collision detection performance
#[test]
fn benchmark_collision_detection() {
    let a = Rect::new(100.0, 100.0, 192.0, 65.0);
    let b = Rect::new(150.0, 120.0, 40.0, 15.0);

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let _ = check_collision(&a, &b);
    }

    let duration = start.elapsed();
    println!(
        "Collision detection: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 100);
}

/// Benchmarks a full collision pass over saturated pools
#[test]
fn benchmark_collision_pass() {
    let world = full_world();
    assert_eq!(world.enemy_count(), MAX_ENEMIES);
    assert_eq!(world.enemy_bullet_count(), MAX_ENEMY_BULLETS);

    let iterations = 1_000;
    let start = Instant::now();

    for i in 0..iterations {
        let mut state = world.clone();
        resolve_collisions(&mut state, i);
    }

    let duration = start.elapsed();
    println!(
        "Collision pass: {} passes in {:?} ({:.2} μs/pass)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // a tick is 33 ms; a pass must be a small fraction of it
    assert!(duration.as_millis() < 2_000);
}

/// Benchmarks the simulation step with every player active and firing
#[test]
fn benchmark_simulation_step() {
    let mut game = Game::new(Some(1));
    for slot in 0..MAX_PLAYERS {
        game.add_player(slot);
    }
    let input = InputState {
        up: true,
        right: true,
        firing: true,
        ..InputState::default()
    };

    let ticks = 3_000u64;
    let start = Instant::now();

    for tick in 0..ticks {
        let now = tick * 33;
        for slot in 0..MAX_PLAYERS {
            game.apply_input(slot, &input, now, TICK_DELTA);
        }
        game.update(now, TICK_DELTA);
    }

    let duration = start.elapsed();
    println!(
        "Simulation: {} ticks in {:?} ({:.2} μs/tick)",
        ticks,
        duration,
        duration.as_micros() as f64 / ticks as f64
    );

    assert_eq!(game.state.tick, ticks as u32);
    assert!(duration.as_millis() < 3_000);
}

/// Benchmarks encoding and decoding of a full snapshot
#[test]
fn benchmark_snapshot_processing() {
    let state = full_world();

    let iterations = 1_000;
    let start = Instant::now();

    for i in 0..iterations {
        let bytes = encode_snapshot(i, &state).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.sequence, i);
    }

    let duration = start.elapsed();
    println!(
        "Snapshot processing: {} roundtrips in {:?} ({:.2} μs/roundtrip)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 5_000);
}

/// Stress test: a flood of inputs handled by the server context
#[test]
fn stress_test_many_inputs() {
    let mut server = GameServer::new(ServerConfig {
        seed: Some(2),
        ..ServerConfig::default()
    });

    let addrs: Vec<SocketAddr> = (0..MAX_PLAYERS as u16)
        .map(|i| SocketAddr::from(([127, 0, 0, 1], 40_000 + i)))
        .collect();
    for addr in &addrs {
        let connect = Message::new(
            UNASSIGNED_SLOT,
            0,
            Packet::Connect(ConnectRequest::new("bench")),
        );
        server.handle_datagram(&encode(&connect).unwrap(), *addr, 0);
    }
    assert_eq!(server.clients().len(), MAX_PLAYERS);

    let inputs: Vec<Vec<u8>> = (0..MAX_PLAYERS)
        .map(|slot| {
            let input = InputState {
                down: slot % 2 == 0,
                left: slot % 2 == 1,
                firing: true,
                ..InputState::default()
            };
            encode(&Message::new(slot as i32, 1, Packet::Input(input))).unwrap()
        })
        .collect();

    let rounds = 10_000u64;
    let start = Instant::now();

    for round in 0..rounds {
        for (slot, bytes) in inputs.iter().enumerate() {
            server.handle_datagram(bytes, addrs[slot], round);
        }
    }

    let duration = start.elapsed();
    println!(
        "Input handling: {} datagrams in {:?}",
        rounds * MAX_PLAYERS as u64,
        duration
    );

    for (_, player) in server.state().players.iter() {
        assert!(player.shots_fired <= 20);
    }
    assert!(duration.as_millis() < 3_000);
}
