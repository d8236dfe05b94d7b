//! Performance benchmarks for critical game systems

use server::directory::PlayerDirectory;
use server::game::GameState;
use shared::{Command, GameView, ServerMessage};
use std::time::Instant;
use tokio::sync::mpsc;

/// Benchmarks command parsing performance
#[test]
fn benchmark_command_parsing() {
    let frames = ["CONNECT:Alice", "SETWORD:Alice:hangman", "GUESS:Bob:e", "DISCONNECT:Bob"];

    let iterations = 100_000;
    let start = Instant::now();

    for i in 0..iterations {
        let _ = Command::parse(frames[i % frames.len()]);
    }

    let duration = start.elapsed();
    println!(
        "Command parsing: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks message encoding performance
#[test]
fn benchmark_message_encoding() {
    let message = ServerMessage::Game(GameView {
        masked_word: "H _ N G M _ N".to_string(),
        attempts_left: 4,
        current_guesser: "Bob".to_string(),
        guessed_letters: vec!['G', 'H', 'M', 'N', 'X', 'Z'],
    });

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let _ = message.to_frame();
    }

    let duration = start.elapsed();
    println!(
        "Message encoding: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 1000);
}

/// Benchmarks full rounds with a broadcast to every connection per guess
#[test]
fn benchmark_rounds_with_many_players() {
    let mut game = GameState::with_directory(PlayerDirectory::with_seed(11));
    let players = 50;

    let mut receivers = Vec::new();
    let mut ids = Vec::new();
    for i in 0..players {
        let (tx, rx) = mpsc::channel(10_000);
        let (id, closed) = game.register("127.0.0.1:9000".parse().unwrap(), tx);
        game.connect(id, &format!("player{}", i));
        ids.push(id);
        receivers.push((rx, closed));
    }

    let rounds = 100;
    let start = Instant::now();

    for _ in 0..rounds {
        let setter = game.round().word_setter().to_string();
        let setter_id = ids[setter.trim_start_matches("player").parse::<usize>().unwrap()];
        game.set_word(setter_id, &setter, "ROUND");

        for letter in ['R', 'O', 'U', 'N', 'D'] {
            let guesser = game.round().current_guesser().to_string();
            let guesser_id = ids[guesser.trim_start_matches("player").parse::<usize>().unwrap()];
            game.guess(guesser_id, &guesser, letter);
        }

        for (rx, _) in receivers.iter_mut() {
            while rx.try_recv().is_ok() {}
        }
    }

    let duration = start.elapsed();
    println!(
        "Rounds: {} rounds with {} players in {:?}",
        rounds, players, duration
    );

    assert_eq!(game.registry().len(), players);
    assert!(duration.as_millis() < 2000);
}
