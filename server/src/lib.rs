//! # Hangman Game Server Library
//!
//! This library provides the authoritative server for the multiplayer
//! word-guessing game. It owns the single shared round, accepts many
//! concurrent text-protocol connections, and broadcasts every state
//! transition to all connected participants.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Round
//! The server holds the only copy of the secret word, the guessed letters,
//! the remaining attempts and the word-setter / guesser roles. Clients only
//! ever see the masked word.
//!
//! ### Player Lifecycle
//! Handles the complete lifecycle of players including:
//! - Joining and rejoining under a name, with color and score kept across reconnects
//! - Turn rotation among connected guessers
//! - Repairing the round when the setter or the current guesser leaves
//!
//! ### Broadcasting
//! Every transition is pushed to all connections. A peer that cannot keep up
//! or has gone away is torn down through the same path as a voluntary leave.
//!
//! ## Architecture Design
//!
//! ### One Critical Section
//! Connection registry, player directory and round state live together in
//! [`game::GameState`] behind a single async mutex. Each transition runs to
//! completion while the lock is held, so a guess and a disconnect arriving on
//! two connections never interleave.
//!
//! ### Task Per Connection
//! Each accepted TCP connection gets a reader task (framing, parsing,
//! dispatch) and a writer task draining a bounded outbound queue. Sends made
//! under the lock only enqueue, so a stalled peer never blocks the others.
//!
//! ### Line Protocol
//! Frames are newline-delimited UTF-8 text with colon-separated fields; see
//! the `shared` crate for the command and message formats.
//!
//! ## Module Organization
//!
//! - `registry`: live connections and the name bound to each
//! - `directory`: per-name color, score and active flag
//! - `round`: the round state machine and turn selection helpers
//! - `transport`: unicast/broadcast and the socket writer task
//! - `game`: the shared state and every transition
//! - `handler`: the per-connection read loop
//! - `network`: the TCP listener
//! - `config`: JSON configuration file
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{ConnectionSettings, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let server = Server::bind("0.0.0.0:8888", ConnectionSettings::default()).await?;
//!     server.run().await
//! }
//! ```

pub mod config;
pub mod directory;
pub mod game;
pub mod handler;
pub mod network;
pub mod registry;
pub mod round;
pub mod transport;
