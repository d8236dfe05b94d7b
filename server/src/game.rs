use crate::directory::PlayerDirectory;
use crate::registry::{ConnectionId, ConnectionRegistry};
use crate::round::{self, GuessOutcome, Phase, RoundState};
use crate::transport::{self, DeliveryError};
use log::{debug, info, warn};
use shared::{ServerMessage, WINNING_SCORE};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};

/// The game state shared by every connection task
pub type SharedState = Arc<Mutex<GameState>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoundResult {
    Guessed,
    OutOfAttempts,
}

/// Registry, player directory and round, mutated as one unit
///
/// Every public transition runs to completion, including teardown of peers
/// whose delivery failed along the way, before the caller releases the lock.
pub struct GameState {
    registry: ConnectionRegistry,
    directory: PlayerDirectory,
    round: RoundState,
    failed: Vec<ConnectionId>,
}

impl GameState {
    pub fn new() -> Self {
        Self::with_directory(PlayerDirectory::new())
    }

    pub fn with_directory(directory: PlayerDirectory) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            directory,
            round: RoundState::new(),
            failed: Vec::new(),
        }
    }

    pub fn into_shared(self) -> SharedState {
        Arc::new(Mutex::new(self))
    }

    pub fn register(
        &mut self,
        addr: SocketAddr,
        outbound: mpsc::Sender<String>,
    ) -> (ConnectionId, oneshot::Receiver<()>) {
        self.registry.register(addr, outbound)
    }

    /// `CONNECT:<name>`
    pub fn connect(&mut self, id: ConnectionId, name: &str) {
        let displaced = match self.registry.bind_name(id, name) {
            Ok(displaced) => displaced,
            Err(e) => {
                debug!("Ignoring CONNECT:{} from connection {}: {}", name, id, e);
                return;
            }
        };
        if let Some(previous) = displaced {
            info!(
                "{} reconnected on connection {}, dropping connection {}",
                name, id, previous.id
            );
        }

        self.directory.touch(name);
        self.directory.set_active(name, true);
        info!("Player {} joined on connection {}", name, id);

        if self.round.word_setter().is_empty() {
            self.round.appoint_setter(name);
            info!("{} sets the first word", name);
            self.broadcast(ServerMessage::WaitWord {
                setter: name.to_string(),
            });
        } else if self.round.phase() == Phase::Guessing {
            self.unicast(id, ServerMessage::Game(self.round.view()));
        } else {
            self.unicast(
                id,
                ServerMessage::WaitWord {
                    setter: self.round.word_setter().to_string(),
                },
            );
        }

        self.broadcast_users();
        self.reap_failed();
    }

    /// `SETWORD:<name>:<word>`, word already upper-cased
    pub fn set_word(&mut self, id: ConnectionId, name: &str, word: &str) {
        if !self.is_bound_as(id, name) {
            debug!("Ignoring SETWORD from connection {} claiming {}", id, name);
            return;
        }
        if self.round.phase() != Phase::WaitingForWord || self.round.word_setter() != name {
            debug!("Ignoring SETWORD from {}: not their turn", name);
            return;
        }

        let guesser = self
            .first_active_guesser()
            .unwrap_or_else(|| name.to_string());
        self.round.begin(word, &guesser);
        info!(
            "{} set a {}-letter word, {} guesses first",
            name,
            word.chars().count(),
            guesser
        );

        self.broadcast(ServerMessage::Game(self.round.view()));
        self.reap_failed();
    }

    /// `GUESS:<name>:<letter>`, letter already upper-cased
    pub fn guess(&mut self, id: ConnectionId, name: &str, letter: char) {
        if !self.is_bound_as(id, name) {
            debug!("Ignoring GUESS from connection {} claiming {}", id, name);
            return;
        }
        if self.round.phase() != Phase::Guessing || self.round.current_guesser() != name {
            debug!("Ignoring GUESS from {}: not their turn", name);
            return;
        }

        match self.round.record_guess(letter) {
            GuessOutcome::Repeated => {
                debug!("{} repeated letter {}", name, letter);
                return;
            }
            GuessOutcome::Hit => debug!("{} revealed {}", name, letter),
            GuessOutcome::Miss => {
                debug!("{} missed with {}", name, letter);
                let active = self.directory.active_names();
                let next = round::next_guesser(
                    &active,
                    self.round.word_setter(),
                    self.round.current_guesser(),
                )
                .map(str::to_string);
                if let Some(next) = next {
                    self.round.set_current_guesser(&next);
                }
            }
        }

        if self.round.is_won() {
            self.finish_round(RoundResult::Guessed);
        } else if self.round.is_lost() {
            self.finish_round(RoundResult::OutOfAttempts);
        } else {
            self.broadcast(ServerMessage::Game(self.round.view()));
        }
        self.reap_failed();
    }

    /// Peer closed, sent `DISCONNECT`, or failed a delivery. Idempotent.
    pub fn disconnect(&mut self, id: ConnectionId) {
        self.leave(id);
        self.reap_failed();
    }

    pub fn round(&self) -> &RoundState {
        &self.round
    }

    pub fn directory(&self) -> &PlayerDirectory {
        &self.directory
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    fn finish_round(&mut self, result: RoundResult) {
        let scorer = match result {
            RoundResult::Guessed => {
                let guesser = self.round.current_guesser().to_string();
                self.round.set_word_setter(&guesser);
                self.round.clear_current_guesser();
                info!("{} guessed {}", guesser, self.round.secret_word());
                guesser
            }
            RoundResult::OutOfAttempts => {
                let setter = self.round.word_setter().to_string();
                match self.first_active_guesser() {
                    Some(guesser) => self.round.set_current_guesser(&guesser),
                    None => self.round.clear_current_guesser(),
                }
                info!("Nobody guessed {}, point to {}", self.round.secret_word(), setter);
                setter
            }
        };

        let score = self.directory.add_score(&scorer, 1).unwrap_or(0);
        if score >= WINNING_SCORE {
            info!("{} wins the game with {} points", scorer, score);
            self.broadcast(ServerMessage::GameFinal {
                text: format!("{} won with {} points!", scorer, score),
            });
            self.directory.clear_scores();
            self.round.set_word_setter(&scorer);
            self.round.clear_current_guesser();
        }

        self.round.start_next_round();
        self.broadcast(ServerMessage::UpdateWord);
        self.broadcast(ServerMessage::WaitWord {
            setter: self.round.word_setter().to_string(),
        });
        self.broadcast_users();
    }

    fn leave(&mut self, id: ConnectionId) {
        let connection = match self.registry.unregister(id) {
            Some(connection) => connection,
            None => return,
        };
        let name = match connection.name {
            Some(name) => name,
            None => return,
        };

        self.directory.set_active(&name, false);
        info!("Player {} left", name);

        if name == self.round.word_setter() || name == self.round.current_guesser() {
            if self.directory.active_names().is_empty() {
                info!("No active players left, resetting the round");
                self.round.reset();
            } else {
                let guesser = self
                    .first_active_guesser()
                    .unwrap_or_else(|| self.round.word_setter().to_string());
                self.round.set_current_guesser(&guesser);
                self.broadcast_round();
            }
        }

        self.broadcast_users();
    }

    fn first_active_guesser(&self) -> Option<String> {
        let active = self.directory.active_names();
        round::first_guesser(&active, self.round.word_setter()).map(str::to_string)
    }

    fn is_bound_as(&self, id: ConnectionId, name: &str) -> bool {
        self.registry.name_of(id) == Some(name)
    }

    fn broadcast_round(&mut self) {
        let message = match self.round.phase() {
            Phase::Guessing => ServerMessage::Game(self.round.view()),
            Phase::WaitingForWord => ServerMessage::WaitWord {
                setter: self.round.word_setter().to_string(),
            },
        };
        self.broadcast(message);
    }

    fn broadcast_users(&mut self) {
        self.broadcast(ServerMessage::Users(self.directory.snapshot()));
    }

    fn unicast(&mut self, id: ConnectionId, message: ServerMessage) {
        match transport::send_to(&self.registry, id, &message) {
            Ok(()) => {}
            Err(DeliveryError::NotRegistered) => {}
            Err(e) => {
                warn!("Failed to deliver to connection {}: {}", id, e);
                self.mark_failed(id);
            }
        }
    }

    fn broadcast(&mut self, message: ServerMessage) {
        for id in transport::broadcast_to_all(&self.registry, &message) {
            self.mark_failed(id);
        }
    }

    fn mark_failed(&mut self, id: ConnectionId) {
        if !self.failed.contains(&id) {
            self.failed.push(id);
        }
    }

    // Teardown can itself broadcast and discover more dead peers.
    fn reap_failed(&mut self) {
        while let Some(id) = self.failed.pop() {
            self.leave(id);
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
