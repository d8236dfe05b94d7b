//! The single authoritative Hangman round
//!
//! `RoundState` only knows about the word, the letters and who holds which
//! role. Scoring and player selection live in the game module, which feeds it
//! the active player list when a turn needs to move.

use shared::{GameView, MAX_ATTEMPTS};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    WaitingForWord,
    Guessing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessOutcome {
    /// Letter was already guessed; nothing changed
    Repeated,
    Hit,
    Miss,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundState {
    phase: Phase,
    secret_word: String,
    guessed_letters: BTreeSet<char>,
    attempts_left: u32,
    word_setter: String,
    current_guesser: String,
}

impl RoundState {
    pub fn new() -> Self {
        Self {
            phase: Phase::WaitingForWord,
            secret_word: String::new(),
            guessed_letters: BTreeSet::new(),
            attempts_left: MAX_ATTEMPTS,
            word_setter: String::new(),
            current_guesser: String::new(),
        }
    }

    /// Back to the process-start configuration, roles included
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Clears the word for the next round; roles are kept
    pub fn start_next_round(&mut self) {
        self.phase = Phase::WaitingForWord;
        self.secret_word.clear();
        self.guessed_letters.clear();
        self.attempts_left = MAX_ATTEMPTS;
    }

    pub fn appoint_setter(&mut self, name: &str) {
        self.word_setter = name.to_string();
        self.phase = Phase::WaitingForWord;
    }

    pub fn set_word_setter(&mut self, name: &str) {
        self.word_setter = name.to_string();
    }

    pub fn set_current_guesser(&mut self, name: &str) {
        self.current_guesser = name.to_string();
    }

    pub fn clear_current_guesser(&mut self) {
        self.current_guesser.clear();
    }

    /// Starts guessing on an upper-cased word
    pub fn begin(&mut self, word: &str, first_guesser: &str) {
        self.secret_word = word.to_string();
        self.guessed_letters.clear();
        self.attempts_left = MAX_ATTEMPTS;
        self.current_guesser = first_guesser.to_string();
        self.phase = Phase::Guessing;
    }

    /// Records a letter; a miss costs one attempt
    pub fn record_guess(&mut self, letter: char) -> GuessOutcome {
        if !self.guessed_letters.insert(letter) {
            return GuessOutcome::Repeated;
        }
        if self.secret_word.contains(letter) {
            GuessOutcome::Hit
        } else {
            self.attempts_left = self.attempts_left.saturating_sub(1);
            GuessOutcome::Miss
        }
    }

    pub fn is_won(&self) -> bool {
        !self.secret_word.is_empty()
            && self
                .secret_word
                .chars()
                .all(|c| self.guessed_letters.contains(&c))
    }

    pub fn is_lost(&self) -> bool {
        self.attempts_left == 0 && !self.is_won()
    }

    /// `C _ T` style rendering of the secret word
    pub fn masked_word(&self) -> String {
        self.secret_word
            .chars()
            .map(|c| {
                if self.guessed_letters.contains(&c) {
                    c.to_string()
                } else {
                    "_".to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn view(&self) -> GameView {
        GameView {
            masked_word: self.masked_word(),
            attempts_left: self.attempts_left,
            current_guesser: self.current_guesser.clone(),
            guessed_letters: self.guessed_letters.iter().copied().collect(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn secret_word(&self) -> &str {
        &self.secret_word
    }

    pub fn guessed_letters(&self) -> &BTreeSet<char> {
        &self.guessed_letters
    }

    pub fn attempts_left(&self) -> u32 {
        self.attempts_left
    }

    pub fn word_setter(&self) -> &str {
        &self.word_setter
    }

    pub fn current_guesser(&self) -> &str {
        &self.current_guesser
    }
}

impl Default for RoundState {
    fn default() -> Self {
        Self::new()
    }
}

/// First active player who is not setting the word
pub fn first_guesser<'a>(active: &'a [String], setter: &str) -> Option<&'a str> {
    active
        .iter()
        .map(String::as_str)
        .find(|&name| name != setter)
}

/// Round-robin successor of `current` among active non-setters
///
/// A guesser missing from the list (e.g. just disconnected) hands the turn to
/// the first candidate.
pub fn next_guesser<'a>(active: &'a [String], setter: &str, current: &str) -> Option<&'a str> {
    let candidates: Vec<&str> = active
        .iter()
        .map(String::as_str)
        .filter(|&name| name != setter)
        .collect();
    if candidates.is_empty() {
        return None;
    }

    let next = candidates
        .iter()
        .position(|&name| name == current)
        .map_or(0, |i| (i + 1) % candidates.len());
    Some(candidates[next])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_initial_state() {
        let round = RoundState::new();
        assert_eq!(round.phase(), Phase::WaitingForWord);
        assert!(round.secret_word().is_empty());
        assert!(round.guessed_letters().is_empty());
        assert_eq!(round.attempts_left(), MAX_ATTEMPTS);
        assert!(round.word_setter().is_empty());
        assert!(round.current_guesser().is_empty());
        assert!(!round.is_won());
    }

    #[test]
    fn test_begin_resets_letters_and_attempts() {
        let mut round = RoundState::new();
        round.appoint_setter("A");
        round.begin("CAT", "B");
        round.record_guess('X');

        round.start_next_round();
        round.begin("DOG", "B");

        assert_eq!(round.phase(), Phase::Guessing);
        assert_eq!(round.attempts_left(), MAX_ATTEMPTS);
        assert!(round.guessed_letters().is_empty());
        assert_eq!(round.masked_word(), "_ _ _");
    }

    #[test]
    fn test_hit_reveals_without_cost() {
        let mut round = RoundState::new();
        round.begin("CAT", "B");

        assert_eq!(round.record_guess('C'), GuessOutcome::Hit);
        assert_eq!(round.attempts_left(), MAX_ATTEMPTS);
        assert_eq!(round.masked_word(), "C _ _");
    }

    #[test]
    fn test_miss_costs_one_attempt() {
        let mut round = RoundState::new();
        round.begin("CAT", "B");

        assert_eq!(round.record_guess('X'), GuessOutcome::Miss);
        assert_eq!(round.attempts_left(), MAX_ATTEMPTS - 1);
    }

    #[test]
    fn test_repeated_letter_changes_nothing() {
        let mut round = RoundState::new();
        round.begin("CAT", "B");
        round.record_guess('X');
        let before = round.clone();

        assert_eq!(round.record_guess('X'), GuessOutcome::Repeated);
        assert_eq!(round, before);
    }

    #[test]
    fn test_win_and_loss_detection() {
        let mut round = RoundState::new();
        round.begin("TOOT", "B");
        round.record_guess('T');
        assert!(!round.is_won());
        round.record_guess('O');
        assert!(round.is_won());

        let mut round = RoundState::new();
        round.begin("CAT", "B");
        for letter in ['B', 'D', 'E', 'F', 'G', 'H'] {
            round.record_guess(letter);
        }
        assert_eq!(round.attempts_left(), 0);
        assert!(round.is_lost());
    }

    #[test]
    fn test_view_lists_letters_sorted() {
        let mut round = RoundState::new();
        round.begin("CAT", "B");
        round.record_guess('T');
        round.record_guess('C');

        let view = round.view();
        assert_eq!(view.masked_word, "C _ T");
        assert_eq!(view.guessed_letters, vec!['C', 'T']);
        assert_eq!(view.current_guesser, "B");
    }

    #[test]
    fn test_reset_clears_roles() {
        let mut round = RoundState::new();
        round.appoint_setter("A");
        round.begin("CAT", "B");
        round.reset();
        assert_eq!(round, RoundState::new());
    }

    #[test]
    fn test_first_guesser_skips_setter() {
        let active = names(&["A", "B", "C"]);
        assert_eq!(first_guesser(&active, "A"), Some("B"));
        assert_eq!(first_guesser(&active, "B"), Some("A"));
        assert_eq!(first_guesser(&names(&["A"]), "A"), None);
    }

    #[test]
    fn test_next_guesser_rotates() {
        let active = names(&["A", "B", "C", "D"]);
        assert_eq!(next_guesser(&active, "A", "B"), Some("C"));
        assert_eq!(next_guesser(&active, "A", "C"), Some("D"));
        assert_eq!(next_guesser(&active, "A", "D"), Some("B"));
    }

    #[test]
    fn test_next_guesser_single_candidate_stays() {
        let active = names(&["A", "B"]);
        assert_eq!(next_guesser(&active, "A", "B"), Some("B"));
    }

    #[test]
    fn test_next_guesser_unknown_current() {
        let active = names(&["A", "B", "C"]);
        assert_eq!(next_guesser(&active, "A", "Z"), Some("B"));
        assert_eq!(next_guesser(&names(&["A"]), "A", "A"), None);
    }
}
