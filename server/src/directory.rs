//! Player records that survive reconnects
//!
//! Every name ever seen keeps its color and score for the lifetime of the
//! process. Iteration order is the order names were first seen, which is the
//! order all "first active player" selections use.

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::PlayerEntry;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    pub name: String,
    pub color: String,
    pub score: u32,
    pub active: bool,
}

pub struct PlayerDirectory {
    records: Vec<PlayerRecord>,
    index: HashMap<String, usize>,
    // Only ever used under the game state lock.
    rng: StdRng,
}

impl PlayerDirectory {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic colors, for tests
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            records: Vec::new(),
            index: HashMap::new(),
            rng,
        }
    }

    /// Returns the record for `name`, creating it on first sight
    pub fn touch(&mut self, name: &str) -> &PlayerRecord {
        let position = match self.index.get(name) {
            Some(&position) => position,
            None => {
                let color = random_color(&mut self.rng);
                info!("New player {} with color {}", name, color);
                self.records.push(PlayerRecord {
                    name: name.to_string(),
                    color,
                    score: 0,
                    active: false,
                });
                let position = self.records.len() - 1;
                self.index.insert(name.to_string(), position);
                position
            }
        };
        &self.records[position]
    }

    pub fn get(&self, name: &str) -> Option<&PlayerRecord> {
        self.index.get(name).map(|&position| &self.records[position])
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut PlayerRecord> {
        match self.index.get(name) {
            Some(&position) => self.records.get_mut(position),
            None => None,
        }
    }

    /// Returns false if the name has never been seen
    pub fn set_active(&mut self, name: &str, active: bool) -> bool {
        match self.get_mut(name) {
            Some(record) => {
                record.active = active;
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.get(name).map_or(false, |record| record.active)
    }

    /// Adds to a player's score and returns the new total
    pub fn add_score(&mut self, name: &str, delta: u32) -> Option<u32> {
        self.get_mut(name).map(|record| {
            record.score += delta;
            record.score
        })
    }

    pub fn clear_scores(&mut self) {
        for record in &mut self.records {
            record.score = 0;
        }
    }

    /// Names of connected players in first-seen order
    pub fn active_names(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|record| record.active)
            .map(|record| record.name.clone())
            .collect()
    }

    pub fn snapshot(&self) -> Vec<PlayerEntry> {
        self.records
            .iter()
            .map(|record| PlayerEntry {
                name: record.name.clone(),
                color: record.color.clone(),
                score: record.score,
                active: record.active,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for PlayerDirectory {
    fn default() -> Self {
        Self::new()
    }
}

fn random_color<R: Rng>(rng: &mut R) -> String {
    format!(
        "#{:02X}{:02X}{:02X}",
        rng.gen::<u8>(),
        rng.gen::<u8>(),
        rng.gen::<u8>()
    )
}
