// The mutable record of one game.
//
// `GameState` is plain data: inning, half, count, outs, runners, score,
// lineups, and the batter currently at the plate. It has no opinion about
// baseball rules. `rules.rs` is the only code that moves it forward, and the
// server wraps it in a single owner so nothing else can. The handful of
// setters here (`set_runners`, `set_lineups`) exist for the manual
// corrections the protocol allows and skip rule validation.
//
// Supporting types:
// - `Runners`:  set of occupied bases; at most one runner per base by
//               construction. Owns the two movement primitives the rule
//               table needs (`advance_all` and `force_advance`).
// - `Score`:    runs per side, credited to whichever half is batting.
// - `Lineup`:   cyclic batting order for one side.
// - `Snapshot`: immutable copy of the observer-visible fields, serialized as
//               the body of a STATE message.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{Base, Half};

/// Outs that end a half-inning.
pub const OUTS_PER_HALF: u8 = 3;

/// Balls that award first base.
pub const BALLS_PER_WALK: u8 = 4;

/// Strikes that retire the batter.
pub const STRIKES_PER_OUT: u8 = 3;

/// Occupied bases. Iteration is always in basepath order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Runners(BTreeSet<Base>);

impl Runners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, base: Base) -> bool {
        self.0.contains(&base)
    }

    /// Put a runner on `base`. Occupying an occupied base is a no-op.
    pub fn insert(&mut self, base: Base) {
        self.0.insert(base);
    }

    /// Vacate `base`, returning whether a runner was there.
    pub fn remove(&mut self, base: Base) -> bool {
        self.0.remove(&base)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Base> + '_ {
        self.0.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<Base> {
        self.iter().collect()
    }

    /// Move every runner `bases` bases ahead, unconditionally. Runners pushed
    /// past third score. Returns the number of runs scored.
    pub fn advance_all(&mut self, bases: u8) -> u32 {
        let mut moved = BTreeSet::new();
        let mut runs = 0;
        for base in self.iter() {
            match Base::from_index(base.index() + bases) {
                Some(next) => {
                    moved.insert(next);
                }
                None => runs += 1,
            }
        }
        self.0 = moved;
        runs
    }

    /// Put the batter on first, pushing ahead only runners who are forced: a
    /// runner moves when the base behind it is taken. With the bases loaded
    /// the runner on third scores and the bases stay loaded. Returns the
    /// number of runs scored (0 or 1).
    pub fn force_advance(&mut self) -> u32 {
        let mut runs = 0;
        if self.contains(Base::First) {
            if self.contains(Base::Second) {
                if self.contains(Base::Third) {
                    runs = 1;
                }
                self.insert(Base::Third);
            }
            self.insert(Base::Second);
        }
        self.insert(Base::First);
        runs
    }
}

impl FromIterator<Base> for Runners {
    fn from_iter<I: IntoIterator<Item = Base>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Runs per side. Never decreases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

impl Score {
    /// Credit `runs` to the side batting in `half`.
    pub fn credit(&mut self, half: Half, runs: u32) {
        match half {
            Half::Away => self.away += runs,
            Half::Home => self.home += runs,
        }
    }

    /// The side that is ahead, or `None` when tied.
    pub fn leader(&self) -> Option<Half> {
        match self.home.cmp(&self.away) {
            std::cmp::Ordering::Greater => Some(Half::Home),
            std::cmp::Ordering::Less => Some(Half::Away),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Cyclic batting order for one side.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Lineup {
    batters: Vec<String>,
    next: usize,
}

impl Lineup {
    pub fn new(batters: Vec<String>) -> Self {
        Self { batters, next: 0 }
    }

    /// Swap in a new batting order. The cursor is kept and wraps onto the new
    /// order, so replacing a lineup mid-game continues from the same slot.
    pub fn replace(&mut self, batters: Vec<String>) {
        self.batters = batters;
    }

    pub fn batters(&self) -> &[String] {
        &self.batters
    }

    pub fn is_empty(&self) -> bool {
        self.batters.is_empty()
    }

    /// Take the batter due up and advance the cursor. `None` for an empty
    /// lineup.
    pub fn next_batter(&mut self) -> Option<String> {
        if self.batters.is_empty() {
            return None;
        }
        let slot = self.next % self.batters.len();
        self.next = (slot + 1) % self.batters.len();
        Some(self.batters[slot].clone())
    }
}

/// One live game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameState {
    pub(crate) inning: u32,
    pub(crate) half: Half,
    pub(crate) outs: u8,
    pub(crate) balls: u8,
    pub(crate) strikes: u8,
    pub(crate) score: Score,
    pub(crate) runners: Runners,
    pub(crate) current_batter: Option<String>,
    pub(crate) away_lineup: Lineup,
    pub(crate) home_lineup: Lineup,
    pub(crate) game_over: bool,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// Top of the first, nobody on, nothing on the board.
    pub fn new() -> Self {
        Self {
            inning: 1,
            half: Half::Away,
            outs: 0,
            balls: 0,
            strikes: 0,
            score: Score::default(),
            runners: Runners::new(),
            current_batter: None,
            away_lineup: Lineup::default(),
            home_lineup: Lineup::default(),
            game_over: false,
        }
    }

    pub fn inning(&self) -> u32 {
        self.inning
    }

    pub fn half(&self) -> Half {
        self.half
    }

    pub fn outs(&self) -> u8 {
        self.outs
    }

    pub fn balls(&self) -> u8 {
        self.balls
    }

    pub fn strikes(&self) -> u8 {
        self.strikes
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn runners(&self) -> &Runners {
        &self.runners
    }

    pub fn current_batter(&self) -> Option<&str> {
        self.current_batter.as_deref()
    }

    pub fn lineup(&self, half: Half) -> &Lineup {
        match half {
            Half::Away => &self.away_lineup,
            Half::Home => &self.home_lineup,
        }
    }

    pub(crate) fn lineup_mut(&mut self, half: Half) -> &mut Lineup {
        match half {
            Half::Away => &mut self.away_lineup,
            Half::Home => &mut self.home_lineup,
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Overwrite the occupied bases verbatim. No rule validation: this is the
    /// scorer's manual correction path.
    pub fn set_runners(&mut self, runners: Runners) {
        self.runners = runners;
    }

    /// Store both batting orders. Each side keeps its cursor.
    pub fn set_lineups(&mut self, away: Vec<String>, home: Vec<String>) {
        self.away_lineup.replace(away);
        self.home_lineup.replace(home);
    }

    /// Observer-visible copy of the current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            inning: self.inning,
            half: self.half,
            outs: self.outs,
            balls: self.balls,
            strikes: self.strikes,
            home: self.score.home,
            away: self.score.away,
            runners: self.runners.to_vec(),
            current_batter: self.current_batter.clone(),
            game_over: self.game_over,
        }
    }
}

/// Point-in-time view of a game, as sent in STATE messages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub inning: u32,
    pub half: Half,
    pub outs: u8,
    pub balls: u8,
    pub strikes: u8,
    pub home: u32,
    pub away: u32,
    pub runners: Vec<Base>,
    pub current_batter: Option<String>,
    pub game_over: bool,
}
