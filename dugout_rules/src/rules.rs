// The at-bat rule engine.
//
// `apply(state, event)` is the only path that advances a game. It is
// stateless (every fact it needs lives in `GameState`) and runs in three
// steps:
//
// 1. Resolve the batter. An explicit name on the event wins; otherwise the
//    batter already at the plate stays; otherwise the batting side's lineup
//    supplies the next name, or the `UNKNOWN_BATTER` placeholder when the
//    lineup is empty (clients watch for it and ask the scorer for a name).
// 2. Apply the per-result transition (`resolve_play`). Results that end the
//    plate appearance reset the count and clear the batter.
// 3. If the play made the third out, end the half (`end_half`) and evaluate
//    the end-of-game condition (`check_game_end`).
//
// The end-of-game check only runs when a half has just ended. Two triggers:
// - the away half of the 9th or later just ended and the home side leads
//   (home does not need to bat);
// - the home half of the 9th or later just ended (inning > 9 after the
//   toggle) with the score unequal.
// A home side that takes the lead in the middle of its own half does not end
// the game on that play; the game ends when that half completes.
//
// Once `game_over` is set, further events are rejected with
// `RuleViolation::GameOver` and leave the state untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::{BALLS_PER_WALK, GameState, OUTS_PER_HALF, STRIKES_PER_OUT};
use crate::types::{Base, Half, PlayResult};

/// Batter name used when no name was supplied and the lineup is empty.
pub const UNKNOWN_BATTER: &str = "Unknown";

/// Innings in a regulation game.
pub const REGULATION_INNINGS: u32 = 9;

/// One reported play, consumed exactly once by `apply`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtBatEvent {
    pub result: PlayResult,
    /// Explicit batter name. Empty strings are treated as absent.
    pub batter: Option<String>,
}

impl AtBatEvent {
    pub fn new(result: PlayResult) -> Self {
        Self {
            result,
            batter: None,
        }
    }

    pub fn with_batter(mut self, batter: impl Into<String>) -> Self {
        self.batter = Some(batter.into());
        self
    }
}

/// Summary of an applied play, as acknowledged to the scorer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayReport {
    pub batter: String,
    pub result: PlayResult,
    pub home: u32,
    pub away: u32,
    pub inning: u32,
    pub half: Half,
}

/// Final result of a concluded game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEnd {
    pub winner: Half,
    pub home: u32,
    pub away: u32,
}

/// An event the rules refuse to apply. State is unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RuleViolation {
    #[error("game already over")]
    GameOver,
}

/// What happened when an event was applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Ack(PlayReport),
    End(GameEnd),
    Error(RuleViolation),
}

/// Apply one at-bat event to the game.
pub fn apply(state: &mut GameState, event: &AtBatEvent) -> Outcome {
    if state.game_over {
        return Outcome::Error(RuleViolation::GameOver);
    }

    let batter = resolve_batter(state, event.batter.as_deref());
    resolve_play(state, event.result);

    if state.outs >= OUTS_PER_HALF {
        end_half(state);
        if let Some(end) = check_game_end(state) {
            state.game_over = true;
            return Outcome::End(end);
        }
    }

    Outcome::Ack(PlayReport {
        batter,
        result: event.result,
        home: state.score.home,
        away: state.score.away,
        inning: state.inning,
        half: state.half,
    })
}

fn resolve_batter(state: &mut GameState, explicit: Option<&str>) -> String {
    if let Some(name) = explicit.filter(|name| !name.is_empty()) {
        state.current_batter = Some(name.to_owned());
    } else if state.current_batter.is_none() {
        let half = state.half;
        let drawn = state
            .lineup_mut(half)
            .next_batter()
            .unwrap_or_else(|| UNKNOWN_BATTER.to_owned());
        state.current_batter = Some(drawn);
    }
    state.current_batter.clone().unwrap_or_default()
}

fn resolve_play(state: &mut GameState, result: PlayResult) {
    match result {
        PlayResult::Out => {
            state.outs += 1;
            conclude_plate_appearance(state);
        }
        PlayResult::Strike => {
            state.strikes += 1;
            if state.strikes >= STRIKES_PER_OUT {
                state.outs += 1;
                conclude_plate_appearance(state);
            }
        }
        PlayResult::Ball => {
            state.balls += 1;
            if state.balls >= BALLS_PER_WALK {
                walk(state);
            }
        }
        PlayResult::Foul => {
            // A foul never produces the third strike.
            if state.strikes < STRIKES_PER_OUT - 1 {
                state.strikes += 1;
            }
        }
        PlayResult::Single | PlayResult::Double | PlayResult::Triple => {
            if let Some(base) = result.hit_base() {
                let runs = state.runners.advance_all(base.index());
                score_runs(state, runs);
                state.runners.insert(base);
            }
            conclude_plate_appearance(state);
        }
        PlayResult::HomeRun => {
            let runs = 1 + state.runners.len() as u32;
            score_runs(state, runs);
            state.runners.clear();
            conclude_plate_appearance(state);
        }
        PlayResult::SacFly => {
            state.outs += 1;
            if state.runners.remove(Base::Third) {
                score_runs(state, 1);
            }
            conclude_plate_appearance(state);
        }
        PlayResult::SacBunt => {
            state.outs += 1;
            let runs = state.runners.advance_all(1);
            score_runs(state, runs);
            conclude_plate_appearance(state);
        }
        PlayResult::Error => {
            let runs = state.runners.advance_all(1);
            score_runs(state, runs);
            state.runners.insert(Base::First);
            conclude_plate_appearance(state);
        }
        PlayResult::Steal => {
            let runners = &mut state.runners;
            if runners.contains(Base::First) && !runners.contains(Base::Second) {
                runners.remove(Base::First);
                runners.insert(Base::Second);
            } else if runners.contains(Base::Second) && !runners.contains(Base::Third) {
                runners.remove(Base::Second);
                runners.insert(Base::Third);
            }
        }
        PlayResult::CaughtStealing => {
            state.outs += 1;
            if !state.runners.remove(Base::First) {
                state.runners.remove(Base::Second);
            }
        }
        PlayResult::WildPitch => {
            state.balls += 1;
            if state.balls >= BALLS_PER_WALK {
                walk(state);
            } else {
                let runs = state.runners.advance_all(1);
                score_runs(state, runs);
            }
        }
        PlayResult::Balk => {
            let runs = state.runners.advance_all(1);
            score_runs(state, runs);
        }
    }
}

/// Ball four: force runners, batter to first, plate appearance over.
fn walk(state: &mut GameState) {
    let runs = state.runners.force_advance();
    score_runs(state, runs);
    conclude_plate_appearance(state);
}

fn score_runs(state: &mut GameState, runs: u32) {
    state.score.credit(state.half, runs);
}

fn conclude_plate_appearance(state: &mut GameState) {
    state.balls = 0;
    state.strikes = 0;
    state.current_batter = None;
}

/// Three outs: clear the field and hand the bats to the other side.
fn end_half(state: &mut GameState) {
    state.outs = 0;
    state.runners.clear();
    conclude_plate_appearance(state);
    state.half = state.half.toggled();
    if state.half == Half::Away {
        state.inning += 1;
    }
}

/// Evaluated right after `end_half`, so `half` names the side now coming up.
fn check_game_end(state: &GameState) -> Option<GameEnd> {
    let score = state.score;
    let finished = |winner| GameEnd {
        winner,
        home: score.home,
        away: score.away,
    };

    match state.half {
        // Away half just ended: home leads going into its own half.
        Half::Home if state.inning >= REGULATION_INNINGS && score.home > score.away => {
            Some(finished(Half::Home))
        }
        // Home half just ended: any decided score past regulation.
        Half::Away if state.inning > REGULATION_INNINGS => score.leader().map(finished),
        _ => None,
    }
}
