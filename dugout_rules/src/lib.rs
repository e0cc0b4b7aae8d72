// dugout_rules: game state and rule engine for the Dugout scorekeeper.
//
// This crate owns the baseball semantics: what a game looks like at any
// moment (`GameState`) and how a single at-bat event moves it forward
// (`rules::apply`). It performs no I/O and knows nothing about sessions or
// the wire format; the server crate drives it from its single-writer loop.
//
// Module overview:
// - `types.rs`:  Closed vocabularies (`Half`, `Base`, `PlayResult`) with
//                their wire spellings ("AWAY", "1B", "SAC_FLY", ...).
// - `state.rs`:  `GameState` plus its parts (`Runners`, `Score`, `Lineup`)
//                and the immutable `Snapshot` broadcast to observers.
// - `rules.rs`:  The rule engine. `apply(&mut GameState, &AtBatEvent)`
//                resolves the batter, applies the per-result transition,
//                handles the three-out half transition, and evaluates the
//                end-of-game condition.
//
// Everything here is deterministic: the same sequence of events applied to
// `GameState::new()` always produces the same state.

pub mod rules;
pub mod state;
pub mod types;

pub use rules::{AtBatEvent, GameEnd, Outcome, PlayReport, RuleViolation, UNKNOWN_BATTER, apply};
pub use state::{GameState, Lineup, Runners, Score, Snapshot};
pub use types::{Base, Half, PlayResult, UnknownBase, UnknownResult};
