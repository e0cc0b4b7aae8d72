// The single owner of the live game.
//
// `Scorekeeper` wraps the one `GameState` the server tracks. The router holds
// it by value inside the event loop, so every mutation runs on that one
// thread and no two plays can interleave. Nothing outside this type gets a
// mutable reference to the state: plays go through `apply_at_bat` (the rule
// engine), manual corrections through `set_runners`/`set_lineups`, and a new
// game through `reset`, which swaps in a fresh state in one step.

use dugout_rules::{AtBatEvent, GameState, Outcome, Runners, Snapshot, apply};

#[derive(Debug, Default)]
pub struct Scorekeeper {
    state: GameState,
}

impl Scorekeeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one play through the rule engine.
    pub fn apply_at_bat(&mut self, event: &AtBatEvent) -> Outcome {
        apply(&mut self.state, event)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.snapshot()
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Replace the whole game, lineups included, with a fresh one.
    pub fn reset(&mut self) {
        self.state = GameState::new();
    }

    /// Overwrite the bases verbatim, bypassing the rules.
    pub fn set_runners(&mut self, runners: Runners) {
        self.state.set_runners(runners);
    }

    pub fn set_lineups(&mut self, away: Vec<String>, home: Vec<String>) {
        self.state.set_lineups(away, home);
    }
}

#[cfg(test)]
mod tests {
    use dugout_rules::{Base, Half, PlayResult};

    use super::*;

    #[test]
    fn reset_discards_everything() {
        let mut keeper = Scorekeeper::new();
        keeper.set_lineups(vec!["A".into()], vec!["H".into()]);
        keeper.apply_at_bat(&AtBatEvent::new(PlayResult::HomeRun));
        keeper.set_runners([Base::Second].into_iter().collect());

        keeper.reset();

        assert_eq!(keeper.state(), &GameState::new());
        assert!(keeper.state().lineup(Half::Away).is_empty());
    }

    #[test]
    fn snapshot_is_read_only() {
        let mut keeper = Scorekeeper::new();
        keeper.apply_at_bat(&AtBatEvent::new(PlayResult::Ball));
        let first = keeper.snapshot();
        let second = keeper.snapshot();
        assert_eq!(first, second);
        assert_eq!(first.balls, 1);
    }
}
