//! Game-over arbitration
//!
//! Leaving `GameOverState::None` is one-way, and the first terminal condition
//! reached wins.

use super::state::{GameOverState, GameState};
use super::track::Track;

/// Record a terminal outcome unless one is already set. Returns true on transition.
pub fn decide(state: &mut GameState, outcome: GameOverState) -> bool {
    if state.game_over.is_terminal() || !outcome.is_terminal() {
        return false;
    }
    log::info!(
        "Run over: {:?} (money {}, health {:.1}, {:.1}s left)",
        outcome,
        state.money,
        state.health,
        state.time_left
    );
    state.game_over = outcome;
    true
}

/// Run the countdown, flooring at zero
pub fn check_time(state: &mut GameState, dt: f32) {
    state.time_left = (state.time_left - dt).max(0.0);
    if state.time_left <= 0.0 {
        decide(state, GameOverState::TimeOut);
    }
}

/// Clamp health and fail the run when it is gone
pub fn check_health(state: &mut GameState) {
    if state.health <= 0.0 {
        state.health = 0.0;
        decide(state, GameOverState::CriticalFailure);
    }
}

/// Evaluated once, at the moment a station completes: finishing the terminus
/// ends the run, in debt or not.
pub fn check_finish(track: &Track, state: &mut GameState, completed: usize) {
    if !track.is_terminus(completed) {
        return;
    }
    let outcome = if state.money < 0 {
        GameOverState::Bankruptcy
    } else {
        GameOverState::Won
    };
    decide(state, outcome);
}
