//! Hazard state machine
//!
//! At most one hazard is in focus at a time. Selection is a linear scan in
//! declaration order, so an earlier hazard shadows a later overlapping one
//! until it is cleared or passed.

use super::events::{Cue, LogSource, SimEvent};
use super::state::{Clearance, GameState};
use super::track::{Challenge, ChallengeKind};
use crate::consts::*;

/// First uncleared hazard whose start lies strictly inside the lookahead window
pub fn lookahead(challenges: &[Challenge], position: f32) -> Option<&Challenge> {
    challenges.iter().find(|c| {
        !c.cleared && c.start_distance > position && c.start_distance < position + LOOKAHEAD
    })
}

/// Pick up a newly visible hazard and drop a speed limit the train has left.
///
/// An activation raises a warning and an advisory request unless one is
/// already in flight; dropped alerts are not queued.
pub fn update_active(state: &mut GameState, alert_in_flight: &mut bool, events: &mut Vec<SimEvent>) {
    if let Some(next) = lookahead(&state.challenges, state.position) {
        if state.active_challenge.as_deref() != Some(next.id.as_str()) {
            log::debug!("Hazard {} active at {:.0}m", next.id, state.position);
            if *alert_in_flight {
                log::warn!("Advisory still pending, alert for {} dropped", next.id);
            } else {
                *alert_in_flight = true;
                events.push(SimEvent::Cue(Cue::Warning));
                events.push(SimEvent::HazardAlert {
                    kind: next.kind,
                    description: next.description.clone(),
                });
            }
            state.active_challenge = Some(next.id.clone());
        }
    }

    let left_zone = state.active().is_some_and(|c| {
        c.kind == ChallengeKind::SpeedLimit
            && c.end_distance.is_some_and(|end| state.position > end)
    });
    if left_zone {
        state.active_challenge = None;
    }
}

/// Apply overspeed, speed-zone and collision effects for this tick.
///
/// Returns whether the train should be trembling.
pub fn apply_effects(state: &mut GameState, dt: f32, events: &mut Vec<SimEvent>) -> bool {
    let mut trembling = false;

    if state.velocity > OVERSPEED_THRESHOLD {
        state.health -= OVERSPEED_DRAIN * dt;
        trembling = true;
    }

    let Some(active) = state.active() else {
        return trembling;
    };
    let kind = active.kind;
    let start = active.start_distance;
    let limit = active.value.unwrap_or(DEFAULT_SPEED_LIMIT);

    match kind {
        ChallengeKind::Obstacle => {
            let in_zone = (start - state.position).abs() < COLLISION_RADIUS;
            // Stopped in the zone: hold and wait for clearance
            if in_zone && state.velocity > COLLISION_MIN_SPEED {
                state.health -= COLLISION_DAMAGE * (state.velocity / 10.0);
                log::warn!(
                    "Collision at {:.0}m ({:.1} m/s)",
                    state.position,
                    state.velocity
                );
                state.velocity = 0.0;
                state.money -= COLLISION_PENALTY;
                events.push(SimEvent::urgent("COLLISION DETECTED. HULL DAMAGE."));
            }
        }
        ChallengeKind::SpeedLimit => {
            // Flat per-tick drain: faster frame rates drain faster (known coupling)
            if state.position > start && state.velocity > limit {
                state.health -= SPEED_LIMIT_DRAIN;
                trembling = true;
            }
        }
    }

    trembling
}

/// Start/stop the ambient rumble on edges only
pub fn update_tremble(trembling: bool, latch: &mut bool, events: &mut Vec<SimEvent>) {
    if trembling && !*latch {
        events.push(SimEvent::AmbientStart);
        *latch = true;
    } else if !trembling && *latch {
        events.push(SimEvent::AmbientStop);
        *latch = false;
    }
}

/// Ask the crew to clear the active obstacle. Only accepted when stopped close by.
pub fn request_clearance(state: &mut GameState, events: &mut Vec<SimEvent>) -> bool {
    if !state.can_clear_obstacle() {
        return false;
    }
    let Some(id) = state.active_challenge.clone() else {
        return false;
    };

    log::debug!("Clearance requested for {id}");
    state.pending_clearance = Some(Clearance {
        challenge_id: id,
        remaining: CLEARANCE_DELAY,
    });
    events.push(SimEvent::log(
        "Construction crew clearing debris...",
        LogSource::System,
    ));
    true
}

/// Count down a pending clearance; when it elapses the hazard is cleared and
/// dropped from focus in the same step.
pub fn progress_clearance(state: &mut GameState, dt: f32, events: &mut Vec<SimEvent>) {
    let Some(pending) = state.pending_clearance.as_mut() else {
        return;
    };
    pending.remaining -= dt;
    if pending.remaining > 0.0 {
        return;
    }

    let Some(done) = state.pending_clearance.take() else {
        return;
    };
    if let Some(challenge) = state.challenge_mut(&done.challenge_id) {
        challenge.clear();
    }
    if state.active_challenge.as_deref() == Some(done.challenge_id.as_str()) {
        state.active_challenge = None;
    }
    log::debug!("Hazard {} cleared", done.challenge_id);
    events.push(SimEvent::log(
        "Track cleared. Resume schedule.",
        LogSource::System,
    ));
}
