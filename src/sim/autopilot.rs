//! Demo-mode driver
//!
//! Produces the same controls a player would: held accelerate/brake plus the
//! occasional door or clearance action. Used by the headless demo and by
//! end-to-end tests.

use super::state::{GameState, StationStatus};
use super::station;
use super::tick::TickInput;
use super::track::{ChallengeKind, Track};
use crate::consts::*;

/// Cruise speed, kept under the overspeed threshold
const CRUISE_SPEED: f32 = 38.0;
/// Margin below a posted limit
const LIMIT_MARGIN: f32 = 2.0;
/// Speed cap on the final approach to a stop
const CREEP_SPEED: f32 = 1.5;
const APPROACH_RANGE: f32 = 20.0;
/// Considered arrived within this distance of the stop point
const ARRIVE: f32 = 1.5;
/// Assumed braking deceleration (real braking is a little stronger)
const PLANNED_DECEL: f32 = 8.0;
/// Stop this far short of an obstacle
const OBSTACLE_STANDOFF: f32 = 3.0;
/// Seconds the doors stay open at a stop
const DWELL: f32 = 0.5;

/// Discrete action requested this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ToggleDoors,
    ClearObstacle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Decision {
    pub input: TickInput,
    pub action: Option<Action>,
}

/// Simple stop-and-go driver
#[derive(Debug, Clone, Default)]
pub struct Autopilot {
    dwell: f32,
}

impl Autopilot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decide(&mut self, state: &GameState, track: &Track, dt: f32) -> Decision {
        if state.is_over() {
            return Decision::default();
        }

        if state.door_open {
            self.dwell += dt;
            if self.dwell >= DWELL {
                self.dwell = 0.0;
                return act(Action::ToggleDoors);
            }
            return Decision::default();
        }

        // Crew is working on the line
        if state.pending_clearance.is_some() {
            return Decision::default();
        }

        if state.is_stopped() {
            if state.can_clear_obstacle() {
                return act(Action::ClearObstacle);
            }
            let boarding = track
                .stations
                .get(state.current_station)
                .is_some_and(|s| state.status(&s.id) == StationStatus::Pending);
            if boarding && station::at_station(track, state) {
                return act(Action::ToggleDoors);
            }
        }

        let input = match stop_point(state, track) {
            Some(target) => approach(state, target - state.position, speed_cap(state)),
            None => approach(state, f32::INFINITY, speed_cap(state)),
        };
        Decision {
            input,
            action: None,
        }
    }
}

fn act(action: Action) -> Decision {
    Decision {
        input: TickInput::default(),
        action: Some(action),
    }
}

/// Nearest of: the next pending station, the active uncleared obstacle
fn stop_point(state: &GameState, track: &Track) -> Option<f32> {
    let station = track
        .stations
        .iter()
        .find(|s| {
            state.status(&s.id) == StationStatus::Pending
                && s.distance + STATION_TOLERANCE > state.position
        })
        .map(|s| s.distance);

    let obstacle = state
        .active()
        .filter(|c| c.kind == ChallengeKind::Obstacle && !c.cleared)
        .filter(|c| c.start_distance + COLLISION_RADIUS > state.position)
        .map(|c| c.start_distance - OBSTACLE_STANDOFF);

    match (station, obstacle) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn speed_cap(state: &GameState) -> f32 {
    state
        .active()
        .filter(|c| c.kind == ChallengeKind::SpeedLimit)
        .map_or(CRUISE_SPEED, |c| {
            let limit = c.value.unwrap_or(DEFAULT_SPEED_LIMIT) - LIMIT_MARGIN;
            limit.min(CRUISE_SPEED)
        })
}

/// Bang-bang approach along the braking curve
fn approach(state: &GameState, remaining: f32, cap: f32) -> TickInput {
    let v = state.velocity;
    let cap = if remaining < APPROACH_RANGE {
        cap.min(CREEP_SPEED)
    } else {
        cap
    };

    let brake_distance = v.max(0.0).powi(2) / (2.0 * PLANNED_DECEL);

    if remaining <= ARRIVE {
        TickInput {
            accelerate: false,
            brake: v > STOPPED_SPEED,
        }
    } else if v > cap + 0.3 {
        TickInput {
            accelerate: false,
            brake: true,
        }
    } else if remaining <= brake_distance + ARRIVE {
        let brake = v > 0.2;
        TickInput {
            accelerate: !brake,
            brake,
        }
    } else {
        TickInput {
            accelerate: v < cap,
            brake: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::track::ChallengeMode;

    fn run() -> (Track, GameState) {
        let track = Track::line_one();
        let state = GameState::new(&track, track.challenges_for_run(ChallengeMode::Fixed, 0));
        (track, state)
    }

    #[test]
    fn test_opens_doors_at_depot() {
        let (track, state) = run();
        let decision = Autopilot::new().decide(&state, &track, 0.016);
        assert_eq!(decision.action, Some(Action::ToggleDoors));
    }

    #[test]
    fn test_closes_doors_after_dwell() {
        let (track, mut state) = run();
        state.door_open = true;
        let mut pilot = Autopilot::new();
        assert_eq!(pilot.decide(&state, &track, 0.3).action, None);
        assert_eq!(pilot.decide(&state, &track, 0.3).action, Some(Action::ToggleDoors));
    }

    #[test]
    fn test_cruises_between_stations() {
        let (track, mut state) = run();
        state.station_status.insert("s1".into(), StationStatus::Completed);
        state.position = 100.0;
        state.velocity = 20.0;
        let d = Autopilot::new().decide(&state, &track, 0.016);
        assert!(d.input.accelerate && !d.input.brake);
    }

    #[test]
    fn test_brakes_for_station() {
        let (track, mut state) = run();
        state.station_status.insert("s1".into(), StationStatus::Completed);
        state.position = 550.0;
        state.velocity = 30.0;
        let d = Autopilot::new().decide(&state, &track, 0.016);
        assert!(d.input.brake);
    }

    #[test]
    fn test_respects_speed_limit() {
        let (_, mut state) = run();
        state.position = 1950.0;
        state.velocity = 30.0;
        state.active_challenge = Some("c1".into());
        assert_eq!(speed_cap(&state), 28.0);
        let d = approach(&state, 1000.0, speed_cap(&state));
        assert!(d.brake);
    }

    #[test]
    fn test_stops_short_of_obstacle_then_clears() {
        let (track, mut state) = run();
        for s in &track.stations[..6] {
            state.station_status.insert(s.id.clone(), StationStatus::Completed);
        }
        state.current_station = 6;
        state.position = 3300.0;
        state.active_challenge = Some("c2".into());
        assert_eq!(stop_point(&state, &track), Some(3497.0));

        state.position = 3496.5;
        let d = Autopilot::new().decide(&state, &track, 0.016);
        assert_eq!(d.action, Some(Action::ClearObstacle));
    }
}
