//! Per-frame simulation tick and the two discrete player actions
//!
//! State goes in, the next state and the requested side effects come out.
//! Everything that is scheduling bookkeeping rather than simulation truth
//! lives in `TickContext`.

use serde::{Deserialize, Serialize};

use super::events::{Cue, SimEvent};
use super::physics::{self, CueLatch};
use super::state::GameState;
use super::track::Track;
use super::{arbiter, challenge, station};
use crate::consts::MAX_FRAME_DT;

/// Held controls, sampled once per tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickInput {
    pub accelerate: bool,
    pub brake: bool,
}

/// Latches, locks and the frame clock carried between ticks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickContext {
    /// Depart/brake cue latches
    pub cues: CueLatch,
    /// Ambient rumble currently running
    pub trembling: bool,
    /// A hazard advisory request is outstanding
    pub alert_in_flight: bool,
    /// Timestamp of the previous frame (seconds)
    pub last_time: Option<f64>,
}

impl TickContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous frame. Always records `now`, so a skipped
    /// frame still moves the clock forward.
    pub fn elapsed(&mut self, now: f64) -> f32 {
        let dt = self.last_time.map_or(0.0, |last| (now - last) as f32);
        self.last_time = Some(now);
        dt
    }

    /// The advisory for the last activation has been delivered
    pub fn release_alert(&mut self) {
        self.alert_in_flight = false;
    }

    /// Forget all latches (restart)
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Output of a tick or action
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub state: GameState,
    pub events: Vec<SimEvent>,
}

impl Step {
    fn unchanged(state: GameState) -> Self {
        Self {
            state,
            events: Vec::new(),
        }
    }
}

/// Advance the run by `dt` seconds.
///
/// A finished run is frozen. Frames with `dt <= 0` or longer than
/// `MAX_FRAME_DT` (tab was suspended, clock anomaly) integrate nothing.
pub fn tick(
    mut state: GameState,
    track: &Track,
    input: &TickInput,
    ctx: &mut TickContext,
    dt: f32,
) -> Step {
    if state.is_over() {
        let mut events = Vec::new();
        halt_ambient(ctx, &mut events);
        return Step { state, events };
    }
    if !(dt > 0.0 && dt <= MAX_FRAME_DT) {
        return Step::unchanged(state);
    }

    let mut events = Vec::new();

    arbiter::check_time(&mut state, dt);
    challenge::progress_clearance(&mut state, dt, &mut events);

    // Physics
    let motion = physics::integrate(
        state.velocity,
        input,
        state.door_open,
        dt,
        &mut ctx.cues,
        &mut events,
    );
    state.velocity = motion.velocity;
    state.acceleration = motion.acceleration;
    state.position = physics::advance(state.position, state.velocity, dt);

    // Hazards
    challenge::update_active(&mut state, &mut ctx.alert_in_flight, &mut events);
    let trembling = challenge::apply_effects(&mut state, dt, &mut events);
    challenge::update_tremble(trembling, &mut ctx.trembling, &mut events);

    // Stations
    station::sweep_missed(track, &mut state, &mut events);
    station::advance_cursor(track, &mut state);

    arbiter::check_health(&mut state);
    finish_if_over(&state, ctx, &mut events);

    Step { state, events }
}

/// Open or close the doors. Opening at a pending station boards passengers,
/// and boarding at the terminus ends the run.
pub fn toggle_doors(mut state: GameState, track: &Track, ctx: &mut TickContext) -> Step {
    if state.is_over() {
        return Step::unchanged(state);
    }

    let mut events = Vec::new();
    let opening = !state.door_open;

    if opening {
        events.push(SimEvent::Cue(Cue::DoorOpen));
        if let Some(completed) = station::board(track, &mut state, &mut events) {
            arbiter::check_finish(track, &mut state, completed);
        }
        events.push(SimEvent::Announce {
            station: state.current_station,
            at_station: station::at_station(track, &state),
        });
    } else {
        events.push(SimEvent::Cue(Cue::DoorClose));
    }
    state.door_open = opening;

    finish_if_over(&state, ctx, &mut events);
    Step { state, events }
}

/// Request clearance of the active obstacle (applied after the crew delay)
pub fn clear_obstacle(mut state: GameState) -> Step {
    if state.is_over() {
        return Step::unchanged(state);
    }
    let mut events = Vec::new();
    challenge::request_clearance(&mut state, &mut events);
    Step { state, events }
}

fn finish_if_over(state: &GameState, ctx: &mut TickContext, events: &mut Vec<SimEvent>) {
    if state.is_over() {
        halt_ambient(ctx, events);
        events.push(SimEvent::GameOver(state.game_over));
    }
}

fn halt_ambient(ctx: &mut TickContext, events: &mut Vec<SimEvent>) {
    if ctx.trembling {
        ctx.trembling = false;
        events.push(SimEvent::AmbientStop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::sim::events::{Cue, LogSource};
    use crate::sim::state::{GameOverState, StationStatus};
    use crate::sim::track::ChallengeMode;
    use proptest::prelude::*;

    fn run() -> (Track, GameState) {
        let track = Track::line_one();
        let state = GameState::new(&track, track.challenges_for_run(ChallengeMode::Fixed, 0));
        (track, state)
    }

    /// Mark every station behind the train as served so sweeps stay quiet
    fn served_up_to(track: &Track, state: &mut GameState) {
        for s in &track.stations {
            if s.distance < state.position {
                state
                    .station_status
                    .insert(s.id.clone(), StationStatus::Completed);
            }
        }
    }

    fn held(accelerate: bool, brake: bool) -> TickInput {
        TickInput { accelerate, brake }
    }

    #[test]
    fn test_tick_accelerates_from_depot() {
        let (track, state) = run();
        let mut ctx = TickContext::new();
        let step = tick(state, &track, &held(true, false), &mut ctx, 0.1);
        assert!((step.state.velocity - 0.5).abs() < 1e-5);
        assert!((step.state.position - 0.05).abs() < 1e-5);
        assert!((step.state.time_left - (INITIAL_TIME - 0.1)).abs() < 1e-4);
        assert_eq!(step.events, vec![SimEvent::Cue(Cue::Depart)]);
    }

    #[test]
    fn test_timeout() {
        let (track, mut state) = run();
        state.time_left = 0.05;
        let step = tick(state, &track, &TickInput::default(), &mut TickContext::new(), 0.1);
        assert_eq!(step.state.time_left, 0.0);
        assert_eq!(step.state.game_over, GameOverState::TimeOut);
        assert!(step.events.contains(&SimEvent::GameOver(GameOverState::TimeOut)));
    }

    #[test]
    fn test_large_dt_is_skipped() {
        let (track, mut state) = run();
        state.position = 800.0;
        state.velocity = 30.0;
        let before = state.clone();
        let mut ctx = TickContext::new();

        let step = tick(state, &track, &held(true, false), &mut ctx, 0.5);
        assert_eq!(step.state, before);
        assert!(step.events.is_empty());
        assert_eq!(ctx, TickContext::new());
    }

    #[test]
    fn test_non_positive_dt_is_skipped() {
        let (track, state) = run();
        let before = state.clone();
        let step = tick(state, &track, &held(true, false), &mut TickContext::new(), -0.01);
        assert_eq!(step.state, before);
        let step = tick(step.state, &track, &held(true, false), &mut TickContext::new(), 0.0);
        assert_eq!(step.state, before);
    }

    #[test]
    fn test_elapsed_records_every_frame() {
        let mut ctx = TickContext::new();
        assert_eq!(ctx.elapsed(10.0), 0.0);
        assert!((ctx.elapsed(10.5) - 0.5).abs() < 1e-6);
        assert_eq!(ctx.last_time, Some(10.5));
    }

    #[test]
    fn test_doors_hold_the_train() {
        let (track, mut state) = run();
        state.position = 600.0;
        state.velocity = 12.0;
        state.door_open = true;
        served_up_to(&track, &mut state);

        let step = tick(state, &track, &held(true, false), &mut TickContext::new(), 0.05);
        assert_eq!(step.state.velocity, 0.0);
        assert_eq!(step.state.acceleration, 0.0);
        assert_eq!(step.state.position, 600.0);
        // No depart cue while the doors are open
        assert!(step.events.is_empty());
    }

    #[test]
    fn test_collision_through_tick() {
        let (track, mut state) = run();
        state.position = 3496.0;
        state.velocity = 10.0;
        served_up_to(&track, &mut state);

        let step = tick(state, &track, &TickInput::default(), &mut TickContext::new(), 0.016);
        let s = &step.state;
        assert_eq!(s.active_challenge.as_deref(), Some("c2"));
        assert_eq!(s.velocity, 0.0);
        // Impact speed is the post-drag speed (~9.995 m/s)
        assert!((s.health - 80.0).abs() < 0.02);
        assert_eq!(s.money, -COLLISION_PENALTY);
        assert!(step.events.contains(&SimEvent::Cue(Cue::Warning)));
        assert!(step
            .events
            .contains(&SimEvent::urgent("COLLISION DETECTED. HULL DAMAGE.")));
    }

    #[test]
    fn test_obstacle_hold_and_clear() {
        let (track, mut state) = run();
        state.position = 3480.0;
        served_up_to(&track, &mut state);
        let mut ctx = TickContext::new();

        let step = tick(state, &track, &TickInput::default(), &mut ctx, 0.05);
        assert_eq!(step.state.active_challenge.as_deref(), Some("c2"));

        let step = clear_obstacle(step.state);
        assert!(step.state.pending_clearance.is_some());
        assert_eq!(
            step.events,
            vec![SimEvent::log("Construction crew clearing debris...", LogSource::System)]
        );

        let mut state = step.state;
        for _ in 0..25 {
            state = tick(state, &track, &TickInput::default(), &mut ctx, 0.05).state;
        }
        assert!(state.challenge("c2").is_some_and(|c| c.cleared));
        assert!(state.active_challenge.is_none());
    }

    #[test]
    fn test_station_stop_and_departure() {
        let (track, mut state) = run();
        state.current_station = 1;
        state.position = 590.0;
        served_up_to(&track, &mut state);
        let mut ctx = TickContext::new();

        let step = toggle_doors(state, &track, &mut ctx);
        assert!(step.state.door_open);
        assert_eq!(step.state.status("s2"), StationStatus::Completed);
        assert_eq!(step.events[0], SimEvent::Cue(Cue::DoorOpen));
        assert_eq!(
            step.events.last(),
            Some(&SimEvent::Announce {
                station: 1,
                at_station: true
            })
        );

        let step = toggle_doors(step.state, &track, &mut ctx);
        assert!(!step.state.door_open);
        assert_eq!(step.events, vec![SimEvent::Cue(Cue::DoorClose)]);
    }

    #[test]
    fn test_doors_outside_station_zone() {
        let (track, mut state) = run();
        state.current_station = 1;
        state.position = 400.0;
        served_up_to(&track, &mut state);

        let step = toggle_doors(state, &track, &mut TickContext::new());
        assert_eq!(step.state.money, 0);
        assert_eq!(
            step.events.last(),
            Some(&SimEvent::Announce {
                station: 1,
                at_station: false
            })
        );
    }

    fn at_terminus(money: i64) -> (Track, GameState) {
        let (track, mut state) = run();
        state.current_station = track.terminus();
        state.position = 10_200.0;
        served_up_to(&track, &mut state);
        state.money = money;
        (track, state)
    }

    #[test]
    fn test_terminus_win() {
        let (track, state) = at_terminus(100);
        let step = toggle_doors(state, &track, &mut TickContext::new());
        assert_eq!(step.state.game_over, GameOverState::Won);
        assert!(step.events.contains(&SimEvent::GameOver(GameOverState::Won)));
    }

    #[test]
    fn test_terminus_in_debt() {
        // Still negative after the final fare
        let (track, state) = at_terminus(-(REWARD_PER_STOP + 100));
        let step = toggle_doors(state, &track, &mut TickContext::new());
        assert_eq!(step.state.game_over, GameOverState::Bankruptcy);
    }

    #[test]
    fn test_finished_run_is_frozen() {
        let (track, mut state) = run();
        state.position = 900.0;
        state.velocity = 20.0;
        state.game_over = GameOverState::TimeOut;
        let before = state.clone();
        let mut ctx = TickContext::new();

        let step = tick(state, &track, &held(true, false), &mut ctx, 0.05);
        assert_eq!(step.state, before);
        let step = toggle_doors(step.state, &track, &mut ctx);
        assert_eq!(step.state, before);
        let step = clear_obstacle(step.state);
        assert_eq!(step.state, before);
    }

    #[test]
    fn test_overspeed_failure_stops_rumble() {
        let (track, mut state) = run();
        state.position = 1000.0;
        state.velocity = 60.0;
        state.health = 0.1;
        served_up_to(&track, &mut state);
        let mut ctx = TickContext::new();

        let step = tick(state, &track, &held(true, false), &mut ctx, 0.1);
        assert_eq!(step.state.game_over, GameOverState::CriticalFailure);
        assert_eq!(step.state.health, 0.0);
        assert!(!ctx.trembling);
        let starts = step.events.iter().filter(|e| **e == SimEvent::AmbientStart).count();
        let stops = step.events.iter().filter(|e| **e == SimEvent::AmbientStop).count();
        assert_eq!((starts, stops), (1, 1));
    }

    #[test]
    fn test_reset_clears_latches() {
        let mut ctx = TickContext {
            cues: CueLatch {
                depart: true,
                brake: true,
            },
            trembling: true,
            alert_in_flight: true,
            last_time: Some(4.0),
        };
        ctx.reset();
        assert_eq!(ctx, TickContext::new());
    }

    fn status_rank(s: StationStatus) -> u8 {
        match s {
            StationStatus::Pending => 0,
            StationStatus::Completed => 1,
            StationStatus::Missed => 2,
        }
    }

    proptest! {
        #[test]
        fn prop_run_invariants(
            (start, speed) in prop_oneof![
                (0.0f32..TRACK_LENGTH, 0.0f32..MAX_SPEED),
                // Creeping up on the c2 obstacle, where clearing is possible
                (3440.0f32..3500.0, 0.0f32..0.05),
            ],
            frames in prop::collection::vec(
                (any::<bool>(), any::<bool>(), 0.0f32..0.12, any::<u8>()),
                1..300,
            ),
        ) {
            let (track, mut state) = run();
            state.position = start;
            state.velocity = speed;
            let mut ctx = TickContext::new();

            for (accelerate, brake, dt, action) in frames {
                let before = state.clone();
                let integrates =
                    action % 40 >= 2 && dt > 0.0 && dt <= MAX_FRAME_DT && !before.is_over();

                let step = match action % 40 {
                    0 => toggle_doors(state, &track, &mut ctx),
                    1 => clear_obstacle(state),
                    _ => tick(state, &track, &held(accelerate, brake), &mut ctx, dt),
                };
                state = step.state;

                prop_assert!((0.0..=TRACK_LENGTH).contains(&state.position));
                prop_assert!((0.0..=MAX_HEALTH).contains(&state.health));
                prop_assert!(state.time_left >= 0.0);
                if integrates && state.door_open {
                    prop_assert_eq!(state.velocity, 0.0);
                    prop_assert_eq!(state.acceleration, 0.0);
                }

                for (id, old) in &before.station_status {
                    let new = state.status(id);
                    if *old != StationStatus::Pending {
                        prop_assert_eq!(new, *old);
                    }
                    prop_assert!(status_rank(new) >= status_rank(*old));
                }
                for (old, new) in before.challenges.iter().zip(&state.challenges) {
                    prop_assert!(!old.cleared || new.cleared);
                }

                if before.is_over() {
                    prop_assert_eq!(&state, &before);
                }
            }
        }

        #[test]
        fn prop_clearance_lands_after_delay(
            start in 3445.0f32..3500.0,
            speed in 0.0f32..0.05,
            frames in prop::collection::vec(
                (any::<bool>(), 0.02f32..0.1, any::<u8>()),
                40..150,
            ),
        ) {
            let (track, mut state) = run();
            state.position = start;
            state.velocity = speed;
            served_up_to(&track, &mut state);
            let mut ctx = TickContext::new();

            state = tick(state, &track, &TickInput::default(), &mut ctx, 0.016).state;
            prop_assert_eq!(state.active_challenge.as_deref(), Some("c2"));
            state = clear_obstacle(state).state;
            prop_assert!(state.pending_clearance.is_some());

            let mut left = CLEARANCE_DELAY;
            for (brake, dt, action) in frames {
                let was_cleared = state.challenge("c2").is_some_and(|c| c.cleared);
                state = if action % 3 == 0 {
                    // Repeat requests never restart the countdown
                    clear_obstacle(state).state
                } else {
                    left -= dt;
                    tick(state, &track, &held(false, brake), &mut ctx, dt).state
                };

                let cleared = state.challenge("c2").is_some_and(|c| c.cleared);
                prop_assert!(!was_cleared || cleared);
                prop_assert_eq!(cleared, left <= 0.0);
                if cleared {
                    prop_assert!(state.pending_clearance.is_none());
                    prop_assert!(state.active_challenge.is_none());
                }
                prop_assert_eq!(state.health, MAX_HEALTH);
            }
        }
    }
}
