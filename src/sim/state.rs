//! Game state and core simulation types
//!
//! Everything the renderer reads lives here. Scheduling bookkeeping (sound
//! latches, alert lock, timestamps) lives in `TickContext` instead.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::track::{Challenge, ChallengeKind, Track};
use crate::consts::*;

/// Per-station progress within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StationStatus {
    #[default]
    Pending,
    Completed,
    Missed,
}

/// How the run ended (`None` while running)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameOverState {
    #[default]
    None,
    Won,
    TimeOut,
    CriticalFailure,
    Bankruptcy,
}

impl GameOverState {
    pub fn is_terminal(&self) -> bool {
        *self != GameOverState::None
    }

    /// Overlay title
    pub fn headline(&self) -> &'static str {
        match self {
            GameOverState::None => "",
            GameOverState::Won => "Mission Complete!",
            GameOverState::TimeOut => "Time Expired",
            GameOverState::CriticalFailure => "System Failure",
            GameOverState::Bankruptcy => "YOU ARE FIRED!",
        }
    }

    /// Overlay body text
    pub fn summary(&self) -> &'static str {
        match self {
            GameOverState::None => "",
            GameOverState::Won => "You successfully navigated Line 1 to Calle 72.",
            GameOverState::TimeOut => "The schedule was not met. Passengers are delayed.",
            GameOverState::CriticalFailure => {
                "Train integrity critical. Construction hazards fatal."
            }
            GameOverState::Bankruptcy => "We need to make money! You finished with massive debt.",
        }
    }
}

/// A requested obstacle clearance waiting for the crew
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clearance {
    pub challenge_id: String,
    /// Seconds until the track is clear
    pub remaining: f32,
}

/// Complete run state (serializable snapshot)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Meters along the track, always within [0, TRACK_LENGTH]
    pub position: f32,
    /// m/s, negative only while reversing under brake
    pub velocity: f32,
    /// m/s² applied on the last tick
    pub acceleration: f32,
    pub door_open: bool,
    /// Index of the next/current station
    pub current_station: usize,
    /// 0..=100
    pub health: f32,
    /// Revenue, can go negative
    pub money: i64,
    /// Seconds left on the countdown
    pub time_left: f32,
    /// Id of the hazard currently in focus
    pub active_challenge: Option<String>,
    /// Hazards for this run, in priority order
    pub challenges: Vec<Challenge>,
    pub station_status: BTreeMap<String, StationStatus>,
    pub pending_clearance: Option<Clearance>,
    pub game_over: GameOverState,
}

impl GameState {
    /// Fresh run at the depot with the given hazard list
    pub fn new(track: &Track, challenges: Vec<Challenge>) -> Self {
        Self {
            position: 0.0,
            velocity: 0.0,
            acceleration: 0.0,
            door_open: false,
            current_station: 0,
            health: MAX_HEALTH,
            money: 0,
            time_left: INITIAL_TIME,
            active_challenge: None,
            challenges,
            station_status: track
                .stations
                .iter()
                .map(|s| (s.id.clone(), StationStatus::Pending))
                .collect(),
            pending_clearance: None,
            game_over: GameOverState::None,
        }
    }

    pub fn is_over(&self) -> bool {
        self.game_over.is_terminal()
    }

    pub fn challenge(&self, id: &str) -> Option<&Challenge> {
        self.challenges.iter().find(|c| c.id == id)
    }

    pub fn challenge_mut(&mut self, id: &str) -> Option<&mut Challenge> {
        self.challenges.iter_mut().find(|c| c.id == id)
    }

    /// The hazard currently in focus
    pub fn active(&self) -> Option<&Challenge> {
        self.active_challenge
            .as_deref()
            .and_then(|id| self.challenge(id))
    }

    pub fn status(&self, station_id: &str) -> StationStatus {
        self.station_status
            .get(station_id)
            .copied()
            .unwrap_or_default()
    }

    pub fn count_status(&self, status: StationStatus) -> usize {
        self.station_status.values().filter(|s| **s == status).count()
    }

    pub fn completed_count(&self) -> usize {
        self.count_status(StationStatus::Completed)
    }

    /// Meters to the current station; briefly negative right after passing it
    pub fn distance_to_next(&self, track: &Track) -> f32 {
        track
            .stations
            .get(self.current_station)
            .map_or(0.0, |s| s.distance - self.position)
    }

    pub fn speed_kmh(&self) -> f32 {
        crate::to_kmh(self.velocity)
    }

    pub fn is_stopped(&self) -> bool {
        self.velocity.abs() < STOPPED_SPEED
    }

    pub fn is_overspeed(&self) -> bool {
        self.velocity > OVERSPEED_THRESHOLD
    }

    /// HUD hint: stopped close enough to the next stop to open doors
    pub fn can_open_doors(&self, track: &Track) -> bool {
        self.is_stopped() && self.distance_to_next(track).abs() < DOOR_HINT_RANGE
    }

    /// Stopped near the active obstacle with no clearance already underway
    pub fn can_clear_obstacle(&self) -> bool {
        if self.pending_clearance.is_some() || !self.is_stopped() {
            return false;
        }
        self.active().is_some_and(|c| {
            c.kind == ChallengeKind::Obstacle
                && (c.start_distance - self.position).abs() < OBSTACLE_CLEAR_RANGE
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::track::ChallengeMode;

    #[test]
    fn test_new_run_defaults() {
        let track = Track::line_one();
        let state = GameState::new(&track, track.challenges_for_run(ChallengeMode::Fixed, 0));
        assert_eq!(state.position, 0.0);
        assert_eq!(state.health, 100.0);
        assert_eq!(state.money, 0);
        assert_eq!(state.time_left, INITIAL_TIME);
        assert_eq!(state.game_over, GameOverState::None);
        assert_eq!(state.count_status(StationStatus::Pending), 16);
        assert_eq!(state.distance_to_next(&track), 0.0);
        assert!(state.active().is_none());
    }

    #[test]
    fn test_can_clear_obstacle() {
        let track = Track::line_one();
        let mut state = GameState::new(&track, track.challenges_for_run(ChallengeMode::Fixed, 0));
        state.position = 3460.0;
        assert!(!state.can_clear_obstacle());

        state.active_challenge = Some("c2".into());
        assert!(state.can_clear_obstacle());

        state.velocity = 3.0;
        assert!(!state.can_clear_obstacle());

        state.velocity = 0.0;
        state.position = 3400.0;
        assert!(!state.can_clear_obstacle());

        // Speed limits cannot be cleared by hand
        state.position = 1990.0;
        state.active_challenge = Some("c1".into());
        assert!(!state.can_clear_obstacle());
    }

    #[test]
    fn test_state_serializes() {
        let track = Track::line_one();
        let state = GameState::new(&track, track.challenges_for_run(ChallengeMode::Fixed, 0));
        let json = serde_json::to_string(&state).expect("serialize");
        assert!(json.contains("\"PENDING\""));
        let back: GameState = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, state);
    }
}
