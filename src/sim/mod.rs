//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Caller-supplied frame delta only, no clocks
//! - Seeded RNG only
//! - Stable iteration order (declaration order for stations and hazards)
//! - No audio, advisory or platform dependencies; side effects leave as `SimEvent`s

pub mod arbiter;
pub mod autopilot;
pub mod challenge;
pub mod events;
pub mod physics;
pub mod state;
pub mod station;
pub mod tick;
pub mod track;

pub use autopilot::{Action, Autopilot, Decision};
pub use events::{Cue, LogSource, SimEvent};
pub use state::{Clearance, GameOverState, GameState, StationStatus};
pub use tick::{Step, TickContext, TickInput, clear_obstacle, tick, toggle_doors};
pub use track::{Challenge, ChallengeKind, ChallengeMode, Station, Track, TrackError};
