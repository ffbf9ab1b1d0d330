//! Side effects requested by the simulation
//!
//! The tick never talks to audio, text generation or the log directly; it
//! returns these and the session dispatches them.

use serde::{Deserialize, Serialize};

use super::state::GameOverState;
use super::track::ChallengeKind;

/// One-shot sound cues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cue {
    Depart,
    Brake,
    DoorOpen,
    DoorClose,
    Warning,
}

/// Who a log line is attributed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogSource {
    System,
    Station,
    /// A named stop (announcements)
    Named(String),
}

impl LogSource {
    pub fn label(&self) -> &str {
        match self {
            LogSource::System => "SYSTEM",
            LogSource::Station => "STATION",
            LogSource::Named(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    Cue(Cue),
    /// Start the ambient rumble (overspeed or speed-zone violation)
    AmbientStart,
    /// Stop the ambient rumble
    AmbientStop,
    /// A hazard became active and no advisory is in flight
    HazardAlert {
        kind: ChallengeKind,
        description: String,
    },
    Log {
        text: String,
        source: LogSource,
        urgent: bool,
    },
    /// Doors opened; `at_station` is false outside a stop zone
    Announce { station: usize, at_station: bool },
    GameOver(GameOverState),
}

impl SimEvent {
    pub fn log(text: impl Into<String>, source: LogSource) -> Self {
        SimEvent::Log {
            text: text.into(),
            source,
            urgent: false,
        }
    }

    pub fn urgent(text: impl Into<String>) -> Self {
        SimEvent::Log {
            text: text.into(),
            source: LogSource::System,
            urgent: true,
        }
    }
}
