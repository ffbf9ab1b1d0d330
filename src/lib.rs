//! Metro Sim - An arcade elevated-metro driving game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (physics, hazards, stations, game over)
//! - `session`: Per-frame simulation loop and effect dispatch
//! - `audio`: Sound cue collaborator (Web Audio on wasm)
//! - `advisory`: Hazard/station flavor text collaborator
//! - `announce`: Capped announcement log
//! - `settings`: Player preferences

pub mod advisory;
pub mod announce;
pub mod audio;
pub mod session;
pub mod settings;
pub mod sim;

pub use session::{FrameStatus, Session};
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Largest frame delta the loop will integrate (seconds); longer frames are skipped
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Track dimensions
    pub const TRACK_LENGTH: f32 = 10_500.0;

    /// Traction
    pub const MAX_SPEED: f32 = 70.0; // m/s (~250 km/h)
    pub const ACCEL_RATE: f32 = 5.0; // m/s²
    pub const BRAKE_RATE: f32 = 10.0; // m/s²
    pub const FRICTION: f32 = 0.2;
    /// Air resistance per m/s of forward speed
    pub const AIR_DRAG: f32 = 0.01;
    /// Below this speed the train counts as stopped (doors, clearance)
    pub const STOPPED_SPEED: f32 = 0.1;
    /// Speeds under this snap to rest when not accelerating
    pub const REST_SNAP: f32 = 0.05;
    /// Depart cue only fires from below this speed, brake cue only above it
    pub const CUE_SPEED: f32 = 5.0;

    /// Overspeed (~150 km/h) and its continuous health drain (per second)
    pub const OVERSPEED_THRESHOLD: f32 = 41.6;
    pub const OVERSPEED_DRAIN: f32 = 3.0;

    /// Hazards
    pub const LOOKAHEAD: f32 = 500.0;
    pub const DEFAULT_SPEED_LIMIT: f32 = 30.0;
    /// Flat drain applied every tick while speeding inside a limit zone
    pub const SPEED_LIMIT_DRAIN: f32 = 0.1;
    pub const COLLISION_RADIUS: f32 = 5.0;
    pub const COLLISION_MIN_SPEED: f32 = 2.0;
    pub const COLLISION_DAMAGE: f32 = 20.0; // per 10 m/s at impact
    pub const COLLISION_PENALTY: i64 = 500_000;
    pub const OBSTACLE_CLEAR_RANGE: f32 = 60.0;
    pub const CLEARANCE_DELAY: f32 = 1.0;

    /// Stations
    pub const STATION_TOLERANCE: f32 = 75.0;
    pub const MISSED_MARGIN: f32 = 150.0;
    pub const CURSOR_ADVANCE_MARGIN: f32 = 100.0;
    /// Doors may open within this distance of the next station (HUD hint only)
    pub const DOOR_HINT_RANGE: f32 = 50.0;

    /// Run defaults
    pub const INITIAL_TIME: f32 = 360.0; // 6 minutes
    pub const MAX_HEALTH: f32 = 100.0;

    /// Economy
    pub const TICKET_PRICE: i64 = 2_950;
    pub const AVG_PASSENGERS: i64 = 200;
    pub const REWARD_PER_STOP: i64 = TICKET_PRICE * AVG_PASSENGERS;
    pub const PENALTY_MISSED: i64 = 1_000_000;
    pub const STATION_REPAIR: f32 = 10.0;
    pub const STATION_TIME_BONUS: f32 = 15.0;

    /// Announcement log keeps only the most recent entries
    pub const LOG_CAPACITY: usize = 5;
}

/// Convert m/s to km/h for display
#[inline]
pub fn to_kmh(speed: f32) -> f32 {
    speed * 3.6
}

/// Format a money amount with thousands separators (e.g. `-1,000,000`)
pub fn format_money(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if amount < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i).is_multiple_of(3) {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(0), "0");
        assert_eq!(format_money(590_000), "590,000");
        assert_eq!(format_money(-1_000_000), "-1,000,000");
        assert_eq!(format_money(123_456_789), "123,456,789");
    }

    #[test]
    fn test_to_kmh() {
        assert!((to_kmh(10.0) - 36.0).abs() < 1e-4);
    }
}
