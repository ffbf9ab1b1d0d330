//! Longitudinal train physics
//!
//! Traction, braking and drag along a single axis, with the door interlock.

use super::events::{Cue, SimEvent};
use super::tick::TickInput;
use crate::consts::*;

/// Edge latches for the depart/brake cues
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CueLatch {
    pub depart: bool,
    pub brake: bool,
}

/// Result of integrating one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub velocity: f32,
    pub acceleration: f32,
}

/// Integrate velocity for `dt` seconds.
///
/// Open doors pin the train in place. Otherwise traction and brake add up,
/// drag opposes motion in either direction, and the result is clamped:
/// no reverse drift without the brake held, no creep near rest, no more than
/// `MAX_SPEED`.
pub fn integrate(
    velocity: f32,
    input: &TickInput,
    door_open: bool,
    dt: f32,
    latch: &mut CueLatch,
    events: &mut Vec<SimEvent>,
) -> Motion {
    if door_open {
        return Motion {
            velocity: 0.0,
            acceleration: 0.0,
        };
    }

    let mut acc = 0.0;

    if input.accelerate {
        acc += ACCEL_RATE;
        if !latch.depart && velocity < CUE_SPEED {
            events.push(SimEvent::Cue(Cue::Depart));
            latch.depart = true;
        }
    } else {
        latch.depart = false;
    }

    if input.brake {
        acc -= BRAKE_RATE;
        if !latch.brake && velocity > CUE_SPEED {
            events.push(SimEvent::Cue(Cue::Brake));
            latch.brake = true;
        }
    } else {
        latch.brake = false;
    }

    if velocity > 0.0 {
        acc -= FRICTION + velocity * AIR_DRAG;
    } else if velocity < 0.0 {
        acc += FRICTION;
    }

    let mut v = velocity + acc * dt;

    if v < 0.0 && !input.brake {
        v = 0.0;
    }
    if v.abs() < REST_SNAP && !input.accelerate {
        v = 0.0;
    }
    v = v.min(MAX_SPEED);

    Motion {
        velocity: v,
        acceleration: acc,
    }
}

/// Move along the track, staying within its ends
pub fn advance(position: f32, velocity: f32, dt: f32) -> f32 {
    (position + velocity * dt).clamp(0.0, TRACK_LENGTH)
}
