//! Station tracking: missed stops, boarding, and the next-station cursor

use super::events::{LogSource, SimEvent};
use super::state::{GameState, StationStatus};
use super::track::Track;
use crate::consts::*;
use crate::format_money;

/// Mark every pending station the train is well past as missed.
///
/// Checks all stations, not just the next one, so a stop skipped in a single
/// long step is still caught.
pub fn sweep_missed(track: &Track, state: &mut GameState, events: &mut Vec<SimEvent>) {
    for station in &track.stations {
        if state.position <= station.distance + STATION_TOLERANCE + MISSED_MARGIN {
            continue;
        }
        let Some(status) = state.station_status.get_mut(&station.id) else {
            continue;
        };
        if *status != StationStatus::Pending {
            continue;
        }

        *status = StationStatus::Missed;
        state.money -= PENALTY_MISSED;
        log::info!("Missed station {} at {:.0}m", station.name, state.position);
        events.push(SimEvent::urgent(format!(
            "Missed stop: {}. Penalty -${}.",
            station.name,
            format_money(PENALTY_MISSED)
        )));
    }
}

/// Move the cursor on once the train is past the current station, stopping at the terminus
pub fn advance_cursor(track: &Track, state: &mut GameState) {
    let Some(current) = track.stations.get(state.current_station) else {
        return;
    };
    if state.position > current.distance + CURSOR_ADVANCE_MARGIN
        && state.current_station < track.terminus()
    {
        state.current_station += 1;
    }
}

/// Whether the train is inside the current station's stop zone
pub fn at_station(track: &Track, state: &GameState) -> bool {
    track
        .stations
        .get(state.current_station)
        .is_some_and(|s| (state.position - s.distance).abs() < STATION_TOLERANCE)
}

/// Doors opened: board passengers if stopped at a pending station.
///
/// Returns the index of the completed station.
pub fn board(track: &Track, state: &mut GameState, events: &mut Vec<SimEvent>) -> Option<usize> {
    if !state.is_stopped() || !at_station(track, state) {
        return None;
    }
    let index = state.current_station;
    let station = track.stations.get(index)?;
    let status = state.station_status.get_mut(&station.id)?;
    if *status != StationStatus::Pending {
        return None;
    }

    *status = StationStatus::Completed;
    state.money += REWARD_PER_STOP;
    state.health = (state.health + STATION_REPAIR).min(MAX_HEALTH);
    state.time_left += STATION_TIME_BONUS;

    log::info!("Boarding at {} (money {})", station.name, state.money);
    events.push(SimEvent::log(
        format!(
            "Boarding successful. +${}. Repair +{}%. Time +{}s.",
            format_money(REWARD_PER_STOP),
            STATION_REPAIR,
            STATION_TIME_BONUS
        ),
        LogSource::Station,
    ));
    Some(index)
}
