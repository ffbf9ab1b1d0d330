//! Track model: stations and hazard templates along the line
//!
//! Static for the duration of a run. Challenges are copied out of the track
//! into the run state so their `cleared` flags can change.

use std::collections::HashSet;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::TRACK_LENGTH;

/// A stop on the line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
    /// Position on the track in meters
    pub distance: f32,
    #[serde(default)]
    pub description: String,
}

impl Station {
    fn new(id: &str, name: &str, distance: f32, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            distance,
            description: description.to_string(),
        }
    }
}

/// Hazard types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChallengeKind {
    /// Debris on the line; must stop and clear it
    Obstacle,
    /// Zone with a reduced maximum speed
    SpeedLimit,
}

impl ChallengeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeKind::Obstacle => "OBSTACLE",
            ChallengeKind::SpeedLimit => "SPEED_LIMIT",
        }
    }
}

/// A hazard on the track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    pub kind: ChallengeKind,
    pub start_distance: f32,
    /// End of the zone (speed limits only)
    #[serde(default)]
    pub end_distance: Option<f32>,
    /// Speed limit in m/s (speed limits only)
    #[serde(default)]
    pub value: Option<f32>,
    #[serde(default)]
    pub description: String,
    /// Only ever goes false -> true within a run
    #[serde(default)]
    pub cleared: bool,
}

impl Challenge {
    pub fn obstacle(id: &str, start: f32, description: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: ChallengeKind::Obstacle,
            start_distance: start,
            end_distance: None,
            value: None,
            description: description.to_string(),
            cleared: false,
        }
    }

    pub fn speed_limit(id: &str, start: f32, end: f32, limit: f32, description: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: ChallengeKind::SpeedLimit,
            start_distance: start,
            end_distance: Some(end),
            value: Some(limit),
            description: description.to_string(),
            cleared: false,
        }
    }

    /// Mark cleared (never reverts)
    pub fn clear(&mut self) {
        self.cleared = true;
    }
}

/// How a run gets its hazards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChallengeMode {
    /// Reuse the track's template list
    #[default]
    Fixed,
    /// Generate a fresh layout per run from a seed
    Random,
}

/// Track validation failures
#[derive(Error, Debug)]
pub enum TrackError {
    #[error("track has no stations")]
    NoStations,
    #[error("station {id} at {distance}m is not after the previous station")]
    StationOrder { id: String, distance: f32 },
    #[error("{id} at {distance}m lies outside the track (0..={max}m)")]
    OutOfBounds { id: String, distance: f32, max: f32 },
    #[error("speed limit {0} has no end distance")]
    MissingZoneEnd(String),
    #[error("speed limit {id} ends at {end}m before it starts at {start}m")]
    InvertedZone { id: String, start: f32, end: f32 },
    #[error("duplicate id: {0}")]
    DuplicateId(String),
    #[error("invalid track json: {0}")]
    Json(#[from] serde_json::Error),
}

/// The line: ordered stations plus the template hazard list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub stations: Vec<Station>,
    pub challenges: Vec<Challenge>,
}

impl Default for Track {
    fn default() -> Self {
        Self::line_one()
    }
}

impl Track {
    /// Build a track, checking ordering, bounds, and zone shape
    pub fn new(stations: Vec<Station>, challenges: Vec<Challenge>) -> Result<Self, TrackError> {
        let track = Self {
            stations,
            challenges,
        };
        track.validate()?;
        Ok(track)
    }

    /// Parse and validate a track from JSON
    pub fn from_json(json: &str) -> Result<Self, TrackError> {
        let track: Track = serde_json::from_str(json)?;
        track.validate()?;
        Ok(track)
    }

    /// The built-in elevated Line 1, compressed for arcade play (~10.5 km)
    pub fn line_one() -> Self {
        let stations = vec![
            Station::new("s1", "Carrera 94", 0.0, "Patio Taller Start"),
            Station::new("s2", "Portal Américas", 600.0, "Major transport hub"),
            Station::new("s3", "Carrera 80", 1200.0, "Kennedy Central"),
            Station::new("s4", "Calle 42 Sur", 1800.0, "Residential sector"),
            Station::new("s5", "Ciudad Kennedy", 2500.0, "Hospital zone"),
            Station::new("s6", "Avenida Boyacá", 3200.0, "Main avenue interchange"),
            Station::new("s7", "Avenida Carrera 68", 3900.0, "Future feeder connection"),
            Station::new("s8", "Avenida Carrera 50", 4600.0, "Industrial zone"),
            Station::new("s9", "SENA", 5300.0, "NQS Interchange"),
            Station::new("s10", "Avenida Carrera 24", 6000.0, "Antonio Nariño"),
            Station::new("s11", "Hospital", 6700.0, "Medical district"),
            Station::new("s12", "Avenida Jiménez", 7400.0, "Historic Center / San Victorino"),
            Station::new("s13", "Estación Central", 8100.0, "Calle 26 Interchange"),
            Station::new("s14", "Calle 45", 8800.0, "University Zone"),
            Station::new("s15", "Calle 63", 9500.0, "Lourdes Park"),
            Station::new("s16", "Calle 72", 10200.0, "Financial District Terminus"),
        ];
        let challenges = vec![
            Challenge::speed_limit("c1", 2000.0, 2200.0, 30.0, "SLOW ZONE: Unstable Ground."),
            Challenge::obstacle("c2", 3500.0, "DANGER: Debris on Track. STOP."),
            Challenge::speed_limit("c3", 5000.0, 5200.0, 25.0, "SLOW ZONE: Bridge Inspection."),
            Challenge::obstacle("c4", 7000.0, "DANGER: Construction Crane."),
            Challenge::speed_limit("c5", 8500.0, 8700.0, 20.0, "SLOW ZONE: Curve Alignment."),
        ];
        Self {
            stations,
            challenges,
        }
    }

    pub fn validate(&self) -> Result<(), TrackError> {
        if self.stations.is_empty() {
            return Err(TrackError::NoStations);
        }

        let mut ids = HashSet::new();
        let mut prev: Option<f32> = None;
        for station in &self.stations {
            if !ids.insert(station.id.as_str()) {
                return Err(TrackError::DuplicateId(station.id.clone()));
            }
            check_bounds(&station.id, station.distance)?;
            if prev.is_some_and(|p| station.distance <= p) {
                return Err(TrackError::StationOrder {
                    id: station.id.clone(),
                    distance: station.distance,
                });
            }
            prev = Some(station.distance);
        }

        for challenge in &self.challenges {
            if !ids.insert(challenge.id.as_str()) {
                return Err(TrackError::DuplicateId(challenge.id.clone()));
            }
            check_bounds(&challenge.id, challenge.start_distance)?;
            if challenge.kind == ChallengeKind::SpeedLimit {
                let end = challenge
                    .end_distance
                    .ok_or_else(|| TrackError::MissingZoneEnd(challenge.id.clone()))?;
                check_bounds(&challenge.id, end)?;
                if end <= challenge.start_distance {
                    return Err(TrackError::InvertedZone {
                        id: challenge.id.clone(),
                        start: challenge.start_distance,
                        end,
                    });
                }
            }
        }

        Ok(())
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    /// Index of the last station
    pub fn terminus(&self) -> usize {
        self.stations.len().saturating_sub(1)
    }

    pub fn is_terminus(&self, index: usize) -> bool {
        index == self.terminus()
    }

    pub fn station(&self, id: &str) -> Option<&Station> {
        self.stations.iter().find(|s| s.id == id)
    }

    /// Hazards for a new run: template copy (cleared reset) or a seeded layout
    pub fn challenges_for_run(&self, mode: ChallengeMode, seed: u64) -> Vec<Challenge> {
        match mode {
            ChallengeMode::Fixed => self
                .challenges
                .iter()
                .cloned()
                .map(|mut c| {
                    c.cleared = false;
                    c
                })
                .collect(),
            ChallengeMode::Random => self.random_challenges(seed),
        }
    }

    /// One hazard per equal slot between the first and last station, in slot order
    fn random_challenges(&self, seed: u64) -> Vec<Challenge> {
        let mut rng = Pcg32::seed_from_u64(seed);
        let count = self.challenges.len().max(1);

        let first = self.stations.first().map_or(0.0, |s| s.distance);
        let last = self.stations.last().map_or(TRACK_LENGTH, |s| s.distance);
        // Keep clear of the depot and the terminus
        let span_start = first + RANDOM_MARGIN;
        let span_end = (last - RANDOM_MARGIN).max(span_start + 1.0);
        let slot = (span_end - span_start) / count as f32;

        (0..count)
            .map(|i| {
                let slot_start = span_start + slot * i as f32;
                // Leave room for a zone inside the slot
                let usable = (slot - RANDOM_ZONE_LENGTH).max(1.0);
                let start = (slot_start + rng.random_range(0.0..usable)).round();
                let id = format!("r{}", i + 1);

                if rng.random_bool(0.5) {
                    let description = OBSTACLE_TEXTS[rng.random_range(0..OBSTACLE_TEXTS.len())];
                    Challenge::obstacle(&id, start, description)
                } else {
                    let limit = RANDOM_LIMITS[rng.random_range(0..RANDOM_LIMITS.len())];
                    let description = ZONE_TEXTS[rng.random_range(0..ZONE_TEXTS.len())];
                    Challenge::speed_limit(
                        &id,
                        start,
                        start + RANDOM_ZONE_LENGTH,
                        limit,
                        description,
                    )
                }
            })
            .collect()
    }
}

fn check_bounds(id: &str, distance: f32) -> Result<(), TrackError> {
    if !(0.0..=TRACK_LENGTH).contains(&distance) {
        return Err(TrackError::OutOfBounds {
            id: id.to_string(),
            distance,
            max: TRACK_LENGTH,
        });
    }
    Ok(())
}

const RANDOM_MARGIN: f32 = 1000.0;
const RANDOM_ZONE_LENGTH: f32 = 200.0;
const RANDOM_LIMITS: [f32; 3] = [20.0, 25.0, 30.0];

const OBSTACLE_TEXTS: [&str; 3] = [
    "DANGER: Debris on Track. STOP.",
    "DANGER: Construction Crane.",
    "DANGER: Maintenance Vehicle on Line.",
];

const ZONE_TEXTS: [&str; 3] = [
    "SLOW ZONE: Unstable Ground.",
    "SLOW ZONE: Bridge Inspection.",
    "SLOW ZONE: Curve Alignment.",
];
