//! Advisory text collaborator
//!
//! Hazard alerts, station announcements and trivia arrive as futures so a
//! host can back them with a slow remote generator. The session never waits
//! on them; it polls once per frame.

use std::cell::RefCell;
use std::future::{self, Future};
use std::pin::Pin;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::sim::ChallengeKind;

/// Text that will be ready at some point
pub type BoxedText = Pin<Box<dyn Future<Output = String>>>;

/// Source of flavor text. Implementations must always produce something;
/// failures degrade to canned text instead of erroring.
pub trait Advisor {
    fn hazard_alert(&self, kind: ChallengeKind, details: &str) -> BoxedText;

    /// `previous` is `None` at the depot
    fn station_announcement(&self, station: &str, previous: Option<&str>) -> BoxedText;

    fn trivia(&self) -> BoxedText;
}

const FALLBACK_ALERTS: [&str; 5] = [
    "ATTENTION: TRACK HAZARD DETECTED.",
    "WARNING: REDUCE SPEED.",
    "CAUTION: MAINTENANCE CREW AHEAD.",
    "ALERT: OBSTACLE ON LINE.",
    "SYSTEM: SPEED RESTRICTION IN EFFECT.",
];

const FALLBACK_TRIVIA: [&str; 5] = [
    "The Bogotá Metro Line 1 is fully elevated.",
    "The viaduct is designed to be earthquake resistant.",
    "Metro trains will be fully automated (GoA4).",
    "The line connects with TransMilenio BRT.",
    "The depot is located in the Bosa district.",
];

/// Offline advisor built from fixed phrase pools
pub struct CannedAdvisor {
    rng: RefCell<Pcg32>,
}

impl CannedAdvisor {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: RefCell::new(Pcg32::seed_from_u64(seed)),
        }
    }

    fn pick(&self, pool: &[&'static str]) -> &'static str {
        let index = self.rng.borrow_mut().random_range(0..pool.len());
        pool[index]
    }
}

impl Default for CannedAdvisor {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Advisor for CannedAdvisor {
    fn hazard_alert(&self, kind: ChallengeKind, details: &str) -> BoxedText {
        log::debug!("canned alert for {}", kind.as_str());
        let text = format!("{} ({details})", self.pick(&FALLBACK_ALERTS));
        Box::pin(future::ready(text))
    }

    fn station_announcement(&self, station: &str, _previous: Option<&str>) -> BoxedText {
        Box::pin(future::ready(format!("Arriving at {station}.")))
    }

    fn trivia(&self) -> BoxedText {
        Box::pin(future::ready(self.pick(&FALLBACK_TRIVIA).to_string()))
    }
}
