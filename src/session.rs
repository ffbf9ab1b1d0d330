//! Simulation loop
//!
//! Owns one run and its collaborators. The host calls `frame` once per
//! display frame with its clock and forwards player input between frames.
//! Advisory text is requested fire-and-forget and polled once per frame, so
//! a slow generator never stalls the loop.

use std::future::Future;
use std::task::{Context, Poll, Waker};

use crate::advisory::{Advisor, BoxedText};
use crate::announce::AnnouncementLog;
use crate::audio::AudioSink;
use crate::settings::Settings;
use crate::sim::{
    self, ChallengeKind, ChallengeMode, GameState, LogSource, SimEvent, Step, TickContext,
    TickInput, Track,
};

const WELCOME: &str = "Welcome to High-Speed Testing. ";
const REBOOTED: &str = "System Rebooted. Ready for departure.";
const OUTSIDE_ZONE: &str = "Attention: Doors opening outside of station zone.";

/// Whether the host should keep scheduling frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Continue,
    /// The run is over; nothing changes until a restart
    Halted,
}

/// An outstanding advisory request and where its text goes
struct Pending {
    text: BoxedText,
    source: LogSource,
    urgent: bool,
    /// Prepended to the delivered text
    lead: &'static str,
}

impl Pending {
    fn new(text: BoxedText, source: LogSource) -> Self {
        Self {
            text,
            source,
            urgent: false,
            lead: "",
        }
    }
}

/// Take a slot's text if it has resolved
fn take_ready(slot: &mut Option<Pending>, cx: &mut Context<'_>) -> Option<(Pending, String)> {
    let Poll::Ready(text) = slot.as_mut()?.text.as_mut().poll(cx) else {
        return None;
    };
    slot.take().map(|pending| (pending, text))
}

/// One run of the line plus everything it talks to
pub struct Session<A: AudioSink, V: Advisor> {
    track: Track,
    mode: ChallengeMode,
    seed: u64,
    state: GameState,
    ctx: TickContext,
    input: TickInput,
    log: AnnouncementLog,
    audio: A,
    advisor: V,
    /// Hazard advisory; its presence mirrors the alert lock
    alert: Option<Pending>,
    /// Station announcement or trivia
    announcement: Option<Pending>,
}

impl<A: AudioSink, V: Advisor> Session<A, V> {
    pub fn new(track: Track, mode: ChallengeMode, seed: u64, audio: A, advisor: V) -> Self {
        let state = GameState::new(&track, track.challenges_for_run(mode, seed));
        log::info!(
            "Run started: {} stations, {:?} hazards (seed {seed})",
            track.station_count(),
            mode
        );

        let mut session = Self {
            track,
            mode,
            seed,
            state,
            ctx: TickContext::new(),
            input: TickInput::default(),
            log: AnnouncementLog::new(),
            audio,
            advisor,
            alert: None,
            announcement: None,
        };

        let trivia = session.advisor.trivia();
        session.announcement = Some(Pending {
            lead: WELCOME,
            ..Pending::new(trivia, LogSource::Named("Depot".into()))
        });
        session.poll_advisories();
        session
    }

    pub fn with_settings(track: Track, settings: &Settings, audio: A, advisor: V) -> Self {
        Self::new(
            track,
            settings.challenge_mode,
            settings.run_seed(),
            audio,
            advisor,
        )
    }

    // === Player input ===

    pub fn set_accelerate(&mut self, held: bool) {
        self.input.accelerate = held;
    }

    pub fn set_brake(&mut self, held: bool) {
        self.input.brake = held;
    }

    /// Closing always works; opening needs the train stopped near the next station
    pub fn toggle_doors(&mut self) {
        if !self.state.door_open && !self.state.can_open_doors(&self.track) {
            log::debug!(
                "Door request ignored at {:.1} m, {:.2} m/s",
                self.state.position,
                self.state.velocity
            );
            return;
        }
        let step = sim::toggle_doors(self.state.clone(), &self.track, &mut self.ctx);
        self.apply(step);
        self.poll_advisories();
    }

    pub fn clear_obstacle(&mut self) {
        let step = sim::clear_obstacle(self.state.clone());
        self.apply(step);
        self.poll_advisories();
    }

    // === Loop ===

    /// Run one frame at host time `now` (seconds)
    pub fn frame(&mut self, now: f64) -> FrameStatus {
        let dt = self.ctx.elapsed(now);
        let step = sim::tick(
            self.state.clone(),
            &self.track,
            &self.input,
            &mut self.ctx,
            dt,
        );
        self.apply(step);
        self.poll_advisories();

        if self.state.is_over() {
            FrameStatus::Halted
        } else {
            FrameStatus::Continue
        }
    }

    /// Start over with a fresh run. Outstanding advisories are dropped.
    pub fn restart(&mut self, mode: ChallengeMode, seed: u64) {
        log::info!("Restarting run ({mode:?}, seed {seed})");
        self.mode = mode;
        self.seed = seed;
        self.state = GameState::new(&self.track, self.track.challenges_for_run(mode, seed));
        self.ctx.reset();
        self.input = TickInput::default();
        self.audio.stop_ambient_alert();
        self.audio.start_music();
        self.alert = None;
        self.announcement = None;
        self.log.clear();
        self.log.push(0.0, REBOOTED, LogSource::System, false);
    }

    // === Accessors ===

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn log(&self) -> &AnnouncementLog {
        &self.log
    }

    pub fn input(&self) -> TickInput {
        self.input
    }

    pub fn mode(&self) -> ChallengeMode {
        self.mode
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn is_over(&self) -> bool {
        self.state.is_over()
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }

    // === Effects ===

    fn now(&self) -> f64 {
        self.ctx.last_time.unwrap_or(0.0)
    }

    fn apply(&mut self, step: Step) {
        self.state = step.state;
        for event in step.events {
            self.dispatch(event);
        }
    }

    fn dispatch(&mut self, event: SimEvent) {
        match event {
            SimEvent::Cue(cue) => self.audio.play_cue(cue),
            SimEvent::AmbientStart => self.audio.start_ambient_alert(),
            SimEvent::AmbientStop => self.audio.stop_ambient_alert(),
            SimEvent::HazardAlert { kind, description } => self.request_alert(kind, &description),
            SimEvent::Log {
                text,
                source,
                urgent,
            } => {
                let at = self.now();
                self.log.push(at, text, source, urgent);
            }
            SimEvent::Announce {
                station,
                at_station,
            } => self.request_announcement(station, at_station),
            SimEvent::GameOver(outcome) => {
                log::info!("{}: {}", outcome.headline(), outcome.summary());
            }
        }
    }

    fn request_alert(&mut self, kind: ChallengeKind, description: &str) {
        let text = self.advisor.hazard_alert(kind, description);
        self.alert = Some(Pending {
            urgent: true,
            ..Pending::new(text, LogSource::System)
        });
    }

    fn request_announcement(&mut self, index: usize, at_station: bool) {
        if self.announcement.is_some() {
            log::debug!("Announcement already in progress, skipping");
            return;
        }
        if !at_station {
            let at = self.now();
            self.log
                .push(at, OUTSIDE_ZONE, LogSource::Named("Unknown".into()), false);
            return;
        }
        let Some(station) = self.track.stations.get(index) else {
            return;
        };
        let previous = index
            .checked_sub(1)
            .and_then(|i| self.track.stations.get(i))
            .map(|s| s.name.as_str());
        let text = self.advisor.station_announcement(&station.name, previous);
        self.announcement = Some(Pending::new(text, LogSource::Named(station.name.clone())));
    }

    /// Poll both slots once without blocking
    fn poll_advisories(&mut self) {
        let mut cx = Context::from_waker(Waker::noop());
        let at = self.now();

        if let Some((pending, text)) = take_ready(&mut self.alert, &mut cx) {
            self.log.push(at, text, pending.source, pending.urgent);
            self.ctx.release_alert();
        }
        if let Some((pending, text)) = take_ready(&mut self.announcement, &mut cx) {
            self.log.push(
                at,
                format!("{}{}", pending.lead, text),
                pending.source,
                pending.urgent,
            );
        }
    }
}
