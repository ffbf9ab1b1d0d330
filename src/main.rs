//! Metro Sim entry point
//!
//! On the web: drives a `Session` from `requestAnimationFrame` with keyboard
//! controls and a text HUD. Natively: runs the autopilot over the line headless.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, KeyboardEvent};

    use metro_sim::advisory::CannedAdvisor;
    use metro_sim::audio::WebAudio;
    use metro_sim::sim::{Action, Autopilot, Track};
    use metro_sim::{FrameStatus, Session, Settings, format_money};

    /// Game instance holding all state
    struct Game {
        session: Session<WebAudio, CannedAdvisor>,
        settings: Settings,
        /// Demo driver, when enabled
        autopilot: Option<Autopilot>,
        /// Pending animation frame, if the loop is scheduled
        raf: Option<i32>,
        last_time: f64,
    }

    impl Game {
        fn new(settings: Settings) -> Self {
            let seed = settings.run_seed();
            let session = Session::new(
                Track::line_one(),
                settings.challenge_mode,
                seed,
                WebAudio::from_settings(&settings),
                CannedAdvisor::new(seed),
            );
            log::info!("Game initialized with seed: {}", seed);
            Self {
                session,
                settings,
                autopilot: None,
                raf: None,
                last_time: 0.0,
            }
        }

        fn update(&mut self, now: f64) -> FrameStatus {
            let dt = if self.last_time > 0.0 {
                (now - self.last_time) as f32
            } else {
                0.0
            };
            self.last_time = now;

            if let Some(pilot) = self.autopilot.as_mut() {
                let decision = pilot.decide(self.session.state(), self.session.track(), dt);
                self.session.set_accelerate(decision.input.accelerate);
                self.session.set_brake(decision.input.brake);
                match decision.action {
                    Some(Action::ToggleDoors) => self.session.toggle_doors(),
                    Some(Action::ClearObstacle) => self.session.clear_obstacle(),
                    None => {}
                }
            }

            self.session.frame(now)
        }

        fn restart(&mut self) {
            let seed = self.settings.run_seed();
            self.session.restart(self.settings.challenge_mode, seed);
            self.last_time = 0.0;
            log::info!("Game restarted with seed: {}", seed);
        }

        fn update_hud(&self, document: &Document) {
            let state = self.session.state();
            let track = self.session.track();

            let set = |id: &str, text: &str| {
                if let Some(el) = document.get_element_by_id(id) {
                    el.set_text_content(Some(text));
                }
            };

            set("hud-speed", &format!("{:.0} km/h", state.speed_kmh()));
            set(
                "hud-distance",
                &format!("{:.0} m", state.distance_to_next(track)),
            );
            if let Some(station) = track.stations.get(state.current_station) {
                set("hud-station", &station.name);
            }
            set("hud-money", &format!("${}", format_money(state.money)));
            set("hud-health", &format!("{:.0}%", state.health));
            set("hud-time", &format!("{:.0}s", state.time_left));
            set(
                "hud-hint",
                if state.can_open_doors(track) {
                    "Press D to open doors"
                } else if state.can_clear_obstacle() {
                    "Press C to clear the track"
                } else {
                    ""
                },
            );

            let log: Vec<String> = self
                .session
                .log()
                .entries()
                .map(|e| format!("[{}] {}", e.source.label(), e.text))
                .collect();
            set("hud-log", &log.join("\n"));

            if let Some(el) = document.get_element_by_id("game-over") {
                if state.is_over() {
                    let _ = el.set_attribute("class", "");
                    set("game-over-title", state.game_over.headline());
                    set("game-over-summary", state.game_over.summary());
                } else {
                    let _ = el.set_attribute("class", "hidden");
                }
            }
        }
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        if let Err(err) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("logger init failed: {err}").into());
        }

        log::info!("Metro Sim starting...");

        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            log::error!("No document - cannot start");
            return;
        };

        // Hide loading indicator
        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let game = Rc::new(RefCell::new(Game::new(Settings::load())));

        setup_keyboard(game.clone());
        setup_restart_button(game.clone());

        schedule(game);
        log::info!("Metro Sim running!");
    }

    fn schedule(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let next = game.clone();
        let callback = Closure::once_into_js(move |time: f64| game_loop(next, time));
        match window.request_animation_frame(callback.unchecked_ref()) {
            Ok(handle) => game.borrow_mut().raf = Some(handle),
            Err(err) => log::error!("requestAnimationFrame failed: {err:?}"),
        }
    }

    fn cancel(game: &Rc<RefCell<Game>>) {
        let Some(handle) = game.borrow_mut().raf.take() else {
            return;
        };
        if let Some(window) = web_sys::window() {
            let _ = window.cancel_animation_frame(handle);
        }
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        let status = {
            let mut g = game.borrow_mut();
            g.raf = None;
            let status = g.update(time / 1000.0);
            g.session.audio_mut().update_music();
            if let Some(document) = web_sys::window().and_then(|w| w.document()) {
                g.update_hud(&document);
            }
            status
        };

        match status {
            FrameStatus::Continue => schedule(game),
            FrameStatus::Halted => log::info!("Run over - loop halted"),
        }
    }

    fn restart(game: &Rc<RefCell<Game>>) {
        cancel(game);
        game.borrow_mut().restart();
        schedule(game.clone());
    }

    fn setup_keyboard(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };

        // Held controls
        for (kind, held) in [("keydown", true), ("keyup", false)] {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut g = game.borrow_mut();
                match event.key().as_str() {
                    "ArrowUp" | "w" | "W" => g.session.set_accelerate(held),
                    "ArrowDown" | "s" | "S" | " " => g.session.set_brake(held),
                    _ => {}
                }
            });
            let _ = window.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Discrete actions
        let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
            if event.repeat() {
                return;
            }
            // Browsers only allow audio after a user gesture
            game.borrow().session.audio().resume();

            match event.key().as_str() {
                "d" | "D" => game.borrow_mut().session.toggle_doors(),
                "c" | "C" => game.borrow_mut().session.clear_obstacle(),
                "a" | "A" => {
                    let mut g = game.borrow_mut();
                    g.autopilot = match g.autopilot.take() {
                        Some(_) => None,
                        None => Some(Autopilot::new()),
                    };
                    log::info!("Autopilot: {}", g.autopilot.is_some());
                }
                "m" | "M" => {
                    let mut g = game.borrow_mut();
                    g.settings.muted = !g.settings.muted;
                    let settings = g.settings.clone();
                    g.session.audio_mut().apply_settings(&settings);
                    settings.save();
                }
                "r" | "R" => restart(&game),
                _ => {}
            }

            // Music waits for the first key press; no-op while muted or playing
            game.borrow_mut().session.audio_mut().start_music();
        });
        let _ = window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_restart_button(game: Rc<RefCell<Game>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };

        if let Some(btn) = document.get_element_by_id("restart-btn") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                restart(&game);
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use metro_sim::advisory::CannedAdvisor;
    use metro_sim::audio::Silent;
    use metro_sim::sim::{Action, Autopilot, ChallengeMode, Track};
    use metro_sim::{FrameStatus, Session, Settings, format_money};

    env_logger::init();
    log::info!("Metro Sim (native) starting autopilot demo...");

    // Optional seed argument switches to a random hazard layout
    let mut settings = Settings::load();
    if let Some(seed) = std::env::args().nth(1).and_then(|s| s.parse().ok()) {
        settings.seed = Some(seed);
        settings.challenge_mode = ChallengeMode::Random;
    }

    let seed = settings.run_seed();
    let mut session = Session::new(
        Track::line_one(),
        settings.challenge_mode,
        seed,
        Silent,
        CannedAdvisor::new(seed),
    );
    let mut pilot = Autopilot::new();

    const DT: f64 = 1.0 / 60.0;
    const MAX_FRAMES: u32 = 60 * 60 * 20;
    let mut last_logged = None;

    for frame in 0..MAX_FRAMES {
        let decision = pilot.decide(session.state(), session.track(), DT as f32);
        session.set_accelerate(decision.input.accelerate);
        session.set_brake(decision.input.brake);
        match decision.action {
            Some(Action::ToggleDoors) => session.toggle_doors(),
            Some(Action::ClearObstacle) => session.clear_obstacle(),
            None => {}
        }
        let status = session.frame(f64::from(frame) * DT);

        for entry in session.log().entries() {
            if last_logged.is_none_or(|id| entry.id > id) {
                println!("{:>7.1}s [{}] {}", entry.at, entry.source.label(), entry.text);
                last_logged = Some(entry.id);
            }
        }

        if status == FrameStatus::Halted {
            break;
        }
    }

    let state = session.state();
    println!(
        "\n{} - {}\n  stations {}/{}  money ${}  health {:.0}%  time left {:.0}s",
        state.game_over.headline(),
        state.game_over.summary(),
        state.completed_count(),
        session.track().station_count(),
        format_money(state.money),
        state.health,
        state.time_left
    );
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
