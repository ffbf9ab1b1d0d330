//! Audio collaborator
//!
//! The simulation only names cues; a sink decides what they sound like.
//! `WebAudio` synthesises everything procedurally in the browser, `Silent`
//! is used for headless runs.

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::WebAudio;

pub use crate::sim::Cue;

/// Something that can play the game's sound cues
pub trait AudioSink {
    /// Fire-and-forget one-shot cue
    fn play_cue(&mut self, cue: Cue);

    /// Start the looping rumble. Calling it while running does nothing.
    fn start_ambient_alert(&mut self);

    /// Stop the rumble if it is running
    fn stop_ambient_alert(&mut self);

    /// Start the background music loop. Idempotent like the rumble.
    fn start_music(&mut self);

    fn stop_music(&mut self);
}

/// No-op sink
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl AudioSink for Silent {
    fn play_cue(&mut self, cue: Cue) {
        log::trace!("cue {cue:?}");
    }

    fn start_ambient_alert(&mut self) {}

    fn stop_ambient_alert(&mut self) {}

    fn start_music(&mut self) {}

    fn stop_music(&mut self) {}
}

impl<T: AudioSink + ?Sized> AudioSink for Box<T> {
    fn play_cue(&mut self, cue: Cue) {
        (**self).play_cue(cue);
    }

    fn start_ambient_alert(&mut self) {
        (**self).start_ambient_alert();
    }

    fn stop_ambient_alert(&mut self) {
        (**self).stop_ambient_alert();
    }

    fn start_music(&mut self) {
        (**self).start_music();
    }

    fn stop_music(&mut self) {
        (**self).stop_music();
    }
}

/// Sink that remembers what it was asked to do
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct Recorder {
    pub cues: Vec<Cue>,
    pub ambient: bool,
    pub ambient_starts: usize,
    pub ambient_stops: usize,
    pub music: bool,
    pub music_starts: usize,
}

#[cfg(test)]
impl AudioSink for Recorder {
    fn play_cue(&mut self, cue: Cue) {
        self.cues.push(cue);
    }

    fn start_ambient_alert(&mut self) {
        if !self.ambient {
            self.ambient = true;
            self.ambient_starts += 1;
        }
    }

    fn stop_ambient_alert(&mut self) {
        if self.ambient {
            self.ambient = false;
            self.ambient_stops += 1;
        }
    }

    fn start_music(&mut self) {
        if !self.music {
            self.music = true;
            self.music_starts += 1;
        }
    }

    fn stop_music(&mut self) {
        self.music = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boxed_sink_forwards() {
        let mut sink: Box<Recorder> = Box::default();
        sink.play_cue(Cue::Warning);
        sink.start_ambient_alert();
        sink.start_ambient_alert();
        sink.stop_ambient_alert();
        assert_eq!(sink.cues, vec![Cue::Warning]);
        assert_eq!(sink.ambient_starts, 1);
        assert_eq!(sink.ambient_stops, 1);
    }

    #[test]
    fn test_music_starts_once() {
        let mut sink: Box<dyn AudioSink> = Box::new(Silent);
        sink.start_music();
        sink.stop_music();

        let mut sink: Box<Recorder> = Box::default();
        sink.start_music();
        sink.start_music();
        assert!(sink.music);
        assert_eq!(sink.music_starts, 1);
        sink.stop_music();
        assert!(!sink.music);
        sink.start_music();
        assert_eq!(sink.music_starts, 2);
    }
}
