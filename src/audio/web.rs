//! Web Audio backend
//!
//! Procedurally generated cues - no external files needed!

use web_sys::{
    AudioContext, AudioContextState, BiquadFilterType, GainNode, OscillatorNode, OscillatorType,
};

use super::{AudioSink, Cue};
use crate::Settings;

/// Nodes of the running rumble, kept so it can be stopped
struct Rumble {
    source: OscillatorNode,
    rattle: OscillatorNode,
}

/// Seconds between bass pulses
const PULSE_PERIOD: f64 = 1.0;
/// How far ahead pulses are queued on the audio clock
const PULSE_HORIZON: f64 = 2.0;

/// Background music: drone and pad run continuously, pulses are queued ahead
struct Music {
    voices: Vec<OscillatorNode>,
    next_pulse: f64,
    vol: f32,
}

/// Browser audio output
pub struct WebAudio {
    ctx: Option<AudioContext>,
    rumble: Option<Rumble>,
    music: Option<Music>,
    master_volume: f32,
    sfx_volume: f32,
    muted: bool,
}

impl Default for WebAudio {
    fn default() -> Self {
        Self::new()
    }
}

impl WebAudio {
    pub fn new() -> Self {
        // May fail outside a secure context
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        Self {
            ctx,
            rumble: None,
            music: None,
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let mut audio = Self::new();
        audio.apply_settings(settings);
        audio
    }

    pub fn apply_settings(&mut self, settings: &Settings) {
        self.master_volume = settings.master_volume.clamp(0.0, 1.0);
        self.sfx_volume = settings.sfx_volume.clamp(0.0, 1.0);
        self.muted = settings.muted;
        if self.muted {
            self.stop_ambient_alert();
            self.stop_music();
        }
    }

    /// Queue upcoming music pulses. Call once per frame.
    pub fn update_music(&mut self) {
        let Some(ctx) = self.ctx.as_ref() else {
            return;
        };
        let Some(music) = self.music.as_mut() else {
            return;
        };
        let horizon = ctx.current_time() + PULSE_HORIZON;
        // Fell behind (tab hidden): skip the missed beats
        music.next_pulse = music.next_pulse.max(ctx.current_time());
        while music.next_pulse < horizon {
            play_pulse(ctx, music.next_pulse, music.vol);
            music.next_pulse += PULSE_PERIOD;
        }
    }

    /// Resume audio context (required after user gesture)
    pub fn resume(&self) {
        if let Some(ctx) = &self.ctx {
            let _ = ctx.resume();
        }
    }

    fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume * self.sfx_volume
        }
    }

    fn music_volume(&self) -> f32 {
        if self.muted { 0.0 } else { self.master_volume }
    }

    /// Context ready to play, resumed if the browser suspended it
    fn live_context(&self) -> Option<&AudioContext> {
        let ctx = self.ctx.as_ref()?;
        if ctx.state() == AudioContextState::Suspended {
            let _ = ctx.resume();
        }
        Some(ctx)
    }

    fn create_osc(
        &self,
        ctx: &AudioContext,
        freq: f32,
        osc_type: OscillatorType,
    ) -> Option<(OscillatorNode, GainNode)> {
        let osc = ctx.create_oscillator().ok()?;
        let gain = ctx.create_gain().ok()?;

        osc.set_type(osc_type);
        osc.frequency().set_value(freq);
        osc.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;

        Some((osc, gain))
    }

    /// Door open - two-tone chime
    fn play_door_open(&self, ctx: &AudioContext, vol: f32) {
        let Some((osc, gain)) = self.create_osc(ctx, 660.0, OscillatorType::Sine) else {
            return;
        };
        let t = ctx.current_time();

        gain.gain().set_value_at_time(vol * 0.1, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.001, t + 0.8)
            .ok();
        osc.frequency().set_value_at_time(660.0, t).ok();
        osc.frequency().set_value_at_time(550.0, t + 0.15).ok();

        osc.start().ok();
        osc.stop_with_when(t + 0.8).ok();
    }

    /// Door close - two beeps then a thud
    fn play_door_close(&self, ctx: &AudioContext, vol: f32) {
        let t = ctx.current_time();

        if let Some((osc, gain)) = self.create_osc(ctx, 800.0, OscillatorType::Square) {
            gain.gain().set_value_at_time(vol * 0.05, t).ok();
            gain.gain().set_value_at_time(0.0, t + 0.1).ok();
            gain.gain().set_value_at_time(vol * 0.05, t + 0.2).ok();
            gain.gain().set_value_at_time(0.0, t + 0.3).ok();
            osc.start().ok();
            osc.stop_with_when(t + 0.4).ok();
        }

        if let Some((osc, gain)) = self.create_osc(ctx, 100.0, OscillatorType::Sine) {
            gain.gain().set_value_at_time(0.0, t).ok();
            gain.gain().set_value_at_time(vol * 0.2, t + 0.35).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.001, t + 0.6)
                .ok();
            osc.frequency().set_value_at_time(100.0, t + 0.35).ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(0.01, t + 0.5)
                .ok();
            osc.start_with_when(t + 0.35).ok();
            osc.stop_with_when(t + 0.6).ok();
        }
    }

    /// Brake - falling squeal
    fn play_brake(&self, ctx: &AudioContext, vol: f32) {
        let Some((osc, gain)) = self.create_osc(ctx, 1200.0, OscillatorType::Sawtooth) else {
            return;
        };
        let t = ctx.current_time();

        gain.gain().set_value_at_time(vol * 0.02, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.001, t + 0.5)
            .ok();
        osc.frequency().set_value_at_time(1200.0, t).ok();
        osc.frequency()
            .linear_ramp_to_value_at_time(800.0, t + 0.5)
            .ok();

        osc.start().ok();
        osc.stop_with_when(t + 0.5).ok();
    }

    /// Depart - rising motor tone
    fn play_depart(&self, ctx: &AudioContext, vol: f32) {
        let Some((osc, gain)) = self.create_osc(ctx, 100.0, OscillatorType::Triangle) else {
            return;
        };
        let t = ctx.current_time();

        gain.gain().set_value_at_time(vol * 0.05, t).ok();
        gain.gain().linear_ramp_to_value_at_time(0.0, t + 1.0).ok();
        osc.frequency().set_value_at_time(100.0, t).ok();
        osc.frequency()
            .exponential_ramp_to_value_at_time(400.0, t + 1.0)
            .ok();

        osc.start().ok();
        osc.stop_with_when(t + 1.0).ok();
    }

    /// Warning - short alarm sweep
    fn play_warning(&self, ctx: &AudioContext, vol: f32) {
        let Some((osc, gain)) = self.create_osc(ctx, 800.0, OscillatorType::Sawtooth) else {
            return;
        };
        let t = ctx.current_time();

        gain.gain().set_value_at_time(vol * 0.1, t).ok();
        gain.gain().linear_ramp_to_value_at_time(0.0, t + 0.3).ok();
        osc.frequency().set_value_at_time(800.0, t).ok();
        osc.frequency()
            .linear_ramp_to_value_at_time(600.0, t + 0.2)
            .ok();

        osc.start().ok();
        osc.stop_with_when(t + 0.3).ok();
    }

    /// Low filtered drone, amplitude-modulated at 15 Hz into a rattle
    fn build_rumble(&self, ctx: &AudioContext, vol: f32) -> Option<Rumble> {
        let t = ctx.current_time();

        let source = ctx.create_oscillator().ok()?;
        source.set_type(OscillatorType::Sawtooth);
        source.frequency().set_value_at_time(55.0, t).ok()?;

        let filter = ctx.create_biquad_filter().ok()?;
        filter.set_type(BiquadFilterType::Lowpass);
        filter.frequency().set_value_at_time(400.0, t).ok()?;

        let gain = ctx.create_gain().ok()?;
        gain.gain().set_value_at_time(vol * 0.2, t).ok()?;

        let rattle = ctx.create_oscillator().ok()?;
        rattle.set_type(OscillatorType::Square);
        rattle.frequency().set_value_at_time(15.0, t).ok()?;
        let depth = ctx.create_gain().ok()?;
        depth.gain().set_value_at_time(vol * 0.1, t).ok()?;

        rattle.connect_with_audio_node(&depth).ok()?;
        depth.connect_with_audio_param(&gain.gain()).ok()?;
        source.connect_with_audio_node(&filter).ok()?;
        filter.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;

        source.start().ok()?;
        rattle.start().ok()?;
        Some(Rumble { source, rattle })
    }

    /// Filtered sawtooth drone plus a slow-vibrato triangle pad
    fn build_music(&self, ctx: &AudioContext, vol: f32) -> Option<Music> {
        let t = ctx.current_time();

        let bass = ctx.create_oscillator().ok()?;
        bass.set_type(OscillatorType::Sawtooth);
        bass.frequency().set_value_at_time(50.0, t).ok()?;
        let filter = ctx.create_biquad_filter().ok()?;
        filter.set_type(BiquadFilterType::Lowpass);
        filter.frequency().set_value_at_time(120.0, t).ok()?;
        let bass_gain = ctx.create_gain().ok()?;
        bass_gain.gain().set_value_at_time(vol * 0.15, t).ok()?;
        bass.connect_with_audio_node(&filter).ok()?;
        filter.connect_with_audio_node(&bass_gain).ok()?;
        bass_gain.connect_with_audio_node(&ctx.destination()).ok()?;

        let (pad, pad_gain) = self.create_osc(ctx, 220.0, OscillatorType::Triangle)?;
        pad_gain.gain().set_value_at_time(vol * 0.03, t).ok()?;

        // 0.1 Hz wobble of +/-100 Hz on the pad pitch
        let lfo = ctx.create_oscillator().ok()?;
        lfo.set_type(OscillatorType::Sine);
        lfo.frequency().set_value_at_time(0.1, t).ok()?;
        let depth = ctx.create_gain().ok()?;
        depth.gain().set_value_at_time(100.0, t).ok()?;
        lfo.connect_with_audio_node(&depth).ok()?;
        depth.connect_with_audio_param(&pad.frequency()).ok()?;

        bass.start().ok()?;
        pad.start().ok()?;
        lfo.start().ok()?;

        Some(Music {
            voices: vec![bass, pad, lfo],
            next_pulse: t,
            vol,
        })
    }
}

/// One short square-wave thump at audio time `t`
fn play_pulse(ctx: &AudioContext, t: f64, vol: f32) {
    let (Ok(osc), Ok(gain)) = (ctx.create_oscillator(), ctx.create_gain()) else {
        return;
    };
    osc.set_type(OscillatorType::Square);
    osc.frequency().set_value_at_time(100.0, t).ok();
    osc.frequency()
        .exponential_ramp_to_value_at_time(0.01, t + 0.1)
        .ok();
    gain.gain().set_value_at_time(vol * 0.05, t).ok();
    gain.gain()
        .exponential_ramp_to_value_at_time(0.001, t + 0.1)
        .ok();

    if osc.connect_with_audio_node(&gain).is_err()
        || gain.connect_with_audio_node(&ctx.destination()).is_err()
    {
        return;
    }
    osc.start_with_when(t).ok();
    osc.stop_with_when(t + 0.1).ok();
}

impl AudioSink for WebAudio {
    fn play_cue(&mut self, cue: Cue) {
        let vol = self.effective_volume();
        if vol <= 0.0 {
            return;
        }
        let Some(ctx) = self.live_context() else {
            return;
        };

        match cue {
            Cue::Depart => self.play_depart(ctx, vol),
            Cue::Brake => self.play_brake(ctx, vol),
            Cue::DoorOpen => self.play_door_open(ctx, vol),
            Cue::DoorClose => self.play_door_close(ctx, vol),
            Cue::Warning => self.play_warning(ctx, vol),
        }
    }

    fn start_ambient_alert(&mut self) {
        if self.rumble.is_some() {
            return;
        }
        let vol = self.effective_volume();
        if vol <= 0.0 {
            return;
        }
        let Some(ctx) = self.live_context() else {
            return;
        };
        let rumble = self.build_rumble(ctx, vol);
        self.rumble = rumble;
        if self.rumble.is_none() {
            log::warn!("Rumble start failed");
        }
    }

    fn stop_ambient_alert(&mut self) {
        if let Some(rumble) = self.rumble.take() {
            rumble.source.stop().ok();
            rumble.rattle.stop().ok();
        }
    }

    fn start_music(&mut self) {
        if self.music.is_some() {
            return;
        }
        let vol = self.music_volume();
        if vol <= 0.0 {
            return;
        }
        let Some(ctx) = self.live_context() else {
            return;
        };
        let music = self.build_music(ctx, vol);
        self.music = music;
        match self.music {
            Some(_) => {
                log::debug!("Music started");
                self.update_music();
            }
            None => log::warn!("Music start failed"),
        }
    }

    fn stop_music(&mut self) {
        if let Some(music) = self.music.take() {
            for voice in music.voices {
                voice.stop().ok();
            }
        }
    }
}
