//! The mixing graph — persistent gain stages, a shared output compressor,
//! the current background track's state machine, and every live one-shot
//! voice.
//!
//! One graph exists per process, constructed at startup and passed by
//! reference to anything that schedules sound. Audio is pulled by the
//! platform output in `process`; control methods mutate state between pulls
//! and take effect on the next block.

use tracing::{debug, warn};

use crate::codec;
use crate::config::{BackgroundTrack, VoiceParams, Waveform};
use crate::dsp::buffer::RenderedBuffer;
use crate::dsp::compressor::Compressor;
use crate::dsp::voice::ToneVoice;
use crate::error::EngineError;
use crate::rhythm::RhythmScheduler;

/// Volume changes ramp over this long instead of jumping, so a set never
/// produces a click.
const GAIN_RAMP_SECONDS: f64 = 0.010;

/// The fallback one-shot when a clip fails to decode.
const FALLBACK_BEEP_HZ: f64 = 440.0;
const FALLBACK_BEEP_SECONDS: f64 = 0.2;

// ── Gain stages ─────────────────────────────────────────────

/// A named volume control that ramps linearly toward its target.
#[derive(Debug, Clone)]
struct GainStage {
    current: f64,
    target: f64,
    step: f64,
}

impl GainStage {
    fn new(level: f64) -> Self {
        GainStage { current: level, target: level, step: 0.0 }
    }

    fn set(&mut self, level: f64, sample_rate: f64) {
        self.target = level.clamp(0.0, 1.0);
        self.step = (self.target - self.current) / (GAIN_RAMP_SECONDS * sample_rate);
    }

    #[inline]
    fn next(&mut self) -> f64 {
        if self.step != 0.0 {
            self.current += self.step;
            let crossed = (self.step > 0.0 && self.current >= self.target)
                || (self.step < 0.0 && self.current <= self.target);
            if crossed {
                self.current = self.target;
                self.step = 0.0;
            }
        }
        self.current
    }

    fn level(&self) -> f64 {
        self.target
    }
}

// ── Output device abstraction ───────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Running,
    Suspended,
}

/// The platform audio output. The engine never talks to hardware directly;
/// it only asks the device to come back up before playing.
pub trait OutputDevice {
    fn state(&self) -> DeviceState;
    fn resume(&mut self) -> Result<(), EngineError>;
}

// ── Live sources ────────────────────────────────────────────

/// Which gain stage a one-shot voice feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Effects,
    Rhythm,
}

/// A one-shot source: either a synthesized tone or a decoded clip.
#[derive(Debug, Clone)]
enum OneShot {
    Tone(ToneVoice),
    Clip {
        buffer: RenderedBuffer,
        position: usize,
        volume: f64,
    },
}

impl OneShot {
    #[inline]
    fn next_frame(&mut self) -> (f64, f64) {
        match self {
            OneShot::Tone(v) => v.next_frame(),
            OneShot::Clip { buffer, position, volume } => {
                if *position >= buffer.frames() {
                    return (0.0, 0.0);
                }
                let l = buffer.channels[0][*position] as f64;
                let r = if buffer.channel_count() >= 2 {
                    buffer.channels[1][*position] as f64
                } else {
                    l
                };
                *position += 1;
                (l * *volume, r * *volume)
            }
        }
    }

    fn is_finished(&self) -> bool {
        match self {
            OneShot::Tone(v) => v.is_finished(),
            OneShot::Clip { buffer, position, .. } => *position >= buffer.frames(),
        }
    }
}

#[derive(Debug, Clone)]
struct LiveVoice {
    source: OneShot,
    /// Absolute sample-clock start.
    start: u64,
    route: Route,
}

/// The decoded current track.
#[derive(Debug, Clone)]
struct TrackPlayer {
    buffer: RenderedBuffer,
    position: usize,
    looping: bool,
    volume: f64,
}

impl TrackPlayer {
    /// Next stereo frame, or `None` when a non-looping track runs out.
    #[inline]
    fn next_frame(&mut self) -> Option<(f64, f64)> {
        if self.position >= self.buffer.frames() {
            if !self.looping {
                return None;
            }
            self.position = 0;
        }
        let l = self.buffer.channels[0][self.position] as f64;
        let r = if self.buffer.channel_count() >= 2 {
            self.buffer.channels[1][self.position] as f64
        } else {
            l
        };
        self.position += 1;
        Some((l * self.volume, r * self.volume))
    }

    fn duration_seconds(&self) -> f64 {
        self.buffer.duration_seconds()
    }
}

// ── Playback state ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
}

/// Snapshot handed to the UI collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackStatus {
    pub is_playing: bool,
    pub current_time_seconds: f64,
    pub duration_seconds: f64,
}

// ── The graph ───────────────────────────────────────────────

pub struct AudioGraph {
    sample_rate: f64,
    /// Samples processed since construction; the graph's audio clock.
    clock: u64,

    master: GainStage,
    music: GainStage,
    effects: GainStage,
    rhythm: GainStage,
    compressor: Compressor,

    voices: Vec<LiveVoice>,
    track: Option<TrackPlayer>,
    current_track_id: Option<String>,
    state: PlaybackState,
    scheduler: Option<RhythmScheduler>,
}

impl AudioGraph {
    pub fn new(sample_rate: u32) -> Self {
        let sr = sample_rate as f64;
        AudioGraph {
            sample_rate: sr,
            clock: 0,
            master: GainStage::new(0.8),
            music: GainStage::new(1.0),
            effects: GainStage::new(1.0),
            rhythm: GainStage::new(1.0),
            compressor: Compressor::output_bus(sr),
            voices: Vec::new(),
            track: None,
            current_track_id: None,
            state: PlaybackState::Idle,
            scheduler: None,
        }
    }

    /// Seconds of audio processed so far — the clock rhythm scheduling and
    /// one-shot starts are expressed in.
    pub fn current_time(&self) -> f64 {
        self.clock as f64 / self.sample_rate
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current_track_id(&self) -> Option<&str> {
        self.current_track_id.as_deref()
    }

    /// Live one-shot sources currently held (finished ones are disposed at
    /// the end of each processed block).
    pub fn live_voice_count(&self) -> usize {
        self.voices.len()
    }

    // ── Volume controls ─────────────────────────────────────

    pub fn set_master_volume(&mut self, level: f64) {
        self.master.set(level, self.sample_rate);
    }

    pub fn set_music_volume(&mut self, level: f64) {
        self.music.set(level, self.sample_rate);
    }

    pub fn set_effects_volume(&mut self, level: f64) {
        self.effects.set(level, self.sample_rate);
    }

    pub fn set_rhythm_volume(&mut self, level: f64) {
        self.rhythm.set(level, self.sample_rate);
    }

    pub fn master_volume(&self) -> f64 {
        self.master.level()
    }

    // ── One-shot playback ───────────────────────────────────

    /// Fire-and-forget tone through the effects stage. Does not touch the
    /// current-track state machine.
    pub fn play_effect(&mut self, params: &VoiceParams) -> Result<(), EngineError> {
        let voice = ToneVoice::new(params, self.sample_rate)?;
        self.voices.push(LiveVoice {
            source: OneShot::Tone(voice),
            start: self.clock,
            route: Route::Effects,
        });
        Ok(())
    }

    /// Play a WAV clip through the effects stage. A clip that fails to
    /// decode degrades to the default synthesized beep; the failure is
    /// logged, never swallowed silently.
    pub fn play_clip(&mut self, bytes: &[u8], volume: f64) {
        let source = match codec::decode_wav(bytes) {
            Ok(buffer) => OneShot::Clip {
                buffer,
                position: 0,
                volume: volume.clamp(0.0, 1.0),
            },
            Err(e) => {
                warn!("clip failed to decode, falling back to beep: {e}");
                let params = VoiceParams {
                    waveform: Waveform::Sine,
                    frequency: FALLBACK_BEEP_HZ,
                    duration_seconds: FALLBACK_BEEP_SECONDS,
                    volume: volume.clamp(0.0, 1.0),
                    effects: None,
                };
                match ToneVoice::new(&params, self.sample_rate) {
                    Ok(v) => OneShot::Tone(v),
                    Err(_) => return,
                }
            }
        };
        self.voices.push(LiveVoice {
            source,
            start: self.clock,
            route: Route::Effects,
        });
    }

    // ── Current-track state machine ─────────────────────────

    /// Make `track` the one current track. The previous track is fully
    /// stopped — source halted, scheduler cancelled, pending hits dropped —
    /// before the new one starts.
    pub fn switch_track(&mut self, track: &BackgroundTrack) -> Result<(), EngineError> {
        // Decode before touching playback so an undecodable track leaves
        // the running one alone.
        let buffer = codec::base64_wav_to_buffer(&track.audio_data)?;
        if track.rhythm_pattern.enabled {
            track.rhythm_pattern.validate()?;
        }

        self.stop();

        debug!(track = %track.id, "switching current track");
        self.track = Some(TrackPlayer {
            buffer,
            position: 0,
            looping: track.looping,
            volume: track.volume.clamp(0.0, 1.0),
        });
        self.current_track_id = Some(track.id.clone());
        self.state = PlaybackState::Playing;

        if track.rhythm_pattern.enabled {
            self.scheduler = Some(RhythmScheduler::start(
                &track.rhythm_pattern,
                track.bpm,
                track.looping,
                self.current_time(),
            )?);
        }
        Ok(())
    }

    /// Pause playback and the rhythm scheduler in lockstep.
    pub fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        self.state = PlaybackState::Paused;
        let now = self.current_time();
        if let Some(s) = &mut self.scheduler {
            s.pause(now);
        }
        self.drop_pending_rhythm();
    }

    /// Resume from the exact paused sample position.
    pub fn resume(&mut self) {
        if self.state != PlaybackState::Paused {
            return;
        }
        self.state = PlaybackState::Playing;
        let now = self.current_time();
        if let Some(s) = &mut self.scheduler {
            s.resume(now);
        }
    }

    /// Halt playback, reset the position, release the current track.
    pub fn stop(&mut self) {
        if let Some(s) = &mut self.scheduler {
            s.stop();
        }
        self.scheduler = None;
        // Every rhythm voice belongs to the stopped track: pending hits are
        // unscheduled and in-flight clicks are released with it.
        self.voices.retain(|v| v.route != Route::Rhythm);
        self.track = None;
        self.current_track_id = None;
        self.state = PlaybackState::Idle;
    }

    /// Jump to a position, clamped to `[0, duration]`.
    pub fn seek(&mut self, seconds: f64) {
        if let Some(player) = &mut self.track {
            let clamped = seconds.clamp(0.0, player.duration_seconds());
            player.position = (clamped * self.sample_rate) as usize;
        }
    }

    pub fn playback_state(&self) -> PlaybackStatus {
        match &self.track {
            Some(player) => PlaybackStatus {
                is_playing: self.state == PlaybackState::Playing,
                current_time_seconds: player.position as f64 / self.sample_rate,
                duration_seconds: player.duration_seconds(),
            },
            None => PlaybackStatus {
                is_playing: false,
                current_time_seconds: 0.0,
                duration_seconds: 0.0,
            },
        }
    }

    // ── Rhythm intake ───────────────────────────────────────

    /// Drive the rhythm scheduler from the application timer. Due hits
    /// become one-shot voices routed through the rhythm stage.
    pub fn tick_rhythm(&mut self) {
        let now = self.current_time();
        let Some(scheduler) = &mut self.scheduler else {
            return;
        };
        let hits = scheduler.tick(now);
        let sample_rate = self.sample_rate;
        for hit in hits {
            let params = VoiceParams {
                waveform: hit.waveform,
                frequency: hit.frequency,
                duration_seconds: hit.duration,
                volume: hit.amplitude,
                effects: None,
            };
            match ToneVoice::new(&params, sample_rate) {
                Ok(voice) => self.voices.push(LiveVoice {
                    source: OneShot::Tone(voice),
                    start: (hit.start_time * sample_rate).round() as u64,
                    route: Route::Rhythm,
                }),
                Err(e) => warn!("rhythm hit rejected: {e}"),
            }
        }
    }

    /// True while the current track has an active rhythm loop.
    pub fn rhythm_running(&self) -> bool {
        self.scheduler.as_ref().is_some_and(|s| s.is_running())
    }

    /// Unschedule rhythm hits that have not yet emitted a sample. A voice
    /// whose start equals the clock has not played: the clock advances past
    /// a frame only after rendering it.
    fn drop_pending_rhythm(&mut self) {
        let clock = self.clock;
        self.voices
            .retain(|v| !(v.route == Route::Rhythm && v.start >= clock));
    }

    // ── Output path ─────────────────────────────────────────

    /// Render the next block. Every source feeds its gain stage, the stages
    /// sum into the master stage, and the shared compressor shapes the
    /// final output.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());
        let mut track_ended = false;

        for i in 0..frames {
            let music_gain = self.music.next();
            let effects_gain = self.effects.next();
            let rhythm_gain = self.rhythm.next();
            let master_gain = self.master.next();

            let (mut music_l, mut music_r) = (0.0, 0.0);
            if self.state == PlaybackState::Playing {
                if let Some(player) = &mut self.track {
                    match player.next_frame() {
                        Some((l, r)) => {
                            music_l = l;
                            music_r = r;
                        }
                        None => track_ended = true,
                    }
                }
            }

            let (mut fx_l, mut fx_r) = (0.0, 0.0);
            let (mut rh_l, mut rh_r) = (0.0, 0.0);
            for voice in self.voices.iter_mut() {
                if voice.start > self.clock || voice.source.is_finished() {
                    continue;
                }
                let (l, r) = voice.source.next_frame();
                match voice.route {
                    Route::Effects => {
                        fx_l += l;
                        fx_r += r;
                    }
                    Route::Rhythm => {
                        rh_l += l;
                        rh_r += r;
                    }
                }
            }

            let sum_l =
                (music_l * music_gain + fx_l * effects_gain + rh_l * rhythm_gain) * master_gain;
            let sum_r =
                (music_r * music_gain + fx_r * effects_gain + rh_r * rhythm_gain) * master_gain;
            let (out_l, out_r) = self.compressor.process(sum_l, sum_r);
            left[i] = out_l as f32;
            right[i] = out_r as f32;

            self.clock += 1;
        }

        // Dispose finished one-shots so long sessions never accumulate nodes.
        self.voices.retain(|v| !v.source.is_finished());

        if track_ended {
            debug!("current track finished");
            if let Some(player) = &mut self.track {
                player.position = 0;
            }
            self.state = PlaybackState::Idle;
            if let Some(s) = &mut self.scheduler {
                s.stop();
            }
        }
    }

    // ── Device recovery ─────────────────────────────────────

    /// Bring the platform output up, retrying the resume exactly once.
    /// This is the only retry in the engine.
    pub fn ensure_output(&self, device: &mut dyn OutputDevice) -> Result<(), EngineError> {
        if device.state() == DeviceState::Running {
            return Ok(());
        }
        debug!("audio output suspended, attempting one resume");
        device.resume()?;
        if device.state() == DeviceState::Running {
            Ok(())
        } else {
            Err(EngineError::PlaybackDevice(
                "output still suspended after resume".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FileOrigin, RhythmPattern};
    use crate::music::SAMPLE_RATE;

    fn tone(frequency: f64, duration: f64, volume: f64) -> VoiceParams {
        VoiceParams {
            waveform: Waveform::Sine,
            frequency,
            duration_seconds: duration,
            volume,
            effects: None,
        }
    }

    fn silent_track_audio(seconds: f64) -> String {
        let frames = (seconds * SAMPLE_RATE as f64) as usize;
        let buffer = RenderedBuffer::stereo(frames, SAMPLE_RATE);
        codec::buffer_to_base64_wav(&buffer).unwrap()
    }

    fn track(id: &str, looping: bool, rhythm_enabled: bool) -> BackgroundTrack {
        BackgroundTrack {
            id: id.to_string(),
            name: id.to_string(),
            audio_data: silent_track_audio(1.0),
            file_origin: FileOrigin::Generated,
            volume: 0.8,
            looping,
            bpm: 120,
            is_default: false,
            rhythm_pattern: RhythmPattern {
                enabled: rhythm_enabled,
                ..RhythmPattern::default()
            },
            generation_config: None,
        }
    }

    fn pull(graph: &mut AudioGraph, frames: usize) -> (Vec<f32>, Vec<f32>) {
        let mut l = vec![0.0; frames];
        let mut r = vec![0.0; frames];
        graph.process(&mut l, &mut r);
        (l, r)
    }

    #[test]
    fn one_shot_effect_sounds_and_disposes() {
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        graph.play_effect(&tone(440.0, 0.05, 0.8)).unwrap();
        assert_eq!(graph.live_voice_count(), 1);

        let (l, _) = pull(&mut graph, 4410);
        assert!(l.iter().any(|&s| s.abs() > 0.001), "effect should sound");
        assert_eq!(graph.live_voice_count(), 0, "finished voice must be disposed");
    }

    #[test]
    fn thousands_of_one_shots_never_accumulate() {
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        for _ in 0..50 {
            for _ in 0..40 {
                graph.play_effect(&tone(880.0, 0.002, 0.3)).unwrap();
            }
            pull(&mut graph, 256);
            assert!(graph.live_voice_count() <= 40);
        }
        pull(&mut graph, 256);
        assert_eq!(graph.live_voice_count(), 0);
    }

    #[test]
    fn play_effect_rejects_invalid_params() {
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        assert!(graph.play_effect(&tone(-1.0, 0.1, 0.5)).is_err());
        assert_eq!(graph.live_voice_count(), 0, "no partial scheduling on rejection");
    }

    #[test]
    fn clip_decode_failure_degrades_to_beep() {
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        graph.play_clip(b"definitely not wav data", 0.5);
        assert_eq!(graph.live_voice_count(), 1, "fallback beep should be queued");
        let (l, _) = pull(&mut graph, 2048);
        assert!(l.iter().any(|&s| s.abs() > 0.001), "beep should sound");
    }

    #[test]
    fn valid_clip_plays_through() {
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        let mut buffer = RenderedBuffer::stereo(1000, SAMPLE_RATE);
        for i in 0..1000 {
            buffer.channels[0][i] = 0.5;
            buffer.channels[1][i] = 0.5;
        }
        let wav = codec::encode_wav(&buffer).unwrap();
        graph.play_clip(&wav, 1.0);
        let (l, _) = pull(&mut graph, 500);
        assert!(l.iter().any(|&s| s.abs() > 0.01));
    }

    #[test]
    fn switch_track_starts_playback() {
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        graph.switch_track(&track("a", true, false)).unwrap();
        assert_eq!(graph.state(), PlaybackState::Playing);
        assert_eq!(graph.current_track_id(), Some("a"));
        let status = graph.playback_state();
        assert!(status.is_playing);
        assert!((status.duration_seconds - 1.0).abs() < 1e-6);
    }

    #[test]
    fn switch_track_is_idempotent() {
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        let t = track("a", true, true);
        graph.switch_track(&t).unwrap();
        graph.tick_rhythm();
        pull(&mut graph, 1024);

        graph.switch_track(&t).unwrap();
        assert_eq!(graph.state(), PlaybackState::Playing);
        assert_eq!(graph.playback_state().current_time_seconds, 0.0);
        assert!(graph.rhythm_running(), "exactly one scheduler after re-switch");
        assert_eq!(
            graph.live_voice_count(),
            0,
            "pending hits from the first start must be gone"
        );
    }

    #[test]
    fn undecodable_track_leaves_current_playback_alone() {
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        graph.switch_track(&track("a", true, false)).unwrap();

        let mut bad = track("b", true, false);
        bad.audio_data = "!!!not base64!!!".to_string();
        assert!(graph.switch_track(&bad).is_err());

        assert_eq!(graph.state(), PlaybackState::Playing);
        assert_eq!(graph.current_track_id(), Some("a"));
    }

    #[test]
    fn pause_resume_keeps_exact_position() {
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        graph.switch_track(&track("a", true, false)).unwrap();
        pull(&mut graph, 4410); // 0.1s in

        graph.pause();
        assert_eq!(graph.state(), PlaybackState::Paused);
        let paused_at = graph.playback_state().current_time_seconds;

        // Time passes while paused; the position must not move.
        pull(&mut graph, 22050);
        assert_eq!(graph.playback_state().current_time_seconds, paused_at);

        graph.resume();
        assert!(graph.playback_state().is_playing);
        pull(&mut graph, 441);
        let after = graph.playback_state().current_time_seconds;
        let advanced = after - paused_at;
        assert!(
            (advanced - 0.01).abs() < 1.0 / SAMPLE_RATE as f64,
            "resume should continue from the paused sample, advanced {advanced}"
        );
    }

    #[test]
    fn stop_resets_and_releases_track() {
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        graph.switch_track(&track("a", true, true)).unwrap();
        pull(&mut graph, 4410);
        graph.stop();

        assert_eq!(graph.state(), PlaybackState::Idle);
        assert_eq!(graph.current_track_id(), None);
        let status = graph.playback_state();
        assert!(!status.is_playing);
        assert_eq!(status.current_time_seconds, 0.0);
        assert!(!graph.rhythm_running());
    }

    #[test]
    fn seek_clamps_to_track_bounds() {
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        graph.switch_track(&track("a", true, false)).unwrap();

        graph.seek(0.5);
        assert!((graph.playback_state().current_time_seconds - 0.5).abs() < 1e-6);

        graph.seek(100.0);
        assert!((graph.playback_state().current_time_seconds - 1.0).abs() < 1e-6);

        graph.seek(-3.0);
        assert_eq!(graph.playback_state().current_time_seconds, 0.0);
    }

    #[test]
    fn non_looping_track_returns_to_idle() {
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        graph.switch_track(&track("a", false, false)).unwrap();
        // Pull past the 1s track length.
        pull(&mut graph, SAMPLE_RATE as usize + 100);
        assert_eq!(graph.state(), PlaybackState::Idle);
        assert_eq!(graph.playback_state().current_time_seconds, 0.0);
        assert_eq!(graph.current_track_id(), Some("a"), "track stays loaded");
    }

    #[test]
    fn rhythm_hits_flow_into_the_rhythm_stage() {
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        graph.switch_track(&track("a", true, true)).unwrap();
        graph.tick_rhythm();
        assert!(graph.live_voice_count() > 0, "due hits become voices");
        let (l, _) = pull(&mut graph, 2048);
        assert!(l.iter().any(|&s| s.abs() > 0.001), "rhythm should sound");
    }

    #[test]
    fn stop_unschedules_pending_hits() {
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        graph.switch_track(&track("a", true, true)).unwrap();
        graph.tick_rhythm();
        graph.stop();

        // Wait well past every would-have-fired hit: nothing may sound.
        let (l, r) = pull(&mut graph, SAMPLE_RATE as usize / 2);
        assert!(
            l.iter().chain(r.iter()).all(|&s| s.abs() < 1e-9),
            "no audio event may fire after stop"
        );
        assert_eq!(graph.live_voice_count(), 0);
    }

    #[test]
    fn volume_set_ramps_instead_of_jumping() {
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        graph.set_master_volume(1.0);
        // Let the initial ramp settle.
        pull(&mut graph, 2048);
        graph.play_effect(&tone(440.0, 0.5, 1.0)).unwrap();
        pull(&mut graph, 1024);

        graph.set_master_volume(0.0);
        assert_eq!(graph.master_volume(), 0.0, "target applies immediately");
        let (l, _) = pull(&mut graph, 2048);

        // The first millisecond still carries signal (ramping), the tail of
        // the block is silent (ramp done after 10ms).
        let head: f32 = l[..44].iter().map(|s| s.abs()).sum();
        let tail: f32 = l[l.len() - 441..].iter().map(|s| s.abs()).sum();
        assert!(head > 0.0, "gain must ramp, not jump to zero");
        assert!(tail < 1e-6, "gain must reach the target within the block");
    }

    #[test]
    fn effects_play_while_track_is_paused() {
        let mut graph = AudioGraph::new(SAMPLE_RATE);
        graph.switch_track(&track("a", true, false)).unwrap();
        graph.pause();
        graph.play_effect(&tone(660.0, 0.05, 0.9)).unwrap();
        let (l, _) = pull(&mut graph, 2048);
        assert!(
            l.iter().any(|&s| s.abs() > 0.001),
            "one-shots are independent of the track state machine"
        );
    }

    struct MockDevice {
        state: DeviceState,
        resume_succeeds: bool,
        resume_calls: usize,
    }

    impl OutputDevice for MockDevice {
        fn state(&self) -> DeviceState {
            self.state
        }
        fn resume(&mut self) -> Result<(), EngineError> {
            self.resume_calls += 1;
            if self.resume_succeeds {
                self.state = DeviceState::Running;
                Ok(())
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn suspended_device_gets_one_resume() {
        let graph = AudioGraph::new(SAMPLE_RATE);

        let mut ok = MockDevice {
            state: DeviceState::Suspended,
            resume_succeeds: true,
            resume_calls: 0,
        };
        assert!(graph.ensure_output(&mut ok).is_ok());
        assert_eq!(ok.resume_calls, 1);

        let mut stuck = MockDevice {
            state: DeviceState::Suspended,
            resume_succeeds: false,
            resume_calls: 0,
        };
        let err = graph.ensure_output(&mut stuck).unwrap_err();
        assert!(matches!(err, EngineError::PlaybackDevice(_)));
        assert_eq!(stuck.resume_calls, 1, "exactly one retry");

        let mut running = MockDevice {
            state: DeviceState::Running,
            resume_succeeds: true,
            resume_calls: 0,
        };
        assert!(graph.ensure_output(&mut running).is_ok());
        assert_eq!(running.resume_calls, 0);
    }
}
