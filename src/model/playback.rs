//! Playback session: the single record of what is loaded and where it is
//!
//! All device interaction flows through the transition methods here; nothing
//! else writes `elapsed_seconds`, `duration_seconds` or the pending seek.
//! Each source change bumps a generation number so readiness checks that were
//! started for an older source can tell they are stale.

use std::time::Instant;

use crate::audio::PlaybackDevice;
use crate::config::PlaybackTuning;
use super::seek::{SeekArbiter, TimeUpdateDecision};
use super::types::Track;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing loaded
    Idle,
    /// Source set, duration not known yet
    Loading,
    /// Duration known, transport usable
    Ready,
}

/// Whether a selection should start audio once the source is ready
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartMode {
    Play,
    /// Resume bootstrap: load but stay paused
    Silent,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SeekOutcome {
    Applied(f64),
    /// Stored until metadata is ready
    Deferred(f64),
    Ignored,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MetadataOutcome {
    Applied { elapsed: f64 },
    NotReady,
    AlreadyReady,
    Stale,
}

pub(crate) fn is_valid_duration(duration: f64) -> bool {
    duration.is_finite() && duration > 0.0
}

/// Playback state for rendering the UI
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackInfo {
    pub track: Option<Track>,
    pub state: SessionState,
    pub is_playing: bool,
    pub elapsed_seconds: f64,
    pub duration_seconds: f64,
    pub is_maximized: bool,
    pub is_scrubbing: bool,
    pub volume: f32,
    pub artwork_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct PlaybackSession {
    current_track: Option<Track>,
    source: Option<String>,
    generation: u64,
    play_intent: bool,
    is_maximized: bool,
    elapsed_seconds: f64,
    duration_seconds: f64,
    pending_seek_seconds: Option<f64>,
    volume: f32,
    arbiter: SeekArbiter,
    /// Position before a scrub started, restored on cancel
    scrub_origin: Option<f64>,
    resume_done: bool,
    resume_dismissed: bool,
}

impl PlaybackSession {
    pub fn new(tuning: &PlaybackTuning, volume: f32) -> Self {
        Self {
            current_track: None,
            source: None,
            generation: 0,
            play_intent: false,
            is_maximized: false,
            elapsed_seconds: 0.0,
            duration_seconds: 0.0,
            pending_seek_seconds: None,
            volume,
            arbiter: SeekArbiter::new(tuning.seek_debounce(), tuning.time_update_threshold_secs),
            scrub_origin: None,
            resume_done: false,
            resume_dismissed: false,
        }
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current_track.as_ref()
    }

    pub fn current_track_id(&self) -> Option<&str> {
        self.current_track.as_ref().map(|t| t.id.as_str())
    }

    #[cfg(test)]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn play_intent(&self) -> bool {
        self.play_intent
    }

    pub fn is_maximized(&self) -> bool {
        self.is_maximized
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    #[cfg(test)]
    pub fn pending_seek_seconds(&self) -> Option<f64> {
        self.pending_seek_seconds
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_externally_seeking(&self, now: Instant) -> bool {
        self.arbiter.is_externally_seeking(now)
    }

    pub fn is_scrubbing(&self) -> bool {
        self.arbiter.is_user_seeking()
    }

    #[cfg(test)]
    pub fn resume_done(&self) -> bool {
        self.resume_done
    }

    #[cfg(test)]
    pub fn resume_dismissed(&self) -> bool {
        self.resume_dismissed
    }

    pub fn state(&self) -> SessionState {
        if self.current_track.is_none() {
            SessionState::Idle
        } else if is_valid_duration(self.duration_seconds) {
            SessionState::Ready
        } else {
            SessionState::Loading
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
    }

    /// True when `source` is the locator currently loaded
    pub fn owns_source(&self, source: &str) -> bool {
        self.source.as_deref() == Some(source)
    }

    // ========================================================================
    // Source changes
    // ========================================================================

    /// Point the session and device at a new track. Returns the new generation.
    pub fn load(
        &mut self,
        track: Track,
        source: String,
        mode: StartMode,
        device: &dyn PlaybackDevice,
    ) -> u64 {
        self.generation += 1;
        self.play_intent = mode == StartMode::Play;
        self.elapsed_seconds = 0.0;
        self.duration_seconds = 0.0;
        self.pending_seek_seconds = None;
        self.scrub_origin = None;
        self.arbiter.reset();

        tracing::info!(
            track_id = %track.id,
            title = %track.title,
            ?mode,
            generation = self.generation,
            "Loading track"
        );

        if let Err(e) = device.load(&source) {
            tracing::error!(error = %e, source = %source, "Device refused source");
        }
        self.current_track = Some(track);
        self.source = Some(source);
        self.generation
    }

    /// Metadata readiness for `generation`. Applies a pending seek exactly once.
    pub fn apply_metadata(
        &mut self,
        generation: u64,
        duration: f64,
        device: &dyn PlaybackDevice,
        now: Instant,
    ) -> MetadataOutcome {
        if generation != self.generation || self.current_track.is_none() {
            return MetadataOutcome::Stale;
        }
        if self.is_ready() {
            return MetadataOutcome::AlreadyReady;
        }
        if !is_valid_duration(duration) {
            return MetadataOutcome::NotReady;
        }

        self.duration_seconds = duration;

        match self.pending_seek_seconds.take() {
            Some(target) => {
                let target = target.clamp(0.0, duration);
                if let Err(e) = device.seek(target) {
                    tracing::warn!(error = %e, target, "Pending seek rejected by device");
                }
                self.elapsed_seconds = target;
                self.arbiter.begin_external_seek(now);
                tracing::debug!(target, "Applied pending seek");
            }
            None => {
                let position = device.current_time();
                self.elapsed_seconds = if position.is_finite() { position.max(0.0) } else { 0.0 };
            }
        }

        tracing::info!(duration, generation, "Track ready");

        if self.play_intent {
            self.start_device(device);
        }

        MetadataOutcome::Applied {
            elapsed: self.elapsed_seconds,
        }
    }

    /// Clear the player. Stops the device and dismisses the resume bootstrap.
    pub fn close(&mut self, device: &dyn PlaybackDevice) {
        if let Err(e) = device.stop() {
            tracing::warn!(error = %e, "Device stop failed");
        }
        self.generation += 1;
        self.current_track = None;
        self.source = None;
        self.play_intent = false;
        self.is_maximized = false;
        self.elapsed_seconds = 0.0;
        self.duration_seconds = 0.0;
        self.pending_seek_seconds = None;
        self.scrub_origin = None;
        self.arbiter.reset();
        self.resume_dismissed = true;
        tracing::info!("Player closed");
    }

    // ========================================================================
    // Resume bootstrap
    // ========================================================================

    pub fn should_bootstrap(&self) -> bool {
        !self.resume_done && !self.resume_dismissed && self.current_track.is_none()
    }

    pub fn mark_bootstrapped(&mut self) {
        self.resume_done = true;
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Record the play/pause intent; the device only follows once ready.
    pub fn set_play_intent(&mut self, intent: bool, device: &dyn PlaybackDevice) {
        if self.current_track.is_none() {
            return;
        }
        self.play_intent = intent;

        if !self.is_ready() {
            tracing::debug!(intent, "Transport deferred until metadata is ready");
            return;
        }

        if intent {
            self.start_device(device);
        } else if let Err(e) = device.pause() {
            tracing::warn!(error = %e, "Device pause failed");
        }
    }

    pub fn toggle_play(&mut self, device: &dyn PlaybackDevice) {
        self.set_play_intent(!self.play_intent, device);
    }

    // Start failures leave the intent set so the next play() retries
    fn start_device(&self, device: &dyn PlaybackDevice) {
        if let Err(e) = device.play() {
            tracing::warn!(error = %e, "Playback start rejected");
        }
    }

    /// Programmatic seek. Deferred while the duration is unknown.
    pub fn seek_to(&mut self, seconds: f64, device: &dyn PlaybackDevice, now: Instant) -> SeekOutcome {
        if self.current_track.is_none() || !seconds.is_finite() {
            return SeekOutcome::Ignored;
        }
        let seconds = seconds.max(0.0);

        if !self.is_ready() {
            self.pending_seek_seconds = Some(seconds);
            tracing::debug!(seconds, "Seek deferred until metadata is ready");
            return SeekOutcome::Deferred(seconds);
        }

        let target = seconds.min(self.duration_seconds);
        if let Err(e) = device.seek(target) {
            tracing::warn!(error = %e, target, "Seek rejected by device");
        }
        self.elapsed_seconds = target;
        self.arbiter.begin_external_seek(now);
        SeekOutcome::Applied(target)
    }

    pub fn seek_by(&mut self, delta: f64, device: &dyn PlaybackDevice, now: Instant) -> SeekOutcome {
        let base = self.pending_seek_seconds.unwrap_or(self.elapsed_seconds);
        self.seek_to(base + delta, device, now)
    }

    pub fn begin_scrub(&mut self) -> bool {
        if !self.is_ready() || self.is_scrubbing() {
            return false;
        }
        self.arbiter.begin_user_seek();
        self.scrub_origin = Some(self.elapsed_seconds);
        true
    }

    /// Move the scrub target; only the displayed position changes
    pub fn scrub_by(&mut self, delta: f64) {
        if self.is_scrubbing() {
            self.elapsed_seconds = (self.elapsed_seconds + delta).clamp(0.0, self.duration_seconds);
        }
    }

    pub fn end_scrub(&mut self, device: &dyn PlaybackDevice, now: Instant) -> SeekOutcome {
        if !self.is_scrubbing() {
            return SeekOutcome::Ignored;
        }
        self.arbiter.end_user_seek();
        self.scrub_origin = None;
        self.seek_to(self.elapsed_seconds, device, now)
    }

    pub fn cancel_scrub(&mut self) {
        if let Some(origin) = self.scrub_origin.take() {
            self.elapsed_seconds = origin;
        }
        self.arbiter.end_user_seek();
    }

    /// Device clock report. Returns true when `elapsed_seconds` changed.
    pub fn on_time_update(&mut self, source: &str, position: f64, now: Instant) -> bool {
        if !self.owns_source(source) || !self.is_ready() || !position.is_finite() {
            return false;
        }
        match self.arbiter.judge(position, self.elapsed_seconds, now) {
            TimeUpdateDecision::Accept => {
                self.elapsed_seconds = position;
                true
            }
            decision => {
                tracing::trace!(?decision, position, "Time update suppressed");
                false
            }
        }
    }

    pub fn set_volume(&mut self, volume: f32, device: &dyn PlaybackDevice) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Err(e) = device.set_volume(self.volume) {
            tracing::warn!(error = %e, "Volume change failed");
        }
    }

    /// Volume reported by the device
    pub fn on_volume_changed(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    // ========================================================================
    // View-only state
    // ========================================================================

    pub fn toggle_maximized(&mut self) {
        self.is_maximized = !self.is_maximized;
    }

    /// Flip `is_liked` on the session copy if it is the toggled track
    pub fn mirror_like(&mut self, track_id: &str) -> bool {
        match self.current_track.as_mut() {
            Some(track) if track.id == track_id => {
                track.is_liked = !track.is_liked;
                true
            }
            _ => false,
        }
    }

    pub fn info(&self, artwork_url: Option<String>) -> PlaybackInfo {
        PlaybackInfo {
            track: self.current_track.clone(),
            state: self.state(),
            is_playing: self.play_intent,
            elapsed_seconds: self.elapsed_seconds,
            duration_seconds: self.duration_seconds,
            is_maximized: self.is_maximized,
            is_scrubbing: self.is_scrubbing(),
            volume: self.volume,
            artwork_url,
        }
    }
}
