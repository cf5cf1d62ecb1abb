//! Playback control methods

use std::time::Instant;

use crate::model::{Direction, MetadataOutcome, SeekOutcome, Selection, StartMode, Track};
use crate::{log_library_request, log_library_result};

use super::AppController;

const SEEK_STEP_SECS: f64 = 5.0;
const SCRUB_STEP_SECS: f64 = 5.0;
const VOLUME_STEP: f32 = 0.05;

/// How a metadata readiness watch ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadinessOutcome {
    Ready,
    /// A newer selection or a close superseded this watch
    Stale,
    GaveUp,
}

impl AppController {
    // ========================================================================
    // Library loading and the resume bootstrap
    // ========================================================================

    /// Initial data load. Once the library arrives the last played track is
    /// loaded paused, unless the user already picked or dismissed something.
    pub async fn load_library(&self) {
        if !self.refresh_library().await {
            return;
        }

        let mut model = self.model.lock().await;
        let selection = model.try_bootstrap(self.device.as_ref());
        drop(model);

        if let Some(selection) = selection {
            self.start_selection(selection);
        }
    }

    /// Re-read the library snapshot into the model. Returns false on failure.
    pub(crate) async fn refresh_library(&self) -> bool {
        self.model.lock().await.content.library_loading = true;

        log_library_request!("snapshot", reason = "refresh");
        let result = self.library.snapshot().await;
        log_library_result!("snapshot", result);

        let mut model = self.model.lock().await;
        model.content.library_loading = false;
        match result {
            Ok(snapshot) => {
                model.apply_library(snapshot);
                true
            }
            Err(e) => {
                let error_msg = Self::format_error(&e);
                model.set_error(error_msg);
                false
            }
        }
    }

    // ========================================================================
    // Track transitions
    // ========================================================================

    pub async fn play_track(&self, track: Track) {
        tracing::info!(track_id = %track.id, title = %track.title, "Playing track");
        let mut model = self.model.lock().await;
        let selection = model.select(track, StartMode::Play, self.device.as_ref());
        drop(model);
        self.start_selection(selection);
    }

    pub async fn next_track(&self) {
        self.advance(Direction::Next).await;
    }

    pub async fn previous_track(&self) {
        self.advance(Direction::Previous).await;
    }

    async fn advance(&self, direction: Direction) {
        let mut model = self.model.lock().await;
        let result = model.advance(direction, self.device.as_ref());
        drop(model);

        match result {
            Ok(selection) => {
                tracing::info!(?direction, track_id = %selection.track_id, "Advanced");
                self.start_selection(selection);
            }
            Err(e) => tracing::warn!(?direction, error = %e, "Cannot advance"),
        }
    }

    /// Kick off the side effects of a selection: history (unless silent) and
    /// the metadata readiness watch.
    pub(crate) fn start_selection(&self, selection: Selection) {
        if selection.mode == StartMode::Play {
            self.queue_history_write(selection.track_id.clone());
        }

        let controller = self.clone();
        tokio::spawn(async move {
            let outcome = controller.await_metadata(selection.generation).await;
            tracing::debug!(generation = selection.generation, ?outcome, "Metadata watch finished");
        });
    }

    /// History writes run one after another in selection order.
    fn queue_history_write(&self, track_id: String) {
        let library = self.library.clone();
        let mut tail = self
            .history_tail
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = tail.take();
        *tail = Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            log_library_request!("record_history", track_id = %track_id);
            let result = library.record_history(&track_id).await;
            log_library_result!("record_history", result);
        }));
    }

    /// Wait for every queued history write to land.
    async fn flush_history(&self) {
        let pending = self
            .history_tail
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = pending {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "History write task failed");
            }
        }
    }

    /// Poll the device until it reports a duration for `generation`'s source.
    pub async fn await_metadata(&self, generation: u64) -> ReadinessOutcome {
        let mut attempts: u32 = 0;
        loop {
            {
                let mut model = self.model.lock().await;
                let duration = self.device.duration();
                match model
                    .session
                    .apply_metadata(generation, duration, self.device.as_ref(), Instant::now())
                {
                    MetadataOutcome::Applied { elapsed } => {
                        tracing::info!(generation, duration, elapsed, "Track ready");
                        return ReadinessOutcome::Ready;
                    }
                    MetadataOutcome::AlreadyReady => return ReadinessOutcome::Ready,
                    MetadataOutcome::Stale => {
                        tracing::debug!(generation, "Readiness check superseded");
                        return ReadinessOutcome::Stale;
                    }
                    MetadataOutcome::NotReady => {}
                }
            }

            attempts += 1;
            if let Some(max) = self.tuning.metadata_max_attempts {
                if attempts >= max {
                    tracing::warn!(generation, attempts, "Gave up waiting for track metadata");
                    return ReadinessOutcome::GaveUp;
                }
            }
            tokio::time::sleep(self.tuning.metadata_retry_interval()).await;
        }
    }

    /// Stop playback and clear the session. The open history entry is closed first.
    pub async fn close_player(&self) {
        self.flush_history().await;
        if self.model.lock().await.session.current_track().is_none() {
            return;
        }

        let result = self.library.stop_current_tracking().await;
        log_library_result!("stop_current_tracking", result);

        self.model.lock().await.session.close(self.device.as_ref());
    }

    // ========================================================================
    // Transport
    // ========================================================================

    pub async fn toggle_playback(&self) {
        let mut model = self.model.lock().await;
        model.session.toggle_play(self.device.as_ref());
        tracing::debug!(play_intent = model.session.play_intent(), "Toggled playback");
    }

    pub async fn seek_forward(&self) {
        self.seek_by(SEEK_STEP_SECS).await;
    }

    pub async fn seek_backward(&self) {
        self.seek_by(-SEEK_STEP_SECS).await;
    }

    async fn seek_by(&self, delta: f64) {
        let mut model = self.model.lock().await;
        let outcome = model.session.seek_by(delta, self.device.as_ref(), Instant::now());
        if outcome != SeekOutcome::Ignored {
            tracing::debug!(delta, ?outcome, "Seek");
        }
    }

    /// Enter scrub mode; returns false when nothing is ready to scrub
    pub async fn begin_scrub(&self) -> bool {
        self.model.lock().await.session.begin_scrub()
    }

    pub async fn scrub_forward(&self) {
        self.model.lock().await.session.scrub_by(SCRUB_STEP_SECS);
    }

    pub async fn scrub_backward(&self) {
        self.model.lock().await.session.scrub_by(-SCRUB_STEP_SECS);
    }

    pub async fn commit_scrub(&self) {
        let mut model = self.model.lock().await;
        let outcome = model.session.end_scrub(self.device.as_ref(), Instant::now());
        tracing::debug!(?outcome, "Scrub committed");
    }

    pub async fn cancel_scrub(&self) {
        self.model.lock().await.session.cancel_scrub();
    }

    pub async fn volume_up(&self) {
        let mut model = self.model.lock().await;
        let volume = model.session.volume() + VOLUME_STEP;
        model.session.set_volume(volume, self.device.as_ref());
    }

    pub async fn volume_down(&self) {
        let mut model = self.model.lock().await;
        let volume = model.session.volume() - VOLUME_STEP;
        model.session.set_volume(volume, self.device.as_ref());
    }

    pub async fn toggle_maximized(&self) {
        self.model.lock().await.session.toggle_maximized();
    }

    // ========================================================================
    // Likes
    // ========================================================================

    /// Like/unlike the playing track, or the selected one when nothing plays.
    pub async fn toggle_liked_current(&self) {
        let model = self.model.lock().await;
        let track_id = model
            .session
            .current_track_id()
            .map(str::to_string)
            .or_else(|| model.selected_track().map(|t| t.id));
        drop(model);

        if let Some(track_id) = track_id {
            self.toggle_liked_track(&track_id).await;
        }
    }

    /// Flip the like locally right away, then persist. A failed write
    /// reloads the library so the local copies match storage again.
    pub async fn toggle_liked_track(&self, track_id: &str) {
        if track_id.is_empty() {
            tracing::warn!("Cannot toggle liked status: track ID is empty");
            return;
        }

        self.model.lock().await.toggle_like_local(track_id);

        log_library_request!("toggle_like", track_id);
        let result = self.library.toggle_like(track_id).await;
        log_library_result!("toggle_like", result);

        match result {
            Ok(liked) => {
                let status = if liked { "added to" } else { "removed from" };
                tracing::info!(track_id, status, "Track liked status toggled");
            }
            Err(e) => {
                self.refresh_library().await;
                let error_msg = Self::format_error(&e);
                self.model.lock().await.set_error(error_msg);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::DeviceCommand;
    use crate::controller::tests::{eventually, harness, harness_with};
    use crate::model::{track, LibraryData, SessionState};

    #[tokio::test]
    async fn load_library_bootstraps_last_played_silently() {
        let h = harness(&["a", "b", "c"]);
        h.library.record_history("b").await.unwrap();
        h.library.stop_current_tracking().await.unwrap();

        h.controller.load_library().await;
        h.device.set_duration(120.0);
        h.device.set_position(0.0);

        eventually(&h.controller, |m| m.session.is_ready()).await;
        let model = h.controller.model.lock().await;
        assert_eq!(model.session.current_track_id(), Some("b"));
        assert!(!model.session.play_intent());
        assert!(!model.content.library_loading);
        assert!(!h.device.commands().contains(&DeviceCommand::Play));
        drop(model);

        // bootstrap never writes history
        assert_eq!(h.library.history().await.len(), 1);
    }

    #[tokio::test]
    async fn play_track_records_history_and_plays_when_ready() {
        let h = harness(&["a", "b"]);
        h.controller.load_library().await;
        h.controller.play_track(track("a")).await;

        assert_eq!(h.controller.model.lock().await.session.state(), SessionState::Loading);
        h.device.set_duration(60.0);
        let generation = h.controller.model.lock().await.session.generation();
        assert_eq!(h.controller.await_metadata(generation).await, ReadinessOutcome::Ready);
        assert!(h.device.commands().contains(&DeviceCommand::Play));

        for _ in 0..200 {
            if !h.library.history().await.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(h.library.history().await[0].track_id, "a");
    }

    #[tokio::test]
    async fn superseded_watch_reports_stale() {
        let h = harness(&["a", "b"]);
        h.controller.load_library().await;
        h.controller.play_track(track("a")).await;
        let first = h.controller.model.lock().await.session.generation();
        h.controller.play_track(track("b")).await;

        assert_eq!(h.controller.await_metadata(first).await, ReadinessOutcome::Stale);
    }

    #[tokio::test]
    async fn readiness_watch_gives_up_after_cap() {
        let h = harness_with(&["a"], |config| config.playback.metadata_max_attempts = Some(3));
        h.controller.load_library().await;
        h.controller.play_track(track("a")).await;
        let generation = h.controller.model.lock().await.session.generation();

        assert_eq!(h.controller.await_metadata(generation).await, ReadinessOutcome::GaveUp);
        assert!(!h.controller.model.lock().await.session.is_ready());
    }

    #[tokio::test]
    async fn seek_before_ready_is_applied_on_metadata() {
        let h = harness(&["a"]);
        h.controller.load_library().await;
        h.controller.play_track(track("a")).await;
        h.controller.seek_forward().await;
        h.controller.seek_forward().await;

        h.device.set_duration(100.0);
        eventually(&h.controller, |m| m.session.is_ready()).await;
        assert!(h.device.commands().contains(&DeviceCommand::Seek(10.0)));
        assert_eq!(h.controller.model.lock().await.session.elapsed_seconds(), 10.0);
    }

    #[tokio::test]
    async fn next_wraps_and_close_clears() {
        let h = harness(&["a", "b"]);
        h.controller.load_library().await;
        h.controller.play_track(track("b")).await;
        h.controller.next_track().await;
        assert_eq!(h.controller.model.lock().await.session.current_track_id(), Some("a"));

        h.controller.close_player().await;
        let model = h.controller.model.lock().await;
        assert_eq!(model.session.state(), SessionState::Idle);
        assert!(model.session.resume_dismissed());
        assert_eq!(h.device.commands().last(), Some(&DeviceCommand::Stop));
        drop(model);

        let history = h.library.history().await;
        assert!(history.iter().all(|entry| entry.ended_at.is_some()));
    }

    #[tokio::test]
    async fn close_right_after_play_closes_its_history_entry() {
        let h = harness(&["a", "b"]);
        h.controller.load_library().await;
        h.controller.play_track(track("a")).await;
        h.controller.close_player().await;

        let history = h.library.history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].track_id, "a");
        assert!(history[0].ended_at.is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn rapid_skips_record_history_in_order() {
        let h = harness(&["a", "b", "c", "d"]);
        h.controller.load_library().await;
        h.controller.play_track(track("a")).await;
        h.controller.next_track().await;
        h.controller.next_track().await;
        h.controller.next_track().await;
        h.controller.close_player().await;

        let order: Vec<String> = h
            .library
            .history()
            .await
            .into_iter()
            .map(|entry| entry.track_id)
            .collect();
        assert_eq!(order, ["a", "b", "c", "d"]);
        assert_eq!(h.library.snapshot().await.unwrap().last_played.unwrap().id, "d");
    }

    #[tokio::test]
    async fn next_without_track_is_a_no_op() {
        let h = harness(&["a"]);
        h.controller.load_library().await;
        h.controller.next_track().await;
        assert!(h.device.commands().is_empty());
    }

    #[tokio::test]
    async fn like_is_mirrored_and_persisted() {
        let h = harness(&["a"]);
        h.controller.load_library().await;
        h.controller.play_track(track("a")).await;
        h.controller.toggle_liked_current().await;

        let model = h.controller.model.lock().await;
        assert!(model.session.current_track().unwrap().is_liked);
        assert_eq!(model.liked.len(), 1);
        drop(model);
        assert_eq!(h.library.snapshot().await.unwrap().liked.len(), 1);
    }

    #[tokio::test]
    async fn failed_like_reloads_and_reports() {
        let h = harness(&["a"]);
        h.controller.load_library().await;
        h.controller.play_track(track("foreign")).await;
        h.controller.toggle_liked_current().await;

        let model = h.controller.model.lock().await;
        assert!(model.has_error());
        assert!(model.liked.is_empty());
    }

    #[tokio::test]
    async fn volume_steps_are_clamped() {
        let h = harness(&["a"]);
        for _ in 0..10 {
            h.controller.volume_up().await;
        }
        assert_eq!(h.controller.model.lock().await.session.volume(), 1.0);
        assert_eq!(h.device.commands().last(), Some(&DeviceCommand::SetVolume(1.0)));
    }
}
