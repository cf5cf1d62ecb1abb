//! Device event listener

use std::time::Instant;

use crate::audio::{DeviceEvent, DeviceEventChannel};
use crate::model::MetadataOutcome;
use super::AppController;

impl AppController {
    pub fn start_device_event_listener(&self, mut event_channel: DeviceEventChannel) {
        let controller = self.clone();
        tracing::info!("Starting device event listener");

        tokio::spawn(async move {
            while let Some(event) = event_channel.recv().await {
                if controller.model.lock().await.should_quit() {
                    tracing::debug!("Device event listener shutting down");
                    break;
                }
                controller.handle_device_event(event).await;
            }
        });
    }

    pub(crate) async fn handle_device_event(&self, event: DeviceEvent) {
        let mut model = self.model.lock().await;

        match event {
            DeviceEvent::TimeUpdate { source, position } => {
                tracing::trace!(position, "DeviceEvent::TimeUpdate");
                model.session.on_time_update(&source, position, Instant::now());
            }
            DeviceEvent::MetadataLoaded { source, duration } => {
                if !model.session.owns_source(&source) {
                    tracing::debug!(source = %source, "Dropping metadata for a replaced source");
                    return;
                }
                let generation = model.session.generation();
                let outcome = model.session.apply_metadata(
                    generation,
                    duration,
                    self.device.as_ref(),
                    Instant::now(),
                );
                tracing::debug!(duration, ?outcome, "DeviceEvent::MetadataLoaded");
                if let MetadataOutcome::Applied { elapsed } = outcome {
                    tracing::info!(generation, duration, elapsed, "Track ready");
                }
            }
            DeviceEvent::Ended { source } => {
                if !model.session.owns_source(&source) {
                    tracing::debug!(source = %source, "Dropping end of a replaced source");
                    return;
                }
                tracing::debug!("DeviceEvent::Ended");
                drop(model);
                self.next_track().await;
            }
            DeviceEvent::VolumeChanged { volume } => {
                tracing::trace!(volume, "DeviceEvent::VolumeChanged");
                model.session.on_volume_changed(volume);
            }
            DeviceEvent::PlaybackRejected { reason } => {
                tracing::warn!(reason = %reason, "Playback start rejected by device");
            }
            DeviceEvent::LoadFailed { source, reason } => {
                if !model.session.owns_source(&source) {
                    return;
                }
                tracing::error!(source = %source, reason = %reason, "Source failed to load");
                model.set_error(format!("Could not load track: {}", reason));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::DeviceCommand;
    use crate::controller::tests::{eventually, harness};
    use crate::model::track;

    const SOURCE_A: &str = "http://assets/api/audio-proxy?fileid=file-a";

    #[tokio::test]
    async fn ended_advances_to_successor() {
        let h = harness(&["a", "b"]);
        h.controller.load_library().await;
        h.controller.play_track(track("a")).await;

        h.controller
            .handle_device_event(DeviceEvent::Ended { source: SOURCE_A.to_string() })
            .await;
        let model = h.controller.model.lock().await;
        assert_eq!(model.session.current_track_id(), Some("b"));
        assert!(model.session.play_intent());
    }

    #[tokio::test]
    async fn stale_events_are_dropped() {
        let h = harness(&["a", "b"]);
        h.controller.load_library().await;
        h.controller.play_track(track("b")).await;

        h.controller
            .handle_device_event(DeviceEvent::Ended { source: SOURCE_A.to_string() })
            .await;
        h.controller
            .handle_device_event(DeviceEvent::MetadataLoaded {
                source: SOURCE_A.to_string(),
                duration: 30.0,
            })
            .await;
        h.controller
            .handle_device_event(DeviceEvent::LoadFailed {
                source: SOURCE_A.to_string(),
                reason: "404".to_string(),
            })
            .await;

        let model = h.controller.model.lock().await;
        assert_eq!(model.session.current_track_id(), Some("b"));
        assert!(!model.session.is_ready());
        assert!(!model.has_error());
    }

    #[tokio::test]
    async fn metadata_event_readies_and_time_updates_flow() {
        let h = harness(&["a"]);
        h.controller.load_library().await;
        h.controller.play_track(track("a")).await;

        h.controller
            .handle_device_event(DeviceEvent::MetadataLoaded {
                source: SOURCE_A.to_string(),
                duration: 90.0,
            })
            .await;
        assert!(h.controller.model.lock().await.session.is_ready());
        assert!(h.device.commands().contains(&DeviceCommand::Play));

        h.controller
            .handle_device_event(DeviceEvent::TimeUpdate {
                source: SOURCE_A.to_string(),
                position: 12.0,
            })
            .await;
        assert_eq!(h.controller.model.lock().await.session.elapsed_seconds(), 12.0);
    }

    #[tokio::test]
    async fn load_failure_surfaces_error() {
        let h = harness(&["a"]);
        h.controller.load_library().await;
        h.controller.play_track(track("a")).await;
        h.controller
            .handle_device_event(DeviceEvent::LoadFailed {
                source: SOURCE_A.to_string(),
                reason: "404".to_string(),
            })
            .await;
        assert!(h.controller.model.lock().await.has_error());
    }

    #[tokio::test]
    async fn listener_consumes_channel() {
        let h = harness(&["a"]);
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        h.controller.start_device_event_listener(rx);

        tx.send(DeviceEvent::VolumeChanged { volume: 0.3 }).unwrap();
        eventually(&h.controller, |m| (m.session.volume() - 0.3).abs() < f32::EPSILON).await;
    }
}
