//! Controller module - Application logic and event handling
//!
//! - `input`: Key event handling
//! - `playback`: Session transitions and the metadata readiness loop
//! - `navigation`: Tabs, pages and playlist management
//! - `player_events`: Device event listener

mod input;
mod playback;
mod navigation;
mod player_events;

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::audio::PlaybackDevice;
use crate::config::PlaybackTuning;
use crate::error::PlayerError;
use crate::model::{AppModel, LibraryData};

#[derive(Clone)]
pub struct AppController {
    pub(crate) model: Arc<Mutex<AppModel>>,
    pub(crate) device: Arc<dyn PlaybackDevice>,
    pub(crate) library: Arc<dyn LibraryData>,
    tuning: PlaybackTuning,
    /// Last queued history write; each write awaits the one before it
    history_tail: Arc<std::sync::Mutex<Option<JoinHandle<()>>>>,
}

impl AppController {
    pub fn new(
        model: Arc<Mutex<AppModel>>,
        device: Arc<dyn PlaybackDevice>,
        library: Arc<dyn LibraryData>,
        tuning: PlaybackTuning,
    ) -> Self {
        Self {
            model,
            device,
            library,
            tuning,
            history_tail: Arc::new(std::sync::Mutex::new(None)),
        }
    }

    pub(crate) fn format_error(error: &anyhow::Error) -> String {
        match error.downcast_ref::<PlayerError>() {
            Some(PlayerError::InvalidPlaylistName) => "Playlist name cannot be empty.".to_string(),
            Some(PlayerError::PlaylistNotFound(_)) => {
                "That playlist no longer exists.".to_string()
            }
            Some(PlayerError::TrackNotFound(_)) => "That track is no longer in the library.".to_string(),
            Some(PlayerError::DeviceUnavailable(_)) => {
                "Audio device unavailable. Please restart the app.".to_string()
            }
            _ => format!("Error: {}", error),
        }
    }
}
