//! Domain errors for the player core

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PlayerError {
    /// The id is not part of the track index (stale or foreign track)
    #[error("Track not found: {0}")]
    TrackNotFound(String),

    #[error("No tracks loaded")]
    EmptyIndex,

    #[error("Nothing is playing")]
    NoTrackLoaded,

    #[error("Playlist not found: {0}")]
    PlaylistNotFound(String),

    #[error("Playlist name cannot be empty")]
    InvalidPlaylistName,

    /// The audio thread is gone or never started
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),
}
