//! Model module - Application state and data types
//!
//! - `types`: Core type definitions (tracks, playlists, UI state)
//! - `cache`: Asset id to delivery URL cache
//! - `track_index`: Circular queue for next/previous
//! - `seek`: Arbitration between user drags and programmatic seeks
//! - `playback`: The playback session state machine
//! - `library`: Data access capability and the bundled JSON store
//! - `content`: Browse screen state
//! - `app_model`: Main application model tying the above together

mod types;
mod cache;
mod track_index;
mod seek;
mod playback;
mod library;
mod content;
mod app_model;

pub use types::{
    format_count, ActiveTab, NamePrompt, NamePromptMode, Page, Playlist, PlaylistPicker, Track,
    UiState, SETTINGS_ENTRIES,
};

pub use cache::ProxyDelivery;

pub use playback::{MetadataOutcome, PlaybackInfo, SeekOutcome, SessionState, StartMode};

pub use library::{JsonLibrary, LibraryData};

pub use content::ContentState;

pub use app_model::{AppModel, Direction, Selection};

#[cfg(test)]
pub(crate) use track_index::tests::track;
