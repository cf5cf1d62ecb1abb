//! Core type definitions for the application

use std::time::Instant;
use serde::{Deserialize, Serialize};

/// A playable track as served by the library
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    /// Audio asset id, resolved through the audio proxy
    pub file_id: String,
    /// Artwork asset id, resolved through the image proxy
    pub img_id: String,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub play_count: u64,
    #[serde(default, rename = "isLiked")]
    pub is_liked: bool,
}

/// A user playlist with its tracks resolved
#[derive(Clone, Debug, PartialEq)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub tracks: Vec<Track>,
}

/// Bottom navigation tabs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ActiveTab {
    #[default]
    Home,
    Search,
    Settings,
}

impl ActiveTab {
    pub fn next(self) -> Self {
        match self {
            ActiveTab::Home => ActiveTab::Search,
            ActiveTab::Search => ActiveTab::Settings,
            ActiveTab::Settings => ActiveTab::Home,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            ActiveTab::Home => ActiveTab::Settings,
            ActiveTab::Search => ActiveTab::Home,
            ActiveTab::Settings => ActiveTab::Search,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ActiveTab::Home => "Home",
            ActiveTab::Search => "Search",
            ActiveTab::Settings => "Settings",
        }
    }
}

/// Full-screen pages reachable from Settings; `Main` shows the active tab
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Page {
    #[default]
    Main,
    Playlists,
    Liked,
}

/// Entries on the Settings tab
pub const SETTINGS_ENTRIES: [&str; 2] = ["Playlists", "Liked songs"];

/// What the playlist name prompt is for
#[derive(Clone, Debug, PartialEq)]
pub enum NamePromptMode {
    /// New playlist, optionally seeded with a track from the picker
    Create { track_id: Option<String> },
    Rename { playlist_id: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct NamePrompt {
    pub mode: NamePromptMode,
    pub text: String,
}

/// Add-to-playlist picker state
#[derive(Clone, Debug, PartialEq)]
pub struct PlaylistPicker {
    pub track: Track,
    /// Index into playlists; `playlists.len()` is the "create new" row
    pub selected: usize,
}

/// UI state for the application
#[derive(Clone, Debug, Default)]
pub struct UiState {
    pub error_message: Option<String>,
    pub error_timestamp: Option<Instant>,
    pub show_help_popup: bool,
    pub name_prompt: Option<NamePrompt>,
    pub playlist_picker: Option<PlaylistPicker>,
}

/// Compact play-count rendering: 1.2M, 3.4K, 999
pub fn format_count(count: u64) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        count.to_string()
    }
}
