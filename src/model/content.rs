//! Browse state: which screen is showing and what is selected on it

use super::types::{ActiveTab, Page, Track};

#[derive(Clone, Debug)]
pub struct ContentState {
    pub tab: ActiveTab,
    pub page: Page,
    /// How many feed tracks the home tab shows
    pub display_count: usize,
    pub home_selected: usize,
    pub search_query: String,
    pub search_editing: bool,
    pub search_selected: usize,
    pub settings_selected: usize,
    pub playlist_selected: usize,
    /// Selected row inside the open playlist; `None` while browsing playlists
    pub playlist_track_selected: Option<usize>,
    pub liked_selected: usize,
    pub library_loading: bool,
}

impl ContentState {
    pub fn new(page_size: usize) -> Self {
        Self {
            tab: ActiveTab::default(),
            page: Page::default(),
            display_count: page_size,
            home_selected: 0,
            search_query: String::new(),
            search_editing: false,
            search_selected: 0,
            settings_selected: 0,
            playlist_selected: 0,
            playlist_track_selected: None,
            liked_selected: 0,
            library_loading: false,
        }
    }

    pub fn open_page(&mut self, page: Page) {
        self.page = page;
        self.playlist_track_selected = None;
    }

    pub fn back_to_main(&mut self) {
        self.open_page(Page::Main);
    }
}

/// Case-insensitive substring match over title and artist
pub fn filter_tracks<'a>(tracks: &'a [Track], query: &str) -> Vec<&'a Track> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return tracks.iter().collect();
    }
    tracks
        .iter()
        .filter(|t| {
            t.title.to_lowercase().contains(&query) || t.artist.to_lowercase().contains(&query)
        })
        .collect()
}

pub(crate) fn step_up(selected: &mut usize) {
    *selected = selected.saturating_sub(1);
}

pub(crate) fn step_down(selected: &mut usize, len: usize) {
    if *selected + 1 < len {
        *selected += 1;
    }
}
