//! Main application model: the single owner of session, index, cache and browse state
//!
//! The controller holds this behind one mutex; every mutation goes through a
//! method here or on [`PlaybackSession`].

use std::sync::Arc;
use std::time::Instant;

use crate::audio::PlaybackDevice;
use crate::config::AppConfig;
use crate::error::PlayerError;
use super::cache::{AssetCache, AssetDelivery, AssetRef};
use super::content::{filter_tracks, step_down, step_up, ContentState};
use super::library::LibrarySnapshot;
use super::playback::{PlaybackInfo, PlaybackSession, StartMode};
use super::track_index::TrackIndex;
use super::types::{
    ActiveTab, NamePrompt, NamePromptMode, Page, Playlist, PlaylistPicker, Track, UiState,
    SETTINGS_ENTRIES,
};

/// Result of a track selection, handed back to the controller so it can
/// record history and watch for metadata
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    pub generation: u64,
    pub track_id: String,
    pub mode: StartMode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

pub struct AppModel {
    pub session: PlaybackSession,
    pub index: TrackIndex,
    pub assets: AssetCache,
    pub playlists: Vec<Playlist>,
    pub liked: Vec<Track>,
    pub last_played: Option<Track>,
    pub content: ContentState,
    pub ui_state: UiState,
    page_size: usize,
    should_quit: bool,
}

impl AppModel {
    pub fn new(config: &AppConfig, delivery: Arc<dyn AssetDelivery>) -> Self {
        Self {
            session: PlaybackSession::new(&config.playback, config.default_volume),
            index: TrackIndex::default(),
            assets: AssetCache::new(delivery),
            playlists: Vec::new(),
            liked: Vec::new(),
            last_played: None,
            content: ContentState::new(config.page_size),
            ui_state: UiState::default(),
            page_size: config.page_size,
            should_quit: false,
        }
    }

    // ========================================================================
    // Library data
    // ========================================================================

    pub fn apply_library(&mut self, snapshot: LibrarySnapshot) {
        let LibrarySnapshot { tracks, playlists, liked, last_played } = snapshot;
        tracing::debug!(
            tracks = tracks.len(),
            playlists = playlists.len(),
            liked = liked.len(),
            has_last_played = last_played.is_some(),
            "Library snapshot applied"
        );

        self.index = TrackIndex::new(tracks);
        self.playlists = playlists;
        self.liked = liked;
        self.last_played = last_played;

        // The library copy is authoritative for likes
        if let Some(current_id) = self.session.current_track_id().map(str::to_string) {
            if let Some(position) = self.index.position_of(&current_id) {
                let liked = self.index.tracks()[position].is_liked;
                let session_liked = self.session.current_track().is_some_and(|t| t.is_liked);
                if liked != session_liked {
                    self.session.mirror_like(&current_id);
                }
            }
        }

        self.clamp_selections();
        self.prefetch_visible();
    }

    fn prefetch_visible(&mut self) {
        let visible = self.content.display_count.min(self.index.len());
        let mut added = self.assets.ensure_artwork(&self.index.tracks()[..visible]);
        added += self
            .assets
            .ensure_artwork(self.playlists.iter().flat_map(|p| p.tracks.iter()));
        added += self.assets.ensure_artwork(&self.liked);
        if added > 0 {
            tracing::debug!(added, cached = self.assets.len(), "Prefetched artwork URLs");
        }
    }

    fn clamp_selections(&mut self) {
        let content = &mut self.content;
        content.home_selected = content.home_selected.min(self.index.len().saturating_sub(1));
        content.playlist_selected = content.playlist_selected.min(self.playlists.len().saturating_sub(1));
        content.liked_selected = content.liked_selected.min(self.liked.len().saturating_sub(1));
        if let Some(selected) = content.playlist_track_selected {
            let len = self
                .playlists
                .get(content.playlist_selected)
                .map_or(0, |p| p.tracks.len());
            content.playlist_track_selected = (len > 0).then(|| selected.min(len - 1));
        }
    }

    pub fn visible_tracks(&self) -> &[Track] {
        let visible = self.content.display_count.min(self.index.len());
        &self.index.tracks()[..visible]
    }

    pub fn has_more_tracks(&self) -> bool {
        self.content.display_count < self.index.len()
    }

    /// Grow the home feed by one page
    pub fn load_more(&mut self) -> bool {
        if !self.has_more_tracks() {
            return false;
        }
        let start = self.content.display_count;
        self.content.display_count = (start + self.page_size).min(self.index.len());
        let end = self.content.display_count;
        self.assets.ensure_artwork(&self.index.tracks()[start..end]);
        tracing::debug!(display_count = end, "Loaded more tracks");
        true
    }

    pub fn search_results(&self) -> Vec<&Track> {
        filter_tracks(self.index.tracks(), &self.content.search_query)
    }

    fn prefetch_search_results(&mut self) {
        let results: Vec<AssetRef> = self.search_results().into_iter().map(AssetRef::artwork).collect();
        self.assets.ensure_many(results);
    }

    // ========================================================================
    // Track selection
    // ========================================================================

    /// Load `track` into the session, caching its artwork and the artwork of
    /// the track that would play next.
    pub fn select(&mut self, track: Track, mode: StartMode, device: &dyn PlaybackDevice) -> Selection {
        self.assets.ensure(AssetRef::artwork(&track));
        let source = self.assets.resolve(AssetRef::audio(&track));

        if let Ok(next) = self.index.successor(&track.id) {
            let next = AssetRef::artwork(next);
            self.assets.ensure(next);
        }

        let track_id = track.id.clone();
        let generation = self.session.load(track, source, mode, device);
        Selection { generation, track_id, mode }
    }

    /// Step through the feed from the current track, wrapping at both ends.
    pub fn advance(
        &mut self,
        direction: Direction,
        device: &dyn PlaybackDevice,
    ) -> Result<Selection, PlayerError> {
        let current_id = self
            .session
            .current_track_id()
            .ok_or(PlayerError::NoTrackLoaded)?;

        let target = match direction {
            Direction::Next => self.index.successor(current_id)?,
            Direction::Previous => self.index.predecessor(current_id)?,
        }
        .clone();

        Ok(self.select(target, StartMode::Play, device))
    }

    /// One-shot auto-load of the last played track, paused.
    pub fn try_bootstrap(&mut self, device: &dyn PlaybackDevice) -> Option<Selection> {
        if !self.session.should_bootstrap() {
            return None;
        }
        let track = self.last_played.clone()?;
        self.session.mark_bootstrapped();
        tracing::info!(track_id = %track.id, "Resuming last played track");
        Some(self.select(track, StartMode::Silent, device))
    }

    /// Flip the like flag on every in-memory copy of the track
    pub fn toggle_like_local(&mut self, track_id: &str) {
        self.session.mirror_like(track_id);

        let mut now_liked = None;
        if let Some(position) = self.index.position_of(track_id) {
            let track = &mut self.index.tracks_mut()[position];
            track.is_liked = !track.is_liked;
            now_liked = Some(track.clone());
        }

        for track in self.playlists.iter_mut().flat_map(|p| p.tracks.iter_mut()) {
            if track.id == track_id {
                track.is_liked = !track.is_liked;
            }
        }

        match now_liked {
            Some(track) if track.is_liked => {
                if !self.liked.iter().any(|t| t.id == track_id) {
                    self.liked.push(track);
                }
            }
            _ => self.liked.retain(|t| t.id != track_id),
        }
        self.clamp_selections();
    }

    pub fn playback_info(&self) -> PlaybackInfo {
        let artwork = self
            .session
            .current_track()
            .and_then(|track| self.assets.get(&AssetRef::artwork(track)))
            .map(str::to_string);
        self.session.info(artwork)
    }

    pub fn is_externally_seeking(&self) -> bool {
        self.session.is_externally_seeking(Instant::now())
    }

    // ========================================================================
    // Browse navigation
    // ========================================================================

    /// Track under the cursor on the current screen
    pub fn selected_track(&self) -> Option<Track> {
        let content = &self.content;
        match content.page {
            Page::Main => match content.tab {
                ActiveTab::Home => self.visible_tracks().get(content.home_selected).cloned(),
                ActiveTab::Search => self.search_results().get(content.search_selected).map(|t| (*t).clone()),
                ActiveTab::Settings => None,
            },
            Page::Playlists => {
                let index = content.playlist_track_selected?;
                self.playlists
                    .get(content.playlist_selected)
                    .and_then(|p| p.tracks.get(index))
                    .cloned()
            }
            Page::Liked => self.liked.get(content.liked_selected).cloned(),
        }
    }

    pub fn selected_playlist(&self) -> Option<&Playlist> {
        self.playlists.get(self.content.playlist_selected)
    }

    pub fn move_selection_up(&mut self) {
        let content = &mut self.content;
        match content.page {
            Page::Main => match content.tab {
                ActiveTab::Home => step_up(&mut content.home_selected),
                ActiveTab::Search => step_up(&mut content.search_selected),
                ActiveTab::Settings => step_up(&mut content.settings_selected),
            },
            Page::Playlists => match content.playlist_track_selected.as_mut() {
                Some(selected) => step_up(selected),
                None => step_up(&mut content.playlist_selected),
            },
            Page::Liked => step_up(&mut content.liked_selected),
        }
    }

    pub fn move_selection_down(&mut self) {
        match self.content.page {
            Page::Main => match self.content.tab {
                ActiveTab::Home => {
                    // Running off the end of the feed pulls in the next page
                    if self.content.home_selected + 1 >= self.visible_tracks().len() {
                        self.load_more();
                    }
                    let len = self.visible_tracks().len();
                    step_down(&mut self.content.home_selected, len);
                }
                ActiveTab::Search => {
                    let len = self.search_results().len();
                    step_down(&mut self.content.search_selected, len);
                }
                ActiveTab::Settings => {
                    step_down(&mut self.content.settings_selected, SETTINGS_ENTRIES.len());
                }
            },
            Page::Playlists => {
                let track_len = self.selected_playlist().map_or(0, |p| p.tracks.len());
                let playlist_len = self.playlists.len();
                match self.content.playlist_track_selected.as_mut() {
                    Some(selected) => step_down(selected, track_len),
                    None => step_down(&mut self.content.playlist_selected, playlist_len),
                }
            }
            Page::Liked => {
                let len = self.liked.len();
                step_down(&mut self.content.liked_selected, len);
            }
        }
    }

    pub fn set_tab(&mut self, tab: ActiveTab) {
        self.content.tab = tab;
        self.content.search_editing = false;
    }

    pub fn open_settings_entry(&mut self) {
        let page = match self.content.settings_selected {
            0 => Page::Playlists,
            _ => Page::Liked,
        };
        self.content.open_page(page);
    }

    /// Enter/leave the track list of the selected playlist
    pub fn toggle_playlist_open(&mut self) {
        self.content.playlist_track_selected = match self.content.playlist_track_selected {
            Some(_) => None,
            None if self.selected_playlist().is_some_and(|p| !p.tracks.is_empty()) => Some(0),
            None => None,
        };
    }

    pub fn append_to_search(&mut self, c: char) {
        self.content.search_query.push(c);
        self.content.search_selected = 0;
        self.prefetch_search_results();
    }

    pub fn backspace_search(&mut self) {
        self.content.search_query.pop();
        self.content.search_selected = 0;
        self.prefetch_search_results();
    }

    // ========================================================================
    // Modals
    // ========================================================================

    pub fn open_playlist_picker(&mut self, track: Track) {
        self.ui_state.playlist_picker = Some(PlaylistPicker { track, selected: 0 });
    }

    pub fn close_playlist_picker(&mut self) -> Option<PlaylistPicker> {
        self.ui_state.playlist_picker.take()
    }

    pub fn playlist_picker_up(&mut self) {
        if let Some(picker) = self.ui_state.playlist_picker.as_mut() {
            step_up(&mut picker.selected);
        }
    }

    pub fn playlist_picker_down(&mut self) {
        // One extra row for "create new playlist"
        let rows = self.playlists.len() + 1;
        if let Some(picker) = self.ui_state.playlist_picker.as_mut() {
            step_down(&mut picker.selected, rows);
        }
    }

    pub fn open_name_prompt(&mut self, mode: NamePromptMode) {
        let text = match &mode {
            NamePromptMode::Create { .. } => String::new(),
            NamePromptMode::Rename { playlist_id } => self
                .playlists
                .iter()
                .find(|p| &p.id == playlist_id)
                .map(|p| p.name.clone())
                .unwrap_or_default(),
        };
        self.ui_state.name_prompt = Some(NamePrompt { mode, text });
    }

    pub fn name_prompt_input(&mut self, c: char) {
        if let Some(prompt) = self.ui_state.name_prompt.as_mut() {
            prompt.text.push(c);
        }
    }

    pub fn name_prompt_backspace(&mut self) {
        if let Some(prompt) = self.ui_state.name_prompt.as_mut() {
            prompt.text.pop();
        }
    }

    pub fn take_name_prompt(&mut self) -> Option<NamePrompt> {
        self.ui_state.name_prompt.take()
    }

    pub fn toggle_help_popup(&mut self) {
        self.ui_state.show_help_popup = !self.ui_state.show_help_popup;
    }

    // ========================================================================
    // Errors and lifecycle
    // ========================================================================

    pub fn set_error(&mut self, message: String) {
        self.ui_state.error_message = Some(message);
        self.ui_state.error_timestamp = Some(Instant::now());
    }

    pub fn clear_error(&mut self) {
        self.ui_state.error_message = None;
        self.ui_state.error_timestamp = None;
    }

    pub fn has_error(&self) -> bool {
        self.ui_state.error_message.is_some()
    }

    pub fn auto_clear_old_errors(&mut self) {
        if let Some(timestamp) = self.ui_state.error_timestamp {
            if timestamp.elapsed().as_secs() > 5 {
                self.clear_error();
            }
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn set_should_quit(&mut self, quit: bool) {
        self.should_quit = quit;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::{DeviceCommand, FakeDevice};
    use crate::model::cache::ProxyDelivery;
    use crate::model::playback::SessionState;
    use crate::model::track_index::tests::track;

    fn model_with(ids: &[&str]) -> AppModel {
        let mut model = AppModel::new(
            &AppConfig::default(),
            Arc::new(ProxyDelivery::new("http://assets")),
        );
        model.apply_library(LibrarySnapshot {
            tracks: ids.iter().map(|id| track(id)).collect(),
            ..LibrarySnapshot::default()
        });
        model
    }

    fn current(model: &AppModel) -> &str {
        model.session.current_track_id().unwrap()
    }

    #[test]
    fn select_prefetches_current_and_next_artwork() {
        let device = FakeDevice::default();
        let mut model = model_with(&["a", "b", "c"]);
        let cached_before = model.assets.len();

        let selection = model.select(track("c"), StartMode::Play, &device);
        assert_eq!(selection.track_id, "c");
        assert_eq!(
            device.commands(),
            vec![DeviceCommand::Load("http://assets/api/audio-proxy?fileid=file-c".to_string())]
        );
        // artwork for a/b/c was already cached by the page prefetch; audio is new
        assert_eq!(model.assets.len(), cached_before + 1);
        assert!(model.assets.get(&AssetRef::artwork(&track("a"))).is_some());
        assert_eq!(
            model.playback_info().artwork_url.as_deref(),
            Some("http://assets/api/image-proxy?fileid=img-c")
        );
    }

    #[test]
    fn next_and_previous_wrap_around() {
        let device = FakeDevice::default();
        let mut model = model_with(&["a", "b", "c"]);

        model.select(track("b"), StartMode::Play, &device);
        model.advance(Direction::Next, &device).unwrap();
        assert_eq!(current(&model), "c");
        model.advance(Direction::Next, &device).unwrap();
        assert_eq!(current(&model), "a");
        model.advance(Direction::Previous, &device).unwrap();
        assert_eq!(current(&model), "c");
        assert!(model.session.play_intent());
    }

    #[test]
    fn advance_without_track_or_tracks_fails() {
        let device = FakeDevice::default();
        let mut model = model_with(&["a"]);
        assert_eq!(
            model.advance(Direction::Next, &device).unwrap_err(),
            PlayerError::NoTrackLoaded
        );

        let mut empty = model_with(&[]);
        empty.select(track("x"), StartMode::Play, &device);
        assert_eq!(empty.advance(Direction::Next, &device).unwrap_err(), PlayerError::EmptyIndex);
    }

    #[test]
    fn advance_from_foreign_track_reports_not_found() {
        let device = FakeDevice::default();
        let mut model = model_with(&["a", "b"]);
        model.select(track("playlist-only"), StartMode::Play, &device);
        assert_eq!(
            model.advance(Direction::Previous, &device).unwrap_err(),
            PlayerError::TrackNotFound("playlist-only".to_string())
        );
        assert_eq!(current(&model), "playlist-only");
    }

    #[test]
    fn bootstrap_fires_once_and_silently() {
        let device = FakeDevice::default();
        let mut model = model_with(&["a", "b", "c"]);
        model.last_played = Some(track("c"));

        let selection = model.try_bootstrap(&device).unwrap();
        assert_eq!(selection.mode, StartMode::Silent);
        assert_eq!(current(&model), "c");
        assert!(!model.session.play_intent());

        model.session.close(&device);
        assert!(model.try_bootstrap(&device).is_none());
        assert_eq!(model.session.state(), SessionState::Idle);
    }

    #[test]
    fn bootstrap_skipped_when_dismissed_before_data_arrives() {
        let device = FakeDevice::default();
        let mut model = model_with(&["a"]);
        model.select(track("a"), StartMode::Play, &device);
        model.session.close(&device);

        model.last_played = Some(track("a"));
        assert!(model.try_bootstrap(&device).is_none());
    }

    #[test]
    fn bootstrap_needs_a_last_played_track() {
        let device = FakeDevice::default();
        let mut model = model_with(&["a"]);
        assert!(model.try_bootstrap(&device).is_none());
        assert!(!model.session.resume_done());
    }

    #[test]
    fn like_toggle_keeps_copies_consistent() {
        let device = FakeDevice::default();
        let mut model = model_with(&["a", "b"]);
        model.playlists.push(Playlist {
            id: "p".to_string(),
            name: "P".to_string(),
            tracks: vec![track("b")],
        });
        model.select(track("b"), StartMode::Play, &device);

        model.toggle_like_local("b");
        assert!(model.session.current_track().unwrap().is_liked);
        assert!(model.index.tracks()[1].is_liked);
        assert!(model.playlists[0].tracks[0].is_liked);
        assert_eq!(model.liked.len(), 1);

        model.toggle_like_local("b");
        assert!(!model.session.current_track().unwrap().is_liked);
        assert!(model.liked.is_empty());
    }

    #[test]
    fn library_reload_resyncs_session_like() {
        let device = FakeDevice::default();
        let mut model = model_with(&["a"]);
        model.select(track("a"), StartMode::Play, &device);

        let mut liked = track("a");
        liked.is_liked = true;
        model.apply_library(LibrarySnapshot {
            tracks: vec![liked.clone()],
            liked: vec![liked],
            ..LibrarySnapshot::default()
        });
        assert!(model.session.current_track().unwrap().is_liked);
    }

    #[test]
    fn paging_grows_feed_and_prefetches() {
        let ids: Vec<String> = (0..40).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let mut model = model_with(&refs);

        assert_eq!(model.visible_tracks().len(), 15);
        assert_eq!(model.assets.len(), 15);
        assert!(model.load_more());
        assert_eq!(model.visible_tracks().len(), 30);
        assert_eq!(model.assets.len(), 30);
        assert!(model.load_more());
        assert_eq!(model.visible_tracks().len(), 40);
        assert!(!model.load_more());
    }

    #[test]
    fn scrolling_past_the_feed_end_loads_more() {
        let ids: Vec<String> = (0..20).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let mut model = model_with(&refs);

        for _ in 0..15 {
            model.move_selection_down();
        }
        assert_eq!(model.content.home_selected, 15);
        assert_eq!(model.visible_tracks().len(), 20);
    }

    #[test]
    fn selected_track_follows_screen() {
        let mut model = model_with(&["a", "b"]);
        model.move_selection_down();
        assert_eq!(model.selected_track().unwrap().id, "b");

        model.set_tab(ActiveTab::Search);
        model.append_to_search('x');
        assert!(model.selected_track().is_none());
        model.backspace_search();
        assert_eq!(model.selected_track().unwrap().id, "a");

        model.set_tab(ActiveTab::Settings);
        assert!(model.selected_track().is_none());
    }

    #[test]
    fn playlist_page_navigation() {
        let mut model = model_with(&["a", "b"]);
        model.playlists = vec![
            Playlist { id: "1".to_string(), name: "Empty".to_string(), tracks: vec![] },
            Playlist { id: "2".to_string(), name: "Full".to_string(), tracks: vec![track("b")] },
        ];
        model.content.settings_selected = 0;
        model.open_settings_entry();
        assert_eq!(model.content.page, Page::Playlists);

        model.toggle_playlist_open();
        assert_eq!(model.content.playlist_track_selected, None);

        model.move_selection_down();
        model.toggle_playlist_open();
        assert_eq!(model.selected_track().unwrap().id, "b");
    }

    #[test]
    fn rename_prompt_starts_with_current_name() {
        let mut model = model_with(&[]);
        model.playlists.push(Playlist { id: "p".to_string(), name: "Old".to_string(), tracks: vec![] });
        model.open_name_prompt(NamePromptMode::Rename { playlist_id: "p".to_string() });
        model.name_prompt_backspace();
        model.name_prompt_input('!');
        assert_eq!(model.take_name_prompt().unwrap().text, "Ol!");
    }
}
