//! Navigation-related controller methods (tabs, pages, playlists)

use crate::model::{ActiveTab, NamePromptMode, Page};
use crate::{log_library_request, log_library_result};
use super::AppController;

impl AppController {
    pub async fn next_tab(&self) {
        let mut model = self.model.lock().await;
        let tab = model.content.tab.next();
        model.set_tab(tab);
    }

    pub async fn previous_tab(&self) {
        let mut model = self.model.lock().await;
        let tab = model.content.tab.prev();
        model.set_tab(tab);
    }

    /// Enter on the current screen: play a track, open a settings page or a playlist
    pub async fn activate_selection(&self) {
        let mut model = self.model.lock().await;
        let content = &model.content;

        if content.page == Page::Main && content.tab == ActiveTab::Settings {
            model.open_settings_entry();
            return;
        }
        if content.page == Page::Playlists && content.playlist_track_selected.is_none() {
            model.toggle_playlist_open();
            return;
        }

        let selected = model.selected_track();
        drop(model);
        if let Some(track) = selected {
            self.play_track(track).await;
        }
    }

    pub async fn go_back(&self) {
        let mut model = self.model.lock().await;
        if model.content.search_editing {
            model.content.search_editing = false;
        } else if model.content.playlist_track_selected.is_some() {
            model.toggle_playlist_open();
        } else if model.content.page != Page::Main {
            model.content.back_to_main();
        } else if model.session.is_maximized() {
            model.session.toggle_maximized();
        }
    }

    // ========================================================================
    // Add-to-playlist picker
    // ========================================================================

    /// Open the picker for the selected track, or the playing one
    pub async fn open_playlist_picker(&self) {
        let mut model = self.model.lock().await;
        let track = model
            .selected_track()
            .or_else(|| model.session.current_track().cloned());
        match track {
            Some(track) => model.open_playlist_picker(track),
            None => tracing::debug!("No track to add to a playlist"),
        }
    }

    pub async fn confirm_playlist_picker(&self) {
        let mut model = self.model.lock().await;
        let Some(picker) = model.close_playlist_picker() else {
            return;
        };

        let target = model.playlists.get(picker.selected).map(|p| p.id.clone());
        match target {
            Some(playlist_id) => {
                drop(model);
                self.add_track_to_playlist(&playlist_id, &picker.track.id).await;
            }
            None => model.open_name_prompt(NamePromptMode::Create {
                track_id: Some(picker.track.id),
            }),
        }
    }

    pub async fn add_track_to_playlist(&self, playlist_id: &str, track_id: &str) {
        log_library_request!("add_track_to_playlist", playlist_id, track_id);
        let result = self.library.add_track_to_playlist(playlist_id, track_id).await;
        log_library_result!("add_track_to_playlist", result);
        self.finish_playlist_write(result).await;
    }

    // ========================================================================
    // Playlist management
    // ========================================================================

    pub async fn open_create_prompt(&self) {
        self.model
            .lock()
            .await
            .open_name_prompt(NamePromptMode::Create { track_id: None });
    }

    pub async fn open_rename_prompt(&self) {
        let mut model = self.model.lock().await;
        if let Some(playlist_id) = model.selected_playlist().map(|p| p.id.clone()) {
            model.open_name_prompt(NamePromptMode::Rename { playlist_id });
        }
    }

    pub async fn submit_name_prompt(&self) {
        let Some(prompt) = self.model.lock().await.take_name_prompt() else {
            return;
        };
        let name = prompt.text.trim().to_string();

        match prompt.mode {
            NamePromptMode::Create { track_id } => {
                log_library_request!("create_playlist", name = %name);
                let result = self.library.create_playlist(&name).await;
                log_library_result!("create_playlist", result);
                match (result, track_id) {
                    (Ok(playlist), Some(track_id)) => {
                        self.add_track_to_playlist(&playlist.id, &track_id).await;
                    }
                    (result, _) => self.finish_playlist_write(result.map(|_| ())).await,
                }
            }
            NamePromptMode::Rename { playlist_id } => {
                log_library_request!("rename_playlist", playlist_id = %playlist_id, name = %name);
                let result = self.library.rename_playlist(&playlist_id, &name).await;
                log_library_result!("rename_playlist", result);
                self.finish_playlist_write(result).await;
            }
        }
    }

    pub async fn delete_selected_playlist(&self) {
        let Some(playlist_id) = self.model.lock().await.selected_playlist().map(|p| p.id.clone()) else {
            return;
        };

        log_library_request!("delete_playlist", playlist_id = %playlist_id);
        let result = self.library.delete_playlist(&playlist_id).await;
        log_library_result!("delete_playlist", result);
        self.finish_playlist_write(result).await;
    }

    /// Remove the highlighted track from the open playlist
    pub async fn remove_selected_from_playlist(&self) {
        let model = self.model.lock().await;
        if model.content.page != Page::Playlists {
            return;
        }
        let playlist_id = model.selected_playlist().map(|p| p.id.clone());
        let track_id = model.selected_track().map(|t| t.id);
        drop(model);

        let (Some(playlist_id), Some(track_id)) = (playlist_id, track_id) else {
            return;
        };

        log_library_request!("remove_track_from_playlist", playlist_id = %playlist_id, track_id = %track_id);
        let result = self.library.remove_track_from_playlist(&playlist_id, &track_id).await;
        log_library_result!("remove_track_from_playlist", result);
        self.finish_playlist_write(result).await;
    }

    async fn finish_playlist_write(&self, result: anyhow::Result<()>) {
        if let Err(e) = result {
            let error_msg = Self::format_error(&e);
            self.model.lock().await.set_error(error_msg);
            return;
        }
        self.refresh_library().await;
    }
}
