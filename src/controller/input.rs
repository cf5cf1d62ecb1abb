//! Key event handling

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::model::{ActiveTab, Page};
use super::AppController;

impl AppController {
    pub async fn handle_key_event(&self, key: KeyEvent) -> Result<()> {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        let mut model = self.model.lock().await;

        // Handle error message first (blocks all other interactions)
        if model.has_error() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                model.clear_error();
            }
            return Ok(());
        }

        // Handle help popup
        if model.ui_state.show_help_popup {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('h') | KeyCode::Char('H')) {
                model.toggle_help_popup();
            }
            return Ok(());
        }

        // Handle playlist name prompt
        if model.ui_state.name_prompt.is_some() {
            match key.code {
                KeyCode::Enter => {
                    drop(model);
                    self.submit_name_prompt().await;
                }
                KeyCode::Esc => {
                    model.take_name_prompt();
                }
                KeyCode::Backspace => model.name_prompt_backspace(),
                KeyCode::Char(c) => model.name_prompt_input(c),
                _ => {}
            }
            return Ok(());
        }

        // Handle add-to-playlist picker
        if model.ui_state.playlist_picker.is_some() {
            match key.code {
                KeyCode::Up => model.playlist_picker_up(),
                KeyCode::Down => model.playlist_picker_down(),
                KeyCode::Enter => {
                    drop(model);
                    self.confirm_playlist_picker().await;
                }
                KeyCode::Esc | KeyCode::Char('a') | KeyCode::Char('A') => {
                    model.close_playlist_picker();
                }
                _ => {}
            }
            return Ok(());
        }

        // Scrub mode: arrows move the target, Enter commits, Esc restores
        if model.session.is_scrubbing() {
            drop(model);
            match key.code {
                KeyCode::Left => self.scrub_backward().await,
                KeyCode::Right => self.scrub_forward().await,
                KeyCode::Enter | KeyCode::Char('s') | KeyCode::Char('S') => self.commit_scrub().await,
                KeyCode::Esc => self.cancel_scrub().await,
                _ => {}
            }
            return Ok(());
        }

        // Search text entry
        if model.content.search_editing {
            match key.code {
                KeyCode::Esc | KeyCode::Enter | KeyCode::Down => {
                    model.content.search_editing = false;
                }
                KeyCode::Backspace => model.backspace_search(),
                KeyCode::Char(c) => {
                    // Q still quits while typing when Ctrl is pressed
                    if (c == 'q' || c == 'Q') && key.modifiers.contains(KeyModifiers::CONTROL) {
                        model.set_should_quit(true);
                    } else {
                        model.append_to_search(c);
                    }
                }
                _ => {}
            }
            return Ok(());
        }

        // Playlist management on the playlists page
        if model.content.page == Page::Playlists {
            let in_playlist = model.content.playlist_track_selected.is_some();
            match key.code {
                KeyCode::Char('c') | KeyCode::Char('C') if !in_playlist => {
                    drop(model);
                    self.open_create_prompt().await;
                    return Ok(());
                }
                KeyCode::Char('r') | KeyCode::Char('R') if !in_playlist => {
                    drop(model);
                    self.open_rename_prompt().await;
                    return Ok(());
                }
                KeyCode::Char('d') | KeyCode::Char('D') if !in_playlist => {
                    drop(model);
                    self.delete_selected_playlist().await;
                    return Ok(());
                }
                KeyCode::Char('d') | KeyCode::Char('D') | KeyCode::Delete => {
                    drop(model);
                    self.remove_selected_from_playlist().await;
                    return Ok(());
                }
                _ => {}
            }
        }

        // Global keybindings
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                model.set_should_quit(true);
            }
            KeyCode::Tab => {
                drop(model);
                self.next_tab().await;
            }
            KeyCode::BackTab => {
                drop(model);
                self.previous_tab().await;
            }
            KeyCode::Up => model.move_selection_up(),
            KeyCode::Down => model.move_selection_down(),
            KeyCode::Enter => {
                drop(model);
                self.activate_selection().await;
            }
            KeyCode::Esc => {
                drop(model);
                self.go_back().await;
            }
            KeyCode::Char('/') => {
                model.set_tab(ActiveTab::Search);
                model.content.back_to_main();
                model.content.search_editing = true;
            }
            // Play/Pause toggle
            KeyCode::Char(' ') => {
                drop(model);
                self.toggle_playback().await;
            }
            KeyCode::Char('n') | KeyCode::Char('N') => {
                drop(model);
                self.next_track().await;
            }
            KeyCode::Char('p') | KeyCode::Char('P') => {
                drop(model);
                self.previous_track().await;
            }
            KeyCode::Char('x') | KeyCode::Char('X') => {
                drop(model);
                self.close_player().await;
            }
            KeyCode::Left => {
                drop(model);
                self.seek_backward().await;
            }
            KeyCode::Right => {
                drop(model);
                self.seek_forward().await;
            }
            KeyCode::Char('s') | KeyCode::Char('S') => {
                drop(model);
                if !self.begin_scrub().await {
                    tracing::debug!("Scrub unavailable until the track is ready");
                }
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                drop(model);
                self.volume_up().await;
            }
            KeyCode::Char('-') => {
                drop(model);
                self.volume_down().await;
            }
            KeyCode::Char('m') | KeyCode::Char('M') => {
                drop(model);
                self.toggle_maximized().await;
            }
            KeyCode::Char('l') | KeyCode::Char('L') => {
                drop(model);
                self.toggle_liked_current().await;
            }
            KeyCode::Char('a') | KeyCode::Char('A') => {
                drop(model);
                self.open_playlist_picker().await;
            }
            KeyCode::Char('h') | KeyCode::Char('H') => {
                model.toggle_help_popup();
            }
            _ => {}
        }
        Ok(())
    }
}
