//! View module - UI rendering
//!
//! - `utils`: Shared utility functions (formatting, scrollable lists)
//! - `layout`: Top bar with tabs and search
//! - `content`: Main content area rendering
//! - `progress`: Minimized and maximized player
//! - `overlays`: Modal overlays (error, help, playlist picker, name prompt)

mod utils;
mod layout;
mod content;
mod progress;
mod overlays;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use crate::model::AppModel;

pub struct AppView;

impl AppView {
    pub fn render(frame: &mut Frame, model: &AppModel) {
        let playback = model.playback_info();

        let player_height = if playback.is_maximized {
            Constraint::Percentage(60)
        } else {
            Constraint::Length(3)
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Tabs + search
                Constraint::Min(0),    // Main content
                player_height,         // Player
            ])
            .split(frame.area());

        layout::render_top_bar(frame, chunks[0], &model.content);
        content::render_main_content(frame, chunks[1], model);

        if playback.is_maximized {
            progress::render_maximized_player(frame, chunks[2], &playback);
        } else {
            progress::render_progress_bar(frame, chunks[2], &playback);
        }

        let ui_state = &model.ui_state;

        if let Some(picker) = &ui_state.playlist_picker {
            overlays::render_playlist_picker(frame, picker, &model.playlists);
        }

        if let Some(prompt) = &ui_state.name_prompt {
            overlays::render_name_prompt(frame, prompt);
        }

        if ui_state.show_help_popup {
            overlays::render_help_popup(frame);
        }

        // Error notification overlay (if there's an error)
        if ui_state.error_message.is_some() {
            overlays::render_error_notification(frame, ui_state);
        }
    }
}
