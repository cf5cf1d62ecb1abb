//! Main content area rendering (feed, search results, settings, playlists, liked)

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, ListItem, Paragraph},
    Frame,
};
use ratatui::widgets::Padding;

use crate::model::{format_count, ActiveTab, AppModel, Page, Playlist, Track, SETTINGS_ENTRIES};
use super::utils::{calculate_num_width, item_style, render_scrollable_list, truncate_string};

pub fn render_main_content(frame: &mut Frame, area: Rect, model: &AppModel) {
    let content = &model.content;
    let playing_id = model.session.current_track_id();

    if content.library_loading && model.index.is_empty() {
        let loading = Paragraph::new("Loading...")
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title(" Content "));
        frame.render_widget(loading, area);
        return;
    }

    match content.page {
        Page::Main => match content.tab {
            ActiveTab::Home => {
                let visible = model.visible_tracks();
                let title = format!(" Home ({} of {}) ", visible.len(), model.index.len());
                let footer = if model.has_more_tracks() {
                    " ↓ past the end loads more "
                } else {
                    ""
                };
                let tracks: Vec<&Track> = visible.iter().collect();
                render_track_list(frame, area, &title, footer, &tracks, content.home_selected, playing_id);
            }
            ActiveTab::Search => {
                let results = model.search_results();
                let title = if content.search_query.is_empty() {
                    " All tracks ".to_string()
                } else {
                    format!(" Results for \"{}\" ({}) ", content.search_query, results.len())
                };
                render_track_list(frame, area, &title, "", &results, content.search_selected, playing_id);
            }
            ActiveTab::Settings => render_settings(frame, area, content.settings_selected),
        },
        Page::Playlists => match (content.playlist_track_selected, model.selected_playlist()) {
            (Some(selected), Some(playlist)) => {
                let title = format!(" {} ", playlist.name);
                let tracks: Vec<&Track> = playlist.tracks.iter().collect();
                render_track_list(
                    frame,
                    area,
                    &title,
                    " D remove · Esc back ",
                    &tracks,
                    selected,
                    playing_id,
                );
            }
            _ => render_playlists(frame, area, &model.playlists, content.playlist_selected),
        },
        Page::Liked => {
            let tracks: Vec<&Track> = model.liked.iter().collect();
            render_track_list(frame, area, " Liked songs ", "", &tracks, content.liked_selected, playing_id);
        }
    }
}

fn content_block<'a>(title: &'a str, footer: &'a str) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_bottom(footer)
        .padding(Padding::horizontal(1))
        .border_style(Style::default().fg(Color::Green))
}

fn render_track_list(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    footer: &str,
    tracks: &[&Track],
    selected_index: usize,
    playing_id: Option<&str>,
) {
    if tracks.is_empty() {
        let empty = Paragraph::new("No tracks")
            .style(Style::default().fg(Color::DarkGray))
            .block(content_block(title, footer));
        frame.render_widget(empty, area);
        return;
    }

    let content_width = area.width.saturating_sub(4) as usize;
    let items = track_items(tracks, selected_index, playing_id, content_width);
    // +1 for header
    render_scrollable_list(frame, area, items, selected_index + 1, content_block(title, footer));
}

fn track_items(
    tracks: &[&Track],
    selected_index: usize,
    playing_id: Option<&str>,
    content_width: usize,
) -> Vec<ListItem<'static>> {
    let num_width = calculate_num_width(tracks.len());
    let liked_width = 2;
    let plays_width = 7;
    let fixed_width = 1 + num_width + 3 + liked_width + 3 + 3 + 3 + plays_width;
    let remaining_width = content_width.saturating_sub(fixed_width);
    let title_width = (remaining_width * 55) / 100;
    let artist_width = remaining_width.saturating_sub(title_width);

    let mut items: Vec<ListItem<'static>> = vec![ListItem::new(format!(
        " {:<num_width$}   {}   {:<title_width$}   {:<artist_width$}   {}",
        "#", "  ", "Title", "Artist", "Plays",
    ))
    .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))];

    items.extend(tracks.iter().enumerate().map(|(i, track)| {
        let is_playing = playing_id == Some(track.id.as_str());
        let liked_indicator = if track.is_liked { "💚" } else { "  " };
        let playing_indicator = if is_playing { "▶" } else { " " };
        let track_num = format!("{}{:<num_width$}", playing_indicator, i + 1);

        ListItem::new(format!(
            "{}   {}   {}   {}   {:>plays_width$}",
            track_num,
            liked_indicator,
            truncate_string(&track.title, title_width),
            truncate_string(&track.artist, artist_width),
            format_count(track.play_count),
        ))
        .style(item_style(i == selected_index, is_playing))
    }));
    items
}

fn render_settings(frame: &mut Frame, area: Rect, selected: usize) {
    let items: Vec<ListItem> = SETTINGS_ENTRIES
        .iter()
        .enumerate()
        .map(|(i, entry)| ListItem::new(*entry).style(item_style(i == selected, false)))
        .collect();
    render_scrollable_list(frame, area, items, selected, content_block(" Settings ", ""));
}

fn render_playlists(frame: &mut Frame, area: Rect, playlists: &[Playlist], selected: usize) {
    let footer = " C create · R rename · D delete · Enter open ";
    if playlists.is_empty() {
        let empty = Paragraph::new("No playlists yet. Press C to create one.")
            .style(Style::default().fg(Color::DarkGray))
            .block(content_block(" Playlists ", footer));
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = playlists
        .iter()
        .enumerate()
        .map(|(i, playlist)| {
            ListItem::new(format!("{} ({} tracks)", playlist.name, playlist.tracks.len()))
                .style(item_style(i == selected, false))
        })
        .collect();
    render_scrollable_list(frame, area, items, selected, content_block(" Playlists ", footer));
}
