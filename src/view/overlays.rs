//! Overlay rendering (error notification, help popup, playlist picker, name prompt)

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::model::{NamePrompt, NamePromptMode, Playlist, PlaylistPicker, UiState};

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    }
}

pub fn render_error_notification(frame: &mut Frame, ui_state: &UiState) {
    if let Some(ref error_msg) = ui_state.error_message {
        let area = frame.area();

        // Fixed width popup (responsive to screen size)
        let popup_width = 52.min(area.width.saturating_sub(4));
        let inner_width = popup_width.saturating_sub(4).max(1) as usize; // account for borders

        // Calculate how many lines the error message will take when wrapped
        let error_line_count = error_msg.chars().count().div_ceil(inner_width) as u16;

        // Height: top border (1) + error lines + bottom border (1)
        let popup_height = (2 + error_line_count.max(1)).min(area.height.saturating_sub(4));
        let popup_area = centered(area, popup_width, popup_height);

        // Clear the area behind the popup first
        frame.render_widget(Clear, popup_area);

        let error_widget = Paragraph::new(error_msg.to_string())
            .style(Style::default().fg(Color::Red))
            .wrap(ratatui::widgets::Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red))
                    .title(" Error (Esc to dismiss) ")
                    .title_style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
                    .style(Style::default().bg(Color::Black)),
            );

        frame.render_widget(error_widget, popup_area);
    }
}

pub fn render_playlist_picker(frame: &mut Frame, picker: &PlaylistPicker, playlists: &[Playlist]) {
    let area = frame.area();

    let mut names: Vec<String> = playlists.iter().map(|p| p.name.clone()).collect();
    names.push("+ New playlist".to_string());

    let max_name_len = names.iter().map(|n| n.chars().count() + 4).max().unwrap_or(30);
    let popup_width = (max_name_len as u16 + 6).clamp(35, 60);
    let popup_height = (names.len() as u16 + 2).clamp(5, area.height.saturating_sub(4).max(5));
    let popup_area = centered(area, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let items: Vec<ListItem> = names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let style = if i == picker.selected {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Green)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(name).style(style)
        })
        .collect();

    let title = format!(" Add \"{}\" to (↑↓ Enter Esc) ", picker.track.title);
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(title)
            .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .style(Style::default().bg(Color::Black)),
    );

    let mut list_state = ListState::default();
    list_state.select(Some(picker.selected));

    frame.render_stateful_widget(list, popup_area, &mut list_state);
}

pub fn render_name_prompt(frame: &mut Frame, prompt: &NamePrompt) {
    let popup_area = centered(frame.area(), 50, 3);
    frame.render_widget(Clear, popup_area);

    let title = match prompt.mode {
        NamePromptMode::Create { .. } => " New playlist (Enter to save, Esc to cancel) ",
        NamePromptMode::Rename { .. } => " Rename playlist (Enter to save, Esc to cancel) ",
    };
    let input = Paragraph::new(format!("{}█", prompt.text))
        .style(Style::default().fg(Color::Green))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(title)
                .style(Style::default().bg(Color::Black)),
        );
    frame.render_widget(input, popup_area);
}

pub fn render_help_popup(frame: &mut Frame) {
    let area = frame.area();

    // Define keybindings organized by category
    let keybindings = [
        ("", "── Navigation ──"),
        ("Tab / Shift+Tab", "Switch tabs"),
        ("↑ / ↓", "Move selection (↓ at the end loads more)"),
        ("Enter", "Play / Open"),
        ("Esc", "Go back"),
        ("/", "Search"),
        ("", ""),
        ("", "── Playback ──"),
        ("Space", "Play / Pause"),
        ("N / P", "Next / Previous track"),
        ("← / →", "Seek -5s / +5s"),
        ("S", "Scrub mode (←→ move, Enter commit, Esc cancel)"),
        ("+ / -", "Volume up / down"),
        ("M", "Maximize / minimize player"),
        ("X", "Close player"),
        ("", ""),
        ("", "── Library ──"),
        ("L", "Like / Unlike track"),
        ("A", "Add to playlist"),
        ("C / R / D", "Create / rename / delete playlist"),
        ("D", "Remove track (inside a playlist)"),
        ("", ""),
        ("", "── General ──"),
        ("H", "Toggle this help"),
        ("Q", "Quit"),
    ];

    let popup_height = (keybindings.len() as u16 + 2).min(area.height.saturating_sub(4));
    let popup_area = centered(area, 72, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let lines: Vec<Line> = keybindings
        .iter()
        .map(|(key, desc)| {
            if key.is_empty() {
                // Section header or empty line
                Line::from(Span::styled(
                    format!("{:^44}", desc),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(vec![
                    Span::styled(
                        format!("{:>16}", key),
                        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw("  "),
                    Span::styled(desc.to_string(), Style::default().fg(Color::White)),
                ])
            }
        })
        .collect();

    let help_text = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Help (H or Esc to close) ")
                .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
                .style(Style::default().bg(Color::Black)),
        )
        .style(Style::default().bg(Color::Black));

    frame.render_widget(help_text, popup_area);
}
