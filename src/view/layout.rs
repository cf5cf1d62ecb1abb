//! Layout rendering (top bar with tabs and search)

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};
use ratatui::widgets::Padding;

use crate::audio::DEVICE_NAME;
use crate::model::{ActiveTab, ContentState, Page};

const TABS: [ActiveTab; 3] = [ActiveTab::Home, ActiveTab::Search, ActiveTab::Settings];

pub fn render_top_bar(frame: &mut Frame, area: Rect, content: &ContentState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(34), // Tabs
            Constraint::Min(0),     // Search input
            Constraint::Length(18), // Device name
        ])
        .split(area);

    let selected = TABS.iter().position(|t| *t == content.tab).unwrap_or(0);
    let tabs = Tabs::new(TABS.iter().map(|t| t.title()))
        .select(selected)
        .style(Style::default().fg(Color::White))
        .highlight_style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL).title(page_title(content.page)));
    frame.render_widget(tabs, chunks[0]);

    let search_style = if content.search_editing {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::White)
    };

    let search_text = if content.search_query.is_empty() && !content.search_editing {
        "Press / to search..."
    } else {
        &content.search_query
    };

    let search = Paragraph::new(search_text)
        .style(search_style)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Search ")
                .padding(Padding::horizontal(1))
                .border_style(search_style),
        );
    frame.render_widget(search, chunks[1]);

    let device = Paragraph::new(format!("🎵 {}", DEVICE_NAME))
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL).title(" Device "));
    frame.render_widget(device, chunks[2]);
}

fn page_title(page: Page) -> &'static str {
    match page {
        Page::Main => " tunebox ",
        Page::Playlists => " Playlists ",
        Page::Liked => " Liked songs ",
    }
}
