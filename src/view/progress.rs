//! Player rendering: the minimized progress bar and the maximized panel

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::model::{format_count, PlaybackInfo, SessionState};
use super::utils::format_duration;

fn status_text(playback: &PlaybackInfo) -> String {
    let Some(track) = &playback.track else {
        return " No track playing".to_string();
    };
    let icon = match (playback.state, playback.is_playing) {
        (SessionState::Loading, _) => "…",
        (_, true) => "▶",
        (_, false) => "⏸",
    };
    match &track.album {
        Some(album) => format!(" {} {} | {} ({})", icon, track.title, track.artist, album),
        None => format!(" {} {} | {}", icon, track.title, track.artist),
    }
}

fn progress_ratio(playback: &PlaybackInfo) -> f64 {
    if playback.duration_seconds > 0.0 {
        (playback.elapsed_seconds / playback.duration_seconds).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn time_label(playback: &PlaybackInfo) -> String {
    let scrub = if playback.is_scrubbing { "⇆ " } else { "" };
    format!(
        "{}{} / {}",
        scrub,
        format_duration(playback.elapsed_seconds),
        format_duration(playback.duration_seconds)
    )
}

fn progress_gauge(playback: &PlaybackInfo, title: String, footer: String) -> Gauge<'static> {
    let color = if playback.is_scrubbing { Color::Yellow } else { Color::Green };
    Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .title_bottom(Line::from(footer).right_aligned()),
        )
        .gauge_style(Style::default().fg(color))
        .ratio(progress_ratio(playback))
        .label(time_label(playback))
}

pub fn render_progress_bar(frame: &mut Frame, area: Rect, playback: &PlaybackInfo) {
    let liked = match &playback.track {
        Some(track) if track.is_liked => "💚 | ",
        _ => "",
    };
    let controls_info = format!(" {}Vol: {:.0}% ", liked, playback.volume * 100.0);

    let gauge = progress_gauge(playback, format!("{} ", status_text(playback)), controls_info);
    frame.render_widget(gauge, area);
}

pub fn render_maximized_player(frame: &mut Frame, area: Rect, playback: &PlaybackInfo) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(area);

    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let lines: Vec<Line> = match &playback.track {
        Some(track) => vec![
            Line::from(Span::styled(
                track.title.clone(),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )),
            Line::from(vec![Span::styled("Artist:  ", label), Span::raw(track.artist.clone())]),
            Line::from(vec![
                Span::styled("Album:   ", label),
                Span::raw(track.album.clone().unwrap_or_else(|| "-".to_string())),
            ]),
            Line::from(vec![Span::styled("Plays:   ", label), Span::raw(format_count(track.play_count))]),
            Line::from(vec![
                Span::styled("Liked:   ", label),
                Span::raw(if track.is_liked { "💚 yes" } else { "no" }),
            ]),
            Line::from(vec![
                Span::styled("Volume:  ", label),
                Span::raw(format!("{:.0}%", playback.volume * 100.0)),
            ]),
            Line::from(vec![
                Span::styled("Artwork: ", label),
                Span::styled(
                    playback.artwork_url.clone().unwrap_or_else(|| "-".to_string()),
                    Style::default().fg(Color::DarkGray),
                ),
            ]),
        ],
        None => vec![Line::from("No track playing")],
    };

    let details = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Now Playing (M to minimize) ")
            .border_style(Style::default().fg(Color::Green)),
    );
    frame.render_widget(details, chunks[0]);

    let gauge = progress_gauge(playback, format!("{} ", status_text(playback)), String::new());
    frame.render_widget(gauge, chunks[1]);
}
