use std::time::Instant;

use incallide_core::track::format_time;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
};

use crate::{
    router::{RouteHandler, View},
    state::AppState,
};

#[derive(Debug, Clone)]
pub struct PlaybackRoute;

impl RouteHandler for PlaybackRoute {
    fn render(&self, frame: &mut Frame, area: Rect, state: &AppState) {
        draw_playback_panel(frame, area, state);
    }

    fn view(&self) -> View {
        View::Playback
    }

    fn help_items(&self, _state: &AppState) -> Vec<(&str, &str)> {
        vec![
            ("Space", "Play/Pause"),
            ("N/P", "Next/Prev"),
            ("+/-", "Volume"),
            ("Tab", "Switch View"),
            ("Q", "Quit"),
        ]
    }
}

/// Draw the playback panel
pub fn draw_playback_panel(f: &mut Frame, area: Rect, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Now playing info
            Constraint::Length(3), // Progress bar
            Constraint::Length(3), // Volume
            Constraint::Min(0),
        ])
        .split(area);

    draw_now_playing(f, chunks[0], state);
    draw_progress(f, chunks[1], state, Instant::now());
    draw_volume(f, chunks[2], state);
}

fn draw_now_playing(f: &mut Frame, area: Rect, state: &AppState) {
    let icon = if state.is_playing() { "▶" } else { "⏸" };
    let block = Block::default()
        .title(format!(" {} Now Playing ", icon))
        .borders(Borders::ALL)
        .border_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );

    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(track) = &state.track else {
        let placeholder = if state.is_connected() {
            "Waiting for the host player..."
        } else {
            "Nothing playing yet"
        };
        let text = Paragraph::new(placeholder).style(Style::default().fg(Color::DarkGray));
        f.render_widget(text, inner);
        return;
    };

    let mut text = vec![
        Line::from(vec![Span::styled(
            track.title.as_str(),
            Style::default().fg(Color::White).bold(),
        )]),
        Line::from(vec![Span::styled(
            track.artist.as_str(),
            Style::default().fg(Color::Gray),
        )]),
        Line::from(vec![Span::styled(
            track.album.as_str(),
            Style::default().fg(Color::DarkGray),
        )]),
    ];
    if let Some(url) = &track.artwork_url {
        text.push(Line::from(vec![Span::styled(
            url.as_str(),
            Style::default().fg(Color::DarkGray).italic(),
        )]));
    }

    f.render_widget(Paragraph::new(text), inner);
}

fn draw_progress(f: &mut Frame, area: Rect, state: &AppState, now: Instant) {
    let progress_pct = (state.progress_at(now) * 100.0) as u16;
    let label = format!(
        "{} / {}",
        format_time(state.position_at(now)),
        format_time(state.duration())
    );

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL))
        .gauge_style(Style::default().fg(Color::Cyan).bg(Color::DarkGray))
        .percent(progress_pct.min(100))
        .label(label);

    f.render_widget(gauge, area);
}

fn draw_volume(f: &mut Frame, area: Rect, state: &AppState) {
    let volume = state.track.as_ref().map_or(0, |t| t.volume).min(100);

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" Volume "))
        .gauge_style(Style::default().fg(Color::Green).bg(Color::DarkGray))
        .percent(u16::from(volume))
        .label(format!("{}%", volume));

    f.render_widget(gauge, area);
}
