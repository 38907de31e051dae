use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use strum::IntoEnumIterator;

use crate::{
    router::{Router, View},
    state::AppState,
};

/// Draw the TUI interface
pub fn draw(f: &mut Frame, state: &AppState, router: &Router) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1), // View tabs
            Constraint::Min(0),    // Route content
            Constraint::Length(3), // Controls info
            Constraint::Length(3), // Status bar
        ])
        .split(f.area());

    draw_tabs(f, chunks[0], router);
    router.current().render(f, chunks[1], state);
    draw_controls(f, chunks[2], state, router);
    draw_status(f, chunks[3], state);
}

fn draw_tabs(f: &mut Frame, area: Rect, router: &Router) {
    let active = router.current().view();
    let spans: Vec<Span> = View::iter()
        .map(|view| {
            let (prefix, style) = if view == active {
                (
                    "▶ ",
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                ("  ", Style::default().fg(Color::Gray))
            };
            Span::styled(format!("{}{}  ", prefix, view), style)
        })
        .collect();

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Draw the controls help section
fn draw_controls(f: &mut Frame, area: Rect, state: &AppState, router: &Router) {
    let controls: Vec<Span> = router
        .current()
        .help_items(state)
        .into_iter()
        .flat_map(|(key, action)| {
            let key_style = match key {
                "Q" => Style::default().fg(Color::Red),
                "Tab" => Style::default().fg(Color::Magenta),
                _ => Style::default().fg(Color::Yellow),
            };
            [
                Span::styled(format!("[{}]", key), key_style),
                Span::raw(format!(" {}  ", action)),
            ]
        })
        .collect();

    let paragraph = Paragraph::new(Line::from(controls))
        .block(Block::default().borders(Borders::ALL).title(" Controls "));

    f.render_widget(paragraph, area);
}

/// Draw the status section
fn draw_status(f: &mut Frame, area: Rect, state: &AppState) {
    let (status_style, link) = if !state.is_connected() {
        (Style::default().fg(Color::Red), "● Disconnected – reconnecting")
    } else if state.is_playing() {
        (Style::default().fg(Color::Green), "● Connected")
    } else {
        (Style::default().fg(Color::Yellow), "● Connected")
    };

    let status_text = format!("{}  |  {}", link, state.status_message);

    let paragraph = Paragraph::new(status_text)
        .style(status_style)
        .block(Block::default().borders(Borders::ALL).title(" Status "));

    f.render_widget(paragraph, area);
}
