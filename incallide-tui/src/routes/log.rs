use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders},
};
use tui_logger::TuiLoggerWidget;

use crate::{
    router::{RouteHandler, View},
    state::AppState,
};

/// Log records routed through tui-logger
#[derive(Debug, Clone)]
pub struct LogRoute;

impl RouteHandler for LogRoute {
    fn render(&self, frame: &mut Frame, area: Rect, _state: &AppState) {
        let log_widget = TuiLoggerWidget::default()
            .block(
                Block::default()
                    .title(" 📋 Log ")
                    .borders(Borders::ALL)
                    .border_style(
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ),
            )
            .style(Style::default().fg(Color::White));

        frame.render_widget(log_widget, area);
    }

    fn view(&self) -> View {
        View::Log
    }
}
