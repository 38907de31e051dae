use anyhow::Result;
use incallide_core::client::ClientHandle;
use ratatui::{Frame, crossterm::event::KeyCode, layout::Rect};
use strum::IntoEnumIterator;

use crate::{
    routes::{log::LogRoute, playback::PlaybackRoute},
    state::AppState,
};

/// Views reachable with Tab, in cycle order
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
pub enum View {
    #[strum(serialize = "Now Playing")]
    Playback,
    Log,
}

impl View {
    pub fn next(self) -> View {
        let views: Vec<View> = View::iter().collect();
        let index = views.iter().position(|v| *v == self).unwrap_or(0);
        views[(index + 1) % views.len()]
    }

    pub fn route(self) -> Box<dyn RouteHandler> {
        match self {
            View::Playback => Box::new(PlaybackRoute),
            View::Log => Box::new(LogRoute),
        }
    }
}

/// Trait that all routes must implement
pub trait RouteHandler: std::fmt::Debug {
    /// Render this route's UI
    fn render(&self, frame: &mut Frame, area: Rect, state: &AppState);

    /// Handle keys the global bindings did not consume
    fn handle_input(
        &mut self,
        _key: KeyCode,
        _state: &mut AppState,
        _handle: &ClientHandle,
    ) -> Result<RouteAction> {
        Ok(RouteAction::None)
    }

    fn view(&self) -> View;

    fn help_items(&self, _state: &AppState) -> Vec<(&str, &str)> {
        vec![("Tab", "Switch View"), ("Q", "Quit")]
    }
}

/// Actions that can be returned from route handlers
#[derive(Debug)]
pub enum RouteAction {
    /// Do nothing, stay on current route
    None,
    /// Replace current route with a new one
    Replace(Box<dyn RouteHandler>),
    /// Quit the application
    Quit,
}

/// Holds the active view
pub struct Router {
    current: Box<dyn RouteHandler>,
}

impl Router {
    pub fn new(initial_route: Box<dyn RouteHandler>) -> Self {
        Self {
            current: initial_route,
        }
    }

    pub fn current(&self) -> &dyn RouteHandler {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> &mut Box<dyn RouteHandler> {
        &mut self.current
    }

    /// Execute a route action, returns true when the app should quit
    pub fn execute_action(&mut self, action: RouteAction) -> bool {
        match action {
            RouteAction::None => false,
            RouteAction::Replace(route) => {
                self.replace(route);
                false
            }
            RouteAction::Quit => true,
        }
    }

    pub fn replace(&mut self, route: Box<dyn RouteHandler>) {
        log::debug!("Switching to {} view", route.view());
        self.current = route;
    }
}
