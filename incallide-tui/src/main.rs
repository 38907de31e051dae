use std::io;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use ratatui::{
    backend::CrosstermBackend,
    crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
};

use incallide_core::{
    client::{ClientHandle, spawn_listener},
    commands::Command,
    config::Config,
    reconnect::ReconnectPolicy,
};

mod router;
mod routes;
mod state;
mod ui;

use router::{RouteAction, Router, View};
use state::AppState;

/// Volume change for one press of `+` or `-`
const VOLUME_KEY_DELTA: i32 = 10;

#[derive(Parser, Debug)]
#[command(name = "incallide-tui", version, about = "Terminal mini player for the host player")]
struct Args {
    /// Config file (defaults to ~/.config/incallide/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Relay host
    #[arg(long)]
    host: Option<String>,

    /// Relay port
    #[arg(long)]
    port: Option<u16>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // stdout belongs to the terminal UI, so records go to the Log view
    tui_logger::init_logger(log::LevelFilter::Debug)
        .map_err(|err| anyhow::anyhow!("Failed to init tui_logger: {:?}", err))?;
    tui_logger::set_default_level(log::LevelFilter::Debug);

    log::info!("Starting incallide");

    let path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(&path)?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    let relay_url = config.relay_url();
    let client = spawn_listener(
        relay_url.clone(),
        ReconnectPolicy::fixed(config.reconnect_delay()),
    )?;

    let result = run_tui(&client, relay_url);

    client.shutdown();
    result
}

fn run_tui(client: &ClientHandle, relay_url: String) -> anyhow::Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut state = AppState::new(relay_url);
    let mut router = Router::new(View::Playback.route());

    let result = event_loop(&mut terminal, client, &mut state, &mut router);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn event_loop(
    terminal: &mut ratatui::Terminal<CrosstermBackend<io::Stdout>>,
    client: &ClientHandle,
    state: &mut AppState,
    router: &mut Router,
) -> anyhow::Result<()> {
    loop {
        // Handle relay events
        while let Ok(event) = client.try_recv() {
            state.handle_event(event);
        }

        terminal.draw(|f| ui::draw(f, state, router))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    let action = handle_global_keys(key.code, state, client, router)?;
                    if router.execute_action(action) {
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Fixed player bindings, the same on every view
fn command_for_key(key: KeyCode) -> Option<Command> {
    match key {
        KeyCode::Char(' ') => Some(Command::PlayPause),
        KeyCode::Char('n') => Some(Command::Next),
        KeyCode::Char('p') => Some(Command::Previous),
        KeyCode::Char('+') => Some(Command::VolumeDelta(VOLUME_KEY_DELTA)),
        KeyCode::Char('-') => Some(Command::VolumeDelta(-VOLUME_KEY_DELTA)),
        _ => None,
    }
}

/// Handle global keys and delegate the rest to the current route
fn handle_global_keys(
    key: KeyCode,
    state: &mut AppState,
    client: &ClientHandle,
    router: &mut Router,
) -> anyhow::Result<RouteAction> {
    match key {
        KeyCode::Char('q') => return Ok(RouteAction::Quit),
        KeyCode::Tab => {
            let next = router.current().view().next();
            return Ok(RouteAction::Replace(next.route()));
        }
        _ => {}
    }

    if let Some(command) = command_for_key(key) {
        if state.is_connected() {
            client.send(command);
            state.status_message = format!("Sent {}", command);
        } else {
            state.status_message = format!("Not connected, {} dropped", command);
        }
        return Ok(RouteAction::None);
    }

    router.current_mut().handle_input(key, state, client)
}
