use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use incallide_core::{
    bridge::CommandBridge,
    commands::Command,
    config::{Config, SurfacePreference},
    engine::HostEngine,
    reconnect::ReconnectPolicy,
    relay::{RelayHub, RelayServer, pump_outbound},
    surface::{
        Capabilities, select_surface,
        applescript::{HostApp, SystemEventsKeys, WindowTitleProbe},
        demo::DemoPlayer,
    },
    watchdog::{AppWatchdog, WATCH_INTERVAL},
};

mod media_keys;

#[derive(Parser, Debug)]
#[command(name = "incallide-bridge", version, about = "Relay between the host player and terminal clients")]
struct Args {
    /// Config file (defaults to ~/.config/incallide/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Control surface: auto, native, scrape or keys
    #[arg(long)]
    surface: Option<SurfacePreference>,

    /// Use the built-in demo player as the native API
    #[arg(long)]
    demo: bool,

    /// Launch the host app if it is installed but not running
    #[arg(long)]
    auto_launch: bool,

    /// Do not capture the system media keys
    #[arg(long)]
    no_media_keys: bool,

    /// Verbose logging
    #[arg(long)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = load_config(&args)?;
    let bind_addr = config.bind_addr()?;
    let (caps, app) = detect_capabilities(&args, &config);
    let surface = select_surface(caps, config.surface, config.volume_step)
        .context("No usable control surface")?;

    let mut bridge = CommandBridge::new(config.volume_step);
    bridge.add_observer(Box::new(log_command));

    let (engine, handle, out_rx) = HostEngine::new(surface, bridge, config.poll_interval());
    let worker = engine.spawn().context("Failed to start host engine")?;

    let watchdog = match app {
        Some(app) => Some(
            AppWatchdog::new(app, args.auto_launch)
                .spawn(WATCH_INTERVAL)
                .context("Failed to start app watchdog")?,
        ),
        None => None,
    };
    let key_source = if args.no_media_keys {
        None
    } else {
        media_keys::start(handle.clone())
    };

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    let hub = RelayHub::new();
    let server = RelayServer::new(hub.clone(), handle.clone());
    let policy = ReconnectPolicy::fixed(config.reconnect_delay());
    let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);

    runtime.spawn(pump_outbound(hub, out_rx));
    runtime.spawn(server.run(bind_addr, policy));
    runtime.spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => log::info!("Shutting down"),
            Err(err) => log::error!("Cannot listen for ctrl-c: {}", err),
        }
        let _ = stop_tx.send(());
    });

    // media key callbacks are delivered on the main thread
    media_keys::run_until(&stop_rx);
    drop(key_source);

    if let Some(watchdog) = watchdog {
        watchdog.stop();
    }
    handle.shutdown();
    match worker.join() {
        Ok(stats) => log::info!(
            "Handled {} commands ({} failed)",
            stats.handled,
            stats.failed
        ),
        Err(_) => log::error!("Host engine panicked"),
    }
    runtime.shutdown_background();

    Ok(())
}

fn log_command(command: &Command) {
    log::info!("Command: {}", command);
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(&path)?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(surface) = args.surface {
        config.surface = surface;
    }
    Ok(config)
}

/// Find what is available for talking to the host player on this machine,
/// along with the host app to watch when there is one
fn detect_capabilities(args: &Args, config: &Config) -> (Capabilities, Option<HostApp>) {
    if args.demo {
        log::info!("Using the built-in demo player");
        return (Capabilities::with_native(Arc::new(DemoPlayer::new())), None);
    }

    let Some(app) = HostApp::detect(config.app_name.as_deref()) else {
        log::warn!("Host app not found in /Applications or ~/Applications");
        return (Capabilities::default(), None);
    };
    log::info!("Found host app {}", app.name);

    let caps = Capabilities {
        native: None,
        probe: Some(Box::new(WindowTitleProbe::new(app.clone()))),
        keys: Some(Box::new(SystemEventsKeys::new(app.clone()))),
    };
    (caps, Some(app))
}
