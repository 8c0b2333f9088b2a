use clap::Parser;
use demoreel::config::{ConfigManager, FileWatcher, RemoteConfig};
use demoreel::control::{Command, Controller};
use demoreel::display::{Display, InputEvent, RenderTarget, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use demoreel::engine::Engine;
use demoreel::mqtt::{ConfigFeed, DEFAULT_TOPIC};
use env_logger::Env;
use log::{error, info, warn};
use sdl2::keyboard::Keycode;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// How long to block on input per loop while the window is hidden
const HIDDEN_WAIT_MS: u32 = 100;

#[derive(Parser, Debug)]
#[command(name = "demoreel", version, about = "Rotating demoscene effects display")]
struct Cli {
    /// Window width
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    width: u32,

    /// Window height
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    height: u32,

    /// Disable VSync for an uncapped framerate
    #[arg(long)]
    no_vsync: bool,

    /// Start in a window instead of fullscreen
    #[arg(long)]
    windowed: bool,

    /// Configuration JSON; re-read every --poll-secs
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds between configuration file reloads
    #[arg(long, default_value_t = 30)]
    poll_secs: u64,

    /// MQTT broker (host or host:port) publishing configuration snapshots
    #[arg(long)]
    mqtt_host: Option<String>,

    #[arg(long, default_value = DEFAULT_TOPIC)]
    mqtt_topic: String,

    /// Unix socket accepting next/prev/fullscreen/quit
    #[arg(long)]
    control_socket: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        },
    }
}

fn key_command(key: Keycode) -> Option<Command> {
    match key {
        Keycode::Right => Some(Command::Next),
        Keycode::Left => Some(Command::Previous),
        Keycode::F => Some(Command::ToggleFullscreen),
        Keycode::Escape => Some(Command::Quit),
        _ => None,
    }
}

/// Apply one manual control; returns false on quit
fn handle_command(command: Command, engine: &mut Engine, display: &mut Display) -> bool {
    match command {
        Command::Next => engine.next(),
        Command::Previous => engine.previous(),
        Command::ToggleFullscreen => {
            if let Err(e) = display.toggle_fullscreen() {
                warn!("Fullscreen toggle failed: {:#}", e);
            }
        },
        Command::Quit => return false,
    }
    true
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => RemoteConfig::load(path)?,
        None => RemoteConfig::builtin(),
    };
    let mut manager = ConfigManager::new(&config);

    let (config_tx, config_rx) = mpsc::channel();
    let _watcher = cli.config.as_ref().map(|path| {
        FileWatcher::spawn(
            path.clone(),
            Duration::from_secs(cli.poll_secs.max(1)),
            config_tx.clone(),
        )
    });
    let _feed = cli.mqtt_host.as_deref().and_then(|host| {
        ConfigFeed::connect(host, &cli.mqtt_topic, config_tx.clone())
            .map_err(|e| warn!("MQTT disabled: {:#}", e))
            .ok()
    });
    drop(config_tx);

    let controller = cli.control_socket.as_ref().and_then(|path| {
        Controller::bind(path)
            .map_err(|e| warn!("Control socket disabled: {:#}", e))
            .ok()
    });

    let (mut display, texture_creator) =
        Display::with_options("demoreel", cli.width, cli.height, !cli.no_vsync, !cli.windowed)?;
    let (vw, vh) = display.viewport();
    let mut engine = Engine::new(&config, vw, vh)?;
    let (w, h) = engine.size();
    let mut target = RenderTarget::with_size(&texture_creator, w, h)?;

    info!("Viewport {}x{}, rendering at {}x{}", vw, vh, w, h);
    info!("Controls: Left/Right switch effect, F fullscreen, Escape quit");

    'main: loop {
        let mut events = display.poll_events();
        if !engine.is_visible() && events.is_empty() {
            events.extend(display.wait_event(HIDDEN_WAIT_MS));
        }

        for event in events {
            match event {
                InputEvent::Quit => break 'main,
                InputEvent::KeyDown(key) => {
                    if let Some(command) = key_command(key) {
                        if !handle_command(command, &mut engine, &mut display) {
                            break 'main;
                        }
                    }
                },
                InputEvent::Resized { .. } => {
                    let (w, h) = display.viewport();
                    engine.on_resize(Instant::now(), w, h);
                },
                InputEvent::Hidden => engine.set_visible(false),
                InputEvent::Shown => engine.set_visible(true),
            }
        }

        if let Some(controller) = &controller {
            for command in controller.poll() {
                if !handle_command(command, &mut engine, &mut display) {
                    break 'main;
                }
            }
        }

        for (source, candidate) in config_rx.try_iter() {
            if let Some(config) = manager.accept(source, candidate) {
                engine.apply_config(&config);
            }
        }

        if !engine.is_visible() {
            continue;
        }

        let mut screen = display.screen(&mut target);
        if let Err(e) = engine.tick(Instant::now(), &mut screen) {
            warn!("Frame dropped: {:#}", e);
        }
    }

    engine.stop();
    Ok(())
}
