use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use minigreet::auth::{AuthError, AuthSettings, AuthenticationController};
use minigreet::config::{format_config, Config};
use minigreet::greeter::{ClientError, GreetdBridge};
use minigreet::logging::{init_logging, init_tui_logging, LogConfig, Verbosity};
use minigreet::session::{build_session_ring, DesktopSessionSource};
use minigreet::tui::{self, App, EventHandler, TICK_RATE_MS};
use minigreet::user;

#[derive(Parser)]
#[command(name = "minigreet")]
#[command(version)]
#[command(about = "A minimal single-user greeter for greetd")]
#[command(
    long_about = "A minimal single-user greeter for greetd. Shows a clock until a key is pressed, then asks for the configured user's password and starts the selected session."
)]
struct Cli {
    /// Config file (default: /etc/minigreet/config.toml, then ~/.config/minigreet/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Run the greeter (default)
    Run,
    /// List installed sessions
    Sessions,
    /// Print the effective configuration
    Config,
}

fn session_source(config: &Config) -> DesktopSessionSource {
    DesktopSessionSource::new(
        config.sessions.wayland_dirs.clone(),
        config.sessions.x11_dirs.clone(),
    )
    .with_default_session(config.default_session.clone())
}

fn run_greeter(cli: &Cli, config: Config) -> Result<()> {
    let verbosity = Verbosity::from_occurrences(cli.verbose);
    let log_file = cli.log_file.clone().or_else(|| config.log_file.clone());
    let _guard = init_tui_logging(log_file.as_deref(), verbosity);
    info!("minigreet {} starting", env!("CARGO_PKG_VERSION"));

    let username = config
        .default_user()
        .map(str::to_string)
        .ok_or(AuthError::NoDefaultUser)?;
    let sessions = build_session_ring(&session_source(&config));

    let socket_path = config
        .greetd_socket_path()
        .ok_or(ClientError::SocketNotConfigured)?;
    let events = EventHandler::new(TICK_RATE_MS);
    let bridge = GreetdBridge::connect(socket_path, events.sender())
        .context("Failed to connect to greetd")?
        .with_x11_wrapper(config.sessions.x11_wrapper.clone());

    let mut controller =
        AuthenticationController::new(bridge, sessions, AuthSettings::from_config(&config))?;
    controller
        .start_default_authentication()
        .context("Failed to start authentication")?;

    let display_name = user::pretty_name(&username).unwrap_or(username);
    let mut app = App::new(controller, &config, display_name);

    let mut terminal = tui::init().context("Failed to initialize terminal")?;
    let result = tui::run(&mut terminal, &mut app, &events);
    tui::restore().context("Failed to restore terminal")?;

    result.map_err(|e| anyhow::anyhow!("Greeter failed: {}", e))?;
    info!("minigreet exiting");
    Ok(())
}

fn print_sessions(config: &Config) {
    let ring = build_session_ring(&session_source(config));
    if ring.is_empty() {
        println!("No sessions installed");
        return;
    }

    let cursor = ring.cursor();
    for (index, entry) in ring.iter().enumerate() {
        let marker = if index == cursor { "*" } else { " " };
        let session = entry.value();
        println!(
            "{} {:<20} {:<24} {}",
            marker,
            entry.key(),
            entry.display(),
            session.kind.as_str()
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, source) =
        Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_greeter(&cli, config)?,
        Commands::Sessions => {
            let _guard = init_logging(&LogConfig {
                verbosity: Verbosity::from_occurrences(cli.verbose),
                log_file: cli.log_file.clone(),
            });
            print_sessions(&config);
        }
        Commands::Config => {
            println!("{}", format_config(&config, source.as_deref())?);
        }
    }

    Ok(())
}
