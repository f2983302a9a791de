mod app;
mod art;
mod capture;
mod config;
mod detection;
mod env;
mod error;
mod event;
mod launcher;
mod layouts;
mod model;
mod repository;
mod tmux;
mod ui;
mod worktree;

use anyhow::{Context, Result};
use app::DashboardState;
use clap::{Parser, Subcommand};
use config::Config;
use crossterm::{
	execute,
	terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use env::{Environment, SystemEnv};
use event::{Dashboard, Timing};
use launcher::Launch;
use repository::SessionRepository;
use std::fs::File;
use std::io::{stdout, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use ui::Theme;

/// Log file path. Logging is off unless this is set.
const LOG_ENV: &str = "WARPP_LOG";

#[derive(Parser)]
#[command(name = "warpp", version)]
#[command(about = "Warp into your tmux sessions")]
struct Cli {
	/// Create a new session in the current directory
	#[arg(short, long, default_value_t = false)]
	new: bool,
	#[command(subcommand)]
	command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
	/// Show the config file location and effective settings
	Config,
	/// Write the default config file
	InitConfig,
	/// Print the configured header art
	TestAscii,
	/// Print JSON for every session and layout
	Status,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	init_logging()?;

	match cli.command {
		Some(Commands::Config) => show_config(),
		Some(Commands::InitConfig) => {
			let path = config::init()?;
			println!("Wrote default config to {}", path.display());
			Ok(())
		}
		Some(Commands::TestAscii) => {
			let cfg = load_config_or_default();
			let frames = art::frames(&cfg.general.ascii_art);
			println!(
				"Testing ASCII art: {} ({} frames)",
				cfg.general.ascii_art,
				frames.len()
			);
			println!("Frame 1:");
			println!("{}", frames.first().map(String::as_str).unwrap_or(""));
			println!();
			println!("Available: {}", art::STYLES.join(", "));
			Ok(())
		}
		Some(Commands::Status) => {
			let cfg = load_config_or_default();
			let repo = repository(&cfg);
			let sessions = event::load_listing(&repo, &cfg.agent)?;
			println!("{}", serde_json::to_string_pretty(&sessions)?);
			Ok(())
		}
		None if cli.new => {
			let cwd = std::env::current_dir().context("failed to read current directory")?;
			launcher::exec(&Launch::new_here(&cwd))
		}
		None => run_tui().await,
	}
}

fn init_logging() -> Result<()> {
	let Some(path) = std::env::var_os(LOG_ENV) else {
		return Ok(());
	};
	let log_file = File::create(&path)
		.with_context(|| format!("failed to create log file {}", path.to_string_lossy()))?;
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warpp=info"));
	tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer().with_writer(Mutex::new(log_file)).with_ansi(false))
		.init();
	Ok(())
}

/// The dashboard keeps working on a broken config file.
fn load_config_or_default() -> Config {
	match config::load() {
		Ok(cfg) => cfg,
		Err(e) => {
			eprintln!("warning: {e:#}; using default settings");
			tracing::warn!(error = %e, "config load failed, using defaults");
			Config::default()
		}
	}
}

fn show_config() -> Result<()> {
	let path = config::config_path()?;
	let cfg = config::load()?;
	let status = if path.exists() { "" } else { " (not created, showing defaults)" };
	println!("Config file: {}{}", path.display(), status);
	println!("Layouts: {}", cfg.layouts_dir().display());
	println!();
	print!("{}", toml::to_string_pretty(&cfg)?);
	Ok(())
}

fn repository(cfg: &Config) -> Arc<SessionRepository> {
	let env: Arc<dyn Environment> = Arc::new(SystemEnv);
	Arc::new(SessionRepository::new(env, cfg.layouts_dir()))
}

async fn run_tui() -> Result<()> {
	let cfg = load_config_or_default();
	let repo = repository(&cfg);
	let art = art::frames(&cfg.general.ascii_art);
	let cwd = std::env::current_dir().context("failed to read current directory")?;
	let state = DashboardState::new(repo.clone(), art.len(), cwd);
	let mut dashboard = Dashboard::new(
		state,
		repo,
		cfg.agent.clone(),
		Theme::named(&cfg.general.theme),
		art,
	);
	let timing = Timing {
		tick: Duration::from_millis(cfg.general.tick_ms),
		refresh: Duration::from_millis(cfg.general.refresh_interval_ms),
	};

	enable_raw_mode()?;
	let mut stdout_handle = stdout();
	execute!(stdout_handle, EnterAlternateScreen)?;
	let backend = ratatui::backend::CrosstermBackend::new(stdout_handle);
	let mut terminal = ratatui::Terminal::new(backend)?;

	let result = dashboard.run(&mut terminal, timing).await;
	teardown_terminal()?;

	match result? {
		Some(launch) => launcher::exec(&launch),
		None => {
			let mut out = stdout();
			write!(out, "\x1b[H\x1b[2J")?;
			out.flush()?;
			Ok(())
		}
	}
}

fn teardown_terminal() -> Result<()> {
	disable_raw_mode()?;
	execute!(stdout(), LeaveAlternateScreen)?;
	Ok(())
}
