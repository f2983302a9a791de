use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const DEFAULT_CONFIG: &str = r#"
[general]
layouts_dir = "~/.tmuxifier/layouts"
theme = "default"
ascii_art = "fire"
tick_ms = 120
refresh_interval_ms = 2000

[agent]
binary = "claude"
exclude = ["Claude.app", "grep"]
executing_marker = "(esc to interrupt"
scan_lines = 15
"#;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
	#[serde(default)]
	pub general: General,
	#[serde(default)]
	pub agent: AgentSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct General {
	#[serde(default = "default_layouts_dir")]
	pub layouts_dir: String,
	#[serde(default = "default_theme")]
	pub theme: String, // "default", "carbonfox", "kanagawa"
	#[serde(default = "default_ascii_art")]
	pub ascii_art: String, // "fire", "blocks", "minimal"
	#[serde(default = "default_tick_ms")]
	pub tick_ms: u64,
	#[serde(default = "default_refresh_interval_ms")]
	pub refresh_interval_ms: u64,
}

/// What the process inspector looks for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
	#[serde(default = "default_binary")]
	pub binary: String,
	/// Process lines containing any of these are not the agent.
	#[serde(default = "default_exclude")]
	pub exclude: Vec<String>,
	/// Only visible while the agent is streaming output.
	#[serde(default = "default_executing_marker")]
	pub executing_marker: String,
	#[serde(default = "default_scan_lines")]
	pub scan_lines: usize,
}

impl Default for General {
	fn default() -> Self {
		Self {
			layouts_dir: default_layouts_dir(),
			theme: default_theme(),
			ascii_art: default_ascii_art(),
			tick_ms: default_tick_ms(),
			refresh_interval_ms: default_refresh_interval_ms(),
		}
	}
}

impl Default for AgentSettings {
	fn default() -> Self {
		Self {
			binary: default_binary(),
			exclude: default_exclude(),
			executing_marker: default_executing_marker(),
			scan_lines: default_scan_lines(),
		}
	}
}

fn default_layouts_dir() -> String {
	"~/.tmuxifier/layouts".to_string()
}

fn default_theme() -> String {
	"default".to_string()
}

fn default_ascii_art() -> String {
	"fire".to_string()
}

fn default_tick_ms() -> u64 {
	120
}

fn default_refresh_interval_ms() -> u64 {
	2000
}

fn default_binary() -> String {
	"claude".to_string()
}

fn default_exclude() -> Vec<String> {
	vec!["Claude.app".to_string(), "grep".to_string()]
}

fn default_executing_marker() -> String {
	"(esc to interrupt".to_string()
}

fn default_scan_lines() -> usize {
	15
}

impl Config {
	pub fn layouts_dir(&self) -> PathBuf {
		PathBuf::from(expand_path(&self.general.layouts_dir))
	}
}

pub fn config_path() -> Result<PathBuf> {
	dirs::home_dir()
		.map(|p| p.join(".config").join("warpp").join("config.toml"))
		.ok_or_else(|| anyhow::anyhow!("Failed to resolve home directory"))
}

/// Load the config file. A missing file yields the defaults.
pub fn load() -> Result<Config> {
	let path = config_path()?;
	if !path.exists() {
		return Ok(Config::default());
	}
	let content = fs::read_to_string(&path)
		.with_context(|| format!("failed to read {}", path.display()))?;
	parse(&content).with_context(|| format!("invalid config in {}", path.display()))
}

pub fn parse(content: &str) -> Result<Config> {
	Ok(toml::from_str(content)?)
}

/// Write the default config file and return where it went.
pub fn init() -> Result<PathBuf> {
	let path = config_path()?;
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent)?;
	}
	fs::write(&path, DEFAULT_CONFIG.trim_start())
		.with_context(|| format!("failed to write {}", path.display()))?;
	Ok(path)
}

/// Expand a leading `~` to the home directory.
pub fn expand_path(input: &str) -> String {
	if let Some(home) = dirs::home_dir() {
		if input == "~" {
			return home.to_string_lossy().into_owned();
		}
		if let Some(rest) = input.strip_prefix("~/") {
			return home.join(rest).to_string_lossy().into_owned();
		}
	}
	input.to_string()
}
