use crate::model::{PaneInfo, PaneRecord};
use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;

/// Common tmux installation paths
const TMUX_PATHS: &[&str] = &[
	"/opt/homebrew/bin/tmux", // Apple Silicon Homebrew
	"/usr/local/bin/tmux",    // Intel Homebrew
	"/usr/bin/tmux",          // System
	"/bin/tmux",              // Fallback
];

/// Cached tmux path - found once at startup
static TMUX_PATH: OnceLock<String> = OnceLock::new();

/// Find tmux binary, checking common locations if not in PATH
pub fn find_tmux() -> &'static str {
	TMUX_PATH.get_or_init(|| {
		if let Ok(output) = Command::new("which").arg("tmux").output() {
			if output.status.success() {
				let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
				if !path.is_empty() && Path::new(&path).exists() {
					return path;
				}
			}
		}

		for path in TMUX_PATHS {
			if Path::new(path).exists() {
				return path.to_string();
			}
		}

		"tmux".to_string()
	})
}

fn tmux_cmd() -> Command {
	Command::new(find_tmux())
}

/// All running sessions. No server running is not an error: the list is empty.
pub fn list_sessions() -> Result<Vec<String>> {
	let output = tmux_cmd()
		.arg("list-sessions")
		.arg("-F")
		.arg("#{session_name}")
		.output();

	let output = match output {
		Ok(out) => out,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
			return Err(anyhow::anyhow!(
				"tmux not found. Install it with your package manager\nSearched: {:?}",
				TMUX_PATHS
			));
		}
		Err(e) => return Err(e.into()),
	};

	if !output.status.success() {
		return Ok(vec![]);
	}

	let stdout = String::from_utf8_lossy(&output.stdout);
	Ok(stdout
		.lines()
		.map(str::trim)
		.filter(|line| !line.is_empty())
		.map(str::to_string)
		.collect())
}

pub fn list_all_panes() -> Result<Vec<PaneRecord>> {
	let output = tmux_cmd()
		.arg("list-panes")
		.arg("-a")
		.arg("-F")
		.arg("#{session_name} #{pane_tty} #{pane_index}")
		.output()
		.context("failed to list panes")?;

	if !output.status.success() {
		return Err(anyhow::anyhow!(
			"tmux list-panes failed: {}",
			String::from_utf8_lossy(&output.stderr)
		));
	}

	Ok(parse_pane_records(&String::from_utf8_lossy(&output.stdout)))
}

/// Parse `#{session_name} #{pane_tty} #{pane_index}` rows. Session names may
/// contain spaces, so the last two fields are taken from the right.
pub fn parse_pane_records(stdout: &str) -> Vec<PaneRecord> {
	stdout
		.lines()
		.filter_map(|line| {
			let mut fields = line.trim().rsplitn(3, ' ');
			let index = fields.next()?.parse::<usize>().ok()?;
			let tty = fields.next()?.to_string();
			let session = fields.next()?.to_string();
			Some(PaneRecord { session, tty, index })
		})
		.collect()
}

pub fn session_panes(session: &str) -> Result<Vec<PaneInfo>> {
	let output = tmux_cmd()
		.arg("list-panes")
		.arg("-t")
		.arg(session)
		.arg("-F")
		.arg("#{pane_index}")
		.output()
		.with_context(|| format!("failed to list panes of {session}"))?;

	if !output.status.success() {
		return Ok(vec![]);
	}

	let stdout = String::from_utf8_lossy(&output.stdout);
	Ok(stdout
		.lines()
		.filter_map(|l| l.trim().parse::<usize>().ok())
		.map(|index| PaneInfo {
			index,
			content: String::new(),
		})
		.collect())
}

pub fn capture_pane(
	session: &str,
	pane: Option<usize>,
	lines: usize,
	keep_ansi: bool,
) -> Result<String> {
	let target = match pane {
		Some(index) => format!("{session}:.{index}"),
		None => session.to_string(),
	};
	let mut cmd = tmux_cmd();
	cmd.arg("capture-pane").arg("-t").arg(&target).arg("-p");
	if keep_ansi {
		cmd.arg("-e");
	}
	let output = cmd
		.arg("-S")
		.arg(format!("-{lines}"))
		.output()
		.context("failed to capture pane")?;

	if !output.status.success() {
		return Err(anyhow::anyhow!(
			"tmux capture-pane failed for {}: {}",
			target,
			String::from_utf8_lossy(&output.stderr)
		));
	}

	Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

pub fn kill_session(session: &str) -> Result<()> {
	let status = tmux_cmd()
		.arg("kill-session")
		.arg("-t")
		.arg(session)
		.status()
		.with_context(|| format!("failed to kill session {}", session))?;
	if !status.success() {
		return Err(anyhow::anyhow!(
			"tmux kill-session failed for {} (status {})",
			session,
			status
		));
	}
	Ok(())
}

/// Arguments that hand the terminal to `session`: switch the current client
/// when already inside tmux, otherwise attach.
pub fn attach_args(session: &str, inside_tmux: bool) -> [String; 3] {
	let verb = if inside_tmux {
		"switch-client"
	} else {
		"attach-session"
	};
	[verb.to_string(), "-t".to_string(), session.to_string()]
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_pane_records() {
		let out = "api-server /dev/ttys044 0\napi-server /dev/ttys045 1\nmy notes /dev/pts/3 2\ngarbage\n";
		let rows = parse_pane_records(out);
		assert_eq!(rows.len(), 3);
		assert_eq!(
			rows[0],
			PaneRecord {
				session: "api-server".to_string(),
				tty: "/dev/ttys044".to_string(),
				index: 0,
			}
		);
		assert_eq!(rows[2].session, "my notes");
		assert_eq!(rows[2].tty, "/dev/pts/3");
		assert_eq!(rows[2].index, 2);
	}

	#[test]
	fn test_attach_args() {
		assert_eq!(attach_args("web", true)[0], "switch-client");
		assert_eq!(attach_args("web", false)[0], "attach-session");
		assert_eq!(attach_args("web", false)[2], "web");
	}
}
