//! The external world as seen by the dashboard.
//!
//! Every call that shells out to tmux, `ps` or git goes through [`Environment`],
//! so the inspector, repository and provisioner can be driven by a fake in tests.

use crate::model::{PaneInfo, PaneRecord, ProcessRecord};
use crate::tmux;
use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;

pub trait Environment: Send + Sync {
	/// Names of all running multiplexer sessions.
	fn list_sessions(&self) -> Result<Vec<String>>;

	/// Panes across every session, with their terminal device.
	fn list_panes(&self) -> Result<Vec<PaneRecord>>;

	/// Panes of the active window of `session`. Content is left empty.
	fn session_panes(&self, session: &str) -> Result<Vec<PaneInfo>>;

	/// Last `lines` lines of a pane. `pane = None` targets the active pane.
	fn capture_content(
		&self,
		session: &str,
		pane: Option<usize>,
		lines: usize,
		keep_ansi: bool,
	) -> Result<String>;

	fn kill_session(&self, session: &str) -> Result<()>;

	fn list_processes(&self) -> Result<Vec<ProcessRecord>>;

	fn is_git_repo(&self, path: &Path) -> bool;

	/// Run `git worktree add -b <branch> <target>` inside `base`.
	/// On failure the error holds the tool output.
	fn create_worktree(&self, base: &Path, target: &Path, branch: &str)
		-> std::result::Result<(), String>;
}

/// The real environment: tmux, ps and git on the local machine.
pub struct SystemEnv;

impl Environment for SystemEnv {
	fn list_sessions(&self) -> Result<Vec<String>> {
		tmux::list_sessions()
	}

	fn list_panes(&self) -> Result<Vec<PaneRecord>> {
		tmux::list_all_panes()
	}

	fn session_panes(&self, session: &str) -> Result<Vec<PaneInfo>> {
		tmux::session_panes(session)
	}

	fn capture_content(
		&self,
		session: &str,
		pane: Option<usize>,
		lines: usize,
		keep_ansi: bool,
	) -> Result<String> {
		tmux::capture_pane(session, pane, lines, keep_ansi)
	}

	fn kill_session(&self, session: &str) -> Result<()> {
		tmux::kill_session(session)
	}

	fn list_processes(&self) -> Result<Vec<ProcessRecord>> {
		let output = Command::new("ps")
			.args(["-axo", "tty=,args="])
			.output()
			.context("failed to run ps")?;
		if !output.status.success() {
			return Err(anyhow::anyhow!(
				"ps failed: {}",
				String::from_utf8_lossy(&output.stderr)
			));
		}
		let stdout = String::from_utf8_lossy(&output.stdout);
		Ok(parse_process_table(&stdout))
	}

	fn is_git_repo(&self, path: &Path) -> bool {
		Command::new("git")
			.arg("-C")
			.arg(path)
			.args(["rev-parse", "--git-dir"])
			.output()
			.map(|out| out.status.success())
			.unwrap_or(false)
	}

	fn create_worktree(
		&self,
		base: &Path,
		target: &Path,
		branch: &str,
	) -> std::result::Result<(), String> {
		let output = Command::new("git")
			.arg("-C")
			.arg(base)
			.args(["worktree", "add", "-b", branch])
			.arg(target)
			.output()
			.map_err(|e| format!("failed to run git: {e}"))?;
		if output.status.success() {
			return Ok(());
		}
		let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
		combined.push_str(&String::from_utf8_lossy(&output.stderr));
		Err(combined.trim().to_string())
	}
}

/// Parse `ps -o tty=,args=` output. Rows without a controlling terminal are kept;
/// the inspector filters them out.
pub fn parse_process_table(stdout: &str) -> Vec<ProcessRecord> {
	stdout
		.lines()
		.filter_map(|line| {
			let line = line.trim_start();
			let (tty, command) = line.split_once(char::is_whitespace)?;
			Some(ProcessRecord {
				tty: tty.to_string(),
				command: command.trim().to_string(),
			})
		})
		.collect()
}

#[cfg(test)]
pub mod fake {
	use super::*;
	use std::collections::HashMap;
	use std::path::PathBuf;
	use std::sync::Mutex;

	/// In-memory environment with call recording.
	#[derive(Default)]
	pub struct FakeEnv {
		pub sessions: Vec<String>,
		pub sessions_fail: bool,
		pub panes: Vec<PaneRecord>,
		pub panes_fail: bool,
		pub processes: Vec<ProcessRecord>,
		pub processes_fail: bool,
		/// session -> pane indices of the active window
		pub window_panes: HashMap<String, Vec<usize>>,
		/// (session, pane index) -> captured text
		pub contents: HashMap<(String, usize), String>,
		pub git_repos: Vec<PathBuf>,
		pub worktree_error: Option<String>,
		pub kill_error: Option<String>,
		pub killed: Mutex<Vec<String>>,
		pub worktrees: Mutex<Vec<(PathBuf, PathBuf, String)>>,
	}

	impl Environment for FakeEnv {
		fn list_sessions(&self) -> Result<Vec<String>> {
			if self.sessions_fail {
				anyhow::bail!("no server running");
			}
			Ok(self.sessions.clone())
		}

		fn list_panes(&self) -> Result<Vec<PaneRecord>> {
			if self.panes_fail {
				anyhow::bail!("list-panes failed");
			}
			Ok(self.panes.clone())
		}

		fn session_panes(&self, session: &str) -> Result<Vec<PaneInfo>> {
			Ok(self
				.window_panes
				.get(session)
				.map(|indices| {
					indices
						.iter()
						.map(|&index| PaneInfo {
							index,
							content: String::new(),
						})
						.collect()
				})
				.unwrap_or_default())
		}

		fn capture_content(
			&self,
			session: &str,
			pane: Option<usize>,
			_lines: usize,
			_keep_ansi: bool,
		) -> Result<String> {
			let index = pane.unwrap_or(0);
			Ok(self
				.contents
				.get(&(session.to_string(), index))
				.cloned()
				.unwrap_or_default())
		}

		fn kill_session(&self, session: &str) -> Result<()> {
			if let Some(err) = &self.kill_error {
				anyhow::bail!("{err}");
			}
			if let Ok(mut killed) = self.killed.lock() {
				killed.push(session.to_string());
			}
			Ok(())
		}

		fn list_processes(&self) -> Result<Vec<ProcessRecord>> {
			if self.processes_fail {
				anyhow::bail!("ps failed");
			}
			Ok(self.processes.clone())
		}

		fn is_git_repo(&self, path: &Path) -> bool {
			self.git_repos.iter().any(|p| p == path)
		}

		fn create_worktree(
			&self,
			base: &Path,
			target: &Path,
			branch: &str,
		) -> std::result::Result<(), String> {
			if let Ok(mut calls) = self.worktrees.lock() {
				calls.push((base.to_path_buf(), target.to_path_buf(), branch.to_string()));
			}
			match &self.worktree_error {
				Some(err) => Err(err.clone()),
				None => Ok(()),
			}
		}
	}

	impl FakeEnv {
		pub fn killed(&self) -> Vec<String> {
			self.killed.lock().map(|k| k.clone()).unwrap_or_default()
		}

		pub fn worktree_calls(&self) -> Vec<(PathBuf, PathBuf, String)> {
			self.worktrees.lock().map(|w| w.clone()).unwrap_or_default()
		}
	}
}
