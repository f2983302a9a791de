use crate::layouts::NEW_SESSION_LAYOUT;
use crate::tmux::{attach_args, find_tmux};
use anyhow::{Context, Result};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// What the dashboard hands the terminal over to when it exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
	/// Switch to or attach an already running session.
	Attach { name: String },
	/// Load a layout that is not running, then attach it.
	Layout { name: String },
	/// Load `layout` into a fresh worktree under a new session name.
	Worktree {
		layout: String,
		session: String,
		root: PathBuf,
	},
	/// A new session rooted at `root`, loaded from the `new-session` template.
	NewHere { session: String, root: PathBuf },
}

impl Launch {
	/// Session the terminal ends up in.
	pub fn session(&self) -> &str {
		match self {
			Launch::Attach { name } | Launch::Layout { name } => name,
			Launch::Worktree { session, .. } | Launch::NewHere { session, .. } => session,
		}
	}

	/// A new session in `cwd`, named after the directory.
	pub fn new_here(cwd: &Path) -> Self {
		Launch::NewHere {
			session: new_session_name(cwd),
			root: cwd.to_path_buf(),
		}
	}
}

/// Session name for a directory: its basename without a leading dot, with
/// `:` (the tmux target separator) replaced.
pub fn new_session_name(dir: &Path) -> String {
	let base = dir
		.file_name()
		.map(|n| n.to_string_lossy().into_owned())
		.unwrap_or_default();
	let name = base.trim_start_matches('.').replace(':', "-");
	if name.is_empty() {
		"session".to_string()
	} else {
		name
	}
}

fn tmuxifier_load(layout: &str) -> Command {
	let mut cmd = Command::new("tmuxifier");
	cmd.arg("load-session").arg(layout);
	cmd
}

fn run_loader(mut cmd: Command, layout: &str) -> Result<()> {
	let status = cmd.status().map_err(|e| {
		if e.kind() == std::io::ErrorKind::NotFound {
			anyhow::anyhow!("tmuxifier not found. Install it from https://github.com/jimeh/tmuxifier")
		} else {
			anyhow::Error::new(e).context(format!("failed to load layout {layout}"))
		}
	})?;
	if !status.success() {
		anyhow::bail!("tmuxifier load-session {} failed ({})", layout, status);
	}
	Ok(())
}

/// Start whatever `launch` needs and replace this process with tmux.
///
/// Only returns on error. The terminal must already be restored.
pub fn exec(launch: &Launch) -> Result<()> {
	tracing::info!(?launch, "handing terminal to tmux");
	match launch {
		Launch::Attach { .. } => {}
		Launch::Layout { name } => run_loader(tmuxifier_load(name), name)?,
		Launch::Worktree {
			layout,
			session,
			root,
		} => {
			let mut cmd = tmuxifier_load(layout);
			cmd.env("SESSION_ROOT", root).env("SESSION_NAME", session);
			run_loader(cmd, layout)?;
		}
		Launch::NewHere { session, root } => {
			let mut cmd = tmuxifier_load(NEW_SESSION_LAYOUT);
			cmd.env("NEW_SESSION_NAME", session)
				.env("NEW_SESSION_ROOT", root);
			run_loader(cmd, NEW_SESSION_LAYOUT)?;
		}
	}

	let inside_tmux = std::env::var_os("TMUX").is_some_and(|v| !v.is_empty());
	let err = Command::new(find_tmux())
		.args(attach_args(launch.session(), inside_tmux))
		.exec();
	Err(err).with_context(|| format!("failed to exec {}", find_tmux()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_new_session_name() {
		assert_eq!(new_session_name(Path::new("/home/dev/code/api")), "api");
		assert_eq!(new_session_name(Path::new("/home/dev/.dotfiles")), "dotfiles");
		assert_eq!(new_session_name(Path::new("/tmp/a:b")), "a-b");
		assert_eq!(new_session_name(Path::new("/")), "session");
	}

	#[test]
	fn test_launch_session() {
		let fork = Launch::Worktree {
			layout: "api-server".to_string(),
			session: "api-server-auth".to_string(),
			root: PathBuf::from("/proj/api-server-auth"),
		};
		assert_eq!(fork.session(), "api-server-auth");
		assert_eq!(
			Launch::Layout {
				name: "web".to_string()
			}
			.session(),
			"web"
		);
		let here = Launch::new_here(Path::new("/work/.config"));
		assert_eq!(here.session(), "config");
	}
}
