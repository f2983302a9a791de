use crate::env::Environment;
use crate::error::DashError;
use crate::model::SessionEntry;
use std::path::{Path, PathBuf};

pub const NO_ROOT_MESSAGE: &str =
	"Layout must have session_root defined to create worktree sessions.";
pub const NOT_A_REPO_MESSAGE: &str = "Project must be a git repository. Run 'git init' first.";

/// Root of a layout that can be forked into a worktree.
pub fn fork_root(env: &dyn Environment, layout: &SessionEntry) -> Result<PathBuf, DashError> {
	let root = layout
		.project_root
		.as_ref()
		.filter(|p| !p.as_os_str().is_empty())
		.ok_or_else(|| DashError::Precondition(NO_ROOT_MESSAGE.to_string()))?;
	if !env.is_git_repo(root) {
		return Err(DashError::Precondition(NOT_A_REPO_MESSAGE.to_string()));
	}
	Ok(root.clone())
}

/// Where a worktree named `dir_name` goes: next to `base`.
pub fn worktree_path(base: &Path, dir_name: &str) -> PathBuf {
	match base.parent() {
		Some(parent) => parent.join(dir_name),
		None => PathBuf::from(dir_name),
	}
}

/// Create a sibling worktree of `base` on a new branch.
///
/// On error nothing can be assumed about the target directory.
pub fn create_worktree(
	env: &dyn Environment,
	base: &Path,
	dir_name: &str,
	branch: &str,
) -> Result<PathBuf, DashError> {
	let target = worktree_path(base, dir_name);
	tracing::info!(
		base = %base.display(),
		target = %target.display(),
		branch,
		"creating worktree"
	);
	env.create_worktree(base, &target, branch).map_err(|output| {
		tracing::warn!(%output, "worktree creation failed");
		DashError::Provisioning(output)
	})?;
	Ok(target)
}
