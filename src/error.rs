use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashError {
	/// The layouts directory could not be enumerated.
	#[error("cannot read layouts in {}: {source}", path.display())]
	Discovery {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	/// Worktree or branch creation failed. Carries the tool output verbatim.
	#[error("{0}")]
	Provisioning(String),
	/// A fork was requested for a layout that cannot be forked.
	#[error("{0}")]
	Precondition(String),
}
