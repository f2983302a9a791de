use serde::Serialize;
use std::path::PathBuf;

pub const LAYOUT_ICON: &str = "•";
pub const ORPHAN_ICON: &str = "○";
pub const ORPHAN_DESCRIPTION: &str = "(no layout)";

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
	#[default]
	None,
	Idle,
	Executing,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
	Web,
	Api,
	Data,
	Project,
	Orphan,
}

impl ProjectType {
	pub fn label(self) -> &'static str {
		match self {
			ProjectType::Web => "Web",
			ProjectType::Api => "API",
			ProjectType::Data => "Data",
			ProjectType::Project => "Project",
			ProjectType::Orphan => "Orphan",
		}
	}
}

/// One row of the dashboard. A running session, a layout, or a running
/// session that was started from a layout.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionEntry {
	pub name: String,
	pub description: String,
	pub is_running: bool,
	pub is_layout: bool,
	pub project_root: Option<PathBuf>,
	pub project_type: ProjectType,
	pub icon: &'static str,
	pub agent_status: AgentStatus,
}

/// A pane in the active window of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneInfo {
	pub index: usize,
	pub content: String,
}

/// A pane as reported by `list-panes -a`, used to match agent processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneRecord {
	pub session: String,
	pub tty: String,
	pub index: usize,
}

/// A row of the OS process table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
	pub tty: String,
	pub command: String,
}
