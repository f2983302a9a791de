use crate::detection::AgentStatusMap;
use crate::env::Environment;
use crate::error::DashError;
use crate::layouts::{detect_project_type, layout_name, parse_description, parse_session_root};
use crate::model::{
	AgentStatus, ProjectType, SessionEntry, LAYOUT_ICON, ORPHAN_DESCRIPTION, ORPHAN_ICON,
};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Merges tmuxifier layouts with the live session list.
pub struct SessionRepository {
	env: Arc<dyn Environment>,
	layouts_dir: PathBuf,
	home: Option<PathBuf>,
}

impl SessionRepository {
	pub fn new(env: Arc<dyn Environment>, layouts_dir: PathBuf) -> Self {
		Self {
			env,
			layouts_dir,
			home: dirs::home_dir(),
		}
	}

	/// Home directory used to expand `~` in `session_root`.
	#[cfg(test)]
	pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
		self.home = home;
		self
	}

	pub fn env(&self) -> &Arc<dyn Environment> {
		&self.env
	}

	/// Running sessions (alphabetical), then every layout (alphabetical).
	/// Agent status is left at `None`; see [`apply_agent_status`].
	pub fn list_all(&self) -> Result<Vec<SessionEntry>, DashError> {
		let layouts = self.read_layouts()?;
		let running = self.env.list_sessions().unwrap_or_else(|e| {
			tracing::debug!(error = %e, "could not list running sessions");
			Vec::new()
		});

		let by_name: HashMap<&str, &SessionEntry> =
			layouts.iter().map(|l| (l.name.as_str(), l)).collect();

		let mut sessions: Vec<SessionEntry> = running
			.iter()
			.map(|name| match by_name.get(name.as_str()) {
				Some(layout) => SessionEntry {
					is_running: true,
					is_layout: true,
					..(*layout).clone()
				},
				None => SessionEntry {
					name: name.clone(),
					description: ORPHAN_DESCRIPTION.to_string(),
					is_running: true,
					is_layout: false,
					project_root: None,
					project_type: ProjectType::Orphan,
					icon: ORPHAN_ICON,
					agent_status: AgentStatus::None,
				},
			})
			.collect();
		sessions.sort_by(|a, b| a.name.cmp(&b.name));
		sessions.dedup_by(|a, b| a.name == b.name);

		let mut layouts = layouts;
		layouts.sort_by(|a, b| a.name.cmp(&b.name));
		sessions.extend(layouts);

		tracing::debug!(
			running = running.len(),
			total = sessions.len(),
			"listed sessions"
		);
		Ok(sessions)
	}

	/// Terminate a running session. The caller re-lists to see the result.
	pub fn kill(&self, name: &str) -> anyhow::Result<()> {
		tracing::info!(session = name, "killing session");
		self.env.kill_session(name)
	}

	fn read_layouts(&self) -> Result<Vec<SessionEntry>, DashError> {
		let discovery = |source| DashError::Discovery {
			path: self.layouts_dir.clone(),
			source,
		};
		let mut layouts = Vec::new();
		for entry in fs::read_dir(&self.layouts_dir).map_err(discovery)? {
			let entry = entry.map_err(discovery)?;
			let path = entry.path();
			if path.is_dir() {
				continue;
			}
			let file_name = entry.file_name().to_string_lossy().into_owned();
			let Some(name) = layout_name(&file_name) else {
				continue;
			};
			layouts.push(self.layout_entry(name, &path));
		}
		Ok(layouts)
	}

	fn layout_entry(&self, name: &str, path: &Path) -> SessionEntry {
		let content = fs::read_to_string(path).unwrap_or_default();
		SessionEntry {
			name: name.to_string(),
			description: parse_description(&content),
			is_running: false,
			is_layout: true,
			project_root: parse_session_root(&content, self.home.as_deref()),
			project_type: detect_project_type(name),
			icon: LAYOUT_ICON,
			agent_status: AgentStatus::None,
		}
	}
}

/// Copy detected agent status onto the running entries.
pub fn apply_agent_status(sessions: &mut [SessionEntry], statuses: &AgentStatusMap) {
	for session in sessions.iter_mut().filter(|s| s.is_running) {
		session.agent_status = statuses.get(&session.name).copied().unwrap_or_default();
	}
}
