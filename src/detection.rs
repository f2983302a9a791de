use crate::capture::strip_ansi;
use crate::config::AgentSettings;
use crate::env::Environment;
use crate::model::{AgentStatus, PaneRecord, ProcessRecord};
use anyhow::Result;
use std::collections::{BTreeMap, HashMap, HashSet};

pub type AgentStatusMap = HashMap<String, AgentStatus>;

/// Finds which sessions run the monitored agent and whether it is busy.
///
/// The process table and the pane table are two independent snapshots taken
/// one after the other; a pane or process that appears or exits in between is
/// simply missed until the next poll.
pub struct ProcessInspector<'a> {
	env: &'a dyn Environment,
	settings: &'a AgentSettings,
}

impl<'a> ProcessInspector<'a> {
	pub fn new(env: &'a dyn Environment, settings: &'a AgentSettings) -> Self {
		Self { env, settings }
	}

	/// Session name to agent status. Sessions without an agent pane are absent.
	/// Inspection failures give an empty map.
	pub fn detect_agent_status(&self) -> AgentStatusMap {
		match self.try_detect() {
			Ok(map) => map,
			Err(e) => {
				tracing::debug!(error = %e, "agent status detection failed");
				AgentStatusMap::new()
			}
		}
	}

	fn try_detect(&self) -> Result<AgentStatusMap> {
		let ttys = agent_ttys(&self.env.list_processes()?, self.settings);
		if ttys.is_empty() {
			return Ok(AgentStatusMap::new());
		}
		let panes = agent_panes(&self.env.list_panes()?, &ttys);

		let mut result = AgentStatusMap::new();
		for (session, indices) in panes {
			let executing = indices.iter().any(|&index| {
				self.env
					.capture_content(&session, Some(index), self.settings.scan_lines, false)
					.map(|content| strip_ansi(&content).contains(&self.settings.executing_marker))
					.unwrap_or(false)
			});
			let status = if executing {
				AgentStatus::Executing
			} else {
				AgentStatus::Idle
			};
			result.insert(session, status);
		}
		Ok(result)
	}
}

/// Normalized terminals of every process that looks like the agent.
pub fn agent_ttys(processes: &[ProcessRecord], settings: &AgentSettings) -> HashSet<String> {
	processes
		.iter()
		.filter(|p| is_agent_process(&p.command, settings))
		.map(|p| normalize_tty(&p.tty))
		.filter(|tty| !tty.is_empty() && !tty.starts_with('?'))
		.collect()
}

fn is_agent_process(command: &str, settings: &AgentSettings) -> bool {
	command.contains(&settings.binary)
		&& !settings
			.exclude
			.iter()
			.any(|needle| command.contains(needle.as_str()))
}

/// Session to pane indices whose terminal runs the agent.
pub fn agent_panes(panes: &[PaneRecord], ttys: &HashSet<String>) -> BTreeMap<String, Vec<usize>> {
	let mut out: BTreeMap<String, Vec<usize>> = BTreeMap::new();
	for pane in panes {
		if ttys.contains(&normalize_tty(&pane.tty)) {
			out.entry(pane.session.clone()).or_default().push(pane.index);
		}
	}
	out
}

/// Reduce a terminal name to the form `ps` prints.
///
/// `/dev/ttys044` and `ttys044` become `s044`, `/dev/pts/3` becomes `pts/3`.
pub fn normalize_tty(tty: &str) -> String {
	let tty = tty.trim();
	let tty = tty.strip_prefix("/dev/").unwrap_or(tty);
	tty.strip_prefix("tty").unwrap_or(tty).to_string()
}
