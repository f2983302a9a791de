//! Parsing of tmuxifier layout files (`<name>.session.sh`).

use crate::model::ProjectType;
use std::path::{Path, PathBuf};

pub const LAYOUT_SUFFIX: &str = ".session.sh";
/// Template used by `--new`; never listed.
pub const NEW_SESSION_LAYOUT: &str = "new-session";
pub const DEFAULT_DESCRIPTION: &str = "Tmux session layout";

const DESCRIPTION_TAG: &str = "# Description:";
const ROOT_DIRECTIVE: &str = "session_root ";
const ROOT_PLACEHOLDER_OPEN: &str = "${SESSION_ROOT:-";

/// Layout name for a directory entry, or `None` if the file is not a listable layout.
pub fn layout_name(file_name: &str) -> Option<&str> {
	let name = file_name.strip_suffix(LAYOUT_SUFFIX)?;
	if name.is_empty() || name == NEW_SESSION_LAYOUT {
		return None;
	}
	Some(name)
}

/// Description from the leading comments. An explicit `# Description:` tag
/// wins over any other comment. Otherwise the first comment that does not talk
/// about tmux or sessions is used.
pub fn parse_description(content: &str) -> String {
	let comments = || {
		content
			.lines()
			.map(str::trim)
			.filter(|l| l.starts_with('#') && !l.starts_with("#!"))
	};

	if let Some(tagged) = comments().find_map(|l| l.strip_prefix(DESCRIPTION_TAG)) {
		return tagged.trim().to_string();
	}

	comments()
		.filter(|l| l.len() > 2)
		.map(|l| l[1..].trim())
		.find(|desc| !desc.contains("session") && !desc.contains("tmux"))
		.map(str::to_string)
		.unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string())
}

/// Default root from the `session_root` declaration.
///
/// Handles `session_root "~/path"` and `session_root "${SESSION_ROOT:-~/path}"`.
/// A bare variable reference cannot be resolved and yields `None`.
pub fn parse_session_root(content: &str, home: Option<&Path>) -> Option<PathBuf> {
	let line = content
		.lines()
		.map(str::trim)
		.find(|l| l.starts_with(ROOT_DIRECTIVE))?;
	let mut arg = line[ROOT_DIRECTIVE.len()..]
		.trim()
		.trim_matches(|c| c == '"' || c == '\'');

	if let Some(inner) = arg
		.strip_prefix(ROOT_PLACEHOLDER_OPEN)
		.and_then(|rest| rest.strip_suffix('}'))
	{
		arg = inner;
	}

	if arg.is_empty() || arg.starts_with('$') {
		return None;
	}

	if let Some(rest) = arg.strip_prefix('~') {
		let home = home?;
		let rest = rest.trim_start_matches('/');
		return Some(if rest.is_empty() {
			home.to_path_buf()
		} else {
			home.join(rest)
		});
	}

	Some(PathBuf::from(arg))
}

pub fn detect_project_type(name: &str) -> ProjectType {
	let name = name.to_lowercase();
	let has = |needle: &str| name.contains(needle);
	if has("blog") || has("web") {
		ProjectType::Web
	} else if has("api") || has("server") {
		ProjectType::Api
	} else if has("extract") || has("crawl") {
		ProjectType::Data
	} else {
		ProjectType::Project
	}
}
