use crate::error::DashError;
use crate::launcher::Launch;
use crate::model::SessionEntry;
use crate::repository::SessionRepository;
use crate::worktree;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::PathBuf;
use std::sync::Arc;

/// Agent spinner, advanced once per tick.
pub const SPINNER_FRAMES: [&str; 6] = ["·", "✻", "✽", "✶", "✳", "✢"];

/// Names typed during the worktree flow plus where the fork comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeDraft {
	pub session_name: String,
	pub branch_name: String,
	pub source_layout: String,
	pub source_root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
	Browsing,
	ConfirmingKill { target: String },
	WorktreeStep1(WorktreeDraft),
	WorktreeStep2(WorktreeDraft),
	ShowingError { message: String },
}

/// What the event loop does after a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
	Continue,
	Refresh,
	Quit,
	Launch(Launch),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
	pub session: String,
	pub lines: Vec<String>,
}

pub struct DashboardState {
	pub sessions: Vec<SessionEntry>,
	pub cursor: usize,
	pub mode: Mode,
	/// False until the first listing arrives.
	pub loaded: bool,
	pub listing_error: Option<String>,
	pub spinner_frame: usize,
	pub art_frame: usize,
	pub width: u16,
	pub height: u16,
	pub preview: Option<Preview>,
	art_frames: usize,
	repo: Arc<SessionRepository>,
	cwd: PathBuf,
}

impl DashboardState {
	pub fn new(repo: Arc<SessionRepository>, art_frames: usize, cwd: PathBuf) -> Self {
		Self {
			sessions: Vec::new(),
			cursor: 0,
			mode: Mode::Browsing,
			loaded: false,
			listing_error: None,
			spinner_frame: 0,
			art_frame: 0,
			width: 0,
			height: 0,
			preview: None,
			art_frames,
			repo,
			cwd,
		}
	}

	pub fn selected(&self) -> Option<&SessionEntry> {
		self.sessions.get(self.cursor)
	}

	/// Running session whose panes the preview should show.
	pub fn preview_target(&self) -> Option<&str> {
		self.selected()
			.filter(|s| s.is_running)
			.map(|s| s.name.as_str())
	}

	pub fn tick(&mut self) {
		self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
		if self.art_frames > 1 {
			self.art_frame = (self.art_frame + 1) % self.art_frames;
		}
	}

	pub fn resize(&mut self, width: u16, height: u16) {
		self.width = width;
		self.height = height;
	}

	/// Replace the listing wholesale. The cursor keeps its index, clamped.
	pub fn apply_listing(&mut self, listing: Result<Vec<SessionEntry>, DashError>) {
		self.loaded = true;
		match listing {
			Ok(sessions) => {
				self.sessions = sessions;
				self.listing_error = None;
			}
			Err(e) => {
				let message = e.to_string();
				tracing::warn!(error = %message, "session discovery failed");
				self.sessions.clear();
				if self.listing_error.is_none() && self.mode == Mode::Browsing {
					self.mode = Mode::ShowingError {
						message: message.clone(),
					};
				}
				self.listing_error = Some(message);
			}
		}
		self.clamp_cursor();
	}

	pub fn set_preview(&mut self, session: String, lines: Vec<String>) {
		self.preview = Some(Preview { session, lines });
	}

	fn clamp_cursor(&mut self) {
		self.cursor = self.cursor.min(self.sessions.len().saturating_sub(1));
	}

	pub fn handle_key(&mut self, key: KeyEvent) -> Outcome {
		let ctrl_c =
			key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c');

		match std::mem::replace(&mut self.mode, Mode::Browsing) {
			// any key dismisses the error and is otherwise ignored
			Mode::ShowingError { .. } => Outcome::Continue,
			_ if ctrl_c => Outcome::Quit,
			Mode::Browsing => self.browse(key),
			Mode::ConfirmingKill { target } => self.confirm_kill(key, target),
			Mode::WorktreeStep1(draft) => self.worktree_step1(key, draft),
			Mode::WorktreeStep2(draft) => self.worktree_step2(key, draft),
		}
	}

	fn browse(&mut self, key: KeyEvent) -> Outcome {
		match key.code {
			KeyCode::Char('q') => return Outcome::Quit,
			KeyCode::Up | KeyCode::Char('k') => self.cursor = self.cursor.saturating_sub(1),
			KeyCode::Down | KeyCode::Char('j') => {
				if self.cursor + 1 < self.sessions.len() {
					self.cursor += 1;
				}
			}
			KeyCode::Home | KeyCode::Char('g') => self.cursor = 0,
			KeyCode::End | KeyCode::Char('G') => self.cursor = self.sessions.len().saturating_sub(1),
			KeyCode::Char('r') => return Outcome::Refresh,
			KeyCode::Char('n') => return Outcome::Launch(Launch::new_here(&self.cwd)),
			KeyCode::Char('K') => {
				if let Some(selected) = self.selected().filter(|s| s.is_running) {
					self.mode = Mode::ConfirmingKill {
						target: selected.name.clone(),
					};
				}
			}
			KeyCode::Enter => return self.activate(),
			_ => {}
		}
		Outcome::Continue
	}

	fn activate(&mut self) -> Outcome {
		let Some(selected) = self.selected().cloned() else {
			return Outcome::Continue;
		};
		if selected.is_running {
			return Outcome::Launch(Launch::Attach {
				name: selected.name,
			});
		}

		let already_running = self
			.sessions
			.iter()
			.any(|s| s.is_running && s.name == selected.name);
		if !already_running {
			return Outcome::Launch(Launch::Layout {
				name: selected.name,
			});
		}

		match worktree::fork_root(self.repo.env().as_ref(), &selected) {
			Ok(root) => {
				self.mode = Mode::WorktreeStep1(WorktreeDraft {
					session_name: format!("{}-", selected.name),
					branch_name: String::new(),
					source_layout: selected.name,
					source_root: root,
				});
			}
			Err(e) => {
				self.mode = Mode::ShowingError {
					message: e.to_string(),
				};
			}
		}
		Outcome::Continue
	}

	fn confirm_kill(&mut self, key: KeyEvent, target: String) -> Outcome {
		match key.code {
			KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
				if let Err(e) = self.repo.kill(&target) {
					tracing::warn!(session = %target, error = %e, "kill failed");
					self.mode = Mode::ShowingError {
						message: format!("{e:#}"),
					};
				}
				Outcome::Refresh
			}
			KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc | KeyCode::Char('q') => {
				Outcome::Continue
			}
			_ => {
				self.mode = Mode::ConfirmingKill { target };
				Outcome::Continue
			}
		}
	}

	fn worktree_step1(&mut self, key: KeyEvent, mut draft: WorktreeDraft) -> Outcome {
		match key.code {
			KeyCode::Esc => return Outcome::Continue,
			KeyCode::Enter if !draft.session_name.is_empty() => {
				self.mode = Mode::WorktreeStep2(draft);
				return Outcome::Continue;
			}
			_ => edit_field(&mut draft.session_name, key),
		}
		self.mode = Mode::WorktreeStep1(draft);
		Outcome::Continue
	}

	fn worktree_step2(&mut self, key: KeyEvent, mut draft: WorktreeDraft) -> Outcome {
		match key.code {
			KeyCode::Esc => {
				self.mode = Mode::WorktreeStep1(draft);
				return Outcome::Continue;
			}
			KeyCode::Enter if !draft.branch_name.is_empty() => {
				return match worktree::create_worktree(
					self.repo.env().as_ref(),
					&draft.source_root,
					&draft.session_name,
					&draft.branch_name,
				) {
					Ok(root) => Outcome::Launch(Launch::Worktree {
						layout: draft.source_layout,
						session: draft.session_name,
						root,
					}),
					Err(e) => {
						self.mode = Mode::ShowingError {
							message: e.to_string(),
						};
						Outcome::Continue
					}
				};
			}
			_ => edit_field(&mut draft.branch_name, key),
		}
		self.mode = Mode::WorktreeStep2(draft);
		Outcome::Continue
	}
}

/// Printable characters append, backspace deletes. Modified keys are ignored.
fn edit_field(field: &mut String, key: KeyEvent) {
	if key
		.modifiers
		.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
	{
		return;
	}
	match key.code {
		KeyCode::Backspace => {
			field.pop();
		}
		KeyCode::Char(c) if !c.is_control() => field.push(c),
		_ => {}
	}
}
