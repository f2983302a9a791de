//! The dashboard's serialized event stream.
//!
//! Terminal input is read on a dedicated thread, timers run as tokio tasks,
//! and listing/preview work runs on the blocking pool. Everything funnels into
//! one channel that the UI loop drains one message at a time.

use crate::app::{DashboardState, Outcome};
use crate::capture;
use crate::config::AgentSettings;
use crate::detection::ProcessInspector;
use crate::error::DashError;
use crate::launcher::Launch;
use crate::model::SessionEntry;
use crate::repository::{apply_agent_status, SessionRepository};
use crate::ui::{self, Theme};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::Stdout;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

pub enum Message {
	Key(KeyEvent),
	Resize(u16, u16),
	Tick,
	RefreshDue,
	Listing(Result<Vec<SessionEntry>, DashError>),
	Preview { session: String, lines: Vec<String> },
}

/// Where the loop goes after a message.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
	Continue,
	Quit,
	Launch(Launch),
}

/// Listing plus agent status, as one background job.
pub fn load_listing(
	repo: &SessionRepository,
	agent: &AgentSettings,
) -> Result<Vec<SessionEntry>, DashError> {
	let mut sessions = repo.list_all()?;
	let statuses = ProcessInspector::new(repo.env().as_ref(), agent).detect_agent_status();
	apply_agent_status(&mut sessions, &statuses);
	Ok(sessions)
}

pub struct Timing {
	pub tick: Duration,
	pub refresh: Duration,
}

pub struct Dashboard {
	pub state: DashboardState,
	repo: Arc<SessionRepository>,
	agent: Arc<AgentSettings>,
	theme: Theme,
	art: Vec<String>,
	tx: mpsc::UnboundedSender<Message>,
	rx: mpsc::UnboundedReceiver<Message>,
	/// Session the last preview request was for.
	preview_for: Option<String>,
	/// A listing job is running on the blocking pool.
	listing_in_flight: bool,
	/// A refresh was asked for while a listing was in flight.
	refresh_pending: bool,
	shutdown: Arc<AtomicBool>,
}

impl Dashboard {
	pub fn new(
		state: DashboardState,
		repo: Arc<SessionRepository>,
		agent: AgentSettings,
		theme: Theme,
		art: Vec<String>,
	) -> Self {
		let (tx, rx) = mpsc::unbounded_channel();
		Self {
			state,
			repo,
			agent: Arc::new(agent),
			theme,
			art,
			tx,
			rx,
			preview_for: None,
			listing_in_flight: false,
			refresh_pending: false,
			shutdown: Arc::new(AtomicBool::new(false)),
		}
	}

	/// Run until the user quits or picks something to launch.
	pub async fn run(
		&mut self,
		terminal: &mut Terminal<CrosstermBackend<Stdout>>,
		timing: Timing,
	) -> Result<Option<Launch>> {
		let size = terminal.size()?;
		self.state.resize(size.width, size.height);
		self.spawn_input();
		self.spawn_timer(timing.tick, || Message::Tick);
		self.spawn_timer(timing.refresh, || Message::RefreshDue);
		self.request_listing();

		let result = loop {
			terminal.draw(|f| ui::draw(f, &self.state, self.theme, &self.art))?;
			let Some(message) = self.rx.recv().await else {
				break None;
			};
			match self.handle_message(message) {
				Flow::Continue => {}
				Flow::Quit => break None,
				Flow::Launch(launch) => break Some(launch),
			}
		};
		self.shutdown.store(true, Ordering::Relaxed);
		Ok(result)
	}

	pub fn handle_message(&mut self, message: Message) -> Flow {
		match message {
			Message::Key(key) => match self.state.handle_key(key) {
				Outcome::Continue => self.request_preview(false),
				Outcome::Refresh => self.refresh(),
				Outcome::Quit => return Flow::Quit,
				Outcome::Launch(launch) => return Flow::Launch(launch),
			},
			Message::Resize(width, height) => {
				self.state.resize(width, height);
				self.request_preview(true);
			}
			Message::Tick => self.state.tick(),
			Message::RefreshDue => {
				if !self.listing_in_flight {
					self.request_listing();
				}
			}
			Message::Listing(listing) => {
				self.listing_in_flight = false;
				self.state.apply_listing(listing);
				if std::mem::take(&mut self.refresh_pending) {
					self.request_listing();
				}
				self.request_preview(true);
			}
			Message::Preview { session, lines } => {
				// focus may have moved on since this capture started
				if self.preview_for.as_deref() == Some(session.as_str()) {
					self.state.set_preview(session, lines);
				}
			}
		}
		Flow::Continue
	}

	fn header_height(&self) -> u16 {
		self.art
			.first()
			.map_or(0, |frame| frame.lines().count() as u16)
	}

	/// Re-list now, or right after the listing in flight lands.
	fn refresh(&mut self) {
		if self.listing_in_flight {
			self.refresh_pending = true;
		} else {
			self.request_listing();
		}
	}

	fn request_listing(&mut self) {
		self.listing_in_flight = true;
		let repo = self.repo.clone();
		let agent = self.agent.clone();
		let tx = self.tx.clone();
		tokio::task::spawn_blocking(move || {
			let _ = tx.send(Message::Listing(load_listing(&repo, &agent)));
		});
	}

	/// Capture the focused session in the background. Without `force`, only
	/// when focus moved to a different session.
	fn request_preview(&mut self, force: bool) {
		let Some(session) = self.state.preview_target().map(str::to_string) else {
			self.preview_for = None;
			return;
		};
		if !force && self.preview_for.as_deref() == Some(session.as_str()) {
			return;
		}
		self.preview_for = Some(session.clone());

		let (height, width) = ui::preview_size(&self.state, self.header_height());
		let env = self.repo.env().clone();
		let tx = self.tx.clone();
		tokio::task::spawn_blocking(move || {
			let lines = capture::capture_preview(env.as_ref(), &session, height, width);
			let _ = tx.send(Message::Preview { session, lines });
		});
	}

	fn spawn_input(&self) {
		let tx = self.tx.clone();
		let shutdown = self.shutdown.clone();
		std::thread::spawn(move || {
			let poll_timeout = Duration::from_millis(50);
			while !shutdown.load(Ordering::Relaxed) {
				if !event::poll(poll_timeout).unwrap_or(false) {
					continue;
				}
				let message = match event::read() {
					Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => Message::Key(key),
					Ok(Event::Resize(w, h)) => Message::Resize(w, h),
					_ => continue,
				};
				if tx.send(message).is_err() {
					break;
				}
			}
		});
	}

	fn spawn_timer(&self, period: Duration, make: fn() -> Message) {
		let tx = self.tx.clone();
		let shutdown = self.shutdown.clone();
		let period = period.max(Duration::from_millis(10));
		tokio::spawn(async move {
			let mut interval = interval_at(Instant::now() + period, period);
			interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
			loop {
				interval.tick().await;
				if shutdown.load(Ordering::Relaxed) || tx.send(make()).is_err() {
					break;
				}
			}
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::app::Mode;
	use crate::env::fake::FakeEnv;
	use crate::env::Environment;
	use crate::model::{AgentStatus, PaneInfo, PaneRecord, ProcessRecord};
	use crossterm::event::{KeyCode, KeyModifiers};
	use std::fs;
	use std::path::{Path, PathBuf};
	use std::sync::atomic::AtomicUsize;
	use tempfile::TempDir;

	/// tmux that takes a while to answer, counting overlapping calls.
	#[derive(Default)]
	struct SlowEnv {
		calls: AtomicUsize,
		active: AtomicUsize,
		peak: AtomicUsize,
	}

	impl Environment for SlowEnv {
		fn list_sessions(&self) -> Result<Vec<String>> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
			self.peak.fetch_max(now, Ordering::SeqCst);
			std::thread::sleep(Duration::from_millis(100));
			self.active.fetch_sub(1, Ordering::SeqCst);
			Ok(Vec::new())
		}

		fn list_panes(&self) -> Result<Vec<PaneRecord>> {
			Ok(Vec::new())
		}

		fn session_panes(&self, _session: &str) -> Result<Vec<PaneInfo>> {
			Ok(Vec::new())
		}

		fn capture_content(
			&self,
			_session: &str,
			_pane: Option<usize>,
			_lines: usize,
			_keep_ansi: bool,
		) -> Result<String> {
			Ok(String::new())
		}

		fn kill_session(&self, _session: &str) -> Result<()> {
			Ok(())
		}

		fn list_processes(&self) -> Result<Vec<ProcessRecord>> {
			Ok(Vec::new())
		}

		fn is_git_repo(&self, _path: &Path) -> bool {
			false
		}

		fn create_worktree(
			&self,
			_base: &Path,
			_target: &Path,
			_branch: &str,
		) -> std::result::Result<(), String> {
			Ok(())
		}
	}

	fn slow_dashboard(dir: &TempDir) -> (Dashboard, Arc<SlowEnv>) {
		let env = Arc::new(SlowEnv::default());
		let repo = Arc::new(SessionRepository::new(env.clone(), dir.path().to_path_buf()));
		(dashboard(repo), env)
	}

	fn fixture() -> (TempDir, Arc<SessionRepository>) {
		let dir = TempDir::new().unwrap();
		fs::write(
			dir.path().join("api.session.sh"),
			"# Description: backend\nsession_root \"/proj/api\"\n",
		)
		.unwrap();
		let mut env = FakeEnv {
			sessions: vec!["api".to_string(), "scratch".to_string()],
			processes: vec![ProcessRecord {
				tty: "s001".to_string(),
				command: "claude".to_string(),
			}],
			panes: vec![PaneRecord {
				session: "api".to_string(),
				tty: "/dev/ttys001".to_string(),
				index: 0,
			}],
			..FakeEnv::default()
		};
		env.contents
			.insert(("api".to_string(), 0), "✻ Working… (esc to interrupt)\n".to_string());
		let repo = SessionRepository::new(Arc::new(env), dir.path().to_path_buf());
		(dir, Arc::new(repo))
	}

	fn dashboard(repo: Arc<SessionRepository>) -> Dashboard {
		let state = DashboardState::new(repo.clone(), 1, PathBuf::from("/"));
		Dashboard::new(
			state,
			repo,
			AgentSettings::default(),
			Theme::named("default"),
			vec!["warpp".to_string()],
		)
	}

	#[test]
	fn test_load_listing_enriches_running_entries() {
		let (_dir, repo) = fixture();
		let sessions = load_listing(&repo, &AgentSettings::default()).unwrap();
		let names: Vec<_> = sessions.iter().map(|s| (s.name.as_str(), s.is_running)).collect();
		assert_eq!(names, vec![("api", true), ("scratch", true), ("api", false)]);
		assert_eq!(sessions[0].agent_status, AgentStatus::Executing);
		assert_eq!(sessions[1].agent_status, AgentStatus::None);
		assert_eq!(sessions[2].agent_status, AgentStatus::None);
	}

	#[tokio::test]
	async fn test_listing_then_preview_round_trip() {
		let (_dir, repo) = fixture();
		let mut dash = dashboard(repo);
		dash.state.resize(100, 30);

		dash.request_listing();
		let listing = dash.rx.recv().await.unwrap();
		assert!(matches!(listing, Message::Listing(Ok(_))));
		assert_eq!(dash.handle_message(listing), Flow::Continue);
		assert!(dash.state.loaded);
		assert_eq!(dash.state.sessions.len(), 3);

		// the listing triggers a preview of the focused running session
		match dash.rx.recv().await.unwrap() {
			Message::Preview { session, lines } => {
				assert_eq!(session, "api");
				assert_eq!(lines, vec!["✻ Working… (esc to interrupt)"]);
				dash.handle_message(Message::Preview { session, lines });
			}
			_ => panic!("expected a preview"),
		}
		assert_eq!(dash.state.preview.as_ref().map(|p| p.session.as_str()), Some("api"));
	}

	#[tokio::test]
	async fn test_keys_flow_through_state_machine() {
		let (_dir, repo) = fixture();
		let mut dash = dashboard(repo.clone());
		dash.handle_message(Message::Listing(load_listing(&repo, &AgentSettings::default())));

		let key = |code| Message::Key(KeyEvent::new(code, KeyModifiers::NONE));
		assert_eq!(dash.handle_message(Message::Tick), Flow::Continue);
		assert_eq!(dash.state.spinner_frame, 1);
		dash.handle_message(key(KeyCode::Char('K')));
		assert!(matches!(dash.state.mode, Mode::ConfirmingKill { .. }));
		dash.handle_message(key(KeyCode::Esc));
		assert_eq!(
			dash.handle_message(key(KeyCode::Enter)),
			Flow::Launch(Launch::Attach {
				name: "api".to_string()
			})
		);
		assert_eq!(dash.handle_message(key(KeyCode::Char('q'))), Flow::Quit);
	}

	#[tokio::test]
	async fn test_refresh_ticks_do_not_stack_listing_jobs() {
		let dir = TempDir::new().unwrap();
		let (mut dash, env) = slow_dashboard(&dir);

		for _ in 0..10 {
			dash.handle_message(Message::RefreshDue);
		}
		let listing = dash.rx.recv().await.unwrap();
		assert!(matches!(listing, Message::Listing(Ok(_))));
		dash.handle_message(listing);
		assert!(!dash.listing_in_flight);
		assert_eq!(env.calls.load(Ordering::SeqCst), 1);
		assert_eq!(env.peak.load(Ordering::SeqCst), 1);

		// the next tick after the job lands starts a new one
		dash.handle_message(Message::RefreshDue);
		assert!(dash.listing_in_flight);
		let listing = dash.rx.recv().await.unwrap();
		dash.handle_message(listing);
		assert_eq!(env.calls.load(Ordering::SeqCst), 2);
		assert_eq!(env.peak.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn test_manual_refresh_during_listing_runs_after_it_lands() {
		let dir = TempDir::new().unwrap();
		let (mut dash, env) = slow_dashboard(&dir);

		dash.handle_message(Message::RefreshDue);
		let refresh = Message::Key(KeyEvent::new(KeyCode::Char('r'), KeyModifiers::NONE));
		dash.handle_message(refresh);
		assert!(dash.refresh_pending);

		let first = dash.rx.recv().await.unwrap();
		dash.handle_message(first);
		assert!(!dash.refresh_pending);
		assert!(dash.listing_in_flight);

		let second = dash.rx.recv().await.unwrap();
		assert!(matches!(second, Message::Listing(Ok(_))));
		dash.handle_message(second);
		assert!(!dash.listing_in_flight);
		assert_eq!(env.calls.load(Ordering::SeqCst), 2);
		assert_eq!(env.peak.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn test_late_preview_for_old_focus_is_dropped() {
		let (_dir, repo) = fixture();
		let mut dash = dashboard(repo.clone());
		dash.state
			.apply_listing(load_listing(&repo, &AgentSettings::default()));
		dash.preview_for = Some("scratch".to_string());

		dash.handle_message(Message::Preview {
			session: "api".to_string(),
			lines: vec!["old".to_string()],
		});
		assert!(dash.state.preview.is_none());

		dash.handle_message(Message::Preview {
			session: "scratch".to_string(),
			lines: vec!["new".to_string()],
		});
		let preview = dash.state.preview.as_ref().unwrap();
		assert_eq!(preview.session, "scratch");
		assert_eq!(preview.lines, vec!["new"]);
	}

	#[test]
	fn test_stale_listing_is_overwritten() {
		let (_dir, repo) = fixture();
		let mut dash = dashboard(repo.clone());
		let fresh = load_listing(&repo, &AgentSettings::default()).unwrap();
		let stale = vec![fresh[1].clone()];

		dash.state.apply_listing(Ok(fresh.clone()));
		dash.state.apply_listing(Ok(stale.clone()));
		assert_eq!(dash.state.sessions, stale);
	}
}
