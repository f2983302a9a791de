use crate::app::{DashboardState, Mode, SPINNER_FRAMES};
use crate::model::{AgentStatus, SessionEntry};
use ansi_to_tui::IntoText;
use ratatui::{
	prelude::*,
	text::{Line, Text},
	widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Padding, Paragraph, Wrap},
};

pub const IDLE_ICON: &str = "●";
const AGENT_COLOR: Color = Color::Rgb(255, 140, 0);
const FOOTER: &str = "↑/↓ Navigate  •  Enter Launch  •  K Kill  •  n New  •  q Quit";

/// Colours picked by the `theme` config key. Only the accent changes.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
	pub accent: Color,
}

impl Theme {
	pub fn named(name: &str) -> Self {
		let accent = match name {
			"carbonfox" => Color::Rgb(0x78, 0xa9, 0xff),
			"kanagawa" => Color::Rgb(0x7e, 0x9c, 0xd8),
			_ => Color::Cyan,
		};
		Self { accent }
	}
}

struct Areas {
	header: Rect,
	list: Rect,
	preview: Rect,
	footer: Rect,
}

fn split(area: Rect, header_height: u16) -> Areas {
	let vertical = Layout::default()
		.direction(Direction::Vertical)
		.constraints(
			[
				Constraint::Length(header_height),
				Constraint::Fill(1),
				Constraint::Length(1),
			]
			.as_ref(),
		)
		.split(area);
	let body = Layout::default()
		.direction(Direction::Horizontal)
		.constraints([Constraint::Percentage(35), Constraint::Percentage(65)].as_ref())
		.split(vertical[1]);
	Areas {
		header: vertical[0],
		list: body[0],
		preview: body[1],
		footer: vertical[2],
	}
}

fn panel(title: &str) -> Block<'_> {
	Block::default()
		.borders(Borders::ALL)
		.border_type(BorderType::Rounded)
		.title(title)
		.padding(Padding::horizontal(1))
}

/// Lines and columns available inside the preview panel.
pub fn preview_size(state: &DashboardState, header_height: u16) -> (usize, usize) {
	let areas = split(Rect::new(0, 0, state.width, state.height), header_height);
	let inner = panel("").inner(areas.preview);
	(inner.height as usize, inner.width as usize)
}

pub fn draw(f: &mut Frame, state: &DashboardState, theme: Theme, art: &[String]) {
	let banner = art.get(state.art_frame).map(String::as_str).unwrap_or("");
	let header_height = banner.lines().count() as u16;
	let area = f.area();
	let areas = split(area, header_height);

	f.render_widget(
		Paragraph::new(banner)
			.alignment(Alignment::Center)
			.style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)),
		areas.header,
	);

	if !state.loaded {
		let placeholder = Paragraph::new("Loading sessions...")
			.alignment(Alignment::Center)
			.block(panel(""));
		f.render_widget(placeholder, centered_rect(40, 30, area));
		return;
	}

	draw_list(f, state, theme, areas.list);
	draw_preview(f, state, theme, areas.preview);

	f.render_widget(
		Paragraph::new(FOOTER)
			.alignment(Alignment::Center)
			.style(Style::default().fg(Color::DarkGray)),
		areas.footer,
	);

	draw_overlay(f, state, theme, area);
}

fn status_icon(entry: &SessionEntry, spinner_frame: usize) -> Span<'static> {
	match entry.agent_status {
		AgentStatus::Executing => Span::styled(
			SPINNER_FRAMES[spinner_frame % SPINNER_FRAMES.len()],
			Style::default().fg(AGENT_COLOR),
		),
		AgentStatus::Idle => Span::styled(IDLE_ICON, Style::default().fg(AGENT_COLOR)),
		AgentStatus::None => Span::raw(entry.icon),
	}
}

/// List rows with group headings, plus the row of the cursor.
fn list_rows(state: &DashboardState) -> (Vec<ListItem<'static>>, Option<usize>) {
	let muted = Style::default().fg(Color::DarkGray);
	let running = state.sessions.iter().filter(|s| s.is_running).count();
	let mut rows = Vec::new();
	let mut selected = None;

	for (idx, entry) in state.sessions.iter().enumerate() {
		if idx == 0 && running > 0 {
			rows.push(ListItem::new(Line::styled("SESSIONS:", muted)));
		}
		if idx == running {
			if running > 0 {
				rows.push(ListItem::new(""));
			}
			rows.push(ListItem::new(Line::styled("LAYOUTS:", muted)));
		}
		if idx == state.cursor {
			selected = Some(rows.len());
		}
		let icon = if entry.is_running {
			status_icon(entry, state.spinner_frame)
		} else {
			Span::raw(entry.icon)
		};
		rows.push(ListItem::new(Line::from(vec![
			icon,
			Span::raw(" "),
			Span::raw(entry.name.clone()),
		])));
	}
	(rows, selected)
}

fn draw_list(f: &mut Frame, state: &DashboardState, theme: Theme, area: Rect) {
	if let Some(message) = &state.listing_error {
		let body = Paragraph::new(message.as_str())
			.style(Style::default().fg(Color::Red))
			.block(panel("Sessions"))
			.wrap(Wrap { trim: true });
		f.render_widget(body, area);
		return;
	}
	if state.sessions.is_empty() {
		let body = Paragraph::new("No sessions or layouts found")
			.style(Style::default().fg(Color::DarkGray))
			.block(panel("Sessions"));
		f.render_widget(body, area);
		return;
	}

	let (rows, selected) = list_rows(state);
	let mut list_state = ListState::default();
	list_state.select(selected);
	let list = List::new(rows)
		.block(panel("Sessions"))
		.highlight_symbol("→ ")
		.highlight_style(
			Style::default()
				.fg(theme.accent)
				.add_modifier(Modifier::BOLD | Modifier::REVERSED),
		);
	f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_preview(f: &mut Frame, state: &DashboardState, theme: Theme, area: Rect) {
	let Some(selected) = state.selected() else {
		f.render_widget(panel("Preview"), area);
		return;
	};

	if !selected.is_running {
		let muted = Style::default().fg(Color::DarkGray);
		let mut lines = vec![
			Line::styled(
				selected.name.clone(),
				Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
			),
			Line::styled(selected.description.clone(), muted),
			Line::from(""),
			Line::styled("Layout not running", muted),
			Line::from(""),
			Line::from("Press Enter to launch"),
		];
		if let Some(root) = &selected.project_root {
			lines.insert(2, Line::styled(root.display().to_string(), muted));
		}
		let card = Paragraph::new(Text::from(lines))
			.block(panel(selected.project_type.label()))
			.wrap(Wrap { trim: true });
		f.render_widget(card, area);
		return;
	}

	let raw = state
		.preview
		.as_ref()
		.filter(|p| p.session == selected.name)
		.map(|p| p.lines.join("\n"))
		.unwrap_or_default();
	let text = if raw.is_empty() {
		Text::styled("(no output)", Style::default().fg(Color::DarkGray))
	} else {
		match raw.as_str().into_text() {
			Ok(text) => text,
			Err(_) => Text::raw(crate::capture::strip_ansi(&raw)),
		}
	};
	let title = format!("{} · {}", selected.name, selected.description);
	f.render_widget(Paragraph::new(text).block(panel(&title)), area);
}

fn draw_overlay(f: &mut Frame, state: &DashboardState, theme: Theme, area: Rect) {
	let muted = Style::default().fg(Color::DarkGray);
	let (title, color, body): (&str, Color, Vec<Line>) = match &state.mode {
		Mode::Browsing => return,
		Mode::ConfirmingKill { target } => (
			"Confirm",
			Color::Yellow,
			vec![
				Line::from(format!("Kill session '{target}'?")),
				Line::from(""),
				Line::styled("y/Enter to confirm  •  n/Esc to cancel", muted),
			],
		),
		Mode::WorktreeStep1(draft) => (
			"New worktree",
			theme.accent,
			input_lines(
				"Enter session name:",
				&draft.session_name,
				"Enter to continue  •  Esc to cancel",
			),
		),
		Mode::WorktreeStep2(draft) => (
			"New worktree",
			theme.accent,
			input_lines(
				"Enter branch name:",
				&draft.branch_name,
				"Enter to create  •  Esc to go back",
			),
		),
		Mode::ShowingError { message } => (
			"Error",
			Color::Red,
			vec![
				Line::from(message.clone()),
				Line::from(""),
				Line::styled("Press any key to continue", muted),
			],
		),
	};

	let popup = centered_rect(60, 30, area);
	f.render_widget(Clear, popup);
	let overlay = Paragraph::new(Text::from(body))
		.alignment(Alignment::Center)
		.block(
			panel(title)
				.border_style(Style::default().fg(color))
				.title_style(Style::default().fg(color).add_modifier(Modifier::BOLD)),
		)
		.wrap(Wrap { trim: false });
	f.render_widget(overlay, popup);
}

fn input_lines(prompt: &str, value: &str, hint: &str) -> Vec<Line<'static>> {
	vec![
		Line::from(prompt.to_string()),
		Line::from(""),
		Line::from(format!("{value}█")),
		Line::from(""),
		Line::styled(hint.to_string(), Style::default().fg(Color::DarkGray)),
	]
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
	let popup_layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints(
			[
				Constraint::Percentage((100 - percent_y) / 2),
				Constraint::Percentage(percent_y),
				Constraint::Percentage((100 - percent_y) / 2),
			]
			.as_ref(),
		)
		.split(r);

	let horizontal = Layout::default()
		.direction(Direction::Horizontal)
		.constraints(
			[
				Constraint::Percentage((100 - percent_x) / 2),
				Constraint::Percentage(percent_x),
				Constraint::Percentage((100 - percent_x) / 2),
			]
			.as_ref(),
		)
		.split(popup_layout[1]);

	horizontal[1]
}
