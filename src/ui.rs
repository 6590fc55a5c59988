use std::error::Error;
use std::io;
use std::time::{Duration as StdDuration, Instant};

use crossterm::event::{self, Event as CEvent, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, ExecutableCommand};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row as TableRow, Table, TableState};
use ratatui::{Frame, Terminal};
use tracing::{info, warn};

use crate::domain::{format_clock, Field, Row, RowStatus, RowStore};
use crate::keymap::{self, Effect, Focus, YankKind};

const TITLE: &str = "Time Diff Calculator";
const NOTICE_TTL: StdDuration = StdDuration::from_secs(2);
const FOCUSED_PANEL_BORDER_COLOR: Color = Color::Yellow;
const INACTIVE_PANEL_BORDER_COLOR: Color = Color::DarkGray;
const FOCUSED_CELL_COLOR: Color = Color::Yellow;
const ADJUSTED_COLOR: Color = Color::LightMagenta;

pub fn run_dashboard(store: &mut RowStore) -> Result<(), Box<dyn Error>> {
	enable_raw_mode()?;
	let mut stdout = io::stdout();
	stdout.execute(EnterAlternateScreen)?;
	let backend = CrosstermBackend::new(stdout);
	let mut terminal = Terminal::new(backend)?;

	let result = run_event_loop(&mut terminal, store);

	disable_raw_mode()?;
	execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
	terminal.show_cursor()?;

	result
}

fn run_event_loop(
	terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
	store: &mut RowStore,
) -> Result<(), Box<dyn Error>> {
	let mut app = App::default();
	info!(rows = store.len(), "dashboard started");

	loop {
		app.expire_notice(Instant::now());
		terminal.draw(|frame| draw_dashboard(frame, &app, store))?;

		if event::poll(StdDuration::from_millis(250))? {
			if let CEvent::Key(key) = event::read()? {
				if key.kind != KeyEventKind::Press {
					continue;
				}

				let should_quit = match &app.mode {
					InputMode::Prompt(_) => handle_prompt_key(&mut app, key.code, store),
					InputMode::Normal => handle_normal_key(&mut app, key.code, store),
				};

				if should_quit {
					break;
				}
			}
		}
	}

	info!(total = %store.total_label(), "dashboard closed");
	Ok(())
}

fn draw_dashboard(frame: &mut Frame, app: &App, store: &RowStore) {
	let layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Length(3), Constraint::Min(6), Constraint::Length(4)])
		.split(frame.area());

	render_adjustment_panel(frame, layout[0], store);

	if app.show_legend {
		let body = Layout::default()
			.direction(Direction::Horizontal)
			.constraints([Constraint::Percentage(64), Constraint::Percentage(36)])
			.split(layout[1]);
		render_rows_panel(frame, body[0], app, store);
		render_legend_panel(frame, body[1]);
	} else {
		render_rows_panel(frame, layout[1], app, store);
	}

	render_footer(frame, layout[2], app, store);
}

fn render_adjustment_panel(frame: &mut Frame, area: Rect, store: &RowStore) {
	let rule = store.rule;
	let toggle = if rule.enabled {
		Span::styled("[on] ", Style::default().fg(Color::Black).bg(ADJUSTED_COLOR))
	} else {
		Span::styled("[off]", Style::default().fg(Color::DarkGray))
	};
	let line = Line::from(vec![
		Span::raw("Adjust "),
		toggle,
		Span::raw(format!(
			"  x = {:+.2} h per y = {:.2} h   (a toggle | e edit x | t edit y)",
			rule.delta_hours, rule.threshold_hours
		)),
	]);

	let panel = Paragraph::new(line).block(Block::default().borders(Borders::ALL).title(TITLE));
	frame.render_widget(panel, area);
}

fn render_rows_panel(frame: &mut Frame, area: Rect, app: &App, store: &RowStore) {
	let rows = store
		.rows()
		.iter()
		.map(|row| render_row(row, app))
		.collect::<Vec<_>>();

	let header = TableRow::new(vec!["#", "Start", "End", "Hours"])
		.style(Style::default().add_modifier(Modifier::BOLD));
	let table = Table::new(
		rows,
		[
			Constraint::Length(4),
			Constraint::Length(8),
			Constraint::Length(8),
			Constraint::Min(8),
		],
	)
	.header(header)
	.block(
		Block::default()
			.borders(Borders::ALL)
			.title(format!("Rows | total {}", store.total_label()))
			.border_style(border_style(app.focus.is_some())),
	);

	let mut state = TableState::default();
	if let Some(focus) = app.focus {
		state.select(Some(focus.row.saturating_sub(1)));
	}
	frame.render_stateful_widget(table, area, &mut state);
}

fn render_row(row: &Row, app: &App) -> TableRow<'static> {
	let time_cell = |field: Field| {
		let focused = app.focus == Some(Focus::new(row.index, field));
		let text = if focused && !app.edit_buffer.is_empty() {
			pending_clock(&app.edit_buffer)
		} else {
			match row.time(field) {
				Some(time) => format_clock(Some(time)),
				None => "--:--".to_string(),
			}
		};

		let style = if focused {
			Style::default()
				.fg(Color::Black)
				.bg(FOCUSED_CELL_COLOR)
				.add_modifier(Modifier::BOLD)
		} else if row.time(field).is_none() {
			Style::default().fg(Color::DarkGray)
		} else {
			Style::default()
		};
		Cell::from(text).style(style)
	};

	let subtotal = match row.status {
		RowStatus::Adjusted => Cell::from(format!("{} *", row.subtotal_label()))
			.style(Style::default().fg(ADJUSTED_COLOR)),
		RowStatus::Fresh | RowStatus::Incomplete => {
			Cell::from(row.subtotal_label()).style(Style::default().fg(Color::DarkGray))
		}
		RowStatus::Computed => Cell::from(row.subtotal_label()),
	};

	TableRow::new(vec![
		Cell::from(format!("{:>2}", row.index)),
		time_cell(Field::Start),
		time_cell(Field::End),
		subtotal,
	])
}

fn render_legend_panel(frame: &mut Frame, area: Rect) {
	let mut lines = Vec::new();
	for (category, bindings) in keymap::legend() {
		lines.push(Line::from(Span::styled(
			category.title(),
			Style::default().add_modifier(Modifier::BOLD),
		)));
		for binding in bindings {
			lines.push(Line::from(vec![
				Span::styled(
					format!("  {:<6}", keymap::key_label(binding.key)),
					Style::default().fg(Color::Yellow),
				),
				Span::raw(binding.description),
			]));
		}
	}
	lines.push(Line::from(""));
	lines.push(Line::from("0-9 type HHMM | Esc blur | i focus | q quit"));

	let legend = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Keymap"));
	frame.render_widget(legend, area);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App, store: &RowStore) {
	let footer_lines = match &app.mode {
		InputMode::Normal => vec![
			Line::from(vec![
				Span::styled(
					format!("Total: {}", store.total_label()),
					Style::default().add_modifier(Modifier::BOLD),
				),
				Span::raw(format!(" | {}", app.focus_hint())),
			]),
			Line::from(
				app.notice
					.as_ref()
					.map(|notice| notice.text.clone())
					.unwrap_or_else(|| "? keymap | q quit".to_string()),
			),
		],
		InputMode::Prompt(prompt) => vec![
			Line::from(format!("{} > {}", prompt.title, prompt.input)),
			Line::from(
				app.notice
					.as_ref()
					.map(|notice| notice.text.clone())
					.unwrap_or_else(|| "Enter submit | Esc cancel".to_string()),
			),
		],
	};

	let footer = Paragraph::new(footer_lines).block(Block::default().borders(Borders::ALL));
	frame.render_widget(footer, area);
}

fn handle_normal_key(app: &mut App, code: KeyCode, store: &mut RowStore) -> bool {
	match code {
		KeyCode::Char('q') => return true,
		KeyCode::Esc => {
			if !app.edit_buffer.is_empty() {
				app.edit_buffer.clear();
			} else if let Some(focus) = app.focus.take() {
				app.last_focus = focus;
			}
			return false;
		}
		KeyCode::Tab | KeyCode::Char('i') => {
			if app.focus.is_none() {
				let row = app.last_focus.row.clamp(1, store.len());
				app.focus = Some(Focus::new(row, app.last_focus.field));
			}
			return false;
		}
		KeyCode::Backspace => {
			app.edit_buffer.pop();
			return false;
		}
		KeyCode::Char('e') => {
			app.mode = InputMode::Prompt(PromptState::new("x: hours per adjustment", PromptKind::DeltaHours));
			app.edit_buffer.clear();
			return false;
		}
		KeyCode::Char('t') => {
			app.mode = InputMode::Prompt(PromptState::new("y: hour threshold", PromptKind::ThresholdHours));
			app.edit_buffer.clear();
			return false;
		}
		KeyCode::Char(value) if value.is_ascii_digit() => {
			handle_digit_input(app, value, store);
			return false;
		}
		_ => {}
	}

	let Some(action) = keymap::lookup(code) else {
		return false;
	};
	app.edit_buffer.clear();

	match keymap::apply(action, store, &mut app.focus) {
		Effect::Ignored => {}
		Effect::Applied => {
			if action == keymap::Action::ToggleAdjustment {
				let state = if store.rule.enabled { "on" } else { "off" };
				app.notify(format!("Adjustment {state} | total {}", store.total_label()));
			}
		}
		Effect::Copy { what, text } => {
			let label = match what {
				YankKind::Total => format!("total {text}"),
				YankKind::Table => format!("table ({} rows)", store.len()),
			};
			match copy_to_clipboard(&text) {
				Ok(()) => app.notify(format!("Yanked {label}")),
				Err(err) => {
					warn!(%err, "clipboard write failed");
					app.notify("Clipboard unavailable");
				}
			}
		}
		Effect::ToggleLegend => app.show_legend = !app.show_legend,
	}

	if let Some(focus) = app.focus {
		app.last_focus = focus;
	}

	false
}

fn handle_digit_input(app: &mut App, digit: char, store: &mut RowStore) {
	let Some(focus) = app.focus else {
		return;
	};

	app.edit_buffer.push(digit);
	if app.edit_buffer.len() < 4 {
		return;
	}

	let buffer = std::mem::take(&mut app.edit_buffer);
	let hour = buffer[0..2].parse::<u32>();
	let minute = buffer[2..4].parse::<u32>();
	let (hour, minute) = match (hour, minute) {
		(Ok(hour), Ok(minute)) if hour < 24 && minute < 60 => (hour, minute),
		_ => {
			app.notify(format!("invalid time '{buffer}', expected HHMM"));
			return;
		}
	};

	store.update_row(focus.row, focus.field, &format!("{hour:02}:{minute:02}"));
}

fn handle_prompt_key(app: &mut App, code: KeyCode, store: &mut RowStore) -> bool {
	match code {
		KeyCode::Esc => {
			app.mode = InputMode::Normal;
			app.notify("Input cancelled");
		}
		KeyCode::Backspace => {
			if let InputMode::Prompt(prompt) = &mut app.mode {
				prompt.input.pop();
			}
		}
		KeyCode::Char(value) => {
			if let InputMode::Prompt(prompt) = &mut app.mode {
				prompt.input.push(value);
			}
		}
		KeyCode::Enter => {
			let prompt = match std::mem::replace(&mut app.mode, InputMode::Normal) {
				InputMode::Prompt(prompt) => prompt,
				InputMode::Normal => return false,
			};

			match submit_prompt(&prompt, store) {
				Ok(message) => app.notify(message),
				Err(err) => {
					app.mode = InputMode::Prompt(prompt);
					app.notify(format!("error: {err}"));
				}
			}
		}
		_ => {}
	}

	false
}

fn submit_prompt(prompt: &PromptState, store: &mut RowStore) -> Result<String, String> {
	let value = prompt
		.input
		.trim()
		.parse::<f64>()
		.ok()
		.filter(|value| value.is_finite())
		.ok_or_else(|| format!("'{}' is not a number", prompt.input.trim()))?;

	match prompt.kind {
		PromptKind::DeltaHours => {
			store.set_delta_hours(value);
			Ok(format!("x set to {value:+.2} h"))
		}
		PromptKind::ThresholdHours => {
			if value <= 0.0 {
				return Err("y must be greater than zero".to_string());
			}
			store.set_threshold_hours(value);
			Ok(format!("y set to {value:.2} h"))
		}
	}
}

fn copy_to_clipboard(text: &str) -> Result<(), arboard::Error> {
	let mut clipboard = arboard::Clipboard::new()?;
	clipboard.set_text(text)
}

fn pending_clock(buffer: &str) -> String {
	let mut pending = buffer.to_string();
	while pending.len() < 4 {
		pending.push('_');
	}
	format!("{}:{}", &pending[0..2], &pending[2..4])
}

fn border_style(focused: bool) -> Style {
	if focused {
		Style::default().fg(FOCUSED_PANEL_BORDER_COLOR)
	} else {
		Style::default().fg(INACTIVE_PANEL_BORDER_COLOR)
	}
}

#[derive(Clone)]
struct PromptState {
	title: String,
	input: String,
	kind: PromptKind,
}

impl PromptState {
	fn new(title: impl Into<String>, kind: PromptKind) -> Self {
		Self {
			title: title.into(),
			input: String::new(),
			kind,
		}
	}
}

#[derive(Clone, Copy)]
enum PromptKind {
	DeltaHours,
	ThresholdHours,
}

enum InputMode {
	Normal,
	Prompt(PromptState),
}

struct Notice {
	text: String,
	shown_at: Instant,
}

struct App {
	mode: InputMode,
	focus: Option<Focus>,
	last_focus: Focus,
	edit_buffer: String,
	show_legend: bool,
	notice: Option<Notice>,
}

impl Default for App {
	fn default() -> Self {
		Self {
			mode: InputMode::Normal,
			focus: Some(Focus::first()),
			last_focus: Focus::first(),
			edit_buffer: String::new(),
			show_legend: true,
			notice: None,
		}
	}
}

impl App {
	fn notify(&mut self, text: impl Into<String>) {
		self.notice = Some(Notice {
			text: text.into(),
			shown_at: Instant::now(),
		});
	}

	fn expire_notice(&mut self, now: Instant) {
		let expired = self
			.notice
			.as_ref()
			.is_some_and(|notice| now.duration_since(notice.shown_at) >= NOTICE_TTL);
		if expired {
			self.notice = None;
		}
	}

	fn focus_hint(&self) -> String {
		let Some(focus) = self.focus else {
			return "no field focused (i to focus)".to_string();
		};
		if self.edit_buffer.is_empty() {
			format!("row {} {}: type HHMM", focus.row, focus.field.label())
		} else {
			format!(
				"row {} {}: {}",
				focus.row,
				focus.field.label(),
				pending_clock(&self.edit_buffer)
			)
		}
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use chrono::NaiveTime;
	use crossterm::event::KeyCode;

	use super::{handle_normal_key, handle_prompt_key, pending_clock, App, InputMode};
	use crate::domain::{Field, RowStore};
	use crate::keymap::Focus;

	fn press(app: &mut App, store: &mut RowStore, keys: &str) {
		for key in keys.chars() {
			let code = KeyCode::Char(key);
			if matches!(app.mode, InputMode::Prompt(_)) {
				handle_prompt_key(app, code, store);
			} else {
				handle_normal_key(app, code, store);
			}
		}
	}

	#[test]
	fn typing_four_digits_commits_time() {
		let mut app = App::default();
		let mut store = RowStore::default();

		press(&mut app, &mut store, "l17");
		assert_eq!(app.edit_buffer, "17");
		assert_eq!(pending_clock(&app.edit_buffer), "17:__");

		press(&mut app, &mut store, "30");
		assert!(app.edit_buffer.is_empty());
		assert_eq!(store.rows()[0].end, NaiveTime::from_hms_opt(17, 30, 0));
		assert_eq!(store.total_label(), "8.50");
	}

	#[test]
	fn invalid_digits_are_rejected() {
		let mut app = App::default();
		let mut store = RowStore::default();

		press(&mut app, &mut store, "2561");
		assert!(app.edit_buffer.is_empty());
		assert_eq!(store.rows()[0].start, NaiveTime::from_hms_opt(9, 0, 0));
		assert!(app.notice.is_some());
	}

	#[test]
	fn escape_blurs_and_i_restores_focus() {
		let mut app = App::default();
		let mut store = RowStore::default();
		press(&mut app, &mut store, "ojl");
		assert_eq!(app.focus, Some(Focus::new(2, Field::End)));

		handle_normal_key(&mut app, KeyCode::Esc, &mut store);
		assert_eq!(app.focus, None);

		press(&mut app, &mut store, "jd1234");
		assert_eq!(store.len(), 2);

		press(&mut app, &mut store, "i");
		assert_eq!(app.focus, Some(Focus::new(2, Field::End)));
	}

	#[test]
	fn prompt_updates_threshold() {
		let mut app = App::default();
		let mut store = RowStore::default();
		store.update_row(1, Field::End, "21:00");
		press(&mut app, &mut store, "a");
		assert_eq!(store.total_label(), "11.00");

		press(&mut app, &mut store, "t4");
		handle_prompt_key(&mut app, KeyCode::Enter, &mut store);
		assert!(matches!(app.mode, InputMode::Normal));
		assert_eq!(store.total_label(), "10.50");

		press(&mut app, &mut store, "t0");
		handle_prompt_key(&mut app, KeyCode::Enter, &mut store);
		assert!(matches!(app.mode, InputMode::Prompt(_)));
		assert_eq!(store.rule.threshold_hours, 4.0);
	}

	#[test]
	fn notices_fade() {
		let mut app = App::default();
		app.notify("hello");
		let shown_at = app.notice.as_ref().map(|notice| notice.shown_at).expect("notice");

		app.expire_notice(shown_at + Duration::from_millis(500));
		assert!(app.notice.is_some());
		app.expire_notice(shown_at + Duration::from_secs(3));
		assert!(app.notice.is_none());
	}
}
