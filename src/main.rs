mod config;
mod domain;
mod keymap;
mod logging;
mod paths;
mod ui;

use std::error::Error;
use std::path::PathBuf;

use chrono::NaiveTime;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::{load_config, save_config, Config};
use crate::domain::{parse_clock, Field, RowStore};
use crate::logging::{enable_logging, parse_level};
use crate::paths::{resolve_config_path, state_dir};
use crate::ui::run_dashboard;

#[derive(Debug, Parser)]
#[command(name = "timediff", about = "Keyboard-driven time difference calculator")]
struct Cli {
	#[arg(long, global = true)]
	config: Option<PathBuf>,
	#[arg(long, global = true)]
	log_level: Option<String>,
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	Dashboard,
	/// Print the table dump for START-END spans, e.g. `09:00-17:00 23:00-01:00`.
	Calc {
		#[arg(long)]
		adjust: bool,
		#[arg(long, allow_negative_numbers = true)]
		delta: Option<f64>,
		#[arg(long)]
		threshold: Option<f64>,
		#[arg(long)]
		total_only: bool,
		#[arg(required = true)]
		spans: Vec<String>,
	},
	Keys,
	InitConfig,
	ConfigPath,
}

fn main() {
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();
	let config_path = resolve_config_path(cli.config);

	match cli.command {
		Some(Command::ConfigPath) => {
			println!("{}", config_path.display());
			return Ok(());
		}
		Some(Command::InitConfig) => {
			save_config(&config_path, &Config::default())?;
			println!("wrote default config to {}", config_path.display());
			return Ok(());
		}
		Some(Command::Keys) => {
			for line in keymap::legend_lines() {
				println!("{line}");
			}
			return Ok(());
		}
		_ => {}
	}

	let config = load_config(&config_path)?;
	let level = parse_level(
		cli.log_level
			.as_deref()
			.or(config.log_level.as_deref())
			.unwrap_or("info"),
	)?;
	if let Err(err) = enable_logging(&state_dir(), level) {
		eprintln!("warning: logging disabled: {err}");
	}
	info!(config = %config_path.display(), "starting");

	let mut store = RowStore::new(config.default_time()?, config.rule());

	match cli.command.unwrap_or(Command::Dashboard) {
		Command::Dashboard => {
			run_dashboard(&mut store)?;
		}
		Command::Calc {
			adjust,
			delta,
			threshold,
			total_only,
			spans,
		} => {
			apply_calc_flags(&mut store, adjust, delta, threshold)?;
			fill_rows(&mut store, &spans)?;
			if total_only {
				println!("{}", store.total_label());
			} else {
				println!("{}", store.yank_table());
			}
		}
		Command::Keys | Command::InitConfig | Command::ConfigPath => {}
	}

	Ok(())
}

fn apply_calc_flags(
	store: &mut RowStore,
	adjust: bool,
	delta: Option<f64>,
	threshold: Option<f64>,
) -> Result<(), String> {
	let mut rule = store.rule;
	rule.enabled |= adjust;
	if let Some(delta) = delta {
		rule.delta_hours = delta;
	}
	if let Some(threshold) = threshold {
		rule.threshold_hours = threshold;
	}
	rule.validate()?;
	store.rule = rule;
	Ok(())
}

fn fill_rows(store: &mut RowStore, spans: &[String]) -> Result<(), Box<dyn Error>> {
	for (position, span) in spans.iter().enumerate() {
		let (start, end) = parse_span(span)?;
		let index = if position == 0 { 1 } else { store.add_row() };
		store.set_time(index, Field::Start, Some(start));
		store.set_time(index, Field::End, Some(end));
	}
	Ok(())
}

fn parse_span(raw: &str) -> Result<(NaiveTime, NaiveTime), String> {
	let invalid = || format!("invalid span '{raw}', expected HH:MM-HH:MM");
	let (start, end) = raw.split_once('-').ok_or_else(invalid)?;
	let start = parse_clock(start.trim()).ok_or_else(invalid)?;
	let end = parse_clock(end.trim()).ok_or_else(invalid)?;
	Ok((start, end))
}
