use chrono::{Duration, NaiveTime, Timelike};
use tracing::{debug, warn};

pub const PLACEHOLDER_SUBTOTAL: &str = "---";
pub const DEFAULT_DELTA_HOURS: f64 = -0.5;
pub const DEFAULT_THRESHOLD_HOURS: f64 = 6.0;

const MS_PER_MINUTE: i64 = 60 * 1000;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

pub fn default_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).expect("09:00 is a valid time")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Start,
    End,
}

impl Field {
    pub fn label(self) -> &'static str {
        match self {
            Field::Start => "start",
            Field::End => "end",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Fresh,
    Incomplete,
    Computed,
    Adjusted,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustmentRule {
    pub enabled: bool,
    pub delta_hours: f64,
    pub threshold_hours: f64,
}

impl Default for AdjustmentRule {
    fn default() -> Self {
        Self {
            enabled: false,
            delta_hours: DEFAULT_DELTA_HOURS,
            threshold_hours: DEFAULT_THRESHOLD_HOURS,
        }
    }
}

impl AdjustmentRule {
    pub fn validate(&self) -> Result<(), String> {
        if !self.delta_hours.is_finite() {
            return Err(format!("delta_hours must be a finite number, got {}", self.delta_hours));
        }
        if !self.threshold_hours.is_finite() || self.threshold_hours <= 0.0 {
            return Err(format!(
                "threshold_hours must be greater than zero, got {}",
                self.threshold_hours
            ));
        }
        Ok(())
    }

    // floor(whole_hours / threshold) * delta, bounded to [-raw, 24h]
    pub fn adjustment_for(&self, raw: Duration) -> Option<Duration> {
        if !self.enabled || self.validate().is_err() {
            return None;
        }

        let whole_hours = (raw.num_milliseconds() / MS_PER_HOUR) as f64;
        if whole_hours < self.threshold_hours {
            return None;
        }

        let units = (whole_hours / self.threshold_hours).floor();
        let floor_ms = -(raw.num_milliseconds().max(0) as f64);
        let adjustment_ms = (units * self.delta_hours * MS_PER_HOUR as f64)
            .round()
            .clamp(floor_ms, MS_PER_DAY as f64);
        Duration::try_milliseconds(adjustment_ms as i64)
    }
}

#[derive(Debug, Clone)]
pub struct Row {
    pub index: usize,
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
    pub duration: Duration,
    pub status: RowStatus,
}

impl Row {
    fn new(index: usize, default_time: NaiveTime) -> Self {
        Self {
            index,
            start: Some(default_time),
            end: Some(default_time),
            duration: Duration::zero(),
            status: RowStatus::Fresh,
        }
    }

    pub fn time(&self, field: Field) -> Option<NaiveTime> {
        match field {
            Field::Start => self.start,
            Field::End => self.end,
        }
    }

    fn set_time_value(&mut self, field: Field, value: Option<NaiveTime>) {
        match field {
            Field::Start => self.start = value,
            Field::End => self.end = value,
        }
    }

    fn recompute(&mut self, rule: &AdjustmentRule) {
        let (Some(start), Some(end)) = (self.start, self.end) else {
            self.duration = Duration::zero();
            self.status = RowStatus::Incomplete;
            return;
        };

        let mut raw = end.signed_duration_since(start);
        if raw < Duration::zero() {
            raw += Duration::milliseconds(MS_PER_DAY);
        }

        match rule.adjustment_for(raw) {
            Some(adjustment) => {
                self.duration = raw
                    .checked_add(&adjustment)
                    .unwrap_or(raw)
                    .max(Duration::zero());
                self.status = RowStatus::Adjusted;
            }
            None => {
                self.duration = raw;
                self.status = RowStatus::Computed;
            }
        }
    }

    pub fn subtotal_hours(&self) -> f64 {
        fractional_hours(self.duration)
    }

    pub fn subtotal_label(&self) -> String {
        match self.status {
            RowStatus::Fresh | RowStatus::Incomplete => PLACEHOLDER_SUBTOTAL.to_string(),
            RowStatus::Computed | RowStatus::Adjusted => format_hours(self.subtotal_hours()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowUpdate {
    Computed,
    Adjusted,
    Incomplete,
    Missing,
}

#[derive(Debug, Clone)]
pub struct RowStore {
    rows: Vec<Row>,
    pub rule: AdjustmentRule,
    default_time: NaiveTime,
}

impl Default for RowStore {
    fn default() -> Self {
        Self::new(default_time(), AdjustmentRule::default())
    }
}

impl RowStore {
    pub fn new(default_time: NaiveTime, rule: AdjustmentRule) -> Self {
        let mut store = Self {
            rows: Vec::new(),
            rule,
            default_time,
        };
        store.add_row();
        store
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.iter().find(|row| row.index == index)
    }

    fn row_mut(&mut self, index: usize) -> Option<&mut Row> {
        self.rows.iter_mut().find(|row| row.index == index)
    }

    pub fn add_row(&mut self) -> usize {
        let index = self.rows.len() + 1;
        self.rows.push(Row::new(index, self.default_time));
        debug!(index, "added row");
        index
    }

    // returns the index that should receive focus
    pub fn delete_row(&mut self, index: usize) -> Option<usize> {
        let Some(position) = self.rows.iter().position(|row| row.index == index) else {
            warn!(index, rows = self.rows.len(), "delete ignored: no such row");
            return None;
        };

        self.rows.remove(position);
        debug!(index, total = %self.total_label(), "deleted row");

        if self.rows.is_empty() {
            self.reset();
        } else {
            self.renumber();
        }

        Some(index.min(self.rows.len()))
    }

    pub fn update_row(&mut self, index: usize, field: Field, raw: &str) -> RowUpdate {
        let trimmed = raw.trim();
        let value = if trimmed.is_empty() {
            None
        } else {
            match parse_clock(trimmed) {
                Some(time) => Some(time),
                None => {
                    debug!(index, field = field.label(), raw, "unparseable time treated as blank");
                    None
                }
            }
        };
        self.set_time(index, field, value)
    }

    pub fn set_time(&mut self, index: usize, field: Field, value: Option<NaiveTime>) -> RowUpdate {
        let rule = self.rule;
        let Some(row) = self.row_mut(index) else {
            warn!(index, field = field.label(), "update ignored: no such row");
            return RowUpdate::Missing;
        };

        row.set_time_value(field, value);
        row.recompute(&rule);
        debug!(
            index,
            field = field.label(),
            subtotal = %row.subtotal_label(),
            "updated row"
        );

        match row.status {
            RowStatus::Adjusted => RowUpdate::Adjusted,
            RowStatus::Incomplete => RowUpdate::Incomplete,
            RowStatus::Fresh | RowStatus::Computed => RowUpdate::Computed,
        }
    }

    pub fn renumber(&mut self) {
        for (position, row) in self.rows.iter_mut().enumerate() {
            row.index = position + 1;
        }
    }

    pub fn recompute_all(&mut self) {
        let rule = self.rule;
        for row in self.rows.iter_mut().filter(|row| row.status != RowStatus::Fresh) {
            row.recompute(&rule);
        }
    }

    pub fn toggle_adjustment(&mut self) -> bool {
        self.rule.enabled = !self.rule.enabled;
        self.recompute_all();
        self.rule.enabled
    }

    pub fn set_delta_hours(&mut self, delta_hours: f64) {
        self.rule.delta_hours = delta_hours;
        self.recompute_all();
    }

    pub fn set_threshold_hours(&mut self, threshold_hours: f64) {
        self.rule.threshold_hours = threshold_hours;
        self.recompute_all();
    }

    pub fn reset(&mut self) {
        self.rows.clear();
        self.add_row();
        self.rule.enabled = false;
        debug!("reset table");
    }

    pub fn total_duration(&self) -> Duration {
        self.rows
            .iter()
            .fold(Duration::zero(), |total, row| total + row.duration)
    }

    pub fn total(&self) -> f64 {
        fractional_hours(self.total_duration())
    }

    pub fn total_label(&self) -> String {
        format_hours(self.total())
    }

    pub fn yank_table(&self) -> String {
        let mut lines = self
            .rows
            .iter()
            .map(|row| {
                format!(
                    "{}\t{}\t{}",
                    format_clock(row.start),
                    format_clock(row.end),
                    format_hours(row.subtotal_hours())
                )
            })
            .collect::<Vec<_>>();
        lines.push(String::new());
        lines.push(self.total_label());
        lines.join("\n")
    }
}

pub fn parse_clock(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
        .and_then(|time| time.with_second(0))
}

pub fn format_clock(time: Option<NaiveTime>) -> String {
    time.map(|time| time.format("%H:%M").to_string())
        .unwrap_or_default()
}

pub fn fractional_hours(duration: Duration) -> f64 {
    let ms = duration.num_milliseconds().max(0);
    let hours = ms / MS_PER_HOUR;
    let minutes = (ms / MS_PER_MINUTE) % 60;
    let fractional = hours as f64 + minutes as f64 / 60.0;
    (fractional * 100.0).round() / 100.0
}

pub fn format_hours(hours: f64) -> String {
    format!("{hours:.2}")
}
