use chrono::{Duration, Timelike};
use crossterm::event::KeyCode;
use tracing::debug;

use crate::domain::{Field, RowStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveDown,
    MoveUp,
    MoveLeft,
    MoveRight,
    GoFirst,
    GoLast,
    NextRow,
    DecreaseMinute,
    IncreaseMinute,
    DecreaseHour,
    IncreaseHour,
    ToggleMidday,
    NewRow,
    DeleteRow,
    ClearField,
    ResetTable,
    YankTotal,
    YankTable,
    ToggleAdjustment,
    ToggleLegend,
}

impl Action {
    pub fn category(self) -> Category {
        match self {
            Action::MoveDown
            | Action::MoveUp
            | Action::MoveLeft
            | Action::MoveRight
            | Action::GoFirst
            | Action::GoLast
            | Action::NextRow => Category::Navigation,
            Action::DecreaseMinute
            | Action::IncreaseMinute
            | Action::DecreaseHour
            | Action::IncreaseHour
            | Action::ToggleMidday => Category::Time,
            Action::NewRow | Action::DeleteRow | Action::ClearField | Action::ResetTable => {
                Category::Rows
            }
            Action::YankTotal | Action::YankTable => Category::Clipboard,
            Action::ToggleAdjustment => Category::Adjustment,
            Action::ToggleLegend => Category::View,
        }
    }

    pub fn requires_focus(self) -> bool {
        matches!(self.category(), Category::Navigation | Category::Time)
            || matches!(self, Action::DeleteRow | Action::ClearField)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Category {
    Navigation,
    Time,
    Rows,
    Clipboard,
    Adjustment,
    View,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Navigation,
        Category::Time,
        Category::Rows,
        Category::Clipboard,
        Category::Adjustment,
        Category::View,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Category::Navigation => "Navigate",
            Category::Time => "Adjust time",
            Category::Rows => "Rows",
            Category::Clipboard => "Yank",
            Category::Adjustment => "x per y",
            Category::View => "View",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Binding {
    pub key: KeyCode,
    pub action: Action,
    pub description: &'static str,
}

const fn bind(key: KeyCode, action: Action, description: &'static str) -> Binding {
    Binding {
        key,
        action,
        description,
    }
}

pub static KEYMAP: [Binding; 20] = [
    bind(KeyCode::Char('j'), Action::MoveDown, "move down a row"),
    bind(KeyCode::Char('k'), Action::MoveUp, "move up a row"),
    bind(KeyCode::Char('h'), Action::MoveLeft, "move to start time"),
    bind(KeyCode::Char('l'), Action::MoveRight, "move to end time"),
    bind(KeyCode::Char('g'), Action::GoFirst, "go to first row"),
    bind(KeyCode::Char('G'), Action::GoLast, "go to last row"),
    bind(KeyCode::Enter, Action::NextRow, "start of next row"),
    bind(KeyCode::Char('J'), Action::DecreaseMinute, "minute -1"),
    bind(KeyCode::Char('K'), Action::IncreaseMinute, "minute +1"),
    bind(KeyCode::Char('H'), Action::DecreaseHour, "hour -1"),
    bind(KeyCode::Char('L'), Action::IncreaseHour, "hour +1"),
    bind(KeyCode::Char('x'), Action::ToggleMidday, "toggle AM/PM"),
    bind(KeyCode::Char('o'), Action::NewRow, "new row"),
    bind(KeyCode::Char('d'), Action::DeleteRow, "delete row"),
    bind(KeyCode::Char('c'), Action::ClearField, "clear field"),
    bind(KeyCode::Char('R'), Action::ResetTable, "reset table"),
    bind(KeyCode::Char('y'), Action::YankTotal, "yank total"),
    bind(KeyCode::Char('Y'), Action::YankTable, "yank table"),
    bind(KeyCode::Char('a'), Action::ToggleAdjustment, "toggle adjustment"),
    bind(KeyCode::Char('?'), Action::ToggleLegend, "toggle this legend"),
];

pub fn lookup(key: KeyCode) -> Option<Action> {
    KEYMAP
        .iter()
        .find(|binding| binding.key == key)
        .map(|binding| binding.action)
}

pub fn key_label(key: KeyCode) -> String {
    match key {
        KeyCode::Char(value) => value.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        other => format!("{other:?}"),
    }
}

pub fn legend() -> Vec<(Category, Vec<&'static Binding>)> {
    Category::ALL
        .iter()
        .map(|category| {
            let bindings = KEYMAP
                .iter()
                .filter(|binding| binding.action.category() == *category)
                .collect::<Vec<_>>();
            (*category, bindings)
        })
        .collect()
}

pub fn legend_lines() -> Vec<String> {
    let mut lines = Vec::new();
    for (category, bindings) in legend() {
        lines.push(format!("{}:", category.title()));
        for binding in bindings {
            lines.push(format!("  {:<6} {}", key_label(binding.key), binding.description));
        }
    }
    lines
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Focus {
    pub row: usize,
    pub field: Field,
}

impl Focus {
    pub fn new(row: usize, field: Field) -> Self {
        Self { row, field }
    }

    pub fn first() -> Self {
        Self::new(1, Field::Start)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YankKind {
    Total,
    Table,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Ignored,
    Applied,
    Copy { what: YankKind, text: String },
    ToggleLegend,
}

pub fn apply(action: Action, store: &mut RowStore, focus: &mut Option<Focus>) -> Effect {
    let current = focus.map(|focus| clamp(focus, store.len()));
    if action.requires_focus() && current.is_none() {
        debug!(?action, "ignored: no focused time field");
        return Effect::Ignored;
    }

    let last = store.len();
    match (action, current) {
        (Action::MoveDown, Some(at)) => move_to(focus, Focus::new((at.row + 1).min(last), at.field)),
        (Action::MoveUp, Some(at)) => move_to(focus, Focus::new(at.row.saturating_sub(1).max(1), at.field)),
        (Action::MoveLeft, Some(at)) => move_to(focus, Focus::new(at.row, Field::Start)),
        (Action::MoveRight, Some(at)) => move_to(focus, Focus::new(at.row, Field::End)),
        (Action::GoFirst, Some(_)) => move_to(focus, Focus::first()),
        (Action::GoLast, Some(_)) => move_to(focus, Focus::new(last, Field::Start)),
        (Action::NextRow, Some(at)) => move_to(focus, Focus::new((at.row + 1).min(last), Field::Start)),
        (Action::DecreaseMinute, Some(at)) => shift_time(store, at, Duration::minutes(-1)),
        (Action::IncreaseMinute, Some(at)) => shift_time(store, at, Duration::minutes(1)),
        (Action::DecreaseHour, Some(at)) => shift_time(store, at, Duration::hours(-1)),
        (Action::IncreaseHour, Some(at)) => shift_time(store, at, Duration::hours(1)),
        (Action::ToggleMidday, Some(at)) => toggle_midday(store, at),
        (Action::DeleteRow, Some(at)) => match store.delete_row(at.row) {
            Some(target) => move_to(focus, Focus::new(target, Field::Start)),
            None => Effect::Ignored,
        },
        (Action::ClearField, Some(at)) => {
            store.set_time(at.row, at.field, None);
            Effect::Applied
        }
        (Action::NewRow, _) => {
            store.add_row();
            Effect::Applied
        }
        (Action::ResetTable, _) => {
            store.reset();
            *focus = Some(Focus::first());
            Effect::Applied
        }
        (Action::YankTotal, _) => Effect::Copy {
            what: YankKind::Total,
            text: store.total_label(),
        },
        (Action::YankTable, _) => Effect::Copy {
            what: YankKind::Table,
            text: store.yank_table(),
        },
        (Action::ToggleAdjustment, _) => {
            store.toggle_adjustment();
            Effect::Applied
        }
        (Action::ToggleLegend, _) => Effect::ToggleLegend,
        (_, None) => Effect::Ignored,
    }
}

fn clamp(focus: Focus, rows: usize) -> Focus {
    Focus::new(focus.row.clamp(1, rows.max(1)), focus.field)
}

fn move_to(focus: &mut Option<Focus>, target: Focus) -> Effect {
    *focus = Some(target);
    Effect::Applied
}

fn shift_time(store: &mut RowStore, at: Focus, delta: Duration) -> Effect {
    let Some(time) = store.row(at.row).and_then(|row| row.time(at.field)) else {
        return Effect::Ignored;
    };
    let (shifted, _) = time.overflowing_add_signed(delta);
    store.set_time(at.row, at.field, Some(shifted));
    Effect::Applied
}

fn toggle_midday(store: &mut RowStore, at: Focus) -> Effect {
    let Some(time) = store.row(at.row).and_then(|row| row.time(at.field)) else {
        return Effect::Ignored;
    };
    let delta = if time.hour() < 12 {
        Duration::hours(12)
    } else {
        Duration::hours(-12)
    };
    shift_time(store, at, delta)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;
    use crossterm::event::KeyCode;

    use super::{Action, Category, Effect, Focus, KEYMAP, YankKind, apply, legend, lookup};
    use crate::domain::{Field, RowStore};

    fn store_with_rows(rows: usize) -> RowStore {
        let mut store = RowStore::default();
        for _ in 1..rows {
            store.add_row();
        }
        store
    }

    fn run(store: &mut RowStore, focus: &mut Option<Focus>, actions: &[Action]) {
        for action in actions {
            apply(*action, store, focus);
        }
    }

    #[test]
    fn every_key_is_bound_once() {
        for binding in KEYMAP {
            let count = KEYMAP.iter().filter(|other| other.key == binding.key).count();
            assert_eq!(count, 1, "{:?} bound more than once", binding.key);
        }
        assert_eq!(lookup(KeyCode::Enter), Some(Action::NextRow));
        assert_eq!(lookup(KeyCode::Char('Y')), Some(Action::YankTable));
        assert_eq!(lookup(KeyCode::Char('z')), None);
    }

    #[test]
    fn legend_groups_all_bindings() {
        let groups = legend();
        let listed = groups.iter().map(|(_, bindings)| bindings.len()).sum::<usize>();
        assert_eq!(listed, KEYMAP.len());
        assert_eq!(groups[0].0, Category::Navigation);
    }

    #[test]
    fn vertical_moves_keep_field_and_clamp() {
        let mut store = store_with_rows(3);
        let mut focus = Some(Focus::new(1, Field::End));

        run(&mut store, &mut focus, &[Action::MoveUp]);
        assert_eq!(focus, Some(Focus::new(1, Field::End)));

        run(&mut store, &mut focus, &[Action::MoveDown, Action::MoveDown, Action::MoveDown]);
        assert_eq!(focus, Some(Focus::new(3, Field::End)));

        run(&mut store, &mut focus, &[Action::MoveLeft]);
        assert_eq!(focus, Some(Focus::new(3, Field::Start)));
    }

    #[test]
    fn jumps_land_on_start_fields() {
        let mut store = store_with_rows(4);
        let mut focus = Some(Focus::new(2, Field::End));

        run(&mut store, &mut focus, &[Action::GoLast]);
        assert_eq!(focus, Some(Focus::new(4, Field::Start)));

        run(&mut store, &mut focus, &[Action::MoveRight, Action::GoFirst]);
        assert_eq!(focus, Some(Focus::first()));

        run(&mut store, &mut focus, &[Action::MoveRight, Action::NextRow]);
        assert_eq!(focus, Some(Focus::new(2, Field::Start)));

        run(&mut store, &mut focus, &[Action::GoLast, Action::NextRow]);
        assert_eq!(focus, Some(Focus::new(4, Field::Start)));
    }

    #[test]
    fn focus_bound_actions_are_ignored_without_focus() {
        let mut store = store_with_rows(2);
        let mut focus = None;

        for action in [Action::MoveDown, Action::DeleteRow, Action::ClearField, Action::IncreaseHour] {
            assert_eq!(apply(action, &mut store, &mut focus), Effect::Ignored);
        }
        assert_eq!(store.len(), 2);
        assert_eq!(focus, None);

        assert_eq!(apply(Action::NewRow, &mut store, &mut focus), Effect::Applied);
        assert_eq!(store.len(), 3);
        assert_eq!(apply(Action::ToggleLegend, &mut store, &mut focus), Effect::ToggleLegend);
        store.update_row(1, Field::End, "12:15");
        assert_eq!(
            apply(Action::YankTotal, &mut store, &mut focus),
            Effect::Copy {
                what: YankKind::Total,
                text: store.total_label(),
            }
        );
        assert_eq!(store.total_label(), "3.25");
    }

    #[test]
    fn delete_moves_focus_to_nearest_row() {
        let mut store = store_with_rows(3);
        let mut focus = Some(Focus::new(3, Field::End));

        run(&mut store, &mut focus, &[Action::DeleteRow]);
        assert_eq!(store.len(), 2);
        assert_eq!(focus, Some(Focus::new(2, Field::Start)));

        run(&mut store, &mut focus, &[Action::GoFirst, Action::DeleteRow]);
        assert_eq!(store.len(), 1);
        assert_eq!(focus, Some(Focus::first()));

        run(&mut store, &mut focus, &[Action::DeleteRow]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_label(), "0.00");
        assert_eq!(focus, Some(Focus::first()));
    }

    #[test]
    fn time_keys_step_and_wrap() {
        let mut store = store_with_rows(1);
        let mut focus = Some(Focus::new(1, Field::End));

        run(&mut store, &mut focus, &[Action::IncreaseHour, Action::IncreaseHour, Action::IncreaseMinute]);
        assert_eq!(store.rows()[0].end, NaiveTime::from_hms_opt(11, 1, 0));
        assert_eq!(store.total_label(), "2.02");

        run(&mut store, &mut focus, &[Action::ToggleMidday]);
        assert_eq!(store.rows()[0].end, NaiveTime::from_hms_opt(23, 1, 0));

        run(&mut store, &mut focus, &[Action::ToggleMidday, Action::MoveLeft]);
        store.update_row(1, Field::Start, "00:00");
        run(&mut store, &mut focus, &[Action::DecreaseMinute]);
        assert_eq!(store.rows()[0].start, NaiveTime::from_hms_opt(23, 59, 0));

        run(&mut store, &mut focus, &[Action::DecreaseHour]);
        assert_eq!(store.rows()[0].start, NaiveTime::from_hms_opt(22, 59, 0));
    }

    #[test]
    fn clear_then_time_key_is_ignored() {
        let mut store = store_with_rows(1);
        let mut focus = Some(Focus::first());

        assert_eq!(apply(Action::ClearField, &mut store, &mut focus), Effect::Applied);
        assert_eq!(store.rows()[0].start, None);
        assert_eq!(store.rows()[0].subtotal_label(), "---");
        assert_eq!(apply(Action::IncreaseHour, &mut store, &mut focus), Effect::Ignored);
    }

    #[test]
    fn reset_and_toggle_adjustment() {
        let mut store = store_with_rows(2);
        store.update_row(2, Field::End, "21:00");
        let mut focus = Some(Focus::new(2, Field::End));

        run(&mut store, &mut focus, &[Action::ToggleAdjustment]);
        assert!(store.rule.enabled);
        assert_eq!(store.total_label(), "11.00");

        run(&mut store, &mut focus, &[Action::ResetTable]);
        assert_eq!(store.len(), 1);
        assert!(!store.rule.enabled);
        assert_eq!(focus, Some(Focus::first()));
    }

    #[test]
    fn yank_table_effect_carries_dump() {
        let mut store = store_with_rows(1);
        store.update_row(1, Field::End, "17:30");
        let mut focus = None;

        let effect = apply(Action::YankTable, &mut store, &mut focus);
        assert_eq!(
            effect,
            Effect::Copy {
                what: YankKind::Table,
                text: "09:00\t17:30\t8.50\n\n8.50".to_string(),
            }
        );
    }

    #[test]
    fn stale_focus_is_clamped_to_live_rows() {
        let mut store = store_with_rows(2);
        let mut focus = Some(Focus::new(7, Field::End));

        run(&mut store, &mut focus, &[Action::MoveUp]);
        assert_eq!(focus, Some(Focus::new(1, Field::End)));
    }
}
