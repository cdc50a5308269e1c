use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use utoipa::ToSchema;

use crate::model::leave_application::DayType;

/// Fixed identity of the synthetic leave line. There is at most one such
/// entry per week and users never edit it directly.
pub const LEAVE_PROJECT: &str = "Leave";
pub const LEAVE_TASK: &str = "Leave Approved";

pub const FULL_DAY_HOURS: f64 = 9.5;
pub const HALF_DAY_HOURS: f64 = 4.75;

pub const DAYS_PER_WEEK: usize = 7;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Project,
    Leave,
}

/// One line of a weekly timesheet. `hours` is Monday..Sunday. `locked_days`
/// is carried on project entries only; the leave line has none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TimesheetEntry {
    #[schema(example = "Atlas Migration")]
    pub project: String,

    #[schema(example = "Backend")]
    pub task: String,

    #[serde(rename = "type")]
    #[schema(example = "project")]
    pub entry_type: EntryType,

    #[schema(value_type = Vec<f64>)]
    pub hours: [f64; DAYS_PER_WEEK],

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<bool>>, nullable = true)]
    pub locked_days: Option<[bool; DAYS_PER_WEEK]>,
}

impl TimesheetEntry {
    pub fn leave_line() -> Self {
        Self {
            project: LEAVE_PROJECT.to_string(),
            task: LEAVE_TASK.to_string(),
            entry_type: EntryType::Leave,
            hours: [0.0; DAYS_PER_WEEK],
            locked_days: None,
        }
    }

    pub fn is_leave_line(&self) -> bool {
        self.entry_type == EntryType::Leave
    }

    pub fn total_hours(&self) -> f64 {
        self.hours.iter().sum()
    }
}

/// A weekly timesheet document. Entries live in a single JSON column so the
/// whole week is written atomically; `version` backs the conditional write
/// used by the synchronizer.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Timesheet {
    pub id: u64,
    pub employee_id: u64,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub entries: Json<Vec<TimesheetEntry>>,
    pub version: i64,
}

/// Monday of the ISO week containing `day`.
pub fn week_start_of(day: NaiveDate) -> NaiveDate {
    day - Duration::days(day.weekday().num_days_from_monday() as i64)
}

/// 0 = Monday .. 6 = Sunday.
pub fn day_index(day: NaiveDate) -> usize {
    day.weekday().num_days_from_monday() as usize
}

impl Timesheet {
    /// A not-yet-persisted week (`id == 0`).
    pub fn new_week(employee_id: u64, week_start: NaiveDate) -> Self {
        let week_start = week_start_of(week_start);
        Self {
            id: 0,
            employee_id,
            week_start,
            week_end: week_start + Duration::days(6),
            entries: Json(Vec::new()),
            version: 0,
        }
    }

    fn leave_entry_mut(&mut self) -> &mut TimesheetEntry {
        let index = match self.entries.iter().position(TimesheetEntry::is_leave_line) {
            Some(index) => index,
            None => {
                self.entries.push(TimesheetEntry::leave_line());
                self.entries.len() - 1
            }
        };
        &mut self.entries[index]
    }

    pub fn leave_entry(&self) -> Option<&TimesheetEntry> {
        self.entries.iter().find(|e| e.is_leave_line())
    }

    fn set_project_locks(&mut self, day: usize, locked: bool) {
        for entry in self
            .entries
            .iter_mut()
            .filter(|e| e.entry_type == EntryType::Project)
        {
            entry.locked_days.get_or_insert([false; DAYS_PER_WEEK])[day] = locked;
        }
    }

    /// Record an approved leave day. Full days lock every project entry for
    /// that day; half days explicitly unlock it, even over a previous lock.
    pub fn apply_leave_day(&mut self, day: usize, day_type: DayType) {
        let hours = match day_type {
            DayType::FullDay => FULL_DAY_HOURS,
            DayType::HalfDay => HALF_DAY_HOURS,
        };
        self.leave_entry_mut().hours[day] = hours;
        self.set_project_locks(day, day_type == DayType::FullDay);
    }

    /// Undo an approved leave day. Drops the leave line once its week total
    /// is back to zero.
    pub fn revert_leave_day(&mut self, day: usize) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.is_leave_line()) {
            entry.hours[day] = 0.0;
        }
        if self
            .leave_entry()
            .map(|e| e.total_hours() == 0.0)
            .unwrap_or(false)
        {
            self.entries.retain(|e| !e.is_leave_line());
        }
        self.set_project_locks(day, false);
    }

    /// Days carrying full-day approved leave, derived from the leave line.
    /// Used to guard user edits without a second store read.
    pub fn full_day_leave_mask(&self) -> [bool; DAYS_PER_WEEK] {
        let mut mask = [false; DAYS_PER_WEEK];
        if let Some(entry) = self.leave_entry() {
            for (day, hours) in entry.hours.iter().enumerate() {
                mask[day] = *hours == FULL_DAY_HOURS;
            }
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn project_entry() -> TimesheetEntry {
        TimesheetEntry {
            project: "Atlas".to_string(),
            task: "Backend".to_string(),
            entry_type: EntryType::Project,
            hours: [8.0, 8.0, 8.0, 8.0, 8.0, 0.0, 0.0],
            locked_days: None,
        }
    }

    #[test]
    fn week_start_is_monday_anchored() {
        // 2025-03-12 is a Wednesday.
        assert_eq!(week_start_of(date(2025, 3, 12)), date(2025, 3, 10));
        // A Monday maps to itself, a Sunday back to the preceding Monday.
        assert_eq!(week_start_of(date(2025, 3, 10)), date(2025, 3, 10));
        assert_eq!(week_start_of(date(2025, 3, 16)), date(2025, 3, 10));
    }

    #[test]
    fn day_index_runs_monday_to_sunday() {
        assert_eq!(day_index(date(2025, 3, 10)), 0);
        assert_eq!(day_index(date(2025, 3, 14)), 4);
        assert_eq!(day_index(date(2025, 3, 16)), 6);
    }

    #[test]
    fn full_day_sets_hours_and_locks_projects() {
        let mut sheet = Timesheet::new_week(1, date(2025, 3, 10));
        sheet.entries.push(project_entry());

        sheet.apply_leave_day(0, DayType::FullDay);
        sheet.apply_leave_day(1, DayType::FullDay);

        let leave = sheet.leave_entry().unwrap();
        assert_eq!(leave.project, LEAVE_PROJECT);
        assert_eq!(leave.task, LEAVE_TASK);
        assert_eq!(leave.hours, [9.5, 9.5, 0.0, 0.0, 0.0, 0.0, 0.0]);

        let project = &sheet.entries[0];
        assert_eq!(
            project.locked_days,
            Some([true, true, false, false, false, false, false])
        );
    }

    #[test]
    fn half_day_never_locks_even_over_a_previous_lock() {
        let mut sheet = Timesheet::new_week(1, date(2025, 3, 10));
        sheet.entries.push(project_entry());

        sheet.apply_leave_day(2, DayType::FullDay);
        assert_eq!(sheet.entries[0].locked_days.unwrap()[2], true);

        sheet.apply_leave_day(2, DayType::HalfDay);
        let leave = sheet.leave_entry().unwrap();
        assert_eq!(leave.hours[2], HALF_DAY_HOURS);
        assert_eq!(sheet.entries[0].locked_days.unwrap()[2], false);
    }

    #[test]
    fn only_one_leave_line_per_week() {
        let mut sheet = Timesheet::new_week(1, date(2025, 3, 10));
        sheet.apply_leave_day(0, DayType::FullDay);
        sheet.apply_leave_day(3, DayType::FullDay);

        let leave_lines = sheet.entries.iter().filter(|e| e.is_leave_line()).count();
        assert_eq!(leave_lines, 1);
    }

    #[test]
    fn apply_is_idempotent() {
        let mut once = Timesheet::new_week(1, date(2025, 3, 10));
        once.entries.push(project_entry());
        let mut twice = once.clone();

        once.apply_leave_day(0, DayType::FullDay);
        twice.apply_leave_day(0, DayType::FullDay);
        twice.apply_leave_day(0, DayType::FullDay);

        assert_eq!(once.entries.0, twice.entries.0);
    }

    #[test]
    fn revert_restores_pre_approval_state() {
        let mut sheet = Timesheet::new_week(1, date(2025, 3, 10));
        sheet.entries.push(project_entry());
        let before = sheet.entries.0.clone();

        sheet.apply_leave_day(0, DayType::FullDay);
        sheet.apply_leave_day(1, DayType::FullDay);
        sheet.revert_leave_day(0);
        sheet.revert_leave_day(1);

        // Leave line is gone and project locks are back to explicit false.
        assert!(sheet.leave_entry().is_none());
        assert_eq!(sheet.entries[0].hours, before[0].hours);
        assert_eq!(sheet.entries[0].locked_days, Some([false; 7]));
    }

    #[test]
    fn revert_keeps_leave_line_while_other_days_remain() {
        let mut sheet = Timesheet::new_week(1, date(2025, 3, 10));
        sheet.apply_leave_day(0, DayType::FullDay);
        sheet.apply_leave_day(1, DayType::HalfDay);

        sheet.revert_leave_day(0);
        let leave = sheet.leave_entry().unwrap();
        assert_eq!(leave.hours, [0.0, 4.75, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn full_day_mask_reflects_leave_hours_only() {
        let mut sheet = Timesheet::new_week(1, date(2025, 3, 10));
        sheet.apply_leave_day(0, DayType::FullDay);
        sheet.apply_leave_day(1, DayType::HalfDay);

        assert_eq!(
            sheet.full_day_leave_mask(),
            [true, false, false, false, false, false, false]
        );
    }

    #[test]
    fn entry_serializes_with_wire_field_names() {
        let entry = TimesheetEntry::leave_line();
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "leave");
        assert_eq!(value["project"], "Leave");
        assert!(value.get("locked_days").is_none());
    }
}
