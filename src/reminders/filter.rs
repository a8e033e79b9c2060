//! List filtering and sorting

use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;

use crate::api::types::Reminder;
use crate::error::RemindrError;

/// Which reminders to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReminderFilter {
    /// Everything
    #[default]
    All,
    /// Open and scheduled in the future
    Upcoming,
    /// Completed, regardless of date
    Completed,
    /// Flagged important
    Important,
}

impl ReminderFilter {
    /// Whether `reminder` passes this filter at `now`
    pub fn matches(self, reminder: &Reminder, now: DateTime<Utc>) -> bool {
        match self {
            ReminderFilter::All => true,
            ReminderFilter::Upcoming => reminder.is_upcoming(now),
            ReminderFilter::Completed => reminder.is_completed,
            ReminderFilter::Important => reminder.is_important,
        }
    }
}

impl FromStr for ReminderFilter {
    type Err = RemindrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(ReminderFilter::All),
            "upcoming" => Ok(ReminderFilter::Upcoming),
            "completed" | "done" => Ok(ReminderFilter::Completed),
            "important" => Ok(ReminderFilter::Important),
            other => Err(RemindrError::Validation(format!(
                "Unknown filter '{}'. Expected all, upcoming, completed or important",
                other
            ))),
        }
    }
}

impl fmt::Display for ReminderFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReminderFilter::All => "all",
            ReminderFilter::Upcoming => "upcoming",
            ReminderFilter::Completed => "completed",
            ReminderFilter::Important => "important",
        };
        write!(f, "{}", s)
    }
}

/// Ordering of the displayed list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Scheduled time, soonest first
    #[default]
    Date,
    /// Creation time, newest first
    Created,
    /// Title, case-insensitive
    Title,
}

impl FromStr for SortKey {
    type Err = RemindrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "date" | "scheduled" => Ok(SortKey::Date),
            "created" => Ok(SortKey::Created),
            "title" => Ok(SortKey::Title),
            other => Err(RemindrError::Validation(format!(
                "Unknown sort key '{}'. Expected date, created or title",
                other
            ))),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SortKey::Date => "date",
            SortKey::Created => "created",
            SortKey::Title => "title",
        };
        write!(f, "{}", s)
    }
}

impl SortKey {
    /// Sort in place; ties keep their existing order
    pub fn sort(self, reminders: &mut [Reminder]) {
        match self {
            SortKey::Date => reminders.sort_by_key(|r| r.scheduled_for),
            SortKey::Created => reminders.sort_by_key(|r| Reverse(r.created_at)),
            SortKey::Title => reminders.sort_by_cached_key(|r| r.title.to_lowercase()),
        }
    }
}

/// Filter then sort a copy of `reminders`
pub fn apply(
    reminders: &[Reminder],
    filter: ReminderFilter,
    sort: SortKey,
    now: DateTime<Utc>,
) -> Vec<Reminder> {
    let mut selected: Vec<Reminder> = reminders
        .iter()
        .filter(|r| filter.matches(r, now))
        .cloned()
        .collect();
    sort.sort(&mut selected);
    selected
}
