//! Live countdowns and one-time due alerts
//!
//! [`AlertMonitor`] ticks on a fixed interval, recomputes every countdown from
//! the wall clock and raises an alert through a [`Notifier`] when a reminder
//! it has watched counting down reaches due. The alerted set lives in the
//! [`ReminderStore`](super::ReminderStore), so dropping and recreating the
//! monitor never alerts the same reminder twice.

use chrono::{DateTime, Utc};
use colored::Colorize;
use std::collections::HashSet;
use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use super::SharedReminderStore;
use crate::api::types::Reminder;

/// Text shown once a reminder is due
pub const DUE_LABEL: &str = "Due!";

/// `HH:MM:SS left` until `due`, or `Due!` once `now >= due`.
///
/// Partial seconds round up. Hours are not capped at 99.
pub fn format_countdown(now: DateTime<Utc>, due: DateTime<Utc>) -> String {
    if due <= now {
        return DUE_LABEL.to_string();
    }
    let millis = (due - now).num_milliseconds();
    let remaining = (millis + 999) / 1000;
    let hours = remaining / 3600;
    let minutes = (remaining % 3600) / 60;
    let seconds = remaining % 60;
    format!("{:02}:{:02}:{:02} left", hours, minutes, seconds)
}

/// Delivers due alerts to the user
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    /// Ask once whether alerts may be shown; false suppresses delivery
    fn request_permission(&self) -> bool;

    /// Show the alert for `reminder`
    fn notify(&self, reminder: &Reminder);
}

/// Prints alerts to stdout and optionally rings the terminal bell
#[derive(Debug, Clone)]
pub struct TerminalNotifier {
    enabled: bool,
    bell: bool,
}

impl TerminalNotifier {
    /// Create a notifier; `enabled = false` behaves like a denied permission
    pub fn new(enabled: bool, bell: bool) -> Self {
        Self { enabled, bell }
    }
}

impl Notifier for TerminalNotifier {
    fn request_permission(&self) -> bool {
        self.enabled
    }

    fn notify(&self, reminder: &Reminder) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(
            out,
            "{} {}",
            "Reminder due:".red().bold(),
            reminder.title.bold()
        );
        if let Some(description) = &reminder.description {
            let _ = writeln!(out, "  {}", description.dimmed());
        }
        if self.bell {
            let _ = write!(out, "\x07");
        }
        let _ = out.flush();
    }
}

/// Countdown line for one reminder
#[derive(Debug, Clone, PartialEq)]
pub struct CountdownLine {
    pub id: i64,
    pub title: String,
    pub countdown: String,
}

/// What one tick observed
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Countdowns for every open reminder, in store order
    pub countdowns: Vec<CountdownLine>,
    /// Reminders that became due on this tick
    pub alerted: Vec<Reminder>,
}

/// Periodic due-alert checker
pub struct AlertMonitor {
    store: SharedReminderStore,
    notifier: Arc<dyn Notifier>,
    tick: Duration,
    permitted: Option<bool>,
    // Reminders seen before their due time
    watched: HashSet<i64>,
}

impl AlertMonitor {
    /// Create a monitor over `store`
    pub fn new(store: SharedReminderStore, notifier: Arc<dyn Notifier>, tick: Duration) -> Self {
        Self {
            store,
            notifier,
            tick,
            permitted: None,
            watched: HashSet::new(),
        }
    }

    fn permitted(&mut self) -> bool {
        match self.permitted {
            Some(permitted) => permitted,
            None => {
                let permitted = self.notifier.request_permission();
                if !permitted {
                    tracing::warn!("Alert permission denied; due reminders will only be logged");
                }
                self.permitted = Some(permitted);
                permitted
            }
        }
    }

    /// Run one check at `now`.
    ///
    /// Completed reminders are skipped. A reminder alerts once when it reaches
    /// due after this monitor has seen it counting down. Reminders already
    /// past due on first sight are marked alerted without a notification.
    pub async fn check(&mut self, now: DateTime<Utc>) -> TickReport {
        let permitted = self.permitted();
        let mut report = TickReport::default();
        let mut store = self.store.lock().await;

        let mut due = Vec::new();
        for reminder in store.reminders().iter().filter(|r| !r.is_completed) {
            report.countdowns.push(CountdownLine {
                id: reminder.id,
                title: reminder.title.clone(),
                countdown: format_countdown(now, reminder.scheduled_for),
            });
            if now >= reminder.scheduled_for {
                due.push(reminder.clone());
            } else {
                self.watched.insert(reminder.id);
            }
        }

        for reminder in due {
            if !store.mark_alerted(reminder.id) {
                continue;
            }
            if !self.watched.contains(&reminder.id) {
                tracing::debug!(
                    "Reminder {} was already overdue when first seen; not alerting",
                    reminder.id
                );
                continue;
            }
            tracing::info!("Reminder {} '{}' is due", reminder.id, reminder.title);
            if permitted {
                self.notifier.notify(&reminder);
            }
            report.alerted.push(reminder);
        }
        report
    }

    /// Tick until `shutdown` resolves, passing every report to `on_tick`
    pub async fn run_until<F, T>(mut self, shutdown: F, mut on_tick: T)
    where
        F: Future<Output = ()>,
        T: FnMut(&TickReport),
    {
        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        tracing::debug!("Alert monitor started (tick {:?})", self.tick);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = interval.tick() => {
                    let report = self.check(Utc::now()).await;
                    on_tick(&report);
                }
            }
        }
        tracing::debug!("Alert monitor stopped");
    }
}
