//! Reminder collection
//!
//! [`ReminderStore`] caches the user's reminders and keeps the cache in sync
//! with server responses after every mutation. It also owns the set of
//! reminders that have already raised a due alert, so an alert fires at most
//! once per reminder for the lifetime of the store.

use std::collections::HashSet;
use std::sync::Arc;

use crate::api::types::{Reminder, ReminderCreate, ReminderUpdate};
use crate::api::BackendApi;
use crate::error::{RemindrError, Result};

pub mod countdown;
pub mod filter;

pub use countdown::{format_countdown, AlertMonitor, Notifier, TerminalNotifier};
pub use filter::{ReminderFilter, SortKey};

/// Reminder store shared between commands, the analysis task and the alert
/// monitor
pub type SharedReminderStore = Arc<tokio::sync::Mutex<ReminderStore>>;

/// Cached reminder list backed by the remote service
pub struct ReminderStore {
    api: Arc<dyn BackendApi>,
    reminders: Vec<Reminder>,
    alerted: HashSet<i64>,
    loaded: bool,
}

impl std::fmt::Debug for ReminderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderStore")
            .field("reminders", &self.reminders.len())
            .field("alerted", &self.alerted)
            .field("loaded", &self.loaded)
            .finish()
    }
}

impl ReminderStore {
    /// Create an empty store
    pub fn new(api: Arc<dyn BackendApi>) -> Self {
        Self {
            api,
            reminders: Vec::new(),
            alerted: HashSet::new(),
            loaded: false,
        }
    }

    /// Wrap the store for sharing across tasks
    pub fn shared(self) -> SharedReminderStore {
        Arc::new(tokio::sync::Mutex::new(self))
    }

    /// Cached reminders in server order
    pub fn reminders(&self) -> &[Reminder] {
        &self.reminders
    }

    /// Whether [`ReminderStore::refresh`] has succeeded at least once
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Look up a cached reminder
    ///
    /// # Errors
    ///
    /// Returns [`RemindrError::NotFound`] if `id` is not cached.
    pub fn get(&self, id: i64) -> Result<&Reminder> {
        self.reminders
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| RemindrError::NotFound(id).into())
    }

    fn upsert(&mut self, reminder: Reminder) {
        match self.reminders.iter_mut().find(|r| r.id == reminder.id) {
            Some(slot) => *slot = reminder,
            None => self.reminders.push(reminder),
        }
    }

    /// Replace the cache with `GET /reminders`
    pub async fn refresh(&mut self, token: &str) -> Result<&[Reminder]> {
        let reminders = self.api.list_reminders(token).await?;
        tracing::debug!("Loaded {} reminders", reminders.len());
        self.reminders = reminders;
        self.loaded = true;
        Ok(&self.reminders)
    }

    /// `GET /reminders/upcoming`; the cache is not modified
    pub async fn upcoming(&self, token: &str) -> Result<Vec<Reminder>> {
        self.api.upcoming_reminders(token).await
    }

    /// Fetch one reminder and update the cached copy
    pub async fn fetch(&mut self, token: &str, id: i64) -> Result<Reminder> {
        let reminder = self.api.get_reminder(token, id).await?;
        self.upsert(reminder.clone());
        Ok(reminder)
    }

    /// Create a reminder and append the server's copy to the cache
    pub async fn create(&mut self, token: &str, reminder: &ReminderCreate) -> Result<Reminder> {
        reminder.validate()?;
        let created = self.api.create_reminder(token, reminder).await?;
        tracing::info!("Created reminder {} '{}'", created.id, created.title);
        self.upsert(created.clone());
        Ok(created)
    }

    /// Apply a partial update and replace the cached copy
    pub async fn update(
        &mut self,
        token: &str,
        id: i64,
        update: &ReminderUpdate,
    ) -> Result<Reminder> {
        if update.is_empty() {
            return Err(RemindrError::Validation("Nothing to update".to_string()).into());
        }
        update.validate()?;
        let updated = self.api.update_reminder(token, id, update).await?;
        tracing::info!("Updated reminder {}", id);
        if update.scheduled_for.is_some() {
            // A rescheduled reminder may become due again
            self.alerted.remove(&id);
        }
        self.upsert(updated.clone());
        Ok(updated)
    }

    /// Delete a reminder and drop it from the cache
    pub async fn delete(&mut self, token: &str, id: i64) -> Result<()> {
        self.api.delete_reminder(token, id).await?;
        tracing::info!("Deleted reminder {}", id);
        self.reminders.retain(|r| r.id != id);
        self.alerted.remove(&id);
        Ok(())
    }

    /// Mark a reminder completed
    pub async fn complete(&mut self, token: &str, id: i64) -> Result<Reminder> {
        self.set_completed(token, id, true).await
    }

    /// Mark a reminder open again
    pub async fn uncomplete(&mut self, token: &str, id: i64) -> Result<Reminder> {
        self.set_completed(token, id, false).await
    }

    /// Dispatch to the complete or uncomplete endpoint
    pub async fn set_completed(&mut self, token: &str, id: i64, done: bool) -> Result<Reminder> {
        let reminder = if done {
            self.api.complete_reminder(token, id).await?
        } else {
            self.api.uncomplete_reminder(token, id).await?
        };
        tracing::info!(
            "Reminder {} marked {}",
            id,
            if done { "completed" } else { "open" }
        );
        self.upsert(reminder.clone());
        Ok(reminder)
    }

    /// Record that `id` has alerted; returns false if it already had
    pub fn mark_alerted(&mut self, id: i64) -> bool {
        self.alerted.insert(id)
    }

    /// Whether `id` has already alerted
    pub fn was_alerted(&self, id: i64) -> bool {
        self.alerted.contains(&id)
    }

    /// Forget everything, e.g. after logout
    pub fn clear(&mut self) {
        self.reminders.clear();
        self.alerted.clear();
        self.loaded = false;
    }
}
