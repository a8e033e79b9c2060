//! Debounced text analysis
//!
//! The workflow runs as a single tokio task that owns the text buffer, the
//! debounce timer and the id of the reminder it has created. Callers drive it
//! through an [`AnalysisHandle`]: edits and explicit triggers go in as
//! commands, and [`AnalysisEvent`]s come back out.
//!
//! Automatic analysis runs once the buffer is longer than
//! `min_chars` and has not changed for the debounce period. Every analysis
//! request is tagged with a sequence number; a response is applied only if
//! no newer request was issued after it. A suggestion whose confidence
//! exceeds the threshold creates a reminder the first time and updates that
//! same reminder afterwards.

use chrono::Local;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::api::types::{
    AnalysisResult, Priority, Reminder, ReminderCreate, ReminderUpdate, SourceType,
};
use crate::config::AnalysisConfig;
use crate::error::{RemindrError, Result};
use crate::notice::Notice;
use crate::reminders::SharedReminderStore;
use crate::session::SessionState;

pub mod schedule;

pub use schedule::{combine_schedule, fallback_title, reminder_from_suggestion};

/// Tunables for the workflow
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOptions {
    pub debounce: Duration,
    pub min_chars: usize,
    pub threshold: f64,
    pub priority: Priority,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self::from(&AnalysisConfig::default())
    }
}

impl From<&AnalysisConfig> for AnalysisOptions {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            debounce: config.debounce(),
            min_chars: config.min_chars,
            threshold: config.confidence_threshold,
            priority: config.default_priority,
        }
    }
}

/// Commands accepted by the workflow task
#[derive(Debug, Clone)]
pub enum AnalysisCommand {
    /// Replace the buffer and restart the debounce timer
    Edit(String),
    /// Analyze immediately, cancelling any pending timer
    AnalyzeNow,
    /// Priority for reminders created from now on
    SetPriority(Priority),
    /// Clear the buffer and forget the created reminder
    Reset,
}

/// Notifications emitted by the workflow task
#[derive(Debug, Clone)]
pub enum AnalysisEvent {
    /// A request is in flight
    Busy,
    /// No request is in flight
    Idle,
    /// The latest request returned
    Analyzed(AnalysisResult),
    /// A reminder was created from a suggestion
    Created(Reminder),
    /// The previously created reminder was updated
    Updated(Reminder),
    /// The suggestion was missing or did not clear the threshold
    BelowThreshold { confidence: Option<f64> },
    /// Something the user should see
    Notice(Notice),
}

/// Caller side of a running workflow
#[derive(Debug)]
pub struct AnalysisHandle {
    commands: mpsc::UnboundedSender<AnalysisCommand>,
    events: mpsc::UnboundedReceiver<AnalysisEvent>,
    task: JoinHandle<()>,
}

impl AnalysisHandle {
    fn send(&self, command: AnalysisCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| RemindrError::Validation("Analysis task has stopped".to_string()).into())
    }

    /// Replace the buffer contents
    pub fn edit(&self, text: impl Into<String>) -> Result<()> {
        self.send(AnalysisCommand::Edit(text.into()))
    }

    /// Trigger analysis without waiting for the debounce period
    pub fn analyze_now(&self) -> Result<()> {
        self.send(AnalysisCommand::AnalyzeNow)
    }

    pub fn set_priority(&self, priority: Priority) -> Result<()> {
        self.send(AnalysisCommand::SetPriority(priority))
    }

    /// Start over with an empty buffer and no remembered reminder
    pub fn reset(&self) -> Result<()> {
        self.send(AnalysisCommand::Reset)
    }

    /// Next event, `None` once the task has stopped
    pub async fn next_event(&mut self) -> Option<AnalysisEvent> {
        self.events.recv().await
    }

    /// Event already queued, without waiting
    pub fn try_next_event(&mut self) -> Option<AnalysisEvent> {
        self.events.try_recv().ok()
    }

    /// Stop the task; requests still in flight are dropped
    pub async fn shutdown(self) {
        drop(self.commands);
        if let Err(e) = self.task.await {
            if !e.is_cancelled() {
                tracing::error!("Analysis task failed: {}", e);
            }
        }
    }
}

type Pending = BoxFuture<'static, (u64, String, Result<AnalysisResult>)>;

struct Workflow {
    session: SessionState,
    store: SharedReminderStore,
    options: AnalysisOptions,
    events: mpsc::UnboundedSender<AnalysisEvent>,
    buffer: String,
    created_id: Option<i64>,
    latest_seq: u64,
}

/// Start the workflow task
pub fn spawn(
    session: SessionState,
    store: SharedReminderStore,
    options: AnalysisOptions,
) -> AnalysisHandle {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let workflow = Workflow {
        session,
        store,
        options,
        events: event_tx,
        buffer: String::new(),
        created_id: None,
        latest_seq: 0,
    };
    let task = tokio::spawn(workflow.run(command_rx));
    AnalysisHandle {
        commands: command_tx,
        events: event_rx,
        task,
    }
}

impl Workflow {
    fn emit(&self, event: AnalysisEvent) {
        // The caller may have stopped listening; nothing to do then
        let _ = self.events.send(event);
    }

    fn eligible(&self) -> bool {
        self.buffer.trim().chars().count() > self.options.min_chars
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<AnalysisCommand>) {
        let mut in_flight: FuturesUnordered<Pending> = FuturesUnordered::new();
        let timer = tokio::time::sleep(self.options.debounce);
        tokio::pin!(timer);
        let mut armed = false;

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    match command {
                        AnalysisCommand::Edit(text) => {
                            self.buffer = text;
                            armed = self.eligible();
                            if armed {
                                timer.as_mut().reset(Instant::now() + self.options.debounce);
                            }
                        }
                        AnalysisCommand::AnalyzeNow => {
                            armed = false;
                            if self.buffer.trim().is_empty() {
                                self.emit(AnalysisEvent::Notice(Notice::warning(
                                    "Nothing to analyze yet",
                                )));
                            } else {
                                self.issue(&mut in_flight);
                            }
                        }
                        AnalysisCommand::SetPriority(priority) => {
                            self.options.priority = priority;
                        }
                        AnalysisCommand::Reset => {
                            armed = false;
                            self.buffer.clear();
                            self.created_id = None;
                            // Anything still in flight belongs to the old buffer
                            self.latest_seq += 1;
                        }
                    }
                }
                _ = &mut timer, if armed => {
                    armed = false;
                    self.issue(&mut in_flight);
                }
                Some((seq, text, result)) = in_flight.next(), if !in_flight.is_empty() => {
                    self.complete(seq, text, result).await;
                    if in_flight.is_empty() {
                        self.emit(AnalysisEvent::Idle);
                    }
                }
            }
        }
        tracing::debug!("Analysis task stopped");
    }

    fn issue(&mut self, in_flight: &mut FuturesUnordered<Pending>) {
        let token = match self.session.token() {
            Ok(token) => token,
            Err(e) => {
                self.emit(AnalysisEvent::Notice(Notice::from_error(&e)));
                return;
            }
        };
        self.latest_seq += 1;
        let seq = self.latest_seq;
        let text = self.buffer.clone();
        let api = self.session.api();
        tracing::debug!("Analysis request {} ({} chars)", seq, text.chars().count());

        if in_flight.is_empty() {
            self.emit(AnalysisEvent::Busy);
        }
        in_flight.push(
            async move {
                let result = api.analyze_text(&token, &text).await;
                (seq, text, result)
            }
            .boxed(),
        );
    }

    async fn complete(&mut self, seq: u64, text: String, result: Result<AnalysisResult>) {
        if seq < self.latest_seq {
            tracing::debug!(
                "Discarding stale analysis response {} (latest {})",
                seq,
                self.latest_seq
            );
            return;
        }

        let analysis = match result {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::warn!("Analysis failed: {}", e);
                self.session.expire_if_unauthorized(&e);
                self.emit(AnalysisEvent::Notice(Notice::from_error(&e)));
                return;
            }
        };
        self.emit(AnalysisEvent::Analyzed(analysis.clone()));

        let Some(suggestion) = analysis
            .suggestion
            .as_ref()
            .filter(|s| s.exceeds(self.options.threshold))
        else {
            self.emit(AnalysisEvent::BelowThreshold {
                confidence: analysis.suggestion.as_ref().map(|s| s.confidence),
            });
            return;
        };

        let create = reminder_from_suggestion(
            suggestion,
            &text,
            SourceType::Text,
            self.options.priority,
            &Local::now(),
        );
        match self.save(create).await {
            Ok(event) => self.emit(event),
            Err(e) => {
                tracing::warn!("Saving suggested reminder failed: {}", e);
                self.emit(AnalysisEvent::Notice(Notice::from_error(&e)));
            }
        }
    }

    async fn save(&mut self, create: ReminderCreate) -> Result<AnalysisEvent> {
        let token = self.session.token()?;
        let mut store = self.store.lock().await;

        if let Some(id) = self.created_id {
            match store.update(&token, id, &ReminderUpdate::from(create.clone())).await {
                Ok(updated) => return Ok(AnalysisEvent::Updated(updated)),
                Err(e) if is_missing(&e) => {
                    tracing::info!("Reminder {} no longer exists, creating a new one", id);
                    self.created_id = None;
                }
                Err(e) => return Err(e),
            }
        }

        let created = store.create(&token, &create).await?;
        self.created_id = Some(created.id);
        Ok(AnalysisEvent::Created(created))
    }
}

fn is_missing(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<RemindrError>(),
        Some(RemindrError::Api { status: 404, .. }) | Some(RemindrError::NotFound(_))
    )
}
