//! Remindr - reminders from voice, text and images
//!
//! This library provides the client side of the Remindr service: a typed
//! backend API, session handling, a cached reminder collection with due
//! alerts, and the debounced text analysis workflow.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `api`: Backend contract, reqwest implementation and in-process fake
//! - `session`: Login state, persistence and client-side validation
//! - `reminders`: Cached reminder list, filtering, countdowns and alerts
//! - `analysis`: Debounced analysis task and suggestion-to-reminder mapping
//! - `router`: Route guard shared by all commands
//! - `notice`: User-facing notifications built from errors
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli` / `commands`: Command-line interface and handlers
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use remindr::api::HttpBackend;
//! use remindr::session::{FileSessionStore, SessionState};
//! use remindr::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let api = Arc::new(HttpBackend::new(&config.api)?);
//!     let store = Arc::new(FileSessionStore::new(FileSessionStore::default_path()?));
//!     let session = SessionState::new(api, store);
//!     if !session.hydrate().await? {
//!         session.login("ada@example.com", "secret1").await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod notice;
pub mod reminders;
pub mod router;
pub mod session;

// Re-export commonly used types
pub use api::{BackendApi, FakeBackend, HttpBackend};
pub use config::Config;
pub use error::{RemindrError, Result};
pub use notice::Notice;
pub use reminders::ReminderStore;
pub use session::SessionState;
