//! Transient user-facing notifications

use colored::Colorize;
use std::fmt;

use crate::error::RemindrError;

/// Shown when an error carries nothing meaningful for the user
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A dismissible message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    /// Error notice carrying the backend or validation message.
    ///
    /// Transport and internal failures become [`GENERIC_FAILURE`]; their
    /// details go to the log instead.
    pub fn from_error(err: &anyhow::Error) -> Self {
        let message = match err.downcast_ref::<RemindrError>() {
            Some(
                e @ (RemindrError::Api { .. }
                | RemindrError::Authentication(_)
                | RemindrError::Validation(_)
                | RemindrError::NotAuthenticated
                | RemindrError::NotFound(_)
                | RemindrError::Config(_)
                | RemindrError::Session(_)),
            ) => e.user_message(),
            _ => {
                tracing::debug!("Unhandled error detail: {:#}", err);
                GENERIC_FAILURE.to_string()
            }
        };
        let message = if message.trim().is_empty() {
            GENERIC_FAILURE.to_string()
        } else {
            message
        };
        Self::error(message)
    }

    /// Colored single-line rendering for the terminal
    pub fn render(&self) -> String {
        match self.level {
            NoticeLevel::Info => format!("{} {}", "info:".cyan().bold(), self.message),
            NoticeLevel::Success => format!("{} {}", "ok:".green().bold(), self.message),
            NoticeLevel::Warning => format!("{} {}", "warning:".yellow().bold(), self.message),
            NoticeLevel::Error => format!("{} {}", "error:".red().bold(), self.message),
        }
    }

    /// Print to stdout, or stderr for errors
    pub fn print(&self) {
        if self.level == NoticeLevel::Error {
            eprintln!("{}", self.render());
        } else {
            println!("{}", self.render());
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
