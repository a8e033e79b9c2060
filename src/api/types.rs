//! Wire and domain types for the reminder backend
//!
//! Request payloads, response records and the scheduling suggestion that the
//! analysis endpoints return. Timestamps from the backend may arrive with or
//! without a UTC offset; naive values are interpreted as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RemindrError;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Priority attached to reminders created from analysis.
///
/// Only `High` marks the resulting reminder as important.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Routine reminder
    Low,
    /// Default priority
    #[default]
    Medium,
    /// Flagged as important
    High,
}

impl Priority {
    /// Whether reminders with this priority carry the importance flag
    pub fn is_important(self) -> bool {
        matches!(self, Priority::High)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
        }
    }
}

impl FromStr for Priority {
    type Err = RemindrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" | "normal" => Ok(Priority::Medium),
            "high" | "important" => Ok(Priority::High),
            other => Err(RemindrError::Validation(format!(
                "Unknown priority '{}'. Expected low, medium or high",
                other
            ))),
        }
    }
}

/// Where a reminder's content originated
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Typed free text run through analysis
    Text,
    /// Transcribed audio
    Voice,
    /// OCR output from an image
    Image,
    /// Entered directly, without analysis
    Manual,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceType::Text => "text",
            SourceType::Voice => "voice",
            SourceType::Image => "image",
            SourceType::Manual => "manual",
        };
        write!(f, "{}", s)
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Profile of the logged-in user as returned by `/auth/me`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    /// Backend user id
    pub id: i64,
    /// Login email
    pub email: String,
    /// Optional display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Account creation time
    #[serde(deserialize_with = "flexible_timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// Display name, falling back to the email address
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// Bearer token issued by the login endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    /// Opaque bearer token
    pub access_token: String,
    /// Token type, normally `bearer`
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Email and password credentials
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for the OTP request endpoints
#[derive(Debug, Clone, Serialize)]
pub struct OtpRequest {
    pub email: String,
}

/// Email plus one-time code
#[derive(Debug, Clone, Serialize)]
pub struct OtpLoginRequest {
    pub email: String,
    pub otp: String,
}

/// Password registration payload
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// OTP registration payload
#[derive(Debug, Clone, Serialize)]
pub struct OtpRegisterRequest {
    pub email: String,
    pub otp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Profile fields the user may change from settings
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ProfileUpdate {
    /// True when no field would be sent
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.email.is_none()
    }
}

// ---------------------------------------------------------------------------
// Reminders
// ---------------------------------------------------------------------------

/// A reminder record owned by the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reminder {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(deserialize_with = "flexible_timestamp::deserialize")]
    pub scheduled_for: DateTime<Utc>,
    #[serde(deserialize_with = "flexible_timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "flexible_timestamp::deserialize_option"
    )]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub is_important: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<SourceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Reminder {
    /// Still open and scheduled strictly after `now`
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        !self.is_completed && self.scheduled_for > now
    }
}

/// Payload for `POST /reminders`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReminderCreate {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub scheduled_for: DateTime<Utc>,
    #[serde(default)]
    pub is_important: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<SourceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ReminderCreate {
    /// A manual reminder with only the required fields set
    pub fn new(title: impl Into<String>, scheduled_for: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            description: None,
            scheduled_for,
            is_important: false,
            original_text: None,
            confidence_score: None,
            source_type: Some(SourceType::Manual),
            image_url: None,
        }
    }

    /// Rejects payloads the backend would refuse anyway
    pub fn validate(&self) -> Result<(), RemindrError> {
        if self.title.trim().is_empty() {
            return Err(RemindrError::Validation(
                "Title cannot be empty".to_string(),
            ));
        }
        if let Some(score) = self.confidence_score {
            validate_confidence(score)?;
        }
        Ok(())
    }
}

/// Payload for `PUT /reminders/{id}`; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReminderUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_important: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<SourceType>,
}

impl ReminderUpdate {
    /// True when the update carries no fields
    pub fn is_empty(&self) -> bool {
        self == &ReminderUpdate::default()
    }

    /// Rejects a blank title or an out-of-range confidence
    pub fn validate(&self) -> Result<(), RemindrError> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(RemindrError::Validation(
                    "Title cannot be empty".to_string(),
                ));
            }
        }
        if let Some(score) = self.confidence_score {
            validate_confidence(score)?;
        }
        Ok(())
    }
}

impl From<ReminderCreate> for ReminderUpdate {
    fn from(create: ReminderCreate) -> Self {
        Self {
            title: Some(create.title),
            description: create.description,
            scheduled_for: Some(create.scheduled_for),
            is_completed: None,
            is_important: Some(create.is_important),
            original_text: create.original_text,
            confidence_score: create.confidence_score,
            source_type: create.source_type,
        }
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Scheduling suggestion exactly as it appears on the wire.
///
/// Every field is untrusted; use [`SchedulingSuggestion::from_raw`] to obtain
/// a validated value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSuggestion {
    #[serde(default)]
    pub detected_date: Option<String>,
    #[serde(default)]
    pub detected_time: Option<String>,
    #[serde(default)]
    pub suggested_title: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// A validated scheduling suggestion.
///
/// - `detected_date`: present only if the backend sent a `YYYY-MM-DD` date.
/// - `detected_time`: present only if the backend sent `HH:MM` or `HH:MM:SS`.
/// - `suggested_title`: present only if non-blank.
/// - `confidence`: always present, within `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulingSuggestion {
    pub detected_date: Option<NaiveDate>,
    pub detected_time: Option<NaiveTime>,
    pub suggested_title: Option<String>,
    pub confidence: f64,
}

impl SchedulingSuggestion {
    /// Validate a wire suggestion.
    ///
    /// Unparseable date or time values are dropped (and logged) rather than
    /// failing the whole response; a missing or out-of-range confidence is a
    /// validation error.
    pub fn from_raw(raw: RawSuggestion) -> Result<Self, RemindrError> {
        let confidence = raw.confidence.ok_or_else(|| {
            RemindrError::Validation("Scheduling suggestion is missing a confidence".to_string())
        })?;
        validate_confidence(confidence)?;

        let detected_date = raw.detected_date.as_deref().and_then(|d| {
            let parsed = parse_date(d);
            if parsed.is_none() {
                tracing::warn!("Ignoring unparseable detected_date: {}", d);
            }
            parsed
        });
        let detected_time = raw.detected_time.as_deref().and_then(|t| {
            let parsed = parse_time(t);
            if parsed.is_none() {
                tracing::warn!("Ignoring unparseable detected_time: {}", t);
            }
            parsed
        });
        let suggested_title = raw
            .suggested_title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Ok(Self {
            detected_date,
            detected_time,
            suggested_title,
            confidence,
        })
    }

    /// Whether this suggestion clears the auto-creation threshold
    pub fn exceeds(&self, threshold: f64) -> bool {
        self.confidence > threshold
    }
}

/// Response body shared by the three analysis endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAnalysisResponse {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub transcription: Option<String>,
    #[serde(default)]
    pub extracted_text: Option<String>,
    #[serde(default)]
    pub analysis: Option<serde_json::Value>,
    #[serde(default)]
    pub scheduling_suggestion: Option<RawSuggestion>,
}

/// Validated analysis result
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    /// Transcribed, extracted or echoed text
    pub text: String,
    /// Free-form NLP output, passed through for display
    pub analysis: Option<serde_json::Value>,
    /// Validated scheduling suggestion, if one was detected
    pub suggestion: Option<SchedulingSuggestion>,
}

impl AnalysisResult {
    /// Validate a raw response.
    ///
    /// The text is taken from the first of `text`, `transcription`,
    /// `extracted_text` that is present.
    pub fn from_raw(raw: RawAnalysisResponse) -> Result<Self, RemindrError> {
        let suggestion = raw
            .scheduling_suggestion
            .map(SchedulingSuggestion::from_raw)
            .transpose()?;
        let text = raw
            .text
            .or(raw.transcription)
            .or(raw.extracted_text)
            .unwrap_or_default();
        Ok(Self {
            text,
            analysis: raw.analysis,
            suggestion,
        })
    }
}

// ---------------------------------------------------------------------------
// Backend error bodies
// ---------------------------------------------------------------------------

/// Error body returned by the backend on non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub detail: ErrorDetail,
}

/// `detail` is either a message or a list of field validation errors
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Message(String),
    Validation(Vec<ValidationItem>),
}

/// A single field validation error
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationItem {
    pub msg: String,
    #[serde(default)]
    pub loc: Vec<serde_json::Value>,
}

impl ErrorDetail {
    /// Human-readable message; validation items are joined with `; `
    pub fn message(&self) -> String {
        match self {
            ErrorDetail::Message(m) => m.clone(),
            ErrorDetail::Validation(items) => items
                .iter()
                .map(|item| match item.loc.last().and_then(|l| l.as_str()) {
                    Some(field) => format!("{}: {}", field, item.msg),
                    None => item.msg.clone(),
                })
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn validate_confidence(confidence: f64) -> Result<(), RemindrError> {
    if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
        return Err(RemindrError::Validation(format!(
            "Confidence {} is outside [0, 1]",
            confidence
        )));
    }
    Ok(())
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Parse `HH:MM` or `HH:MM:SS`
pub fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

/// Deserializers for backend timestamps with or without an offset
pub(crate) mod flexible_timestamp {
    use super::*;

    pub(crate) fn parse(s: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .map(|naive| naive.and_utc())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", s)))
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(s) => parse(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_priority_parse_and_importance() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("normal".parse::<Priority>().unwrap(), Priority::Medium);
        assert!("urgent".parse::<Priority>().is_err());
        assert!(Priority::High.is_important());
        assert!(!Priority::Medium.is_important());
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn test_reminder_accepts_naive_and_offset_timestamps() {
        let json = r#"{
            "id": 7,
            "title": "Dentist",
            "scheduled_for": "2030-05-01T09:30:00",
            "created_at": "2030-04-01T12:00:00.123456+00:00",
            "updated_at": null,
            "is_completed": false,
            "is_important": true,
            "source_type": "voice"
        }"#;
        let reminder: Reminder = serde_json::from_str(json).unwrap();
        assert_eq!(
            reminder.scheduled_for,
            Utc.with_ymd_and_hms(2030, 5, 1, 9, 30, 0).unwrap()
        );
        assert_eq!(reminder.created_at.minute(), 0);
        assert!(reminder.updated_at.is_none());
        assert_eq!(reminder.source_type, Some(SourceType::Voice));
        assert!(reminder.description.is_none());
    }

    #[test]
    fn test_reminder_rejects_garbage_timestamp() {
        let json = r#"{"id":1,"title":"x","scheduled_for":"soon","created_at":"2030-04-01T12:00:00"}"#;
        assert!(serde_json::from_str::<Reminder>(json).is_err());
    }

    #[test]
    fn test_reminder_update_skips_absent_fields() {
        let update = ReminderUpdate {
            title: Some("New".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value, serde_json::json!({"title": "New"}));
        assert!(!update.is_empty());
        assert!(ReminderUpdate::default().is_empty());
    }

    #[test]
    fn test_reminder_create_validate() {
        let now = Utc::now();
        assert!(ReminderCreate::new("  ", now).validate().is_err());
        let mut ok = ReminderCreate::new("Call mom", now);
        assert!(ok.validate().is_ok());
        ok.confidence_score = Some(1.2);
        assert!(ok.validate().is_err());
    }

    #[test]
    fn test_suggestion_from_raw_full() {
        let raw = RawSuggestion {
            detected_date: Some("2030-01-02".to_string()),
            detected_time: Some("14:05".to_string()),
            suggested_title: Some("  Pay rent ".to_string()),
            confidence: Some(0.9),
        };
        let s = SchedulingSuggestion::from_raw(raw).unwrap();
        assert_eq!(s.detected_date, NaiveDate::from_ymd_opt(2030, 1, 2));
        assert_eq!(s.detected_time, NaiveTime::from_hms_opt(14, 5, 0));
        assert_eq!(s.suggested_title.as_deref(), Some("Pay rent"));
        assert!(s.exceeds(0.3));
    }

    #[test]
    fn test_suggestion_drops_unparseable_fields() {
        let raw = RawSuggestion {
            detected_date: Some("next tuesday".to_string()),
            detected_time: Some("25:99".to_string()),
            suggested_title: Some("   ".to_string()),
            confidence: Some(0.3),
        };
        let s = SchedulingSuggestion::from_raw(raw).unwrap();
        assert!(s.detected_date.is_none());
        assert!(s.detected_time.is_none());
        assert!(s.suggested_title.is_none());
        assert!(!s.exceeds(0.3));
    }

    #[test]
    fn test_suggestion_rejects_bad_confidence() {
        for confidence in [Some(1.5), Some(-0.2), None] {
            let raw = RawSuggestion {
                confidence,
                ..Default::default()
            };
            assert!(SchedulingSuggestion::from_raw(raw).is_err());
        }
    }

    #[test]
    fn test_analysis_result_picks_first_text_field() {
        let raw: RawAnalysisResponse = serde_json::from_value(serde_json::json!({
            "transcription": "call the bank at 3pm",
            "scheduling_suggestion": {"detected_time": "15:00:00", "confidence": 0.8}
        }))
        .unwrap();
        let result = AnalysisResult::from_raw(raw).unwrap();
        assert_eq!(result.text, "call the bank at 3pm");
        let suggestion = result.suggestion.unwrap();
        assert_eq!(suggestion.detected_time, NaiveTime::from_hms_opt(15, 0, 0));
        assert!(suggestion.detected_date.is_none());
    }

    #[test]
    fn test_error_detail_messages() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"detail":"Incorrect email or password"}"#).unwrap();
        assert_eq!(body.detail.message(), "Incorrect email or password");

        let body: ErrorBody = serde_json::from_str(
            r#"{"detail":[{"loc":["body","email"],"msg":"value is not a valid email address"},{"loc":[],"msg":"bad"}]}"#,
        )
        .unwrap();
        assert_eq!(
            body.detail.message(),
            "email: value is not a valid email address; bad"
        );
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let mut user = UserProfile {
            id: 1,
            email: "a@b.co".to_string(),
            full_name: None,
            created_at: Utc::now(),
        };
        assert_eq!(user.display_name(), "a@b.co");
        user.full_name = Some("Ada".to_string());
        assert_eq!(user.display_name(), "Ada");
    }
}
