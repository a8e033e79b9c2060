//! HTTP implementation of [`BackendApi`] on top of reqwest
//!
//! Every request goes to `<base_url><path>`. Authenticated requests carry
//! `Authorization: Bearer <token>`. Non-success responses are decoded as the
//! backend's `{ "detail": ... }` error body; the detail text becomes the
//! user-facing message, with a generic fallback when the body is missing or
//! not JSON.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::api::types::{
    AnalysisResult, ErrorBody, LoginRequest, OtpLoginRequest, OtpRegisterRequest, OtpRequest,
    ProfileUpdate, RawAnalysisResponse, RegisterRequest, Reminder, ReminderCreate,
    ReminderUpdate, TokenResponse, UserProfile,
};
use crate::api::BackendApi;
use crate::config::ApiConfig;
use crate::error::{RemindrError, Result};

/// reqwest-backed client for the reminder backend
///
/// # Examples
///
/// ```no_run
/// use remindr::api::{BackendApi, HttpBackend};
/// use remindr::config::ApiConfig;
///
/// # async fn example() -> remindr::error::Result<()> {
/// let backend = HttpBackend::new(&ApiConfig::default())?;
/// let token = backend.login("ada@example.com", "hunter22").await?;
/// let reminders = backend.list_reminders(&token.access_token).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Build a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns [`RemindrError::Http`] if the underlying client cannot be
    /// constructed.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(RemindrError::Http)?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// The normalized base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder.bearer_auth(token)
    }

    /// Send a request and decode a JSON body on success.
    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> Result<T> {
        let response = self.send(builder, what).await?;
        let body = response.json::<T>().await.map_err(|e| {
            tracing::error!("Failed to parse {} response: {}", what, e);
            RemindrError::Http(e)
        })?;
        Ok(body)
    }

    /// Send a request, mapping transport failures and non-2xx statuses.
    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let response = builder.send().await.map_err(|e| {
            tracing::error!("{} request failed: {}", what, e);
            RemindrError::Http(e)
        })?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!("{} -> {}", what, status);
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::error!("{} returned error {}: {}", what, status, body);
        Err(error_from_response(status, &body).into())
    }

    async fn analyze_upload(
        &self,
        token: &str,
        path: &str,
        field: &'static str,
        part: Part,
    ) -> Result<AnalysisResult> {
        let form = Form::new().part(field, part);
        let builder = self.authed(self.client.post(self.url(path)), token).multipart(form);
        let raw: RawAnalysisResponse = self.send_json(builder, path).await?;
        Ok(AnalysisResult::from_raw(raw)?)
    }
}

/// Turn a non-success status and body into a [`RemindrError`].
///
/// `401` becomes [`RemindrError::Authentication`]; everything else becomes
/// [`RemindrError::Api`] carrying the backend `detail` text or a generic
/// fallback.
pub fn error_from_response(status: StatusCode, body: &str) -> RemindrError {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| b.detail.message())
        .filter(|m| !m.trim().is_empty());

    if status == StatusCode::UNAUTHORIZED {
        return RemindrError::Authentication(
            detail.unwrap_or_else(|| "Session expired. Please log in again".to_string()),
        );
    }

    RemindrError::Api {
        status: status.as_u16(),
        message: detail
            .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16())),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload".to_string())
}

/// Mime type for an audio recording, by extension
fn audio_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("webm") => "audio/webm",
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("flac") => "audio/flac",
        _ => "application/octet-stream",
    }
}

/// Mime type for image bytes, detected from content.
///
/// # Errors
///
/// Returns [`RemindrError::Validation`] when the bytes are not a known image
/// format.
pub fn image_mime(bytes: &[u8]) -> std::result::Result<&'static str, RemindrError> {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .map_err(|_| RemindrError::Validation("File is not a supported image".to_string()))
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn login(&self, email: &str, password: &str) -> Result<TokenResponse> {
        tracing::debug!("Logging in as {}", email);
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.send_json(self.client.post(self.url("/auth/login")).json(&body), "login")
            .await
    }

    async fn request_login_otp(&self, email: &str) -> Result<()> {
        let body = OtpRequest {
            email: email.to_string(),
        };
        self.send(
            self.client.post(self.url("/auth/request-login-otp")).json(&body),
            "request-login-otp",
        )
        .await?;
        Ok(())
    }

    async fn login_with_otp(&self, email: &str, otp: &str) -> Result<TokenResponse> {
        let body = OtpLoginRequest {
            email: email.to_string(),
            otp: otp.to_string(),
        };
        self.send_json(
            self.client.post(self.url("/auth/login-with-otp")).json(&body),
            "login-with-otp",
        )
        .await
    }

    async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<UserProfile> {
        let body = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            full_name: full_name.map(str::to_string),
        };
        self.send_json(self.client.post(self.url("/auth/register")).json(&body), "register")
            .await
    }

    async fn request_registration_otp(&self, email: &str) -> Result<()> {
        let body = OtpRequest {
            email: email.to_string(),
        };
        self.send(
            self.client
                .post(self.url("/auth/request-registration-otp"))
                .json(&body),
            "request-registration-otp",
        )
        .await?;
        Ok(())
    }

    async fn register_with_otp(
        &self,
        email: &str,
        otp: &str,
        full_name: Option<&str>,
        password: Option<&str>,
    ) -> Result<TokenResponse> {
        let body = OtpRegisterRequest {
            email: email.to_string(),
            otp: otp.to_string(),
            full_name: full_name.map(str::to_string),
            password: password.map(str::to_string),
        };
        self.send_json(
            self.client.post(self.url("/auth/register-with-otp")).json(&body),
            "register-with-otp",
        )
        .await
    }

    async fn current_user(&self, token: &str) -> Result<UserProfile> {
        self.send_json(
            self.authed(self.client.get(self.url("/auth/me")), token),
            "auth/me",
        )
        .await
    }

    async fn update_profile(&self, token: &str, update: &ProfileUpdate) -> Result<UserProfile> {
        self.send_json(
            self.authed(self.client.put(self.url("/auth/me")), token)
                .json(update),
            "update auth/me",
        )
        .await
    }

    async fn list_reminders(&self, token: &str) -> Result<Vec<Reminder>> {
        self.send_json(
            self.authed(self.client.get(self.url("/reminders")), token),
            "list reminders",
        )
        .await
    }

    async fn upcoming_reminders(&self, token: &str) -> Result<Vec<Reminder>> {
        self.send_json(
            self.authed(self.client.get(self.url("/reminders/upcoming")), token),
            "upcoming reminders",
        )
        .await
    }

    async fn get_reminder(&self, token: &str, id: i64) -> Result<Reminder> {
        self.send_json(
            self.authed(self.client.get(self.url(&format!("/reminders/{}", id))), token),
            "get reminder",
        )
        .await
    }

    async fn create_reminder(&self, token: &str, reminder: &ReminderCreate) -> Result<Reminder> {
        reminder.validate()?;
        self.send_json(
            self.authed(self.client.post(self.url("/reminders")), token)
                .json(reminder),
            "create reminder",
        )
        .await
    }

    async fn update_reminder(
        &self,
        token: &str,
        id: i64,
        update: &ReminderUpdate,
    ) -> Result<Reminder> {
        update.validate()?;
        self.send_json(
            self.authed(self.client.put(self.url(&format!("/reminders/{}", id))), token)
                .json(update),
            "update reminder",
        )
        .await
    }

    async fn delete_reminder(&self, token: &str, id: i64) -> Result<()> {
        self.send(
            self.authed(
                self.client.delete(self.url(&format!("/reminders/{}", id))),
                token,
            ),
            "delete reminder",
        )
        .await?;
        Ok(())
    }

    async fn complete_reminder(&self, token: &str, id: i64) -> Result<Reminder> {
        self.send_json(
            self.authed(
                self.client
                    .post(self.url(&format!("/reminders/{}/complete", id))),
                token,
            ),
            "complete reminder",
        )
        .await
    }

    async fn uncomplete_reminder(&self, token: &str, id: i64) -> Result<Reminder> {
        self.send_json(
            self.authed(
                self.client
                    .post(self.url(&format!("/reminders/{}/uncomplete", id))),
                token,
            ),
            "uncomplete reminder",
        )
        .await
    }

    async fn analyze_text(&self, token: &str, text: &str) -> Result<AnalysisResult> {
        tracing::debug!("Analyzing {} characters of text", text.chars().count());
        let builder = self
            .authed(self.client.post(self.url("/analyze/text")), token)
            .form(&[("text", text)]);
        let raw: RawAnalysisResponse = self.send_json(builder, "analyze text").await?;
        Ok(AnalysisResult::from_raw(raw)?)
    }

    async fn analyze_voice(&self, token: &str, audio: &Path) -> Result<AnalysisResult> {
        let bytes = tokio::fs::read(audio).await?;
        tracing::debug!("Uploading {} bytes of audio from {}", bytes.len(), audio.display());
        let part = Part::bytes(bytes)
            .file_name(file_name(audio))
            .mime_str(audio_mime(audio))
            .map_err(RemindrError::Http)?;
        self.analyze_upload(token, "/analyze/voice", "audio", part)
            .await
    }

    async fn analyze_image(&self, token: &str, image: &Path) -> Result<AnalysisResult> {
        let bytes = tokio::fs::read(image).await?;
        let mime = image_mime(&bytes)?;
        tracing::debug!("Uploading {} bytes of {} from {}", bytes.len(), mime, image.display());
        let part = Part::bytes(bytes)
            .file_name(file_name(image))
            .mime_str(mime)
            .map_err(RemindrError::Http)?;
        self.analyze_upload(token, "/analyze/image", "image", part)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = ApiConfig {
            base_url: "http://localhost:8000/".to_string(),
            ..Default::default()
        };
        let backend = HttpBackend::new(&config).unwrap();
        assert_eq!(backend.base_url(), "http://localhost:8000");
        assert_eq!(backend.url("/reminders"), "http://localhost:8000/reminders");
    }

    #[test]
    fn test_error_from_response_uses_detail() {
        let err = error_from_response(StatusCode::BAD_REQUEST, r#"{"detail":"Email already registered"}"#);
        match err {
            RemindrError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Email already registered");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_error_from_response_generic_fallback() {
        let err = error_from_response(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>");
        assert_eq!(err.user_message(), "Request failed with status 500");
    }

    #[test]
    fn test_error_from_response_unauthorized() {
        let err = error_from_response(StatusCode::UNAUTHORIZED, "");
        assert!(matches!(err, RemindrError::Authentication(_)));

        let err = error_from_response(
            StatusCode::UNAUTHORIZED,
            r#"{"detail":"Could not validate credentials"}"#,
        );
        assert_eq!(err.user_message(), "Could not validate credentials");
    }

    #[test]
    fn test_audio_mime_by_extension() {
        assert_eq!(audio_mime(Path::new("memo.WEBM")), "audio/webm");
        assert_eq!(audio_mime(Path::new("memo.mp3")), "audio/mpeg");
        assert_eq!(audio_mime(Path::new("memo")), "application/octet-stream");
    }

    #[test]
    fn test_image_mime_detects_png() {
        let png_header = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(image_mime(&png_header).unwrap(), "image/png");
        assert!(image_mime(b"plain text, not an image").is_err());
    }
}
