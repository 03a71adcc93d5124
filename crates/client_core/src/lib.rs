use std::path::Path;

use async_trait::async_trait;
use reqwest::{header::COOKIE, multipart, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::UserId,
    protocol::{DailyProgress, ReviewItem, UserProfile, UserSettings, Wordlist},
};
use tracing::{debug, info};
use url::Url;

pub mod error;
pub mod review_session;

pub use error::{ClientError, ErrorCategory, Result};
pub use reqwest::StatusCode;
pub use review_session::{
    ActionOutcome, FetchOutcome, ReviewPhase, ReviewSession, ReviewTurn, SessionView, UNDO_WINDOW,
};

/// Name of the cookie the backend reads the caller's identity from.
pub const SESSION_COOKIE: &str = "user_id";

/// Backend operations the review loop depends on.
///
/// `current_item` and `proceed` return `Ok(None)` for the completion signal,
/// i.e. a successful response that does not carry a review item.
#[async_trait]
pub trait LearningBackend: Send + Sync {
    async fn current_item(&self) -> Result<Option<ReviewItem>>;
    async fn proceed(&self, is_known: bool) -> Result<Option<ReviewItem>>;
    async fn progress(&self) -> Result<DailyProgress>;
    async fn reset(&self) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct RegisterForm<'a> {
    user_name: &'a str,
}

#[derive(Debug, Serialize)]
struct ProceedForm {
    is_known: bool,
}

pub struct MemoClient {
    http: Client,
    server_url: String,
    user_id: Option<UserId>,
}

impl MemoClient {
    pub fn new(server_url: &str) -> Result<Self> {
        let parsed = Url::parse(server_url.trim()).map_err(|source| ClientError::InvalidBaseUrl {
            url: server_url.to_string(),
            source,
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::Validation(format!(
                "backend url must start with http:// or https://, got '{server_url}'"
            )));
        }

        Ok(Self {
            http: Client::new(),
            server_url: parsed.as_str().trim_end_matches('/').to_string(),
            user_id: None,
        })
    }

    pub fn with_session(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn logout(&mut self) {
        self.user_id = None;
    }

    /// Creates an account and adopts the returned id as the session.
    pub async fn register(&mut self, user_name: &str) -> Result<UserId> {
        let user_name = user_name.trim();
        if user_name.is_empty() {
            return Err(ClientError::Validation("user name must not be empty".into()));
        }

        let res = self
            .request(Method::POST, "/user/register")
            .form(&RegisterForm { user_name })
            .send()
            .await?;
        let body = check_status(res).await?.text().await?;
        let user_id = body
            .trim()
            .parse::<i64>()
            .map(UserId)
            .map_err(|err| ClientError::Decode {
                endpoint: "/user/register",
                reason: format!("expected numeric user id, got '{}': {err}", body.trim()),
            })?;

        info!(user_id = user_id.0, "registered new user");
        self.user_id = Some(user_id);
        Ok(user_id)
    }

    /// Adopts `user_id` as the session and checks it against `/user/me`.
    pub async fn login(&mut self, user_id: UserId) -> Result<UserProfile> {
        self.user_id = Some(user_id);
        match self.me().await {
            Ok(profile) => {
                info!(user_id = user_id.0, "logged in");
                Ok(profile)
            }
            Err(err) => {
                self.user_id = None;
                Err(err)
            }
        }
    }

    pub async fn me(&self) -> Result<UserProfile> {
        self.get_json("/user/me").await
    }

    /// `None` when the user has not configured anything yet.
    pub async fn settings(&self) -> Result<Option<UserSettings>> {
        let body = self.get_text("/user/settings").await?;
        Ok(parse_optional(&body, "/user/settings"))
    }

    pub async fn update_settings(&self, settings: &UserSettings) -> Result<UserSettings> {
        self.require_session()?;
        let res = self
            .request(Method::POST, "/user/settings/edit")
            .json(settings)
            .send()
            .await?;
        decode_json(check_status(res).await?, "/user/settings/edit").await
    }

    pub async fn wordlists(&self) -> Result<Vec<Wordlist>> {
        let body = self.get_text("/wordlist/all").await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&body).map_err(|err| ClientError::Decode {
            endpoint: "/wordlist/all",
            reason: err.to_string(),
        })
    }

    /// Uploads a word list file and returns the backend's acknowledgment text.
    pub async fn upload_wordlist(&self, path: &Path) -> Result<String> {
        self.require_session()?;
        let bytes = tokio::fs::read(path).await.map_err(|source| ClientError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ClientError::Validation(format!("'{}' is not a file path", path.display()))
            })?;

        let form = multipart::Form::new()
            .part(
                "file",
                multipart::Part::bytes(bytes).file_name(filename.clone()),
            )
            .text("filename", filename.clone());
        let res = self
            .request(Method::POST, "/wordlist/upload")
            .multipart(form)
            .send()
            .await?;
        let ack = check_status(res).await?.text().await?;
        info!(%filename, "uploaded word list");
        Ok(ack)
    }

    fn require_session(&self) -> Result<UserId> {
        self.user_id.ok_or(ClientError::NoSession)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!(%method, path, "backend request");
        let builder = self
            .http
            .request(method, format!("{}{}", self.server_url, path));
        match self.user_id {
            Some(user_id) => builder.header(COOKIE, format!("{SESSION_COOKIE}={}", user_id.0)),
            None => builder,
        }
    }

    async fn get_text(&self, path: &'static str) -> Result<String> {
        self.require_session()?;
        let res = self.request(Method::GET, path).send().await?;
        Ok(check_status(res).await?.text().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &'static str) -> Result<T> {
        self.require_session()?;
        let res = self.request(Method::GET, path).send().await?;
        decode_json(check_status(res).await?, path).await
    }
}

#[async_trait]
impl LearningBackend for MemoClient {
    async fn current_item(&self) -> Result<Option<ReviewItem>> {
        let body = self.get_text("/learning/current").await?;
        Ok(parse_optional(&body, "/learning/current"))
    }

    async fn proceed(&self, is_known: bool) -> Result<Option<ReviewItem>> {
        self.require_session()?;
        let res = self
            .request(Method::POST, "/learning/proceed")
            .form(&ProceedForm { is_known })
            .send()
            .await?;
        let body = check_status(res).await?.text().await?;
        Ok(parse_optional(&body, "/learning/proceed"))
    }

    async fn progress(&self) -> Result<DailyProgress> {
        self.get_json("/learning/progress").await
    }

    async fn reset(&self) -> Result<()> {
        self.require_session()?;
        let res = self.request(Method::POST, "/learning/reset").send().await?;
        check_status(res).await?;
        Ok(())
    }
}

async fn check_status(res: Response) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ClientError::Unauthorized { status });
    }
    let body = res.text().await.unwrap_or_default();
    Err(ClientError::Status { status, body })
}

async fn decode_json<T: DeserializeOwned>(res: Response, endpoint: &'static str) -> Result<T> {
    let body = res.text().await?;
    serde_json::from_str(&body).map_err(|err| ClientError::Decode {
        endpoint,
        reason: err.to_string(),
    })
}

/// Empty or non-matching bodies are the backend's way of saying "nothing".
fn parse_optional<T: DeserializeOwned>(body: &str, endpoint: &'static str) -> Option<T> {
    if body.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(body) {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(endpoint, "treating unparseable body as empty: {err}");
            None
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
