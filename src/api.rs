//! Client for the task backend
//!
//! The backend owns persistence, authentication and spreadsheet parsing; this
//! module only issues requests and decodes the JSON replies. Every request
//! carries the backend session cookie when one is known.

use chrono::NaiveDate;
use log::{debug, warn};
use reqwest::RequestBuilder;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;

use crate::admin::UploadFile;
use crate::date_utils::format_iso;
use crate::model::{
    AuthReply, BoardStats, DataEnvelope, DepartmentsEnvelope, ImportReply, StatsEnvelope,
    StatusReply, Task, TaskCounts, TasksByDate, TasksEnvelope, User,
};

#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx reply; `message` is the backend's `error` field when present
    #[error("{message}")]
    Status { status: u16, message: String },

    /// 2xx reply whose body reported `success: false`
    #[error("{0}")]
    Rejected(String),

    #[error("invalid response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// HTTP status of a backend rejection, if the backend answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

struct RawReply {
    cookies: Vec<String>,
    body: Vec<u8>,
}

/// Result of a successful login
#[derive(Clone, Debug)]
pub struct LoginOutcome {
    pub user: Option<User>,

    /// Cookie header value to replay on later requests
    pub session: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    session: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(base_url, reqwest::Client::new())
    }

    /// Build a client on top of a shared connection pool
    pub fn with_http(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        ApiClient {
            base_url,
            http,
            session: None,
        }
    }

    /// Attach the backend session cookie (`name=value[; name=value]`)
    pub fn with_session(mut self, session: Option<String>) -> Self {
        self.session = session.filter(|s| !s.is_empty());
        self
    }

    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn execute(&self, request: RequestBuilder, endpoint: &str) -> Result<RawReply, ApiError> {
        let request = match &self.session {
            Some(cookie) => request.header(COOKIE, cookie.as_str()),
            None => request,
        };

        let transport = |source| ApiError::Transport {
            endpoint: endpoint.to_string(),
            source,
        };

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(cookie_pair)
            .collect();
        let body = response.bytes().await.map_err(transport)?.to_vec();

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));
            warn!("API request failed: {} ({}): {}", endpoint, status, message);
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        debug!("API request ok: {} ({} bytes)", endpoint, body.len());
        Ok(RawReply { cookies, body })
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        let reply = self.execute(self.http.get(self.url(endpoint)), endpoint).await?;
        decode(endpoint, &reply.body)
    }

    pub async fn get_tasks(&self) -> Result<Vec<Task>, ApiError> {
        let envelope: TasksEnvelope = self.get_json("/api/tasks").await?;
        Ok(envelope.tasks)
    }

    pub async fn get_task_counts(&self, year: Option<i32>) -> Result<TaskCounts, ApiError> {
        let endpoint = format!("/api/tasks/counts{}", year_query(year));
        let envelope: DataEnvelope<TaskCounts> = self.get_json(&endpoint).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    pub async fn get_tasks_by_date(&self, year: Option<i32>) -> Result<TasksByDate, ApiError> {
        let endpoint = format!("/api/tasks/by-date{}", year_query(year));
        let envelope: DataEnvelope<TasksByDate> = self.get_json(&endpoint).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    pub async fn get_upcoming_tasks(&self, limit: Option<u32>) -> Result<Vec<Task>, ApiError> {
        let endpoint = match limit {
            Some(limit) => format!("/api/tasks/upcoming?limit={}", limit),
            None => "/api/tasks/upcoming".to_string(),
        };
        let envelope: TasksEnvelope = self.get_json(&endpoint).await?;
        Ok(envelope.tasks)
    }

    pub async fn get_tasks_for_date(&self, date: NaiveDate) -> Result<Vec<Task>, ApiError> {
        let endpoint = format!("/api/tasks/date/{}", format_iso(date));
        let envelope: TasksEnvelope = self.get_json(&endpoint).await?;
        Ok(envelope.tasks)
    }

    pub async fn get_departments(&self) -> Result<Vec<String>, ApiError> {
        let envelope: DepartmentsEnvelope = self.get_json("/api/departments").await?;
        Ok(envelope.departments)
    }

    pub async fn get_stats(&self) -> Result<Option<BoardStats>, ApiError> {
        let envelope: StatsEnvelope = self.get_json("/api/stats").await?;
        Ok(envelope.stats.filter(|_| envelope.success))
    }

    /// The logged-in admin, or `None` when the backend does not recognise the session
    pub async fn current_user(&self) -> Result<Option<User>, ApiError> {
        let reply: AuthReply = self.get_json("/api/admin/me").await?;
        Ok(reply.user.filter(|_| reply.success))
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, ApiError> {
        let endpoint = "/api/admin/login";
        let request = self
            .http
            .post(self.url(endpoint))
            .json(&json!({ "username": username, "password": password }));

        let raw = self.execute(request, endpoint).await?;
        let reply: AuthReply = decode(endpoint, &raw.body)?;
        if !reply.success {
            return Err(ApiError::Rejected(
                reply.error.unwrap_or_else(|| "Login failed".to_string()),
            ));
        }

        let session = if raw.cookies.is_empty() {
            self.session.clone()
        } else {
            Some(raw.cookies.join("; "))
        };
        Ok(LoginOutcome {
            user: reply.user,
            session,
        })
    }

    pub async fn logout(&self) -> Result<StatusReply, ApiError> {
        let endpoint = "/api/admin/logout";
        let raw = self.execute(self.http.post(self.url(endpoint)), endpoint).await?;
        decode(endpoint, &raw.body)
    }

    pub async fn change_password(&self, current: &str, new: &str) -> Result<StatusReply, ApiError> {
        let endpoint = "/api/admin/change-password";
        let request = self
            .http
            .post(self.url(endpoint))
            .json(&json!({ "current_password": current, "new_password": new }));
        let raw = self.execute(request, endpoint).await?;
        checked(decode(endpoint, &raw.body)?, |r: &StatusReply| (r.success, r.error.clone()))
    }

    /// Ask the backend what importing `file` would do, without saving anything
    pub async fn preview_import(&self, file: &UploadFile) -> Result<ImportReply, ApiError> {
        self.upload("/api/admin/preview", file).await
    }

    /// Merge the tasks of `file` into the backend store
    pub async fn import_tasks(&self, file: &UploadFile) -> Result<ImportReply, ApiError> {
        self.upload("/api/admin/import", file).await
    }

    async fn upload(&self, endpoint: &str, file: &UploadFile) -> Result<ImportReply, ApiError> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)
            .map_err(|source| ApiError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;
        let form = Form::new().part("file", part);

        let raw = self
            .execute(self.http.post(self.url(endpoint)).multipart(form), endpoint)
            .await?;
        checked(decode(endpoint, &raw.body)?, |r: &ImportReply| (r.success, r.error.clone()))
    }
}

fn decode<T: DeserializeOwned>(endpoint: &str, body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|source| ApiError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}

fn checked<T>(reply: T, outcome: impl Fn(&T) -> (bool, Option<String>)) -> Result<T, ApiError> {
    match outcome(&reply) {
        (true, _) => Ok(reply),
        (false, error) => Err(ApiError::Rejected(
            error.unwrap_or_else(|| "Request rejected".to_string()),
        )),
    }
}

fn year_query(year: Option<i32>) -> String {
    year.map(|y| format!("?year={}", y)).unwrap_or_default()
}

/// `name=value` part of a `Set-Cookie` header
fn cookie_pair(header: &str) -> Option<String> {
    let pair = header.split(';').next()?.trim();
    if pair.contains('=') {
        Some(pair.to_string())
    } else {
        None
    }
}
