//! REST transport for the two backend scopes.
//!
//! `WorkspaceClient` talks to a workspace deployment, `AccountClient` to the
//! account-level console API (all paths prefixed with the account id). Both
//! are thin JSON transports over `reqwest`: verbs return raw
//! `serde_json::Value` and non-2xx responses surface as [`ApiError::Api`]
//! with the body's message extracted. Error classification happens in the
//! `From<ApiError> for ClassifiedError` impl, not here.

use crate::error::{ClassifiedError, ErrorKind};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::trace;
use url::Url;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Transport-level failure from either client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid base URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("client configuration: {0}")]
    Build(String),
}

impl From<ApiError> for ClassifiedError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Transport(e) => ClassifiedError::new(ErrorKind::Network, e.to_string()),
            ApiError::Api { status, message } => {
                let kind = match status {
                    429 => ErrorKind::RateLimit,
                    401 => ErrorKind::Auth,
                    403 => ErrorKind::Permission,
                    404 => ErrorKind::NotFound,
                    400 => ErrorKind::BadRequest,
                    s if s >= 500 => ErrorKind::TransientServer,
                    // Unusual statuses fall back to message classification.
                    _ => ErrorKind::classify(&message),
                };
                ClassifiedError::new(kind, format!("HTTP {status}: {message}"))
            }
            ApiError::Decode(e) => ClassifiedError::new(ErrorKind::Unknown, e.to_string()),
            ApiError::Url(e) => ClassifiedError::new(ErrorKind::BadRequest, e.to_string()),
            ApiError::Build(msg) => ClassifiedError::new(ErrorKind::BadRequest, msg),
        }
    }
}

/// Pull a human-readable message out of an error body. The backend wraps
/// errors as `{"error_code": ..., "message": ...}`; anything else is
/// returned verbatim.
fn extract_message(body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<Value>(body) {
        let message = v.get("message").and_then(Value::as_str);
        let code = v.get("error_code").and_then(Value::as_str);
        match (code, message) {
            (Some(code), Some(msg)) => return format!("{code}: {msg}"),
            (None, Some(msg)) => return msg.to_string(),
            (Some(code), None) => return code.to_string(),
            (None, None) => {}
        }
    }
    if body.is_empty() {
        "empty error body".to_string()
    } else {
        body.to_string()
    }
}

#[derive(Debug, Clone)]
struct Transport {
    http: reqwest::Client,
    base_url: Url,
}

impl Transport {
    fn new(base_url: &str, token: &str, user_agent: &str, timeout: Duration) -> Result<Self, ApiError> {
        let mut base_url: Url = base_url.parse()?;
        // A base without a trailing slash would swallow its last path
        // segment on join.
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ApiError::Build("token contains non-header characters".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent.to_string())
            .timeout(timeout)
            .build()?;
        Ok(Self { http, base_url })
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    async fn execute(&self, req: reqwest::RequestBuilder) -> Result<Value, ApiError> {
        let resp = req.send().await?;
        let status = resp.status();
        trace!(status = status.as_u16(), "response received");
        if status.is_success() {
            if status == StatusCode::NO_CONTENT {
                return Ok(Value::Null);
            }
            let text = resp.text().await?;
            if text.is_empty() {
                Ok(Value::Null)
            } else {
                Ok(serde_json::from_str(&text)?)
            }
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(ApiError::Api {
                status: status.as_u16(),
                message: extract_message(&body),
            })
        }
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ApiError> {
        let mut req = self.http.get(self.url(path)?);
        if !query.is_empty() {
            req = req.query(query);
        }
        self.execute(req).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.execute(self.http.post(self.url(path)?).json(body)).await
    }

    async fn patch(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.execute(self.http.patch(self.url(path)?).json(body)).await
    }

    async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.execute(self.http.delete(self.url(path)?)).await
    }
}

/// Client for workspace-scoped APIs (compute, jobs, SQL, workspace objects).
#[derive(Debug, Clone)]
pub struct WorkspaceClient {
    transport: Transport,
}

impl WorkspaceClient {
    pub fn builder() -> WorkspaceClientBuilder {
        WorkspaceClientBuilder::default()
    }

    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.transport.get(path, &[]).await
    }

    pub async fn get_query(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ApiError> {
        self.transport.get(path, query).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.transport.post(path, body).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.transport.patch(path, body).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.transport.delete(path).await
    }

    /// Cheap authenticated request used as the construction handshake.
    pub async fn ping(&self) -> Result<(), ApiError> {
        self.transport.get("/api/2.0/identity/me", &[]).await?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct WorkspaceClientBuilder {
    base_url: Option<String>,
    token: Option<String>,
    user_agent: Option<String>,
    timeout: Option<Duration>,
}

impl WorkspaceClientBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<WorkspaceClient, ApiError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ApiError::Build("workspace host is required".into()))?;
        let token = self
            .token
            .ok_or_else(|| ApiError::Build("workspace token is required".into()))?;
        let ua = self
            .user_agent
            .unwrap_or_else(|| format!("lakectl/{}", env!("CARGO_PKG_VERSION")));
        let transport = Transport::new(
            &base_url,
            &token,
            &ua,
            self.timeout.unwrap_or(DEFAULT_TIMEOUT),
        )?;
        Ok(WorkspaceClient { transport })
    }
}

/// Client for account-scoped APIs (workspace provisioning, IAM, metastores).
/// Every path is resolved under `/api/2.0/accounts/{account_id}`.
#[derive(Debug, Clone)]
pub struct AccountClient {
    transport: Transport,
    account_id: String,
}

impl AccountClient {
    pub fn builder() -> AccountClientBuilder {
        AccountClientBuilder::default()
    }

    fn prefixed(&self, path: &str) -> String {
        format!(
            "/api/2.0/accounts/{}/{}",
            self.account_id,
            path.trim_start_matches('/')
        )
    }

    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.transport.get(&self.prefixed(path), &[]).await
    }

    pub async fn get_query(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ApiError> {
        self.transport.get(&self.prefixed(path), query).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.transport.post(&self.prefixed(path), body).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.transport.delete(&self.prefixed(path)).await
    }

    /// Construction handshake: a metastore list is the cheapest
    /// account-scoped read.
    pub async fn ping(&self) -> Result<(), ApiError> {
        self.get("/metastores").await?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct AccountClientBuilder {
    base_url: Option<String>,
    token: Option<String>,
    account_id: Option<String>,
    user_agent: Option<String>,
    timeout: Option<Duration>,
}

impl AccountClientBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn account_id(mut self, id: impl Into<String>) -> Self {
        self.account_id = Some(id.into());
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<AccountClient, ApiError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ApiError::Build("account host is required".into()))?;
        let token = self
            .token
            .ok_or_else(|| ApiError::Build("account token is required".into()))?;
        let account_id = self
            .account_id
            .ok_or_else(|| ApiError::Build("account id is required".into()))?;
        let ua = self
            .user_agent
            .unwrap_or_else(|| format!("lakectl/{}", env!("CARGO_PKG_VERSION")));
        let transport = Transport::new(
            &base_url,
            &token,
            &ua,
            self.timeout.unwrap_or(DEFAULT_TIMEOUT),
        )?;
        Ok(AccountClient {
            transport,
            account_id,
        })
    }
}

/// Scope-erased client handed to handlers through the call context.
#[derive(Debug, Clone)]
pub enum ApiClient {
    Workspace(WorkspaceClient),
    Account(AccountClient),
}

impl ApiClient {
    /// The workspace client, or a classified error when a handler was
    /// registered under the wrong scope.
    pub fn workspace(&self) -> Result<&WorkspaceClient, ClassifiedError> {
        match self {
            ApiClient::Workspace(c) => Ok(c),
            ApiClient::Account(_) => Err(ClassifiedError::new(
                ErrorKind::Unknown,
                "handler expected a workspace-scoped client",
            )),
        }
    }

    pub fn account(&self) -> Result<&AccountClient, ClassifiedError> {
        match self {
            ApiClient::Account(c) => Ok(c),
            ApiClient::Workspace(_) => Err(ClassifiedError::new(
                ErrorKind::Unknown,
                "handler expected an account-scoped client",
            )),
        }
    }
}
