//! reqwest implementation of [`AuthProvider`].
//!
//! # Security
//!
//! - Credentials and tokens are never logged
//! - Token and user endpoints are form-encoded, matching the server's OAuth2
//!   password grant
//! - Only the server's `detail` text is passed back to callers; transport and
//!   decoding errors are logged here and surface with a fixed message

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url, header::AUTHORIZATION};
use secureload_config::UpstreamConfig;
use secureload_models::{Credentials, NewRemoteUser, TokenPair, UserProfile};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, error, instrument, warn};

use crate::error::{GENERIC_DETAIL, UpstreamAuthError};
use crate::provider::AuthProvider;

const LOGIN_PATH: &str = "login";
const REFRESH_PATH: &str = "token/refresh";
const PROFILE_PATH: &str = "profile";
const USERS_PATH: &str = "users";

#[derive(Serialize)]
struct LoginForm<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    username: &'a str,
    password: &'a str,
    scope: &'a str,
}

#[derive(Serialize)]
struct RefreshForm<'a> {
    refresh: &'a str,
}

#[derive(Serialize)]
struct PasswordForm<'a> {
    password: &'a str,
}

/// HTTP client for the authorization server.
#[derive(Clone)]
pub struct HttpAuthProvider {
    client: Client,
    config: UpstreamConfig,
}

impl HttpAuthProvider {
    /// # Errors
    ///
    /// Returns `UpstreamAuthError::Client` if the HTTP client cannot be built.
    pub fn new(config: UpstreamConfig) -> Result<Self, UpstreamAuthError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| {
                error!(target: "secureload.upstream", error = %e, "Failed to build HTTP client");
                UpstreamAuthError::Client(e.to_string())
            })?;

        Ok(Self { client, config })
    }

    /// `users/<username>/` with the username escaped as one path segment.
    fn user_url(&self, username: &str) -> Result<Url, UpstreamAuthError> {
        let mut url = Url::parse(&self.config.endpoint(USERS_PATH))
            .map_err(|e| UpstreamAuthError::Client(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| UpstreamAuthError::Client("base URL cannot hold a path".to_string()))?
            .pop_if_empty()
            .push(username)
            .push("");
        Ok(url)
    }

    fn auth_header(&self, access_token: &str) -> String {
        format!("{} {}", self.config.header_type, access_token)
    }

    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, UpstreamAuthError> {
        request.send().await.map_err(|e| {
            warn!(target: "secureload.upstream", operation, error = %e, "Authorization server request failed");
            UpstreamAuthError::Unavailable
        })
    }

    async fn fetch_profile_once(&self, access_token: &str) -> Result<UserProfile, UpstreamAuthError> {
        let request = self
            .client
            .get(self.config.endpoint(PROFILE_PATH))
            .header(AUTHORIZATION, self.auth_header(access_token));
        let response = self.send("fetch_user_profile", request).await?;
        decode("fetch_user_profile", response).await
    }
}

/// Turns a non-success response into `Rejected`, passing success through.
async fn check(operation: &'static str, response: Response) -> Result<Response, UpstreamAuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.bytes().await.unwrap_or_default();
    let detail = extract_detail(&body);
    if status.is_server_error() {
        warn!(target: "secureload.upstream", operation, status = %status, "Authorization server returned server error");
    } else {
        debug!(target: "secureload.upstream", operation, status = %status, detail = %detail, "Authorization server rejected request");
    }

    Err(UpstreamAuthError::Rejected {
        status: status.as_u16(),
        detail,
    })
}

async fn decode<T: DeserializeOwned>(
    operation: &'static str,
    response: Response,
) -> Result<T, UpstreamAuthError> {
    let response = check(operation, response).await?;
    response.json().await.map_err(|e| {
        error!(target: "secureload.upstream", operation, error = %e, "Failed to parse authorization server response");
        UpstreamAuthError::InvalidResponse
    })
}

/// Pulls a human-readable message out of an error body.
///
/// Looks at `detail` first, then the OAuth2 `error` field.
pub(crate) fn extract_detail(body: &[u8]) -> String {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) else {
        return GENERIC_DETAIL.to_string();
    };

    ["detail", "error"]
        .iter()
        .find_map(|key| match value.get(key)? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Null => None,
            serde_json::Value::String(_) => None,
            other => Some(other.to_string()),
        })
        .unwrap_or_else(|| GENERIC_DETAIL.to_string())
}

fn record<T>(operation: &'static str, result: &Result<T, UpstreamAuthError>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(UpstreamAuthError::Rejected { .. }) => "rejected",
        Err(_) => "error",
    };
    metrics::counter!("upstream_requests_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
}

#[async_trait]
impl AuthProvider for HttpAuthProvider {
    fn name(&self) -> &str {
        self.config.provider.display_name()
    }

    fn base_url(&self) -> &str {
        &self.config.base_url
    }

    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    async fn issue_token(&self, credentials: &Credentials) -> Result<TokenPair, UpstreamAuthError> {
        let form = LoginForm {
            grant_type: &self.config.grant_type,
            client_id: &self.config.client_id,
            client_secret: &self.config.client_secret,
            username: &credentials.username,
            password: &credentials.password,
            scope: &self.config.scope,
        };
        let request = self.client.post(self.config.endpoint(LOGIN_PATH)).form(&form);

        let result = match self.send("issue_token", request).await {
            Ok(response) => decode("issue_token", response).await,
            Err(e) => Err(e),
        };
        record("issue_token", &result);
        result
    }

    #[instrument(skip_all)]
    async fn refresh_token(&self, refresh: &str) -> Result<TokenPair, UpstreamAuthError> {
        let request = self
            .client
            .post(self.config.endpoint(REFRESH_PATH))
            .form(&RefreshForm { refresh });

        let result = match self.send("refresh_token", request).await {
            Ok(response) => decode("refresh_token", response).await,
            Err(e) => Err(e),
        };
        record("refresh_token", &result);
        result
    }

    #[instrument(skip_all)]
    async fn fetch_user_profile(
        &self,
        access_token: &str,
    ) -> Result<UserProfile, UpstreamAuthError> {
        let mut backoff = self.config.retry_backoff_ms;
        let mut attempt = 0;

        let result = loop {
            match self.fetch_profile_once(access_token).await {
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(
                        target: "secureload.upstream",
                        attempt,
                        backoff_ms = backoff,
                        error = %e,
                        "Profile fetch failed, will retry"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                    backoff = backoff.saturating_mul(2);
                }
                other => break other,
            }
        };
        record("fetch_user_profile", &result);
        result
    }

    #[instrument(skip(self, access_token, user), fields(username = %user.username))]
    async fn create_remote_user(
        &self,
        access_token: &str,
        user: &NewRemoteUser,
    ) -> Result<UserProfile, UpstreamAuthError> {
        let request = self
            .client
            .post(self.config.endpoint(USERS_PATH))
            .header(AUTHORIZATION, self.auth_header(access_token))
            .form(user);

        let result = match self.send("create_remote_user", request).await {
            Ok(response) => decode("create_remote_user", response).await,
            Err(e) => Err(e),
        };
        record("create_remote_user", &result);
        result
    }

    #[instrument(skip(self, access_token, password))]
    async fn update_remote_password(
        &self,
        access_token: &str,
        username: &str,
        password: &str,
    ) -> Result<(), UpstreamAuthError> {
        let request = self
            .client
            .patch(self.user_url(username)?)
            .header(AUTHORIZATION, self.auth_header(access_token))
            .form(&PasswordForm { password });

        let result = match self.send("update_remote_password", request).await {
            Ok(response) => check("update_remote_password", response).await.map(|_| ()),
            Err(e) => Err(e),
        };
        record("update_remote_password", &result);
        result
    }
}
