//! Authenticated request execution
//!
//! [`RequestExecutor`] attaches the session token to every request, logs in
//! lazily, and retries once after reauthenticating when the server answers 401.
//!
//! The token sits behind an async mutex that is held for the whole login
//! exchange, so concurrent callers that all hit an expired token trigger a
//! single login between them. Requests themselves never hold the lock.

use crate::error::ApiError;
use crate::transport::{HttpRequest, HttpResponse, Method, Transport};
use crate::urls::Endpoint;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Header carrying the session token.
pub const TOKEN_HEADER: &str = "ElasticBox-Token";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Account used to obtain session tokens.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Extract the server's error message: the JSON `message` field when present,
/// otherwise the raw body.
pub fn error_message(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("message") {
            Some(Value::String(message)) => message.clone(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        },
        _ => body.to_string(),
    }
}

pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    endpoint: Endpoint,
    credentials: Credentials,
    token: Mutex<Option<String>>,
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("endpoint", &self.endpoint)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>, endpoint: Endpoint, credentials: Credentials) -> Self {
        Self {
            transport,
            endpoint,
            credentials,
            token: Mutex::new(None),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Whether a session token is currently held.
    pub async fn has_token(&self) -> bool {
        self.token.lock().await.is_some()
    }

    /// Log in now, replacing any held token.
    pub async fn connect(&self) -> Result<(), ApiError> {
        let mut guard = self.token.lock().await;
        *guard = Some(self.authenticate().await?);
        Ok(())
    }

    /// Exchange credentials for a session token.
    async fn authenticate(&self) -> Result<String, ApiError> {
        let body = json!({
            "email": self.credentials.email,
            "password": self.credentials.password,
        });
        let mut request =
            HttpRequest::new(Method::Post, self.endpoint.token_url()).with_body(body.to_string());
        request.set_header("Content-Type", JSON_CONTENT_TYPE);

        let response = self.transport.send(&request).await?;
        if response.status != 200 {
            return Err(ApiError::AuthenticationFailed {
                endpoint: self.endpoint.as_str().to_string(),
                status: response.status,
                message: error_message(&response.body),
            });
        }

        info!(endpoint = %self.endpoint.as_str(), email = %self.credentials.email, "Authenticated");
        Ok(response.body.trim().to_string())
    }

    /// Current token, logging in first when none is held.
    async fn current_token(&self) -> Result<String, ApiError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            return Ok(token.clone());
        }
        let token = self.authenticate().await?;
        *guard = Some(token.clone());
        Ok(token)
    }

    /// Replace a token the server rejected. If another caller already replaced
    /// it, reuse theirs instead of logging in again.
    async fn refresh_token(&self, rejected: &str) -> Result<String, ApiError> {
        let mut guard = self.token.lock().await;
        if let Some(current) = guard.as_ref() {
            if current != rejected {
                return Ok(current.clone());
            }
        }
        *guard = None;
        let token = self.authenticate().await?;
        *guard = Some(token.clone());
        Ok(token)
    }

    /// Drop the token, unless it has been replaced since `used` was handed out.
    async fn discard_token(&self, used: Option<&str>) {
        let mut guard = self.token.lock().await;
        if used.is_none() || guard.as_deref() == used {
            *guard = None;
        }
    }

    async fn send_with_token(
        &self,
        request: &HttpRequest,
        token: &str,
    ) -> Result<HttpResponse, ApiError> {
        let mut request = request.clone();
        request.set_header("Content-Type", JSON_CONTENT_TYPE);
        request.set_header(TOKEN_HEADER, token);
        self.transport.send(&request).await
    }

    /// Execute an authenticated request.
    ///
    /// A 401 triggers exactly one reauthentication and one resend; a second 401
    /// is [`ApiError::AuthenticationFailed`]. Other non-2xx answers become
    /// [`ApiError::Http`]. Every error discards the held token.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut used_token: Option<String> = None;
        let result = self.execute_inner(&request, &mut used_token).await;
        if result.is_err() {
            self.discard_token(used_token.as_deref()).await;
        }
        result
    }

    async fn execute_inner(
        &self,
        request: &HttpRequest,
        used_token: &mut Option<String>,
    ) -> Result<HttpResponse, ApiError> {
        let token = self.current_token().await?;
        *used_token = Some(token.clone());
        let mut response = self.send_with_token(request, &token).await?;

        if response.status == 401 {
            debug!(method = %request.method, url = %request.url, "Token rejected, reauthenticating");
            let token = self.refresh_token(&token).await?;
            *used_token = Some(token.clone());
            response = self.send_with_token(request, &token).await?;
            if response.status == 401 {
                return Err(ApiError::AuthenticationFailed {
                    endpoint: self.endpoint.as_str().to_string(),
                    status: response.status,
                    message: error_message(&response.body),
                });
            }
        }

        if !response.is_success() {
            return Err(ApiError::Http {
                status: response.status,
                message: error_message(&response.body),
            });
        }

        Ok(response)
    }

    /// GET a URL (or endpoint-relative path) and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let url = self.endpoint.resolve(url);
        let response = self.execute(HttpRequest::get(url.clone())).await?;
        decode(&url, &response.body)
    }

    /// Send a JSON body and decode the JSON answer.
    pub async fn send_json<B, T>(&self, method: Method, url: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint.resolve(url);
        let payload = serde_json::to_string(body).map_err(|e| ApiError::Decode {
            url: url.clone(),
            message: format!("Failed to encode request: {}", e),
        })?;
        let response = self
            .execute(HttpRequest::new(method, url.clone()).with_body(payload))
            .await?;
        decode(&url, &response.body)
    }

    /// Issue a bodiless request whose answer is not needed.
    pub async fn send_empty(&self, method: Method, url: &str) -> Result<(), ApiError> {
        let url = self.endpoint.resolve(url);
        self.execute(HttpRequest::new(method, url)).await?;
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}
