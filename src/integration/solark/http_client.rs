//! Sol-Ark Cloud HTTP client.
//! This is the lower level transport: timeouts, status mapping, retries
//! and vendor envelope handling.
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};

use super::error::{Error, Result};

/// Which of the two known Sol-Ark Cloud base hosts to target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Host {
    Primary,
    Fallback,
}

pub struct HttpClient {
    client: Client,
    primary: Url,
    fallback: Url,
}

impl HttpClient {
    /// Creates a new instance of `HttpClient`.
    pub fn new(primary: Url, fallback: Url, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");
        HttpClient {
            client,
            primary,
            fallback,
        }
    }

    fn base(&self, host: Host) -> &Url {
        match host {
            Host::Primary => &self.primary,
            Host::Fallback => &self.fallback,
        }
    }

    /// POST a JSON body and return the decoded JSON response.
    pub async fn post_json(
        &self,
        host: Host,
        path: &str,
        body: &Value,
        token: Option<&str>,
    ) -> Result<Value> {
        RetryIf::spawn(
            Self::retry_strategy(),
            || self.request_post(host, path, body, token),
            Self::is_retryable_error,
        )
        .await
    }

    /// Internal method to perform the actual request.
    async fn request_post(
        &self,
        host: Host,
        path: &str,
        body: &Value,
        token: Option<&str>,
    ) -> Result<Value> {
        log::debug!("Sending POST {path} via {host:?}");
        let url = self
            .base(host)
            .join(path)
            .expect("cannot build request URL");
        let mut request = self
            .client
            .post(url)
            .header("Accept", "application/json")
            .json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|err| self.transport_error(host, err))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            log::debug!("Response HTTP {status}: {}", truncate(&text));
            return Err(Self::status_error(status, &text));
        }
        let value = response
            .json::<Value>()
            .await
            .map_err(|_| Error::SchemaMismatch("response body is not valid JSON".into()))?;
        Self::check_envelope(value)
    }

    fn transport_error(&self, host: Host, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout
        } else if err.is_connect() {
            Error::Unreachable(self.base(host).to_string())
        } else {
            Error::RequestFailed(err)
        }
    }

    /// Map HTTP status semantics onto the error taxonomy.
    fn status_error(status: StatusCode, text: &str) -> Error {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Unauthorized,
            StatusCode::NOT_FOUND => Error::NotFound,
            StatusCode::TOO_MANY_REQUESTS => Error::RateLimited,
            status if status.is_server_error() => Error::ServerError(status.as_u16()),
            status => Error::BadRequest(format!("HTTP {}: {}", status.as_u16(), truncate(text))),
        }
    }

    /// Reject vendor-level error envelopes returned with HTTP 200.
    fn check_envelope(value: Value) -> Result<Value> {
        let Some(object) = value.as_object() else {
            return Ok(value);
        };
        if let Some(code) = object.get("code") {
            let ok = code.is_null() || code.as_i64() == Some(0) || code.as_str() == Some("0");
            if !ok {
                let msg = object
                    .get("msg")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string();
                return Err(Self::envelope_error(msg));
            }
        }
        let success = object.get("success").or_else(|| object.get("Success"));
        if success.and_then(Value::as_bool) == Some(false) {
            let msg = ["message", "Message", "msg", "error"]
                .iter()
                .find_map(|key| object.get(*key).and_then(Value::as_str))
                .unwrap_or("unknown error")
                .to_string();
            return Err(Self::envelope_error(msg));
        }
        Ok(value)
    }

    fn envelope_error(msg: String) -> Error {
        let lower = msg.to_lowercase();
        if lower.contains("token") || lower.contains("auth") {
            Error::Unauthorized
        } else {
            Error::Api(msg)
        }
    }

    /// Create a retry strategy with exponential backoff starting at 10 milliseconds, with jitter, and a maximum of 3 retries.
    fn retry_strategy() -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(10).map(jitter).take(3)
    }

    // Predicate function for the retry strategy to determine if an error is retryable.
    fn is_retryable_error(error: &Error) -> bool {
        matches!(error, Error::ServerError(_) | Error::Unreachable(_))
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(200).collect()
}
