//! Sol-Ark Cloud authentication.
//! Handles both the modern OAuth-style protocol and the legacy login
//! endpoint, with mode selection, protocol learning and token refresh.
use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use strum_macros::{Display, EnumString};
use tokio::sync::RwLock;

use super::error::{Error, Result};
use super::http_client::{Host, HttpClient};

static OAUTH_TOKEN_ENDPOINT: &str = "/oauth/token";
static LEGACY_LOGIN_ENDPOINT: &str = "/rest/account/login";

/// Safety margin subtracted from the reported token lifetime.
const EXPIRY_MARGIN_SECS: i64 = 60;
/// Legacy sessions carry no expiry information; assume 30 minutes.
const LEGACY_SESSION_SECS: i64 = 30 * 60;

/// Authentication mode preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AuthMode {
    /// Try the modern protocol, fall back to legacy on structural failure.
    Auto,
    /// Modern protocol only.
    Strict,
    /// Legacy protocol only.
    Legacy,
}

/// Which login protocol produced a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum AuthProtocol {
    Modern,
    Legacy,
}

/// Account and plant configuration, immutable per session.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub plant_id: String,
    pub auth_mode: AuthMode,
}

/// An authenticated session with the cloud API.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub protocol: AuthProtocol,
}

impl Session {
    /// Returns `true` once the expiry margin has been reached.
    pub fn is_expiring(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }
}

pub struct Authenticator {
    credentials: Credentials,
    session: RwLock<Option<Session>>,
    learned: RwLock<Option<AuthProtocol>>,
}

impl Authenticator {
    /// Creates a new instance of `Authenticator`.
    pub fn new(credentials: Credentials) -> Self {
        Authenticator {
            credentials,
            session: RwLock::new(None),
            learned: RwLock::new(None),
        }
    }

    /// Return a valid session, refreshing or logging in as needed.
    pub async fn ensure_session(&self, http: &HttpClient, host: Host) -> Result<Session> {
        if let Some(session) = self.session.read().await.clone() {
            if !session.is_expiring() {
                return Ok(session);
            }
            match self.refresh(http, host, &session).await {
                Ok(renewed) => return Ok(renewed),
                Err(err) => log::debug!("Token refresh failed ({err}), performing a full login"),
            }
        }
        self.login(http, host).await
    }

    /// Drop the current session, forcing a login on the next use.
    pub async fn invalidate(&self) {
        *self.session.write().await = None;
    }

    /// Login following the configured mode and the learned protocol.
    pub async fn login(&self, http: &HttpClient, host: Host) -> Result<Session> {
        let mut last_structural: Option<Error> = None;
        for protocol in self.candidates().await {
            match self.login_with(http, host, protocol).await {
                Ok(session) => {
                    *self.learned.write().await = Some(protocol);
                    *self.session.write().await = Some(session.clone());
                    log::info!("Authenticated via the {protocol} protocol");
                    return Ok(session);
                }
                Err(err)
                    if Self::is_structural(&err)
                        && self.credentials.auth_mode == AuthMode::Auto =>
                {
                    log::debug!("{protocol} login failed structurally ({err}), falling back");
                    last_structural = Some(err);
                }
                Err(Error::Unauthorized) => return Err(Error::InvalidCredentials),
                Err(Error::NotFound) => {
                    return Err(Error::AuthFailed(format!(
                        "{protocol} login endpoint not found"
                    )));
                }
                Err(err) => return Err(err),
            }
        }
        Err(Error::AuthFailed(
            last_structural
                .map(|err| err.to_string())
                .unwrap_or_else(|| "no auth protocol available".to_string()),
        ))
    }

    /// Protocols to attempt, honoring mode and learned success.
    async fn candidates(&self) -> Vec<AuthProtocol> {
        match self.credentials.auth_mode {
            AuthMode::Strict => vec![AuthProtocol::Modern],
            AuthMode::Legacy => vec![AuthProtocol::Legacy],
            AuthMode::Auto => match *self.learned.read().await {
                Some(protocol) => vec![protocol],
                None => vec![AuthProtocol::Modern, AuthProtocol::Legacy],
            },
        }
    }

    /// Structural failures trigger the auto-mode fallback; credential
    /// and network failures never do.
    fn is_structural(error: &Error) -> bool {
        matches!(error, Error::NotFound | Error::SchemaMismatch(_))
    }

    async fn login_with(
        &self,
        http: &HttpClient,
        host: Host,
        protocol: AuthProtocol,
    ) -> Result<Session> {
        match protocol {
            AuthProtocol::Modern => self.login_modern(http, host).await,
            AuthProtocol::Legacy => self.login_legacy(http, host).await,
        }
    }

    async fn login_modern(&self, http: &HttpClient, host: Host) -> Result<Session> {
        let body = json!({
            "username": self.credentials.email,
            "password": self.credentials.password,
            "grant_type": "password",
            "client_id": "csp-web",
        });
        let value = http.post_json(host, OAUTH_TOKEN_ENDPOINT, &body, None).await?;
        Self::session_from_modern(&value)
    }

    async fn login_legacy(&self, http: &HttpClient, host: Host) -> Result<Session> {
        let body = json!({
            "username": self.credentials.email,
            "password": self.credentials.password,
        });
        let value = http
            .post_json(host, LEGACY_LOGIN_ENDPOINT, &body, None)
            .await?;
        Self::session_from_legacy(&value)
    }

    /// Proactively renew a modern session via its refresh token.
    async fn refresh(&self, http: &HttpClient, host: Host, session: &Session) -> Result<Session> {
        let refresh_token = match (session.protocol, &session.refresh_token) {
            (AuthProtocol::Modern, Some(token)) => token,
            _ => return Err(Error::TokenExpired),
        };
        let body = json!({
            "grant_type": "refresh_token",
            "refresh_token": refresh_token,
            "client_id": "csp-web",
        });
        let value = http.post_json(host, OAUTH_TOKEN_ENDPOINT, &body, None).await?;
        let renewed = Self::session_from_modern(&value)?;
        *self.session.write().await = Some(renewed.clone());
        log::debug!("Access token refreshed");
        Ok(renewed)
    }

    fn session_from_modern(value: &Value) -> Result<Session> {
        let data = value.get("data").unwrap_or(value);
        let access_token = data
            .get("access_token")
            .or_else(|| data.get("token"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::SchemaMismatch("login response carries no access token".into())
            })?
            .to_string();
        let refresh_token = data
            .get("refresh_token")
            .and_then(Value::as_str)
            .map(str::to_string);
        let expires_in = data
            .get("expires_in")
            .and_then(Value::as_i64)
            .unwrap_or(3600);
        let expires_at = Utc::now() + Duration::seconds((expires_in - EXPIRY_MARGIN_SECS).max(0));
        Ok(Session {
            access_token,
            refresh_token,
            expires_at: Some(expires_at),
            protocol: AuthProtocol::Modern,
        })
    }

    fn session_from_legacy(value: &Value) -> Result<Session> {
        let data = value.get("data").unwrap_or(value);
        let access_token = ["token", "access_token"]
            .iter()
            .find_map(|key| {
                value
                    .get(*key)
                    .or_else(|| data.get(*key))
                    .and_then(Value::as_str)
            })
            .ok_or_else(|| Error::SchemaMismatch("login response carries no token".into()))?
            .to_string();
        Ok(Session {
            access_token,
            refresh_token: None,
            expires_at: Some(Utc::now() + Duration::seconds(LEGACY_SESSION_SECS)),
            protocol: AuthProtocol::Legacy,
        })
    }
}
