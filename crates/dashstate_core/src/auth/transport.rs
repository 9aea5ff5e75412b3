//! Remote auth endpoints: wire shapes, transport contract, HTTP adapter.
//!
//! # Responsibility
//! - Define the status endpoint payload and its mapping to `UserIdentity`.
//! - Define the `AuthTransport` seam used by the synchronizer.
//! - Provide `HttpAuthTransport`, a cookie-keeping reqwest client.
//!
//! # Invariants
//! - HTTP 401/403 on the status endpoint is an explicit deny, not an error.
//! - Any other non-2xx status is `Unavailable`, distinct from a deny.

use crate::auth::session::{AuthFailure, LinkedIdentity, UserIdentity};
use crate::config::AuthSyncConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Linked character entry in the status payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCharacter {
    pub character_id: i64,
    #[serde(alias = "display_name")]
    pub character_name: String,
}

/// Body of the "who-am-I" status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusResponse {
    pub authenticated: bool,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub character_id: Option<i64>,
    #[serde(default, alias = "display_name")]
    pub character_name: Option<String>,
    #[serde(default)]
    pub characters: Vec<StatusCharacter>,
}

impl StatusResponse {
    /// Payload equivalent of an explicit deny.
    pub fn denied() -> Self {
        Self::default()
    }

    /// Payload for an authenticated user with no extra identity fields.
    pub fn authenticated_as(user_id: i64) -> Self {
        Self {
            authenticated: true,
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    /// Identity fields, present only for an authenticated payload with a user id.
    pub fn identity(&self) -> Option<UserIdentity> {
        if !self.authenticated {
            return None;
        }
        let user_id = self.user_id?;
        Some(UserIdentity {
            user_id,
            character_id: self.character_id,
            display_name: self.character_name.clone(),
            linked_identities: self
                .characters
                .iter()
                .map(|character| LinkedIdentity {
                    character_id: character.character_id,
                    display_name: character.character_name.clone(),
                })
                .collect(),
        })
    }
}

/// Transport-level failure talking to the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthTransportError {
    /// Connect failure, timeout or interrupted body.
    Network(String),
    /// Non-auth error status from the remote.
    Unavailable(u16),
    /// Body is not the expected JSON shape.
    Decode(String),
}

impl Display for AuthTransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(details) => write!(f, "network error: {details}"),
            Self::Unavailable(status) => write!(f, "auth endpoint returned HTTP {status}"),
            Self::Decode(details) => write!(f, "invalid auth payload: {details}"),
        }
    }
}

impl Error for AuthTransportError {}

impl From<reqwest::Error> for AuthTransportError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Decode(value.to_string())
        } else if let Some(status) = value.status() {
            Self::Unavailable(status.as_u16())
        } else {
            Self::Network(value.to_string())
        }
    }
}

impl From<AuthTransportError> for AuthFailure {
    fn from(value: AuthTransportError) -> Self {
        match value {
            AuthTransportError::Network(details) => Self::Network(details),
            AuthTransportError::Unavailable(status) => Self::Unavailable(status),
            AuthTransportError::Decode(details) => Self::Decode(details),
        }
    }
}

/// Remote authority consulted by the synchronizer.
#[async_trait]
pub trait AuthTransport: Send + Sync {
    /// Calls the status endpoint.
    async fn fetch_status(&self) -> Result<StatusResponse, AuthTransportError>;

    /// Calls the logout endpoint.
    async fn logout(&self) -> Result<(), AuthTransportError>;
}

/// reqwest-backed transport; cookies persist across calls.
pub struct HttpAuthTransport {
    client: reqwest::Client,
    status_url: String,
    logout_url: String,
}

impl HttpAuthTransport {
    /// Builds a client from validated config.
    ///
    /// # Errors
    /// - Returns `Network` when the TLS/client backend cannot be built.
    pub fn new(config: &AuthSyncConfig) -> Result<Self, AuthTransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("dashstate/", env!("CARGO_PKG_VERSION")))
            .cookie_store(true)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| AuthTransportError::Network(err.to_string()))?;
        Ok(Self {
            client,
            status_url: config.status_url(),
            logout_url: config.logout_url(),
        })
    }

    pub fn status_url(&self) -> &str {
        &self.status_url
    }
}

#[async_trait]
impl AuthTransport for HttpAuthTransport {
    async fn fetch_status(&self) -> Result<StatusResponse, AuthTransportError> {
        let response = self
            .client
            .get(&self.status_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(StatusResponse::denied());
        }
        if !status.is_success() {
            return Err(AuthTransportError::Unavailable(status.as_u16()));
        }

        let body = response.bytes().await?;
        serde_json::from_slice::<StatusResponse>(&body)
            .map_err(|err| AuthTransportError::Decode(err.to_string()))
    }

    async fn logout(&self) -> Result<(), AuthTransportError> {
        let response = self.client.post(&self.logout_url).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AuthTransportError::Unavailable(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthTransportError, StatusResponse};
    use crate::auth::session::AuthFailure;
    use serde_json::json;

    #[test]
    fn identity_is_built_from_status_fields() {
        let payload: StatusResponse = serde_json::from_value(json!({
            "authenticated": true,
            "user_id": 7,
            "character_id": 9001,
            "character_name": "Ops Lead",
            "characters": [
                { "character_id": 9001, "character_name": "Ops Lead" },
                { "character_id": 9002, "display_name": "Alt" }
            ]
        }))
        .expect("payload decodes");

        let identity = payload.identity().expect("identity present");
        assert_eq!(identity.user_id, 7);
        assert_eq!(identity.character_id, Some(9001));
        assert_eq!(identity.display_name.as_deref(), Some("Ops Lead"));
        assert_eq!(identity.linked_identities.len(), 2);
        assert_eq!(identity.linked_identities[1].display_name, "Alt");
    }

    #[test]
    fn unauthenticated_payload_never_yields_identity() {
        let payload: StatusResponse =
            serde_json::from_value(json!({ "authenticated": false, "user_id": 7 }))
                .expect("payload decodes");
        assert!(payload.identity().is_none());
    }

    #[test]
    fn transport_errors_map_to_session_failures() {
        assert_eq!(
            AuthFailure::from(AuthTransportError::Unavailable(503)),
            AuthFailure::Unavailable(503)
        );
        assert!(matches!(
            AuthFailure::from(AuthTransportError::Network("refused".to_string())),
            AuthFailure::Network(_)
        ));
    }
}
