//! OAuth2 client-credentials login against the Trellix IAM token endpoint.
//!
//! [`login`] POSTs `grant_type=client_credentials` with the fixed ePO scope
//! set, authenticating with HTTP Basic `(client_id, client_secret)`. On
//! success the session receives `Authorization: <access_token> <token_type>`
//! and every later request carries it. Login happens exactly once per run;
//! tokens are not refreshed.

use std::fmt;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{MvisionError, Result};
use crate::session::Session;

/// Space-joined scopes requested at login: admin access plus read access to
/// devices, groups, events and tags.
pub const DEFAULT_SCOPE: &str = "epo.admin epo.device.r epo.grps.r epo.evt.r epo.tags.r";

/// Client credentials for one run. Immutable once built.
#[derive(Clone)]
pub struct Credentials {
    client_id: String,
    client_secret: String,
    api_key: String,
}

impl Credentials {
    /// Bundles the IAM client id/secret with the ePO API key.
    pub fn new(client_id: &str, client_secret: &str, api_key: &str) -> Self {
        Credentials {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// The IAM client id.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The ePO API key sent as `x-api-key`.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Form body sent to the token endpoint.
#[derive(Serialize)]
pub struct TokenRequest<'a> {
    grant_type: &'a str,
    scope: &'a str,
}

impl Default for TokenRequest<'_> {
    fn default() -> Self {
        TokenRequest {
            grant_type: "client_credentials",
            scope: DEFAULT_SCOPE,
        }
    }
}

/// The part of the IAM token response that login uses. Extra fields such
/// as `expires_in` are ignored.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    /// Opaque bearer credential.
    pub access_token: String,
    /// Token type reported by IAM (normally `Bearer`).
    pub token_type: String,
}

impl TokenResponse {
    /// The `Authorization` header value installed into the session.
    pub fn authorization_value(&self) -> String {
        format!("{} {}", self.access_token, self.token_type)
    }
}

/// Exchanges client credentials for a bearer token and installs it into the
/// session.
///
/// # Errors
///
/// - `MvisionError::Auth`: non-2xx response (body kept in the message),
///   transport failure, or a token response missing `access_token` /
///   `token_type`.
/// - `MvisionError::InvalidHeader`: the token cannot form a header value.
pub async fn login(session: &mut Session, credentials: &Credentials) -> Result<TokenResponse> {
    let url = session.endpoints().token_url.clone();
    debug!(%url, client_id = %credentials.client_id, "requesting access token");

    let response = session
        .request_without_content_type(Method::POST, &url)
        .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
        .form(&TokenRequest::default())
        .send()
        .await
        .map_err(|e| MvisionError::auth_with_source("token request could not be sent", e))?;

    // Read the body before the status check so the IAM error document
    // survives into the error message.
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| MvisionError::auth_with_source("token response could not be read", e))?;

    if !status.is_success() {
        return Err(MvisionError::Auth {
            message: format!("token request failed ({status}): {body}"),
            source: None,
        });
    }

    let token: TokenResponse = serde_json::from_str(&body)
        .map_err(|e| MvisionError::auth_with_source("failed to parse token response", e))?;
    session.set_authorization(&token.authorization_value())?;
    info!(token_type = %token.token_type, "authenticated");

    Ok(token)
}
