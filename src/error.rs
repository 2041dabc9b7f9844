//! Typed error hierarchy for the mvision-devices crate.
//!
//! Variants map to the system boundaries a run crosses: the IAM token
//! endpoint (`Auth`), the ePO devices endpoint (`Api`), the transport
//! (`Network`), response decoding (`Parse`), and local setup of the session
//! (`InvalidProxy`, `InvalidHeader`, `InvalidPageSize`, `NotAuthenticated`).
//!
//! Authentication and setup errors are fatal to a run. Errors hit while
//! paging are recorded on the pager as its terminal state instead of being
//! returned, so records already yielded stay usable.

use reqwest::StatusCode;

/// Unified error type for all mvision-devices operations.
#[derive(Debug, thiserror::Error)]
pub enum MvisionError {
    /// Failure at the IAM token endpoint.
    ///
    /// Covers non-2xx responses (bad client id/secret, scopes not granted),
    /// transport failures reaching the endpoint, and token responses that
    /// do not parse.
    #[error("authentication failed: {message}")]
    Auth {
        /// Human-readable description including HTTP status and body when available.
        message: String,
        /// The underlying transport or parse error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The devices endpoint returned a non-success HTTP status code.
    ///
    /// The body is kept because ePO error documents (`errors[].detail`)
    /// explain permission and API key problems.
    #[error("API error {status}: {body}")]
    Api {
        /// The HTTP status code returned by the API.
        status: StatusCode,
        /// The raw response body, or an empty string if it could not be read.
        body: String,
    },

    /// JSON deserialization failed when parsing a response body.
    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// A network-level failure (DNS, TCP, TLS, request timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A proxy URL from the proxy settings was rejected.
    #[error("invalid {scheme} proxy '{url}': {reason}")]
    InvalidProxy {
        /// The scheme the proxy was configured for (`http` or `https`).
        scheme: &'static str,
        /// The proxy URL as supplied.
        url: String,
        /// Why the URL was refused.
        reason: String,
        /// The reqwest error, when reqwest itself refused the URL.
        #[source]
        source: Option<reqwest::Error>,
    },

    /// A credential or token contains bytes that cannot appear in an HTTP header.
    #[error("value for header '{name}' is not a valid HTTP header value")]
    InvalidHeader {
        /// Name of the header being built.
        name: &'static str,
    },

    /// A devices request was attempted before a bearer token was installed.
    #[error("session is not authenticated; log in before listing devices")]
    NotAuthenticated,

    /// A page size of zero was requested.
    #[error("page size must be greater than zero")]
    InvalidPageSize,
}

impl MvisionError {
    /// Builds an [`MvisionError::Auth`] that wraps an underlying cause.
    pub(crate) fn auth_with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        MvisionError::Auth {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, MvisionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn auth_error_displays_message() {
        let err = MvisionError::Auth {
            message: "token request failed (401 Unauthorized): invalid_client".to_string(),
            source: None,
        };
        let msg = err.to_string();
        assert!(msg.contains("authentication failed"));
        assert!(msg.contains("invalid_client"));
    }

    #[test]
    fn auth_with_source_chains_cause() {
        let json_err = serde_json::from_str::<String>("not-json").unwrap_err();
        let err = MvisionError::auth_with_source("failed to parse token response", json_err);
        assert!(
            err.source().is_some(),
            "Auth error built with a cause should expose it via source()"
        );
    }

    #[test]
    fn api_error_preserves_status_and_body() {
        let err = MvisionError::Api {
            status: StatusCode::FORBIDDEN,
            body: r#"{"errors":[{"detail":"Missing scope epo.device.r"}]}"#.to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("403"), "display should include status code");
        assert!(msg.contains("epo.device.r"), "display should include body");
    }

    #[test]
    fn parse_error_wraps_serde_json() {
        let json_err = serde_json::from_str::<String>("{{bad json}}").unwrap_err();
        let err = MvisionError::from(json_err);
        assert!(err.to_string().contains("failed to parse response"));
        assert!(err.source().is_some());
    }

    #[test]
    fn invalid_proxy_displays_scheme_and_reason() {
        let err = MvisionError::InvalidProxy {
            scheme: "https",
            url: "ftp://proxy.local:21".to_string(),
            reason: "unsupported proxy scheme 'ftp'".to_string(),
            source: None,
        };
        let msg = err.to_string();
        assert!(msg.contains("https"));
        assert!(msg.contains("ftp://proxy.local:21"));
        assert!(msg.contains("unsupported proxy scheme"));
        assert!(err.source().is_none());
    }

    #[test]
    fn invalid_header_names_the_header() {
        let err = MvisionError::InvalidHeader { name: "x-api-key" };
        assert!(err.to_string().contains("x-api-key"));
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MvisionError>();
    }
}
