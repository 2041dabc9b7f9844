//! Session context shared by the login and device-listing steps.
//!
//! `Session` owns the `reqwest::Client` (with proxy settings applied), the
//! base headers every ePO request carries, and the `Authorization` value
//! installed after a successful login. A session belongs to exactly one run
//! and is moved into the [`DevicePager`](crate::devices::DevicePager) once
//! authenticated, so no two runs ever share one.
//!
//! Base headers:
//! - `Accept: application/vnd.api+json`
//! - `Content-Type: application/vnd.api+json`
//! - `x-api-key: <api key>`
//!
//! Endpoint URLs live in [`Endpoints`] rather than being hard-coded at the
//! call sites so tests can point a session at a local mock server.

use std::fmt;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{MvisionError, Result};
use crate::proxy::ProxyConfig;

/// Trellix IAM token endpoint.
pub const TOKEN_URL: &str = "https://iam.cloud.trellix.com/iam/v1.1/token";

/// ePO device inventory endpoint.
pub const DEVICES_URL: &str = "https://api.manage.trellix.com/epo/v2/devices";

/// JSON:API media type used for both `Accept` and `Content-Type`.
pub const JSON_API_MEDIA_TYPE: &str = "application/vnd.api+json";

const API_KEY_HEADER: &str = "x-api-key";

/// The two URLs a run talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// OAuth2 token endpoint (client-credentials grant).
    pub token_url: String,
    /// Device listing endpoint (offset/limit paginated).
    pub devices_url: String,
}

impl Endpoints {
    /// Endpoints at arbitrary URLs, e.g. a wiremock server in tests.
    pub fn new(token_url: impl Into<String>, devices_url: impl Into<String>) -> Self {
        Endpoints {
            token_url: token_url.into(),
            devices_url: devices_url.into(),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints::new(TOKEN_URL, DEVICES_URL)
    }
}

/// Process-scoped request context: HTTP client, base headers and bearer token.
pub struct Session {
    client: Client,
    endpoints: Endpoints,
    headers: HeaderMap,
}

impl Session {
    /// Creates a session against the production endpoints.
    ///
    /// # Errors
    ///
    /// - `MvisionError::InvalidHeader`: the API key is not a valid header value.
    /// - `MvisionError::InvalidProxy`: a proxy URL was rejected.
    /// - `MvisionError::Network`: the HTTP client could not be built.
    pub fn new(api_key: &str, proxies: Option<&ProxyConfig>) -> Result<Self> {
        Session::with_endpoints(api_key, proxies, Endpoints::default())
    }

    /// Creates a session against custom endpoints.
    pub fn with_endpoints(
        api_key: &str,
        proxies: Option<&ProxyConfig>,
        endpoints: Endpoints,
    ) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(proxies) = proxies {
            builder = proxies.apply(builder)?;
        }
        let client = builder.build()?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_API_MEDIA_TYPE));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_API_MEDIA_TYPE));
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|_| MvisionError::InvalidHeader { name: "x-api-key" })?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);

        Ok(Session {
            client,
            endpoints,
            headers,
        })
    }

    /// The endpoints this session sends requests to.
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Headers attached to every request (base headers plus Authorization once set).
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The installed `Authorization` value, if login has happened.
    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
    }

    /// Returns `true` once an `Authorization` header has been installed.
    pub fn is_authenticated(&self) -> bool {
        self.headers.contains_key(AUTHORIZATION)
    }

    /// Installs the `Authorization` header used by every subsequent request.
    ///
    /// # Errors
    ///
    /// - `MvisionError::InvalidHeader`: `value` contains bytes not allowed in a header.
    pub fn set_authorization(&mut self, value: &str) -> Result<()> {
        let mut header = HeaderValue::from_str(value)
            .map_err(|_| MvisionError::InvalidHeader { name: "authorization" })?;
        header.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, header);
        Ok(())
    }

    /// Renders the session headers for diagnostics with secrets replaced.
    pub fn redacted_headers(&self) -> String {
        let rendered: Vec<String> = self
            .headers
            .iter()
            .map(|(name, value)| {
                let shown = if is_sensitive(name) {
                    "<redacted>"
                } else {
                    value.to_str().unwrap_or("<binary>")
                };
                format!("{name}: {shown}")
            })
            .collect();
        format!("{{{}}}", rendered.join(", "))
    }

    /// Builds a request carrying the session headers.
    pub(crate) fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url).headers(self.headers.clone())
    }

    /// Builds a request carrying the session headers minus `Content-Type`,
    /// for bodies that set their own media type (e.g. form posts).
    pub(crate) fn request_without_content_type(&self, method: Method, url: &str) -> RequestBuilder {
        let mut headers = self.headers.clone();
        headers.remove(CONTENT_TYPE);
        self.client.request(method, url).headers(headers)
    }

    /// Sends an authenticated GET with query parameters and deserializes
    /// the JSON response.
    ///
    /// The body is read as text before the status check so a non-success
    /// response keeps its diagnostic payload in `MvisionError::Api`.
    ///
    /// # Errors
    ///
    /// - `MvisionError::NotAuthenticated`: no Authorization header installed.
    /// - `MvisionError::Api`: non-success HTTP status.
    /// - `MvisionError::Network`: transport failure.
    /// - `MvisionError::Parse`: response body did not match `T`.
    pub async fn get_json<T, Q>(&self, url: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        if !self.is_authenticated() {
            return Err(MvisionError::NotAuthenticated);
        }

        let response = self.request(Method::GET, url).query(query).send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(%url, %status, bytes = body.len(), "GET completed");

        if !status.is_success() {
            return Err(MvisionError::Api { status, body });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Authorization and the API key never appear in logs.
fn is_sensitive(name: &HeaderName) -> bool {
    *name == AUTHORIZATION || name.as_str() == API_KEY_HEADER
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("endpoints", &self.endpoints)
            .field("headers", &self.redacted_headers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new("key-123", None).unwrap()
    }

    #[test]
    fn base_headers_are_installed() {
        let s = session();
        assert_eq!(s.headers().get(ACCEPT).unwrap(), JSON_API_MEDIA_TYPE);
        assert_eq!(s.headers().get(CONTENT_TYPE).unwrap(), JSON_API_MEDIA_TYPE);
        assert_eq!(s.headers().get("x-api-key").unwrap(), "key-123");
    }

    #[test]
    fn new_session_is_not_authenticated() {
        let s = session();
        assert!(!s.is_authenticated());
        assert!(s.authorization().is_none());
    }

    #[test]
    fn set_authorization_installs_header() {
        let mut s = session();
        s.set_authorization("abc.def Bearer").unwrap();
        assert!(s.is_authenticated());
        assert_eq!(s.authorization(), Some("abc.def Bearer"));
    }

    #[test]
    fn set_authorization_rejects_control_characters() {
        let mut s = session();
        let err = s.set_authorization("bad\ntoken").unwrap_err();
        assert!(matches!(err, MvisionError::InvalidHeader { name: "authorization" }));
        assert!(!s.is_authenticated());
    }

    #[test]
    fn api_key_with_newline_is_rejected() {
        let err = Session::new("key\n", None).unwrap_err();
        assert!(matches!(err, MvisionError::InvalidHeader { name: "x-api-key" }));
    }

    #[test]
    fn redacted_headers_hide_secrets() {
        let mut s = session();
        s.set_authorization("secret-token Bearer").unwrap();
        let rendered = s.redacted_headers();
        assert!(!rendered.contains("secret-token"), "got: {rendered}");
        assert!(!rendered.contains("key-123"), "got: {rendered}");
        assert!(rendered.contains(JSON_API_MEDIA_TYPE));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn debug_output_does_not_leak_api_key() {
        let s = session();
        let debug = format!("{s:?}");
        assert!(!debug.contains("key-123"), "got: {debug}");
    }

    #[test]
    fn default_endpoints_point_at_trellix() {
        let endpoints = Endpoints::default();
        assert_eq!(endpoints.token_url, TOKEN_URL);
        assert_eq!(endpoints.devices_url, DEVICES_URL);
    }

    #[test]
    fn session_accepts_proxy_settings() {
        let proxies = ProxyConfig {
            http: Some("http://proxy.local:3128".to_string()),
            https: None,
        };
        assert!(Session::new("key", Some(&proxies)).is_ok());
    }

    #[tokio::test]
    async fn get_json_requires_authentication() {
        let s = session();
        let result: Result<serde_json::Value> =
            s.get_json("http://127.0.0.1:9/devices", &[("a", "b")]).await;
        assert!(matches!(result, Err(MvisionError::NotAuthenticated)));
    }
}
