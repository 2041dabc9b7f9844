//! Proxy settings for outbound requests.
//!
//! The CLI accepts proxies as a JSON object mapping a URL scheme to a proxy
//! URL, e.g. `{"http": "http://proxy:3128", "https": "http://proxy:3128"}`.
//! Both keys are optional; unknown keys are ignored. The settings apply to
//! every request the session sends, token request included.

use reqwest::{ClientBuilder, Proxy};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{MvisionError, Result};

/// Scheme-to-proxy mapping applied to the session's HTTP client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProxyConfig {
    /// Proxy used for `http://` targets.
    #[serde(default)]
    pub http: Option<String>,
    /// Proxy used for `https://` targets.
    #[serde(default)]
    pub https: Option<String>,
}

impl ProxyConfig {
    /// Parses the JSON object form accepted by `--proxies`.
    ///
    /// Only a JSON object is accepted; arrays and scalars are errors even
    /// though serde would otherwise fill the fields by position.
    pub fn from_json(raw: &str) -> std::result::Result<Self, serde_json::Error> {
        let object: Map<String, Value> = serde_json::from_str(raw)?;
        serde_json::from_value(Value::Object(object))
    }

    /// Returns `true` when neither scheme has a proxy configured.
    pub fn is_empty(&self) -> bool {
        self.http.is_none() && self.https.is_none()
    }

    /// Registers the configured proxies on a client builder.
    ///
    /// # Errors
    ///
    /// - `MvisionError::InvalidProxy`: a proxy URL uses a scheme other than
    ///   `http`, `https`, `socks5` or `socks5h`, or reqwest could not parse it.
    pub fn apply(&self, mut builder: ClientBuilder) -> Result<ClientBuilder> {
        if let Some(url) = &self.http {
            check_scheme("http", url)?;
            let proxy = Proxy::http(url).map_err(|e| rejected("http", url, e))?;
            builder = builder.proxy(proxy);
        }
        if let Some(url) = &self.https {
            check_scheme("https", url)?;
            let proxy = Proxy::https(url).map_err(|e| rejected("https", url, e))?;
            builder = builder.proxy(proxy);
        }
        Ok(builder)
    }
}

/// Proxy URL schemes reqwest can route through. A URL without a scheme is
/// treated as `http` by reqwest and is allowed.
const SUPPORTED_SCHEMES: [&str; 4] = ["http", "https", "socks5", "socks5h"];

fn check_scheme(target: &'static str, url: &str) -> Result<()> {
    let Some((scheme, _)) = url.split_once("://") else {
        return Ok(());
    };
    if SUPPORTED_SCHEMES
        .iter()
        .any(|supported| supported.eq_ignore_ascii_case(scheme))
    {
        return Ok(());
    }
    Err(MvisionError::InvalidProxy {
        scheme: target,
        url: url.to_string(),
        reason: format!("unsupported proxy scheme '{scheme}'"),
        source: None,
    })
}

fn rejected(target: &'static str, url: &str, source: reqwest::Error) -> MvisionError {
    MvisionError::InvalidProxy {
        scheme: target,
        url: url.to_string(),
        reason: source.to_string(),
        source: Some(source),
    }
}
