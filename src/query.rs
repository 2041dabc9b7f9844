//! End-to-end device query: build a session, log in, hand back the pager.
//!
//! Errors here are fatal and returned to the caller (after being logged).
//! Failures while paging are handled by the pager itself, which stops and
//! records the cause instead of raising it.

use tracing::error;

use crate::auth::{Credentials, login};
use crate::devices::{DevicePager, ListOptions};
use crate::error::{MvisionError, Result};
use crate::proxy::ProxyConfig;
use crate::session::{Endpoints, Session};

/// Everything a device query needs.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// IAM client credentials and ePO API key.
    pub credentials: Credentials,
    /// Page size and record limit.
    pub list: ListOptions,
    /// Optional per-scheme proxies for all outbound requests.
    pub proxies: Option<ProxyConfig>,
    /// Token and devices URLs.
    pub endpoints: Endpoints,
}

impl QueryOptions {
    /// Options against the production endpoints with no proxy.
    pub fn new(credentials: Credentials, list: ListOptions) -> Self {
        QueryOptions {
            credentials,
            list,
            proxies: None,
            endpoints: Endpoints::default(),
        }
    }

    /// Routes requests through the given proxies.
    pub fn with_proxies(mut self, proxies: Option<ProxyConfig>) -> Self {
        self.proxies = proxies;
        self
    }

    /// Sends requests to custom endpoints.
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }
}

/// Authenticates and returns a pager over the device inventory.
///
/// # Errors
///
/// - `MvisionError::Auth`: login failed; no device request was sent.
/// - `MvisionError::InvalidProxy` / `InvalidHeader`: the session could
///   not be built from the supplied settings.
/// - `MvisionError::InvalidPageSize`: `list.page_size` is zero.
pub async fn query_devices(options: QueryOptions) -> Result<DevicePager> {
    let QueryOptions {
        credentials,
        list,
        proxies,
        endpoints,
    } = options;

    let mut session = Session::with_endpoints(credentials.api_key(), proxies.as_ref(), endpoints)
        .inspect_err(|e| error!(error = %e, "could not set up session"))?;

    login(&mut session, &credentials)
        .await
        .inspect_err(log_login_failure)?;

    DevicePager::new(session, list).inspect_err(|e| error!(error = %e, "device retrieval failed"))
}

fn log_login_failure(err: &MvisionError) {
    match err {
        MvisionError::Auth { source: None, .. } => {
            error!(error = %err, "HTTP error during logon")
        }
        _ => error!(error = %err, "unexpected error during logon"),
    }
}
