//! Async Rust client for listing managed devices from the Trellix MVISION
//! ePO cloud API.
//!
//! A run authenticates once with OAuth2 client credentials, then pages
//! through the device inventory until the data runs out, a record limit is
//! reached, or a page request fails.
//!
//! # Modules
//!
//! - [`auth`]: client-credentials login that installs the Authorization header.
//! - [`devices`]: the offset/limit pager and its terminal states.
//! - [`error`]: typed error hierarchy (`MvisionError`).
//! - [`logging`]: explicit `tracing-subscriber` setup for binaries.
//! - [`proxy`]: per-scheme proxy settings.
//! - [`query`]: session + login + pager in one call.
//! - [`session`]: HTTP client, base headers and endpoint URLs.
//!
//! # Quick Start
//!
//! ```ignore
//! use mvision_devices::auth::Credentials;
//! use mvision_devices::devices::ListOptions;
//! use mvision_devices::query::{QueryOptions, query_devices};
//!
//! let creds = Credentials::new("client-id", "client-secret", "api-key");
//! let mut pager = query_devices(QueryOptions::new(creds, ListOptions::default())).await?;
//! while let Some(device) = pager.next_device().await {
//!     println!("{}", serde_json::to_string_pretty(&device)?);
//! }
//! ```

#![warn(missing_docs)]

pub mod auth;
pub mod devices;
pub mod error;
pub mod logging;
pub mod proxy;
pub mod query;
pub mod session;
