//! Paginated device inventory listing.
//!
//! [`DevicePager`] walks `GET /epo/v2/devices` with `page[offset]` /
//! `page[limit]` query parameters and hands out one device record at a
//! time. Records are opaque JSON objects taken from the top-level `data`
//! array of each page and passed through untouched.
//!
//! ## Stopping
//!
//! The pager is pull-based and finite. Once [`DevicePager::next_device`]
//! returns `None` it stays exhausted, and [`DevicePager::termination`] says
//! why:
//!
//! - [`Termination::EndOfData`]: a page came back shorter than the
//!   requested page size.
//! - [`Termination::LimitReached`]: `limit` records have been handed out.
//! - [`Termination::Failed`]: a page request failed (HTTP status,
//!   transport, or body shape). The error is logged with the request
//!   headers (secrets redacted) and kept here; it is never raised, and
//!   records already handed out stay valid.
//!
//! The offset starts at zero and grows by `page_size` after every full
//! page. It is never reset.

use std::collections::VecDeque;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::error::{MvisionError, Result};
use crate::session::Session;

/// Page size and record limit used when the caller does not pick one.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// A device record exactly as the API returned it.
pub type Device = Map<String, Value>;

/// Envelope of one devices page. Only `data` is read.
#[derive(Debug, Deserialize)]
struct DevicesPage {
    data: Vec<Device>,
}

/// Paging parameters for one listing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    /// Records requested per page (`page[limit]`). Must be non-zero.
    pub page_size: usize,
    /// Maximum number of records handed out over the whole run.
    pub limit: usize,
}

impl Default for ListOptions {
    fn default() -> Self {
        ListOptions {
            page_size: DEFAULT_PAGE_SIZE,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Position of the next page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    offset: usize,
    page_size: usize,
}

impl PageCursor {
    /// Cursor at offset zero.
    pub fn new(page_size: usize) -> Self {
        PageCursor {
            offset: 0,
            page_size,
        }
    }

    /// Offset the next request will ask for.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Records requested per page.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Moves to the following page.
    pub fn advance(&mut self) {
        self.offset += self.page_size;
    }

    /// Query parameters for the page at this position.
    pub fn query(&self) -> [(&'static str, usize); 2] {
        [
            ("page[offset]", self.offset),
            ("page[limit]", self.page_size),
        ]
    }
}

/// Why a pager stopped yielding records.
#[derive(Debug)]
pub enum Termination {
    /// The last page was shorter than the page size.
    EndOfData,
    /// The configured record limit was reached.
    LimitReached,
    /// A page request failed; earlier records remain valid.
    Failed(MvisionError),
}

impl Termination {
    /// Returns `true` for [`Termination::Failed`].
    pub fn is_failure(&self) -> bool {
        matches!(self, Termination::Failed(_))
    }
}

/// Lazy, non-restartable sequence of device records.
#[derive(Debug)]
pub struct DevicePager {
    session: Session,
    cursor: PageCursor,
    limit: usize,
    emitted: usize,
    pages_fetched: usize,
    buffer: VecDeque<Device>,
    last_page_short: bool,
    termination: Option<Termination>,
}

impl DevicePager {
    /// Wraps an authenticated session. No request is sent until the first
    /// call to [`next_device`](Self::next_device).
    ///
    /// # Errors
    ///
    /// - `MvisionError::NotAuthenticated`: the session has no Authorization header.
    /// - `MvisionError::InvalidPageSize`: `options.page_size` is zero.
    pub fn new(session: Session, options: ListOptions) -> Result<Self> {
        if !session.is_authenticated() {
            return Err(MvisionError::NotAuthenticated);
        }
        if options.page_size == 0 {
            return Err(MvisionError::InvalidPageSize);
        }

        Ok(DevicePager {
            session,
            cursor: PageCursor::new(options.page_size),
            limit: options.limit,
            emitted: 0,
            pages_fetched: 0,
            buffer: VecDeque::new(),
            last_page_short: false,
            termination: None,
        })
    }

    /// Returns the next device, fetching another page when the current one
    /// is used up. Returns `None` once the pager has terminated.
    pub async fn next_device(&mut self) -> Option<Device> {
        loop {
            if self.termination.is_some() {
                return None;
            }

            if self.emitted >= self.limit {
                let reason = if self.buffer.is_empty() && self.last_page_short {
                    Termination::EndOfData
                } else {
                    Termination::LimitReached
                };
                self.finish(reason);
                return None;
            }

            if let Some(device) = self.buffer.pop_front() {
                self.emitted += 1;
                return Some(device);
            }

            if self.last_page_short {
                self.finish(Termination::EndOfData);
                return None;
            }

            match self.fetch_page().await {
                Ok(devices) => {
                    if devices.len() < self.cursor.page_size() {
                        self.last_page_short = true;
                    } else {
                        self.cursor.advance();
                    }
                    self.buffer.extend(devices);
                }
                Err(err) => {
                    self.log_failure(&err);
                    self.finish(Termination::Failed(err));
                    return None;
                }
            }
        }
    }

    /// Drains the pager, returning every record and the terminal state.
    pub async fn collect_all(mut self) -> (Vec<Device>, Termination) {
        let mut devices = Vec::new();
        while let Some(device) = self.next_device().await {
            devices.push(device);
        }
        let termination = self.termination.unwrap_or(Termination::EndOfData);
        (devices, termination)
    }

    /// Why the pager stopped, or `None` while it can still yield.
    pub fn termination(&self) -> Option<&Termination> {
        self.termination.as_ref()
    }

    /// Position of the next page request.
    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }

    /// Records handed out so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Page requests that completed successfully.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// The authenticated session the pager sends requests through.
    pub fn session(&self) -> &Session {
        &self.session
    }

    async fn fetch_page(&mut self) -> Result<Vec<Device>> {
        let url = &self.session.endpoints().devices_url;
        let page: DevicesPage = self.session.get_json(url, &self.cursor.query()).await?;
        self.pages_fetched += 1;
        debug!(
            offset = self.cursor.offset(),
            page_size = self.cursor.page_size(),
            records = page.data.len(),
            "fetched device page"
        );
        Ok(page.data)
    }

    fn log_failure(&self, err: &MvisionError) {
        match err {
            MvisionError::Api { .. } => error!(
                error = %err,
                offset = self.cursor.offset(),
                request_headers = %self.session.redacted_headers(),
                "device page request failed"
            ),
            _ => error!(
                error = %err,
                offset = self.cursor.offset(),
                "device listing stopped"
            ),
        }
    }

    fn finish(&mut self, reason: Termination) {
        if self.termination.is_none() {
            debug!(
                emitted = self.emitted,
                pages = self.pages_fetched,
                reason = ?reason,
                "device listing finished"
            );
            self.termination = Some(reason);
        }
    }
}
