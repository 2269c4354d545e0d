//! Extraction-job lifecycle: typed request model, payload rendering, submission and
//! polling until the service reports a terminal status.

use reqwest::header::{HeaderName, AUTHORIZATION, CONTENT_TYPE};

use crate::error::Result;
use crate::fetch::auth::ODATA_JSON;
use crate::fetch::{ServiceRequest, Session, Transport};

pub mod model;
pub mod poll;
pub mod request;
pub mod submit;

pub use model::{ExtractionJob, ExtractionKind, IdentifierKind, JobFailure, JobStatus};
pub use request::{build_payload, ExtractionPayload};
pub use submit::Submission;

/// Seconds the service may hold a submission open before answering asynchronously.
pub const DEFAULT_PREFER_WAIT_SECS: u64 = 5;

/// Fields requested by a composite extraction when the caller names none.
pub const DEFAULT_COMPOSITE_FIELDS: [&str; 9] = [
    "Close Price",
    "Contributor Code Description",
    "Currency Code Description",
    "Dividend Yield",
    "Main Index",
    "Market Capitalization",
    "Market Capitalization - Local Currency",
    "Percent Change - Close Price - 1 Day",
    "Universal Close Price Date",
];

/// Borrowed session and transport used to drive extraction jobs.
///
/// Holds no job state, so one extractor can drive any number of jobs concurrently.
pub struct Extractor<'a, T: ?Sized> {
    session: &'a Session,
    transport: &'a T,
    prefer_wait_secs: u64,
}

impl<'a, T> Extractor<'a, T>
where
    T: Transport + ?Sized,
{
    pub fn new(session: &'a Session, transport: &'a T) -> Self {
        Self {
            session,
            transport,
            prefer_wait_secs: DEFAULT_PREFER_WAIT_SECS,
        }
    }

    pub fn with_prefer_wait(mut self, secs: u64) -> Self {
        self.prefer_wait_secs = secs;
        self
    }

    /// Attach the headers every job request carries.
    fn job_request(&self, request: ServiceRequest) -> Result<ServiceRequest> {
        request
            .header(
                HeaderName::from_static("prefer"),
                &format!("respond-async; wait={}", self.prefer_wait_secs),
            )?
            .header(CONTENT_TYPE, ODATA_JSON)?
            .header(AUTHORIZATION, &format!("Token {}", self.session.token()))
    }
}
