use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Extraction template requested from the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtractionKind {
    Composite,
    TechnicalIndicators,
    TimeSeries,
    IntradayPricing,
}

impl ExtractionKind {
    pub const ALL: [ExtractionKind; 4] = [
        ExtractionKind::Composite,
        ExtractionKind::TechnicalIndicators,
        ExtractionKind::TimeSeries,
        ExtractionKind::IntradayPricing,
    ];

    /// Name the service uses as the prefix of the request's `@odata.type`.
    pub fn as_str(self) -> &'static str {
        match self {
            ExtractionKind::Composite => "Composite",
            ExtractionKind::TechnicalIndicators => "TechnicalIndicators",
            ExtractionKind::TimeSeries => "TimeSeries",
            ExtractionKind::IntradayPricing => "IntradayPricing",
        }
    }
}

impl fmt::Display for ExtractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractionKind {
    type Err = AppError;

    /// Accepts the service name (`TimeSeries`) or a kebab/snake spelling (`time-series`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        ExtractionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().to_ascii_lowercase() == wanted)
            .ok_or_else(|| AppError::message(format!("unknown extraction kind `{s}`")))
    }
}

/// How an instrument is named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IdentifierKind {
    Ric,
    #[default]
    Isin,
}

impl IdentifierKind {
    /// Discriminator carried in the extraction payload's `IdentifierType`.
    pub fn wire_name(self) -> &'static str {
        match self {
            IdentifierKind::Ric => "Ric",
            IdentifierKind::Isin => "Isin",
        }
    }

    /// Render an identifier for the streaming payload, where RICs travel as `<SYMBOL>`.
    pub fn render_stream_identifier(self, identifier: &str) -> String {
        match self {
            IdentifierKind::Ric => format!("<{identifier}>"),
            IdentifierKind::Isin => identifier.to_string(),
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for IdentifierKind {
    type Err = Infallible;

    /// Unrecognized labels fall back to ISIN, which callers use as the default kind.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("ric") {
            Ok(IdentifierKind::Ric)
        } else {
            if !s.trim().eq_ignore_ascii_case("isin") {
                log::debug!("unrecognized identifier kind `{}`, using Isin", s);
            }
            Ok(IdentifierKind::Isin)
        }
    }
}

/// Lifecycle of an extraction job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum JobStatus {
    #[default]
    Init,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    /// Map the service's `Status` header to a job status.
    ///
    /// An empty or absent header means the job finished: the service only sends the
    /// header while work is pending or after something went wrong.
    pub fn from_header(value: &str) -> Self {
        match value {
            "" => JobStatus::Completed,
            "InProgress" => JobStatus::InProgress,
            _ => JobStatus::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStatus::Init => "Init",
            JobStatus::InProgress => "InProgress",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
        };
        f.write_str(label)
    }
}

/// What the service said when it reported a job as failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub status: String,
    pub body: String,
}

impl From<JobFailure> for AppError {
    fn from(failure: JobFailure) -> Self {
        AppError::JobFailed {
            status: failure.status,
            body: failure.body,
        }
    }
}

/// One extraction request and everything learned about it so far.
///
/// Lifecycle fields are private: only submission and polling move them, so the job
/// can never carry a poll location without having been submitted, or a result
/// without having completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionJob {
    pub kind: ExtractionKind,
    pub fields: Vec<String>,
    pub identifier_kind: IdentifierKind,
    pub identifier: String,
    pub condition: Option<BTreeMap<String, String>>,
    status: JobStatus,
    poll_location: String,
    result: Vec<u8>,
    failure: Option<JobFailure>,
}

impl ExtractionJob {
    pub fn new<I, S>(
        kind: ExtractionKind,
        fields: I,
        identifier_kind: IdentifierKind,
        identifier: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            fields: fields.into_iter().map(Into::into).collect(),
            identifier_kind,
            identifier: identifier.into(),
            condition: None,
            status: JobStatus::Init,
            poll_location: String::new(),
            result: Vec::new(),
            failure: None,
        }
    }

    pub fn with_condition<I, K, V>(mut self, condition: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.condition = Some(
            condition
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        );
        self
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn poll_location(&self) -> &str {
        &self.poll_location
    }

    pub fn result(&self) -> &[u8] {
        &self.result
    }

    pub fn result_text(&self) -> String {
        String::from_utf8_lossy(&self.result).into_owned()
    }

    pub fn failure(&self) -> Option<&JobFailure> {
        self.failure.as_ref()
    }

    pub fn into_result(self) -> Vec<u8> {
        self.result
    }

    /// Record the answer to a submission or poll.
    ///
    /// A terminal job ignores further answers.
    pub(crate) fn record(
        &mut self,
        status: JobStatus,
        location: Option<&str>,
        body: Vec<u8>,
        raw_status: &str,
    ) {
        if self.status.is_terminal() {
            return;
        }

        if let Some(location) = location {
            self.poll_location = location.to_string();
        }
        self.status = status;

        match status {
            JobStatus::Completed => self.result = body,
            JobStatus::Failed => {
                self.failure = Some(JobFailure {
                    status: raw_status.to_string(),
                    body: String::from_utf8_lossy(&body).into_owned(),
                })
            }
            JobStatus::Init | JobStatus::InProgress => {}
        }
    }
}
