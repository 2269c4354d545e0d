use crate::error::{AppError, Result};
use crate::fetch::{ServiceRequest, ServiceResponse, Transport};

use super::model::{ExtractionJob, JobStatus};
use super::request::build_payload;
use super::Extractor;

const EXTRACT_PATH: &str = "/RestApi/v1/Extractions/ExtractWithNotes";
const STATUS_HEADER: &str = "Status";
const LOCATION_HEADER: &str = "Location";

/// What the service answered to a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub status: JobStatus,
    pub poll_location: String,
    pub body: Vec<u8>,
}

/// Status and location headers of a job response.
pub(super) struct JobHeaders {
    pub status: JobStatus,
    pub raw_status: String,
    pub location: Option<String>,
}

impl JobHeaders {
    pub(super) fn read(response: &ServiceResponse) -> Result<Self> {
        let raw_status = response.header_str(STATUS_HEADER)?.unwrap_or_default().to_string();
        let location = response
            .header_str(LOCATION_HEADER)?
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        Ok(Self {
            status: JobStatus::from_header(&raw_status),
            raw_status,
            location,
        })
    }

    /// Refuse an HTTP error answer that carries no `Status` header.
    ///
    /// Without the header the answer would read as completed, so it says nothing about
    /// the job and must not be recorded on it.
    pub(super) async fn reject_http_error(
        &self,
        response: ServiceResponse,
    ) -> Result<ServiceResponse> {
        let http_status = response.http_status;
        if http_status.is_success() {
            return Ok(response);
        }
        if !self.raw_status.is_empty() {
            log::warn!(
                "job response carried HTTP {} with Status `{}`",
                http_status,
                self.raw_status
            );
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        log::warn!("job request answered HTTP {} without a job status", http_status);
        Err(AppError::transport(format!("HTTP {http_status}: {body}")))
    }

    /// A completed job must carry its result.
    pub(super) fn check_body(&self, body: &[u8]) -> Result<()> {
        if self.status == JobStatus::Completed && body.is_empty() {
            return Err(AppError::malformed(
                "extraction reported completion with an empty body",
            ));
        }
        Ok(())
    }
}

impl<'a, T> Extractor<'a, T>
where
    T: Transport + ?Sized,
{
    /// Post the job's payload and record the service's first answer on the job.
    pub async fn submit(&self, job: &mut ExtractionJob) -> Result<Submission> {
        if job.status() != JobStatus::Init {
            return Err(AppError::InvalidState(format!(
                "job for {} was already submitted (status {})",
                job.identifier,
                job.status()
            )));
        }

        let url = self.session.endpoint(EXTRACT_PATH);
        let payload = serde_json::to_value(build_payload(job))?;
        log::debug!("extraction request body: {}", payload);

        let request = self.job_request(ServiceRequest::post_json(url.clone(), payload))?;
        let response = self.transport.execute(request).await?;
        let headers = JobHeaders::read(&response)?;
        let response = headers.reject_http_error(response).await?;

        let poll_location = match headers.location.clone() {
            Some(location) => location,
            None if headers.status == JobStatus::InProgress => {
                return Err(AppError::malformed(
                    "in-progress extraction answered without a Location header",
                ));
            }
            // Answered synchronously: nothing to poll, the endpoint itself is the job's location.
            None => url,
        };

        let body = response.bytes().await?;
        log::debug!("extraction response body: {}", String::from_utf8_lossy(&body));
        headers.check_body(&body)?;

        job.record(
            headers.status,
            Some(&poll_location),
            body.clone(),
            &headers.raw_status,
        );
        log::info!(
            "{} extraction for {} submitted: {}",
            job.kind,
            job.identifier,
            job.status()
        );

        Ok(Submission {
            status: headers.status,
            poll_location,
            body,
        })
    }
}
