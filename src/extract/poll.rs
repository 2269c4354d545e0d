use futures::stream::{self, StreamExt};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::PollPolicy;
use crate::error::{AppError, Result};
use crate::fetch::{ServiceRequest, Transport};

use super::model::{ExtractionJob, JobStatus};
use super::submit::JobHeaders;
use super::Extractor;

impl<'a, T> Extractor<'a, T>
where
    T: Transport + ?Sized,
{
    /// Ask the service for the job's current status once.
    ///
    /// Terminal jobs answer from memory. An in-progress answer's body is never read.
    pub async fn poll(&self, job: &mut ExtractionJob) -> Result<JobStatus> {
        match job.status() {
            JobStatus::Init => {
                return Err(AppError::InvalidState(format!(
                    "job for {} has not been submitted",
                    job.identifier
                )));
            }
            status if status.is_terminal() => return Ok(status),
            _ => {}
        }

        let request = self.job_request(ServiceRequest::get(job.poll_location()))?;
        let response = self.transport.execute(request).await?;
        let headers = JobHeaders::read(&response)?;
        log::debug!("poll of {} answered `{}`", job.identifier, headers.raw_status);
        let response = headers.reject_http_error(response).await?;

        let body = match headers.status {
            JobStatus::InProgress => Vec::new(),
            _ => response.bytes().await?,
        };
        headers.check_body(&body)?;
        job.record(headers.status, None, body, &headers.raw_status);

        match job.status() {
            JobStatus::Completed => {
                log::info!("{} extraction for {} completed", job.kind, job.identifier)
            }
            JobStatus::Failed => log::warn!(
                "{} extraction for {} failed with status `{}`",
                job.kind,
                job.identifier,
                headers.raw_status
            ),
            _ => {}
        }

        Ok(job.status())
    }

    /// Submit the job if needed and poll until it reaches a terminal status.
    ///
    /// Completion leaves the result on the job. A failed job is returned as
    /// [`AppError::JobFailed`].
    pub async fn drive(
        &self,
        job: &mut ExtractionJob,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if job.status() == JobStatus::Init {
            if cancel.is_cancelled() {
                return Err(AppError::Cancelled);
            }
            self.submit(job).await?;
        }

        let give_up_at = policy.deadline.map(|deadline| Instant::now() + deadline);
        let mut attempts: u32 = 0;

        while job.status() == JobStatus::InProgress {
            if policy.max_attempts.is_some_and(|max| attempts >= max) {
                log::warn!("giving up on {} after {} polls", job.identifier, attempts);
                return Err(AppError::PollTimeout { attempts });
            }

            // A poll due exactly at the deadline still runs.
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log::info!("polling of {} cancelled", job.identifier);
                    return Err(AppError::Cancelled);
                }
                _ = time::sleep(policy.interval) => {}
                _ = deadline_reached(give_up_at) => {
                    log::warn!("deadline passed for {} after {} polls", job.identifier, attempts);
                    return Err(AppError::PollTimeout { attempts });
                }
            }

            attempts += 1;
            self.poll(job).await?;
        }

        match job.status() {
            JobStatus::Completed => Ok(()),
            JobStatus::Failed => Err(job
                .failure()
                .cloned()
                .map(AppError::from)
                .unwrap_or_else(|| AppError::JobFailed {
                    status: String::new(),
                    body: String::new(),
                })),
            status => Err(AppError::InvalidState(format!(
                "poll loop ended with job in {status}"
            ))),
        }
    }

    /// Drive several jobs with at most `limit` in flight. Results keep the jobs' order.
    pub async fn drive_all(
        &self,
        jobs: &mut [ExtractionJob],
        policy: &PollPolicy,
        cancel: &CancellationToken,
        limit: usize,
    ) -> Vec<Result<()>> {
        stream::iter(jobs.iter_mut())
            .map(|job| self.drive(job, policy, cancel))
            .buffered(limit.max(1))
            .collect()
            .await
    }
}

async fn deadline_reached(at: Option<Instant>) {
    match at {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
