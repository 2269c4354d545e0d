use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;

use crate::error::{AppError, Result};

use super::{ServiceRequest, ServiceResponse, Transport};

/// Replays queued answers in order and records every request it receives.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<ServiceResponse>>>,
    requests: Mutex<Vec<ServiceRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue a job-style answer carrying optional `Status` and `Location` headers.
    pub(crate) fn reply(self, status: Option<&str>, location: Option<&str>, body: &str) -> Self {
        let http_status = match status {
            Some(_) => StatusCode::ACCEPTED,
            None => StatusCode::OK,
        };
        self.reply_with(http_status, status, location, body)
    }

    pub(crate) fn reply_with(
        self,
        http_status: StatusCode,
        status: Option<&str>,
        location: Option<&str>,
        body: &str,
    ) -> Self {
        let mut headers = HeaderMap::new();
        if let Some(status) = status {
            headers.insert(
                HeaderName::from_static("status"),
                HeaderValue::from_str(status).unwrap(),
            );
        }
        if let Some(location) = location {
            headers.insert(
                reqwest::header::LOCATION,
                HeaderValue::from_str(location).unwrap(),
            );
        }
        self.push(Ok(ServiceResponse::buffered(http_status, headers, body)))
    }

    pub(crate) fn reply_json(self, http_status: StatusCode, body: &str) -> Self {
        self.push(Ok(ServiceResponse::buffered(
            http_status,
            HeaderMap::new(),
            body,
        )))
    }

    pub(crate) fn fail(self, message: &str) -> Self {
        self.push(Err(AppError::transport(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            message.to_string(),
        ))))
    }

    fn push(self, reply: Result<ServiceResponse>) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub(crate) fn requests(&self) -> Vec<ServiceRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: ServiceRequest) -> Result<ServiceResponse> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::transport("no scripted reply left")))
    }
}
