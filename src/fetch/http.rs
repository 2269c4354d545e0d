use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::config::ServiceConfig;
use crate::error::{AppError, Context, Result};

use super::{ServiceRequest, ServiceResponse, Transport};

/// [`Transport`] backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to construct HTTP client")?;
        Ok(Self { client })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        Self::new(config.request_timeout())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ServiceRequest) -> Result<ServiceResponse> {
        let url = Url::parse(&request.url)
            .map_err(|err| AppError::malformed(format!("invalid URL `{}`: {}", request.url, err)))?;

        log::debug!("{} {}", request.method, url);

        let mut builder = self
            .client
            .request(request.method, url)
            .headers(request.headers);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        if let Some(body) = request.body {
            // Bodies may carry credentials or tokens; callers log what is safe to log.
            builder = builder.body(serde_json::to_vec(&body)?);
        }

        let response = builder.send().await?;

        log::debug!("response status: {}", response.status());
        log::debug!("response headers: {:?}", response.headers());

        Ok(ServiceResponse::live(response))
    }
}
