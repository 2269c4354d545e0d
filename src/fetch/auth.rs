use std::fmt::{self, Debug};

use reqwest::header::{HeaderName, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;

use crate::config::ServiceConfig;
use crate::error::{AppError, Context, Result};
use crate::stream::date;

use super::{join_url, ServiceRequest, Session, Transport};

const REQUEST_TOKEN_PATH: &str = "/RestApi/v1/Authentication/RequestToken";
const STREAM_TOKEN_PATH: &str = "/DSWSClient/V1/DSService.svc/rest/Token";

pub const DSS_USERNAME_ENV: &str = "DSS_USERNAME";
pub const DSS_PASSWORD_ENV: &str = "DSS_PASSWORD";
pub const STREAM_USERNAME_ENV: &str = "DATA_STREAM_USERNAME";
pub const STREAM_PASSWORD_ENV: &str = "DATA_STREAM_PASSWORD";

pub(crate) const ODATA_JSON: &str = "application/json; odata=minimalmetadata";

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Read a credential pair from the named environment variables.
    pub fn from_env(username_var: &str, password_var: &str) -> Result<Self> {
        let username = std::env::var(username_var)
            .with_context(|| format!("Missing {} env var", username_var))?;
        let password = std::env::var(password_var)
            .with_context(|| format!("Missing {} env var", password_var))?;
        Ok(Self::new(username, password))
    }

    pub fn extraction_from_env() -> Result<Self> {
        Self::from_env(DSS_USERNAME_ENV, DSS_PASSWORD_ENV)
    }

    pub fn stream_from_env() -> Result<Self> {
        Self::from_env(STREAM_USERNAME_ENV, STREAM_PASSWORD_ENV)
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct RequestTokenResponse {
    #[serde(rename = "value")]
    token: String,
}

#[derive(Debug, Deserialize)]
struct StreamTokenResponse {
    #[serde(rename = "TokenValue")]
    token_value: String,
    #[serde(rename = "TokenExpiry")]
    token_expiry: Option<String>,
}

/// Exchange credentials for an extraction-service token.
pub async fn request_extraction_session<T>(
    transport: &T,
    config: &ServiceConfig,
    credentials: &Credentials,
) -> Result<Session>
where
    T: Transport + ?Sized,
{
    let url = join_url(&config.extraction_base_uri, REQUEST_TOKEN_PATH);
    log::debug!("requesting extraction token for {}", credentials.username);

    let body = json!({
        "Credentials": {
            "Username": credentials.username,
            "Password": credentials.password,
        }
    });
    let request = ServiceRequest::post_json(url, body)
        .header(HeaderName::from_static("prefer"), "respond-async")?
        .header(CONTENT_TYPE, ODATA_JSON)?;

    let response = transport.execute(request).await?;
    let http_status = response.http_status;
    let text = response.text().await?;

    if !http_status.is_success() {
        return Err(AppError::message(format!(
            "extraction token request rejected with HTTP {}: {}",
            http_status, text
        )));
    }

    let parsed: RequestTokenResponse = serde_json::from_str(&text)
        .map_err(|err| AppError::malformed(format!("token response: {err}")))?;

    log::info!("extraction token acquired");
    Ok(Session::new(config.extraction_base_uri.clone(), parsed.token))
}

/// Exchange credentials for a streaming-service token.
pub async fn request_stream_session<T>(
    transport: &T,
    config: &ServiceConfig,
    credentials: &Credentials,
) -> Result<Session>
where
    T: Transport + ?Sized,
{
    let url = join_url(&config.stream_base_uri, STREAM_TOKEN_PATH);
    log::debug!("requesting stream token for {}", credentials.username);

    let request = ServiceRequest::get(url)
        .query("UserName", &credentials.username)
        .query("Password", &credentials.password)
        .header(CONTENT_TYPE, ODATA_JSON)?
        .header(HeaderName::from_static("prefer"), "respond-async")?;

    let response = transport.execute(request).await?;
    let http_status = response.http_status;
    let text = response.text().await?;

    if !http_status.is_success() {
        return Err(AppError::message(format!(
            "stream token request rejected with HTTP {}: {}",
            http_status, text
        )));
    }

    let parsed: StreamTokenResponse = serde_json::from_str(&text)
        .map_err(|err| AppError::malformed(format!("stream token response: {err}")))?;

    let mut session = Session::new(config.stream_base_uri.clone(), parsed.token_value);
    if let Some(raw) = parsed.token_expiry.as_deref() {
        match date::decode(raw) {
            Ok(expiry) => session = session.with_expiry(expiry),
            Err(err) => log::warn!("ignoring stream token expiry: {}", err),
        }
    }

    log::info!("stream token acquired");
    Ok(session)
}
