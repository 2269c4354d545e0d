//! Streaming time-series retrieval and the service's date and decimal formats.

use chrono::NaiveDate;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::extract::IdentifierKind;
use crate::fetch::{ServiceRequest, Session, Transport};

pub mod date;
pub mod model;

pub use date::{decode, decode_parts, DecodedDate, ServiceDate};
pub use model::{Series, StreamResponse, StreamResult};

const GET_DATA_PATH: &str = "/DswsClient/V1/DSService.svc/rest/GetData";
const REQUEST_DATE_FORMAT: &str = "%Y-%m-%d";

/// One instrument over a date range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub identifier_kind: IdentifierKind,
    pub identifier: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct StreamPayload<'a> {
    data_request: DataRequest,
    properties: Option<Value>,
    token_value: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DataRequest {
    date: DateRange,
    instrument: Instrument,
    tag: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DateRange {
    start: String,
    end: String,
    frequency: String,
    kind: u8,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Instrument {
    properties: Vec<InstrumentProperty>,
    value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct InstrumentProperty {
    key: &'static str,
    value: bool,
}

impl StreamRequest {
    fn payload<'a>(&self, token: &'a str) -> StreamPayload<'a> {
        StreamPayload {
            data_request: DataRequest {
                date: DateRange {
                    start: self.start_date.format(REQUEST_DATE_FORMAT).to_string(),
                    end: self.end_date.format(REQUEST_DATE_FORMAT).to_string(),
                    frequency: String::new(),
                    kind: 1,
                },
                instrument: Instrument {
                    properties: vec![InstrumentProperty {
                        key: "IsSymbolSet",
                        value: true,
                    }],
                    value: self.identifier_kind.render_stream_identifier(&self.identifier),
                },
                tag: None,
            },
            properties: None,
            token_value: token,
        }
    }
}

/// Fetch one instrument's time series from the streaming service.
pub async fn fetch_stream<T>(
    session: &Session,
    transport: &T,
    request: &StreamRequest,
) -> Result<StreamResponse>
where
    T: Transport + ?Sized,
{
    let url = session.endpoint(GET_DATA_PATH);
    let body = serde_json::to_value(request.payload(session.token()))?;
    log::debug!(
        "stream request for {} from {} to {}",
        request.identifier,
        request.start_date,
        request.end_date
    );

    let outgoing = ServiceRequest::post_json(url, body).header(CONTENT_TYPE, "application/json")?;
    let response = transport.execute(outgoing).await?;
    let http_status = response.http_status;
    let text = response.text().await?;
    log::debug!("stream response ({}): {}", http_status, text);

    if !http_status.is_success() {
        log::warn!("stream request for {} answered HTTP {}", request.identifier, http_status);
    }

    let parsed: StreamResponse = serde_json::from_str(&text)
        .map_err(|err| AppError::malformed(format!("stream response for {}: {err}", request.identifier)))?;
    log::info!(
        "received {} dates for {}",
        parsed.data_response.dates.len(),
        request.identifier
    );
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::scripted::ScriptedTransport;
    use reqwest::StatusCode;
    use serde_json::json;

    fn request(kind: IdentifierKind, identifier: &str) -> StreamRequest {
        StreamRequest {
            start_date: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2018, 1, 4).unwrap(),
            identifier_kind: kind,
            identifier: identifier.to_string(),
        }
    }

    #[test]
    fn payload_matches_service_shape() {
        let value = serde_json::to_value(request(IdentifierKind::Isin, "US4592001014").payload("tok"))
            .unwrap();

        assert_eq!(
            value,
            json!({
                "DataRequest": {
                    "Date": {"Start": "2018-01-01", "End": "2018-01-04", "Frequency": "", "Kind": 1},
                    "Instrument": {
                        "Properties": [{"Key": "IsSymbolSet", "Value": true}],
                        "Value": "US4592001014"
                    },
                    "Tag": null
                },
                "Properties": null,
                "TokenValue": "tok"
            })
        );
    }

    #[test]
    fn ric_identifier_is_bracketed() {
        let value =
            serde_json::to_value(request(IdentifierKind::Ric, "IBM.N").payload("tok")).unwrap();
        assert_eq!(value["DataRequest"]["Instrument"]["Value"], "<IBM.N>");
    }

    #[tokio::test]
    async fn fetches_and_decodes_series() {
        let transport = ScriptedTransport::new().reply_json(
            StatusCode::OK,
            r#"{"DataResponse": {
                "AdditionalResponses": [],
                "DataTypeNames": null,
                "DataTypeValues": [{"DataType": "P", "SymbolValues": [
                    {"Currency": "U$", "Symbol": "<IBM.N>", "Type": 10, "Value": [153.42, "154.770"]}
                ]}],
                "Dates": ["/Date(1514764800000+0000)/", "/Date(1514851200000+0000)/"],
                "SymbolNames": null,
                "Tag": null
            }, "Properties": null}"#,
        );
        let session = Session::new("http://product.datastream.com", "tok");

        let response = fetch_stream(&session, &transport, &request(IdentifierKind::Ric, "IBM.N"))
            .await
            .unwrap();
        let result = response.into_result();

        assert_eq!(result.dates.len(), 2);
        assert_eq!(result.series[0].values[1].to_string(), "154.770");

        let sent = &transport.requests()[0];
        assert_eq!(
            sent.url,
            "http://product.datastream.com/DswsClient/V1/DSService.svc/rest/GetData"
        );
        assert_eq!(sent.headers["content-type"], "application/json");
    }

    #[tokio::test]
    async fn unparseable_body_is_malformed_response() {
        let transport = ScriptedTransport::new().reply_json(StatusCode::OK, "<html>maintenance</html>");
        let session = Session::new("http://product.datastream.com", "tok");

        let err = fetch_stream(&session, &transport, &request(IdentifierKind::Isin, "US4592001014"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::MalformedResponse(_)));
    }
}
