use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::date::ServiceDate;

/// Answer of the streaming `GetData` endpoint, field for field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StreamResponse {
    pub data_response: DataResponse,
    #[serde(default)]
    pub properties: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataResponse {
    #[serde(default)]
    pub additional_responses: Vec<AdditionalResponse>,
    #[serde(default)]
    pub data_type_names: Option<Value>,
    #[serde(default)]
    pub data_type_values: Vec<DataTypeValue>,
    #[serde(default)]
    pub dates: Vec<ServiceDate>,
    #[serde(default)]
    pub symbol_names: Option<Value>,
    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AdditionalResponse {
    pub key: String,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataTypeValue {
    pub data_type: String,
    #[serde(default)]
    pub symbol_values: Vec<SymbolValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SymbolValue {
    #[serde(default)]
    pub currency: Option<String>,
    pub symbol: String,
    #[serde(rename = "Type")]
    pub value_type: i32,
    /// Exact decimals, accepted as JSON numbers or strings.
    #[serde(default)]
    pub value: Vec<Decimal>,
}

/// Flattened streaming result: one time axis and the series sampled on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamResult {
    pub dates: Vec<DateTime<Utc>>,
    pub series: Vec<Series>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Series {
    pub data_type: String,
    pub symbol: String,
    pub currency: String,
    pub value_type: i32,
    pub values: Vec<Decimal>,
}

impl StreamResult {
    /// Pair every value with the date it was sampled on. Dates and values beyond the
    /// shorter of the two are dropped.
    pub fn rows(&self) -> impl Iterator<Item = (&Series, DateTime<Utc>, Decimal)> + '_ {
        self.series.iter().flat_map(move |series| {
            self.dates
                .iter()
                .zip(series.values.iter())
                .map(move |(date, value)| (series, *date, *value))
        })
    }
}

impl From<StreamResponse> for StreamResult {
    fn from(response: StreamResponse) -> Self {
        let data = response.data_response;
        let series = data
            .data_type_values
            .into_iter()
            .flat_map(|data_type| {
                let name = data_type.data_type;
                data_type
                    .symbol_values
                    .into_iter()
                    .map(move |symbol| Series {
                        data_type: name.clone(),
                        symbol: symbol.symbol,
                        currency: symbol.currency.unwrap_or_default(),
                        value_type: symbol.value_type,
                        values: symbol.value,
                    })
            })
            .collect();

        StreamResult {
            dates: data.dates.into_iter().map(|date| date.instant()).collect(),
            series,
        }
    }
}

impl StreamResponse {
    pub fn into_result(self) -> StreamResult {
        self.into()
    }
}
