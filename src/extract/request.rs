use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::model::ExtractionJob;

const REQUEST_NAMESPACE: &str = "#ThomsonReuters.Dss.Api.Extractions.ExtractionRequests.";
const IDENTIFIER_LIST_TYPE: &str =
    "#ThomsonReuters.Dss.Api.Extractions.ExtractionRequests.InstrumentIdentifierList";

/// Body posted to the on-demand extraction endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionPayload {
    #[serde(rename = "ExtractionRequest")]
    pub extraction_request: ExtractionRequestBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExtractionRequestBody {
    #[serde(rename = "@odata.type")]
    pub odata_type: String,
    pub content_field_names: Vec<String>,
    pub identifier_list: IdentifierList,
    /// Serialized as `null` when the job has no condition.
    pub condition: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IdentifierList {
    #[serde(rename = "@odata.type")]
    pub odata_type: String,
    pub instrument_identifiers: Vec<InstrumentIdentifier>,
    pub validation_options: Option<Value>,
    pub use_user_preferences_for_validation_options: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstrumentIdentifier {
    pub identifier: String,
    pub identifier_type: String,
}

/// Render a job into the wire payload. Never fails.
pub fn build_payload(job: &ExtractionJob) -> ExtractionPayload {
    ExtractionPayload {
        extraction_request: ExtractionRequestBody {
            odata_type: format!("{}{}ExtractionRequest", REQUEST_NAMESPACE, job.kind.as_str()),
            content_field_names: job.fields.clone(),
            identifier_list: IdentifierList {
                odata_type: IDENTIFIER_LIST_TYPE.to_string(),
                instrument_identifiers: vec![InstrumentIdentifier {
                    identifier: job.identifier.clone(),
                    identifier_type: job.identifier_kind.wire_name().to_string(),
                }],
                validation_options: None,
                use_user_preferences_for_validation_options: false,
            },
            condition: job.condition.clone(),
        },
    }
}
