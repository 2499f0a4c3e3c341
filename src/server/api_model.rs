use serde::{Deserialize, Serialize};

use crate::{
    fingerprint::{
        extractor::describe_fields,
        fingerprint_model::{ElementDescriptor, Fingerprint},
    },
    healing::error::HealError,
};

// ============================================================================
// Requests
// ============================================================================

/// Body of `POST /learn`. Field names follow the DOM property names the test
/// runner reports; `type` and `aria-label` are accepted as aliases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnRequest {
    pub page_key: Option<String>,
    pub id: Option<String>,
    pub tag_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(alias = "type", skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    #[serde(alias = "aria-label", skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
}

impl LearnRequest {
    pub fn from_descriptor(page_key: &str, id: &str, descriptor: &ElementDescriptor) -> Self {
        Self {
            page_key: Some(page_key.to_string()),
            id: Some(id.to_string()),
            tag_name: Some(descriptor.tag_name.clone()),
            class_name: descriptor.class_attr(),
            inner_text: descriptor.inner_text.clone(),
            placeholder: descriptor.placeholder.clone(),
            input_type: descriptor.input_type.clone(),
            aria_label: descriptor.aria_label.clone(),
        }
    }

    /// Validate required fields and split into `(page_key, id, descriptor)`.
    pub fn into_parts(self) -> Result<(String, String, ElementDescriptor), HealError> {
        let (Some(page_key), Some(id), Some(tag_name)) = (
            non_blank(self.page_key),
            non_blank(self.id),
            non_blank(self.tag_name),
        ) else {
            return Err(HealError::BadRequest(
                "pageKey, id, tagName required".to_string(),
            ));
        };

        let descriptor = describe_fields(
            &tag_name,
            self.class_name.as_deref(),
            self.inner_text.as_deref(),
            self.placeholder.as_deref(),
            self.input_type.as_deref(),
            self.aria_label.as_deref(),
        );

        Ok((page_key, id, descriptor))
    }
}

/// Body of `POST /heal`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealRequest {
    pub page_key: Option<String>,
    pub broken_id: Option<String>,
    pub dom_snapshot: Option<String>,
}

impl HealRequest {
    pub fn into_parts(self) -> Result<(String, String, String), HealError> {
        match (
            non_blank(self.page_key),
            non_blank(self.broken_id),
            non_blank(self.dom_snapshot),
        ) {
            (Some(page_key), Some(broken_id), Some(snapshot)) => {
                Ok((page_key, broken_id, snapshot))
            }
            _ => Err(HealError::BadRequest(
                "pageKey, brokenId, domSnapshot required".to_string(),
            )),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct LearnResponse {
    pub message: String,
    pub stored: Fingerprint,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealResponse {
    pub message: String,
    pub selector: String,
    pub confidence: f64,
    pub matched_id: String,
}

/// Body of every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub message: String,
    /// One of `bad_request`, `no_fingerprint`, `not_found`, `ambiguous`,
    /// `repository_unavailable`.
    pub outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tie_count: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
