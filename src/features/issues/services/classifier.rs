use async_trait::async_trait;
use base64::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::config::OracleConfig;
use crate::core::error::{AppError, Result};
use crate::features::issues::models::{Department, IssueCategory};

/// Image bytes as received from the citizen, before they are handed to
/// external storage.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// The open report a new submission is compared against.
#[derive(Debug, Clone)]
pub struct ReferenceIssue {
    pub description: String,
    pub category: IssueCategory,
}

/// Structured judgement returned by the oracle. All fields are required;
/// a response missing any of them, or carrying a value outside the closed
/// enums, fails classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub description: String,
    pub category: IssueCategory,
    pub department: Department,
    pub duplicate: bool,
}

/// External vision/text oracle. Latency is unbounded here; the matcher wraps
/// calls in its own timeout.
#[async_trait]
pub trait IssueClassifier: Send + Sync {
    async fn classify(
        &self,
        image: &ImagePayload,
        reference: Option<&ReferenceIssue>,
    ) -> Result<Classification>;
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Gemini-backed classifier
pub struct GeminiClassifier {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiClassifier {
    pub fn new(config: &OracleConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: config.endpoint.clone(),
        }
    }

    fn build_prompt(reference: Option<&ReferenceIssue>) -> String {
        match reference {
            None => "This is a civic issue reporting system. Describe the issue in detail \
                     to report it and specify which category and department does it come \
                     under. Also set duplicate to false."
                .to_string(),
            Some(r) => format!(
                "This is a civic issue reporting system. Check if this image matches the \
                 description '{}' and category '{}'. If it does, set duplicate to true. \
                 If false, describe the issue in detail to report, categorise and specify \
                 which department does it come under.",
                r.description, r.category
            ),
        }
    }

    /// Response schema in the oracle's OpenAPI subset; constrains category and
    /// department to the closed value sets.
    fn response_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "description": { "type": "string" },
                "category": {
                    "type": "string",
                    "enum": IssueCategory::WIRE_VALUES,
                },
                "department": {
                    "type": "string",
                    "enum": Department::WIRE_VALUES,
                },
                "duplicate": { "type": "boolean" }
            },
            "required": ["description", "category", "department", "duplicate"]
        })
    }

    /// Strict decode of the oracle payload. Anything schema-non-conforming is
    /// ClassificationFailed; no repair, no defaults.
    fn parse_response(body: GenerateContentResponse) -> Result<Classification> {
        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| {
                AppError::ClassificationFailed("oracle returned no text candidate".to_string())
            })?;

        serde_json::from_str::<Classification>(&text).map_err(|e| {
            AppError::ClassificationFailed(format!("schema-non-conforming oracle output: {}", e))
        })
    }
}

#[async_trait]
impl IssueClassifier for GeminiClassifier {
    async fn classify(
        &self,
        image: &ImagePayload,
        reference: Option<&ReferenceIssue>,
    ) -> Result<Classification> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.endpoint, self.model, self.api_key
        );

        let request_body = json!({
            "contents": [{
                "parts": [
                    {
                        "inlineData": {
                            "mimeType": image.mime_type,
                            "data": BASE64_STANDARD.encode(&image.bytes),
                        }
                    },
                    { "text": Self::build_prompt(reference) }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": Self::response_schema(),
            }
        });

        tracing::debug!(
            model = %self.model,
            with_reference = reference.is_some(),
            "Calling classification oracle"
        );

        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| AppError::ClassificationFailed(format!("oracle request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ClassificationFailed(format!(
                "oracle returned HTTP {}",
                response.status()
            )));
        }

        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            AppError::ClassificationFailed(format!("unreadable oracle response: {}", e))
        })?;

        Self::parse_response(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with_text(text: &str) -> GenerateContentResponse {
        GenerateContentResponse {
            candidates: vec![ResponseCandidate {
                content: ResponseContent {
                    parts: vec![ResponsePart {
                        text: Some(text.to_string()),
                    }],
                },
            }],
        }
    }

    #[test]
    fn test_fresh_prompt_forces_duplicate_false() {
        let prompt = GeminiClassifier::build_prompt(None);

        assert!(prompt.contains("set duplicate to false"));
    }

    #[test]
    fn test_compare_prompt_embeds_reference() {
        let reference = ReferenceIssue {
            description: "Streetlight pole leaning over the footpath".to_string(),
            category: IssueCategory::Streetlight,
        };

        let prompt = GeminiClassifier::build_prompt(Some(&reference));

        assert!(prompt.contains("Streetlight pole leaning over the footpath"));
        assert!(prompt.contains("category 'Streetlight'"));
        assert!(prompt.contains("set duplicate to true"));
    }

    #[test]
    fn test_response_schema_lists_closed_value_sets() {
        let schema = GeminiClassifier::response_schema();

        let categories = schema["properties"]["category"]["enum"]
            .as_array()
            .expect("category enum");
        assert_eq!(categories.len(), 5);
        assert!(categories.iter().any(|v| v == "Water Stagnation"));

        let departments = schema["properties"]["department"]["enum"]
            .as_array()
            .expect("department enum");
        assert_eq!(departments.len(), 5);
    }

    #[test]
    fn test_parse_response_valid_payload() {
        let body = response_with_text(
            r#"{
                "description": "Deep pothole in the middle of the lane",
                "category": "Pothole",
                "department": "Department of Road Construction",
                "duplicate": false
            }"#,
        );

        let classification = GeminiClassifier::parse_response(body).unwrap();

        assert_eq!(classification.category, IssueCategory::Pothole);
        assert_eq!(classification.department, Department::RoadConstruction);
        assert!(!classification.duplicate);
    }

    #[test]
    fn test_parse_response_rejects_out_of_set_enum() {
        let body = response_with_text(
            r#"{
                "description": "x",
                "category": "Sinkhole",
                "department": "Department of Road Construction",
                "duplicate": false
            }"#,
        );

        let err = GeminiClassifier::parse_response(body).unwrap_err();

        assert!(matches!(err, AppError::ClassificationFailed(_)));
    }

    #[test]
    fn test_parse_response_rejects_missing_field() {
        let body = response_with_text(
            r#"{ "description": "x", "category": "Pothole", "duplicate": false }"#,
        );

        let err = GeminiClassifier::parse_response(body).unwrap_err();

        assert!(matches!(err, AppError::ClassificationFailed(_)));
    }

    #[test]
    fn test_parse_response_rejects_empty_candidates() {
        let body = GenerateContentResponse { candidates: vec![] };

        let err = GeminiClassifier::parse_response(body).unwrap_err();

        assert!(matches!(err, AppError::ClassificationFailed(_)));
    }
}
