//! Gemini `generateContent` client for photo assessment

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Assessment, AssessmentGateway, GatewayError, PhotoDataUri};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const USER_AGENT: &str = concat!("roadit-server/", env!("CARGO_PKG_VERSION"));

const ASSESSMENT_PROMPT: &str = "You are an expert in civil infrastructure assessment. \
Analyze the attached image of a road and identify the problem shown.\n\
Based only on what is visible in the image, determine:\n\
1. issueType: one of \"Pothole\", \"Waterlogging\", \"Broken Road\", \"Other\".\n\
2. suggestedSeverity: one of \"Minor\", \"Moderate\", \"Severe/Hazardous\". \
Consider the size and depth of potholes, the extent of water coverage, or how fragmented a broken road is.\n\
Respond with a single JSON object {\"suggestedSeverity\": ..., \"issueType\": ...} and nothing else.";

// Request wire types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Part<'a> {
    Text(&'a str),
    InlineData {
        #[serde(rename = "mimeType")]
        mime_type: &'a str,
        data: &'a str,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

// Response wire types

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

/// Extract the assessment from the first candidate's text
///
/// The text must be exactly the JSON object; commentary around it is a
/// parse failure.
pub fn parse_assessment(response: &GenerateContentResponse) -> Result<Assessment, GatewayError> {
    let text = response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .and_then(|c| c.parts.iter().find_map(|p| p.text.as_deref()))
        .ok_or_else(|| GatewayError::Parse("response has no candidate text".to_string()))?;

    serde_json::from_str(text.trim()).map_err(|e| GatewayError::Parse(e.to_string()))
}

/// Assessment gateway backed by the Gemini API
pub struct GeminiAssessor {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiAssessor {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            model,
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    /// Point the client at another host (a local stand-in during tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl AssessmentGateway for GeminiAssessor {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn assess(&self, photo: &PhotoDataUri) -> Result<Assessment, GatewayError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text(ASSESSMENT_PROMPT),
                    Part::InlineData {
                        mime_type: photo.mime_type(),
                        data: photo.data(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        tracing::debug!(
            model = %self.model,
            mime_type = photo.mime_type(),
            payload_len = photo.data().len(),
            "Requesting photo assessment"
        );

        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(GatewayError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Gemini API error: {}", error_text);
            return Err(GatewayError::Api(format!("HTTP {}", status.as_u16())));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))?;

        let assessment = parse_assessment(&body)?;
        tracing::info!(
            issue_type = %assessment.issue_type,
            severity = %assessment.severity,
            "Photo assessed"
        );
        Ok(assessment)
    }
}
