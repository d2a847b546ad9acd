//! Gemini `generateContent` client for frame analysis.
//!
//! Sends the still frame as an inline JPEG part together with an instruction
//! asking for structured JSON (`tags`, `description`).

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use videobank_common::config::AnalysisConfig;
use videobank_common::error::{VideobankError, VideobankResult};
use videobank_media_model::StillFrame;

use crate::analysis::{AnalysisService, FrameAnalysis};

const ANALYSIS_PROMPT: &str = "You are an AI assisting a VideoBank worker. Analyze this video frame. \
Provide a JSON object with two fields: 'tags' (an array of 5-8 relevant, specific keywords \
describing the activity, tools, or environment) and 'description' (a concise 1-sentence summary \
of the work being done). Focus on technical or skill-based details.";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GeminiApiResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<GeminiApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiApiErrorBody {
    message: String,
    code: Option<i32>,
}

/// Frame analysis backed by the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiAnalysisService {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiAnalysisService {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> VideobankResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VideobankError::analysis(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// Build from configuration, reading the key from `api_key_env`.
    pub fn from_config(config: &AnalysisConfig) -> VideobankResult<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                VideobankError::config(format!(
                    "{} is not set; AI analysis is unavailable",
                    config.api_key_env
                ))
            })?;
        Self::new(
            config.endpoint.clone(),
            config.model.clone(),
            api_key,
            Duration::from_secs(config.timeout_secs.max(1)),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!(
            "{}/{}:generateContent?key={}",
            self.endpoint, self.model, self.api_key
        )
    }
}

#[async_trait::async_trait]
impl AnalysisService for GeminiAnalysisService {
    async fn analyze(&self, frame: &StillFrame) -> VideobankResult<FrameAnalysis> {
        let payload = frame.base64_payload();
        if payload.is_empty() {
            return Err(VideobankError::analysis("No frame data to analyze"));
        }

        tracing::info!(model = %self.model, bytes = payload.len(), "Sending frame to Gemini");
        let response = self
            .client
            .post(self.url())
            .json(&build_request(frame))
            .send()
            .await
            .map_err(|e| VideobankError::analysis(format!("Gemini request failed: {}", e.without_url())))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| VideobankError::analysis(format!("Failed to read Gemini response: {e}")))?;
        tracing::debug!(%status, bytes = body.len(), "Gemini response received");

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiApiResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .map(|e| format!("Gemini API error ({}): {}", e.code.unwrap_or(status.as_u16() as i32), e.message))
                .unwrap_or_else(|| format!("Gemini API request failed with status {status}"));
            return Err(VideobankError::analysis(message));
        }

        parse_response(&body)
    }
}

fn build_request(frame: &StillFrame) -> GeminiRequest {
    GeminiRequest {
        contents: vec![Content {
            parts: vec![
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: frame.mime_type().to_string(),
                        data: frame.base64_payload().to_string(),
                    },
                },
                Part::Text {
                    text: ANALYSIS_PROMPT.to_string(),
                },
            ],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: serde_json::json!({
                "type": "OBJECT",
                "properties": {
                    "tags": { "type": "ARRAY", "items": { "type": "STRING" } },
                    "description": { "type": "STRING" }
                }
            }),
        },
    }
}

fn parse_response(body: &str) -> VideobankResult<FrameAnalysis> {
    let response: GeminiApiResponse = serde_json::from_str(body)
        .map_err(|e| VideobankError::analysis(format!("Failed to parse Gemini response: {e}")))?;

    let text = response
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| VideobankError::analysis("No response from AI"))?;

    parse_analysis_text(&text)
}

/// Parse the model's JSON answer, tolerating a surrounding markdown fence.
fn parse_analysis_text(text: &str) -> VideobankResult<FrameAnalysis> {
    if let Ok(analysis) = serde_json::from_str::<FrameAnalysis>(text) {
        return Ok(analysis);
    }

    let json = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    };
    serde_json::from_str::<FrameAnalysis>(json).map_err(|e| {
        VideobankError::analysis(format!(
            "Failed to parse analysis JSON: {e}. Raw text: {}",
            &text[..text.len().min(200)]
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_inline_jpeg_and_schema() {
        let frame = StillFrame::from_jpeg_base64("QUJD");
        let json = serde_json::to_value(build_request(&frame)).unwrap();

        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[0]["inlineData"]["data"], "QUJD");
        assert!(parts[1]["text"].as_str().unwrap().contains("5-8"));
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(
            json["generationConfig"]["responseSchema"]["properties"]["tags"]["type"],
            "ARRAY"
        );
    }

    #[test]
    fn parses_candidate_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"{\"tags\":[\"HVAC\",\"Filter\"],\"description\":\"Replacing a filter.\"}"}]}}]}"#;
        let analysis = parse_response(body).unwrap();
        assert_eq!(analysis.tags, vec!["HVAC", "Filter"]);
        assert_eq!(analysis.description, "Replacing a filter.");
    }

    #[test]
    fn tolerates_markdown_fences() {
        let text = "```json\n{\"tags\":[\"Welding\"],\"description\":\"Welding a seam.\"}\n```";
        assert_eq!(parse_analysis_text(text).unwrap().tags, vec!["Welding"]);
    }

    #[test]
    fn empty_text_is_an_error() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"  "}]}}]}"#;
        let err = parse_response(body).unwrap_err();
        assert!(err.to_string().contains("No response"));
        assert!(parse_response(r#"{"candidates":[]}"#).is_err());
    }

    #[test]
    fn garbage_text_is_an_error() {
        assert!(parse_analysis_text("I cannot help with that").is_err());
    }

    #[test]
    fn url_targets_model_endpoint() {
        let service = GeminiAnalysisService::new(
            "https://example.test/v1beta/models/",
            "gemini-2.5-flash",
            "k",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            service.url(),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent?key=k"
        );
    }

    #[tokio::test]
    async fn empty_frame_fails_without_network() {
        let service =
            GeminiAnalysisService::new("http://127.0.0.1:9", "m", "k", Duration::from_secs(1)).unwrap();
        let err = service.analyze(&StillFrame::placeholder()).await.unwrap_err();
        assert!(matches!(err, VideobankError::Analysis { .. }));
    }
}
