//! Remote multimodal model call
//!
//! One blocking `generateContent` request per extraction: the fixed prompt
//! and the image go out, the reply text comes back. No retries; every
//! failure becomes [`BomError::Inference`] with the underlying message.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::core::config::Config;
use crate::core::credential::Credential;
use crate::core::error::BomError;
use crate::core::upload::UploadedImage;

/// Longest error body echoed back to the user
const MAX_ERROR_BODY: usize = 1024;

/// Something that turns an image and a prompt into model text
pub trait Extractor {
    fn extract(&self, image: &UploadedImage, prompt: &str) -> Result<String, BomError>;
}

/// Gemini `generateContent` client
pub struct GeminiClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    timeout: Duration,
    credential: Credential,
}

impl GeminiClient {
    pub fn new(config: &Config, credential: Credential) -> Result<Self, BomError> {
        Self::with_settings(config.endpoint(), config.model(), config.timeout(), credential)
    }

    pub fn with_settings(
        endpoint: &str,
        model: &str,
        timeout: Duration,
        credential: Credential,
    ) -> Result<Self, BomError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BomError::Inference(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.trim_start_matches("models/").to_string(),
            timeout,
            credential,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

impl Extractor for GeminiClient {
    fn extract(&self, image: &UploadedImage, prompt: &str) -> Result<String, BomError> {
        let body = GenerateRequest::new(prompt, image);
        info!(model = %self.model, image = image.name(), "Sending image to model");
        debug!(url = %self.url(), payload_bytes = image.bytes().len(), "generateContent request");

        let response = self
            .http
            .post(self.url())
            .header("x-goog-api-key", self.credential.expose())
            .json(&body)
            .send()
            .map_err(|e| {
                let msg = if e.is_timeout() {
                    format!("Request timed out after {}s", self.timeout.as_secs())
                } else {
                    format!("Request to {} failed: {}", self.model, e)
                };
                error!("{}", msg);
                BomError::Inference(msg)
            })?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| BomError::Inference(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            let msg = format!("Gemini API error {}: {}", status, api_error_message(&text));
            error!("{}", msg);
            return Err(BomError::Inference(msg));
        }

        let parsed: GenerateResponse = serde_json::from_str(&text).map_err(|e| {
            BomError::Inference(format!("Failed to parse Gemini API response: {}", e))
        })?;
        let reply = parsed.reply_text()?;
        info!(reply_len = reply.len(), "Model replied");
        Ok(reply)
    }
}

/// Pull `error.message` out of an API error body, else the truncated body
fn api_error_message(body: &str) -> String {
    if let Ok(err) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = err.error.message {
            return message;
        }
    }
    truncate_body(body)
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

impl GenerateRequest {
    fn new(prompt: &str, image: &UploadedImage) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::Text {
                        text: prompt.to_string(),
                    },
                    RequestPart::InlineData {
                        inline_data: InlineData {
                            mime_type: image.kind().mime_type(),
                            data: image.to_base64(),
                        },
                    },
                ],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate
    fn reply_text(self) -> Result<String, BomError> {
        let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);
        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = block_reason.unwrap_or_else(|| "no candidates returned".to_string());
            return Err(BomError::Inference(format!("Prompt was blocked: {}", reason)));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            let reason = candidate
                .finish_reason
                .unwrap_or_else(|| "unknown".to_string());
            return Err(BomError::Inference(format!(
                "Response contained no text (finish reason: {})",
                reason
            )));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::prompt::BOM_PROMPT;
    use crate::core::upload;
    use serde_json::json;
    use std::io::Cursor;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_image() -> UploadedImage {
        let img = image::DynamicImage::new_rgb8(16, 16);
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, image::ImageFormat::Png).unwrap();
        upload::load("diagram.png", buffer.into_inner(), "png").unwrap()
    }

    fn client(endpoint: &str) -> GeminiClient {
        GeminiClient::with_settings(
            endpoint,
            "models/gemini-2.5-flash",
            Duration::from_secs(5),
            Credential::new("test-key").unwrap(),
        )
        .unwrap()
    }

    fn run_extract(endpoint: String) -> Result<String, BomError> {
        client(&endpoint).extract(&sample_image(), BOM_PROMPT)
    }

    #[test]
    fn test_request_body_shape() {
        let image = sample_image();
        let body = serde_json::to_value(GenerateRequest::new("hello", &image)).unwrap();
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "hello");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], json!(image.to_base64()));
    }

    #[test]
    fn test_model_prefix_stripped() {
        let c = client("http://localhost/v1beta/");
        assert_eq!(c.model(), "gemini-2.5-flash");
        assert_eq!(
            c.url(),
            "http://localhost/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_reply_text_joins_parts() {
        let resp: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"parts": [{"text": "[{\"id\":"}, {"text": "\"1\"}]"}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(resp.reply_text().unwrap(), "[{\"id\":\"1\"}]");
    }

    #[test]
    fn test_reply_text_blocked_prompt() {
        let resp: GenerateResponse = serde_json::from_value(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        let err = resp.reply_text().unwrap_err();
        assert_eq!(err.to_string(), "An error occurred: Prompt was blocked: SAFETY");
    }

    #[test]
    fn test_reply_text_empty_candidate() {
        let resp: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "MAX_TOKENS"}]
        }))
        .unwrap();
        let err = resp.reply_text().unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"));
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(api_error_message(body), "API key not valid.");
        assert_eq!(api_error_message("plain failure"), "plain failure");

        let long = "x".repeat(2000);
        let truncated = api_error_message(&long);
        assert_eq!(truncated.len(), MAX_ERROR_BODY + 3);
        assert!(truncated.ends_with("..."));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_extract_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {"parts": [{"text": "```json\n[]\n```"}], "role": "model"},
                    "finishReason": "STOP"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let uri = server.uri();
        let reply = tokio::task::spawn_blocking(move || run_extract(uri))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply, "```json\n[]\n```");

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], BOM_PROMPT);
        assert_eq!(
            body["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            "image/png"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_extract_auth_rejection_is_inference_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": 400, "message": "API key not valid. Please pass a valid API key."}
            })))
            .mount(&server)
            .await;

        let uri = server.uri();
        let err = tokio::task::spawn_blocking(move || run_extract(uri))
            .await
            .unwrap()
            .unwrap_err();
        match err {
            BomError::Inference(msg) => {
                assert!(msg.contains("400"));
                assert!(msg.contains("API key not valid"));
            }
            other => panic!("expected Inference, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_extract_quota_error_single_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Resource exhausted"))
            .expect(1)
            .mount(&server)
            .await;

        let uri = server.uri();
        let err = tokio::task::spawn_blocking(move || run_extract(uri))
            .await
            .unwrap()
            .unwrap_err();
        assert!(err.to_string().contains("Resource exhausted"));
    }

    #[test]
    fn test_extract_connection_refused() {
        // Nothing listens on the discard port locally
        let err = run_extract("http://127.0.0.1:9".to_string()).unwrap_err();
        assert!(matches!(err, BomError::Inference(_)));
    }
}
