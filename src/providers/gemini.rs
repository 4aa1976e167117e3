//! Google Gemini provider.
//!
//! Authentication: explicit API key from config, then `GEMINI_API_KEY`,
//! then `GOOGLE_API_KEY`.

use crate::providers::traits::{GenerateRequest, GenerationConfig, Provider};
use crate::session::{Part, Turn};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini `generateContent` client.
pub struct GeminiProvider {
    api_key: Option<String>,
    base_url: String,
    client: Client,
}

// ══════════════════════════════════════════════════════════════════════════════
// API REQUEST/RESPONSE TYPES
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: &'a [Turn],
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
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
struct ApiError {
    message: String,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if it carries any.
    fn into_text(self) -> Option<String> {
        let content = self.candidates?.into_iter().next()?.content?;
        let mut texts = content.parts.into_iter().filter_map(|p| p.text).peekable();
        texts.peek()?;
        Some(texts.collect())
    }
}

impl GeminiProvider {
    /// Create a new Gemini provider.
    ///
    /// `timeout` of `None` leaves requests unbounded.
    pub fn new(api_key: Option<&str>, base_url: Option<&str>, timeout: Option<Duration>) -> Self {
        let resolved_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from)
            .or_else(|| non_empty_env("GEMINI_API_KEY"))
            .or_else(|| non_empty_env("GOOGLE_API_KEY"));

        let mut builder = Client::builder().connect_timeout(Duration::from_secs(10));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Self {
            api_key: resolved_key,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            client: builder.build().unwrap_or_else(|_| Client::new()),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn generate_url(&self, model: &str) -> String {
        // Model format: gemini-2.5-flash or models/gemini-2.5-flash
        let model_name = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{model}")
        };
        format!("{}/v1beta/{model_name}:generateContent", self.base_url)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<String> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            anyhow::anyhow!(
                "Gemini API key not found. Set GEMINI_API_KEY or provider.api_key in the config file. \
                 Get a key from https://aistudio.google.com/app/apikey"
            )
        })?;

        let body = GenerateContentRequest {
            contents: &request.contents,
            system_instruction: request
                .system_instruction
                .as_ref()
                .map(|sys| SystemInstruction {
                    parts: vec![Part::text(sys.clone())],
                }),
            generation_config: request.config,
        };

        let response = self
            .client
            .post(self.generate_url(&request.model))
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error ({status}): {error_text}");
        }

        let result: GenerateContentResponse = response.json().await?;

        if let Some(err) = result.error {
            anyhow::bail!("Gemini API error: {}", err.message);
        }

        result
            .into_text()
            .ok_or_else(|| anyhow::anyhow!("No response from Gemini"))
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn has_credentials(&self) -> bool {
        self.has_api_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(contents: Vec<Turn>) -> GenerateRequest {
        GenerateRequest {
            model: "gemini-2.5-flash".into(),
            contents,
            system_instruction: Some("You are ProBot".into()),
            config: GenerationConfig {
                temperature: 0.7,
                top_p: Some(0.9),
                max_output_tokens: 2048,
            },
        }
    }

    #[test]
    fn provider_creates_with_key() {
        let provider = GeminiProvider::new(Some("test-api-key"), None, None);
        assert_eq!(provider.api_key.as_deref(), Some("test-api-key"));
        assert!(provider.has_api_key());
    }

    #[test]
    fn generate_url_prefixes_models() {
        let provider = GeminiProvider::new(Some("k"), Some("http://localhost:9/"), None);
        assert_eq!(
            provider.generate_url("gemini-2.5-flash"),
            "http://localhost:9/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(
            provider.generate_url("models/gemini-1.5-pro"),
            "http://localhost:9/v1beta/models/gemini-1.5-pro:generateContent"
        );
    }

    #[test]
    fn request_serialization() {
        let contents = vec![Turn::user(vec![
            Part::text("Hello"),
            Part::inline("text/plain", b"hi"),
        ])];
        let body = GenerateContentRequest {
            contents: &contents,
            system_instruction: Some(SystemInstruction {
                parts: vec![Part::text("You are helpful")],
            }),
            generation_config: GenerationConfig {
                temperature: 0.7,
                top_p: None,
                max_output_tokens: 2048,
            },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Hello");
        assert_eq!(json["contents"][0]["parts"][1]["inlineData"]["data"], "aGk=");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "You are helpful");
        assert_eq!(json["generationConfig"]["temperature"], 0.7);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 2048);
        assert!(json["generationConfig"].get("topP").is_none());
    }

    #[test]
    fn response_text_concatenates_parts() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [{"text": "Hello "}, {"text": "there!"}]
                }
            }]
        }"#;

        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_text().as_deref(), Some("Hello there!"));
    }

    #[test]
    fn response_without_text_yields_none() {
        let json = r#"{"candidates": [{"finishReason": "SAFETY"}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert!(response.into_text().is_none());
    }

    #[test]
    fn error_response_deserialization() {
        let json = r#"{
            "error": {
                "message": "Invalid API key"
            }
        }"#;

        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert!(response.error.is_some());
        assert_eq!(response.error.unwrap().message, "Invalid API key");
    }

    #[tokio::test]
    async fn generate_posts_contents_and_returns_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "secret-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"role": "model", "parts": [{"text": "Halo!"}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = GeminiProvider::new(Some("secret-key"), Some(&server.uri()), None);
        let text = provider
            .generate(&request(vec![Turn::user_text("hi")]))
            .await
            .unwrap();
        assert_eq!(text, "Halo!");

        let received = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(body["generationConfig"]["topP"], 0.9);
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You are ProBot");
    }

    #[tokio::test]
    async fn generate_surfaces_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let provider = GeminiProvider::new(Some("k"), Some(&server.uri()), None);
        let err = provider
            .generate(&request(vec![Turn::user_text("hi")]))
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("429"), "{err}");
        assert!(err.contains("quota exceeded"), "{err}");
    }
}
