use crate::session::Turn;
use async_trait::async_trait;
use serde::Serialize;

/// Sampling parameters forwarded to the model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    pub max_output_tokens: u32,
}

/// One call to the model: ordered turns plus persona and sampling.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub contents: Vec<Turn>,
    pub system_instruction: Option<String>,
    pub config: GenerationConfig,
}

#[async_trait]
pub trait Provider: Send + Sync {
    /// Submit the turn list and return the assistant text.
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<String>;

    /// Short provider identifier for logs.
    fn name(&self) -> &str;

    /// Whether credentials were found at construction time.
    fn has_credentials(&self) -> bool {
        true
    }
}
