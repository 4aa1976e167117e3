//! REST handlers for chat and history.
//!
//! Request bodies are loosely typed: numeric fields may arrive as JSON numbers
//! or as strings, and an empty body counts as `{}`.

use super::{AppState, SharedState};
use crate::error::AppError;
use crate::providers::{GenerateRequest, GenerationConfig};
use crate::session::{Part, Transcript, Turn, build_contents};
use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Token limit for file requests; not caller-adjustable.
pub const FILE_MAX_OUTPUT_TOKENS: u32 = 2048;

// ── Request bodies ──────────────────────────────────────────────

/// A number that may have been sent as a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LooseNumber {
    Number(f64),
    Text(String),
}

impl LooseNumber {
    /// `None` for an empty string, an error for anything unparsable or non-finite.
    fn parse(&self, field: &str) -> Result<Option<f64>, AppError> {
        let value = match self {
            LooseNumber::Number(n) => *n,
            LooseNumber::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                trimmed
                    .parse::<f64>()
                    .map_err(|_| AppError::invalid(format!("Invalid {field}: {s:?}")))?
            }
        };
        if !value.is_finite() {
            return Err(AppError::invalid(format!("Invalid {field}: must be finite")));
        }
        Ok(Some(value))
    }
}

fn float_or(value: Option<&LooseNumber>, field: &str, default: f64) -> Result<f64, AppError> {
    match value {
        Some(v) => Ok(v.parse(field)?.unwrap_or(default)),
        None => Ok(default),
    }
}

/// Token counts are truncated toward zero and must stay positive.
fn tokens_or(value: Option<&LooseNumber>, field: &str, default: u32) -> Result<u32, AppError> {
    let Some(raw) = value.map(|v| v.parse(field)).transpose()?.flatten() else {
        return Ok(default);
    };
    let whole = raw.trunc();
    if whole < 1.0 || whole > f64::from(u32::MAX) {
        return Err(AppError::invalid(format!(
            "Invalid {field}: must be a positive integer"
        )));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let tokens = whole as u32;
    Ok(tokens)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub temperature: Option<LooseNumber>,
    #[serde(default)]
    pub top_p: Option<LooseNumber>,
    #[serde(default)]
    pub max_output_tokens: Option<LooseNumber>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearBody {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub session_id: Option<String>,
}

fn parse_json_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::invalid(format!("Invalid JSON body: {e}")))
}

// ── Responses ───────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub result: String,
    pub history_length: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChatResponse {
    pub result: String,
    pub file_name: String,
    pub file_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearResponse {
    pub message: String,
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub history: Transcript,
    pub count: usize,
}

// ── Shared exchange flow ────────────────────────────────────────

/// Compose from the current transcript, call the model, then store
/// `stored_user` with the reply. Nothing is stored when the model fails.
async fn run_exchange(
    state: &AppState,
    label: &str,
    session_id: &str,
    user_parts: Vec<Part>,
    stored_user: Turn,
    config: GenerationConfig,
) -> Result<(String, usize), AppError> {
    let history = state.store.get(session_id).await?;
    let request = GenerateRequest {
        model: state.model.clone(),
        contents: build_contents(&history, user_parts),
        system_instruction: Some(state.persona.system_instruction.clone()),
        config,
    };

    let reply = state.provider.generate(&request).await.map_err(|e| {
        tracing::error!("{label} error: {e:#}");
        AppError::Collaborator(e)
    })?;

    let len = state
        .store
        .append(session_id, stored_user, Turn::model_text(reply.clone()))
        .await?;
    tracing::debug!("{label}: session {session_id} now holds {len} turns");
    Ok((reply, len))
}

// ── Handlers ────────────────────────────────────────────────────

/// Text chat. Replies with the model text and the stored exchange count.
pub async fn handle_chat(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<ChatResponse>, AppError> {
    let body: ChatBody = parse_json_body(&body)?;

    let prompt = match body.prompt {
        Some(p) if !p.is_empty() => p,
        _ => return Err(AppError::invalid("Prompt is required.")),
    };

    let defaults = state.defaults;
    let config = GenerationConfig {
        temperature: float_or(body.temperature.as_ref(), "temperature", defaults.temperature)?,
        top_p: Some(float_or(body.top_p.as_ref(), "topP", defaults.top_p)?),
        max_output_tokens: tokens_or(
            body.max_output_tokens.as_ref(),
            "maxOutputTokens",
            defaults.max_output_tokens,
        )?,
    };

    let session_id = state.session_id(body.session_id.as_deref());
    let user_parts = vec![Part::text(prompt)];
    let stored_user = Turn::user(user_parts.clone());

    let (result, len) =
        run_exchange(&state, "Chat", &session_id, user_parts, stored_user, config).await?;

    Ok(Json(ChatResponse {
        result,
        history_length: len / 2,
    }))
}

/// Uploaded file plus the text fields sent alongside it.
#[derive(Debug, Default)]
struct FileForm {
    file: Option<Upload>,
    prompt: Option<String>,
    session_id: Option<String>,
    temperature: Option<LooseNumber>,
}

#[derive(Debug)]
struct Upload {
    file_name: String,
    mime_type: String,
    bytes: Bytes,
}

/// Body-limit failures are reported as such, not as a parse error.
fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::invalid(format!("Upload rejected: {}", e.body_text()))
    } else {
        AppError::invalid(format!("Invalid multipart body: {}", e.body_text()))
    }
}

impl FileForm {
    async fn read(multipart: &mut Multipart) -> Result<Self, AppError> {
        let mut form = FileForm::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                // A part without a filename is a plain field, not an upload.
                "file" if field.file_name().is_some() => {
                    if form.file.is_some() {
                        return Err(AppError::invalid("Only one file may be attached."));
                    }
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let mime_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = field.bytes().await.map_err(multipart_error)?;
                    form.file = Some(Upload {
                        file_name,
                        mime_type,
                        bytes,
                    });
                }
                "prompt" => form.prompt = Some(field.text().await.map_err(multipart_error)?),
                "sessionId" => {
                    form.session_id = Some(field.text().await.map_err(multipart_error)?);
                }
                "temperature" => {
                    let text = field.text().await.map_err(multipart_error)?;
                    form.temperature = Some(LooseNumber::Text(text));
                }
                _ => {}
            }
        }

        Ok(form)
    }
}

/// POST /api/chat-with-file
///
/// One file part plus optional `prompt`, `sessionId` and `temperature` fields.
/// The file goes to the model inline; history only records its name.
pub async fn handle_chat_with_file(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<FileChatResponse>, AppError> {
    // Not multipart at all means no file was attached.
    let Ok(mut multipart) = multipart else {
        return Err(AppError::invalid("File is required."));
    };
    let form = FileForm::read(&mut multipart).await?;

    let Some(upload) = form.file else {
        return Err(AppError::invalid("File is required."));
    };

    let prompt = form
        .prompt
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| state.persona.default_file_prompt.clone());

    let config = GenerationConfig {
        temperature: float_or(
            form.temperature.as_ref(),
            "temperature",
            state.defaults.temperature,
        )?,
        top_p: None,
        max_output_tokens: FILE_MAX_OUTPUT_TOKENS,
    };

    let session_id = state.session_id(form.session_id.as_deref());
    let user_parts = vec![
        Part::text(prompt.clone()),
        Part::inline(upload.mime_type.clone(), &upload.bytes),
    ];
    // The binary stays out of the transcript.
    let stored_user = Turn::user_text(format!("[File: {}] {prompt}", upload.file_name));

    let (result, _) = run_exchange(
        &state,
        "File chat",
        &session_id,
        user_parts,
        stored_user,
        config,
    )
    .await?;

    Ok(Json(FileChatResponse {
        result,
        file_name: upload.file_name,
        file_type: upload.mime_type,
    }))
}

pub async fn handle_clear_history(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<ClearResponse>, AppError> {
    let body: ClearBody = parse_json_body(&body)?;
    let session_id = state.session_id(body.session_id.as_deref());
    state.store.clear(&session_id).await?;
    tracing::info!("Cleared history for session {session_id}");

    Ok(Json(ClearResponse {
        message: "Chat history cleared.".into(),
        session_id,
    }))
}

/// GET /api/history
pub async fn handle_history(
    State(state): State<SharedState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let session_id = state.session_id(query.session_id.as_deref());
    let history = state.store.get(&session_id).await?;
    let count = history.len();
    Ok(Json(HistoryResponse { history, count }))
}
