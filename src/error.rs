use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or malformed client input.
    #[error("{0}")]
    InvalidInput(String),
    /// The model call failed; the message is passed through as-is.
    #[error("{0}")]
    Collaborator(#[from] anyhow::Error),
}

impl AppError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Collaborator(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::Collaborator(e) => e.to_string(),
        };
        (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(resp: Response) -> serde_json::Value {
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn invalid_input_returns_400_with_message() {
        let resp = AppError::invalid("Prompt is required.").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "Prompt is required.");
    }

    #[tokio::test]
    async fn collaborator_returns_500_with_underlying_message() {
        let err = AppError::from(anyhow::anyhow!("Gemini API error (503): overloaded"));
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "Gemini API error (503): overloaded");
    }

    #[test]
    fn display_matches_message() {
        assert_eq!(AppError::invalid("File is required.").to_string(), "File is required.");
    }
}
