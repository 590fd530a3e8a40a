use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use speech_core::SpeechError;
use telephony_core::TelephonyError;
use thiserror::Error;

/// API Error types
///
/// The audio relay answers with `{error}` bodies, the call routes with
/// `{status: "error", message}` bodies.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No text provided")]
    MissingText,

    #[error("Invalid query string: {0}")]
    InvalidQuery(String),

    #[error("Text too long (max {0} characters)")]
    TextTooLong(usize),

    #[error("{0}")]
    Synthesis(#[from] SpeechError),

    #[error("Missing required parameters: phone_number and message")]
    MissingCallParameters,

    #[error("Invalid phone number format. Must be in E.164 format (+1234567890)")]
    InvalidPhoneNumber,

    #[error("Invalid call SID: {0}")]
    InvalidCallSid(String),

    #[error("{0}")]
    Telephony(#[from] TelephonyError),
}

/// Error body of the audio relay
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Error body of the call routes
#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match self {
            ApiError::MissingText | ApiError::InvalidQuery(_) | ApiError::TextTooLong(_) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message })).into_response()
            }
            ApiError::Synthesis(_) => {
                tracing::error!("Speech synthesis error: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: message })).into_response()
            }
            ApiError::MissingCallParameters | ApiError::InvalidPhoneNumber | ApiError::InvalidCallSid(_) => (
                StatusCode::BAD_REQUEST,
                Json(StatusResponse { status: "error", message }),
            )
                .into_response(),
            ApiError::Telephony(_) => {
                tracing::error!("Telephony error: {}", message);
                (
                    StatusCode::BAD_GATEWAY,
                    Json(StatusResponse { status: "error", message }),
                )
                    .into_response()
            }
        }
    }
}
