//! Call routes: placing a call that plays relayed audio, Twilio's status
//! callback, and call lookup.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Form, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use speech_core::voice_or_default;
use telephony_core::{twiml, CallDetails, OutboundCall};
use tracing::info;

use crate::error::ApiError;
use crate::validation::{validate_call_sid, validate_phone_number};
use crate::AppState;

#[derive(Debug, Deserialize)]
struct MakeCallBody {
    phone_number: Option<String>,
    message: Option<String>,
    voice_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakeCallRequest {
    pub phone_number: String,
    pub message: String,
    pub voice_id: String,
}

#[derive(Debug, Serialize)]
pub struct CallResult {
    pub status: &'static str,
    pub call_sid: String,
    pub message: String,
    pub audio_url: String,
}

/// Parse a `/make-call` body. Anything but a JSON object carrying non-empty
/// `phone_number` and `message` strings is rejected.
pub fn parse_make_call(body: &[u8]) -> Result<MakeCallRequest, ApiError> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|_| ApiError::MissingCallParameters)?;
    if !value.is_object() {
        return Err(ApiError::MissingCallParameters);
    }
    let body: MakeCallBody =
        serde_json::from_value(value).map_err(|_| ApiError::MissingCallParameters)?;

    let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
    let (Some(phone_number), Some(message)) = (non_empty(body.phone_number), non_empty(body.message)) else {
        return Err(ApiError::MissingCallParameters);
    };

    Ok(MakeCallRequest {
        phone_number: phone_number.trim().to_string(),
        message,
        voice_id: voice_or_default(body.voice_id.as_deref()).to_string(),
    })
}

/// Relay URL that reproduces the same speech request when fetched.
pub fn audio_url(base_url: &str, text: &str, voice_id: &str) -> String {
    format!(
        "{}/stream-audio?text={}&voice={}",
        base_url,
        urlencoding::encode(text),
        urlencoding::encode(voice_id)
    )
}

pub async fn make_call(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CallResult>, ApiError> {
    let req = parse_make_call(&body)?;
    validate_phone_number(&req.phone_number)?;

    let base_url = state.config.public_base_url();
    let audio_url = audio_url(&base_url, &req.message, &req.voice_id);
    let call = OutboundCall {
        to: req.phone_number.clone(),
        twiml: twiml::play(&audio_url),
        status_callback: Some(format!("{base_url}/call-status")),
    };

    info!(to = %req.phone_number, voice = %req.voice_id, %audio_url, "Making call");

    let placed = state.calls.place_call(&call).await?;

    Ok(Json(CallResult {
        status: "success",
        call_sid: placed.sid,
        message: format!("Call initiated to {}", req.phone_number),
        audio_url,
    }))
}

/// Twilio status callback; logged only.
pub async fn call_status(Form(update): Form<HashMap<String, String>>) -> StatusCode {
    let field = |name: &str| update.get(name).map(String::as_str).unwrap_or("-");
    info!(
        call_sid = field("CallSid"),
        call_status = field("CallStatus"),
        to = field("To"),
        duration = field("CallDuration"),
        "Call status update"
    );
    StatusCode::OK
}

pub async fn get_call(
    State(state): State<AppState>,
    Path(sid): Path<String>,
) -> Result<Json<CallDetails>, ApiError> {
    validate_call_sid(&sid)?;
    let details = state.calls.fetch_call(&sid).await?;
    Ok(Json(details))
}
