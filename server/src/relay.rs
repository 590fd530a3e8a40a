//! `GET /stream-audio`: synthesize text and relay the audio as it arrives.

use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderValue},
    response::Response,
};
use speech_core::{stream::relay_chunks, SpeechRequest, MP3_CONTENT_TYPE};
use tracing::info;

use crate::error::ApiError;
use crate::validation::validate_speech_text;
use crate::AppState;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct StreamAudioParams {
    text: Option<String>,
    voice: Option<String>,
}

impl StreamAudioParams {
    /// Pick `text` and `voice` out of decoded query pairs; the first
    /// occurrence of a repeated key wins.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "text" => &mut params.text,
                "voice" => &mut params.voice,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }
}

pub async fn stream_audio(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(pairs) = query.map_err(|e| ApiError::InvalidQuery(e.body_text()))?;
    let params = StreamAudioParams::from_pairs(pairs);

    let text = validate_speech_text(params.text.as_deref())?;
    let request = SpeechRequest::new(text, params.voice.as_deref());

    info!(voice = %request.voice_id, chars = request.text.chars().count(), "Streaming audio");

    let audio = state.speech.synthesize(&request).await?;
    let content_type = HeaderValue::from_str(audio.content_type())
        .unwrap_or_else(|_| HeaderValue::from_static(MP3_CONTENT_TYPE));

    let mut response = Response::new(Body::from_stream(relay_chunks(audio)));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));

    Ok(response)
}
