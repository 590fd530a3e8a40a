//! Text-to-speech side of the call relay.
//!
//! A [`SpeechSynthesizer`] turns a [`SpeechRequest`] into an [`AudioStream`]:
//! the provider's audio body, still unread. The server hands that stream to
//! [`stream::relay_chunks`], which forwards it to the HTTP caller in bounded
//! chunks and releases the provider connection when it is done.
mod polly;
pub mod stream;

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use thiserror::Error;

pub use polly::{PollyConfig, PollySynthesizer};

/// Voice used when the caller does not pick one.
pub const DEFAULT_VOICE_ID: &str = "Joanna";

/// MIME type of the mp3 output we request from the provider.
pub const MP3_CONTENT_TYPE: &str = "audio/mpeg";

#[derive(Debug, Error)]
pub enum SpeechError {
    /// The synthesis request itself failed (network, credentials, quota, bad voice).
    #[error("{0}")]
    Provider(String),

    /// The audio body broke after synthesis had started.
    #[error("audio stream error: {0}")]
    Stream(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    pub voice_id: String,
}

impl SpeechRequest {
    /// Build a request, falling back to [`DEFAULT_VOICE_ID`] for a missing or blank voice.
    pub fn new(text: impl Into<String>, voice_id: Option<&str>) -> Self {
        Self {
            text: text.into(),
            voice_id: voice_or_default(voice_id).to_string(),
        }
    }
}

/// Trimmed voice id, or [`DEFAULT_VOICE_ID`] when missing or blank.
pub fn voice_or_default(voice_id: Option<&str>) -> &str {
    voice_id
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_VOICE_ID)
}

pub type ByteChunks = Pin<Box<dyn Stream<Item = Result<Bytes, SpeechError>> + Send>>;

/// Unread provider audio plus the content type it was produced in.
pub struct AudioStream {
    content_type: String,
    chunks: ByteChunks,
}

// Manual Debug implementation since the boxed stream doesn't implement Debug
impl std::fmt::Debug for AudioStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioStream")
            .field("content_type", &self.content_type)
            .field("chunks", &"<stream>")
            .finish()
    }
}

impl AudioStream {
    pub fn new<S>(content_type: impl Into<String>, chunks: S) -> Self
    where
        S: Stream<Item = Result<Bytes, SpeechError>> + Send + 'static,
    {
        Self {
            content_type: content_type.into(),
            chunks: Box::pin(chunks),
        }
    }

    /// Stream over already available buffers. Mostly useful for fakes.
    pub fn from_chunks<I>(content_type: impl Into<String>, chunks: I) -> Self
    where
        I: IntoIterator<Item = Bytes>,
        I::IntoIter: Send + 'static,
    {
        Self::new(content_type, futures::stream::iter(chunks.into_iter().map(Ok)))
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn into_chunks(self) -> ByteChunks {
        self.chunks
    }
}

/// Seam over the text-to-speech provider.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Issue one synthesis request. Nothing is cached between calls.
    async fn synthesize(&self, request: &SpeechRequest) -> Result<AudioStream, SpeechError>;
}
