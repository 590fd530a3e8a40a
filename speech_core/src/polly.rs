//! Amazon Polly implementation of [`SpeechSynthesizer`].

use std::time::Duration;

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_polly::config::Region;
use aws_sdk_polly::error::DisplayErrorContext;
use aws_sdk_polly::types::{Engine, OutputFormat, TextType, VoiceId};
use aws_sdk_polly::Client;
use tracing::{debug, error};

use crate::{AudioStream, SpeechError, SpeechRequest, SpeechSynthesizer, MP3_CONTENT_TYPE};

/// Configuration for AWS Polly
#[derive(Debug, Clone)]
pub struct PollyConfig {
    pub profile: Option<String>,
    pub region: String,
    /// Upper bound for the synthesis call, until the audio body is handed back.
    pub timeout: Option<Duration>,
}

impl Default for PollyConfig {
    fn default() -> Self {
        Self {
            profile: None,
            region: "us-east-1".to_string(),
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Polly client shared by every relay request.
#[derive(Debug, Clone)]
pub struct PollySynthesizer {
    client: Client,
}

impl PollySynthesizer {
    /// Load credentials from the default AWS chain and build the client.
    pub async fn new(config: PollyConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region))
            // one attempt per request, failures are reported to the caller
            .retry_config(RetryConfig::disabled());

        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }

        if let Some(timeout) = config.timeout {
            loader = loader.timeout_config(
                TimeoutConfig::builder()
                    .connect_timeout(timeout)
                    .operation_timeout(timeout)
                    .build(),
            );
        }

        let aws_config = loader.load().await;
        Self::from_client(Client::new(&aws_config))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SpeechSynthesizer for PollySynthesizer {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<AudioStream, SpeechError> {
        debug!(voice = %request.voice_id, chars = request.text.len(), "Requesting Polly synthesis");

        let output = self
            .client
            .synthesize_speech()
            .engine(Engine::Neural)
            .output_format(OutputFormat::Mp3)
            .text(&request.text)
            .text_type(TextType::Text)
            .voice_id(VoiceId::from(request.voice_id.as_str()))
            .send()
            .await
            .map_err(|e| {
                let message = DisplayErrorContext(&e).to_string();
                error!("Polly synthesis failed: {message}");
                SpeechError::Provider(message)
            })?;

        let content_type = output
            .content_type
            .unwrap_or_else(|| MP3_CONTENT_TYPE.to_string());

        let mut body = output.audio_stream;
        let chunks = async_stream::stream! {
            while let Some(next) = body.next().await {
                yield next.map_err(|e| SpeechError::Stream(e.to_string()));
            }
        };

        Ok(AudioStream::new(content_type, chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::relay_chunks;
    use aws_sdk_polly::config::{BehaviorVersion, Credentials};
    use aws_smithy_http_client::test_util::{capture_request, CaptureRequestReceiver};
    use aws_smithy_types::body::SdkBody;
    use futures::StreamExt;

    fn mp3_payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 253) as u8).collect()
    }

    /// Synthesizer whose HTTP layer answers with `response` and records the request.
    fn synthesizer(response: http::Response<SdkBody>) -> (PollySynthesizer, CaptureRequestReceiver) {
        let (http_client, request) = capture_request(Some(response));
        let config = aws_sdk_polly::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("AKIDTEST", "secret", None, None, "test"))
            .retry_config(RetryConfig::disabled())
            .http_client(http_client)
            .build();
        (PollySynthesizer::from_client(Client::from_conf(config)), request)
    }

    async fn relayed(audio: AudioStream) -> Vec<bytes::Bytes> {
        relay_chunks(audio)
            .map(|c| match c {
                Ok(b) => b,
                Err(never) => match never {},
            })
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_synthesize_sends_neural_mp3_request() {
        let response = http::Response::builder()
            .status(200)
            .header("Content-Type", "audio/mpeg")
            .body(SdkBody::from(mp3_payload(16)))
            .unwrap();
        let (polly, request) = synthesizer(response);

        let audio = polly
            .synthesize(&SpeechRequest::new("Hello world", Some("Matthew")))
            .await
            .unwrap();
        assert_eq!(audio.content_type(), "audio/mpeg");

        let sent = request.expect_request();
        assert_eq!(sent.method(), "POST");
        assert!(sent.uri().ends_with("/v1/speech"), "uri: {}", sent.uri());

        let body: serde_json::Value =
            serde_json::from_slice(sent.body().bytes().expect("buffered request body")).unwrap();
        assert_eq!(body["Engine"], "neural");
        assert_eq!(body["OutputFormat"], "mp3");
        assert_eq!(body["TextType"], "text");
        assert_eq!(body["Text"], "Hello world");
        assert_eq!(body["VoiceId"], "Matthew");
    }

    #[tokio::test]
    async fn test_synthesize_streams_body_through_relay() {
        let payload = mp3_payload(10_000);
        let response = http::Response::builder()
            .status(200)
            .body(SdkBody::from(payload.clone()))
            .unwrap();
        let (polly, _request) = synthesizer(response);

        let audio = polly
            .synthesize(&SpeechRequest::new("Hello", None))
            .await
            .unwrap();
        // no Content-Type header from the provider
        assert_eq!(audio.content_type(), MP3_CONTENT_TYPE);

        let chunks = relayed(audio).await;
        assert!(chunks.iter().all(|c| c.len() <= crate::stream::CHUNK_SIZE));
        assert_eq!(chunks.concat(), payload);
    }

    #[tokio::test]
    async fn test_synthesize_maps_service_error() {
        let response = http::Response::builder()
            .status(403)
            .header("Content-Type", "application/json")
            .header("x-amzn-ErrorType", "UnrecognizedClientException")
            .body(SdkBody::from(
                r#"{"message":"The security token included in the request is invalid."}"#,
            ))
            .unwrap();
        let (polly, request) = synthesizer(response);

        let err = polly
            .synthesize(&SpeechRequest::new("Hello", None))
            .await
            .unwrap_err();
        match err {
            SpeechError::Provider(message) => assert!(!message.is_empty()),
            other => panic!("unexpected error: {other:?}"),
        }

        let sent = request.expect_request();
        let body: serde_json::Value =
            serde_json::from_slice(sent.body().bytes().expect("buffered request body")).unwrap();
        assert_eq!(body["VoiceId"], "Joanna");
    }
}
