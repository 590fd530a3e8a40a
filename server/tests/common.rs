//! Common utilities for integration tests

#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
    Router,
};
use bytes::Bytes;
use server::{build_router, config::ServerConfig, AppState};
use speech_core::{AudioStream, SpeechError, SpeechRequest, SpeechSynthesizer};
use telephony_core::{CallDetails, CallPlacer, OutboundCall, PlacedCall, TelephonyError};
use tower::ServiceExt;

pub const PUBLIC_HOST: &str = "relay.example.com";
pub const CALL_SID: &str = "CA0123456789abcdef0123456789abcdef";

/// Synthesizer returning a fixed payload, split the way a provider body would be.
pub struct FakeSynthesizer {
    pub payload: Vec<u8>,
    pub read_size: usize,
    pub fail_with: Option<String>,
    pub requests: Mutex<Vec<SpeechRequest>>,
}

impl FakeSynthesizer {
    pub fn with_payload(payload: Vec<u8>) -> Self {
        Self {
            payload,
            read_size: 10_000,
            fail_with: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::with_payload(Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<AudioStream, SpeechError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(message) = &self.fail_with {
            return Err(SpeechError::Provider(message.clone()));
        }
        let pieces: Vec<Bytes> = self
            .payload
            .chunks(self.read_size)
            .map(Bytes::copy_from_slice)
            .collect();
        Ok(AudioStream::from_chunks("audio/mpeg", pieces))
    }
}

/// Call placer recording every outbound call.
pub struct FakeCallPlacer {
    pub fail_with: Option<String>,
    pub placed: Mutex<Vec<OutboundCall>>,
    pub lookups: AtomicUsize,
}

impl FakeCallPlacer {
    pub fn new() -> Self {
        Self {
            fail_with: None,
            placed: Mutex::new(Vec::new()),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.placed.lock().unwrap().len()
    }

    fn failure(&self) -> Option<TelephonyError> {
        self.fail_with.as_ref().map(|message| TelephonyError::Api {
            status: 401,
            code: Some(20003),
            message: message.clone(),
        })
    }
}

#[async_trait]
impl CallPlacer for FakeCallPlacer {
    async fn place_call(&self, call: &OutboundCall) -> Result<PlacedCall, TelephonyError> {
        self.placed.lock().unwrap().push(call.clone());
        match self.failure() {
            Some(err) => Err(err),
            None => Ok(PlacedCall {
                sid: CALL_SID.to_string(),
                status: Some("queued".to_string()),
            }),
        }
    }

    async fn fetch_call(&self, sid: &str) -> Result<CallDetails, TelephonyError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failure() {
            return Err(err);
        }
        Ok(CallDetails {
            sid: sid.to_string(),
            status: Some("completed".to_string()),
            duration: Some("12".to_string()),
            from: Some("+15550001111".to_string()),
            to: Some("+14155552671".to_string()),
            start_time: None,
            end_time: None,
        })
    }
}

/// Create a test app instance around the given fakes
pub fn create_test_app(speech: Arc<FakeSynthesizer>, calls: Arc<FakeCallPlacer>) -> Router {
    let config = ServerConfig {
        public_host: PUBLIC_HOST.to_string(),
        twilio_phone_number: "+15550001111".to_string(),
        ..Default::default()
    };
    build_router(AppState {
        speech,
        calls,
        config,
    })
}

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    to_bytes(response.into_body(), usize::MAX).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

pub fn audio_payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}
