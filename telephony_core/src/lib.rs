//! Telephony side of the call relay: placing outbound calls through Twilio.
pub mod twiml;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

const TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Call progress events Twilio reports to the status callback.
const STATUS_CALLBACK_EVENTS: [&str; 4] = ["initiated", "ringing", "answered", "completed"];

#[derive(Debug, Error)]
pub enum TelephonyError {
    /// Twilio answered with an error document.
    #[error("{message}")]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    /// The request never got a usable answer (connect, TLS, timeout, decoding).
    #[error("Twilio request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// A call to be placed from the configured origin number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCall {
    pub to: String,
    /// TwiML document executed when the call connects.
    pub twiml: String,
    pub status_callback: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlacedCall {
    pub sid: String,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallDetails {
    pub sid: String,
    pub status: Option<String>,
    pub duration: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

/// Seam over the telephony provider.
#[async_trait]
pub trait CallPlacer: Send + Sync {
    /// Single call-creation attempt.
    async fn place_call(&self, call: &OutboundCall) -> Result<PlacedCall, TelephonyError>;

    async fn fetch_call(&self, sid: &str) -> Result<CallDetails, TelephonyError>;
}

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Origin number, E.164.
    pub from_number: String,
    pub timeout: Option<Duration>,
}

/// Error document returned by the Twilio REST API
#[derive(Deserialize)]
struct TwilioErrorBody {
    code: Option<i64>,
    message: String,
}

#[derive(Debug, Clone)]
pub struct TwilioClient {
    config: TwilioConfig,
    client: Client,
    base_url: String,
}

impl TwilioClient {
    pub fn new(config: TwilioConfig) -> Result<Self, TelephonyError> {
        Self::with_base_url(config, TWILIO_API_BASE)
    }

    /// Point the client at another API host (used against mock servers).
    pub fn with_base_url(config: TwilioConfig, base_url: impl Into<String>) -> Result<Self, TelephonyError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            config,
            client: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn calls_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            self.base_url, self.config.account_sid
        )
    }

    fn call_url(&self, sid: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls/{}.json",
            self.base_url, self.config.account_sid, sid
        )
    }

    /// Turn a non-2xx answer into [`TelephonyError::Api`].
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, TelephonyError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<TwilioErrorBody>(&text) {
            Ok(body) => (body.code, body.message),
            Err(_) if text.trim().is_empty() => (None, format!("Twilio returned HTTP {}", status.as_u16())),
            Err(_) => (None, text),
        };
        error!(status = status.as_u16(), ?code, "Twilio request rejected: {message}");
        Err(TelephonyError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }
}

#[async_trait]
impl CallPlacer for TwilioClient {
    async fn place_call(&self, call: &OutboundCall) -> Result<PlacedCall, TelephonyError> {
        let mut form: Vec<(&str, &str)> = vec![
            ("To", call.to.as_str()),
            ("From", self.config.from_number.as_str()),
            ("Twiml", call.twiml.as_str()),
        ];
        if let Some(callback) = &call.status_callback {
            form.push(("StatusCallback", callback.as_str()));
            form.extend(STATUS_CALLBACK_EVENTS.iter().map(|e| ("StatusCallbackEvent", *e)));
        }

        info!(to = %call.to, from = %self.config.from_number, "Creating Twilio call");

        let response = self
            .client
            .post(self.calls_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await?;

        let placed = Self::check(response).await?.json::<PlacedCall>().await?;
        info!(call_sid = %placed.sid, status = ?placed.status, "Twilio call created");
        Ok(placed)
    }

    async fn fetch_call(&self, sid: &str) -> Result<CallDetails, TelephonyError> {
        let response = self
            .client
            .get(self.call_url(sid))
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .send()
            .await?;

        Ok(Self::check(response).await?.json::<CallDetails>().await?)
    }
}
