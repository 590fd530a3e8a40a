// Configuration for the server and its provider clients

use std::time::Duration;

use anyhow::Context;
use speech_core::PollyConfig;
use telephony_core::TwilioConfig;

#[derive(Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Externally reachable host the telephony provider calls back into.
    pub public_host: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_phone_number: String,
    pub aws_region: String,
    pub aws_profile: Option<String>,
    pub provider_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            public_host: "localhost:5000".to_string(),
            twilio_account_sid: String::new(),
            twilio_auth_token: String::new(),
            twilio_phone_number: String::new(),
            aws_region: "us-east-1".to_string(),
            aws_profile: None,
            provider_timeout_secs: 30,
            request_timeout_secs: 60,
            cors_allowed_origins: None,
        }
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("{name} must be set in the environment"))
}

fn parsed_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Strip any scheme and trailing slash so `PUBLIC_HOST` may be given as a URL.
fn normalize_host(raw: &str) -> String {
    let host = raw.trim();
    let host = host
        .strip_prefix("https://")
        .or_else(|| host.strip_prefix("http://"))
        .unwrap_or(host);
    host.trim_end_matches('/').to_string()
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let public_host = normalize_host(&required("PUBLIC_HOST")?);
        if public_host.is_empty() {
            anyhow::bail!("PUBLIC_HOST must name a host");
        }

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect()
            });

        Ok(Self {
            port: parsed_or("PORT", defaults.port),
            public_host,
            twilio_account_sid: required("TWILIO_ACCOUNT_SID")?,
            twilio_auth_token: required("TWILIO_AUTH_TOKEN")?,
            twilio_phone_number: required("TWILIO_PHONE_NUMBER")?,
            aws_region: std::env::var("AWS_REGION").unwrap_or(defaults.aws_region),
            aws_profile: std::env::var("AWS_PROFILE").ok().filter(|p| !p.is_empty()),
            provider_timeout_secs: parsed_or("PROVIDER_TIMEOUT_SECS", defaults.provider_timeout_secs),
            request_timeout_secs: parsed_or("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            cors_allowed_origins,
        })
    }

    /// `https://` base every callback URL is built on.
    pub fn public_base_url(&self) -> String {
        format!("https://{}", normalize_host(&self.public_host))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn polly_config(&self) -> PollyConfig {
        PollyConfig {
            profile: self.aws_profile.clone(),
            region: self.aws_region.clone(),
            timeout: Some(self.provider_timeout()),
        }
    }

    pub fn twilio_config(&self) -> TwilioConfig {
        TwilioConfig {
            account_sid: self.twilio_account_sid.clone(),
            auth_token: self.twilio_auth_token.clone(),
            from_number: self.twilio_phone_number.clone(),
            timeout: Some(self.provider_timeout()),
        }
    }
}
