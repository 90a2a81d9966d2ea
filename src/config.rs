use secrecy::SecretString;
use std::{env, time::Duration};

#[derive(Clone, Debug)]
pub struct Config {
    pub openai_api_key: SecretString,
    pub openai_api_base: String,
    pub openai_model: String,
    pub generation_temperature: f32,
    pub web_server_host: String,
    pub web_server_port: u16,
    pub allowed_origin: Option<String>,
    pub max_response_seconds: u64,
    pub generate_max_attempts: u32,
    pub verify_max_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            openai_api_key: SecretString::from(env::var("OPENAI_API_KEY").unwrap_or_default()),
            openai_api_base: env::var("OPENAI_API_BASE")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            generation_temperature: env::var("GENERATION_TEMPERATURE")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(0.7),
            web_server_host: env::var("WEB_SERVER_HOST")
                .unwrap_or_else(|_| "localhost".to_string()),
            web_server_port: env::var("WEB_SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            allowed_origin: env::var("ALLOWED_ORIGIN").ok().filter(|o| !o.is_empty()),
            max_response_seconds: env::var("MAX_RESPONSE_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            generate_max_attempts: env::var("GENERATE_MAX_ATTEMPTS")
                .ok()
                .and_then(|a| a.parse().ok())
                .filter(|a| *a > 0)
                .unwrap_or(2),
            verify_max_attempts: env::var("VERIFY_MAX_ATTEMPTS")
                .ok()
                .and_then(|a| a.parse().ok())
                .filter(|a| *a > 0)
                .unwrap_or(3),
            retry_backoff_ms: env::var("RETRY_BACKOFF_MS")
                .ok()
                .and_then(|b| b.parse().ok())
                .unwrap_or(500),
        }
    }

    pub fn max_response_duration(&self) -> Duration {
        Duration::from_secs(self.max_response_seconds)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Validate that the provider secret is set
    /// Panics if the API key is missing
    pub fn validate_for_production(&self) {
        use secrecy::ExposeSecret;

        if self.openai_api_key.expose_secret().trim().is_empty() {
            panic!(
                "FATAL: OPENAI_API_KEY is not set! Set OPENAI_API_KEY environment variable to your provider key."
            );
        }

        if self.max_response_seconds == 0 {
            panic!("FATAL: MAX_RESPONSE_SECONDS must be greater than zero.");
        }
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            openai_api_key: SecretString::from("sk-test".to_string()),
            openai_api_base: "http://127.0.0.1:9".to_string(),
            openai_model: "test-model".to_string(),
            generation_temperature: 0.0,
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 8080,
            allowed_origin: None,
            max_response_seconds: 5,
            generate_max_attempts: 2,
            verify_max_attempts: 3,
            retry_backoff_ms: 0,
        }
    }
}
