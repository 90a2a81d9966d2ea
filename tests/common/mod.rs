#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use async_trait::async_trait;
use futures::StreamExt;
use secrecy::SecretString;
use tutorati_server::{
    app_state::AppState,
    config::Config,
    errors::{AppError, AppResult},
    services::model_service::{LanguageModel, Prompt, TextStream},
};

pub const JEE_QUESTIONS: &str = r#"```json
[
  {"id": "5b1c", "question": "A body of mass 2 kg moves with 3 m/s. What is its kinetic energy?", "options": ["6 J", "9 J", "12 J", "18 J"], "answer": "9 J", "explanation": "KE = mv^2/2 = 2 * 9 / 2", "difficulty": "Amateur", "subject": "Physics"},
  {"id": "7e02", "question": "What is the hybridisation of carbon in ethyne?", "options": ["sp", "sp2", "sp3", "dsp2"], "answer": "sp", "difficulty": "Amateur", "subject": "Chemistry"},
  {"id": "9a41", "question": "What is the derivative of sin x?", "options": ["cos x", "-cos x", "tan x", "sec x"], "answer": "cos x", "difficulty": "Amateur", "subject": "Mathematics"}
]
```"#;

/// Replays canned text in fixed-size chunks and counts calls.
pub struct ScriptedModel {
    text: String,
    chunk_size: usize,
    failures: u32,
    breaks_after_text: bool,
    pub calls: AtomicU32,
}

impl ScriptedModel {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            chunk_size: 17,
            failures: 0,
            breaks_after_text: false,
            calls: AtomicU32::new(0),
        }
    }

    /// Fails the stream itself once the text has been sent.
    pub fn breaking_after_text(mut self) -> Self {
        self.breaks_after_text = true;
        self
    }

    pub fn failing_first(mut self, failures: u32) -> Self {
        self.failures = failures;
        self
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn stream_text(&self, _prompt: &Prompt) -> AppResult<TextStream> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            return Err(AppError::UpstreamError("service unavailable".to_string()));
        }

        let chars: Vec<char> = self.text.chars().collect();
        let mut chunks: Vec<AppResult<String>> = chars
            .chunks(self.chunk_size)
            .map(|chunk| Ok(chunk.iter().collect()))
            .collect();
        if self.breaks_after_text {
            chunks.push(Err(AppError::UpstreamError("connection reset by provider".to_string())));
        }
        Ok(futures::stream::iter(chunks).boxed())
    }
}

pub fn test_config() -> Config {
    Config {
        openai_api_key: SecretString::from("sk-test".to_string()),
        openai_api_base: "http://127.0.0.1:9".to_string(),
        openai_model: "test-model".to_string(),
        generation_temperature: 0.0,
        web_server_host: "127.0.0.1".to_string(),
        web_server_port: 0,
        allowed_origin: None,
        max_response_seconds: 5,
        generate_max_attempts: 2,
        verify_max_attempts: 3,
        retry_backoff_ms: 0,
    }
}

pub fn state_with(model: Arc<dyn LanguageModel>) -> AppState {
    AppState::with_model(test_config(), model)
}

/// The first JEE question followed by the start of the second, as a provider drops the connection.
pub fn jee_questions_cut_after_first() -> &'static str {
    let cut = JEE_QUESTIONS
        .find("\n  {\"id\": \"7e02\"")
        .unwrap_or(JEE_QUESTIONS.len());
    &JEE_QUESTIONS[..cut]
}

pub fn jee_payload() -> serde_json::Value {
    serde_json::json!({
        "exam": "JEE (India)",
        "classStandard": "12th",
        "count": 3,
        "difficulty": "Amateur",
        "type": "MCQ",
        "outputFormat": "solved-examples"
    })
}
