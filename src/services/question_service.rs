use std::{sync::Arc, time::Duration};

use futures::StreamExt;
use once_cell::sync::Lazy;
use tokio::time::Instant;

use crate::{
    config::Config,
    constants::prompts::{QUESTION_GENERATOR_PROMPT, QUESTION_VERIFIER_PROMPT},
    errors::{AppError, AppResult},
    models::{
        domain::{Difficulty, Question},
        dto::request::{GeneratePayload, QuestionType, VerifyPayload},
    },
    services::model_service::{LanguageModel, Prompt, TextStream},
};

static QUESTION_SCHEMA: Lazy<String> = Lazy::new(|| {
    serde_json::to_string_pretty(&schemars::schema_for!(Question)).unwrap_or_default()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationLimits {
    pub max_response: Duration,
    pub generate_max_attempts: u32,
    pub verify_max_attempts: u32,
    pub retry_backoff: Duration,
}

impl From<&Config> for GenerationLimits {
    fn from(config: &Config) -> Self {
        Self {
            max_response: config.max_response_duration(),
            generate_max_attempts: config.generate_max_attempts.max(1),
            verify_max_attempts: config.verify_max_attempts.max(1),
            retry_backoff: config.retry_backoff(),
        }
    }
}

pub struct QuestionService {
    model: Arc<dyn LanguageModel>,
    limits: GenerationLimits,
}

impl QuestionService {
    pub fn new(model: Arc<dyn LanguageModel>, limits: GenerationLimits) -> Self {
        Self { model, limits }
    }

    /// Streams the model's answer to a generation request, text unmodified.
    pub async fn generate(&self, payload: &GeneratePayload) -> AppResult<TextStream> {
        log::info!(
            "Generating {} {:?} questions for {} ({}), difficulty {}",
            payload.count,
            payload.question_type,
            payload.exam,
            payload.class_standard.as_str(),
            payload.difficulty.as_str()
        );

        let prompt = generation_prompt(payload);
        let stream = self
            .open_stream(&prompt, self.limits.generate_max_attempts, "generate")
            .await?;
        Ok(end_on_error(stream, "generate"))
    }

    /// Streams a review of already generated questions.
    pub async fn verify(&self, payload: &VerifyPayload) -> AppResult<TextStream> {
        log::info!("Verifying {} questions", payload.questions.len());

        let prompt = verification_prompt(payload)?;
        self.open_stream(&prompt, self.limits.verify_max_attempts, "verify")
            .await
    }

    async fn open_stream(
        &self,
        prompt: &Prompt,
        max_attempts: u32,
        operation: &'static str,
    ) -> AppResult<TextStream> {
        let deadline = Instant::now() + self.limits.max_response;
        let mut last_error = AppError::UpstreamError("no attempt was made".to_string());

        for attempt in 1..=max_attempts {
            match tokio::time::timeout_at(deadline, self.model.stream_text(prompt)).await {
                Ok(Ok(stream)) => {
                    log::debug!("{} stream opened on attempt {}", operation, attempt);
                    return Ok(within_deadline(
                        stream,
                        deadline,
                        self.limits.max_response,
                        operation,
                    ));
                }
                Ok(Err(e)) => {
                    log::warn!(
                        "{} attempt {}/{} failed: {}",
                        operation,
                        attempt,
                        max_attempts,
                        e
                    );
                    last_error = e;
                }
                Err(_) => {
                    log::warn!(
                        "{} timed out after {:?} on attempt {}",
                        operation,
                        self.limits.max_response,
                        attempt
                    );
                    return Err(AppError::UpstreamError(format!(
                        "{} timed out after {} seconds",
                        operation,
                        self.limits.max_response.as_secs_f32()
                    )));
                }
            }

            if attempt < max_attempts && !self.limits.retry_backoff.is_zero() {
                tokio::time::sleep(self.limits.retry_backoff * attempt).await;
            }
        }

        log::error!("{} failed after {} attempts", operation, max_attempts);
        Err(last_error)
    }
}

/// Drops empty deltas and ends the stream with an error once `deadline` passes.
fn within_deadline(
    stream: TextStream,
    deadline: Instant,
    limit: Duration,
    operation: &'static str,
) -> TextStream {
    let stream = stream.filter(|delta| {
        futures::future::ready(!matches!(delta, Ok(text) if text.is_empty()))
    });

    futures::stream::unfold(Some(stream.boxed()), move |state| async move {
        let mut stream = state?;
        match tokio::time::timeout_at(deadline, stream.next()).await {
            Ok(Some(delta)) => Some((delta, Some(stream))),
            Ok(None) => None,
            Err(_) => {
                log::warn!("{} stream cut off after {:?}", operation, limit);
                Some((
                    Err(AppError::UpstreamError(format!(
                        "{} response exceeded the {} second limit",
                        operation,
                        limit.as_secs_f32()
                    ))),
                    None,
                ))
            }
        }
    })
    .boxed()
}

/// Ends a plain text stream at its first error, so the body finishes cleanly with what arrived.
fn end_on_error(stream: TextStream, operation: &'static str) -> TextStream {
    stream
        .take_while(move |delta| {
            if let Err(e) = delta {
                log::warn!("{} stream ended early: {}", operation, e);
            }
            futures::future::ready(delta.is_ok())
        })
        .boxed()
}

pub fn generation_prompt(payload: &GeneratePayload) -> Prompt {
    let type_rule = match payload.question_type {
        QuestionType::Mcq => "MCQ with exactly four options; the answer is the text of the correct option",
        QuestionType::Subjective => "Subjective; omit the options field",
    };

    let mut user = format!(
        "Generate {} questions for the {} exam, class {}.\nDifficulty: {}.\nQuestion type: {}.\n",
        payload.count,
        payload.exam.trim(),
        payload.class_standard.as_str(),
        payload.difficulty.as_str(),
        type_rule
    );

    if let Some(source) = payload
        .preferred_source
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        user.push_str(&format!("Preferred source material:\n{}\n", source));
    }

    user.push_str(&format!(
        "Return only the JSON array. Each element must match this JSON schema:\n{}",
        *QUESTION_SCHEMA
    ));

    Prompt {
        system: QUESTION_GENERATOR_PROMPT.to_string(),
        user,
    }
}

/// `Physics: 2 Amateur, 1 Ninja; Chemistry: 1 Beginner`, subjects in first-seen order.
fn coverage_summary(questions: &[Question]) -> String {
    let mut subjects: Vec<(&str, Vec<Difficulty>)> = Vec::new();
    for question in questions {
        let subject = question.subject.trim();
        match subjects.iter_mut().find(|(name, _)| *name == subject) {
            Some((_, difficulties)) => difficulties.push(question.difficulty),
            None => subjects.push((subject, vec![question.difficulty])),
        }
    }

    subjects
        .iter()
        .map(|(subject, difficulties)| {
            let counts = [Difficulty::Beginner, Difficulty::Amateur, Difficulty::Ninja]
                .iter()
                .filter_map(|level| {
                    let count = difficulties.iter().filter(|d| *d == level).count();
                    (count > 0).then(|| format!("{} {}", count, level.as_str()))
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("{}: {}", subject, counts)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn verification_prompt(payload: &VerifyPayload) -> AppResult<Prompt> {
    let questions = &payload.questions;
    let mut user = match (payload.exam.as_deref(), payload.class_standard) {
        (Some(exam), Some(class)) => format!("Exam: {}, class {}.\n", exam, class.as_str()),
        (Some(exam), None) => format!("Exam: {}.\n", exam),
        (None, Some(class)) => format!("Class: {}.\n", class.as_str()),
        (None, None) => "Exam and class not stated.\n".to_string(),
    };
    user.push_str(&format!("Coverage: {}.\n", coverage_summary(questions)));
    user.push_str(&format!(
        "Review these {} questions:\n{}\n",
        questions.len(),
        serde_json::to_string_pretty(questions)?
    ));

    let mismatched: Vec<&str> = questions
        .iter()
        .filter(|q| !q.answer_matches_option())
        .map(|q| q.id.as_str())
        .collect();
    if !mismatched.is_empty() {
        log::info!("{} questions have answers outside their options", mismatched.len());
        user.push_str(&format!(
            "These question ids have an answer that matches none of their options: {}\n",
            mismatched.join(", ")
        ));
    }

    Ok(Prompt {
        system: QUESTION_VERIFIER_PROMPT.to_string(),
        user,
    })
}
