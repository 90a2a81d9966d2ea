use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Validate, JsonSchema)]
pub struct Question {
    #[validate(length(min = 1))]
    pub id: String, // UUID string, assigned by the model
    #[serde(rename = "question")]
    #[validate(length(min = 1))]
    pub stem: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[validate(length(min = 1))]
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub difficulty: Difficulty,
    #[validate(length(min = 1))]
    pub subject: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Copy, JsonSchema)]
pub enum Difficulty {
    Beginner,
    Amateur,
    Ninja,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "Beginner",
            Difficulty::Amateur => "Amateur",
            Difficulty::Ninja => "Ninja",
        }
    }
}

impl Question {
    pub fn new(stem: &str, answer: &str, difficulty: Difficulty, subject: &str) -> Self {
        Question {
            id: Uuid::new_v4().to_string(),
            stem: stem.to_string(),
            options: None,
            answer: answer.to_string(),
            explanation: None,
            difficulty,
            subject: subject.to_string(),
        }
    }

    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = Some(options.iter().map(|o| o.to_string()).collect());
        self
    }

    pub fn with_explanation(mut self, explanation: &str) -> Self {
        self.explanation = Some(explanation.to_string());
        self
    }

    /// Options to render, treating an empty list the same as none.
    pub fn listed_options(&self) -> &[String] {
        self.options.as_deref().unwrap_or(&[])
    }

    /// Loose check that an MCQ answer names one of its options.
    pub fn answer_matches_option(&self) -> bool {
        let options = self.listed_options();
        options.is_empty()
            || options
                .iter()
                .any(|o| o.trim().eq_ignore_ascii_case(self.answer.trim()))
    }
}

/// Letter label for a zero-based option index: 0 -> 'A'.
pub fn option_label(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}
