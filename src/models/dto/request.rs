use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::domain::{Difficulty, Document, Question};

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePayload {
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub exam: String,

    pub class_standard: ClassStandard,

    #[validate(range(min = 1, max = 50))]
    pub count: u8,

    pub difficulty: Difficulty,

    #[serde(rename = "type")]
    pub question_type: QuestionType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 2000))]
    pub preferred_source: Option<String>,

    pub output_format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ClassStandard {
    #[serde(rename = "9th")]
    Ninth,
    #[serde(rename = "10th")]
    Tenth,
    #[serde(rename = "11th")]
    Eleventh,
    #[serde(rename = "12th")]
    Twelfth,
    Dropper,
}

impl ClassStandard {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassStandard::Ninth => "9th",
            ClassStandard::Tenth => "10th",
            ClassStandard::Eleventh => "11th",
            ClassStandard::Twelfth => "12th",
            ClassStandard::Dropper => "Dropper",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum QuestionType {
    #[serde(rename = "MCQ")]
    Mcq,
    Subjective,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    SolvedExamples,
    AssignmentFormat,
    SeparateDocuments,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPayload {
    #[validate(length(min = 1, max = 50), nested)]
    pub questions: Vec<Question>,

    /// Exam the questions were written for, when the caller still knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100))]
    pub exam: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_standard: Option<ClassStandard>,
}

impl VerifyPayload {
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            exam: None,
            class_standard: None,
        }
    }

    /// Carries the exam and class of the generation request along with its questions.
    pub fn for_generation(payload: &GeneratePayload, questions: Vec<Question>) -> Self {
        Self {
            questions,
            exam: Some(payload.exam.trim().to_string()),
            class_standard: Some(payload.class_standard),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FormatRequest {
    #[validate(length(min = 1), nested)]
    pub questions: Vec<Question>,
    pub output_format: OutputFormat,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    #[validate(nested)]
    pub document: ExportDocument,
    #[serde(default = "default_include_header")]
    pub include_header: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ExportDocument {
    #[validate(length(max = 200))]
    pub title: String,
    #[validate(length(min = 1))]
    pub content: String,
    #[serde(rename = "type")]
    pub document_type: crate::models::domain::DocumentType,
}

impl From<ExportDocument> for Document {
    fn from(dto: ExportDocument) -> Self {
        Document {
            title: dto.title,
            content: dto.content,
            document_type: dto.document_type,
        }
    }
}

impl From<Document> for ExportDocument {
    fn from(document: Document) -> Self {
        ExportDocument {
            title: document.title,
            content: document.content,
            document_type: document.document_type,
        }
    }
}

fn default_include_header() -> bool {
    true
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jee_payload_json() -> serde_json::Value {
        serde_json::json!({
            "exam": "JEE (India)",
            "classStandard": "12th",
            "count": 3,
            "difficulty": "Amateur",
            "type": "MCQ",
            "outputFormat": "solved-examples"
        })
    }

    #[test]
    fn generate_payload_parses_camel_case_fields() {
        let payload: GeneratePayload =
            serde_json::from_value(jee_payload_json()).expect("payload should parse");

        assert_eq!(payload.class_standard, ClassStandard::Twelfth);
        assert_eq!(payload.question_type, QuestionType::Mcq);
        assert_eq!(payload.output_format, OutputFormat::SolvedExamples);
        assert!(payload.preferred_source.is_none());
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn generate_payload_rejects_count_out_of_range() {
        let mut json = jee_payload_json();
        json["count"] = serde_json::json!(51);
        let payload: GeneratePayload = serde_json::from_value(json).expect("payload should parse");

        let errors = payload.validate().expect_err("count 51 should fail");
        assert!(errors.field_errors().contains_key("count"));

        let mut json = jee_payload_json();
        json["count"] = serde_json::json!(0);
        let payload: GeneratePayload = serde_json::from_value(json).expect("payload should parse");
        assert!(payload.validate().is_err());
    }

    #[test]
    fn generate_payload_rejects_blank_exam() {
        let mut json = jee_payload_json();
        json["exam"] = serde_json::json!("   ");
        let payload: GeneratePayload = serde_json::from_value(json).expect("payload should parse");

        assert!(payload.validate().is_err());
    }

    #[test]
    fn unknown_output_format_does_not_deserialize() {
        let mut json = jee_payload_json();
        json["outputFormat"] = serde_json::json!("flashcards");

        assert!(serde_json::from_value::<GeneratePayload>(json).is_err());
    }

    #[test]
    fn verify_payload_requires_questions() {
        let payload = VerifyPayload::new(vec![]);
        assert!(payload.validate().is_err());
    }

    #[test]
    fn verify_payload_validates_nested_questions() {
        let bad = Question::new("Stem", "", Difficulty::Ninja, "Chemistry");
        let payload = VerifyPayload::new(vec![bad]);
        assert!(payload.validate().is_err());
    }

    #[test]
    fn verify_payload_carries_generation_context() {
        let generate: GeneratePayload =
            serde_json::from_value(jee_payload_json()).expect("payload should parse");
        let question = Question::new("Stem?", "Answer", Difficulty::Amateur, "Physics");

        let payload = VerifyPayload::for_generation(&generate, vec![question]);
        assert_eq!(payload.class_standard, Some(generate.class_standard));
        assert!(payload.validate().is_ok());

        let json = serde_json::to_value(&payload).expect("payload should serialize");
        assert_eq!(json["exam"], generate.exam.trim());
        assert_eq!(json["classStandard"], generate.class_standard.as_str());
    }

    #[test]
    fn export_request_defaults_to_header() {
        let request: ExportRequest = serde_json::from_value(serde_json::json!({
            "document": { "title": "Questions", "content": "1. x", "type": "questions" }
        }))
        .expect("export request should parse");

        assert!(request.include_header);
        assert!(request.validate().is_ok());
    }
}
