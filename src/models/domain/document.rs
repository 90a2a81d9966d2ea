use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Document {
    pub title: String,
    pub content: String, // markdown-like text, see services::pdf_layout for what gets styled
    #[serde(rename = "type")]
    pub document_type: DocumentType,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Copy)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Questions,
    Answers,
    Combined,
}

impl Document {
    pub fn new(title: &str, content: String, document_type: DocumentType) -> Self {
        Document {
            title: title.to_string(),
            content,
            document_type,
        }
    }
}
