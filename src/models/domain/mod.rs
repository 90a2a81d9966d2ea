pub mod document;
pub mod question;
pub use document::{Document, DocumentType};
pub use question::{Difficulty, Question};
