pub mod data_stream;
pub mod document_formatter;
pub mod export_retry;
pub mod model_service;
pub mod pdf_layout;
pub mod pdf_service;
pub mod question_service;
pub mod stream_parser;
