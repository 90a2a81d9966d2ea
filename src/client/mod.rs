//! Typed HTTP client for the question API. It consumes generation streams
//! incrementally, recovers questions from them and downloads PDF exports
//! with the three-attempt retry policy.

use futures::StreamExt;
use reqwest::{header, StatusCode};
use serde::Serialize;
use thiserror::Error;

use crate::{
    errors::{ErrorResponse, PdfError},
    models::{
        domain::Document,
        dto::{
            request::{ExportDocument, ExportRequest, FormatRequest, GeneratePayload, OutputFormat, VerifyPayload},
            response::FormatResponse,
        },
    },
    services::{
        data_stream::{self, DecodedDataStream},
        export_retry::{ExportAttempts, RetryDecision},
        stream_parser::{recover_questions, ParseOutcome, StreamAccumulator},
    },
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server rejected request with {status}: {}", .body.error)]
    Rejected { status: StatusCode, body: ErrorResponse },

    #[error("stream ended with an error: {0}")]
    Stream(String),

    #[error("{message}")]
    Export { message: String, source: PdfError },
}

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfDownload {
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
    pub attempts: u32,
}

#[derive(Clone)]
pub struct TutoratiClient {
    http: reqwest::Client,
    base_url: String,
}

impl TutoratiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> ClientResult<reqwest::Response> {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        ensure_success(response).await
    }

    /// Streams a generation, handing the text received so far to `on_progress` after
    /// every chunk, then recovers the questions.
    pub async fn generate_with_progress<F>(
        &self,
        payload: &GeneratePayload,
        mut on_progress: F,
    ) -> ClientResult<ParseOutcome>
    where
        F: FnMut(&str),
    {
        let response = self.post("/api/generate", payload).await?;
        let mut body = response.bytes_stream();
        let mut accumulator = StreamAccumulator::new();

        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(chunk) => {
                    accumulator.push(&chunk);
                    on_progress(accumulator.partial_text());
                }
                // what already arrived is a truncated response, left to the repair
                Err(e) if !accumulator.is_empty() => {
                    log::warn!(
                        "Generation body broke off after {} bytes: {}",
                        accumulator.len(),
                        e
                    );
                    break;
                }
                Err(e) => return Err(e.into()),
            }
        }

        log::debug!(
            "Generation stream finished after {} chunks ({} bytes)",
            accumulator.chunk_count(),
            accumulator.len()
        );

        let outcome = recover_questions(&accumulator.finish());
        if !outcome.is_parsed() {
            log::warn!("Generated text could not be parsed into questions");
        }
        Ok(outcome)
    }

    pub async fn generate(&self, payload: &GeneratePayload) -> ClientResult<ParseOutcome> {
        self.generate_with_progress(payload, |_: &str| {}).await
    }

    /// Runs a verification round-trip and returns the decoded review text.
    pub async fn verify(&self, payload: &VerifyPayload) -> ClientResult<DecodedDataStream> {
        let response = self.post("/api/verify", payload).await?;
        let text = response.text().await?;
        let decoded = data_stream::decode(&text);

        match decoded.error {
            Some(error) => Err(ClientError::Stream(error)),
            None => Ok(decoded),
        }
    }

    pub async fn format(
        &self,
        questions: &[crate::models::domain::Question],
        output_format: OutputFormat,
    ) -> ClientResult<Vec<Document>> {
        let request = FormatRequest {
            questions: questions.to_vec(),
            output_format,
        };
        let response: FormatResponse = self.post("/api/format", &request).await?.json().await?;
        Ok(response.documents)
    }

    /// Downloads `document` as a PDF, retrying until the attempt budget is spent.
    pub async fn export_pdf(&self, document: &Document, include_header: bool) -> ClientResult<PdfDownload> {
        let request = ExportRequest {
            document: ExportDocument::from(document.clone()),
            include_header,
        };
        let mut attempts = ExportAttempts::new();

        loop {
            let error = match self.export_once(&request).await {
                Ok((filename, bytes)) => {
                    let attempts_used = attempts.attempts() + 1;
                    attempts.record_success();
                    return Ok(PdfDownload {
                        filename,
                        bytes,
                        attempts: attempts_used,
                    });
                }
                Err(e) => e,
            };

            match attempts.record_failure(&error) {
                RetryDecision::Retry { message, .. } => {
                    log::warn!("{} ({})", message, error);
                }
                RetryDecision::GiveUp { message, .. } => {
                    log::error!("PDF export abandoned: {}", error);
                    return Err(ClientError::Export { message, source: error });
                }
            }
        }
    }

    async fn export_once(&self, request: &ExportRequest) -> Result<(Option<String>, Vec<u8>), PdfError> {
        let response = self
            .http
            .post(self.url("/api/export"))
            .header(header::ACCEPT, "application/pdf")
            .json(request)
            .send()
            .await
            .map_err(|e| PdfError::Download(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_ACCEPTABLE {
            return Err(PdfError::UnsupportedBrowser(status.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PdfError::Generation(format!("{}: {}", status, body)));
        }

        let filename = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(attachment_filename);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| PdfError::Download(e.to_string()))?;

        Ok((filename, bytes.to_vec()))
    }
}

async fn ensure_success(response: reqwest::Response) -> ClientResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str(&text).unwrap_or_else(|_| ErrorResponse {
        error: text,
        details: serde_json::Value::Null,
        code: "UNKNOWN".to_string(),
    });
    Err(ClientError::Rejected { status, body })
}

/// Pulls the file name out of a `Content-Disposition` value.
pub fn attachment_filename(disposition: &str) -> Option<String> {
    disposition
        .split(';')
        .map(str::trim)
        .find_map(|param| param.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}
