//! Line framing for streamed model output.
//!
//! Every line is `<code>:<json>\n`. Text deltas use code `0` with a JSON
//! string payload, errors use `3`, and the finish marker uses `d` with a
//! JSON object payload.

use futures::{stream::BoxStream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::services::model_service::TextStream;

pub const DATA_STREAM_HEADER: &str = "x-vercel-ai-data-stream";
pub const DATA_STREAM_VERSION: &str = "v1";

const TEXT_CODE: &str = "0";
const ERROR_CODE: &str = "3";
const FINISH_CODE: &str = "d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishPart {
    pub finish_reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedDataStream {
    pub text: String,
    pub error: Option<String>,
    pub finish_reason: Option<String>,
}

impl DecodedDataStream {
    pub fn is_finished(&self) -> bool {
        self.finish_reason.is_some()
    }
}

pub fn encode_text_part(text: &str) -> String {
    encode_part(TEXT_CODE, &serde_json::Value::String(text.to_string()))
}

pub fn encode_error_part(message: &str) -> String {
    encode_part(ERROR_CODE, &serde_json::Value::String(message.to_string()))
}

pub fn encode_finish_part(reason: &str) -> String {
    let part = FinishPart {
        finish_reason: reason.to_string(),
    };
    encode_part(
        FINISH_CODE,
        &serde_json::to_value(part).unwrap_or(serde_json::Value::Null),
    )
}

/// Frames text deltas as parts. Ends with a finish part, or with an error part if the source fails.
pub fn encode_stream(stream: TextStream) -> BoxStream<'static, String> {
    futures::stream::unfold((stream, false), |(mut stream, done)| async move {
        if done {
            return None;
        }
        match stream.next().await {
            Some(Ok(text)) => Some((encode_text_part(&text), (stream, false))),
            Some(Err(e)) => {
                log::error!("Stream failed mid-response: {}", e);
                Some((encode_error_part(&e.to_string()), (stream, true)))
            }
            None => Some((encode_finish_part("stop"), (stream, true))),
        }
    })
    .boxed()
}

fn encode_part(code: &str, payload: &serde_json::Value) -> String {
    format!("{}:{}\n", code, payload)
}

fn split_part(line: &str) -> Option<(&str, serde_json::Value)> {
    let (code, payload) = line.split_once(':')?;
    if code.is_empty() || code.len() > 2 || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    let value = serde_json::from_str(payload).ok()?;
    Some((code, value))
}

/// True when the first non-empty line is a well-formed data stream part.
pub fn looks_like_data_stream(text: &str) -> bool {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(split_part)
        .is_some()
}

/// Decodes a complete data stream. Lines that are not well-formed parts are skipped.
pub fn decode(text: &str) -> DecodedDataStream {
    let mut decoded = DecodedDataStream::default();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some((code, value)) = split_part(line) else {
            log::debug!("Skipping malformed data stream line ({} bytes)", line.len());
            continue;
        };

        match code {
            TEXT_CODE => {
                if let Some(text) = value.as_str() {
                    decoded.text.push_str(text);
                }
            }
            ERROR_CODE => {
                decoded.error = Some(
                    value
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| value.to_string()),
                );
            }
            FINISH_CODE => {
                decoded.finish_reason = serde_json::from_value::<FinishPart>(value)
                    .map(|part| part.finish_reason)
                    .ok()
                    .or_else(|| Some("unknown".to_string()));
            }
            _ => {}
        }
    }

    decoded
}
