use once_cell::sync::Lazy;
use regex::Regex;
use validator::Validate;

use crate::{models::domain::Question, services::data_stream};

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```[A-Za-z]*").expect("CODE_FENCE is a valid regex pattern"));

/// Collects a streamed response body as it arrives, decoding UTF-8 incrementally.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
    pending: Vec<u8>,
    bytes: usize,
    chunks: usize,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        self.bytes += chunk.len();
        self.chunks += 1;
        self.decode_pending();
    }

    fn decode_pending(&mut self) {
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    self.text.push_str(text);
                    self.pending.clear();
                    return;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    if let Ok(text) = std::str::from_utf8(&self.pending[..valid]) {
                        self.text.push_str(text);
                    }
                    match e.error_len() {
                        Some(invalid) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + invalid);
                        }
                        // incomplete sequence, wait for the next chunk
                        None => {
                            self.pending.drain(..valid);
                            return;
                        }
                    }
                }
            }
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    pub fn len(&self) -> usize {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }

    /// Text decoded so far. A multi-byte character split across chunks is held back until its tail lands.
    pub fn partial_text(&self) -> &str {
        &self.text
    }

    pub fn finish(mut self) -> String {
        if !self.pending.is_empty() {
            self.text.push_str(&String::from_utf8_lossy(&self.pending));
        }
        self.text
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Valid questions recovered from the text. Invalid elements are dropped.
    Parsed(Vec<Question>),
    /// The text could not be repaired into JSON. Display it as-is.
    Raw(String),
}

impl ParseOutcome {
    pub fn questions(&self) -> Option<&[Question]> {
        match self {
            ParseOutcome::Parsed(questions) => Some(questions),
            ParseOutcome::Raw(_) => None,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, ParseOutcome::Parsed(_))
    }
}

/// Recovers a question list from the full text of a generation stream.
pub fn recover_questions(text: &str) -> ParseOutcome {
    let region = json_region(text);

    let value = match serde_json::from_str::<serde_json::Value>(&close_open_scopes(&region)) {
        Ok(value) => value,
        Err(e) => match complete_elements(&region)
            .and_then(|prefix| serde_json::from_str::<serde_json::Value>(&prefix).ok())
        {
            Some(value) => {
                log::debug!("Kept only the complete elements of a cut-off array: {}", e);
                value
            }
            None => {
                log::debug!("Streamed text is not JSON after repair: {}", e);
                return ParseOutcome::Raw(text.to_string());
            }
        },
    };

    let elements = match value {
        serde_json::Value::Array(elements) => elements,
        serde_json::Value::Object(_) => vec![value],
        _ => return ParseOutcome::Raw(text.to_string()),
    };

    let total = elements.len();
    let questions: Vec<Question> = elements
        .into_iter()
        .filter_map(|element| serde_json::from_value::<Question>(element).ok())
        .filter(|question| question.validate().is_ok())
        .collect();

    if questions.len() < total {
        log::info!(
            "Dropped {} of {} streamed elements that are not valid questions",
            total - questions.len(),
            total
        );
    }

    ParseOutcome::Parsed(questions)
}

/// Applies the text repairs in order: data stream decoding, fence stripping,
/// region extraction, trailing comma removal, scope closing, then array wrapping.
pub fn repair_json_text(text: &str) -> String {
    close_open_scopes(&json_region(text))
}

/// The JSON payload of `text` with framing and surrounding prose removed. Scopes may still be open.
fn json_region(text: &str) -> String {
    let decoded;
    let text = if data_stream::looks_like_data_stream(text) {
        decoded = data_stream::decode(text).text;
        log::debug!("Decoded data stream framing before parsing");
        decoded.as_str()
    } else {
        text
    };

    let stripped = CODE_FENCE.replace_all(text, "");
    let region = extract_json_region(stripped.trim());

    // a stream cut between elements leaves a dangling separator
    region
        .trim_end()
        .trim_end_matches(',')
        .trim_end()
        .to_string()
}

/// Slices from the first `[` or `{` to the closer that balances it. Without one the
/// stream was cut off, so everything from the opener on is kept.
fn extract_json_region(text: &str) -> &str {
    let Some(start) = text.find(['[', '{']) else {
        return text;
    };
    let region = &text[start..];

    match scan_scopes(region).closed_at {
        Some(end) => &region[..=end],
        None => region,
    }
}

/// Appends closers for every scope left open, innermost first, and wraps a bare object in an array.
fn close_open_scopes(region: &str) -> String {
    let mut repaired = region.to_string();

    let open = scan_scopes(region).open;
    if !open.is_empty() {
        log::debug!("Closing {} unclosed scopes", open.len());
        repaired.extend(open.iter().rev().map(|opener| closer_for(*opener)));
    }

    if repaired.starts_with('{') {
        repaired = format!("[{}]", repaired);
    }
    repaired
}

/// The array up to its last complete element, closed. `None` when no element completed.
fn complete_elements(region: &str) -> Option<String> {
    if !region.starts_with('[') {
        return None;
    }
    scan_scopes(region)
        .last_element_end
        .map(|end| format!("{}]", &region[..end]))
}

fn closer_for(opener: char) -> char {
    if opener == '[' {
        ']'
    } else {
        '}'
    }
}

#[derive(Debug, Default)]
struct ScopeScan {
    /// Byte index of the closer that balances the first opener.
    closed_at: Option<usize>,
    /// Openers with no closer yet, outermost first.
    open: Vec<char>,
    /// Byte index just past the last element closed directly inside the outermost scope.
    last_element_end: Option<usize>,
}

/// Tracks `[`/`{` nesting outside string literals until the first opener is balanced.
fn scan_scopes(text: &str) -> ScopeScan {
    let mut scan = ScopeScan::default();
    let mut in_string = false;
    let mut escaped = false;

    for (index, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '{' => scan.open.push(c),
            ']' | '}' => {
                if scan.open.pop().is_none() {
                    continue;
                }
                match scan.open.len() {
                    0 => {
                        scan.closed_at = Some(index);
                        return scan;
                    }
                    1 => scan.last_element_end = Some(index + 1),
                    _ => {}
                }
            }
            _ => {}
        }
    }

    scan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::data_stream::{encode_finish_part, encode_text_part};

    const NEWTON: &str = r#"{"id":"5c0d","question":"SI unit of force?","options":["Joule","Newton"],"answer":"Newton","difficulty":"Beginner","subject":"Physics"}"#;
    const MOLE: &str = r#"{"id":"9a1e","question":"Define one mole.","answer":"6.022e23 particles","explanation":"Avogadro","difficulty":"Amateur","subject":"Chemistry"}"#;

    fn parsed(outcome: ParseOutcome) -> Vec<Question> {
        match outcome {
            ParseOutcome::Parsed(questions) => questions,
            ParseOutcome::Raw(raw) => panic!("expected parsed questions, got raw text: {}", raw),
        }
    }

    #[test]
    fn clean_array_parses() {
        let questions = parsed(recover_questions(&format!("[{},{}]", NEWTON, MOLE)));

        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].answer, "Newton");
        assert_eq!(questions[1].subject, "Chemistry");
    }

    #[test]
    fn stream_cut_between_elements_keeps_complete_ones() {
        let text = format!("```json\n[\n  {},\n  ", NEWTON);
        let questions = parsed(recover_questions(&text));

        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].id, "5c0d");
    }

    #[test]
    fn fenced_single_object_becomes_one_element_array() {
        let text = format!("```json\n{}\n```", NEWTON);
        let questions = parsed(recover_questions(&text));

        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].stem, "SI unit of force?");
    }

    #[test]
    fn prose_around_array_is_dropped() {
        let text = format!("Sure! Here are your questions:\n[{}]\nGood luck!", MOLE);
        let questions = parsed(recover_questions(&text));

        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].id, "9a1e");
    }

    #[test]
    fn prose_before_single_object_keeps_the_object() {
        let text = format!("Here is one question: {}", NEWTON);
        let questions = parsed(recover_questions(&text));

        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].listed_options().len(), 2);
    }

    #[test]
    fn truncated_braces_are_padded() {
        let truncated = &NEWTON[..NEWTON.len() - 1];
        let text = format!("[{}", truncated);
        let questions = parsed(recover_questions(&text));

        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].subject, "Physics");
    }

    #[test]
    fn brackets_inside_strings_are_not_counted() {
        let scan = scan_scopes(r#"{"a":"{{[{"}"#);
        assert_eq!(scan.closed_at, Some(11));
        assert!(scan.open.is_empty());

        let scan = scan_scopes(r#"[{"a":"\"{"#);
        assert_eq!(scan.closed_at, None);
        assert_eq!(scan.open, vec!['[', '{']);
    }

    #[test]
    fn fenced_array_followed_by_prose_parses() {
        let text = format!(
            "```json\n[{},{}]\n```\n\nLet me know if you need more questions!",
            NEWTON, MOLE
        );
        let questions = parsed(recover_questions(&text));

        assert_eq!(questions.len(), 2);
        assert_eq!(questions[1].id, "9a1e");
    }

    #[test]
    fn fenced_object_followed_by_prose_parses() {
        let text = format!("```json\n{}\n```\nHope this helps. [1]", NEWTON);
        let questions = parsed(recover_questions(&text));

        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].answer, "Newton");
    }

    #[test]
    fn nested_scopes_close_innermost_first() {
        let text = r#"[{"id":"5c0d","question":"SI unit of force?","answer":"Newton","difficulty":"Beginner","subject":"Physics","options":["Joule","Newton""#;
        assert!(repair_json_text(text).ends_with(r#""Newton"]}]"#));

        let questions = parsed(recover_questions(text));
        assert_eq!(questions[0].listed_options(), ["Joule", "Newton"]);
    }

    #[test]
    fn cut_inside_later_element_keeps_earlier_ones() {
        let text = format!("[{},{},{{\"id\":\"77c2\",\"question\":\"Define acceler", NEWTON, MOLE);
        let questions = parsed(recover_questions(&text));

        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].id, "5c0d");
        assert_eq!(questions[1].id, "9a1e");
    }

    #[test]
    fn truncated_string_value_stays_raw() {
        let text = r#"[{"id":"1","question":"What is the val"#;
        assert_eq!(recover_questions(text), ParseOutcome::Raw(text.to_string()));
    }

    #[test]
    fn invalid_elements_are_filtered_out() {
        let missing_answer = r#"{"id":"x","question":"Q?","difficulty":"Ninja","subject":"Maths"}"#;
        let blank_stem = r#"{"id":"y","question":"","answer":"1","difficulty":"Ninja","subject":"Maths"}"#;
        let text = format!("[{},{},{}]", missing_answer, NEWTON, blank_stem);

        let questions = parsed(recover_questions(&text));
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].id, "5c0d");
    }

    #[test]
    fn unparseable_text_is_returned_raw() {
        let text = "I cannot help with that request.";
        let outcome = recover_questions(text);

        assert!(!outcome.is_parsed());
        assert_eq!(outcome, ParseOutcome::Raw(text.to_string()));
        assert!(outcome.questions().is_none());
    }

    #[test]
    fn data_stream_framing_is_decoded_first() {
        let (head, tail) = MOLE.split_at(20);
        let text = format!(
            "{}{}{}{}",
            encode_text_part("["),
            encode_text_part(head),
            encode_text_part(&format!("{}]", tail)),
            encode_finish_part("stop")
        );

        let questions = parsed(recover_questions(&text));
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].answer, "6.022e23 particles");
    }

    #[test]
    fn accumulator_joins_split_utf8() {
        let text = "x² + y² = r²";
        let bytes = text.as_bytes();
        let mut accumulator = StreamAccumulator::new();
        accumulator.push(&bytes[..2]);
        assert_eq!(accumulator.partial_text(), "x");

        accumulator.push(&bytes[2..]);
        assert_eq!(accumulator.partial_text(), text);
        assert_eq!(accumulator.chunk_count(), 2);
        assert_eq!(accumulator.len(), bytes.len());
        assert_eq!(accumulator.finish(), text);
    }

    #[test]
    fn accumulator_replaces_invalid_bytes() {
        let mut accumulator = StreamAccumulator::new();
        accumulator.push(b"ok \xff then");

        assert_eq!(accumulator.partial_text(), "ok \u{FFFD} then");
    }

    #[test]
    fn accumulator_flushes_dangling_bytes_on_finish() {
        let mut accumulator = StreamAccumulator::new();
        accumulator.push(&"é".as_bytes()[..1]);

        assert_eq!(accumulator.partial_text(), "");
        assert_eq!(accumulator.finish(), "\u{FFFD}");
    }
}
