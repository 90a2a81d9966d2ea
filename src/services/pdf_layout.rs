//! Line-by-line layout of document text onto fixed-size pages.
//!
//! Positions are in millimetres measured from the top-left corner of the
//! page. The renderer flips the vertical axis.

use once_cell::sync::Lazy;
use regex::Regex;

static NUMBERED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\s").expect("NUMBERED_ITEM is a valid regex pattern"));
static LETTERED_OPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]\.\s").expect("LETTERED_OPTION is a valid regex pattern"));
static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.*)$").expect("HEADING is a valid regex pattern"));

pub const A4_WIDTH_MM: f32 = 210.0;
pub const A4_HEIGHT_MM: f32 = 297.0;
pub const DEFAULT_MARGIN_MM: f32 = 20.0;

const PT_TO_MM: f32 = 0.3528;
const LINE_SPACING: f32 = 1.4;
// average Helvetica glyph width as a fraction of the font size
const REGULAR_CHAR_EM: f32 = 0.5;
const BOLD_CHAR_EM: f32 = 0.55;

const BODY_SIZE: f32 = 11.0;
const BOLD_SIZE: f32 = 12.0;
const H1_SIZE: f32 = 16.0;
const H2_SIZE: f32 = 14.0;
const TITLE_SIZE: f32 = 18.0;
const BANNER_SIZE: f32 = 9.0;
const OPTION_INDENT_MM: f32 = 8.0;
const LIST_INDENT_MM: f32 = 4.0;
const BLANK_ADVANCE_MM: f32 = 3.0;
const RULE_GAP_MM: f32 = 3.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Blank,
    Rule,
    Heading { level: usize, text: String },
    Bold(String),
    Numbered(String),
    Option(String),
    Plain(String),
}

pub fn classify_line(line: &str) -> LineKind {
    let trimmed = line.trim();

    if trimmed.is_empty() {
        return LineKind::Blank;
    }
    if trimmed.len() >= 3 && trimmed.chars().all(|c| c == '-') {
        return LineKind::Rule;
    }
    if let Some(captures) = HEADING.captures(trimmed) {
        return LineKind::Heading {
            level: captures[1].len(),
            text: strip_bold_markers(&captures[2]),
        };
    }
    if trimmed.starts_with("**") && trimmed[2..].contains("**") {
        return LineKind::Bold(strip_bold_markers(trimmed));
    }
    if NUMBERED_ITEM.is_match(trimmed) {
        return LineKind::Numbered(strip_bold_markers(trimmed));
    }
    if LETTERED_OPTION.is_match(trimmed) {
        return LineKind::Option(strip_bold_markers(trimmed));
    }
    LineKind::Plain(strip_bold_markers(trimmed))
}

fn strip_bold_markers(text: &str) -> String {
    text.replace("**", "").trim().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    Bold,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub weight: FontWeight,
    pub size_pt: f32,
    pub x_mm: f32,
    pub y_mm: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleLine {
    pub x1_mm: f32,
    pub x2_mm: f32,
    pub y_mm: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub texts: Vec<TextRun>,
    pub rules: Vec<RuleLine>,
}

impl PageLayout {
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty() && self.rules.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderBanner {
    pub title: String,
    pub generated_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOptions {
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub margin_mm: f32,
    pub header: Option<HeaderBanner>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            page_width_mm: A4_WIDTH_MM,
            page_height_mm: A4_HEIGHT_MM,
            margin_mm: DEFAULT_MARGIN_MM,
            header: None,
        }
    }
}

impl LayoutOptions {
    pub fn with_header(mut self, title: &str, generated_at: &str) -> Self {
        self.header = Some(HeaderBanner {
            title: title.to_string(),
            generated_at: generated_at.to_string(),
        });
        self
    }

    fn printable_width(&self) -> f32 {
        self.page_width_mm - 2.0 * self.margin_mm
    }

    fn bottom_limit(&self) -> f32 {
        self.page_height_mm - self.margin_mm
    }
}

struct PageCursor<'a> {
    options: &'a LayoutOptions,
    pages: Vec<PageLayout>,
    y: f32,
}

impl<'a> PageCursor<'a> {
    fn new(options: &'a LayoutOptions) -> Self {
        Self {
            options,
            pages: vec![PageLayout::default()],
            y: options.margin_mm,
        }
    }

    fn current(&mut self) -> &mut PageLayout {
        // never empty: starts with one page and only grows
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn break_page(&mut self) {
        self.pages.push(PageLayout::default());
        self.y = self.options.margin_mm;
    }

    fn ensure_space(&mut self, height: f32) {
        let at_top = self.y <= self.options.margin_mm;
        if !at_top && self.y + height > self.options.bottom_limit() {
            self.break_page();
        }
    }

    fn advance(&mut self, height: f32) {
        self.y += height;
    }

    fn write(&mut self, text: &str, weight: FontWeight, size_pt: f32, indent_mm: f32) {
        let line_height = line_height(size_pt);
        let width = self.options.printable_width() - indent_mm;
        let x_mm = self.options.margin_mm + indent_mm;

        for wrapped in wrap_text(text, max_chars(width, size_pt, weight)) {
            self.ensure_space(line_height);
            // text baseline sits at the bottom of its line box
            let y_mm = self.y + size_pt * PT_TO_MM;
            self.current().texts.push(TextRun {
                text: wrapped,
                weight,
                size_pt,
                x_mm,
                y_mm,
            });
            self.advance(line_height);
        }
    }

    fn rule(&mut self) {
        self.ensure_space(2.0 * RULE_GAP_MM);
        self.advance(RULE_GAP_MM);
        let y_mm = self.y;
        let x1_mm = self.options.margin_mm;
        let x2_mm = self.options.page_width_mm - self.options.margin_mm;
        self.current().rules.push(RuleLine { x1_mm, x2_mm, y_mm });
        self.advance(RULE_GAP_MM);
    }

    fn blank(&mut self) {
        if self.y > self.options.margin_mm {
            self.advance(BLANK_ADVANCE_MM);
        }
    }

    fn finish(mut self) -> Vec<PageLayout> {
        if self.pages.len() > 1 && self.pages.last().is_some_and(PageLayout::is_empty) {
            self.pages.pop();
        }
        self.pages
    }
}

fn line_height(size_pt: f32) -> f32 {
    size_pt * PT_TO_MM * LINE_SPACING
}

fn max_chars(width_mm: f32, size_pt: f32, weight: FontWeight) -> usize {
    let em = match weight {
        FontWeight::Regular => REGULAR_CHAR_EM,
        FontWeight::Bold => BOLD_CHAR_EM,
    };
    let char_width = size_pt * em * PT_TO_MM;
    ((width_mm / char_width).floor() as usize).max(1)
}

/// Greedy word wrap. Words longer than a line are split.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        while word.len() > max_chars {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > max_chars && current_len > 0 {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current_len += word.len();
        current.extend(word);
    }

    if current_len > 0 || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Lays out `content` onto pages, inserting page breaks when the cursor passes the bottom margin.
pub fn layout_document(content: &str, options: &LayoutOptions) -> Vec<PageLayout> {
    let mut cursor = PageCursor::new(options);

    if let Some(header) = &options.header {
        cursor.write(&header.title, FontWeight::Bold, TITLE_SIZE, 0.0);
        cursor.write(
            &format!("Generated: {}", header.generated_at),
            FontWeight::Regular,
            BANNER_SIZE,
            0.0,
        );
        cursor.rule();
    }

    for line in content.lines() {
        match classify_line(line) {
            LineKind::Blank => cursor.blank(),
            LineKind::Rule => cursor.rule(),
            LineKind::Heading { level, text } => {
                let size = if level == 1 { H1_SIZE } else { H2_SIZE };
                cursor.blank();
                cursor.write(&text, FontWeight::Bold, size, 0.0);
            }
            LineKind::Bold(text) => cursor.write(&text, FontWeight::Bold, BOLD_SIZE, 0.0),
            LineKind::Numbered(text) => {
                cursor.write(&text, FontWeight::Regular, BODY_SIZE, LIST_INDENT_MM)
            }
            LineKind::Option(text) => {
                cursor.write(&text, FontWeight::Regular, BODY_SIZE, OPTION_INDENT_MM)
            }
            LineKind::Plain(text) => cursor.write(&text, FontWeight::Regular, BODY_SIZE, 0.0),
        }
    }

    cursor.finish()
}
