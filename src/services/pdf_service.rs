use actix_web::{
    http::header::{q, Accept},
    mime::{self, Mime},
};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use printpdf::{BuiltinFont, Line, Mm, PdfDocument, Point};
use regex::Regex;

use crate::{
    errors::PdfError,
    models::domain::Document,
    services::pdf_layout::{layout_document, FontWeight, LayoutOptions, PageLayout},
};

static UNSAFE_FILENAME_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[<>:"/\\|?*\s\x00-\x1f]"#).expect("UNSAFE_FILENAME_CHARS is a valid regex pattern")
});
static REPEATED_UNDERSCORES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_{2,}").expect("REPEATED_UNDERSCORES is a valid regex pattern"));

const FALLBACK_FILENAME: &str = "document";
const RULE_THICKNESS_PT: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfExport {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

pub struct PdfService;

impl PdfService {
    /// Lays out and renders `document`, naming the file after its title and `generated_at`.
    pub fn export(
        document: &Document,
        include_header: bool,
        generated_at: NaiveDateTime,
    ) -> Result<PdfExport, PdfError> {
        if document.content.trim().is_empty() {
            return Err(PdfError::Generation("document has no content".to_string()));
        }

        let mut options = LayoutOptions::default();
        if include_header {
            options = options.with_header(
                &document.title,
                &generated_at.format("%Y-%m-%d %H:%M").to_string(),
            );
        }

        let pages = layout_document(&document.content, &options);
        let bytes = render_pages(&document.title, &pages, &options)?;
        let filename = export_filename(&document.title, generated_at);

        log::info!(
            "Rendered '{}' to {} ({} pages, {} bytes)",
            document.title,
            filename,
            pages.len(),
            bytes.len()
        );

        Ok(PdfExport {
            filename,
            bytes,
            page_count: pages.len(),
        })
    }
}

pub fn render_pages(
    title: &str,
    pages: &[PageLayout],
    options: &LayoutOptions,
) -> Result<Vec<u8>, PdfError> {
    let width = Mm(options.page_width_mm);
    let height = Mm(options.page_height_mm);
    let (doc, first_page, first_layer) = PdfDocument::new(title, width, height, "Page 1");

    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| PdfError::Generation(format!("failed to load font: {}", e)))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| PdfError::Generation(format!("failed to load font: {}", e)))?;

    for (index, page) in pages.iter().enumerate() {
        let (page_index, layer_index) = if index == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(width, height, format!("Page {}", index + 1))
        };
        let layer = doc.get_page(page_index).get_layer(layer_index);

        for run in &page.texts {
            let font = match run.weight {
                FontWeight::Regular => &regular,
                FontWeight::Bold => &bold,
            };
            layer.use_text(
                run.text.clone(),
                run.size_pt,
                Mm(run.x_mm),
                Mm(options.page_height_mm - run.y_mm),
                font,
            );
        }

        if !page.rules.is_empty() {
            layer.set_outline_thickness(RULE_THICKNESS_PT);
        }
        for rule in &page.rules {
            let y = Mm(options.page_height_mm - rule.y_mm);
            layer.add_line(Line {
                points: vec![
                    (Point::new(Mm(rule.x1_mm), y), false),
                    (Point::new(Mm(rule.x2_mm), y), false),
                ],
                is_closed: false,
            });
        }
    }

    doc.save_to_bytes()
        .map_err(|e| PdfError::Generation(format!("failed to serialize PDF: {}", e)))
}

/// Whether a client's `Accept` header allows a PDF download. A missing or empty header accepts anything.
///
/// The most specific range matching `application/pdf` decides, so `*/*` cannot
/// override an explicit `application/pdf;q=0`.
pub fn accepts_pdf(accept: Option<&Accept>) -> bool {
    let Some(accept) = accept.filter(|a| !a.is_empty()) else {
        return true;
    };

    let refused = q(0.0);
    accept
        .iter()
        .filter_map(|range| pdf_range_specificity(&range.item).map(|rank| (rank, range.quality)))
        .max_by_key(|(rank, quality)| (*rank, *quality))
        .is_some_and(|(_, quality)| quality > refused)
}

fn pdf_range_specificity(range: &Mime) -> Option<u8> {
    let (kind, subtype) = (range.type_(), range.subtype());
    if kind == mime::APPLICATION && (subtype == mime::PDF || subtype == mime::OCTET_STREAM) {
        Some(2)
    } else if kind == mime::APPLICATION && subtype == mime::STAR {
        Some(1)
    } else if kind == mime::STAR && subtype == mime::STAR {
        Some(0)
    } else {
        None
    }
}

/// Makes a title safe to use as a file name. Idempotent.
pub fn sanitize_filename(title: &str) -> String {
    let replaced = UNSAFE_FILENAME_CHARS.replace_all(title, "_");
    let collapsed = REPEATED_UNDERSCORES.replace_all(&replaced, "_");
    let trimmed = collapsed.trim_matches('_');

    if trimmed.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// `<SanitizedTitle>_<YYYY-MM-DD_HH-MM>.pdf`
pub fn export_filename(title: &str, generated_at: NaiveDateTime) -> String {
    format!(
        "{}_{}.pdf",
        sanitize_filename(title),
        generated_at.format("%Y-%m-%d_%H-%M")
    )
}
