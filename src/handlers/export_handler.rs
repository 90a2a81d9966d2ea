use actix_web::{
    http::header::{self, Accept, ContentDisposition},
    post, web, HttpMessage, HttpRequest, HttpResponse,
};
use validator::Validate;

use crate::{
    errors::{AppError, PdfError},
    middleware::get_request_id,
    models::{
        domain::Document,
        dto::{
            request::{ExportRequest, FormatRequest},
            response::FormatResponse,
        },
    },
    services::{
        document_formatter::DocumentFormatter,
        pdf_service::{accepts_pdf, PdfService},
    },
};

pub const PAGE_COUNT_HEADER: &str = "x-pdf-pages";

#[post("/api/format")]
pub async fn format_questions(request: web::Json<FormatRequest>) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    request.validate()?;

    let documents = DocumentFormatter::format(&request.questions, request.output_format);
    Ok(HttpResponse::Ok().json(FormatResponse { documents }))
}

#[post("/api/export")]
pub async fn export_pdf(
    req: HttpRequest,
    request: web::Json<ExportRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    request.validate()?;

    if !accepts_pdf(req.get_header::<Accept>().as_ref()) {
        let accept = req
            .headers()
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        log::warn!(
            "[{}] export refused, client accepts only {:?}",
            get_request_id(&req).unwrap_or_default(),
            accept
        );
        return Err(PdfError::UnsupportedBrowser(accept).into());
    }

    let document = Document::from(request.document);
    let include_header = request.include_header;
    let generated_at = chrono::Local::now().naive_local();

    let export = web::block(move || PdfService::export(&document, include_header, generated_at))
        .await
        .map_err(|e| AppError::InternalError(format!("PDF worker failed: {}", e)))?
        .map_err(|e| {
            log::error!(
                "[{}] export failed: {}",
                get_request_id(&req).unwrap_or_default(),
                e
            );
            AppError::from(e)
        })?;

    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header(ContentDisposition::attachment(export.filename))
        .insert_header((PAGE_COUNT_HEADER, export.page_count.to_string()))
        .body(export.bytes))
}
