pub mod export_handler;
pub mod generation_handler;
pub mod health_handler;

use actix_web::web;

use crate::errors::AppError;

pub use export_handler::{export_pdf, format_questions};
pub use generation_handler::{generate_questions, verify_questions};
pub use health_handler::health_check;

const JSON_LIMIT_BYTES: usize = 2 * 1024 * 1024;

/// Registers every route. Malformed JSON bodies surface as validation errors.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(JSON_LIMIT_BYTES)
            .error_handler(|err, _req| AppError::from(err).into()),
    )
    .service(health_check)
    .service(generate_questions)
    .service(verify_questions)
    .service(format_questions)
    .service(export_pdf);
}
