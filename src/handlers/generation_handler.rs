use actix_web::{
    http::header::{CacheControl, CacheDirective},
    post,
    web::{self, Bytes},
    HttpRequest, HttpResponse,
};
use futures::StreamExt;
use validator::Validate;

use crate::{
    app_state::AppState,
    errors::AppError,
    middleware::get_request_id,
    models::dto::request::{GeneratePayload, VerifyPayload},
    services::data_stream::{self, DATA_STREAM_HEADER, DATA_STREAM_VERSION},
};

#[post("/api/generate")]
pub async fn generate_questions(
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: web::Json<GeneratePayload>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    payload.validate()?;

    log::info!(
        "[{}] generate request for {} ({:?})",
        get_request_id(&req).unwrap_or_default(),
        payload.exam,
        payload.output_format
    );

    let stream = state.question_service.generate(&payload).await?;

    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .insert_header(CacheControl(vec![CacheDirective::NoCache]))
        .streaming(stream.map(|delta| delta.map(Bytes::from))))
}

#[post("/api/verify")]
pub async fn verify_questions(
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: web::Json<VerifyPayload>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    payload.validate()?;

    log::info!(
        "[{}] verify request for {} questions",
        get_request_id(&req).unwrap_or_default(),
        payload.questions.len()
    );

    let stream = state.question_service.verify(&payload).await?;
    let framed = data_stream::encode_stream(stream)
        .map(|part| Ok::<_, AppError>(Bytes::from(part)));

    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .insert_header((DATA_STREAM_HEADER, DATA_STREAM_VERSION))
        .insert_header(CacheControl(vec![CacheDirective::NoCache]))
        .streaming(framed))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{http::StatusCode, test, App};
    use futures::stream;

    use super::*;
    use crate::{
        config::Config,
        errors::{AppResult, ErrorResponse},
        handlers::configure,
        services::model_service::{MockLanguageModel, TextStream},
    };

    fn text_stream(parts: &[&str]) -> TextStream {
        let parts: Vec<AppResult<String>> = parts.iter().map(|p| Ok(p.to_string())).collect();
        stream::iter(parts).boxed()
    }

    fn state_with(model: MockLanguageModel) -> web::Data<AppState> {
        web::Data::new(AppState::with_model(Config::test_config(), Arc::new(model)))
    }

    fn generate_body() -> serde_json::Value {
        serde_json::json!({
            "exam": "NEET",
            "classStandard": "11th",
            "count": 2,
            "difficulty": "Beginner",
            "type": "Subjective",
            "outputFormat": "assignment-format"
        })
    }

    #[actix_web::test]
    async fn generate_streams_plain_text() {
        let mut model = MockLanguageModel::new();
        model
            .expect_stream_text()
            .times(1)
            .returning(|_| Ok(text_stream(&["[{\"id\":", "\"1\"}]"])));

        let app = test::init_service(App::new().app_data(state_with(model)).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/api/generate")
            .set_json(generate_body())
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("content-type").and_then(|v| v.to_str().ok()),
            Some("text/plain; charset=utf-8")
        );
        let body = test::read_body(resp).await;
        assert_eq!(body, Bytes::from_static(b"[{\"id\":\"1\"}]"));
    }

    #[actix_web::test]
    async fn generate_rejects_out_of_range_count() {
        let mut model = MockLanguageModel::new();
        model.expect_stream_text().never();

        let app = test::init_service(App::new().app_data(state_with(model)).configure(configure)).await;
        let mut body = generate_body();
        body["count"] = serde_json::json!(0);
        let req = test::TestRequest::post().uri("/api/generate").set_json(body).to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(error.code, "VALIDATION_ERROR");
        assert!(error.details.get("count").is_some());
    }

    #[actix_web::test]
    async fn generate_rejects_unknown_enum_value() {
        let app = test::init_service(
            App::new()
                .app_data(state_with(MockLanguageModel::new()))
                .configure(configure),
        )
        .await;
        let mut body = generate_body();
        body["difficulty"] = serde_json::json!("Legendary");
        let req = test::TestRequest::post().uri("/api/generate").set_json(body).to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(error.code, "VALIDATION_ERROR");
    }

    #[actix_web::test]
    async fn generate_reports_provider_failure() {
        let mut model = MockLanguageModel::new();
        model
            .expect_stream_text()
            .times(2)
            .returning(|_| Err(AppError::UpstreamError("rate limited".to_string())));

        let app = test::init_service(App::new().app_data(state_with(model)).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/api/generate")
            .set_json(generate_body())
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let error: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(error.code, "UPSTREAM_ERROR");
    }

    #[actix_web::test]
    async fn verify_frames_output_as_data_stream() {
        let mut model = MockLanguageModel::new();
        model
            .expect_stream_text()
            .times(1)
            .returning(|_| Ok(text_stream(&["VERDICT", ": OK"])));

        let app = test::init_service(App::new().app_data(state_with(model)).configure(configure)).await;
        let req = test::TestRequest::post()
            .uri("/api/verify")
            .set_json(serde_json::json!({
                "questions": [{
                    "id": "q1",
                    "question": "What is the SI unit of force?",
                    "answer": "Newton",
                    "difficulty": "Beginner",
                    "subject": "Physics"
                }]
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(DATA_STREAM_HEADER).and_then(|v| v.to_str().ok()),
            Some(DATA_STREAM_VERSION)
        );
        let body = test::read_body(resp).await;
        let decoded = data_stream::decode(&String::from_utf8_lossy(&body));
        assert_eq!(decoded.text, "VERDICT: OK");
        assert!(decoded.is_finished());
    }

    #[actix_web::test]
    async fn verify_rejects_empty_question_list() {
        let app = test::init_service(
            App::new()
                .app_data(state_with(MockLanguageModel::new()))
                .configure(configure),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/api/verify")
            .set_json(serde_json::json!({ "questions": [] }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
