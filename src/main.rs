use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};

use tutorati_server::{
    app_state::AppState, config::Config, handlers, middleware::RequestIdMiddleware,
};

fn cors_for(allowed_origin: Option<&str>) -> Cors {
    match allowed_origin {
        Some(origin) => Cors::default()
            .allowed_origin(origin)
            .allowed_methods(vec!["GET", "POST"])
            .allow_any_header()
            .expose_headers(vec!["content-disposition", "x-request-id", "x-vercel-ai-data-stream"])
            .max_age(3600),
        None => Cors::permissive(),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    config.validate_for_production();

    let host = config.web_server_host.clone();
    let port = config.web_server_port;
    let allowed_origin = config.allowed_origin.clone();

    log::info!(
        "Starting tutorati-server on {}:{} (model {}, response limit {}s)",
        host,
        port,
        config.openai_model,
        config.max_response_seconds
    );
    if allowed_origin.is_none() {
        log::warn!("ALLOWED_ORIGIN is not set, CORS is permissive");
    }

    let state = web::Data::new(AppState::new(config));

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(cors_for(allowed_origin.as_deref()))
            .wrap(RequestIdMiddleware)
            .wrap(Logger::default())
            .configure(handlers::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
