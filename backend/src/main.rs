use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, http::header};
use image_classing::ml::HttpTrainer;
use image_classing::{AppConfig, AppState, db};
use std::env;
use std::sync::Arc;
use std::time::Duration;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(10 * 60);

fn startup_error(what: &str, err: impl std::fmt::Display) -> std::io::Error {
    log::error!("{}: {}", what, err);
    std::io::Error::other(format!("{}: {}", what, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = AppConfig::load().map_err(|e| startup_error("Configuration error", e))?;

    std::fs::create_dir_all(&config.storage.uploads_dir)?;
    let pool = db::connect(&config.storage.database_url)
        .await
        .map_err(|e| startup_error("Database connection failed", e))?;

    let trainer = HttpTrainer::new(&config.trainer)
        .map_err(|e| startup_error("Trainer client setup failed", e))?;
    log::info!("Model trainer at {}", config.trainer.base_url);

    let state = AppState::new(&config, pool, Arc::new(trainer));

    let sessions = state.sessions.clone();
    actix_web::rt::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match sessions.purge_expired().await {
                Ok(0) => {}
                Ok(count) => log::info!("Purged {} expired session(s)", count),
                Err(e) => log::error!("Failed to purge expired sessions: {:?}", e),
            }
        }
    });

    let bind_address = config.bind_address();
    let cors_origin = config.server.cors_origin.clone();
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allowed_origin(&cors_origin)
                    .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                    .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
                    .supports_credentials()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .configure(|cfg| state.configure(cfg))
    })
    .bind(&bind_address)?
    .run()
    .await
}
