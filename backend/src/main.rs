mod config;
mod db;
mod import;
mod job_controller;
mod services;

use crate::config::AppConfig;
use crate::db::SqliteStore;
use crate::job_controller::state::JobsState;
use crate::services::AppState;
use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::info;
use std::io;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = AppConfig::load().map_err(|e| io::Error::other(e.to_string()))?;
    let store =
        SqliteStore::open(&config.database_path).map_err(|e| io::Error::other(e.to_string()))?;
    info!("Database ready at {}", store.path().display());

    let (jobs_state, rx) = JobsState::new();
    let updater_state = jobs_state.clone();
    tokio::spawn(async move {
        job_controller::state::start_job_updater(updater_state, rx).await;
    });

    let app_state = AppState {
        store: Arc::new(store),
        import: config.import,
    };
    let allowed_origin = config.allowed_origin.clone();
    let json_limit = config.import.max_upload_bytes;

    let (host, port) = config.bind_address();
    info!("Server running at http://{host}:{port}");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&allowed_origin)
            .allow_any_method()
            .allow_any_header()
            .supports_credentials();

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::JsonConfig::default().limit(json_limit))
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::Data::new(jobs_state.clone()))
            .route("/", web::get().to(services::home))
            .service(services::imports::configure_routes())
            .configure(services::imports::configure_legacy_routes)
            .service(services::instructors::configure_routes())
            .service(services::departments::configure_routes())
            .service(services::subjects::configure_routes())
            .service(services::availability::configure_routes())
    })
    .bind((host, port))?
    .run()
    .await
}
