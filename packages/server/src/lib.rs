#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the road hazard system.
//!
//! Exposes hazard reports, proximity and route matching, route analysis,
//! and crowd verification as a JSON API. Hazards are kept in a JSON file
//! store, with an in-memory store taking over when the file cannot be
//! used.

mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use road_hazard_analytics::RouteMatcher;
use road_hazard_config::{AppConfig, ConfigError};
use road_hazard_navigation::NavigationConfig;
use road_hazard_prediction::PredictionEngine;
use road_hazard_store::{FallbackStore, FileStore, HazardStore, MemoryStore};
use road_hazard_verification::VerificationService;
use thiserror::Error;

/// Errors that can stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Binding or running the HTTP server failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state.
pub struct AppState {
    /// Hazard storage, primary or fallback.
    pub store: Arc<FallbackStore>,
    /// Vote and removal workflow over [`Self::store`].
    pub verification: VerificationService,
    pub matcher: RouteMatcher,
    pub prediction: PredictionEngine,
    /// Look-ahead and warning distances used as request defaults.
    pub navigation: NavigationConfig,
}

impl AppState {
    /// Builds state over an explicit pair of stores.
    pub async fn with_stores(
        config: &AppConfig,
        primary: Arc<dyn HazardStore>,
        fallback: Arc<dyn HazardStore>,
    ) -> Self {
        let store = Arc::new(FallbackStore::select(primary, fallback).await);
        Self {
            verification: VerificationService::new(store.clone(), config.verification),
            store,
            matcher: RouteMatcher::new(config.matching),
            prediction: PredictionEngine::new(config.prediction),
            navigation: config.navigation,
        }
    }

    /// Builds state with the file store from `config` as primary and an
    /// in-memory fallback.
    pub async fn from_config(config: &AppConfig) -> Self {
        let primary = Arc::new(FileStore::new(config.store.data_file.clone()));
        let fallback = Arc::new(MemoryStore::with_id_prefix(
            config.store.fallback_id_prefix.clone(),
        ));
        Self::with_stores(config, primary, fallback).await
    }
}

/// Registers every API route under `/api`.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/hazards", web::get().to(handlers::list_hazards))
            .route("/hazards", web::post().to(handlers::create_hazard))
            .route("/hazards/nearby", web::get().to(handlers::nearby))
            .route(
                "/hazards/detections",
                web::post().to(handlers::confirm_detection),
            )
            .route("/hazards/{id}", web::get().to(handlers::get_hazard))
            .route("/hazards/{id}/votes", web::post().to(handlers::vote))
            .route(
                "/hazards/{id}/removal",
                web::post().to(handlers::request_removal),
            )
            .route("/hazards/{id}/stats", web::get().to(handlers::stats))
            .route("/route/ahead", web::post().to(handlers::route_ahead))
            .route("/route/summary", web::post().to(handlers::route_summary))
            .route("/route/segment", web::post().to(handlers::route_segment))
            .route("/route/analyze", web::post().to(handlers::analyze_route))
            .route("/prompt", web::get().to(handlers::prompt))
            .route("/prompt/skip", web::post().to(handlers::skip_prompt))
            .route("/store/retry", web::post().to(handlers::retry_store)),
    );
}

/// Starts the road hazard API server.
///
/// Selects the hazard store, then serves on `BIND_ADDR`:`PORT`
/// (default `127.0.0.1:8080`). This is a regular async function; the
/// caller provides the runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns [`ServerError::Io`] if the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: AppConfig) -> Result<(), ServerError> {
    log::info!("Selecting hazard store...");
    let state = web::Data::new(AppState::from_config(&config).await);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(routes)
    })
    .bind((bind_addr, port))?
    .run()
    .await?;

    Ok(())
}
