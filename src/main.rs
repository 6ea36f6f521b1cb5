//! ToyRent backend server
//!
//! Toy rental lifecycle, payment checkout and gateway reconciliation over
//! a PostgreSQL store.

use actix_cors::Cors;
use actix_web::{http::header, middleware, web, App, HttpResponse, HttpServer};
use std::env;
use std::io;
use std::sync::Arc;
use toyrent_api::{configure, AppState};
use toyrent_core::AppConfig;
use toyrent_db::{
    create_pool, run_migrations, PgInventoryRepository, PgPaymentRepository, PgRentalRepository,
};
use toyrent_gateway::SnapGatewayClient;
use toyrent_services::{PaymentConfig, PaymentService, RentalService};
use tracing::{error, info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging
fn init_tracing() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "toyrent={lvl},toyrent_api={lvl},toyrent_services={lvl},toyrent_db={lvl},toyrent_gateway={lvl},actix_web=info,sqlx=warn",
            lvl = log_level
        ))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    error!("{}: {}", context, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting ToyRent backend v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load().map_err(|e| startup_error("Invalid configuration", e))?;

    info!("Connecting to database...");
    let pool = create_pool(&config.database)
        .await
        .map_err(|e| startup_error("Failed to create database pool", e))?;

    if config.database.run_migrations {
        run_migrations(&pool)
            .await
            .map_err(|e| startup_error("Failed to run migrations", e))?;
    } else {
        warn!("Skipping database migrations");
    }

    let gateway = SnapGatewayClient::new(&config.gateway)
        .map_err(|e| startup_error("Failed to build gateway client", e))?;
    info!(
        environment = ?config.gateway.environment,
        strict = config.gateway.strict_callback_verification,
        "Payment gateway configured"
    );

    let rental_repo = Arc::new(PgRentalRepository::new(pool.clone()));
    let payments = Arc::new(PaymentService::new(
        rental_repo.clone(),
        Arc::new(PgPaymentRepository::new(pool.clone())),
        Arc::new(gateway),
        PaymentConfig::from(&config.gateway),
    ));
    let rentals = Arc::new(RentalService::new(
        rental_repo,
        Arc::new(PgInventoryRepository::new(pool.clone())),
        payments.clone(),
        config.rental.clone(),
    ));
    let state = AppState::new(rentals, payments);

    let cors_origins = env::var("CORS_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string());

    let bind_addr = config.server_addr();
    let workers = config.server.workers;
    info!(
        "Starting HTTP server on {} with {} workers",
        bind_addr, workers
    );

    HttpServer::new(move || {
        let cors_origins_inner = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _req_head| {
                let origins: Vec<&str> = cors_origins_inner.split(',').collect();
                if let Ok(origin_str) = origin.to_str() {
                    origins.iter().any(|o| o.trim() == origin_str)
                } else {
                    false
                }
            })
            .allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
            .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(cors)
            .wrap(TracingLogger::default())
            .wrap(middleware::NormalizePath::trim())
            .configure(configure)
            .route(
                "/",
                web::get().to(|| async {
                    HttpResponse::Found()
                        .append_header(("Location", "/api/v1/health"))
                        .finish()
                }),
            )
    })
    .workers(workers)
    .client_request_timeout(std::time::Duration::from_secs(config.server.timeout_secs))
    .bind(&bind_addr)?
    .run()
    .await
}
