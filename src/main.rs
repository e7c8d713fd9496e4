use std::net::SocketAddr;
use std::time::Duration;

use dotenvy::dotenv;
use tracing::{error, info};

use registrar::logging::{init_tracing, shutdown_tracer};
use registrar::metrics::{init_metrics, metrics_app};
use registrar::middleware::rate_limit::spawn_limiter_cleanup;
use registrar::router::init_router;
use registrar::state::init_app_state;

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_tracing();

    let state = init_app_state().await;
    if let Err(e) = registrar_db::run_migrations(&state.db).await {
        error!(error = %e, "Failed to run migrations");
        std::process::exit(1);
    }

    if state.rate_limit_config.enabled {
        spawn_limiter_cleanup(state.public_limiter.clone(), Duration::from_secs(60));
    }

    let mut app = init_router(state);
    match init_metrics() {
        Ok(Some(handle)) => {
            app = app.merge(metrics_app(handle));
            info!("Prometheus metrics available at /metrics");
        }
        Ok(None) => {}
        Err(e) => error!(error = %e, "Failed to initialize metrics"),
    }

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, %addr, "Failed to bind");
            std::process::exit(1);
        }
    };

    info!("Server running on http://localhost:{}", port);
    info!("Swagger UI available at http://localhost:{}/swagger-ui", port);
    info!("Scalar UI available at http://localhost:{}/scalar", port);

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    {
        error!(error = %e, "Server error");
    }

    shutdown_tracer();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
