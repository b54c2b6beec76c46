use axum_helpers::server::{
    ShutdownCoordinator, ShutdownReason, create_production_app, health_router,
};
use axum_helpers::JwtAuth;
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_users::CredentialEngine;
use migration::Migrator;
use tracing::info;

mod api;
mod config;
mod openapi;

use config::Config;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Before any fallible operation, so config errors are colored too
    install_color_eyre();

    let config = Config::from_env()?;

    init_tracing(&config.environment);

    let credentials = CredentialEngine::new(&config.hashing)
        .map_err(|e| eyre::eyre!("Invalid password hashing parameters: {}", e))?;
    let jwt = JwtAuth::new(&config.jwt);

    let db = database::postgres::connect_from_config_with_retry(config.database.clone(), None)
        .await
        .map_err(|e| eyre::eyre!("PostgreSQL connection failed: {}", e))?;

    database::postgres::run_migrations::<Migrator>(&db, config.app.name)
        .await
        .map_err(|e| eyre::eyre!("Migrations failed: {}", e))?;

    let (coordinator, _shutdown_rx) = ShutdownCoordinator::new();

    let api_routes = api::routes(db.clone(), credentials, jwt);
    let router = axum_helpers::create_router::<openapi::ApiDoc>(api_routes, coordinator.clone());

    // /health: liveness with name and version
    // /ready: database ping
    let app = router
        .merge(health_router(config.app.clone()))
        .merge(api::health::ready_router(db.clone()));

    info!(
        "Starting users API (shutdown timeout {:?})",
        config.shutdown_timeout
    );

    create_production_app(
        app,
        &config.server,
        coordinator.clone(),
        config.shutdown_timeout,
        async move {
            info!("Shutting down: closing database connections");
            match db.close().await {
                Ok(_) => info!("PostgreSQL connection closed successfully"),
                Err(e) => tracing::error!("Error closing PostgreSQL: {}", e),
            }
        },
    )
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    if let Some(ShutdownReason::Requested(reason)) = coordinator.reason() {
        return Err(eyre::eyre!("Shutdown requested after fatal error: {}", reason));
    }

    info!("Users API shutdown complete");
    Ok(())
}
