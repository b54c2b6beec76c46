use axum::Router;
use axum_helpers::JwtAuth;
use database::postgres::DatabaseConnection;
use domain_users::{
    AuditHook, CredentialEngine, PostgresUserRepository, UserService, UserStore, handlers,
};

pub mod health;

/// API routes without the `/api` prefix; `create_router` adds it.
pub fn routes(db: DatabaseConnection, credentials: CredentialEngine, jwt: JwtAuth) -> Router {
    let store = UserStore::new(PostgresUserRepository::new(db), credentials, jwt.issuer());
    let service = UserService::new(store).with_hook(AuditHook);

    Router::new().nest("/users", handlers::router(service, jwt))
}
