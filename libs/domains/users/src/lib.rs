//! Users Domain
//!
//! User management behind a claims-based access model.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints, status mapping
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Hooks, call-site error context
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │    Store    │  ← Validation, access checks, error classification
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← Persistence port (in-memory, Postgres)
//! └─────────────┘
//! ```
//!
//! Every error carries an [`ErrorKind`] that survives the context each layer
//! adds on the way up.
//!
//! # Usage
//!
//! ```rust,no_run
//! use axum_helpers::{JwtAuth, JwtConfig};
//! use domain_users::{
//!     AuditHook, CredentialEngine, InMemoryUserRepository, UserService, UserStore, handlers,
//! };
//!
//! let jwt = JwtAuth::new(&JwtConfig::new("a-development-secret-of-32-chars!!"));
//! let store = UserStore::new(InMemoryUserRepository::new(), CredentialEngine::default(), jwt.issuer());
//! let service = UserService::new(store).with_hook(AuditHook);
//!
//! let router = handlers::router(service, jwt);
//! ```

pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod handlers;
pub mod hooks;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;
pub mod store;

pub use auth::{CLAIMS_TTL, Claims};
pub use config::HashingConfig;
pub use credentials::CredentialEngine;
pub use error::{ErrorKind, ResultExt, UserError, UserResult};
pub use hooks::{AuditHook, Operation, OperationContext, OperationHook, Outcome};
pub use models::{
    Credentials, Field, NewUser, PageQuery, Role, TokenResponse, UpdateUser, User, UserResponse,
};
pub use postgres::PostgresUserRepository;
pub use repository::{InMemoryUserRepository, RepositoryError, UniqueKey, UserRepository};
pub use service::UserService;
pub use store::UserStore;
