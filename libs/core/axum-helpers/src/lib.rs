//! # Axum Helpers
//!
//! Shared HTTP plumbing for the users service.
//!
//! - **[`auth`]**: stateless HS256 JWT signing, verification and middleware
//! - **[`server`]**: router assembly, health checks, graceful shutdown
//! - **[`errors`]**: structured error responses with error codes
//! - **[`extractors`]**: validated JSON bodies
//! - **[`audit`]**: audit logging on a dedicated target

pub mod audit;
pub mod auth;
pub mod errors;
pub mod extractors;
pub mod server;

pub use auth::{JwtAuth, JwtConfig, jwt_auth_middleware, optional_jwt_auth_middleware};

pub use server::{
    HealthCheckFuture, HealthResponse, ShutdownCoordinator, ShutdownReason, create_production_app,
    create_router, escalate_fatal_errors, health_router, run_health_checks,
};

pub use errors::{AppError, ErrorCode, ErrorResponse, FatalError};

pub use extractors::ValidatedJson;

pub use audit::{AuditEvent, AuditOutcome};
