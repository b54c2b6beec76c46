//! Extension points run by [`UserService`](crate::service::UserService)
//! around every store call.

use async_trait::async_trait;
use axum_helpers::{AuditEvent, AuditOutcome};

use crate::error::{ErrorKind, UserResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
    Query,
    QueryById,
    QueryByEmail,
    Authenticate,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Query => "query",
            Operation::QueryById => "query_by_id",
            Operation::QueryByEmail => "query_by_email",
            Operation::Authenticate => "authenticate",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a hook gets to see about a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationContext {
    pub operation: Operation,
    /// Subject of the caller's claims, if the operation takes claims
    pub actor: Option<String>,
    /// User ID or email the operation targets
    pub target: Option<String>,
}

impl OperationContext {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            actor: None,
            target: None,
        }
    }

    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed(ErrorKind),
}

/// Pre- and post-operation hook.
///
/// `before` may veto the call by returning an error. `after` runs once the
/// store has answered and cannot change the result.
#[async_trait]
pub trait OperationHook: Send + Sync {
    async fn before(&self, _ctx: &OperationContext) -> UserResult<()> {
        Ok(())
    }

    async fn after(&self, _ctx: &OperationContext, _outcome: Outcome) {}
}

/// Emits one audit event per completed operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct AuditHook;

impl AuditHook {
    pub fn event(ctx: &OperationContext, outcome: Outcome) -> AuditEvent {
        let audit_outcome = match outcome {
            Outcome::Success => AuditOutcome::Success,
            Outcome::Failed(ErrorKind::Forbidden | ErrorKind::AuthenticationFailure) => {
                AuditOutcome::Denied
            }
            Outcome::Failed(_) => AuditOutcome::Failure,
        };

        let event = AuditEvent::new(
            ctx.actor.clone(),
            format!("user.{}", ctx.operation),
            ctx.target.as_ref().map(|t| format!("user:{t}")),
            audit_outcome,
        );

        match outcome {
            Outcome::Failed(kind) => event.with_details(serde_json::json!({ "kind": kind.as_str() })),
            Outcome::Success => event,
        }
    }
}

#[async_trait]
impl OperationHook for AuditHook {
    async fn after(&self, ctx: &OperationContext, outcome: Outcome) {
        Self::event(ctx, outcome).log();
    }
}
