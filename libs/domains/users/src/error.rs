use axum_helpers::AppError;
use thiserror::Error;
use validator::ValidationErrors;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Classification every [`UserError`] resolves to, however deeply wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidIdentifier,
    Forbidden,
    AuthenticationFailure,
    Validation,
    Unexpected,
    ShutdownRequested,
}

impl ErrorKind {
    /// Only unexpected failures are worth another attempt.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Unexpected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidIdentifier => "invalid_identifier",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::AuthenticationFailure => "authentication_failure",
            ErrorKind::Validation => "validation",
            ErrorKind::Unexpected => "unexpected",
            ErrorKind::ShutdownRequested => "shutdown_requested",
        }
    }
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("user not found")]
    NotFound,

    #[error("ID is not in its proper form")]
    InvalidIdentifier,

    #[error("attempted action is not allowed")]
    Forbidden,

    #[error("authentication failed")]
    AuthenticationFailure,

    #[error("validating data: {0}")]
    Validation(String),

    #[error(transparent)]
    Unexpected(BoxError),

    /// The backend is gone for good; the process should stop.
    #[error("shutdown requested: {0}")]
    ShutdownRequested(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<UserError>,
    },
}

pub type UserResult<T> = Result<T, UserError>;

impl UserError {
    pub fn unexpected(err: impl Into<BoxError>) -> Self {
        UserError::Unexpected(err.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        UserError::Validation(msg.into())
    }

    /// Wrap with call-site context. The kind is unchanged.
    pub fn context(self, context: impl Into<String>) -> Self {
        UserError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            UserError::Context { source, .. } => source.kind(),
            UserError::NotFound => ErrorKind::NotFound,
            UserError::InvalidIdentifier => ErrorKind::InvalidIdentifier,
            UserError::Forbidden => ErrorKind::Forbidden,
            UserError::AuthenticationFailure => ErrorKind::AuthenticationFailure,
            UserError::Validation(_) => ErrorKind::Validation,
            UserError::Unexpected(_) => ErrorKind::Unexpected,
            UserError::ShutdownRequested(_) => ErrorKind::ShutdownRequested,
        }
    }

    /// The error with every context layer peeled off.
    pub fn root(&self) -> &UserError {
        let mut current = self;
        while let UserError::Context { source, .. } = current {
            current = source;
        }
        current
    }

    /// Drop every context layer, keeping only the classified error.
    pub fn into_root(self) -> UserError {
        let mut current = self;
        while let UserError::Context { source, .. } = current {
            current = *source;
        }
        current
    }
}

impl From<ValidationErrors> for UserError {
    fn from(errors: ValidationErrors) -> Self {
        UserError::Validation(errors.to_string())
    }
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        let kind = err.kind();
        let message = err.root().to_string();
        match kind {
            ErrorKind::NotFound => AppError::NotFound(message),
            ErrorKind::InvalidIdentifier => AppError::InvalidIdentifier(message),
            ErrorKind::Validation => AppError::BadRequest(message),
            ErrorKind::Forbidden => AppError::Forbidden(message),
            ErrorKind::AuthenticationFailure => AppError::Unauthorized(message),
            ErrorKind::Unexpected => AppError::InternalServerError(err.to_string()),
            ErrorKind::ShutdownRequested => AppError::Shutdown(err.to_string()),
        }
    }
}

/// Context helpers on [`UserResult`].
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> UserResult<T>;

    fn with_context<F, C>(self, f: F) -> UserResult<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T> ResultExt<T> for UserResult<T> {
    fn context(self, context: impl Into<String>) -> UserResult<T> {
        self.map_err(|e| e.context(context))
    }

    fn with_context<F, C>(self, f: F) -> UserResult<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| e.context(f()))
    }
}
