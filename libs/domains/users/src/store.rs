//! Record store: validates input, enforces access rules, talks to the
//! repository and classifies what comes back.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{CLAIMS_TTL, Claims};
use crate::credentials::CredentialEngine;
use crate::error::{ResultExt, UserError, UserResult};
use crate::models::{NewUser, Role, UpdateUser, User, parse_roles};
use crate::repository::{RepositoryError, UniqueKey, UserRepository};

pub struct UserStore<R: UserRepository> {
    repository: Arc<R>,
    credentials: CredentialEngine,
    issuer: String,
}

impl<R: UserRepository> Clone for UserStore<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            credentials: self.credentials.clone(),
            issuer: self.issuer.clone(),
        }
    }
}

/// Turn a backend failure into the domain error callers match on.
pub fn classify(err: RepositoryError) -> UserError {
    match err {
        RepositoryError::NoRows => UserError::NotFound,
        RepositoryError::UniqueViolation(UniqueKey::Email) => {
            UserError::validation("email is already in use")
        }
        RepositoryError::UniqueViolation(UniqueKey::Id) => {
            UserError::validation("user already exists")
        }
        RepositoryError::Unavailable(reason) => UserError::ShutdownRequested(reason),
        RepositoryError::Backend(cause) => UserError::Unexpected(cause),
    }
}

fn parse_id(id: &str) -> UserResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| UserError::InvalidIdentifier)
}

impl<R: UserRepository> UserStore<R> {
    pub fn new(repository: R, credentials: CredentialEngine, issuer: impl Into<String>) -> Self {
        Self::from_arc(Arc::new(repository), credentials, issuer)
    }

    pub fn from_arc(
        repository: Arc<R>,
        credentials: CredentialEngine,
        issuer: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            credentials,
            issuer: issuer.into(),
        }
    }

    pub fn credentials(&self) -> &CredentialEngine {
        &self.credentials
    }

    #[instrument(skip(self, new_user), fields(email = %new_user.email))]
    pub async fn create(&self, new_user: NewUser, now: DateTime<Utc>) -> UserResult<User> {
        new_user.validate()?;
        let roles = parse_roles(&new_user.roles)?;

        let hash = self.credentials.hash(&new_user.password).await?;
        let user = User::new(new_user.name, new_user.email, roles, hash, now);

        self.repository
            .insert(&user)
            .await
            .map_err(classify)
            .with_context(|| format!("inserting user[{}]", user.id))?;

        tracing::info!(user_id = %user.id, "Created user");
        Ok(user)
    }

    /// Merge the present attributes of `update` into the stored user.
    #[instrument(skip(self, claims, update), fields(user_id = %id))]
    pub async fn update(
        &self,
        claims: &Claims,
        id: &str,
        update: UpdateUser,
        now: DateTime<Utc>,
    ) -> UserResult<()> {
        let uid = parse_id(id)?;
        update.check()?;
        let roles = update.roles.try_map(|names| parse_roles(&names))?;

        if !claims.can_access(&uid.to_string()) {
            return Err(UserError::Forbidden);
        }
        if !roles.is_absent() && !claims.is_authorized(Role::Admin) {
            return Err(UserError::Forbidden);
        }

        let mut user = self
            .repository
            .find_by_id(uid)
            .await
            .map_err(classify)
            .with_context(|| format!("updating user[{uid}]"))?;

        update.name.apply_to(&mut user.name);
        update.email.apply_to(&mut user.email);
        roles.apply_to(&mut user.roles);
        if let Some(password) = update.password.as_value() {
            user.password_hash = self.credentials.hash(password).await?;
        }
        user.date_updated = now;

        self.repository
            .replace(&user)
            .await
            .map_err(classify)
            .with_context(|| format!("updating user[{uid}]"))?;

        tracing::info!(user_id = %uid, "Updated user");
        Ok(())
    }

    #[instrument(skip(self, claims), fields(user_id = %id))]
    pub async fn delete(&self, claims: &Claims, id: &str) -> UserResult<()> {
        let uid = parse_id(id)?;

        if !claims.can_access(&uid.to_string()) {
            return Err(UserError::Forbidden);
        }

        self.repository
            .delete(uid)
            .await
            .map_err(classify)
            .with_context(|| format!("deleting user[{uid}]"))?;

        tracing::info!(user_id = %uid, "Deleted user");
        Ok(())
    }

    /// One page of users ordered by ID. Both arguments are 1-based.
    #[instrument(skip(self))]
    pub async fn query(&self, page_number: i64, rows_per_page: i64) -> UserResult<Vec<User>> {
        if page_number < 1 {
            return Err(UserError::validation("page: must be at least 1"));
        }
        if rows_per_page < 1 {
            return Err(UserError::validation("rows: must be at least 1"));
        }

        let offset = (page_number - 1)
            .checked_mul(rows_per_page)
            .ok_or_else(|| UserError::validation("page: out of range"))?;

        self.repository
            .list(offset as u64, rows_per_page as u64)
            .await
            .map_err(classify)
            .context("selecting users")
    }

    #[instrument(skip(self, claims), fields(user_id = %id))]
    pub async fn query_by_id(&self, claims: &Claims, id: &str) -> UserResult<User> {
        let uid = parse_id(id)?;

        if !claims.can_access(&uid.to_string()) {
            return Err(UserError::Forbidden);
        }

        self.repository
            .find_by_id(uid)
            .await
            .map_err(classify)
            .with_context(|| format!("selecting user[{uid}]"))
    }

    /// The owner is only known after the lookup, so access is checked last.
    #[instrument(skip(self, claims))]
    pub async fn query_by_email(&self, claims: &Claims, email: &str) -> UserResult<User> {
        let user = self
            .repository
            .find_by_email(email)
            .await
            .map_err(classify)
            .with_context(|| format!("selecting email[{email:?}]"))?;

        if !claims.can_access(&user.id.to_string()) {
            return Err(UserError::Forbidden);
        }

        Ok(user)
    }

    /// Exchange an email and password for claims valid from `now` for an hour.
    ///
    /// An unknown email and a wrong password are indistinguishable to the
    /// caller.
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        now: DateTime<Utc>,
        email: &str,
        password: &str,
    ) -> UserResult<Claims> {
        let user = match self.repository.find_by_email(email).await {
            Ok(user) => user,
            Err(RepositoryError::NoRows) => return Err(UserError::AuthenticationFailure),
            Err(err) => {
                return Err(classify(err).context(format!("selecting email[{email:?}]")));
            }
        };

        if !self.credentials.verify(&user.password_hash, password).await {
            return Err(UserError::AuthenticationFailure);
        }

        Ok(Claims::issue(
            user.id.to_string(),
            user.roles,
            self.issuer.as_str(),
            now,
            CLAIMS_TTL,
        ))
    }
}
