use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use tracing::instrument;

use crate::auth::Claims;
use crate::error::{ErrorKind, ResultExt, UserError, UserResult};
use crate::hooks::{Operation, OperationContext, OperationHook, Outcome};
use crate::models::{NewUser, UpdateUser, User};
use crate::repository::UserRepository;
use crate::store::UserStore;

/// Business core for users.
///
/// Forwards to the [`UserStore`], running the registered hooks in order
/// around each call and labelling errors with the operation name.
pub struct UserService<R: UserRepository> {
    store: UserStore<R>,
    hooks: Vec<Arc<dyn OperationHook>>,
}

impl<R: UserRepository> Clone for UserService<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            hooks: self.hooks.clone(),
        }
    }
}

impl<R: UserRepository> UserService<R> {
    pub fn new(store: UserStore<R>) -> Self {
        Self {
            store,
            hooks: Vec::new(),
        }
    }

    /// Append a hook. Hooks run in registration order.
    pub fn with_hook(mut self, hook: impl OperationHook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    async fn run<T, F>(&self, ctx: OperationContext, call: F) -> UserResult<T>
    where
        F: Future<Output = UserResult<T>>,
    {
        let label = ctx.operation.as_str();

        for hook in &self.hooks {
            hook.before(&ctx).await.context(label)?;
        }

        let result = call.await;

        let outcome = match &result {
            Ok(_) => Outcome::Success,
            Err(err) => Outcome::Failed(err.kind()),
        };
        for hook in &self.hooks {
            hook.after(&ctx, outcome).await;
        }

        result.context(label)
    }

    #[instrument(skip_all)]
    pub async fn create(&self, new_user: NewUser, now: DateTime<Utc>) -> UserResult<User> {
        let ctx = OperationContext::new(Operation::Create).target(new_user.email.as_str());
        self.run(ctx, self.store.create(new_user, now)).await
    }

    #[instrument(skip(self, claims, update), fields(actor = %claims.sub))]
    pub async fn update(
        &self,
        claims: &Claims,
        id: &str,
        update: UpdateUser,
        now: DateTime<Utc>,
    ) -> UserResult<()> {
        let ctx = OperationContext::new(Operation::Update)
            .actor(claims.sub.as_str())
            .target(id);
        self.run(ctx, self.store.update(claims, id, update, now)).await
    }

    #[instrument(skip(self, claims), fields(actor = %claims.sub))]
    pub async fn delete(&self, claims: &Claims, id: &str) -> UserResult<()> {
        let ctx = OperationContext::new(Operation::Delete)
            .actor(claims.sub.as_str())
            .target(id);
        self.run(ctx, self.store.delete(claims, id)).await
    }

    #[instrument(skip(self))]
    pub async fn query(&self, page_number: i64, rows_per_page: i64) -> UserResult<Vec<User>> {
        let ctx = OperationContext::new(Operation::Query);
        self.run(ctx, self.store.query(page_number, rows_per_page)).await
    }

    /// A missing user is reported as a bare [`UserError::NotFound`].
    #[instrument(skip(self, claims), fields(actor = %claims.sub))]
    pub async fn query_by_id(&self, claims: &Claims, id: &str) -> UserResult<User> {
        let ctx = OperationContext::new(Operation::QueryById)
            .actor(claims.sub.as_str())
            .target(id);
        self.run(ctx, self.store.query_by_id(claims, id))
            .await
            .map_err(not_found_to_core)
    }

    /// A missing user is reported as a bare [`UserError::NotFound`].
    #[instrument(skip(self, claims), fields(actor = %claims.sub))]
    pub async fn query_by_email(&self, claims: &Claims, email: &str) -> UserResult<User> {
        let ctx = OperationContext::new(Operation::QueryByEmail)
            .actor(claims.sub.as_str())
            .target(email);
        self.run(ctx, self.store.query_by_email(claims, email))
            .await
            .map_err(not_found_to_core)
    }

    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        now: DateTime<Utc>,
        email: &str,
        password: &str,
    ) -> UserResult<Claims> {
        let ctx = OperationContext::new(Operation::Authenticate).target(email);
        self.run(ctx, self.store.authenticate(now, email, password))
            .await
    }
}

fn not_found_to_core(err: UserError) -> UserError {
    if err.kind() == ErrorKind::NotFound {
        tracing::debug!(error = %err, "user lookup found nothing");
        UserError::NotFound
    } else {
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CLAIMS_TTL;
    use crate::credentials::fast_engine;
    use crate::hooks::AuditHook;
    use crate::models::Role;
    use crate::repository::{InMemoryUserRepository, MockUserRepository, RepositoryError};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use uuid::Uuid;

    const ISSUER: &str = "users service";

    #[derive(Default)]
    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl OperationHook for Recorder {
        async fn before(&self, ctx: &OperationContext) -> UserResult<()> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{} before {}", self.name, ctx.operation));
            Ok(())
        }

        async fn after(&self, ctx: &OperationContext, outcome: Outcome) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{} after {} {:?}", self.name, ctx.operation, outcome));
        }
    }

    struct Veto;

    #[async_trait]
    impl OperationHook for Veto {
        async fn before(&self, ctx: &OperationContext) -> UserResult<()> {
            match ctx.operation {
                Operation::Delete => Err(UserError::Forbidden),
                _ => Ok(()),
            }
        }
    }

    fn service() -> UserService<InMemoryUserRepository> {
        UserService::new(UserStore::new(
            InMemoryUserRepository::new(),
            fast_engine(),
            ISSUER,
        ))
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Bill Kennedy".into(),
            email: email.into(),
            roles: vec!["USER".into()],
            password: "gophers".into(),
            password_confirm: "gophers".into(),
        }
    }

    fn admin() -> Claims {
        Claims::issue("admin", vec![Role::Admin], ISSUER, Utc::now(), CLAIMS_TTL)
    }

    #[tokio::test]
    async fn test_hooks_run_in_order_around_the_call() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let service = service()
            .with_hook(Recorder {
                name: "first",
                log: Arc::clone(&log),
            })
            .with_hook(Recorder {
                name: "second",
                log: Arc::clone(&log),
            });

        service.create(new_user("bill@example.com"), Utc::now()).await.unwrap();
        let _ = service.query(0, 10).await;

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "first before create",
                "second before create",
                "first after create Success",
                "second after create Success",
                "first before query",
                "second before query",
                "first after query Failed(Validation)",
                "second after query Failed(Validation)",
            ]
        );
    }

    #[tokio::test]
    async fn test_before_hook_can_veto() {
        let service = service().with_hook(Veto);
        let created = service.create(new_user("bill@example.com"), Utc::now()).await.unwrap();
        let id = created.id.to_string();

        let err = service.delete(&admin(), &id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert!(err.to_string().starts_with("delete: "));

        assert!(service.query_by_id(&admin(), &id).await.is_ok());
    }

    #[tokio::test]
    async fn test_errors_carry_operation_context() {
        let service = service().with_hook(AuditHook);
        let id = Uuid::now_v7().to_string();

        let err = service.delete(&admin(), &id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(
            err.to_string(),
            format!("delete: deleting user[{id}]: user not found")
        );
    }

    #[tokio::test]
    async fn test_query_by_id_reraises_not_found() {
        let service = service();
        let id = Uuid::now_v7().to_string();

        let err = service.query_by_id(&admin(), &id).await.unwrap_err();
        assert!(matches!(err, UserError::NotFound));

        let err = service.query_by_email(&admin(), "nobody@example.com").await.unwrap_err();
        assert!(matches!(err, UserError::NotFound));
    }

    #[tokio::test]
    async fn test_update_missing_user_stays_not_found() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_id().returning(|_| Err(RepositoryError::NoRows));
        repo.expect_replace().never();
        let service = UserService::new(UserStore::new(repo, fast_engine(), ISSUER));

        let err = service
            .update(&admin(), &Uuid::now_v7().to_string(), UpdateUser::default(), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().starts_with("update: updating user["));
    }

    #[tokio::test]
    async fn test_authenticate_round_trip() {
        let service = service().with_hook(AuditHook);
        let created = service.create(new_user("bill@example.com"), Utc::now()).await.unwrap();

        let claims = service
            .authenticate(Utc::now(), "bill@example.com", "gophers")
            .await
            .unwrap();
        assert_eq!(claims.sub, created.id.to_string());

        let err = service
            .authenticate(Utc::now(), "bill@example.com", "wrong")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthenticationFailure);
    }
}
