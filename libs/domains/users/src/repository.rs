use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::BoxError;
use crate::models::User;

/// Unique key a write collided with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueKey {
    Id,
    Email,
}

impl std::fmt::Display for UniqueKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UniqueKey::Id => f.write_str("user_id"),
            UniqueKey::Email => f.write_str("email"),
        }
    }
}

/// Failures reported by a persistence backend, before domain classification.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("no rows in result set")]
    NoRows,

    #[error("unique constraint violated on {0}")]
    UniqueViolation(UniqueKey),

    /// The backend cannot serve any further request.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Backend(BoxError),
}

/// Persistence port for users
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: &User) -> Result<(), RepositoryError>;

    /// Overwrite every mutable column. `NoRows` if the user is gone.
    async fn replace(&self, user: &User) -> Result<(), RepositoryError>;

    /// `NoRows` if nothing was deleted.
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;

    /// Users ordered by ID ascending.
    async fn list(&self, offset: u64, limit: u64) -> Result<Vec<User>, RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<User, RepositoryError>;

    async fn find_by_email(&self, email: &str) -> Result<User, RepositoryError>;
}

/// In-memory backend for development and tests
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<BTreeMap<Uuid, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(users: &BTreeMap<Uuid, User>, candidate: &User) -> bool {
    users
        .values()
        .any(|u| u.id != candidate.id && u.email == candidate.email)
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: &User) -> Result<(), RepositoryError> {
        let mut users = self.users.write().await;

        if users.contains_key(&user.id) {
            return Err(RepositoryError::UniqueViolation(UniqueKey::Id));
        }
        if email_taken(&users, user) {
            return Err(RepositoryError::UniqueViolation(UniqueKey::Email));
        }

        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn replace(&self, user: &User) -> Result<(), RepositoryError> {
        let mut users = self.users.write().await;

        if email_taken(&users, user) {
            return Err(RepositoryError::UniqueViolation(UniqueKey::Email));
        }

        match users.get_mut(&user.id) {
            Some(stored) => {
                *stored = user.clone();
                Ok(())
            }
            None => Err(RepositoryError::NoRows),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut users = self.users.write().await;
        users.remove(&id).map(|_| ()).ok_or(RepositoryError::NoRows)
    }

    async fn list(&self, offset: u64, limit: u64) -> Result<Vec<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<User, RepositoryError> {
        let users = self.users.read().await;
        users.get(&id).cloned().ok_or(RepositoryError::NoRows)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, RepositoryError> {
        let users = self.users.read().await;
        users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(RepositoryError::NoRows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::Utc;

    fn user(email: &str) -> User {
        User::new(
            "Test User".to_string(),
            email.to_string(),
            vec![Role::User],
            "hash".to_string(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let repo = InMemoryUserRepository::new();
        let created = user("test@example.com");
        repo.insert(&created).await.unwrap();

        assert_eq!(repo.find_by_id(created.id).await.unwrap(), created);
        assert_eq!(repo.find_by_email("test@example.com").await.unwrap(), created);
        assert!(matches!(
            repo.find_by_email("other@example.com").await,
            Err(RepositoryError::NoRows)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_unique_violation() {
        let repo = InMemoryUserRepository::new();
        repo.insert(&user("test@example.com")).await.unwrap();

        let result = repo.insert(&user("test@example.com")).await;
        assert!(matches!(
            result,
            Err(RepositoryError::UniqueViolation(UniqueKey::Email))
        ));
    }

    #[tokio::test]
    async fn test_replace_and_delete_missing_rows() {
        let repo = InMemoryUserRepository::new();
        let ghost = user("ghost@example.com");

        assert!(matches!(repo.replace(&ghost).await, Err(RepositoryError::NoRows)));
        assert!(matches!(repo.delete(ghost.id).await, Err(RepositoryError::NoRows)));
    }

    #[tokio::test]
    async fn test_replace_rejects_taken_email() {
        let repo = InMemoryUserRepository::new();
        let first = user("first@example.com");
        let mut second = user("second@example.com");
        repo.insert(&first).await.unwrap();
        repo.insert(&second).await.unwrap();

        second.email = first.email.clone();
        assert!(matches!(
            repo.replace(&second).await,
            Err(RepositoryError::UniqueViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_id() {
        let repo = InMemoryUserRepository::new();
        for i in 0..5 {
            repo.insert(&user(&format!("u{i}@example.com"))).await.unwrap();
        }

        let all = repo.list(0, 10).await.unwrap();
        assert_eq!(all.len(), 5);
        assert!(all.windows(2).all(|pair| pair[0].id < pair[1].id));

        let page = repo.list(2, 2).await.unwrap();
        assert_eq!(page, all[2..4].to_vec());
    }
}
