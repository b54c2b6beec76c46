use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ConnAcquireErr, ConnectionTrait, DatabaseConnection, DbBackend, DbErr, FromQueryResult,
    SqlErr, Statement,
};
use uuid::Uuid;

use crate::models::{User, parse_roles};
use crate::repository::{RepositoryError, UniqueKey, UserRepository};

const COLUMNS: &str = "user_id, name, email, roles, password_hash, date_created, date_updated";

/// Name Postgres gives the `UNIQUE` on `users.email`
const EMAIL_CONSTRAINT: &str = "users_email_key";

/// PostgreSQL backend using raw parameterized statements
#[derive(Clone)]
pub struct PostgresUserRepository {
    db: DatabaseConnection,
}

impl PostgresUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[derive(Debug, FromQueryResult)]
struct UserRow {
    user_id: Uuid,
    name: String,
    email: String,
    roles: Vec<String>,
    password_hash: String,
    date_created: DateTime<Utc>,
    date_updated: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let roles = parse_roles(&row.roles).map_err(|e| RepositoryError::Backend(e.into()))?;
        Ok(User {
            id: row.user_id,
            name: row.name,
            email: row.email,
            roles,
            password_hash: row.password_hash,
            date_created: row.date_created,
            date_updated: row.date_updated,
        })
    }
}

fn role_names(user: &User) -> Vec<String> {
    user.roles.iter().map(|r| r.to_string()).collect()
}

fn map_db_err(err: DbErr) -> RepositoryError {
    if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
        let key = if detail.contains(EMAIL_CONSTRAINT) {
            UniqueKey::Email
        } else {
            UniqueKey::Id
        };
        return RepositoryError::UniqueViolation(key);
    }

    match err {
        DbErr::RecordNotFound(_) => RepositoryError::NoRows,
        DbErr::ConnectionAcquire(ConnAcquireErr::ConnectionClosed) => {
            RepositoryError::Unavailable("database connection pool is closed".to_string())
        }
        other => RepositoryError::Backend(other.into()),
    }
}

impl PostgresUserRepository {
    async fn fetch_one(&self, stmt: Statement) -> Result<User, RepositoryError> {
        UserRow::find_by_statement(stmt)
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .ok_or(RepositoryError::NoRows)?
            .try_into()
    }

    async fn execute_expecting_row(&self, stmt: Statement) -> Result<(), RepositoryError> {
        let result = self.db.execute_raw(stmt).await.map_err(map_db_err)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NoRows);
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn insert(&self, user: &User) -> Result<(), RepositoryError> {
        let sql = format!("INSERT INTO users ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)");

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                user.id.into(),
                user.name.clone().into(),
                user.email.clone().into(),
                role_names(user).into(),
                user.password_hash.clone().into(),
                user.date_created.into(),
                user.date_updated.into(),
            ],
        );

        self.execute_expecting_row(stmt).await
    }

    async fn replace(&self, user: &User) -> Result<(), RepositoryError> {
        let sql = r#"
            UPDATE users
            SET name = $2, email = $3, roles = $4, password_hash = $5, date_updated = $6
            WHERE user_id = $1
        "#;

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [
                user.id.into(),
                user.name.clone().into(),
                user.email.clone().into(),
                role_names(user).into(),
                user.password_hash.clone().into(),
                user.date_updated.into(),
            ],
        );

        self.execute_expecting_row(stmt).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "DELETE FROM users WHERE user_id = $1",
            [id.into()],
        );

        self.execute_expecting_row(stmt).await
    }

    async fn list(&self, offset: u64, limit: u64) -> Result<Vec<User>, RepositoryError> {
        let (offset, limit) = match (i64::try_from(offset), i64::try_from(limit)) {
            (Ok(offset), Ok(limit)) => (offset, limit),
            _ => {
                return Err(RepositoryError::Backend(
                    format!("page window out of range: offset {offset}, limit {limit}").into(),
                ));
            }
        };

        let sql = format!(
            "SELECT {COLUMNS} FROM users ORDER BY user_id OFFSET $1 ROWS FETCH NEXT $2 ROWS ONLY"
        );

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [offset.into(), limit.into()],
        );

        UserRow::find_by_statement(stmt)
            .all(&self.db)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<User, RepositoryError> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE user_id = $1");
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, [id.into()]);
        self.fetch_one(stmt).await
    }

    async fn find_by_email(&self, email: &str) -> Result<User, RepositoryError> {
        let sql = format!("SELECT {COLUMNS} FROM users WHERE email = $1");
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, sql, [email.into()]);
        self.fetch_one(stmt).await
    }
}
