use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidateEmail};

use crate::error::{UserError, UserResult};

/// Closed set of roles a user can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = UserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "USER" => Ok(Role::User),
            _ => Err(UserError::validation(format!("unknown role: {s}"))),
        }
    }
}

/// Parse role names as sent by clients or stored in the `roles` column.
pub fn parse_roles<S: AsRef<str>>(names: &[S]) -> UserResult<Vec<Role>> {
    names.iter().map(|name| name.as_ref().parse()).collect()
}

/// Stored user record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub roles: Vec<Role>,
    /// Argon2 PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

impl User {
    pub fn new(
        name: String,
        email: String,
        roles: Vec<Role>,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            name,
            email,
            roles,
            password_hash,
            date_created: now,
            date_updated: now,
        }
    }
}

/// Outward view of a [`User`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub roles: Vec<Role>,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            roles: user.roles,
            date_created: user.date_created,
            date_updated: user.date_updated,
        }
    }
}

/// Everything needed to create a user
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewUser {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email, length(max = 255))]
    pub email: String,
    /// Role names, e.g. `["USER"]`
    #[validate(length(min = 1))]
    pub roles: Vec<String>,
    #[validate(length(min = 1))]
    pub password: String,
    #[validate(must_match(other = "password"))]
    pub password_confirm: String,
}

impl NewUser {
    /// True when any requested role grants more than `USER`.
    pub fn requests_elevated_roles(&self) -> bool {
        self.roles
            .iter()
            .any(|name| name.parse::<Role>().is_ok_and(|role| role != Role::User))
    }
}

/// A JSON attribute that may be missing, explicitly `null`, or set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<T> {
    /// Key not present; keep the stored value
    Absent,
    /// Key present with `null`; reset to the empty value
    Empty,
    Value(T),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Absent
    }
}

impl<T> Field<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Absent)
    }

    pub fn as_value(&self) -> Option<&T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<Field<U>, E> {
        Ok(match self {
            Field::Absent => Field::Absent,
            Field::Empty => Field::Empty,
            Field::Value(v) => Field::Value(f(v)?),
        })
    }

    /// Overwrite `target` unless absent; `Empty` writes `T::default()`.
    pub fn apply_to(self, target: &mut T)
    where
        T: Default,
    {
        match self {
            Field::Absent => {}
            Field::Empty => *target = T::default(),
            Field::Value(v) => *target = v,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Only reached when the key exists; missing keys use Default.
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) => Field::Value(v),
            None => Field::Empty,
        })
    }
}

/// Partial update. Only attributes present in the body are written.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateUser {
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub name: Field<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub email: Field<String>,
    #[serde(default)]
    #[schema(value_type = Option<Vec<String>>)]
    pub roles: Field<Vec<String>>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub password: Field<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub password_confirm: Field<String>,
}

impl UpdateUser {
    /// Shape rules for the attributes that are present.
    pub fn check(&self) -> UserResult<()> {
        match &self.email {
            Field::Absent => {}
            Field::Value(email) if email.validate_email() => {}
            _ => return Err(UserError::validation("email: must be a valid email address")),
        }

        match &self.password {
            Field::Absent => {}
            Field::Value(password) if !password.is_empty() => {}
            _ => return Err(UserError::validation("password: must not be empty")),
        }

        if !self.password_confirm.is_absent()
            && self.password_confirm.as_value() != self.password.as_value()
        {
            return Err(UserError::validation(
                "password_confirm: must match password",
            ));
        }

        Ok(())
    }
}

/// Email and password exchanged for a token
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct Credentials {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

/// Paging for the user list
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number
    #[serde(default = "default_page")]
    pub page: i64,
    /// Rows per page
    #[serde(default = "default_rows")]
    pub rows: i64,
}

fn default_page() -> i64 {
    1
}

fn default_rows() -> i64 {
    20
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_role_wire_names() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        assert_eq!(parse_roles(&["USER", "ADMIN"]).unwrap(), vec![Role::User, Role::Admin]);

        let err = parse_roles(&["ROOT"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_update_user_distinguishes_absent_and_null() {
        let update: UpdateUser =
            serde_json::from_str(r#"{"name": null, "roles": ["ADMIN"]}"#).unwrap();

        assert_eq!(update.name, Field::Empty);
        assert_eq!(update.email, Field::Absent);
        assert_eq!(update.roles, Field::Value(vec!["ADMIN".to_string()]));
        assert!(update.password.is_absent());
    }

    #[test]
    fn test_field_apply_to() {
        let mut name = "Ada".to_string();
        Field::Absent.apply_to(&mut name);
        assert_eq!(name, "Ada");
        Field::Value("Grace".to_string()).apply_to(&mut name);
        assert_eq!(name, "Grace");
        Field::Empty.apply_to(&mut name);
        assert_eq!(name, "");
    }

    #[test]
    fn test_update_user_check() {
        let ok: UpdateUser = serde_json::from_str(
            r#"{"email": "ada@example.com", "password": "s3cret", "password_confirm": "s3cret"}"#,
        )
        .unwrap();
        assert!(ok.check().is_ok());

        for body in [
            r#"{"email": "not-an-email"}"#,
            r#"{"email": null}"#,
            r#"{"password": ""}"#,
            r#"{"password": "a", "password_confirm": "b"}"#,
            r#"{"password_confirm": "b"}"#,
        ] {
            let update: UpdateUser = serde_json::from_str(body).unwrap();
            let err = update.check().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{body}");
        }
    }

    #[test]
    fn test_new_user_validation() {
        let mut new_user = NewUser {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            roles: vec!["USER".into()],
            password: "s3cret".into(),
            password_confirm: "s3cret".into(),
        };
        assert!(new_user.validate().is_ok());

        new_user.password_confirm = "other".into();
        let errors = new_user.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password_confirm"));

        new_user.password_confirm = "s3cret".into();
        new_user.roles.clear();
        assert!(new_user.validate().is_err());
    }

    #[test]
    fn test_requests_elevated_roles() {
        let mut new_user = NewUser {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            roles: vec!["USER".into()],
            password: "s3cret".into(),
            password_confirm: "s3cret".into(),
        };
        assert!(!new_user.requests_elevated_roles());

        new_user.roles.push("ADMIN".into());
        assert!(new_user.requests_elevated_roles());

        new_user.roles = vec!["ROOT".into()];
        assert!(!new_user.requests_elevated_roles());
    }
}
