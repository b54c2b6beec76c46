//! Claims carried by a signed token and the access rules derived from them.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Role;

/// Lifetime of issued claims.
pub const CLAIMS_TTL: Duration = Duration::hours(1);

/// Identity and roles of an authenticated caller.
///
/// Built only by authentication; rebuilt per request from the bearer token.
/// Expiry is enforced when the token is verified, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub roles: Vec<Role>,
    pub iss: String,
    /// Unix seconds
    pub iat: i64,
    /// Unix seconds
    pub exp: i64,
}

impl Claims {
    pub fn issue(
        subject: impl Into<String>,
        roles: Vec<Role>,
        issuer: impl Into<String>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            sub: subject.into(),
            roles,
            iss: issuer.into(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    pub fn is_authorized(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Admins may touch anyone; everyone else only themselves.
    pub fn can_access(&self, owner_id: &str) -> bool {
        self.is_authorized(Role::Admin) || self.sub == owner_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn claims(sub: &str, roles: Vec<Role>) -> Claims {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        Claims::issue(sub, roles, "users service", now, CLAIMS_TTL)
    }

    #[test]
    fn test_issue_anchors_window_at_now() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let claims = Claims::issue("u1", vec![Role::User], "users service", now, CLAIMS_TTL);

        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.exp, now.timestamp() + 3600);
        assert_eq!(claims.iss, "users service");
    }

    #[test]
    fn test_is_authorized() {
        let claims = claims("u1", vec![Role::User]);
        assert!(claims.is_authorized(Role::User));
        assert!(!claims.is_authorized(Role::Admin));
        assert!(!self::claims("u1", vec![]).is_authorized(Role::User));
    }

    #[test]
    fn test_can_access_self_or_admin() {
        let user = claims("u1", vec![Role::User]);
        assert!(user.can_access("u1"));
        assert!(!user.can_access("u2"));

        let admin = claims("u9", vec![Role::Admin]);
        assert!(admin.can_access("u2"));
    }

    #[test]
    fn test_claims_wire_format() {
        let value = serde_json::to_value(claims("u1", vec![Role::Admin, Role::User])).unwrap();
        assert_eq!(value["sub"], "u1");
        assert_eq!(value["roles"], serde_json::json!(["ADMIN", "USER"]));
    }
}
