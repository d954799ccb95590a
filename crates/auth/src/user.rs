use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aurum_core::{DomainError, DomainResult, Entity, UserId};

/// User record mirrored from the external identity provider.
///
/// The provider owns credentials and sessions; we keep the profile fields and
/// the `is_admin` flag that gates the back-office surface. Records are
/// upserted whenever the provider hands us a fresh identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &UserId {
        &self.id
    }
}

impl User {
    pub fn new(id: UserId, email: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            email,
            first_name: None,
            last_name: None,
            is_admin: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Gate for admin-only operations.
pub fn require_admin(user: &User) -> DomainResult<()> {
    if user.is_admin {
        Ok(())
    } else {
        Err(DomainError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_admin_rejects_regular_users() {
        let user = User::new(UserId::new(), Some("a@example.com".to_string()), Utc::now());
        assert_eq!(require_admin(&user), Err(DomainError::Forbidden));
    }

    #[test]
    fn require_admin_accepts_admins() {
        let mut user = User::new(UserId::new(), None, Utc::now());
        user.is_admin = true;
        assert_eq!(require_admin(&user), Ok(()));
    }
}
