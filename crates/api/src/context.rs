use aurum_core::UserId;

/// Authenticated caller identity for a request.
///
/// Inserted by the auth middleware; the user record itself is loaded on
/// demand so admin checks always see the current `is_admin` flag.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AuthContext {
    user_id: UserId,
}

impl AuthContext {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}
