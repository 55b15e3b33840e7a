use crate::domain::user::{Role, User};

/// The identity on whose behalf an ownership-checked operation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub email: String,
    pub role: Role,
}

impl Actor {
    pub fn new(email: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins manage every class; anyone else only the classes they own.
    pub fn may_manage(&self, owner_email: &str) -> bool {
        self.is_admin() || self.email == owner_email
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self::new(user.email.clone(), user.role)
    }
}
