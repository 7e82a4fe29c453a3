//! The signed-in principal, passed explicitly to every workflow call.

use crate::error::{WorkflowError, WorkflowResult};
use crate::model::{FacultyProfile, Role, StudentProfile, User};

#[derive(Debug, Clone)]
pub struct Session {
    user: User,
    token: Option<String>,
}

impl Session {
    pub fn new(user: User, token: Option<String>) -> Self {
        Self { user, token }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Swap in a freshly fetched principal, keeping the credentials.
    pub fn refresh(&mut self, user: User) {
        self.user = user;
    }

    pub fn require_role(&self, allowed: &[Role]) -> WorkflowResult<()> {
        if allowed.contains(&self.role()) {
            Ok(())
        } else {
            Err(WorkflowError::Forbidden(format!(
                "role {} may not perform this action",
                self.role()
            )))
        }
    }

    pub fn student(&self) -> WorkflowResult<&StudentProfile> {
        self.require_role(&[Role::Student])?;
        self.user
            .student
            .as_ref()
            .ok_or_else(|| WorkflowError::Forbidden("student profile missing".into()))
    }

    pub fn faculty(&self) -> WorkflowResult<&FacultyProfile> {
        self.require_role(&[Role::Faculty])?;
        self.user
            .faculty
            .as_ref()
            .ok_or_else(|| WorkflowError::Forbidden("faculty profile missing".into()))
    }

    pub fn require_admin(&self) -> WorkflowResult<()> {
        self.require_role(&[Role::Admin])
    }
}
