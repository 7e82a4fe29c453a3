use super::Workflow;
use crate::error::{WorkflowError, WorkflowResult};
use crate::model::{User, UserFilter};

fn required<'s>(value: &'s str, what: &str) -> WorkflowResult<&'s str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(WorkflowError::Validation(format!("{what} is required")));
    }
    Ok(value)
}

fn optional(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl Workflow<'_> {
    pub fn list_users(&mut self, filter: &UserFilter) -> WorkflowResult<Vec<User>> {
        self.session.require_admin()?;
        let result = self.api.list_users(self.session, filter);
        self.settle("admin.users.list", result, |_| {})
    }

    pub fn assign_faculty_role(
        &mut self,
        user_id: &str,
        department: Option<&str>,
        designation: Option<&str>,
    ) -> WorkflowResult<User> {
        self.session.require_admin()?;
        let user_id = required(user_id, "User id")?;
        let result = self.api.assign_faculty_role(
            self.session,
            user_id,
            optional(department),
            optional(designation),
        );
        self.settle("admin.roles.assignFaculty", result, |_| {})
    }

    pub fn assign_student_role(
        &mut self,
        user_id: &str,
        roll_number: &str,
        batch: Option<&str>,
    ) -> WorkflowResult<User> {
        self.session.require_admin()?;
        let user_id = required(user_id, "User id")?;
        let roll_number = required(roll_number, "Roll number")?;
        let result =
            self.api
                .assign_student_role(self.session, user_id, roll_number, optional(batch));
        self.settle("admin.roles.assignStudent", result, |_| {})
    }

    pub fn assign_admin_role(&mut self, user_id: &str) -> WorkflowResult<User> {
        self.session.require_admin()?;
        let user_id = required(user_id, "User id")?;
        let result = self.api.assign_admin_role(self.session, user_id);
        self.settle("admin.roles.assignAdmin", result, |_| {})
    }
}
