use super::Workflow;
use crate::error::{WorkflowError, WorkflowResult};
use crate::model::{Group, Member};

impl Workflow<'_> {
    /// The signed-in student's membership for a project, or `None`.
    pub fn membership(&mut self, project_id: &str) -> WorkflowResult<Option<Member>> {
        let student_id = self.session.student()?.id.clone();
        let result = self.api.is_member(self.session, &student_id, project_id);
        let member = self.settle("groups.membership", result, |c| {
            c.forget_membership(project_id)
        })?;
        self.cache.set_membership(project_id, member.clone());
        Ok(member)
    }

    pub fn get_group(&mut self, group_id: &str) -> WorkflowResult<Group> {
        let result = self.api.get_group(self.session, group_id);
        let group = self.settle("groups.get", result, |c| c.forget_group(group_id))?;
        self.remember_group(&group);
        Ok(group)
    }

    pub fn create_group(
        &mut self,
        project_id: &str,
        name: &str,
        max_members: Option<u32>,
    ) -> WorkflowResult<Group> {
        self.session.student()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkflowError::Validation("Group name is required".into()));
        }
        let limit = self.config.groups.max_members_limit;
        let max_members = max_members.unwrap_or(self.config.groups.default_max_members);
        if max_members == 0 || max_members > limit {
            return Err(WorkflowError::Validation(format!(
                "Group size must be between 1 and {limit}"
            )));
        }
        if let Some(Some(_)) = self.cache.membership(project_id) {
            return Err(WorkflowError::Conflict(
                "You are already in a group for this project".into(),
            ));
        }

        let result = self
            .api
            .create_group(self.session, project_id, name, max_members);
        let group = self.settle("groups.create", result, |c| {
            c.forget_membership(project_id)
        })?;
        self.remember_group(&group);
        Ok(group)
    }

    pub fn join_group(&mut self, invite_code: &str) -> WorkflowResult<Group> {
        self.session.student()?;
        let code = invite_code.trim();
        if code.is_empty() {
            return Err(WorkflowError::Validation("Invite code is required".into()));
        }
        let cached_id = self.cache.group_by_invite_code(code).map(|g| g.id.clone());

        let result = self.api.join_group(self.session, code);
        let group = self.settle("groups.join", result, |c| {
            if let Some(id) = cached_id.as_deref() {
                c.forget_group(id);
            }
        })?;
        self.remember_group(&group);
        Ok(group)
    }

    /// Leader only. The leader cannot remove themselves.
    pub fn remove_member(&mut self, member_id: &str, group_id: &str) -> WorkflowResult<Group> {
        let student_id = self.session.student()?.id.clone();
        if let Some(group) = self.cache.group(group_id) {
            let is_leader = group
                .member_for_student(&student_id)
                .map(Member::is_leader)
                .unwrap_or(false);
            if !is_leader {
                return Err(WorkflowError::Forbidden(
                    "only the group leader can remove members".into(),
                ));
            }
            if group.member(member_id).map(Member::is_leader).unwrap_or(false) {
                return Err(WorkflowError::Forbidden(
                    "the group leader cannot be removed".into(),
                ));
            }
        }

        let result = self.api.remove_member(self.session, member_id, group_id);
        self.settle("groups.removeMember", result, |c| c.forget_group(group_id))?;
        self.refetch_group(group_id)
    }

    /// A leader must hand over leadership first.
    pub fn leave_group(&mut self, group_id: &str) -> WorkflowResult<()> {
        let student_id = self.session.student()?.id.clone();
        let cached = self.cache.group(group_id);
        let is_leader = cached
            .and_then(|g| g.member_for_student(&student_id))
            .map(Member::is_leader)
            .unwrap_or(false);
        if is_leader {
            return Err(WorkflowError::InvalidTransition(
                "Transfer leadership before leaving the group".into(),
            ));
        }
        let project_id = cached.and_then(|g| g.project_id.clone());

        let result = self.api.leave_group(self.session, group_id);
        self.settle("groups.leave", result, |c| c.forget_group(group_id))?;
        self.cache.forget_group(group_id);
        if let Some(project_id) = project_id {
            self.cache.set_membership(&project_id, None);
        }
        Ok(())
    }

    pub fn transfer_leadership(&mut self, group_id: &str, member_id: &str) -> WorkflowResult<Group> {
        let student_id = self.session.student()?.id.clone();
        if member_id.trim().is_empty() {
            return Err(WorkflowError::Validation("memberId is required".into()));
        }
        if let Some(group) = self.cache.group(group_id) {
            let me = group.member_for_student(&student_id);
            if !me.map(Member::is_leader).unwrap_or(false) {
                return Err(WorkflowError::Forbidden(
                    "only the group leader can transfer leadership".into(),
                ));
            }
            if me.map(|m| m.id == member_id).unwrap_or(false) {
                return Err(WorkflowError::InvalidTransition(
                    "You are already the group leader".into(),
                ));
            }
        }

        let result = self.api.transfer_leadership(self.session, group_id, member_id);
        let group = self.settle("groups.transferLeadership", result, |c| {
            c.forget_group(group_id)
        })?;
        self.remember_group(&group);
        Ok(group)
    }

    fn refetch_group(&mut self, group_id: &str) -> WorkflowResult<Group> {
        let result = self.api.get_group(self.session, group_id);
        let group = self.settle("groups.get", result, |c| c.forget_group(group_id))?;
        self.remember_group(&group);
        Ok(group)
    }

    /// Stores the group and, for students, their membership of its project.
    fn remember_group(&mut self, group: &Group) {
        if let (Some(project_id), Some(student)) =
            (group.project_id.as_deref(), self.session.user().student.as_ref())
        {
            let member = group.member_for_student(&student.id).cloned();
            self.cache.set_membership(project_id, member);
        }
        self.cache.put_group(group.clone());
    }
}
