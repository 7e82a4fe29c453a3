//! Most recently fetched view state.
//!
//! The authority is the source of truth; entries here are only used for
//! client-side precondition checks and are dropped whenever the authority
//! rejects an operation that touched them.

use crate::model::{Application, Assessment, Group, Member, Submission};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct ViewCache {
    /// project id -> the signed-in student's membership (None = no group).
    memberships: HashMap<String, Option<Member>>,
    groups: HashMap<String, Group>,
    applications: HashMap<String, Application>,
    assessments: HashMap<String, Assessment>,
    submissions: HashMap<String, Submission>,
}

impl ViewCache {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// `None` means unknown; `Some(None)` means fetched and not a member.
    pub fn membership(&self, project_id: &str) -> Option<Option<&Member>> {
        self.memberships.get(project_id).map(Option::as_ref)
    }

    pub fn set_membership(&mut self, project_id: &str, member: Option<Member>) {
        self.memberships.insert(project_id.to_string(), member);
    }

    pub fn forget_membership(&mut self, project_id: &str) {
        self.memberships.remove(project_id);
    }

    pub fn group(&self, group_id: &str) -> Option<&Group> {
        self.groups.get(group_id)
    }

    pub fn group_by_invite_code(&self, code: &str) -> Option<&Group> {
        self.groups.values().find(|g| g.invite_code == code)
    }

    pub fn put_group(&mut self, group: Group) {
        self.groups.insert(group.id.clone(), group);
    }

    /// Drops the group and any membership that points at it.
    pub fn forget_group(&mut self, group_id: &str) {
        if let Some(group) = self.groups.remove(group_id) {
            if let Some(project_id) = group.project_id {
                self.memberships.remove(&project_id);
            }
        }
        self.memberships
            .retain(|_, m| m.as_ref().map(|m| m.group_id != group_id).unwrap_or(true));
    }

    pub fn application(&self, id: &str) -> Option<&Application> {
        self.applications.get(id)
    }

    pub fn put_application(&mut self, application: Application) {
        self.applications
            .insert(application.id.clone(), application);
    }

    pub fn forget_application(&mut self, id: &str) {
        self.applications.remove(id);
    }

    pub fn assessment(&self, id: &str) -> Option<&Assessment> {
        self.assessments.get(id)
    }

    pub fn put_assessment(&mut self, assessment: Assessment) {
        self.assessments.insert(assessment.id.clone(), assessment);
    }

    pub fn forget_assessment(&mut self, id: &str) {
        self.assessments.remove(id);
        self.submissions.retain(|_, s| s.assessment_id != id);
    }

    pub fn submission_for(&self, assessment_id: &str, student_id: &str) -> Option<&Submission> {
        self.submissions
            .values()
            .find(|s| s.assessment_id == assessment_id && s.student_id == student_id)
    }

    pub fn put_submission(&mut self, submission: Submission) {
        self.submissions.insert(submission.id.clone(), submission);
    }

    pub fn forget_submission(&mut self, id: &str) {
        self.submissions.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MemberRole;

    fn member(group_id: &str) -> Member {
        Member {
            id: "m1".into(),
            group_id: group_id.into(),
            student_id: "s1".into(),
            member_role: MemberRole::Leader,
            joined_at: String::new(),
            student: None,
        }
    }

    #[test]
    fn forgetting_group_drops_linked_membership() {
        let mut cache = ViewCache::default();
        cache.set_membership("p1", Some(member("g1")));
        cache.set_membership("p2", None);
        cache.put_group(Group {
            id: "g1".into(),
            project_id: Some("p1".into()),
            name: "Alpha".into(),
            invite_code: "ab12-00001".into(),
            max_members: 4,
            current_member: 1,
            members: vec![member("g1")],
        });
        assert!(cache.group_by_invite_code("ab12-00001").is_some());

        cache.forget_group("g1");
        assert!(cache.group("g1").is_none());
        assert!(cache.membership("p1").is_none());
        assert_eq!(cache.membership("p2"), Some(None));
    }
}
