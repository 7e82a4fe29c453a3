use super::Workflow;
use crate::error::{WorkflowError, WorkflowResult};
use crate::model::{Application, ApplicationDetail, ApplicationStatus, Member};

impl Workflow<'_> {
    /// Group leader applies on behalf of the group.
    pub fn apply_for_project(
        &mut self,
        project_id: &str,
        group_id: &str,
    ) -> WorkflowResult<Application> {
        let student_id = self.session.student()?.id.clone();
        if let Some(group) = self.cache.group(group_id) {
            let is_leader = group
                .member_for_student(&student_id)
                .map(Member::is_leader)
                .unwrap_or(false);
            if !is_leader {
                return Err(WorkflowError::Forbidden(
                    "only group leaders can apply for projects".into(),
                ));
            }
            if group.project_id.as_deref() != Some(project_id) {
                return Err(WorkflowError::Conflict(
                    "Group belongs to a different project".into(),
                ));
            }
        }

        let result = self.api.create_application(self.session, project_id, group_id);
        let application = self.settle("applications.apply", result, |c| c.forget_group(group_id))?;
        self.cache.put_application(application.clone());
        Ok(application)
    }

    pub fn list_applications(&mut self) -> WorkflowResult<Vec<ApplicationDetail>> {
        let result = self.api.list_applications(self.session);
        let list = self.settle("applications.list", result, |_| {})?;
        for detail in &list {
            self.cache.put_application(detail.application.clone());
            self.cache.put_group(detail.group.clone());
        }
        Ok(list)
    }

    pub fn get_application(&mut self, application_id: &str) -> WorkflowResult<ApplicationDetail> {
        let result = self.api.get_application(self.session, application_id);
        let detail = self.settle("applications.get", result, |c| {
            c.forget_application(application_id)
        })?;
        self.cache.put_application(detail.application.clone());
        self.cache.put_group(detail.group.clone());
        Ok(detail)
    }

    /// Pending is the only reviewable state; the decision is final.
    pub fn review_application(
        &mut self,
        application_id: &str,
        status: ApplicationStatus,
    ) -> WorkflowResult<Application> {
        self.session.faculty()?;
        if status == ApplicationStatus::Pending {
            return Err(WorkflowError::Validation(
                "status must be Approved or Rejected".into(),
            ));
        }
        if let Some(cached) = self.cache.application(application_id) {
            if cached.application_status.is_terminal() {
                return Err(WorkflowError::InvalidTransition(format!(
                    "Application is already {}",
                    cached.application_status
                )));
            }
        }

        let result = self
            .api
            .review_application(self.session, application_id, status);
        let application = self.settle("applications.review", result, |c| {
            c.forget_application(application_id)
        })?;
        self.cache.put_application(application.clone());
        Ok(application)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ViewCache;
    use crate::config::PortalConfig;
    use crate::testkit::Fixture;
    use crate::workflow::unreachable_api::UnreachableApi;

    #[test]
    fn non_leader_cannot_apply() {
        let fx = Fixture::new();
        let config = PortalConfig::default();
        let prof = fx.faculty("prof@uni.edu");
        let project = fx.project(&prof, "Vision");
        let alice = fx.student("alice@uni.edu", "R1");
        let bob = fx.student("bob@uni.edu", "R2");
        let mut alice_cache = ViewCache::default();
        let mut bob_cache = ViewCache::default();

        let group = Workflow::new(&alice, &fx.api, &mut alice_cache, &config)
            .create_group(&project.id, "Alpha", None)
            .expect("create");
        Workflow::new(&bob, &fx.api, &mut bob_cache, &config)
            .join_group(&group.invite_code)
            .expect("join");

        let err = Workflow::new(&bob, &UnreachableApi, &mut bob_cache, &config)
            .apply_for_project(&project.id, &group.id)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));

        let mut cold = ViewCache::default();
        let err = Workflow::new(&bob, &fx.api, &mut cold, &config)
            .apply_for_project(&project.id, &group.id)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));

        let listed = Workflow::new(&alice, &fx.api, &mut alice_cache, &config)
            .list_applications()
            .expect("list");
        assert!(listed.is_empty());
    }

    #[test]
    fn re_review_is_rejected_and_status_stays() {
        let fx = Fixture::new();
        let config = PortalConfig::default();
        let prof = fx.faculty("prof@uni.edu");
        let project = fx.project(&prof, "Vision");
        let alice = fx.student("alice@uni.edu", "R1");
        let mut alice_cache = ViewCache::default();
        let mut alice_wf = Workflow::new(&alice, &fx.api, &mut alice_cache, &config);
        let group = alice_wf
            .create_group(&project.id, "Alpha", None)
            .expect("create");
        let application = alice_wf
            .apply_for_project(&project.id, &group.id)
            .expect("apply");

        let mut prof_cache = ViewCache::default();
        let mut prof_wf = Workflow::new(&prof, &fx.api, &mut prof_cache, &config);
        prof_wf
            .review_application(&application.id, ApplicationStatus::Approved)
            .expect("approve");

        // Cached as Approved: refused locally.
        let err = prof_wf
            .review_application(&application.id, ApplicationStatus::Rejected)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition(_)));

        // A fresh client only learns it from the authority.
        let mut cold = ViewCache::default();
        let err = Workflow::new(&prof, &fx.api, &mut cold, &config)
            .review_application(&application.id, ApplicationStatus::Rejected)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition(_)));
        assert!(cold.application(&application.id).is_none());

        let detail = Workflow::new(&prof, &fx.api, &mut cold, &config)
            .get_application(&application.id)
            .expect("detail");
        assert_eq!(
            detail.application.application_status,
            ApplicationStatus::Approved
        );
    }

    #[test]
    fn review_needs_a_decision() {
        let fx = Fixture::new();
        let config = PortalConfig::default();
        let prof = fx.faculty("prof@uni.edu");
        let mut cache = ViewCache::default();
        let err = Workflow::new(&prof, &UnreachableApi, &mut cache, &config)
            .review_application("a1", ApplicationStatus::Pending)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }
}
