//! The portal API contract.
//!
//! Each method is one request against the authority. `local` answers from
//! an embedded SQLite workspace; `remote` talks to the REST service.

pub mod local;
pub mod remote;

use crate::error::WorkflowResult;
use crate::model::{
    Application, ApplicationDetail, ApplicationStatus, Assessment, AssessmentSummary,
    AssessmentView, Group, Member, NewAssessment, Project, ProjectInput, Submission,
    SubmissionInput, User, UserFilter,
};
use crate::session::Session;
use std::path::Path;

pub use local::LocalApi;
pub use remote::RemoteApi;

pub trait PortalApi {
    fn current_user(&self, session: &Session) -> WorkflowResult<User>;

    // admin
    fn list_users(&self, session: &Session, filter: &UserFilter) -> WorkflowResult<Vec<User>>;
    fn assign_faculty_role(
        &self,
        session: &Session,
        user_id: &str,
        department: Option<&str>,
        designation: Option<&str>,
    ) -> WorkflowResult<User>;
    fn assign_student_role(
        &self,
        session: &Session,
        user_id: &str,
        roll_number: &str,
        batch: Option<&str>,
    ) -> WorkflowResult<User>;
    fn assign_admin_role(&self, session: &Session, user_id: &str) -> WorkflowResult<User>;

    // projects
    fn list_projects(&self, session: &Session) -> WorkflowResult<Vec<Project>>;
    fn get_project(&self, session: &Session, project_id: &str) -> WorkflowResult<Project>;
    fn faculty_projects(&self, session: &Session) -> WorkflowResult<Vec<Project>>;
    fn create_project(&self, session: &Session, input: &ProjectInput) -> WorkflowResult<Project>;
    fn update_project(
        &self,
        session: &Session,
        project_id: &str,
        input: &ProjectInput,
    ) -> WorkflowResult<Project>;
    fn delete_project(&self, session: &Session, project_id: &str) -> WorkflowResult<()>;

    // groups
    fn is_member(
        &self,
        session: &Session,
        student_id: &str,
        project_id: &str,
    ) -> WorkflowResult<Option<Member>>;
    fn get_group(&self, session: &Session, group_id: &str) -> WorkflowResult<Group>;
    fn create_group(
        &self,
        session: &Session,
        project_id: &str,
        name: &str,
        max_members: u32,
    ) -> WorkflowResult<Group>;
    fn join_group(&self, session: &Session, invite_code: &str) -> WorkflowResult<Group>;
    fn remove_member(&self, session: &Session, member_id: &str, group_id: &str)
        -> WorkflowResult<()>;
    fn leave_group(&self, session: &Session, group_id: &str) -> WorkflowResult<()>;
    fn transfer_leadership(
        &self,
        session: &Session,
        group_id: &str,
        member_id: &str,
    ) -> WorkflowResult<Group>;

    // applications
    fn create_application(
        &self,
        session: &Session,
        project_id: &str,
        group_id: &str,
    ) -> WorkflowResult<Application>;
    fn list_applications(&self, session: &Session) -> WorkflowResult<Vec<ApplicationDetail>>;
    fn get_application(
        &self,
        session: &Session,
        application_id: &str,
    ) -> WorkflowResult<ApplicationDetail>;
    fn review_application(
        &self,
        session: &Session,
        application_id: &str,
        status: ApplicationStatus,
    ) -> WorkflowResult<Application>;

    // assessments
    fn create_assessment(
        &self,
        session: &Session,
        input: &NewAssessment,
    ) -> WorkflowResult<Assessment>;
    fn list_assessments(&self, session: &Session) -> WorkflowResult<Vec<AssessmentSummary>>;
    fn get_assessment(&self, session: &Session, assessment_id: &str)
        -> WorkflowResult<AssessmentView>;
    fn submit_assessment(
        &self,
        session: &Session,
        assessment_id: &str,
        input: &SubmissionInput,
    ) -> WorkflowResult<Submission>;
    fn grade_submission(
        &self,
        session: &Session,
        submission_id: &str,
        grade: f64,
    ) -> WorkflowResult<Submission>;
    fn upload_attachment(
        &self,
        session: &Session,
        assessment_id: &str,
        file: &Path,
    ) -> WorkflowResult<String>;
}
