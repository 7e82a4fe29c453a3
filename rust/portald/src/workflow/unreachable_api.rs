//! An API that fails the test if any call reaches it. Used to show that
//! local precondition failures never leave the process.

use crate::api::PortalApi;
use crate::error::WorkflowResult;
use crate::model::{
    Application, ApplicationDetail, ApplicationStatus, Assessment, AssessmentSummary,
    AssessmentView, Group, Member, NewAssessment, Project, ProjectInput, Submission,
    SubmissionInput, User, UserFilter,
};
use crate::session::Session;
use std::path::Path;

pub struct UnreachableApi;

impl PortalApi for UnreachableApi {
    fn current_user(&self, _: &Session) -> WorkflowResult<User> {
        panic!("current_user reached the API");
    }
    fn list_users(&self, _: &Session, _: &UserFilter) -> WorkflowResult<Vec<User>> {
        panic!("list_users reached the API");
    }
    fn assign_faculty_role(&self, _: &Session, _: &str, _: Option<&str>, _: Option<&str>) -> WorkflowResult<User> {
        panic!("assign_faculty_role reached the API");
    }
    fn assign_student_role(&self, _: &Session, _: &str, _: &str, _: Option<&str>) -> WorkflowResult<User> {
        panic!("assign_student_role reached the API");
    }
    fn assign_admin_role(&self, _: &Session, _: &str) -> WorkflowResult<User> {
        panic!("assign_admin_role reached the API");
    }
    fn list_projects(&self, _: &Session) -> WorkflowResult<Vec<Project>> {
        panic!("list_projects reached the API");
    }
    fn get_project(&self, _: &Session, _: &str) -> WorkflowResult<Project> {
        panic!("get_project reached the API");
    }
    fn faculty_projects(&self, _: &Session) -> WorkflowResult<Vec<Project>> {
        panic!("faculty_projects reached the API");
    }
    fn create_project(&self, _: &Session, _: &ProjectInput) -> WorkflowResult<Project> {
        panic!("create_project reached the API");
    }
    fn update_project(&self, _: &Session, _: &str, _: &ProjectInput) -> WorkflowResult<Project> {
        panic!("update_project reached the API");
    }
    fn delete_project(&self, _: &Session, _: &str) -> WorkflowResult<()> {
        panic!("delete_project reached the API");
    }
    fn is_member(&self, _: &Session, _: &str, _: &str) -> WorkflowResult<Option<Member>> {
        panic!("is_member reached the API");
    }
    fn get_group(&self, _: &Session, _: &str) -> WorkflowResult<Group> {
        panic!("get_group reached the API");
    }
    fn create_group(&self, _: &Session, _: &str, _: &str, _: u32) -> WorkflowResult<Group> {
        panic!("create_group reached the API");
    }
    fn join_group(&self, _: &Session, _: &str) -> WorkflowResult<Group> {
        panic!("join_group reached the API");
    }
    fn remove_member(&self, _: &Session, _: &str, _: &str) -> WorkflowResult<()> {
        panic!("remove_member reached the API");
    }
    fn leave_group(&self, _: &Session, _: &str) -> WorkflowResult<()> {
        panic!("leave_group reached the API");
    }
    fn transfer_leadership(&self, _: &Session, _: &str, _: &str) -> WorkflowResult<Group> {
        panic!("transfer_leadership reached the API");
    }
    fn create_application(&self, _: &Session, _: &str, _: &str) -> WorkflowResult<Application> {
        panic!("create_application reached the API");
    }
    fn list_applications(&self, _: &Session) -> WorkflowResult<Vec<ApplicationDetail>> {
        panic!("list_applications reached the API");
    }
    fn get_application(&self, _: &Session, _: &str) -> WorkflowResult<ApplicationDetail> {
        panic!("get_application reached the API");
    }
    fn review_application(&self, _: &Session, _: &str, _: ApplicationStatus) -> WorkflowResult<Application> {
        panic!("review_application reached the API");
    }
    fn create_assessment(&self, _: &Session, _: &NewAssessment) -> WorkflowResult<Assessment> {
        panic!("create_assessment reached the API");
    }
    fn list_assessments(&self, _: &Session) -> WorkflowResult<Vec<AssessmentSummary>> {
        panic!("list_assessments reached the API");
    }
    fn get_assessment(&self, _: &Session, _: &str) -> WorkflowResult<AssessmentView> {
        panic!("get_assessment reached the API");
    }
    fn submit_assessment(&self, _: &Session, _: &str, _: &SubmissionInput) -> WorkflowResult<Submission> {
        panic!("submit_assessment reached the API");
    }
    fn grade_submission(&self, _: &Session, _: &str, _: f64) -> WorkflowResult<Submission> {
        panic!("grade_submission reached the API");
    }
    fn upload_attachment(&self, _: &Session, _: &str, _: &Path) -> WorkflowResult<String> {
        panic!("upload_attachment reached the API");
    }
}
