//! REST client for a hosted portal service.
//!
//! Paths follow the service's role-prefixed layout (`/api/student/...`,
//! `/api/faculty/...`, `/api/admin/...`). Payloads may arrive wrapped as
//! `{"data": ...}` or bare; error bodies carry `{"message": ...}`.

use super::PortalApi;
use crate::error::{WorkflowError, WorkflowResult};
use crate::model::{
    Application, ApplicationDetail, ApplicationStatus, Assessment, AssessmentSummary,
    AssessmentView, Group, Member, NewAssessment, Project, ProjectInput, Role, Submission,
    SubmissionInput, User, UserFilter,
};
use crate::session::Session;
use reqwest::blocking::{multipart, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub struct RemoteApi {
    http: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MembershipBody {
    is_in_project: Option<Member>,
}

#[derive(Deserialize)]
struct FacultyBody {
    faculty: FacultyProjects,
}

#[derive(Deserialize)]
struct FacultyProjects {
    #[serde(default)]
    projects: Vec<Project>,
}

#[derive(Deserialize)]
struct UploadBody {
    url: String,
}

/// Accepts `{"data": T}` or a bare `T`.
fn decode<T: DeserializeOwned>(body: &str) -> WorkflowResult<T> {
    if let Ok(env) = serde_json::from_str::<Envelope<T>>(body) {
        return Ok(env.data);
    }
    serde_json::from_str::<T>(body)
        .map_err(|e| WorkflowError::Network(format!("unexpected response body: {e}")))
}

fn status_error(status: u16, body: &str) -> WorkflowError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("HTTP {status}"));
    match status {
        400 | 422 => WorkflowError::Validation(message),
        401 => WorkflowError::Unauthenticated,
        403 => WorkflowError::Forbidden(message),
        404 => WorkflowError::NotFound(message),
        409 => WorkflowError::Conflict(message),
        _ => WorkflowError::Network(format!("HTTP {status}: {message}")),
    }
}

fn role_prefix(session: &Session) -> WorkflowResult<&'static str> {
    match session.role() {
        Role::Student => Ok("student"),
        Role::Faculty => Ok("faculty"),
        other => Err(WorkflowError::Forbidden(format!(
            "role {other} has no view of this resource"
        ))),
    }
}

impl RemoteApi {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> WorkflowResult<Self> {
        let mut builder = Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        Ok(Self {
            http: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, builder: RequestBuilder, session: &Session) -> RequestBuilder {
        match session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn send_raw(&self, builder: RequestBuilder) -> WorkflowResult<String> {
        let resp = builder.send()?;
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        if !status.is_success() {
            debug!(status = status.as_u16(), "remote request failed");
            return Err(status_error(status.as_u16(), &body));
        }
        Ok(body)
    }

    fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> WorkflowResult<T> {
        let body = self.send_raw(builder)?;
        decode(&body)
    }

    fn get<T: DeserializeOwned>(&self, session: &Session, path: &str) -> WorkflowResult<T> {
        self.send(self.authed(self.http.get(self.url(path)), session))
    }

    /// Fetches the caller's principal for a bearer token obtained elsewhere.
    pub fn me(&self, token: &str) -> WorkflowResult<User> {
        self.send(self.http.get(self.url("/api/auth/me")).bearer_auth(token))
    }
}

impl PortalApi for RemoteApi {
    fn current_user(&self, session: &Session) -> WorkflowResult<User> {
        self.get(session, "/api/auth/me")
    }

    fn list_users(&self, session: &Session, filter: &UserFilter) -> WorkflowResult<Vec<User>> {
        let users: Vec<User> = self.get(session, "/api/admin/getAllusers")?;
        Ok(users.into_iter().filter(|u| filter.matches(u)).collect())
    }

    fn assign_faculty_role(
        &self,
        session: &Session,
        user_id: &str,
        department: Option<&str>,
        designation: Option<&str>,
    ) -> WorkflowResult<User> {
        let req = self
            .http
            .post(self.url("/api/admin/assignFacultyRole"))
            .query(&[
                ("userId", user_id),
                ("department", department.unwrap_or_default()),
                ("designation", designation.unwrap_or_default()),
            ]);
        self.send(self.authed(req, session))
    }

    fn assign_student_role(
        &self,
        session: &Session,
        user_id: &str,
        roll_number: &str,
        batch: Option<&str>,
    ) -> WorkflowResult<User> {
        let req = self
            .http
            .post(self.url("/api/admin/assignStudentRole"))
            .query(&[
                ("userId", user_id),
                ("rollNumber", roll_number),
                ("batch", batch.unwrap_or_default()),
            ]);
        self.send(self.authed(req, session))
    }

    fn assign_admin_role(&self, session: &Session, user_id: &str) -> WorkflowResult<User> {
        let req = self
            .http
            .post(self.url("/api/admin/assignAdminRole"))
            .query(&[("userId", user_id)]);
        self.send(self.authed(req, session))
    }

    fn list_projects(&self, session: &Session) -> WorkflowResult<Vec<Project>> {
        self.get(session, "/api/projects")
    }

    fn get_project(&self, session: &Session, project_id: &str) -> WorkflowResult<Project> {
        self.get(session, &format!("/api/project/{project_id}"))
    }

    fn faculty_projects(&self, session: &Session) -> WorkflowResult<Vec<Project>> {
        let body =
            self.send_raw(self.authed(self.http.get(self.url("/api/faculty")), session))?;
        if let Ok(f) = decode::<FacultyBody>(&body) {
            return Ok(f.faculty.projects);
        }
        decode(&body)
    }

    fn create_project(&self, session: &Session, input: &ProjectInput) -> WorkflowResult<Project> {
        let req = self.http.post(self.url("/api/faculty/project")).json(input);
        self.send(self.authed(req, session))
    }

    fn update_project(
        &self,
        session: &Session,
        project_id: &str,
        input: &ProjectInput,
    ) -> WorkflowResult<Project> {
        let req = self
            .http
            .put(self.url(&format!("/api/faculty/project/{project_id}")))
            .json(input);
        self.send(self.authed(req, session))
    }

    fn delete_project(&self, session: &Session, project_id: &str) -> WorkflowResult<()> {
        let req = self
            .http
            .delete(self.url(&format!("/api/faculty/project/{project_id}")));
        self.send_raw(self.authed(req, session))?;
        Ok(())
    }

    fn is_member(
        &self,
        session: &Session,
        student_id: &str,
        project_id: &str,
    ) -> WorkflowResult<Option<Member>> {
        let req = self
            .http
            .get(self.url("/api/student/isMember"))
            .query(&[("studentId", student_id), ("projectId", project_id)]);
        let body: MembershipBody = self.send(self.authed(req, session))?;
        Ok(body.is_in_project)
    }

    fn get_group(&self, session: &Session, group_id: &str) -> WorkflowResult<Group> {
        let path = match role_prefix(session)? {
            "faculty" => format!("/api/faculty/groups/{group_id}"),
            _ => format!("/api/student/group/{group_id}"),
        };
        self.get(session, &path)
    }

    fn create_group(
        &self,
        session: &Session,
        project_id: &str,
        name: &str,
        max_members: u32,
    ) -> WorkflowResult<Group> {
        let max = max_members.to_string();
        let req = self.http.get(self.url("/api/student/createGroup")).query(&[
            ("projectId", project_id),
            ("grpName", name),
            ("maxMembers", max.as_str()),
        ]);
        self.send(self.authed(req, session))
    }

    fn join_group(&self, session: &Session, invite_code: &str) -> WorkflowResult<Group> {
        let req = self
            .http
            .put(self.url("/api/student/addGroupMember"))
            .query(&[("inviteId", invite_code)]);
        self.send(self.authed(req, session))
    }

    fn remove_member(
        &self,
        session: &Session,
        member_id: &str,
        group_id: &str,
    ) -> WorkflowResult<()> {
        let req = self
            .http
            .delete(self.url("/api/student/removeMember"))
            .query(&[("memberId", member_id), ("groupId", group_id)]);
        self.send_raw(self.authed(req, session))?;
        Ok(())
    }

    fn leave_group(&self, session: &Session, group_id: &str) -> WorkflowResult<()> {
        let req = self
            .http
            .delete(self.url("/api/student/leaveGroup"))
            .query(&[("groupId", group_id)]);
        self.send_raw(self.authed(req, session))?;
        Ok(())
    }

    fn transfer_leadership(
        &self,
        session: &Session,
        group_id: &str,
        member_id: &str,
    ) -> WorkflowResult<Group> {
        let req = self
            .http
            .put(self.url("/api/student/transferLeadership"))
            .query(&[("groupId", group_id), ("memberId", member_id)]);
        self.send(self.authed(req, session))
    }

    fn create_application(
        &self,
        session: &Session,
        project_id: &str,
        group_id: &str,
    ) -> WorkflowResult<Application> {
        let req = self
            .http
            .post(self.url("/api/student/createApplication"))
            .json(&json!({ "projectId": project_id, "groupId": group_id }));
        self.send(self.authed(req, session))
    }

    fn list_applications(&self, session: &Session) -> WorkflowResult<Vec<ApplicationDetail>> {
        let path = match role_prefix(session)? {
            "faculty" => "/api/faculty/applications",
            _ => "/api/student/getAllApplication",
        };
        self.get(session, path)
    }

    fn get_application(
        &self,
        session: &Session,
        application_id: &str,
    ) -> WorkflowResult<ApplicationDetail> {
        match role_prefix(session)? {
            "faculty" => self.get(session, &format!("/api/faculty/applications/{application_id}")),
            _ => {
                let req = self
                    .http
                    .get(self.url("/api/student/getApplicationById"))
                    .query(&[("applicationId", application_id)]);
                self.send(self.authed(req, session))
            }
        }
    }

    fn review_application(
        &self,
        session: &Session,
        application_id: &str,
        status: ApplicationStatus,
    ) -> WorkflowResult<Application> {
        let req = self
            .http
            .put(self.url(&format!(
                "/api/faculty/applications/{application_id}/review"
            )))
            .query(&[("status", status.as_str())]);
        self.send(self.authed(req, session))
    }

    fn create_assessment(
        &self,
        session: &Session,
        input: &NewAssessment,
    ) -> WorkflowResult<Assessment> {
        let req = self.http.post(self.url("/api/faculty/assessments")).json(input);
        self.send(self.authed(req, session))
    }

    fn list_assessments(&self, session: &Session) -> WorkflowResult<Vec<AssessmentSummary>> {
        let prefix = role_prefix(session)?;
        self.get(session, &format!("/api/{prefix}/assessments"))
    }

    fn get_assessment(
        &self,
        session: &Session,
        assessment_id: &str,
    ) -> WorkflowResult<AssessmentView> {
        let prefix = role_prefix(session)?;
        self.get(session, &format!("/api/{prefix}/assessments/{assessment_id}"))
    }

    fn submit_assessment(
        &self,
        session: &Session,
        assessment_id: &str,
        input: &SubmissionInput,
    ) -> WorkflowResult<Submission> {
        let req = self.http.post(self.url("/api/student/submissions")).json(&json!({
            "assessmentId": assessment_id,
            "content": input.content,
            "attachments": input.attachments,
        }));
        self.send(self.authed(req, session))
    }

    fn grade_submission(
        &self,
        session: &Session,
        submission_id: &str,
        grade: f64,
    ) -> WorkflowResult<Submission> {
        let req = self
            .http
            .post(self.url("/api/faculty/submissions/grade"))
            .json(&json!({ "submissionId": submission_id, "grade": grade }));
        self.send(self.authed(req, session))
    }

    fn upload_attachment(
        &self,
        session: &Session,
        assessment_id: &str,
        file: &Path,
    ) -> WorkflowResult<String> {
        let form = multipart::Form::new()
            .text("assessmentId", assessment_id.to_string())
            .file("file", file)
            .map_err(|e| WorkflowError::Validation(format!("cannot read attachment: {e}")))?;
        let req = self
            .http
            .post(self.url("/api/student/submissions/upload"))
            .multipart(form);
        let body: UploadBody = self.send(self.authed(req, session))?;
        Ok(body.url)
    }
}
