//! Fixtures for unit tests: an in-memory workspace with a bootstrap admin
//! and helpers to mint faculty and students through the real role flow.

use crate::api::{LocalApi, PortalApi};
use crate::config::AuthConfig;
use crate::model::{CourseType, Project, ProjectDomain, ProjectInput, ProjectStatus};
use crate::session::Session;
use tempfile::TempDir;

pub const ADMIN_EMAIL: &str = "admin@uni.edu";

pub struct Fixture {
    pub api: LocalApi,
    pub admin: Session,
    uploads: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let uploads = tempfile::tempdir().expect("tempdir");
        let auth = AuthConfig {
            bootstrap_admins: vec![ADMIN_EMAIL.to_string()],
        };
        let api = LocalApi::in_memory(uploads.path().to_path_buf(), auth).expect("api");
        let admin = Session::new(api.login(ADMIN_EMAIL, "Admin").expect("admin login"), None);
        Self {
            api,
            admin,
            uploads,
        }
    }

    pub fn uploads_dir(&self) -> &std::path::Path {
        self.uploads.path()
    }

    pub fn faculty(&self, email: &str) -> Session {
        let user = self.api.login(email, "").expect("login");
        let user = self
            .api
            .assign_faculty_role(&self.admin, &user.id, Some("CSE"), Some("Professor"))
            .expect("assign faculty");
        Session::new(user, None)
    }

    pub fn student(&self, email: &str, roll_number: &str) -> Session {
        let user = self.api.login(email, "").expect("login");
        let user = self
            .api
            .assign_student_role(&self.admin, &user.id, roll_number, Some("2025"))
            .expect("assign student");
        Session::new(user, None)
    }

    pub fn project(&self, faculty: &Session, title: &str) -> Project {
        self.api
            .create_project(faculty, &project_input(title))
            .expect("create project")
    }
}

pub fn project_input(title: &str) -> ProjectInput {
    ProjectInput {
        title: title.to_string(),
        description: format!("{title} description"),
        domain: ProjectDomain::Aiml,
        status: ProjectStatus::Active,
        course: CourseType::Capstone,
        tags: vec!["ml".to_string()],
        deadline: None,
    }
}

pub fn student_id(session: &Session) -> String {
    session.user().student.as_ref().expect("student").id.clone()
}
