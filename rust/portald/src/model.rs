use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed string enums stored as TEXT and sent as JSON strings.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!(
                        "invalid {}: {}",
                        stringify!($name),
                        other
                    )),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(Role {
    User => "user",
    Student => "student",
    Faculty => "faculty",
    Admin => "admin",
});

text_enum!(MemberRole {
    Leader => "Leader",
    Member => "Member",
});

text_enum!(ApplicationStatus {
    Pending => "Pending",
    Approved => "Approved",
    Rejected => "Rejected",
});

text_enum!(ProjectDomain {
    Aiml => "AIML",
    Cloud => "Cloud",
    Cyber => "Cyber",
    Iot => "IOT",
});

text_enum!(ProjectStatus {
    Draft => "draft",
    Active => "active",
    Completed => "completed",
    Archived => "archived",
});

text_enum!(CourseType {
    Idp => "IDP",
    Urop => "UROP",
    Capstone => "Capstone",
});

text_enum!(AssessmentWindow {
    Upcoming => "upcoming",
    Past => "past",
});

impl ApplicationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub id: String,
    pub user_id: String,
    pub roll_number: String,
    pub batch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyProfile {
    pub id: String,
    pub user_id: String,
    pub department: Option<String>,
    pub designation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProfile {
    pub id: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub profile_picture: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub student: Option<StudentProfile>,
    #[serde(default)]
    pub faculty: Option<FacultyProfile>,
    #[serde(default)]
    pub admin: Option<AdminProfile>,
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub query: Option<String>,
    pub role: Option<Role>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        if let Some(role) = self.role {
            if user.role != role {
                return false;
            }
        }
        match self.query.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => {
                let q = q.to_lowercase();
                user.name.to_lowercase().contains(&q) || user.email.to_lowercase().contains(&q)
            }
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub faculty_id: String,
    pub title: String,
    pub description: String,
    pub domain: ProjectDomain,
    pub status: ProjectStatus,
    pub course: CourseType,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    pub created_at: String,
    pub updated_at: String,
}

/// Catalogue search: the query matches title, description or any tag.
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub query: Option<String>,
    pub domain: Option<ProjectDomain>,
    pub course: Option<CourseType>,
}

impl ProjectFilter {
    pub fn matches(&self, project: &Project) -> bool {
        if self.domain.is_some_and(|d| d != project.domain) {
            return false;
        }
        if self.course.is_some_and(|c| c != project.course) {
            return false;
        }
        match self.query.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => {
                let q = q.to_lowercase();
                project.title.to_lowercase().contains(&q)
                    || project.description.to_lowercase().contains(&q)
                    || project.tags.iter().any(|t| t.to_lowercase().contains(&q))
            }
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInput {
    pub title: String,
    pub description: String,
    pub domain: ProjectDomain,
    #[serde(default = "default_project_status")]
    pub status: ProjectStatus,
    pub course: CourseType,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
}

fn default_project_status() -> ProjectStatus {
    ProjectStatus::Draft
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub roll_number: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub group_id: String,
    pub student_id: String,
    pub member_role: MemberRole,
    pub joined_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student: Option<StudentSummary>,
}

impl Member {
    pub fn is_leader(&self) -> bool {
        self.member_role == MemberRole::Leader
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub project_id: Option<String>,
    pub name: String,
    pub invite_code: String,
    pub max_members: u32,
    pub current_member: u32,
    #[serde(default)]
    pub members: Vec<Member>,
}

impl Group {
    pub fn leader(&self) -> Option<&Member> {
        self.members.iter().find(|m| m.is_leader())
    }

    pub fn member_for_student(&self, student_id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.student_id == student_id)
    }

    pub fn member(&self, member_id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.id == member_id)
    }

    pub fn is_full(&self) -> bool {
        self.current_member >= self.max_members
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub project_id: String,
    pub group_id: String,
    pub application_status: ApplicationStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub domain: ProjectDomain,
    pub status: ProjectStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDetail {
    #[serde(flatten)]
    pub application: Application,
    pub project: ProjectSummary,
    pub group: Group,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: String,
    pub group_id: String,
    pub faculty_id: String,
    pub title: String,
    pub description: String,
    pub google_meet_link: String,
    pub deadline: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: String,
}

impl Assessment {
    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline
    }

    /// Upcoming keeps a deadline equal to `now`; past is strictly before.
    pub fn in_window(&self, window: AssessmentWindow, now: DateTime<Utc>) -> bool {
        match window {
            AssessmentWindow::Upcoming => self.deadline >= now,
            AssessmentWindow::Past => self.deadline < now,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssessment {
    pub group_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub deadline: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubmissionState {
    NotSubmitted,
    Submitted,
    Graded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub assessment_id: String,
    pub student_id: String,
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<String>,
    pub grade: Option<f64>,
    #[serde(default)]
    pub late: bool,
    pub submitted_at: String,
    pub updated_at: String,
}

/// Grades are percentages.
pub fn grade_in_range(grade: f64) -> bool {
    grade.is_finite() && (0.0..=100.0).contains(&grade)
}

impl Submission {
    pub fn state(&self) -> SubmissionState {
        if self.grade.is_some() {
            SubmissionState::Graded
        } else {
            SubmissionState::Submitted
        }
    }

    pub fn has_work(&self) -> bool {
        !self.content.trim().is_empty() || !self.attachments.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionInput {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentSummary {
    #[serde(flatten)]
    pub assessment: Assessment,
    pub group_name: String,
    pub submission_count: u32,
    pub graded_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentView {
    #[serde(flatten)]
    pub assessment: Assessment,
    pub group_name: String,
    pub deadline_passed: bool,
    /// All submissions for faculty; only the caller's own for students.
    #[serde(default)]
    pub submissions: Vec<Submission>,
}

impl AssessmentView {
    pub fn submission_state_for(&self, student_id: &str) -> SubmissionState {
        self.submissions
            .iter()
            .find(|s| s.student_id == student_id)
            .map(Submission::state)
            .unwrap_or(SubmissionState::NotSubmitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_use_wire_spelling() {
        assert_eq!(serde_json::to_string(&Role::Faculty).unwrap(), "\"faculty\"");
        assert_eq!(serde_json::to_string(&MemberRole::Leader).unwrap(), "\"Leader\"");
        assert_eq!("IOT".parse::<ProjectDomain>(), Ok(ProjectDomain::Iot));
        assert!("Unknown".parse::<CourseType>().is_err());
    }

    #[test]
    fn user_filter_matches_name_email_and_role() {
        let user = User {
            id: "u1".into(),
            email: "ada@uni.edu".into(),
            name: "Ada Lovelace".into(),
            role: Role::Student,
            profile_picture: None,
            created_at: String::new(),
            updated_at: String::new(),
            student: None,
            faculty: None,
            admin: None,
        };
        let by_name = UserFilter {
            query: Some("lovelace".into()),
            role: None,
        };
        assert!(by_name.matches(&user));
        let wrong_role = UserFilter {
            query: Some("ada".into()),
            role: Some(Role::Faculty),
        };
        assert!(!wrong_role.matches(&user));
        assert!(UserFilter::default().matches(&user));
    }

    #[test]
    fn project_filter_searches_text_and_tags() {
        let project = Project {
            id: "p1".into(),
            faculty_id: "f1".into(),
            title: "Crop Vision".into(),
            description: "Detect disease from leaf photos".into(),
            domain: ProjectDomain::Aiml,
            status: ProjectStatus::Active,
            course: CourseType::Capstone,
            tags: vec!["PyTorch".into()],
            deadline: None,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let by = |q: &str| ProjectFilter {
            query: Some(q.into()),
            ..ProjectFilter::default()
        };
        assert!(by("VISION").matches(&project));
        assert!(by("leaf").matches(&project));
        assert!(by("torch").matches(&project));
        assert!(by("  ").matches(&project));
        assert!(!by("blockchain").matches(&project));

        let wrong_domain = ProjectFilter {
            domain: Some(ProjectDomain::Cyber),
            ..ProjectFilter::default()
        };
        assert!(!wrong_domain.matches(&project));
        let all_match = ProjectFilter {
            query: Some("crop".into()),
            domain: Some(ProjectDomain::Aiml),
            course: Some(CourseType::Capstone),
        };
        assert!(all_match.matches(&project));
        let wrong_course = ProjectFilter {
            course: Some(CourseType::Urop),
            ..all_match
        };
        assert!(!wrong_course.matches(&project));
    }

    #[test]
    fn grade_range_is_inclusive_and_finite() {
        assert!(grade_in_range(0.0));
        assert!(grade_in_range(100.0));
        assert!(!grade_in_range(-1.0));
        assert!(!grade_in_range(101.0));
        assert!(!grade_in_range(f64::NAN));
    }
}
