//! SQLite-backed authority for a local workspace.
//!
//! Enforces the server-side rules of the portal: ownership, capacity,
//! uniqueness and terminal states. Every method re-reads the acting user
//! from the database rather than trusting the session's cached role.

use super::PortalApi;
use crate::codes;
use crate::config::AuthConfig;
use crate::db;
use crate::error::{WorkflowError, WorkflowResult};
use crate::model::{
    grade_in_range, AdminProfile, Application, ApplicationDetail, ApplicationStatus, Assessment,
    AssessmentSummary, AssessmentView, FacultyProfile, Group, Member, MemberRole, NewAssessment,
    Project, ProjectInput, ProjectSummary, Role, StudentProfile, StudentSummary, Submission,
    SubmissionInput, User, UserFilter,
};
use crate::session::Session;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use reqwest::Url;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

const INVITE_CODE_ATTEMPTS: u32 = 16;

const USER_SELECT: &str = "SELECT
       u.id, u.email, u.name, u.role, u.profile_picture, u.created_at, u.updated_at,
       s.id, s.roll_number, s.batch,
       f.id, f.department, f.designation,
       a.id
     FROM users u
     LEFT JOIN students s ON s.user_id = u.id
     LEFT JOIN faculty f ON f.user_id = u.id
     LEFT JOIN admins a ON a.user_id = u.id";

const PROJECT_SELECT: &str = "SELECT
       id, faculty_id, title, description, domain, status, course, tags, deadline,
       created_at, updated_at
     FROM projects";

const MEMBER_SELECT: &str = "SELECT
       m.id, m.group_id, m.student_id, m.member_role, m.joined_at,
       s.roll_number, u.name, u.email
     FROM group_members m
     JOIN students s ON s.id = m.student_id
     JOIN users u ON u.id = s.user_id";

const APPLICATION_SELECT: &str = "SELECT
       id, project_id, group_id, status, created_at, updated_at
     FROM applications";

const ASSESSMENT_SELECT: &str = "SELECT
       id, group_id, faculty_id, title, description, meet_link, deadline, start_time,
       end_time, created_at
     FROM assessments";

const SUBMISSION_SELECT: &str = "SELECT
       id, assessment_id, student_id, content, attachments, grade, late, submitted_at,
       updated_at
     FROM submissions";

pub struct LocalApi {
    conn: Connection,
    uploads_dir: PathBuf,
    auth: AuthConfig,
}

fn now_ts() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn text_col<T: FromStr<Err = String>>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}

fn ts_col(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn date_col(row: &Row, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d"))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn json_list_col(row: &Row, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn json_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    let id: String = row.get(0)?;
    let role: Role = text_col(row, 3)?;
    let student_id: Option<String> = row.get(7)?;
    let faculty_id: Option<String> = row.get(10)?;
    let admin_id: Option<String> = row.get(13)?;

    // Only the sub-record matching the role is exposed.
    let student = match (role, student_id) {
        (Role::Student, Some(sid)) => Some(StudentProfile {
            id: sid,
            user_id: id.clone(),
            roll_number: row.get(8)?,
            batch: row.get(9)?,
        }),
        _ => None,
    };
    let faculty = match (role, faculty_id) {
        (Role::Faculty, Some(fid)) => Some(FacultyProfile {
            id: fid,
            user_id: id.clone(),
            department: row.get(11)?,
            designation: row.get(12)?,
        }),
        _ => None,
    };
    let admin = match (role, admin_id) {
        (Role::Admin, Some(aid)) => Some(AdminProfile {
            id: aid,
            user_id: id.clone(),
        }),
        _ => None,
    };

    Ok(User {
        id,
        email: row.get(1)?,
        name: row.get(2)?,
        role,
        profile_picture: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        student,
        faculty,
        admin,
    })
}

fn project_from_row(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        faculty_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        domain: text_col(row, 4)?,
        status: text_col(row, 5)?,
        course: text_col(row, 6)?,
        tags: json_list_col(row, 7)?,
        deadline: date_col(row, 8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn member_from_row(row: &Row) -> rusqlite::Result<Member> {
    Ok(Member {
        id: row.get(0)?,
        group_id: row.get(1)?,
        student_id: row.get(2)?,
        member_role: text_col(row, 3)?,
        joined_at: row.get(4)?,
        student: Some(StudentSummary {
            roll_number: row.get(5)?,
            name: row.get(6)?,
            email: row.get(7)?,
        }),
    })
}

fn application_from_row(row: &Row) -> rusqlite::Result<Application> {
    Ok(Application {
        id: row.get(0)?,
        project_id: row.get(1)?,
        group_id: row.get(2)?,
        application_status: text_col(row, 3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn assessment_from_row(row: &Row) -> rusqlite::Result<Assessment> {
    Ok(Assessment {
        id: row.get(0)?,
        group_id: row.get(1)?,
        faculty_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        google_meet_link: row.get(5)?,
        deadline: ts_col(row, 6)?,
        start_time: ts_col(row, 7)?,
        end_time: ts_col(row, 8)?,
        created_at: row.get(9)?,
    })
}

fn submission_from_row(row: &Row) -> rusqlite::Result<Submission> {
    let late: i64 = row.get(6)?;
    Ok(Submission {
        id: row.get(0)?,
        assessment_id: row.get(1)?,
        student_id: row.get(2)?,
        content: row.get(3)?,
        attachments: json_list_col(row, 4)?,
        grade: row.get(5)?,
        late: late != 0,
        submitted_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn not_found(what: &str) -> WorkflowError {
    WorkflowError::NotFound(format!("{what} not found"))
}

fn validate_grade(grade: f64) -> WorkflowResult<()> {
    if grade_in_range(grade) {
        Ok(())
    } else {
        Err(WorkflowError::Validation(
            "Grade must be between 0 and 100".into(),
        ))
    }
}

impl LocalApi {
    pub fn open(workspace: &Path, auth: AuthConfig) -> anyhow::Result<Self> {
        let conn = db::open_db(workspace)?;
        Ok(Self {
            conn,
            uploads_dir: workspace.join("uploads"),
            auth,
        })
    }

    #[cfg(test)]
    pub fn in_memory(uploads_dir: PathBuf, auth: AuthConfig) -> anyhow::Result<Self> {
        Ok(Self {
            conn: db::open_in_memory()?,
            uploads_dir,
            auth,
        })
    }

    /// Stand-in for the external sign-in flow: finds or creates the user
    /// for an email. New users get the bare `user` role unless listed in
    /// `auth.bootstrap_admins`.
    pub fn login(&self, email: &str, name: &str) -> WorkflowResult<User> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(WorkflowError::Validation("a valid email is required".into()));
        }
        if let Some(user) = self.user_by_email(&email)? {
            return Ok(user);
        }

        let name = match name.trim() {
            "" => email.split('@').next().unwrap_or_default().to_string(),
            n => n.to_string(),
        };
        let role = if self.auth.is_bootstrap_admin(&email) {
            Role::Admin
        } else {
            Role::User
        };
        let user_id = Uuid::new_v4().to_string();
        let now = now_ts();

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO users(id, email, name, role, profile_picture, created_at, updated_at)
             VALUES(?, ?, ?, ?, NULL, ?, ?)",
            params![user_id, email, name, role.as_str(), now, now],
        )?;
        if role == Role::Admin {
            tx.execute(
                "INSERT INTO admins(id, user_id) VALUES(?, ?)",
                params![Uuid::new_v4().to_string(), user_id],
            )?;
        }
        tx.commit()?;
        info!(user_id = %user_id, role = %role, "created user on first login");

        self.load_user(&user_id)?
            .ok_or_else(|| WorkflowError::Storage("user vanished after insert".into()))
    }

    fn user_by_email(&self, email: &str) -> WorkflowResult<Option<User>> {
        let sql = format!("{USER_SELECT} WHERE u.email = ?");
        Ok(self
            .conn
            .query_row(&sql, [email], user_from_row)
            .optional()?)
    }

    fn load_user(&self, user_id: &str) -> WorkflowResult<Option<User>> {
        let sql = format!("{USER_SELECT} WHERE u.id = ?");
        Ok(self
            .conn
            .query_row(&sql, [user_id], user_from_row)
            .optional()?)
    }

    fn actor(&self, session: &Session) -> WorkflowResult<User> {
        self.load_user(session.user_id())?
            .ok_or(WorkflowError::Unauthenticated)
    }

    fn actor_student(&self, session: &Session) -> WorkflowResult<StudentProfile> {
        let actor = self.actor(session)?;
        actor
            .student
            .ok_or_else(|| WorkflowError::Forbidden("requester is not a student".into()))
    }

    fn actor_faculty(&self, session: &Session) -> WorkflowResult<FacultyProfile> {
        let actor = self.actor(session)?;
        actor
            .faculty
            .ok_or_else(|| WorkflowError::Forbidden("requester is not faculty".into()))
    }

    fn actor_admin(&self, session: &Session) -> WorkflowResult<User> {
        let actor = self.actor(session)?;
        if actor.role != Role::Admin {
            return Err(WorkflowError::Forbidden("requester is not an admin".into()));
        }
        Ok(actor)
    }

    fn load_project(&self, project_id: &str) -> WorkflowResult<Option<Project>> {
        let sql = format!("{PROJECT_SELECT} WHERE id = ?");
        Ok(self
            .conn
            .query_row(&sql, [project_id], project_from_row)
            .optional()?)
    }

    fn owned_project(&self, project_id: &str, faculty: &FacultyProfile) -> WorkflowResult<Project> {
        let project = self
            .load_project(project_id)?
            .ok_or_else(|| not_found("Project"))?;
        if project.faculty_id != faculty.id {
            return Err(WorkflowError::Forbidden(
                "project is owned by another faculty member".into(),
            ));
        }
        Ok(project)
    }

    fn load_members(&self, group_id: &str) -> WorkflowResult<Vec<Member>> {
        let sql = format!(
            "{MEMBER_SELECT} WHERE m.group_id = ?
             ORDER BY (m.member_role = 'Leader') DESC, m.joined_at, m.id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let members = stmt
            .query_map([group_id], member_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(members)
    }

    fn load_group(&self, group_id: &str) -> WorkflowResult<Option<Group>> {
        let head = self
            .conn
            .query_row(
                "SELECT id, project_id, name, invite_code, max_members
                 FROM project_groups WHERE id = ?",
                [group_id],
                |r| {
                    Ok((
                        r.get::<_, String>(0)?,
                        r.get::<_, Option<String>>(1)?,
                        r.get::<_, String>(2)?,
                        r.get::<_, String>(3)?,
                        r.get::<_, u32>(4)?,
                    ))
                },
            )
            .optional()?;
        let Some((id, project_id, name, invite_code, max_members)) = head else {
            return Ok(None);
        };
        let members = self.load_members(&id)?;
        Ok(Some(Group {
            id,
            project_id,
            name,
            invite_code,
            max_members,
            current_member: members.len() as u32,
            members,
        }))
    }

    fn require_group(&self, group_id: &str) -> WorkflowResult<Group> {
        self.load_group(group_id)?.ok_or_else(|| not_found("Group"))
    }

    fn membership_for_project(
        &self,
        student_id: &str,
        project_id: &str,
    ) -> WorkflowResult<Option<Member>> {
        let sql = format!(
            "{MEMBER_SELECT}
             JOIN project_groups g ON g.id = m.group_id
             WHERE m.student_id = ? AND g.project_id = ?"
        );
        Ok(self
            .conn
            .query_row(&sql, [student_id, project_id], member_from_row)
            .optional()?)
    }

    /// Group visibility: its members, the faculty owning its project, admins.
    fn can_view_group(&self, actor: &User, group: &Group) -> WorkflowResult<bool> {
        match actor.role {
            Role::Admin => Ok(true),
            Role::Student => Ok(actor
                .student
                .as_ref()
                .map(|s| group.member_for_student(&s.id).is_some())
                .unwrap_or(false)),
            Role::Faculty => {
                let Some(faculty) = actor.faculty.as_ref() else {
                    return Ok(false);
                };
                let Some(project_id) = group.project_id.as_deref() else {
                    return Ok(false);
                };
                Ok(self
                    .load_project(project_id)?
                    .map(|p| p.faculty_id == faculty.id)
                    .unwrap_or(false))
            }
            Role::User => Ok(false),
        }
    }

    fn unused_invite_code(&self, group_id: &str) -> WorkflowResult<String> {
        for attempt in 0..INVITE_CODE_ATTEMPTS {
            let code = codes::invite_code(group_id, attempt);
            let taken: Option<i64> = self
                .conn
                .query_row(
                    "SELECT 1 FROM project_groups WHERE invite_code = ?",
                    [&code],
                    |r| r.get(0),
                )
                .optional()?;
            if taken.is_none() {
                return Ok(code);
            }
            debug!(attempt, "invite code collision");
        }
        Err(WorkflowError::Storage(
            "could not allocate a unique invite code".into(),
        ))
    }

    fn load_application(&self, application_id: &str) -> WorkflowResult<Option<Application>> {
        let sql = format!("{APPLICATION_SELECT} WHERE id = ?");
        Ok(self
            .conn
            .query_row(&sql, [application_id], application_from_row)
            .optional()?)
    }

    fn application_detail(&self, application: Application) -> WorkflowResult<ApplicationDetail> {
        let project = self
            .load_project(&application.project_id)?
            .ok_or_else(|| not_found("Project"))?;
        let group = self.require_group(&application.group_id)?;
        Ok(ApplicationDetail {
            application,
            project: ProjectSummary {
                id: project.id,
                title: project.title,
                description: project.description,
                domain: project.domain,
                status: project.status,
            },
            group,
        })
    }

    fn has_approved_application(&self, project_id: &str, group_id: &str) -> WorkflowResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM applications
                 WHERE project_id = ? AND group_id = ? AND status = ?",
                params![project_id, group_id, ApplicationStatus::Approved.as_str()],
                |r| r.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn load_assessment(&self, assessment_id: &str) -> WorkflowResult<Option<Assessment>> {
        let sql = format!("{ASSESSMENT_SELECT} WHERE id = ?");
        Ok(self
            .conn
            .query_row(&sql, [assessment_id], assessment_from_row)
            .optional()?)
    }

    fn require_assessment(&self, assessment_id: &str) -> WorkflowResult<Assessment> {
        self.load_assessment(assessment_id)?
            .ok_or_else(|| not_found("Assessment"))
    }

    fn group_name(&self, group_id: &str) -> WorkflowResult<String> {
        Ok(self
            .conn
            .query_row(
                "SELECT name FROM project_groups WHERE id = ?",
                [group_id],
                |r| r.get(0),
            )
            .optional()?
            .unwrap_or_default())
    }

    fn is_group_member(&self, group_id: &str, student_id: &str) -> WorkflowResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM group_members WHERE group_id = ? AND student_id = ?",
                [group_id, student_id],
                |r| r.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn load_submission(&self, submission_id: &str) -> WorkflowResult<Option<Submission>> {
        let sql = format!("{SUBMISSION_SELECT} WHERE id = ?");
        Ok(self
            .conn
            .query_row(&sql, [submission_id], submission_from_row)
            .optional()?)
    }

    fn submissions_for(
        &self,
        assessment_id: &str,
        student_id: Option<&str>,
    ) -> WorkflowResult<Vec<Submission>> {
        let mut out = Vec::new();
        match student_id {
            Some(sid) => {
                let sql = format!(
                    "{SUBMISSION_SELECT} WHERE assessment_id = ? AND student_id = ?"
                );
                let mut stmt = self.conn.prepare(&sql)?;
                for s in stmt.query_map([assessment_id, sid], submission_from_row)? {
                    out.push(s?);
                }
            }
            None => {
                let sql = format!(
                    "{SUBMISSION_SELECT} WHERE assessment_id = ? ORDER BY submitted_at, id"
                );
                let mut stmt = self.conn.prepare(&sql)?;
                for s in stmt.query_map([assessment_id], submission_from_row)? {
                    out.push(s?);
                }
            }
        }
        Ok(out)
    }

    fn assessment_summaries(
        &self,
        filter_sql: &str,
        key: &str,
    ) -> WorkflowResult<Vec<AssessmentSummary>> {
        let sql = format!(
            "SELECT a.id,
               (SELECT COUNT(*) FROM submissions s WHERE s.assessment_id = a.id),
               (SELECT COUNT(*) FROM submissions s WHERE s.assessment_id = a.id AND s.grade IS NOT NULL)
             FROM assessments a
             {filter_sql}
             ORDER BY a.deadline, a.id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([key], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, u32>(1)?,
                    r.get::<_, u32>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut out = Vec::with_capacity(rows.len());
        for (id, submission_count, graded_count) in rows {
            let assessment = self.require_assessment(&id)?;
            let group_name = self.group_name(&assessment.group_id)?;
            out.push(AssessmentSummary {
                assessment,
                group_name,
                submission_count,
                graded_count,
            });
        }
        Ok(out)
    }

    fn assign_role(
        &self,
        session: &Session,
        user_id: &str,
        role: Role,
        upsert_profile: impl FnOnce(&rusqlite::Transaction) -> rusqlite::Result<()>,
    ) -> WorkflowResult<User> {
        self.actor_admin(session)?;
        let target = self.load_user(user_id)?.ok_or_else(|| not_found("User"))?;

        // Dropping a sub-record that other rows still reference would orphan them.
        if target.role != role {
            if let Some(student) = target.student.as_ref() {
                let in_group: Option<i64> = self
                    .conn
                    .query_row(
                        "SELECT 1 FROM group_members WHERE student_id = ? LIMIT 1",
                        [&student.id],
                        |r| r.get(0),
                    )
                    .optional()?;
                if in_group.is_some() {
                    return Err(WorkflowError::Conflict(
                        "Student belongs to a group; remove them from it before changing role"
                            .into(),
                    ));
                }
            }
            if let Some(faculty) = target.faculty.as_ref() {
                let owns: Option<i64> = self
                    .conn
                    .query_row(
                        "SELECT 1 FROM projects WHERE faculty_id = ? LIMIT 1",
                        [&faculty.id],
                        |r| r.get(0),
                    )
                    .optional()?;
                if owns.is_some() {
                    return Err(WorkflowError::Conflict(
                        "Faculty member owns projects; reassign or delete them before changing role"
                            .into(),
                    ));
                }
            }
        }

        let tx = self.conn.unchecked_transaction()?;
        if role != Role::Student {
            tx.execute("DELETE FROM students WHERE user_id = ?", [user_id])?;
        }
        if role != Role::Faculty {
            tx.execute("DELETE FROM faculty WHERE user_id = ?", [user_id])?;
        }
        if role != Role::Admin {
            tx.execute("DELETE FROM admins WHERE user_id = ?", [user_id])?;
        }
        upsert_profile(&tx)?;
        tx.execute(
            "UPDATE users SET role = ?, updated_at = ? WHERE id = ?",
            params![role.as_str(), now_ts(), user_id],
        )?;
        tx.commit()?;
        info!(user_id, role = %role, "role assigned");

        self.load_user(user_id)?.ok_or_else(|| not_found("User"))
    }

    fn write_project(
        &self,
        project_id: &str,
        faculty_id: &str,
        input: &ProjectInput,
        insert: bool,
    ) -> WorkflowResult<Project> {
        if input.title.trim().is_empty() || input.description.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "Title and description are required".into(),
            ));
        }
        let now = now_ts();
        let deadline = input.deadline.map(|d| d.format("%Y-%m-%d").to_string());
        if insert {
            self.conn.execute(
                "INSERT INTO projects(
                   id, faculty_id, title, description, domain, status, course, tags, deadline,
                   created_at, updated_at)
                 VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    project_id,
                    faculty_id,
                    input.title.trim(),
                    input.description.trim(),
                    input.domain.as_str(),
                    input.status.as_str(),
                    input.course.as_str(),
                    json_list(&input.tags),
                    deadline,
                    now,
                    now
                ],
            )?;
        } else {
            self.conn.execute(
                "UPDATE projects SET
                   title = ?, description = ?, domain = ?, status = ?, course = ?, tags = ?,
                   deadline = ?, updated_at = ?
                 WHERE id = ?",
                params![
                    input.title.trim(),
                    input.description.trim(),
                    input.domain.as_str(),
                    input.status.as_str(),
                    input.course.as_str(),
                    json_list(&input.tags),
                    deadline,
                    now,
                    project_id
                ],
            )?;
        }
        self.load_project(project_id)?
            .ok_or_else(|| not_found("Project"))
    }
}

impl PortalApi for LocalApi {
    fn current_user(&self, session: &Session) -> WorkflowResult<User> {
        self.actor(session)
    }

    fn list_users(&self, session: &Session, filter: &UserFilter) -> WorkflowResult<Vec<User>> {
        self.actor_admin(session)?;
        let sql = format!("{USER_SELECT} ORDER BY u.created_at, u.email");
        let mut stmt = self.conn.prepare(&sql)?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users.into_iter().filter(|u| filter.matches(u)).collect())
    }

    fn assign_faculty_role(
        &self,
        session: &Session,
        user_id: &str,
        department: Option<&str>,
        designation: Option<&str>,
    ) -> WorkflowResult<User> {
        self.assign_role(session, user_id, Role::Faculty, |tx| {
            let updated = tx.execute(
                "UPDATE faculty SET department = ?, designation = ? WHERE user_id = ?",
                params![department, designation, user_id],
            )?;
            if updated == 0 {
                tx.execute(
                    "INSERT INTO faculty(id, user_id, department, designation) VALUES(?, ?, ?, ?)",
                    params![Uuid::new_v4().to_string(), user_id, department, designation],
                )?;
            }
            Ok(())
        })
    }

    fn assign_student_role(
        &self,
        session: &Session,
        user_id: &str,
        roll_number: &str,
        batch: Option<&str>,
    ) -> WorkflowResult<User> {
        if roll_number.trim().is_empty() {
            return Err(WorkflowError::Validation("Roll number is required".into()));
        }
        self.assign_role(session, user_id, Role::Student, |tx| {
            let updated = tx.execute(
                "UPDATE students SET roll_number = ?, batch = ? WHERE user_id = ?",
                params![roll_number.trim(), batch, user_id],
            )?;
            if updated == 0 {
                tx.execute(
                    "INSERT INTO students(id, user_id, roll_number, batch) VALUES(?, ?, ?, ?)",
                    params![Uuid::new_v4().to_string(), user_id, roll_number.trim(), batch],
                )?;
            }
            Ok(())
        })
    }

    fn assign_admin_role(&self, session: &Session, user_id: &str) -> WorkflowResult<User> {
        self.assign_role(session, user_id, Role::Admin, |tx| {
            tx.execute(
                "INSERT OR IGNORE INTO admins(id, user_id) VALUES(?, ?)",
                params![Uuid::new_v4().to_string(), user_id],
            )?;
            Ok(())
        })
    }

    fn list_projects(&self, session: &Session) -> WorkflowResult<Vec<Project>> {
        self.actor(session)?;
        let sql = format!("{PROJECT_SELECT} ORDER BY created_at DESC, id");
        let mut stmt = self.conn.prepare(&sql)?;
        let projects = stmt
            .query_map([], project_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(projects)
    }

    fn get_project(&self, session: &Session, project_id: &str) -> WorkflowResult<Project> {
        self.actor(session)?;
        self.load_project(project_id)?
            .ok_or_else(|| not_found("Project"))
    }

    fn faculty_projects(&self, session: &Session) -> WorkflowResult<Vec<Project>> {
        let faculty = self.actor_faculty(session)?;
        let sql = format!("{PROJECT_SELECT} WHERE faculty_id = ? ORDER BY created_at DESC, id");
        let mut stmt = self.conn.prepare(&sql)?;
        let projects = stmt
            .query_map([&faculty.id], project_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(projects)
    }

    fn create_project(&self, session: &Session, input: &ProjectInput) -> WorkflowResult<Project> {
        let faculty = self.actor_faculty(session)?;
        let project_id = Uuid::new_v4().to_string();
        self.write_project(&project_id, &faculty.id, input, true)
    }

    fn update_project(
        &self,
        session: &Session,
        project_id: &str,
        input: &ProjectInput,
    ) -> WorkflowResult<Project> {
        let faculty = self.actor_faculty(session)?;
        self.owned_project(project_id, &faculty)?;
        self.write_project(project_id, &faculty.id, input, false)
    }

    fn delete_project(&self, session: &Session, project_id: &str) -> WorkflowResult<()> {
        let faculty = self.actor_faculty(session)?;
        self.owned_project(project_id, &faculty)?;
        let has_groups: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM project_groups WHERE project_id = ? LIMIT 1",
                [project_id],
                |r| r.get(0),
            )
            .optional()?;
        if has_groups.is_some() {
            return Err(WorkflowError::Conflict(
                "Project has groups and cannot be deleted".into(),
            ));
        }
        self.conn
            .execute("DELETE FROM projects WHERE id = ?", [project_id])?;
        Ok(())
    }

    fn is_member(
        &self,
        session: &Session,
        student_id: &str,
        project_id: &str,
    ) -> WorkflowResult<Option<Member>> {
        let student = self.actor_student(session)?;
        if student.id != student_id {
            return Err(WorkflowError::Forbidden(
                "membership of another student requested".into(),
            ));
        }
        self.membership_for_project(student_id, project_id)
    }

    fn get_group(&self, session: &Session, group_id: &str) -> WorkflowResult<Group> {
        let actor = self.actor(session)?;
        let group = self.require_group(group_id)?;
        if !self.can_view_group(&actor, &group)? {
            return Err(WorkflowError::Forbidden("group is not visible to requester".into()));
        }
        Ok(group)
    }

    fn create_group(
        &self,
        session: &Session,
        project_id: &str,
        name: &str,
        max_members: u32,
    ) -> WorkflowResult<Group> {
        let student = self.actor_student(session)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkflowError::Validation("Group name is required".into()));
        }
        if max_members == 0 {
            return Err(WorkflowError::Validation(
                "Group must allow at least one member".into(),
            ));
        }
        if self.load_project(project_id)?.is_none() {
            return Err(not_found("Project"));
        }
        if self.membership_for_project(&student.id, project_id)?.is_some() {
            return Err(WorkflowError::Conflict(
                "You are already in a group for this project".into(),
            ));
        }

        let group_id = Uuid::new_v4().to_string();
        let invite_code = self.unused_invite_code(&group_id)?;
        let now = now_ts();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO project_groups(id, project_id, name, invite_code, max_members, created_at)
             VALUES(?, ?, ?, ?, ?, ?)",
            params![group_id, project_id, name, invite_code, max_members, now],
        )?;
        tx.execute(
            "INSERT INTO group_members(id, group_id, student_id, member_role, joined_at)
             VALUES(?, ?, ?, ?, ?)",
            params![
                Uuid::new_v4().to_string(),
                group_id,
                student.id,
                MemberRole::Leader.as_str(),
                now
            ],
        )?;
        tx.commit()?;
        info!(group_id = %group_id, project_id, "group created");

        self.require_group(&group_id)
    }

    fn join_group(&self, session: &Session, invite_code: &str) -> WorkflowResult<Group> {
        let student = self.actor_student(session)?;
        let code = invite_code.trim();
        let group_id: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM project_groups WHERE invite_code = ?",
                [code],
                |r| r.get(0),
            )
            .optional()?;
        let Some(group_id) = group_id else {
            return Err(WorkflowError::NotFound("Invalid invite code".into()));
        };
        let group = self.require_group(&group_id)?;

        if group.member_for_student(&student.id).is_some() {
            return Err(WorkflowError::Conflict(
                "You are already a member of this group".into(),
            ));
        }
        if let Some(project_id) = group.project_id.as_deref() {
            if self.membership_for_project(&student.id, project_id)?.is_some() {
                return Err(WorkflowError::Conflict(
                    "You are already in a group for this project".into(),
                ));
            }
        }
        if group.is_full() {
            return Err(WorkflowError::Conflict("Group is full".into()));
        }

        self.conn.execute(
            "INSERT INTO group_members(id, group_id, student_id, member_role, joined_at)
             VALUES(?, ?, ?, ?, ?)",
            params![
                Uuid::new_v4().to_string(),
                group.id,
                student.id,
                MemberRole::Member.as_str(),
                now_ts()
            ],
        )?;
        self.require_group(&group.id)
    }

    fn remove_member(
        &self,
        session: &Session,
        member_id: &str,
        group_id: &str,
    ) -> WorkflowResult<()> {
        let student = self.actor_student(session)?;
        let group = self.require_group(group_id)?;
        let is_leader = group
            .member_for_student(&student.id)
            .map(Member::is_leader)
            .unwrap_or(false);
        if !is_leader {
            return Err(WorkflowError::Forbidden(
                "only the group leader can remove members".into(),
            ));
        }
        let target = group.member(member_id).ok_or_else(|| not_found("Member"))?;
        if target.is_leader() {
            return Err(WorkflowError::Forbidden(
                "the group leader cannot be removed".into(),
            ));
        }
        self.conn.execute(
            "DELETE FROM group_members WHERE id = ? AND group_id = ?",
            [member_id, group_id],
        )?;
        Ok(())
    }

    fn leave_group(&self, session: &Session, group_id: &str) -> WorkflowResult<()> {
        let student = self.actor_student(session)?;
        let group = self.require_group(group_id)?;
        let me = group
            .member_for_student(&student.id)
            .ok_or_else(|| WorkflowError::NotFound("You are not a member of this group".into()))?;
        if me.is_leader() {
            return Err(WorkflowError::InvalidTransition(
                "Transfer leadership before leaving the group".into(),
            ));
        }
        self.conn
            .execute("DELETE FROM group_members WHERE id = ?", [&me.id])?;
        Ok(())
    }

    fn transfer_leadership(
        &self,
        session: &Session,
        group_id: &str,
        member_id: &str,
    ) -> WorkflowResult<Group> {
        let student = self.actor_student(session)?;
        let group = self.require_group(group_id)?;
        let me = group
            .member_for_student(&student.id)
            .filter(|m| m.is_leader())
            .ok_or_else(|| {
                WorkflowError::Forbidden("only the group leader can transfer leadership".into())
            })?;
        let target = group.member(member_id).ok_or_else(|| not_found("Member"))?;
        if target.id == me.id {
            return Err(WorkflowError::InvalidTransition(
                "You are already the group leader".into(),
            ));
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE group_members SET member_role = ? WHERE id = ?",
            params![MemberRole::Member.as_str(), me.id],
        )?;
        tx.execute(
            "UPDATE group_members SET member_role = ? WHERE id = ?",
            params![MemberRole::Leader.as_str(), target.id],
        )?;
        tx.commit()?;
        info!(group_id, member_id, "leadership transferred");

        self.require_group(group_id)
    }

    fn create_application(
        &self,
        session: &Session,
        project_id: &str,
        group_id: &str,
    ) -> WorkflowResult<Application> {
        let student = self.actor_student(session)?;
        let group = self.require_group(group_id)?;
        let me = group.member_for_student(&student.id).ok_or_else(|| {
            WorkflowError::Forbidden("requester is not a member of the group".into())
        })?;
        if !me.is_leader() {
            return Err(WorkflowError::Forbidden(
                "only group leaders can apply for projects".into(),
            ));
        }
        if self.load_project(project_id)?.is_none() {
            return Err(not_found("Project"));
        }
        if group.project_id.as_deref() != Some(project_id) {
            return Err(WorkflowError::Conflict(
                "Group belongs to a different project".into(),
            ));
        }
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM applications WHERE project_id = ? AND group_id = ?",
                [project_id, group_id],
                |r| r.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(WorkflowError::Conflict(
                "This group has already applied to this project".into(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        let now = now_ts();
        self.conn.execute(
            "INSERT INTO applications(id, project_id, group_id, status, created_at, updated_at)
             VALUES(?, ?, ?, ?, ?, ?)",
            params![
                id,
                project_id,
                group_id,
                ApplicationStatus::Pending.as_str(),
                now,
                now
            ],
        )?;
        self.load_application(&id)?
            .ok_or_else(|| not_found("Application"))
    }

    fn list_applications(&self, session: &Session) -> WorkflowResult<Vec<ApplicationDetail>> {
        let actor = self.actor(session)?;
        let (sql, key) = match (actor.role, actor.student.as_ref(), actor.faculty.as_ref()) {
            (Role::Student, Some(s), _) => (
                format!(
                    "{APPLICATION_SELECT} WHERE group_id IN (
                       SELECT group_id FROM group_members WHERE student_id = ?)
                     ORDER BY created_at DESC, id"
                ),
                Some(s.id.clone()),
            ),
            (Role::Faculty, _, Some(f)) => (
                format!(
                    "{APPLICATION_SELECT} WHERE project_id IN (
                       SELECT id FROM projects WHERE faculty_id = ?)
                     ORDER BY created_at DESC, id"
                ),
                Some(f.id.clone()),
            ),
            (Role::Admin, _, _) => (
                format!("{APPLICATION_SELECT} ORDER BY created_at DESC, id"),
                None,
            ),
            _ => {
                return Err(WorkflowError::Forbidden(
                    "role has no applications view".into(),
                ))
            }
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let apps = match key {
            Some(k) => stmt
                .query_map([k], application_from_row)?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([], application_from_row)?
                .collect::<Result<Vec<_>, _>>()?,
        };
        apps.into_iter()
            .map(|a| self.application_detail(a))
            .collect()
    }

    fn get_application(
        &self,
        session: &Session,
        application_id: &str,
    ) -> WorkflowResult<ApplicationDetail> {
        let actor = self.actor(session)?;
        let application = self
            .load_application(application_id)?
            .ok_or_else(|| not_found("Application"))?;
        let detail = self.application_detail(application)?;
        if !self.can_view_group(&actor, &detail.group)? {
            return Err(WorkflowError::Forbidden(
                "application is not visible to requester".into(),
            ));
        }
        Ok(detail)
    }

    fn review_application(
        &self,
        session: &Session,
        application_id: &str,
        status: ApplicationStatus,
    ) -> WorkflowResult<Application> {
        let faculty = self.actor_faculty(session)?;
        if status == ApplicationStatus::Pending {
            return Err(WorkflowError::Validation(
                "status must be Approved or Rejected".into(),
            ));
        }
        let application = self
            .load_application(application_id)?
            .ok_or_else(|| not_found("Application"))?;
        self.owned_project(&application.project_id, &faculty)?;
        if application.application_status.is_terminal() {
            return Err(WorkflowError::InvalidTransition(format!(
                "Application is already {}",
                application.application_status
            )));
        }

        self.conn.execute(
            "UPDATE applications SET status = ?, updated_at = ? WHERE id = ?",
            params![status.as_str(), now_ts(), application_id],
        )?;
        info!(application_id, status = %status, "application reviewed");
        self.load_application(application_id)?
            .ok_or_else(|| not_found("Application"))
    }

    fn create_assessment(
        &self,
        session: &Session,
        input: &NewAssessment,
    ) -> WorkflowResult<Assessment> {
        let faculty = self.actor_faculty(session)?;
        if input.title.trim().is_empty() {
            return Err(WorkflowError::Validation("Title is required".into()));
        }
        if input.end_time <= input.start_time {
            return Err(WorkflowError::Validation(
                "Meeting end time must be after its start time".into(),
            ));
        }
        let group = self.require_group(&input.group_id)?;
        let project_id = group.project_id.as_deref().ok_or_else(|| {
            WorkflowError::InvalidTransition("Group has not chosen a project".into())
        })?;
        self.owned_project(project_id, &faculty)?;
        if !self.has_approved_application(project_id, &group.id)? {
            return Err(WorkflowError::InvalidTransition(
                "Group has no approved application for this project".into(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO assessments(
               id, group_id, faculty_id, title, description, meet_link, deadline, start_time,
               end_time, created_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                id,
                group.id,
                faculty.id,
                input.title.trim(),
                input.description.trim(),
                codes::meet_link(&id),
                ts(&input.deadline),
                ts(&input.start_time),
                ts(&input.end_time),
                now_ts()
            ],
        )?;
        self.require_assessment(&id)
    }

    fn list_assessments(&self, session: &Session) -> WorkflowResult<Vec<AssessmentSummary>> {
        let actor = self.actor(session)?;
        match (actor.student.as_ref(), actor.faculty.as_ref()) {
            (Some(s), _) => self.assessment_summaries(
                "WHERE a.group_id IN (SELECT group_id FROM group_members WHERE student_id = ?)",
                &s.id,
            ),
            (_, Some(f)) => self.assessment_summaries("WHERE a.faculty_id = ?", &f.id),
            _ => Err(WorkflowError::Forbidden(
                "role has no assessments view".into(),
            )),
        }
    }

    fn get_assessment(
        &self,
        session: &Session,
        assessment_id: &str,
    ) -> WorkflowResult<AssessmentView> {
        let actor = self.actor(session)?;
        let assessment = self.require_assessment(assessment_id)?;
        let sees_all = actor.role == Role::Admin
            || actor
                .faculty
                .as_ref()
                .map(|f| f.id == assessment.faculty_id)
                .unwrap_or(false);
        let submissions = if sees_all {
            self.submissions_for(assessment_id, None)?
        } else {
            match actor.student.as_ref() {
                Some(s) if self.is_group_member(&assessment.group_id, &s.id)? => {
                    self.submissions_for(assessment_id, Some(&s.id))?
                }
                _ => {
                    return Err(WorkflowError::Forbidden(
                        "assessment is not visible to requester".into(),
                    ))
                }
            }
        };
        let group_name = self.group_name(&assessment.group_id)?;
        Ok(AssessmentView {
            deadline_passed: assessment.deadline_passed(Utc::now()),
            assessment,
            group_name,
            submissions,
        })
    }

    fn submit_assessment(
        &self,
        session: &Session,
        assessment_id: &str,
        input: &SubmissionInput,
    ) -> WorkflowResult<Submission> {
        let student = self.actor_student(session)?;
        let assessment = self.require_assessment(assessment_id)?;
        if !self.is_group_member(&assessment.group_id, &student.id)? {
            return Err(WorkflowError::Forbidden(
                "requester is not a member of the assessment's group".into(),
            ));
        }
        if input.content.trim().is_empty() && input.attachments.is_empty() {
            return Err(WorkflowError::Validation(
                "Please add content or attach files before submitting.".into(),
            ));
        }

        let now = Utc::now();
        let existing = self
            .submissions_for(assessment_id, Some(&student.id))?
            .into_iter()
            .next();
        let id = match existing {
            Some(prev) => {
                if prev.grade.is_some() {
                    return Err(WorkflowError::InvalidTransition(
                        "Submission has already been graded".into(),
                    ));
                }
                if assessment.deadline_passed(now) {
                    return Err(WorkflowError::InvalidTransition(
                        "The deadline has passed; the submission can no longer be edited".into(),
                    ));
                }
                self.conn.execute(
                    "UPDATE submissions SET content = ?, attachments = ?, updated_at = ?
                     WHERE id = ?",
                    params![input.content, json_list(&input.attachments), ts(&now), prev.id],
                )?;
                prev.id
            }
            None => {
                let id = Uuid::new_v4().to_string();
                let late = assessment.deadline_passed(now);
                self.conn.execute(
                    "INSERT INTO submissions(
                       id, assessment_id, student_id, content, attachments, grade, late,
                       submitted_at, updated_at)
                     VALUES(?, ?, ?, ?, ?, NULL, ?, ?, ?)",
                    params![
                        id,
                        assessment_id,
                        student.id,
                        input.content,
                        json_list(&input.attachments),
                        late as i64,
                        ts(&now),
                        ts(&now)
                    ],
                )?;
                if late {
                    info!(assessment_id, "late submission accepted");
                }
                id
            }
        };
        self.load_submission(&id)?
            .ok_or_else(|| not_found("Submission"))
    }

    fn grade_submission(
        &self,
        session: &Session,
        submission_id: &str,
        grade: f64,
    ) -> WorkflowResult<Submission> {
        let faculty = self.actor_faculty(session)?;
        validate_grade(grade)?;
        let submission = self
            .load_submission(submission_id)?
            .ok_or_else(|| not_found("Submission"))?;
        let assessment = self.require_assessment(&submission.assessment_id)?;
        if assessment.faculty_id != faculty.id {
            return Err(WorkflowError::Forbidden(
                "assessment was issued by another faculty member".into(),
            ));
        }
        if !submission.has_work() {
            return Err(WorkflowError::InvalidTransition(
                "Submission has no content to grade".into(),
            ));
        }
        self.conn.execute(
            "UPDATE submissions SET grade = ?, updated_at = ? WHERE id = ?",
            params![grade, now_ts(), submission_id],
        )?;
        self.load_submission(submission_id)?
            .ok_or_else(|| not_found("Submission"))
    }

    fn upload_attachment(
        &self,
        session: &Session,
        assessment_id: &str,
        file: &Path,
    ) -> WorkflowResult<String> {
        let student = self.actor_student(session)?;
        let assessment = self.require_assessment(assessment_id)?;
        if !self.is_group_member(&assessment.group_id, &student.id)? {
            return Err(WorkflowError::Forbidden(
                "requester is not a member of the assessment's group".into(),
            ));
        }
        if !file.is_file() {
            return Err(WorkflowError::Validation(format!(
                "file not found: {}",
                file.to_string_lossy()
            )));
        }
        let file_name = file
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("attachment");
        let dir = self.uploads_dir.join(assessment_id);
        std::fs::create_dir_all(&dir)?;
        let dest = dir.join(format!("{}-{}", Uuid::new_v4(), file_name));
        std::fs::copy(file, &dest)?;
        let dest = std::fs::canonicalize(&dest)?;
        Url::from_file_path(&dest).map(String::from).map_err(|()| {
            WorkflowError::Storage(format!("no file URL for {}", dest.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{project_input, student_id, Fixture};

    #[test]
    fn first_login_creates_plain_user_and_bootstrap_admin() {
        let fx = Fixture::new();
        assert_eq!(fx.admin.role(), Role::Admin);
        assert!(fx.admin.user().admin.is_some());

        let user = fx.api.login("  New@Uni.edu ", "").expect("login");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.email, "new@uni.edu");
        assert_eq!(user.name, "new");
        let again = fx.api.login("new@uni.edu", "Other").expect("login again");
        assert_eq!(again.id, user.id);

        let err = fx.api.login("not-an-email", "").unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }

    #[test]
    fn role_assignment_swaps_sub_record() {
        let fx = Fixture::new();
        let user = fx.api.login("x@uni.edu", "X").expect("login");
        let faculty = fx
            .api
            .assign_faculty_role(&fx.admin, &user.id, Some("EE"), None)
            .expect("faculty");
        assert_eq!(faculty.role, Role::Faculty);
        assert_eq!(
            faculty.faculty.as_ref().and_then(|f| f.department.as_deref()),
            Some("EE")
        );

        let student = fx
            .api
            .assign_student_role(&fx.admin, &user.id, "CS-01", None)
            .expect("student");
        assert_eq!(student.role, Role::Student);
        assert!(student.faculty.is_none());
        assert_eq!(student.student.as_ref().map(|s| s.roll_number.as_str()), Some("CS-01"));

        let err = fx
            .api
            .assign_student_role(&fx.admin, &user.id, "  ", None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        let session = Session::new(student, None);
        let err = fx.api.assign_admin_role(&session, &user.id).unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));
    }

    #[test]
    fn role_change_blocked_while_student_is_in_a_group() {
        let fx = Fixture::new();
        let prof = fx.faculty("prof@uni.edu");
        let alice = fx.student("alice@uni.edu", "R1");
        let project = fx.project(&prof, "Vision");
        fx.api
            .create_group(&alice, &project.id, "A-team", 4)
            .expect("group");

        let err = fx
            .api
            .assign_faculty_role(&fx.admin, alice.user_id(), None, None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict(_)));
    }

    #[test]
    fn project_ownership_and_delete_conflict() {
        let fx = Fixture::new();
        let prof = fx.faculty("prof@uni.edu");
        let other = fx.faculty("other@uni.edu");
        let alice = fx.student("alice@uni.edu", "R1");
        let project = fx.project(&prof, "Vision");

        let err = fx
            .api
            .update_project(&other, &project.id, &project_input("Stolen"))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));

        let err = fx.api.create_project(&alice, &project_input("Mine")).unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));

        fx.api
            .create_group(&alice, &project.id, "A-team", 4)
            .expect("group");
        let err = fx.api.delete_project(&prof, &project.id).unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict(_)));

        let spare = fx.project(&prof, "Spare");
        fx.api.delete_project(&prof, &spare.id).expect("delete");
        let err = fx.api.get_project(&prof, &spare.id).unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound(_)));
    }

    #[test]
    fn one_group_per_project_and_capacity() {
        let fx = Fixture::new();
        let prof = fx.faculty("prof@uni.edu");
        let project = fx.project(&prof, "Vision");
        let alice = fx.student("alice@uni.edu", "R1");
        let bob = fx.student("bob@uni.edu", "R2");
        let carol = fx.student("carol@uni.edu", "R3");

        let group = fx
            .api
            .create_group(&alice, &project.id, "Pair", 2)
            .expect("group");
        assert_eq!(group.current_member, 1);
        assert_eq!(group.leader().map(|m| m.student_id.clone()), Some(student_id(&alice)));

        let err = fx
            .api
            .create_group(&alice, &project.id, "Second", 2)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict(_)));

        let joined = fx.api.join_group(&bob, &group.invite_code).expect("join");
        assert_eq!(joined.current_member, 2);
        assert!(joined.is_full());

        let err = fx.api.join_group(&carol, &group.invite_code).unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict(ref m) if m == "Group is full"));

        let err = fx.api.join_group(&bob, &group.invite_code).unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict(_)));

        let err = fx.api.join_group(&carol, "0000-00000").unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound(_)));
    }

    #[test]
    fn invite_codes_are_unique_across_groups() {
        let fx = Fixture::new();
        let prof = fx.faculty("prof@uni.edu");
        let mut codes = std::collections::BTreeSet::new();
        for i in 0..6 {
            let project = fx.project(&prof, &format!("P{i}"));
            let s = fx.student(&format!("s{i}@uni.edu"), &format!("R{i}"));
            let g = fx.api.create_group(&s, &project.id, "G", 3).expect("group");
            assert!(codes.insert(g.invite_code));
        }
    }

    #[test]
    fn leader_rules_for_remove_leave_and_transfer() {
        let fx = Fixture::new();
        let prof = fx.faculty("prof@uni.edu");
        let project = fx.project(&prof, "Vision");
        let alice = fx.student("alice@uni.edu", "R1");
        let bob = fx.student("bob@uni.edu", "R2");
        let group = fx
            .api
            .create_group(&alice, &project.id, "Team", 4)
            .expect("group");
        let group = fx.api.join_group(&bob, &group.invite_code).expect("join");
        let leader_member = group.leader().expect("leader").id.clone();
        let bob_member = group
            .member_for_student(&student_id(&bob))
            .expect("bob")
            .id
            .clone();

        let err = fx
            .api
            .remove_member(&bob, &leader_member, &group.id)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));

        let err = fx.api.leave_group(&alice, &group.id).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition(_)));

        let err = fx
            .api
            .transfer_leadership(&alice, &group.id, &leader_member)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition(_)));

        let group = fx
            .api
            .transfer_leadership(&alice, &group.id, &bob_member)
            .expect("transfer");
        let leaders: Vec<_> = group.members.iter().filter(|m| m.is_leader()).collect();
        assert_eq!(leaders.len(), 1);
        assert_eq!(leaders[0].id, bob_member);

        fx.api.leave_group(&alice, &group.id).expect("leave");
        let group = fx.api.get_group(&bob, &group.id).expect("group");
        assert_eq!(group.current_member, 1);
    }

    #[test]
    fn applications_need_leader_and_review_once() {
        let fx = Fixture::new();
        let prof = fx.faculty("prof@uni.edu");
        let other = fx.faculty("other@uni.edu");
        let project = fx.project(&prof, "Vision");
        let alice = fx.student("alice@uni.edu", "R1");
        let bob = fx.student("bob@uni.edu", "R2");
        let group = fx
            .api
            .create_group(&alice, &project.id, "Team", 4)
            .expect("group");
        fx.api.join_group(&bob, &group.invite_code).expect("join");

        let err = fx
            .api
            .create_application(&bob, &project.id, &group.id)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));

        let app = fx
            .api
            .create_application(&alice, &project.id, &group.id)
            .expect("apply");
        assert_eq!(app.application_status, ApplicationStatus::Pending);
        let err = fx
            .api
            .create_application(&alice, &project.id, &group.id)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict(_)));

        let err = fx
            .api
            .review_application(&other, &app.id, ApplicationStatus::Approved)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Forbidden(_)));

        let reviewed = fx
            .api
            .review_application(&prof, &app.id, ApplicationStatus::Approved)
            .expect("review");
        assert_eq!(reviewed.application_status, ApplicationStatus::Approved);

        let err = fx
            .api
            .review_application(&prof, &app.id, ApplicationStatus::Rejected)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition(_)));
        let detail = fx.api.get_application(&bob, &app.id).expect("detail");
        assert_eq!(detail.application.application_status, ApplicationStatus::Approved);
        assert_eq!(detail.project.title, "Vision");

        let listed = fx.api.list_applications(&prof).expect("list");
        assert_eq!(listed.len(), 1);
        assert!(fx.api.list_applications(&other).expect("list").is_empty());
    }

    #[test]
    fn assessments_require_approval_and_track_submissions() {
        let fx = Fixture::new();
        let prof = fx.faculty("prof@uni.edu");
        let project = fx.project(&prof, "Vision");
        let alice = fx.student("alice@uni.edu", "R1");
        let group = fx
            .api
            .create_group(&alice, &project.id, "Team", 4)
            .expect("group");
        let app = fx
            .api
            .create_application(&alice, &project.id, &group.id)
            .expect("apply");

        let start = Utc::now() + chrono::Duration::days(1);
        let input = NewAssessment {
            group_id: group.id.clone(),
            title: "Milestone 1".into(),
            description: String::new(),
            deadline: start + chrono::Duration::days(7),
            start_time: start,
            end_time: start + chrono::Duration::hours(1),
        };
        let err = fx.api.create_assessment(&prof, &input).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition(_)));

        fx.api
            .review_application(&prof, &app.id, ApplicationStatus::Approved)
            .expect("approve");
        let assessment = fx.api.create_assessment(&prof, &input).expect("assessment");
        assert!(assessment
            .google_meet_link
            .starts_with("https://meet.google.com/"));

        let err = fx
            .api
            .submit_assessment(
                &alice,
                &assessment.id,
                &SubmissionInput {
                    content: "  ".into(),
                    attachments: vec![],
                },
            )
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));

        let sub = fx
            .api
            .submit_assessment(
                &alice,
                &assessment.id,
                &SubmissionInput {
                    content: "draft".into(),
                    attachments: vec![],
                },
            )
            .expect("submit");
        assert!(!sub.late);
        let edited = fx
            .api
            .submit_assessment(
                &alice,
                &assessment.id,
                &SubmissionInput {
                    content: "final".into(),
                    attachments: vec![],
                },
            )
            .expect("edit");
        assert_eq!(edited.id, sub.id);
        assert_eq!(edited.content, "final");

        let err = fx.api.grade_submission(&prof, &sub.id, 101.0).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
        let graded = fx.api.grade_submission(&prof, &sub.id, 88.0).expect("grade");
        assert_eq!(graded.grade, Some(88.0));

        let err = fx
            .api
            .submit_assessment(
                &alice,
                &assessment.id,
                &SubmissionInput {
                    content: "after grading".into(),
                    attachments: vec![],
                },
            )
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition(_)));

        let view = fx.api.get_assessment(&alice, &assessment.id).expect("view");
        assert_eq!(view.submissions.len(), 1);
        assert!(!view.deadline_passed);
        let summaries = fx.api.list_assessments(&prof).expect("list");
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].graded_count, 1);
        assert_eq!(summaries[0].group_name, "Team");
    }

    #[test]
    fn first_submission_after_deadline_is_late() {
        let fx = Fixture::new();
        let prof = fx.faculty("prof@uni.edu");
        let project = fx.project(&prof, "Vision");
        let alice = fx.student("alice@uni.edu", "R1");
        let group = fx
            .api
            .create_group(&alice, &project.id, "Team", 4)
            .expect("group");
        let app = fx
            .api
            .create_application(&alice, &project.id, &group.id)
            .expect("apply");
        fx.api
            .review_application(&prof, &app.id, ApplicationStatus::Approved)
            .expect("approve");
        let past = Utc::now() - chrono::Duration::days(2);
        let assessment = fx
            .api
            .create_assessment(
                &prof,
                &NewAssessment {
                    group_id: group.id.clone(),
                    title: "Overdue".into(),
                    description: String::new(),
                    deadline: past,
                    start_time: past - chrono::Duration::hours(2),
                    end_time: past - chrono::Duration::hours(1),
                },
            )
            .expect("assessment");

        let input = SubmissionInput {
            content: "sorry".into(),
            attachments: vec![],
        };
        let sub = fx
            .api
            .submit_assessment(&alice, &assessment.id, &input)
            .expect("late submit");
        assert!(sub.late);
        let err = fx
            .api
            .submit_assessment(&alice, &assessment.id, &input)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition(_)));
    }

    #[test]
    fn upload_copies_into_workspace() {
        let fx = Fixture::new();
        let prof = fx.faculty("prof@uni.edu");
        let project = fx.project(&prof, "Vision");
        let alice = fx.student("alice@uni.edu", "R1");
        let group = fx
            .api
            .create_group(&alice, &project.id, "Team", 4)
            .expect("group");
        let app = fx
            .api
            .create_application(&alice, &project.id, &group.id)
            .expect("apply");
        fx.api
            .review_application(&prof, &app.id, ApplicationStatus::Approved)
            .expect("approve");
        let start = Utc::now();
        let assessment = fx
            .api
            .create_assessment(
                &prof,
                &NewAssessment {
                    group_id: group.id.clone(),
                    title: "Report".into(),
                    description: String::new(),
                    deadline: start + chrono::Duration::days(1),
                    start_time: start,
                    end_time: start + chrono::Duration::hours(1),
                },
            )
            .expect("assessment");

        let src = tempfile::tempdir().expect("tempdir");
        let file = src.path().join("report.pdf");
        std::fs::write(&file, b"%PDF").expect("write");
        let url = fx
            .api
            .upload_attachment(&alice, &assessment.id, &file)
            .expect("upload");
        let stored = Url::parse(&url)
            .expect("file url")
            .to_file_path()
            .expect("local path");
        let uploads = std::fs::canonicalize(fx.uploads_dir()).expect("uploads dir");
        assert!(stored.starts_with(&uploads));
        assert!(stored.to_string_lossy().ends_with("report.pdf"));

        // Spaces and '#' are escaped so the reference stays one URL.
        let odd = src.path().join("final report #2.pdf");
        std::fs::write(&odd, b"%PDF").expect("write");
        let url = fx
            .api
            .upload_attachment(&alice, &assessment.id, &odd)
            .expect("upload");
        assert!(url.ends_with("final%20report%20%232.pdf"), "{url}");
        let stored = Url::parse(&url)
            .expect("file url")
            .to_file_path()
            .expect("local path");
        assert_eq!(std::fs::read(&stored).expect("copied file"), b"%PDF");

        let err = fx
            .api
            .upload_attachment(&alice, &assessment.id, &src.path().join("missing.pdf"))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }
}
