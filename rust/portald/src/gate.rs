//! Role gate and view resolution.
//!
//! Every protected view is listed once in [`VIEWS`] with the roles allowed
//! to open it. Resolution runs against the cached principal only.

use crate::model::Role;
use crate::session::Session;
use serde::Serialize;
use std::collections::BTreeMap;

const ALL_ROLES: &[Role] = &[Role::User, Role::Student, Role::Faculty, Role::Admin];
const ADMIN: &[Role] = &[Role::Admin];
const FACULTY: &[Role] = &[Role::Faculty];
const STUDENT: &[Role] = &[Role::Student];

pub const LOGIN_VIEW: &str = "login";

pub struct ViewRoute {
    pub pattern: &'static str,
    pub allowed: &'static [Role],
}

pub const VIEWS: &[ViewRoute] = &[
    ViewRoute { pattern: "dashboard", allowed: ALL_ROLES },
    ViewRoute { pattern: "manage/user", allowed: ADMIN },
    ViewRoute { pattern: "analytics", allowed: ADMIN },
    ViewRoute { pattern: "faculty", allowed: FACULTY },
    ViewRoute { pattern: "faculty/dashboard", allowed: FACULTY },
    ViewRoute { pattern: "faculty/project/create", allowed: FACULTY },
    ViewRoute { pattern: "faculty/project/edit/:projectId", allowed: FACULTY },
    ViewRoute { pattern: "faculty/applications", allowed: FACULTY },
    ViewRoute { pattern: "faculty/applications/:applicationId", allowed: FACULTY },
    ViewRoute { pattern: "faculty/groups/:groupId", allowed: FACULTY },
    ViewRoute { pattern: "faculty/assessments", allowed: FACULTY },
    ViewRoute { pattern: "faculty/assessments/create", allowed: FACULTY },
    ViewRoute { pattern: "faculty/assessments/:assessmentId", allowed: FACULTY },
    ViewRoute { pattern: "projects", allowed: STUDENT },
    ViewRoute { pattern: "project/:projectId", allowed: STUDENT },
    ViewRoute { pattern: "applications", allowed: STUDENT },
    ViewRoute { pattern: "application/:id", allowed: STUDENT },
    ViewRoute { pattern: "assessments", allowed: STUDENT },
    ViewRoute { pattern: "assessments/:assessmentId", allowed: STUDENT },
];

pub fn can_access(role: Role, allowed: &[Role]) -> bool {
    allowed.contains(&role)
}

pub fn landing_for(role: Role) -> &'static str {
    match role {
        Role::Admin => "manage/user",
        Role::Faculty => "faculty/dashboard",
        Role::Student => "projects",
        Role::User => "dashboard",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "camelCase")]
pub enum GateDecision {
    Allow {
        view: &'static str,
        params: BTreeMap<String, String>,
    },
    Redirect {
        to: &'static str,
    },
    Unknown,
}

pub fn resolve(path: &str, session: Option<&Session>) -> GateDecision {
    let path = path.trim().trim_matches('/');
    // Static segments win over `:param` captures ("faculty/assessments/create").
    let mut best: Option<(&ViewRoute, BTreeMap<String, String>, usize)> = None;
    for route in VIEWS {
        if let Some(params) = match_pattern(route.pattern, path) {
            let literal = route.pattern.split('/').filter(|s| !s.starts_with(':')).count();
            if best.as_ref().map(|(_, _, l)| literal > *l).unwrap_or(true) {
                best = Some((route, params, literal));
            }
        }
    }

    let Some((route, params, _)) = best else {
        return GateDecision::Unknown;
    };
    let Some(session) = session else {
        return GateDecision::Redirect { to: LOGIN_VIEW };
    };
    if can_access(session.role(), route.allowed) {
        GateDecision::Allow {
            view: route.pattern,
            params,
        }
    } else {
        GateDecision::Redirect {
            to: landing_for(session.role()),
        }
    }
}

fn match_pattern(pattern: &str, path: &str) -> Option<BTreeMap<String, String>> {
    let pat: Vec<&str> = pattern.split('/').collect();
    let segs: Vec<&str> = path.split('/').collect();
    if pat.len() != segs.len() {
        return None;
    }
    let mut params = BTreeMap::new();
    for (p, s) in pat.iter().zip(segs.iter()) {
        if let Some(name) = p.strip_prefix(':') {
            if s.is_empty() {
                return None;
            }
            params.insert(name.to_string(), s.to_string());
        } else if p != s {
            return None;
        }
    }
    Some(params)
}
