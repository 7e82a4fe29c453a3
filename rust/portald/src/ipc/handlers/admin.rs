use super::{get_opt_str, get_opt_text, get_required_str, respond, run, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::model::UserFilter;

fn handle_users_list(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let filter = UserFilter {
        query: get_opt_str(params, "query"),
        role: get_opt_text(params, "role")?,
    };
    run(state, params, |wf| wf.list_users(&filter))
}

fn handle_assign_faculty(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let user_id = get_required_str(params, "userId")?;
    let department = get_opt_str(params, "department");
    let designation = get_opt_str(params, "designation");
    run(state, params, |wf| {
        wf.assign_faculty_role(&user_id, department.as_deref(), designation.as_deref())
    })
}

fn handle_assign_student(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let user_id = get_required_str(params, "userId")?;
    // A missing roll number is a validation failure, not a malformed request.
    let roll_number = get_opt_str(params, "rollNumber").unwrap_or_default();
    let batch = get_opt_str(params, "batch");
    run(state, params, |wf| {
        wf.assign_student_role(&user_id, &roll_number, batch.as_deref())
    })
}

fn handle_assign_admin(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let user_id = get_required_str(params, "userId")?;
    run(state, params, |wf| wf.assign_admin_role(&user_id))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "admin.users.list" => handle_users_list(state, &req.params),
        "admin.roles.assignFaculty" => handle_assign_faculty(state, &req.params),
        "admin.roles.assignStudent" => handle_assign_student(state, &req.params),
        "admin.roles.assignAdmin" => handle_assign_admin(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
