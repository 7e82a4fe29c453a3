use super::{
    get_opt_str, get_opt_text, get_required_str, parse_params, respond, run, HandlerResult,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{ProjectFilter, ProjectInput};

fn handle_list(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let filter = ProjectFilter {
        query: get_opt_str(params, "query"),
        domain: get_opt_text(params, "domain")?,
        course: get_opt_text(params, "course")?,
    };
    run(state, params, |wf| wf.list_projects(&filter))
}

fn handle_get(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let project_id = get_required_str(params, "projectId")?;
    run(state, params, |wf| wf.get_project(&project_id))
}

fn handle_mine(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    run(state, params, |wf| wf.my_projects())
}

fn handle_create(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let input: ProjectInput = parse_params(params)?;
    run(state, params, |wf| wf.create_project(&input))
}

fn handle_update(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let project_id = get_required_str(params, "projectId")?;
    let input: ProjectInput = parse_params(params)?;
    run(state, params, |wf| wf.update_project(&project_id, &input))
}

fn handle_delete(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let project_id = get_required_str(params, "projectId")?;
    run(state, params, |wf| {
        wf.delete_project(&project_id)?;
        Ok(serde_json::json!({ "deleted": project_id }))
    })
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "projects.list" => handle_list(state, &req.params),
        "projects.get" => handle_get(state, &req.params),
        "projects.mine" => handle_mine(state, &req.params),
        "projects.create" => handle_create(state, &req.params),
        "projects.update" => handle_update(state, &req.params),
        "projects.delete" => handle_delete(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
