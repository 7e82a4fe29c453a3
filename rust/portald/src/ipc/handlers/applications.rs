use super::{get_required_str, parse_text, respond, run, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::model::ApplicationStatus;

fn handle_apply(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let project_id = get_required_str(params, "projectId")?;
    let group_id = get_required_str(params, "groupId")?;
    run(state, params, |wf| wf.apply_for_project(&project_id, &group_id))
}

fn handle_list(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    run(state, params, |wf| wf.list_applications())
}

fn handle_get(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let application_id = get_required_str(params, "applicationId")?;
    run(state, params, |wf| wf.get_application(&application_id))
}

fn handle_review(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let application_id = get_required_str(params, "applicationId")?;
    let status: ApplicationStatus = parse_text(params, "status")?;
    run(state, params, |wf| wf.review_application(&application_id, status))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "applications.apply" => handle_apply(state, &req.params),
        "applications.list" => handle_list(state, &req.params),
        "applications.get" => handle_get(state, &req.params),
        "applications.review" => handle_review(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
