use super::{get_required_str, respond, to_result, HandlerResult};
use crate::gate;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use tracing::debug;

fn handle_resolve(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let path = get_required_str(params, "path")?;
    to_result(&gate::resolve(&path, state.session.as_ref()))
}

fn handle_open(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let view_id = get_required_str(params, "viewId")?;
    state.scopes.open(&view_id);
    debug!(view_id = %view_id, "view opened");
    Ok(json!({ "viewId": view_id }))
}

fn handle_close(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let view_id = get_required_str(params, "viewId")?;
    let closed = state.scopes.close(&view_id);
    debug!(view_id = %view_id, closed, "view closed");
    Ok(json!({ "viewId": view_id, "closed": closed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "views.resolve" => handle_resolve(state, &req.params),
        "views.open" => handle_open(state, &req.params),
        "views.close" => handle_close(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
