use super::{get_required_str, respond, HandlerResult};
use crate::api::{LocalApi, RemoteApi};
use crate::gate;
use crate::ipc::error::HandlerErr;
use crate::ipc::types::{AppState, Backend, Request};
use crate::session::Session;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

fn handle_health(state: &mut AppState) -> HandlerResult {
    Ok(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
        "backend": state.backend.as_ref().map(|b| b.kind()),
        "signedIn": state.session.is_some(),
        "openViews": state.scopes.open_views(),
    }))
}

fn handle_workspace_select(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let path = PathBuf::from(get_required_str(params, "path")?);
    let api = LocalApi::open(&path, state.config.auth.clone())
        .map_err(|e| HandlerErr::new("db_open_failed", format!("{e:?}")))?;

    info!(workspace = %path.display(), "workspace selected");
    state.sign_out();
    state.backend = Some(Backend::Local(api));
    state.workspace = Some(path.clone());
    Ok(json!({ "workspacePath": path.to_string_lossy() }))
}

fn handle_remote_connect(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let base_url = get_required_str(params, "baseUrl")?;
    let token = get_required_str(params, "token")?;
    let timeout = state.config.http.timeout_secs.map(Duration::from_secs);
    let api = RemoteApi::new(&base_url, timeout)?;
    let user = api.me(&token)?;

    info!(base_url = %base_url, user_id = %user.id, "connected to remote portal");
    state.sign_out();
    state.workspace = None;
    state.backend = Some(Backend::Remote(api));
    let landing = gate::landing_for(user.role);
    let result = json!({ "user": user, "landing": landing });
    state.session = Some(Session::new(user, Some(token)));
    Ok(result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "health" => handle_health(state),
        "workspace.select" => handle_workspace_select(state, &req.params),
        "remote.connect" => handle_remote_connect(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
