use super::{get_opt_str, get_required_str, respond, HandlerResult};
use crate::error::WorkflowError;
use crate::gate;
use crate::ipc::error::HandlerErr;
use crate::ipc::types::{AppState, Backend, Request};
use crate::session::Session;
use serde_json::json;
use tracing::info;

fn handle_login(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let email = get_required_str(params, "email")?;
    let name = get_opt_str(params, "name").unwrap_or_default();
    let api = match state.backend.as_ref() {
        Some(Backend::Local(api)) => api,
        Some(Backend::Remote(_)) => {
            return Err(HandlerErr::new(
                "not_supported",
                "sign in through the portal and use remote.connect",
            ))
        }
        None => {
            return Err(HandlerErr::new(
                "no_workspace",
                "select a workspace or connect to a server first",
            ))
        }
    };
    let user = api.login(&email, &name)?;

    info!(user_id = %user.id, role = %user.role, "signed in");
    state.sign_out();
    let landing = gate::landing_for(user.role);
    let result = json!({ "user": user, "landing": landing });
    state.session = Some(Session::new(user, None));
    Ok(result)
}

/// Refetches the principal so role changes made elsewhere take effect.
fn handle_me(state: &mut AppState) -> HandlerResult {
    let (Some(backend), Some(session)) = (state.backend.as_ref(), state.session.as_mut()) else {
        return Err(WorkflowError::Unauthenticated.into());
    };
    match backend.api().current_user(session) {
        Ok(user) => {
            if user.role != session.role() {
                info!(user_id = %user.id, role = %user.role, "role changed");
                state.cache.clear();
            }
            let landing = gate::landing_for(user.role);
            let result = json!({ "user": user, "landing": landing });
            session.refresh(user);
            Ok(result)
        }
        Err(WorkflowError::Unauthenticated) => {
            state.sign_out();
            Err(WorkflowError::Unauthenticated.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn handle_logout(state: &mut AppState) -> HandlerResult {
    state.sign_out();
    Ok(json!({ "landing": gate::LOGIN_VIEW }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "auth.login" => handle_login(state, &req.params),
        "auth.me" => handle_me(state),
        "auth.logout" => handle_logout(state),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
