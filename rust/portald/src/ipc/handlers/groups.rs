use super::{get_opt_u32, get_required_str, respond, run, HandlerResult};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_membership(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let project_id = get_required_str(params, "projectId")?;
    run(state, params, |wf| {
        let member = wf.membership(&project_id)?;
        Ok(json!({ "projectId": project_id, "member": member }))
    })
}

fn handle_get(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let group_id = get_required_str(params, "groupId")?;
    run(state, params, |wf| wf.get_group(&group_id))
}

fn handle_create(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let project_id = get_required_str(params, "projectId")?;
    let name = get_required_str(params, "name")?;
    let max_members = get_opt_u32(params, "maxMembers")?;
    run(state, params, |wf| wf.create_group(&project_id, &name, max_members))
}

fn handle_join(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let invite_code = get_required_str(params, "inviteCode")?;
    run(state, params, |wf| wf.join_group(&invite_code))
}

fn handle_remove_member(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let member_id = get_required_str(params, "memberId")?;
    let group_id = get_required_str(params, "groupId")?;
    run(state, params, |wf| wf.remove_member(&member_id, &group_id))
}

fn handle_leave(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let group_id = get_required_str(params, "groupId")?;
    run(state, params, |wf| {
        wf.leave_group(&group_id)?;
        Ok(json!({ "left": group_id }))
    })
}

fn handle_transfer_leadership(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let group_id = get_required_str(params, "groupId")?;
    let member_id = get_required_str(params, "memberId")?;
    run(state, params, |wf| wf.transfer_leadership(&group_id, &member_id))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "groups.membership" => handle_membership(state, &req.params),
        "groups.get" => handle_get(state, &req.params),
        "groups.create" => handle_create(state, &req.params),
        "groups.join" => handle_join(state, &req.params),
        "groups.removeMember" => handle_remove_member(state, &req.params),
        "groups.leave" => handle_leave(state, &req.params),
        "groups.transferLeadership" => handle_transfer_leadership(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
