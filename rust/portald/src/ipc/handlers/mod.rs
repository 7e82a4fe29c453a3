pub mod admin;
pub mod applications;
pub mod assessments;
pub mod auth;
pub mod core;
pub mod groups;
pub mod projects;
pub mod views;

use crate::error::{WorkflowError, WorkflowResult};
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::types::AppState;
use crate::workflow::Workflow;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::str::FromStr;

type HandlerResult = Result<Value, HandlerErr>;

fn respond(id: &str, result: HandlerResult) -> Value {
    match result {
        Ok(v) => ok(id, v),
        Err(e) => e.response(id),
    }
}

fn get_required_str(params: &Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

fn get_opt_str(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

fn get_opt_u32(params: &Value, key: &str) -> Result<Option<u32>, HandlerErr> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a positive integer", key))),
    }
}

fn get_required_f64(params: &Value, key: &str) -> Result<f64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

fn parse_text<T: FromStr<Err = String>>(params: &Value, key: &str) -> Result<T, HandlerErr> {
    get_required_str(params, key)?
        .parse::<T>()
        .map_err(HandlerErr::bad_params)
}

/// An absent or empty value is `None`; anything else must parse.
fn get_opt_text<T: FromStr<Err = String>>(
    params: &Value,
    key: &str,
) -> Result<Option<T>, HandlerErr> {
    match get_opt_str(params, key) {
        Some(s) if !s.trim().is_empty() => s
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(HandlerErr::bad_params),
        _ => Ok(None),
    }
}

/// Reads a whole params object as `T`; unknown keys such as `viewId` are ignored.
fn parse_params<T: DeserializeOwned>(params: &Value) -> Result<T, HandlerErr> {
    serde_json::from_value(params.clone())
        .map_err(|e| HandlerErr::bad_params(format!("invalid params: {}", e)))
}

fn to_result<T: Serialize>(value: &T) -> HandlerResult {
    serde_json::to_value(value)
        .map_err(|e| HandlerErr::new("serialize_failed", e.to_string()))
}

/// Runs one workflow operation for the signed-in principal. A request
/// tagged with `params.viewId` is cancelled when that view is not open.
fn run<T: Serialize>(
    state: &mut AppState,
    params: &Value,
    op: impl FnOnce(&mut Workflow<'_>) -> WorkflowResult<T>,
) -> HandlerResult {
    state
        .scopes
        .check(params.get("viewId").and_then(|v| v.as_str()))?;
    let Some(backend) = state.backend.as_ref() else {
        return Err(HandlerErr::new(
            "no_workspace",
            "select a workspace or connect to a server first",
        ));
    };
    let Some(session) = state.session.as_ref() else {
        return Err(WorkflowError::Unauthenticated.into());
    };
    let mut wf = Workflow::new(session, backend.api(), &mut state.cache, &state.config);
    let value = op(&mut wf)?;
    to_result(&value)
}
