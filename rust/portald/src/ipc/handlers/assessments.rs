use super::{
    get_opt_text, get_required_f64, get_required_str, parse_params, respond, run, HandlerResult,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{
    AssessmentView, AssessmentWindow, NewAssessment, SubmissionInput, SubmissionState,
};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;

fn handle_create(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let input: NewAssessment = parse_params(params)?;
    run(state, params, |wf| wf.create_assessment(&input))
}

fn handle_list(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let window: Option<AssessmentWindow> = get_opt_text(params, "when")?;
    run(state, params, |wf| wf.list_assessments(window))
}

/// Students also get their own submission state alongside the assessment.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AssessmentPayload {
    #[serde(flatten)]
    view: AssessmentView,
    #[serde(skip_serializing_if = "Option::is_none")]
    submission_state: Option<SubmissionState>,
}

fn handle_get(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let assessment_id = get_required_str(params, "assessmentId")?;
    let student_id = state
        .session
        .as_ref()
        .and_then(|s| s.user().student.as_ref())
        .map(|s| s.id.clone());
    run(state, params, |wf| {
        let view = wf.get_assessment(&assessment_id)?;
        let submission_state = student_id
            .as_deref()
            .map(|id| view.submission_state_for(id));
        Ok(AssessmentPayload {
            view,
            submission_state,
        })
    })
}

fn handle_submit(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let assessment_id = get_required_str(params, "assessmentId")?;
    let input: SubmissionInput = parse_params(params)?;
    run(state, params, |wf| wf.submit_assessment(&assessment_id, &input))
}

fn handle_grade(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let submission_id = get_required_str(params, "submissionId")?;
    let grade = get_required_f64(params, "grade")?;
    run(state, params, |wf| wf.grade_submission(&submission_id, grade))
}

fn handle_upload(state: &mut AppState, params: &serde_json::Value) -> HandlerResult {
    let assessment_id = get_required_str(params, "assessmentId")?;
    let path = PathBuf::from(get_required_str(params, "path")?);
    run(state, params, |wf| {
        let url = wf.upload_attachment(&assessment_id, &path)?;
        Ok(json!({ "url": url }))
    })
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "assessments.create" => handle_create(state, &req.params),
        "assessments.list" => handle_list(state, &req.params),
        "assessments.get" => handle_get(state, &req.params),
        "submissions.submit" => handle_submit(state, &req.params),
        "submissions.grade" => handle_grade(state, &req.params),
        "submissions.upload" => handle_upload(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
