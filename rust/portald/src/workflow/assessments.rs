use super::Workflow;
use crate::error::{WorkflowError, WorkflowResult};
use crate::model::{
    grade_in_range, Assessment, AssessmentSummary, AssessmentView, AssessmentWindow,
    NewAssessment, Submission, SubmissionInput,
};
use chrono::Utc;
use std::path::Path;

impl Workflow<'_> {
    pub fn create_assessment(&mut self, input: &NewAssessment) -> WorkflowResult<Assessment> {
        self.session.faculty()?;
        if input.title.trim().is_empty() {
            return Err(WorkflowError::Validation("Title is required".into()));
        }
        if input.end_time <= input.start_time {
            return Err(WorkflowError::Validation(
                "Meeting end time must be after its start time".into(),
            ));
        }

        let result = self.api.create_assessment(self.session, input);
        let group_id = input.group_id.as_str();
        let assessment = self.settle("assessments.create", result, |c| c.forget_group(group_id))?;
        self.cache.put_assessment(assessment.clone());
        Ok(assessment)
    }

    /// With a window, upcoming deadlines come soonest first and past ones
    /// most recent first.
    pub fn list_assessments(
        &mut self,
        window: Option<AssessmentWindow>,
    ) -> WorkflowResult<Vec<AssessmentSummary>> {
        let result = self.api.list_assessments(self.session);
        let mut list = self.settle("assessments.list", result, |_| {})?;
        for summary in &list {
            self.cache.put_assessment(summary.assessment.clone());
        }
        if let Some(window) = window {
            let now = Utc::now();
            list.retain(|s| s.assessment.in_window(window, now));
            list.sort_by_key(|s| s.assessment.deadline);
            if window == AssessmentWindow::Past {
                list.reverse();
            }
        }
        Ok(list)
    }

    pub fn get_assessment(&mut self, assessment_id: &str) -> WorkflowResult<AssessmentView> {
        let result = self.api.get_assessment(self.session, assessment_id);
        let view = self.settle("assessments.get", result, |c| {
            c.forget_assessment(assessment_id)
        })?;
        self.cache.put_assessment(view.assessment.clone());
        for submission in &view.submissions {
            self.cache.put_submission(submission.clone());
        }
        Ok(view)
    }

    /// First submission or an edit of the caller's own ungraded one.
    pub fn submit_assessment(
        &mut self,
        assessment_id: &str,
        input: &SubmissionInput,
    ) -> WorkflowResult<Submission> {
        let student_id = self.session.student()?.id.clone();
        if input.content.trim().is_empty() && input.attachments.is_empty() {
            return Err(WorkflowError::Validation(
                "Please add content or attach files before submitting.".into(),
            ));
        }
        if let Some(existing) = self.cache.submission_for(assessment_id, &student_id) {
            if existing.grade.is_some() {
                return Err(WorkflowError::InvalidTransition(
                    "Submission has already been graded".into(),
                ));
            }
            let passed = self
                .cache
                .assessment(assessment_id)
                .map(|a| a.deadline_passed(Utc::now()))
                .unwrap_or(false);
            if passed {
                return Err(WorkflowError::InvalidTransition(
                    "The deadline has passed; the submission can no longer be edited".into(),
                ));
            }
        }

        let result = self.api.submit_assessment(self.session, assessment_id, input);
        let submission = self.settle("submissions.submit", result, |c| {
            c.forget_assessment(assessment_id)
        })?;
        self.cache.put_submission(submission.clone());
        Ok(submission)
    }

    /// Grades are checked here and never sent when out of range.
    pub fn grade_submission(
        &mut self,
        submission_id: &str,
        grade: f64,
    ) -> WorkflowResult<Submission> {
        self.session.faculty()?;
        if !grade_in_range(grade) {
            return Err(WorkflowError::Validation(
                "Grade must be between 0 and 100".into(),
            ));
        }

        let result = self.api.grade_submission(self.session, submission_id, grade);
        let submission = self.settle("submissions.grade", result, |c| {
            c.forget_submission(submission_id)
        })?;
        self.cache.put_submission(submission.clone());
        Ok(submission)
    }

    pub fn upload_attachment(&mut self, assessment_id: &str, file: &Path) -> WorkflowResult<String> {
        self.session.student()?;
        if file.as_os_str().is_empty() {
            return Err(WorkflowError::Validation("A file is required".into()));
        }
        let result = self.api.upload_attachment(self.session, assessment_id, file);
        self.settle("submissions.upload", result, |c| {
            c.forget_assessment(assessment_id)
        })
    }
}
