use super::Workflow;
use crate::error::{WorkflowError, WorkflowResult};
use crate::model::{Project, ProjectFilter, ProjectInput};

/// Trims text fields and tags; tags keep first-seen order without repeats.
fn normalize(input: &ProjectInput, max_tags: usize) -> WorkflowResult<ProjectInput> {
    let title = input.title.trim();
    let description = input.description.trim();
    if title.is_empty() || description.is_empty() {
        return Err(WorkflowError::Validation(
            "Title and description are required".into(),
        ));
    }
    let mut tags: Vec<String> = Vec::with_capacity(input.tags.len());
    for tag in input.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    if tags.len() > max_tags {
        return Err(WorkflowError::Validation(format!(
            "At most {max_tags} tags are allowed"
        )));
    }
    Ok(ProjectInput {
        title: title.to_string(),
        description: description.to_string(),
        tags,
        ..input.clone()
    })
}

impl Workflow<'_> {
    /// The catalogue is fetched whole and filtered here.
    pub fn list_projects(&mut self, filter: &ProjectFilter) -> WorkflowResult<Vec<Project>> {
        let result = self.api.list_projects(self.session);
        let projects = self.settle("projects.list", result, |_| {})?;
        Ok(projects.into_iter().filter(|p| filter.matches(p)).collect())
    }

    pub fn get_project(&mut self, project_id: &str) -> WorkflowResult<Project> {
        let result = self.api.get_project(self.session, project_id);
        self.settle("projects.get", result, |_| {})
    }

    pub fn my_projects(&mut self) -> WorkflowResult<Vec<Project>> {
        self.session.faculty()?;
        let result = self.api.faculty_projects(self.session);
        self.settle("projects.mine", result, |_| {})
    }

    pub fn create_project(&mut self, input: &ProjectInput) -> WorkflowResult<Project> {
        self.session.faculty()?;
        let input = normalize(input, self.config.projects.max_tags)?;
        let result = self.api.create_project(self.session, &input);
        self.settle("projects.create", result, |_| {})
    }

    pub fn update_project(
        &mut self,
        project_id: &str,
        input: &ProjectInput,
    ) -> WorkflowResult<Project> {
        self.session.faculty()?;
        let input = normalize(input, self.config.projects.max_tags)?;
        let result = self.api.update_project(self.session, project_id, &input);
        self.settle("projects.update", result, |_| {})
    }

    pub fn delete_project(&mut self, project_id: &str) -> WorkflowResult<()> {
        self.session.faculty()?;
        let result = self.api.delete_project(self.session, project_id);
        self.settle("projects.delete", result, |c| c.forget_membership(project_id))
    }
}
