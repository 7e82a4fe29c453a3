use thiserror::Error;

pub type WorkflowResult<T> = Result<T, WorkflowError>;

const FORBIDDEN_MESSAGE: &str = "You do not have permission to perform this action.";
const RETRY_MESSAGE: &str = "Request failed. Please try again.";

/// Failure taxonomy shared by the workflow layer and both API backends.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A client-side precondition failed; never reaches the API.
    #[error("validation: {0}")]
    Validation(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The entity is in a state that does not allow the requested change.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("not signed in")]
    Unauthenticated,

    #[error("cancelled: view {0} is closed")]
    Cancelled(String),

    #[error("network: {0}")]
    Network(String),

    #[error("storage: {0}")]
    Storage(String),
}

impl WorkflowError {
    pub fn code(&self) -> &'static str {
        match self {
            WorkflowError::Validation(_) => "validation_error",
            WorkflowError::Forbidden(_) => "forbidden",
            WorkflowError::Conflict(_) => "conflict",
            WorkflowError::NotFound(_) => "not_found",
            WorkflowError::InvalidTransition(_) => "invalid_transition",
            WorkflowError::Unauthenticated => "unauthenticated",
            WorkflowError::Cancelled(_) => "cancelled",
            WorkflowError::Network(_) => "network_error",
            WorkflowError::Storage(_) => "storage_error",
        }
    }

    /// Text shown inline to the user. Forbidden and transport failures stay
    /// generic; everything else passes the message through.
    pub fn user_message(&self) -> String {
        match self {
            WorkflowError::Validation(m)
            | WorkflowError::Conflict(m)
            | WorkflowError::NotFound(m)
            | WorkflowError::InvalidTransition(m) => m.clone(),
            WorkflowError::Forbidden(_) => FORBIDDEN_MESSAGE.to_string(),
            WorkflowError::Unauthenticated => "Please sign in to continue.".to_string(),
            WorkflowError::Cancelled(_) => {
                "The view that issued this request was closed.".to_string()
            }
            WorkflowError::Network(_) | WorkflowError::Storage(_) => RETRY_MESSAGE.to_string(),
        }
    }

    /// Internal reason, kept out of the user message but logged and
    /// returned as `details.reason`.
    pub fn reason(&self) -> Option<&str> {
        match self {
            WorkflowError::Forbidden(m)
            | WorkflowError::Network(m)
            | WorkflowError::Storage(m) => Some(m),
            WorkflowError::Cancelled(view) => Some(view),
            _ => None,
        }
    }

    /// Errors that came back from the authority rather than from a local
    /// check. The cached view they touched is stale and must be dropped.
    pub fn is_authoritative(&self) -> bool {
        matches!(
            self,
            WorkflowError::Forbidden(_)
                | WorkflowError::Conflict(_)
                | WorkflowError::NotFound(_)
                | WorkflowError::InvalidTransition(_)
        )
    }
}

impl From<rusqlite::Error> for WorkflowError {
    fn from(e: rusqlite::Error) -> Self {
        WorkflowError::Storage(e.to_string())
    }
}

impl From<std::io::Error> for WorkflowError {
    fn from(e: std::io::Error) -> Self {
        WorkflowError::Storage(e.to_string())
    }
}

impl From<reqwest::Error> for WorkflowError {
    fn from(e: reqwest::Error) -> Self {
        WorkflowError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_is_generic_but_keeps_reason() {
        let e = WorkflowError::Forbidden("requester is not the group leader".into());
        assert_eq!(e.code(), "forbidden");
        assert_eq!(e.user_message(), FORBIDDEN_MESSAGE);
        assert_eq!(e.reason(), Some("requester is not the group leader"));
    }

    #[test]
    fn conflict_passes_server_text_through() {
        let e = WorkflowError::Conflict("Group is full".into());
        assert_eq!(e.user_message(), "Group is full");
        assert!(e.is_authoritative());
        assert!(!WorkflowError::Validation("x".into()).is_authoritative());
    }
}
