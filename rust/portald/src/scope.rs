//! Per-view cancellation scopes.
//!
//! A view opens a scope when it mounts and closes it when it unmounts.
//! Requests tagged with a closed view are cancelled before they reach the
//! API, so a request queued behind `views.close` never runs.

use crate::error::{WorkflowError, WorkflowResult};
use std::collections::HashSet;

/// Only open views are tracked; a closed or unknown id is cancelled alike.
#[derive(Debug, Default)]
pub struct ViewScopes {
    open: HashSet<String>,
}

impl ViewScopes {
    /// Reopening a closed view id starts a fresh scope.
    pub fn open(&mut self, view_id: &str) {
        self.open.insert(view_id.to_string());
    }

    /// Returns false when the view was not open.
    pub fn close(&mut self, view_id: &str) -> bool {
        self.open.remove(view_id)
    }

    pub fn open_views(&self) -> Vec<String> {
        let mut out: Vec<String> = self.open.iter().cloned().collect();
        out.sort();
        out
    }

    /// Untagged requests always proceed. Tagged requests need an open scope.
    pub fn check(&self, view_id: Option<&str>) -> WorkflowResult<()> {
        match view_id {
            Some(id) if !self.open.contains(id) => Err(WorkflowError::Cancelled(id.to_string())),
            _ => Ok(()),
        }
    }

    pub fn clear(&mut self) {
        self.open.clear();
    }
}
