//! Client-side workflows over a [`PortalApi`].
//!
//! Each operation runs the local preconditions first (role, field
//! validation, cached state), then issues a single API call and stores the
//! result in the [`ViewCache`]. When the authority rejects the call, the
//! cache entries it touched are dropped so the next read refetches them.

mod admin;
mod applications;
mod assessments;
mod groups;
mod projects;

use crate::api::PortalApi;
use crate::cache::ViewCache;
use crate::config::PortalConfig;
use crate::error::WorkflowResult;
use crate::session::Session;
use tracing::warn;

pub struct Workflow<'a> {
    session: &'a Session,
    api: &'a dyn PortalApi,
    cache: &'a mut ViewCache,
    config: &'a PortalConfig,
}

impl<'a> Workflow<'a> {
    pub fn new(
        session: &'a Session,
        api: &'a dyn PortalApi,
        cache: &'a mut ViewCache,
        config: &'a PortalConfig,
    ) -> Self {
        Self {
            session,
            api,
            cache,
            config,
        }
    }

    /// Logs a failed call and, for authority rejections, drops the cache
    /// entries named by `forget`.
    fn settle<T>(
        &mut self,
        op: &'static str,
        result: WorkflowResult<T>,
        forget: impl FnOnce(&mut ViewCache),
    ) -> WorkflowResult<T> {
        if let Err(e) = &result {
            warn!(op, code = e.code(), reason = e.reason().unwrap_or(""), "{e}");
            if e.is_authoritative() {
                forget(&mut *self.cache);
            }
        }
        result
    }
}

#[cfg(test)]
pub(crate) mod unreachable_api;
