use std::path::PathBuf;

use crate::api::{LocalApi, PortalApi, RemoteApi};
use crate::cache::ViewCache;
use crate::config::PortalConfig;
use crate::scope::ViewScopes;
use crate::session::Session;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub enum Backend {
    Local(LocalApi),
    Remote(RemoteApi),
}

impl Backend {
    pub fn api(&self) -> &dyn PortalApi {
        match self {
            Backend::Local(api) => api,
            Backend::Remote(api) => api,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Backend::Local(_) => "local",
            Backend::Remote(_) => "remote",
        }
    }
}

pub struct AppState {
    pub config: PortalConfig,
    pub workspace: Option<PathBuf>,
    pub backend: Option<Backend>,
    pub session: Option<Session>,
    pub cache: ViewCache,
    pub scopes: ViewScopes,
}

impl AppState {
    pub fn new(config: PortalConfig) -> Self {
        Self {
            config,
            workspace: None,
            backend: None,
            session: None,
            cache: ViewCache::default(),
            scopes: ViewScopes::default(),
        }
    }

    /// Drops the principal and everything fetched on its behalf.
    pub fn sign_out(&mut self) {
        self.session = None;
        self.cache.clear();
        self.scopes.clear();
    }
}
