mod api;
mod cache;
mod codes;
mod config;
mod db;
mod error;
mod gate;
mod ipc;
mod model;
mod scope;
mod session;
#[cfg(test)]
mod testkit;
mod workflow;

use anyhow::Context;
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Line-delimited JSON sidecar for the project portal.
#[derive(Debug, Parser)]
#[command(name = "portald", version)]
struct Cli {
    /// Open a local workspace before reading requests.
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// TOML config file; missing keys take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Portal server to connect to instead of a local workspace.
    #[arg(long, conflicts_with = "workspace", requires = "token")]
    remote: Option<String>,

    /// Bearer token for --remote.
    #[arg(long)]
    token: Option<String>,
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_env("PORTALD_LOG")
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    // stdout carries responses; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn startup(cli: &Cli, state: &mut ipc::AppState) -> anyhow::Result<()> {
    if let Some(path) = &cli.workspace {
        let api = api::LocalApi::open(path, state.config.auth.clone())
            .with_context(|| format!("open workspace {}", path.display()))?;
        info!(workspace = %path.display(), "workspace opened");
        state.backend = Some(ipc::Backend::Local(api));
        state.workspace = Some(path.clone());
    }
    if let (Some(base_url), Some(token)) = (&cli.remote, &cli.token) {
        let timeout = state.config.http.timeout_secs.map(Duration::from_secs);
        let api = api::RemoteApi::new(base_url, timeout)
            .map_err(|e| anyhow::anyhow!("connect {base_url}: {e}"))?;
        let user = api
            .me(token)
            .map_err(|e| anyhow::anyhow!("authenticate with {base_url}: {e}"))?;
        info!(base_url = %base_url, user_id = %user.id, "connected to remote portal");
        state.backend = Some(ipc::Backend::Remote(api));
        state.session = Some(session::Session::new(user, Some(token.clone())));
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => config::PortalConfig::load(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => config::PortalConfig::default(),
    };
    init_tracing(&config.log.filter);

    let mut state = ipc::AppState::new(config);
    startup(&cli, &mut state)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "stdin closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // No id to reply to.
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() },
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    Ok(())
}
