use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;

use bug_wars_ai::api;
use bug_wars_ai::library::ScriptLibrary;
use bug_wars_ai::state::AppState;
use bug_wars_ai::{logging, paths, settings};

/// HTTP service that compiles stored Bug Wars AI scripts.
#[derive(Parser)]
#[command(name = "bugwars-server", version)]
struct Args {
    /// Config directory holding settings.json
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Script library file, overriding the configured path
    #[arg(long)]
    scripts: Option<PathBuf>,

    /// Listen address, e.g. 127.0.0.1:8080
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let app_config_dir = args.config_dir.unwrap_or_else(paths::default_config_dir);
    let mut settings = settings::load_or_default(&app_config_dir);
    if let Some(scripts) = args.scripts {
        settings.scripts_path = scripts;
    }
    if let Some(bind) = args.bind {
        settings.bind_addr = bind;
    }

    logging::init(&settings.log_filter);

    let addr: SocketAddr = match settings.bind_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!("invalid bind address '{}': {e}", settings.bind_addr);
            process::exit(2);
        }
    };

    let library = match ScriptLibrary::load_or_empty(&settings.scripts_path) {
        Ok(library) => library,
        Err(e) => {
            tracing::error!("failed to load script library: {e}");
            process::exit(1);
        }
    };

    if library.is_empty() {
        tracing::warn!("script library is empty, every compile request will be not-found");
    }
    tracing::info!(
        scripts = library.len(),
        path = ?library.path(),
        %addr,
        "starting API server"
    );
    let state = Arc::new(AppState::new(library));
    if let Err(e) = api::serve(state, addr).await {
        tracing::error!("API server error: {e}");
        process::exit(1);
    }
}
