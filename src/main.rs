use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use tokio::net::TcpListener;

use log_viewer::logger::Logger;
use log_viewer::templates::{self, DirSource, TemplateSource};
use log_viewer::{build_router, AppState, Args, Config, TemplateCatalog};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if let Err(e) = Logger::init() {
        eprintln!("Failed to initialize logger: {e}");
    }

    let config = Config::from_args(args).context("invalid configuration")?;
    info!("Serving logs from {:?}", config.working_directory);

    let catalog = match &config.templates {
        Some(dir) => {
            info!("Loading templates from {:?}", dir);
            let source: Arc<dyn TemplateSource> = Arc::new(DirSource::new(dir));
            TemplateCatalog::build(source, ".")
        }
        None => TemplateCatalog::build(Arc::new(templates::builtin()), templates::BUILTIN_ROOT),
    }
    .context("failed to load templates")?;
    if catalog.is_empty() {
        warn!("No templates found; only the API will be served");
    }

    let state = AppState::new((*config.working_directory).clone());
    let app = build_router(state, Arc::new(catalog));

    let listener = TcpListener::bind(&config.address)
        .await
        .with_context(|| format!("failed to bind {}", config.address))?;
    let addr = listener.local_addr().context("failed to read listen address")?;
    println!("Listening on http://{addr}");
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, draining requests");
}
