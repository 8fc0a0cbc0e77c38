//! Local HTTP server for the generated reports.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use tower_http::services::ServeDir;

use crate::report::chart::escape;

/// `.html` file names directly inside `dir`, sorted.
pub fn html_files(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e.eq_ignore_ascii_case("html")) {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

async fn index(State(dir): State<Arc<PathBuf>>) -> Result<Html<String>, (StatusCode, String)> {
    let files = html_files(&dir).map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let mut items = String::new();
    for f in &files {
        let name = escape(f);
        items.push_str(&format!("<li><a href=\"/{name}\">{name}</a></li>\n"));
    }
    Ok(Html(format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{app} reports</title></head>\n\
         <body><h1>Reports</h1><ul>\n{items}</ul></body></html>\n",
        app = crate::APP_NAME
    )))
}

fn make_app(dir: PathBuf) -> Router {
    let serve_dir = ServeDir::new(&dir);
    Router::new()
        .route("/", get(index))
        .with_state(Arc::new(dir))
        .fallback_service(serve_dir)
}

pub async fn run_server(dir: PathBuf, port: u16) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{port}"))
        .await
        .with_context(|| format!("Failed to bind 127.0.0.1:{port}"))?;
    log::info!("Serving {} on http://127.0.0.1:{port}", dir.display());

    axum::serve(listener, make_app(dir))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::warn!("Failed to listen for Ctrl-C: {e}");
            }
        })
        .await?;
    Ok(())
}

/// Serve `dir` until Ctrl-C. Refuses to start when there is nothing to show.
pub fn serve(dir: &Path, port: u16) -> Result<()> {
    if !dir.is_dir() || html_files(dir)?.is_empty() {
        bail!("No HTML reports in {}; run `report` first", dir.display());
    }
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(run_server(dir.to_path_buf(), port))
}
