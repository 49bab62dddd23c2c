use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use ts_rs::TS;

use crate::compiler::{self, Diagnostic, DiagnosticKind};
use crate::error::AppError;
use crate::state::AppState;

// ── Response types ───────────────────────────────────────────────

#[derive(Serialize)]
struct ApiOk<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Serialize)]
struct ApiErr {
    ok: bool,
    error: AppError,
}

fn ok_json<T: Serialize>(data: T) -> Response {
    Json(ApiOk { ok: true, data }).into_response()
}

fn err_json(status: StatusCode, error: AppError) -> Response {
    (status, Json(ApiErr { ok: false, error })).into_response()
}

/// Result of compiling a stored script. Exactly one of `bytecode` and `error` is set.
#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct CompiledScriptResponse {
    #[ts(type = "number")]
    pub id: i64,
    pub bytecode: Option<Vec<i32>>,
    pub error: Option<String>,
}

/// Result of compiling unsaved script text. `detail` and `position` locate the
/// failing token for editors.
#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct CompilePreviewResponse {
    pub bytecode: Option<Vec<i32>>,
    pub error: Option<String>,
    pub detail: Option<String>,
    #[ts(type = "number | null")]
    pub position: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CompilePreviewRequest {
    pub text: String,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct ReloadResponse {
    #[ts(type = "number")]
    pub count: usize,
}

fn diagnostic_status(diagnostic: &Diagnostic) -> StatusCode {
    match diagnostic.kind {
        DiagnosticKind::NotFound => StatusCode::NOT_FOUND,
        DiagnosticKind::ParseError => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

// ── Handlers ─────────────────────────────────────────────────────

async fn get_compiled_script(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Response {
    match state.compile(id) {
        Ok(bytecode) => Json(CompiledScriptResponse {
            id,
            bytecode: Some(bytecode.into_vec()),
            error: None,
        })
        .into_response(),
        Err(diagnostic) => {
            let status = diagnostic_status(&diagnostic);
            let body = CompiledScriptResponse {
                id,
                bytecode: None,
                error: Some(diagnostic.message),
            };
            (status, Json(body)).into_response()
        }
    }
}

async fn post_compile_preview(Json(body): Json<CompilePreviewRequest>) -> Response {
    match compiler::compile_source(&body.text) {
        Ok(bytecode) => Json(CompilePreviewResponse {
            bytecode: Some(bytecode.into_vec()),
            error: None,
            detail: None,
            position: None,
        })
        .into_response(),
        Err(diagnostic) => {
            let status = diagnostic_status(&diagnostic);
            let body = CompilePreviewResponse {
                bytecode: None,
                error: Some(diagnostic.message),
                detail: diagnostic.detail,
                position: diagnostic.position,
            };
            (status, Json(body)).into_response()
        }
    }
}

async fn post_reload_scripts(Extension(state): Extension<Arc<AppState>>) -> Response {
    match state.reload_library() {
        Ok(count) => ok_json(ReloadResponse { count }),
        Err(e) => {
            tracing::warn!("script library reload failed: {e}");
            err_json(StatusCode::INTERNAL_SERVER_ERROR, e.into())
        }
    }
}

// ── Server startup ───────────────────────────────────────────────

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/ai/{id}/compile", get(get_compiled_script))
        .route("/api/compile", post(post_compile_preview))
        .route("/api/scripts/reload", post(post_reload_scripts))
        .layer(CorsLayer::permissive())
        .layer(Extension(state))
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    tracing::info!("API server listening on http://{local}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
}
