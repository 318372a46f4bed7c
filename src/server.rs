//! HTTP upload surface.
//!
//! | Method | Path       | Body                                   | Response |
//! |--------|------------|----------------------------------------|----------|
//! | GET    | `/health`  |                                        | `OK` |
//! | GET    | `/`        |                                        | HTML upload form |
//! | POST   | `/api/ask` | multipart: `file` (PDF), `question`    | [`AskOutput`] as JSON |
//!
//! Failures are JSON `{"error": ..., "status": ...}`. An upstream HTTP failure
//! additionally carries `upstream_status` and the raw `upstream_body`.

use crate::ask::ask_bytes;
use crate::cancel::CancelToken;
use crate::config::AskConfig;
use crate::error::PdfAskError;
use crate::output::AskOutput;
use crate::pipeline::client::ApiClient;
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Allowance for multipart boundaries and the question field on top of the PDF itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared across handlers; the key lives inside `client`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AskConfig>,
    pub client: ApiClient,
}

impl AppState {
    pub fn new(config: AskConfig, client: ApiClient) -> Self {
        Self {
            config: Arc::new(config),
            client,
        }
    }
}

/// Build the router with all endpoints.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_document_bytes.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/", get(upload_form))
        .route("/health", get(health))
        .route("/api/ask", post(handle_ask))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on `listener` until `shutdown` resolves, then drain in-flight submissions.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Listening on http://{}", addr);
    }
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn health() -> &'static str {
    "OK"
}

async fn upload_form() -> Html<&'static str> {
    Html(UPLOAD_FORM)
}

const UPLOAD_FORM: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>pdfask</title></head>
<body>
<h1>Upload a PDF and ask a question about it</h1>
<form action="/api/ask" method="post" enctype="multipart/form-data">
  <p><input type="file" name="file" accept="application/pdf" required></p>
  <p><input type="text" name="question" size="80" placeholder="Type your question here"></p>
  <p><button type="submit">Submit</button></p>
</form>
</body>
</html>
"#;

async fn handle_ask(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AskOutput>, ApiError> {
    let mut file: Option<Vec<u8>> = None;
    let mut question = String::new();

    while let Some(field) = multipart.next_field().await.map_err(ApiError::from)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => file = Some(field.bytes().await.map_err(ApiError::from)?.to_vec()),
            Some("question") => question = field.text().await.map_err(ApiError::from)?,
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }

    let bytes = file.ok_or_else(|| ApiError::bad_request("Missing multipart field 'file'"))?;
    debug!("Received upload: {} bytes, question {} chars", bytes.len(), question.len());

    let output = ask_bytes(bytes, &question, &state.client, &state.config, &CancelToken::new()).await?;

    // Per-page runs with at least one answer are returned as-is; nothing
    // succeeded means the upstream failure is the response.
    let output = if output.stats.succeeded == 0 {
        output.into_result()?
    } else {
        output
    };

    Ok(Json(output))
}

// ── Errors ───────────────────────────────────────────────────────────────

/// Error response for the HTTP surface.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    upstream_status: Option<u16>,
    upstream_body: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    upstream_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    upstream_body: Option<String>,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            upstream_status: None,
            upstream_body: None,
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<PdfAskError> for ApiError {
    fn from(err: PdfAskError) -> Self {
        let message = err.to_string();
        match err {
            PdfAskError::EmptyQuestion | PdfAskError::NotAPdf { .. } => Self::bad_request(message),
            PdfAskError::DocumentTooLarge { .. } => Self::new(StatusCode::PAYLOAD_TOO_LARGE, message),
            PdfAskError::CorruptPdf { .. }
            | PdfAskError::PasswordRequired
            | PdfAskError::WrongPassword
            | PdfAskError::RasterisationFailed { .. }
            | PdfAskError::NoImages
            | PdfAskError::Encoding { .. } => Self::new(StatusCode::UNPROCESSABLE_ENTITY, message),
            PdfAskError::Http { status, body } => Self {
                status: StatusCode::BAD_GATEWAY,
                message: format!("Model endpoint returned HTTP {}", status),
                upstream_status: Some(status),
                upstream_body: Some(body),
            },
            PdfAskError::Transport { timed_out: true, .. } => {
                Self::new(StatusCode::GATEWAY_TIMEOUT, message)
            }
            PdfAskError::Transport { .. } | PdfAskError::MalformedResponse { .. } => {
                Self::new(StatusCode::BAD_GATEWAY, message)
            }
            PdfAskError::Cancelled => Self::new(StatusCode::SERVICE_UNAVAILABLE, message),
            PdfAskError::InvalidConfig(_)
            | PdfAskError::PdfiumBindingFailed(_)
            | PdfAskError::Internal(_) => Self::new(StatusCode::INTERNAL_SERVER_ERROR, message),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::new(err.status(), err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("{} → {}", self.message, self.status);
        } else {
            warn!("{} → {}", self.message, self.status);
        }

        let body = ErrorBody {
            error: self.message,
            status: self.status.as_u16(),
            upstream_status: self.upstream_status,
            upstream_body: self.upstream_body,
        };

        (self.status, Json(body)).into_response()
    }
}
