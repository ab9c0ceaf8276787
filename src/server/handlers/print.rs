//! Receipt printing handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::{
    document::ReceiptDocument,
    error::PrintError,
    ir::Program,
    layout::ReceiptLayout,
    printer::PrinterProfile,
};

use super::super::state::AppState;

/// Body for POST /api/print.
#[derive(Debug, Deserialize)]
pub struct PrintRequest {
    pub document: ReceiptDocument,
    pub profile: PrinterProfile,
}

/// Body for POST /api/preview.
#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub document: ReceiptDocument,
    /// Characters per line; the configured width when absent.
    pub width: Option<usize>,
}

/// Handle POST /api/print - print the receipt.
pub async fn print(State(state): State<Arc<AppState>>, Json(req): Json<PrintRequest>) -> Response {
    match state.service.print_receipt(&req.document, &req.profile).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Handle POST /api/preview - the instruction program, without printing.
pub async fn preview(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PreviewRequest>,
) -> Json<Program> {
    let program = match req.width {
        Some(width) => ReceiptLayout::new(width).render(&req.document).optimize(),
        None => state.service.program(&req.document),
    };
    Json(program)
}

/// Status code for a failed print.
pub fn status_for(error: &PrintError) -> StatusCode {
    if error.is_not_ready() {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    match error {
        PrintError::Write(_) => StatusCode::BAD_GATEWAY,
        PrintError::UnsupportedTransport(_) | PrintError::UnsupportedFormat(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        PrintError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn error_response(error: &PrintError) -> Response {
    (
        status_for(error),
        Json(json!({
            "status": "error",
            "error": error.to_string(),
            "not_ready": error.is_not_ready(),
        })),
    )
        .into_response()
}
