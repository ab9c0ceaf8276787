//! Device discovery handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use std::sync::Arc;

use crate::transport::{DeviceDescriptor, TransportVariant};

use super::super::state::AppState;

/// Discovery result.
#[derive(Debug, Serialize)]
pub struct DevicesResponse {
    pub devices: Vec<DeviceDescriptor>,
    /// Set when discovery failed part way.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /api/devices/:variant - Scan for printers.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Path(variant): Path<TransportVariant>,
) -> Json<DevicesResponse> {
    let mut scan = state.service.discover_devices(variant);

    let mut devices = Vec::new();
    while let Some(device) = scan.next().await {
        devices.push(device);
    }

    Json(DevicesResponse {
        devices,
        error: scan.error().map(|e| e.to_string()),
    })
}
