//! Capability discovery endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use transmute_core::{FormatCatalog, FormatToken};

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TargetsResponse {
    pub input_format: FormatToken,
    pub available_formats: Vec<FormatToken>,
}

/// Every format any converter accepts or produces.
pub async fn list_formats(State(state): State<Arc<AppState>>) -> Json<FormatCatalog> {
    Json(state.service().list_all_formats())
}

/// Formats a given input can be converted into. Unknown inputs get an empty list.
pub async fn list_targets(
    State(state): State<Arc<AppState>>,
    Path(input_format): Path<String>,
) -> Json<TargetsResponse> {
    let input_format = FormatToken::new(&input_format);
    let available_formats = state.service().list_targets_for(input_format.as_str());
    Json(TargetsResponse {
        input_format,
        available_formats,
    })
}
