use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use cmr_types::{AssetRefs, ComponentRecord, TokenUri};
use serde_json::json;

use crate::auth::{Action, Credentials};
use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Raw `/:wheel/:engine/:build/:wrapping` segments, validated by the service.
type RawTuple = (String, String, String, String);

/// Public lookup called by the oracle.
pub async fn resolve_handler(
    State(state): State<AppState>,
    Path((wheel, engine, build, wrapping)): Path<RawTuple>,
) -> ServerResult<Json<TokenUri>> {
    let uri = state.service.resolve_raw(&wheel, &engine, &build, &wrapping).await?;
    Ok(Json(uri))
}

/// Privileged registration. An empty body registers a draft.
pub async fn register_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((wheel, engine, build, wrapping)): Path<RawTuple>,
    body: Bytes,
) -> ServerResult<(StatusCode, Json<serde_json::Value>)> {
    state.require(&Credentials::from_headers(&headers), Action::Register).await?;

    let refs = if body.iter().all(u8::is_ascii_whitespace) {
        AssetRefs::placeholder()
    } else {
        serde_json::from_slice::<AssetRefs>(&body).map_err(|e| ServerError::InvalidBody(e.to_string()))?
    };

    let record = state
        .service
        .register_raw(&wheel, &engine, &build, &wrapping, refs)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "record": record }))))
}

/// Full collection listing. Debug only.
pub async fn list_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ServerResult<Json<Vec<ComponentRecord>>> {
    state.require(&Credentials::from_headers(&headers), Action::ListAll).await?;
    Ok(Json(state.service.list_all().await?))
}

/// Bulk clear. Debug only.
pub async fn clear_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ServerResult<Json<serde_json::Value>> {
    state.require(&Credentials::from_headers(&headers), Action::ClearAll).await?;
    let deleted = state.service.clear_all().await?;
    Ok(Json(json!({ "success": true, "deleted": deleted })))
}

/// Health check handler.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Info handler.
pub async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "name": "cmr-server",
        "version": env!("CARGO_PKG_VERSION"),
        "max_component_supply": state.service.validator().max_supply(),
        "debug_endpoints": state.debug_endpoints,
    }))
}
