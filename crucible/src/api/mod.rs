//! HTTP API layer exposing the resource tree.

pub mod auth;
pub mod error;

use crate::api::auth::Caller;
use crate::api::error::ApiError;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::get,
    Json, Router,
};
use crucible_core::auth::TokenVerifier;
use crucible_core::export::TreeNode;
use crucible_core::path::PathResolution;
use crucible_core::resource::{NewResource, Resource, ResourcePatch, ResourceView};
use crucible_core::{ResourceError, ResourceService};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: ResourceService,
    pub verifier: Arc<dyn TokenVerifier>,
    /// Name of the cookie carrying the SSO token.
    pub sso_cookie: Arc<str>,
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Serialize)]
struct DeleteResponse {
    deleted: u64,
}

pub fn router(
    service: ResourceService,
    verifier: Arc<dyn TokenVerifier>,
    sso_cookie: impl Into<Arc<str>>,
) -> Router {
    let state = AppState {
        service,
        verifier,
        sso_cookie: sso_cookie.into(),
    };
    Router::new()
        .route("/api/resource", get(get_roots).post(create_resource))
        .route("/api/resource/getTreeNode", get(get_tree))
        .route("/api/resource/tag/{tag}", get(get_by_tag))
        .route("/api/resource/path", get(get_empty_path))
        .route("/api/resource/path/{*path}", get(get_path))
        .route(
            "/api/resource/{id}",
            get(get_resource)
                .patch(update_resource)
                .delete(delete_resource),
        )
        .route("/api/resource/{id}/questions", get(get_quiz_questions))
        .route("/health", get(|| async { "OK" }))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ResourceError::validation("ID invalid or could not be parsed").into())
}

async fn get_roots(State(state): State<AppState>) -> ApiResult<Vec<Resource>> {
    Ok(Json(state.service.roots().await?))
}

async fn get_tree(State(state): State<AppState>) -> ApiResult<Vec<TreeNode>> {
    Ok(Json(state.service.resource_tree().await?))
}

async fn get_by_tag(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(tag): Path<String>,
) -> ApiResult<Vec<ResourceView>> {
    Ok(Json(state.service.get_by_tag(&tag, &caller).await?))
}

async fn get_empty_path(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> ApiResult<PathResolution> {
    Ok(Json(state.service.get_path("", &caller).await?))
}

async fn get_path(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(path): Path<String>,
) -> ApiResult<PathResolution> {
    Ok(Json(state.service.get_path(&path, &caller).await?))
}

async fn create_resource(
    State(state): State<AppState>,
    Caller(caller): Caller,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Resource> {
    let Json(body) = body?;
    let resource: NewResource = serde_json::from_value(body).map_err(|e| {
        ResourceError::validation(format!(
            "Resource content invalid or does not match expected object interface: {}",
            e
        ))
    })?;
    Ok(Json(state.service.create(resource, &caller).await?))
}

async fn get_resource(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> ApiResult<ResourceView> {
    let id = parse_id(&id)?;
    Ok(Json(state.service.get_by_id(id, &caller).await?))
}

async fn update_resource(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Resource> {
    let id = parse_id(&id)?;
    let Json(body) = body?;
    let patch: ResourcePatch = serde_json::from_value(body).map_err(|e| {
        ResourceError::validation(format!("Resource update invalid: {}", e))
    })?;
    Ok(Json(state.service.update(id, patch, &caller).await?))
}

async fn delete_resource(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(id): Path<String>,
) -> ApiResult<DeleteResponse> {
    let id = parse_id(&id)?;
    let deleted = state.service.delete(id, &caller).await?;
    Ok(Json(DeleteResponse { deleted }))
}

async fn get_quiz_questions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Resource>> {
    let id = parse_id(&id)?;
    Ok(Json(state.service.smart_quiz_questions(id).await?))
}
