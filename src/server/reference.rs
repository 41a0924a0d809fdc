use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::auth::{AdminOnly, Require, RequireUser};
use crate::server::AppState;
use crate::server::dto::{CreateLocationRequest, CreateNamedRequest};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::types::{Department, DeviceType, Location};

// Reference data reads are open to any authenticated user; writes are
// admin-only since every asset hangs off these rows.

pub async fn list_departments(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let departments = state
        .store
        .list_departments()
        .api_err("Failed to list departments")?;
    Ok::<_, ApiError>(Json(ApiResponse::success(departments)))
}

pub async fn create_department(
    _auth: Require<AdminOnly>,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateNamedRequest>,
) -> impl IntoResponse {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("Department name cannot be empty"));
    }

    let dept = Department {
        id: Uuid::new_v4().to_string(),
        name: req.name.trim().to_string(),
    };
    state
        .store
        .create_department(&dept)
        .map_err(ApiError::from)?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(dept))))
}

pub async fn delete_department(
    _auth: Require<AdminOnly>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    // Assets referencing the department fall back to unassigned.
    let deleted = state
        .store
        .delete_department(&id)
        .map_err(ApiError::from)?;
    if !deleted {
        return Err(ApiError::not_found("Department not found"));
    }

    Ok::<_, ApiError>(Json(ApiResponse::success(serde_json::json!({
        "deleted": true
    }))))
}

pub async fn list_device_types(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let types = state
        .store
        .list_device_types()
        .api_err("Failed to list device types")?;
    Ok::<_, ApiError>(Json(ApiResponse::success(types)))
}

pub async fn create_device_type(
    _auth: Require<AdminOnly>,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateNamedRequest>,
) -> impl IntoResponse {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("Device type name cannot be empty"));
    }

    let dt = DeviceType {
        id: Uuid::new_v4().to_string(),
        name: req.name.trim().to_string(),
    };
    state
        .store
        .create_device_type(&dt)
        .map_err(ApiError::from)?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(dt))))
}

pub async fn delete_device_type(
    _auth: Require<AdminOnly>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let deleted = state
        .store
        .delete_device_type(&id)
        .map_err(ApiError::from)?;
    if !deleted {
        return Err(ApiError::not_found("Device type not found"));
    }

    Ok::<_, ApiError>(Json(ApiResponse::success(serde_json::json!({
        "deleted": true
    }))))
}

pub async fn list_statuses(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let statuses = state
        .store
        .list_statuses()
        .api_err("Failed to list statuses")?;
    Ok::<_, ApiError>(Json(ApiResponse::success(statuses)))
}

pub async fn list_locations(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let locations = state
        .store
        .list_locations()
        .api_err("Failed to list locations")?;
    Ok::<_, ApiError>(Json(ApiResponse::success(locations)))
}

pub async fn create_location(
    _auth: Require<AdminOnly>,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateLocationRequest>,
) -> impl IntoResponse {
    if req.code.trim().is_empty() || req.name.trim().is_empty() {
        return Err(ApiError::bad_request(
            "Location code and name cannot be empty",
        ));
    }

    let loc = Location {
        id: Uuid::new_v4().to_string(),
        code: req.code.trim().to_uppercase(),
        name: req.name.trim().to_string(),
    };
    state.store.create_location(&loc).map_err(ApiError::from)?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(loc))))
}

pub async fn delete_location(
    _auth: Require<AdminOnly>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let deleted = state
        .store
        .delete_location(&id)
        .map_err(ApiError::from)?;
    if !deleted {
        return Err(ApiError::not_found("Location not found"));
    }

    Ok::<_, ApiError>(Json(ApiResponse::success(serde_json::json!({
        "deleted": true
    }))))
}
