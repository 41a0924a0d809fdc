use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::{AdminOnly, Require, RequireUser};
use crate::server::AppState;
use crate::server::dto::{
    CreateDirectoryUserRequest, DirectoryListResponse, DirectorySearchParams,
    DirectorySyncResponse, DirectoryUserResponse,
};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::types::DirectoryUser;

const MIN_QUERY_LEN: usize = 2;
const SEARCH_LIMIT: i64 = 20;

fn to_response(user: DirectoryUser) -> DirectoryUserResponse {
    DirectoryUserResponse {
        full_name: user.full_name(),
        username: user.username,
        email: user.email,
        job_title: user.job_title,
        department_id: user.department_id,
    }
}

/// Typeahead lookup for the staff assignment field.
pub async fn search(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<DirectorySearchParams>,
) -> impl IntoResponse {
    let query = params.q.trim();
    if query.len() < MIN_QUERY_LEN {
        return Ok::<_, ApiError>(Json(ApiResponse::success(Vec::<DirectoryUserResponse>::new())));
    }

    let users = state
        .store
        .search_directory_users(query, SEARCH_LIMIT)
        .api_err("Failed to search directory")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(
        users.into_iter().map(to_response).collect::<Vec<_>>(),
    )))
}

pub async fn list_users(
    _auth: Require<AdminOnly>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let users = state
        .store
        .list_directory_users()
        .api_err("Failed to list directory users")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(DirectoryListResponse {
        total_users: users.len(),
        active_users: users.iter().filter(|u| u.is_active).count(),
        ad_synced_users: users.iter().filter(|u| u.is_from_ad).count(),
        users,
    })))
}

/// Manually adds a directory entry. Rows created this way are never
/// touched by a future sync (is_from_ad stays false).
pub async fn create_user(
    _auth: Require<AdminOnly>,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateDirectoryUserRequest>,
) -> impl IntoResponse {
    let username = req.username.trim().to_string();
    if username.is_empty() {
        return Err(ApiError::bad_request("Username is required"));
    }
    if state
        .store
        .get_directory_user_by_username(&username)
        .api_err("Failed to look up directory user")?
        .is_some()
    {
        return Err(ApiError::conflict(
            "A directory user with this username already exists",
        ));
    }

    if let Some(dept_id) = &req.department_id {
        state
            .store
            .get_department(dept_id)
            .api_err("Failed to look up department")?
            .or_not_found("Unknown department")?;
    }
    if let Some(location_id) = &req.office_location_id {
        state
            .store
            .get_location(location_id)
            .api_err("Failed to look up location")?
            .or_not_found("Unknown location")?;
    }

    let first_name = req.first_name.unwrap_or_default();
    let last_name = req.last_name.unwrap_or_default();
    let display_name = req
        .display_name
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| format!("{first_name} {last_name}").trim().to_string());

    let now = Utc::now();
    let user = DirectoryUser {
        id: Uuid::new_v4().to_string(),
        username,
        email: req.email,
        first_name,
        last_name,
        display_name,
        department_id: req.department_id,
        employee_id: req.employee_id,
        job_title: req.job_title,
        phone: req.phone,
        office_location_id: req.office_location_id,
        is_active: true,
        is_from_ad: false,
        ad_guid: None,
        last_synced: None,
        created_at: now,
        updated_at: now,
    };

    state.store.create_directory_user(&user).map_err(|e| match e {
        crate::error::Error::AlreadyExists => {
            ApiError::conflict("A directory user with this username already exists")
        }
        other => ApiError::from(other),
    })?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

/// Directory synchronization against an external provider is not wired
/// up; the endpoint reports that rather than pretending to sync.
pub async fn sync(
    _auth: Require<AdminOnly>,
    State(_state): State<Arc<AppState>>,
) -> impl IntoResponse {
    Json(ApiResponse::success(DirectorySyncResponse {
        success: false,
        message: "Active Directory integration not yet configured",
        synced_count: 0,
        new_users: 0,
        updated_users: 0,
    }))
}
