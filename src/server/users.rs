use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::{AdminOnly, Require, TokenGenerator};
use crate::server::AppState;
use crate::server::dto::{CreateUserRequest, ResetPasswordRequest, UpdateUserRequest, UserResponse};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::{validate_password, validate_username};
use crate::types::{UserAccount, UserProfile};

pub async fn list_users(
    _auth: Require<AdminOnly>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let users = state.store.list_users().api_err("Failed to list users")?;

    let mut result = Vec::with_capacity(users.len());
    for user in &users {
        let profile = state
            .store
            .get_profile(&user.id)
            .api_err("Failed to load profile")?;
        result.push(UserResponse::from_parts(user, profile.as_ref()));
    }

    Ok::<_, ApiError>(Json(ApiResponse::success(result)))
}

pub async fn get_user(
    _auth: Require<AdminOnly>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let user = state
        .store
        .get_user(&id)
        .api_err("Failed to load user")?
        .or_not_found("User not found")?;
    let profile = state
        .store
        .get_profile(&id)
        .api_err("Failed to load profile")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(UserResponse::from_parts(
        &user,
        profile.as_ref(),
    ))))
}

pub async fn create_user(
    _auth: Require<AdminOnly>,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> impl IntoResponse {
    validate_username(&req.username)?;
    validate_password(&req.password)?;

    if let Some(dept_id) = &req.department_id {
        state
            .store
            .get_department(dept_id)
            .api_err("Failed to look up department")?
            .or_not_found("Unknown department")?;
    }

    let generator = TokenGenerator::new();
    let now = Utc::now();
    let user = UserAccount {
        id: Uuid::new_v4().to_string(),
        username: req.username,
        email: req.email.unwrap_or_default(),
        first_name: req.first_name.unwrap_or_default(),
        last_name: req.last_name.unwrap_or_default(),
        password_hash: generator
            .hash(&req.password)
            .api_err("Failed to hash password")?,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    // Account and profile land together or not at all.
    let profile = UserProfile {
        user_id: user.id.clone(),
        role: req.role.unwrap_or_default(),
        phone: req.phone,
        department_id: req.department_id,
        created_at: now,
        updated_at: now,
    };

    state
        .store
        .create_user_with_profile(&user, &profile)
        .map_err(|e| match e {
            crate::error::Error::AlreadyExists => {
                ApiError::conflict("A user with this username already exists")
            }
            other => ApiError::from(other),
        })?;

    tracing::info!("User '{}' created with role '{}'", user.username, profile.role);

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(UserResponse::from_parts(
            &user,
            Some(&profile),
        ))),
    ))
}

pub async fn update_user(
    auth: Require<AdminOnly>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> impl IntoResponse {
    let mut user = state
        .store
        .get_user(&id)
        .api_err("Failed to load user")?
        .or_not_found("User not found")?;
    let mut profile = state
        .store
        .get_profile(&id)
        .api_err("Failed to load profile")?
        .or_not_found("User profile not found")?;

    if auth.user.id == id {
        if req.is_active == Some(false) {
            return Err(ApiError::bad_request("You cannot deactivate your own account"));
        }
        if let Some(role) = req.role {
            if !role.is_admin() {
                return Err(ApiError::bad_request("You cannot demote your own account"));
            }
        }
    }

    if let Some(email) = req.email {
        user.email = email;
    }
    if let Some(first_name) = req.first_name {
        user.first_name = first_name;
    }
    if let Some(last_name) = req.last_name {
        user.last_name = last_name;
    }
    if let Some(is_active) = req.is_active {
        user.is_active = is_active;
    }
    if let Some(password) = req.password {
        validate_password(&password)?;
        user.password_hash = TokenGenerator::new()
            .hash(&password)
            .api_err("Failed to hash password")?;
    }
    state.store.update_user(&user).map_err(ApiError::from)?;

    if let Some(role) = req.role {
        profile.role = role;
    }
    if let Some(phone) = req.phone {
        profile.phone = Some(phone);
    }
    if let Some(dept_id) = req.department_id {
        state
            .store
            .get_department(&dept_id)
            .api_err("Failed to look up department")?
            .or_not_found("Unknown department")?;
        profile.department_id = Some(dept_id);
    }
    state
        .store
        .update_profile(&profile)
        .map_err(ApiError::from)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(UserResponse::from_parts(
        &user,
        Some(&profile),
    ))))
}

/// Sets a new password without knowing the old one. Existing sessions
/// keep their tokens.
pub async fn reset_password(
    _auth: Require<AdminOnly>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ResetPasswordRequest>,
) -> impl IntoResponse {
    validate_password(&req.password)?;

    let mut user = state
        .store
        .get_user(&id)
        .api_err("Failed to load user")?
        .or_not_found("User not found")?;

    user.password_hash = TokenGenerator::new()
        .hash(&req.password)
        .api_err("Failed to hash password")?;
    state
        .store
        .update_user(&user)
        .api_err("Failed to update password")?;

    tracing::info!("Password reset for user '{}'", user.username);

    Ok::<_, ApiError>(Json(ApiResponse::success(serde_json::json!({
        "reset": true
    }))))
}

pub async fn delete_user(
    auth: Require<AdminOnly>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if auth.user.id == id {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }

    let deleted = state
        .store
        .delete_user(&id)
        .api_err("Failed to delete user")?;
    if !deleted {
        return Err(ApiError::not_found("User not found"));
    }

    Ok::<_, ApiError>(Json(ApiResponse::success(serde_json::json!({
        "deleted": true
    }))))
}
