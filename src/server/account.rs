use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::{RequireUser, TokenGenerator};
use crate::server::AppState;
use crate::server::dto::{
    ChangePasswordRequest, LoginRequest, LoginResponse, UpdateProfileRequest, UserResponse,
};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_password;
use crate::types::Token;

/// Issued tokens expire after a week of existence regardless of use.
const TOKEN_LIFETIME_DAYS: i64 = 7;

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let invalid = || ApiError::unauthorized("Invalid username or password");

    let user = state
        .store
        .get_user_by_username(&req.username)
        .api_err("Failed to look up user")?
        .ok_or_else(invalid)?;

    if !user.is_active {
        return Err(invalid());
    }

    let generator = TokenGenerator::new();
    if !generator
        .verify(&req.password, &user.password_hash)
        .map_err(|_| invalid())?
    {
        return Err(invalid());
    }

    let (raw_token, lookup, hash) = generator
        .generate()
        .api_err("Failed to generate token")?;

    let now = Utc::now();
    let token = Token {
        id: Uuid::new_v4().to_string(),
        token_hash: hash,
        token_lookup: lookup,
        user_id: user.id.clone(),
        created_at: now,
        expires_at: Some(now + Duration::days(TOKEN_LIFETIME_DAYS)),
        last_used_at: None,
    };
    state
        .store
        .create_token(&token)
        .api_err("Failed to store token")?;

    let profile = state
        .store
        .get_profile(&user.id)
        .api_err("Failed to load profile")?;

    tracing::info!("User '{}' logged in", user.username);

    Ok::<_, ApiError>(Json(ApiResponse::success(LoginResponse {
        token: raw_token,
        user: UserResponse::from_parts(&user, profile.as_ref()),
    })))
}

pub async fn logout(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    state
        .store
        .delete_token(&auth.token.id)
        .api_err("Failed to revoke token")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(serde_json::json!({
        "logged_out": true
    }))))
}

pub async fn me(auth: RequireUser, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let profile = state
        .store
        .get_profile(&auth.user.id)
        .api_err("Failed to load profile")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(UserResponse::from_parts(
        &auth.user,
        profile.as_ref(),
    ))))
}

/// Self-service profile edit. Role and the active flag are off-limits
/// here; those go through the admin user endpoints.
pub async fn update_me(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateProfileRequest>,
) -> impl IntoResponse {
    let mut user = auth.user;
    let mut profile = state
        .store
        .get_profile(&user.id)
        .api_err("Failed to load profile")?
        .or_not_found("User profile not found")?;

    if let Some(email) = req.email {
        user.email = email;
    }
    if let Some(first_name) = req.first_name {
        user.first_name = first_name;
    }
    if let Some(last_name) = req.last_name {
        user.last_name = last_name;
    }
    state
        .store
        .update_user(&user)
        .api_err("Failed to update user")?;

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
        .api_err("Failed to update profile")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(UserResponse::from_parts(
        &user,
        Some(&profile),
    ))))
}

pub async fn change_password(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChangePasswordRequest>,
) -> impl IntoResponse {
    let generator = TokenGenerator::new();

    if !generator
        .verify(&req.current_password, &auth.user.password_hash)
        .map_err(|_| ApiError::internal("Failed to verify password"))?
    {
        return Err(ApiError::bad_request("Current password is incorrect"));
    }

    validate_password(&req.new_password)?;

    let mut user = auth.user;
    user.password_hash = generator
        .hash(&req.new_password)
        .api_err("Failed to hash password")?;
    state
        .store
        .update_user(&user)
        .api_err("Failed to update password")?;

    // Other sessions keep their tokens; the password change only
    // affects future logins.
    Ok::<_, ApiError>(Json(ApiResponse::success(serde_json::json!({
        "changed": true
    }))))
}
