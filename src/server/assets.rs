use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::{CreateAssets, DeleteAssets, EditAssets, Require, RequireUser};
use crate::server::AppState;
use crate::server::dto::{AssetRequest, ListAssetsParams};
use crate::server::response::{
    ASSET_PAGE_SIZE, ApiError, ApiResponse, PagedResponse, StoreOptionExt, StoreResultExt,
};
use crate::server::validation::validate_asset_request;
use crate::store::{AssetFilter, Store};
use crate::types::{Asset, AuditEntry};

/// Checks that every referenced row exists before touching the assets
/// table, so the caller sees a field-level message instead of a bare
/// foreign key failure.
fn check_references(store: &dyn Store, req: &AssetRequest) -> Result<(), ApiError> {
    store
        .get_status(&req.status_id)
        .api_err("Failed to look up status")?
        .or_not_found("Unknown status")?;
    store
        .get_location(&req.location_id)
        .api_err("Failed to look up location")?
        .or_not_found("Unknown location")?;
    store
        .get_device_type(&req.device_type_id)
        .api_err("Failed to look up device type")?
        .or_not_found("Unknown device type")?;
    if let Some(dept_id) = &req.department_id {
        store
            .get_department(dept_id)
            .api_err("Failed to look up department")?
            .or_not_found("Unknown department")?;
    }
    Ok(())
}

fn audit_entry(
    asset_id: &str,
    user_id: &str,
    action: &str,
    field_name: &str,
    old_value: String,
    new_value: String,
) -> AuditEntry {
    AuditEntry {
        id: Uuid::new_v4().to_string(),
        asset_id: asset_id.to_string(),
        user_id: Some(user_id.to_string()),
        action: action.to_string(),
        field_name: Some(field_name.to_string()),
        old_value: Some(old_value),
        new_value: Some(new_value),
        timestamp: Utc::now(),
    }
}

pub(super) fn filter_from_params(params: &ListAssetsParams, decommissioned: bool) -> AssetFilter {
    AssetFilter {
        decommissioned,
        serial_number: params.serial.clone().filter(|s| !s.is_empty()),
        status_id: params.status_id.clone().filter(|s| !s.is_empty()),
        device_type_id: params.device_type_id.clone().filter(|s| !s.is_empty()),
        staff_name: params.staff.clone().filter(|s| !s.is_empty()),
    }
}

pub async fn list_assets(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListAssetsParams>,
) -> impl IntoResponse {
    let filter = filter_from_params(&params, false);
    let page = params.page.unwrap_or(1).max(1);

    let assets = state
        .store
        .list_assets(&filter, page, ASSET_PAGE_SIZE)
        .api_err("Failed to list assets")?;
    let total = state
        .store
        .count_assets(&filter)
        .api_err("Failed to count assets")?;

    Ok::<_, ApiError>(Json(PagedResponse::new(assets, page, ASSET_PAGE_SIZE, total)))
}

pub async fn list_decommissioned(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListAssetsParams>,
) -> impl IntoResponse {
    // Status filtering makes no sense here; the list is one status.
    let mut filter = filter_from_params(&params, true);
    filter.status_id = None;
    let page = params.page.unwrap_or(1).max(1);

    let assets = state
        .store
        .list_assets(&filter, page, ASSET_PAGE_SIZE)
        .api_err("Failed to list assets")?;
    let total = state
        .store
        .count_assets(&filter)
        .api_err("Failed to count assets")?;

    Ok::<_, ApiError>(Json(PagedResponse::new(assets, page, ASSET_PAGE_SIZE, total)))
}

pub async fn get_asset(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let detail = state
        .store
        .get_asset_detail(&id)
        .api_err("Failed to load asset")?
        .or_not_found("Asset not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(detail)))
}

pub async fn create_asset(
    auth: Require<CreateAssets>,
    State(state): State<Arc<AppState>>,
    Json(req): Json<AssetRequest>,
) -> impl IntoResponse {
    validate_asset_request(&req)?;
    check_references(state.store.as_ref(), &req)?;

    if state
        .store
        .get_asset_by_serial(&req.serial_number)
        .api_err("Failed to check serial number")?
        .is_some()
    {
        return Err(ApiError::conflict(
            "An asset with this serial number already exists",
        ));
    }

    let now = Utc::now();
    let asset = Asset {
        id: Uuid::new_v4().to_string(),
        device_name: req.device_name,
        device_model: req.device_model,
        serial_number: req.serial_number,
        staff_name: req.staff_name.filter(|s| !s.is_empty()),
        department_id: req.department_id,
        status_id: req.status_id,
        location_id: req.location_id,
        device_type_id: req.device_type_id,
        created_at: now,
        updated_at: now,
    };
    state.store.create_asset(&asset).map_err(ApiError::from)?;

    state
        .store
        .create_audit_entry(&audit_entry(
            &asset.id,
            &auth.user.id,
            "created",
            "asset",
            String::new(),
            "Asset created".to_string(),
        ))
        .api_err("Failed to record audit entry")?;

    let detail = state
        .store
        .get_asset_detail(&asset.id)
        .api_err("Failed to load asset")?
        .or_not_found("Asset not found")?;

    tracing::info!("Asset '{}' created by '{}'", asset.serial_number, auth.user.username);

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(detail)),
    ))
}

pub async fn update_asset(
    auth: Require<EditAssets>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AssetRequest>,
) -> impl IntoResponse {
    validate_asset_request(&req)?;
    check_references(state.store.as_ref(), &req)?;

    let old = state
        .store
        .get_asset_detail(&id)
        .api_err("Failed to load asset")?
        .or_not_found("Asset not found")?;

    if let Some(existing) = state
        .store
        .get_asset_by_serial(&req.serial_number)
        .api_err("Failed to check serial number")?
    {
        if existing.id != id {
            return Err(ApiError::conflict(
                "An asset with this serial number already exists",
            ));
        }
    }

    let updated = Asset {
        id: id.clone(),
        device_name: req.device_name,
        device_model: req.device_model,
        serial_number: req.serial_number,
        staff_name: req.staff_name.filter(|s| !s.is_empty()),
        department_id: req.department_id,
        status_id: req.status_id,
        location_id: req.location_id,
        device_type_id: req.device_type_id,
        created_at: old.asset.created_at,
        updated_at: Utc::now(),
    };
    state.store.update_asset(&updated).map_err(ApiError::from)?;

    let detail = state
        .store
        .get_asset_detail(&id)
        .api_err("Failed to load asset")?
        .or_not_found("Asset not found")?;

    // One audit row per tracked field that actually changed.
    for change in old.tracked_changes(&detail) {
        state
            .store
            .create_audit_entry(&audit_entry(
                &id,
                &auth.user.id,
                "updated",
                change.field,
                change.old_value,
                change.new_value,
            ))
            .api_err("Failed to record audit entry")?;
    }

    Ok::<_, ApiError>(Json(ApiResponse::success(detail)))
}

pub async fn delete_asset(
    auth: Require<DeleteAssets>,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let detail = state
        .store
        .get_asset_detail(&id)
        .api_err("Failed to load asset")?
        .or_not_found("Asset not found")?;

    // Audit rows go with the asset (history is per-asset, not global).
    state
        .store
        .delete_asset(&id)
        .api_err("Failed to delete asset")?;

    tracing::info!(
        "Asset '{}' deleted by '{}'",
        detail.asset.serial_number,
        auth.user.username
    );

    Ok::<_, ApiError>(Json(ApiResponse::success(serde_json::json!({
        "deleted": true
    }))))
}

pub async fn asset_history(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state
        .store
        .get_asset(&id)
        .api_err("Failed to load asset")?
        .or_not_found("Asset not found")?;

    let entries = state
        .store
        .list_asset_audit(&id)
        .api_err("Failed to load history")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(entries)))
}
