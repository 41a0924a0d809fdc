use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, header},
    response::IntoResponse,
};
use chrono::Utc;

use crate::auth::RequireUser;
use crate::csv;
use crate::server::AppState;
use crate::server::assets::filter_from_params;
use crate::server::dto::ListAssetsParams;
use crate::server::response::{ApiError, StoreResultExt};
use crate::store::AssetFilter;

const EXPORT_HEADERS: [&str; 9] = [
    "Device Name",
    "Device Model",
    "Serial Number",
    "Device Type",
    "Status",
    "Location",
    "Department",
    "Staff Name",
    "Date Modified",
];

fn csv_response(filename: &str, body: String) -> Result<impl IntoResponse + use<>, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        "text/csv; charset=utf-8"
            .parse()
            .map_err(|_| ApiError::internal("Invalid header"))?,
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"{filename}\"")
            .parse()
            .map_err(|_| ApiError::internal("Invalid header"))?,
    );
    Ok((headers, body))
}

fn export_with_filter(
    state: &AppState,
    filter: &AssetFilter,
    filename_stem: &str,
) -> Result<impl IntoResponse + use<>, ApiError> {
    let total = state
        .store
        .count_assets(filter)
        .api_err("Failed to count assets")?;
    let assets = state
        .store
        .list_assets(filter, 1, total.max(1))
        .api_err("Failed to list assets")?;

    let mut out = String::new();
    csv::write_record(&mut out, &EXPORT_HEADERS);

    for detail in &assets {
        let modified = detail
            .asset
            .updated_at
            .format("%Y-%m-%d %H:%M")
            .to_string();
        csv::write_record(
            &mut out,
            &[
                &detail.asset.device_name,
                &detail.asset.device_model,
                &detail.asset.serial_number,
                &detail.device_type_name,
                &detail.status_name,
                &detail.location_name,
                detail.department_name.as_deref().unwrap_or(""),
                detail.asset.staff_name.as_deref().unwrap_or(""),
                &modified,
            ],
        );
    }

    let filename = format!("{filename_stem}_{}.csv", Utc::now().format("%Y%m%d_%H%M"));
    csv_response(&filename, out)
}

/// Exports non-decommissioned assets, honoring the same filters as the
/// list view. Columns mirror the import format so an export can be
/// re-imported elsewhere.
pub async fn export_assets(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListAssetsParams>,
) -> impl IntoResponse {
    let filter = filter_from_params(&params, false);
    export_with_filter(&state, &filter, "assets_export")
}

pub async fn export_decommissioned(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let filter = AssetFilter {
        decommissioned: true,
        ..AssetFilter::default()
    };
    export_with_filter(&state, &filter, "decommissioned_export")
}
