use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use chrono::{Datelike, Duration, TimeZone, Utc};
use serde_json::json;

use crate::auth::{AdminOnly, Require, RequireUser};
use crate::error::Result;
use crate::server::AppState;
use crate::server::cache::{DASHBOARD_TTL_MINUTES, get_or_compute};
use crate::server::dto::{
    AnalyticsData, BreakdownEntry, ChartParams, DashboardStats, DepartmentAnalytics, TrendData,
    TrendPoint, Utilization,
};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::store::Store;
use crate::types::AssetMetrics;

const RECENT_ACTIVITY_LIMIT: i64 = 10;
const CHART_TREND_DAYS: i64 = 30;
const ANALYTICS_TREND_DAYS: i64 = 90;

fn entries(rows: Vec<(String, i64)>) -> Vec<BreakdownEntry> {
    rows.into_iter()
        .map(|(name, count)| BreakdownEntry { name, count })
        .collect()
}

/// Start of the current calendar month, UTC.
fn month_start() -> chrono::DateTime<Utc> {
    let today = Utc::now().date_naive();
    let first = today.with_day(1).unwrap_or(today);
    Utc.from_utc_datetime(&first.and_hms_opt(0, 0, 0).unwrap_or_default())
}

pub fn compute_stats(store: &dyn Store) -> Result<DashboardStats> {
    let total_assets = store.count_all_assets()?;
    let active_assets = store.count_active_assets()?;

    Ok(DashboardStats {
        total_assets,
        active_assets,
        decommissioned_assets: total_assets - active_assets,
        assets_this_month: store.count_created_since(month_start())?,
        assets_updated_this_week: store.count_updated_since(Utc::now() - Duration::days(7))?,
        status_breakdown: entries(store.status_breakdown()?),
        device_type_breakdown: entries(store.device_type_breakdown()?),
        location_breakdown: entries(store.location_breakdown()?),
        department_breakdown: store
            .department_breakdown()?
            .into_iter()
            .map(|(name, count)| BreakdownEntry {
                name: name.unwrap_or_else(|| "Unassigned".to_string()),
                count,
            })
            .collect(),
    })
}

pub fn compute_trends(store: &dyn Store, days: i64) -> Result<TrendData> {
    let points = |rows: Vec<(String, i64)>| {
        rows.into_iter()
            .map(|(date, count)| TrendPoint { date, count })
            .collect()
    };
    let since = Utc::now() - Duration::days(days);

    Ok(TrendData {
        created_trend: points(store.created_trend(since)?),
        updated_trend: points(store.updated_trend(since)?),
    })
}

fn compute_department_analytics(store: &dyn Store) -> Result<Vec<DepartmentAnalytics>> {
    let mut result = Vec::new();
    for dept in store.list_departments()? {
        result.push(DepartmentAnalytics {
            name: dept.name,
            asset_count: store.count_active_in_department(&dept.id)?,
            device_types: entries(store.department_device_type_breakdown(&dept.id)?),
        });
    }
    Ok(result)
}

pub fn compute_utilization(store: &dyn Store) -> Result<Utilization> {
    let active_assets = store.count_active_assets()?;
    let in_use_assets = store.count_active_with_status(crate::types::STATUS_IN_USE)?;

    let utilization_rate = if active_assets == 0 {
        0.0
    } else {
        (in_use_assets as f64 / active_assets as f64 * 100.0 * 100.0).round() / 100.0
    };

    Ok(Utilization {
        in_use_assets,
        active_assets,
        utilization_rate,
    })
}

pub async fn dashboard(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let stats: DashboardStats = get_or_compute(store, "dashboard_stats", DASHBOARD_TTL_MINUTES, || {
        compute_stats(store)
    })
    .api_err("Failed to compute dashboard stats")?;

    // Recent activity is always live; a half-hour-old feed reads as broken.
    let recent_activity = store
        .recent_audit(RECENT_ACTIVITY_LIMIT)
        .api_err("Failed to load recent activity")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(json!({
        "stats": stats,
        "recent_activity": recent_activity,
    }))))
}

pub async fn analytics(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let data: AnalyticsData =
        get_or_compute(store, "department_analytics", DASHBOARD_TTL_MINUTES, || {
            Ok(AnalyticsData {
                departments: compute_department_analytics(store)?,
                trends: compute_trends(store, ANALYTICS_TREND_DAYS)?,
            })
        })
        .api_err("Failed to compute analytics")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(data)))
}

fn breakdown_chart(entries: &[BreakdownEntry]) -> serde_json::Value {
    json!({
        "labels": entries.iter().map(|e| e.name.clone()).collect::<Vec<_>>(),
        "values": entries.iter().map(|e| e.count).collect::<Vec<_>>(),
    })
}

/// Chart payloads keyed by a `type` query parameter. Breakdown charts
/// come out of the cached stats; trends get their own cache entry.
pub async fn chart_data(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ChartParams>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let chart_type = params.chart_type.as_deref().unwrap_or("status");

    if chart_type == "trends" {
        let trends: TrendData = get_or_compute(store, "chart_data", DASHBOARD_TTL_MINUTES, || {
            compute_trends(store, CHART_TREND_DAYS)
        })
        .api_err("Failed to compute chart data")?;
        return Ok::<_, ApiError>(Json(ApiResponse::success(json!({
            "created": trends.created_trend,
            "updated": trends.updated_trend,
        }))));
    }

    let stats: DashboardStats = get_or_compute(store, "dashboard_stats", DASHBOARD_TTL_MINUTES, || {
        compute_stats(store)
    })
    .api_err("Failed to compute dashboard stats")?;

    let data = match chart_type {
        "status" => breakdown_chart(&stats.status_breakdown),
        "device_type" => breakdown_chart(&stats.device_type_breakdown),
        "department" => breakdown_chart(&stats.department_breakdown),
        "location" => breakdown_chart(&stats.location_breakdown),
        _ => return Err(ApiError::bad_request("Invalid chart type")),
    };

    Ok::<_, ApiError>(Json(ApiResponse::success(data)))
}

/// Full dashboard bundle as a single JSON document.
pub async fn export_dashboard(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let bundle = json!({
        "generated_at": Utc::now().to_rfc3339(),
        "statistics": compute_stats(store).api_err("Failed to compute dashboard stats")?,
        "trends": compute_trends(store, CHART_TREND_DAYS).api_err("Failed to compute trends")?,
        "department_analytics":
            compute_department_analytics(store).api_err("Failed to compute analytics")?,
        "utilization": compute_utilization(store).api_err("Failed to compute utilization")?,
    });

    Ok::<_, ApiError>(Json(bundle))
}

pub async fn utilization(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let data = compute_utilization(state.store.as_ref()).api_err("Failed to compute utilization")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(data)))
}

/// Writes (or rewrites) today's metrics snapshot.
pub async fn generate_metrics(
    _auth: Require<AdminOnly>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let total_assets = store.count_all_assets().api_err("Failed to count assets")?;
    let active_assets = store
        .count_active_assets()
        .api_err("Failed to count assets")?;
    let in_use_assets = store
        .count_active_with_status(crate::types::STATUS_IN_USE)
        .api_err("Failed to count assets")?;
    let spare_assets = store
        .count_active_with_status(crate::types::STATUS_SPARE)
        .api_err("Failed to count assets")?;

    let as_object = |rows: Vec<(String, i64)>| {
        serde_json::Value::Object(
            rows.into_iter()
                .map(|(name, count)| (name, json!(count)))
                .collect(),
        )
    };

    let metrics = AssetMetrics {
        date: Utc::now().date_naive(),
        total_assets,
        active_assets,
        in_use_assets,
        spare_assets,
        decommissioned_assets: total_assets - active_assets,
        department_breakdown: serde_json::Value::Object(
            store
                .department_breakdown()
                .api_err("Failed to load department breakdown")?
                .into_iter()
                .map(|(name, count)| (name.unwrap_or_else(|| "Unassigned".to_string()), json!(count)))
                .collect(),
        ),
        device_type_breakdown: as_object(
            store
                .device_type_breakdown()
                .api_err("Failed to load device type breakdown")?,
        ),
        location_breakdown: as_object(
            store
                .location_breakdown()
                .api_err("Failed to load location breakdown")?,
        ),
        created_at: Utc::now(),
    };

    store
        .upsert_metrics(&metrics)
        .api_err("Failed to store metrics")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(metrics)))
}
