use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{
    Router,
    routing::{delete, get, post},
};

use super::staging::ImportStaging;
use super::{account, assets, audit, dashboard, directory, export, import, reference, users};
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub staging: ImportStaging,
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(account::login))
        .route("/auth/logout", post(account::logout))
        .route("/auth/me", get(account::me).patch(account::update_me))
        .route("/auth/change-password", post(account::change_password))
}

fn asset_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/assets", get(assets::list_assets).post(assets::create_asset))
        .route("/assets/export", get(export::export_assets))
        .route("/assets/decommissioned", get(assets::list_decommissioned))
        .route(
            "/assets/decommissioned/export",
            get(export::export_decommissioned),
        )
        .route("/assets/import", post(import::validate_import))
        .route(
            "/assets/import/{import_id}/confirm",
            post(import::confirm_import),
        )
        .route(
            "/assets/{id}",
            get(assets::get_asset)
                .put(assets::update_asset)
                .patch(assets::update_asset)
                .delete(assets::delete_asset),
        )
        .route("/assets/{id}/history", get(assets::asset_history))
}

fn reference_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/departments",
            get(reference::list_departments).post(reference::create_department),
        )
        .route("/departments/{id}", delete(reference::delete_department))
        .route(
            "/device-types",
            get(reference::list_device_types).post(reference::create_device_type),
        )
        .route("/device-types/{id}", delete(reference::delete_device_type))
        .route("/statuses", get(reference::list_statuses))
        .route(
            "/locations",
            get(reference::list_locations).post(reference::create_location),
        )
        .route("/locations/{id}", delete(reference::delete_location))
}

fn dashboard_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard", get(dashboard::dashboard))
        .route("/analytics", get(dashboard::analytics))
        .route("/analytics/chart-data", get(dashboard::chart_data))
        .route("/analytics/utilization", get(dashboard::utilization))
        .route("/dashboard/export", get(dashboard::export_dashboard))
        .route("/metrics/generate", post(dashboard::generate_metrics))
}

fn directory_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/directory/search", get(directory::search))
        .route(
            "/directory/users",
            get(directory::list_users).post(directory::create_user),
        )
        .route("/directory/sync", post(directory::sync))
}

fn user_admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/{id}/reset-password", post(users::reset_password))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(auth_router())
        .merge(asset_router())
        .route("/audit", get(audit::list_audit))
        .merge(reference_router())
        .merge(dashboard_router())
        .merge(directory_router())
        .merge(user_admin_router());

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
