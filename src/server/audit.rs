use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::auth::{Require, ViewAudit};
use crate::server::AppState;
use crate::server::dto::PageParams;
use crate::server::response::{AUDIT_PAGE_SIZE, ApiError, PagedResponse, StoreResultExt};

/// The global ledger. Per-asset history lives under the asset routes
/// and is open to any authenticated user; this view is not.
pub async fn list_audit(
    _auth: Require<ViewAudit>,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> impl IntoResponse {
    let page = params.page.unwrap_or(1).max(1);

    let entries = state
        .store
        .list_audit(page, AUDIT_PAGE_SIZE)
        .api_err("Failed to load audit log")?;
    let total = state.store.count_audit().api_err("Failed to count audit log")?;

    Ok::<_, ApiError>(Json(PagedResponse::new(entries, page, AUDIT_PAGE_SIZE, total)))
}
