use serde::{Deserialize, Serialize};

use crate::types::{Role, UserAccount, UserProfile};

// Auth

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Self-service profile update; role and active flag stay admin-only.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub department_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,
}

impl UserResponse {
    #[must_use]
    pub fn from_parts(user: &UserAccount, profile: Option<&UserProfile>) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: profile.map(|p| p.role).unwrap_or_default(),
            is_active: user.is_active,
            phone: profile.and_then(|p| p.phone.clone()),
            department_id: profile.and_then(|p| p.department_id.clone()),
        }
    }
}

// Assets

#[derive(Debug, Deserialize)]
pub struct AssetRequest {
    pub device_name: String,
    pub device_model: String,
    pub serial_number: String,
    #[serde(default)]
    pub staff_name: Option<String>,
    #[serde(default)]
    pub department_id: Option<String>,
    pub status_id: String,
    pub location_id: String,
    pub device_type_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListAssetsParams {
    #[serde(default)]
    pub page: Option<i64>,
    /// Substring match on serial number.
    #[serde(default)]
    pub serial: Option<String>,
    #[serde(default)]
    pub status_id: Option<String>,
    #[serde(default)]
    pub device_type_id: Option<String>,
    /// Substring match on assigned staff name.
    #[serde(default)]
    pub staff: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: Option<i64>,
}

// Import

#[derive(Debug, Serialize)]
pub struct ImportRowError {
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ImportValidationResponse {
    /// Absent when no row validated; otherwise claims the staged rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_id: Option<String>,
    pub total_rows: usize,
    pub valid_rows: usize,
    pub errors: Vec<ImportRowError>,
}

#[derive(Debug, Serialize)]
pub struct ImportConfirmResponse {
    pub created: usize,
}

// Dashboard and analytics. These round-trip through the dashboard
// cache, so they carry Deserialize as well.

#[derive(Debug, Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_assets: i64,
    pub active_assets: i64,
    pub decommissioned_assets: i64,
    pub assets_this_month: i64,
    pub assets_updated_this_week: i64,
    pub status_breakdown: Vec<BreakdownEntry>,
    pub device_type_breakdown: Vec<BreakdownEntry>,
    pub location_breakdown: Vec<BreakdownEntry>,
    pub department_breakdown: Vec<BreakdownEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrendData {
    pub created_trend: Vec<TrendPoint>,
    pub updated_trend: Vec<TrendPoint>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChartParams {
    #[serde(rename = "type", default)]
    pub chart_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Utilization {
    pub in_use_assets: i64,
    pub active_assets: i64,
    /// Percentage of active assets currently in use, rounded to two
    /// decimal places. Zero when there are no active assets.
    pub utilization_rate: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DepartmentAnalytics {
    pub name: String,
    pub asset_count: i64,
    pub device_types: Vec<BreakdownEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyticsData {
    pub departments: Vec<DepartmentAnalytics>,
    pub trends: TrendData,
}

// Reference data

#[derive(Debug, Deserialize)]
pub struct CreateNamedRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateLocationRequest {
    pub code: String,
    pub name: String,
}

// User administration

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub department_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub department_id: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

// Directory

#[derive(Debug, Deserialize)]
pub struct DirectorySearchParams {
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct DirectoryUserResponse {
    pub username: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateDirectoryUserRequest {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub department_id: Option<String>,
    #[serde(default)]
    pub office_location_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DirectoryListResponse {
    pub total_users: usize,
    pub active_users: usize,
    pub ad_synced_users: usize,
    pub users: Vec<crate::types::DirectoryUser>,
}

#[derive(Debug, Serialize)]
pub struct DirectorySyncResponse {
    pub success: bool,
    pub message: &'static str,
    pub synced_count: usize,
    pub new_users: usize,
    pub updated_users: usize,
}
