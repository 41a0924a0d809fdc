use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::Role;

/// Status names form a fixed enumeration seeded at init.
pub const STATUS_SPARE: &str = "spare";
pub const STATUS_IN_USE: &str = "in-use";
pub const STATUS_RETRIEVED: &str = "retrieved";
pub const STATUS_DECOMMISSIONED: &str = "decommissioned";

pub const STATUS_NAMES: [&str; 4] = [
    STATUS_SPARE,
    STATUS_IN_USE,
    STATUS_RETRIEVED,
    STATUS_DECOMMISSIONED,
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceType {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub id: String,
    pub name: String,
}

impl DeviceStatus {
    #[must_use]
    pub fn is_decommissioned(&self) -> bool {
        self.name.eq_ignore_ascii_case(STATUS_DECOMMISSIONED)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub device_name: String,
    pub device_model: String,
    pub serial_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,
    pub status_id: String,
    pub location_id: String,
    pub device_type_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Asset joined with its reference rows, the shape handlers return and the
/// CSV exporter consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetDetail {
    #[serde(flatten)]
    pub asset: Asset,
    pub status_name: String,
    pub device_type_name: String,
    pub location_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_name: Option<String>,
}

/// Fields whose changes are written to the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: &'static str,
    pub old_value: String,
    pub new_value: String,
}

impl AssetDetail {
    /// Diffs the tracked fields against a newer revision of the same asset.
    /// Reference fields compare by display name; an absent department or
    /// staff name stringifies to "".
    #[must_use]
    pub fn tracked_changes(&self, new: &AssetDetail) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        let mut push = |field: &'static str, old: &str, new: &str| {
            if old != new {
                changes.push(FieldChange {
                    field,
                    old_value: old.to_string(),
                    new_value: new.to_string(),
                });
            }
        };

        push("device_name", &self.asset.device_name, &new.asset.device_name);
        push(
            "device_model",
            &self.asset.device_model,
            &new.asset.device_model,
        );
        push("status", &self.status_name, &new.status_name);
        push("location", &self.location_name, &new.location_name);
        push(
            "department",
            self.department_name.as_deref().unwrap_or(""),
            new.department_name.as_deref().unwrap_or(""),
        );
        push(
            "staff_name",
            self.asset.staff_name.as_deref().unwrap_or(""),
            new.asset.staff_name.as_deref().unwrap_or(""),
        );

        changes
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub asset_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Audit entry joined with the acting user and the asset it concerns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntryDetail {
    #[serde(flatten)]
    pub entry: AuditEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub device_name: String,
    pub serial_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip)]
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

/// One row of the dashboard cache. `data` is serialized JSON; staleness is
/// judged against `updated_at` by the caller.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub cache_key: String,
    pub data: String,
    pub updated_at: DateTime<Utc>,
}

/// Daily snapshot of asset counts, one row per calendar date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetMetrics {
    pub date: NaiveDate,
    pub total_assets: i64,
    pub active_assets: i64,
    pub in_use_assets: i64,
    pub spare_assets: i64,
    pub decommissioned_assets: i64,
    pub department_breakdown: serde_json::Value,
    pub device_type_breakdown: serde_json::Value,
    pub location_breakdown: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Local mirror of an external-directory user. Nothing syncs it yet; rows
/// are created manually or left over from a future directory integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub office_location_id: Option<String>,
    pub is_active: bool,
    pub is_from_ad: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ad_guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_synced: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DirectoryUser {
    #[must_use]
    pub fn full_name(&self) -> String {
        let joined = format!("{} {}", self.first_name, self.last_name);
        let joined = joined.trim();
        if joined.is_empty() {
            if self.display_name.is_empty() {
                self.username.clone()
            } else {
                self.display_name.clone()
            }
        } else {
            joined.to_string()
        }
    }
}
