mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::Result;
use crate::types::*;

/// Filters applied to asset list/count/export queries.
#[derive(Debug, Default, Clone)]
pub struct AssetFilter {
    /// Select decommissioned assets instead of active ones.
    pub decommissioned: bool,
    /// Substring match on serial number.
    pub serial_number: Option<String>,
    pub status_id: Option<String>,
    pub device_type_id: Option<String>,
    /// Substring match on assigned staff name.
    pub staff_name: Option<String>,
}

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;
    /// Seeds the fixed status enumeration and the default locations.
    /// Idempotent.
    fn seed_reference_data(&self) -> Result<()>;

    // Department operations
    fn create_department(&self, dept: &Department) -> Result<()>;
    fn get_department(&self, id: &str) -> Result<Option<Department>>;
    fn get_department_by_name(&self, name: &str) -> Result<Option<Department>>;
    fn list_departments(&self) -> Result<Vec<Department>>;
    fn delete_department(&self, id: &str) -> Result<bool>;

    // Device type operations
    fn create_device_type(&self, dt: &DeviceType) -> Result<()>;
    fn get_device_type(&self, id: &str) -> Result<Option<DeviceType>>;
    fn get_device_type_by_name(&self, name: &str) -> Result<Option<DeviceType>>;
    fn list_device_types(&self) -> Result<Vec<DeviceType>>;
    fn delete_device_type(&self, id: &str) -> Result<bool>;

    // Status operations (fixed set, read-only after seeding)
    fn get_status(&self, id: &str) -> Result<Option<DeviceStatus>>;
    fn get_status_by_name(&self, name: &str) -> Result<Option<DeviceStatus>>;
    fn list_statuses(&self) -> Result<Vec<DeviceStatus>>;

    // Location operations
    fn create_location(&self, loc: &Location) -> Result<()>;
    fn get_location(&self, id: &str) -> Result<Option<Location>>;
    fn get_location_by_name(&self, name: &str) -> Result<Option<Location>>;
    fn list_locations(&self) -> Result<Vec<Location>>;
    fn delete_location(&self, id: &str) -> Result<bool>;

    // Asset operations
    fn create_asset(&self, asset: &Asset) -> Result<()>;
    fn get_asset(&self, id: &str) -> Result<Option<Asset>>;
    fn get_asset_detail(&self, id: &str) -> Result<Option<AssetDetail>>;
    fn get_asset_by_serial(&self, serial: &str) -> Result<Option<Asset>>;
    fn list_assets(
        &self,
        filter: &AssetFilter,
        page: i64,
        per_page: i64,
    ) -> Result<Vec<AssetDetail>>;
    fn count_assets(&self, filter: &AssetFilter) -> Result<i64>;
    fn update_asset(&self, asset: &Asset) -> Result<()>;
    fn delete_asset(&self, id: &str) -> Result<bool>;
    /// Creates every asset plus one "import" audit row each inside a single
    /// transaction. Any failure rolls the whole batch back.
    fn import_assets(&self, assets: &[Asset], user_id: Option<&str>) -> Result<usize>;

    // Audit operations
    fn create_audit_entry(&self, entry: &AuditEntry) -> Result<()>;
    fn list_asset_audit(&self, asset_id: &str) -> Result<Vec<AuditEntryDetail>>;
    fn list_audit(&self, page: i64, per_page: i64) -> Result<Vec<AuditEntryDetail>>;
    fn count_audit(&self) -> Result<i64>;
    fn recent_audit(&self, limit: i64) -> Result<Vec<AuditEntryDetail>>;

    // Aggregation queries over active (non-decommissioned) assets unless
    // stated otherwise
    fn count_all_assets(&self) -> Result<i64>;
    fn count_active_assets(&self) -> Result<i64>;
    fn count_active_with_status(&self, status_name: &str) -> Result<i64>;
    fn count_created_since(&self, since: DateTime<Utc>) -> Result<i64>;
    fn count_updated_since(&self, since: DateTime<Utc>) -> Result<i64>;
    fn status_breakdown(&self) -> Result<Vec<(String, i64)>>;
    fn device_type_breakdown(&self) -> Result<Vec<(String, i64)>>;
    fn department_breakdown(&self) -> Result<Vec<(Option<String>, i64)>>;
    fn location_breakdown(&self) -> Result<Vec<(String, i64)>>;
    fn count_active_in_department(&self, department_id: &str) -> Result<i64>;
    fn department_device_type_breakdown(
        &self,
        department_id: &str,
    ) -> Result<Vec<(String, i64)>>;
    /// Per-day creation counts (all assets) from `since`, ordered by date.
    fn created_trend(&self, since: DateTime<Utc>) -> Result<Vec<(String, i64)>>;
    fn updated_trend(&self, since: DateTime<Utc>) -> Result<Vec<(String, i64)>>;

    // User operations. Creating a user always creates its profile in the
    // same transaction; this is the post-creation hook made explicit.
    fn create_user_with_profile(&self, user: &UserAccount, profile: &UserProfile) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<UserAccount>>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<UserAccount>>;
    fn list_users(&self) -> Result<Vec<UserAccount>>;
    fn update_user(&self, user: &UserAccount) -> Result<()>;
    fn delete_user(&self, id: &str) -> Result<bool>;
    fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;
    fn update_profile(&self, profile: &UserProfile) -> Result<()>;
    fn has_admin_user(&self) -> Result<bool>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn delete_token(&self, id: &str) -> Result<bool>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;

    // Dashboard cache
    fn get_cache_entry(&self, key: &str) -> Result<Option<CacheEntry>>;
    fn upsert_cache_entry(&self, key: &str, data: &str) -> Result<()>;

    // Metrics snapshots
    fn upsert_metrics(&self, metrics: &AssetMetrics) -> Result<()>;
    fn get_metrics(&self, date: NaiveDate) -> Result<Option<AssetMetrics>>;

    // Directory users
    fn create_directory_user(&self, user: &DirectoryUser) -> Result<()>;
    fn get_directory_user_by_username(&self, username: &str) -> Result<Option<DirectoryUser>>;
    fn search_directory_users(&self, query: &str, limit: i64) -> Result<Vec<DirectoryUser>>;
    fn list_directory_users(&self) -> Result<Vec<DirectoryUser>>;

    fn close(&self) -> Result<()>;
}
