use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use uuid::Uuid;

use super::schema::SCHEMA;
use super::{AssetFilter, Store};
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    /// This allows consuming applications to execute custom SQL.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

const UNIQUE_VIOLATION: i32 = 2067; // SQLITE_CONSTRAINT_UNIQUE
const PK_VIOLATION: i32 = 1555; // SQLITE_CONSTRAINT_PRIMARYKEY
const FK_VIOLATION: i32 = 787; // SQLITE_CONSTRAINT_FOREIGNKEY
const TRIGGER_VIOLATION: i32 = 1811; // SQLITE_CONSTRAINT_TRIGGER

fn extended_code(e: &rusqlite::Error) -> Option<i32> {
    match e {
        rusqlite::Error::SqliteFailure(err, _) => Some(err.extended_code),
        _ => None,
    }
}

/// Maps UNIQUE violations to AlreadyExists.
fn map_insert_err(e: rusqlite::Error) -> Error {
    match extended_code(&e) {
        Some(UNIQUE_VIOLATION) | Some(PK_VIOLATION) => Error::AlreadyExists,
        _ => Error::Database(e),
    }
}

/// Maps FK violations on delete to InUse (RESTRICT references).
fn map_delete_err(e: rusqlite::Error) -> Error {
    match extended_code(&e) {
        Some(FK_VIOLATION) | Some(TRIGGER_VIOLATION) => Error::InUse,
        _ => Error::Database(e),
    }
}

const ASSET_DETAIL_SELECT: &str = "SELECT a.id, a.device_name, a.device_model, a.serial_number, a.staff_name,
        a.department_id, a.status_id, a.location_id, a.device_type_id,
        a.created_at, a.updated_at,
        s.name, t.name, l.name, d.name
     FROM assets a
     JOIN device_statuses s ON s.id = a.status_id
     JOIN device_types t ON t.id = a.device_type_id
     JOIN locations l ON l.id = a.location_id
     LEFT JOIN departments d ON d.id = a.department_id";

const AUDIT_DETAIL_SELECT: &str = "SELECT al.id, al.asset_id, al.user_id, al.action, al.field_name,
        al.old_value, al.new_value, al.timestamp,
        u.username, a.device_name, a.serial_number
     FROM audit_log al
     JOIN assets a ON a.id = al.asset_id
     LEFT JOIN users u ON u.id = al.user_id";

fn asset_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Asset> {
    Ok(Asset {
        id: row.get(0)?,
        device_name: row.get(1)?,
        device_model: row.get(2)?,
        serial_number: row.get(3)?,
        staff_name: row.get(4)?,
        department_id: row.get(5)?,
        status_id: row.get(6)?,
        location_id: row.get(7)?,
        device_type_id: row.get(8)?,
        created_at: parse_datetime(&row.get::<_, String>(9)?),
        updated_at: parse_datetime(&row.get::<_, String>(10)?),
    })
}

fn asset_detail_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AssetDetail> {
    Ok(AssetDetail {
        asset: asset_from_row(row)?,
        status_name: row.get(11)?,
        device_type_name: row.get(12)?,
        location_name: row.get(13)?,
        department_name: row.get(14)?,
    })
}

fn audit_detail_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditEntryDetail> {
    Ok(AuditEntryDetail {
        entry: AuditEntry {
            id: row.get(0)?,
            asset_id: row.get(1)?,
            user_id: row.get(2)?,
            action: row.get(3)?,
            field_name: row.get(4)?,
            old_value: row.get(5)?,
            new_value: row.get(6)?,
            timestamp: parse_datetime(&row.get::<_, String>(7)?),
        },
        username: row.get(8)?,
        device_name: row.get(9)?,
        serial_number: row.get(10)?,
    })
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserAccount> {
    Ok(UserAccount {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        password_hash: row.get(5)?,
        is_active: row.get(6)?,
        created_at: parse_datetime(&row.get::<_, String>(7)?),
        updated_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

fn profile_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserProfile> {
    let role: String = row.get(1)?;
    Ok(UserProfile {
        user_id: row.get(0)?,
        role: Role::parse(&role).unwrap_or_default(),
        phone: row.get(2)?,
        department_id: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        updated_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn directory_user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DirectoryUser> {
    Ok(DirectoryUser {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        display_name: row.get(5)?,
        department_id: row.get(6)?,
        employee_id: row.get(7)?,
        job_title: row.get(8)?,
        phone: row.get(9)?,
        office_location_id: row.get(10)?,
        is_active: row.get(11)?,
        is_from_ad: row.get(12)?,
        ad_guid: row.get(13)?,
        last_synced: row
            .get::<_, Option<String>>(14)?
            .map(|s| parse_datetime(&s)),
        created_at: parse_datetime(&row.get::<_, String>(15)?),
        updated_at: parse_datetime(&row.get::<_, String>(16)?),
    })
}

const DIRECTORY_USER_SELECT: &str = "SELECT id, username, email, first_name, last_name, display_name, department_id,
        employee_id, job_title, phone, office_location_id, is_active, is_from_ad,
        ad_guid, last_synced, created_at, updated_at
     FROM directory_users";

/// Builds the WHERE clause and parameters shared by asset list and count.
fn asset_filter_clause(filter: &AssetFilter, params: &mut Vec<Value>) -> String {
    let mut clauses = Vec::new();

    if filter.decommissioned {
        clauses.push("LOWER(s.name) = 'decommissioned'".to_string());
    } else {
        clauses.push("LOWER(s.name) <> 'decommissioned'".to_string());
    }

    if let Some(serial) = &filter.serial_number {
        params.push(Value::Text(format!("%{serial}%")));
        clauses.push(format!("a.serial_number LIKE ?{}", params.len()));
    }
    if let Some(status_id) = &filter.status_id {
        params.push(Value::Text(status_id.clone()));
        clauses.push(format!("a.status_id = ?{}", params.len()));
    }
    if let Some(type_id) = &filter.device_type_id {
        params.push(Value::Text(type_id.clone()));
        clauses.push(format!("a.device_type_id = ?{}", params.len()));
    }
    if let Some(staff) = &filter.staff_name {
        params.push(Value::Text(format!("%{staff}%")));
        clauses.push(format!("a.staff_name LIKE ?{}", params.len()));
    }

    format!(" WHERE {}", clauses.join(" AND "))
}

impl SqliteStore {
    fn name_count_query(&self, sql: &str) -> Result<Vec<(String, i64)>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    fn seed_reference_data(&self) -> Result<()> {
        let conn = self.conn();

        for name in STATUS_NAMES {
            conn.execute(
                "INSERT OR IGNORE INTO device_statuses (id, name) VALUES (?1, ?2)",
                params![Uuid::new_v4().to_string(), name],
            )?;
        }

        let locations = [
            ("HQ", "Headquarters"),
            ("YAB", "Yaba"),
            ("PH", "Port Harcourt"),
            ("ABJ", "Abuja"),
            ("ENU", "Enugu"),
            ("IBD", "Ibadan"),
            ("YOL", "Yola"),
            ("ILR", "Ilorin"),
        ];
        for (code, name) in locations {
            conn.execute(
                "INSERT OR IGNORE INTO locations (id, code, name) VALUES (?1, ?2, ?3)",
                params![Uuid::new_v4().to_string(), code, name],
            )?;
        }

        Ok(())
    }

    // Department operations

    fn create_department(&self, dept: &Department) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO departments (id, name) VALUES (?1, ?2)",
                params![dept.id, dept.name],
            )
            .map_err(map_insert_err)?;
        Ok(())
    }

    fn get_department(&self, id: &str) -> Result<Option<Department>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name FROM departments WHERE id = ?1",
            params![id],
            |row| {
                Ok(Department {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_department_by_name(&self, name: &str) -> Result<Option<Department>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name FROM departments WHERE name = ?1 COLLATE NOCASE",
            params![name],
            |row| {
                Ok(Department {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_departments(&self) -> Result<Vec<Department>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, name FROM departments ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Department {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_department(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM departments WHERE id = ?1", params![id])
            .map_err(map_delete_err)?;
        Ok(rows > 0)
    }

    // Device type operations

    fn create_device_type(&self, dt: &DeviceType) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO device_types (id, name) VALUES (?1, ?2)",
                params![dt.id, dt.name],
            )
            .map_err(map_insert_err)?;
        Ok(())
    }

    fn get_device_type(&self, id: &str) -> Result<Option<DeviceType>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name FROM device_types WHERE id = ?1",
            params![id],
            |row| {
                Ok(DeviceType {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_device_type_by_name(&self, name: &str) -> Result<Option<DeviceType>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name FROM device_types WHERE name = ?1 COLLATE NOCASE",
            params![name],
            |row| {
                Ok(DeviceType {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_device_types(&self) -> Result<Vec<DeviceType>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, name FROM device_types ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(DeviceType {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_device_type(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM device_types WHERE id = ?1", params![id])
            .map_err(map_delete_err)?;
        Ok(rows > 0)
    }

    // Status operations

    fn get_status(&self, id: &str) -> Result<Option<DeviceStatus>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name FROM device_statuses WHERE id = ?1",
            params![id],
            |row| {
                Ok(DeviceStatus {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_status_by_name(&self, name: &str) -> Result<Option<DeviceStatus>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name FROM device_statuses WHERE name = ?1 COLLATE NOCASE",
            params![name],
            |row| {
                Ok(DeviceStatus {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_statuses(&self) -> Result<Vec<DeviceStatus>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, name FROM device_statuses ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(DeviceStatus {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Location operations

    fn create_location(&self, loc: &Location) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO locations (id, code, name) VALUES (?1, ?2, ?3)",
                params![loc.id, loc.code, loc.name],
            )
            .map_err(map_insert_err)?;
        Ok(())
    }

    fn get_location(&self, id: &str) -> Result<Option<Location>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, code, name FROM locations WHERE id = ?1",
            params![id],
            |row| {
                Ok(Location {
                    id: row.get(0)?,
                    code: row.get(1)?,
                    name: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_location_by_name(&self, name: &str) -> Result<Option<Location>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, code, name FROM locations WHERE name = ?1 COLLATE NOCASE",
            params![name],
            |row| {
                Ok(Location {
                    id: row.get(0)?,
                    code: row.get(1)?,
                    name: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_locations(&self) -> Result<Vec<Location>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, code, name FROM locations ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Location {
                id: row.get(0)?,
                code: row.get(1)?,
                name: row.get(2)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_location(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM locations WHERE id = ?1", params![id])
            .map_err(map_delete_err)?;
        Ok(rows > 0)
    }

    // Asset operations

    fn create_asset(&self, asset: &Asset) -> Result<()> {
        let status = self
            .get_status(&asset.status_id)?
            .ok_or_else(|| Error::Validation("unknown status".into()))?;
        if status.is_decommissioned() {
            return Err(Error::Validation(
                "cannot assign 'decommissioned' status during creation".into(),
            ));
        }

        self.conn()
            .execute(
                "INSERT INTO assets (id, device_name, device_model, serial_number, staff_name,
                     department_id, status_id, location_id, device_type_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    asset.id,
                    asset.device_name,
                    asset.device_model,
                    asset.serial_number,
                    asset.staff_name,
                    asset.department_id,
                    asset.status_id,
                    asset.location_id,
                    asset.device_type_id,
                    format_datetime(&asset.created_at),
                    format_datetime(&asset.updated_at),
                ],
            )
            .map_err(map_insert_err)?;
        Ok(())
    }

    fn get_asset(&self, id: &str) -> Result<Option<Asset>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, device_name, device_model, serial_number, staff_name,
                 department_id, status_id, location_id, device_type_id, created_at, updated_at
             FROM assets WHERE id = ?1",
            params![id],
            asset_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_asset_detail(&self, id: &str) -> Result<Option<AssetDetail>> {
        let conn = self.conn();
        conn.query_row(
            &format!("{ASSET_DETAIL_SELECT} WHERE a.id = ?1"),
            params![id],
            asset_detail_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_asset_by_serial(&self, serial: &str) -> Result<Option<Asset>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, device_name, device_model, serial_number, staff_name,
                 department_id, status_id, location_id, device_type_id, created_at, updated_at
             FROM assets WHERE serial_number = ?1",
            params![serial],
            asset_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_assets(
        &self,
        filter: &AssetFilter,
        page: i64,
        per_page: i64,
    ) -> Result<Vec<AssetDetail>> {
        let mut values: Vec<Value> = Vec::new();
        let clause = asset_filter_clause(filter, &mut values);
        values.push(Value::Integer(per_page));
        let limit_pos = values.len();
        values.push(Value::Integer((page.max(1) - 1) * per_page));
        let offset_pos = values.len();

        let sql = format!(
            "{ASSET_DETAIL_SELECT}{clause} ORDER BY a.created_at DESC, a.id LIMIT ?{limit_pos} OFFSET ?{offset_pos}"
        );

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), asset_detail_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_assets(&self, filter: &AssetFilter) -> Result<i64> {
        let mut values: Vec<Value> = Vec::new();
        let clause = asset_filter_clause(filter, &mut values);
        let sql = format!(
            "SELECT COUNT(*) FROM assets a JOIN device_statuses s ON s.id = a.status_id{clause}"
        );
        let conn = self.conn();
        conn.query_row(&sql, params_from_iter(values), |row| row.get(0))
            .map_err(Error::from)
    }

    fn update_asset(&self, asset: &Asset) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE assets SET device_name = ?1, device_model = ?2, serial_number = ?3,
                     staff_name = ?4, department_id = ?5, status_id = ?6, location_id = ?7,
                     device_type_id = ?8, updated_at = ?9
                 WHERE id = ?10",
                params![
                    asset.device_name,
                    asset.device_model,
                    asset.serial_number,
                    asset.staff_name,
                    asset.department_id,
                    asset.status_id,
                    asset.location_id,
                    asset.device_type_id,
                    format_datetime(&Utc::now()),
                    asset.id,
                ],
            )
            .map_err(map_insert_err)?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_asset(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM assets WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn import_assets(&self, assets: &[Asset], user_id: Option<&str>) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        for asset in assets {
            tx.execute(
                "INSERT INTO assets (id, device_name, device_model, serial_number, staff_name,
                     department_id, status_id, location_id, device_type_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    asset.id,
                    asset.device_name,
                    asset.device_model,
                    asset.serial_number,
                    asset.staff_name,
                    asset.department_id,
                    asset.status_id,
                    asset.location_id,
                    asset.device_type_id,
                    format_datetime(&asset.created_at),
                    format_datetime(&asset.updated_at),
                ],
            )
            .map_err(map_insert_err)?;

            tx.execute(
                "INSERT INTO audit_log (id, asset_id, user_id, action, field_name, old_value, new_value, timestamp)
                 VALUES (?1, ?2, ?3, 'import', 'asset', '', 'Asset imported via CSV', ?4)",
                params![
                    Uuid::new_v4().to_string(),
                    asset.id,
                    user_id,
                    format_datetime(&Utc::now()),
                ],
            )?;
        }

        tx.commit()?;
        Ok(assets.len())
    }

    // Audit operations

    fn create_audit_entry(&self, entry: &AuditEntry) -> Result<()> {
        self.conn().execute(
            "INSERT INTO audit_log (id, asset_id, user_id, action, field_name, old_value, new_value, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.id,
                entry.asset_id,
                entry.user_id,
                entry.action,
                entry.field_name,
                entry.old_value,
                entry.new_value,
                format_datetime(&entry.timestamp),
            ],
        )?;
        Ok(())
    }

    fn list_asset_audit(&self, asset_id: &str) -> Result<Vec<AuditEntryDetail>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "{AUDIT_DETAIL_SELECT} WHERE al.asset_id = ?1 ORDER BY al.timestamp DESC"
        ))?;
        let rows = stmt.query_map(params![asset_id], audit_detail_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_audit(&self, page: i64, per_page: i64) -> Result<Vec<AuditEntryDetail>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "{AUDIT_DETAIL_SELECT} ORDER BY al.timestamp DESC LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt.query_map(
            params![per_page, (page.max(1) - 1) * per_page],
            audit_detail_from_row,
        )?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_audit(&self) -> Result<i64> {
        let conn = self.conn();
        conn.query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))
            .map_err(Error::from)
    }

    fn recent_audit(&self, limit: i64) -> Result<Vec<AuditEntryDetail>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "{AUDIT_DETAIL_SELECT} ORDER BY al.timestamp DESC LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit], audit_detail_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Aggregation queries

    fn count_all_assets(&self) -> Result<i64> {
        let conn = self.conn();
        conn.query_row("SELECT COUNT(*) FROM assets", [], |row| row.get(0))
            .map_err(Error::from)
    }

    fn count_active_assets(&self) -> Result<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*) FROM assets a JOIN device_statuses s ON s.id = a.status_id
             WHERE LOWER(s.name) <> 'decommissioned'",
            [],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn count_active_with_status(&self, status_name: &str) -> Result<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*) FROM assets a JOIN device_statuses s ON s.id = a.status_id
             WHERE s.name = ?1 COLLATE NOCASE AND LOWER(s.name) <> 'decommissioned'",
            params![status_name],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn count_created_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*) FROM assets a JOIN device_statuses s ON s.id = a.status_id
             WHERE LOWER(s.name) <> 'decommissioned' AND a.created_at >= ?1",
            params![format_datetime(&since)],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn count_updated_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*) FROM assets a JOIN device_statuses s ON s.id = a.status_id
             WHERE LOWER(s.name) <> 'decommissioned' AND a.updated_at >= ?1",
            params![format_datetime(&since)],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn status_breakdown(&self) -> Result<Vec<(String, i64)>> {
        self.name_count_query(
            "SELECT s.name, COUNT(*) FROM assets a JOIN device_statuses s ON s.id = a.status_id
             WHERE LOWER(s.name) <> 'decommissioned'
             GROUP BY s.name ORDER BY COUNT(*) DESC",
        )
    }

    fn device_type_breakdown(&self) -> Result<Vec<(String, i64)>> {
        self.name_count_query(
            "SELECT t.name, COUNT(*) FROM assets a
             JOIN device_statuses s ON s.id = a.status_id
             JOIN device_types t ON t.id = a.device_type_id
             WHERE LOWER(s.name) <> 'decommissioned'
             GROUP BY t.name ORDER BY COUNT(*) DESC",
        )
    }

    fn department_breakdown(&self) -> Result<Vec<(Option<String>, i64)>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT d.name, COUNT(*) FROM assets a
             JOIN device_statuses s ON s.id = a.status_id
             LEFT JOIN departments d ON d.id = a.department_id
             WHERE LOWER(s.name) <> 'decommissioned'
             GROUP BY d.name ORDER BY COUNT(*) DESC",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn location_breakdown(&self) -> Result<Vec<(String, i64)>> {
        self.name_count_query(
            "SELECT l.name, COUNT(*) FROM assets a
             JOIN device_statuses s ON s.id = a.status_id
             JOIN locations l ON l.id = a.location_id
             WHERE LOWER(s.name) <> 'decommissioned'
             GROUP BY l.name ORDER BY COUNT(*) DESC",
        )
    }

    fn count_active_in_department(&self, department_id: &str) -> Result<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*) FROM assets a JOIN device_statuses s ON s.id = a.status_id
             WHERE LOWER(s.name) <> 'decommissioned' AND a.department_id = ?1",
            params![department_id],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn department_device_type_breakdown(
        &self,
        department_id: &str,
    ) -> Result<Vec<(String, i64)>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT t.name, COUNT(*) FROM assets a
             JOIN device_statuses s ON s.id = a.status_id
             JOIN device_types t ON t.id = a.device_type_id
             WHERE LOWER(s.name) <> 'decommissioned' AND a.department_id = ?1
             GROUP BY t.name ORDER BY COUNT(*) DESC",
        )?;
        let rows = stmt.query_map(params![department_id], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn created_trend(&self, since: DateTime<Utc>) -> Result<Vec<(String, i64)>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT date(created_at), COUNT(*) FROM assets WHERE created_at >= ?1
             GROUP BY date(created_at) ORDER BY date(created_at)",
        )?;
        let rows = stmt.query_map(params![format_datetime(&since)], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn updated_trend(&self, since: DateTime<Utc>) -> Result<Vec<(String, i64)>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT date(updated_at), COUNT(*) FROM assets WHERE updated_at >= ?1
             GROUP BY date(updated_at) ORDER BY date(updated_at)",
        )?;
        let rows = stmt.query_map(params![format_datetime(&since)], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // User operations

    fn create_user_with_profile(&self, user: &UserAccount, profile: &UserProfile) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO users (id, username, email, first_name, last_name, password_hash,
                 is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                user.id,
                user.username,
                user.email,
                user.first_name,
                user.last_name,
                user.password_hash,
                user.is_active,
                format_datetime(&user.created_at),
                format_datetime(&user.updated_at),
            ],
        )
        .map_err(map_insert_err)?;

        tx.execute(
            "INSERT INTO user_profiles (user_id, role, phone, department_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                profile.user_id,
                profile.role.as_str(),
                profile.phone,
                profile.department_id,
                format_datetime(&profile.created_at),
                format_datetime(&profile.updated_at),
            ],
        )
        .map_err(map_insert_err)?;

        tx.commit()?;
        Ok(())
    }

    fn get_user(&self, id: &str) -> Result<Option<UserAccount>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, username, email, first_name, last_name, password_hash, is_active,
                 created_at, updated_at
             FROM users WHERE id = ?1",
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<UserAccount>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, username, email, first_name, last_name, password_hash, is_active,
                 created_at, updated_at
             FROM users WHERE username = ?1",
            params![username],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self) -> Result<Vec<UserAccount>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, username, email, first_name, last_name, password_hash, is_active,
                 created_at, updated_at
             FROM users ORDER BY username",
        )?;
        let rows = stmt.query_map([], user_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_user(&self, user: &UserAccount) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET email = ?1, first_name = ?2, last_name = ?3, password_hash = ?4,
                 is_active = ?5, updated_at = ?6
             WHERE id = ?7",
            params![
                user.email,
                user.first_name,
                user.last_name,
                user.password_hash,
                user.is_active,
                format_datetime(&Utc::now()),
                user.id,
            ],
        )?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_user(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT user_id, role, phone, department_id, created_at, updated_at
             FROM user_profiles WHERE user_id = ?1",
            params![user_id],
            profile_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_profile(&self, profile: &UserProfile) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE user_profiles SET role = ?1, phone = ?2, department_id = ?3, updated_at = ?4
             WHERE user_id = ?5",
            params![
                profile.role.as_str(),
                profile.phone,
                profile.department_id,
                format_datetime(&Utc::now()),
                profile.user_id,
            ],
        )?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn has_admin_user(&self) -> Result<bool> {
        let conn = self.conn();
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM user_profiles WHERE role = 'admin')",
            [],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO tokens (id, token_hash, token_lookup, user_id, created_at, expires_at, last_used_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    token.id,
                    token.token_hash,
                    token.token_lookup,
                    token.user_id,
                    format_datetime(&token.created_at),
                    token.expires_at.as_ref().map(format_datetime),
                    token.last_used_at.as_ref().map(format_datetime),
                ],
            )
            .map_err(map_insert_err)?;
        Ok(())
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token_hash, token_lookup, user_id, created_at, expires_at, last_used_at
             FROM tokens WHERE token_lookup = ?1",
            params![lookup],
            |row| {
                Ok(Token {
                    id: row.get(0)?,
                    token_hash: row.get(1)?,
                    token_lookup: row.get(2)?,
                    user_id: row.get(3)?,
                    created_at: parse_datetime(&row.get::<_, String>(4)?),
                    expires_at: row.get::<_, Option<String>>(5)?.map(|s| parse_datetime(&s)),
                    last_used_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn delete_token(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tokens WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    // Dashboard cache

    fn get_cache_entry(&self, key: &str) -> Result<Option<CacheEntry>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT cache_key, data, updated_at FROM dashboard_cache WHERE cache_key = ?1",
            params![key],
            |row| {
                Ok(CacheEntry {
                    cache_key: row.get(0)?,
                    data: row.get(1)?,
                    updated_at: parse_datetime(&row.get::<_, String>(2)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn upsert_cache_entry(&self, key: &str, data: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO dashboard_cache (cache_key, data, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(cache_key) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
            params![key, data, format_datetime(&Utc::now())],
        )?;
        Ok(())
    }

    // Metrics snapshots

    fn upsert_metrics(&self, metrics: &AssetMetrics) -> Result<()> {
        self.conn().execute(
            "INSERT INTO asset_metrics (date, total_assets, active_assets, in_use_assets,
                 spare_assets, decommissioned_assets, department_breakdown,
                 device_type_breakdown, location_breakdown, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(date) DO UPDATE SET
                 total_assets = excluded.total_assets,
                 active_assets = excluded.active_assets,
                 in_use_assets = excluded.in_use_assets,
                 spare_assets = excluded.spare_assets,
                 decommissioned_assets = excluded.decommissioned_assets,
                 department_breakdown = excluded.department_breakdown,
                 device_type_breakdown = excluded.device_type_breakdown,
                 location_breakdown = excluded.location_breakdown",
            params![
                metrics.date.format("%Y-%m-%d").to_string(),
                metrics.total_assets,
                metrics.active_assets,
                metrics.in_use_assets,
                metrics.spare_assets,
                metrics.decommissioned_assets,
                metrics.department_breakdown.to_string(),
                metrics.device_type_breakdown.to_string(),
                metrics.location_breakdown.to_string(),
                format_datetime(&metrics.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_metrics(&self, date: NaiveDate) -> Result<Option<AssetMetrics>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT date, total_assets, active_assets, in_use_assets, spare_assets,
                 decommissioned_assets, department_breakdown, device_type_breakdown,
                 location_breakdown, created_at
             FROM asset_metrics WHERE date = ?1",
            params![date.format("%Y-%m-%d").to_string()],
            |row| {
                let date_str: String = row.get(0)?;
                let dept: String = row.get(6)?;
                let dev: String = row.get(7)?;
                let loc: String = row.get(8)?;
                Ok(AssetMetrics {
                    date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
                        .unwrap_or_else(|_| Utc::now().date_naive()),
                    total_assets: row.get(1)?,
                    active_assets: row.get(2)?,
                    in_use_assets: row.get(3)?,
                    spare_assets: row.get(4)?,
                    decommissioned_assets: row.get(5)?,
                    department_breakdown: serde_json::from_str(&dept)
                        .unwrap_or(serde_json::Value::Null),
                    device_type_breakdown: serde_json::from_str(&dev)
                        .unwrap_or(serde_json::Value::Null),
                    location_breakdown: serde_json::from_str(&loc)
                        .unwrap_or(serde_json::Value::Null),
                    created_at: parse_datetime(&row.get::<_, String>(9)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    // Directory users

    fn create_directory_user(&self, user: &DirectoryUser) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO directory_users (id, username, email, first_name, last_name,
                     display_name, department_id, employee_id, job_title, phone,
                     office_location_id, is_active, is_from_ad, ad_guid, last_synced,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                params![
                    user.id,
                    user.username,
                    user.email,
                    user.first_name,
                    user.last_name,
                    user.display_name,
                    user.department_id,
                    user.employee_id,
                    user.job_title,
                    user.phone,
                    user.office_location_id,
                    user.is_active,
                    user.is_from_ad,
                    user.ad_guid,
                    user.last_synced.as_ref().map(format_datetime),
                    format_datetime(&user.created_at),
                    format_datetime(&user.updated_at),
                ],
            )
            .map_err(map_insert_err)?;
        Ok(())
    }

    fn get_directory_user_by_username(&self, username: &str) -> Result<Option<DirectoryUser>> {
        let conn = self.conn();
        conn.query_row(
            &format!("{DIRECTORY_USER_SELECT} WHERE username = ?1"),
            params![username],
            directory_user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn search_directory_users(&self, query: &str, limit: i64) -> Result<Vec<DirectoryUser>> {
        let pattern = format!("%{query}%");
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "{DIRECTORY_USER_SELECT}
             WHERE is_active = 1 AND (username LIKE ?1 OR email LIKE ?1 OR first_name LIKE ?1
                 OR last_name LIKE ?1 OR display_name LIKE ?1)
             ORDER BY display_name, username LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![pattern, limit], directory_user_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_directory_users(&self) -> Result<Vec<DirectoryUser>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "{DIRECTORY_USER_SELECT} ORDER BY display_name, username"
        ))?;
        let rows = stmt.query_map([], directory_user_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
