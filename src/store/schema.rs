pub const SCHEMA: &str = r#"
-- Reference lookup tables
CREATE TABLE IF NOT EXISTS departments (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS device_types (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

-- Names come from a fixed enumeration (spare, in-use, retrieved,
-- decommissioned), seeded at init
CREATE TABLE IF NOT EXISTS device_statuses (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS locations (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL UNIQUE
);

-- Central asset record. Status/location/type cannot be deleted while
-- referenced; department references null out instead.
CREATE TABLE IF NOT EXISTS assets (
    id TEXT PRIMARY KEY,
    device_name TEXT NOT NULL,
    device_model TEXT NOT NULL,
    serial_number TEXT NOT NULL UNIQUE,
    staff_name TEXT,
    department_id TEXT REFERENCES departments(id) ON DELETE SET NULL,
    status_id TEXT NOT NULL REFERENCES device_statuses(id) ON DELETE RESTRICT,
    location_id TEXT NOT NULL REFERENCES locations(id) ON DELETE RESTRICT,
    device_type_id TEXT NOT NULL REFERENCES device_types(id) ON DELETE RESTRICT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Append-only change ledger, owned by the asset
CREATE TABLE IF NOT EXISTS audit_log (
    id TEXT PRIMARY KEY,
    asset_id TEXT NOT NULL REFERENCES assets(id) ON DELETE CASCADE,
    user_id TEXT REFERENCES users(id) ON DELETE SET NULL,
    action TEXT NOT NULL,
    field_name TEXT,
    old_value TEXT,
    new_value TEXT,
    timestamp TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL DEFAULT '',
    first_name TEXT NOT NULL DEFAULT '',
    last_name TEXT NOT NULL DEFAULT '',
    password_hash TEXT NOT NULL,       -- argon2id hash with embedded salt
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- One-to-one extension of a user carrying its role
CREATE TABLE IF NOT EXISTS user_profiles (
    user_id TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    role TEXT NOT NULL DEFAULT 'viewer',
    phone TEXT,
    department_id TEXT REFERENCES departments(id) ON DELETE SET NULL,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Tokens are auth credentials and always belong to a user
CREATE TABLE IF NOT EXISTS tokens (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,          -- argon2id hash with embedded salt
    token_lookup TEXT NOT NULL,        -- first 8 chars of ID for fast lookup
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT,                   -- NULL = never
    last_used_at TEXT
);

-- Memoized dashboard computations, stale after a TTL
CREATE TABLE IF NOT EXISTS dashboard_cache (
    cache_key TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- One snapshot row per calendar date
CREATE TABLE IF NOT EXISTS asset_metrics (
    date TEXT PRIMARY KEY,
    total_assets INTEGER NOT NULL DEFAULT 0,
    active_assets INTEGER NOT NULL DEFAULT 0,
    in_use_assets INTEGER NOT NULL DEFAULT 0,
    spare_assets INTEGER NOT NULL DEFAULT 0,
    decommissioned_assets INTEGER NOT NULL DEFAULT 0,
    department_breakdown TEXT NOT NULL DEFAULT '{}',
    device_type_breakdown TEXT NOT NULL DEFAULT '{}',
    location_breakdown TEXT NOT NULL DEFAULT '{}',
    created_at TEXT DEFAULT (datetime('now'))
);

-- Local mirror of external-directory users; nothing syncs it yet
CREATE TABLE IF NOT EXISTS directory_users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    email TEXT,
    first_name TEXT NOT NULL DEFAULT '',
    last_name TEXT NOT NULL DEFAULT '',
    display_name TEXT NOT NULL DEFAULT '',
    department_id TEXT REFERENCES departments(id) ON DELETE SET NULL,
    employee_id TEXT,
    job_title TEXT,
    phone TEXT,
    office_location_id TEXT REFERENCES locations(id) ON DELETE SET NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    is_from_ad INTEGER NOT NULL DEFAULT 0,
    ad_guid TEXT UNIQUE,
    last_synced TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Create indexes
CREATE INDEX IF NOT EXISTS idx_assets_status ON assets(status_id);
CREATE INDEX IF NOT EXISTS idx_assets_device_type ON assets(device_type_id);
CREATE INDEX IF NOT EXISTS idx_assets_department ON assets(department_id);
CREATE INDEX IF NOT EXISTS idx_assets_location ON assets(location_id);
CREATE INDEX IF NOT EXISTS idx_audit_log_asset ON audit_log(asset_id);
CREATE INDEX IF NOT EXISTS idx_audit_log_timestamp ON audit_log(timestamp);
CREATE UNIQUE INDEX IF NOT EXISTS idx_tokens_lookup ON tokens(token_lookup);
CREATE INDEX IF NOT EXISTS idx_tokens_user ON tokens(user_id);
CREATE INDEX IF NOT EXISTS idx_directory_users_department ON directory_users(department_id);
"#;
