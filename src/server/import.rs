use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::{ImportAssets, Require};
use crate::csv;
use crate::server::AppState;
use crate::server::dto::{ImportConfirmResponse, ImportRowError, ImportValidationResponse};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::staging::StagedRow;
use crate::store::Store;
use crate::types::Asset;

const REQUIRED_HEADERS: [&str; 7] = [
    "Device Name",
    "Device Model",
    "Serial Number",
    "Device Type",
    "Status",
    "Location",
    "Staff Name",
];
const DEPARTMENT_HEADER: &str = "Department";

const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Maps each known header to its column index. Unknown columns are
/// ignored so exports with extra columns can be re-imported.
fn header_positions(headers: &[String]) -> Result<HashMap<&'static str, usize>, ApiError> {
    let mut positions = HashMap::new();
    for (i, header) in headers.iter().enumerate() {
        for known in REQUIRED_HEADERS.iter().chain([DEPARTMENT_HEADER].iter()) {
            if header.trim() == *known {
                positions.insert(*known, i);
            }
        }
    }

    let missing: Vec<&str> = REQUIRED_HEADERS
        .iter()
        .filter(|h| !positions.contains_key(**h))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(ApiError::bad_request(format!(
            "Missing required columns: {}",
            missing.join(", ")
        )));
    }

    Ok(positions)
}

fn cell(record: &[String], positions: &HashMap<&'static str, usize>, header: &str) -> String {
    positions
        .get(header)
        .and_then(|&i| record.get(i))
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Validates parsed CSV records against reference data and existing
/// serials. Rows are numbered from 2 to match the uploaded file.
pub fn validate_rows(
    store: &dyn Store,
    records: &[Vec<String>],
) -> Result<(Vec<StagedRow>, Vec<ImportRowError>), ApiError> {
    let Some((headers, data)) = records.split_first() else {
        return Err(ApiError::bad_request("CSV file is empty"));
    };
    if data.is_empty() {
        return Err(ApiError::bad_request("CSV file has no data rows"));
    }

    let positions = header_positions(headers)?;

    let mut staged = Vec::new();
    let mut errors = Vec::new();
    let mut seen_serials: HashSet<String> = HashSet::new();

    for (i, record) in data.iter().enumerate() {
        let row_number = i + 2;
        let mut row_errors: Vec<String> = Vec::new();

        let device_name = cell(record, &positions, "Device Name");
        let device_model = cell(record, &positions, "Device Model");
        let serial_number = cell(record, &positions, "Serial Number");
        let device_type = cell(record, &positions, "Device Type");
        let status = cell(record, &positions, "Status");
        let location = cell(record, &positions, "Location");
        let staff_name = cell(record, &positions, "Staff Name");
        let department = cell(record, &positions, DEPARTMENT_HEADER);

        for (value, label) in [
            (&device_name, "Device Name"),
            (&device_model, "Device Model"),
            (&serial_number, "Serial Number"),
            (&device_type, "Device Type"),
            (&status, "Status"),
            (&location, "Location"),
        ] {
            if value.is_empty() {
                row_errors.push(format!("{label} is required"));
            }
        }

        let mut resolved_type = None;
        if !device_type.is_empty() {
            match store
                .get_device_type_by_name(&device_type)
                .api_err("Failed to look up device type")?
            {
                Some(dt) => resolved_type = Some(dt.name),
                None => row_errors.push(format!("Unknown device type '{device_type}'")),
            }
        }

        let mut resolved_status = None;
        if !status.is_empty() {
            match store
                .get_status_by_name(&status)
                .api_err("Failed to look up status")?
            {
                Some(s) => {
                    if s.is_decommissioned() {
                        row_errors
                            .push("Cannot import assets with 'decommissioned' status".to_string());
                    } else {
                        resolved_status = Some(s.name);
                    }
                }
                None => row_errors.push(format!("Unknown status '{status}'")),
            }
        }

        let mut resolved_location = None;
        if !location.is_empty() {
            match store
                .get_location_by_name(&location)
                .api_err("Failed to look up location")?
            {
                Some(l) => resolved_location = Some(l.name),
                None => row_errors.push(format!("Unknown location '{location}'")),
            }
        }

        let mut resolved_department = None;
        if !department.is_empty() {
            match store
                .get_department_by_name(&department)
                .api_err("Failed to look up department")?
            {
                Some(d) => resolved_department = Some(d.name),
                None => row_errors.push(format!("Unknown department '{department}'")),
            }
        }

        if !serial_number.is_empty() {
            if !seen_serials.insert(serial_number.to_lowercase()) {
                row_errors.push(format!(
                    "Duplicate serial number '{serial_number}' in file"
                ));
            } else if store
                .get_asset_by_serial(&serial_number)
                .api_err("Failed to check serial number")?
                .is_some()
            {
                row_errors.push(format!(
                    "An asset with serial number '{serial_number}' already exists"
                ));
            }
        }

        if row_errors.is_empty() {
            staged.push(StagedRow {
                row_number,
                device_name,
                device_model,
                serial_number,
                device_type: resolved_type.unwrap_or_default(),
                status: resolved_status.unwrap_or_default(),
                location: resolved_location.unwrap_or_default(),
                department: resolved_department,
                staff_name: if staff_name.is_empty() {
                    None
                } else {
                    Some(staff_name)
                },
            });
        } else {
            for message in row_errors {
                errors.push(ImportRowError {
                    row: row_number,
                    message,
                });
            }
        }
    }

    Ok((staged, errors))
}

pub async fn validate_import(
    _auth: Require<ImportAssets>,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut content: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?;
            if bytes.len() > MAX_UPLOAD_BYTES {
                return Err(ApiError::bad_request("Uploaded file is too large"));
            }
            content = Some(
                String::from_utf8(bytes.to_vec())
                    .map_err(|_| ApiError::bad_request("File is not valid UTF-8"))?,
            );
        }
    }

    let content = content.ok_or_else(|| ApiError::bad_request("Missing 'file' field"))?;
    let records = csv::parse(&content).map_err(ApiError::from)?;

    let (staged, errors) = validate_rows(state.store.as_ref(), &records)?;

    let total_rows = records.len().saturating_sub(1);
    let valid_rows = staged.len();

    // Valid rows are staged even when the file also has bad ones; the
    // caller decides whether to confirm the partial batch.
    let import_id = if staged.is_empty() {
        None
    } else {
        Some(state.staging.stage(staged))
    };

    Ok::<_, ApiError>(Json(ApiResponse::success(ImportValidationResponse {
        import_id,
        total_rows,
        valid_rows,
        errors,
    })))
}

pub async fn confirm_import(
    auth: Require<ImportAssets>,
    State(state): State<Arc<AppState>>,
    Path(import_id): Path<String>,
) -> impl IntoResponse {
    let rows = state
        .staging
        .take(&import_id)
        .ok_or_else(|| ApiError::not_found("Import session not found or expired"))?;

    let store = state.store.as_ref();
    let now = Utc::now();
    let mut assets = Vec::with_capacity(rows.len());

    // References were validated by name; re-resolve to ids here in
    // case reference data changed between the two phases.
    for row in &rows {
        let status = store
            .get_status_by_name(&row.status)
            .api_err("Failed to look up status")?
            .ok_or_else(|| {
                ApiError::conflict(format!("Status '{}' no longer exists", row.status))
            })?;
        let device_type = store
            .get_device_type_by_name(&row.device_type)
            .api_err("Failed to look up device type")?
            .ok_or_else(|| {
                ApiError::conflict(format!("Device type '{}' no longer exists", row.device_type))
            })?;
        let location = store
            .get_location_by_name(&row.location)
            .api_err("Failed to look up location")?
            .ok_or_else(|| {
                ApiError::conflict(format!("Location '{}' no longer exists", row.location))
            })?;
        let department_id = match &row.department {
            Some(name) => Some(
                store
                    .get_department_by_name(name)
                    .api_err("Failed to look up department")?
                    .ok_or_else(|| {
                        ApiError::conflict(format!("Department '{name}' no longer exists"))
                    })?
                    .id,
            ),
            None => None,
        };

        assets.push(Asset {
            id: Uuid::new_v4().to_string(),
            device_name: row.device_name.clone(),
            device_model: row.device_model.clone(),
            serial_number: row.serial_number.clone(),
            staff_name: row.staff_name.clone(),
            department_id,
            status_id: status.id,
            location_id: location.id,
            device_type_id: device_type.id,
            created_at: now,
            updated_at: now,
        });
    }

    let created = store
        .import_assets(&assets, Some(&auth.user.id))
        .map_err(|e| match e {
            crate::error::Error::AlreadyExists => ApiError::conflict(
                "A serial number in this batch was taken since validation; nothing was imported",
            ),
            other => ApiError::from(other),
        })?;

    tracing::info!("{created} assets imported by '{}'", auth.user.username);

    Ok::<_, ApiError>(Json(ApiResponse::success(ImportConfirmResponse { created })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use crate::types::DeviceType;

    fn test_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.initialize().unwrap();
        store.seed_reference_data().unwrap();
        store
            .create_device_type(&DeviceType {
                id: Uuid::new_v4().to_string(),
                name: "Laptop".into(),
            })
            .unwrap();
        store
    }

    fn records(rows: &str) -> Vec<Vec<String>> {
        let header =
            "Device Name,Device Model,Serial Number,Device Type,Status,Location,Staff Name,Department\n";
        csv::parse(&format!("{header}{rows}")).unwrap()
    }

    #[test]
    fn test_valid_file_stages_all_rows() {
        let store = test_store();
        let recs = records("MacBook,M2,SN1,Laptop,spare,Headquarters,,\nThinkPad,T14,SN2,Laptop,in-use,Yaba,Jane Doe,\n");

        let (staged, errors) = validate_rows(&store, &recs).unwrap();
        assert!(errors.is_empty());
        assert_eq!(staged.len(), 2);
        assert_eq!(staged[0].row_number, 2);
        assert_eq!(staged[1].staff_name.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_missing_header_rejected() {
        let store = test_store();
        let recs = csv::parse("Device Name,Device Model\nMacBook,M2\n").unwrap();
        assert!(validate_rows(&store, &recs).is_err());
    }

    #[test]
    fn test_empty_file_rejected() {
        let store = test_store();
        assert!(validate_rows(&store, &[]).is_err());

        let header_only = records("");
        assert!(validate_rows(&store, &header_only).is_err());
    }

    #[test]
    fn test_unknown_references_reported_per_row() {
        let store = test_store();
        let recs = records("MacBook,M2,SN1,Toaster,spare,Headquarters,,\nThinkPad,T14,SN2,Laptop,lost,Atlantis,,\n");

        let (staged, errors) = validate_rows(&store, &recs).unwrap();
        assert!(staged.is_empty());
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.row == 2 && e.message.contains("Toaster")));
        assert!(errors.iter().any(|e| e.row == 3 && e.message.contains("lost")));
        assert!(errors.iter().any(|e| e.row == 3 && e.message.contains("Atlantis")));
    }

    #[test]
    fn test_decommissioned_status_rejected() {
        let store = test_store();
        let recs = records("MacBook,M2,SN1,Laptop,decommissioned,Headquarters,,\n");

        let (staged, errors) = validate_rows(&store, &recs).unwrap();
        assert!(staged.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("decommissioned"));
    }

    #[test]
    fn test_duplicate_serial_within_file() {
        let store = test_store();
        let recs = records("MacBook,M2,SN1,Laptop,spare,Headquarters,,\nThinkPad,T14,sn1,Laptop,spare,Yaba,,\n");

        let (staged, errors) = validate_rows(&store, &recs).unwrap();
        assert_eq!(staged.len(), 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].row, 3);
        assert!(errors[0].message.contains("Duplicate"));
    }

    #[test]
    fn test_existing_serial_rejected() {
        let store = test_store();
        let dt = store.get_device_type_by_name("Laptop").unwrap().unwrap();
        let status = store.get_status_by_name("spare").unwrap().unwrap();
        let location = store.get_location_by_name("Headquarters").unwrap().unwrap();
        let now = Utc::now();
        store
            .create_asset(&Asset {
                id: Uuid::new_v4().to_string(),
                device_name: "Existing".into(),
                device_model: "X".into(),
                serial_number: "SN1".into(),
                staff_name: None,
                department_id: None,
                status_id: status.id,
                location_id: location.id,
                device_type_id: dt.id,
                created_at: now,
                updated_at: now,
            })
            .unwrap();

        let recs = records("MacBook,M2,SN1,Laptop,spare,Headquarters,,\n");
        let (staged, errors) = validate_rows(&store, &recs).unwrap();
        assert!(staged.is_empty());
        assert!(errors[0].message.contains("already exists"));
    }

    #[test]
    fn test_reference_names_match_case_insensitively() {
        let store = test_store();
        let recs = records("MacBook,M2,SN1,laptop,SPARE,headquarters,,\n");

        let (staged, errors) = validate_rows(&store, &recs).unwrap();
        assert!(errors.is_empty());
        // Canonical names come back from the store, not the file.
        assert_eq!(staged[0].device_type, "Laptop");
        assert_eq!(staged[0].status, "spare");
        assert_eq!(staged[0].location, "Headquarters");
    }

    #[test]
    fn test_blank_required_fields_reported() {
        let store = test_store();
        let recs = records(",M2,SN1,Laptop,spare,Headquarters,,\n");

        let (staged, errors) = validate_rows(&store, &recs).unwrap();
        assert!(staged.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("Device Name"));
    }
}
