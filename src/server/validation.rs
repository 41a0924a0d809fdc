use crate::server::dto::AssetRequest;
use crate::server::response::ApiError;

const MAX_NAME_LEN: usize = 200;
const MAX_SERIAL_LEN: usize = 100;
const MAX_USERNAME_LEN: usize = 150;
pub const MIN_PASSWORD_LEN: usize = 8;

fn require_nonempty(value: &str, field: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("{field} cannot be empty")));
    }
    Ok(())
}

pub fn validate_asset_request(req: &AssetRequest) -> Result<(), ApiError> {
    require_nonempty(&req.device_name, "Device name")?;
    require_nonempty(&req.device_model, "Device model")?;
    require_nonempty(&req.serial_number, "Serial number")?;

    if req.device_name.len() > MAX_NAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Device name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    if req.serial_number.len() > MAX_SERIAL_LEN {
        return Err(ApiError::bad_request(format!(
            "Serial number cannot exceed {MAX_SERIAL_LEN} characters"
        )));
    }

    Ok(())
}

pub fn validate_username(name: &str) -> Result<(), ApiError> {
    if name.is_empty() {
        return Err(ApiError::bad_request("Username cannot be empty"));
    }
    if name.len() > MAX_USERNAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Username cannot exceed {MAX_USERNAME_LEN} characters"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' || c == '@')
    {
        return Err(ApiError::bad_request(
            "Username can only contain alphanumeric characters, hyphens, underscores, periods, and @",
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset_request() -> AssetRequest {
        AssetRequest {
            device_name: "Laptop".into(),
            device_model: "Dell 5420".into(),
            serial_number: "SN-1".into(),
            staff_name: None,
            department_id: None,
            status_id: "s".into(),
            location_id: "l".into(),
            device_type_id: "t".into(),
        }
    }

    #[test]
    fn test_valid_asset_request() {
        assert!(validate_asset_request(&asset_request()).is_ok());
    }

    #[test]
    fn test_blank_fields_rejected() {
        let mut req = asset_request();
        req.device_name = "   ".into();
        assert!(validate_asset_request(&req).is_err());

        let mut req = asset_request();
        req.serial_number = String::new();
        assert!(validate_asset_request(&req).is_err());
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("jane.doe").is_ok());
        assert!(validate_username("jane@example.com").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("jane doe").is_err());
    }

    #[test]
    fn test_password_length() {
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password("1234567").is_err());
    }
}
