use std::marker::PhantomData;
use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::helpers::{TokenValidationError, extract_token_from_header, validate_token};
use crate::server::AppState;
use crate::types::{Role, Token, UserAccount};

/// Extractor that requires any authenticated, active user.
pub struct RequireUser {
    pub token: Token,
    pub user: UserAccount,
    pub role: Role,
}

/// A role-gated action. The marker types below pair each guarded route
/// with the single place its role rule is defined.
pub trait Capability: Send + Sync + 'static {
    fn allowed(role: Role) -> bool;
    fn denied_message() -> &'static str;
}

/// Extractor that requires an authenticated user whose role grants `C`.
pub struct Require<C: Capability> {
    pub token: Token,
    pub user: UserAccount,
    pub role: Role,
    _capability: PhantomData<C>,
}

macro_rules! capability {
    ($name:ident, $check:expr, $message:expr) => {
        pub struct $name;

        impl Capability for $name {
            fn allowed(role: Role) -> bool {
                let check: fn(Role) -> bool = $check;
                check(role)
            }

            fn denied_message() -> &'static str {
                $message
            }
        }
    };
}

capability!(
    CreateAssets,
    |r| r.can_create(),
    "You don't have permission to create assets"
);
capability!(
    EditAssets,
    |r| r.can_edit(),
    "You don't have permission to edit assets"
);
capability!(
    DeleteAssets,
    |r| r.can_delete(),
    "You don't have permission to delete assets"
);
capability!(
    ImportAssets,
    |r| r.can_import(),
    "You don't have permission to import assets"
);
capability!(
    ViewAudit,
    |r| r.can_view_audit(),
    "You don't have permission to view the audit log"
);
capability!(AdminOnly, |r| r.is_admin(), "Admin access required");

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    InactiveUser,
    Denied(&'static str),
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidScheme => (StatusCode::UNAUTHORIZED, "Invalid authorization scheme"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
            AuthError::InactiveUser => (StatusCode::UNAUTHORIZED, "Account is disabled"),
            AuthError::Denied(message) => (StatusCode::FORBIDDEN, message),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "data": null, "error": message });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                "WWW-Authenticate",
                "Bearer realm=\"stocktake\"".parse().unwrap(),
            );
        }

        response
    }
}

impl FromRequestParts<Arc<AppState>> for RequireUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let validated = extract_and_validate_token(parts, state).await?;
        Ok(RequireUser {
            token: validated.token,
            user: validated.user,
            role: validated.role,
        })
    }
}

impl<C: Capability> FromRequestParts<Arc<AppState>> for Require<C> {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let validated = extract_and_validate_token(parts, state).await?;

        if !C::allowed(validated.role) {
            return Err(AuthError::Denied(C::denied_message()));
        }

        Ok(Require {
            token: validated.token,
            user: validated.user,
            role: validated.role,
            _capability: PhantomData,
        })
    }
}

async fn extract_and_validate_token(
    parts: &mut Parts,
    state: &Arc<AppState>,
) -> Result<super::helpers::ValidatedToken, AuthError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let raw_token = extract_token_from_header(auth_header)
        .map_err(|e| match e {
            TokenValidationError::InvalidScheme => AuthError::InvalidScheme,
            TokenValidationError::InvalidToken => AuthError::InvalidToken,
            _ => AuthError::InternalError,
        })?
        .ok_or(AuthError::MissingAuth)?;

    validate_token(state, &raw_token).map_err(|e| match e {
        TokenValidationError::InvalidScheme => AuthError::InvalidScheme,
        TokenValidationError::InvalidToken => AuthError::InvalidToken,
        TokenValidationError::TokenExpired => AuthError::TokenExpired,
        TokenValidationError::InactiveUser => AuthError::InactiveUser,
        TokenValidationError::InternalError => AuthError::InternalError,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_role_gates() {
        assert!(!CreateAssets::allowed(Role::Viewer));
        assert!(CreateAssets::allowed(Role::Manager));
        assert!(CreateAssets::allowed(Role::Admin));

        assert!(!DeleteAssets::allowed(Role::Manager));
        assert!(DeleteAssets::allowed(Role::Admin));

        assert!(!ImportAssets::allowed(Role::Manager));
        assert!(ImportAssets::allowed(Role::Admin));

        assert!(!ViewAudit::allowed(Role::Viewer));
        assert!(ViewAudit::allowed(Role::Manager));

        assert!(!AdminOnly::allowed(Role::Manager));
        assert!(AdminOnly::allowed(Role::Admin));
    }
}
