//! Bearer access-token extractor for inbound federation requests.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use cantata_core::error::CoreError;
use cantata_db::models::access_token::AccessToken;

use crate::error::AppError;
use crate::middleware::auth::bearer_token;
use crate::state::AppState;

/// Authenticated peer extracted from a federation access token.
///
/// Validation rejects inactive and expired tokens; last-used metadata is
/// recorded as a side effect inside the token service. Failures carry no
/// detail beyond "not permitted".
#[derive(Debug, Clone)]
pub struct PeerAuth {
    /// The validated access-token row, including permission grants.
    pub token: AccessToken,
}

impl PeerAuth {
    /// Require the browse grant.
    pub fn require_browse(&self) -> Result<(), AppError> {
        Self::require(self.token.can_browse)
    }

    /// Require the stream grant.
    pub fn require_stream(&self) -> Result<(), AppError> {
        Self::require(self.token.can_stream)
    }

    /// Require the download/export grant.
    pub fn require_download(&self) -> Result<(), AppError> {
        Self::require(self.token.can_download)
    }

    fn require(granted: bool) -> Result<(), AppError> {
        if granted {
            Ok(())
        } else {
            Err(AppError::Core(CoreError::Forbidden("Not permitted".into())))
        }
    }
}

impl FromRequestParts<AppState> for PeerAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let value = bearer_token(parts).ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("Access token required".into()))
        })?;

        let origin = forwarded_for(parts);
        let token = state
            .tokens
            .validate_access(value, origin.as_deref())
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("Invalid access token".into()))
            })?;

        Ok(PeerAuth { token })
    }
}

/// Best-effort caller address for last-used metadata.
fn forwarded_for(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
