//! API handlers and the state they share.

pub mod auth;
pub mod courier;
pub mod department;
pub mod incoming;
pub mod notification;
pub mod outgoing;
pub mod tracking;

use jsonwebtoken::{encode, EncodingKey, Header};

use crate::config::AuthConfig;
use crate::datetime::normalize_date;
use crate::db::{ActiveStatus, DbPool, NewRefreshToken, RefreshTokenRepository, Role, User};
use crate::letter::{IncomingStatus, OutgoingStatus, Priority, Viewer};
use crate::media::ImageStorage;
use crate::web::dto::{LoginResponse, UploadedImage, UserInfo};
use crate::web::error::ApiError;
use crate::web::middleware::JwtClaims;
use crate::Database;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub images: ImageStorage,
    encoding_key: EncodingKey,
    jwt_issuer: String,
    /// Access token lifetime in seconds.
    pub access_token_expiry: u64,
    /// Refresh token lifetime in days.
    pub refresh_token_expiry: u64,
}

impl AppState {
    pub fn new(db: Database, images: ImageStorage, auth: &AuthConfig) -> Self {
        Self {
            db,
            images,
            encoding_key: EncodingKey::from_secret(auth.jwt_secret.as_bytes()),
            jwt_issuer: auth.jwt_issuer.clone(),
            access_token_expiry: auth.access_token_expiry_secs,
            refresh_token_expiry: auth.refresh_token_expiry_days,
        }
    }

    pub fn pool(&self) -> &DbPool {
        self.db.pool()
    }

    /// Sign an access token for a user.
    pub fn generate_access_token(&self, user: &User) -> Result<String, ApiError> {
        let now = chrono::Utc::now().timestamp() as u64;
        let claims = JwtClaims {
            sub: user.id,
            username: user.username.clone(),
            role: user.role.as_str().to_string(),
            iat: now,
            exp: now + self.access_token_expiry,
            iss: self.jwt_issuer.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode JWT: {}", e);
            ApiError::internal("Failed to generate token")
        })
    }

    pub fn generate_refresh_token(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Issue an access token and a stored refresh token.
    pub async fn issue_tokens(&self, user: &User) -> Result<LoginResponse, ApiError> {
        let access_token = self.generate_access_token(user)?;
        let refresh_token = self.generate_refresh_token();

        RefreshTokenRepository::new(self.pool())
            .create(&NewRefreshToken::expiring_in_days(
                user.id,
                &refresh_token,
                self.refresh_token_expiry,
            ))
            .await
            .map_err(|e| {
                tracing::error!("Failed to store refresh token: {}", e);
                ApiError::internal("Failed to create session")
            })?;

        Ok(LoginResponse {
            access_token,
            refresh_token,
            expires_in: self.access_token_expiry,
            token_type: "Bearer",
            user: UserInfo::from(user),
        })
    }

    /// Current role and department of the token's user.
    pub async fn viewer(&self, claims: &JwtClaims) -> Result<Viewer, ApiError> {
        Ok(Viewer::load(self.pool(), claims.sub).await?)
    }
}

/// Fail with 403 unless the caller is a super admin.
pub fn require_super_admin(viewer: &Viewer) -> Result<(), ApiError> {
    if viewer.role == Role::SuperAdmin {
        Ok(())
    } else {
        Err(ApiError::forbidden("Super admin access required"))
    }
}

// ============================================================================
// Field parsing shared by handlers
// ============================================================================

pub(crate) fn parse_priority(value: Option<&str>) -> Result<Option<Priority>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => Ok(Some(v.parse()?)),
    }
}

pub(crate) fn parse_active_status(value: Option<&str>) -> Result<Option<ActiveStatus>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v.parse().map(Some).map_err(ApiError::bad_request),
    }
}

pub(crate) fn parse_incoming_status(value: &str) -> Result<IncomingStatus, ApiError> {
    IncomingStatus::parse_lenient(value)
        .ok_or_else(|| ApiError::bad_request(format!("Invalid incoming letter status '{value}'")))
}

pub(crate) fn parse_outgoing_status(value: &str) -> Result<OutgoingStatus, ApiError> {
    OutgoingStatus::parse_lenient(value)
        .ok_or_else(|| ApiError::bad_request(format!("Invalid outgoing letter status '{value}'")))
}

pub(crate) fn parse_optional<T>(
    value: Option<&str>,
    parse: fn(&str) -> Result<T, ApiError>,
) -> Result<Option<T>, ApiError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(parse)
        .transpose()
}

/// Normalize a client-supplied date field to the storage format.
pub(crate) fn parse_date_field(
    field: &str,
    value: Option<&str>,
) -> Result<Option<String>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => normalize_date(v)
            .map(Some)
            .ok_or_else(|| ApiError::bad_request(format!("Invalid date for {field}: '{v}'"))),
    }
}

/// Store an uploaded letter image, returning its public URL.
pub(crate) fn store_image(
    state: &AppState,
    image: Option<UploadedImage>,
) -> Result<Option<String>, ApiError> {
    image
        .map(|image| state.images.save(&image.bytes, &image.file_name))
        .transpose()
        .map_err(ApiError::from)
}

/// Remove a stored image; failures are only logged.
pub(crate) fn discard_image(state: &AppState, url: Option<&str>) {
    let Some(url) = url else {
        return;
    };
    if let Err(e) = state.images.delete_by_url(url) {
        tracing::warn!(url, error = %e, "Failed to delete stored image");
    }
}
