//! JWT authentication middleware.

use axum::{
    async_trait,
    body::Body,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, Request},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::web::error::ApiError;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID).
    pub sub: i64,
    pub username: String,
    /// Role at the time the token was issued.
    pub role: String,
    pub iat: u64,
    pub exp: u64,
    /// Issuer.
    pub iss: String,
    /// JWT ID (unique identifier).
    pub jti: String,
}

/// Verification settings for access tokens.
#[derive(Clone)]
pub struct JwtState {
    pub decoding_key: DecodingKey,
    pub validation: Validation,
}

impl JwtState {
    /// HS256 with expiry and issuer checks.
    pub fn new(secret: &str, issuer: &str) -> Self {
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_issuer(&[issuer]);

        Self {
            decoding_key,
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<JwtClaims, jsonwebtoken::errors::Error> {
        decode::<JwtClaims>(token, &self.decoding_key, &self.validation).map(|data| data.claims)
    }
}

/// Extractor for authenticated callers.
///
/// Requires `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub JwtClaims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Missing authorization"))?;

        let jwt_state = parts
            .extensions
            .get::<Arc<JwtState>>()
            .ok_or_else(|| ApiError::internal("JWT state not configured"))?;

        let claims = jwt_state.verify(token).map_err(|e| {
            tracing::debug!("JWT validation failed: {}", e);
            ApiError::unauthorized("Invalid or expired token")
        })?;

        Ok(AuthUser(claims))
    }
}

/// Inject the JWT state into request extensions.
pub async fn jwt_auth(
    jwt_state: Arc<JwtState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    request.extensions_mut().insert(jwt_state);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn claims(iss: &str, exp_offset: i64) -> JwtClaims {
        let now = chrono::Utc::now().timestamp();
        JwtClaims {
            sub: 1,
            username: "registry".to_string(),
            role: "rd_department".to_string(),
            iat: now as u64,
            exp: (now + exp_offset) as u64,
            iss: iss.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }

    fn token(secret: &str, claims: &JwtClaims) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_verify_valid_token() {
        let state = JwtState::new("secret", "mailroom");
        let decoded = state.verify(&token("secret", &claims("mailroom", 3600))).unwrap();
        assert_eq!(decoded.sub, 1);
        assert_eq!(decoded.role, "rd_department");
    }

    #[test]
    fn test_expired_token() {
        let state = JwtState::new("secret", "mailroom");
        assert!(state.verify(&token("secret", &claims("mailroom", -3600))).is_err());
    }

    #[test]
    fn test_wrong_secret_or_issuer() {
        let state = JwtState::new("secret", "mailroom");
        assert!(state.verify(&token("other", &claims("mailroom", 3600))).is_err());
        assert!(state.verify(&token("secret", &claims("someone-else", 3600))).is_err());
    }
}
