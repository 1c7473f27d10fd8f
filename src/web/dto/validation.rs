//! Validating extractors and custom validators.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Multipart, Path, Query, Request},
    http::{header::CONTENT_TYPE, request::Parts},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use validator::Validate;

use crate::web::error::ApiError;

/// Multipart field carrying the letter image.
pub const IMAGE_FIELD: &str = "image";

/// A JSON body that is deserialized and then validated.
///
/// ```ignore
/// use mailroom::web::dto::ValidatedJson;
///
/// async fn create_courier(
///     ValidatedJson(payload): ValidatedJson<CreateCourierRequest>,
/// ) -> Result<Json<ApiResponse<CourierResponse>>, ApiError> {
///     // payload is already validated
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON: {e}")))?;

        value.validate().map_err(ApiError::from_validation_errors)?;

        Ok(ValidatedJson(value))
    }
}

/// An uploaded image file.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// A letter payload, sent either as JSON or as multipart form-data.
///
/// In multipart form the `image` field is the file and every other field is
/// text; blank text fields count as absent.
pub struct LetterForm<T> {
    pub data: T,
    pub image: Option<UploadedImage>,
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

#[async_trait]
impl<S, T> FromRequest<S> for LetterForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let ValidatedJson(data) = ValidatedJson::<T>::from_request(req, state).await?;
            return Ok(Self { data, image: None });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?;

        let mut fields = Map::new();
        let mut image = None;
        while let Some(field) = multipart.next_field().await.map_err(|e| {
            tracing::debug!("Failed to read multipart field: {}", e);
            ApiError::bad_request("Invalid multipart data")
        })? {
            let name = field.name().unwrap_or_default().to_string();
            if name == IMAGE_FIELD {
                let file_name = field.file_name().unwrap_or("image").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::bad_request("Failed to read image"))?;
                if !bytes.is_empty() {
                    image = Some(UploadedImage {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request(format!("Invalid field '{name}'")))?;
                if !text.trim().is_empty() {
                    fields.insert(name, Value::String(text));
                }
            }
        }

        let data: T = serde_json::from_value(Value::Object(fields))
            .map_err(|e| ApiError::bad_request(format!("Invalid form data: {e}")))?;
        data.validate().map_err(ApiError::from_validation_errors)?;

        Ok(Self { data, image })
    }
}

/// Query string extractor with JSON error responses.
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid query string: {e}")))?;
        Ok(ApiQuery(value))
    }
}

/// Path parameter extractor with JSON error responses.
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid path parameter: {e}")))?;
        Ok(ApiPath(value))
    }
}

// ============================================================================
// Custom Validators
// ============================================================================

/// Reject control characters other than newline, carriage return and tab.
pub fn no_control_chars(value: &str) -> Result<(), validator::ValidationError> {
    if value
        .chars()
        .any(|c| c.is_control() && c != '\n' && c != '\r' && c != '\t')
    {
        return Err(validator::ValidationError::new("no_control_chars")
            .with_message("Must not contain control characters".into()));
    }
    Ok(())
}

/// Reject blank strings.
pub fn not_empty_trimmed(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("not_empty_trimmed")
            .with_message("Must not be empty".into()));
    }
    Ok(())
}

/// Trim a text field, turning blank into `None`.
pub fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
