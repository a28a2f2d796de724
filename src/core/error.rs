//! Typed error handling for datamap
//!
//! Repositories return [`DataResult`], so callers can match on the exact
//! failure instead of inspecting an opaque `anyhow::Error`.
//!
//! # Error Categories
//!
//! - [`EntityError`]: lookups, uniqueness and association rules
//! - [`ValidationError`]: bad input (ids, paging, sort properties, bodies)
//! - [`StorageError`]: backend failures (connection, query, transaction)
//! - [`ConfigError`]: configuration parsing and loading
//! - [`RequestError`]: HTTP-level problems
//!
//! # Example
//!
//! ```rust,ignore
//! match members.find_member_by_username("AAA").await {
//!     Ok(member) => println!("found {}", member.username),
//!     Err(DataError::Entity(EntityError::NonUniqueResult { count, .. })) => {
//!         println!("{} members share that username", count);
//!     }
//!     Err(e) => eprintln!("other error: {}", e),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Result alias used by every repository operation
pub type DataResult<T> = std::result::Result<T, DataError>;

/// The main error type for datamap
#[derive(Debug, Error)]
pub enum DataError {
    #[error(transparent)]
    Entity(#[from] EntityError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Request(#[from] RequestError),

    /// Should not happen in normal operation
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl DataError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            DataError::Entity(e) => e.status_code(),
            DataError::Validation(_) => StatusCode::BAD_REQUEST,
            DataError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DataError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DataError::Request(e) => e.status_code(),
            DataError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            DataError::Entity(e) => e.error_code(),
            DataError::Validation(e) => e.error_code(),
            DataError::Storage(_) => "STORAGE_ERROR",
            DataError::Config(_) => "CONFIG_ERROR",
            DataError::Request(e) => e.error_code(),
            DataError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            DataError::Entity(EntityError::NotFound { entity_type, id }) => Some(
                serde_json::json!({ "entity_type": entity_type, "id": id }),
            ),
            DataError::Entity(EntityError::NonUniqueResult { entity_type, count }) => Some(
                serde_json::json!({ "entity_type": entity_type, "count": count }),
            ),
            DataError::Validation(ValidationError::FieldErrors(errors)) => {
                Some(serde_json::json!({ "fields": errors }))
            }
            _ => None,
        }
    }

    /// Shorthand for a missing entity
    pub fn not_found(entity_type: &str, id: impl ToString) -> Self {
        DataError::Entity(EntityError::NotFound {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        })
    }
}

impl IntoResponse for DataError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Entity Errors
// =============================================================================

/// Errors related to entity lookups and persistence rules
#[derive(Debug, Error)]
pub enum EntityError {
    #[error("{entity_type} with id '{id}' not found")]
    NotFound { entity_type: String, id: String },

    #[error("{entity_type} with id '{id}' already exists")]
    AlreadyExists { entity_type: String, id: String },

    /// A single-result query matched more than one row
    #[error("Expected a single {entity_type} but found {count}")]
    NonUniqueResult { entity_type: String, count: usize },

    /// An association points at an entity that was never persisted
    #[error("{entity_type} references unsaved {target_type} '{target_id}'")]
    TransientReference {
        entity_type: String,
        target_type: String,
        target_id: String,
    },
}

impl EntityError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EntityError::NotFound { .. } => StatusCode::NOT_FOUND,
            EntityError::AlreadyExists { .. } => StatusCode::CONFLICT,
            EntityError::NonUniqueResult { .. } => StatusCode::CONFLICT,
            EntityError::TransientReference { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            EntityError::NotFound { .. } => "ENTITY_NOT_FOUND",
            EntityError::AlreadyExists { .. } => "ENTITY_ALREADY_EXISTS",
            EntityError::NonUniqueResult { .. } => "NON_UNIQUE_RESULT",
            EntityError::TransientReference { .. } => "TRANSIENT_REFERENCE",
        }
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors related to input validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Validation error for field '{field}': {message}")]
    FieldError { field: String, message: String },

    #[error("Validation errors: {}", format_field_errors(.0))]
    FieldErrors(Vec<FieldValidationError>),

    /// Sort or filter on a property the entity does not expose
    #[error("No property '{property}' found for type '{entity_type}'")]
    UnknownProperty {
        entity_type: String,
        property: String,
    },

    #[error("Invalid page request: {message}")]
    InvalidPage { message: String },

    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },
}

/// A single field validation error
#[derive(Debug, Clone, Serialize)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

fn format_field_errors(errors: &[FieldValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::FieldError { .. } | ValidationError::FieldErrors(_) => {
                "VALIDATION_ERROR"
            }
            ValidationError::UnknownProperty { .. } => "UNKNOWN_PROPERTY",
            ValidationError::InvalidPage { .. } => "INVALID_PAGE_REQUEST",
            ValidationError::InvalidJson { .. } => "INVALID_JSON",
        }
    }
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = Vec::new();
        collect_field_errors(&errors, "", &mut fields);
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        ValidationError::FieldErrors(fields)
    }
}

/// Flatten nested struct and list errors into `parent[i].field` paths
fn collect_field_errors(
    errors: &validator::ValidationErrors,
    prefix: &str,
    out: &mut Vec<FieldValidationError>,
) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(errs) => {
                out.extend(errs.iter().map(|e| FieldValidationError {
                    field: path.clone(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                }));
            }
            ValidationErrorsKind::Struct(nested) => collect_field_errors(nested, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_field_errors(nested, &format!("{}[{}]", path, index), out);
                }
            }
        }
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors related to storage backends
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to connect to {backend}: {message}")]
    ConnectionError { backend: String, message: String },

    #[error("{backend} query error: {message}")]
    QueryError { backend: String, message: String },

    #[error("Transaction error: {message}")]
    TransactionError { message: String },

    /// A lock guarding shared state was poisoned by a panicking writer
    #[error("Storage lock poisoned: {message}")]
    LockPoisoned { message: String },
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{}", parse_message(.file, .message))]
    ParseError {
        file: Option<String>,
        message: String,
    },

    #[error("Invalid value '{value}' for field '{field}': {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

fn parse_message(file: &Option<String>, message: &str) -> String {
    match file {
        Some(file) => format!("Failed to parse config file '{}': {}", file, message),
        None => format!("Failed to parse config: {}", message),
    }
}

// =============================================================================
// Request Errors
// =============================================================================

/// Errors related to HTTP requests
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Invalid entity ID format: '{id}'")]
    InvalidEntityId { id: String },

    #[error("Invalid request body: {message}")]
    InvalidBody { message: String },

    #[error("Invalid query parameter '{name}': {message}")]
    InvalidQuery { name: String, message: String },
}

impl RequestError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            RequestError::InvalidEntityId { .. } => "INVALID_ENTITY_ID",
            RequestError::InvalidBody { .. } => "INVALID_BODY",
            RequestError::InvalidQuery { .. } => "INVALID_QUERY",
        }
    }
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::Validation(ValidationError::InvalidJson {
            message: err.to_string(),
        })
    }
}

impl From<serde_yaml::Error> for DataError {
    fn from(err: serde_yaml::Error) -> Self {
        DataError::Config(ConfigError::ParseError {
            file: None,
            message: err.to_string(),
        })
    }
}

impl From<validator::ValidationErrors> for DataError {
    fn from(errors: validator::ValidationErrors) -> Self {
        DataError::Validation(errors.into())
    }
}

impl<T> From<std::sync::PoisonError<T>> for DataError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        DataError::Storage(StorageError::LockPoisoned {
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            // 23505 unique_violation, 23503 foreign_key_violation
            match db.code().as_deref() {
                Some("23505") => {
                    return DataError::Entity(EntityError::AlreadyExists {
                        entity_type: db.table().unwrap_or("row").to_string(),
                        id: db.constraint().unwrap_or_default().to_string(),
                    });
                }
                Some("23503") => {
                    return DataError::Entity(EntityError::TransientReference {
                        entity_type: db.table().unwrap_or("row").to_string(),
                        target_type: "team".to_string(),
                        target_id: db.constraint().unwrap_or_default().to_string(),
                    });
                }
                _ => {}
            }
        }
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DataError::Storage(StorageError::ConnectionError {
                    backend: "PostgreSQL".to_string(),
                    message: err.to_string(),
                })
            }
            other => DataError::Storage(StorageError::QueryError {
                backend: "PostgreSQL".to_string(),
                message: other.to_string(),
            }),
        }
    }
}
