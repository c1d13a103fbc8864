use serde::Serialize;
use sqlx::error::ErrorKind;
use thiserror::Error;
use warp::reject::{Reject, Rejection};

/// Crate-wide error type. Every variant maps to one HTTP-equivalent status
/// code so callers see a single error contract regardless of which layer
/// detected the problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        field: Option<&'static str>,
        message: String,
    },
    /// Removing a relation that does not exist. A client error (400), kept
    /// distinct from `NotFound` by contract.
    #[error("{0}")]
    NotPresent(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Authentication required")]
    Unauthenticated,
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    InvalidSession(String),
    #[error("{0}")]
    Query(String),
}

impl ApiError {
    pub fn validation(field: &'static str, message: &str) -> Self {
        Self::Validation {
            field: Some(field),
            message: message.to_string(),
        }
    }

    pub fn invalid(message: &str) -> Self {
        Self::Validation {
            field: None,
            message: message.to_string(),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::NotPresent(_) => 400,
            Self::NotFound(_) => 404,
            Self::Unauthenticated => 401,
            Self::InvalidSession(_) => 401,
            Self::Unauthorized(_) => 403,
            Self::Query(_) => 500,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let field = match self {
            Self::Validation { field, .. } => *field,
            _ => None,
        };

        ErrorBody {
            code: self.code(),
            field: field.map(str::to_string),
            message: self.to_string(),
        }
    }
}

impl Reject for ApiError {}

/// Wire shape of every error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

/// Translation layer between sqlx failures and `ApiError`. Constraint
/// violations become validation errors so storage-detected duplicates read
/// the same as application-detected ones.
pub struct QueryError {
    kind: QueryErrorKind,
    info: String,
}

enum QueryErrorKind {
    UniqueViolation,
    ForeignKeyViolation,
    RowNotFound,
    Other,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            kind: QueryErrorKind::Other,
            info,
        }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => {
                let kind = match e.kind() {
                    ErrorKind::UniqueViolation => QueryErrorKind::UniqueViolation,
                    ErrorKind::ForeignKeyViolation => QueryErrorKind::ForeignKeyViolation,
                    _ => QueryErrorKind::Other,
                };
                Self {
                    kind,
                    info: format!("{e}"),
                }
            }
            sqlx::Error::RowNotFound => Self {
                kind: QueryErrorKind::RowNotFound,
                info: String::from("RowNotFound"),
            },
            other => Self {
                kind: QueryErrorKind::Other,
                info: format!("{other}"),
            },
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(value: QueryError) -> Self {
        match value.kind {
            QueryErrorKind::UniqueViolation => {
                ApiError::invalid("Value violates a uniqueness constraint")
            }
            QueryErrorKind::ForeignKeyViolation => {
                ApiError::invalid("Referenced entity does not exist")
            }
            QueryErrorKind::RowNotFound => ApiError::NotFound(String::from("No such row")),
            QueryErrorKind::Other => {
                log::error!("query failed: {}", value.info);
                ApiError::Query(value.info)
            }
        }
    }
}

#[derive(Debug, Error)]
#[error("({info})")]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl From<TypeError> for ApiError {
    fn from(value: TypeError) -> Self {
        ApiError::invalid(&value.info)
    }
}

impl From<TypeError> for Rejection {
    fn from(value: TypeError) -> Self {
        ApiError::from(value).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_the_error_contract() {
        assert_eq!(ApiError::invalid("x").code(), 400);
        assert_eq!(ApiError::NotPresent(String::from("x")).code(), 400);
        assert_eq!(ApiError::NotFound(String::from("x")).code(), 404);
        assert_eq!(ApiError::Unauthenticated.code(), 401);
        assert_eq!(ApiError::Unauthorized(String::from("x")).code(), 403);
        assert_eq!(ApiError::Query(String::from("x")).code(), 500);
    }

    #[test]
    fn validation_body_carries_the_field() {
        let body = ApiError::validation("ingredients", "This field is required").body();
        assert_eq!(body.code, 400);
        assert_eq!(body.field.as_deref(), Some("ingredients"));
        assert_eq!(body.message, "This field is required");
    }

    #[test]
    fn type_errors_become_validation_errors() {
        let err: ApiError = TypeError::new("Invalid recipe payload").into();
        assert_eq!(err.code(), 400);
    }
}
