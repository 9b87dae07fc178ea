use thiserror::Error;

use crate::repository::RepositoryError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("SKU already exists")]
    DuplicateSku { sku: String },
    #[error("quantity must be greater than zero (got {quantity})")]
    NonPositiveQuantity { quantity: i64 },
    #[error(
        "insufficient stock for product '{product_id}': requested {requested}, available {available}"
    )]
    InsufficientStock { product_id: String, requested: i64, available: u32 },
    #[error("stock quantity overflow for product '{product_id}'")]
    StockOverflow { product_id: String },
    #[error("price must not be negative")]
    NegativePrice,
    #[error("weight must not be negative")]
    NegativeWeight,
}

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("{entity} with id '{id}' not found")]
    NotFound { entity: &'static str, id: String },
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

impl ApplicationError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "The requested record does not exist.",
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::NotFound { message, .. }
            | Self::BadRequest { message, .. }
            | Self::ServiceUnavailable { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let message = value.to_string();
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::NotFound { .. } => Self::NotFound { message, correlation_id },
            ApplicationError::Validation(_) => Self::BadRequest { message, correlation_id },
            ApplicationError::Storage(RepositoryError::Io { .. }) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
            ApplicationError::Storage(
                RepositoryError::CorruptStore { .. }
                | RepositoryError::Encode(_)
                | RepositoryError::DuplicateId(_),
            ) => Self::Internal { message, correlation_id },
        }
    }
}
