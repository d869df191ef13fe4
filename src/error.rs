//! Error taxonomy for the workflow engine.
//!
//! Every variant of [`WorkflowError`] is an expected, caller-facing outcome
//! of a command. None are retried internally; the caller decides what to do.

#[derive(thiserror::Error, Debug)]
pub enum WorkflowError {
    #[error("{entity} is {state}, the requested transition is not allowed")]
    InvalidTransition { entity: String, state: String },
    #[error("required fields missing or invalid: {}", .fields.join(", "))]
    Validation { fields: Vec<String> },
    #[error("driver {driver_id} already has a pending truck request")]
    DuplicateRequest { driver_id: String },
    #[error("no unassigned trucks are available")]
    NoAvailableTrucks,
    #[error("trip {trip_id} belongs to a different client and cannot share the invoice")]
    MixedClient { trip_id: String },
    #[error("no record found for {id}")]
    NotFound { id: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WorkflowError {
    pub(crate) fn invalid_transition(entity: &str, state: impl std::fmt::Debug) -> Self {
        Self::InvalidTransition {
            entity: entity.to_owned(),
            state: format!("{state:?}"),
        }
    }

    pub(crate) fn missing(fields: &[&str]) -> Self {
        Self::Validation {
            fields: fields.iter().map(|f| (*f).to_owned()).collect(),
        }
    }
}

/// Failures of the persistence seam. Everything above it is a workflow
/// outcome; everything in here means the store itself misbehaved.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sled::Error),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl<E: std::fmt::Display> From<minicbor::encode::Error<E>> for StoreError {
    fn from(err: minicbor::encode::Error<E>) -> Self {
        StoreError::Encode(err.to_string())
    }
}

impl From<minicbor::decode::Error> for StoreError {
    fn from(err: minicbor::decode::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}
