//! Error kinds surfaced by every core operation.
//!
//! Two families are always kept apart so the request layer can tell
//! "your input was wrong" from "we failed": [`InputError`] never indicates a
//! system fault, [`InternalError`] always does. Missing rows, expired
//! sessions and empty sample sets are ordinary outcomes, not errors.

use thiserror::Error;

use crate::identity::Namespace;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl Error {
    pub fn is_input(&self) -> bool {
        matches!(self, Error::Input(_))
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Error::Internal(_))
    }
}

/// Storage closures report through `anyhow`; typed errors raised inside them
/// are recovered here, everything else is a storage failure.
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<Error>() {
            Ok(typed) => typed,
            Err(err) => match err.downcast::<InputError>() {
                Ok(input) => Error::Input(input),
                Err(err) => match err.downcast::<InternalError>() {
                    Ok(internal) => Error::Internal(internal),
                    Err(other) => Error::Internal(InternalError::Storage(other)),
                },
            },
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("user {0} does not exist")]
    UnknownUser(i64),

    #[error("video {0} does not exist")]
    UnknownVideo(String),

    #[error("view {0} does not exist")]
    UnknownView(String),

    #[error("view {0} has expired")]
    ViewExpired(String),

    #[error("view {view_id} does not belong to video {video_id}")]
    ViewVideoMismatch { video_id: String, view_id: String },

    #[error("sample {0} does not exist")]
    UnknownSample(i64),

    #[error("{field} must have {max} or less characters")]
    FieldTooLong { field: &'static str, max: usize },

    #[error("username {0} is reserved")]
    ReservedName(String),

    #[error("username {0} already exists")]
    DuplicateUsername(String),

    #[error("video id {0} already exists")]
    DuplicateVideo(String),

    #[error("video duration {0} is out of range")]
    InvalidVideoDuration(f64),

    #[error("window width {0} must be positive")]
    InvalidWindowWidth(f64),

    #[error("{0} must be a finite number")]
    NonFinite(&'static str),

    #[error("snapshot is not a valid data url: {0}")]
    InvalidImage(String),
}

#[derive(Debug, Error)]
pub enum InternalError {
    #[error("storage failure: {0:#}")]
    Storage(#[source] anyhow::Error),

    #[error("unable to generate a unique {namespace} id after {attempts} attempts")]
    IdentifierSpaceExhausted { namespace: Namespace, attempts: u32 },

    #[error("classifier returned an unexpected payload: {0}")]
    ClassifierProtocol(String),

    #[error("classifier unavailable: {0:#}")]
    ClassifierUnavailable(#[source] anyhow::Error),
}
