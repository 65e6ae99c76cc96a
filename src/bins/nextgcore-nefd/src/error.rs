//! NEF Error Types

use ogs_sbi::ProblemDetails;
use thiserror::Error;

use crate::consumer::PeerError;
use crate::context::ContextError;
use crate::models::PfdReports;

/// Outcome of a failed processor operation
#[derive(Error, Debug)]
pub enum NefError {
    /// Referenced AF, transaction, application or subscription is unknown
    #[error("{0}")]
    NotFound(String),

    /// Structurally invalid input
    #[error("{0}")]
    Malformed(String),

    /// Peer answered with a non-success status or not at all
    #[error("peer failure: {0}")]
    Peer(#[from] PeerError),

    /// Every application of a PFD operation failed
    #[error("none of the PFDs were created")]
    PfdsNotCreated(PfdReports),

    #[error("{0}")]
    SystemFailure(String),
}

impl From<ContextError> for NefError {
    fn from(err: ContextError) -> Self {
        NefError::NotFound(err.to_string())
    }
}

impl NefError {
    pub fn status(&self) -> u16 {
        match self {
            NefError::NotFound(_) => 404,
            NefError::Malformed(_) => 400,
            NefError::Peer(e) => e.status,
            NefError::PfdsNotCreated(_) | NefError::SystemFailure(_) => 500,
        }
    }

    /// Problem object sent back to the caller
    pub fn to_problem(&self) -> ProblemDetails {
        match self {
            NefError::NotFound(detail) => ProblemDetails::data_not_found(detail),
            NefError::Malformed(detail) => ProblemDetails::malformed_request(detail),
            NefError::Peer(e) => e.problem.clone(),
            NefError::PfdsNotCreated(_) => ProblemDetails::system_failure("None of the PFDs were created"),
            NefError::SystemFailure(detail) => ProblemDetails::system_failure(detail),
        }
    }
}

pub type NefResult<T> = Result<T, NefError>;
