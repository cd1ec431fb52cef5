use devhub_azdo::client::{ConflictAware, RemoteError};
use devhub_azdo::poller::OperationError;
use devhub_core::error::CoreError;
use devhub_core::policy::StepId;

/// Why a single step failed.
#[derive(Debug, thiserror::Error)]
pub enum StepFailure {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Operation(#[from] OperationError),

    /// Something the step needs is missing or malformed on the remote side.
    #[error("{0}")]
    Precondition(String),
}

impl From<CoreError> for StepFailure {
    fn from(err: CoreError) -> Self {
        Self::Precondition(err.to_string())
    }
}

impl ConflictAware for StepFailure {
    fn is_conflict(&self) -> bool {
        match self {
            Self::Remote(e) => e.is_conflict(),
            Self::Operation(e) => ConflictAware::is_conflict(e),
            Self::Precondition(_) => false,
        }
    }
}

/// Errors that abort a provisioning run.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("Invalid provisioning request: {0}")]
    InvalidRequest(#[from] validator::ValidationErrors),

    #[error("Failed to provision workspace '{project}' at step {step}: {source}")]
    Fatal {
        project: String,
        step: StepId,
        #[source]
        source: StepFailure,
    },
}
