use common::ids::Id;
use thiserror::Error;

/// Failures that abort a run before anything is submitted.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration error: {0:#}")]
    Config(anyhow::Error),

    #[error("vendor token exchange failed: {0:#}")]
    Auth(anyhow::Error),

    #[error("failed to fetch {collection}: {cause:#}")]
    Pagination {
        collection: &'static str,
        cause: anyhow::Error,
    },

    #[error("footage grant request failed: {0:#}")]
    Grant(anyhow::Error),

    #[error("feature submission failed: {0:#}")]
    Submit(anyhow::Error),
}

impl SyncError {
    pub fn pagination(collection: &'static str, cause: anyhow::Error) -> Self {
        Self::Pagination { collection, cause }
    }
}

/// Failure to provision one camera's lease. Never aborts the run.
#[derive(Debug, Error)]
pub enum LeaseError {
    #[error("invalid camera record: {0:#}")]
    InvalidCamera(anyhow::Error),

    #[error("lease create failed: {0:#}")]
    Create(anyhow::Error),

    #[error("lease {lease_id} update failed: {cause:#}")]
    Update { lease_id: Id, cause: anyhow::Error },
}
