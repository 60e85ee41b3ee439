//! Error types for the experiment engine

use thiserror::Error;

use crate::domain::aggregates::{CampaignError, CampaignStatus};
use crate::domain::value_objects::VisitorIdError;
use crate::ports::outbound::RepositoryError;

/// Experiment engine error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExperimentError {
    /// No campaign with this id
    #[error("campaign not found: {0}")]
    CampaignNotFound(String),

    /// Campaign exists but is not serving traffic
    #[error("campaign {campaign_id} is {status}, not active")]
    CampaignNotActive { campaign_id: String, status: CampaignStatus },

    /// Active campaign without variants
    #[error("campaign {0} has no variants")]
    NoVariantsAvailable(String),

    /// Variant does not belong to the campaign
    #[error("variant {variant_id} not found in campaign {campaign_id}")]
    VariantNotFound { campaign_id: String, variant_id: String },

    /// Visitor was never assigned in this campaign
    #[error("no assignment for visitor {visitor_id} in campaign {campaign_id}")]
    AssignmentNotFound { campaign_id: String, visitor_id: String },

    /// Visitor token failed validation
    #[error("invalid visitor id: {0}")]
    InvalidVisitorId(#[from] VisitorIdError),

    /// Campaign definition or lifecycle violation
    #[error("invalid campaign: {0}")]
    InvalidCampaign(#[from] CampaignError),

    /// Uniqueness race that could not be resolved by re-reading
    #[error("storage conflict: {0}")]
    StorageConflict(String),

    /// Backing store failed; safe to retry
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl ExperimentError {
    /// Whether the caller may retry the same request
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_) | Self::StorageConflict(_))
    }
}

impl From<RepositoryError> for ExperimentError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Conflict(msg) => Self::StorageConflict(msg),
            other => Self::StorageUnavailable(other.to_string()),
        }
    }
}

/// Result type for the experiment engine
pub type Result<T> = std::result::Result<T, ExperimentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_errors_map_to_storage_errors() {
        let e: ExperimentError = RepositoryError::Unavailable("connection reset".into()).into();
        assert!(matches!(e, ExperimentError::StorageUnavailable(_)));
        assert!(e.is_retryable());

        let e: ExperimentError = RepositoryError::Conflict("dup".into()).into();
        assert_eq!(e, ExperimentError::StorageConflict("dup".into()));
    }

    #[test]
    fn test_domain_errors_are_not_retryable() {
        assert!(!ExperimentError::CampaignNotFound("c".into()).is_retryable());
        assert!(!ExperimentError::InvalidVisitorId(VisitorIdError::Empty).is_retryable());
    }
}
