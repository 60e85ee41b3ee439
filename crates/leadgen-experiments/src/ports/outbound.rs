//! Outbound ports (Repository traits)
//!
//! Hexagonal architecture: these are the interfaces that infrastructure must implement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::aggregates::{Assignment, Campaign, CampaignStats, TallyMark, VariantStats};
use crate::domain::events::ExperimentEvent;
use crate::domain::value_objects::{EntityId, VisitorId};

/// Repository result type
pub type RepoResult<T> = Result<T, RepositoryError>;

/// Change applied to a stored assignment
#[derive(Clone, Debug, PartialEq)]
pub enum AssignmentUpdate {
    /// Conditional: fails with `Conflict` if the mark is already set
    Tallied(TallyMark),
    /// Conditional: fails with `Conflict` if the assignment is already converted
    Converted { value: f64, at: DateTime<Utc> },
}

/// Persistence port for campaigns, variants and assignments.
///
/// Counter operations are atomic increments that return the counters as they
/// stand right after the increment.
#[async_trait]
pub trait ExperimentStore: Send + Sync {
    /// Find campaign (with its variants) by ID
    async fn find_campaign(&self, id: &EntityId) -> RepoResult<Option<Campaign>>;

    /// Insert or replace a campaign definition. Counters of an existing
    /// campaign and its variants are left as stored.
    async fn save_campaign(&self, campaign: &Campaign) -> RepoResult<()>;

    /// Find the assignment for a (campaign, visitor) pair
    async fn find_assignment(
        &self,
        campaign_id: &EntityId,
        visitor_id: &VisitorId,
    ) -> RepoResult<Option<Assignment>>;

    /// Insert a new assignment. Fails with `Conflict` if the pair is already assigned.
    async fn create_assignment(&self, assignment: &Assignment) -> RepoResult<Assignment>;

    /// Apply an update, returning the stored record afterwards
    async fn update_assignment(&self, id: &EntityId, update: AssignmentUpdate) -> RepoResult<Assignment>;

    /// Assignments of a campaign with at least one missing tally mark
    async fn list_incomplete_assignments(&self, campaign_id: &EntityId) -> RepoResult<Vec<Assignment>>;

    async fn increment_variant_visitors(&self, variant_id: &EntityId) -> RepoResult<VariantStats>;

    async fn increment_campaign_visitors(&self, campaign_id: &EntityId) -> RepoResult<CampaignStats>;

    async fn increment_variant_conversions(&self, variant_id: &EntityId) -> RepoResult<VariantStats>;

    async fn increment_campaign_conversions(&self, campaign_id: &EntityId) -> RepoResult<CampaignStats>;

    async fn set_variant_conversion_rate(&self, variant_id: &EntityId, rate: f64) -> RepoResult<()>;

    async fn set_campaign_conversion_rate(&self, campaign_id: &EntityId, rate: f64) -> RepoResult<()>;
}

/// Visitor-tracking sink (append-only event log)
#[async_trait]
pub trait TrackingSink: Send + Sync {
    async fn record(&self, events: Vec<ExperimentEvent>) -> RepoResult<()>;
}

/// Repository errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
