//! Inbound ports (Use case traits)
//!
//! Hexagonal architecture: application service interfaces.

use async_trait::async_trait;

use crate::application::dto::*;
use crate::domain::value_objects::EntityId;
use crate::error::Result;

/// Experiment use cases exposed to the HTTP layer and operator tooling
#[async_trait]
pub trait ExperimentUseCases: Send + Sync {
    /// Bucket a visitor into a variant, or return the existing assignment
    async fn assign(&self, command: AssignVisitorCommand) -> Result<AssignmentOutcome>;

    /// Pin a visitor to a specific variant (QA previews, support overrides)
    async fn assign_to_variant(&self, command: PinVisitorCommand) -> Result<AssignmentOutcome>;

    /// Record a goal completion for an assigned visitor
    async fn record_conversion(&self, command: RecordConversionCommand) -> Result<ConversionOutcome>;

    /// Apply counter side effects that a failed request left behind
    async fn reconcile(&self, campaign_id: &EntityId) -> Result<ReconcileSummary>;

    /// Per-variant results for a campaign
    async fn campaign_report(&self, campaign_id: &EntityId) -> Result<CampaignReport>;
}
