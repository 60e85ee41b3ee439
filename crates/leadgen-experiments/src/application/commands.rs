//! Command handlers
//!
//! Application service that orchestrates assignment and conversion use cases.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::application::dto::*;
use crate::application::queries::build_report;
use crate::config::ExperimentConfig;
use crate::domain::aggregates::{Assignment, Campaign, CampaignStats, TallyMark, Variant, VariantStats};
use crate::domain::events::ExperimentEvent;
use crate::domain::services::VariantSelector;
use crate::domain::value_objects::{AssignmentMethod, Bucket, ConversionRate, EntityId, VisitorId};
use crate::error::{ExperimentError, Result};
use crate::ports::inbound::ExperimentUseCases;
use crate::ports::outbound::{AssignmentUpdate, ExperimentStore, RepositoryError, TrackingSink};

/// Counters returned by an applied tally mark
enum Counters {
    Variant(VariantStats),
    Campaign(CampaignStats),
}

/// Experiment application service
pub struct ExperimentService {
    store: Arc<dyn ExperimentStore>,
    tracking: Arc<dyn TrackingSink>,
    config: ExperimentConfig,
    /// One repair pass at a time per campaign
    reconcile_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ExperimentService {
    pub fn new(
        store: Arc<dyn ExperimentStore>,
        tracking: Arc<dyn TrackingSink>,
        config: ExperimentConfig,
    ) -> Self {
        Self {
            store,
            tracking,
            config,
            reconcile_locks: DashMap::new(),
        }
    }

    async fn load_campaign(&self, campaign_id: &EntityId) -> Result<Campaign> {
        self.store
            .find_campaign(campaign_id)
            .await?
            .ok_or_else(|| ExperimentError::CampaignNotFound(campaign_id.to_string()))
    }

    async fn active_campaign(&self, campaign_id: &EntityId) -> Result<Campaign> {
        let campaign = self.load_campaign(campaign_id).await?;
        if !campaign.is_active() {
            return Err(ExperimentError::CampaignNotActive {
                campaign_id: campaign_id.to_string(),
                status: campaign.status(),
            });
        }
        Ok(campaign)
    }

    fn existing_outcome(&self, campaign: &Campaign, assignment: Assignment) -> Result<AssignmentOutcome> {
        let variant = campaign
            .variant(assignment.variant_id())
            .cloned()
            .ok_or_else(|| ExperimentError::VariantNotFound {
                campaign_id: campaign.id().to_string(),
                variant_id: assignment.variant_id().to_string(),
            })?;

        Ok(AssignmentOutcome {
            variant,
            assignment,
            newly_assigned: false,
        })
    }

    /// Persist a new assignment and apply its visitor counters.
    /// Losing a uniqueness race returns the winner's record instead.
    async fn place(
        &self,
        campaign: &Campaign,
        visitor_id: VisitorId,
        variant: &Variant,
        method: AssignmentMethod,
        bucket: Option<Bucket>,
    ) -> Result<AssignmentOutcome> {
        let draft = Assignment::create(campaign.id().clone(), variant.id().clone(), visitor_id.clone(), method);

        let assignment = match self.store.create_assignment(&draft).await {
            Ok(assignment) => assignment,
            Err(RepositoryError::Conflict(reason)) => {
                let existing = self
                    .store
                    .find_assignment(campaign.id(), &visitor_id)
                    .await?
                    .ok_or_else(|| ExperimentError::StorageConflict(reason.clone()))?;

                info!(
                    campaign_id = %campaign.id(),
                    visitor_id = %visitor_id,
                    variant_id = %existing.variant_id(),
                    %reason,
                    "Recovered concurrent assignment, returning existing record"
                );
                return self.existing_outcome(campaign, existing);
            }
            Err(e) => return Err(e.into()),
        };

        let (assignment, _) = self
            .apply_marks(assignment, &[TallyMark::VariantVisitor, TallyMark::CampaignVisitor])
            .await?;

        info!(
            campaign_id = %campaign.id(),
            visitor_id = %visitor_id,
            variant_id = %variant.id(),
            method = %method,
            bucket = bucket.map(|b| b.value()),
            "Visitor assigned"
        );

        self.publish(vec![ExperimentEvent::VisitorAssigned {
            campaign_id: campaign.id().clone(),
            variant_id: variant.id().clone(),
            visitor_id,
            method,
            bucket,
            assigned_at: assignment.created_at(),
        }])
        .await;

        Ok(AssignmentOutcome {
            variant: variant.clone(),
            assignment,
            newly_assigned: true,
        })
    }

    /// Apply counter side effects one at a time, marking each in the tally right after
    /// its increment. Conversion rates are recomputed when a conversion counter moved.
    async fn apply_marks(&self, mut assignment: Assignment, marks: &[TallyMark]) -> Result<(Assignment, usize)> {
        let mut variant_stats = None;
        let mut campaign_stats = None;
        let mut applied = 0;

        for mark in marks {
            if assignment.tally().is_marked(*mark) {
                continue;
            }

            match self.increment(&assignment, *mark).await? {
                Counters::Variant(stats) if mark.is_conversion() => variant_stats = Some(stats),
                Counters::Campaign(stats) if mark.is_conversion() => campaign_stats = Some(stats),
                _ => {}
            }

            assignment = match self
                .store
                .update_assignment(assignment.id(), AssignmentUpdate::Tallied(*mark))
                .await
            {
                Ok(updated) => updated,
                Err(RepositoryError::Conflict(reason)) => {
                    warn!(
                        assignment_id = %assignment.id(),
                        mark = ?mark,
                        %reason,
                        "Counter incremented for a mark another caller already set"
                    );
                    self.store
                        .find_assignment(assignment.campaign_id(), assignment.visitor_id())
                        .await?
                        .ok_or_else(|| ExperimentError::StorageConflict(reason))?
                }
                Err(e) => return Err(e.into()),
            };
            applied += 1;
        }

        if let Some(stats) = variant_stats {
            let rate = ConversionRate::percent(stats.conversions, stats.visitors);
            self.store.set_variant_conversion_rate(assignment.variant_id(), rate).await?;
        }
        if let Some(stats) = campaign_stats {
            let rate = ConversionRate::percent(stats.conversions, stats.visitors);
            self.store.set_campaign_conversion_rate(assignment.campaign_id(), rate).await?;
        }

        Ok((assignment, applied))
    }

    async fn increment(&self, assignment: &Assignment, mark: TallyMark) -> Result<Counters> {
        let counters = match mark {
            TallyMark::VariantVisitor => {
                Counters::Variant(self.store.increment_variant_visitors(assignment.variant_id()).await?)
            }
            TallyMark::CampaignVisitor => {
                Counters::Campaign(self.store.increment_campaign_visitors(assignment.campaign_id()).await?)
            }
            TallyMark::VariantConversion => {
                Counters::Variant(self.store.increment_variant_conversions(assignment.variant_id()).await?)
            }
            TallyMark::CampaignConversion => {
                Counters::Campaign(self.store.increment_campaign_conversions(assignment.campaign_id()).await?)
            }
        };
        Ok(counters)
    }

    async fn publish(&self, events: Vec<ExperimentEvent>) {
        let count = events.len();
        if let Err(e) = self.tracking.record(events).await {
            warn!(error = %e, events = count, "Failed to record tracking events");
        }
    }
}

#[async_trait]
impl ExperimentUseCases for ExperimentService {
    #[instrument(skip(self, command), fields(campaign_id = %command.campaign_id))]
    async fn assign(&self, command: AssignVisitorCommand) -> Result<AssignmentOutcome> {
        let campaign_id = EntityId::from_string(command.campaign_id);
        let visitor_id = VisitorId::new(&command.visitor_id)?;

        let campaign = self.active_campaign(&campaign_id).await?;
        if campaign.variants().is_empty() {
            return Err(ExperimentError::NoVariantsAvailable(campaign_id.to_string()));
        }

        if let Some(existing) = self.store.find_assignment(&campaign_id, &visitor_id).await? {
            debug!(visitor_id = %visitor_id, variant_id = %existing.variant_id(), "Visitor already assigned");
            return self.existing_outcome(&campaign, existing);
        }

        let bucket = visitor_id.bucket();
        let variant = VariantSelector::select(campaign.variants(), bucket)
            .ok_or_else(|| ExperimentError::NoVariantsAvailable(campaign_id.to_string()))?;

        self.place(&campaign, visitor_id, variant, AssignmentMethod::Hash, Some(bucket)).await
    }

    #[instrument(skip(self, command), fields(campaign_id = %command.campaign_id, variant_id = %command.variant_id))]
    async fn assign_to_variant(&self, command: PinVisitorCommand) -> Result<AssignmentOutcome> {
        let campaign_id = EntityId::from_string(command.campaign_id);
        let variant_id = EntityId::from_string(command.variant_id);
        let visitor_id = VisitorId::new(&command.visitor_id)?;

        let campaign = self.active_campaign(&campaign_id).await?;
        let variant = campaign.variant(&variant_id).ok_or_else(|| ExperimentError::VariantNotFound {
            campaign_id: campaign_id.to_string(),
            variant_id: variant_id.to_string(),
        })?;

        if let Some(existing) = self.store.find_assignment(&campaign_id, &visitor_id).await? {
            debug!(
                visitor_id = %visitor_id,
                assigned = %existing.variant_id(),
                requested = %variant_id,
                "Visitor already assigned, pin ignored"
            );
            return self.existing_outcome(&campaign, existing);
        }

        self.place(&campaign, visitor_id, variant, AssignmentMethod::Manual, None).await
    }

    #[instrument(skip(self, command), fields(campaign_id = %command.campaign_id))]
    async fn record_conversion(&self, command: RecordConversionCommand) -> Result<ConversionOutcome> {
        let campaign_id = EntityId::from_string(command.campaign_id);
        let visitor_id = VisitorId::new(&command.visitor_id)?;

        let not_found = || ExperimentError::AssignmentNotFound {
            campaign_id: campaign_id.to_string(),
            visitor_id: visitor_id.to_string(),
        };

        let assignment = self
            .store
            .find_assignment(&campaign_id, &visitor_id)
            .await?
            .ok_or_else(not_found)?;

        if assignment.is_converted() {
            debug!(visitor_id = %visitor_id, "Conversion already recorded");
            return Ok(ConversionOutcome {
                assignment,
                newly_converted: false,
            });
        }

        let value = command.value.unwrap_or(self.config.default_conversion_value);
        let update = AssignmentUpdate::Converted { value, at: Utc::now() };

        let assignment = match self.store.update_assignment(assignment.id(), update).await {
            Ok(assignment) => assignment,
            Err(RepositoryError::Conflict(_)) => {
                debug!(visitor_id = %visitor_id, "Conversion recorded by a concurrent request");
                let current = self
                    .store
                    .find_assignment(&campaign_id, &visitor_id)
                    .await?
                    .ok_or_else(not_found)?;
                return Ok(ConversionOutcome {
                    assignment: current,
                    newly_converted: false,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let (assignment, _) = self
            .apply_marks(assignment, &[TallyMark::VariantConversion, TallyMark::CampaignConversion])
            .await?;

        info!(
            visitor_id = %visitor_id,
            variant_id = %assignment.variant_id(),
            value,
            "Conversion recorded"
        );

        self.publish(vec![ExperimentEvent::ConversionRecorded {
            campaign_id: campaign_id.clone(),
            variant_id: assignment.variant_id().clone(),
            visitor_id,
            value,
            converted_at: assignment.converted_at().unwrap_or_else(Utc::now),
        }])
        .await;

        Ok(ConversionOutcome {
            assignment,
            newly_converted: true,
        })
    }

    #[instrument(skip(self))]
    async fn reconcile(&self, campaign_id: &EntityId) -> Result<ReconcileSummary> {
        self.load_campaign(campaign_id).await?;

        let lock = self.reconcile_locks.entry(campaign_id.to_string()).or_default().clone();
        let _guard = lock.lock().await;

        // A grace period too large to subtract means nothing is old enough yet
        let cutoff = chrono::Duration::from_std(self.config.reconcile_grace())
            .ok()
            .and_then(|grace| Utc::now().checked_sub_signed(grace));
        let incomplete = self.store.list_incomplete_assignments(campaign_id).await?;

        let mut summary = ReconcileSummary {
            campaign_id: campaign_id.to_string(),
            assignments_scanned: incomplete.len(),
            ..Default::default()
        };

        for assignment in incomplete {
            let last_touched = assignment
                .converted_at()
                .map_or(assignment.created_at(), |at| at.max(assignment.created_at()));
            if cutoff.map_or(true, |cutoff| last_touched > cutoff) {
                summary.assignments_deferred += 1;
                continue;
            }

            let assignment = match self
                .store
                .find_assignment(assignment.campaign_id(), assignment.visitor_id())
                .await?
            {
                Some(current) => current,
                None => continue,
            };
            let missing = assignment.missing_marks();
            if missing.is_empty() {
                continue;
            }

            let assignment_id = assignment.id().clone();
            let (_, applied) = self.apply_marks(assignment, &missing).await?;

            warn!(
                assignment_id = %assignment_id,
                marks = ?missing,
                applied,
                "Repaired incomplete assignment tally"
            );

            self.publish(vec![ExperimentEvent::TallyRepaired {
                campaign_id: campaign_id.clone(),
                assignment_id,
                marks: missing,
                repaired_at: Utc::now(),
            }])
            .await;

            summary.assignments_repaired += 1;
            summary.increments_applied += applied;
        }

        if summary.assignments_repaired > 0 {
            info!(
                repaired = summary.assignments_repaired,
                increments = summary.increments_applied,
                deferred = summary.assignments_deferred,
                "Reconcile finished"
            );
        }

        Ok(summary)
    }

    async fn campaign_report(&self, campaign_id: &EntityId) -> Result<CampaignReport> {
        let campaign = self.load_campaign(campaign_id).await?;
        Ok(build_report(&campaign))
    }
}
