//! In-memory store
//!
//! Backs tests, the simulation CLI and single-node deployments. Each `DashMap`
//! entry is exclusively locked while mutated, so counter increments and
//! insert-if-absent are atomic with respect to concurrent callers.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::aggregates::{Assignment, Campaign, CampaignStats, Variant, VariantStats};
use crate::domain::value_objects::{EntityId, VisitorId};
use crate::ports::outbound::{AssignmentUpdate, ExperimentStore, RepoResult, RepositoryError};

type PairKey = (String, String);

#[derive(Default)]
pub struct InMemoryExperimentStore {
    campaigns: DashMap<String, Campaign>,
    /// variant id -> campaign id
    variant_index: DashMap<String, String>,
    /// (campaign id, visitor id) -> assignment; the key is the uniqueness constraint
    assignments: DashMap<PairKey, Assignment>,
    /// assignment id -> (campaign id, visitor id)
    assignment_index: DashMap<String, PairKey>,
}

impl InMemoryExperimentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assignment_count(&self) -> usize {
        self.assignments.len()
    }

    fn pair_key(campaign_id: &EntityId, visitor_id: &VisitorId) -> PairKey {
        (campaign_id.as_str().to_string(), visitor_id.as_str().to_string())
    }

    fn campaign_of_variant(&self, variant_id: &EntityId) -> RepoResult<String> {
        self.variant_index
            .get(variant_id.as_str())
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RepositoryError::NotFound(format!("variant {}", variant_id)))
    }

    fn with_campaign<T>(&self, campaign_id: &str, f: impl FnOnce(&mut Campaign) -> T) -> RepoResult<T> {
        let mut campaign = self
            .campaigns
            .get_mut(campaign_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("campaign {}", campaign_id)))?;
        Ok(f(&mut campaign))
    }

    fn with_variant<T>(&self, variant_id: &EntityId, f: impl FnOnce(&mut Variant) -> T) -> RepoResult<T> {
        let campaign_id = self.campaign_of_variant(variant_id)?;
        self.with_campaign(&campaign_id, |campaign| campaign.variant_mut(variant_id).map(f))?
            .ok_or_else(|| RepositoryError::NotFound(format!("variant {}", variant_id)))
    }
}

#[async_trait]
impl ExperimentStore for InMemoryExperimentStore {
    async fn find_campaign(&self, id: &EntityId) -> RepoResult<Option<Campaign>> {
        Ok(self.campaigns.get(id.as_str()).map(|entry| entry.value().clone()))
    }

    async fn save_campaign(&self, campaign: &Campaign) -> RepoResult<()> {
        for variant in campaign.variants() {
            self.variant_index
                .insert(variant.id().to_string(), campaign.id().to_string());
        }
        match self.campaigns.entry(campaign.id().to_string()) {
            Entry::Occupied(mut slot) => {
                let mut incoming = campaign.clone();
                incoming.adopt_counters(slot.get());
                slot.insert(incoming);
            }
            Entry::Vacant(slot) => {
                slot.insert(campaign.clone());
            }
        }
        Ok(())
    }

    async fn find_assignment(
        &self,
        campaign_id: &EntityId,
        visitor_id: &VisitorId,
    ) -> RepoResult<Option<Assignment>> {
        let key = Self::pair_key(campaign_id, visitor_id);
        Ok(self.assignments.get(&key).map(|entry| entry.value().clone()))
    }

    async fn create_assignment(&self, assignment: &Assignment) -> RepoResult<Assignment> {
        let key = Self::pair_key(assignment.campaign_id(), assignment.visitor_id());
        match self.assignments.entry(key.clone()) {
            Entry::Occupied(_) => Err(RepositoryError::Conflict(format!(
                "visitor {} already assigned in campaign {}",
                key.1, key.0
            ))),
            Entry::Vacant(slot) => {
                self.assignment_index.insert(assignment.id().to_string(), key);
                slot.insert(assignment.clone());
                Ok(assignment.clone())
            }
        }
    }

    async fn update_assignment(&self, id: &EntityId, update: AssignmentUpdate) -> RepoResult<Assignment> {
        let key = self
            .assignment_index
            .get(id.as_str())
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RepositoryError::NotFound(format!("assignment {}", id)))?;

        let mut assignment = self
            .assignments
            .get_mut(&key)
            .ok_or_else(|| RepositoryError::NotFound(format!("assignment {}", id)))?;

        match update {
            AssignmentUpdate::Tallied(mark) => {
                if assignment.tally().is_marked(mark) {
                    return Err(RepositoryError::Conflict(format!("assignment {}: {:?} already tallied", id, mark)));
                }
                assignment.mark(mark)
            }
            AssignmentUpdate::Converted { value, at } => assignment
                .convert(value, at)
                .map_err(|e| RepositoryError::Conflict(format!("assignment {}: {}", id, e)))?,
        }

        Ok(assignment.clone())
    }

    async fn list_incomplete_assignments(&self, campaign_id: &EntityId) -> RepoResult<Vec<Assignment>> {
        Ok(self
            .assignments
            .iter()
            .filter(|entry| entry.key().0 == campaign_id.as_str() && !entry.value().is_fully_tallied())
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn increment_variant_visitors(&self, variant_id: &EntityId) -> RepoResult<VariantStats> {
        self.with_variant(variant_id, |variant| variant.record_visitor())
    }

    async fn increment_campaign_visitors(&self, campaign_id: &EntityId) -> RepoResult<CampaignStats> {
        self.with_campaign(campaign_id.as_str(), |campaign| campaign.record_visitor())
    }

    async fn increment_variant_conversions(&self, variant_id: &EntityId) -> RepoResult<VariantStats> {
        self.with_variant(variant_id, |variant| variant.record_conversion())
    }

    async fn increment_campaign_conversions(&self, campaign_id: &EntityId) -> RepoResult<CampaignStats> {
        self.with_campaign(campaign_id.as_str(), |campaign| campaign.record_conversion())
    }

    async fn set_variant_conversion_rate(&self, variant_id: &EntityId, rate: f64) -> RepoResult<()> {
        self.with_variant(variant_id, |variant| variant.set_conversion_rate(rate))
    }

    async fn set_campaign_conversion_rate(&self, campaign_id: &EntityId, rate: f64) -> RepoResult<()> {
        self.with_campaign(campaign_id.as_str(), |campaign| campaign.set_conversion_rate(rate))
    }
}
