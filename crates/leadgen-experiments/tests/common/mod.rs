#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use leadgen_experiments::{
    Assignment, AssignmentUpdate, Campaign, CampaignStats, EntityId, ExperimentConfig, ExperimentService,
    ExperimentStore, InMemoryExperimentStore, InMemoryTrackingSink, RepoResult, RepositoryError, TrafficWeight,
    VariantStats, VisitorId,
};

pub const CAMPAIGN: &str = "auto-quote-hero";

pub struct Harness<S: ExperimentStore + 'static> {
    pub store: Arc<S>,
    pub sink: Arc<InMemoryTrackingSink>,
    pub service: Arc<ExperimentService>,
}

pub fn harness() -> Harness<InMemoryExperimentStore> {
    harness_with(InMemoryExperimentStore::new(), ExperimentConfig::default())
}

pub fn harness_with<S: ExperimentStore + 'static>(store: S, config: ExperimentConfig) -> Harness<S> {
    let store = Arc::new(store);
    let sink = Arc::new(InMemoryTrackingSink::new());
    let service = Arc::new(ExperimentService::new(store.clone(), sink.clone(), config));
    Harness { store, sink, service }
}

/// Campaign `CAMPAIGN` with variants named by id; the first one is the control
pub fn campaign(weights: &[(&str, u8)]) -> Campaign {
    let mut campaign = Campaign::with_id(EntityId::from_string(CAMPAIGN), "Auto quote hero");
    for (i, (id, weight)) in weights.iter().enumerate() {
        campaign
            .add_variant_with_id(EntityId::from_string(*id), *id, TrafficWeight::new(*weight).unwrap(), i == 0)
            .unwrap();
    }
    campaign
}

pub async fn seed_active(store: &dyn ExperimentStore, weights: &[(&str, u8)]) -> Campaign {
    let mut c = campaign(weights);
    c.activate().unwrap();
    store.save_campaign(&c).await.unwrap();
    c
}

pub async fn stored_campaign(store: &dyn ExperimentStore) -> Campaign {
    store
        .find_campaign(&EntityId::from_string(CAMPAIGN))
        .await
        .unwrap()
        .unwrap()
}

pub fn campaign_id() -> EntityId {
    EntityId::from_string(CAMPAIGN)
}

/// First `n` synthetic visitor ids whose bucket satisfies `predicate`
pub fn visitors_where(n: usize, predicate: impl Fn(u8) -> bool) -> Vec<String> {
    (0..)
        .map(|i| format!("visitor-{i}"))
        .filter(|id| predicate(VisitorId::new(id).unwrap().bucket().value()))
        .take(n)
        .collect()
}

/// Store wrapper that fails selected operations a fixed number of times
#[derive(Default)]
pub struct FlakyStore {
    pub inner: InMemoryExperimentStore,
    pub fail_campaign_visitors: AtomicUsize,
    pub fail_variant_conversions: AtomicUsize,
    pub fail_find_campaign: AtomicUsize,
}

impl FlakyStore {
    fn trip(counter: &AtomicUsize, op: &str) -> RepoResult<()> {
        let tripped = counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if tripped {
            return Err(RepositoryError::Unavailable(format!("{op}: connection reset")));
        }
        Ok(())
    }
}

#[async_trait]
impl ExperimentStore for FlakyStore {
    async fn find_campaign(&self, id: &EntityId) -> RepoResult<Option<Campaign>> {
        Self::trip(&self.fail_find_campaign, "find_campaign")?;
        self.inner.find_campaign(id).await
    }

    async fn save_campaign(&self, campaign: &Campaign) -> RepoResult<()> {
        self.inner.save_campaign(campaign).await
    }

    async fn find_assignment(&self, campaign_id: &EntityId, visitor_id: &VisitorId) -> RepoResult<Option<Assignment>> {
        self.inner.find_assignment(campaign_id, visitor_id).await
    }

    async fn create_assignment(&self, assignment: &Assignment) -> RepoResult<Assignment> {
        self.inner.create_assignment(assignment).await
    }

    async fn update_assignment(&self, id: &EntityId, update: AssignmentUpdate) -> RepoResult<Assignment> {
        self.inner.update_assignment(id, update).await
    }

    async fn list_incomplete_assignments(&self, campaign_id: &EntityId) -> RepoResult<Vec<Assignment>> {
        self.inner.list_incomplete_assignments(campaign_id).await
    }

    async fn increment_variant_visitors(&self, variant_id: &EntityId) -> RepoResult<VariantStats> {
        self.inner.increment_variant_visitors(variant_id).await
    }

    async fn increment_campaign_visitors(&self, campaign_id: &EntityId) -> RepoResult<CampaignStats> {
        Self::trip(&self.fail_campaign_visitors, "increment_campaign_visitors")?;
        self.inner.increment_campaign_visitors(campaign_id).await
    }

    async fn increment_variant_conversions(&self, variant_id: &EntityId) -> RepoResult<VariantStats> {
        Self::trip(&self.fail_variant_conversions, "increment_variant_conversions")?;
        self.inner.increment_variant_conversions(variant_id).await
    }

    async fn increment_campaign_conversions(&self, campaign_id: &EntityId) -> RepoResult<CampaignStats> {
        self.inner.increment_campaign_conversions(campaign_id).await
    }

    async fn set_variant_conversion_rate(&self, variant_id: &EntityId, rate: f64) -> RepoResult<()> {
        self.inner.set_variant_conversion_rate(variant_id, rate).await
    }

    async fn set_campaign_conversion_rate(&self, campaign_id: &EntityId, rate: f64) -> RepoResult<()> {
        self.inner.set_campaign_conversion_rate(campaign_id, rate).await
    }
}
