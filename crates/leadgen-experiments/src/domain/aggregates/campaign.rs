//! Campaign Aggregate
//!
//! An experiment on one landing URL whose variants compete for traffic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{ConversionRate, EntityId, TrafficWeight};

/// Campaign aggregate root
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Campaign {
    id: EntityId,
    name: String,
    status: CampaignStatus,
    variants: Vec<Variant>,
    stats: CampaignStats,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    #[default]
    Draft,
    Active,
    Paused,
    Completed,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Campaign-wide counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignStats {
    pub visitors: u64,
    pub conversions: u64,
    /// Percentage, derived from the two counters
    pub conversion_rate: f64,
}

/// Per-variant counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantStats {
    pub visitors: u64,
    pub conversions: u64,
    /// Percentage, derived from the two counters
    pub conversion_rate: f64,
}

/// One treatment within a campaign
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Variant {
    id: EntityId,
    campaign_id: EntityId,
    name: String,
    traffic_weight: TrafficWeight,
    is_control: bool,
    stats: VariantStats,
}

impl Variant {
    pub fn id(&self) -> &EntityId { &self.id }
    pub fn campaign_id(&self) -> &EntityId { &self.campaign_id }
    pub fn name(&self) -> &str { &self.name }
    pub fn traffic_weight(&self) -> TrafficWeight { self.traffic_weight }
    pub fn is_control(&self) -> bool { self.is_control }
    pub fn stats(&self) -> &VariantStats { &self.stats }

    pub fn record_visitor(&mut self) -> VariantStats {
        self.stats.visitors += 1;
        self.stats
    }

    pub fn record_conversion(&mut self) -> VariantStats {
        self.stats.conversions += 1;
        self.stats
    }

    pub fn set_conversion_rate(&mut self, rate: f64) {
        self.stats.conversion_rate = rate;
    }

    /// Rate recomputed from the current counters
    pub fn computed_conversion_rate(&self) -> f64 {
        ConversionRate::percent(self.stats.conversions, self.stats.visitors)
    }
}

impl Campaign {
    /// Create a new draft campaign (factory method)
    pub fn create(name: impl Into<String>) -> Self {
        Self::with_id(EntityId::new(), name)
    }

    pub fn with_id(id: EntityId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            status: CampaignStatus::Draft,
            variants: vec![],
            stats: CampaignStats::default(),
            created_at: now,
            updated_at: now,
        }
    }

    // =========================================================================
    // Getters
    // =========================================================================

    pub fn id(&self) -> &EntityId { &self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn status(&self) -> CampaignStatus { self.status }
    pub fn is_active(&self) -> bool { self.status == CampaignStatus::Active }
    pub fn variants(&self) -> &[Variant] { &self.variants }
    pub fn stats(&self) -> &CampaignStats { &self.stats }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub fn variant(&self, id: &EntityId) -> Option<&Variant> {
        self.variants.iter().find(|v| &v.id == id)
    }

    pub fn variant_mut(&mut self, id: &EntityId) -> Option<&mut Variant> {
        self.variants.iter_mut().find(|v| &v.id == id)
    }

    pub fn control(&self) -> Option<&Variant> {
        self.variants.iter().find(|v| v.is_control)
    }

    /// Sum of all variant weights; may exceed 100 for campaigns that skipped activation checks
    pub fn total_weight(&self) -> u32 {
        self.variants.iter().map(|v| v.traffic_weight.percent() as u32).sum()
    }

    // =========================================================================
    // Setup (draft only)
    // =========================================================================

    /// Add a variant; only allowed while the campaign is a draft
    pub fn add_variant(
        &mut self,
        name: impl Into<String>,
        traffic_weight: TrafficWeight,
        is_control: bool,
    ) -> Result<EntityId, CampaignError> {
        self.add_variant_with_id(EntityId::new(), name, traffic_weight, is_control)
    }

    pub fn add_variant_with_id(
        &mut self,
        id: EntityId,
        name: impl Into<String>,
        traffic_weight: TrafficWeight,
        is_control: bool,
    ) -> Result<EntityId, CampaignError> {
        if self.status != CampaignStatus::Draft {
            return Err(CampaignError::NotDraft(self.status));
        }
        if self.variants.iter().any(|v| v.id == id) {
            return Err(CampaignError::DuplicateVariant(id));
        }
        if is_control && self.control().is_some() {
            return Err(CampaignError::MultipleControls);
        }

        self.variants.push(Variant {
            id: id.clone(),
            campaign_id: self.id.clone(),
            name: name.into(),
            traffic_weight,
            is_control,
            stats: VariantStats::default(),
        });
        self.touch();
        Ok(id)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start serving traffic. Weights below 100% are allowed; the last variant absorbs the gap.
    pub fn activate(&mut self) -> Result<(), CampaignError> {
        if self.status != CampaignStatus::Draft {
            return Err(CampaignError::InvalidTransition { from: self.status, to: CampaignStatus::Active });
        }
        if self.variants.is_empty() {
            return Err(CampaignError::NoVariants);
        }
        let total = self.total_weight();
        if total > TrafficWeight::MAX as u32 {
            return Err(CampaignError::OverAllocated(total));
        }
        self.status = CampaignStatus::Active;
        self.touch();
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), CampaignError> {
        self.transition(CampaignStatus::Active, CampaignStatus::Paused)
    }

    pub fn resume(&mut self) -> Result<(), CampaignError> {
        self.transition(CampaignStatus::Paused, CampaignStatus::Active)
    }

    pub fn complete(&mut self) -> Result<(), CampaignError> {
        match self.status {
            CampaignStatus::Active | CampaignStatus::Paused => {
                self.status = CampaignStatus::Completed;
                self.touch();
                Ok(())
            }
            from => Err(CampaignError::InvalidTransition { from, to: CampaignStatus::Completed }),
        }
    }

    // =========================================================================
    // Counters
    // =========================================================================

    pub fn record_visitor(&mut self) -> CampaignStats {
        self.stats.visitors += 1;
        self.touch();
        self.stats
    }

    pub fn record_conversion(&mut self) -> CampaignStats {
        self.stats.conversions += 1;
        self.touch();
        self.stats
    }

    pub fn set_conversion_rate(&mut self, rate: f64) {
        self.stats.conversion_rate = rate;
        self.touch();
    }

    /// Take campaign and per-variant counters from the stored copy.
    /// Variants the stored copy does not know keep their own counters.
    pub fn adopt_counters(&mut self, stored: &Campaign) {
        self.stats = stored.stats;
        for variant in &mut self.variants {
            if let Some(current) = stored.variant(&variant.id) {
                variant.stats = current.stats;
            }
        }
    }

    fn transition(&mut self, from: CampaignStatus, to: CampaignStatus) -> Result<(), CampaignError> {
        if self.status != from {
            return Err(CampaignError::InvalidTransition { from: self.status, to });
        }
        self.status = to;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CampaignError {
    #[error("campaign has no variants")]
    NoVariants,

    #[error("variant weights add up to {0}%, more than 100%")]
    OverAllocated(u32),

    #[error("variants can only be changed on a draft campaign (status: {0})")]
    NotDraft(CampaignStatus),

    #[error("variant {0} already exists")]
    DuplicateVariant(EntityId),

    #[error("campaign already has a control variant")]
    MultipleControls,

    #[error("cannot move campaign from {from} to {to}")]
    InvalidTransition { from: CampaignStatus, to: CampaignStatus },
}
