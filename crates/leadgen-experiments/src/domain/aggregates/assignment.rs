//! Assignment Aggregate
//!
//! Durable binding of one visitor to one variant within one campaign.
//! Unique per (campaign, visitor).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{AssignmentMethod, EntityId, VisitorId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    id: EntityId,
    campaign_id: EntityId,
    variant_id: EntityId,
    visitor_id: VisitorId,
    method: AssignmentMethod,
    converted: bool,
    conversion_value: Option<f64>,
    tally: AssignmentTally,
    created_at: DateTime<Utc>,
    converted_at: Option<DateTime<Utc>>,
}

/// Counter side effects already applied for an assignment
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentTally {
    pub variant_visitor: bool,
    pub campaign_visitor: bool,
    pub variant_conversion: bool,
    pub campaign_conversion: bool,
}

/// A single counter side effect
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TallyMark {
    VariantVisitor,
    CampaignVisitor,
    VariantConversion,
    CampaignConversion,
}

impl TallyMark {
    pub fn is_conversion(&self) -> bool {
        matches!(self, Self::VariantConversion | Self::CampaignConversion)
    }
}

impl AssignmentTally {
    pub fn is_marked(&self, mark: TallyMark) -> bool {
        match mark {
            TallyMark::VariantVisitor => self.variant_visitor,
            TallyMark::CampaignVisitor => self.campaign_visitor,
            TallyMark::VariantConversion => self.variant_conversion,
            TallyMark::CampaignConversion => self.campaign_conversion,
        }
    }

    pub fn mark(&mut self, mark: TallyMark) {
        match mark {
            TallyMark::VariantVisitor => self.variant_visitor = true,
            TallyMark::CampaignVisitor => self.campaign_visitor = true,
            TallyMark::VariantConversion => self.variant_conversion = true,
            TallyMark::CampaignConversion => self.campaign_conversion = true,
        }
    }

    /// Marks that should be set but are not, given the conversion state
    pub fn missing(&self, converted: bool) -> Vec<TallyMark> {
        let mut expected = vec![TallyMark::VariantVisitor, TallyMark::CampaignVisitor];
        if converted {
            expected.push(TallyMark::VariantConversion);
            expected.push(TallyMark::CampaignConversion);
        }
        expected.into_iter().filter(|m| !self.is_marked(*m)).collect()
    }
}

impl Assignment {
    /// Create a fresh, unconverted assignment with an empty tally
    pub fn create(
        campaign_id: EntityId,
        variant_id: EntityId,
        visitor_id: VisitorId,
        method: AssignmentMethod,
    ) -> Self {
        Self {
            id: EntityId::new(),
            campaign_id,
            variant_id,
            visitor_id,
            method,
            converted: false,
            conversion_value: None,
            tally: AssignmentTally::default(),
            created_at: Utc::now(),
            converted_at: None,
        }
    }

    pub fn id(&self) -> &EntityId { &self.id }
    pub fn campaign_id(&self) -> &EntityId { &self.campaign_id }
    pub fn variant_id(&self) -> &EntityId { &self.variant_id }
    pub fn visitor_id(&self) -> &VisitorId { &self.visitor_id }
    pub fn method(&self) -> AssignmentMethod { self.method }
    pub fn is_converted(&self) -> bool { self.converted }
    pub fn conversion_value(&self) -> Option<f64> { self.conversion_value }
    pub fn tally(&self) -> &AssignmentTally { &self.tally }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn converted_at(&self) -> Option<DateTime<Utc>> { self.converted_at }

    pub fn missing_marks(&self) -> Vec<TallyMark> {
        self.tally.missing(self.converted)
    }

    pub fn is_fully_tallied(&self) -> bool {
        self.missing_marks().is_empty()
    }

    /// Flip to converted. Never flips back; a second call is rejected.
    pub fn convert(&mut self, value: f64, at: DateTime<Utc>) -> Result<(), AssignmentError> {
        if self.converted {
            return Err(AssignmentError::AlreadyConverted);
        }
        self.converted = true;
        self.conversion_value = Some(value);
        self.converted_at = Some(at);
        Ok(())
    }

    pub fn mark(&mut self, mark: TallyMark) {
        self.tally.mark(mark);
    }

    /// Backdate creation
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssignmentError {
    #[error("assignment already converted")]
    AlreadyConverted,
}
