//! Data Transfer Objects (DTOs)
//!
//! Objects for transferring data across boundaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::{Assignment, Variant};
use crate::domain::value_objects::EntityId;

// =============================================================================
// Commands
// =============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssignVisitorCommand {
    pub campaign_id: String,
    pub visitor_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PinVisitorCommand {
    pub campaign_id: String,
    pub visitor_id: String,
    pub variant_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordConversionCommand {
    pub campaign_id: String,
    pub visitor_id: String,
    /// Falls back to the configured default when absent
    pub value: Option<f64>,
}

impl AssignVisitorCommand {
    pub fn new(campaign_id: impl Into<String>, visitor_id: impl Into<String>) -> Self {
        Self { campaign_id: campaign_id.into(), visitor_id: visitor_id.into() }
    }
}

impl RecordConversionCommand {
    pub fn new(campaign_id: impl Into<String>, visitor_id: impl Into<String>, value: Option<f64>) -> Self {
        Self { campaign_id: campaign_id.into(), visitor_id: visitor_id.into(), value }
    }
}

// =============================================================================
// Results
// =============================================================================

/// Result of an assignment request
#[derive(Clone, Debug)]
pub struct AssignmentOutcome {
    pub variant: Variant,
    pub assignment: Assignment,
    /// `false` when an earlier request already assigned this visitor
    pub newly_assigned: bool,
}

/// Result of a conversion request
#[derive(Clone, Debug)]
pub struct ConversionOutcome {
    pub assignment: Assignment,
    /// `false` when the assignment had already converted
    pub newly_converted: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub campaign_id: String,
    pub assignments_scanned: usize,
    pub assignments_repaired: usize,
    pub increments_applied: usize,
    /// Incomplete but still inside the grace period
    pub assignments_deferred: usize,
}

// =============================================================================
// Views (Read Models)
// =============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CampaignReport {
    pub campaign_id: String,
    pub name: String,
    pub status: String,
    pub visitors: u64,
    pub conversions: u64,
    pub conversion_rate: f64,
    pub total_weight: u32,
    pub variants: Vec<VariantReport>,
    pub leading_variant_id: Option<String>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VariantReport {
    pub variant_id: String,
    pub name: String,
    pub is_control: bool,
    pub traffic_weight: u8,
    pub visitors: u64,
    pub conversions: u64,
    pub conversion_rate: f64,
    /// Percent change against the control's rate
    pub lift_vs_control: Option<f64>,
}

impl CampaignReport {
    pub fn variant(&self, id: &EntityId) -> Option<&VariantReport> {
        self.variants.iter().find(|v| v.variant_id == id.as_str())
    }
}
