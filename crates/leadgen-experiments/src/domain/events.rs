//! Domain Events
//!
//! Events published to the visitor-tracking sink when experiment state changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::TallyMark;
use crate::domain::value_objects::{AssignmentMethod, Bucket, EntityId, VisitorId};

/// All events in the experiments bounded context
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExperimentEvent {
    VisitorAssigned {
        campaign_id: EntityId,
        variant_id: EntityId,
        visitor_id: VisitorId,
        method: AssignmentMethod,
        bucket: Option<Bucket>,
        assigned_at: DateTime<Utc>,
    },

    ConversionRecorded {
        campaign_id: EntityId,
        variant_id: EntityId,
        visitor_id: VisitorId,
        value: f64,
        converted_at: DateTime<Utc>,
    },

    TallyRepaired {
        campaign_id: EntityId,
        assignment_id: EntityId,
        marks: Vec<TallyMark>,
        repaired_at: DateTime<Utc>,
    },
}

impl ExperimentEvent {
    /// Campaign the event belongs to
    pub fn campaign_id(&self) -> &EntityId {
        match self {
            Self::VisitorAssigned { campaign_id, .. } => campaign_id,
            Self::ConversionRecorded { campaign_id, .. } => campaign_id,
            Self::TallyRepaired { campaign_id, .. } => campaign_id,
        }
    }

    /// Get event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::VisitorAssigned { .. } => "experiment.visitor_assigned",
            Self::ConversionRecorded { .. } => "experiment.conversion_recorded",
            Self::TallyRepaired { .. } => "experiment.tally_repaired",
        }
    }
}
