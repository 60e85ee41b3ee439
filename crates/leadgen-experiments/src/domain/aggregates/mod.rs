//! Aggregates

pub mod assignment;
pub mod campaign;

pub use assignment::{Assignment, AssignmentError, AssignmentTally, TallyMark};
pub use campaign::{Campaign, CampaignError, CampaignStats, CampaignStatus, Variant, VariantStats};
