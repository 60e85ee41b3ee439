//! Leadgen Experiments
//!
//! A/B testing for the quote funnel: deterministic variant assignment and
//! conversion tracking, structured as a hexagonal bounded context.
//!
//! ## Architecture
//!
//! - **Domain Layer**: Campaign and Assignment aggregates, bucketing, variant selection
//! - **Application Layer**: `ExperimentService` use case orchestration, DTOs, reports
//! - **Ports Layer**: `ExperimentStore` and `TrackingSink` outbound ports, `ExperimentUseCases` inbound port
//! - **Infrastructure Layer**: In-memory store and tracking sinks
//!
//! ## Assignment
//!
//! A visitor id hashes to a bucket in `[0, 99]`. Variants are ordered by
//! descending traffic weight (ties by id) and the first one whose cumulative
//! weight exceeds the bucket wins; if weights sum below the bucket the last
//! variant in that order takes the visitor. Each (campaign, visitor) pair is
//! assigned once and counted once.
//!
//! ```no_run
//! use std::sync::Arc;
//! use leadgen_experiments::{
//!     AssignVisitorCommand, ExperimentConfig, ExperimentService, ExperimentUseCases,
//!     InMemoryExperimentStore, NoOpTrackingSink,
//! };
//!
//! # async fn run() -> leadgen_experiments::Result<()> {
//! let service = ExperimentService::new(
//!     Arc::new(InMemoryExperimentStore::new()),
//!     Arc::new(NoOpTrackingSink),
//!     ExperimentConfig::default(),
//! );
//! let outcome = service.assign(AssignVisitorCommand::new("campaign-id", "visitor-cookie")).await?;
//! println!("serving {}", outcome.variant.name());
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod ports;

// Re-exports for convenience
pub use application::{
    AssignVisitorCommand, AssignmentOutcome, CampaignReport, ConversionOutcome, ExperimentService,
    PinVisitorCommand, ReconcileSummary, RecordConversionCommand, VariantReport,
};
pub use config::ExperimentConfig;
pub use domain::aggregates::{
    Assignment, AssignmentTally, Campaign, CampaignError, CampaignStats, CampaignStatus, TallyMark, Variant,
    VariantStats,
};
pub use domain::events::ExperimentEvent;
pub use domain::services::{ExperimentAnalytics, VariantSelector};
pub use domain::value_objects::{AssignmentMethod, Bucket, EntityId, TrafficWeight, VisitorId};
pub use error::{ExperimentError, Result};
pub use infrastructure::{InMemoryExperimentStore, InMemoryTrackingSink, NoOpTrackingSink, TracingTrackingSink};
pub use ports::inbound::ExperimentUseCases;
pub use ports::outbound::{AssignmentUpdate, ExperimentStore, RepoResult, RepositoryError, TrackingSink};
