//! Infrastructure layer
//!
//! Concrete adapters for the outbound ports.

pub mod persistence;
pub mod tracking;

pub use persistence::InMemoryExperimentStore;
pub use tracking::{InMemoryTrackingSink, NoOpTrackingSink, TracingTrackingSink};
