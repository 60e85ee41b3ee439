//! Domain module
//!
//! Campaigns, variants, assignments and the bucketing rules that bind them.

pub mod aggregates;
pub mod value_objects;
pub mod events;
pub mod services;

pub use aggregates::*;
pub use value_objects::*;
pub use events::*;
