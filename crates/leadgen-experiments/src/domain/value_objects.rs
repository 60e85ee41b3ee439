//! Value Objects
//!
//! Immutable, validated domain primitives.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Identifier value object for entities
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(String);

impl EntityId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Visitor identity
// =============================================================================

/// Stable token identifying a visitor across requests (usually a cookie value).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VisitorId(String);

impl VisitorId {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, VisitorIdError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(VisitorIdError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Deterministic bucket for this visitor
    pub fn bucket(&self) -> Bucket {
        Bucket::for_visitor(self)
    }
}

impl TryFrom<String> for VisitorId {
    type Error = VisitorIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VisitorId> for String {
    fn from(value: VisitorId) -> Self {
        value.0
    }
}

impl std::fmt::Display for VisitorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VisitorIdError {
    #[error("visitor id must not be empty")]
    Empty,
}

// =============================================================================
// Bucketing
// =============================================================================

/// Number of buckets visitors are spread over; weights are percentages of it.
pub const BUCKET_COUNT: u32 = 100;

/// A visitor's position in [0, 99]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Bucket(u8);

impl Bucket {
    /// Derive the bucket from the first four bytes of the visitor id's SHA-256 digest.
    pub fn for_visitor(visitor: &VisitorId) -> Self {
        Self::from_hash(hash_visitor(visitor.as_str()))
    }

    pub fn from_hash(hash: u32) -> Self {
        Self((hash % BUCKET_COUNT) as u8)
    }

    /// Bucket with an explicit value, clamped into range.
    pub fn new(value: u8) -> Self {
        Self(value.min((BUCKET_COUNT - 1) as u8))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

/// Stable 32-bit hash of a visitor token.
pub fn hash_visitor(token: &str) -> u32 {
    let digest = Sha256::digest(token.as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

// =============================================================================
// Traffic weights and rates
// =============================================================================

/// Share of campaign traffic, as a whole percentage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct TrafficWeight(u8);

impl TrafficWeight {
    pub const MAX: u8 = 100;

    pub fn new(percent: u8) -> Result<Self, TrafficWeightError> {
        if percent > Self::MAX {
            return Err(TrafficWeightError::OutOfRange(percent));
        }
        Ok(Self(percent))
    }

    pub fn percent(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for TrafficWeight {
    type Error = TrafficWeightError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TrafficWeight> for u8 {
    fn from(value: TrafficWeight) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrafficWeightError {
    #[error("traffic weight {0} exceeds 100%")]
    OutOfRange(u8),
}

/// Conversion rate as a percentage.
pub struct ConversionRate;

impl ConversionRate {
    pub fn percent(conversions: u64, visitors: u64) -> f64 {
        if visitors == 0 {
            return 0.0;
        }
        conversions as f64 * 100.0 / visitors as f64
    }
}

/// How a visitor ended up in a variant
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentMethod {
    /// Picked by the visitor's bucket
    #[default]
    Hash,
    /// Pinned by an operator
    Manual,
}

impl AssignmentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hash => "hash",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for AssignmentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
