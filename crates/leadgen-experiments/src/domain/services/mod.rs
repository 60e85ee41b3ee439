//! Domain services module

use crate::domain::aggregates::{Campaign, Variant};
use crate::domain::value_objects::{Bucket, ConversionRate};

/// Picks a variant for a bucket by walking cumulative traffic weights
pub struct VariantSelector;

impl VariantSelector {
    /// Variants in selection order: heaviest first, ties by id.
    /// Storage may return rows in any order; selection must not depend on it.
    pub fn ordered(variants: &[Variant]) -> Vec<&Variant> {
        let mut ordered: Vec<&Variant> = variants.iter().collect();
        ordered.sort_by(|a, b| {
            b.traffic_weight()
                .cmp(&a.traffic_weight())
                .then_with(|| a.id().cmp(b.id()))
        });
        ordered
    }

    /// First variant whose running weight exceeds the bucket.
    /// Falls back to the last variant when weights sum below the bucket;
    /// `None` only when there are no variants at all.
    pub fn select(variants: &[Variant], bucket: Bucket) -> Option<&Variant> {
        let ordered = Self::ordered(variants);
        let target = bucket.value() as u32;

        let mut cumulative = 0u32;
        for variant in &ordered {
            cumulative += variant.traffic_weight().percent() as u32;
            if cumulative > target {
                return Some(variant);
            }
        }

        ordered.last().copied()
    }
}

/// Experiment read-side calculations
pub struct ExperimentAnalytics;

impl ExperimentAnalytics {
    /// Relative lift of a rate over the control rate, in percent
    pub fn lift(rate: f64, control_rate: f64) -> Option<f64> {
        if control_rate <= 0.0 {
            return None;
        }
        Some((rate - control_rate) / control_rate * 100.0)
    }

    /// Variant with the best conversion rate among those that have seen traffic.
    /// Ties keep selection order.
    pub fn leader(campaign: &Campaign) -> Option<&Variant> {
        let mut best: Option<(&Variant, f64)> = None;
        for variant in VariantSelector::ordered(campaign.variants()) {
            let stats = variant.stats();
            if stats.visitors == 0 {
                continue;
            }
            let rate = ConversionRate::percent(stats.conversions, stats.visitors);
            match best {
                Some((_, best_rate)) if rate <= best_rate => {}
                _ => best = Some((variant, rate)),
            }
        }
        best.map(|(variant, _)| variant)
    }
}
