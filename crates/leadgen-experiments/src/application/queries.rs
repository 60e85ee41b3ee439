//! Read-side projections

use chrono::Utc;

use crate::application::dto::{CampaignReport, VariantReport};
use crate::domain::aggregates::Campaign;
use crate::domain::services::{ExperimentAnalytics, VariantSelector};
use crate::domain::value_objects::ConversionRate;

/// Build the results view for a campaign. Rates are recomputed from the counters
/// rather than read from the stored derived fields.
pub fn build_report(campaign: &Campaign) -> CampaignReport {
    let control_rate = campaign
        .control()
        .map(|c| ConversionRate::percent(c.stats().conversions, c.stats().visitors));

    let variants = VariantSelector::ordered(campaign.variants())
        .into_iter()
        .map(|variant| {
            let stats = variant.stats();
            let rate = ConversionRate::percent(stats.conversions, stats.visitors);
            let lift_vs_control = match control_rate {
                Some(control) if !variant.is_control() => ExperimentAnalytics::lift(rate, control),
                _ => None,
            };

            VariantReport {
                variant_id: variant.id().to_string(),
                name: variant.name().to_string(),
                is_control: variant.is_control(),
                traffic_weight: variant.traffic_weight().percent(),
                visitors: stats.visitors,
                conversions: stats.conversions,
                conversion_rate: rate,
                lift_vs_control,
            }
        })
        .collect();

    let stats = campaign.stats();
    CampaignReport {
        campaign_id: campaign.id().to_string(),
        name: campaign.name().to_string(),
        status: campaign.status().to_string(),
        visitors: stats.visitors,
        conversions: stats.conversions,
        conversion_rate: ConversionRate::percent(stats.conversions, stats.visitors),
        total_weight: campaign.total_weight(),
        variants,
        leading_variant_id: ExperimentAnalytics::leader(campaign).map(|v| v.id().to_string()),
        generated_at: Utc::now(),
    }
}
