//! Simulate commands
//!
//! Replays synthetic visitors through the experiment engine against an
//! in-memory store and prints the resulting campaign report.

use std::collections::HashMap;
use std::sync::Arc;

use colored::*;
use leadgen_experiments::{
    AssignVisitorCommand, CampaignReport, ExperimentService, ExperimentStore, ExperimentUseCases,
    InMemoryExperimentStore, RecordConversionCommand, TracingTrackingSink,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tabled::Tabled;

use super::CampaignFile;
use crate::config::Config;
use crate::output::{render_table, OutputFormat};

pub struct SimulateOptions {
    pub campaign_path: String,
    pub visitors: u64,
    pub conversion_rate: f64,
    pub seed: Option<u64>,
}

#[derive(Debug, Serialize, Tabled)]
pub struct VariantRow {
    pub variant: String,
    pub control: String,
    pub weight: String,
    pub visitors: u64,
    pub conversions: u64,
    pub rate: String,
    pub lift: String,
}

impl VariantRow {
    fn from_report(report: &CampaignReport) -> Vec<Self> {
        report
            .variants
            .iter()
            .map(|v| Self {
                variant: v.name.clone(),
                control: if v.is_control { "yes".into() } else { String::new() },
                weight: format!("{}%", v.traffic_weight),
                visitors: v.visitors,
                conversions: v.conversions,
                rate: format!("{:.2}%", v.conversion_rate),
                lift: v
                    .lift_vs_control
                    .map(|l| format!("{:+.1}%", l))
                    .unwrap_or_else(|| "-".into()),
            })
            .collect()
    }
}

fn check_probability(label: &str, p: f64) -> Result<f64, String> {
    if (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(format!("{} must be between 0 and 1, got {}", label, p))
    }
}

pub async fn handle(options: SimulateOptions, config: &Config, format: OutputFormat) -> Result<(), String> {
    let definition = CampaignFile::load(&options.campaign_path)?;
    let campaign = definition.build()?;
    let campaign_id = campaign.id().clone();

    let default_rate = check_probability("--conversion-rate", options.conversion_rate)?;
    let mut rates = HashMap::new();
    for variant in &definition.variants {
        let p = variant.conversion_rate.unwrap_or(default_rate);
        rates.insert(variant.id.clone(), check_probability(&format!("variant {} conversion_rate", variant.id), p)?);
    }

    let store = Arc::new(InMemoryExperimentStore::new());
    store.save_campaign(&campaign).await.map_err(|e| e.to_string())?;
    let service = ExperimentService::new(store, Arc::new(TracingTrackingSink), config.engine());

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    tracing::info!(
        campaign_id = %campaign_id,
        visitors = options.visitors,
        seed = ?options.seed,
        "Starting simulation"
    );

    for i in 0..options.visitors {
        let visitor = format!("sim-visitor-{}", i);
        let outcome = service
            .assign(AssignVisitorCommand::new(campaign_id.as_str(), visitor.as_str()))
            .await
            .map_err(|e| e.to_string())?;

        let p = rates.get(outcome.variant.id().as_str()).copied().unwrap_or(default_rate);
        if rng.gen_bool(p) {
            service
                .record_conversion(RecordConversionCommand::new(campaign_id.as_str(), visitor, None))
                .await
                .map_err(|e| e.to_string())?;
        }
    }

    let summary = service.reconcile(&campaign_id).await.map_err(|e| e.to_string())?;
    if summary.assignments_scanned > 0 {
        tracing::warn!(?summary, "Simulation left incomplete tallies");
    }

    let report = service.campaign_report(&campaign_id).await.map_err(|e| e.to_string())?;

    if !format.is_table() {
        format.print(&report);
        return Ok(());
    }

    println!(
        "{} ({}) {}",
        report.name.bold(),
        report.campaign_id,
        report.status.dimmed()
    );
    println!(
        "{} visitors, {} conversions, {:.2}% overall",
        report.visitors, report.conversions, report.conversion_rate
    );
    println!("{}", render_table(&VariantRow::from_report(&report)));

    match &report.leading_variant_id {
        Some(id) => {
            let name = report
                .variants
                .iter()
                .find(|v| &v.variant_id == id)
                .map(|v| v.name.as_str())
                .unwrap_or(id.as_str());
            println!("Leading: {}", name.green().bold());
        }
        None => println!("{}", "No conversions yet".yellow()),
    }

    Ok(())
}
