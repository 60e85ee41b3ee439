//! Bucket commands

use leadgen_experiments::domain::value_objects::hash_visitor;
use leadgen_experiments::{VariantSelector, VisitorId};
use serde::Serialize;
use tabled::Tabled;

use super::CampaignFile;
use crate::output::OutputFormat;

#[derive(Debug, Serialize, Tabled)]
pub struct BucketRow {
    pub visitor_id: String,
    pub hash: u32,
    pub bucket: u8,
    #[tabled(display_with = "display_variant")]
    pub variant: Option<String>,
}

fn display_variant(variant: &Option<String>) -> String {
    variant.clone().unwrap_or_else(|| "-".into())
}

pub fn handle(visitor_ids: &[String], campaign_path: Option<&str>, format: OutputFormat) -> Result<(), String> {
    let campaign = match campaign_path {
        Some(path) => Some(CampaignFile::load(path)?.build()?),
        None => None,
    };

    let rows = visitor_ids
        .iter()
        .map(|raw| {
            let visitor = VisitorId::new(raw).map_err(|e| format!("{:?}: {}", raw, e))?;
            let bucket = visitor.bucket();
            let variant = campaign
                .as_ref()
                .and_then(|c| VariantSelector::select(c.variants(), bucket))
                .map(|v| v.id().to_string());

            Ok(BucketRow {
                visitor_id: visitor.to_string(),
                hash: hash_visitor(visitor.as_str()),
                bucket: bucket.value(),
                variant,
            })
        })
        .collect::<Result<Vec<_>, String>>()?;

    format.print_rows(&rows);
    Ok(())
}
