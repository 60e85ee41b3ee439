//! CLI Commands

pub mod bucket;
pub mod config;
pub mod simulate;

use std::path::Path;

use leadgen_experiments::{Campaign, EntityId, TrafficWeight};
use serde::Deserialize;

/// Campaign definition file used by `bucket` and `simulate`
#[derive(Debug, Deserialize)]
pub struct CampaignFile {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub variants: Vec<VariantFile>,
}

#[derive(Debug, Deserialize)]
pub struct VariantFile {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub weight: u8,
    #[serde(default)]
    pub control: bool,
    /// Simulated conversion probability for this variant
    #[serde(default)]
    pub conversion_rate: Option<f64>,
}

impl CampaignFile {
    pub fn load(path: &str) -> Result<Self, String> {
        let content = std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path, e))?;
        let extension = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("toml");

        match extension {
            "json" => serde_json::from_str(&content).map_err(|e| e.to_string()),
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
            _ => toml::from_str(&content).map_err(|e| e.to_string()),
        }
    }

    /// Active campaign built from the definition
    pub fn build(&self) -> Result<Campaign, String> {
        let id = self.id.clone().unwrap_or_else(|| slug(&self.name));
        let mut campaign = Campaign::with_id(EntityId::from_string(id), self.name.clone());

        for variant in &self.variants {
            let weight = TrafficWeight::new(variant.weight).map_err(|e| format!("variant {}: {}", variant.id, e))?;
            campaign
                .add_variant_with_id(
                    EntityId::from_string(variant.id.clone()),
                    variant.name.clone().unwrap_or_else(|| variant.id.clone()),
                    weight,
                    variant.control,
                )
                .map_err(|e| e.to_string())?;
        }

        campaign.activate().map_err(|e| e.to_string())?;
        Ok(campaign)
    }
}

fn slug(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFINITION: &str = r#"
name = "Auto Quote: Hero"

[[variants]]
id = "control"
weight = 50
control = true

[[variants]]
id = "short-form"
name = "Short form"
weight = 50
conversion_rate = 0.08
"#;

    #[test]
    fn test_build_from_toml() {
        let file: CampaignFile = toml::from_str(DEFINITION).unwrap();
        let campaign = file.build().unwrap();

        assert_eq!(campaign.id().as_str(), "auto-quote-hero");
        assert!(campaign.is_active());
        assert_eq!(campaign.total_weight(), 100);
        assert_eq!(campaign.control().unwrap().id().as_str(), "control");
        assert_eq!(file.variants[1].conversion_rate, Some(0.08));
    }

    #[test]
    fn test_over_allocated_definition_is_rejected() {
        let file = CampaignFile {
            id: Some("too-much".into()),
            name: "Too much".into(),
            variants: vec![
                VariantFile { id: "a".into(), name: None, weight: 70, control: true, conversion_rate: None },
                VariantFile { id: "b".into(), name: None, weight: 40, control: false, conversion_rate: None },
            ],
        };
        assert!(file.build().is_err());
    }
}
