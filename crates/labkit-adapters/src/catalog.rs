//! The built-in workshop catalog.
//!
//! Payloads are compiled in from `assets/`, so the binary needs nothing on
//! disk to scaffold a workshop. Mirror pairs are numbered so the rules
//! directory sorts the way the aggregate document reads, but aggregation
//! order comes from this list, not from the file names.

use labkit_core::domain::{ArtifactSpec, Catalog, Layout, MirrorPair};

pub const DOCS_DIR: &str = "docs";
pub const RULES_DIR: &str = "rules";
pub const AGGREGATE_FILE: &str = "AGENT_RULES.md";
pub const CONFIG_FILE: &str = "config/app_config.yaml";
pub const RESOLVED_ENV_FILE: &str = ".labkit/resolved.env";

/// (file name under `docs/`, payload)
const DOCS: &[(&str, &str)] = &[
    ("ARCHITECTURE.md", include_str!("../assets/docs/ARCHITECTURE.md")),
    ("API_CONTRACT.md", include_str!("../assets/docs/API_CONTRACT.md")),
    ("GENAI_INTEGRATION.md", include_str!("../assets/docs/GENAI_INTEGRATION.md")),
    ("PRODUCT_SEARCH.md", include_str!("../assets/docs/PRODUCT_SEARCH.md")),
    ("STREAMLIT_UI.md", include_str!("../assets/docs/STREAMLIT_UI.md")),
    ("DEPLOYMENT.md", include_str!("../assets/docs/DEPLOYMENT.md")),
    ("TESTING.md", include_str!("../assets/docs/TESTING.md")),
    ("CODING_RULES.md", include_str!("../assets/docs/CODING_RULES.md")),
];

/// (source under `docs/`, destination under `rules/`), in aggregation order.
const MIRRORS: &[(&str, &str)] = &[
    ("CODING_RULES.md", "00-coding-rules.md"),
    ("ARCHITECTURE.md", "10-architecture.md"),
    ("API_CONTRACT.md", "20-api-contract.md"),
    ("GENAI_INTEGRATION.md", "30-genai.md"),
    ("PRODUCT_SEARCH.md", "40-product-search.md"),
    ("STREAMLIT_UI.md", "50-streamlit-ui.md"),
    ("DEPLOYMENT.md", "60-deployment.md"),
    ("TESTING.md", "70-testing.md"),
];

const APP_CONFIG: &str = include_str!("../assets/config/app_config.yaml");
const GUIDE: &str = include_str!("../assets/docs/workshop_guide.json");
const ENV_EXAMPLE: &str = include_str!("../assets/env.example");

pub fn layout() -> Layout {
    Layout {
        docs_dir: DOCS_DIR.into(),
        rules_dir: RULES_DIR.into(),
        aggregate_path: AGGREGATE_FILE.into(),
        config_path: CONFIG_FILE.into(),
        resolved_env_path: RESOLVED_ENV_FILE.into(),
    }
}

/// Every artifact, the mirror pairs and the fixed layout.
pub fn workshop_catalog() -> Catalog {
    let mut artifacts: Vec<ArtifactSpec> = DOCS
        .iter()
        .map(|&(name, payload)| {
            let path = format!("{DOCS_DIR}/{name}");
            ArtifactSpec::doc(&path, payload)
        })
        .collect();
    artifacts.push(ArtifactSpec::config(CONFIG_FILE, APP_CONFIG));
    artifacts.push(ArtifactSpec::guide("docs/workshop_guide.json", GUIDE));
    artifacts.push(ArtifactSpec::env(".env.example", ENV_EXAMPLE));

    let mirror_pairs = MIRRORS
        .iter()
        .map(|&(source, dest)| MirrorPair::new(source, dest))
        .collect();

    Catalog::new(artifacts, mirror_pairs, layout())
}

#[cfg(test)]
mod tests {
    use super::*;
    use labkit_core::domain::ArtifactCategory;

    #[test]
    fn catalog_is_valid() {
        workshop_catalog().validate().unwrap();
    }

    #[test]
    fn every_mirror_source_is_a_doc() {
        let catalog = workshop_catalog();
        for pair in &catalog.mirror_pairs {
            let path = format!("{DOCS_DIR}/{}", pair.source_name);
            assert!(
                catalog.artifacts.iter().any(|a| a.relative_path.as_str() == path),
                "{path} has no artifact"
            );
        }
    }

    #[test]
    fn coding_rules_lead_the_aggregate() {
        assert_eq!(
            workshop_catalog().mirror_destinations()[0],
            "00-coding-rules.md"
        );
    }

    #[test]
    fn categories() {
        let catalog = workshop_catalog();
        assert_eq!(catalog.artifacts_by(ArtifactCategory::Doc).count(), 8);
        assert_eq!(catalog.artifacts_by(ArtifactCategory::Config).count(), 1);
        assert_eq!(catalog.artifacts_by(ArtifactCategory::Guide).count(), 1);
        assert_eq!(catalog.artifacts_by(ArtifactCategory::Env).count(), 1);
    }

    #[test]
    fn guide_is_json_and_config_template_parses() {
        serde_json::from_str::<serde_json::Value>(GUIDE).unwrap();
        assert!(matches!(
            crate::YamlConfigSource::parse(APP_CONFIG),
            labkit_core::domain::ConfigLoad::Parsed(_)
        ));
    }
}
