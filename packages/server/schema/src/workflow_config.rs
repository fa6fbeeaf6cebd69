//! Per-workflow schema rules driving the publish gate (spec §4.E) and the
//! object multiplicity checks (spec §4.D). Loaded once from `workflows.json`
//! alongside the schema catalog — supplement, since spec.md describes the
//! rules but not their on-disk shape.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaRule {
    pub schema_name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub allow_multiple_objects: bool,
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub requires_or: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowConfig {
    pub workflow: String,
    pub schemas: Vec<SchemaRule>,
    /// Whether the workflow tracks uploaded files toward publish readiness
    /// (spec §4.E "every file's ingest_status = ready, or the workflow
    /// doesn't track files").
    #[serde(default = "default_true")]
    pub tracks_files: bool,
}

fn default_true() -> bool {
    true
}

impl WorkflowConfig {
    pub fn rule_for(&self, schema_name: &str) -> Option<&SchemaRule> {
        self.schemas.iter().find(|r| r.schema_name == schema_name)
    }

    pub fn required_schemas(&self) -> impl Iterator<Item = &SchemaRule> {
        self.schemas.iter().filter(|r| r.required)
    }
}

pub struct WorkflowCatalog {
    by_workflow: HashMap<String, WorkflowConfig>,
}

impl WorkflowCatalog {
    pub fn load_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let configs: Vec<WorkflowConfig> = serde_json::from_str(&raw)?;
        let by_workflow = configs.into_iter().map(|c| (c.workflow.clone(), c)).collect();
        Ok(Self { by_workflow })
    }

    pub fn get(&self, workflow: &str) -> Option<&WorkflowConfig> {
        self.by_workflow.get(workflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_path() -> std::path::PathBuf {
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/workflows/workflows.json")
    }

    #[test]
    fn fega_requires_study_dac_policy_dataset() {
        let catalog = WorkflowCatalog::load_file(fixture_path()).expect("load workflows");
        let fega = catalog.get("FEGA").expect("FEGA config present");
        for name in ["study", "dac", "policy", "dataset"] {
            assert!(fega.rule_for(name).map(|r| r.required).unwrap_or(false), "{name} required");
        }
    }

    #[test]
    fn bp_allows_multiple_images() {
        let catalog = WorkflowCatalog::load_file(fixture_path()).expect("load workflows");
        let bp = catalog.get("BP").expect("BP config present");
        let image_rule = bp.rule_for("bpimage").expect("bpimage rule present");
        assert!(image_rule.allow_multiple_objects);
    }
}
