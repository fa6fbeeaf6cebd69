pub mod catalog;
pub mod workflow_config;

pub use catalog::{SchemaCatalog, SchemaInfo};
pub use workflow_config::{SchemaRule, WorkflowCatalog, WorkflowConfig};
