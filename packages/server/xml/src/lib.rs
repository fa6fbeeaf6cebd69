pub mod accession;
pub mod convert;
pub mod processor;
pub mod tree;

pub use accession::mint_accession;
pub use processor::{check_cardinality, process_bundle, BundlePart, BundleReport, ProcessedObject};
