//! Typed, retrying clients for every downstream collaborator (spec §4.H):
//! DOI minting, the Metax catalog, REMS access management, the archive
//! admin API, the object store, Keystone, and project/identity resolution.

pub mod access;
pub mod archive;
pub mod catalog;
pub mod doi;
pub mod http;
pub mod keystone;
pub mod object_store;
pub mod project_source;

pub use access::{AccessClient, AccessError};
pub use archive::{ArchiveAdminClient, ArchiveError, FileStatusReport};
pub use catalog::{to_metax_dataset, CatalogClient, CatalogError, MetaxDatasetPayload};
pub use doi::{CscPidClient, DataciteClient, DoiError, DoiHandle, DoiPayload, DoiProvider};
pub use http::HealthProbe;
pub use keystone::{Ec2Credentials, KeystoneClient, KeystoneError};
pub use object_store::{ObjectStoreClient, ObjectStoreError};
pub use project_source::{authorize, LdapProjectSource, ProjectSource, ProjectSourceError, SelfProjectSource};
