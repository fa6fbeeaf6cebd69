use serde::{Deserialize, Serialize};
use std::fmt;

/// Named bundle of rules controlling which schemas a submission accepts and
/// which external services the publish pipeline invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Workflow {
    Fega,
    Bp,
    Sd,
}

impl Workflow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Workflow::Fega => "FEGA",
            Workflow::Bp => "BP",
            Workflow::Sd => "SD",
        }
    }

    /// Deterministic, workflow-defined publish step order (spec §4.I).
    pub fn publish_services(&self) -> &'static [RegistrationService] {
        match self {
            Workflow::Fega => &[
                RegistrationService::Doi,
                RegistrationService::Catalog,
                RegistrationService::Access,
            ],
            Workflow::Bp => &[RegistrationService::Doi, RegistrationService::Access],
            Workflow::Sd => &[RegistrationService::Doi, RegistrationService::Catalog],
        }
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Workflow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FEGA" => Ok(Workflow::Fega),
            "BP" => Ok(Workflow::Bp),
            "SD" => Ok(Workflow::Sd),
            other => Err(format!("unknown workflow: {other}")),
        }
    }
}

/// A downstream registry that the publish orchestrator registers a
/// submission with. The absence of a `Registration` row for a given
/// service is the signal that the step has not yet succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationService {
    Doi,
    Catalog,
    Access,
    Archive,
}

impl RegistrationService {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationService::Doi => "doi",
            RegistrationService::Catalog => "catalog",
            RegistrationService::Access => "access",
            RegistrationService::Archive => "archive",
        }
    }
}

impl fmt::Display for RegistrationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RegistrationService {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "doi" => Ok(RegistrationService::Doi),
            "catalog" => Ok(RegistrationService::Catalog),
            "access" => Ok(RegistrationService::Access),
            "archive" => Ok(RegistrationService::Archive),
            other => Err(format!("unknown registration service: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fega_order_is_doi_catalog_access() {
        assert_eq!(
            Workflow::Fega.publish_services(),
            &[
                RegistrationService::Doi,
                RegistrationService::Catalog,
                RegistrationService::Access
            ]
        );
    }

    #[test]
    fn bp_order_is_doi_access() {
        assert_eq!(
            Workflow::Bp.publish_services(),
            &[RegistrationService::Doi, RegistrationService::Access]
        );
    }
}
