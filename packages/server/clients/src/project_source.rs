//! Project/identity resolution (spec §4.G): which projects a principal
//! belongs to, used by the authorization check on every submission/object/
//! file handler. Selected at start-up by `DEPLOYMENT`.

use async_trait::async_trait;
use ldap3::{LdapConnAsync, Scope, SearchEntry};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ProjectSourceError {
    #[error("directory lookup failed: {0}")]
    Lookup(String),
}

#[async_trait]
pub trait ProjectSource: Send + Sync {
    async fn projects_for(&self, user_id: Uuid) -> Result<Vec<String>, ProjectSourceError>;
}

/// CSC deployment: projects come from an LDAP directory keyed by username,
/// filtered to applications in `ready` status.
pub struct LdapProjectSource {
    url: String,
    bind_dn: String,
    bind_password: String,
    base_dn: String,
}

impl LdapProjectSource {
    pub fn new(
        url: impl Into<String>,
        bind_dn: impl Into<String>,
        bind_password: impl Into<String>,
        base_dn: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            bind_dn: bind_dn.into(),
            bind_password: bind_password.into(),
            base_dn: base_dn.into(),
        }
    }
}

#[async_trait]
impl ProjectSource for LdapProjectSource {
    async fn projects_for(&self, user_id: Uuid) -> Result<Vec<String>, ProjectSourceError> {
        let (conn, mut ldap) = LdapConnAsync::new(&self.url)
            .await
            .map_err(|e| ProjectSourceError::Lookup(e.to_string()))?;
        ldap3::drive!(conn);

        ldap.simple_bind(&self.bind_dn, &self.bind_password)
            .await
            .and_then(|r| r.success())
            .map_err(|e| ProjectSourceError::Lookup(e.to_string()))?;

        let filter = format!(
            "(&(objectClass=applicationProcess)(CSCSPCommonStatus=ready)(CSCUserName={user_id}))"
        );
        let (entries, _result) = ldap
            .search(&self.base_dn, Scope::Subtree, &filter, vec!["CSCPrjNum"])
            .await
            .map_err(|e| ProjectSourceError::Lookup(e.to_string()))?
            .success()
            .map_err(|e| ProjectSourceError::Lookup(e.to_string()))?;

        let mut projects = Vec::new();
        for entry in entries {
            let entry = SearchEntry::construct(entry);
            if let Some(values) = entry.attrs.get("CSCPrjNum") {
                projects.extend(values.iter().cloned());
            }
        }

        ldap.unbind().await.map_err(|e| ProjectSourceError::Lookup(e.to_string()))?;
        Ok(projects)
    }
}

/// NBIS deployment: the user IS the project, no external directory.
pub struct SelfProjectSource;

#[async_trait]
impl ProjectSource for SelfProjectSource {
    async fn projects_for(&self, user_id: Uuid) -> Result<Vec<String>, ProjectSourceError> {
        Ok(vec![user_id.to_string()])
    }
}

pub fn authorize(project_id: &str, known: &[String]) -> bool {
    known.iter().any(|p| p == project_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn self_project_source_returns_the_user_as_sole_project() {
        let source = SelfProjectSource;
        let user_id = Uuid::new_v4();
        let projects = source.projects_for(user_id).await.unwrap();
        assert_eq!(projects, vec![user_id.to_string()]);
    }

    #[test]
    fn authorize_requires_membership_in_known_projects() {
        let known = vec!["PRJ1".to_string(), "PRJ2".to_string()];
        assert!(authorize("PRJ2", &known));
        assert!(!authorize("PRJ3", &known));
    }
}
