//! DataCite-shaped submission metadata and its deep-merge update semantics
//! (spec §3, §4.E: "updates merge rather than overwrite; keys set to null
//! or empty explicitly remove").

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DataciteMetadata {
    pub creators: Vec<Creator>,
    pub contributors: Vec<Contributor>,
    pub subjects: Vec<Subject>,
    pub rights: Vec<Rights>,
    pub geo_locations: Vec<GeoLocation>,
    pub dates: Vec<DateInfo>,
    pub funders: Vec<Funder>,
    pub language: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Creator {
    pub name: String,
    pub affiliation: Vec<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Contributor {
    pub name: String,
    pub contributor_type: String,
    pub affiliation: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Subject {
    pub subject: String,
    pub scheme_uri: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Rights {
    pub rights: String,
    pub rights_uri: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeoLocation {
    pub geo_location_place: Option<String>,
    pub geo_location_point: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DateInfo {
    pub date: String,
    pub date_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Funder {
    pub funder_name: String,
    pub award_number: Option<String>,
}

/// `{workflow_id, organization_id, licenses[]}` — spec §3.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RemsInfo {
    pub workflow_id: Option<String>,
    pub organization_id: Option<String>,
    pub licenses: Vec<String>,
}

impl DataciteMetadata {
    /// Deep-merges `patch` into `self`: a `null` leaf deletes the key from
    /// the owning object; an empty array/object at a key clears that
    /// field; arrays are replaced wholesale (DataCite list fields are not
    /// merged element-by-element — see DESIGN.md); objects merge
    /// key-by-key; scalars are overwritten.
    pub fn merge(&mut self, patch: Value) -> Result<(), serde_json::Error> {
        let mut current = serde_json::to_value(&*self)?;
        merge_json(&mut current, patch);
        *self = serde_json::from_value(current)?;
        Ok(())
    }
}

/// Generic deep-merge used for the submission metadata patch semantics.
/// `null` in `patch` removes the corresponding key from `base` (only
/// meaningful when `base` is an object); otherwise objects merge
/// recursively and any other value (including arrays) replaces wholesale.
pub fn merge_json(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                if patch_value.is_null() {
                    base_map.remove(&key);
                    continue;
                }
                match base_map.get_mut(&key) {
                    Some(existing) => merge_json(existing, patch_value),
                    None => {
                        base_map.insert(key, patch_value);
                    }
                }
            }
        }
        (base_slot, patch_value) => {
            *base_slot = patch_value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_sets_new_scalar_field() {
        let mut md = DataciteMetadata::default();
        md.merge(json!({"language": "en"})).unwrap();
        assert_eq!(md.language.as_deref(), Some("en"));
    }

    #[test]
    fn merge_null_removes_field() {
        let mut md = DataciteMetadata {
            language: Some("en".into()),
            ..Default::default()
        };
        md.merge(json!({"language": null})).unwrap();
        assert_eq!(md.language, None);
    }

    #[test]
    fn merge_empty_array_clears_list_field() {
        let mut md = DataciteMetadata {
            subjects: vec![Subject {
                subject: "genomics".into(),
                scheme_uri: None,
            }],
            ..Default::default()
        };
        md.merge(json!({"subjects": []})).unwrap();
        assert!(md.subjects.is_empty());
    }

    #[test]
    fn merge_replaces_array_wholesale_not_elementwise() {
        let mut md = DataciteMetadata {
            subjects: vec![Subject {
                subject: "genomics".into(),
                scheme_uri: None,
            }],
            ..Default::default()
        };
        md.merge(json!({"subjects": [{"subject": "imaging"}]}))
            .unwrap();
        assert_eq!(md.subjects.len(), 1);
        assert_eq!(md.subjects[0].subject, "imaging");
    }

    #[test]
    fn raw_json_merge_preserves_untouched_keys() {
        let mut base = json!({"a": 1, "b": {"c": 2, "d": 3}});
        merge_json(&mut base, json!({"b": {"c": null, "e": 4}}));
        assert_eq!(base, json!({"a": 1, "b": {"d": 3, "e": 4}}));
    }
}
