//! Bundle processing orchestration (spec §4.C): validate -> split -> convert
//! -> mint -> validate JSON -> resolve references -> report cardinality.
//! Every step accumulates into one `Vec<ProcessingError>`; nothing
//! short-circuits the bundle as a whole.

use crate::accession::mint_accession;
use crate::convert::element_to_json;
use crate::tree::{self, XmlElement};
use schema::{SchemaCatalog, WorkflowConfig};
use serde_json::Value;
use shared::error::{DuplicateNameError, ProcessingError, ReferenceError, ValidationError};
use shared::workflow::Workflow;
use std::collections::HashMap;

/// One part of a multipart submission: a field name equal to an
/// `object_type` and XML content holding one or many logical objects.
pub struct BundlePart {
    pub object_type: String,
    pub xml: Vec<u8>,
}

/// A fully processed logical object, ready to persist.
pub struct ProcessedObject {
    pub object_type: String,
    pub name: String,
    pub accession_id: String,
    pub content: Value,
    pub xml: Vec<u8>,
}

#[derive(Default, Debug)]
pub struct BundleReport {
    pub per_type: HashMap<String, usize>,
    pub errors: Vec<ProcessingError>,
}

impl BundleReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// `existing` maps object name -> accession_id for objects already attached
/// to the submission, so a bundle can reference objects uploaded earlier.
pub fn process_bundle(
    parts: &[BundlePart],
    workflow: Workflow,
    submission_name: &str,
    center_id: &str,
    existing: &HashMap<String, String>,
    catalog: &SchemaCatalog,
) -> (Vec<ProcessedObject>, BundleReport) {
    let mut report = BundleReport::default();
    let mut reference_map = existing.clone();
    let mut seen_names: HashMap<(String, String), ()> = HashMap::new();
    let mut staged: Vec<(XmlElement, ProcessedObject)> = Vec::new();

    for part in parts {
        if let Err(errors) = catalog.validate_xml(&part.object_type, &part.xml) {
            report.errors.extend(errors.into_iter().map(ProcessingError::XmlSchema));
            continue;
        }

        let root = match tree::parse(&part.xml) {
            Ok(root) => root,
            Err(e) => {
                report.errors.push(ProcessingError::XmlSchema(ValidationError {
                    pointer: String::new(),
                    message: e.to_string(),
                    line: None,
                }));
                continue;
            }
        };

        let items = match split_items(&root, &part.object_type) {
            Ok(items) => items,
            Err(e) => {
                report.errors.push(ProcessingError::XmlSchema(ValidationError {
                    pointer: String::new(),
                    message: e,
                    line: None,
                }));
                continue;
            }
        };

        for item in items {
            let name = object_name(&part.object_type, &item);
            let key = (part.object_type.clone(), name.clone());
            if seen_names.contains_key(&key) {
                report.errors.push(ProcessingError::DuplicateName(DuplicateNameError {
                    object_type: part.object_type.clone(),
                    name,
                }));
                continue;
            }
            seen_names.insert(key, ());

            let accession_id = mint_accession(workflow, center_id, submission_name, &part.object_type, &name);
            let mut item = item;
            item.set_attr("accession_id", &accession_id);
            reference_map.insert(name.clone(), accession_id.clone());

            *report.per_type.entry(part.object_type.clone()).or_insert(0) += 1;
            staged.push((
                item,
                ProcessedObject {
                    object_type: part.object_type.clone(),
                    name,
                    accession_id,
                    content: Value::Null,
                    xml: Vec::new(),
                },
            ));
        }
    }

    for (element, processed) in staged.iter_mut() {
        resolve_references_in_tree(element, &reference_map, &mut report.errors, &processed.object_type);
        processed.content = element_to_json(element);
        processed.xml = tree::serialize(element);

        if let Err(errors) = catalog.validate_json(&processed.object_type, &processed.content) {
            report.errors.extend(errors.into_iter().map(ProcessingError::JsonSchema));
        }
    }

    let objects = staged.into_iter().map(|(_, obj)| obj).collect();
    (objects, report)
}

/// Checks this bundle's per-type counts against the workflow's multiplicity
/// rules (spec §4.C step 7). Required-schema presence across the whole
/// submission (not just this bundle) is the object service's job, since it
/// must also see objects from earlier uploads.
pub fn check_cardinality(report: &BundleReport, config: &WorkflowConfig) -> Vec<ProcessingError> {
    let mut errors = Vec::new();
    for rule in &config.schemas {
        let count = report.per_type.get(&rule.schema_name).copied().unwrap_or(0);
        if !rule.allow_multiple_objects && count > 1 {
            errors.push(ProcessingError::XmlSchema(ValidationError {
                pointer: String::new(),
                message: format!(
                    "schema '{}' does not allow multiple objects in one bundle, found {count}",
                    rule.schema_name
                ),
                line: None,
            }));
        }
    }
    errors
}

fn split_items(root: &XmlElement, object_type: &str) -> Result<Vec<XmlElement>, String> {
    let item_tag = object_type.to_uppercase();
    let wrapper_tag = format!("{item_tag}_SET");

    if root.tag.eq_ignore_ascii_case(&wrapper_tag) {
        let items: Vec<_> = root.children_named(&item_tag).cloned().collect();
        if items.is_empty() {
            return Err(format!("'{wrapper_tag}' contained no '{item_tag}' elements"));
        }
        Ok(items)
    } else if root.tag.eq_ignore_ascii_case(&item_tag) {
        Ok(vec![root.clone()])
    } else {
        Err(format!(
            "expected root '{wrapper_tag}' or '{item_tag}', found '{}'",
            root.tag
        ))
    }
}

/// The name an object is known by for uniqueness and cross-references.
/// Every schema's root element carries an `alias` attribute except
/// `bprems`, a submission-level singleton keyed by `workflowId` instead
/// (see DESIGN.md).
fn object_name(object_type: &str, item: &XmlElement) -> String {
    if object_type.eq_ignore_ascii_case("bprems") {
        item.attr("workflowId").unwrap_or_default().to_string()
    } else {
        item.attr("alias").unwrap_or_default().to_string()
    }
}

/// Walks every `*_REF` child carrying a `refname` attribute and injects the
/// resolved `accession_id`, recording a `ReferenceError` for anything that
/// doesn't resolve within the bundle or the submission's existing objects.
fn resolve_references_in_tree(
    element: &mut XmlElement,
    reference_map: &HashMap<String, String>,
    errors: &mut Vec<ProcessingError>,
    from_type: &str,
) {
    if element.tag.ends_with("_REF") {
        if let Some(refname) = element.attr("refname").map(str::to_string) {
            match reference_map.get(&refname) {
                Some(accession_id) => element.set_attr("accession_id", accession_id),
                None => errors.push(ProcessingError::Reference(ReferenceError {
                    kind: "ReferenceError",
                    from: from_type.to_string(),
                    to_name: refname,
                })),
            }
        }
    }

    for child in element.children.iter_mut() {
        if let tree::XmlNode::Element(child_el) = child {
            resolve_references_in_tree(child_el, reference_map, errors, from_type);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> SchemaCatalog {
        let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../schema/assets/schemas");
        SchemaCatalog::load_dir(dir).expect("load schema catalog")
    }

    #[test]
    fn mints_accession_and_validates_simple_study() {
        let parts = vec![BundlePart {
            object_type: "study".into(),
            xml: br#"<STUDY_SET><STUDY alias="s1"><TITLE>A study</TITLE></STUDY></STUDY_SET>"#.to_vec(),
        }];
        let (objects, report) = process_bundle(
            &parts,
            Workflow::Fega,
            "sub-1",
            "CSC",
            &HashMap::new(),
            &catalog(),
        );
        assert!(report.is_ok(), "{:?}", report.errors);
        assert_eq!(objects.len(), 1);
        assert!(!objects[0].accession_id.is_empty());
        assert!(objects[0].xml.windows(13).any(|w| w == b"accession_id="));
    }

    #[test]
    fn duplicate_name_in_bundle_is_reported() {
        let parts = vec![BundlePart {
            object_type: "study".into(),
            xml: br#"<STUDY_SET><STUDY alias="dup"/><STUDY alias="dup"/></STUDY_SET>"#.to_vec(),
        }];
        let (objects, report) = process_bundle(
            &parts,
            Workflow::Fega,
            "sub-1",
            "CSC",
            &HashMap::new(),
            &catalog(),
        );
        assert_eq!(objects.len(), 1);
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, ProcessingError::DuplicateName(_))));
    }

    #[test]
    fn unresolved_reference_is_reported_and_bundle_continues() {
        let parts = vec![
            BundlePart {
                object_type: "dac".into(),
                xml: br#"<DAC_SET><DAC alias="dac1"><CONTACT name="a" email="a@x.org"/></DAC></DAC_SET>"#.to_vec(),
            },
            BundlePart {
                object_type: "policy".into(),
                xml: br#"<POLICY_SET><POLICY alias="p1"><DAC_REF refname="missing-dac"/></POLICY></POLICY_SET>"#
                    .to_vec(),
            },
        ];
        let (objects, report) = process_bundle(
            &parts,
            Workflow::Fega,
            "sub-1",
            "CSC",
            &HashMap::new(),
            &catalog(),
        );
        assert_eq!(objects.len(), 2, "both objects still processed despite the error");
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, ProcessingError::Reference(r) if r.to_name == "missing-dac")));
    }

    #[test]
    fn resolved_reference_injects_accession_id() {
        let parts = vec![
            BundlePart {
                object_type: "dac".into(),
                xml: br#"<DAC_SET><DAC alias="dac1"><CONTACT name="a" email="a@x.org"/></DAC></DAC_SET>"#.to_vec(),
            },
            BundlePart {
                object_type: "policy".into(),
                xml: br#"<POLICY_SET><POLICY alias="p1"><DAC_REF refname="dac1"/></POLICY></POLICY_SET>"#.to_vec(),
            },
        ];
        let (objects, report) = process_bundle(
            &parts,
            Workflow::Fega,
            "sub-1",
            "CSC",
            &HashMap::new(),
            &catalog(),
        );
        assert!(report.is_ok(), "{:?}", report.errors);
        let policy = objects.iter().find(|o| o.object_type == "policy").unwrap();
        assert_eq!(
            policy.content["DAC_REF"]["@accession_id"],
            objects.iter().find(|o| o.object_type == "dac").unwrap().accession_id.as_str()
        );
    }
}
