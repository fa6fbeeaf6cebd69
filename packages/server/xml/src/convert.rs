//! Deterministic XML -> JSON mapping (spec §4.C step 3, refined in
//! SPEC_FULL.md §4.C): attributes become `@attr`-prefixed sibling keys,
//! repeated sibling elements become JSON arrays, leaf whitespace is
//! collapsed, and a leaf with only attributes and no text becomes an
//! object of its attributes.

use crate::tree::{XmlElement, XmlNode};
use serde_json::{Map, Value};
use std::collections::HashMap;

pub fn element_to_json(el: &XmlElement) -> Value {
    let mut map = Map::new();
    for (key, value) in &el.attrs {
        map.insert(format!("@{key}"), Value::String(value.clone()));
    }

    let mut groups: HashMap<String, Vec<Value>> = HashMap::new();
    let mut group_order: Vec<String> = Vec::new();
    let mut text = String::new();

    for child in &el.children {
        match child {
            XmlNode::Text(t) => {
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(t);
            }
            XmlNode::Element(child_el) => {
                let entry = groups.entry(child_el.tag.clone()).or_insert_with(|| {
                    group_order.push(child_el.tag.clone());
                    Vec::new()
                });
                entry.push(element_to_json(child_el));
            }
        }
    }

    let collapsed = collapse_whitespace(&text);

    if groups.is_empty() {
        if map.is_empty() {
            return Value::String(collapsed);
        }
        if !collapsed.is_empty() {
            map.insert("#text".to_string(), Value::String(collapsed));
        }
        return Value::Object(map);
    }

    for tag in group_order {
        let mut values = groups.remove(&tag).unwrap_or_default();
        let value = if values.len() == 1 {
            values.pop().unwrap()
        } else {
            Value::Array(values)
        };
        map.insert(tag, value);
    }

    Value::Object(map)
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::parse;

    #[test]
    fn leaf_with_only_text_becomes_scalar_string() {
        let root = parse(b"<TITLE>  A   study  </TITLE>").unwrap();
        assert_eq!(element_to_json(&root), Value::String("A study".to_string()));
    }

    #[test]
    fn leaf_with_attributes_and_no_text_becomes_object() {
        let root = parse(br#"<DAC_REF refname="dac1"/>"#).unwrap();
        assert_eq!(element_to_json(&root), serde_json::json!({ "@refname": "dac1" }));
    }

    #[test]
    fn repeated_children_become_array() {
        let root = parse(
            br#"<DAC alias="d1"><CONTACT name="a" email="a@x.org"/><CONTACT name="b" email="b@x.org"/></DAC>"#,
        )
        .unwrap();
        let json = element_to_json(&root);
        assert!(json["CONTACT"].is_array());
        assert_eq!(json["CONTACT"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn single_child_does_not_become_array() {
        let root = parse(br#"<POLICY alias="p1"><DAC_REF refname="d1"/></POLICY>"#).unwrap();
        let json = element_to_json(&root);
        assert!(json["DAC_REF"].is_object());
    }
}
