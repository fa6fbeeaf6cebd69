//! A minimal generic XML DOM, just enough to support the deterministic
//! XML<->JSON mapping in `convert` and attribute injection for accession
//! minting (spec §4.C steps 2-4). Built on `quick-xml`'s pull parser rather
//! than a full DOM crate, following this corpus' preference for the
//! lean, purpose-built parser over a heavyweight dependency.

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("malformed XML: {0}")]
    Parse(String),
    #[error("document has no root element")]
    Empty,
}

#[derive(Debug, Clone)]
pub struct XmlElement {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

#[derive(Debug, Clone)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

impl XmlElement {
    pub fn set_attr(&mut self, key: &str, value: &str) {
        if let Some(existing) = self.attrs.iter_mut().find(|(k, _)| k == key) {
            existing.1 = value.to_string();
        } else {
            self.attrs.push((key.to_string(), value.to_string()));
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter_map(move |c| match c {
            XmlNode::Element(el) if el.tag.eq_ignore_ascii_case(tag) => Some(el),
            _ => None,
        })
    }
}

pub fn parse(bytes: &[u8]) -> Result<XmlElement, XmlError> {
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(|e| XmlError::Parse(e.to_string()))? {
            Event::Start(e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let attrs = e
                    .attributes()
                    .filter_map(|a| a.ok())
                    .map(|a| {
                        let key = String::from_utf8_lossy(a.key.as_ref()).to_string();
                        let value = a.unescape_value().unwrap_or_default().to_string();
                        (key, value)
                    })
                    .collect();
                stack.push(XmlElement { tag, attrs, children: Vec::new() });
            }
            Event::Empty(e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let attrs = e
                    .attributes()
                    .filter_map(|a| a.ok())
                    .map(|a| {
                        let key = String::from_utf8_lossy(a.key.as_ref()).to_string();
                        let value = a.unescape_value().unwrap_or_default().to_string();
                        (key, value)
                    })
                    .collect();
                let el = XmlElement { tag, attrs, children: Vec::new() };
                push_child(&mut stack, &mut root, XmlNode::Element(el));
            }
            Event::Text(t) => {
                let text = t.unescape().unwrap_or_default().to_string();
                if !text.trim().is_empty() {
                    push_child_text(&mut stack, text);
                }
            }
            Event::End(_) => {
                if let Some(finished) = stack.pop() {
                    push_child(&mut stack, &mut root, XmlNode::Element(finished));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    root.ok_or(XmlError::Empty)
}

fn push_child(stack: &mut Vec<XmlElement>, root: &mut Option<XmlElement>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            if let XmlNode::Element(el) = node {
                *root = Some(el);
            }
        }
    }
}

fn push_child_text(stack: &mut [XmlElement], text: String) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(XmlNode::Text(text));
    }
}

pub fn serialize(root: &XmlElement) -> Vec<u8> {
    let mut out = Vec::new();
    write_element(root, &mut out);
    out
}

fn write_element(el: &XmlElement, out: &mut Vec<u8>) {
    out.push(b'<');
    out.extend_from_slice(el.tag.as_bytes());
    for (k, v) in &el.attrs {
        out.push(b' ');
        out.extend_from_slice(k.as_bytes());
        out.extend_from_slice(b"=\"");
        out.extend_from_slice(escape_attr(v).as_bytes());
        out.push(b'"');
    }
    if el.children.is_empty() {
        out.extend_from_slice(b"/>");
        return;
    }
    out.push(b'>');
    for child in &el.children {
        match child {
            XmlNode::Element(child_el) => write_element(child_el, out),
            XmlNode::Text(t) => out.extend_from_slice(escape_text(t).as_bytes()),
        }
    }
    out.extend_from_slice(b"</");
    out.extend_from_slice(el.tag.as_bytes());
    out.push(b'>');
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;").replace('<', "&lt;")
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_and_attributes() {
        let root = parse(br#"<STUDY_SET><STUDY alias="s1"><TITLE>A study</TITLE></STUDY></STUDY_SET>"#).unwrap();
        assert_eq!(root.tag, "STUDY_SET");
        let study = root.children_named("STUDY").next().unwrap();
        assert_eq!(study.attr("alias"), Some("s1"));
    }

    #[test]
    fn set_attr_then_serialize_round_trips() {
        let mut root = parse(br#"<STUDY alias="s1"/>"#).unwrap();
        root.set_attr("accession_id", "abc-123");
        let bytes = serialize(&root);
        let reparsed = parse(&bytes).unwrap();
        assert_eq!(reparsed.attr("accession_id"), Some("abc-123"));
        assert_eq!(reparsed.attr("alias"), Some("s1"));
    }
}
