// src/xml.rs

//! Minimal XML element tree
//!
//! Vault metadata (`properties.xml`, `filter.xml`, `privileges.xml`) and JCR
//! document-view files (`.content.xml`, `_rep_policy.xml`) are small, so they
//! are read fully into an element tree instead of being streamed.

use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::BTreeMap;

/// An XML element with its attributes, text and children
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Children with the given element name
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

/// Parse a document and return its root element
pub fn parse_document(bytes: &[u8]) -> Result<XmlElement> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => stack.push(element_from(&e)?),
            Event::Empty(e) => {
                let element = element_from(&e)?;
                attach(&mut stack, &mut root, element);
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::ParseError("Unbalanced closing tag".to_string()))?;
                attach(&mut stack, &mut root, element);
            }
            Event::Text(t) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(Error::ParseError(format!(
            "Unclosed element <{}>",
            stack.last().map(|e| e.name.as_str()).unwrap_or_default()
        )));
    }

    root.ok_or_else(|| Error::ParseError("Document has no root element".to_string()))
}

fn element_from(start: &BytesStart<'_>) -> Result<XmlElement> {
    let mut element = XmlElement {
        name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
        ..Default::default()
    };

    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.insert(key, value);
    }

    Ok(element)
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

/// Strip a JCR document-view type hint and array brackets
///
/// `{Name}[jcr:read,rep:write]` → `jcr:read,rep:write`, `{Boolean}true` → `true`.
pub fn jcr_value(raw: &str) -> &str {
    let value = match raw.strip_prefix('{') {
        Some(rest) => rest.split_once('}').map(|(_, v)| v).unwrap_or(rest),
        None => raw,
    };
    value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_document() {
        let doc = br#"<?xml version="1.0" encoding="UTF-8"?>
<jcr:root xmlns:jcr="http://www.jcp.org/jcr/1.0" jcr:primaryType="rep:ACL">
    <allow jcr:primaryType="rep:GrantACE" rep:principalName="svc"/>
    <entry key="name">my &amp; package</entry>
</jcr:root>"#;

        let root = parse_document(doc).unwrap();
        assert_eq!(root.name, "jcr:root");
        assert_eq!(root.attribute("jcr:primaryType"), Some("rep:ACL"));
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].attribute("rep:principalName"), Some("svc"));
        assert_eq!(root.children_named("entry").next().unwrap().text, "my & package");
    }

    #[test]
    fn test_parse_rejects_empty_document() {
        assert!(parse_document(b"").is_err());
    }

    #[test]
    fn test_parse_rejects_unclosed_element() {
        assert!(parse_document(b"<a><b></b>").is_err());
    }

    #[test]
    fn test_jcr_value() {
        assert_eq!(jcr_value("{Name}[jcr:read,rep:write]"), "jcr:read,rep:write");
        assert_eq!(jcr_value("{Boolean}true"), "true");
        assert_eq!(jcr_value("rep:SystemUser"), "rep:SystemUser");
        assert_eq!(jcr_value("[a,b]"), "a,b");
    }
}
