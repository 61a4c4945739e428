//! Ranked selector synthesis for captured elements.
//!
//! Candidates are produced in a fixed stability order: id, name, `data-*`
//! attributes, class list, tag name, XPath. Every candidate that exists for
//! the element is kept; the first one becomes the primary selector.

use serde::Serialize;

use crate::models::{ElementSnapshot, XPathSegment};

/// Ranked selectors for one element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectorSet {
    pub primary: String,
    /// All candidates, primary first
    pub alternatives: Vec<String>,
    pub tag_name: String,
    pub text: String,
    /// The element's `type`, or "element" when it has none
    pub element_type: String,
}

/// Escape a value for use inside a double-quoted CSS attribute value
fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// XPath 1.0 string literal. There are no escapes, so a value holding both
/// quote kinds is split with `concat()`.
fn xpath_literal(value: &str) -> String {
    if !value.contains('"') {
        return format!("\"{}\"", value);
    }
    if !value.contains('\'') {
        return format!("'{}'", value);
    }
    let parts: Vec<String> = value
        .split('"')
        .map(|part| format!("\"{}\"", part))
        .collect();
    format!("concat({})", parts.join(", '\"', "))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Build the XPath for an element: an id shortcut when available, otherwise
/// the indexed path from the document root.
pub fn xpath_for(id: Option<&str>, segments: &[XPathSegment]) -> String {
    if let Some(id) = id {
        return format!("//*[@id={}]", xpath_literal(id));
    }
    let path: Vec<String> = segments
        .iter()
        .map(|s| format!("{}[{}]", s.tag.to_lowercase(), s.index.max(1)))
        .collect();
    format!("/{}", path.join("/"))
}

/// Produce the ranked selector list for an element
pub fn synthesize(element: &ElementSnapshot) -> SelectorSet {
    let tag = element.tag_lower();
    let id = non_empty(&element.id);
    let mut candidates: Vec<String> = Vec::new();

    if let Some(id) = id {
        candidates.push(format!("#{}", id));
    }

    if let Some(name) = non_empty(&element.name) {
        candidates.push(format!("[name=\"{}\"]", quote(name)));
    }

    for (attr, value) in &element.data_attributes {
        if attr.starts_with("data-") {
            candidates.push(format!("[{}=\"{}\"]", attr, quote(value)));
        }
    }

    if let Some(class_name) = element.class_name.as_deref() {
        let classes: Vec<&str> = class_name.split_whitespace().collect();
        if !classes.is_empty() {
            candidates.push(format!(".{}", classes.join(".")));
        }
    }

    if !tag.is_empty() {
        candidates.push(tag.clone());
    }

    if id.is_some() || !element.xpath.is_empty() {
        candidates.push(xpath_for(id, &element.xpath));
    }

    // An element always has a tag, but a malformed snapshot still gets a target
    let primary = candidates.first().cloned().unwrap_or_else(|| "*".to_string());
    if candidates.is_empty() {
        candidates.push(primary.clone());
    }

    SelectorSet {
        primary,
        alternatives: candidates,
        tag_name: tag,
        text: element.text.clone(),
        element_type: element
            .input_type
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "element".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(tag: &str, index: u32) -> XPathSegment {
        XPathSegment {
            tag: tag.to_string(),
            index,
        }
    }

    fn element(tag: &str) -> ElementSnapshot {
        ElementSnapshot {
            key: "p:1".to_string(),
            tag: tag.to_uppercase(),
            xpath: vec![seg("html", 1), seg("body", 1), seg(tag, 2)],
            ..Default::default()
        }
    }

    #[test]
    fn test_id_is_always_primary() {
        let mut el = element("button");
        el.id = Some("submit".to_string());
        el.name = Some("go".to_string());
        el.class_name = Some("btn primary".to_string());
        el.data_attributes = vec![("data-test".to_string(), "submit-btn".to_string())];

        let set = synthesize(&el);
        assert_eq!(set.primary, "#submit");
        assert_eq!(
            set.alternatives,
            vec![
                "#submit".to_string(),
                "[name=\"go\"]".to_string(),
                "[data-test=\"submit-btn\"]".to_string(),
                ".btn.primary".to_string(),
                "button".to_string(),
                "//*[@id=\"submit\"]".to_string(),
            ]
        );
    }

    #[test]
    fn test_bare_element_falls_back_to_tag() {
        let set = synthesize(&element("SPAN"));
        assert_eq!(set.primary, "span");
        assert_eq!(set.alternatives, vec!["span", "/html[1]/body[1]/span[2]"]);
        assert_eq!(set.element_type, "element");
    }

    #[test]
    fn test_name_beats_data_attributes_and_class() {
        let mut el = element("input");
        el.name = Some("username".to_string());
        el.class_name = Some("form-control".to_string());
        el.data_attributes = vec![
            ("data-qa".to_string(), "user".to_string()),
            ("data-row".to_string(), "1".to_string()),
        ];
        el.input_type = Some("text".to_string());

        let set = synthesize(&el);
        assert_eq!(set.primary, "[name=\"username\"]");
        assert_eq!(set.alternatives[1], "[data-qa=\"user\"]");
        assert_eq!(set.alternatives[2], "[data-row=\"1\"]");
        assert_eq!(set.alternatives[3], ".form-control");
        assert_eq!(set.element_type, "text");
    }

    #[test]
    fn test_blank_id_and_whitespace_class_are_ignored() {
        let mut el = element("div");
        el.id = Some("  ".to_string());
        el.class_name = Some("   ".to_string());

        let set = synthesize(&el);
        assert_eq!(set.primary, "div");
        assert!(set.alternatives.iter().all(|s| !s.starts_with('#')));
        assert!(set.alternatives.iter().all(|s| !s.starts_with('.')));
    }

    #[test]
    fn test_attribute_values_are_quoted() {
        let mut el = element("input");
        el.name = Some("say \"hi\"".to_string());
        let set = synthesize(&el);
        assert_eq!(set.primary, "[name=\"say \\\"hi\\\"\"]");
    }

    #[test]
    fn test_xpath_id_literal_handles_quotes() {
        assert_eq!(xpath_for(Some("a\"b"), &[]), "//*[@id='a\"b']");
        assert_eq!(xpath_for(Some("it's"), &[]), "//*[@id=\"it's\"]");
        assert_eq!(
            xpath_for(Some("a\"b'c"), &[]),
            "//*[@id=concat(\"a\", '\"', \"b'c\")]"
        );
    }

    #[test]
    fn test_xpath_without_id_uses_indexed_path() {
        let path = xpath_for(None, &[seg("HTML", 1), seg("BODY", 1), seg("DIV", 3), seg("A", 1)]);
        assert_eq!(path, "/html[1]/body[1]/div[3]/a[1]");
    }
}
