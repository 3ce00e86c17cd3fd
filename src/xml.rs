//! Minimal owned XML tree used for writing files.
//!
//! Reading goes through `roxmltree`; writing builds an [`XmlElement`] tree and
//! renders it with tab indentation, the layout Code::Blocks itself produces.
//! The tree is also how the `<Extensions>` subtree survives a load/save cycle.

use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, name: &str, value: impl ToString) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn set_attr(&mut self, name: &str, value: impl ToString) {
        let value = value.to_string();
        match self.attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn push(&mut self, child: XmlElement) -> &mut XmlElement {
        self.children.push(XmlNode::Element(child));
        match self.children.last_mut() {
            Some(XmlNode::Element(e)) => e,
            _ => unreachable!("just pushed an element"),
        }
    }

    pub fn push_cdata(&mut self, text: impl Into<String>) {
        self.children.push(XmlNode::CData(text.into()));
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(XmlNode::Text(text.into()));
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn first_child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.name == name)
    }

    /// Returns the child named `name`, creating it if needed.
    pub fn child_mut(&mut self, name: &str) -> &mut XmlElement {
        let pos = self
            .children
            .iter()
            .position(|c| matches!(c, XmlNode::Element(e) if e.name == name));
        let pos = match pos {
            Some(pos) => pos,
            None => {
                self.children.push(XmlNode::Element(XmlElement::new(name)));
                self.children.len() - 1
            }
        };
        match &mut self.children[pos] {
            XmlNode::Element(e) => e,
            _ => unreachable!("position matched an element"),
        }
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Converts a parsed `roxmltree` element into an owned tree.
    /// Whitespace-only text between elements is dropped.
    pub fn from_node(node: roxmltree::Node<'_, '_>) -> Self {
        let mut element = XmlElement::new(node.tag_name().name());
        for attr in node.attributes() {
            element
                .attributes
                .push((attr.name().to_string(), attr.value().to_string()));
        }
        for child in node.children() {
            if child.is_element() {
                element.children.push(XmlNode::Element(Self::from_node(child)));
            } else if child.is_text() {
                let text = child.text().unwrap_or_default();
                if !text.trim().is_empty() {
                    element.children.push(XmlNode::Text(text.to_string()));
                }
            }
        }
        element
    }

    /// Renders the element (and its subtree) at the given indentation depth.
    pub fn write_to(&self, out: &mut String, depth: usize) {
        let indent = "\t".repeat(depth);
        let _ = write!(out, "{indent}<{}", self.name);
        for (name, value) in &self.attributes {
            let _ = write!(out, " {}=\"{}\"", name, escape(value, true));
        }
        if self.children.is_empty() {
            out.push_str(" />\n");
            return;
        }

        let inline = self
            .children
            .iter()
            .all(|c| !matches!(c, XmlNode::Element(_)));
        out.push('>');
        if inline {
            for child in &self.children {
                write_leaf(child, out);
            }
        } else {
            out.push('\n');
            for child in &self.children {
                match child {
                    XmlNode::Element(e) => e.write_to(out, depth + 1),
                    leaf => {
                        out.push_str(&"\t".repeat(depth + 1));
                        write_leaf(leaf, out);
                        out.push('\n');
                    }
                }
            }
            out.push_str(&indent);
        }
        let _ = writeln!(out, "</{}>", self.name);
    }
}

fn write_leaf(node: &XmlNode, out: &mut String) {
    match node {
        XmlNode::Text(t) => out.push_str(&escape(t, false)),
        XmlNode::CData(t) => {
            out.push_str("<![CDATA[");
            out.push_str(&t.replace("]]>", "]]]]><![CDATA[>"));
            out.push_str("]]>");
        }
        XmlNode::Element(_) => {}
    }
}

/// Escapes text for XML content or attribute values.
pub fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\n' if attribute => out.push_str("&#x0A;"),
            '\t' if attribute => out.push_str("&#x09;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders a complete document with the standard declaration.
pub fn to_document(root: &XmlElement) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\" ?>\n");
    root.write_to(&mut out, 0);
    out
}

// --- roxmltree helpers ---

pub(crate) fn child_elements<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    name: &str,
) -> impl Iterator<Item = roxmltree::Node<'a, 'input>> {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

pub(crate) fn first_child<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

/// Reads an integer attribute; non-numeric values read as `None`.
pub(crate) fn int_attr(node: roxmltree::Node<'_, '_>, name: &str) -> Option<i64> {
    node.attribute(name).and_then(|v| v.trim().parse().ok())
}

/// Reads a boolean attribute written as `0/1` or `true/false`.
pub(crate) fn bool_attr(node: roxmltree::Node<'_, '_>, name: &str) -> Option<bool> {
    match node.attribute(name)?.trim() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        other => other.parse::<i64>().ok().map(|v| v != 0),
    }
}

/// Concatenated text of a node (CDATA included).
pub(crate) fn text_of(node: roxmltree::Node<'_, '_>) -> String {
    node.children()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_nested_elements() {
        let mut root = XmlElement::new("Project");
        root.push(XmlElement::new("Option").with_attr("title", "a \"b\" & c"));
        let unit = root.push(XmlElement::new("Unit").with_attr("filename", "main.cpp"));
        unit.push(XmlElement::new("Option").with_attr("compile", 0));
        let mut out = String::new();
        root.write_to(&mut out, 0);
        assert_eq!(
            out,
            "<Project>\n\t<Option title=\"a &quot;b&quot; &amp; c\" />\n\t<Unit filename=\"main.cpp\">\n\t\t<Option compile=\"0\" />\n\t</Unit>\n</Project>\n"
        );
    }

    #[test]
    fn test_cdata_and_text() {
        let mut notes = XmlElement::new("notes");
        notes.push_cdata("a <b>");
        let mut out = String::new();
        notes.write_to(&mut out, 1);
        assert_eq!(out, "\t<notes><![CDATA[a <b>]]></notes>\n");
    }

    #[test]
    fn test_from_node_roundtrip() {
        let src = "<Extensions><debugger><remote host=\"x\" /></debugger><code_completion /></Extensions>";
        let doc = roxmltree::Document::parse(src).unwrap();
        let tree = XmlElement::from_node(doc.root_element());
        assert_eq!(tree.elements().count(), 2);
        let text = to_document(&tree);
        let again = roxmltree::Document::parse(&text).unwrap();
        assert_eq!(XmlElement::from_node(again.root_element()), tree);
    }

    #[test]
    fn test_child_mut_creates_once() {
        let mut root = XmlElement::new("Extensions");
        root.child_mut("envvars").set_attr("set", "default");
        root.child_mut("envvars").set_attr("set", "other");
        assert_eq!(root.elements().count(), 1);
        assert_eq!(root.first_child("envvars").unwrap().attr("set"), Some("other"));
    }
}
