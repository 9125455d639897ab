//! Owned, read-only XML element tree.
//!
//! The CIB is parsed once per fetch with `roxmltree` and converted into
//! owned [`Element`]s so snapshots can be shared without borrowing the
//! source text. Patches are serialized with `quick-xml`. Text nodes are
//! dropped: nothing in the CIB sections we read carries meaningful text.

use crate::error::{Error, Result};
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};

/// One XML element with its attributes (in document order) and children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    /// Tag name
    pub name: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    /// Child elements
    pub children: Vec<Element>,
}

impl Element {
    /// Create an element with no attributes and no children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder form of [`Element::set_attribute`].
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Append a child element.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Value of an attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The `id` attribute.
    pub fn id(&self) -> Option<&str> {
        self.attribute("id")
    }

    /// First child with the given tag.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given tag.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Follow a `/`-separated chain of child tags.
    pub fn path(&self, path: &str) -> Option<&Element> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |element, segment| element.child(segment))
    }

    /// All elements below this one, depth first.
    pub fn descendants(&self) -> Vec<&Element> {
        let mut found = Vec::new();
        let mut stack: Vec<&Element> = self.children.iter().rev().collect();
        while let Some(element) = stack.pop() {
            found.push(element);
            stack.extend(element.children.iter().rev());
        }
        found
    }

    /// Serialize on one line, as used for `--xml-text`.
    pub fn to_xml(&self) -> Option<String> {
        let mut writer = Writer::new(Vec::new());
        self.write(&mut writer).ok()?;
        String::from_utf8(writer.into_inner()).ok()
    }

    /// Serialize with two-space indentation.
    pub fn to_pretty_xml(&self) -> Option<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        self.write(&mut writer).ok()?;
        String::from_utf8(writer.into_inner()).ok()
    }

    fn write(&self, writer: &mut Writer<Vec<u8>>) -> std::result::Result<(), String> {
        let mut start = BytesStart::new(self.name.as_str());
        for (name, value) in &self.attributes {
            start.push_attribute((name.as_str(), value.as_str()));
        }

        if self.children.is_empty() {
            return writer
                .write_event(Event::Empty(start))
                .map_err(|e| e.to_string());
        }

        writer
            .write_event(Event::Start(start))
            .map_err(|e| e.to_string())?;
        for child in &self.children {
            child.write(writer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(|e| e.to_string())
    }
}

/// Parse a document and return its root element.
pub fn parse(text: &str) -> Result<Element> {
    let document = roxmltree::Document::parse(text).map_err(|e| Error::CibParse {
        message: e.to_string(),
    })?;
    Ok(convert(document.root_element()))
}

fn convert(node: roxmltree::Node<'_, '_>) -> Element {
    Element {
        name: node.tag_name().name().to_string(),
        attributes: node
            .attributes()
            .map(|a| (a.name().to_string(), a.value().to_string()))
            .collect(),
        children: node
            .children()
            .filter(roxmltree::Node::is_element)
            .map(convert)
            .collect(),
    }
}
