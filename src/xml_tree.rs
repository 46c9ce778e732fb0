//! Owned element tree built from the quick-xml event stream.
//!
//! The parser only ever asks three questions of a document: the first
//! descendant with a tag, the direct child with a tag, and the text of the
//! first descendant with a tag. [`TreeQuery`] exposes exactly those; the rest
//! of this module is the plumbing that materializes the tree.

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::errors::IllFormedError;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};

use crate::error::GpxError;

type Result<T> = std::result::Result<T, GpxError>;

/// A single XML element with its attributes, own character data and child
/// elements. Names are stored without namespace prefix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

// Dropping a child recursively would use one stack frame per nesting level
impl Drop for Element {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut child) = pending.pop() {
            pending.append(&mut child.children);
        }
    }
}

/// Tag lookups over a labeled-node tree.
pub trait TreeQuery {
    /// First descendant named `tag`, in document order.
    fn first_descendant(&self, tag: &str) -> Option<&Element>;

    /// The element named `tag` that is a direct child of `self`.
    ///
    /// When only one descendant carries the tag it is returned wherever it
    /// sits. With several, the direct children are scanned and the last match
    /// wins; if none of them match, the first descendant is kept.
    fn direct_child(&self, tag: &str) -> Option<&Element>;

    /// Text content of the first descendant named `tag`.
    ///
    /// `None` means the element does not exist; an empty element yields
    /// `Some("")`.
    fn text_of(&self, tag: &str) -> Option<&str>;
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = std::str::from_utf8(start.local_name().as_ref())?.to_string();

        let mut attributes = Vec::new();
        for attr_result in start.attributes() {
            let attr = attr_result?;
            let key = std::str::from_utf8(attr.key.local_name().as_ref())?.to_string();
            let raw = std::str::from_utf8(&attr.value)?;
            let value = unescape(raw)
                .map(Cow::into_owned)
                .unwrap_or_else(|_| raw.to_string());
            attributes.push((key, value));
        }

        Ok(Self {
            name,
            attributes,
            text: String::new(),
            children: Vec::new(),
        })
    }

    /// Value of the attribute with the given local name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// All descendants (excluding `self`) in document order.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.children.iter().rev().collect(),
        }
    }

    /// All descendants named `tag`, in document order.
    pub fn descendants_named<'a, 't>(
        &'a self,
        tag: &'t str,
    ) -> impl Iterator<Item = &'a Element> + use<'a, 't> {
        self.descendants().filter(move |e| e.name == tag)
    }
}

impl TreeQuery for Element {
    fn first_descendant(&self, tag: &str) -> Option<&Element> {
        self.descendants().find(|e| e.name == tag)
    }

    fn direct_child(&self, tag: &str) -> Option<&Element> {
        let mut matches = self.descendants().filter(|e| e.name == tag);
        let first = matches.next()?;
        if matches.next().is_none() {
            return Some(first);
        }

        self.children
            .iter()
            .rev()
            .find(|child| child.name == tag)
            .or(Some(first))
    }

    fn text_of(&self, tag: &str) -> Option<&str> {
        self.first_descendant(tag).map(|e| e.text.as_str())
    }
}

/// Pre-order iterator over an element's descendants.
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

/// Parse an XML string into a tree rooted at an unnamed document node.
///
/// The root's children are the document's top-level elements, so a GPX file
/// yields a root with a single `gpx` child.
pub fn parse_document(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    let mut stack = vec![Element::default()];

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(Element::from_start(&e)?),
            Ok(Event::Empty(e)) => {
                let element = Element::from_start(&e)?;
                attach(&mut stack, element);
            }
            Ok(Event::End(_)) => {
                if stack.len() > 1 {
                    if let Some(element) = stack.pop() {
                        attach(&mut stack, element);
                    }
                }
            }
            Ok(Event::Text(e)) => {
                let raw = std::str::from_utf8(e.as_ref())?;
                push_text(&mut stack, raw);
            }
            Ok(Event::CData(e)) => {
                let raw = std::str::from_utf8(e.as_ref())?;
                push_text(&mut stack, raw);
            }
            Ok(Event::GeneralRef(e)) => {
                // Character references (&#60; &#x3C;) first, then the predefined entities
                if let Ok(Some(ch)) = e.resolve_char_ref() {
                    push_text(&mut stack, ch.encode_utf8(&mut [0; 4]));
                } else {
                    let name = std::str::from_utf8(e.as_ref())?;
                    match name {
                        "amp" => push_text(&mut stack, "&"),
                        "lt" => push_text(&mut stack, "<"),
                        "gt" => push_text(&mut stack, ">"),
                        "quot" => push_text(&mut stack, "\""),
                        "apos" => push_text(&mut stack, "'"),
                        _ => {} // Unknown entity, skip
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(GpxError::XmlParse(e)),
            _ => {}
        }
    }

    // A truncated document is not repaired
    if stack.len() > 1 {
        let open = stack.last().map(|e| e.name.clone()).unwrap_or_default();
        return Err(GpxError::XmlParse(quick_xml::Error::IllFormed(
            IllFormedError::MissingEndTag(open),
        )));
    }

    Ok(stack.pop().unwrap_or_default())
}

fn attach(stack: &mut [Element], element: Element) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    }
}

fn push_text(stack: &mut [Element], text: &str) {
    if let Some(current) = stack.last_mut() {
        current.text.push_str(text);
    }
}
