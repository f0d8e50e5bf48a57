//! Minimal element tree over `quick-xml`, shared by the record serializer and
//! the index response mapping.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::AppError;

/// An XML element with its attributes, child elements and concatenated text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlElement>,
    text: String,
}

impl XmlElement {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Text content directly inside this element, whitespace preserved.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    /// First direct child with the given element name and `name` attribute.
    pub fn child_named(&self, element: &str, name: &str) -> Option<&XmlElement> {
        self.children
            .iter()
            .find(|c| c.name == element && c.attribute("name") == Some(name))
    }

    /// First element with the given name in a depth-first walk, including `self`.
    pub fn find(&self, element: &str) -> Option<&XmlElement> {
        if self.name == element {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(element))
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self, AppError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(malformed)?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute.unescape_value().map_err(malformed)?.into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            ..Default::default()
        })
    }
}

/// Parses the root element of an XML document.
///
/// # Errors
///
/// Returns `AppError::MalformedDocument` if the document is not well-formed or
/// contains no element.
pub fn parse_document(xml: &str) -> Result<XmlElement, AppError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<XmlElement> = Vec::new();
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(start) => stack.push(XmlElement::from_start(&start)?),
            Event::Empty(start) => {
                let element = XmlElement::from_start(&start)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => return Ok(element),
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| malformed("unbalanced closing tag"))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => return Ok(element),
                }
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text.unescape().map_err(malformed)?);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => return Err(malformed("document has no complete root element")),
            _ => {}
        }
    }
}

pub(crate) fn malformed<E: std::fmt::Display>(err: E) -> AppError {
    AppError::MalformedDocument(err.to_string())
}
