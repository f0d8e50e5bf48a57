//! Conversion between [`Record`] and the index's XML document format.
//!
//! Records are written as Solr update documents:
//!
//! ```xml
//! <add>
//!   <doc>
//!     <field name="id">ds1</field>
//!     <field name="title">Dataset One</field>
//!     <field name="variable">hfss</field>
//!     <field name="variable">tas</field>
//!   </doc>
//! </add>
//! ```
//!
//! Reading accepts both that shape and the `<str>`/`<arr>` shape of select
//! responses, so a record survives a trip through the index unchanged.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::models::fields;
use crate::xml::{self, XmlElement};
use crate::{AppError, Record};

/// Element names carrying a single scalar value in select responses.
const SCALAR_ELEMENTS: &[&str] = &[
    "field", "str", "int", "long", "float", "double", "bool", "date",
];

/// Serializes records to index documents and back.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordSerializer;

impl RecordSerializer {
    pub fn new() -> Self {
        Self
    }

    /// Serializes a record into an `<add>` update document.
    ///
    /// With `pretty_print` the output is indented; field values are never
    /// padded, so both forms read back to the same record.
    pub fn serialize(&self, record: &Record, pretty_print: bool) -> Result<String, AppError> {
        let mut writer = if pretty_print {
            Writer::new_with_indent(Vec::new(), b' ', 2)
        } else {
            Writer::new(Vec::new())
        };

        write(&mut writer, Event::Start(BytesStart::new("add")))?;
        write(&mut writer, Event::Start(BytesStart::new("doc")))?;
        write_field(&mut writer, fields::ID, record.id())?;
        for field in record.fields() {
            for value in &field.values {
                write_field(&mut writer, &field.name, value)?;
            }
        }
        write(&mut writer, Event::End(BytesEnd::new("doc")))?;
        write(&mut writer, Event::End(BytesEnd::new("add")))?;

        String::from_utf8(writer.into_inner()).map_err(|e| AppError::Generic(e.to_string()))
    }

    /// Builds a record from a document element.
    ///
    /// `element` may be the `<doc>` itself or any ancestor of it (such as
    /// `<add>`); the first `<doc>` found is used. Elements that are not
    /// recognised field carriers are ignored.
    ///
    /// # Errors
    ///
    /// Returns `AppError::MalformedDocument` if there is no `<doc>` element or
    /// the document carries no identifier.
    pub fn deserialize(&self, element: &XmlElement) -> Result<Record, AppError> {
        let doc = element
            .find("doc")
            .ok_or_else(|| AppError::MalformedDocument("no <doc> element found".to_string()))?;

        let mut values: Vec<(&str, &str)> = Vec::new();
        for child in doc.children() {
            let Some(name) = child.attribute("name") else {
                continue;
            };
            if SCALAR_ELEMENTS.contains(&child.name.as_str()) {
                values.push((name, child.text()));
            } else if child.name == "arr" {
                values.extend(child.children().iter().map(|item| (name, item.text())));
            }
        }

        let id = doc
            .attribute(fields::ID)
            .or_else(|| {
                values
                    .iter()
                    .find(|(name, _)| *name == fields::ID)
                    .map(|(_, value)| *value)
            })
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| AppError::MalformedDocument("document has no id".to_string()))?;

        let mut record = Record::new(id)?;
        for (name, value) in values {
            if name != fields::ID {
                record.add_field(name, value);
            }
        }
        Ok(record)
    }

    /// Parses `xml` and deserializes its first `<doc>`.
    pub fn deserialize_str(&self, xml: &str) -> Result<Record, AppError> {
        self.deserialize(&xml::parse_document(xml)?)
    }

    /// Update document removing one record by identifier.
    pub fn delete_document(&self, id: &str) -> Result<String, AppError> {
        let mut writer = Writer::new(Vec::new());
        write(&mut writer, Event::Start(BytesStart::new("delete")))?;
        write(&mut writer, Event::Start(BytesStart::new("id")))?;
        write(&mut writer, Event::Text(BytesText::new(id)))?;
        write(&mut writer, Event::End(BytesEnd::new("id")))?;
        write(&mut writer, Event::End(BytesEnd::new("delete")))?;
        String::from_utf8(writer.into_inner()).map_err(|e| AppError::Generic(e.to_string()))
    }

    /// Update document asking the index to make pending changes visible.
    pub fn commit_document(&self) -> &'static str {
        "<commit/>"
    }
}

fn write_field(writer: &mut Writer<Vec<u8>>, name: &str, value: &str) -> Result<(), AppError> {
    let mut start = BytesStart::new("field");
    start.push_attribute(("name", name));
    // Empty values are written as empty elements so indentation cannot leak into them.
    if value.is_empty() {
        return write(writer, Event::Empty(start));
    }
    write(writer, Event::Start(start))?;
    write(writer, Event::Text(BytesText::new(value)))?;
    write(writer, Event::End(BytesEnd::new("field")))
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), AppError> {
    writer
        .write_event(event)
        .map_err(|e| AppError::Generic(format!("failed to write XML: {e}")))
}
