//! CXL serializer built on `quick-xml`.

use crate::model::{Appearance, CxlDocument};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::{self, Write};

const CMAP_NAMESPACE: &str = "http://cmap.ihmc.us/xml/cmap/";

/// A serializer for CXL concept-map documents.
///
/// The output is stable: lists are written in model order and attributes in a
/// fixed order, so serializing an unmodified parse result is deterministic.
pub struct CxlSerializer;

impl CxlSerializer {
    /// Writes a document as CXL to a [`Write`] implementation, UTF-8 encoded.
    pub fn serialize_to_write<W: Write>(document: &CxlDocument, write: W) -> io::Result<W> {
        let mut writer = InternalCxlSerializer {
            writer: Writer::new_with_indent(write, b' ', 1),
        };
        writer.serialize(document)?;
        Ok(writer.writer.into_inner())
    }

    /// Serializes a document to a CXL string.
    pub fn serialize_to_string(document: &CxlDocument) -> io::Result<String> {
        let buffer = Self::serialize_to_write(document, Vec::new())?;
        String::from_utf8(buffer).map_err(io::Error::other)
    }
}

struct InternalCxlSerializer<W: Write> {
    writer: Writer<W>,
}

impl<W: Write> InternalCxlSerializer<W> {
    fn serialize(&mut self, document: &CxlDocument) -> io::Result<()> {
        self.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        let mut cmap = BytesStart::new("cmap");
        cmap.push_attribute(("xmlns", CMAP_NAMESPACE));
        cmap.push_attribute(("xmlns:dc", "http://purl.org/dc/elements/1.1/"));
        cmap.push_attribute(("xmlns:dcterms", "http://purl.org/dc/terms/"));
        self.write(Event::Start(cmap))?;

        if !document.res_meta.is_empty() {
            self.write(Event::Start(BytesStart::new("res-meta")))?;
            for (name, text) in &document.res_meta {
                self.write(Event::Start(BytesStart::new(name.as_str())))?;
                // raw XML from the parser, re-emitted verbatim
                self.write(Event::Text(BytesText::from_escaped(text.as_str())))?;
                self.write(Event::End(BytesEnd::new(name.as_str())))?;
            }
            self.write(Event::End(BytesEnd::new("res-meta")))?;
        }

        self.write(Event::Start(BytesStart::new("map")))?;

        if !document.concepts.is_empty() {
            self.write(Event::Start(BytesStart::new("concept-list")))?;
            for concept in &document.concepts {
                let mut element = BytesStart::new("concept");
                element.push_attribute(("id", concept.id.as_str()));
                element.push_attribute(("label", concept.label.as_str()));
                if let Some(comment) = &concept.long_comment {
                    element.push_attribute(("long-comment", comment.as_str()));
                }
                for (key, value) in &concept.extra {
                    element.push_attribute((key.as_str(), value.as_str()));
                }
                self.write(Event::Empty(element))?;
            }
            self.write(Event::End(BytesEnd::new("concept-list")))?;
        }

        if !document.linking_phrases.is_empty() {
            self.write(Event::Start(BytesStart::new("linking-phrase-list")))?;
            for phrase in &document.linking_phrases {
                let mut element = BytesStart::new("linking-phrase");
                element.push_attribute(("id", phrase.id.as_str()));
                element.push_attribute(("label", phrase.label.as_str()));
                for (key, value) in &phrase.extra {
                    element.push_attribute((key.as_str(), value.as_str()));
                }
                self.write(Event::Empty(element))?;
            }
            self.write(Event::End(BytesEnd::new("linking-phrase-list")))?;
        }

        if !document.connections.is_empty() {
            self.write(Event::Start(BytesStart::new("connection-list")))?;
            for connection in &document.connections {
                let mut element = BytesStart::new("connection");
                if let Some(id) = &connection.id {
                    element.push_attribute(("id", id.as_str()));
                }
                element.push_attribute(("from-id", connection.from.as_str()));
                element.push_attribute(("to-id", connection.to.as_str()));
                for (key, value) in &connection.extra {
                    element.push_attribute((key.as_str(), value.as_str()));
                }
                self.write(Event::Empty(element))?;
            }
            self.write(Event::End(BytesEnd::new("connection-list")))?;
        }

        self.serialize_appearance_list(
            "concept-appearance-list",
            "concept-appearance",
            document
                .concepts
                .iter()
                .map(|c| (c.id.as_str(), &c.appearance)),
        )?;
        self.serialize_appearance_list(
            "linking-phrase-appearance-list",
            "linking-phrase-appearance",
            document
                .linking_phrases
                .iter()
                .map(|p| (p.id.as_str(), &p.appearance)),
        )?;
        self.serialize_appearance_list(
            "connection-appearance-list",
            "connection-appearance",
            document
                .connections
                .iter()
                .filter_map(|c| Some((c.id.as_deref()?, &c.appearance))),
        )?;

        for raw in &document.unknown {
            self.write(Event::Text(BytesText::from_escaped(raw.as_str())))?;
        }

        self.write(Event::End(BytesEnd::new("map")))?;
        self.write(Event::End(BytesEnd::new("cmap")))?;
        Ok(())
    }

    fn serialize_appearance_list<'a>(
        &mut self,
        list_name: &str,
        element_name: &str,
        entries: impl Iterator<Item = (&'a str, &'a Appearance)>,
    ) -> io::Result<()> {
        let entries: Vec<_> = entries.filter(|(_, a)| !a.is_empty()).collect();
        if entries.is_empty() {
            return Ok(());
        }
        self.write(Event::Start(BytesStart::new(list_name)))?;
        for (id, appearance) in entries {
            let mut element = BytesStart::new(element_name);
            element.push_attribute(("id", id));
            if let Some(x) = appearance.x {
                element.push_attribute(("x", x.to_string().as_str()));
            }
            if let Some(y) = appearance.y {
                element.push_attribute(("y", y.to_string().as_str()));
            }
            if let Some(width) = appearance.width {
                element.push_attribute(("width", width.to_string().as_str()));
            }
            if let Some(height) = appearance.height {
                element.push_attribute(("height", height.to_string().as_str()));
            }
            if let Some(shape) = &appearance.border_shape {
                element.push_attribute(("border-shape", shape.as_str()));
            }
            if let Some(style) = &appearance.border_style {
                element.push_attribute(("border-style", style.as_str()));
            }
            if let Some(color) = &appearance.background_color {
                element.push_attribute(("background-color", color.as_str()));
            }
            if let Some(font) = &appearance.font_style {
                element.push_attribute(("font-style", font.as_str()));
            }
            for (key, value) in &appearance.extra {
                element.push_attribute((key.as_str(), value.as_str()));
            }
            self.write(Event::Empty(element))?;
        }
        self.write(Event::End(BytesEnd::new(list_name)))?;
        Ok(())
    }

    fn write(&mut self, event: Event<'_>) -> io::Result<()> {
        self.writer.write_event(event).map_err(io::Error::other)
    }
}
