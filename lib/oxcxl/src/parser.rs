//! CXL parser built on `quick-xml`.
//!
//! The parser is permissive: it does not validate connection endpoints
//! (dangling ids are a conversion-time concern) and it keeps everything it
//! does not recognize, either as extra attributes on the typed records or as
//! raw XML chunks on the document.

use crate::error::{CxlParseError, CxlSyntaxError};
use crate::model::{Appearance, Concept, Connection, CxlDocument, LinkingPhrase};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::io::Read;

/// A parser for CXL concept-map documents.
///
/// Documents are human-authored and bounded in size, so the whole input is
/// read into memory before parsing.
pub struct CxlParser;

impl CxlParser {
    /// Parses a CXL document from a [`Read`] implementation, expecting UTF-8.
    pub fn parse_read<R: Read>(mut reader: R) -> Result<CxlDocument, CxlParseError> {
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        let content = String::from_utf8(buffer)
            .map_err(|e| CxlSyntaxError::msg(format!("invalid UTF-8 in CXL document: {e}")))?;
        Self::parse_str(&content)
    }

    /// Parses a CXL document from a string.
    pub fn parse_str(content: &str) -> Result<CxlDocument, CxlParseError> {
        InternalCxlParser::new(content).parse()
    }
}

struct InternalCxlParser<'a> {
    content: &'a str,
    reader: Reader<&'a [u8]>,
    document: CxlDocument,
    appearances: HashMap<String, Appearance>,
    in_res_meta: bool,
    seen_cmap: bool,
}

impl<'a> InternalCxlParser<'a> {
    fn new(content: &'a str) -> Self {
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);
        Self {
            content,
            reader,
            document: CxlDocument::default(),
            appearances: HashMap::new(),
            in_res_meta: false,
            seen_cmap: false,
        }
    }

    fn parse(mut self) -> Result<CxlDocument, CxlParseError> {
        loop {
            let event_start = self.position();
            match self.reader.read_event().map_err(CxlParseError::from)? {
                Event::Start(event) => self.parse_start(&event, event_start, false)?,
                Event::Empty(event) => self.parse_start(&event, event_start, true)?,
                Event::End(event) => {
                    if event.local_name().as_ref() == b"res-meta" {
                        self.in_res_meta = false;
                    }
                }
                Event::Text(_) | Event::CData(_) => (),
                Event::Eof => break,
                Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => (),
            }
        }
        if !self.seen_cmap {
            return Err(CxlSyntaxError::msg("missing <cmap> root element").into());
        }
        self.attach_appearances();
        Ok(self.document)
    }

    fn parse_start(
        &mut self,
        event: &BytesStart<'_>,
        event_start: usize,
        empty: bool,
    ) -> Result<(), CxlParseError> {
        let name = event.local_name();
        if self.in_res_meta {
            // each child is kept whole: the raw inner XML survives nesting
            let name = String::from_utf8_lossy(event.name().as_ref()).into_owned();
            let text = if empty {
                String::new()
            } else {
                let span = self
                    .reader
                    .read_to_end(event.name())
                    .map_err(CxlParseError::from)?;
                let start = usize::try_from(span.start).unwrap_or(usize::MAX);
                let end = usize::try_from(span.end).unwrap_or(usize::MAX);
                self.content.get(start..end).unwrap_or("").trim().to_owned()
            };
            self.document.res_meta.push((name, text));
            return Ok(());
        }
        match name.as_ref() {
            b"cmap" => self.seen_cmap = true,
            b"map"
            | b"concept-list"
            | b"linking-phrase-list"
            | b"connection-list"
            | b"concept-appearance-list"
            | b"linking-phrase-appearance-list"
            | b"connection-appearance-list" => (),
            b"res-meta" => self.in_res_meta = !empty,
            b"concept" => {
                let mut concept = Concept::default();
                for (key, value) in self.attributes(event)? {
                    match key.as_str() {
                        "id" => concept.id = value,
                        "label" => concept.label = value,
                        "long-comment" => concept.long_comment = Some(value),
                        _ => concept.extra.push((key, value)),
                    }
                }
                if concept.id.is_empty() {
                    return Err(CxlSyntaxError::msg("<concept> without id attribute").into());
                }
                self.document.concepts.push(concept);
            }
            b"linking-phrase" => {
                let mut phrase = LinkingPhrase::default();
                for (key, value) in self.attributes(event)? {
                    match key.as_str() {
                        "id" => phrase.id = value,
                        "label" => phrase.label = value,
                        _ => phrase.extra.push((key, value)),
                    }
                }
                if phrase.id.is_empty() {
                    return Err(CxlSyntaxError::msg("<linking-phrase> without id attribute").into());
                }
                self.document.linking_phrases.push(phrase);
            }
            b"connection" => {
                let mut connection = Connection::default();
                for (key, value) in self.attributes(event)? {
                    match key.as_str() {
                        "id" => connection.id = Some(value),
                        "from-id" => connection.from = value,
                        "to-id" => connection.to = value,
                        _ => connection.extra.push((key, value)),
                    }
                }
                if connection.from.is_empty() || connection.to.is_empty() {
                    return Err(CxlSyntaxError::msg(
                        "<connection> without from-id and to-id attributes",
                    )
                    .into());
                }
                self.document.connections.push(connection);
            }
            b"concept-appearance" | b"linking-phrase-appearance" | b"connection-appearance" => {
                let mut id = None;
                let mut appearance = Appearance::default();
                for (key, value) in self.attributes(event)? {
                    match key.as_str() {
                        "id" => id = Some(value),
                        "x" => appearance.x = value.parse().ok(),
                        "y" => appearance.y = value.parse().ok(),
                        "width" => appearance.width = value.parse().ok(),
                        "height" => appearance.height = value.parse().ok(),
                        "border-shape" => appearance.border_shape = Some(value),
                        "border-style" => appearance.border_style = Some(value),
                        "background-color" => appearance.background_color = Some(value),
                        "font-style" => appearance.font_style = Some(value),
                        _ => appearance.extra.push((key, value)),
                    }
                }
                let Some(id) = id else {
                    return Err(CxlSyntaxError::msg("appearance without id attribute").into());
                };
                self.appearances.insert(id, appearance);
            }
            _ => {
                // unrecognized element: keep its raw XML for re-serialization
                if !empty {
                    self.reader
                        .read_to_end(event.name())
                        .map_err(CxlParseError::from)?;
                }
                let event_end = self.position();
                if let Some(raw) = self.content.get(event_start..event_end) {
                    // the span may carry inter-element whitespace ahead of the tag
                    self.document.unknown.push(raw.trim().to_owned());
                }
            }
        }
        Ok(())
    }

    fn attributes(&self, event: &BytesStart<'_>) -> Result<Vec<(String, String)>, CxlParseError> {
        let mut attributes = Vec::new();
        for attribute in event.attributes() {
            let attribute = attribute.map_err(quick_xml::Error::InvalidAttr)?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute
                .decode_and_unescape_value(self.reader.decoder())
                .map_err(CxlParseError::from)?
                .into_owned();
            attributes.push((key, value));
        }
        Ok(attributes)
    }

    fn attach_appearances(&mut self) {
        for concept in &mut self.document.concepts {
            if let Some(appearance) = self.appearances.remove(&concept.id) {
                concept.appearance = appearance;
            }
        }
        for phrase in &mut self.document.linking_phrases {
            if let Some(appearance) = self.appearances.remove(&phrase.id) {
                phrase.appearance = appearance;
            }
        }
        for connection in &mut self.document.connections {
            if let Some(id) = &connection.id {
                if let Some(appearance) = self.appearances.remove(id) {
                    connection.appearance = appearance;
                }
            }
        }
    }

    fn position(&self) -> usize {
        usize::try_from(self.reader.buffer_position()).unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_document() {
        let doc = CxlParser::parse_str(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<cmap xmlns="http://cmap.ihmc.us/xml/cmap/">
 <res-meta>
  <dc:title>experiment</dc:title>
 </res-meta>
 <map>
  <concept-list>
   <concept id="c1" label="cat" long-comment="likes milk"/>
   <concept id="c2" label="animal"/>
  </concept-list>
  <linking-phrase-list>
   <linking-phrase id="p1" label="is a"/>
  </linking-phrase-list>
  <connection-list>
   <connection id="x1" from-id="c1" to-id="p1"/>
   <connection id="x2" from-id="p1" to-id="c2"/>
  </connection-list>
  <concept-appearance-list>
   <concept-appearance id="c1" x="10" y="20" border-shape="oval"/>
  </concept-appearance-list>
 </map>
</cmap>"#,
        )
        .unwrap();
        assert_eq!(doc.res_meta, vec![("dc:title".into(), "experiment".into())]);
        assert_eq!(doc.concepts.len(), 2);
        assert_eq!(doc.concepts[0].label, "cat");
        assert_eq!(doc.concepts[0].long_comment.as_deref(), Some("likes milk"));
        assert_eq!(doc.concepts[0].appearance.x, Some(10));
        assert_eq!(
            doc.concepts[0].appearance.border_shape.as_deref(),
            Some("oval")
        );
        assert_eq!(doc.linking_phrases.len(), 1);
        assert_eq!(doc.connections.len(), 2);
        assert_eq!(doc.connections[0].from, "c1");
        assert_eq!(doc.connections[1].to, "c2");
    }

    #[test]
    fn unknown_attributes_and_elements_are_kept() {
        let doc = CxlParser::parse_str(
            r#"<cmap><map>
  <concept-list><concept id="c1" label="cat" font-size="12"/></concept-list>
  <style-sheet-list><style-sheet id="s1"><map-style background-color="white"/></style-sheet></style-sheet-list>
</map></cmap>"#,
        )
        .unwrap();
        assert_eq!(
            doc.concepts[0].extra,
            vec![("font-size".into(), "12".into())]
        );
        assert_eq!(doc.unknown.len(), 1);
        assert!(doc.unknown[0].starts_with("<style-sheet-list>"));
        assert!(doc.unknown[0].contains("background-color=\"white\""));
    }

    #[test]
    fn nested_res_meta_children_keep_their_parent() {
        let doc = CxlParser::parse_str(
            r#"<cmap>
 <res-meta>
  <dc:creator><vcard:FN>John</vcard:FN></dc:creator>
  <dc:language>en</dc:language>
 </res-meta>
 <map/>
</cmap>"#,
        )
        .unwrap();
        assert_eq!(
            doc.res_meta,
            vec![
                ("dc:creator".into(), "<vcard:FN>John</vcard:FN>".into()),
                ("dc:language".into(), "en".into()),
            ]
        );
    }

    #[test]
    fn missing_id_is_a_parse_error() {
        assert!(
            CxlParser::parse_str(r#"<cmap><map><concept-list><concept label="x"/></concept-list></map></cmap>"#)
                .is_err()
        );
    }

    #[test]
    fn missing_root_is_a_parse_error() {
        assert!(CxlParser::parse_str("<other/>").is_err());
    }
}
