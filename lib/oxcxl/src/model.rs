//! In-memory representation of a CXL concept-map document.
//!
//! The model keeps exactly the fields the conversion pipeline interprets as
//! typed data and carries everything else (unknown attributes, unknown
//! elements, resource metadata) as opaque pass-through payloads so that a
//! read-modify-write cycle does not drop information it does not understand.

/// A complete CXL document: nodes, connections and layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CxlDocument {
    /// `<res-meta>` children (element name, raw inner XML), kept opaque and
    /// in order. Nested subtrees are preserved verbatim.
    pub res_meta: Vec<(String, String)>,
    pub concepts: Vec<Concept>,
    pub linking_phrases: Vec<LinkingPhrase>,
    pub connections: Vec<Connection>,
    /// Raw XML of unrecognized `<map>` children, re-emitted verbatim.
    pub unknown: Vec<String>,
}

impl CxlDocument {
    /// Resolves a document-local id against both node lists.
    pub fn node(&self, id: &str) -> Option<NodeRef<'_>> {
        if let Some(concept) = self.concepts.iter().find(|c| c.id == id) {
            return Some(NodeRef::Concept(concept));
        }
        self.linking_phrases
            .iter()
            .find(|p| p.id == id)
            .map(NodeRef::LinkingPhrase)
    }

    pub fn concept(&self, id: &str) -> Option<&Concept> {
        self.concepts.iter().find(|c| c.id == id)
    }

    pub fn linking_phrase(&self, id: &str) -> Option<&LinkingPhrase> {
        self.linking_phrases.iter().find(|p| p.id == id)
    }

    /// Connections arriving at the given node id.
    pub fn connections_to<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Connection> {
        self.connections.iter().filter(move |c| c.to == id)
    }

    /// Connections leaving the given node id.
    pub fn connections_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Connection> {
        self.connections.iter().filter(move |c| c.from == id)
    }
}

/// A diagram node carrying an instance: a box with a label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Concept {
    /// Document-local id, stable across read-modify-write cycles.
    pub id: String,
    pub label: String,
    /// Free-text comment attached to the node, often multi-line.
    pub long_comment: Option<String>,
    pub appearance: Appearance,
    /// Unrecognized attributes (name, value), in document order.
    pub extra: Vec<(String, String)>,
}

/// A connector label: semantically a relation name, not a data node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkingPhrase {
    pub id: String,
    pub label: String,
    pub appearance: Appearance,
    pub extra: Vec<(String, String)>,
}

/// An ordered pair of node ids. The direction is visual: an arrow in the
/// diagram, not necessarily the direction of the RDF triple built from it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Connection {
    pub id: Option<String>,
    pub from: String,
    pub to: String,
    pub appearance: Appearance,
    pub extra: Vec<(String, String)>,
}

/// Layout and style payload shared by all node kinds.
///
/// Only the attributes the RDF mapping interprets are typed; everything else
/// is preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Appearance {
    pub x: Option<i64>,
    pub y: Option<i64>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    /// `oval` marks the root node of path-based features.
    pub border_shape: Option<String>,
    /// `dashed` marks query target nodes.
    pub border_style: Option<String>,
    pub background_color: Option<String>,
    pub font_style: Option<String>,
    pub extra: Vec<(String, String)>,
}

impl Appearance {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// The closed set of node kinds a connection endpoint can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Concept,
    LinkingPhrase,
}

/// A borrowed view over either node kind, exposing the shared payload.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Concept(&'a Concept),
    LinkingPhrase(&'a LinkingPhrase),
}

impl<'a> NodeRef<'a> {
    pub fn id(self) -> &'a str {
        match self {
            Self::Concept(c) => &c.id,
            Self::LinkingPhrase(p) => &p.id,
        }
    }

    pub fn label(self) -> &'a str {
        match self {
            Self::Concept(c) => &c.label,
            Self::LinkingPhrase(p) => &p.label,
        }
    }

    pub fn appearance(self) -> &'a Appearance {
        match self {
            Self::Concept(c) => &c.appearance,
            Self::LinkingPhrase(p) => &p.appearance,
        }
    }

    pub fn kind(self) -> NodeKind {
        match self {
            Self::Concept(_) => NodeKind::Concept,
            Self::LinkingPhrase(_) => NodeKind::LinkingPhrase,
        }
    }
}
