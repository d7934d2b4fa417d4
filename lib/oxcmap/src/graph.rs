//! RDF graph model of a converted concept map.
//!
//! A conversion produces two subgraphs: the instance subgraph (the facts the
//! diagram states) and the visualization subgraph (layout, styles, node ids,
//! everything under the `vis:` vocabulary). They are kept separate so they
//! can be written to one or two output targets.

use crate::config::Config;
use crate::error::ConvertError;
use crate::vocab::{dct, owl, rdfs, sh, skos, vis};
use oxrdf::vocab::{rdf, xsd};
use oxrdf::{Graph, NamedNode, NamedOrBlankNode, NamedOrBlankNodeRef, Term, TermRef, Triple};
use oxrdfio::{RdfFormat, RdfParser, RdfSerializer};
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::io::{Read, Write};

/// Namespace under which instance resources are minted by default.
pub const URN_UUID: &str = "urn:uuid:";

/// RFC 4122 namespace id for names that are URLs, used for name-based UUIDs.
const UUID_URL_NAMESPACE: [u8; 16] = [
    0x6b, 0xa7, 0xb8, 0x11, 0x9d, 0xad, 0x11, 0xd1, 0x80, 0xb4, 0x00, 0xc0, 0x4f, 0xd4, 0x30, 0xc8,
];

/// Mints a named resource with a deterministic name-based (version 5) UUID.
///
/// The same name always yields the same IRI, within one run and across runs.
pub fn deterministic_resource(name: &str) -> NamedNode {
    let mut iri = String::with_capacity(URN_UUID.len() + 36);
    iri.push_str(URN_UUID);
    iri.push_str(&uuid_v5(name));
    NamedNode::new_unchecked(iri)
}

fn uuid_v5(name: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(UUID_URL_NAMESPACE);
    hasher.update(name.as_bytes());
    let hash = hasher.finalize();
    let mut bytes = [0_u8; 16];
    bytes.copy_from_slice(&hash[..16]);
    bytes[6] = (bytes[6] & 0x0F) | 0x50; // version 5
    bytes[8] = (bytes[8] & 0x3F) | 0x80; // RFC 4122 variant
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(36);
    for (i, b) in bytes.iter().enumerate() {
        if matches!(i, 4 | 6 | 8 | 10) {
            out.push('-');
        }
        out.push(HEX[usize::from(b >> 4)] as char);
        out.push(HEX[usize::from(b & 0x0F)] as char);
    }
    out
}

/// The two subgraphs produced by a conversion.
#[derive(Debug, Clone, Default)]
pub struct MappedGraph {
    /// Facts stated by the diagram.
    pub instances: Graph,
    /// Layout, styles and document bookkeeping under the `vis:` vocabulary.
    pub visualization: Graph,
}

impl MappedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union of both subgraphs, for single-target output.
    pub fn merged(&self) -> Graph {
        let mut merged = self.instances.clone();
        for triple in self.visualization.iter() {
            merged.insert(triple);
        }
        merged
    }

    /// Partitions an already merged graph back into the two subgraphs.
    ///
    /// A triple belongs to the visualization subgraph iff its predicate or a
    /// resource object is in the `vis:` namespace.
    pub fn split(merged: &Graph) -> Self {
        let mut graph = Self::new();
        for triple in merged.iter() {
            let is_vis = triple.predicate.as_str().starts_with(vis::NAMESPACE)
                || matches!(triple.object, TermRef::NamedNode(n) if n.as_str().starts_with(vis::NAMESPACE));
            if is_vis {
                graph.visualization.insert(triple);
            } else {
                graph.instances.insert(triple);
            }
        }
        graph
    }

    /// Does the visualization subgraph carry node id annotations, i.e. was
    /// this graph produced by a document conversion?
    pub fn has_document_annotations(&self) -> bool {
        self.visualization
            .triples_for_predicate(vis::NODE_ID)
            .next()
            .is_some()
    }
}

/// Mapping from short names to namespace IRIs, used only for display
/// compaction and CURIE expansion, never for identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixTable {
    entries: BTreeMap<String, String>,
}

impl PrefixTable {
    /// The built-in registry every run starts from.
    pub fn builtin() -> Self {
        let mut table = Self {
            entries: BTreeMap::new(),
        };
        table.insert("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#");
        table.insert("rdfs", rdfs::NAMESPACE);
        table.insert("xsd", "http://www.w3.org/2001/XMLSchema#");
        table.insert("owl", owl::NAMESPACE);
        table.insert("sh", sh::NAMESPACE);
        table.insert("dct", dct::NAMESPACE);
        table.insert("skos", skos::NAMESPACE);
        table.insert("vis", vis::NAMESPACE);
        table
    }

    /// The built-in registry extended with configured prefixes.
    pub fn from_config(config: &Config) -> Self {
        let mut table = Self::builtin();
        table.insert(&config.ontology_prefix, &config.ontology_namespace);
        for (name, iri) in &config.prefixes {
            table.insert(name, iri);
        }
        table
    }

    pub fn insert(&mut self, name: impl Into<String>, iri: impl Into<String>) {
        self.entries.insert(name.into(), iri.into());
    }

    /// Expands `prefix:local` against the table.
    pub fn expand(&self, curie: &str) -> Option<String> {
        let (prefix, local) = curie.split_once(':')?;
        let namespace = self.entries.get(prefix)?;
        Some(format!("{namespace}{local}"))
    }

    /// Compacts an IRI to `prefix:local` if a namespace matches.
    pub fn compact(&self, iri: &str) -> Option<String> {
        self.entries.iter().find_map(|(prefix, namespace)| {
            let local = iri.strip_prefix(namespace)?;
            // the remainder must be a plain local name
            if local.is_empty() || local.contains(['/', '#', ':']) {
                return None;
            }
            Some(format!("{prefix}:{local}"))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, iri)| (name.as_str(), iri.as_str()))
    }
}

impl Default for PrefixTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Reads a graph from a reader, returning it with the prefixes the input
/// declared.
pub fn read_graph(
    read: impl Read,
    format: RdfFormat,
) -> Result<(Graph, Vec<(String, String)>), ConvertError> {
    let mut parser = RdfParser::from_format(format).for_reader(read);
    let mut graph = Graph::new();
    for quad in &mut parser {
        let quad = quad?;
        graph.insert(&oxrdf::Triple::new(
            quad.subject,
            quad.predicate,
            quad.object,
        ));
    }
    let prefixes = parser
        .prefixes()
        .map(|(name, iri)| (name.to_owned(), iri.to_owned()))
        .collect();
    Ok((graph, prefixes))
}

/// Writes a graph, applying the prefix table when the format and the
/// configuration allow compaction.
pub fn write_graph(
    write: impl Write,
    format: RdfFormat,
    graph: &Graph,
    prefixes: &PrefixTable,
    use_prefixes: bool,
) -> Result<(), ConvertError> {
    let mut serializer = RdfSerializer::from_format(format);
    if use_prefixes {
        for (name, iri) in prefixes.iter() {
            if namespace_is_used(graph, iri) {
                serializer = serializer.with_prefix(name, iri)?;
            }
        }
    }
    let mut writer = serializer.for_writer(write);
    for triple in graph.iter() {
        writer.serialize_triple(triple)?;
    }
    writer.finish()?;
    Ok(())
}

/// Does any term of the graph live under the given namespace? Only used
/// prefixes are declared, so the header of a split output never names the
/// other subgraph's vocabulary.
fn namespace_is_used(graph: &Graph, namespace: &str) -> bool {
    graph.iter().any(|triple| {
        if let NamedOrBlankNodeRef::NamedNode(subject) = triple.subject {
            if subject.as_str().starts_with(namespace) {
                return true;
            }
        }
        if triple.predicate.as_str().starts_with(namespace) {
            return true;
        }
        match triple.object {
            TermRef::NamedNode(object) => object.as_str().starts_with(namespace),
            TermRef::Literal(literal) => literal.datatype().as_str().starts_with(namespace),
            _ => false,
        }
    })
}

/// Replaces every blank node with a deterministically named resource, for
/// consumers that cannot handle blank nodes. The same blank node label is
/// always replaced by the same IRI.
pub fn remove_blank_nodes(graph: &Graph) -> Graph {
    let mut skolemized = Graph::new();
    for triple in graph.iter() {
        let subject: NamedOrBlankNode = match triple.subject {
            NamedOrBlankNodeRef::BlankNode(node) => {
                deterministic_resource(&format!("bnode-{}", node.as_str())).into()
            }
            other => other.into_owned(),
        };
        let object: Term = match triple.object {
            TermRef::BlankNode(node) => {
                deterministic_resource(&format!("bnode-{}", node.as_str())).into()
            }
            other => other.into_owned(),
        };
        skolemized.insert(&Triple::new(subject, triple.predicate.into_owned(), object));
    }
    skolemized
}

/// The local name of an IRI: everything after the last `#`, `/` or `:`.
pub(crate) fn local_name(iri: &str) -> &str {
    iri.rfind(['#', '/', ':'])
        .map_or(iri, |position| &iri[position + 1..])
}

/// UpperCamelCase normalization, used for minted class and shape names.
pub(crate) fn upper_camel(name: &str) -> String {
    camel(name, true)
}

/// lowerCamelCase normalization, used for minted property names.
pub(crate) fn lower_camel(name: &str) -> String {
    camel(name, false)
}

fn camel(name: &str, mut upper_next: bool) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            if out.is_empty() && !upper_next {
                out.extend(c.to_lowercase());
            } else if upper_next {
                out.extend(c.to_uppercase());
            } else {
                out.push(c);
            }
            upper_next = false;
        } else {
            upper_next = true;
        }
    }
    out
}

/// Typed literal helper for integer values.
pub(crate) fn integer_literal(value: i64) -> oxrdf::Literal {
    oxrdf::Literal::new_typed_literal(value.to_string(), xsd::INTEGER)
}

/// `rdf:type` shorthand used across the synthesizers.
pub(crate) fn type_of<'a>(
    graph: &'a Graph,
    subject: impl Into<oxrdf::NamedOrBlankNodeRef<'a>>,
) -> Option<oxrdf::NamedNodeRef<'a>> {
    graph
        .objects_for_subject_predicate(subject, rdf::TYPE)
        .find_map(|o| match o {
            TermRef::NamedNode(n) => Some(n),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_resources_are_stable_and_distinct() {
        let a = deterministic_resource("c1");
        let b = deterministic_resource("c1");
        let c = deterministic_resource("c2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.as_str().starts_with(URN_UUID));
        // version and variant nibbles of the minted UUID
        let uuid = &a.as_str()[URN_UUID.len()..];
        assert_eq!(uuid.len(), 36);
        assert_eq!(&uuid[14..15], "5");
        assert!(matches!(&uuid[19..20], "8" | "9" | "a" | "b"));
    }

    #[test]
    fn prefix_table_expands_and_compacts() {
        let table = PrefixTable::builtin();
        assert_eq!(
            table.expand("dct:title").as_deref(),
            Some("http://purl.org/dc/terms/title")
        );
        assert_eq!(
            table
                .compact("http://purl.org/dc/terms/title")
                .as_deref(),
            Some("dct:title")
        );
        assert_eq!(table.expand("unknown:thing"), None);
        assert_eq!(table.compact("http://elsewhere.example/x"), None);
    }

    #[test]
    fn blank_node_removal_is_stable() {
        let blank = oxrdf::BlankNode::default();
        let mut graph = Graph::new();
        graph.insert(&Triple::new(
            deterministic_resource("c1"),
            vis::APPEARANCE,
            blank.clone(),
        ));
        graph.insert(&Triple::new(
            blank,
            vis::X,
            oxrdf::Literal::new_simple_literal("10"),
        ));
        let skolemized = remove_blank_nodes(&graph);
        assert_eq!(skolemized.len(), 2);
        let owner: Vec<_> = skolemized
            .objects_for_subject_predicate(deterministic_resource("c1").as_ref(), vis::APPEARANCE)
            .collect();
        let TermRef::NamedNode(node) = owner[0] else {
            panic!("blank node survived skolemization");
        };
        assert!(
            skolemized
                .triples_for_subject(node)
                .any(|t| t.predicate == vis::X)
        );
    }

    #[test]
    fn only_used_prefixes_are_declared() {
        let mut graph = Graph::new();
        graph.insert(&Triple::new(
            deterministic_resource("c1"),
            crate::vocab::dct::TITLE,
            oxrdf::Literal::new_simple_literal("cat"),
        ));
        let mut out = Vec::new();
        write_graph(
            &mut out,
            RdfFormat::Turtle,
            &graph,
            &PrefixTable::builtin(),
            true,
        )
        .unwrap();
        let turtle = String::from_utf8(out).unwrap();
        assert!(turtle.contains("@prefix dct:"));
        assert!(!turtle.contains(vis::NAMESPACE));
        assert!(!turtle.contains("@prefix owl:"));
    }

    #[test]
    fn split_partitions_by_vis_namespace() {
        let subject = deterministic_resource("c1");
        let mut merged = Graph::new();
        merged.insert(&oxrdf::Triple::new(
            subject.clone(),
            crate::vocab::dct::TITLE,
            oxrdf::Literal::new_simple_literal("cat"),
        ));
        merged.insert(&oxrdf::Triple::new(
            subject.clone(),
            vis::NODE_ID,
            oxrdf::Literal::new_simple_literal("c1"),
        ));
        merged.insert(&oxrdf::Triple::new(
            subject,
            oxrdf::vocab::rdf::TYPE,
            vis::CONCEPT,
        ));
        let split = MappedGraph::split(&merged);
        assert_eq!(split.instances.len(), 1);
        assert_eq!(split.visualization.len(), 2);
        assert!(split.has_document_annotations());
    }
}
