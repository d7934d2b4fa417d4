//! Bidirectional mapping between concept-map documents and RDF graphs.
//!
//! `document_to_graph` turns a [`CxlDocument`] into the two subgraphs of a
//! [`MappedGraph`]; `graph_to_document` is the inverse. The round-trip
//! contract is that converting a document to a graph and back preserves every
//! document-observable field: concepts, phrases, connections and labels.

use crate::config::Config;
use crate::error::ConvertError;
use crate::graph::{MappedGraph, PrefixTable, deterministic_resource, integer_literal, local_name};
use crate::vocab::{dct, vis};
use oxcxl::{Appearance, Concept, Connection, CxlDocument, LinkingPhrase};
use oxrdf::vocab::rdf;
use oxrdf::{
    BlankNode, Graph, Literal, NamedNode, NamedNodeRef, NamedOrBlankNode, NamedOrBlankNodeRef,
    TermRef, Triple,
};
use std::collections::{BTreeMap, BTreeSet};

/// Document-local node id under which opaque document payloads (`res-meta`,
/// unknown elements) are parked in the visualization subgraph.
const DOCUMENT_NODE_ID: &str = "cxl-document";

/// Bidirectional association between document-local ids and graph resources.
///
/// Stable and deterministic: the same document id always yields the same
/// resource identity, within one run and across runs over the same input.
#[derive(Debug, Clone, Default)]
pub struct NodeIdentity {
    id_to_resource: BTreeMap<String, NamedNode>,
    resource_to_id: BTreeMap<String, String>,
}

impl NodeIdentity {
    pub fn record(&mut self, id: impl Into<String>, resource: NamedNode) {
        let id = id.into();
        self.resource_to_id.insert(resource.as_str().to_owned(), id.clone());
        self.id_to_resource.insert(id, resource);
    }

    pub fn resource(&self, id: &str) -> Option<&NamedNode> {
        self.id_to_resource.get(id)
    }

    pub fn node_id(&self, iri: &str) -> Option<&str> {
        self.resource_to_id.get(iri).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NamedNode)> {
        self.id_to_resource
            .iter()
            .map(|(id, resource)| (id.as_str(), resource))
    }
}

/// Result of a forward conversion.
#[derive(Debug, Clone)]
pub struct Mapping {
    pub graph: MappedGraph,
    pub identity: NodeIdentity,
}

/// Converts a document into an RDF graph, unifying any external graphs first.
///
/// Fails with [`ConvertError::Structural`] when a connection references a
/// node id that does not resolve within the document.
pub fn document_to_graph(
    document: &CxlDocument,
    extra_graphs: &[Graph],
    config: &Config,
) -> Result<Mapping, ConvertError> {
    for connection in &document.connections {
        for id in [&connection.from, &connection.to] {
            if document.node(id).is_none() {
                return Err(ConvertError::Structural { id: id.clone() });
            }
        }
    }

    let prefixes = PrefixTable::from_config(config);
    let mut graph = MappedGraph::new();

    // all merging happens before any minting so identity reconciliation can
    // see every node id annotation the external graphs carry
    for extra in extra_graphs {
        let split = MappedGraph::split(extra);
        for triple in split.instances.iter() {
            graph.instances.insert(triple);
        }
        for triple in split.visualization.iter() {
            graph.visualization.insert(triple);
        }
    }

    let mut identity = NodeIdentity::default();
    for concept in &document.concepts {
        let resource = resolve_resource(&concept.id, &graph.visualization);
        identity.record(concept.id.clone(), resource);
    }
    for phrase in &document.linking_phrases {
        let resource = resolve_resource(&phrase.id, &graph.visualization);
        identity.record(phrase.id.clone(), resource);
    }

    let mut state = ForwardState {
        document,
        config,
        prefixes,
        identity,
        graph,
    };
    state.map_concepts();
    state.map_linking_phrases();
    state.map_connections();
    state.map_document_payload();

    Ok(Mapping {
        graph: state.graph,
        identity: state.identity,
    })
}

/// Reuses an identity from merged graphs when one carries the node id
/// annotation, otherwise derives a deterministic IRI from the id itself.
fn resolve_resource(id: &str, merged_vis: &Graph) -> NamedNode {
    let id_literal = Literal::new_simple_literal(id);
    if let Some(NamedOrBlankNodeRef::NamedNode(existing)) =
        merged_vis.subject_for_predicate_object(vis::NODE_ID, &id_literal)
    {
        return existing.into_owned();
    }
    // ids of documents that were themselves rebuilt from a graph embed the
    // original resource identity
    if id.contains("://") || id.starts_with("urn:") {
        if let Ok(resource) = NamedNode::new(id) {
            return resource;
        }
    }
    deterministic_resource(id)
}

struct ForwardState<'a> {
    document: &'a CxlDocument,
    config: &'a Config,
    prefixes: PrefixTable,
    identity: NodeIdentity,
    graph: MappedGraph,
}

impl ForwardState<'_> {
    fn map_concepts(&mut self) {
        for concept in &self.document.concepts {
            let resource = self.identity.resource(&concept.id).cloned();
            let Some(resource) = resource else { continue };
            if let Some(class) = label_as_iri(&concept.label, &self.prefixes) {
                self.graph
                    .instances
                    .insert(&Triple::new(resource.clone(), rdf::TYPE, class));
            }
            if self.config.add_titles && !concept.label.is_empty() {
                self.graph.instances.insert(&Triple::new(
                    resource.clone(),
                    dct::TITLE,
                    Literal::new_simple_literal(&concept.label),
                ));
            }

            let vis_graph = &mut self.graph.visualization;
            vis_graph.insert(&Triple::new(resource.clone(), rdf::TYPE, vis::CONCEPT));
            vis_graph.insert(&Triple::new(
                resource.clone(),
                vis::NODE_ID,
                Literal::new_simple_literal(&concept.id),
            ));
            vis_graph.insert(&Triple::new(
                resource.clone(),
                vis::LABEL,
                Literal::new_simple_literal(&concept.label),
            ));
            if !self.config.drop_long_comments {
                if let Some(comment) = &concept.long_comment {
                    vis_graph.insert(&Triple::new(
                        resource.clone(),
                        vis::LONG_COMMENT,
                        Literal::new_simple_literal(comment),
                    ));
                }
            }
            for (position, (key, value)) in concept.extra.iter().enumerate() {
                vis_graph.insert(&Triple::new(
                    resource.clone(),
                    vis::EXTRA_ATTRIBUTE,
                    Literal::new_simple_literal(format!("{position}:{key}={value}")),
                ));
            }
            self.write_appearance(
                resource.into(),
                &concept.appearance,
                &format!("{}-appearance", concept.id),
            );
        }
    }

    fn map_linking_phrases(&mut self) {
        for phrase in &self.document.linking_phrases {
            let resource = self.identity.resource(&phrase.id).cloned();
            let Some(resource) = resource else { continue };
            let predicate = self.phrase_predicate(phrase);

            let incoming: Vec<&Connection> =
                self.document.connections_to(&phrase.id).collect();
            let outgoing: Vec<&Connection> =
                self.document.connections_from(&phrase.id).collect();

            if incoming.len() == 1 && outgoing.len() == 1 {
                // plain binary relation: one predicate directly joining the
                // two endpoints, the phrase resource stays out of the
                // instance subgraph
                let from = self.identity.resource(&incoming[0].from).cloned();
                let to = self.identity.resource(&outgoing[0].to).cloned();
                if let (Some(from), Some(to)) = (from, to) {
                    self.graph
                        .instances
                        .insert(&Triple::new(from, predicate.clone(), to));
                }
            } else if incoming.len() + outgoing.len() >= 1 {
                // n-ary relation: reify the phrase as an intermediate
                // resource, the predicate is used on both sides
                for connection in &incoming {
                    if let Some(from) = self.identity.resource(&connection.from).cloned() {
                        self.graph.instances.insert(&Triple::new(
                            from,
                            predicate.clone(),
                            resource.clone(),
                        ));
                    }
                }
                for connection in &outgoing {
                    if let Some(to) = self.identity.resource(&connection.to).cloned() {
                        self.graph.instances.insert(&Triple::new(
                            resource.clone(),
                            predicate.clone(),
                            to,
                        ));
                    }
                }
            }
            if self.config.add_titles
                && !phrase.label.is_empty()
                && predicate.as_str().starts_with(crate::graph::URN_UUID)
            {
                // minted predicates are unreadable without their label
                self.graph.instances.insert(&Triple::new(
                    predicate.clone(),
                    dct::TITLE,
                    Literal::new_simple_literal(&phrase.label),
                ));
            }

            let vis_graph = &mut self.graph.visualization;
            vis_graph.insert(&Triple::new(
                resource.clone(),
                rdf::TYPE,
                vis::LINKING_PHRASE,
            ));
            vis_graph.insert(&Triple::new(
                resource.clone(),
                vis::NODE_ID,
                Literal::new_simple_literal(&phrase.id),
            ));
            vis_graph.insert(&Triple::new(
                resource.clone(),
                vis::LABEL,
                Literal::new_simple_literal(&phrase.label),
            ));
            vis_graph.insert(&Triple::new(resource.clone(), vis::PREDICATE, predicate));
            for (position, (key, value)) in phrase.extra.iter().enumerate() {
                vis_graph.insert(&Triple::new(
                    resource.clone(),
                    vis::EXTRA_ATTRIBUTE,
                    Literal::new_simple_literal(format!("{position}:{key}={value}")),
                ));
            }
            self.write_appearance(
                resource.into(),
                &phrase.appearance,
                &format!("{}-appearance", phrase.id),
            );
        }
    }

    fn map_connections(&mut self) {
        for (index, connection) in self.document.connections.iter().enumerate() {
            let from = self.identity.resource(&connection.from).cloned();
            let to = self.identity.resource(&connection.to).cloned();
            let (Some(from), Some(to)) = (from, to) else {
                continue;
            };
            let anchor = connection
                .id
                .clone()
                .unwrap_or_else(|| format!("connection-{index}"));
            let record = self.anonymous_node(&anchor);
            let vis_graph = &mut self.graph.visualization;
            vis_graph.insert(&Triple::new(record.clone(), rdf::TYPE, vis::CONNECTION));
            if let Some(id) = &connection.id {
                vis_graph.insert(&Triple::new(
                    record.clone(),
                    vis::NODE_ID,
                    Literal::new_simple_literal(id),
                ));
            }
            vis_graph.insert(&Triple::new(record.clone(), vis::FROM, from));
            vis_graph.insert(&Triple::new(record.clone(), vis::TO, to));
            for (position, (key, value)) in connection.extra.iter().enumerate() {
                vis_graph.insert(&Triple::new(
                    record.clone(),
                    vis::EXTRA_ATTRIBUTE,
                    Literal::new_simple_literal(format!("{position}:{key}={value}")),
                ));
            }
            self.write_appearance(record, &connection.appearance, &format!("{anchor}-appearance"));
        }
    }

    fn map_document_payload(&mut self) {
        if self.document.res_meta.is_empty() && self.document.unknown.is_empty() {
            return;
        }
        let node = deterministic_resource(DOCUMENT_NODE_ID);
        let vis_graph = &mut self.graph.visualization;
        vis_graph.insert(&Triple::new(
            node.clone(),
            vis::NODE_ID,
            Literal::new_simple_literal(DOCUMENT_NODE_ID),
        ));
        for (position, (name, text)) in self.document.res_meta.iter().enumerate() {
            vis_graph.insert(&Triple::new(
                node.clone(),
                vis::RES_META,
                Literal::new_simple_literal(format!("{position}:{name}\n{text}")),
            ));
        }
        for (position, raw) in self.document.unknown.iter().enumerate() {
            vis_graph.insert(&Triple::new(
                node.clone(),
                vis::EXTRA_ELEMENT,
                Literal::new_simple_literal(format!("{position}:{raw}")),
            ));
        }
    }

    fn write_appearance(
        &mut self,
        owner: NamedOrBlankNode,
        appearance: &Appearance,
        anchor: &str,
    ) {
        if appearance.is_empty() {
            return;
        }
        let node = self.anonymous_node(anchor);
        let vis_graph = &mut self.graph.visualization;
        vis_graph.insert(&Triple::new(owner, vis::APPEARANCE, node.clone()));
        if let Some(x) = appearance.x {
            vis_graph.insert(&Triple::new(node.clone(), vis::X, integer_literal(x)));
        }
        if let Some(y) = appearance.y {
            vis_graph.insert(&Triple::new(node.clone(), vis::Y, integer_literal(y)));
        }
        if let Some(width) = appearance.width {
            vis_graph.insert(&Triple::new(node.clone(), vis::WIDTH, integer_literal(width)));
        }
        if let Some(height) = appearance.height {
            vis_graph.insert(&Triple::new(
                node.clone(),
                vis::HEIGHT,
                integer_literal(height),
            ));
        }
        for (predicate, value) in [
            (vis::BORDER_SHAPE, &appearance.border_shape),
            (vis::BORDER_STYLE, &appearance.border_style),
            (vis::BACKGROUND_COLOR, &appearance.background_color),
            (vis::FONT_STYLE, &appearance.font_style),
        ] {
            if let Some(value) = value {
                vis_graph.insert(&Triple::new(
                    node.clone(),
                    predicate,
                    Literal::new_simple_literal(value),
                ));
            }
        }
        for (position, (key, value)) in appearance.extra.iter().enumerate() {
            vis_graph.insert(&Triple::new(
                node.clone(),
                vis::EXTRA_ATTRIBUTE,
                Literal::new_simple_literal(format!("{position}:{key}={value}")),
            ));
        }
    }

    /// An anonymous visualization node: a true blank node, or a
    /// deterministically named resource under the named-node policy.
    fn anonymous_node(&self, anchor: &str) -> NamedOrBlankNode {
        if self.config.use_blank_nodes {
            BlankNode::default().into()
        } else {
            deterministic_resource(anchor).into()
        }
    }

    fn phrase_predicate(&self, phrase: &LinkingPhrase) -> NamedNode {
        label_as_iri(&phrase.label, &self.prefixes)
            .unwrap_or_else(|| deterministic_resource(&format!("predicate-{}", phrase.id)))
    }
}

/// Parses a diagram label as a CURIE against the prefix table, or as an
/// absolute IRI. Labels with whitespace are plain text, never IRIs.
fn label_as_iri(label: &str, prefixes: &PrefixTable) -> Option<NamedNode> {
    let label = label.trim();
    if label.is_empty() || label.contains(char::is_whitespace) {
        return None;
    }
    if let Some(expanded) = prefixes.expand(label) {
        return NamedNode::new(expanded).ok();
    }
    if label.contains("://") || label.starts_with("urn:") {
        return NamedNode::new(label).ok();
    }
    None
}

/// Inverse mapping: reconstructs a document from a graph.
///
/// When the graph carries the visualization subgraph of an earlier forward
/// conversion, the document is rebuilt from those records; otherwise one
/// concept is synthesized per instance resource and one linking phrase per
/// predicate occurrence, with grid-placed layout.
pub fn graph_to_document(
    graph: &MappedGraph,
    config: &Config,
) -> Result<CxlDocument, ConvertError> {
    let prefixes = PrefixTable::from_config(config);
    let mut builder = ReverseBuilder {
        graph,
        config,
        prefixes,
        document: CxlDocument::default(),
        known: BTreeMap::new(),
    };
    if graph.has_document_annotations() {
        builder.rebuild_from_annotations();
    }
    builder.synthesize_remaining();
    builder.attach_comments();
    builder.rebuild_document_payload();
    builder.finish()
}

struct ReverseBuilder<'a> {
    graph: &'a MappedGraph,
    config: &'a Config,
    prefixes: PrefixTable,
    document: CxlDocument,
    /// resource IRI or blank id -> document-local id, for every rebuilt node
    known: BTreeMap<String, String>,
}

impl ReverseBuilder<'_> {
    fn rebuild_from_annotations(&mut self) {
        let vis_graph = &self.graph.visualization;

        let mut concepts: Vec<NamedOrBlankNodeRef<'_>> = vis_graph
            .subjects_for_predicate_object(rdf::TYPE, vis::CONCEPT)
            .collect();
        concepts.sort_unstable_by_key(|r| r.to_string());
        for resource in concepts {
            let Some(id) = string_value(vis_graph, resource, vis::NODE_ID) else {
                continue;
            };
            let label = string_value(&self.graph.instances, resource, dct::TITLE)
                .or_else(|| string_value(vis_graph, resource, vis::LABEL))
                .unwrap_or_default();
            let long_comment = if self.config.drop_long_comments {
                None
            } else {
                string_value(vis_graph, resource, vis::LONG_COMMENT).map(str::to_owned)
            };
            self.known.insert(resource.to_string(), id.to_owned());
            let concept = Concept {
                id: id.to_owned(),
                label: label.to_owned(),
                long_comment,
                appearance: self.read_appearance(resource),
                extra: self.read_extras(resource),
            };
            self.document.concepts.push(concept);
        }

        let mut phrases: Vec<NamedOrBlankNodeRef<'_>> = vis_graph
            .subjects_for_predicate_object(rdf::TYPE, vis::LINKING_PHRASE)
            .collect();
        phrases.sort_unstable_by_key(|r| r.to_string());
        for resource in phrases {
            let Some(id) = string_value(vis_graph, resource, vis::NODE_ID) else {
                continue;
            };
            let label = string_value(vis_graph, resource, vis::LABEL).unwrap_or_default();
            self.known.insert(resource.to_string(), id.to_owned());
            let phrase = LinkingPhrase {
                id: id.to_owned(),
                label: label.to_owned(),
                appearance: self.read_appearance(resource),
                extra: self.read_extras(resource),
            };
            self.document.linking_phrases.push(phrase);
        }

        let mut records: Vec<NamedOrBlankNodeRef<'_>> = vis_graph
            .subjects_for_predicate_object(rdf::TYPE, vis::CONNECTION)
            .collect();
        records.sort_unstable_by_key(|r| r.to_string());
        for record in records {
            let from = self.connection_endpoint(record, vis::FROM);
            let to = self.connection_endpoint(record, vis::TO);
            let (Some(from), Some(to)) = (from, to) else {
                continue;
            };
            let connection = Connection {
                id: string_value(vis_graph, record, vis::NODE_ID).map(str::to_owned),
                from,
                to,
                appearance: self.read_appearance(record),
                extra: self.read_extras(record),
            };
            self.document.connections.push(connection);
        }
    }

    /// The document-local id of a connection endpoint resource.
    fn connection_endpoint(
        &self,
        record: NamedOrBlankNodeRef<'_>,
        side: NamedNodeRef<'_>,
    ) -> Option<String> {
        let endpoint = self
            .graph
            .visualization
            .objects_for_subject_predicate(record, side)
            .next()?;
        self.known.get(&endpoint.to_string()).cloned()
    }

    /// Synthesizes concepts, phrases and connections for instance data that
    /// no visualization record covers (plain RDF input, merged externals).
    fn synthesize_remaining(&mut self) {
        let instances = &self.graph.instances;

        // resources used as predicate annotations only are relation labels,
        // not data nodes; class IRIs live on the schema level
        let mut predicates: BTreeSet<String> = BTreeSet::new();
        let mut classes: BTreeSet<String> = BTreeSet::new();
        for triple in instances.iter() {
            predicates.insert(triple.predicate.to_string());
            if triple.predicate == rdf::TYPE {
                classes.insert(triple.object.to_string());
            }
        }

        // a configured instance namespace overrides the class exclusion:
        // resources minted there are data nodes even when also used as types
        let config = self.config;
        let in_instance_namespace = |node: NamedOrBlankNodeRef<'_>| match node {
            NamedOrBlankNodeRef::NamedNode(n) => config.is_instance_iri(n.as_str()),
            NamedOrBlankNodeRef::BlankNode(_) => false,
        };
        let mut nodes: Vec<NamedOrBlankNode> = Vec::new();
        let mut seen: BTreeSet<String> = BTreeSet::new();
        for triple in instances.iter() {
            let subject_key = triple.subject.to_string();
            if triple.predicate != rdf::TYPE
                || !classes.contains(&subject_key)
                || in_instance_namespace(triple.subject)
            {
                if !predicates.contains(&subject_key) && seen.insert(subject_key) {
                    nodes.push(triple.subject.into_owned());
                }
            }
            if triple.predicate == rdf::TYPE {
                continue;
            }
            if let Some(object) = term_as_subject(triple.object) {
                let object_key = object.to_string();
                if !predicates.contains(&object_key)
                    && (!classes.contains(&object_key) || in_instance_namespace(object))
                    && seen.insert(object_key)
                {
                    nodes.push(object.into_owned());
                }
            }
        }

        let mut grid_index = self.document.concepts.len();
        for node in &nodes {
            let key = node.to_string();
            if self.known.contains_key(&key) {
                continue;
            }
            let id = document_id_for(node);
            let label = self.synthesized_label(node.as_ref());
            self.known.insert(key, id.clone());
            self.document.concepts.push(Concept {
                id,
                label,
                long_comment: None,
                appearance: grid_appearance(grid_index),
                extra: Vec::new(),
            });
            grid_index += 1;
        }

        // one linking phrase per uncovered statement between two data nodes
        let phrase_predicates: BTreeSet<String> = self
            .graph
            .visualization
            .triples_for_predicate(vis::PREDICATE)
            .map(|t| t.object.to_string())
            .collect();
        let mut statements: Vec<(String, NamedNodeRef<'_>, String)> = Vec::new();
        for triple in instances.iter() {
            if triple.predicate == rdf::TYPE || triple.predicate == dct::TITLE {
                continue;
            }
            if phrase_predicates.contains(&triple.predicate.to_string()) {
                continue;
            }
            let subject_key = triple.subject.to_string();
            let object_key = triple.object.to_string();
            let (Some(from), Some(to)) =
                (self.known.get(&subject_key), self.known.get(&object_key))
            else {
                continue;
            };
            statements.push((from.clone(), triple.predicate, to.clone()));
        }
        statements.sort_unstable_by(|a, b| {
            (&a.0, a.1.as_str(), &a.2).cmp(&(&b.0, b.1.as_str(), &b.2))
        });
        for (from, predicate, to) in statements {
            let minted = deterministic_resource(&format!(
                "{from} {predicate} {to}",
                predicate = predicate.as_str()
            ));
            let phrase_id = format!(
                "rel-{}",
                minted.as_str().trim_start_matches(crate::graph::URN_UUID)
            );
            // a CURIE re-expands through the prefix table; anything else keeps
            // the full IRI as its label so a later forward conversion restores
            // the predicate identity
            let label = self
                .prefixes
                .compact(predicate.as_str())
                .unwrap_or_else(|| predicate.as_str().to_owned());
            self.document.linking_phrases.push(LinkingPhrase {
                id: phrase_id.clone(),
                label,
                appearance: grid_appearance(grid_index),
                extra: Vec::new(),
            });
            grid_index += 1;
            self.document.connections.push(Connection {
                id: None,
                from,
                to: phrase_id.clone(),
                appearance: Appearance::default(),
                extra: Vec::new(),
            });
            self.document.connections.push(Connection {
                id: None,
                from: phrase_id,
                to,
                appearance: Appearance::default(),
                extra: Vec::new(),
            });
        }
    }

    /// Regenerates or extends long comments so that instance statements the
    /// document cannot express structurally still survive re-serialization.
    fn attach_comments(&mut self) {
        let resource_of: BTreeMap<&str, &str> = self
            .known
            .iter()
            .map(|(resource, id)| (id.as_str(), resource.as_str()))
            .collect();
        let covered: BTreeSet<String> = self.covered_predicates();

        for concept in &mut self.document.concepts {
            let Some(resource) = resource_of.get(concept.id.as_str()) else {
                continue;
            };
            let mut lines: Vec<String> = Vec::new();
            for triple in self.graph.instances.iter() {
                if triple.subject.to_string() != *resource {
                    continue;
                }
                let predicate = triple.predicate.as_str();
                let is_opaque = matches!(triple.object, TermRef::Literal(_))
                    && triple.predicate != dct::TITLE
                    && !covered.contains(predicate);
                if self.config.drop_long_comments || is_opaque {
                    let compact_predicate = self
                        .prefixes
                        .compact(predicate)
                        .unwrap_or_else(|| predicate.to_owned());
                    lines.push(format!("{compact_predicate} {}", triple.object));
                }
            }
            if lines.is_empty() {
                continue;
            }
            lines.sort_unstable();
            let generated = lines.join("\n");
            match &mut concept.long_comment {
                Some(comment) if !self.config.drop_long_comments => {
                    if !comment.contains(&generated) {
                        comment.push('\n');
                        comment.push_str(&generated);
                    }
                }
                slot => *slot = Some(generated),
            }
        }
    }

    /// Predicates already expressed structurally by the rebuilt document.
    fn covered_predicates(&self) -> BTreeSet<String> {
        self.graph
            .visualization
            .triples_for_predicate(vis::PREDICATE)
            .filter_map(|t| match t.object {
                TermRef::NamedNode(n) => Some(n.as_str().to_owned()),
                _ => None,
            })
            .collect()
    }

    fn rebuild_document_payload(&mut self) {
        let vis_graph = &self.graph.visualization;
        let mut res_meta: Vec<(usize, String, String)> = vis_graph
            .triples_for_predicate(vis::RES_META)
            .filter_map(|t| match t.object {
                TermRef::Literal(l) => {
                    let (position, entry) = split_position(l.value());
                    let (name, text) = entry.split_once('\n')?;
                    Some((position, name.to_owned(), text.to_owned()))
                }
                _ => None,
            })
            .collect();
        res_meta.sort_unstable();
        self.document.res_meta = res_meta
            .into_iter()
            .map(|(_, name, text)| (name, text))
            .collect();
        let mut unknown: Vec<(usize, String)> = vis_graph
            .triples_for_predicate(vis::EXTRA_ELEMENT)
            .filter_map(|t| match t.object {
                TermRef::Literal(l) => {
                    let (position, raw) = split_position(l.value());
                    Some((position, raw.to_owned()))
                }
                _ => None,
            })
            .collect();
        unknown.sort_unstable();
        self.document.unknown = unknown.into_iter().map(|(_, raw)| raw).collect();
    }

    fn finish(mut self) -> Result<CxlDocument, ConvertError> {
        self.document.concepts.sort_by(|a, b| a.id.cmp(&b.id));
        self.document
            .linking_phrases
            .sort_by(|a, b| a.id.cmp(&b.id));
        self.document.connections.sort_by(|a, b| {
            (&a.from, &a.to, &a.id).cmp(&(&b.from, &b.to, &b.id))
        });
        Ok(self.document)
    }

    fn read_appearance(&self, owner: NamedOrBlankNodeRef<'_>) -> Appearance {
        let vis_graph = &self.graph.visualization;
        let Some(node) = vis_graph
            .objects_for_subject_predicate(owner, vis::APPEARANCE)
            .find_map(term_as_subject)
        else {
            return Appearance::default();
        };
        let mut appearance = Appearance {
            x: integer_value(vis_graph, node, vis::X),
            y: integer_value(vis_graph, node, vis::Y),
            width: integer_value(vis_graph, node, vis::WIDTH),
            height: integer_value(vis_graph, node, vis::HEIGHT),
            border_shape: string_value(vis_graph, node, vis::BORDER_SHAPE).map(str::to_owned),
            border_style: string_value(vis_graph, node, vis::BORDER_STYLE).map(str::to_owned),
            background_color: string_value(vis_graph, node, vis::BACKGROUND_COLOR)
                .map(str::to_owned),
            font_style: string_value(vis_graph, node, vis::FONT_STYLE).map(str::to_owned),
            extra: Vec::new(),
        };
        appearance.extra = read_extra_attributes(vis_graph, node);
        appearance
    }

    fn read_extras(&self, owner: NamedOrBlankNodeRef<'_>) -> Vec<(String, String)> {
        read_extra_attributes(&self.graph.visualization, owner)
    }

    fn synthesized_label(&self, node: NamedOrBlankNodeRef<'_>) -> String {
        if let Some(title) = string_value(&self.graph.instances, node, dct::TITLE) {
            return title.to_owned();
        }
        if let Some(class) = crate::graph::type_of(&self.graph.instances, node) {
            if let Some(curie) = self.prefixes.compact(class.as_str()) {
                return curie;
            }
        }
        match node {
            NamedOrBlankNodeRef::NamedNode(n) => local_name(n.as_str()).to_owned(),
            NamedOrBlankNodeRef::BlankNode(b) => b.as_str().to_owned(),
        }
    }
}

/// The document-local id a plain graph resource is rebuilt under. The IRI
/// itself is used so that a later forward conversion restores the identity.
fn document_id_for(node: &NamedOrBlankNode) -> String {
    match node {
        NamedOrBlankNode::NamedNode(n) => n.as_str().to_owned(),
        NamedOrBlankNode::BlankNode(b) => format!("bnode-{}", b.as_str()),
    }
}

fn grid_appearance(index: usize) -> Appearance {
    let column = i64::try_from(index % 6).unwrap_or(0);
    let row = i64::try_from(index / 6).unwrap_or(0);
    Appearance {
        x: Some(100 + column * 220),
        y: Some(80 + row * 140),
        ..Appearance::default()
    }
}

fn term_as_subject(term: TermRef<'_>) -> Option<NamedOrBlankNodeRef<'_>> {
    match term {
        TermRef::NamedNode(n) => Some(NamedOrBlankNodeRef::NamedNode(n)),
        TermRef::BlankNode(b) => Some(NamedOrBlankNodeRef::BlankNode(b)),
        _ => None,
    }
}

fn string_value<'a>(
    graph: &'a Graph,
    subject: impl Into<NamedOrBlankNodeRef<'a>>,
    predicate: NamedNodeRef<'a>,
) -> Option<&'a str> {
    graph
        .objects_for_subject_predicate(subject, predicate)
        .find_map(|object| match object {
            TermRef::Literal(literal) => Some(literal.value()),
            _ => None,
        })
}

fn integer_value<'a>(
    graph: &'a Graph,
    subject: impl Into<NamedOrBlankNodeRef<'a>>,
    predicate: NamedNodeRef<'a>,
) -> Option<i64> {
    string_value(graph, subject, predicate)?.parse().ok()
}

fn read_extra_attributes<'a>(
    graph: &'a Graph,
    owner: impl Into<NamedOrBlankNodeRef<'a>>,
) -> Vec<(String, String)> {
    let mut extras: Vec<(usize, String, String)> = graph
        .objects_for_subject_predicate(owner, vis::EXTRA_ATTRIBUTE)
        .filter_map(|object| match object {
            TermRef::Literal(literal) => {
                let (position, entry) = split_position(literal.value());
                let (key, value) = entry.split_once('=')?;
                Some((position, key.to_owned(), value.to_owned()))
            }
            _ => None,
        })
        .collect();
    extras.sort_unstable();
    extras
        .into_iter()
        .map(|(_, key, value)| (key, value))
        .collect()
}

/// Splits the document-order position off an opaque payload literal.
/// Entries without one (externally authored graphs) sort after the
/// positioned ones, in lexicographic order.
fn split_position(value: &str) -> (usize, &str) {
    match value.split_once(':') {
        Some((prefix, rest)) => match prefix.parse() {
            Ok(position) => (position, rest),
            Err(_) => (usize::MAX, value),
        },
        None => (usize::MAX, value),
    }
}

#[cfg(test)]
fn title_of(graph: &Graph, resource: &NamedNode) -> Option<String> {
    string_value(graph, resource.as_ref(), dct::TITLE).map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxcxl::CxlParser;

    fn chain_document() -> CxlDocument {
        CxlParser::parse_str(
            r#"<cmap><map>
 <concept-list>
  <concept id="a" label="A"/>
  <concept id="b" label="B"/>
  <concept id="c" label="C"/>
 </concept-list>
 <linking-phrase-list>
  <linking-phrase id="r1" label="relates to"/>
  <linking-phrase id="r2" label="dct:hasPart"/>
 </linking-phrase-list>
 <connection-list>
  <connection id="x1" from-id="a" to-id="r1"/>
  <connection id="x2" from-id="r1" to-id="b"/>
  <connection id="x3" from-id="b" to-id="r2"/>
  <connection id="x4" from-id="r2" to-id="c"/>
 </connection-list>
 <concept-appearance-list>
  <concept-appearance id="a" x="10" y="10" border-shape="oval"/>
  <concept-appearance id="c" x="400" y="10" border-style="dashed"/>
 </concept-appearance-list>
</map></cmap>"#,
        )
        .unwrap()
    }

    #[test]
    fn binary_phrases_become_direct_predicates() {
        let config = Config::default();
        let mapping = document_to_graph(&chain_document(), &[], &config).unwrap();
        let a = mapping.identity.resource("a").unwrap().clone();
        let b = mapping.identity.resource("b").unwrap().clone();
        let c = mapping.identity.resource("c").unwrap().clone();
        // r2 resolves as a CURIE, r1 is minted
        assert!(mapping.graph.instances.contains(&Triple::new(
            b.clone(),
            NamedNode::new_unchecked("http://purl.org/dc/terms/hasPart"),
            c,
        )));
        let minted: Vec<_> = mapping
            .graph
            .instances
            .triples_for_subject(a.as_ref())
            .filter(|t| t.object == TermRef::from(b.as_ref()))
            .collect();
        assert_eq!(minted.len(), 1, "one direct triple from A to B");
        assert!(minted[0].predicate.as_str().starts_with("urn:uuid:"));
        // the phrase resource itself stays out of the instance subgraph
        let r1 = mapping.identity.resource("r1").unwrap().clone();
        assert!(
            mapping
                .graph
                .instances
                .triples_for_subject(r1.as_ref())
                .all(|t| t.predicate == dct::TITLE)
        );
    }

    #[test]
    fn n_ary_phrases_are_reified() {
        let document = CxlParser::parse_str(
            r#"<cmap><map>
 <concept-list>
  <concept id="a" label="A"/>
  <concept id="b" label="B"/>
  <concept id="c" label="C"/>
 </concept-list>
 <linking-phrase-list>
  <linking-phrase id="r" label="involves"/>
 </linking-phrase-list>
 <connection-list>
  <connection from-id="a" to-id="r"/>
  <connection from-id="r" to-id="b"/>
  <connection from-id="r" to-id="c"/>
 </connection-list>
</map></cmap>"#,
        )
        .unwrap();
        let config = Config::default();
        let mapping = document_to_graph(&document, &[], &config).unwrap();
        let a = mapping.identity.resource("a").unwrap().clone();
        let r = mapping.identity.resource("r").unwrap().clone();
        let b = mapping.identity.resource("b").unwrap().clone();
        let c = mapping.identity.resource("c").unwrap().clone();
        let predicate = mapping
            .graph
            .instances
            .triples_for_subject(a.as_ref())
            .find(|t| t.object == TermRef::from(r.as_ref()))
            .map(|t| t.predicate.into_owned())
            .expect("A links to the reified phrase");
        assert!(mapping.graph.instances.contains(&Triple::new(
            r.clone(),
            predicate.clone(),
            b
        )));
        assert!(mapping.graph.instances.contains(&Triple::new(r, predicate, c)));
    }

    #[test]
    fn structural_error_carries_the_offending_id() {
        let document = CxlParser::parse_str(
            r#"<cmap><map>
 <concept-list><concept id="a" label="A"/></concept-list>
 <connection-list><connection from-id="a" to-id="ghost"/></connection-list>
</map></cmap>"#,
        )
        .unwrap();
        let error = document_to_graph(&document, &[], &Config::default()).unwrap_err();
        match error {
            ConvertError::Structural { id } => assert_eq!(id, "ghost"),
            other => panic!("expected structural error, got {other}"),
        }
    }

    #[test]
    fn conversion_is_deterministic() {
        let config = Config::default();
        let first = document_to_graph(&chain_document(), &[], &config).unwrap();
        let second = document_to_graph(&chain_document(), &[], &config).unwrap();
        for (id, resource) in first.identity.iter() {
            assert_eq!(second.identity.resource(id), Some(resource));
        }
        assert_eq!(
            first.graph.instances.len(),
            second.graph.instances.len()
        );
    }

    #[test]
    fn blank_node_policy_does_not_change_instance_semantics() {
        let with_blanks = document_to_graph(&chain_document(), &[], &Config::default())
            .unwrap()
            .graph
            .instances;
        let without_blanks = document_to_graph(
            &chain_document(),
            &[],
            &Config {
                use_blank_nodes: false,
                ..Config::default()
            },
        )
        .unwrap()
        .graph
        .instances;
        let mut left: Vec<String> = with_blanks.iter().map(|t| t.to_string()).collect();
        let mut right: Vec<String> = without_blanks.iter().map(|t| t.to_string()).collect();
        left.sort_unstable();
        right.sort_unstable();
        assert_eq!(left, right);
    }

    #[test]
    fn round_trip_preserves_observable_fields() {
        let config = Config::default();
        let document = chain_document();
        let mapping = document_to_graph(&document, &[], &config).unwrap();
        let rebuilt = graph_to_document(&mapping.graph, &config).unwrap();
        assert_eq!(document.concepts, rebuilt.concepts);
        assert_eq!(document.linking_phrases, rebuilt.linking_phrases);
        let mut connections = document.connections.clone();
        connections.sort_by(|a, b| (&a.from, &a.to, &a.id).cmp(&(&b.from, &b.to, &b.id)));
        assert_eq!(connections, rebuilt.connections);
    }

    #[test]
    fn round_trip_keeps_opaque_payloads_in_document_order() {
        let mut document = CxlParser::parse_str(
            r#"<cmap><map>
 <concept-list><concept id="a" label="A" zeta="1" alpha="2"/></concept-list>
</map></cmap>"#,
        )
        .unwrap();
        document.res_meta = vec![
            ("dc:title".to_owned(), "zoo".to_owned()),
            ("dc:creator".to_owned(), "ada".to_owned()),
        ];
        document.unknown = vec!["<z/>".to_owned(), "<a/>".to_owned()];
        let config = Config::default();
        let mapping = document_to_graph(&document, &[], &config).unwrap();
        let rebuilt = graph_to_document(&mapping.graph, &config).unwrap();
        assert_eq!(
            rebuilt.concept("a").unwrap().extra,
            vec![
                ("zeta".to_owned(), "1".to_owned()),
                ("alpha".to_owned(), "2".to_owned())
            ]
        );
        assert_eq!(rebuilt.res_meta, document.res_meta);
        assert_eq!(rebuilt.unknown, document.unknown);
    }

    #[test]
    fn instance_namespaces_reclaim_class_resources() {
        let a = NamedNode::new_unchecked("http://data.example.com/a");
        let x = NamedNode::new_unchecked("http://data.example.com/x");
        let part_of = NamedNode::new_unchecked("http://data.example.com/partOf");
        let mut instances = Graph::new();
        instances.insert(&Triple::new(a.clone(), rdf::TYPE, x.clone()));
        instances.insert(&Triple::new(a, part_of, x.clone()));
        let graph = MappedGraph {
            instances,
            visualization: Graph::new(),
        };
        let rebuilt = graph_to_document(&graph, &Config::default()).unwrap();
        assert!(rebuilt.concepts.iter().all(|c| c.id != x.as_str()));
        let config = Config {
            instance_namespaces: vec![
                crate::graph::URN_UUID.to_owned(),
                "http://data.example.com/".to_owned(),
            ],
            ..Config::default()
        };
        let rebuilt = graph_to_document(&graph, &config).unwrap();
        assert!(rebuilt.concepts.iter().any(|c| c.id == x.as_str()));
    }

    #[test]
    fn identity_is_reconciled_against_merged_graphs() {
        let external_resource = NamedNode::new_unchecked("http://data.example.com/thing/42");
        let mut external = Graph::new();
        external.insert(&Triple::new(
            external_resource.clone(),
            vis::NODE_ID,
            Literal::new_simple_literal("a"),
        ));
        let config = Config::default();
        let mapping = document_to_graph(&chain_document(), &[external], &config).unwrap();
        assert_eq!(mapping.identity.resource("a"), Some(&external_resource));
    }

    #[test]
    fn dropping_comments_regenerates_them() {
        let mut document = chain_document();
        document.concepts[0].long_comment = Some("hand-written".to_owned());
        let config = Config {
            drop_long_comments: true,
            ..Config::default()
        };
        let mapping = document_to_graph(&document, &[], &config).unwrap();
        let rebuilt = graph_to_document(&mapping.graph, &config).unwrap();
        let a = rebuilt.concept("a").unwrap();
        let comment = a.long_comment.as_deref().unwrap_or_default();
        assert!(!comment.contains("hand-written"));
        assert!(comment.contains("dct:title"));
    }

    #[test]
    fn plain_graphs_synthesize_concepts_and_phrases() {
        let cat = NamedNode::new_unchecked("http://data.example.com/cat");
        let animal = NamedNode::new_unchecked("http://data.example.com/animal");
        let eats = NamedNode::new_unchecked("http://data.example.com/eats");
        let mut instances = Graph::new();
        instances.insert(&Triple::new(
            cat.clone(),
            dct::TITLE,
            Literal::new_simple_literal("cat"),
        ));
        instances.insert(&Triple::new(cat.clone(), eats.clone(), animal.clone()));
        let graph = MappedGraph {
            instances,
            visualization: Graph::new(),
        };
        let document = graph_to_document(&graph, &Config::default()).unwrap();
        assert_eq!(document.concepts.len(), 2);
        assert_eq!(document.linking_phrases.len(), 1);
        assert_eq!(document.connections.len(), 2);
        let concept = document
            .concepts
            .iter()
            .find(|c| c.id == cat.as_str())
            .unwrap();
        assert_eq!(concept.label, "cat");
        assert_eq!(document.linking_phrases[0].label, eats.as_str());
        // converting the rebuilt document restores the original identities
        let mapping =
            document_to_graph(&document, &[], &Config::default()).unwrap();
        assert_eq!(mapping.identity.resource(cat.as_str()), Some(&cat));
        assert!(mapping.graph.instances.contains(&Triple::new(cat, eats, animal)));
    }

    #[test]
    fn titles_survive_via_title_lookup() {
        let config = Config::default();
        let mapping = document_to_graph(&chain_document(), &[], &config).unwrap();
        let a = mapping.identity.resource("a").unwrap().clone();
        assert_eq!(
            title_of(&mapping.graph.instances, &a).as_deref(),
            Some("A")
        );
    }
}
