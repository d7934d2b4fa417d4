//! Immutable per-run configuration.
//!
//! The surrounding CLI resolves flags once, builds a [`Config`] and passes it
//! by shared reference into every component. Nothing reads ambient global
//! state during a run.

use oxrdf::NamedNode;

/// Frozen configuration snapshot for one pipeline run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Write instance and visualization subgraphs to two separate targets.
    pub separate_outputs: bool,
    /// Anonymous visualization nodes are true blank nodes; when disabled they
    /// become deterministically named UUID resources instead. Never changes
    /// instance subgraph semantics.
    pub use_blank_nodes: bool,
    /// Emit `dct:title` triples from diagram labels.
    pub add_titles: bool,
    /// Apply the prefix table when writing Turtle.
    pub use_prefixes: bool,
    /// Ignore existing long comments and regenerate them on reverse mapping.
    pub drop_long_comments: bool,
    /// Human-readable Turtle vs machine-oriented N-Triples output.
    pub human_readable: bool,
    /// Emit one named NodeShape per class; when disabled, referenced shapes
    /// are nested anonymously under their referencing property shape.
    pub named_shapes: bool,
    /// Diagrammatic arrangement of the re-exported shape graph.
    pub shape_layout: ShapeLayout,
    /// Append per-node property clauses to synthesized queries.
    pub include_path_properties: bool,
    /// Surface properties of reachable nodes that are not on the path.
    pub include_all_nodes: bool,
    /// Align synthesized ontology properties with the base vocabulary.
    pub align_specific_properties: bool,
    /// Namespace under which ontology classes and properties are minted.
    pub ontology_namespace: String,
    /// Display prefix for the ontology namespace.
    pub ontology_prefix: String,
    /// Namespaces whose resources count as instances, `urn:uuid:` by default.
    pub instance_namespaces: Vec<String>,
    /// Explicit root resource for path-based features; when absent the root
    /// is detected from the visual style (oval border).
    pub root: Option<NamedNode>,
    /// Additional prefix declarations from the command line.
    pub prefixes: Vec<(String, String)>,
}

/// How the re-exported shape diagram is arranged. Affects only the diagram,
/// never the SHACL semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShapeLayout {
    /// Flat, non-hierarchical grid.
    #[default]
    Network,
    /// Each shape on a ring whose radius is its breadth-first distance from
    /// the root class in the shape-reference graph.
    Concentric,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            separate_outputs: false,
            use_blank_nodes: true,
            add_titles: true,
            use_prefixes: true,
            drop_long_comments: false,
            human_readable: true,
            named_shapes: true,
            shape_layout: ShapeLayout::Network,
            include_path_properties: true,
            include_all_nodes: true,
            align_specific_properties: false,
            ontology_namespace: "http://www.example.com#".to_owned(),
            ontology_prefix: "ex".to_owned(),
            instance_namespaces: vec![crate::graph::URN_UUID.to_owned()],
            root: None,
            prefixes: Vec::new(),
        }
    }
}

impl Config {
    /// Is the given IRI inside one of the configured instance namespaces?
    pub fn is_instance_iri(&self, iri: &str) -> bool {
        self.instance_namespaces.iter().any(|ns| iri.starts_with(ns))
    }
}
