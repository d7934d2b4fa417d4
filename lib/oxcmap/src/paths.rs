//! Path discovery over the instance subgraph.
//!
//! The walk is depth-first over the undirected view of the instance triples,
//! with the current path as the visited set: paths are always simple and the
//! search terminates on cyclic graphs. The first completed path per target
//! wins; an unreachable target is reported as data, not as an error.

use crate::config::Config;
use crate::error::ConvertError;
use crate::graph::MappedGraph;
use crate::vocab::vis;
use oxrdf::vocab::rdf;
use oxrdf::{Literal, NamedNode, NamedNodeRef, NamedOrBlankNodeRef, TermRef};
use std::collections::{BTreeMap, BTreeSet};

/// One traversal step: the predicate of the edge, its orientation relative
/// to the walk, and the node the step arrives at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    pub predicate: NamedNode,
    pub forward: bool,
    pub node: NamedNode,
}

/// A simple path from the root to some target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphPath {
    pub root: NamedNode,
    pub steps: Vec<PathStep>,
}

impl GraphPath {
    /// Every node on the path, root first.
    pub fn nodes(&self) -> impl Iterator<Item = &NamedNode> {
        std::iter::once(&self.root).chain(self.steps.iter().map(|step| &step.node))
    }

    pub fn target(&self) -> &NamedNode {
        self.steps.last().map_or(&self.root, |step| &step.node)
    }
}

/// Search outcome for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSearch {
    pub target: NamedNode,
    pub path: Option<GraphPath>,
}

/// The start node of every derivation: the explicitly configured root when
/// set, else the concept whose appearance carries the oval border shape.
pub fn resolve_root(graph: &MappedGraph, config: &Config) -> Result<NamedNode, ConvertError> {
    if let Some(root) = &config.root {
        return Ok(root.clone());
    }
    styled_concepts(graph, vis::BORDER_SHAPE, "oval")
        .into_iter()
        .next()
        .ok_or(ConvertError::NoRoot)
}

/// Concepts marked with the dashed border style, the default query targets.
pub fn query_targets(graph: &MappedGraph) -> Vec<NamedNode> {
    styled_concepts(graph, vis::BORDER_STYLE, "dashed")
}

/// Concepts whose appearance node carries the given style value.
pub(crate) fn styled_concepts(
    graph: &MappedGraph,
    style: NamedNodeRef<'_>,
    value: &str,
) -> Vec<NamedNode> {
    let wanted = Literal::new_simple_literal(value);
    let vis_graph = &graph.visualization;
    let mut concepts: Vec<NamedNode> = vis_graph
        .subjects_for_predicate_object(style, &wanted)
        .filter_map(|appearance| {
            let appearance = match appearance {
                NamedOrBlankNodeRef::NamedNode(n) => TermRef::NamedNode(n),
                NamedOrBlankNodeRef::BlankNode(b) => TermRef::BlankNode(b),
            };
            match vis_graph.subject_for_predicate_object(vis::APPEARANCE, appearance)? {
                NamedOrBlankNodeRef::NamedNode(owner) => Some(owner.into_owned()),
                NamedOrBlankNodeRef::BlankNode(_) => None,
            }
        })
        .collect();
    concepts.sort_unstable();
    concepts.dedup();
    concepts
}

/// Every named node of the instance subgraph, in sorted order. Predicates
/// and `rdf:type` classes are relation vocabulary, not data nodes, except
/// that an IRI inside a configured instance namespace stays a data node
/// even when it is also used as a class.
pub fn instance_nodes(graph: &MappedGraph, config: &Config) -> Vec<NamedNode> {
    let mut relations: BTreeSet<&str> = BTreeSet::new();
    let mut classes: BTreeSet<&str> = BTreeSet::new();
    for triple in graph.instances.iter() {
        relations.insert(triple.predicate.as_str());
        if triple.predicate == rdf::TYPE {
            if let TermRef::NamedNode(class) = triple.object {
                classes.insert(class.as_str());
            }
        }
    }
    let is_node = |iri: &str| {
        !relations.contains(iri) && (!classes.contains(iri) || config.is_instance_iri(iri))
    };
    let mut nodes: BTreeSet<NamedNode> = BTreeSet::new();
    for triple in graph.instances.iter() {
        if let NamedOrBlankNodeRef::NamedNode(subject) = triple.subject {
            if is_node(subject.as_str()) {
                nodes.insert(subject.into_owned());
            }
        }
        if triple.predicate == rdf::TYPE {
            continue;
        }
        if let TermRef::NamedNode(object) = triple.object {
            if is_node(object.as_str()) {
                nodes.insert(object.into_owned());
            }
        }
    }
    nodes.into_iter().collect()
}

/// Finds the first simple path from the root to each target.
pub fn find_paths(
    graph: &MappedGraph,
    root: &NamedNode,
    targets: &[NamedNode],
) -> Vec<PathSearch> {
    let adjacency = adjacency(graph);
    targets
        .iter()
        .map(|target| PathSearch {
            target: target.clone(),
            path: find_path(&adjacency, root, target),
        })
        .collect()
}

type Adjacency = BTreeMap<NamedNode, Vec<(NamedNode, bool, NamedNode)>>;

/// Undirected adjacency of the instance subgraph. `rdf:type` edges are
/// classification, never traversed.
fn adjacency(graph: &MappedGraph) -> Adjacency {
    let mut adjacency: Adjacency = BTreeMap::new();
    for triple in graph.instances.iter() {
        if triple.predicate == rdf::TYPE {
            continue;
        }
        let NamedOrBlankNodeRef::NamedNode(subject) = triple.subject else {
            continue;
        };
        let TermRef::NamedNode(object) = triple.object else {
            continue;
        };
        let subject = subject.into_owned();
        let object = object.into_owned();
        let predicate = triple.predicate.into_owned();
        adjacency
            .entry(subject.clone())
            .or_default()
            .push((predicate.clone(), true, object.clone()));
        adjacency
            .entry(object)
            .or_default()
            .push((predicate, false, subject));
    }
    for edges in adjacency.values_mut() {
        edges.sort_unstable();
        edges.dedup();
    }
    adjacency
}

fn find_path(adjacency: &Adjacency, root: &NamedNode, target: &NamedNode) -> Option<GraphPath> {
    let mut visited = BTreeSet::from([root.clone()]);
    let mut steps = Vec::new();
    if walk(adjacency, root, target, &mut visited, &mut steps) {
        Some(GraphPath {
            root: root.clone(),
            steps,
        })
    } else {
        None
    }
}

fn walk(
    adjacency: &Adjacency,
    current: &NamedNode,
    target: &NamedNode,
    visited: &mut BTreeSet<NamedNode>,
    steps: &mut Vec<PathStep>,
) -> bool {
    if current == target {
        return true;
    }
    let Some(edges) = adjacency.get(current) else {
        return false;
    };
    for (predicate, forward, next) in edges {
        if !visited.insert(next.clone()) {
            continue;
        }
        steps.push(PathStep {
            predicate: predicate.clone(),
            forward: *forward,
            node: next.clone(),
        });
        if walk(adjacency, next, target, visited, steps) {
            return true;
        }
        steps.pop();
        visited.remove(next);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::{Graph, Triple};

    fn node(name: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://data.example.com/{name}"))
    }

    fn chain_graph() -> MappedGraph {
        // a -knows-> b -knows-> c, with d isolated
        let mut instances = Graph::new();
        instances.insert(&Triple::new(node("a"), node("knows"), node("b")));
        instances.insert(&Triple::new(node("b"), node("knows"), node("c")));
        instances.insert(&Triple::new(
            node("d"),
            node("knows"),
            node("d-neighbour"),
        ));
        MappedGraph {
            instances,
            visualization: Graph::new(),
        }
    }

    #[test]
    fn finds_a_forward_chain() {
        let graph = chain_graph();
        let results = find_paths(&graph, &node("a"), &[node("c")]);
        let path = results[0].path.as_ref().expect("c is reachable");
        assert_eq!(path.root, node("a"));
        assert_eq!(
            path.steps,
            vec![
                PathStep {
                    predicate: node("knows"),
                    forward: true,
                    node: node("b")
                },
                PathStep {
                    predicate: node("knows"),
                    forward: true,
                    node: node("c")
                },
            ]
        );
    }

    #[test]
    fn walks_edges_backwards_when_needed() {
        let graph = chain_graph();
        let results = find_paths(&graph, &node("c"), &[node("a")]);
        let path = results[0].path.as_ref().unwrap();
        assert!(path.steps.iter().all(|step| !step.forward));
        assert_eq!(path.target(), &node("a"));
    }

    #[test]
    fn unreachable_target_is_data_not_error() {
        let graph = chain_graph();
        let results = find_paths(&graph, &node("a"), &[node("d")]);
        assert_eq!(results[0].target, node("d"));
        assert!(results[0].path.is_none());
    }

    #[test]
    fn cycles_terminate_and_paths_stay_simple() {
        let mut instances = Graph::new();
        instances.insert(&Triple::new(node("a"), node("p"), node("b")));
        instances.insert(&Triple::new(node("b"), node("p"), node("c")));
        instances.insert(&Triple::new(node("c"), node("p"), node("a")));
        let graph = MappedGraph {
            instances,
            visualization: Graph::new(),
        };
        let results = find_paths(&graph, &node("a"), &[node("c")]);
        let path = results[0].path.as_ref().unwrap();
        let mut seen: Vec<&NamedNode> = path.nodes().collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), path.steps.len() + 1, "no node repeats");
    }

    #[test]
    fn instance_namespaces_extend_node_classification() {
        let mut instances = Graph::new();
        instances.insert(&Triple::new(node("a"), rdf::TYPE, node("x")));
        instances.insert(&Triple::new(node("a"), node("partOf"), node("x")));
        let graph = MappedGraph {
            instances,
            visualization: Graph::new(),
        };
        let defaults = instance_nodes(&graph, &Config::default());
        assert_eq!(defaults, vec![node("a")]);
        let config = Config {
            instance_namespaces: vec!["http://data.example.com/".to_owned()],
            ..Config::default()
        };
        let widened = instance_nodes(&graph, &config);
        assert_eq!(widened, vec![node("a"), node("x")]);
    }

    #[test]
    fn missing_root_resolution_fails() {
        let graph = chain_graph();
        let error = resolve_root(&graph, &Config::default()).unwrap_err();
        assert!(matches!(error, ConvertError::NoRoot));
    }

    #[test]
    fn root_is_resolved_from_the_oval_border() {
        let mut graph = chain_graph();
        let appearance = NamedNode::new_unchecked("urn:uuid:appearance-of-a");
        graph.visualization.insert(&Triple::new(
            node("a"),
            vis::APPEARANCE,
            appearance.clone(),
        ));
        graph.visualization.insert(&Triple::new(
            appearance,
            vis::BORDER_SHAPE,
            Literal::new_simple_literal("oval"),
        ));
        assert_eq!(resolve_root(&graph, &Config::default()).unwrap(), node("a"));
    }
}
