//! SPARQL query synthesis from a discovered path.
//!
//! The generated text is never executed here; tests prove syntactic validity
//! by parsing it with `spargebra`.

use crate::config::Config;
use crate::graph::{MappedGraph, PrefixTable, local_name, lower_camel};
use crate::paths::GraphPath;
use crate::vocab::dct;
use oxrdf::vocab::rdf;
use oxrdf::{NamedNode, NamedNodeRef, NamedOrBlankNodeRef, TermRef};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt::Write;

/// Builds one query over the given path: one basic graph pattern triple per
/// edge in path order, oriented as the path walked it, chained by shared
/// variables.
pub fn synthesize_query(graph: &MappedGraph, path: &GraphPath, config: &Config) -> String {
    let mut builder = QueryBuilder {
        graph,
        config,
        prefixes: PrefixTable::from_config(config),
        used_prefixes: BTreeSet::new(),
        variables: BTreeMap::new(),
        taken: BTreeSet::new(),
        patterns: String::new(),
    };

    let mut select: Vec<String> = Vec::new();
    let mut previous = builder.variable_for(&path.root);
    select.push(previous.clone());
    for step in &path.steps {
        let node = builder.variable_for(&step.node);
        let predicate = builder.render_predicate(step.predicate.as_ref());
        if step.forward {
            builder.pattern(&format!("  ?{previous} {predicate} ?{node} ."));
        } else {
            builder.pattern(&format!("  ?{node} {predicate} ?{previous} ."));
        }
        select.push(node.clone());
        previous = node;
    }

    if config.include_path_properties {
        for node in path.nodes() {
            builder.property_clauses(node, 1);
        }
    }
    if config.include_all_nodes {
        builder.off_path_clauses(path);
    }

    let mut query = String::new();
    for name in &builder.used_prefixes {
        if let Some(iri) = builder.prefixes.iter().find_map(|(prefix, iri)| {
            (prefix == name).then_some(iri)
        }) {
            let _ = writeln!(query, "PREFIX {name}: <{iri}>");
        }
    }
    if !query.is_empty() {
        query.push('\n');
    }
    let _ = writeln!(
        query,
        "SELECT {}",
        select
            .iter()
            .map(|variable| format!("?{variable}"))
            .collect::<Vec<_>>()
            .join(" ")
    );
    query.push_str("WHERE {\n");
    query.push_str(&builder.patterns);
    query.push_str("}\n");
    query
}

struct QueryBuilder<'a> {
    graph: &'a MappedGraph,
    config: &'a Config,
    prefixes: PrefixTable,
    used_prefixes: BTreeSet<String>,
    variables: BTreeMap<String, String>,
    taken: BTreeSet<String>,
    patterns: String,
}

impl QueryBuilder<'_> {
    fn pattern(&mut self, line: &str) {
        self.patterns.push_str(line);
        self.patterns.push('\n');
    }

    /// The variable bound to a node, derived from its title and uniquified.
    fn variable_for(&mut self, node: &NamedNode) -> String {
        if let Some(existing) = self.variables.get(node.as_str()) {
            return existing.clone();
        }
        let title = self
            .graph
            .instances
            .objects_for_subject_predicate(node.as_ref(), dct::TITLE)
            .find_map(|object| match object {
                TermRef::Literal(literal) => Some(literal.value().to_owned()),
                _ => None,
            })
            .unwrap_or_else(|| local_name(node.as_str()).to_owned());
        let name = self.unique(&sanitize(&title));
        self.variables
            .insert(node.as_str().to_owned(), name.clone());
        name
    }

    fn unique(&mut self, base: &str) -> String {
        let mut candidate = base.to_owned();
        let mut counter = 1;
        while !self.taken.insert(candidate.clone()) {
            counter += 1;
            candidate = format!("{base}{counter}");
        }
        candidate
    }

    fn render_predicate(&mut self, predicate: NamedNodeRef<'_>) -> String {
        if let Some(curie) = self.prefixes.compact(predicate.as_str()) {
            if let Some((prefix, _)) = curie.split_once(':') {
                self.used_prefixes.insert(prefix.to_owned());
            }
            curie
        } else {
            format!("<{}>", predicate.as_str())
        }
    }

    /// One `OPTIONAL` per distinct non-type predicate observed on the node.
    fn property_clauses(&mut self, node: &NamedNode, indent: usize) {
        let variable = self.variable_for(node);
        let mut predicates: Vec<NamedNode> = self
            .graph
            .instances
            .triples_for_subject(node.as_ref())
            .filter(|triple| triple.predicate != rdf::TYPE)
            .map(|triple| triple.predicate.into_owned())
            .collect();
        predicates.sort_unstable();
        predicates.dedup();
        let pad = "  ".repeat(indent);
        for predicate in predicates {
            let value = self.unique(&format!(
                "{variable}_{}",
                sanitize(&lower_camel(local_name(predicate.as_str())))
            ));
            let predicate = self.render_predicate(predicate.as_ref());
            self.pattern(&format!(
                "{pad}OPTIONAL {{ ?{variable} {predicate} ?{value} . }}"
            ));
        }
    }

    /// `OPTIONAL` blocks chaining every named node reachable from the path
    /// but not on it, each with the discovering edge and its own properties.
    fn off_path_clauses(&mut self, path: &GraphPath) {
        let on_path: BTreeSet<&str> = path.nodes().map(NamedNode::as_str).collect();
        let mut discovered: BTreeSet<String> = on_path.iter().map(|s| (*s).to_owned()).collect();
        let mut queue: VecDeque<NamedNode> = path.nodes().cloned().collect();
        while let Some(current) = queue.pop_front() {
            let mut edges: Vec<(NamedNode, bool, NamedNode)> = Vec::new();
            for triple in self.graph.instances.iter() {
                if triple.predicate == rdf::TYPE {
                    continue;
                }
                let NamedOrBlankNodeRef::NamedNode(subject) = triple.subject else {
                    continue;
                };
                let TermRef::NamedNode(object) = triple.object else {
                    continue;
                };
                if subject == current.as_ref() {
                    edges.push((triple.predicate.into_owned(), true, object.into_owned()));
                } else if object == current.as_ref() {
                    edges.push((triple.predicate.into_owned(), false, subject.into_owned()));
                }
            }
            edges.sort_unstable();
            edges.dedup();
            for (predicate, forward, next) in edges {
                if !discovered.insert(next.as_str().to_owned()) {
                    continue;
                }
                let current_variable = self.variable_for(&current);
                let next_variable = self.variable_for(&next);
                let predicate = self.render_predicate(predicate.as_ref());
                let edge = if forward {
                    format!("?{current_variable} {predicate} ?{next_variable} .")
                } else {
                    format!("?{next_variable} {predicate} ?{current_variable} .")
                };
                self.pattern(&format!("  OPTIONAL {{ {edge}"));
                if self.config.include_path_properties {
                    self.property_clauses(&next, 2);
                }
                self.pattern("  }");
                queue.push_back(next);
            }
        }
    }
}

/// A SPARQL-safe variable name: alphanumerics only, starting with a letter.
fn sanitize(name: &str) -> String {
    let mut out: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if out.is_empty() {
        out.push('n');
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, 'n');
    }
    out
}
