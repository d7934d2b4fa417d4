//! SHACL shape synthesis from the instance subgraph.
//!
//! One [`Shape`] per observed class; the cardinality of each property is
//! computed over the union of all instances of that class. Layout and
//! nesting are serialization choices and never change shape semantics.

use crate::config::{Config, ShapeLayout};
use crate::graph::{MappedGraph, integer_literal, local_name, lower_camel, upper_camel};
use crate::vocab::sh;
use oxcxl::{Appearance, Concept, Connection, CxlDocument, LinkingPhrase};
use oxrdf::vocab::rdf;
use oxrdf::{
    BlankNode, Graph, NamedNode, NamedOrBlankNode, NamedOrBlankNodeRef, Term, TermRef, Triple,
};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// The kind of value observed for a property, when all values agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Iri,
    BlankNode,
    Literal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyShape {
    pub path: NamedNode,
    pub min_count: u64,
    /// `Some(1)` when every instance has at most one value, else unbounded.
    pub max_count: Option<u64>,
    pub value_kind: Option<ValueKind>,
    /// Set when every resource value shares exactly one class; these links
    /// form the shape-reference graph.
    pub node_class: Option<NamedNode>,
    /// Set when every literal value agrees on one datatype.
    pub datatype: Option<NamedNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    pub class: NamedNode,
    pub instance_count: usize,
    pub properties: Vec<PropertyShape>,
}

/// Derives one shape per class declared in the instance subgraph, in class
/// order. Multi-typed instances contribute to every one of their classes.
pub fn synthesize_shapes(graph: &MappedGraph) -> Vec<Shape> {
    let instances = &graph.instances;
    let mut members: BTreeMap<NamedNode, Vec<NamedOrBlankNode>> = BTreeMap::new();
    for triple in instances.triples_for_predicate(rdf::TYPE) {
        if let TermRef::NamedNode(class) = triple.object {
            members
                .entry(class.into_owned())
                .or_default()
                .push(triple.subject.into_owned());
        }
    }
    members
        .into_iter()
        .map(|(class, mut members)| {
            members.sort_by_cached_key(ToString::to_string);
            members.dedup();
            shape_of(instances, class, &members)
        })
        .collect()
}

fn shape_of(instances: &Graph, class: NamedNode, members: &[NamedOrBlankNode]) -> Shape {
    let mut predicates: BTreeSet<NamedNode> = BTreeSet::new();
    for member in members {
        for triple in instances.triples_for_subject(member.as_ref()) {
            if triple.predicate != rdf::TYPE {
                predicates.insert(triple.predicate.into_owned());
            }
        }
    }
    let properties = predicates
        .into_iter()
        .map(|predicate| {
            let mut on_every_member = true;
            let mut at_most_one = true;
            let mut values: Vec<Term> = Vec::new();
            for member in members {
                let member_values: Vec<TermRef<'_>> = instances
                    .objects_for_subject_predicate(member.as_ref(), predicate.as_ref())
                    .collect();
                if member_values.is_empty() {
                    on_every_member = false;
                }
                if member_values.len() > 1 {
                    at_most_one = false;
                }
                values.extend(member_values.into_iter().map(TermRef::into_owned));
            }
            PropertyShape {
                min_count: u64::from(on_every_member),
                max_count: at_most_one.then_some(1),
                value_kind: value_kind(&values),
                node_class: shared_class(instances, &values),
                datatype: shared_datatype(&values),
                path: predicate,
            }
        })
        .collect();
    Shape {
        instance_count: members.len(),
        class,
        properties,
    }
}

fn value_kind(values: &[Term]) -> Option<ValueKind> {
    let mut kinds = values.iter().map(|value| match value {
        Term::NamedNode(_) => ValueKind::Iri,
        Term::BlankNode(_) => ValueKind::BlankNode,
        Term::Literal(_) => ValueKind::Literal,
    });
    let first = kinds.next()?;
    kinds.all(|kind| kind == first).then_some(first)
}

/// The single class every resource value belongs to, if there is one.
fn shared_class(instances: &Graph, values: &[Term]) -> Option<NamedNode> {
    let mut shared: Option<BTreeSet<NamedNode>> = None;
    for value in values {
        let subject: NamedOrBlankNodeRef<'_> = match value {
            Term::NamedNode(n) => n.as_ref().into(),
            Term::BlankNode(b) => b.as_ref().into(),
            Term::Literal(_) => return None,
        };
        let classes: BTreeSet<NamedNode> = instances
            .objects_for_subject_predicate(subject, rdf::TYPE)
            .filter_map(|object| match object {
                TermRef::NamedNode(class) => Some(class.into_owned()),
                _ => None,
            })
            .collect();
        shared = Some(match shared {
            None => classes,
            Some(shared) => shared.intersection(&classes).cloned().collect(),
        });
    }
    let shared = shared?;
    if shared.len() == 1 {
        shared.into_iter().next()
    } else {
        None
    }
}

fn shared_datatype(values: &[Term]) -> Option<NamedNode> {
    let mut datatypes = values.iter().map(|value| match value {
        Term::Literal(literal) => Some(literal.datatype().into_owned()),
        _ => None,
    });
    let first = datatypes.next()??;
    datatypes
        .all(|datatype| datatype.as_ref() == Some(&first))
        .then_some(first)
}

/// Serializes shapes as SHACL triples. Named mode emits one IRI-named
/// NodeShape per class; nested mode embeds referenced shapes anonymously
/// under `sh:node`, sharing the blank node on repeated (or cyclic)
/// references.
pub fn shapes_to_graph(shapes: &[Shape], config: &Config) -> Graph {
    let by_class: BTreeMap<&str, &Shape> = shapes
        .iter()
        .map(|shape| (shape.class.as_str(), shape))
        .collect();
    let mut emitter = ShapeEmitter {
        graph: Graph::new(),
        config,
        by_class,
        emitted: BTreeMap::new(),
    };
    if config.named_shapes {
        for shape in shapes {
            let node = emitter.shape_iri(shape).into();
            emitter.emit(shape, node);
        }
    } else {
        for shape in top_shapes(shapes) {
            let node = emitter.shape_iri(shape).into();
            emitter.emit(shape, node);
        }
        // shapes on cycles may be left over once the tops are done
        for shape in shapes {
            if !emitter.emitted.contains_key(shape.class.as_str()) {
                let node = emitter.shape_iri(shape).into();
                emitter.emit(shape, node);
            }
        }
    }
    emitter.graph
}

/// Shapes no other shape references, the roots of the nested serialization.
fn top_shapes<'a>(shapes: &'a [Shape]) -> Vec<&'a Shape> {
    let referenced: BTreeSet<&str> = shapes
        .iter()
        .flat_map(|shape| &shape.properties)
        .filter_map(|property| property.node_class.as_ref().map(NamedNode::as_str))
        .collect();
    shapes
        .iter()
        .filter(|shape| !referenced.contains(shape.class.as_str()))
        .collect()
}

struct ShapeEmitter<'a> {
    graph: Graph,
    config: &'a Config,
    by_class: BTreeMap<&'a str, &'a Shape>,
    emitted: BTreeMap<String, NamedOrBlankNode>,
}

impl<'a> ShapeEmitter<'a> {
    fn shape_iri(&self, shape: &Shape) -> NamedNode {
        NamedNode::new_unchecked(format!(
            "{}{}Shape",
            self.config.ontology_namespace,
            upper_camel(local_name(shape.class.as_str()))
        ))
    }

    fn emit(&mut self, shape: &'a Shape, node: NamedOrBlankNode) {
        if self.emitted.contains_key(shape.class.as_str()) {
            return;
        }
        self.emitted
            .insert(shape.class.as_str().to_owned(), node.clone());
        self.graph
            .insert(&Triple::new(node.clone(), rdf::TYPE, sh::NODE_SHAPE));
        self.graph.insert(&Triple::new(
            node.clone(),
            sh::TARGET_CLASS,
            shape.class.clone(),
        ));
        for property in &shape.properties {
            let constraint = BlankNode::default();
            self.graph.insert(&Triple::new(
                node.clone(),
                sh::PROPERTY,
                constraint.clone(),
            ));
            self.graph.insert(&Triple::new(
                constraint.clone(),
                sh::PATH,
                property.path.clone(),
            ));
            self.graph.insert(&Triple::new(
                constraint.clone(),
                sh::MIN_COUNT,
                integer_literal(i64::try_from(property.min_count).unwrap_or(i64::MAX)),
            ));
            if let Some(max) = property.max_count {
                self.graph.insert(&Triple::new(
                    constraint.clone(),
                    sh::MAX_COUNT,
                    integer_literal(i64::try_from(max).unwrap_or(i64::MAX)),
                ));
            }
            if let Some(kind) = property.value_kind {
                let kind = match kind {
                    ValueKind::Iri => sh::IRI,
                    ValueKind::BlankNode => sh::BLANK_NODE,
                    ValueKind::Literal => sh::LITERAL,
                };
                self.graph
                    .insert(&Triple::new(constraint.clone(), sh::NODE_KIND, kind));
            }
            if let Some(datatype) = &property.datatype {
                self.graph.insert(&Triple::new(
                    constraint.clone(),
                    sh::DATATYPE,
                    datatype.clone(),
                ));
            }
            if let Some(class) = &property.node_class {
                self.graph.insert(&Triple::new(
                    constraint.clone(),
                    sh::CLASS,
                    class.clone(),
                ));
                if let Some(referenced) = self.by_class.get(class.as_str()).copied() {
                    let reference = self.reference_for(referenced);
                    self.graph
                        .insert(&Triple::new(constraint, sh::NODE, reference));
                }
            }
        }
    }

    fn reference_for(&mut self, shape: &'a Shape) -> NamedOrBlankNode {
        if self.config.named_shapes {
            return self.shape_iri(shape).into();
        }
        if let Some(existing) = self.emitted.get(shape.class.as_str()) {
            return existing.clone();
        }
        let node: NamedOrBlankNode = BlankNode::default().into();
        self.emit(shape, node.clone());
        node
    }
}

/// Diagram position per shape class, for the diagrammatic re-export only.
pub fn shape_positions(
    shapes: &[Shape],
    layout: ShapeLayout,
    root_class: Option<&NamedNode>,
) -> BTreeMap<String, (i64, i64)> {
    match layout {
        ShapeLayout::Network => shapes
            .iter()
            .enumerate()
            .map(|(index, shape)| {
                let column = i64::try_from(index % 4).unwrap_or(0);
                let row = i64::try_from(index / 4).unwrap_or(0);
                (
                    shape.class.as_str().to_owned(),
                    (120 + column * 260, 100 + row * 180),
                )
            })
            .collect(),
        ShapeLayout::Concentric => concentric_positions(shapes, root_class),
    }
}

/// Ring radius proportional to the breadth-first distance from the root
/// class in the shape-reference graph; unreachable shapes go to an outer
/// ring of their own.
fn concentric_positions(
    shapes: &[Shape],
    root_class: Option<&NamedNode>,
) -> BTreeMap<String, (i64, i64)> {
    let references: BTreeMap<&str, Vec<&str>> = shapes
        .iter()
        .map(|shape| {
            (
                shape.class.as_str(),
                shape
                    .properties
                    .iter()
                    .filter_map(|property| property.node_class.as_ref().map(NamedNode::as_str))
                    .collect(),
            )
        })
        .collect();
    let root = root_class
        .map(|class| class.as_str())
        .or_else(|| shapes.first().map(|shape| shape.class.as_str()));
    let mut distance: BTreeMap<&str, usize> = BTreeMap::new();
    if let Some(root) = root {
        let mut queue = VecDeque::from([(root, 0usize)]);
        while let Some((class, d)) = queue.pop_front() {
            if !references.contains_key(class) || distance.contains_key(class) {
                continue;
            }
            distance.insert(class, d);
            for next in references.get(class).into_iter().flatten().copied() {
                queue.push_back((next, d + 1));
            }
        }
    }
    let outer = distance.values().max().copied().map_or(0, |d| d + 1);
    let mut rings: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
    for shape in shapes {
        let class = shape.class.as_str();
        let d = distance.get(class).copied().unwrap_or(outer);
        rings.entry(d).or_default().push(class);
    }
    let (center_x, center_y) = (600.0_f64, 450.0_f64);
    let mut positions = BTreeMap::new();
    for (d, classes) in rings {
        let radius = 260.0 * d as f64;
        let count = classes.len() as f64;
        for (index, class) in classes.into_iter().enumerate() {
            let angle = std::f64::consts::TAU * index as f64 / count;
            let x = center_x + radius * angle.cos();
            let y = center_y + radius * angle.sin();
            positions.insert(class.to_owned(), (x.round() as i64, y.round() as i64));
        }
    }
    positions
}

/// The diagrammatic re-export: one concept per shape, one linking phrase per
/// shape-reference edge, positions from the configured layout.
pub fn shapes_to_document(
    shapes: &[Shape],
    config: &Config,
    root_class: Option<&NamedNode>,
) -> CxlDocument {
    let positions = shape_positions(shapes, config.shape_layout, root_class);
    let classes: BTreeSet<&str> = shapes.iter().map(|shape| shape.class.as_str()).collect();
    let mut document = CxlDocument::default();
    for shape in shapes {
        let (x, y) = positions
            .get(shape.class.as_str())
            .copied()
            .unwrap_or((100, 100));
        document.concepts.push(Concept {
            id: shape.class.as_str().to_owned(),
            label: format!("{}Shape", upper_camel(local_name(shape.class.as_str()))),
            long_comment: None,
            appearance: Appearance {
                x: Some(x),
                y: Some(y),
                ..Appearance::default()
            },
            extra: Vec::new(),
        });
    }
    for shape in shapes {
        for property in &shape.properties {
            let Some(class) = &property.node_class else {
                continue;
            };
            if !classes.contains(class.as_str()) {
                continue;
            }
            let phrase_id = format!("{}-{}", shape.class.as_str(), property.path.as_str());
            document.linking_phrases.push(LinkingPhrase {
                id: phrase_id.clone(),
                label: lower_camel(local_name(property.path.as_str())),
                appearance: Appearance::default(),
                extra: Vec::new(),
            });
            document.connections.push(Connection {
                id: None,
                from: shape.class.as_str().to_owned(),
                to: phrase_id.clone(),
                appearance: Appearance::default(),
                extra: Vec::new(),
            });
            document.connections.push(Connection {
                id: None,
                from: phrase_id,
                to: class.as_str().to_owned(),
                appearance: Appearance::default(),
                extra: Vec::new(),
            });
        }
    }
    document
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxrdf::Literal;
    use oxrdf::vocab::xsd;

    fn iri(name: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://schema.example.com/{name}"))
    }

    fn sample_graph() -> MappedGraph {
        // two samples, each with exactly one title; one of them has a unit
        let mut instances = Graph::new();
        for (name, with_unit) in [("s1", true), ("s2", false)] {
            let sample = iri(name);
            instances.insert(&Triple::new(sample.clone(), rdf::TYPE, iri("Sample")));
            instances.insert(&Triple::new(
                sample.clone(),
                iri("title"),
                Literal::new_simple_literal(name),
            ));
            if with_unit {
                instances.insert(&Triple::new(sample, iri("unit"), iri("gram")));
            }
        }
        instances.insert(&Triple::new(iri("gram"), rdf::TYPE, iri("Unit")));
        MappedGraph {
            instances,
            visualization: Graph::new(),
        }
    }

    fn property<'a>(shape: &'a Shape, name: &str) -> &'a PropertyShape {
        shape
            .properties
            .iter()
            .find(|p| p.path == iri(name))
            .unwrap_or_else(|| panic!("no property shape for {name}"))
    }

    #[test]
    fn cardinality_law() {
        let shapes = synthesize_shapes(&sample_graph());
        let sample = shapes.iter().find(|s| s.class == iri("Sample")).unwrap();
        assert_eq!(sample.instance_count, 2);
        // on every instance, exactly once
        let title = property(sample, "title");
        assert_eq!((title.min_count, title.max_count), (1, Some(1)));
        // on one of two instances
        let unit = property(sample, "unit");
        assert_eq!((unit.min_count, unit.max_count), (0, Some(1)));
    }

    #[test]
    fn value_kinds_and_targets() {
        let shapes = synthesize_shapes(&sample_graph());
        let sample = shapes.iter().find(|s| s.class == iri("Sample")).unwrap();
        let title = property(sample, "title");
        assert_eq!(title.value_kind, Some(ValueKind::Literal));
        assert_eq!(title.datatype.as_ref().map(NamedNode::as_ref), Some(xsd::STRING));
        let unit = property(sample, "unit");
        assert_eq!(unit.value_kind, Some(ValueKind::Iri));
        assert_eq!(unit.node_class, Some(iri("Unit")));
    }

    #[test]
    fn named_mode_links_shapes_by_iri() {
        let shapes = synthesize_shapes(&sample_graph());
        let graph = shapes_to_graph(&shapes, &Config::default());
        let sample_shape =
            NamedNode::new_unchecked("http://www.example.com#SampleShape");
        let unit_shape = NamedNode::new_unchecked("http://www.example.com#UnitShape");
        assert!(graph.contains(&Triple::new(
            sample_shape.clone(),
            sh::TARGET_CLASS,
            iri("Sample")
        )));
        assert!(
            graph
                .triples_for_predicate(sh::NODE)
                .any(|t| t.object == TermRef::from(unit_shape.as_ref()))
        );
    }

    #[test]
    fn nested_mode_embeds_referenced_shapes_anonymously() {
        let shapes = synthesize_shapes(&sample_graph());
        let config = Config {
            named_shapes: false,
            ..Config::default()
        };
        let graph = shapes_to_graph(&shapes, &config);
        let reference = graph
            .triples_for_predicate(sh::NODE)
            .next()
            .expect("unit shape is referenced");
        assert!(matches!(reference.object, TermRef::BlankNode(_)));
        // both shapes are still present exactly once
        assert_eq!(graph.triples_for_predicate(sh::TARGET_CLASS).count(), 2);
    }

    #[test]
    fn cyclic_shape_references_terminate() {
        let mut instances = Graph::new();
        instances.insert(&Triple::new(iri("a1"), rdf::TYPE, iri("A")));
        instances.insert(&Triple::new(iri("b1"), rdf::TYPE, iri("B")));
        instances.insert(&Triple::new(iri("a1"), iri("next"), iri("b1")));
        instances.insert(&Triple::new(iri("b1"), iri("back"), iri("a1")));
        let graph = MappedGraph {
            instances,
            visualization: Graph::new(),
        };
        let shapes = synthesize_shapes(&graph);
        let config = Config {
            named_shapes: false,
            ..Config::default()
        };
        let shacl = shapes_to_graph(&shapes, &config);
        assert_eq!(shacl.triples_for_predicate(sh::TARGET_CLASS).count(), 2);
    }

    #[test]
    fn concentric_layout_orders_rings_by_distance() {
        let shapes = synthesize_shapes(&sample_graph());
        let root = iri("Sample");
        let positions = shape_positions(&shapes, ShapeLayout::Concentric, Some(&root));
        let center = positions[root.as_str()];
        let unit = positions[iri("Unit").as_str()];
        let radius = |p: (i64, i64)| {
            let dx = (p.0 - 600) as f64;
            let dy = (p.1 - 450) as f64;
            dx.hypot(dy)
        };
        assert!(radius(center) < 1.0);
        assert!(radius(unit) > 200.0);
    }

    #[test]
    fn diagram_export_connects_referencing_shapes() {
        let shapes = synthesize_shapes(&sample_graph());
        let document = shapes_to_document(&shapes, &Config::default(), None);
        assert_eq!(document.concepts.len(), 2);
        assert_eq!(document.linking_phrases.len(), 1);
        assert_eq!(document.linking_phrases[0].label, "unit");
        assert_eq!(document.connections.len(), 2);
    }
}
