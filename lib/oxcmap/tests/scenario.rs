//! End-to-end scenario: a concept map `A -r1-> B -r2-> C` with `A` marked as
//! the root (oval border) and `C` as a query target (dashed border), plus an
//! isolated concept `D`.

use oxcmap::MappedGraph;
use oxcmap::config::Config;
use oxcmap::graph::{read_graph, write_graph, PrefixTable};
use oxcmap::mapper::{document_to_graph, graph_to_document, Mapping};
use oxcmap::paths::{find_paths, query_targets, resolve_root};
use oxcmap::shacl::synthesize_shapes;
use oxcmap::sparql::synthesize_query;
use oxcxl::{CxlParser, CxlSerializer};
use oxrdf::vocab::rdf;
use oxrdf::{NamedNode, NamedNodeRef, TermRef};
use oxrdfio::RdfFormat;
use spargebra::SparqlParser;

const SCENARIO: &str = r#"<cmap>
 <map>
  <concept-list>
   <concept id="a" label="ex:A"/>
   <concept id="b" label="ex:B"/>
   <concept id="c" label="ex:C"/>
   <concept id="d" label="ex:D"/>
  </concept-list>
  <linking-phrase-list>
   <linking-phrase id="r1" label="r1"/>
   <linking-phrase id="r2" label="r2"/>
  </linking-phrase-list>
  <connection-list>
   <connection id="x1" from-id="a" to-id="r1"/>
   <connection id="x2" from-id="r1" to-id="b"/>
   <connection id="x3" from-id="b" to-id="r2"/>
   <connection id="x4" from-id="r2" to-id="c"/>
  </connection-list>
  <concept-appearance-list>
   <concept-appearance id="a" x="40" y="40" border-shape="oval"/>
   <concept-appearance id="b" x="260" y="40"/>
   <concept-appearance id="c" x="480" y="40" border-style="dashed"/>
   <concept-appearance id="d" x="40" y="200"/>
  </concept-appearance-list>
 </map>
</cmap>"#;

fn convert() -> Mapping {
    let document = CxlParser::parse_str(SCENARIO).unwrap();
    document_to_graph(&document, &[], &Config::default()).unwrap()
}

fn resource(mapping: &Mapping, id: &str) -> NamedNode {
    mapping.identity.resource(id).cloned().unwrap()
}

/// The one predicate joining two resources in the instance subgraph.
fn predicate_between(mapping: &Mapping, from: &NamedNode, to: &NamedNode) -> NamedNode {
    mapping
        .graph
        .instances
        .triples_for_subject(from.as_ref())
        .find(|t| t.object == TermRef::from(to.as_ref()))
        .map(|t| t.predicate.into_owned())
        .unwrap_or_else(|| panic!("no triple between {from} and {to}"))
}

#[test]
fn conversion_yields_the_two_relation_triples() {
    let mapping = convert();
    let (a, b, c) = (
        resource(&mapping, "a"),
        resource(&mapping, "b"),
        resource(&mapping, "c"),
    );
    let r1 = predicate_between(&mapping, &a, &b);
    let r2 = predicate_between(&mapping, &b, &c);
    assert_ne!(r1, r2);
    assert!(r1.as_str().starts_with("urn:uuid:"), "r1 is a minted predicate");
}

#[test]
fn labels_type_the_concepts() {
    let mapping = convert();
    let a = resource(&mapping, "a");
    let class = mapping
        .graph
        .instances
        .objects_for_subject_predicate(a.as_ref(), rdf::TYPE)
        .next()
        .expect("the CURIE label types the concept");
    assert_eq!(
        class,
        TermRef::from(NamedNodeRef::new_unchecked("http://www.example.com#A"))
    );
}

#[test]
fn the_path_finder_walks_a_to_c() {
    let mapping = convert();
    let root = resolve_root(&mapping.graph, &Config::default()).unwrap();
    assert_eq!(root, resource(&mapping, "a"));
    let targets = query_targets(&mapping.graph);
    assert_eq!(targets, vec![resource(&mapping, "c")]);
    let results = find_paths(&mapping.graph, &root, &targets);
    let path = results[0].path.as_ref().expect("c is reachable");
    let nodes: Vec<&NamedNode> = path.nodes().collect();
    assert_eq!(
        nodes,
        vec![
            &resource(&mapping, "a"),
            &resource(&mapping, "b"),
            &resource(&mapping, "c"),
        ]
    );
    assert!(path.steps.iter().all(|step| step.forward));
}

#[test]
fn unreachable_targets_are_reported_per_target() {
    let mapping = convert();
    let root = resolve_root(&mapping.graph, &Config::default()).unwrap();
    let d = resource(&mapping, "d");
    let results = find_paths(&mapping.graph, &root, &[d.clone()]);
    assert_eq!(results[0].target, d);
    assert!(results[0].path.is_none());
}

#[test]
fn the_shape_of_class_a_has_the_r1_property() {
    let mapping = convert();
    let a = resource(&mapping, "a");
    let b = resource(&mapping, "b");
    let r1 = predicate_between(&mapping, &a, &b);
    let shapes = synthesize_shapes(&mapping.graph);
    let shape = shapes
        .iter()
        .find(|shape| shape.class.as_str() == "http://www.example.com#A")
        .expect("a shape per observed class");
    assert_eq!(shape.instance_count, 1);
    let property = shape
        .properties
        .iter()
        .find(|property| property.path == r1)
        .expect("r1 observed on A");
    assert_eq!((property.min_count, property.max_count), (1, Some(1)));
}

#[test]
fn the_query_contains_exactly_the_path_pattern() {
    let mapping = convert();
    let root = resolve_root(&mapping.graph, &Config::default()).unwrap();
    let targets = query_targets(&mapping.graph);
    let results = find_paths(&mapping.graph, &root, &targets);
    let path = results[0].path.as_ref().unwrap();
    let config = Config {
        include_path_properties: false,
        include_all_nodes: false,
        ..Config::default()
    };
    let query = synthesize_query(&mapping.graph, path, &config);
    let a = resource(&mapping, "a");
    let b = resource(&mapping, "b");
    let c = resource(&mapping, "c");
    let r1 = predicate_between(&mapping, &a, &b);
    let r2 = predicate_between(&mapping, &b, &c);
    assert!(query.contains(&format!("<{}>", r1.as_str())));
    assert!(query.contains(&format!("<{}>", r2.as_str())));
    // exactly the two path triples, nothing else
    assert_eq!(query.matches(" .").count(), 2);
    SparqlParser::new().parse_query(&query).unwrap();
}

#[test]
fn graphs_survive_a_turtle_round_trip() {
    let mapping = convert();
    let merged = mapping.graph.merged();
    let mut turtle = Vec::new();
    write_graph(
        &mut turtle,
        RdfFormat::Turtle,
        &merged,
        &PrefixTable::builtin(),
        true,
    )
    .unwrap();
    let (reread, _) = read_graph(turtle.as_slice(), RdfFormat::Turtle).unwrap();
    let split = MappedGraph::split(&reread);
    assert_eq!(split.instances.len(), mapping.graph.instances.len());

    let original = CxlParser::parse_str(SCENARIO).unwrap();
    let rebuilt = graph_to_document(&split, &Config::default()).unwrap();
    assert_eq!(original.concepts, rebuilt.concepts);
    assert_eq!(original.linking_phrases, rebuilt.linking_phrases);
    let mut connections = original.connections.clone();
    connections.sort_by(|a, b| (&a.from, &a.to, &a.id).cmp(&(&b.from, &b.to, &b.id)));
    assert_eq!(connections, rebuilt.connections);

    // and the rebuilt document serializes to parseable CXL again
    let cxl = CxlSerializer::serialize_to_string(&rebuilt).unwrap();
    let reparsed = CxlParser::parse_str(&cxl).unwrap();
    assert_eq!(reparsed.concepts, rebuilt.concepts);
}
