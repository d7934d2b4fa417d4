//! OWL ontology synthesis from a set of shapes.
//!
//! Every shape becomes an `owl:Class`, every distinct property path an
//! `owl:ObjectProperty` or `owl:DatatypeProperty` under the configured
//! ontology namespace. Alignment against the base vocabulary is by
//! normalized-name matching only; anything not matched exactly once stays
//! unaligned and is reported instead of guessed.

use crate::config::Config;
use crate::graph::{local_name, lower_camel, upper_camel};
use crate::shacl::{Shape, ValueKind};
use crate::vocab::{dct, owl, rdfs, skos};
use oxrdf::vocab::rdf;
use oxrdf::{Graph, Literal, NamedNode, NamedNodeRef, Triple};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OntologyClass {
    pub iri: NamedNode,
    /// The instance class the declaration was derived from.
    pub source: NamedNode,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Object,
    Datatype,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OntologyProperty {
    pub iri: NamedNode,
    /// The predicate observed in the instance data.
    pub source: NamedNode,
    pub label: String,
    pub kind: PropertyKind,
    /// Minted class IRIs of the shapes carrying this property.
    pub domains: Vec<NamedNode>,
    /// Minted class IRIs (object properties) or datatypes (datatype
    /// properties) observed as values.
    pub ranges: Vec<NamedNode>,
    pub super_property: Option<NamedNode>,
}

#[derive(Debug, Clone, Default)]
pub struct OntologyModel {
    pub classes: Vec<OntologyClass>,
    pub properties: Vec<OntologyProperty>,
    /// Source predicates that could not be aligned to the base vocabulary,
    /// kept for manual review.
    pub unaligned: Vec<NamedNode>,
}

/// Base vocabulary candidates for `rdfs:subPropertyOf` alignment.
const BASE_VOCABULARY: &[NamedNodeRef<'_>] = &[
    dct::TITLE,
    dct::DESCRIPTION,
    dct::CREATOR,
    dct::CREATED,
    dct::MODIFIED,
    dct::IDENTIFIER,
    dct::HAS_PART,
    dct::IS_PART_OF,
    skos::PREF_LABEL,
    skos::ALT_LABEL,
    skos::DEFINITION,
    skos::NOTATION,
    skos::BROADER,
    skos::NARROWER,
    skos::RELATED,
    rdfs::LABEL,
    rdfs::COMMENT,
    rdfs::SEE_ALSO,
];

pub fn synthesize_ontology(shapes: &[Shape], config: &Config) -> OntologyModel {
    let namespace = &config.ontology_namespace;
    let mut model = OntologyModel::default();

    let mut class_iris: BTreeMap<&str, NamedNode> = BTreeMap::new();
    for shape in shapes {
        let name = upper_camel(local_name(shape.class.as_str()));
        let iri = NamedNode::new_unchecked(format!("{namespace}{name}"));
        class_iris.insert(shape.class.as_str(), iri.clone());
        model.classes.push(OntologyClass {
            iri,
            source: shape.class.clone(),
            label: name,
        });
    }

    // one property per distinct path across all shapes, accumulating the
    // observations made under each class
    let mut observed: BTreeMap<&NamedNode, Vec<(&Shape, &crate::shacl::PropertyShape)>> =
        BTreeMap::new();
    for shape in shapes {
        for property in &shape.properties {
            observed.entry(&property.path).or_default().push((shape, property));
        }
    }

    for (path, occurrences) in observed {
        let name = lower_camel(local_name(path.as_str()));
        let iri = NamedNode::new_unchecked(format!("{namespace}{name}"));
        let kind = if occurrences
            .iter()
            .all(|(_, p)| p.value_kind == Some(ValueKind::Literal))
        {
            PropertyKind::Datatype
        } else {
            PropertyKind::Object
        };
        let mut domains: Vec<NamedNode> = occurrences
            .iter()
            .filter_map(|(shape, _)| class_iris.get(shape.class.as_str()).cloned())
            .collect();
        domains.sort_unstable();
        domains.dedup();
        let mut ranges: Vec<NamedNode> = occurrences
            .iter()
            .filter_map(|(_, property)| match kind {
                PropertyKind::Object => property
                    .node_class
                    .as_ref()
                    .and_then(|class| class_iris.get(class.as_str()).cloned()),
                PropertyKind::Datatype => property.datatype.clone(),
            })
            .collect();
        ranges.sort_unstable();
        ranges.dedup();
        let super_property = if config.align_specific_properties {
            match align(path.as_ref()) {
                Ok(aligned) => aligned,
                Err(AlignmentAmbiguous) => {
                    model.unaligned.push(path.clone());
                    None
                }
            }
        } else {
            None
        };
        model.properties.push(OntologyProperty {
            iri,
            source: path.clone(),
            label: name,
            kind,
            domains,
            ranges,
            super_property,
        });
    }
    model
}

struct AlignmentAmbiguous;

/// Normalized-name match against the base vocabulary. A predicate that *is*
/// a base vocabulary term aligns to itself; zero or several name matches
/// yield no alignment.
fn align(path: NamedNodeRef<'_>) -> Result<Option<NamedNode>, AlignmentAmbiguous> {
    if BASE_VOCABULARY.contains(&path) {
        return Ok(Some(path.into_owned()));
    }
    let wanted = normalized(local_name(path.as_str()));
    let mut matches = BASE_VOCABULARY
        .iter()
        .filter(|candidate| normalized(local_name(candidate.as_str())) == wanted);
    match (matches.next(), matches.next()) {
        (Some(only), None) => Ok(Some(only.into_owned())),
        (None, _) => Err(AlignmentAmbiguous),
        (Some(_), Some(_)) => Err(AlignmentAmbiguous),
    }
}

fn normalized(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Serializes the model as an OWL graph under the configured namespace.
pub fn ontology_to_graph(model: &OntologyModel, config: &Config) -> Graph {
    let mut graph = Graph::new();
    let header = NamedNode::new_unchecked(
        config
            .ontology_namespace
            .trim_end_matches(['#', '/'])
            .to_owned(),
    );
    graph.insert(&Triple::new(header, rdf::TYPE, owl::ONTOLOGY));
    for class in &model.classes {
        graph.insert(&Triple::new(class.iri.clone(), rdf::TYPE, owl::CLASS));
        graph.insert(&Triple::new(
            class.iri.clone(),
            rdfs::LABEL,
            Literal::new_simple_literal(&class.label),
        ));
    }
    for property in &model.properties {
        let kind = match property.kind {
            PropertyKind::Object => owl::OBJECT_PROPERTY,
            PropertyKind::Datatype => owl::DATATYPE_PROPERTY,
        };
        graph.insert(&Triple::new(property.iri.clone(), rdf::TYPE, kind));
        graph.insert(&Triple::new(
            property.iri.clone(),
            rdfs::LABEL,
            Literal::new_simple_literal(&property.label),
        ));
        graph.insert(&Triple::new(
            property.iri.clone(),
            rdfs::SEE_ALSO,
            property.source.clone(),
        ));
        if let [domain] = property.domains.as_slice() {
            graph.insert(&Triple::new(
                property.iri.clone(),
                rdfs::DOMAIN,
                domain.clone(),
            ));
        }
        if let [range] = property.ranges.as_slice() {
            graph.insert(&Triple::new(
                property.iri.clone(),
                rdfs::RANGE,
                range.clone(),
            ));
        }
        if let Some(super_property) = &property.super_property {
            graph.insert(&Triple::new(
                property.iri.clone(),
                rdfs::SUB_PROPERTY_OF,
                super_property.clone(),
            ));
        }
    }
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::MappedGraph;
    use crate::shacl::synthesize_shapes;

    fn iri(name: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://schema.example.com/{name}"))
    }

    fn shapes() -> Vec<Shape> {
        let mut instances = Graph::new();
        instances.insert(&Triple::new(iri("s1"), rdf::TYPE, iri("Sample")));
        instances.insert(&Triple::new(
            iri("s1"),
            iri("title"),
            Literal::new_simple_literal("first sample"),
        ));
        instances.insert(&Triple::new(iri("s1"), iri("measured-unit"), iri("gram")));
        instances.insert(&Triple::new(iri("gram"), rdf::TYPE, iri("Unit")));
        synthesize_shapes(&MappedGraph {
            instances,
            visualization: Graph::new(),
        })
    }

    fn property<'a>(model: &'a OntologyModel, source: &NamedNode) -> &'a OntologyProperty {
        model
            .properties
            .iter()
            .find(|p| &p.source == source)
            .unwrap_or_else(|| panic!("no property for {source}"))
    }

    #[test]
    fn classes_and_properties_are_minted_under_the_namespace() {
        let model = synthesize_ontology(&shapes(), &Config::default());
        let names: Vec<&str> = model.classes.iter().map(|c| c.iri.as_str()).collect();
        assert_eq!(
            names,
            ["http://www.example.com#Sample", "http://www.example.com#Unit"]
        );
        let unit = property(&model, &iri("measured-unit"));
        assert_eq!(unit.iri.as_str(), "http://www.example.com#measuredUnit");
        assert_eq!(unit.kind, PropertyKind::Object);
        assert_eq!(unit.domains, [NamedNode::new_unchecked("http://www.example.com#Sample")]);
        assert_eq!(unit.ranges, [NamedNode::new_unchecked("http://www.example.com#Unit")]);
    }

    #[test]
    fn datatype_properties_range_over_their_datatype() {
        let model = synthesize_ontology(&shapes(), &Config::default());
        let title = property(&model, &iri("title"));
        assert_eq!(title.kind, PropertyKind::Datatype);
        assert_eq!(
            title.ranges,
            [NamedNode::new_unchecked("http://www.w3.org/2001/XMLSchema#string")]
        );
    }

    #[test]
    fn name_matches_align_and_everything_else_is_reported() {
        let config = Config {
            align_specific_properties: true,
            ..Config::default()
        };
        let model = synthesize_ontology(&shapes(), &config);
        let title = property(&model, &iri("title"));
        assert_eq!(
            title.super_property.as_ref().map(NamedNode::as_ref),
            Some(dct::TITLE)
        );
        let unit = property(&model, &iri("measured-unit"));
        assert_eq!(unit.super_property, None);
        assert_eq!(model.unaligned, [iri("measured-unit")]);
    }

    #[test]
    fn alignment_is_off_by_default() {
        let config = Config::default();
        let model = synthesize_ontology(&shapes(), &config);
        assert!(model.properties.iter().all(|p| p.super_property.is_none()));
        assert!(model.unaligned.is_empty());
    }

    #[test]
    fn the_graph_carries_the_ontology_header() {
        let model = synthesize_ontology(&shapes(), &Config::default());
        let graph = ontology_to_graph(&model, &Config::default());
        assert!(graph.contains(&Triple::new(
            NamedNode::new_unchecked("http://www.example.com"),
            rdf::TYPE,
            owl::ONTOLOGY,
        )));
        assert!(graph.contains(&Triple::new(
            NamedNode::new_unchecked("http://www.example.com#measuredUnit"),
            rdfs::DOMAIN,
            NamedNode::new_unchecked("http://www.example.com#Sample"),
        )));
    }
}
