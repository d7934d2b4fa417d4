//! Provides ready to use [`NamedNodeRef`](oxrdf::NamedNodeRef)s for the vocabularies
//! the conversion pipeline emits.

pub mod vis {
    //! Internal vocabulary of the visualization subgraph.
    //!
    //! These triples carry everything the diagram needs that is not instance
    //! data: node ids, labels, positions, styles and connection records. They
    //! are kept apart from the instance subgraph so that both can be written
    //! to one or two output targets.
    use oxrdf::NamedNodeRef;

    pub const NAMESPACE: &str = "https://w3id.org/cmap/vis#";

    /// The class of concept nodes of the diagram.
    pub const CONCEPT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("https://w3id.org/cmap/vis#Concept");
    /// The class of linking phrase nodes of the diagram.
    pub const LINKING_PHRASE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("https://w3id.org/cmap/vis#LinkingPhrase");
    /// The class of connection records of the diagram.
    pub const CONNECTION: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("https://w3id.org/cmap/vis#Connection");
    /// Ties a resource to its document-local node id. This is the identity
    /// reconciliation key for merged external graphs.
    pub const NODE_ID: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("https://w3id.org/cmap/vis#nodeId");
    /// The diagram label of a node.
    pub const LABEL: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("https://w3id.org/cmap/vis#label");
    /// Links a node resource to its appearance record.
    pub const APPEARANCE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("https://w3id.org/cmap/vis#appearance");
    /// The predicate IRI a linking phrase stands for.
    pub const PREDICATE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("https://w3id.org/cmap/vis#predicate");
    /// Source node of a connection record.
    pub const FROM: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("https://w3id.org/cmap/vis#from");
    /// Target node of a connection record.
    pub const TO: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("https://w3id.org/cmap/vis#to");
    /// Free-text comment attached to a node.
    pub const LONG_COMMENT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("https://w3id.org/cmap/vis#longComment");
    pub const X: NamedNodeRef<'_> = NamedNodeRef::new_unchecked("https://w3id.org/cmap/vis#x");
    pub const Y: NamedNodeRef<'_> = NamedNodeRef::new_unchecked("https://w3id.org/cmap/vis#y");
    pub const WIDTH: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("https://w3id.org/cmap/vis#width");
    pub const HEIGHT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("https://w3id.org/cmap/vis#height");
    /// `oval` on the root node, per the CmapTools convention the tool inherits.
    pub const BORDER_SHAPE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("https://w3id.org/cmap/vis#borderShape");
    /// `dashed` on query target nodes.
    pub const BORDER_STYLE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("https://w3id.org/cmap/vis#borderStyle");
    pub const BACKGROUND_COLOR: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("https://w3id.org/cmap/vis#backgroundColor");
    pub const FONT_STYLE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("https://w3id.org/cmap/vis#fontStyle");
    /// Unrecognized diagram attribute, stored as a `position:key=value`
    /// literal; the position keeps document order across a round trip.
    pub const EXTRA_ATTRIBUTE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("https://w3id.org/cmap/vis#extraAttribute");
    /// Unrecognized document element, stored as a `position:` prefixed raw
    /// XML literal.
    pub const EXTRA_ELEMENT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("https://w3id.org/cmap/vis#extraElement");
    /// Opaque `<res-meta>` entry, stored as a `position:name\ntext` literal.
    pub const RES_META: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("https://w3id.org/cmap/vis#resMeta");
}

pub mod sh {
    //! [SHACL](https://www.w3.org/TR/shacl/) vocabulary.
    use oxrdf::NamedNodeRef;

    pub const NAMESPACE: &str = "http://www.w3.org/ns/shacl#";

    pub const NODE_SHAPE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#NodeShape");
    pub const TARGET_CLASS: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#targetClass");
    pub const PROPERTY: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#property");
    pub const PATH: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#path");
    pub const MIN_COUNT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#minCount");
    pub const MAX_COUNT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#maxCount");
    pub const NODE_KIND: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#nodeKind");
    pub const IRI: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#IRI");
    pub const BLANK_NODE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#BlankNode");
    pub const LITERAL: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#Literal");
    pub const CLASS: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#class");
    pub const DATATYPE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#datatype");
    pub const NODE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#node");
}

pub mod owl {
    //! [OWL](https://www.w3.org/TR/owl2-overview/) vocabulary.
    use oxrdf::NamedNodeRef;

    pub const NAMESPACE: &str = "http://www.w3.org/2002/07/owl#";

    pub const ONTOLOGY: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#Ontology");
    pub const CLASS: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#Class");
    pub const OBJECT_PROPERTY: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#ObjectProperty");
    pub const DATATYPE_PROPERTY: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#DatatypeProperty");
}

pub mod rdfs {
    //! [RDF Schema](https://www.w3.org/TR/rdf-schema/) vocabulary.
    use oxrdf::NamedNodeRef;

    pub const NAMESPACE: &str = "http://www.w3.org/2000/01/rdf-schema#";

    pub const LABEL: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2000/01/rdf-schema#label");
    pub const COMMENT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2000/01/rdf-schema#comment");
    pub const SEE_ALSO: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2000/01/rdf-schema#seeAlso");
    pub const DOMAIN: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2000/01/rdf-schema#domain");
    pub const RANGE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2000/01/rdf-schema#range");
    pub const SUB_PROPERTY_OF: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2000/01/rdf-schema#subPropertyOf");
}

pub mod dct {
    //! [Dublin Core terms](https://www.dublincore.org/specifications/dublin-core/dcmi-terms/) vocabulary.
    use oxrdf::NamedNodeRef;

    pub const NAMESPACE: &str = "http://purl.org/dc/terms/";

    pub const TITLE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/dc/terms/title");
    pub const DESCRIPTION: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/dc/terms/description");
    pub const CREATOR: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/dc/terms/creator");
    pub const CREATED: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/dc/terms/created");
    pub const MODIFIED: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/dc/terms/modified");
    pub const IDENTIFIER: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/dc/terms/identifier");
    pub const HAS_PART: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/dc/terms/hasPart");
    pub const IS_PART_OF: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://purl.org/dc/terms/isPartOf");
}

pub mod skos {
    //! [SKOS](https://www.w3.org/TR/skos-reference/) vocabulary.
    use oxrdf::NamedNodeRef;

    pub const NAMESPACE: &str = "http://www.w3.org/2004/02/skos/core#";

    pub const PREF_LABEL: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#prefLabel");
    pub const ALT_LABEL: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#altLabel");
    pub const DEFINITION: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#definition");
    pub const NOTATION: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#notation");
    pub const BROADER: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#broader");
    pub const NARROWER: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#narrower");
    pub const RELATED: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#related");
}
