use oxrdf::IriParseError;
use std::io;
use thiserror::Error;

/// Error raised by the conversion pipeline.
///
/// Unreachable path targets and ambiguous ontology alignments are not errors:
/// they are reported as data (`None` paths, the `unaligned` list) so that
/// independent work can continue.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Malformed CXL input.
    #[error(transparent)]
    Cxl(#[from] oxcxl::CxlParseError),
    /// Malformed RDF input.
    #[error(transparent)]
    Rdf(#[from] oxrdfio::RdfParseError),
    /// A connection references a node id that does not exist in the document.
    #[error("connection references unknown node id '{id}'")]
    Structural { id: String },
    /// A path-dependent feature was requested but no root resource could be
    /// resolved, neither explicitly nor from the visual style.
    #[error("no root resource: pass an explicit root or mark one concept with an oval border")]
    NoRoot,
    /// An IRI built from configuration or labels is invalid.
    #[error(transparent)]
    Iri(#[from] IriParseError),
    /// Underlying read/write failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}
