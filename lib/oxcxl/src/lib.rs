#![doc = include_str!("../README.md")]
#![doc(test(attr(deny(warnings))))]

mod error;
mod model;
mod parser;
mod serializer;

pub use error::{CxlParseError, CxlSyntaxError};
pub use model::{
    Appearance, Concept, Connection, CxlDocument, LinkingPhrase, NodeKind, NodeRef,
};
pub use parser::CxlParser;
pub use serializer::CxlSerializer;
