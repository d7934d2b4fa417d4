#![doc = include_str!("../README.md")]
#![doc(test(attr(deny(warnings))))]

pub mod config;
mod error;
pub mod graph;
pub mod mapper;
pub mod ontology;
pub mod paths;
pub mod shacl;
pub mod sparql;
pub mod vocab;

pub use error::ConvertError;
pub use graph::{MappedGraph, PrefixTable};
