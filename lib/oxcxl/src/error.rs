use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Error returned during CXL parsing.
#[derive(Debug, Error)]
pub enum CxlParseError {
    /// I/O error during parsing (file not found...).
    #[error(transparent)]
    Io(#[from] io::Error),
    /// An error in the file syntax.
    #[error(transparent)]
    Syntax(#[from] CxlSyntaxError),
}

impl From<CxlParseError> for io::Error {
    #[inline]
    fn from(error: CxlParseError) -> Self {
        match error {
            CxlParseError::Io(error) => error,
            CxlParseError::Syntax(error) => error.into(),
        }
    }
}

impl From<quick_xml::Error> for CxlParseError {
    #[inline]
    fn from(error: quick_xml::Error) -> Self {
        match error {
            quick_xml::Error::Io(error) => {
                Self::Io(Arc::try_unwrap(error).unwrap_or_else(|e| io::Error::new(e.kind(), e)))
            }
            _ => Self::Syntax(CxlSyntaxError(SyntaxErrorKind::Xml(error))),
        }
    }
}

/// An error in the syntax of the parsed file.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct CxlSyntaxError(#[from] SyntaxErrorKind);

#[derive(Debug, Error)]
pub(crate) enum SyntaxErrorKind {
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
    #[error("{msg}")]
    Msg { msg: String },
}

impl CxlSyntaxError {
    /// Builds an error from a printable error message.
    #[inline]
    pub(crate) fn msg(msg: impl Into<String>) -> Self {
        Self(SyntaxErrorKind::Msg { msg: msg.into() })
    }
}

impl From<CxlSyntaxError> for io::Error {
    #[inline]
    fn from(error: CxlSyntaxError) -> Self {
        match error.0 {
            SyntaxErrorKind::Xml(error) => match error {
                quick_xml::Error::Io(error) => {
                    Arc::try_unwrap(error).unwrap_or_else(|e| Self::new(e.kind(), e))
                }
                _ => Self::new(io::ErrorKind::InvalidData, error),
            },
            SyntaxErrorKind::Msg { msg } => Self::new(io::ErrorKind::InvalidData, msg),
        }
    }
}
