//! # Error Types
//!
//! All fallible operations in tartan surface a [`SaveError`]. Decode errors
//! wrap the underlying parse failure so callers see the full cause chain;
//! there is no partial-document recovery — a failed import aborts and the
//! error propagates to the top-level load call.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SaveError>;

/// Error type for save/load operations.
#[derive(Debug, Error)]
pub enum SaveError {
    /// An attribute or data token failed to parse as the expected type.
    #[error("malformed {what} `{text}` in `{element}`")]
    Parse {
        /// What we were trying to parse ("int", "float", ...).
        what: &'static str,
        /// The offending token.
        text: String,
        /// Element (or attribute) the token came from.
        element: String,
        #[source]
        source: ParseSource,
    },

    /// A container's declared `size` does not match its actual entry count.
    #[error("element `{element}` declares size {declared} but contains {actual} entries")]
    SizeMismatch {
        element: String,
        declared: usize,
        actual: usize,
    },

    /// A type name could not be resolved through the [`TypeRegistry`].
    ///
    /// [`TypeRegistry`]: crate::registry::TypeRegistry
    #[error("unknown savable type `{0}`; was it registered?")]
    UnknownType(String),

    /// A `ref` attribute pointed at a reference ID that has not been read
    /// yet. Forward references are not supported: the referenced instance
    /// must appear earlier in document order.
    #[error("unresolved reference `{0}`")]
    UnresolvedReference(String),

    /// The document has no root element, or a root-level read failed to
    /// produce an object.
    #[error("document has no usable root element")]
    InvalidRoot,

    /// A scalar write was attempted with no element open to receive it.
    #[error("no element open for `{0}`")]
    NoContext(String),

    /// The underlying XML was not well-formed.
    #[error("invalid XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// I/O failure from the underlying stream.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The concrete parse failure wrapped by [`SaveError::Parse`].
#[derive(Debug, Error)]
pub enum ParseSource {
    #[error(transparent)]
    Int(#[from] std::num::ParseIntError),
    #[error(transparent)]
    Float(#[from] std::num::ParseFloatError),
    #[error(transparent)]
    Bool(#[from] std::str::ParseBoolError),
    #[error("unrecognized enum token")]
    Enum,
}
