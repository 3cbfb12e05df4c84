//! Values assembled by the final pass.
//!
//! Only the generator's side of the object model lives here: everything is
//! built once, written once and never read back. Page content is produced
//! as raw operator text and wrapped in an [`Object::Stream`] when the page
//! is finished.

use bytes::Bytes;
use indexmap::IndexMap;

/// Dictionary with insertion-ordered keys, so `/Type` stays first on output.
pub type Dictionary = IndexMap<String, Object>;

/// A direct object, or a reference to an indirect one.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Null,
    Boolean(bool),
    Integer(i64),
    /// Written with at most four decimals
    Real(f64),
    /// Raw bytes, already in the document's text encoding
    String(Vec<u8>),
    Name(String),
    Array(Vec<Object>),
    Dictionary(Dictionary),
    /// `/Length` is filled in on output when the dictionary lacks it
    Stream { dict: Dictionary, data: Bytes },
    /// `n 0 R`; every object this crate writes is generation zero
    Reference(u32),
}

impl Object {
    /// Dictionary part of a dictionary or stream.
    pub fn dict(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(d) | Object::Stream { dict: d, .. } => Some(d),
            _ => None,
        }
    }
}
