//! Object syntax for the final pass.
//!
//! Every object is written on as few lines as possible: dictionaries and
//! arrays stay on one line, only streams break around their data. Strings
//! are always literal strings carrying the document's encoded bytes.

use super::encoding;
use crate::object::{Dictionary, Object};
use std::io::Write;

/// Writes [`Object`]s, and builds them through the associated helpers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectSerializer;

impl ObjectSerializer {
    pub fn new() -> Self {
        Self
    }

    /// Serialize an object to bytes.
    pub fn serialize(&self, obj: &Object) -> Vec<u8> {
        let mut buf = Vec::new();
        // A Vec sink never fails
        let _ = self.write_object(&mut buf, obj);
        buf
    }

    /// Lossy text form, for tests and log lines.
    pub fn serialize_to_string(&self, obj: &Object) -> String {
        String::from_utf8_lossy(&self.serialize(obj)).into_owned()
    }

    /// Write an object to any byte sink.
    pub fn write_object<W: Write>(&self, w: &mut W, obj: &Object) -> std::io::Result<()> {
        match obj {
            Object::Null => w.write_all(b"null"),
            Object::Boolean(b) => write!(w, "{}", b),
            Object::Integer(i) => write!(w, "{}", i),
            Object::Real(r) => w.write_all(format_real(*r).as_bytes()),
            Object::String(s) => {
                w.write_all(b"(")?;
                w.write_all(&encoding::escape(s))?;
                w.write_all(b")")
            },
            Object::Name(n) => write_name(w, n),
            Object::Array(items) => {
                w.write_all(b"[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        w.write_all(b" ")?;
                    }
                    self.write_object(w, item)?;
                }
                w.write_all(b"]")
            },
            Object::Dictionary(dict) => self.write_dictionary(w, dict, None),
            Object::Stream { dict, data } => {
                let length = if dict.contains_key("Length") { None } else { Some(data.len()) };
                self.write_dictionary(w, dict, length)?;
                w.write_all(b"\nstream\n")?;
                w.write_all(data)?;
                w.write_all(b"\nendstream")
            },
            Object::Reference(id) => write!(w, "{} 0 R", id),
        }
    }

    /// `length`, when given, is appended as a trailing `/Length` entry.
    fn write_dictionary<W: Write>(&self, w: &mut W, dict: &Dictionary, length: Option<usize>) -> std::io::Result<()> {
        w.write_all(b"<<")?;
        let mut first = true;
        for (key, value) in dict {
            if !first {
                w.write_all(b" ")?;
            }
            first = false;
            write_name(w, key)?;
            w.write_all(b" ")?;
            self.write_object(w, value)?;
        }
        if let Some(len) = length {
            if !first {
                w.write_all(b" ")?;
            }
            write!(w, "/Length {}", len)?;
        }
        w.write_all(b">>")
    }
}

/// Reals keep at most four decimals, with trailing zeros dropped.
fn format_real(value: f64) -> String {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    if rounded.fract() == 0.0 {
        return format!("{}", rounded as i64);
    }
    let text = format!("{:.4}", rounded);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Bytes outside the regular character set are written as `#xx`.
fn write_name<W: Write>(w: &mut W, name: &str) -> std::io::Result<()> {
    w.write_all(b"/")?;
    for b in name.bytes() {
        let delimiter = matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%' | b'#');
        if (0x21..=0x7E).contains(&b) && !delimiter {
            w.write_all(&[b])?;
        } else {
            write!(w, "#{:02X}", b)?;
        }
    }
    Ok(())
}

/// Object constructors used throughout the writer.
impl ObjectSerializer {
    pub fn name(s: &str) -> Object {
        Object::Name(s.to_string())
    }

    /// Literal string from bytes already in the target encoding.
    pub fn string(s: &[u8]) -> Object {
        Object::String(s.to_vec())
    }

    pub fn integer(i: i64) -> Object {
        Object::Integer(i)
    }

    pub fn real(r: f64) -> Object {
        Object::Real(r)
    }

    pub fn array(items: Vec<Object>) -> Object {
        Object::Array(items)
    }

    /// Dictionary object, entries kept in the given order.
    pub fn dict(entries: Vec<(&str, Object)>) -> Object {
        Object::Dictionary(Self::entries(entries))
    }

    /// Bare dictionary map, entries kept in the given order.
    pub fn entries(entries: Vec<(&str, Object)>) -> Dictionary {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    pub fn stream(entries: Vec<(&str, Object)>, data: Vec<u8>) -> Object {
        Object::Stream {
            dict: Self::entries(entries),
            data: bytes::Bytes::from(data),
        }
    }

    pub fn reference(id: u32) -> Object {
        Object::Reference(id)
    }

    /// `[llx lly urx ury]` from an origin and a size, all in points.
    pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Object {
        Object::Array(vec![
            Object::Real(x),
            Object::Real(y),
            Object::Real(x + width),
            Object::Real(y + height),
        ])
    }
}
