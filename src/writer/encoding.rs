//! Character encoding helpers for string operands.
//!
//! Single-byte fonts receive Latin-1 codes; unicode fonts receive raw
//! UTF-16BE. Document metadata uses UTF-16BE with a byte order mark when the
//! document is in unicode mode.

use log::warn;

/// Replacement code point for anything that cannot be encoded.
pub const REPLACEMENT: u32 = 0xFFFD;

/// Decode a string into its code points.
pub fn code_points(s: &str) -> Vec<u32> {
    s.chars().map(|c| c as u32).collect()
}

/// Rebuild a string from code points, substituting U+FFFD for invalid values.
pub fn from_code_points(chars: &[u32]) -> String {
    chars
        .iter()
        .map(|&c| char::from_u32(c).unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// Escape the delimiter bytes of a PDF literal string.
pub fn escape(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 4);
    for &b in bytes {
        match b {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'(' => out.extend_from_slice(b"\\("),
            b')' => out.extend_from_slice(b"\\)"),
            b'\r' => out.extend_from_slice(b"\\r"),
            _ => out.push(b),
        }
    }
    out
}

/// Encode code points as UTF-16BE, optionally with a leading byte order mark.
pub fn utf16be(chars: &[u32], bom: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(chars.len() * 2 + 2);
    if bom {
        out.extend_from_slice(&[0xFE, 0xFF]);
    }
    for &c in chars {
        let c = if (0xD800..=0xDFFF).contains(&c) || c > 0x10FFFF {
            REPLACEMENT
        } else {
            c
        };
        if c >= 0x10000 {
            let v = c - 0x10000;
            let high = 0xD800 | (v >> 10);
            let low = 0xDC00 | (v & 0x3FF);
            out.extend_from_slice(&(high as u16).to_be_bytes());
            out.extend_from_slice(&(low as u16).to_be_bytes());
        } else {
            out.extend_from_slice(&(c as u16).to_be_bytes());
        }
    }
    out
}

/// Encode code points as single bytes. Code points above 255 become `?`.
pub fn latin1(chars: &[u32]) -> Vec<u8> {
    chars
        .iter()
        .map(|&c| {
            if c < 256 {
                c as u8
            } else {
                warn!("U+{:04X} has no single-byte code, using '?'", c);
                b'?'
            }
        })
        .collect()
}

/// Bytes of a document-level text string (metadata, bookmark titles).
pub fn text_string(s: &str, unicode: bool) -> Vec<u8> {
    let chars = code_points(s);
    if unicode {
        utf16be(&chars, true)
    } else {
        latin1(&chars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_delimiters() {
        assert_eq!(escape(b"a(b)c\\d\re"), b"a\\(b\\)c\\\\d\\re".to_vec());
        assert_eq!(escape(b"Page 1/{nb}"), b"Page 1/{nb}".to_vec());
    }

    #[test]
    fn test_utf16be_bmp_and_bom() {
        assert_eq!(utf16be(&code_points("Aé"), true), vec![0xFE, 0xFF, 0x00, 0x41, 0x00, 0xE9]);
        assert_eq!(utf16be(&code_points("A"), false), vec![0x00, 0x41]);
    }

    #[test]
    fn test_utf16be_surrogate_pair() {
        // U+1F600
        assert_eq!(utf16be(&[0x1F600], false), vec![0xD8, 0x3D, 0xDE, 0x00]);
    }

    #[test]
    fn test_utf16be_invalid_becomes_replacement() {
        assert_eq!(utf16be(&[0xD800], false), vec![0xFF, 0xFD]);
    }

    #[test]
    fn test_latin1_substitution() {
        assert_eq!(latin1(&code_points("né€")), vec![b'n', 0xE9, b'?']);
    }

    #[test]
    fn test_round_trip_code_points() {
        let s = "soft\u{AD}hyphen";
        assert_eq!(from_code_points(&code_points(s)), s);
    }
}
