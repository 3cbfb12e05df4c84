//! Font definitions derived from TrueType files.
//!
//! Wraps `ttf-parser` to produce a [`FontDefinition`] that can be inserted
//! into a [`StandardFontCatalog`](super::font_manager::StandardFontCatalog).

use super::font_manager::{FontDefinition, FontDescriptor, FontKind, FontProgram};
use crate::error::{Error, Result};
use std::collections::HashMap;
use ttf_parser::{Face, GlyphId};

/// Build a font definition from raw TrueType data.
///
/// With `unicode` the font is addressed through Identity-H and covers the
/// whole Basic Multilingual Plane; otherwise it is a single-byte font over
/// the Latin-1 range.
pub fn truetype_definition(data: Vec<u8>, program_name: &str, unicode: bool) -> Result<FontDefinition> {
    if data.is_empty() {
        return Err(Error::font(format!("Font file {} is empty", program_name)));
    }
    let face = Face::parse(&data, 0)
        .map_err(|e| Error::font(format!("Failed to parse font {}: {}", program_name, e)))?;

    let units_per_em = f64::from(face.units_per_em().max(1));
    let scale = |v: f64| (v * 1000.0 / units_per_em).round();
    let advance = |gid: GlyphId| scale(f64::from(face.glyph_hor_advance(gid).unwrap_or(0)));

    let name = face
        .names()
        .into_iter()
        .find(|n| n.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
        .and_then(|n| n.to_string())
        .unwrap_or_else(|| program_name.to_string())
        .replace(' ', "");

    let bbox = face.global_bounding_box();
    let ascent = scale(f64::from(face.ascender()));
    let mut flags = 32u32;
    if face.is_monospaced() {
        flags |= 1;
    }
    if face.is_italic() {
        flags |= 64;
    }
    let desc = FontDescriptor {
        ascent,
        descent: scale(f64::from(face.descender())),
        cap_height: face.capital_height().map(|c| scale(f64::from(c))).unwrap_or(ascent),
        flags,
        font_bbox: [
            scale(f64::from(bbox.x_min)) as i32,
            scale(f64::from(bbox.y_min)) as i32,
            scale(f64::from(bbox.x_max)) as i32,
            scale(f64::from(bbox.y_max)) as i32,
        ],
        italic_angle: 0.0,
        stem_v: if face.is_bold() { 120.0 } else { 70.0 },
        missing_width: Some(advance(GlyphId(0))),
    };
    let (up, ut) = face
        .underline_metrics()
        .map(|m| (scale(f64::from(m.position)), scale(f64::from(m.thickness))))
        .unwrap_or((-100.0, 50.0));

    let mut cw = HashMap::new();
    let kind = if unicode {
        let mut cid_to_gid = vec![0u8; 0x10000 * 2];
        for cp in 0u32..=0xFFFF {
            let Some(gid) = char::from_u32(cp).and_then(|c| face.glyph_index(c)) else {
                continue;
            };
            cw.insert(cp, advance(gid) as u16);
            let at = cp as usize * 2;
            cid_to_gid[at..at + 2].copy_from_slice(&gid.0.to_be_bytes());
        }
        FontKind::TrueTypeUnicode {
            cid_to_gid,
            compressed: false,
        }
    } else {
        for cp in 32u32..=255 {
            if let Some(gid) = char::from_u32(cp).and_then(|c| face.glyph_index(c)) {
                cw.insert(cp, advance(gid) as u16);
            }
        }
        FontKind::TrueType
    };

    let length1 = data.len();
    Ok(FontDefinition {
        name,
        enc: if unicode { None } else { Some("cp1252".to_string()) },
        kind,
        desc,
        up,
        ut,
        cw,
        diff: None,
        program: Some(FontProgram {
            name: program_name.to_string(),
            data,
            compressed: false,
            length1,
            length2: None,
            n: 0,
        }),
    })
}

/// Load a TrueType file from disk.
pub fn truetype_definition_from_file(path: impl AsRef<std::path::Path>, unicode: bool) -> Result<FontDefinition> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let program_name = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| "font.ttf".to_string());
    truetype_definition(data, &program_name, unicode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_font_data() {
        let err = truetype_definition(Vec::new(), "empty.ttf", true).unwrap_err();
        assert!(format!("{}", err).contains("empty.ttf"));
    }

    #[test]
    fn test_garbage_font_data() {
        let err = truetype_definition(b"definitely not a font".to_vec(), "junk.ttf", false).unwrap_err();
        assert!(matches!(err, Error::Font(_)));
    }

    #[test]
    fn test_missing_font_file() {
        let err = truetype_definition_from_file("/nonexistent/dir/font.ttf", true).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
