//! Font registry and per-kind font serialization.
//!
//! Fonts are registered once per key (`family` + `B`/`I` style letters) from
//! an injectable [`FontCatalog`]. The fourteen standard fonts are always
//! available; anything else has to be supplied by the catalog.

use super::font_metrics;
use super::object_serializer::ObjectSerializer as S;
use super::pdf_writer::ObjectWriter;
use crate::error::{Error, Result};
use crate::object::Object;
use indexmap::IndexMap;
use log::debug;
use std::collections::HashMap;

/// Font descriptor values in 1000-unit glyph space.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FontDescriptor {
    /// Maximum height above the baseline
    pub ascent: f64,
    /// Maximum depth below the baseline (negative)
    pub descent: f64,
    /// Height of flat capital letters
    pub cap_height: f64,
    /// Descriptor flags (fixed pitch, serif, symbolic, ...)
    pub flags: u32,
    /// Glyph bounding box llx, lly, urx, ury
    pub font_bbox: [i32; 4],
    /// Italic angle in degrees
    pub italic_angle: f64,
    /// Dominant vertical stem width
    pub stem_v: f64,
    /// Width for characters missing from the width table
    pub missing_width: Option<f64>,
}

impl FontDescriptor {
    fn entries(&self) -> Vec<(&'static str, Object)> {
        let bbox = self.font_bbox.iter().map(|v| S::integer(i64::from(*v))).collect();
        let mut entries = vec![
            ("Ascent", S::real(self.ascent)),
            ("Descent", S::real(self.descent)),
            ("CapHeight", S::real(self.cap_height)),
            ("Flags", S::integer(i64::from(self.flags))),
            ("FontBBox", S::array(bbox)),
            ("ItalicAngle", S::real(self.italic_angle)),
            ("StemV", S::real(self.stem_v)),
        ];
        if let Some(mw) = self.missing_width {
            entries.push(("MissingWidth", S::real(mw)));
        }
        entries
    }
}

/// An embeddable font program.
#[derive(Debug, Clone, PartialEq)]
pub struct FontProgram {
    /// Unique name of the program, shared by fonts that embed the same file
    pub name: String,
    /// Program bytes
    pub data: Vec<u8>,
    /// Whether `data` is already zlib compressed
    pub compressed: bool,
    /// Length of the clear-text portion (Type1) or of the whole file (TrueType)
    pub length1: usize,
    /// Length of the encrypted portion (Type1 only)
    pub length2: Option<usize>,
    /// Object number, assigned at serialization
    pub n: u32,
}

/// CID system the glyph collection belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct CidSystemInfo {
    /// Issuer of the character collection
    pub registry: String,
    /// Collection name
    pub ordering: String,
    /// Supplement number
    pub supplement: i64,
}

/// The font kinds the writer can serialize.
#[derive(Debug, Clone, PartialEq)]
pub enum FontKind {
    /// One of the fourteen standard fonts, never embedded
    Core,
    /// Type1 font, optionally embedded
    Type1,
    /// Single-byte TrueType font, optionally embedded
    TrueType,
    /// TrueType font addressed through Identity-H with a CID to glyph map
    TrueTypeUnicode {
        /// Two bytes per CID giving the glyph id
        cid_to_gid: Vec<u8>,
        /// Whether `cid_to_gid` is already zlib compressed
        compressed: bool,
    },
    /// Non-embedded CID-keyed font using a predefined CMap
    Cid0 {
        /// Predefined CMap name, e.g. `UniJIS-UCS2-H`
        cmap: String,
        /// Character collection
        info: CidSystemInfo,
        /// Unicode to CID mapping used for the widths array
        uni2cid: HashMap<u32, u32>,
    },
}

impl FontKind {
    /// Whether strings for this font are written as UTF-16BE.
    pub fn is_unicode(&self) -> bool {
        matches!(self, FontKind::TrueTypeUnicode { .. } | FontKind::Cid0 { .. })
    }

    /// Short kind name for logging.
    pub fn label(&self) -> &'static str {
        match self {
            FontKind::Core => "core",
            FontKind::Type1 => "Type1",
            FontKind::TrueType => "TrueType",
            FontKind::TrueTypeUnicode { .. } => "TrueTypeUnicode",
            FontKind::Cid0 { .. } => "cidfont0",
        }
    }
}

/// Everything needed to register a font.
#[derive(Debug, Clone, PartialEq)]
pub struct FontDefinition {
    /// PostScript name
    pub name: String,
    /// Font kind
    pub kind: FontKind,
    /// Descriptor metrics
    pub desc: FontDescriptor,
    /// Underline position
    pub up: f64,
    /// Underline thickness
    pub ut: f64,
    /// Character code to width table
    pub cw: HashMap<u32, u16>,
    /// Encoding name for single-byte fonts
    pub enc: Option<String>,
    /// Differences array contents, e.g. `128 /Euro 130 /quotesinglbase`
    pub diff: Option<String>,
    /// Embedded font program
    pub program: Option<FontProgram>,
}

/// Source of non-core font definitions.
pub trait FontCatalog {
    /// Definition for `family` (lowercase) in `style` (``, `B`, `I` or `BI`).
    fn load(&self, family: &str, style: &str) -> Option<FontDefinition>;
}

/// Built-in catalog: user supplied definitions first, then the core fonts.
#[derive(Debug, Clone, Default)]
pub struct StandardFontCatalog {
    definitions: HashMap<String, FontDefinition>,
}

impl StandardFontCatalog {
    /// Create a catalog with only the core fonts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a definition available under `family` + `style`.
    pub fn insert(&mut self, family: &str, style: &str, def: FontDefinition) {
        self.definitions
            .insert(format!("{}{}", family.to_lowercase(), style.to_uppercase()), def);
    }
}

impl FontCatalog for StandardFontCatalog {
    fn load(&self, family: &str, style: &str) -> Option<FontDefinition> {
        let key = format!("{}{}", family, style);
        self.definitions
            .get(&key)
            .cloned()
            .or_else(|| font_metrics::core_font(&key))
    }
}

/// A registered font.
#[derive(Debug, Clone, PartialEq)]
pub struct Font {
    /// Resource index, used as `/F{i}`
    pub i: usize,
    /// Object number, assigned at serialization
    pub n: u32,
    /// PostScript name
    pub name: String,
    /// Font kind
    pub kind: FontKind,
    /// Descriptor metrics
    pub desc: FontDescriptor,
    /// Underline position
    pub up: f64,
    /// Underline thickness
    pub ut: f64,
    /// Character code to width table
    pub cw: HashMap<u32, u16>,
    /// Encoding name for single-byte fonts
    pub enc: Option<String>,
    /// Index into the registry's differences list
    pub diff: Option<usize>,
    /// Name of the embedded program in the registry's file list
    pub program: Option<String>,
}

impl Font {
    /// Width of a character in 1000-unit glyph space.
    pub fn char_width(&self, c: u32) -> f64 {
        match self.cw.get(&c) {
            Some(w) => f64::from(*w),
            None => self.desc.missing_width.unwrap_or(500.0),
        }
    }

    /// Whether strings for this font are written as UTF-16BE.
    pub fn is_unicode(&self) -> bool {
        self.kind.is_unicode()
    }

    /// Write the font's objects, returning the object number of the font
    /// dictionary.
    pub fn put(
        &self,
        w: &mut ObjectWriter,
        files: &IndexMap<String, FontProgram>,
        diffs: &[u32],
        compress: bool,
    ) -> Result<u32> {
        let file_ref = self
            .program
            .as_ref()
            .and_then(|p| files.get(p))
            .map(|p| S::reference(p.n));
        match &self.kind {
            FontKind::Core => {
                let mut entries = vec![
                    ("Type", S::name("Font")),
                    ("BaseFont", S::name(&self.name)),
                    ("Subtype", S::name("Type1")),
                ];
                if self.name != "Symbol" && self.name != "ZapfDingbats" {
                    entries.push(("Encoding", S::name("WinAnsiEncoding")));
                }
                w.put(&S::dict(entries))
            },
            FontKind::Type1 | FontKind::TrueType => {
                let subtype = if self.kind == FontKind::Type1 { "Type1" } else { "TrueType" };
                let n = w.next_id();
                let mut entries = vec![
                    ("Type", S::name("Font")),
                    ("BaseFont", S::name(&self.name)),
                    ("Subtype", S::name(subtype)),
                    ("FirstChar", S::integer(32)),
                    ("LastChar", S::integer(255)),
                    ("Widths", S::reference(n + 1)),
                    ("FontDescriptor", S::reference(n + 2)),
                ];
                if self.enc.as_deref().is_some_and(|e| !e.is_empty()) {
                    match self.diff.and_then(|d| diffs.get(d)) {
                        Some(diff_n) => entries.push(("Encoding", S::reference(*diff_n))),
                        None => entries.push(("Encoding", S::name("WinAnsiEncoding"))),
                    }
                }
                w.put(&S::dict(entries))?;
                let widths = (32u32..=255).map(|c| S::real(self.char_width(c))).collect();
                w.put(&S::array(widths))?;
                let mut desc = vec![("Type", S::name("FontDescriptor")), ("FontName", S::name(&self.name))];
                desc.extend(self.desc.entries());
                if let Some(r) = file_ref {
                    let key = if self.kind == FontKind::Type1 { "FontFile" } else { "FontFile2" };
                    desc.push((key, r));
                }
                w.put(&S::dict(desc))?;
                Ok(n)
            },
            FontKind::TrueTypeUnicode { cid_to_gid, compressed } => {
                let n = w.next_id();
                w.put(&S::dict(vec![
                    ("Type", S::name("Font")),
                    ("Subtype", S::name("Type0")),
                    ("BaseFont", S::name(&self.name)),
                    ("Encoding", S::name("Identity-H")),
                    ("DescendantFonts", S::array(vec![S::reference(n + 1)])),
                    ("ToUnicode", S::reference(n + 2)),
                ]))?;
                let mut cid_font = vec![
                    ("Type", S::name("Font")),
                    ("Subtype", S::name("CIDFontType2")),
                    ("BaseFont", S::name(&self.name)),
                    ("CIDSystemInfo", S::reference(n + 3)),
                    ("FontDescriptor", S::reference(n + 4)),
                ];
                if let Some(mw) = self.desc.missing_width {
                    cid_font.push(("DW", S::real(mw)));
                }
                cid_font.push(("W", self.cid_widths(|c| Some(c))));
                cid_font.push(("CIDToGIDMap", S::reference(n + 5)));
                w.put(&S::dict(cid_font))?;
                w.put(&to_unicode_cmap(compress)?)?;
                w.put(&S::dict(vec![
                    ("Registry", S::string(b"Adobe")),
                    ("Ordering", S::string(b"UCS")),
                    ("Supplement", S::integer(0)),
                ]))?;
                let mut desc = vec![("Type", S::name("FontDescriptor")), ("FontName", S::name(&self.name))];
                desc.extend(self.desc.entries());
                if let Some(r) = file_ref {
                    desc.push(("FontFile2", r));
                }
                w.put(&S::dict(desc))?;
                let (data, filtered) = if *compressed {
                    (cid_to_gid.clone(), true)
                } else if compress {
                    (super::pdf_writer::compress_data(cid_to_gid)?, true)
                } else {
                    (cid_to_gid.clone(), false)
                };
                let entries = if filtered { vec![("Filter", S::name("FlateDecode"))] } else { vec![] };
                w.put(&S::stream(entries, data))?;
                Ok(n)
            },
            FontKind::Cid0 { cmap, info, uni2cid } => {
                let n = w.next_id();
                w.put(&S::dict(vec![
                    ("Type", S::name("Font")),
                    ("Subtype", S::name("Type0")),
                    ("BaseFont", S::name(&format!("{}-{}", self.name, cmap))),
                    ("Encoding", S::name(cmap)),
                    ("DescendantFonts", S::array(vec![S::reference(n + 1)])),
                ]))?;
                let mut cid_font = vec![
                    ("Type", S::name("Font")),
                    ("Subtype", S::name("CIDFontType0")),
                    ("BaseFont", S::name(&self.name)),
                    (
                        "CIDSystemInfo",
                        S::dict(vec![
                            ("Registry", S::string(info.registry.as_bytes())),
                            ("Ordering", S::string(info.ordering.as_bytes())),
                            ("Supplement", S::integer(info.supplement)),
                        ]),
                    ),
                    ("FontDescriptor", S::reference(n + 2)),
                ];
                if let Some(mw) = self.desc.missing_width {
                    cid_font.push(("DW", S::real(mw)));
                }
                cid_font.push(("W", self.cid_widths(|c| uni2cid.get(&c).copied().or(Some(c)))));
                w.put(&S::dict(cid_font))?;
                let mut desc = vec![("Type", S::name("FontDescriptor")), ("FontName", S::name(&self.name))];
                desc.extend(self.desc.entries());
                w.put(&S::dict(desc))?;
                Ok(n)
            },
        }
    }

    /// `/W` array grouping consecutive CIDs into runs.
    fn cid_widths(&self, to_cid: impl Fn(u32) -> Option<u32>) -> Object {
        let mut by_cid: Vec<(u32, u16)> = self
            .cw
            .iter()
            .filter_map(|(c, w)| to_cid(*c).map(|cid| (cid, *w)))
            .collect();
        by_cid.sort_unstable();
        by_cid.dedup_by_key(|(cid, _)| *cid);

        let mut out = Vec::new();
        let mut run: Vec<Object> = Vec::new();
        let mut start = 0u32;
        let mut prev: Option<u32> = None;
        for (cid, width) in by_cid {
            if prev.is_some_and(|p| p + 1 != cid) {
                out.push(S::integer(i64::from(start)));
                out.push(S::array(std::mem::take(&mut run)));
            }
            if run.is_empty() {
                start = cid;
            }
            run.push(S::integer(i64::from(width)));
            prev = Some(cid);
        }
        if !run.is_empty() {
            out.push(S::integer(i64::from(start)));
            out.push(S::array(run));
        }
        S::array(out)
    }
}

/// Identity ToUnicode CMap for Identity-H encoded fonts.
fn to_unicode_cmap(compress: bool) -> Result<Object> {
    let cmap = "/CIDInit /ProcSet findresource begin\n\
12 dict begin\n\
begincmap\n\
/CIDSystemInfo\n\
<< /Registry (Adobe)\n\
/Ordering (UCS)\n\
/Supplement 0\n\
>> def\n\
/CMapName /Adobe-Identity-UCS def\n\
/CMapType 2 def\n\
1 begincodespacerange\n\
<0000> <FFFF>\n\
endcodespacerange\n\
1 beginbfrange\n\
<0000> <FFFF> <0000>\n\
endbfrange\n\
endcmap\n\
CMapName currentdict /CMap defineresource pop\n\
end\n\
end";
    if compress {
        let data = super::pdf_writer::compress_data(cmap.as_bytes())?;
        Ok(S::stream(vec![("Filter", S::name("FlateDecode"))], data))
    } else {
        Ok(S::stream(vec![], cmap.as_bytes().to_vec()))
    }
}

/// Registered fonts, differences arrays and embedded programs.
pub struct FontRegistry {
    fonts: IndexMap<String, Font>,
    diffs: Vec<String>,
    files: IndexMap<String, FontProgram>,
    catalog: Box<dyn FontCatalog>,
}

impl std::fmt::Debug for FontRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontRegistry")
            .field("fonts", &self.fonts.keys().collect::<Vec<_>>())
            .field("diffs", &self.diffs.len())
            .field("files", &self.files.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new(Box::new(StandardFontCatalog::new()))
    }
}

impl FontRegistry {
    /// Create a registry backed by `catalog`.
    pub fn new(catalog: Box<dyn FontCatalog>) -> Self {
        Self {
            fonts: IndexMap::new(),
            diffs: Vec::new(),
            files: IndexMap::new(),
            catalog,
        }
    }

    /// Replace the catalog used for fonts registered from now on.
    pub fn set_catalog(&mut self, catalog: Box<dyn FontCatalog>) {
        self.catalog = catalog;
    }

    /// Register `family` (lowercase) in `style` (`B`/`I` letters only) and
    /// return its key. Registering an existing key is a no-op.
    pub fn add(&mut self, family: &str, style: &str) -> Result<String> {
        let key = format!("{}{}", family, style);
        if self.fonts.contains_key(&key) {
            return Ok(key);
        }
        let def = self
            .catalog
            .load(family, style)
            .or_else(|| self.catalog.load(family, ""))
            .ok_or_else(|| Error::font(format!("Could not find font {}{}", family, style.to_lowercase())))?;

        debug!("registering {} font {} as {}", def.kind.label(), def.name, key);
        let diff = def.diff.as_ref().filter(|d| !d.is_empty()).map(|d| {
            match self.diffs.iter().position(|existing| existing == d) {
                Some(idx) => idx,
                None => {
                    self.diffs.push(d.clone());
                    self.diffs.len() - 1
                },
            }
        });
        let program = def.program.as_ref().map(|p| {
            self.files.entry(p.name.clone()).or_insert_with(|| p.clone());
            p.name.clone()
        });

        if let FontKind::Cid0 { .. } = def.kind {
            for (skey, qualifier) in [("", ""), ("B", ",Bold"), ("I", ",Italic"), ("BI", ",BoldItalic")] {
                let i = self.fonts.len() + 1;
                let font = Font {
                    i,
                    n: 0,
                    name: format!("{}{}", def.name, qualifier),
                    kind: def.kind.clone(),
                    desc: def.desc.clone(),
                    up: def.up,
                    ut: def.ut,
                    cw: def.cw.clone(),
                    enc: def.enc.clone(),
                    diff,
                    program: None,
                };
                self.fonts.entry(format!("{}{}", family, skey)).or_insert(font);
            }
            return Ok(key);
        }

        let i = self.fonts.len() + 1;
        self.fonts.insert(
            key.clone(),
            Font {
                i,
                n: 0,
                name: def.name,
                kind: def.kind,
                desc: def.desc,
                up: def.up,
                ut: def.ut,
                cw: def.cw,
                enc: def.enc,
                diff,
                program,
            },
        );
        Ok(key)
    }

    /// Look up a registered font.
    pub fn get(&self, key: &str) -> Option<&Font> {
        self.fonts.get(key)
    }

    /// Number of registered fonts.
    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    /// Whether no font was registered.
    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Registered fonts in registration order.
    pub fn fonts(&self) -> impl Iterator<Item = &Font> {
        self.fonts.values()
    }

    /// Write differences encodings, font programs and font dictionaries.
    pub fn put_all(&mut self, w: &mut ObjectWriter, compress: bool) -> Result<()> {
        let mut diff_objects = Vec::with_capacity(self.diffs.len());
        for diff in &self.diffs {
            let differences = parse_differences(diff);
            let n = w.put(&S::dict(vec![
                ("Type", S::name("Encoding")),
                ("BaseEncoding", S::name("WinAnsiEncoding")),
                ("Differences", S::array(differences)),
            ]))?;
            diff_objects.push(n);
        }

        let mut kinds: HashMap<String, bool> = HashMap::new();
        for font in self.fonts.values() {
            if let Some(p) = &font.program {
                kinds.insert(p.clone(), font.kind == FontKind::Type1);
            }
        }
        for program in self.files.values_mut() {
            let is_type1 = kinds.get(&program.name).copied().unwrap_or(false);
            let mut data = program.data.clone();
            if is_type1 && !program.compressed {
                data = strip_pfb_headers(data, program.length1);
            }
            let mut entries = Vec::new();
            if program.compressed {
                entries.push(("Filter", S::name("FlateDecode")));
            }
            entries.push(("Length1", S::integer(program.length1 as i64)));
            if let Some(l2) = program.length2 {
                entries.push(("Length2", S::integer(l2 as i64)));
                entries.push(("Length3", S::integer(0)));
            }
            program.n = w.put(&S::stream(entries, data))?;
        }

        let files = &self.files;
        for font in self.fonts.values_mut() {
            font.n = font.put(w, files, &diff_objects, compress)?;
        }
        Ok(())
    }
}

/// Turn `128 /Euro 130 /quotesinglbase` into array items.
fn parse_differences(diff: &str) -> Vec<Object> {
    diff.split_whitespace()
        .map(|token| match token.strip_prefix('/') {
            Some(name) => S::name(name),
            None => token.parse::<i64>().map(S::integer).unwrap_or_else(|_| S::name(token)),
        })
        .collect()
}

/// Remove the 6-byte segment headers of a PFB file.
fn strip_pfb_headers(mut data: Vec<u8>, length1: usize) -> Vec<u8> {
    if data.first() == Some(&128) && data.len() >= 6 {
        data.drain(..6);
        if data.get(length1) == Some(&128) && data.len() >= length1 + 6 {
            data.drain(length1..length1 + 6);
        }
    }
    data
}
