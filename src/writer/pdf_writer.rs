//! PDF document writer.
//!
//! Assembles the final file from closed pages: header, page objects, the
//! Pages root (object 1), fonts, images, the shared Resources dictionary
//! (object 2), bookmarks, the Info dictionary, the Catalog, the xref table
//! and the trailer. Object offsets are recorded before each `n 0 obj` line
//! and echoed verbatim by the xref table.

use super::buffer::OutputBuffer;
use super::encoding;
use super::font_manager::FontRegistry;
use super::image_handler::{ColorSpace, ImageInfo};
use super::links::{page_object_id, LinkTable, PageLink};
use super::object_serializer::ObjectSerializer as S;
use super::outline_builder::{page_height_or_zero, OutlineBuilder};
use crate::config::{LayoutMode, Metadata, ZoomMode};
use crate::error::Result;
use crate::object::Object;
use indexmap::IndexMap;
use log::debug;
use std::io::Write;

/// Producer string written to the Info dictionary.
pub const PRODUCER: &str = concat!("pdf_quill ", env!("CARGO_PKG_VERSION"));

/// Compress data using Flate/Deflate compression.
///
/// Returns compressed bytes suitable for FlateDecode filter.
pub fn compress_data(data: &[u8]) -> Result<Vec<u8>> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Sequential indirect object writer with offset bookkeeping.
///
/// Numbers 1 and 2 are reserved for the Pages root and the Resources
/// dictionary, so the first object allocated by [`ObjectWriter::put`] is 3.
#[derive(Debug)]
pub struct ObjectWriter {
    out: OutputBuffer,
    offsets: Vec<usize>,
    n: u32,
    serializer: S,
}

impl Default for ObjectWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectWriter {
    /// Create a writer with objects 1 and 2 reserved.
    pub fn new() -> Self {
        Self {
            out: OutputBuffer::new(),
            offsets: vec![0; 3],
            n: 2,
            serializer: S::new(),
        }
    }

    /// Number the next [`ObjectWriter::put`] will use.
    pub fn next_id(&self) -> u32 {
        self.n + 1
    }

    /// Highest object number allocated so far.
    pub fn current_id(&self) -> u32 {
        self.n
    }

    /// Bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        self.out.as_bytes()
    }

    /// Write a raw line outside any object.
    pub fn line(&mut self, line: &str) {
        self.out.push_line(line);
    }

    fn record_offset(&mut self, id: u32) {
        let id = id as usize;
        if self.offsets.len() <= id {
            self.offsets.resize(id + 1, 0);
        }
        self.offsets[id] = self.out.len();
    }

    /// Write `obj` as the next indirect object and return its number.
    pub fn put(&mut self, obj: &Object) -> Result<u32> {
        self.n += 1;
        let id = self.n;
        self.put_at(id, obj)?;
        Ok(id)
    }

    /// Write `obj` under a fixed object number (the reserved 1 and 2).
    pub fn put_at(&mut self, id: u32, obj: &Object) -> Result<()> {
        self.record_offset(id);
        writeln!(self.out, "{} 0 obj", id)?;
        self.serializer.write_object(&mut self.out, obj)?;
        self.out.push_line("");
        self.out.push_line("endobj");
        Ok(())
    }

    /// Offset recorded for object `id`.
    pub fn offset(&self, id: u32) -> Option<usize> {
        self.offsets.get(id as usize).copied()
    }

    /// Write the xref table and trailer. The last object is the Catalog and
    /// the one before it the Info dictionary.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let xref = self.out.len();
        writeln!(self.out, "xref")?;
        writeln!(self.out, "0 {}", self.n + 1)?;
        writeln!(self.out, "0000000000 65535 f ")?;
        for i in 1..=self.n as usize {
            writeln!(self.out, "{:010} 00000 n ", self.offsets.get(i).copied().unwrap_or(0))?;
        }
        let trailer = S::dict(vec![
            ("Size", S::integer(i64::from(self.n) + 1)),
            ("Root", S::reference(self.n)),
            ("Info", S::reference(self.n.saturating_sub(1))),
        ]);
        writeln!(self.out, "trailer")?;
        self.serializer.write_object(&mut self.out, &trailer)?;
        writeln!(self.out)?;
        writeln!(self.out, "startxref")?;
        writeln!(self.out, "{}", xref)?;
        writeln!(self.out, "%%EOF")?;
        Ok(self.out.into_bytes())
    }
}

/// Configuration for the final pass.
#[derive(Debug, Clone)]
pub struct PdfWriterConfig {
    /// PDF version (e.g., "1.3")
    pub version: String,
    /// Whether to compress streams
    pub compress: bool,
    /// Write metadata strings as UTF-16BE
    pub unicode: bool,
    /// Right-to-left viewer preference
    pub rtl: bool,
    /// Scale factor (points per user unit)
    pub k: f64,
    /// Viewer zoom
    pub zoom: ZoomMode,
    /// Viewer page layout
    pub layout: LayoutMode,
    /// Information dictionary entries
    pub metadata: Metadata,
    /// Alias replaced by the page count
    pub alias_nb_pages: Option<String>,
    /// Creation date
    pub creation_date: chrono::NaiveDateTime,
}

/// A closed page handed to the writer.
#[derive(Debug, Clone)]
pub struct FinishedPage {
    /// Width in points
    pub width: f64,
    /// Height in points
    pub height: f64,
    /// Raw content stream
    pub content: Vec<u8>,
    /// Link rectangles
    pub links: Vec<PageLink>,
}

/// Everything the final pass reads besides the pages.
pub struct Resources<'a> {
    /// Registered fonts
    pub fonts: &'a mut FontRegistry,
    /// Images by source key
    pub images: &'a mut IndexMap<String, ImageInfo>,
    /// Internal link destinations
    pub links: &'a LinkTable,
    /// Bookmarks
    pub outlines: &'a OutlineBuilder,
}

/// PDF document writer.
pub struct PdfWriter {
    config: PdfWriterConfig,
    w: ObjectWriter,
}

impl PdfWriter {
    /// Create a writer for the given configuration.
    pub fn new(config: PdfWriterConfig) -> Self {
        Self {
            config,
            w: ObjectWriter::new(),
        }
    }

    fn text_string(&self, s: &str) -> Object {
        S::string(&encoding::text_string(s, self.config.unicode))
    }

    fn content_stream(&self, data: Vec<u8>) -> Result<Object> {
        if self.config.compress {
            Ok(S::stream(vec![("Filter", S::name("FlateDecode"))], compress_data(&data)?))
        } else {
            Ok(S::stream(vec![], data))
        }
    }

    /// Run the final pass and return the file bytes.
    pub fn finish(mut self, mut pages: Vec<FinishedPage>, res: Resources<'_>) -> Result<Vec<u8>> {
        self.w.line(&format!("%PDF-{}", self.config.version));
        self.replace_alias(&mut pages);
        let heights: Vec<f64> = pages.iter().map(|p| p.height).collect();
        self.put_pages(pages, res.links)?;
        res.fonts.put_all(&mut self.w, self.config.compress)?;
        self.put_images(res.images)?;
        self.put_resources(res.fonts, res.images)?;
        let outline_root =
            res.outlines
                .put(&mut self.w, page_height_or_zero(&heights), self.config.k, self.config.unicode)?;
        let info = self.info();
        self.w.put(&info)?;
        let catalog = self.catalog(outline_root);
        self.w.put(&catalog)?;
        debug!(
            "final pass: {} pages, {} fonts, {} images, {} objects",
            heights.len(),
            res.fonts.len(),
            res.images.len(),
            self.w.current_id()
        );
        self.w.finish()
    }

    fn replace_alias(&self, pages: &mut [FinishedPage]) {
        let Some(alias) = self.config.alias_nb_pages.as_deref().filter(|a| !a.is_empty()) else {
            return;
        };
        let nb = pages.len().to_string();
        let alias_chars = encoding::code_points(alias);
        let nb_chars = encoding::code_points(&nb);
        let plain = (alias.as_bytes().to_vec(), nb.as_bytes().to_vec());
        let wide = (encoding::utf16be(&alias_chars, false), encoding::utf16be(&nb_chars, false));
        for page in pages {
            for (from, to) in [&wide, &plain] {
                page.content = replace_bytes(&page.content, from, to);
            }
        }
    }

    fn put_pages(&mut self, pages: Vec<FinishedPage>, links: &LinkTable) -> Result<()> {
        let nb = pages.len();
        let heights: Vec<f64> = pages.iter().map(|p| p.height).collect();
        let page_height = |p: usize| p.checked_sub(1).and_then(|i| heights.get(i)).copied();
        for page in pages {
            let mut entries = vec![
                ("Type", S::name("Page")),
                ("Parent", S::reference(1)),
                ("MediaBox", S::rect(0.0, 0.0, round2(page.width), round2(page.height))),
                ("Resources", S::reference(2)),
            ];
            let annots: Vec<Object> = page
                .links
                .iter()
                .filter_map(|l| l.annotation(links, page_height, self.config.k))
                .collect();
            if !annots.is_empty() {
                entries.push(("Annots", S::array(annots)));
            }
            entries.push(("Contents", S::reference(self.w.next_id() + 1)));
            self.w.put(&S::dict(entries))?;
            let content = self.content_stream(page.content)?;
            self.w.put(&content)?;
        }
        let kids = (1..=nb).map(|p| S::reference(page_object_id(p))).collect();
        self.w.put_at(
            1,
            &S::dict(vec![
                ("Type", S::name("Pages")),
                ("Kids", S::array(kids)),
                ("Count", S::integer(nb as i64)),
            ]),
        )
    }

    fn put_images(&mut self, images: &mut IndexMap<String, ImageInfo>) -> Result<()> {
        for info in images.values_mut() {
            let indexed = info.cs == ColorSpace::Indexed;
            let palette_ref = indexed.then(|| self.w.next_id() + 1);
            let xobject = info.take_xobject(palette_ref);
            info.n = self.w.put(&xobject)?;
            if indexed {
                let palette = self.content_stream(info.palette.clone())?;
                self.w.put(&palette)?;
            }
        }
        Ok(())
    }

    fn put_resources(&mut self, fonts: &FontRegistry, images: &IndexMap<String, ImageInfo>) -> Result<()> {
        let procset = ["PDF", "Text", "ImageB", "ImageC", "ImageI"].iter().map(|p| S::name(p)).collect();
        let font_dict = fonts
            .fonts()
            .map(|f| (format!("F{}", f.i), S::reference(f.n)))
            .collect();
        let xobject_dict = images
            .values()
            .map(|img| (format!("I{}", img.i), S::reference(img.n)))
            .collect();
        self.w.put_at(
            2,
            &S::dict(vec![
                ("ProcSet", S::array(procset)),
                ("Font", Object::Dictionary(font_dict)),
                ("XObject", Object::Dictionary(xobject_dict)),
            ]),
        )
    }

    fn info(&self) -> Object {
        let meta = &self.config.metadata;
        let mut entries = vec![("Producer", self.text_string(PRODUCER))];
        for (key, value) in [
            ("Title", &meta.title),
            ("Subject", &meta.subject),
            ("Author", &meta.author),
            ("Keywords", &meta.keywords),
            ("Creator", &meta.creator),
        ] {
            if let Some(v) = value {
                entries.push((key, self.text_string(v)));
            }
        }
        let date = format!("D:{}", self.config.creation_date.format("%Y%m%d%H%M%S"));
        entries.push(("CreationDate", self.text_string(&date)));
        S::dict(entries)
    }

    fn catalog(&self, outline_root: Option<u32>) -> Object {
        let first_page = S::reference(page_object_id(1));
        let mut entries = vec![("Type", S::name("Catalog")), ("Pages", S::reference(1))];
        let open_action = match self.config.zoom {
            ZoomMode::FullPage => Some(vec![first_page, S::name("Fit")]),
            ZoomMode::FullWidth => Some(vec![first_page, S::name("FitH"), Object::Null]),
            ZoomMode::Real => Some(vec![first_page, S::name("XYZ"), Object::Null, Object::Null, S::integer(1)]),
            ZoomMode::Percent(p) => Some(vec![
                first_page,
                S::name("XYZ"),
                Object::Null,
                Object::Null,
                S::real(p / 100.0),
            ]),
            ZoomMode::Default => None,
        };
        if let Some(action) = open_action {
            entries.push(("OpenAction", S::array(action)));
        }
        let layout = match self.config.layout {
            LayoutMode::Single => Some("SinglePage"),
            LayoutMode::Continuous => Some("OneColumn"),
            LayoutMode::Two => Some("TwoColumnLeft"),
            LayoutMode::Default => None,
        };
        if let Some(layout) = layout {
            entries.push(("PageLayout", S::name(layout)));
        }
        if let Some(root) = outline_root {
            entries.push(("Outlines", S::reference(root)));
            entries.push(("PageMode", S::name("UseOutlines")));
        }
        if self.config.rtl {
            entries.push(("ViewerPreferences", S::dict(vec![("Direction", S::name("R2L"))])));
        }
        S::dict(entries)
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Replace every occurrence of `from` in `data`.
fn replace_bytes(data: &[u8], from: &[u8], to: &[u8]) -> Vec<u8> {
    if from.is_empty() || data.len() < from.len() {
        return data.to_vec();
    }
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        if data[i..].starts_with(from) {
            out.extend_from_slice(to);
            i += from.len();
        } else {
            out.push(data[i]);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PdfWriterConfig {
        PdfWriterConfig {
            version: "1.3".to_string(),
            compress: false,
            unicode: false,
            rtl: false,
            k: 1.0,
            zoom: ZoomMode::FullWidth,
            layout: LayoutMode::Continuous,
            metadata: Metadata::default(),
            alias_nb_pages: Some("{nb}".to_string()),
            creation_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
                .and_then(|d| d.and_hms_opt(3, 4, 5))
                .unwrap(),
        }
    }

    fn page(content: &str) -> FinishedPage {
        FinishedPage {
            width: 595.28,
            height: 841.89,
            content: content.as_bytes().to_vec(),
            links: Vec::new(),
        }
    }

    fn write(config: PdfWriterConfig, pages: Vec<FinishedPage>, outlines: &OutlineBuilder) -> String {
        let mut fonts = FontRegistry::default();
        let mut images = IndexMap::new();
        let links = LinkTable::new();
        let bytes = PdfWriter::new(config)
            .finish(
                pages,
                Resources {
                    fonts: &mut fonts,
                    images: &mut images,
                    links: &links,
                    outlines,
                },
            )
            .unwrap();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[test]
    fn test_object_writer_numbering() {
        let mut w = ObjectWriter::new();
        assert_eq!(w.next_id(), 3);
        assert_eq!(w.put(&S::integer(7)).unwrap(), 3);
        w.put_at(1, &S::integer(1)).unwrap();
        let out = String::from_utf8_lossy(w.as_bytes()).into_owned();
        assert_eq!(out, "3 0 obj\n7\nendobj\n1 0 obj\n1\nendobj\n");
        assert_eq!(w.offset(1), Some(17));
    }

    #[test]
    fn test_two_page_structure() {
        let out = write(config(), vec![page("a"), page("b")], &OutlineBuilder::new());
        assert!(out.starts_with("%PDF-1.3\n3 0 obj\n<</Type /Page /Parent 1 0 R /MediaBox [0 0 595.28 841.89] /Resources 2 0 R /Contents 4 0 R>>"));
        assert!(out.contains("1 0 obj\n<</Type /Pages /Kids [3 0 R 5 0 R] /Count 2>>"));
        assert!(out.contains("2 0 obj\n<</ProcSet [/PDF /Text /ImageB /ImageC /ImageI] /Font <<>> /XObject <<>>>>"));
        assert!(out.contains("/Type /Catalog /Pages 1 0 R /OpenAction [3 0 R /FitH null] /PageLayout /OneColumn"));
        assert!(out.contains("/CreationDate (D:20240102030405)"));
        assert!(out.contains("trailer\n<</Size 9 /Root 8 0 R /Info 7 0 R>>\nstartxref\n"));
        assert!(out.ends_with("%%EOF\n"));
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let out = write(config(), vec![page("x"), page("y"), page("z")], &OutlineBuilder::new());
        let xref = out.rfind("xref\n").unwrap();
        let table: Vec<&str> = out[xref..].lines().skip(3).take_while(|l| l.ends_with(" n ")).collect();
        assert_eq!(table.len(), 10);
        for (i, line) in table.iter().enumerate() {
            let offset: usize = line[..10].parse().unwrap();
            assert!(out[offset..].starts_with(&format!("{} 0 obj", i + 1)), "object {}", i + 1);
        }
    }

    #[test]
    fn test_alias_replacement() {
        let out = write(config(), vec![page("(1/{nb}) Tj"), page("x")], &OutlineBuilder::new());
        assert!(out.contains("(1/2) Tj"));
    }

    #[test]
    fn test_catalog_options() {
        let mut cfg = config();
        cfg.zoom = ZoomMode::Percent(50.0);
        cfg.layout = LayoutMode::Two;
        cfg.rtl = true;
        let mut outlines = OutlineBuilder::new();
        outlines.add("Intro", 0, 0.0, 1);
        let out = write(cfg, vec![page("")], &outlines);
        assert!(out.contains("/OpenAction [3 0 R /XYZ null null 0.5]"));
        assert!(out.contains("/PageLayout /TwoColumnLeft"));
        assert!(out.contains("/Outlines 6 0 R /PageMode /UseOutlines"));
        assert!(out.contains("/ViewerPreferences <</Direction /R2L>>"));
    }

    #[test]
    fn test_compressed_content() {
        let mut cfg = config();
        cfg.compress = true;
        let out = write(cfg, vec![page("0 0 m 1 1 l S")], &OutlineBuilder::new());
        assert!(out.contains("<</Filter /FlateDecode /Length "));
    }

    #[test]
    fn test_replace_bytes() {
        assert_eq!(replace_bytes(b"a{nb}b{nb}", b"{nb}", b"12"), b"a12b12".to_vec());
        assert_eq!(replace_bytes(b"ab", b"", b"x"), b"ab".to_vec());
    }
}
