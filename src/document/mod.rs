//! Page layout engine.
//!
//! A [`Document`] owns a cursor on the current page, the graphics state, the
//! per-page content buffers and every resource registry. Layout operations
//! append content-stream operators to the open page; [`Document::close`]
//! hands the pages to the [`PdfWriter`] for the final pass.
//!
//! The coordinate system has its origin in the top-left corner of the page
//! with y growing downwards, in the unit chosen in [`DocumentConfig`]. In
//! right-to-left mode x is reported from the right edge.
//!
//! # Example
//!
//! ```ignore
//! use pdf_quill::{Cell, Document, DocumentConfig};
//!
//! let mut doc = Document::new(DocumentConfig::new())?;
//! doc.add_page()?;
//! doc.set_font("helvetica", "B", 16.0)?;
//! doc.cell(Cell::new(40.0, 10.0).text("Hello World!"))?;
//! doc.save("hello.pdf")?;
//! ```

mod cell;
mod drawing;
mod hooks;
mod html;
mod page;
mod text;

pub use cell::{Align, Border, BorderSides, Cell, LineBreak, MultiCell, Stretch};
pub use drawing::{ImageAlign, ImageOptions};
pub use hooks::{HeaderData, PageDecorator, StandardDecorator};
pub use html::{DomNode, HtmlParser, NodeStyle, SimpleHtmlParser};
pub use text::{TextFlow, WriteOutcome};

use crate::config::{DocumentConfig, LayoutMode, Orientation, ZoomMode};
use crate::error::{Error, Result};
use crate::text::{BidiShaper, IdentityShaper};
use crate::writer::{
    encoding, Color, ContentOp, FinishedPage, Font, FontCatalog, FontRegistry, GraphicsState, ImageDecoder,
    ImageInfo, LinkTable, OutlineBuilder, OutputBuffer, PageLink, PdfWriter, PdfWriterConfig, Resources,
    StandardImageDecoder,
};
use indexmap::IndexMap;
use log::{debug, error};
use page::Page;
use std::io::Write;
use std::path::Path;

/// Callback invoked once with the first fatal error of a document.
pub type ErrorHook = Box<dyn FnMut(&Error)>;

/// Lifecycle of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocState {
    /// Nothing written yet
    Unstarted,
    /// Started, no page open
    Open,
    /// A page is open and receives content
    PageOpen,
    /// Finalized; the file bytes are available
    Closed,
}

/// A PDF document under construction.
pub struct Document {
    pub(crate) config: DocumentConfig,
    pub(crate) state: DocState,
    pub(crate) k: f64,
    pub(crate) fw_pt: f64,
    pub(crate) fh_pt: f64,
    pub(crate) cur_orientation: Orientation,
    pub(crate) w_pt: f64,
    pub(crate) h_pt: f64,
    pub(crate) w: f64,
    pub(crate) h: f64,
    pub(crate) pages: Vec<Page>,
    pub(crate) page: usize,
    pub(crate) gs: GraphicsState,
    pub(crate) t_margin: f64,
    pub(crate) b_margin: f64,
    pub(crate) page_break_trigger: f64,
    pub(crate) auto_page_break: bool,
    pub(crate) original_l_margin: Option<f64>,
    pub(crate) original_r_margin: Option<f64>,
    pub(crate) x: f64,
    pub(crate) y: f64,
    pub(crate) font_size: f64,
    pub(crate) font_ascent: f64,
    pub(crate) font_descent: f64,
    pub(crate) current_font: Option<String>,
    pub(crate) ws: f64,
    pub(crate) fonts: FontRegistry,
    pub(crate) images: IndexMap<String, ImageInfo>,
    pub(crate) image_decoder: Box<dyn ImageDecoder>,
    pub(crate) links: LinkTable,
    pub(crate) outlines: OutlineBuilder,
    pub(crate) in_footer: bool,
    pub(crate) open_cell: bool,
    pub(crate) rtl: bool,
    pub(crate) tmprtl: bool,
    pub(crate) cell_height_ratio: f64,
    pub(crate) img_scale: f64,
    pub(crate) print_header: bool,
    pub(crate) print_footer: bool,
    pub(crate) header_margin: f64,
    pub(crate) footer_margin: f64,
    pub(crate) header_font: (String, String, f64),
    pub(crate) footer_font: (String, String, f64),
    pub(crate) header_data: HeaderData,
    pub(crate) decorator: Option<Box<dyn PageDecorator>>,
    pub(crate) error_hook: Option<ErrorHook>,
    pub(crate) poisoned: Option<String>,
    pub(crate) output: Option<Vec<u8>>,
    pub(crate) preamble: OutputBuffer,
    pub(crate) endlinex: f64,
    pub(crate) img_rb_x: f64,
    pub(crate) img_rb_y: f64,
    pub(crate) html_parser: Box<dyn HtmlParser>,
    pub(crate) shaper: Box<dyn BidiShaper>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("state", &self.state)
            .field("page", &self.page)
            .field("pages", &self.pages.len())
            .field("x", &self.x)
            .field("y", &self.y)
            .field("fonts", &self.fonts)
            .field("images", &self.images.len())
            .field("poisoned", &self.poisoned)
            .finish()
    }
}

impl Document {
    /// Create a document. Fails on an unknown page format or invalid ratios.
    pub fn new(config: DocumentConfig) -> Result<Self> {
        config.validate()?;
        let k = config.unit.scale_factor();
        let (fw_pt, fh_pt) = config.format.size_pt(k)?;
        let margin = 28.35 / k;
        let (left, top, right) = config
            .margins
            .map_or((margin, margin, margin), |m| (m.left, m.top, m.right));

        let mut gs = GraphicsState::new(k);
        gs.l_margin = left;
        gs.r_margin = right;
        gs.c_margin = margin / 10.0;
        gs.fill_color = Color::Rgb(200, 200, 200);
        gs.text_color = Color::Rgb(0, 0, 0);
        gs.color_flag = gs.fill_color != gs.text_color;

        let break_margin = config.break_margin.unwrap_or(2.0 * margin);
        let mut doc = Self {
            state: DocState::Unstarted,
            k,
            fw_pt,
            fh_pt,
            cur_orientation: config.orientation,
            w_pt: fw_pt,
            h_pt: fh_pt,
            w: fw_pt / k,
            h: fh_pt / k,
            pages: Vec::new(),
            page: 0,
            gs,
            t_margin: top,
            b_margin: break_margin,
            page_break_trigger: 0.0,
            auto_page_break: config.auto_page_break,
            original_l_margin: None,
            original_r_margin: None,
            x: 0.0,
            y: 0.0,
            font_size: 12.0 / k,
            font_ascent: 0.0,
            font_descent: 0.0,
            current_font: None,
            ws: 0.0,
            fonts: FontRegistry::default(),
            images: IndexMap::new(),
            image_decoder: Box::new(StandardImageDecoder),
            links: LinkTable::new(),
            outlines: OutlineBuilder::new(),
            in_footer: false,
            open_cell: true,
            rtl: config.rtl,
            tmprtl: false,
            cell_height_ratio: config.cell_height_ratio,
            img_scale: config.image_scale,
            print_header: config.print_header,
            print_footer: config.print_footer,
            header_margin: config.header_margin,
            footer_margin: config.footer_margin,
            header_font: ("helvetica".to_string(), String::new(), 10.0),
            footer_font: ("helvetica".to_string(), String::new(), 8.0),
            header_data: HeaderData::default(),
            decorator: Some(Box::new(StandardDecorator::default())),
            error_hook: None,
            poisoned: None,
            output: None,
            preamble: OutputBuffer::new(),
            endlinex: 0.0,
            img_rb_x: 0.0,
            img_rb_y: 0.0,
            html_parser: Box::new(SimpleHtmlParser::new()),
            shaper: Box::new(IdentityShaper),
            config,
        };
        let (auto, orientation) = (doc.auto_page_break, doc.cur_orientation);
        doc.set_page_orientation(orientation, Some(auto), Some(break_margin));
        debug!(
            "new document: {}x{} pt, k={:.4}, unicode={}",
            doc.w_pt, doc.h_pt, doc.k, doc.config.unicode
        );
        Ok(doc)
    }

    // ----- error handling -----

    fn check_usable(&self) -> Result<()> {
        if let Some(msg) = &self.poisoned {
            return Err(Error::Poisoned(msg.clone()));
        }
        if self.state == DocState::Closed {
            return Err(Error::State("Document is already closed".to_string()));
        }
        Ok(())
    }

    /// Run a mutating operation, poisoning the document if it fails.
    pub(crate) fn guard<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.check_usable()?;
        f(self).map_err(|err| self.fail(err))
    }

    /// Report a fatal error. Only the first one reaches the log and the hook.
    pub(crate) fn fail(&mut self, err: Error) -> Error {
        if self.poisoned.is_none() && !matches!(err, Error::Poisoned(_)) {
            error!("{}", err);
            self.poisoned = Some(err.to_string());
            if let Some(hook) = self.error_hook.as_mut() {
                hook(&err);
            }
        }
        err
    }

    /// Install a callback receiving the first fatal error.
    pub fn set_error_hook(&mut self, hook: impl FnMut(&Error) + 'static) {
        self.error_hook = Some(Box::new(hook));
    }

    /// Message of the error that made the document unusable, if any.
    pub fn poisoned(&self) -> Option<&str> {
        self.poisoned.as_deref()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DocState {
        self.state
    }

    // ----- output routing -----

    /// Append one operator line to the open page, or to the preamble when
    /// no page is open.
    pub(crate) fn out(&mut self, line: &str) {
        self.out_bytes(line.as_bytes());
    }

    pub(crate) fn out_bytes(&mut self, bytes: &[u8]) {
        if self.state == DocState::PageOpen {
            if let Some(page) = self.page.checked_sub(1).and_then(|i| self.pages.get_mut(i)) {
                page.buffer.append(bytes);
                page.buffer.append(b"\n");
                return;
            }
        }
        // Writing into a Vec cannot fail.
        let _ = self.preamble.write_all(bytes);
        let _ = self.preamble.write_all(b"\n");
    }

    pub(crate) fn out_op(&mut self, op: &ContentOp) {
        self.out_bytes(&op.to_bytes());
    }

    /// Content written so far to 1-based page `page`.
    pub fn page_content(&self, page: usize) -> Option<&[u8]> {
        page.checked_sub(1)
            .and_then(|i| self.pages.get(i))
            .map(|p| p.buffer.as_bytes())
    }

    /// Link rectangles of 1-based page `page`.
    pub fn page_links(&self, page: usize) -> Option<&[PageLink]> {
        page.checked_sub(1)
            .and_then(|i| self.pages.get(i))
            .map(|p| p.links.as_slice())
    }

    // ----- collaborators -----

    /// Replace the catalog non-core fonts are loaded from.
    pub fn set_font_catalog(&mut self, catalog: Box<dyn FontCatalog>) {
        self.fonts.set_catalog(catalog);
    }

    /// Replace the image decoder.
    pub fn set_image_decoder(&mut self, decoder: Box<dyn ImageDecoder>) {
        self.image_decoder = decoder;
    }

    /// Replace the HTML parser used by [`Document::write_html`].
    pub fn set_html_parser(&mut self, parser: Box<dyn HtmlParser>) {
        self.html_parser = parser;
    }

    /// Replace the bidirectional text shaper.
    pub fn set_bidi_shaper(&mut self, shaper: Box<dyn BidiShaper>) {
        self.shaper = shaper;
    }

    /// Replace the header, footer and page-break policy.
    pub fn set_decorator(&mut self, decorator: Box<dyn PageDecorator>) {
        self.decorator = Some(decorator);
    }

    /// Run `f` with the decorator taken out of the document, so it can
    /// borrow the document mutably. Nested calls see no decorator.
    pub(crate) fn with_decorator(
        &mut self,
        f: impl FnOnce(&mut dyn PageDecorator, &mut Document) -> Result<()>,
    ) -> Result<()> {
        let Some(mut decorator) = self.decorator.take() else {
            return Ok(());
        };
        let result = f(decorator.as_mut(), self);
        self.decorator = Some(decorator);
        result
    }

    // ----- metadata and viewer preferences -----

    /// Set the document title.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.config.metadata.title = Some(title.into());
    }

    /// Set the document subject.
    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.config.metadata.subject = Some(subject.into());
    }

    /// Set the document author.
    pub fn set_author(&mut self, author: impl Into<String>) {
        self.config.metadata.author = Some(author.into());
    }

    /// Set the document keywords.
    pub fn set_keywords(&mut self, keywords: impl Into<String>) {
        self.config.metadata.keywords = Some(keywords.into());
    }

    /// Set the creator application.
    pub fn set_creator(&mut self, creator: impl Into<String>) {
        self.config.metadata.creator = Some(creator.into());
    }

    /// Set the initial zoom and page layout of the viewer.
    pub fn set_display_mode(&mut self, zoom: ZoomMode, layout: LayoutMode) {
        self.config.zoom = zoom;
        self.config.layout = layout;
    }

    /// Enable or disable content stream compression.
    pub fn set_compression(&mut self, compress: bool) {
        self.config.compress = compress;
    }

    /// Placeholder replaced by the total number of pages when the document
    /// is closed.
    pub fn set_alias_nb_pages(&mut self, alias: impl Into<String>) {
        self.config.alias_nb_pages = alias.into();
    }

    /// Current total-pages placeholder.
    pub fn alias_nb_pages(&self) -> &str {
        &self.config.alias_nb_pages
    }

    // ----- graphics state -----

    /// Snapshot of the current graphics state.
    pub fn save_graphics_state(&self) -> GraphicsState {
        self.gs.clone()
    }

    /// Reinstate a snapshot and bring the content stream in line with it.
    pub fn restore_graphics_state(&mut self, state: GraphicsState) -> Result<()> {
        self.guard(|doc| doc.restore_gs(state))
    }

    pub(crate) fn restore_gs(&mut self, state: GraphicsState) -> Result<()> {
        self.gs = state;
        let ops = self.gs.reapply_ops(self.k);
        self.out(&ops);
        if !self.gs.font_family.is_empty() {
            let family = self.gs.font_family.clone();
            let style = self.gs.full_style();
            let size = self.gs.font_size_pt;
            self.set_font_inner(&family, &style, size)?;
        }
        Ok(())
    }

    /// Set the stroking color used for lines, rectangles and cell borders.
    pub fn set_draw_color(&mut self, color: Color) -> Result<()> {
        self.guard(|doc| {
            doc.gs.draw_color = color;
            if doc.page > 0 {
                doc.out(&color.stroke_op());
            }
            Ok(())
        })
    }

    /// Set the color used for filled rectangles and cell backgrounds.
    pub fn set_fill_color(&mut self, color: Color) -> Result<()> {
        self.guard(|doc| {
            doc.gs.fill_color = color;
            doc.gs.color_flag = doc.gs.fill_color != doc.gs.text_color;
            if doc.page > 0 {
                doc.out(&color.fill_op());
            }
            Ok(())
        })
    }

    /// Set the text color. Takes effect on the next text operation.
    pub fn set_text_color(&mut self, color: Color) -> Result<()> {
        self.guard(|doc| {
            doc.gs.text_color = color;
            doc.gs.color_flag = doc.gs.fill_color != doc.gs.text_color;
            Ok(())
        })
    }

    // ----- fonts -----

    /// Register a font without selecting it and return its key.
    ///
    /// The family is matched case-insensitively; `style` may contain `B`
    /// and `I`. Registering the same key twice is a no-op.
    pub fn add_font(&mut self, family: &str, style: &str) -> Result<String> {
        self.guard(|doc| {
            let (family, style, _, _) = doc.normalize_font(family, style)?;
            doc.fonts.add(&family, &style)
        })
    }

    /// Number of registered fonts.
    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }

    /// Select a font. `style` letters: `B` bold, `I` italic, `U` underline,
    /// `D` line-through. A size of 0 keeps the current size.
    pub fn set_font(&mut self, family: &str, style: &str, size: f64) -> Result<()> {
        self.guard(|doc| doc.set_font_inner(family, style, size))
    }

    /// Change the size of the current font, in points.
    pub fn set_font_size(&mut self, size: f64) -> Result<()> {
        self.guard(|doc| {
            doc.font()?;
            doc.set_font_size_inner(size);
            Ok(())
        })
    }

    fn normalize_font(&self, family: &str, style: &str) -> Result<(String, String, bool, bool)> {
        let mut family = family.to_lowercase();
        if family.is_empty() {
            if self.gs.font_family.is_empty() {
                return Err(Error::font("Empty font family"));
            }
            family = self.gs.font_family.clone();
        }
        if !self.config.unicode && family == "arial" {
            family = "helvetica".to_string();
        }
        let requested = if family == "symbol" || family == "zapfdingbats" {
            String::new()
        } else {
            style.to_uppercase()
        };
        let mut style = String::new();
        if requested.contains('B') {
            style.push('B');
        }
        if requested.contains('I') {
            style.push('I');
        }
        Ok((family, style, requested.contains('U'), requested.contains('D')))
    }

    pub(crate) fn set_font_inner(&mut self, family: &str, style: &str, size: f64) -> Result<()> {
        let (family, style, underline, linethrough) = self.normalize_font(family, style)?;
        let key = self.fonts.add(&family, &style)?;
        let size = if size == 0.0 { self.gs.font_size_pt } else { size };
        self.gs.font_family = family;
        self.gs.font_style = style;
        self.gs.underline = underline;
        self.gs.linethrough = linethrough;
        self.current_font = Some(key);
        self.set_font_size_inner(size);
        Ok(())
    }

    pub(crate) fn set_font_size_inner(&mut self, size: f64) {
        self.gs.font_size_pt = size;
        self.font_size = size / self.k;
        let (index, ascent, descent) = match self.font() {
            Ok(font) => (font.i, font.desc.ascent, font.desc.descent),
            Err(_) => return,
        };
        self.font_ascent = if ascent > 0.0 {
            ascent * self.font_size / 1000.0
        } else {
            0.8 * self.font_size
        };
        self.font_descent = if descent < 0.0 {
            -descent * self.font_size / 1000.0
        } else {
            0.2 * self.font_size
        };
        if self.page > 0 {
            self.out_op(&ContentOp::SelectFont(index, size));
        }
    }

    /// The selected font.
    pub(crate) fn font(&self) -> Result<&Font> {
        self.current_font
            .as_deref()
            .and_then(|key| self.fonts.get(key))
            .ok_or_else(|| Error::font("No font selected"))
    }

    /// Font size in user units.
    pub fn font_size(&self) -> f64 {
        self.font_size
    }

    /// Font size in points.
    pub fn font_size_pt(&self) -> f64 {
        self.gs.font_size_pt
    }

    /// Ascent and descent of the current font in user units.
    pub fn font_extents(&self) -> (f64, f64) {
        (self.font_ascent, self.font_descent)
    }

    /// Set the font used by the header: family, style and size in points.
    pub fn set_header_font(&mut self, family: impl Into<String>, style: impl Into<String>, size: f64) {
        self.header_font = (family.into(), style.into(), size);
    }

    /// Font used by the header.
    pub fn header_font(&self) -> (&str, &str, f64) {
        (&self.header_font.0, &self.header_font.1, self.header_font.2)
    }

    /// Set the font used by the footer: family, style and size in points.
    pub fn set_footer_font(&mut self, family: impl Into<String>, style: impl Into<String>, size: f64) {
        self.footer_font = (family.into(), style.into(), size);
    }

    /// Font used by the footer.
    pub fn footer_font(&self) -> (&str, &str, f64) {
        (&self.footer_font.0, &self.footer_font.1, self.footer_font.2)
    }

    // ----- string measurement and encoding -----

    /// Width of a character in user units for the current font and size.
    pub fn char_width(&self, c: u32) -> f64 {
        match self.font() {
            Ok(font) => font.char_width(c) * self.font_size / 1000.0,
            Err(_) => 0.0,
        }
    }

    /// Total width of a run of code points.
    pub fn arr_width(&self, chars: &[u32]) -> f64 {
        match self.font() {
            Ok(font) => chars.iter().map(|c| font.char_width(*c)).sum::<f64>() * self.font_size / 1000.0,
            Err(_) => 0.0,
        }
    }

    /// Width of a string in user units. Zero when no font is selected.
    pub fn get_string_width(&self, s: &str) -> f64 {
        self.arr_width(&self.shaper.shape(&encoding::code_points(s), self.tmprtl))
    }

    /// Encode and escape code points for a string operand of the current
    /// font.
    pub(crate) fn encode_text(&self, chars: &[u32]) -> Result<Vec<u8>> {
        let raw = if self.font()?.is_unicode() {
            encoding::utf16be(&self.shaper.shape(chars, self.tmprtl), false)
        } else {
            encoding::latin1(chars)
        };
        Ok(encoding::escape(&raw))
    }

    // ----- finalization -----

    /// Finish the document. Adds a page if none exists, renders the last
    /// footer and runs the final pass. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if let Some(msg) = &self.poisoned {
            return Err(Error::Poisoned(msg.clone()));
        }
        if self.state == DocState::Closed {
            return Ok(());
        }
        self.guard(|doc| doc.close_inner())
    }

    fn close_inner(&mut self) -> Result<()> {
        if self.page == 0 {
            self.add_page_with(None, None)?;
        }
        let last = self.pages.len();
        self.set_page(last);
        self.end_page_inner()?;

        let pages: Vec<FinishedPage> = self
            .pages
            .iter()
            .map(|p| FinishedPage {
                width: p.width_pt,
                height: p.height_pt,
                content: p.buffer.as_bytes().to_vec(),
                links: p.links.clone(),
            })
            .collect();
        let config = PdfWriterConfig {
            version: self.config.pdf_version.clone(),
            compress: self.config.compress,
            unicode: self.config.unicode,
            rtl: self.rtl,
            k: self.k,
            zoom: self.config.zoom,
            layout: self.config.layout,
            metadata: self.config.metadata.clone(),
            alias_nb_pages: Some(self.config.alias_nb_pages.clone()),
            creation_date: self
                .config
                .creation_date
                .unwrap_or_else(|| chrono::Local::now().naive_local()),
        };
        let resources = Resources {
            fonts: &mut self.fonts,
            images: &mut self.images,
            links: &self.links,
            outlines: &self.outlines,
        };
        let bytes = PdfWriter::new(config).finish(pages, resources)?;
        debug!("document closed: {} pages, {} bytes", self.pages.len(), bytes.len());
        self.output = Some(bytes);
        self.state = DocState::Closed;
        Ok(())
    }

    /// The file bytes, closing the document first if needed.
    pub fn output(&mut self) -> Result<Vec<u8>> {
        self.close()?;
        self.output
            .clone()
            .ok_or_else(|| Error::State("Document produced no output".to_string()))
    }

    /// Close the document and write it to `path`.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.output()?;
        std::fs::write(path.as_ref(), bytes)?;
        debug!("saved {}", path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::Unit;

    pub(crate) fn test_doc() -> Document {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
            .and_then(|d| d.and_hms_opt(3, 4, 5))
            .unwrap();
        Document::new(DocumentConfig::new().with_compress(false).with_creation_date(date)).unwrap()
    }

    pub(crate) fn content(doc: &Document, page: usize) -> String {
        String::from_utf8_lossy(doc.page_content(page).unwrap()).into_owned()
    }

    #[test]
    fn test_default_margins_follow_unit() {
        let doc = test_doc();
        let margin = 28.35 / Unit::Mm.scale_factor();
        assert!((doc.gs.l_margin - margin).abs() < 1e-9);
        assert!((doc.gs.c_margin - margin / 10.0).abs() < 1e-9);
        assert!((doc.page_break_trigger - (doc.h - 2.0 * margin)).abs() < 1e-9);
        assert!(doc.gs.color_flag);
    }

    #[test]
    fn test_font_selection_emits_tf() {
        let mut doc = test_doc();
        doc.add_page().unwrap();
        doc.set_font("Helvetica", "B", 14.0).unwrap();
        assert!(content(&doc, 1).contains("BT /F1 14.00 Tf ET"));
        assert_eq!(doc.current_font.as_deref(), Some("helveticaB"));
        doc.set_font("", "", 0.0).unwrap();
        assert_eq!(doc.font_size_pt(), 14.0);
    }

    #[test]
    fn test_symbol_ignores_style_and_decorations_are_flags() {
        let mut doc = test_doc();
        doc.set_font("symbol", "BI", 10.0).unwrap();
        assert_eq!(doc.current_font.as_deref(), Some("symbol"));
        doc.set_font("times", "IU", 10.0).unwrap();
        assert_eq!(doc.current_font.as_deref(), Some("timesI"));
        assert!(doc.gs.underline);
        assert_eq!(doc.gs.full_style(), "IU");
    }

    #[test]
    fn test_arial_alias_without_unicode() {
        let mut doc = Document::new(DocumentConfig::new().with_unicode(false)).unwrap();
        doc.set_font("Arial", "", 10.0).unwrap();
        assert_eq!(doc.current_font.as_deref(), Some("helvetica"));
    }

    #[test]
    fn test_empty_family_without_current_font_fails() {
        let mut doc = test_doc();
        let err = doc.set_font("", "", 10.0).unwrap_err();
        assert!(err.to_string().contains("Empty font family"));
        assert!(doc.poisoned().is_some());
    }

    #[test]
    fn test_ascent_descent_from_descriptor() {
        let mut doc = test_doc();
        doc.set_font("helvetica", "", 10.0).unwrap();
        let (ascent, descent) = doc.font_extents();
        let font = doc.font().unwrap();
        let fs = doc.font_size();
        assert!((ascent - font.desc.ascent * fs / 1000.0).abs() < 1e-9);
        assert!((descent + font.desc.descent * fs / 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_color_operators_only_with_page() {
        let mut doc = test_doc();
        doc.set_draw_color(Color::Rgb(255, 0, 0)).unwrap();
        doc.add_page().unwrap();
        doc.set_fill_color(Color::Gray(0)).unwrap();
        let page = content(&doc, 1);
        assert!(page.contains("0.000 g"));
        doc.set_text_color(Color::Gray(0)).unwrap();
        assert!(!doc.gs.color_flag);
    }

    #[test]
    fn test_preamble_collects_operators_without_page() {
        let mut doc = test_doc();
        doc.set_line_width(1.0).unwrap();
        assert!(doc.preamble.is_empty());
        doc.restore_graphics_state(doc.save_graphics_state()).unwrap();
        assert!(!doc.preamble.is_empty());
    }

    #[test]
    fn test_string_width_without_font_is_zero() {
        let doc = test_doc();
        assert_eq!(doc.get_string_width("abc"), 0.0);
    }

    #[test]
    fn test_close_twice_is_noop() {
        let mut doc = test_doc();
        doc.close().unwrap();
        let first = doc.output().unwrap();
        doc.close().unwrap();
        assert_eq!(doc.output().unwrap(), first);
        assert_eq!(doc.num_pages(), 1);
    }

    #[test]
    fn test_operations_after_close_are_rejected() {
        let mut doc = test_doc();
        doc.close().unwrap();
        let err = doc.add_page().unwrap_err();
        assert!(matches!(err, Error::State(_)));
        assert!(doc.poisoned().is_none());
    }
}
