//! Pages, margins and the cursor.

use super::{DocState, Document};
use crate::config::{Orientation, PageFormat};
use crate::error::Result;
use crate::writer::{ContentOp, Mark, PageBuffer, PageLink};
use log::{debug, trace};

/// One page of the document and the layout context it was created with.
#[derive(Debug, Clone)]
pub(crate) struct Page {
    pub buffer: PageBuffer,
    pub width_pt: f64,
    pub height_pt: f64,
    pub orientation: Orientation,
    pub t_margin: f64,
    pub b_margin: f64,
    /// Left margin when the page was started
    pub olm: f64,
    /// Right margin when the page was started
    pub orm: f64,
    pub open: bool,
    pub links: Vec<PageLink>,
}

impl Document {
    // ----- page lifecycle -----

    /// Start a new page in the default orientation.
    pub fn add_page(&mut self) -> Result<()> {
        self.guard(|doc| doc.add_page_with(None, None))
    }

    /// Start a new page with an explicit orientation and format.
    pub fn add_page_as(&mut self, orientation: Orientation, format: impl Into<PageFormat>) -> Result<()> {
        let format = format.into();
        self.guard(|doc| doc.add_page_with(Some(orientation), Some(format)))
    }

    pub(crate) fn add_page_with(&mut self, orientation: Option<Orientation>, format: Option<PageFormat>) -> Result<()> {
        if self.original_l_margin.is_none() {
            self.original_l_margin = Some(self.gs.l_margin);
        }
        if self.original_r_margin.is_none() {
            self.original_r_margin = Some(self.gs.r_margin);
        }
        self.end_page_inner()?;
        self.start_page_inner(orientation, format)
    }

    /// Close the current page, rendering its footer.
    pub fn end_page(&mut self) -> Result<()> {
        self.guard(|doc| doc.end_page_inner())
    }

    pub(crate) fn end_page_inner(&mut self) -> Result<()> {
        if self.page == 0 || self.pages.len() > self.page {
            return Ok(());
        }
        if !self.pages.get(self.page - 1).is_some_and(|p| p.open) {
            return Ok(());
        }
        self.in_footer = true;
        let result = self.set_footer();
        self.in_footer = false;
        result?;
        if let Some(page) = self.pages.get_mut(self.page - 1) {
            page.open = false;
        }
        self.state = DocState::Open;
        trace!("closed page {}", self.page);
        Ok(())
    }

    /// Start a page. When the cursor sits on an earlier page the next
    /// existing page is reused instead.
    pub fn start_page(&mut self) -> Result<()> {
        self.guard(|doc| doc.start_page_inner(None, None))
    }

    pub(crate) fn start_page_inner(&mut self, orientation: Option<Orientation>, format: Option<PageFormat>) -> Result<()> {
        if self.pages.len() > self.page {
            self.set_page(self.page + 1);
            self.set_y(self.t_margin);
            return Ok(());
        }
        if self.state == DocState::Unstarted {
            self.state = DocState::Open;
        }
        let saved = self.gs.clone();
        self.begin_page(orientation, format)?;
        if let Some(page) = self.pages.get_mut(self.page - 1) {
            page.open = true;
        }
        self.restore_gs(saved.clone())?;
        self.set_page_mark();
        self.set_header()?;
        self.restore_gs(saved)?;
        self.set_page_mark();
        Ok(())
    }

    fn begin_page(&mut self, orientation: Option<Orientation>, format: Option<PageFormat>) -> Result<()> {
        self.page += 1;
        self.pages.push(Page {
            buffer: PageBuffer::new(),
            width_pt: self.w_pt,
            height_pt: self.h_pt,
            orientation: self.cur_orientation,
            t_margin: self.t_margin,
            b_margin: self.b_margin,
            olm: self.gs.l_margin,
            orm: self.gs.r_margin,
            open: false,
            links: Vec::new(),
        });
        self.state = DocState::PageOpen;
        let orientation = orientation.unwrap_or(self.config.orientation);
        match format {
            Some(format) => self.set_page_format(&format, orientation)?,
            None => self.set_page_orientation(orientation, None, None),
        }
        self.x = if self.rtl { self.w - self.gs.r_margin } else { self.gs.l_margin };
        self.y = self.t_margin;
        let (l, r) = (self.gs.l_margin, self.gs.r_margin);
        let (w_pt, h_pt, o, t, b) = (self.w_pt, self.h_pt, self.cur_orientation, self.t_margin, self.b_margin);
        if let Some(page) = self.pages.get_mut(self.page - 1) {
            page.width_pt = w_pt;
            page.height_pt = h_pt;
            page.orientation = o;
            page.t_margin = t;
            page.b_margin = b;
            page.olm = l;
            page.orm = r;
        }
        debug!("started page {} ({:.2}x{:.2} pt)", self.page, w_pt, h_pt);
        Ok(())
    }

    /// Record the current end of the page as the insertion point for
    /// content that must appear below everything written afterwards.
    pub fn set_page_mark(&mut self) {
        if let Some(page) = self.page.checked_sub(1).and_then(|i| self.pages.get_mut(i)) {
            page.buffer.set_mark(Mark::Insertion);
        }
    }

    pub(crate) fn set_header(&mut self) -> Result<()> {
        if !self.print_header {
            return Ok(());
        }
        let lasth = self.gs.lasth;
        self.out("q");
        let (l, r) = self.original_margins();
        self.gs.l_margin = l;
        self.gs.r_margin = r;
        self.gs.c_margin = 0.0;
        self.set_xy(if self.rtl { r } else { l }, self.header_margin);
        let (family, style, size) = self.header_font.clone();
        self.set_font_inner(&family, &style, size)?;
        self.with_decorator(|decorator, doc| decorator.header(doc))?;
        self.set_xy(if self.rtl { r } else { l }, self.t_margin);
        self.out("Q");
        self.gs.lasth = lasth;
        Ok(())
    }

    pub(crate) fn set_footer(&mut self) -> Result<()> {
        let saved = self.gs.clone();
        if let Some(page) = self.pages.get_mut(self.page - 1) {
            page.buffer.set_mark(Mark::Footer);
        }
        self.out("");
        if self.print_footer {
            let lasth = self.gs.lasth;
            self.out("q");
            let (l, r) = self.original_margins();
            self.gs.l_margin = l;
            self.gs.r_margin = r;
            self.gs.c_margin = 0.0;
            let footer_y = self.h - self.footer_margin;
            self.set_xy(if self.rtl { r } else { l }, footer_y);
            let (family, style, size) = self.footer_font.clone();
            self.set_font_inner(&family, &style, size)?;
            self.with_decorator(|decorator, doc| decorator.footer(doc))?;
            self.set_xy(if self.rtl { r } else { l }, footer_y);
            self.out("Q");
            self.gs.lasth = lasth;
        }
        self.restore_gs(saved)
    }

    /// Margins captured when the first page was added.
    pub fn original_margins(&self) -> (f64, f64) {
        (
            self.original_l_margin.unwrap_or(self.gs.l_margin),
            self.original_r_margin.unwrap_or(self.gs.r_margin),
        )
    }

    /// Move the cursor to 1-based page `n`, restoring the dimensions and
    /// margins that page was created with. Out-of-range values are ignored.
    pub fn set_page(&mut self, n: usize) {
        let Some(page) = n.checked_sub(1).and_then(|i| self.pages.get(i)) else {
            return;
        };
        self.page = n;
        self.w_pt = page.width_pt;
        self.h_pt = page.height_pt;
        self.w = self.w_pt / self.k;
        self.h = self.h_pt / self.k;
        self.t_margin = page.t_margin;
        self.b_margin = page.b_margin;
        self.cur_orientation = page.orientation;
        self.page_break_trigger = self.h - self.b_margin;
        if page.open || self.state == DocState::PageOpen {
            self.state = DocState::PageOpen;
        }
    }

    /// Move to the last page.
    pub fn last_page(&mut self) {
        let n = self.pages.len();
        self.set_page(n);
    }

    /// Current 1-based page number, 0 before the first page.
    pub fn page_no(&self) -> usize {
        self.page
    }

    /// Number of pages created so far.
    pub fn num_pages(&self) -> usize {
        self.pages.len()
    }

    // ----- page geometry -----

    /// Change the page format for the current and following pages.
    pub fn set_page_format(&mut self, format: &PageFormat, orientation: Orientation) -> Result<()> {
        let (w, h) = format.size_pt(self.k)?;
        self.fw_pt = w;
        self.fh_pt = h;
        self.set_page_orientation(orientation, None, None);
        Ok(())
    }

    /// Change the orientation, and optionally the automatic break settings.
    pub fn set_page_orientation(&mut self, orientation: Orientation, auto: Option<bool>, bottom: Option<f64>) {
        let (w, h) = orientation.apply((self.fw_pt, self.fh_pt));
        self.cur_orientation = orientation;
        self.w_pt = w;
        self.h_pt = h;
        self.w = w / self.k;
        self.h = h / self.k;
        let auto = auto.unwrap_or(self.auto_page_break);
        let bottom = bottom.unwrap_or(self.b_margin);
        self.set_auto_page_break(auto, bottom);
        if let Some(page) = self.page.checked_sub(1).and_then(|i| self.pages.get_mut(i)) {
            page.width_pt = w;
            page.height_pt = h;
            page.orientation = orientation;
        }
    }

    /// Enable or disable automatic page breaks at `margin` from the bottom.
    pub fn set_auto_page_break(&mut self, auto: bool, margin: f64) {
        self.auto_page_break = auto;
        self.b_margin = margin;
        self.page_break_trigger = self.h - margin;
    }

    /// Page width in user units.
    pub fn page_width(&self) -> f64 {
        self.w
    }

    /// Page height in user units.
    pub fn page_height(&self) -> f64 {
        self.h
    }

    /// Scale factor: points per user unit.
    pub fn scale_factor(&self) -> f64 {
        self.k
    }

    /// Bottom margin that triggers automatic page breaks.
    pub fn break_margin(&self) -> f64 {
        self.b_margin
    }

    /// Automatic page breaks enabled.
    pub fn auto_page_break(&self) -> bool {
        self.auto_page_break
    }

    /// Whether the current operation draws the footer.
    pub fn in_footer(&self) -> bool {
        self.in_footer
    }

    /// Add a page when content of height `h` would cross the break line.
    /// Returns whether a page was added.
    pub(crate) fn check_page_break(&mut self, h: f64) -> Result<bool> {
        if self.y + h <= self.page_break_trigger || self.in_footer || !self.accept_page_break() {
            return Ok(false);
        }
        let x = self.x;
        let ws = self.ws;
        if ws > 0.0 {
            self.ws = 0.0;
            self.out_op(&ContentOp::WordSpacing(0.0));
        }
        let orientation = self.cur_orientation;
        self.add_page_with(Some(orientation), None)?;
        self.y = self.t_margin;
        self.x = x;
        if ws > 0.0 {
            self.ws = ws;
            self.out_op(&ContentOp::WordSpacing(ws * self.k));
        }
        trace!("page break to page {}", self.page);
        Ok(true)
    }

    /// Page-break policy of the installed decorator.
    pub(crate) fn accept_page_break(&mut self) -> bool {
        match self.decorator.take() {
            Some(decorator) => {
                let accept = decorator.accept_page_break(self);
                self.decorator = Some(decorator);
                accept
            },
            None => self.auto_page_break,
        }
    }

    // ----- margins -----

    /// Set the left, top and right margins.
    pub fn set_margins(&mut self, left: f64, top: f64, right: Option<f64>) {
        self.gs.l_margin = left;
        self.t_margin = top;
        self.gs.r_margin = right.unwrap_or(left);
    }

    /// Set the left margin, pushing the cursor right if it falls outside.
    pub fn set_left_margin(&mut self, margin: f64) {
        self.gs.l_margin = margin;
        if self.page > 0 && self.x < margin {
            self.x = margin;
        }
    }

    /// Set the top margin.
    pub fn set_top_margin(&mut self, margin: f64) {
        self.t_margin = margin;
        if self.page > 0 && self.y < margin {
            self.y = margin;
        }
    }

    /// Set the right margin, pulling the cursor left if it falls outside.
    pub fn set_right_margin(&mut self, margin: f64) {
        self.gs.r_margin = margin;
        if self.page > 0 && self.x > self.w - margin {
            self.x = self.w - margin;
        }
    }

    /// Left, top and right margins.
    pub fn margins(&self) -> (f64, f64, f64) {
        (self.gs.l_margin, self.t_margin, self.gs.r_margin)
    }

    /// Set the horizontal padding inside cells.
    pub fn set_cell_padding(&mut self, pad: f64) {
        self.gs.c_margin = pad;
    }

    /// Horizontal padding inside cells.
    pub fn cell_padding(&self) -> f64 {
        self.gs.c_margin
    }

    /// Set the distance between the header and the top of the page.
    pub fn set_header_margin(&mut self, margin: f64) {
        self.header_margin = margin;
    }

    /// Distance between the header and the top of the page.
    pub fn header_margin(&self) -> f64 {
        self.header_margin
    }

    /// Set the distance between the footer and the bottom of the page.
    pub fn set_footer_margin(&mut self, margin: f64) {
        self.footer_margin = margin;
    }

    /// Distance between the footer and the bottom of the page.
    pub fn footer_margin(&self) -> f64 {
        self.footer_margin
    }

    /// Enable or disable the header.
    pub fn set_print_header(&mut self, print: bool) {
        self.print_header = print;
    }

    /// Enable or disable the footer.
    pub fn set_print_footer(&mut self, print: bool) {
        self.print_footer = print;
    }

    // ----- cursor -----

    /// Cursor abscissa. In right-to-left mode, distance from the right edge.
    pub fn get_x(&self) -> f64 {
        if self.rtl {
            self.w - self.x
        } else {
            self.x
        }
    }

    /// Cursor abscissa from the left edge regardless of direction.
    pub fn get_abs_x(&self) -> f64 {
        self.x
    }

    /// Cursor ordinate from the top of the page.
    pub fn get_y(&self) -> f64 {
        self.y
    }

    /// Move the cursor horizontally. Negative values count from the
    /// opposite edge.
    pub fn set_x(&mut self, x: f64) {
        self.x = match (self.rtl, x >= 0.0) {
            (true, true) => self.w - x,
            (true, false) => x.abs(),
            (false, true) => x,
            (false, false) => self.w + x,
        };
    }

    /// Move the cursor down to `y` and back to the leading margin.
    /// Negative values count from the bottom.
    pub fn set_y(&mut self, y: f64) {
        self.x = if self.rtl { self.w - self.gs.r_margin } else { self.gs.l_margin };
        self.y = if y >= 0.0 { y } else { self.h + y };
    }

    /// Move the cursor to `(x, y)`.
    pub fn set_xy(&mut self, x: f64, y: f64) {
        self.set_y(y);
        self.set_x(x);
    }

    /// Line break: back to the leading margin and down by `h`, or by the
    /// height of the last cell.
    pub fn ln(&mut self, h: Option<f64>) {
        self.x = if self.rtl { self.w - self.gs.r_margin } else { self.gs.l_margin };
        self.y += h.unwrap_or(self.gs.lasth);
    }

    /// Width between the cursor and the trailing margin.
    pub(crate) fn remaining_width(&self) -> f64 {
        if self.rtl {
            self.x - self.gs.l_margin
        } else {
            self.w - self.gs.r_margin - self.x
        }
    }

    // ----- layout settings -----

    /// Height of the last printed cell.
    pub fn last_h(&self) -> f64 {
        self.gs.lasth
    }

    /// Override the height of the last printed cell.
    pub fn set_last_h(&mut self, h: f64) {
        self.gs.lasth = h;
    }

    /// Cell height as a multiple of the font size.
    pub fn cell_height_ratio(&self) -> f64 {
        self.cell_height_ratio
    }

    /// Set the cell height ratio.
    pub fn set_cell_height_ratio(&mut self, ratio: f64) {
        self.cell_height_ratio = ratio;
    }

    /// Ratio of image pixels to user units.
    pub fn set_image_scale(&mut self, scale: f64) {
        self.img_scale = scale;
    }

    /// Ratio of image pixels to user units.
    pub fn image_scale(&self) -> f64 {
        self.img_scale
    }

    /// When true, the borders of a multi-page cell stay open at page breaks.
    pub fn set_open_cell(&mut self, open: bool) {
        self.open_cell = open;
    }

    /// Right-to-left layout.
    pub fn rtl(&self) -> bool {
        self.rtl
    }

    /// Switch the layout direction. The cursor moves to the leading margin
    /// of the current line.
    pub fn set_rtl(&mut self, enable: bool) {
        if self.rtl != enable {
            self.rtl = enable;
            self.tmprtl = false;
            let y = self.y;
            self.set_y(y);
        }
    }

    /// Force text shaping to right-to-left without changing the layout
    /// direction.
    pub fn set_temp_rtl(&mut self, enable: bool) {
        self.tmprtl = enable;
    }

    /// Extra space added to every space character, in user units.
    pub fn set_word_spacing(&mut self, ws: f64) -> Result<()> {
        self.guard(|doc| {
            doc.ws = ws;
            if doc.page > 0 {
                doc.out_op(&ContentOp::WordSpacing(ws * doc.k));
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{content, test_doc};
    use super::*;
    use crate::config::{DocumentConfig, Unit};

    #[test]
    fn test_a4_dimensions_in_mm() {
        let doc = test_doc();
        assert!((doc.page_width() - 210.0).abs() < 0.01);
        assert!((doc.page_height() - 297.0).abs() < 0.01);
    }

    #[test]
    fn test_landscape_swaps_dimensions() {
        let mut doc = test_doc();
        doc.add_page_as(Orientation::Landscape, "A4").unwrap();
        assert!(doc.page_width() > doc.page_height());
        assert!((doc.pages[0].width_pt - 841.89).abs() < 0.01);
    }

    #[test]
    fn test_points_unit_uses_format_directly() {
        let doc = Document::new(DocumentConfig::new().with_unit(Unit::Pt).with_format("LETTER")).unwrap();
        assert_eq!(doc.page_width(), 612.0);
        assert_eq!(doc.page_height(), 792.0);
    }

    #[test]
    fn test_new_page_starts_at_margins() {
        let mut doc = test_doc();
        doc.add_page().unwrap();
        let (l, t, _) = doc.margins();
        assert_eq!(doc.get_x(), l);
        assert_eq!(doc.get_y(), t);
        assert_eq!(doc.page_no(), 1);
        assert_eq!(doc.state(), DocState::PageOpen);
    }

    #[test]
    fn test_rtl_cursor_mirrors_x() {
        let mut doc = Document::new(DocumentConfig::new().with_rtl(true)).unwrap();
        doc.add_page().unwrap();
        let (_, _, r) = doc.margins();
        assert!((doc.get_x() - r).abs() < 1e-9);
        doc.set_x(30.0);
        assert!((doc.get_abs_x() - (doc.page_width() - 30.0)).abs() < 1e-9);
        assert!((doc.get_x() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_coordinates_count_from_far_edge() {
        let mut doc = test_doc();
        doc.add_page().unwrap();
        doc.set_x(-20.0);
        assert!((doc.get_x() - (doc.page_width() - 20.0)).abs() < 1e-9);
        doc.set_y(-15.0);
        assert!((doc.get_y() - (doc.page_height() - 15.0)).abs() < 1e-9);
        assert_eq!(doc.get_x(), doc.margins().0);
    }

    #[test]
    fn test_set_page_restores_page_context() {
        let mut doc = test_doc();
        doc.add_page().unwrap();
        doc.add_page_as(Orientation::Landscape, "A4").unwrap();
        doc.set_page(1);
        assert_eq!(doc.page_no(), 1);
        assert!(doc.page_height() > doc.page_width());
        doc.set_page(7);
        assert_eq!(doc.page_no(), 1);
    }

    #[test]
    fn test_insertion_mark_set_after_page_setup() {
        let mut doc = test_doc();
        doc.add_page().unwrap();
        let page = &doc.pages[0];
        assert_eq!(page.buffer.mark(Mark::Insertion), Some(page.buffer.len()));
    }

    #[test]
    fn test_page_break_keeps_x_and_restores_y() {
        let mut doc = test_doc();
        doc.add_page().unwrap();
        doc.set_xy(50.0, doc.page_height() - 25.0);
        assert!(doc.check_page_break(10.0).unwrap());
        assert_eq!(doc.page_no(), 2);
        assert_eq!(doc.get_y(), doc.margins().1);
        assert_eq!(doc.get_x(), 50.0);
        assert!(!doc.pages[0].open);
    }

    #[test]
    fn test_no_break_when_disabled() {
        let mut doc = test_doc();
        doc.set_auto_page_break(false, 0.0);
        doc.add_page().unwrap();
        doc.set_y(doc.page_height() - 1.0);
        assert!(!doc.check_page_break(10.0).unwrap());
        assert_eq!(doc.num_pages(), 1);
    }

    #[test]
    fn test_word_spacing_reemitted_after_break() {
        let mut doc = test_doc();
        doc.add_page().unwrap();
        doc.set_word_spacing(1.0).unwrap();
        doc.set_y(doc.page_height() - 21.0);
        doc.check_page_break(10.0).unwrap();
        assert!(content(&doc, 1).contains("BT 0.000 Tw ET"));
        assert!(content(&doc, 2).contains(&format!("BT {:.3} Tw ET", doc.scale_factor())));
    }

    #[test]
    fn test_left_margin_pushes_cursor() {
        let mut doc = test_doc();
        doc.add_page().unwrap();
        doc.set_left_margin(40.0);
        assert_eq!(doc.get_x(), 40.0);
        doc.set_x(150.0);
        doc.set_right_margin(100.0);
        assert!((doc.get_x() - (doc.page_width() - 100.0)).abs() < 1e-9);
    }

    #[test]
    fn test_ln_uses_last_height() {
        let mut doc = test_doc();
        doc.add_page().unwrap();
        doc.set_last_h(7.0);
        let y = doc.get_y();
        doc.ln(None);
        assert_eq!(doc.get_y(), y + 7.0);
        doc.ln(Some(3.0));
        assert_eq!(doc.get_y(), y + 10.0);
    }
}
