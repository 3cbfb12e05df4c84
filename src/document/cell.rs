//! Single-line cells and multi-line cells.
//!
//! A cell is a rectangle with optional borders, background, text and link.
//! [`Document::cell`] prints one on a single line; [`Document::multi_cell`]
//! flows text inside a column and paints the borders afterwards, splitting
//! them across pages when the text does.

use super::Document;
use crate::error::{Error, Result};
use crate::writer::{encoding, ContentOp, LinkTarget, Mark, PaintOp, TextArrayItem};
use bitflags::bitflags;
use std::str::FromStr;

bitflags! {
    /// Individual cell edges.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BorderSides: u8 {
        /// Left edge
        const L = 0b0001;
        /// Top edge
        const T = 0b0010;
        /// Right edge
        const R = 0b0100;
        /// Bottom edge
        const B = 0b1000;
    }
}

/// Cell border.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Border {
    /// No border
    #[default]
    None,
    /// Full frame
    Frame,
    /// A subset of edges
    Sides(BorderSides),
}

impl From<BorderSides> for Border {
    fn from(sides: BorderSides) -> Self {
        Border::Sides(sides)
    }
}

impl FromStr for Border {
    type Err = Error;

    /// `0` or empty for none, `1` for a frame, or any of the letters `LTRB`.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" | "0" => Ok(Border::None),
            "1" => Ok(Border::Frame),
            _ => {
                let mut sides = BorderSides::empty();
                for c in s.chars() {
                    sides |= match c.to_ascii_uppercase() {
                        'L' => BorderSides::L,
                        'T' => BorderSides::T,
                        'R' => BorderSides::R,
                        'B' => BorderSides::B,
                        _ => return Err(Error::config(format!("Incorrect border: {}", s))),
                    };
                }
                Ok(Border::Sides(sides))
            },
        }
    }
}

/// Where the cursor goes after a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineBreak {
    /// To the right of the cell (left in right-to-left mode)
    #[default]
    Right,
    /// To the beginning of the next line
    NextLine,
    /// Below the cell
    Below,
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    /// Cell padding from the leading edge
    #[default]
    Default,
    /// Left
    Left,
    /// Center
    Center,
    /// Right
    Right,
    /// Justify, spreading the slack over the spaces
    Justify,
}

impl Align {
    /// Justification turned into the leading-edge alignment.
    pub(crate) fn unjustified(self, rtl: bool) -> Align {
        match self {
            Align::Justify if rtl => Align::Right,
            Align::Justify => Align::Left,
            other => other,
        }
    }
}

impl FromStr for Align {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "" => Ok(Align::Default),
            "L" | "LEFT" => Ok(Align::Left),
            "C" | "CENTER" => Ok(Align::Center),
            "R" | "RIGHT" => Ok(Align::Right),
            "J" | "JUSTIFY" => Ok(Align::Justify),
            _ => Err(Error::config(format!("Incorrect alignment: {}", s))),
        }
    }
}

/// Font stretching to make text fill a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stretch {
    /// No stretching
    #[default]
    None,
    /// Horizontal scaling, only when the text is too wide
    ScaleIfNeeded,
    /// Horizontal scaling to the cell width
    Scale,
    /// Character spacing, only when the text is too wide
    SpacingIfNeeded,
    /// Character spacing to the cell width
    Spacing,
}

impl Stretch {
    fn applies(self, ratio: f64) -> bool {
        match self {
            Stretch::None => false,
            Stretch::ScaleIfNeeded | Stretch::SpacingIfNeeded => ratio < 1.0,
            Stretch::Scale | Stretch::Spacing => ratio != 1.0,
        }
    }

    fn is_spacing(self) -> bool {
        matches!(self, Stretch::SpacingIfNeeded | Stretch::Spacing)
    }
}

/// A single-line cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub(crate) w: f64,
    pub(crate) h: f64,
    pub(crate) text: String,
    pub(crate) border: Border,
    pub(crate) ln: LineBreak,
    pub(crate) align: Align,
    pub(crate) fill: bool,
    pub(crate) link: Option<LinkTarget>,
    pub(crate) stretch: Stretch,
}

impl Cell {
    /// A cell of width `w` and height `h`. A width of zero or less extends
    /// to the right margin.
    pub fn new(w: f64, h: f64) -> Self {
        Self {
            w,
            h,
            text: String::new(),
            border: Border::None,
            ln: LineBreak::Right,
            align: Align::Default,
            fill: false,
            link: None,
            stretch: Stretch::None,
        }
    }

    /// Text to print.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Borders to draw.
    pub fn border(mut self, border: impl Into<Border>) -> Self {
        self.border = border.into();
        self
    }

    /// Cursor position afterwards.
    pub fn ln(mut self, ln: LineBreak) -> Self {
        self.ln = ln;
        self
    }

    /// Text alignment.
    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    /// Paint the background.
    pub fn fill(mut self, fill: bool) -> Self {
        self.fill = fill;
        self
    }

    /// Link over the text.
    pub fn link(mut self, target: impl Into<LinkTarget>) -> Self {
        self.link = Some(target.into());
        self
    }

    /// Font stretching.
    pub fn stretch(mut self, stretch: Stretch) -> Self {
        self.stretch = stretch;
        self
    }
}

/// A multi-line cell.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiCell {
    pub(crate) w: f64,
    pub(crate) h: f64,
    pub(crate) text: String,
    pub(crate) border: Border,
    pub(crate) align: Align,
    pub(crate) fill: bool,
    pub(crate) ln: LineBreak,
    pub(crate) x: Option<f64>,
    pub(crate) y: Option<f64>,
    pub(crate) reset_height: bool,
    pub(crate) stretch: Stretch,
    pub(crate) html: bool,
    pub(crate) auto_padding: bool,
    pub(crate) max_height: f64,
}

impl MultiCell {
    /// A justified multi-line cell of width `w` and minimum height `h`.
    pub fn new(w: f64, h: f64, text: impl Into<String>) -> Self {
        Self {
            w,
            h,
            text: text.into(),
            border: Border::None,
            align: Align::Justify,
            fill: false,
            ln: LineBreak::NextLine,
            x: None,
            y: None,
            reset_height: true,
            stretch: Stretch::None,
            html: false,
            auto_padding: true,
            max_height: 0.0,
        }
    }

    /// Borders to draw.
    pub fn border(mut self, border: impl Into<Border>) -> Self {
        self.border = border.into();
        self
    }

    /// Text alignment.
    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    /// Paint the background.
    pub fn fill(mut self, fill: bool) -> Self {
        self.fill = fill;
        self
    }

    /// Cursor position afterwards.
    pub fn ln(mut self, ln: LineBreak) -> Self {
        self.ln = ln;
        self
    }

    /// Start position, instead of the cursor.
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    /// Reset the line height to the current font before printing.
    pub fn reset_height(mut self, reset: bool) -> Self {
        self.reset_height = reset;
        self
    }

    /// Font stretching.
    pub fn stretch(mut self, stretch: Stretch) -> Self {
        self.stretch = stretch;
        self
    }

    /// Interpret the text as HTML.
    pub fn html(mut self, html: bool) -> Self {
        self.html = html;
        self
    }

    /// Grow the padding to clear the border line width.
    pub fn auto_padding(mut self, auto: bool) -> Self {
        self.auto_padding = auto;
        self
    }

    /// Maximum height; the remaining text is dropped. Zero means unlimited.
    pub fn max_height(mut self, max_height: f64) -> Self {
        self.max_height = max_height;
        self
    }
}

/// Part of a multi-page cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BorderPosition {
    Start,
    Middle,
    End,
}

impl Document {
    /// Print a single-line cell.
    pub fn cell(&mut self, cell: Cell) -> Result<()> {
        self.guard(|doc| doc.cell_inner(&cell))
    }

    pub(crate) fn cell_inner(&mut self, cell: &Cell) -> Result<()> {
        let min_h = self.font_size * self.cell_height_ratio;
        let h = cell.h.max(min_h);
        self.check_page_break(h)?;
        let code = self.cell_code(cell)?;
        if !code.is_empty() {
            self.out_bytes(&code);
        }
        Ok(())
    }

    /// Content of a cell at the cursor, advancing the cursor.
    pub(crate) fn cell_code(&mut self, cell: &Cell) -> Result<Vec<u8>> {
        let k = self.k;
        let c = self.gs.c_margin;
        let h = cell.h.max(self.font_size * self.cell_height_ratio);
        let w = if cell.w <= 0.0 { self.remaining_width() } else { cell.w };
        let (x, y) = (self.x, self.y);
        let xk = if self.rtl { (x - w) * k } else { x * k };
        let mut pieces: Vec<Vec<u8>> = Vec::new();
        let mut prefix: Vec<ContentOp> = Vec::new();
        let mut suffix: Vec<ContentOp> = Vec::new();

        if cell.fill || cell.border == Border::Frame {
            let op = match (cell.fill, cell.border == Border::Frame) {
                (true, true) => PaintOp::FillStroke,
                (true, false) => PaintOp::Fill,
                _ => PaintOp::Stroke,
            };
            pieces.push(ContentOp::Rect(xk, (self.h - y) * k, w * k, -h * k, op).to_bytes());
        }
        if let Border::Sides(sides) = cell.border {
            let (top, bottom) = ((self.h - y) * k, (self.h - (y + h)) * k);
            let right = xk + w * k;
            if sides.contains(BorderSides::L) {
                pieces.push(ContentOp::Line(xk, top, xk, bottom).to_bytes());
            }
            if sides.contains(BorderSides::T) {
                pieces.push(ContentOp::Line(xk, top, right, top).to_bytes());
            }
            if sides.contains(BorderSides::R) {
                pieces.push(ContentOp::Line(right, top, right, bottom).to_bytes());
            }
            if sides.contains(BorderSides::B) {
                pieces.push(ContentOp::Line(xk, bottom, right, bottom).to_bytes());
            }
        }

        if !cell.text.is_empty() {
            let chars = encoding::code_points(&cell.text);
            let shaped = self.shaper.shape(&chars, self.tmprtl);
            let mut width = self.arr_width(&shaped);
            let mut align = cell.align;
            let ratio = if width > 0.0 { (w - 2.0 * c) / width } else { 1.0 };
            if cell.stretch.applies(ratio) {
                if cell.stretch.is_spacing() {
                    let gaps = chars.len().saturating_sub(1).max(1) as f64;
                    let spacing = (w - width - 2.0 * c) * k / gaps;
                    prefix.push(ContentOp::CharSpacing(spacing));
                    suffix.push(ContentOp::CharSpacing(0.0));
                } else {
                    prefix.push(ContentOp::HorizontalScaling(ratio * 100.0));
                    suffix.push(ContentOp::HorizontalScaling(100.0));
                }
                align = Align::Default;
                width = w - 2.0 * c;
            }

            let dx = match align {
                Align::Left | Align::Justify if self.rtl => w - width - c,
                Align::Right if !self.rtl => w - width - c,
                Align::Center => (w - width) / 2.0,
                _ => c,
            };
            let (unicode, up, ut) = {
                let font = self.font()?;
                (font.is_unicode(), font.up, font.ut)
            };
            let xdx = if self.rtl { x - dx - width } else { x + dx };
            let basefonty = y + h / 2.0 + self.font_size / 3.0;
            let ty = (self.h - basefonty) * k;
            let spaces = chars.iter().filter(|&&ch| ch == 32).count();
            let justify = align == Align::Justify && spaces > 0;

            if self.gs.color_flag {
                pieces.push(format!("q {}", self.gs.text_color.fill_op()).into_bytes());
            }
            let show = if justify && unicode {
                let glyphs: Vec<u32> = shaped.iter().copied().filter(|&ch| ch != 32).collect();
                let gap = (w - self.arr_width(&glyphs) - 2.0 * c) / spaces as f64;
                let adjustment = -1000.0 * gap * k / self.gs.font_size_pt;
                let mut items = Vec::new();
                for (n, word) in shaped.split(|&ch| ch == 32).enumerate() {
                    if n > 0 {
                        items.push(TextArrayItem::Adjustment(adjustment));
                    }
                    if !word.is_empty() {
                        items.push(TextArrayItem::Text(self.encode_text_shaped(word)?));
                    }
                }
                ContentOp::ShowTextArray { x: xdx * k, y: ty, items }
            } else {
                if justify {
                    let spacing = (w - width - 2.0 * c) / spaces as f64 * k;
                    prefix.push(ContentOp::WordSpacing(spacing));
                }
                if align == Align::Justify {
                    suffix.push(ContentOp::WordSpacing(0.0));
                }
                ContentOp::ShowText {
                    x: xdx * k,
                    y: ty,
                    text: self.encode_text(&chars)?,
                }
            };
            pieces.push(show.to_bytes());
            let fs_pt = self.gs.font_size_pt;
            if self.gs.underline {
                let uy = (self.h - (basefonty - up / 1000.0 * self.font_size)) * k;
                pieces.push(ContentOp::Rect(xdx * k, uy, width * k, -ut / 1000.0 * fs_pt, PaintOp::Fill).to_bytes());
            }
            if self.gs.linethrough {
                let ly = (self.h - (basefonty - self.font_size / 3.0)) * k;
                pieces.push(ContentOp::Rect(xdx * k, ly, width * k, -ut / 1000.0 * fs_pt, PaintOp::Fill).to_bytes());
            }
            if self.gs.color_flag {
                pieces.push(b"Q".to_vec());
            }
            if let Some(target) = &cell.link {
                let target = target.clone();
                let fs = self.font_size;
                self.link_inner(xdx, y + (h - fs) / 2.0, width, fs, target)?;
            }
        } else if cell.align == Align::Justify && matches!(self.font(), Ok(font) if !font.is_unicode()) {
            suffix.push(ContentOp::WordSpacing(0.0));
        }

        let mut code: Vec<u8> = Vec::new();
        for piece in prefix.iter().map(ContentOp::to_bytes).chain(pieces).chain(suffix.iter().map(ContentOp::to_bytes)) {
            if !code.is_empty() {
                code.push(b' ');
            }
            code.extend_from_slice(&piece);
        }

        self.gs.lasth = h;
        match cell.ln {
            LineBreak::Right => self.x += if self.rtl { -w } else { w },
            LineBreak::NextLine => {
                self.y += h;
                self.x = if self.rtl { self.w - self.gs.r_margin } else { self.gs.l_margin };
            },
            LineBreak::Below => self.y += h,
        }
        Ok(code)
    }

    /// Encode code points already in visual order.
    fn encode_text_shaped(&self, visual: &[u32]) -> Result<Vec<u8>> {
        let raw = if self.font()?.is_unicode() {
            encoding::utf16be(visual, false)
        } else {
            encoding::latin1(visual)
        };
        Ok(encoding::escape(&raw))
    }

    /// Edges of one part of a cell split across pages. With open cells the
    /// edges on the page break are left out.
    pub(crate) fn border_mode(&self, border: Border, pos: BorderPosition) -> Border {
        match border {
            Border::None => Border::None,
            Border::Frame if !self.open_cell => Border::Frame,
            Border::Frame => Border::Sides(match pos {
                BorderPosition::Start => BorderSides::L | BorderSides::T | BorderSides::R,
                BorderPosition::Middle => BorderSides::L | BorderSides::R,
                BorderPosition::End => BorderSides::L | BorderSides::R | BorderSides::B,
            }),
            Border::Sides(sides) => {
                let mut out = sides & (BorderSides::L | BorderSides::R);
                match pos {
                    BorderPosition::Start => {
                        out |= sides & BorderSides::T;
                        if !self.open_cell {
                            out |= sides & BorderSides::B;
                        }
                    },
                    BorderPosition::Middle => {
                        if !self.open_cell {
                            out |= sides & (BorderSides::T | BorderSides::B);
                        }
                    },
                    BorderPosition::End => {
                        out |= sides & BorderSides::B;
                        if !self.open_cell {
                            out |= sides & BorderSides::T;
                        }
                    },
                }
                Border::Sides(out)
            },
        }
    }

    /// Print text in a column, breaking lines at the column width. Returns
    /// the number of lines.
    pub fn multi_cell(&mut self, cell: MultiCell) -> Result<usize> {
        self.guard(|doc| doc.multi_cell_inner(&cell))
    }

    pub(crate) fn multi_cell_inner(&mut self, mc: &MultiCell) -> Result<usize> {
        if mc.reset_height || self.gs.lasth == 0.0 {
            self.gs.lasth = self.font_size * self.cell_height_ratio;
        }
        if let Some(y) = mc.y {
            self.set_y(y);
        }
        self.check_page_break(mc.h)?;
        let y = self.y;
        let start_page = self.page;
        let x = match mc.x {
            Some(x) => {
                self.set_x(x);
                x
            },
            None => self.get_x(),
        };
        let w = if mc.w <= 0.0 { self.remaining_width() } else { mc.w };

        let (l_margin, r_margin) = (self.gs.l_margin, self.gs.r_margin);
        if self.rtl {
            self.set_right_margin(self.w - self.x);
            self.set_left_margin(self.x - w);
        } else {
            self.set_left_margin(self.x);
            self.set_right_margin(self.w - self.x - w);
        }

        let start_y = self.y;
        let lw = self.gs.line_width;
        if mc.auto_padding {
            if self.gs.c_margin < lw / 2.0 {
                self.gs.c_margin = lw / 2.0;
            }
            if self.gs.lasth - self.font_size < lw {
                self.y += lw / 2.0;
            }
            self.y += self.gs.c_margin;
        }

        let lines = if mc.html {
            let align = mc.align;
            self.write_html_inner(&mc.text, true, mc.fill, mc.reset_height, true, align)?;
            1
        } else {
            let lasth = self.gs.lasth;
            let mut flow = super::TextFlow::new(lasth, mc.text.clone())
                .fill(mc.fill)
                .align(mc.align)
                .ln(true)
                .stretch(mc.stretch)
                .max_height(mc.max_height);
            flow.first_block = true;
            self.write_inner(&flow)?.lines
        };

        if mc.auto_padding {
            self.y += self.gs.c_margin;
            if self.gs.lasth - self.font_size < lw {
                self.y += lw / 2.0;
            }
        }

        let current_y = self.y;
        let end_page = self.page;
        if end_page > start_page {
            for page in start_page..=end_page {
                self.set_page(page);
                let (cell_h, pos) = if page == start_page {
                    self.y = start_y;
                    (self.h - start_y - self.b_margin, BorderPosition::Start)
                } else if page == end_page {
                    self.y = self.t_margin;
                    (current_y - self.t_margin, BorderPosition::End)
                } else {
                    self.y = self.t_margin;
                    (self.h - self.t_margin - self.b_margin, BorderPosition::Middle)
                };
                let mut nx = x;
                if page > start_page {
                    let first = &self.pages[start_page - 1];
                    let this = &self.pages[page - 1];
                    if self.rtl && this.orm != first.orm {
                        nx = x + (this.orm - first.orm);
                    } else if !self.rtl && this.olm != first.olm {
                        nx = x + (this.olm - first.olm);
                    }
                }
                self.set_x(nx);
                let border = self.border_mode(mc.border, pos);
                let frame = Cell::new(w, cell_h).border(border).ln(LineBreak::NextLine).fill(mc.fill);
                let code = self.cell_code(&frame)?;
                if border != Border::None || mc.fill {
                    self.splice_under(Mark::Insertion, &code);
                }
            }
        } else {
            let cell_h = mc.h.max(current_y - y);
            self.set_y(y);
            self.set_x(x);
            let frame = Cell::new(w, cell_h).border(mc.border).ln(LineBreak::NextLine).fill(mc.fill);
            let code = self.cell_code(&frame)?;
            if mc.border != Border::None || mc.fill {
                let mark = match self.pages.get(self.page - 1) {
                    Some(p) if p.buffer.mark(Mark::Transform).is_some() => Mark::Transform,
                    _ if self.in_footer => Mark::Footer,
                    _ => Mark::Insertion,
                };
                self.splice_under(mark, &code);
            }
        }

        let current_y = self.y;
        self.set_left_margin(l_margin);
        self.set_right_margin(r_margin);

        match mc.ln {
            LineBreak::Right => {
                self.set_page(start_page);
                self.y = y;
                self.set_x(x + w);
            },
            LineBreak::NextLine => self.set_y(current_y),
            LineBreak::Below => {
                self.set_y(current_y);
                self.set_x(x + w);
            },
        }
        Ok(lines)
    }

    /// Insert content at a page mark so it is painted below the text
    /// written after the mark.
    fn splice_under(&mut self, mark: Mark, code: &[u8]) {
        let Some(page) = self.page.checked_sub(1).and_then(|i| self.pages.get_mut(i)) else {
            return;
        };
        let mut bytes = code.to_vec();
        bytes.push(b'\n');
        if page.buffer.splice_at(mark, &bytes).is_none() {
            page.buffer.append(&bytes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{content, test_doc};
    use super::*;
    use crate::writer::{Color, FontDefinition, FontDescriptor, FontKind, StandardFontCatalog};

    fn doc_with_font() -> Document {
        let mut doc = test_doc();
        doc.add_page().unwrap();
        doc.set_font("helvetica", "", 12.0).unwrap();
        doc
    }

    #[test]
    fn test_border_parsing() {
        assert_eq!("0".parse::<Border>().unwrap(), Border::None);
        assert_eq!("1".parse::<Border>().unwrap(), Border::Frame);
        assert_eq!("lb".parse::<Border>().unwrap(), Border::Sides(BorderSides::L | BorderSides::B));
        assert!("X".parse::<Border>().is_err());
    }

    #[test]
    fn test_framed_cell_with_text() {
        let mut doc = doc_with_font();
        doc.set_text_color(Color::Rgb(200, 200, 200)).unwrap();
        doc.cell(Cell::new(40.0, 10.0).text("Hello World!").border(Border::Frame)).unwrap();
        let page = content(&doc, 1);
        let k = doc.scale_factor();
        let (l, t, _) = doc.margins();
        let top = (doc.page_height() - t) * k;
        assert!(page.contains(&format!("{:.2} {:.2} {:.2} {:.2} re S", l * k, top, 40.0 * k, -10.0 * k)));
        assert!(page.contains("(Hello World!) Tj ET"));
        assert!(!page.contains("q 0.000 g"));
        assert!((doc.get_x() - (doc.margins().0 + 40.0)).abs() < 1e-9);
    }

    #[test]
    fn test_cell_height_grows_to_font() {
        let mut doc = doc_with_font();
        let y = doc.get_y();
        doc.cell(Cell::new(10.0, 1.0).ln(LineBreak::NextLine)).unwrap();
        let min = doc.font_size() * doc.cell_height_ratio();
        assert!((doc.get_y() - (y + min)).abs() < 1e-9);
        assert!((doc.last_h() - min).abs() < 1e-9);
    }

    #[test]
    fn test_colored_text_is_wrapped_in_state() {
        let mut doc = doc_with_font();
        doc.cell(Cell::new(40.0, 10.0).text("x")).unwrap();
        assert!(content(&doc, 1).contains("q 0.000 0.000 0.000 rg BT"));
    }

    #[test]
    fn test_center_alignment_offset() {
        let mut doc = doc_with_font();
        let width = doc.get_string_width("ab");
        doc.cell(Cell::new(50.0, 10.0).text("ab").align(Align::Center)).unwrap();
        let k = doc.scale_factor();
        let expected = format!("BT {:.2} ", (doc.margins().0 + (50.0 - width) / 2.0) * k);
        assert!(content(&doc, 1).contains(&expected));
    }

    #[test]
    fn test_justified_single_byte_uses_word_spacing() {
        let mut doc = doc_with_font();
        doc.cell(Cell::new(100.0, 10.0).text("a b c").align(Align::Justify)).unwrap();
        let page = content(&doc, 1);
        let tw = page.find(" Tw ET").unwrap();
        let tj = page.find("(a b c) Tj").unwrap();
        assert!(tw < tj);
        assert!(page.contains("BT 0.000 Tw ET"));
    }

    #[test]
    fn test_justified_cell_without_spaces_still_resets_spacing() {
        let mut doc = doc_with_font();
        doc.cell(Cell::new(100.0, 10.0).text("abc").align(Align::Justify)).unwrap();
        let page = content(&doc, 1);
        let line = page.lines().find(|l| l.contains("(abc) Tj")).unwrap();
        assert_eq!(line.matches(" Tw ET").count(), 1);
        assert!(line.ends_with("BT 0.000 Tw ET"));
    }

    /// A Unicode TrueType font where every glyph is 500 wide and the space 250.
    fn even_unicode_catalog() -> StandardFontCatalog {
        let mut catalog = StandardFontCatalog::new();
        catalog.insert(
            "evensans",
            "",
            FontDefinition {
                name: "EvenSans".to_string(),
                kind: FontKind::TrueTypeUnicode {
                    cid_to_gid: Vec::new(),
                    compressed: false,
                },
                desc: FontDescriptor {
                    ascent: 900.0,
                    descent: -200.0,
                    missing_width: Some(500.0),
                    ..FontDescriptor::default()
                },
                up: -100.0,
                ut: 50.0,
                cw: (32..127).map(|c| (c, if c == 32 { 250 } else { 500 })).collect(),
                enc: None,
                diff: None,
                program: None,
            },
        );
        catalog
    }

    #[test]
    fn test_unicode_justification_fills_the_cell() {
        let mut doc = test_doc();
        doc.set_font_catalog(Box::new(even_unicode_catalog()));
        doc.add_page().unwrap();
        doc.set_font("evensans", "", 10.0).unwrap();
        doc.cell(Cell::new(50.0, 10.0).text("ab cd ef").align(Align::Justify)).unwrap();

        let page = content(&doc, 1);
        assert!(page.contains("] TJ ET"));
        assert!(!page.contains(" Tw ET"));
        let shift = regex::Regex::new(r"\) (-?\d+\.\d+) \(").unwrap();
        let adjustments: Vec<f64> = shift.captures_iter(&page).map(|c| c[1].parse().unwrap()).collect();
        assert_eq!(adjustments.len(), 2);
        assert!(adjustments.iter().all(|a| *a < 0.0));

        // Six glyphs of 500 at 10pt, plus the two shifts, span the cell less its padding
        let k = doc.scale_factor();
        let available = (50.0 - 2.0 * doc.cell_padding()) * k;
        let glyphs = 6.0 * 500.0 / 1000.0 * 10.0;
        let shifts: f64 = adjustments.iter().map(|a| -a / 1000.0 * 10.0).sum();
        assert!((glyphs + shifts - available).abs() < 0.01);
    }

    #[test]
    fn test_stretch_scaling_resets() {
        let mut doc = doc_with_font();
        doc.cell(Cell::new(5.0, 10.0).text("much too wide").stretch(Stretch::ScaleIfNeeded)).unwrap();
        let page = content(&doc, 1);
        assert!(page.contains(" Tz ET"));
        assert!(page.contains("BT 100.00 Tz ET"));
    }

    #[test]
    fn test_underline_rectangle() {
        let mut doc = doc_with_font();
        doc.set_font("helvetica", "U", 12.0).unwrap();
        doc.cell(Cell::new(40.0, 10.0).text("under")).unwrap();
        assert!(content(&doc, 1).contains(" re f"));
    }

    #[test]
    fn test_cell_link_rectangle() {
        let mut doc = doc_with_font();
        doc.cell(Cell::new(40.0, 10.0).text("site").link("https://example.com")).unwrap();
        let links = doc.page_links(1).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target, LinkTarget::Url("https://example.com".into()));
    }

    #[test]
    fn test_border_mode_open_cell() {
        let doc = test_doc();
        let frame = Border::Frame;
        assert_eq!(
            doc.border_mode(frame, BorderPosition::Start),
            Border::Sides(BorderSides::L | BorderSides::T | BorderSides::R)
        );
        assert_eq!(doc.border_mode(frame, BorderPosition::Middle), Border::Sides(BorderSides::L | BorderSides::R));
        let sides = Border::Sides(BorderSides::all());
        assert_eq!(
            doc.border_mode(sides, BorderPosition::End),
            Border::Sides(BorderSides::L | BorderSides::R | BorderSides::B)
        );
    }

    #[test]
    fn test_border_mode_closed_cell() {
        let mut doc = test_doc();
        doc.set_open_cell(false);
        assert_eq!(doc.border_mode(Border::Frame, BorderPosition::Middle), Border::Frame);
        assert_eq!(
            doc.border_mode(Border::Sides(BorderSides::all()), BorderPosition::Middle),
            Border::Sides(BorderSides::all())
        );
    }

    #[test]
    fn test_multi_cell_border_below_text() {
        let mut doc = doc_with_font();
        let lines = doc
            .multi_cell(MultiCell::new(60.0, 5.0, "some words that wrap across a few lines of the column").border(Border::Frame))
            .unwrap();
        assert!(lines >= 2);
        let page = content(&doc, 1);
        let rect = page.find(" re S").unwrap();
        let text = page.find(") Tj").unwrap();
        assert!(rect < text);
    }

    #[test]
    fn test_multi_cell_restores_margins_and_moves_down() {
        let mut doc = doc_with_font();
        let margins = doc.margins();
        let y = doc.get_y();
        doc.multi_cell(MultiCell::new(60.0, 5.0, "short")).unwrap();
        assert_eq!(doc.margins(), margins);
        assert!(doc.get_y() > y);
        assert_eq!(doc.get_x(), margins.0);
    }

    #[test]
    fn test_multi_cell_right_returns_to_top() {
        let mut doc = doc_with_font();
        let (x, y) = (doc.get_x(), doc.get_y());
        doc.multi_cell(MultiCell::new(60.0, 5.0, "short").ln(LineBreak::Right)).unwrap();
        assert_eq!(doc.get_y(), y);
        assert!((doc.get_x() - (x + 60.0)).abs() < 1e-9);
    }

    #[test]
    fn test_multi_cell_below_moves_past_the_column() {
        let mut doc = doc_with_font();
        let (x, y) = (doc.get_x(), doc.get_y());
        doc.multi_cell(MultiCell::new(60.0, 5.0, "short").ln(LineBreak::Below)).unwrap();
        assert!(doc.get_y() > y);
        assert!((doc.get_x() - (x + 60.0)).abs() < 1e-9);
    }
}
