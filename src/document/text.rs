//! Flowing text with word wrapping.

use super::cell::{Align, Cell, LineBreak, Stretch};
use super::Document;
use crate::error::Result;
use crate::writer::{encoding, LinkTarget};
use log::trace;

const NEWLINE: u32 = 10;
const NBSP: u32 = 160;
const SOFT_HYPHEN: u32 = 173;
const HYPHEN: u32 = 45;

/// Parameters of a [`Document::write_flow`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFlow {
    pub(crate) h: f64,
    pub(crate) text: String,
    pub(crate) link: Option<LinkTarget>,
    pub(crate) fill: bool,
    pub(crate) align: Align,
    pub(crate) ln: bool,
    pub(crate) stretch: Stretch,
    pub(crate) first_line: bool,
    pub(crate) first_block: bool,
    pub(crate) max_height: f64,
}

impl TextFlow {
    /// Flow `text` in lines of height `h`.
    pub fn new(h: f64, text: impl Into<String>) -> Self {
        Self {
            h,
            text: text.into(),
            link: None,
            fill: false,
            align: Align::Default,
            ln: false,
            stretch: Stretch::None,
            first_line: false,
            first_block: false,
            max_height: 0.0,
        }
    }

    /// Make every line a link.
    pub fn link(mut self, target: impl Into<LinkTarget>) -> Self {
        self.link = Some(target.into());
        self
    }

    /// Paint line backgrounds with the fill color.
    pub fn fill(mut self, fill: bool) -> Self {
        self.fill = fill;
        self
    }

    /// Line alignment. Lines ending at an explicit newline are never justified.
    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    /// Move to the next line after the last one.
    pub fn ln(mut self, ln: bool) -> Self {
        self.ln = ln;
        self
    }

    /// Font stretching applied to every line.
    pub fn stretch(mut self, stretch: Stretch) -> Self {
        self.stretch = stretch;
        self
    }

    /// Print only the first line and return the rest.
    pub fn first_line(mut self, first_line: bool) -> Self {
        self.first_line = first_line;
        self
    }

    /// The text starts a block, so trailing spaces of right-to-left lines
    /// are dropped.
    pub fn first_block(mut self, first_block: bool) -> Self {
        self.first_block = first_block;
        self
    }

    /// Stop after the line that reaches this height below the start.
    /// Zero means unlimited.
    pub fn max_height(mut self, max_height: f64) -> Self {
        self.max_height = max_height;
        self
    }
}

/// Result of a flowed write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteOutcome {
    /// Number of lines printed
    pub lines: usize,
    /// Text left over in first-line mode
    pub remainder: Option<String>,
}

fn is_break_space(c: u32) -> bool {
    c != NBSP && char::from_u32(c).is_some_and(char::is_whitespace)
}

/// ASCII whitespace that, alone, only moves the cursor.
fn is_isolated_space(c: u32) -> bool {
    matches!(c, 0x09..=0x0D | 0x20)
}

/// Text of a printed line without soft hyphens.
fn visible(chars: &[u32]) -> String {
    encoding::from_code_points(chars).replace('\u{ad}', "")
}

impl Document {
    /// Print text from the cursor, wrapping at the right margin and
    /// continuing on the next lines from the left margin. Returns the number
    /// of lines printed.
    pub fn write(&mut self, h: f64, text: &str) -> Result<usize> {
        let flow = TextFlow::new(h, text);
        self.guard(|doc| doc.write_inner(&flow)).map(|o| o.lines)
    }

    /// Print only the first line of `text` and return what did not fit.
    ///
    /// When the line breaks, the cursor is put back where it was, so the
    /// caller decides where the rest continues. [`Document::end_line_x`]
    /// gives the end of the printed line.
    pub fn write_first_line(&mut self, h: f64, text: &str) -> Result<String> {
        let flow = TextFlow::new(h, text).first_line(true);
        self.guard(|doc| doc.write_inner(&flow))
            .map(|o| o.remainder.unwrap_or_default())
    }

    /// Print text with every flow option.
    pub fn write_flow(&mut self, flow: &TextFlow) -> Result<WriteOutcome> {
        self.guard(|doc| doc.write_inner(flow))
    }

    /// Abscissa where the last first-line write ended.
    pub fn end_line_x(&self) -> f64 {
        self.endlinex
    }

    fn flow_cell(flow: &TextFlow, w: f64, text: String, ln: LineBreak, align: Align) -> Cell {
        Cell {
            w,
            h: flow.h,
            text,
            border: super::cell::Border::None,
            ln,
            align,
            fill: flow.fill,
            link: flow.link.clone(),
            stretch: flow.stretch,
        }
    }

    /// Measure a first-line segment and switch the padding off for it.
    /// Returns the cell width and the padding to restore.
    fn begin_first_line(&mut self, seg: &[u32], extra: f64, max_height: f64) -> (f64, f64) {
        let startx = self.x;
        let linew = self.arr_width(&self.shaper.shape(seg, self.tmprtl));
        self.endlinex = if self.rtl {
            startx - linew - extra
        } else {
            startx + linew + extra
        };
        let saved = self.gs.c_margin;
        if max_height == 0.0 {
            self.gs.c_margin = 0.0;
        }
        (linew + extra, saved)
    }

    fn finish_first_line(
        &mut self,
        saved_padding: f64,
        rest: &[u32],
        flow: &TextFlow,
        prev: (f64, f64, usize),
        lines: usize,
    ) -> WriteOutcome {
        self.gs.c_margin = saved_padding;
        let remainder = encoding::from_code_points(rest);
        if remainder.is_empty() {
            return WriteOutcome { lines, remainder: None };
        }
        let (x, y, page) = prev;
        if flow.first_line && !flow.ln && self.page == page {
            self.x = x;
            self.y = y;
        }
        WriteOutcome {
            lines,
            remainder: Some(remainder),
        }
    }

    pub(crate) fn write_inner(&mut self, flow: &TextFlow) -> Result<WriteOutcome> {
        let text = flow.text.replace('\r', "");
        if text.is_empty() {
            return Ok(WriteOutcome::default());
        }
        self.font()?;
        let chars = encoding::code_points(&text);
        let nb = chars.len();
        if nb == 1 && is_isolated_space(chars[0]) {
            let sw = self.get_string_width(&text);
            self.x += if self.rtl { -sw } else { sw };
            return Ok(WriteOutcome::default());
        }

        let h = flow.h;
        let rtl_dir = self.rtl || self.tmprtl;
        let chrwidth = self.char_width('.' as u32);
        let hyphen_width = self.char_width(HYPHEN);
        let prev = (self.x, self.y, self.page);
        let maxy = self.y + flow.max_height - h - 2.0 * self.gs.c_margin;
        let mut first_line = flow.first_line;
        let mut w = self.remaining_width();
        let mut wmax = w - 2.0 * self.gs.c_margin;
        if chrwidth > wmax || self.char_width(chars[0]) > wmax {
            trace!("column narrower than one character, splitting per character");
        }

        let mut i = 0;
        let mut j = 0;
        let mut sep: Option<usize> = None;
        let mut shy = false;
        let mut shy_width = 0.0;
        let mut shy_char = "";
        let mut l = 0.0;
        let mut nl = 0;
        let mut linebreak = false;
        let mut pc = 0;

        while i < nb {
            if flow.max_height > 0.0 && self.y >= maxy {
                first_line = true;
            }
            let c = chars[i];
            if c == NEWLINE {
                let align = flow.align.unjustified(self.rtl);
                let seg = &chars[j..i];
                let mut padding = self.gs.c_margin;
                if first_line {
                    (w, padding) = self.begin_first_line(seg, 0.0, flow.max_height);
                }
                let mut line = visible(seg);
                if flow.first_block && rtl_dir {
                    line.truncate(line.trim_end().len());
                }
                self.cell_inner(&Self::flow_cell(flow, w, line, LineBreak::NextLine, align))?;
                if first_line {
                    return Ok(self.finish_first_line(padding, &chars[i + 1..], flow, prev, nl + 1));
                }
                nl += 1;
                j = i + 1;
                l = 0.0;
                sep = None;
                shy = false;
                if self.y + self.gs.lasth > self.page_break_trigger && !self.in_footer {
                    self.accept_page_break();
                }
                w = self.remaining_width();
                wmax = w - 2.0 * self.gs.c_margin;
            } else {
                if is_break_space(c) || c == SOFT_HYPHEN {
                    sep = Some(i);
                    shy = c == SOFT_HYPHEN;
                    if shy {
                        (shy_width, shy_char) = if pc == HYPHEN { (0.0, "") } else { (hyphen_width, "-") };
                    }
                }
                if c != SOFT_HYPHEN {
                    l += self.char_width(c);
                }
                if l > wmax || (c == SOFT_HYPHEN && l + shy_width > wmax) {
                    match sep {
                        None => {
                            let started = if self.rtl {
                                self.x <= self.w - self.gs.r_margin - chrwidth
                            } else {
                                self.x >= self.gs.l_margin + chrwidth
                            };
                            if started {
                                self.cell_inner(&Cell::new(w, h).ln(LineBreak::NextLine))?;
                                linebreak = true;
                                if first_line {
                                    let padding = self.gs.c_margin;
                                    return Ok(self.finish_first_line(padding, &chars[j..], flow, prev, nl));
                                }
                            } else {
                                // The word is wider than the column. Split it, keeping
                                // at least one character per line.
                                let end = if i == j { i + 1 } else { i };
                                let seg = &chars[j..end];
                                let mut padding = self.gs.c_margin;
                                if first_line {
                                    (w, padding) = self.begin_first_line(seg, 0.0, flow.max_height);
                                }
                                let line = visible(seg);
                                self.cell_inner(&Self::flow_cell(flow, w, line, LineBreak::NextLine, flow.align))?;
                                if first_line {
                                    return Ok(self.finish_first_line(padding, &chars[end..], flow, prev, nl + 1));
                                }
                                if i == j {
                                    j = i + 1;
                                } else {
                                    j = i;
                                    i -= 1;
                                }
                            }
                        },
                        Some(s) => {
                            let endspace = usize::from(self.rtl && !flow.first_block && s < i);
                            let (left, right, extra) = match (shy, self.rtl) {
                                (false, _) => ("", "", 0.0),
                                (true, true) => (shy_char, "", shy_width),
                                (true, false) => ("", shy_char, shy_width),
                            };
                            let seg = &chars[j..s + endspace];
                            let mut padding = self.gs.c_margin;
                            if first_line {
                                (w, padding) = self.begin_first_line(seg, extra, flow.max_height);
                            }
                            let mut line = format!("{}{}{}", left, visible(seg), right);
                            if flow.first_block && rtl_dir {
                                line.truncate(line.trim_end().len());
                            }
                            self.cell_inner(&Self::flow_cell(flow, w, line, LineBreak::NextLine, flow.align))?;
                            if first_line {
                                return Ok(self.finish_first_line(padding, &chars[s + endspace..], flow, prev, nl + 1));
                            }
                            i = s;
                            sep = None;
                            shy = false;
                            j = i + 1;
                        },
                    }
                    if self.y + self.gs.lasth > self.page_break_trigger && !self.in_footer {
                        self.accept_page_break();
                    }
                    w = self.remaining_width();
                    wmax = w - 2.0 * self.gs.c_margin;
                    if linebreak {
                        linebreak = false;
                    } else {
                        nl += 1;
                        l = 0.0;
                    }
                }
            }
            pc = c;
            i += 1;
        }

        if l > 0.0 {
            let padded = l + 2.0 * self.gs.c_margin;
            w = match flow.align {
                Align::Justify | Align::Center => w,
                Align::Left if self.rtl => w,
                Align::Left => padded,
                Align::Right if self.rtl => padded,
                Align::Right => w,
                Align::Default => padded,
            };
            let seg = &chars[j..];
            let mut padding = self.gs.c_margin;
            if first_line {
                (w, padding) = self.begin_first_line(seg, 0.0, flow.max_height);
            }
            let mut line = visible(seg);
            if flow.first_block && rtl_dir {
                line.truncate(line.trim_end().len());
            }
            let ln = if flow.ln { LineBreak::NextLine } else { LineBreak::Right };
            self.cell_inner(&Self::flow_cell(flow, w, line, ln, flow.align))?;
            if first_line {
                return Ok(self.finish_first_line(padding, &[], flow, prev, nl + 1));
            }
            nl += 1;
        }
        Ok(WriteOutcome { lines: nl, remainder: None })
    }
}

#[cfg(test)]
mod tests {
    use super::super::cell::{Border, MultiCell};
    use super::super::tests::{content, test_doc};
    use super::*;

    fn doc_with_font() -> Document {
        let mut doc = test_doc();
        doc.add_page().unwrap();
        doc.set_font("helvetica", "", 12.0).unwrap();
        doc
    }

    /// Word spacing set at the start of a content line.
    fn word_spacing(line: &str) -> f64 {
        line.strip_prefix("BT ")
            .and_then(|rest| rest.split_once(" Tw ET"))
            .and_then(|(value, _)| value.parse().ok())
            .unwrap_or(0.0)
    }

    #[test]
    fn test_short_text_is_one_line() {
        let mut doc = doc_with_font();
        let x = doc.get_x();
        assert_eq!(doc.write(5.0, "Hello").unwrap(), 1);
        assert!(doc.get_x() > x);
        assert!(content(&doc, 1).contains("(Hello) Tj"));
    }

    #[test]
    fn test_explicit_newlines_count_lines() {
        let mut doc = doc_with_font();
        let y = doc.get_y();
        assert_eq!(doc.write(6.0, "one\ntwo\nthree").unwrap(), 3);
        assert!((doc.get_y() - (y + 12.0)).abs() < 1e-9);
    }

    #[test]
    fn test_wrap_breaks_at_spaces() {
        let mut doc = doc_with_font();
        let text = "lorem ipsum dolor sit amet ".repeat(20);
        let lines = doc.write(5.0, &text).unwrap();
        assert!(lines > 1);
        let page = content(&doc, 1);
        let shown: Vec<&str> = page.lines().filter(|l| l.contains(") Tj")).collect();
        assert_eq!(shown.len(), lines);
        // Wrapped lines end on a word boundary
        for line in &shown[..shown.len() - 1] {
            assert!(line.contains("amet)") || line.contains("sit)") || line.contains("dolor)")
                || line.contains("ipsum)") || line.contains("lorem)"));
        }
    }

    #[test]
    fn test_long_word_is_split() {
        let mut doc = doc_with_font();
        doc.set_margins(10.0, 10.0, Some(180.0));
        doc.set_x(10.0);
        let lines = doc.write(5.0, &"W".repeat(30)).unwrap();
        assert!(lines >= 2);
    }

    #[test]
    fn test_first_line_returns_remainder_and_restores_cursor() {
        let mut doc = doc_with_font();
        let (x, y) = (doc.get_x(), doc.get_y());
        let text = "word ".repeat(60);
        let rest = doc.write_first_line(5.0, &text).unwrap();
        assert!(!rest.is_empty());
        assert!(rest.len() < text.len());
        assert_eq!((doc.get_x(), doc.get_y()), (x, y));
        assert!(doc.end_line_x() > x);
    }

    #[test]
    fn test_first_line_advances_when_text_fits() {
        let mut doc = doc_with_font();
        let x = doc.get_x();
        let rest = doc.write_first_line(5.0, "fits").unwrap();
        assert!(rest.is_empty());
        let width = doc.get_string_width("fits");
        assert!((doc.get_x() - (x + width)).abs() < 1e-9);
    }

    #[test]
    fn test_soft_hyphen_is_hidden_unless_breaking() {
        let mut doc = doc_with_font();
        doc.write(5.0, "co\u{ad}operate").unwrap();
        assert!(content(&doc, 1).contains("(cooperate) Tj"));
    }

    #[test]
    fn test_single_space_moves_cursor() {
        let mut doc = doc_with_font();
        let x = doc.get_x();
        doc.write(5.0, " ").unwrap();
        assert!((doc.get_x() - x - doc.get_string_width(" ")).abs() < 1e-9);
    }

    #[test]
    fn test_single_tab_only_moves_cursor() {
        let mut doc = doc_with_font();
        let x = doc.get_x();
        assert_eq!(doc.write(5.0, "\t").unwrap(), 0);
        assert!(!content(&doc, 1).contains(" Tj"));
        assert!((doc.get_x() - x - doc.get_string_width("\t")).abs() < 1e-9);
    }

    #[test]
    fn test_character_wider_than_column_is_split_not_dropped() {
        let mut doc = doc_with_font();
        let lines = doc
            .multi_cell(MultiCell::new(3.0, 5.0, "W").border(Border::Frame))
            .unwrap();
        assert_eq!(lines, 1);
        assert!(content(&doc, 1).contains("(W) Tj"));

        let lines = doc.multi_cell(MultiCell::new(3.0, 5.0, "WWW")).unwrap();
        assert_eq!(lines, 3);
        assert_eq!(content(&doc, 1).matches("(W) Tj").count(), 4);
    }

    #[test]
    fn test_last_line_keeps_justification() {
        let mut doc = doc_with_font();
        doc.multi_cell(MultiCell::new(60.0, 5.0, "a b")).unwrap();
        let page = content(&doc, 1);
        let line = page.lines().find(|l| l.contains("(a b) Tj")).unwrap();
        assert!(word_spacing(line) > 0.0);
        assert!(line.ends_with("BT 0.000 Tw ET"));
    }

    #[test]
    fn test_line_ended_by_newline_is_not_justified() {
        let mut doc = doc_with_font();
        doc.multi_cell(MultiCell::new(60.0, 5.0, "a b\nc d")).unwrap();
        let page = content(&doc, 1);
        let first = page.lines().find(|l| l.contains("(a b) Tj")).unwrap();
        assert!(!first.contains("Tw"));
        let last = page.lines().find(|l| l.contains("(c d) Tj")).unwrap();
        assert!(word_spacing(last) > 0.0);
    }

    #[test]
    fn test_write_requires_font() {
        let mut doc = test_doc();
        doc.add_page().unwrap();
        assert!(doc.write(5.0, "x").is_err());
    }

    #[test]
    fn test_max_height_switches_to_first_line() {
        let mut doc = doc_with_font();
        let text = "text ".repeat(200);
        let outcome = doc
            .write_flow(&TextFlow::new(5.0, text).max_height(12.0))
            .unwrap();
        assert!(outcome.remainder.is_some());
        assert!(outcome.lines <= 3);
    }
}
