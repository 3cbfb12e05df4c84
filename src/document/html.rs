//! Basic HTML rendering.
//!
//! Markup is parsed into a flat list of [`DomNode`]s, each carrying its
//! resolved [`NodeStyle`]. Text nodes are then printed one line fragment at
//! a time with first-line writes, so fragments in different styles share a
//! line. Centered and right-aligned lines are shifted once they are
//! complete.
//!
//! Supported tags: `b`, `strong`, `i`, `em`, `u`, `del`, `s`, `strike`,
//! `font` (`face`, `size`, `color`), `span`, `a` (`href`), `h1` to `h6`,
//! `p`, `div`, `br`, and the `align` attribute or `text-align` style on
//! blocks.

use super::cell::{Align, Border, LineBreak, MultiCell};
use super::text::TextFlow;
use super::Document;
use crate::error::{Error, Result};
use crate::writer::{Color, LinkTarget, Mark};
use lazy_static::lazy_static;
use log::{trace, warn};
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    /// Opening or closing tag with its raw attribute text
    static ref TAG_RE: Regex = Regex::new(r"<(/?)([a-zA-Z][a-zA-Z0-9]*)([^>]*)>").unwrap();
    /// `name="value"`, `name='value'` or `name=value`
    static ref ATTR_RE: Regex =
        Regex::new(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).unwrap();
    static ref ENTITY_RE: Regex = Regex::new(r"&(#[0-9]+|#x[0-9a-fA-F]+|[a-zA-Z]+);").unwrap();
    static ref SPACE_RE: Regex = Regex::new(r"\s+").unwrap();
}

/// Link color used when an `a` element sets none.
const LINK_COLOR: Color = Color::Rgb(0, 0, 255);

const VOID_TAGS: &[&str] = &["br", "hr", "img"];
const BLOCK_TAGS: &[&str] = &["p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote"];

/// Resolved style of a node, inherited from its ancestors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeStyle {
    /// Font family, `None` for the document font
    pub family: Option<String>,
    /// Bold
    pub bold: bool,
    /// Italic
    pub italic: bool,
    /// Underline
    pub underline: bool,
    /// Line-through
    pub linethrough: bool,
    /// Absolute size in points
    pub size: Option<f64>,
    /// Relative size change in points
    pub size_delta: f64,
    /// Heading level
    pub heading: Option<u8>,
    /// Text color
    pub color: Option<Color>,
    /// Block alignment
    pub align: Option<Align>,
    /// Link target of an enclosing `a`
    pub href: Option<String>,
}

impl NodeStyle {
    /// Style letters for [`Document::set_font`].
    pub fn font_style(&self) -> String {
        let mut s = String::new();
        let bold = self.bold || self.heading.is_some();
        for (on, letter) in [
            (bold, 'B'),
            (self.italic, 'I'),
            (self.underline || self.href.is_some(), 'U'),
            (self.linethrough, 'D'),
        ] {
            if on {
                s.push(letter);
            }
        }
        s
    }

    /// Size in points relative to the base size of the document.
    pub fn font_size(&self, base: f64) -> f64 {
        let size = match (self.size, self.heading) {
            (Some(size), _) => size,
            (None, Some(level)) => base + (4.0 - level as f64) * 2.0,
            (None, None) => base,
        };
        (size + self.size_delta).max(1.0)
    }
}

/// One parsed markup token.
#[derive(Debug, Clone, PartialEq)]
pub struct DomNode {
    /// Tag node, otherwise text
    pub is_tag: bool,
    /// Lowercase tag name, or decoded text
    pub value: String,
    /// Opening tag
    pub opening: bool,
    /// Attributes with lowercase names
    pub attributes: HashMap<String, String>,
    /// Style in effect for the node
    pub style: NodeStyle,
    /// Index of the enclosing element
    pub parent: Option<usize>,
}

/// Turns markup into nodes.
pub trait HtmlParser {
    /// Parse `html` into a flat node list.
    fn parse(&self, html: &str) -> Result<Vec<DomNode>>;
}

/// Regex based parser for the supported tag subset.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleHtmlParser;

impl SimpleHtmlParser {
    /// Create a parser.
    pub fn new() -> Self {
        Self
    }
}

fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            let decoded = if let Some(hex) = name.strip_prefix("#x") {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match name {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some('\u{a0}'),
                    "shy" => Some('\u{ad}'),
                    "copy" => Some('©'),
                    "reg" => Some('®'),
                    "euro" => Some('€'),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

fn parse_align(value: &str) -> Option<Align> {
    match value.trim().to_lowercase().as_str() {
        "left" => Some(Align::Left),
        "center" => Some(Align::Center),
        "right" => Some(Align::Right),
        "justify" => Some(Align::Justify),
        _ => None,
    }
}

fn parse_color(value: &str) -> Option<Color> {
    let value = value.trim();
    Color::from_hex(value).or_else(|| match value.to_lowercase().as_str() {
        "black" => Some(Color::Rgb(0, 0, 0)),
        "white" => Some(Color::Rgb(255, 255, 255)),
        "red" => Some(Color::Rgb(255, 0, 0)),
        "green" => Some(Color::Rgb(0, 128, 0)),
        "blue" => Some(Color::Rgb(0, 0, 255)),
        "gray" | "grey" => Some(Color::Rgb(128, 128, 128)),
        _ => None,
    })
}

/// Apply one element's tag and attributes on top of the inherited style.
fn element_style(tag: &str, attrs: &HashMap<String, String>, parent: &NodeStyle) -> NodeStyle {
    let mut style = parent.clone();
    match tag {
        "b" | "strong" => style.bold = true,
        "i" | "em" => style.italic = true,
        "u" => style.underline = true,
        "del" | "s" | "strike" => style.linethrough = true,
        "a" => style.href = attrs.get("href").cloned(),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            style.heading = tag[1..].parse().ok();
            style.size = None;
            style.size_delta = 0.0;
        },
        "font" => {
            if let Some(face) = attrs.get("face") {
                style.family = Some(face.to_lowercase());
            }
            if let Some(size) = attrs.get("size") {
                let size = size.trim();
                if let Some(delta) = size.strip_prefix('+').and_then(|s| s.parse::<f64>().ok()) {
                    style.size_delta += delta;
                } else if let Some(delta) = size.strip_prefix('-').and_then(|s| s.parse::<f64>().ok()) {
                    style.size_delta -= delta;
                } else if let Ok(abs) = size.parse::<f64>() {
                    style.size = Some(abs);
                    style.size_delta = 0.0;
                }
            }
            if let Some(color) = attrs.get("color").and_then(|c| parse_color(c)) {
                style.color = Some(color);
            }
        },
        _ => {},
    }
    if BLOCK_TAGS.contains(&tag) {
        style.align = attrs.get("align").and_then(|a| parse_align(a)).or(parent.align);
    }
    if let Some(css) = attrs.get("style") {
        for decl in css.split(';') {
            let Some((prop, value)) = decl.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match prop.trim().to_lowercase().as_str() {
                "text-align" => style.align = parse_align(value).or(style.align),
                "color" => style.color = parse_color(value).or(style.color),
                "font-family" => style.family = Some(value.trim_matches(|c| c == '"' || c == '\'').to_lowercase()),
                "font-weight" => style.bold = value == "bold" || value.parse::<u32>().is_ok_and(|w| w >= 600),
                "font-style" => style.italic = value == "italic",
                "font-size" => {
                    if let Ok(size) = value.trim_end_matches("pt").trim().parse::<f64>() {
                        style.size = Some(size);
                        style.size_delta = 0.0;
                    }
                },
                _ => {},
            }
        }
    }
    style
}

impl HtmlParser for SimpleHtmlParser {
    fn parse(&self, html: &str) -> Result<Vec<DomNode>> {
        let html = SPACE_RE.replace_all(html, " ").into_owned();
        let mut nodes: Vec<DomNode> = Vec::new();
        // Open elements: (node index, tag name)
        let mut stack: Vec<(usize, String)> = Vec::new();
        let mut pos = 0;

        let current = |nodes: &[DomNode], stack: &[(usize, String)]| -> (Option<usize>, NodeStyle) {
            stack
                .last()
                .map_or((None, NodeStyle::default()), |(i, _)| (Some(*i), nodes[*i].style.clone()))
        };

        let push_text = |nodes: &mut Vec<DomNode>, stack: &[(usize, String)], text: &str| -> Result<()> {
            if text.is_empty() {
                return Ok(());
            }
            for (offset, _) in text.match_indices('<') {
                if text[offset + 1..].starts_with(|c: char| c.is_ascii_alphabetic() || c == '/') {
                    return Err(Error::Html(format!("Unterminated tag near: {}", &text[offset..])));
                }
            }
            let (parent, style) = current(&nodes[..], stack);
            nodes.push(DomNode {
                is_tag: false,
                value: decode_entities(text),
                opening: false,
                attributes: HashMap::new(),
                style,
                parent,
            });
            Ok(())
        };

        for caps in TAG_RE.captures_iter(&html) {
            let Some(whole) = caps.get(0) else { continue };
            push_text(&mut nodes, &stack[..], &html[pos..whole.start()])?;
            pos = whole.end();

            let closing = !caps[1].is_empty();
            let tag = caps[2].to_lowercase();
            if closing {
                let Some(open) = stack.iter().rposition(|(_, name)| *name == tag) else {
                    trace!("ignoring unmatched </{}>", tag);
                    continue;
                };
                let (index, _) = stack[open].clone();
                stack.truncate(open);
                let (parent, _) = current(&nodes[..], &stack[..]);
                nodes.push(DomNode {
                    is_tag: true,
                    value: tag,
                    opening: false,
                    attributes: HashMap::new(),
                    style: nodes[index].style.clone(),
                    parent,
                });
                continue;
            }

            let attributes: HashMap<String, String> = ATTR_RE
                .captures_iter(&caps[3])
                .map(|a| {
                    let value = a.get(2).or_else(|| a.get(3)).or_else(|| a.get(4)).map_or("", |m| m.as_str());
                    (a[1].to_lowercase(), decode_entities(value))
                })
                .collect();
            let (parent, inherited) = current(&nodes[..], &stack[..]);
            let style = element_style(&tag, &attributes, &inherited);
            let self_closing = caps[3].trim_end().ends_with('/');
            let void = VOID_TAGS.contains(&tag.as_str()) || self_closing;
            nodes.push(DomNode {
                is_tag: true,
                value: tag.clone(),
                opening: true,
                attributes,
                style,
                parent,
            });
            if !void {
                stack.push((nodes.len() - 1, tag));
            }
        }
        push_text(&mut nodes, &stack[..], &html[pos..])?;
        Ok(nodes)
    }
}

/// The line being assembled from text fragments.
struct LineState {
    page: usize,
    startx: f64,
    link_count: usize,
    align: Align,
}

/// Identical remainders tolerated before a fragment is dropped.
const MAX_RETRIES: usize = 3;

impl Document {
    /// Print HTML at the cursor.
    pub fn write_html(&mut self, html: &str, ln: bool, fill: bool) -> Result<()> {
        self.guard(|doc| doc.write_html_inner(html, ln, fill, false, false, Align::Default))
    }

    /// Print HTML inside a multi-line cell at `(x, y)`, or the cursor.
    #[allow(clippy::too_many_arguments)]
    pub fn write_html_cell(
        &mut self,
        w: f64,
        h: f64,
        x: Option<f64>,
        y: Option<f64>,
        html: &str,
        border: Border,
        ln: LineBreak,
        fill: bool,
    ) -> Result<()> {
        let mut cell = MultiCell::new(w, h, html).border(border).ln(ln).fill(fill).html(true);
        cell.x = x;
        cell.y = y;
        self.guard(|doc| doc.multi_cell_inner(&cell)).map(|_| ())
    }

    fn begin_html_line(&mut self, align: Align) -> LineState {
        let page = self.page;
        let link_count = match page.checked_sub(1).and_then(|i| self.pages.get_mut(i)) {
            Some(p) => {
                p.buffer.set_mark(Mark::LineStart);
                p.links.len()
            },
            None => 0,
        };
        LineState {
            page,
            startx: self.x,
            link_count,
            align,
        }
    }

    /// Shift a finished line for center or right alignment.
    fn finish_html_line(&mut self, line: &LineState, cell: bool) {
        if self.page != line.page {
            return;
        }
        let padding = if cell { 2.0 * self.gs.c_margin } else { 0.0 };
        let column = self.w - self.gs.l_margin - self.gs.r_margin - padding;
        let linew = (self.endlinex - line.startx).abs();
        let slack = (column - linew).max(0.0);
        let tx = match line.align {
            Align::Center if self.rtl => -slack / 2.0,
            Align::Center => slack / 2.0,
            Align::Right if !self.rtl => slack,
            Align::Left if self.rtl => -slack,
            _ => return,
        };
        if tx == 0.0 {
            return;
        }
        let k = self.k;
        let Some(page) = self.page.checked_sub(1).and_then(|i| self.pages.get_mut(i)) else {
            return;
        };
        let Some(start) = page.buffer.mark(Mark::LineStart) else {
            return;
        };
        let tail = page.buffer.take_tail(start);
        if tail.is_empty() {
            return;
        }
        page.buffer.append(format!("q\n1 0 0 1 {:.3} 0 cm\n", tx * k).as_bytes());
        page.buffer.append(&tail);
        page.buffer.append(b"\nQ\n");
        for link in page.links.iter_mut().skip(line.link_count) {
            link.x += tx * k;
        }
    }

    fn html_newline(&mut self, cell: bool) {
        let lead = if self.rtl { self.w - self.gs.r_margin } else { self.gs.l_margin };
        let pad = if cell { self.gs.c_margin } else { 0.0 };
        self.x = if self.rtl { lead - pad } else { lead + pad };
        self.y += self.gs.lasth;
    }

    pub(crate) fn write_html_inner(
        &mut self,
        html: &str,
        ln: bool,
        fill: bool,
        reset_height: bool,
        cell: bool,
        align: Align,
    ) -> Result<()> {
        let dom = self.html_parser.parse(html)?;
        self.font()?;
        let base = (self.gs.font_family.clone(), self.gs.full_style(), self.gs.font_size_pt);
        let base_color = self.gs.text_color;
        if reset_height || self.gs.lasth == 0.0 {
            self.gs.lasth = self.font_size * self.cell_height_ratio;
        }
        if cell {
            let c = self.gs.c_margin;
            self.x += if self.rtl { -c } else { c };
        }
        let block_align = if align == Align::Justify { Align::Default } else { align };
        let mut line = self.begin_html_line(block_align);
        let mut at_line_start = true;

        for node in &dom {
            if node.is_tag {
                let name = node.value.as_str();
                if name == "br" {
                    self.finish_html_line(&line, cell);
                    self.html_newline(cell);
                    line = self.begin_html_line(line.align);
                    at_line_start = true;
                } else if BLOCK_TAGS.contains(&name) {
                    if !at_line_start {
                        self.finish_html_line(&line, cell);
                        self.html_newline(cell);
                    }
                    let align = if node.opening {
                        node.style.align.unwrap_or(block_align)
                    } else {
                        node.parent
                            .and_then(|p| dom.get(p))
                            .and_then(|p| p.style.align)
                            .unwrap_or(block_align)
                    };
                    line = self.begin_html_line(align);
                    at_line_start = true;
                }
                continue;
            }

            let style = &node.style;
            let family = style.family.clone().unwrap_or_else(|| base.0.clone());
            let size = style.font_size(base.2);
            self.set_font_inner(&family, &style.font_style(), size)?;
            let color = match (&style.color, &style.href) {
                (Some(color), _) => *color,
                (None, Some(_)) => LINK_COLOR,
                (None, None) => base_color,
            };
            self.gs.text_color = color;
            self.gs.color_flag = self.gs.fill_color != self.gs.text_color;
            self.gs.lasth = self.gs.lasth.max(self.font_size * self.cell_height_ratio);
            let link = style.href.clone().map(LinkTarget::Url);

            let mut pending = Some(node.value.clone());
            let mut retries = 0;
            while let Some(text) = pending.take() {
                let text = if at_line_start { text.trim_start().to_string() } else { text };
                if text.is_empty() {
                    break;
                }
                let mut flow = TextFlow::new(self.gs.lasth, text.clone())
                    .fill(fill)
                    .first_line(true)
                    .first_block(at_line_start);
                flow.link = link.clone();
                let (page, y) = (self.page, self.y);
                let padding = self.gs.c_margin;
                self.gs.c_margin = 0.0;
                let outcome = self.write_inner(&flow);
                self.gs.c_margin = padding;
                let Some(rest) = outcome?.remainder else {
                    at_line_start = false;
                    break;
                };
                retries = if rest == text { retries + 1 } else { 0 };
                if retries >= MAX_RETRIES {
                    warn!("dropping HTML text that does not fit the column: {:?}", rest);
                    break;
                }
                self.finish_html_line(&line, cell);
                if self.page == page && self.y == y {
                    self.html_newline(cell);
                }
                line = self.begin_html_line(line.align);
                at_line_start = true;
                pending = Some(rest.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{ad}').to_string());
            }
        }

        if !at_line_start {
            self.finish_html_line(&line, cell);
        }
        if ln && !at_line_start {
            self.html_newline(false);
        }
        self.gs.text_color = base_color;
        self.gs.color_flag = self.gs.fill_color != self.gs.text_color;
        self.set_font_inner(&base.0, &base.1, base.2)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{content, test_doc};
    use super::*;

    fn parse(html: &str) -> Vec<DomNode> {
        SimpleHtmlParser::new().parse(html).unwrap()
    }

    #[test]
    fn test_parse_nested_styles() {
        let nodes = parse("<p>plain <b>bold <i>both</i></b> end</p>");
        let texts: Vec<&DomNode> = nodes.iter().filter(|n| !n.is_tag).collect();
        assert_eq!(texts.len(), 4);
        assert!(!texts[0].style.bold);
        assert!(texts[1].style.bold && !texts[1].style.italic);
        assert!(texts[2].style.bold && texts[2].style.italic);
        assert_eq!(texts[3].value, " end");
        assert_eq!(texts[2].style.font_style(), "BI");
    }

    #[test]
    fn test_parse_attributes_and_entities() {
        let nodes = parse(r#"<a href="https://example.com/?a=1&amp;b=2">x &lt; y</a>"#);
        assert_eq!(nodes[0].attributes.get("href").map(String::as_str), Some("https://example.com/?a=1&b=2"));
        assert_eq!(nodes[1].value, "x < y");
        assert_eq!(nodes[1].style.font_style(), "U");
        assert_eq!(nodes[1].parent, Some(0));
    }

    #[test]
    fn test_parse_font_sizes_and_headings() {
        let nodes = parse(r##"<font size="+2" color="#ff0000">big</font><h1>title</h1>"##);
        assert_eq!(nodes[1].style.font_size(10.0), 12.0);
        assert_eq!(nodes[1].style.color, Some(Color::Rgb(255, 0, 0)));
        assert_eq!(nodes[4].style.font_size(10.0), 16.0);
        assert!(nodes[4].style.font_style().contains('B'));
    }

    #[test]
    fn test_parse_collapses_whitespace_and_ignores_stray_close() {
        let nodes = parse("a\n\n   b</b> 1 < 2");
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].value, "a b");
        assert_eq!(nodes[1].value, " 1 < 2");
    }

    #[test]
    fn test_parse_unterminated_tag_fails() {
        assert!(SimpleHtmlParser::new().parse("text <b unterminated").is_err());
    }

    #[test]
    fn test_style_attribute() {
        let nodes = parse(r#"<div style="text-align: center; color: #00ff00">c</div>"#);
        assert_eq!(nodes[1].style.align, Some(Align::Center));
        assert_eq!(nodes[1].style.color, Some(Color::Rgb(0, 255, 0)));
    }

    #[test]
    fn test_write_html_mixes_fonts_on_one_line() {
        let mut doc = test_doc();
        doc.add_page().unwrap();
        doc.set_font("helvetica", "", 10.0).unwrap();
        let y = doc.get_y();
        doc.write_html("plain <b>bold</b>", false, false).unwrap();
        let page = content(&doc, 1);
        assert!(page.contains("(plain ) Tj"));
        assert!(page.contains("(bold) Tj"));
        assert!(page.contains("BT /F2 10.00 Tf ET"));
        assert_eq!(doc.get_y(), y);
        assert_eq!(doc.current_font.as_deref(), Some("helvetica"));
    }

    #[test]
    fn test_write_html_wraps_long_text() {
        let mut doc = test_doc();
        doc.add_page().unwrap();
        doc.set_font("helvetica", "", 10.0).unwrap();
        let y = doc.get_y();
        doc.write_html(&"<i>lorem ipsum</i> dolor ".repeat(30), true, false).unwrap();
        assert!(doc.get_y() > y + 2.0 * doc.last_h() - 1e-9);
    }

    #[test]
    fn test_write_html_centered_line_is_shifted() {
        let mut doc = test_doc();
        doc.add_page().unwrap();
        doc.set_font("helvetica", "", 10.0).unwrap();
        doc.write_html(r#"<p align="center">middle</p>"#, true, false).unwrap();
        assert!(content(&doc, 1).contains("q\n1 0 0 1 "));
    }

    #[test]
    fn test_write_html_link_is_recorded() {
        let mut doc = test_doc();
        doc.add_page().unwrap();
        doc.set_font("helvetica", "", 10.0).unwrap();
        doc.write_html(r#"see <a href="https://example.com">this</a>"#, false, false).unwrap();
        let links = doc.page_links(1).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target, LinkTarget::Url("https://example.com".into()));
    }

    #[test]
    fn test_write_html_cell_draws_border() {
        let mut doc = test_doc();
        doc.add_page().unwrap();
        doc.set_font("helvetica", "", 10.0).unwrap();
        doc.write_html_cell(80.0, 10.0, None, None, "<b>boxed</b> text", Border::Frame, LineBreak::NextLine, false)
            .unwrap();
        let page = content(&doc, 1);
        assert!(page.contains(" re S"));
        assert!(page.contains("(boxed) Tj"));
    }
}
