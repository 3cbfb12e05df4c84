//! Integration tests for HTML layout.

use pdf_quill::{
    Border, Document, DocumentConfig, DomNode, HtmlParser, LineBreak, MultiCell, NodeStyle, Result,
};
use std::collections::HashMap;

fn doc() -> Document {
    let mut doc = Document::new(DocumentConfig::new().with_compress(false).with_unicode(false)).unwrap();
    doc.add_page().unwrap();
    doc.set_font("times", "", 10.0).unwrap();
    doc
}

fn page_text(doc: &Document) -> String {
    String::from_utf8_lossy(doc.page_content(1).unwrap()).into_owned()
}

/// Treats the whole input as one bold text node.
struct ShoutingParser;

impl HtmlParser for ShoutingParser {
    fn parse(&self, html: &str) -> Result<Vec<DomNode>> {
        Ok(vec![DomNode {
            is_tag: false,
            value: html.to_uppercase(),
            opening: false,
            attributes: HashMap::new(),
            style: NodeStyle {
                bold: true,
                ..NodeStyle::default()
            },
            parent: None,
        }])
    }
}

#[test]
fn test_heading_and_paragraph() {
    let mut doc = doc();
    let y = doc.get_y();
    doc.write_html("<h1>Title</h1><p>Body text</p>", true, false).unwrap();
    let page = page_text(&doc);
    assert!(page.contains("(Title) Tj"));
    assert!(page.contains("(Body text) Tj"));
    assert!(page.contains("/F2 16.00 Tf"));
    assert!(doc.get_y() > y);
    assert_eq!(doc.font_size_pt(), 10.0);
}

#[test]
fn test_line_breaks() {
    let mut doc = doc();
    let y = doc.get_y();
    doc.write_html("one<br>two<br>three", false, false).unwrap();
    assert!(doc.get_y() >= y + 2.0 * doc.last_h() - 1e-9);
    let page = page_text(&doc);
    assert!(page.contains("(one) Tj") && page.contains("(two) Tj") && page.contains("(three) Tj"));
}

#[test]
fn test_html_multi_cell() {
    let mut doc = doc();
    doc.multi_cell(MultiCell::new(60.0, 5.0, "<i>italic</i> and <u>underlined</u>").html(true).border(Border::Frame))
        .unwrap();
    let page = page_text(&doc);
    assert!(page.contains("(italic) Tj"));
    assert!(page.contains(" re S"));
    assert!(page.contains(" re f"));
}

#[test]
fn test_html_cell_at_position() {
    let mut doc = doc();
    doc.write_html_cell(50.0, 0.0, Some(30.0), Some(60.0), "placed", Border::None, LineBreak::Right, false)
        .unwrap();
    let k = doc.scale_factor();
    let x = 30.0 + doc.cell_padding();
    assert!(page_text(&doc).contains(&format!("BT {:.2} ", x * k)));
    assert!((doc.get_x() - 80.0).abs() < 1e-9);
}

#[test]
fn test_custom_parser() {
    let mut doc = doc();
    doc.set_html_parser(Box::new(ShoutingParser));
    doc.write_html("quiet", false, false).unwrap();
    let page = page_text(&doc);
    assert!(page.contains("(QUIET) Tj"));
    assert!(page.contains("/F2 10.00 Tf"));
}

#[test]
fn test_malformed_markup_is_fatal() {
    let mut doc = doc();
    assert!(doc.write_html("text <b unterminated", false, false).is_err());
    assert!(doc.poisoned().is_some());
}
