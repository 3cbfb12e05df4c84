//! Page header, footer and page-break policy.

use super::cell::{Align, Border, BorderSides, Cell, LineBreak, MultiCell};
use super::drawing::ImageOptions;
use super::Document;
use crate::error::Result;
use crate::writer::{Color, ImageSource, LineStyle};

/// Content of the standard header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderData {
    /// Logo drawn at the top-left corner
    pub logo: Option<ImageSource>,
    /// Logo width in user units
    pub logo_width: f64,
    /// Bold title line
    pub title: String,
    /// Text below the title
    pub string: String,
}

/// Draws the header and footer of every page and decides whether
/// automatic page breaks happen.
///
/// The document calls [`PageDecorator::header`] right after a page starts,
/// with the cursor at the header margin and the header font selected, and
/// [`PageDecorator::footer`] when the page is closed. State changes made by
/// either are undone afterwards.
pub trait PageDecorator {
    /// Draw the page header.
    fn header(&mut self, doc: &mut Document) -> Result<()>;

    /// Draw the page footer.
    fn footer(&mut self, doc: &mut Document) -> Result<()>;

    /// Whether content crossing the break line starts a new page.
    fn accept_page_break(&self, doc: &Document) -> bool {
        doc.auto_page_break()
    }
}

/// Header with an optional logo, a title and a text line; footer with the
/// page number out of the total.
#[derive(Debug, Clone)]
pub struct StandardDecorator {
    /// Word put before the page number
    pub page_label: String,
}

impl Default for StandardDecorator {
    fn default() -> Self {
        Self {
            page_label: "page".to_string(),
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

impl PageDecorator for StandardDecorator {
    fn header(&mut self, doc: &mut Document) -> Result<()> {
        let (l, r) = doc.original_margins();
        let lead = if doc.rtl() { r } else { l };
        let (family, style, size) = {
            let (f, s, z) = doc.header_font();
            (f.to_string(), s.to_string(), z)
        };
        let data = doc.header_data().clone();
        let k = doc.scale_factor();

        let imgy = match &data.logo {
            Some(logo) => {
                let (x, y) = (doc.get_x(), doc.header_margin());
                doc.image_inner(&ImageOptions::new(logo.clone()).at(x, y).size(data.logo_width, 0.0))?;
                doc.image_rb_y()
            },
            None => doc.get_y(),
        };
        let cell_height = round2(doc.cell_height_ratio() * size / k);
        let header_x = lead + data.logo_width * 1.1;

        doc.set_text_color(Color::Rgb(0, 0, 0))?;
        doc.set_font(&family, "B", size + 1.0)?;
        doc.set_x(header_x);
        doc.cell_inner(&Cell::new(0.0, cell_height).text(data.title).ln(LineBreak::NextLine))?;
        doc.set_font(&family, &style, size)?;
        doc.set_x(header_x);
        doc.multi_cell_inner(&MultiCell::new(0.0, cell_height, data.string).align(Align::Default))?;

        doc.set_line_width(0.85 / k)?;
        doc.set_line_style(LineStyle::default())?;
        doc.set_draw_color(Color::Rgb(0, 0, 0))?;
        let below = imgy.max(doc.get_y());
        doc.set_y(2.835 / k + below);
        doc.set_x(lead);
        doc.cell_inner(&Cell::new(0.0, 0.0).border(BorderSides::T).align(Align::Center))
    }

    fn footer(&mut self, doc: &mut Document) -> Result<()> {
        let (l, r) = doc.original_margins();
        let lead = if doc.rtl() { r } else { l };
        let (family, style, size) = {
            let (f, s, z) = doc.footer_font();
            (f.to_string(), s.to_string(), z)
        };
        let k = doc.scale_factor();
        let previous_width = doc.line_width();

        doc.set_text_color(Color::Rgb(0, 0, 0))?;
        doc.set_font(&family, &style, size)?;
        doc.set_line_width(0.3 / k)?;
        doc.set_draw_color(Color::Rgb(0, 0, 0))?;

        let footer_height = (doc.cell_height_ratio() * size / k).round();
        let footer_y = doc.page_height() - doc.footer_margin() - footer_height;
        let text = format!("{} {} / {}", self.page_label, doc.page_no(), doc.alias_nb_pages());
        doc.set_y(footer_y);
        doc.set_x(lead);
        let align = if doc.rtl() { Align::Left } else { Align::Right };
        doc.cell_inner(
            &Cell::new(0.0, footer_height)
                .text(text)
                .border(Border::Sides(BorderSides::T))
                .align(align),
        )?;
        doc.set_line_width(previous_width)
    }
}

impl Document {
    /// Set the content of the standard header.
    pub fn set_header_data(&mut self, data: HeaderData) {
        self.header_data = data;
    }

    /// Content of the standard header.
    pub fn header_data(&self) -> &HeaderData {
        &self.header_data
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{content, test_doc};
    use super::*;
    use crate::config::DocumentConfig;

    struct NoBreaks;

    impl PageDecorator for NoBreaks {
        fn header(&mut self, doc: &mut Document) -> Result<()> {
            doc.rect(0.0, 0.0, 5.0, 5.0, crate::writer::DrawStyle::Fill)
        }

        fn footer(&mut self, _doc: &mut Document) -> Result<()> {
            Ok(())
        }

        fn accept_page_break(&self, _doc: &Document) -> bool {
            false
        }
    }

    #[test]
    fn test_standard_header_and_footer() {
        let mut doc = Document::new(DocumentConfig::new().with_compress(false).with_header_footer(true, true)).unwrap();
        doc.set_header_data(HeaderData {
            title: "Report".to_string(),
            string: "Quarterly numbers".to_string(),
            ..HeaderData::default()
        });
        doc.add_page().unwrap();
        doc.close().unwrap();
        let page = content(&doc, 1);
        assert!(page.contains("(Report) Tj"));
        assert!(page.contains("(Quarterly numbers) Tj"));
        assert!(page.contains("(page 1 / {nb}) Tj"));
    }

    #[test]
    fn test_header_state_does_not_leak() {
        let mut doc = Document::new(DocumentConfig::new().with_compress(false).with_header_footer(true, false)).unwrap();
        doc.set_font("times", "", 14.0).unwrap();
        doc.add_page().unwrap();
        assert_eq!(doc.current_font.as_deref(), Some("times"));
        assert_eq!(doc.font_size_pt(), 14.0);
        assert_eq!(doc.get_y(), doc.margins().1);
    }

    #[test]
    fn test_custom_decorator_controls_breaks() {
        let mut doc = test_doc();
        doc.set_print_header(true);
        doc.set_decorator(Box::new(NoBreaks));
        doc.add_page().unwrap();
        assert!(content(&doc, 1).contains(" re f"));
        doc.set_font("helvetica", "", 12.0).unwrap();
        doc.set_y(doc.page_height() - 5.0);
        doc.cell(Cell::new(10.0, 10.0).text("x")).unwrap();
        assert_eq!(doc.num_pages(), 1);
    }
}
