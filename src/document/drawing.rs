//! Lines, shapes, positioned text, transformations, images, links and
//! bookmarks.

use super::Document;
use crate::error::{Error, Result};
use crate::writer::{
    encoding, image_file_type, Color, ContentOp, DrawStyle, ImageError, ImageSource, ImageType, LineStyle, LinkId,
    LinkTarget, Mark, PageLink, PaintOp,
};
use log::debug;
use std::path::Path;

/// Bezier control distance for a quarter circle of radius 1.
const KAPPA: f64 = 0.552_284_749_8;

/// Cursor placement after an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageAlign {
    /// Cursor unchanged
    #[default]
    None,
    /// Right of the image, at its top
    Top,
    /// Right of the image, at its middle
    Middle,
    /// Right of the image, at its bottom
    Bottom,
    /// Next line below the image
    NextLine,
}

/// Placement of an image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageOptions {
    pub(crate) source: ImageSource,
    pub(crate) x: Option<f64>,
    pub(crate) y: Option<f64>,
    pub(crate) w: f64,
    pub(crate) h: f64,
    pub(crate) kind: Option<ImageType>,
    pub(crate) link: Option<LinkTarget>,
    pub(crate) align: ImageAlign,
}

impl ImageOptions {
    /// Place `source` at the cursor at its natural size.
    pub fn new(source: impl Into<ImageSource>) -> Self {
        Self {
            source: source.into(),
            x: None,
            y: None,
            w: 0.0,
            h: 0.0,
            kind: None,
            link: None,
            align: ImageAlign::None,
        }
    }

    /// Top-left corner.
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    /// Size in user units. A zero dimension follows the aspect ratio.
    pub fn size(mut self, w: f64, h: f64) -> Self {
        self.w = w;
        self.h = h;
        self
    }

    /// Image type, instead of detecting it from the file extension.
    pub fn kind(mut self, kind: ImageType) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Link over the image.
    pub fn link(mut self, target: impl Into<LinkTarget>) -> Self {
        self.link = Some(target.into());
        self
    }

    /// Cursor placement afterwards.
    pub fn align(mut self, align: ImageAlign) -> Self {
        self.align = align;
        self
    }
}

impl Document {
    // ----- lines and shapes -----

    /// Set the line width in user units.
    pub fn set_line_width(&mut self, width: f64) -> Result<()> {
        self.guard(|doc| {
            doc.gs.line_width = width;
            if doc.page > 0 {
                doc.out_op(&ContentOp::LineWidth(width * doc.k));
            }
            Ok(())
        })
    }

    /// Current line width in user units.
    pub fn line_width(&self) -> f64 {
        self.gs.line_width
    }

    /// Set cap, join and dash pattern.
    pub fn set_line_style(&mut self, style: LineStyle) -> Result<()> {
        self.guard(|doc| {
            doc.out(&format!(
                "{} {} {}",
                ContentOp::LineCap(style.cap).to_text(),
                ContentOp::LineJoin(style.join).to_text(),
                ContentOp::Dash(style.dash.clone(), style.phase).to_text()
            ));
            doc.gs.line_style = style;
            Ok(())
        })
    }

    /// Draw a line between two points.
    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) -> Result<()> {
        self.guard(|doc| {
            let (k, h) = (doc.k, doc.h);
            doc.out_op(&ContentOp::Line(x1 * k, (h - y1) * k, x2 * k, (h - y2) * k));
            Ok(())
        })
    }

    /// Draw a rectangle from its top-left corner.
    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, style: DrawStyle) -> Result<()> {
        self.guard(|doc| {
            let k = doc.k;
            doc.out_op(&ContentOp::Rect(x * k, (doc.h - y) * k, w * k, -h * k, style.paint_op()));
            Ok(())
        })
    }

    /// Draw a circle around `(x, y)`.
    pub fn circle(&mut self, x: f64, y: f64, r: f64, style: DrawStyle) -> Result<()> {
        self.guard(|doc| {
            let k = doc.k;
            let (cx, cy, r) = (x * k, (doc.h - y) * k, r * k);
            let m = r * KAPPA;
            let ops = [
                ContentOp::SaveState,
                ContentOp::LineJoin(crate::writer::LineJoin::Round),
                ContentOp::Transform([1.0, 0.0, 0.0, 1.0, cx, cy]),
                ContentOp::MoveTo(0.0, r),
                ContentOp::CurveTo(m, r, r, m, r, 0.0),
                ContentOp::CurveTo(r, -m, m, -r, 0.0, -r),
                ContentOp::CurveTo(-m, -r, -r, -m, -r, 0.0),
                ContentOp::CurveTo(-r, m, -m, r, 0.0, r),
                ContentOp::Paint(style.closing_paint_op()),
                ContentOp::RestoreState,
            ];
            for op in &ops {
                doc.out_op(op);
            }
            Ok(())
        })
    }

    // ----- positioned text -----

    /// Print a string with its baseline starting at `(x, y)`.
    ///
    /// A positive `stroke` outlines the glyphs with that line width in
    /// points. `clip` turns the glyphs into a clipping path.
    pub fn text(&mut self, x: f64, y: f64, txt: &str, stroke: f64, clip: bool) -> Result<()> {
        self.guard(|doc| {
            let k = doc.k;
            let chars = encoding::code_points(txt);
            let width = doc.arr_width(&doc.shaper.shape(&chars, doc.tmprtl));
            let xr = if doc.rtl { doc.w - x - width } else { x };
            let encoded = doc.encode_text(&chars)?;
            let mode = match (stroke > 0.0, clip) {
                (true, false) => format!("1 Tr {:.2} w ", stroke),
                (true, true) => format!("5 Tr {:.2} w ", stroke),
                (false, true) => "7 Tr ".to_string(),
                (false, false) => String::new(),
            };
            let mut code: Vec<u8> = Vec::new();
            let colored = doc.gs.color_flag && !clip;
            if colored {
                code.extend_from_slice(format!("q {} ", doc.gs.text_color.fill_op()).as_bytes());
            }
            code.extend_from_slice(format!("BT {:.2} {:.2} Td {}(", xr * k, (doc.h - y) * k, mode).as_bytes());
            code.extend_from_slice(&encoded);
            code.extend_from_slice(b") Tj ET");
            let fs_pt = doc.gs.font_size_pt;
            let (up, ut) = {
                let font = doc.font()?;
                (font.up, font.ut)
            };
            if doc.gs.underline && !txt.is_empty() {
                let uy = (doc.h - (y - up / 1000.0 * doc.font_size)) * k;
                code.push(b' ');
                code.extend(ContentOp::Rect(xr * k, uy, width * k, -ut / 1000.0 * fs_pt, PaintOp::Fill).to_bytes());
            }
            if doc.gs.linethrough && !txt.is_empty() {
                let ly = (doc.h - (y - doc.font_size / 3.0)) * k;
                code.push(b' ');
                code.extend(ContentOp::Rect(xr * k, ly, width * k, -ut / 1000.0 * fs_pt, PaintOp::Fill).to_bytes());
            }
            if colored {
                code.extend_from_slice(b" Q");
            }
            doc.out_bytes(&code);
            Ok(())
        })
    }

    // ----- transformations -----

    /// Open a transformation group. Cell borders painted inside it are
    /// inserted at its start.
    pub fn start_transform(&mut self) -> Result<()> {
        self.guard(|doc| {
            doc.out("q");
            if let Some(page) = doc.page.checked_sub(1).and_then(|i| doc.pages.get_mut(i)) {
                page.buffer.set_mark(Mark::Transform);
            }
            Ok(())
        })
    }

    /// Close the transformation group.
    pub fn stop_transform(&mut self) -> Result<()> {
        self.guard(|doc| {
            doc.out("Q");
            if let Some(page) = doc.page.checked_sub(1).and_then(|i| doc.pages.get_mut(i)) {
                page.buffer.clear_mark(Mark::Transform);
            }
            Ok(())
        })
    }

    /// Concatenate a transformation matrix.
    pub fn transform(&mut self, tm: [f64; 6]) -> Result<()> {
        self.guard(|doc| {
            doc.out_op(&ContentOp::Transform(tm));
            Ok(())
        })
    }

    /// Rotate by `angle` degrees counter-clockwise around `(x, y)`, or the
    /// cursor.
    pub fn rotate(&mut self, angle: f64, x: Option<f64>, y: Option<f64>) -> Result<()> {
        let mut x = x.unwrap_or(self.x);
        let y = y.unwrap_or(self.y);
        let mut angle = angle;
        if self.rtl {
            x = self.w - x;
            angle = -angle;
        }
        let (k, h) = (self.k, self.h);
        let (x, y) = (x * k, (h - y) * k);
        let (s, c) = angle.to_radians().sin_cos();
        self.transform([c, s, -s, c, x + s * y - c * x, y - c * y - s * x])
    }

    // ----- images -----

    /// Place an image. Each distinct source is embedded once.
    pub fn image(&mut self, options: ImageOptions) -> Result<()> {
        self.guard(|doc| doc.image_inner(&options))
    }

    /// Right edge of the last image.
    pub fn image_rb_x(&self) -> f64 {
        self.img_rb_x
    }

    /// Bottom edge of the last image.
    pub fn image_rb_y(&self) -> f64 {
        self.img_rb_y
    }

    pub(crate) fn image_inner(&mut self, opts: &ImageOptions) -> Result<()> {
        let key = opts.source.key();
        let (index, px_w, px_h) = match self.images.get(&key) {
            Some(info) => (info.i, info.w as f64, info.h as f64),
            None => {
                let kind = match opts.kind {
                    Some(kind) => kind,
                    None => {
                        let ext = Path::new(&key).extension().and_then(|e| e.to_str()).ok_or_else(|| {
                            ImageError::InvalidData(format!(
                                "Image file has no extension and no type was specified: {}",
                                key
                            ))
                        })?;
                        image_file_type(Some(&key), None)
                            .ok_or_else(|| ImageError::UnsupportedFormat(ext.to_string()))?
                    },
                };
                let mut info = self.image_decoder.decode(&opts.source, kind)?;
                info.i = self.images.len() + 1;
                debug!("embedded image {} as /I{} ({}x{} px)", key, info.i, info.w, info.h);
                let dims = (info.i, info.w as f64, info.h as f64);
                self.images.insert(key, info);
                dims
            },
        };
        if px_w <= 0.0 || px_h <= 0.0 {
            return Err(Error::Image(ImageError::InvalidData("image has no pixels".to_string())));
        }

        let (mut w, mut h) = (opts.w, opts.h);
        if w == 0.0 && h == 0.0 {
            w = px_w / (self.img_scale * self.k);
            h = px_h / (self.img_scale * self.k);
        }
        if w == 0.0 {
            w = h * px_w / px_h;
        }
        if h == 0.0 {
            h = w * px_h / px_w;
        }

        let mut x = opts.x.unwrap_or_else(|| self.get_x());
        let mut y = opts.y.unwrap_or(self.y);
        if y + h > self.page_break_trigger && !self.in_footer && self.accept_page_break() {
            let orientation = self.cur_orientation;
            self.add_page_with(Some(orientation), None)?;
            x = self.get_x();
            y = self.y;
        }

        self.img_rb_y = y + h;
        let ximg = if self.rtl { self.w - x - w } else { x };
        self.img_rb_x = if self.rtl { ximg } else { ximg + w };
        let k = self.k;
        self.out_op(&ContentOp::PaintImage {
            index,
            w: w * k,
            h: h * k,
            x: ximg * k,
            y: (self.h - (y + h)) * k,
        });
        if let Some(target) = &opts.link {
            self.link_inner(ximg, y, w, h, target.clone())?;
        }

        match opts.align {
            ImageAlign::None => {},
            ImageAlign::Top => {
                self.y = y;
                self.x = self.img_rb_x;
            },
            ImageAlign::Middle => {
                self.y = y + (h / 2.0).round();
                self.x = self.img_rb_x;
            },
            ImageAlign::Bottom => {
                self.y = self.img_rb_y;
                self.x = self.img_rb_x;
            },
            ImageAlign::NextLine => {
                let bottom = self.img_rb_y;
                self.set_y(bottom);
            },
        }
        Ok(())
    }

    // ----- links and bookmarks -----

    /// Create an internal link target and return its id. Point it somewhere
    /// with [`Document::set_link`].
    pub fn add_link(&mut self) -> LinkId {
        self.links.add()
    }

    /// Point an internal link at `y` on `page`. A negative `y` means the
    /// cursor; `None` for the page means the current page.
    pub fn set_link(&mut self, id: LinkId, y: f64, page: Option<usize>) -> Result<()> {
        self.guard(|doc| {
            let y = if y < 0.0 { doc.y } else { y };
            let page = page.unwrap_or(doc.page);
            if doc.links.set(id, page, y) {
                Ok(())
            } else {
                Err(Error::State(format!("Unknown link id {}", id)))
            }
        })
    }

    /// Make a rectangle on the current page clickable.
    pub fn link(&mut self, x: f64, y: f64, w: f64, h: f64, target: impl Into<LinkTarget>) -> Result<()> {
        let target = target.into();
        self.guard(|doc| doc.link_inner(x, y, w, h, target))
    }

    pub(crate) fn link_inner(&mut self, x: f64, y: f64, w: f64, h: f64, target: LinkTarget) -> Result<()> {
        let k = self.k;
        let top = self.h_pt - y * k;
        let page = self
            .page
            .checked_sub(1)
            .and_then(|i| self.pages.get_mut(i))
            .ok_or_else(|| Error::State("No page has been added yet".to_string()))?;
        page.links.push(PageLink {
            x: x * k,
            y: top,
            w: w * k,
            h: h * k,
            target,
        });
        Ok(())
    }

    /// Add a bookmark to the outline at `y` on the current page, or at the
    /// cursor.
    pub fn bookmark(&mut self, title: &str, level: usize, y: Option<f64>) {
        let y = y.unwrap_or(self.y);
        self.outlines.add(title, level, y, self.page);
    }

    /// Number of bookmarks.
    pub fn bookmark_count(&self) -> usize {
        self.outlines.len()
    }

    /// Set the text color from a hex string such as `#336699`.
    pub fn set_text_color_hex(&mut self, hex: &str) -> Result<()> {
        let color = Color::from_hex(hex).ok_or_else(|| Error::config(format!("Invalid color: {}", hex)))?;
        self.set_text_color(color)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{content, test_doc};
    use super::*;
    use crate::writer::{ColorSpace, ImageDecoder, ImageInfo};
    use std::cell::Cell as Counter;
    use std::rc::Rc;

    struct FakeDecoder {
        calls: Rc<Counter<usize>>,
    }

    impl ImageDecoder for FakeDecoder {
        fn decode(&self, _source: &ImageSource, _kind: ImageType) -> std::result::Result<ImageInfo, ImageError> {
            self.calls.set(self.calls.get() + 1);
            Ok(ImageInfo {
                w: 200,
                h: 100,
                cs: ColorSpace::DeviceRGB,
                bpc: 8,
                filter: None,
                predictor: None,
                data: Some(vec![0; 200 * 100 * 3]),
                palette: Vec::new(),
                transparency: None,
                i: 0,
                n: 0,
            })
        }
    }

    fn doc_with_fake_images() -> (Document, Rc<Counter<usize>>) {
        let calls = Rc::new(Counter::new(0));
        let mut doc = test_doc();
        doc.set_image_decoder(Box::new(FakeDecoder { calls: calls.clone() }));
        doc.add_page().unwrap();
        (doc, calls)
    }

    #[test]
    fn test_line_and_rect_operators() {
        let mut doc = test_doc();
        doc.add_page().unwrap();
        doc.line(0.0, 0.0, 10.0, 10.0).unwrap();
        doc.rect(0.0, 0.0, 10.0, 5.0, DrawStyle::DrawFill).unwrap();
        let page = content(&doc, 1);
        assert!(page.contains(" m ") && page.contains(" l S"));
        assert!(page.contains(" re B"));
    }

    #[test]
    fn test_circle_is_closed_and_scoped() {
        let mut doc = test_doc();
        doc.add_page().unwrap();
        doc.circle(50.0, 50.0, 10.0, DrawStyle::Fill).unwrap();
        let page = content(&doc, 1);
        assert_eq!(page.matches(" c\n").count(), 4);
        assert!(page.contains("q\n1 j\n"));
        assert!(page.contains("f\nQ\n"));
    }

    #[test]
    fn test_text_render_modes() {
        let mut doc = test_doc();
        doc.add_page().unwrap();
        doc.set_font("helvetica", "", 10.0).unwrap();
        doc.text(10.0, 20.0, "outlined", 0.5, false).unwrap();
        doc.text(10.0, 30.0, "clip", 0.0, true).unwrap();
        let page = content(&doc, 1);
        assert!(page.contains("1 Tr 0.50 w (outlined) Tj ET"));
        assert!(page.contains("7 Tr (clip) Tj ET"));
    }

    #[test]
    fn test_transform_marks_insertion_point() {
        let mut doc = test_doc();
        doc.add_page().unwrap();
        doc.start_transform().unwrap();
        doc.rotate(90.0, Some(10.0), Some(10.0)).unwrap();
        let page = &doc.pages[0];
        assert!(page.buffer.mark(Mark::Transform).is_some());
        doc.stop_transform().unwrap();
        assert!(doc.pages[0].buffer.mark(Mark::Transform).is_none());
        assert!(content(&doc, 1).contains("0.000 1.000 -1.000 0.000"));
    }

    #[test]
    fn test_image_natural_size_and_dedup() {
        let (mut doc, calls) = doc_with_fake_images();
        doc.image(ImageOptions::new("logo.png").at(10.0, 10.0)).unwrap();
        doc.image(ImageOptions::new("logo.png").at(10.0, 60.0).size(20.0, 0.0)).unwrap();
        assert_eq!(calls.get(), 1);
        let page = content(&doc, 1);
        assert_eq!(page.matches("/I1 Do").count(), 2);
        let k = doc.scale_factor();
        assert!(page.contains(&format!("q {:.2} 0 0 {:.2}", 200.0, 100.0)));
        assert!(page.contains(&format!("q {:.2} 0 0 {:.2}", 20.0 * k, 10.0 * k)));
        assert!((doc.image_rb_y() - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_image_without_extension_needs_type() {
        let (mut doc, _) = doc_with_fake_images();
        let err = doc.image(ImageOptions::new("logo")).unwrap_err();
        assert!(err.to_string().contains("no extension"));
    }

    #[test]
    fn test_image_explicit_type() {
        let (mut doc, calls) = doc_with_fake_images();
        doc.image(ImageOptions::new("logo").kind(ImageType::Png).align(ImageAlign::NextLine)).unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(doc.get_x(), doc.margins().0);
    }

    #[test]
    fn test_internal_link_roundtrip() {
        let mut doc = test_doc();
        doc.add_page().unwrap();
        let id = doc.add_link();
        doc.set_link(id, -1.0, None).unwrap();
        doc.link(10.0, 10.0, 30.0, 5.0, id).unwrap();
        let link = &doc.page_links(1).unwrap()[0];
        let k = doc.scale_factor();
        assert!((link.y - (doc.page_height() - 10.0) * k).abs() < 1e-6);
        assert!(doc.set_link(99, 0.0, None).is_err());
    }

    #[test]
    fn test_link_without_page_fails() {
        let mut doc = test_doc();
        assert!(doc.link(0.0, 0.0, 1.0, 1.0, "https://example.com").is_err());
    }

    #[test]
    fn test_bookmarks_use_cursor() {
        let mut doc = test_doc();
        doc.add_page().unwrap();
        doc.bookmark("Chapter", 0, None);
        doc.bookmark("Section", 1, Some(50.0));
        assert_eq!(doc.bookmark_count(), 2);
        assert_eq!(doc.outlines.items()[0].y, doc.margins().1);
        assert_eq!(doc.outlines.items()[1].page, 1);
    }
}
