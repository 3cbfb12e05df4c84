//! Content stream operators.
//!
//! Numeric operands use fixed precision: two decimals for coordinates and
//! lengths, three for color components, matrices and word spacing.

use std::io::Write;

/// A single content stream operation (or a short fixed operator group).
#[derive(Debug, Clone, PartialEq)]
pub enum ContentOp {
    /// Save graphics state (q)
    SaveState,
    /// Restore graphics state (Q)
    RestoreState,
    /// Concatenate a transformation matrix (cm)
    Transform([f64; 6]),
    /// Rectangle path painted with the given operator (re)
    Rect(f64, f64, f64, f64, PaintOp),
    /// Stroked straight segment (m l S)
    Line(f64, f64, f64, f64),
    /// Begin a new subpath (m)
    MoveTo(f64, f64),
    /// Straight segment (l)
    LineTo(f64, f64),
    /// Cubic Bezier segment (c)
    CurveTo(f64, f64, f64, f64, f64, f64),
    /// Paint the current path
    Paint(PaintOp),
    /// Line width (w)
    LineWidth(f64),
    /// Line cap style (J)
    LineCap(LineCap),
    /// Line join style (j)
    LineJoin(LineJoin),
    /// Dash pattern with phase (d)
    Dash(Vec<f64>, f64),
    /// Select font resource `/F{index}` at a size in points, wrapped in BT/ET
    SelectFont(usize, f64),
    /// Word spacing in points, wrapped in BT/ET
    WordSpacing(f64),
    /// Character spacing in points, wrapped in BT/ET
    CharSpacing(f64),
    /// Horizontal scaling in percent, wrapped in BT/ET
    HorizontalScaling(f64),
    /// Text render mode (Tr)
    RenderMode(u8),
    /// Show an already encoded and escaped string at a position
    ShowText {
        /// Baseline start x in points
        x: f64,
        /// Baseline y in points
        y: f64,
        /// Escaped string operand bytes
        text: Vec<u8>,
    },
    /// Show a positioned array of string pieces and adjustments (TJ)
    ShowTextArray {
        /// Baseline start x in points
        x: f64,
        /// Baseline y in points
        y: f64,
        /// Array contents
        items: Vec<TextArrayItem>,
    },
    /// Paint image XObject `/I{index}` into the given box
    PaintImage {
        /// Resource index
        index: usize,
        /// Width in points
        w: f64,
        /// Height in points
        h: f64,
        /// Lower-left x in points
        x: f64,
        /// Lower-left y in points
        y: f64,
    },
}

/// Path painting operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaintOp {
    /// Stroke (S)
    #[default]
    Stroke,
    /// Fill (f)
    Fill,
    /// Fill and stroke (B)
    FillStroke,
    /// Close and stroke (s)
    CloseStroke,
    /// Close, fill and stroke (b)
    CloseFillStroke,
}

impl PaintOp {
    /// Operator token.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaintOp::Stroke => "S",
            PaintOp::Fill => "f",
            PaintOp::FillStroke => "B",
            PaintOp::CloseStroke => "s",
            PaintOp::CloseFillStroke => "b",
        }
    }
}

/// How a closed shape is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawStyle {
    /// Outline only
    #[default]
    Draw,
    /// Interior only
    Fill,
    /// Interior and outline
    DrawFill,
}

impl DrawStyle {
    /// Parse the short form used by drawing calls: `D`, `F`, `DF` or `FD`.
    pub fn parse(style: &str) -> Self {
        match style.to_ascii_uppercase().as_str() {
            "F" => DrawStyle::Fill,
            "FD" | "DF" => DrawStyle::DrawFill,
            _ => DrawStyle::Draw,
        }
    }

    /// Painting operator for an open path such as a rectangle.
    pub fn paint_op(&self) -> PaintOp {
        match self {
            DrawStyle::Draw => PaintOp::Stroke,
            DrawStyle::Fill => PaintOp::Fill,
            DrawStyle::DrawFill => PaintOp::FillStroke,
        }
    }

    /// Painting operator for a path that must be closed first.
    pub fn closing_paint_op(&self) -> PaintOp {
        match self {
            DrawStyle::Draw => PaintOp::CloseStroke,
            DrawStyle::Fill => PaintOp::Fill,
            DrawStyle::DrawFill => PaintOp::CloseFillStroke,
        }
    }
}

/// Line cap style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineCap {
    /// Butt cap (0)
    #[default]
    Butt = 0,
    /// Round cap (1)
    Round = 1,
    /// Projecting square cap (2)
    Square = 2,
}

/// Line join style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoin {
    /// Miter join (0)
    #[default]
    Miter = 0,
    /// Round join (1)
    Round = 1,
    /// Bevel join (2)
    Bevel = 2,
}

/// Item inside a TJ array.
#[derive(Debug, Clone, PartialEq)]
pub enum TextArrayItem {
    /// Already encoded and escaped string bytes
    Text(Vec<u8>),
    /// Position adjustment in thousandths of text space
    Adjustment(f64),
}

/// Format a dash array as space separated values.
pub fn dash_array(dash: &[f64]) -> String {
    dash.iter()
        .map(|d| format_number(*d))
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

impl ContentOp {
    /// Write the operator without a trailing newline.
    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        match self {
            ContentOp::SaveState => write!(w, "q"),
            ContentOp::RestoreState => write!(w, "Q"),
            ContentOp::Transform(m) => write!(
                w,
                "{:.3} {:.3} {:.3} {:.3} {:.3} {:.3} cm",
                m[0], m[1], m[2], m[3], m[4], m[5]
            ),
            ContentOp::Rect(x, y, rw, rh, op) => {
                write!(w, "{:.2} {:.2} {:.2} {:.2} re {}", x, y, rw, rh, op.as_str())
            },
            ContentOp::Line(x1, y1, x2, y2) => {
                write!(w, "{:.2} {:.2} m {:.2} {:.2} l S", x1, y1, x2, y2)
            },
            ContentOp::MoveTo(x, y) => write!(w, "{:.2} {:.2} m", x, y),
            ContentOp::LineTo(x, y) => write!(w, "{:.2} {:.2} l", x, y),
            ContentOp::CurveTo(x1, y1, x2, y2, x3, y3) => write!(
                w,
                "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
                x1, y1, x2, y2, x3, y3
            ),
            ContentOp::Paint(op) => write!(w, "{}", op.as_str()),
            ContentOp::LineWidth(lw) => write!(w, "{:.2} w", lw),
            ContentOp::LineCap(cap) => write!(w, "{} J", *cap as u8),
            ContentOp::LineJoin(join) => write!(w, "{} j", *join as u8),
            ContentOp::Dash(dash, phase) => write!(w, "[{}] {:.2} d", dash_array(dash), phase),
            ContentOp::SelectFont(index, size) => write!(w, "BT /F{} {:.2} Tf ET", index, size),
            ContentOp::WordSpacing(tw) => write!(w, "BT {:.3} Tw ET", tw),
            ContentOp::CharSpacing(tc) => write!(w, "BT {:.2} Tc ET", tc),
            ContentOp::HorizontalScaling(tz) => write!(w, "BT {:.2} Tz ET", tz),
            ContentOp::RenderMode(mode) => write!(w, "{} Tr", mode),
            ContentOp::ShowText { x, y, text } => {
                write!(w, "BT {:.2} {:.2} Td (", x, y)?;
                w.write_all(text)?;
                write!(w, ") Tj ET")
            },
            ContentOp::ShowTextArray { x, y, items } => {
                write!(w, "BT {:.2} {:.2} Td [", x, y)?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(w, " ")?;
                    }
                    match item {
                        TextArrayItem::Text(t) => {
                            write!(w, "(")?;
                            w.write_all(t)?;
                            write!(w, ")")?;
                        },
                        TextArrayItem::Adjustment(adj) => write!(w, "{:.3}", adj)?,
                    }
                }
                write!(w, "] TJ ET")
            },
            ContentOp::PaintImage { index, w: iw, h: ih, x, y } => {
                write!(w, "q {:.2} 0 0 {:.2} {:.2} {:.2} cm /I{} Do Q", iw, ih, x, y, index)
            },
        }
    }

    /// Encode the operator into a fresh byte vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut buf);
        buf
    }

    /// Encode the operator as text. String operands are decoded lossily.
    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(&self.to_bytes()).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_operator() {
        let op = ContentOp::Rect(28.35, 813.54, 538.58, -28.35, PaintOp::Stroke);
        assert_eq!(op.to_text(), "28.35 813.54 538.58 -28.35 re S");
    }

    #[test]
    fn test_line_operator() {
        assert_eq!(ContentOp::Line(10.0, 20.0, 30.5, 40.0).to_text(), "10.00 20.00 m 30.50 40.00 l S");
    }

    #[test]
    fn test_transform_precision() {
        let op = ContentOp::Transform([1.0, 0.0, 0.0, 1.0, 12.34567, -8.0]);
        assert_eq!(op.to_text(), "1.000 0.000 0.000 1.000 12.346 -8.000 cm");
    }

    #[test]
    fn test_text_state_operators() {
        assert_eq!(ContentOp::SelectFont(1, 12.0).to_text(), "BT /F1 12.00 Tf ET");
        assert_eq!(ContentOp::WordSpacing(1.23456).to_text(), "BT 1.235 Tw ET");
        assert_eq!(ContentOp::HorizontalScaling(80.0).to_text(), "BT 80.00 Tz ET");
    }

    #[test]
    fn test_show_text_array() {
        let op = ContentOp::ShowTextArray {
            x: 10.0,
            y: 20.0,
            items: vec![
                TextArrayItem::Text(vec![0, b'A']),
                TextArrayItem::Adjustment(-250.0),
                TextArrayItem::Text(vec![0, b'B']),
            ],
        };
        assert_eq!(op.to_bytes(), b"BT 10.00 20.00 Td [(\0A) -250.000 (\0B)] TJ ET".to_vec());
    }

    #[test]
    fn test_line_style_operators() {
        assert_eq!(ContentOp::LineCap(LineCap::Round).to_text(), "1 J");
        assert_eq!(ContentOp::LineJoin(LineJoin::Bevel).to_text(), "2 j");
        assert_eq!(ContentOp::Dash(vec![3.0, 1.5], 0.0).to_text(), "[3 1.5] 0.00 d");
        assert_eq!(ContentOp::Dash(vec![], 0.0).to_text(), "[] 0.00 d");
    }

    #[test]
    fn test_draw_style_parse() {
        assert_eq!(DrawStyle::parse("F").paint_op(), PaintOp::Fill);
        assert_eq!(DrawStyle::parse("fd").paint_op(), PaintOp::FillStroke);
        assert_eq!(DrawStyle::parse("").paint_op(), PaintOp::Stroke);
        assert_eq!(DrawStyle::parse("DF").closing_paint_op(), PaintOp::CloseFillStroke);
    }

    #[test]
    fn test_paint_image() {
        let op = ContentOp::PaintImage { index: 2, w: 100.0, h: 50.0, x: 10.0, y: 700.0 };
        assert_eq!(op.to_text(), "q 100.00 0 0 50.00 10.00 700.00 cm /I2 Do Q");
    }
}
