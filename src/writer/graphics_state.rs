//! Rendering attributes and their snapshots.
//!
//! A [`GraphicsState`] is a plain value. Saving it is a clone, restoring it is
//! an assignment followed by [`GraphicsState::reapply_ops`], so nothing done
//! between the two can leak into later output.

use super::content_stream::{dash_array, LineCap, LineJoin};
use serde::{Deserialize, Serialize};

/// A device color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Color {
    /// Gray level 0..=255
    Gray(u8),
    /// RGB components 0..=255
    Rgb(u8, u8, u8),
    /// CMYK components in percent 0..=100
    Cmyk(f64, f64, f64, f64),
}

impl Default for Color {
    fn default() -> Self {
        Color::Gray(0)
    }
}

impl Color {
    /// Black.
    pub const BLACK: Color = Color::Gray(0);
    /// White.
    pub const WHITE: Color = Color::Gray(255);

    /// Parse `#rrggbb` or `#rgb`.
    pub fn from_hex(hex: &str) -> Option<Color> {
        let hex = hex.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        let expand = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            6 => Some(Color::Rgb(expand(&hex[0..2])?, expand(&hex[2..4])?, expand(&hex[4..6])?)),
            3 => {
                let r = expand(&hex[0..1])?;
                let g = expand(&hex[1..2])?;
                let b = expand(&hex[2..3])?;
                Some(Color::Rgb(r * 17, g * 17, b * 17))
            },
            _ => None,
        }
    }

    fn components(&self, gray: &str, rgb: &str, cmyk: &str) -> String {
        match *self {
            Color::Gray(g) => format!("{:.3} {}", f64::from(g) / 255.0, gray),
            Color::Rgb(r, g, b) => format!(
                "{:.3} {:.3} {:.3} {}",
                f64::from(r) / 255.0,
                f64::from(g) / 255.0,
                f64::from(b) / 255.0,
                rgb
            ),
            Color::Cmyk(c, m, y, k) => format!(
                "{:.3} {:.3} {:.3} {:.3} {}",
                c / 100.0,
                m / 100.0,
                y / 100.0,
                k / 100.0,
                cmyk
            ),
        }
    }

    /// Stroking color operator (G, RG or K).
    pub fn stroke_op(&self) -> String {
        self.components("G", "RG", "K")
    }

    /// Non-stroking color operator (g, rg or k).
    pub fn fill_op(&self) -> String {
        self.components("g", "rg", "k")
    }
}

/// Line cap, join and dash pattern.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineStyle {
    /// Cap style
    pub cap: LineCap,
    /// Join style
    pub join: LineJoin,
    /// Dash lengths in user units; empty means solid
    pub dash: Vec<f64>,
    /// Dash phase
    pub phase: f64,
}

/// Snapshot of every attribute that affects emitted operators.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsState {
    /// Current font family (lowercase), empty before the first selection
    pub font_family: String,
    /// Current style letters among B and I
    pub font_style: String,
    /// Underline decoration active
    pub underline: bool,
    /// Line-through decoration active
    pub linethrough: bool,
    /// Font size in points
    pub font_size_pt: f64,
    /// Left margin in user units
    pub l_margin: f64,
    /// Right margin in user units
    pub r_margin: f64,
    /// Cell padding in user units
    pub c_margin: f64,
    /// Line width in user units
    pub line_width: f64,
    /// Cap, join and dash
    pub line_style: LineStyle,
    /// Stroking color
    pub draw_color: Color,
    /// Non-stroking color for shapes
    pub fill_color: Color,
    /// Non-stroking color for text
    pub text_color: Color,
    /// Fill and text colors differ, so text needs its own color selection
    pub color_flag: bool,
    /// Height of the last printed cell
    pub lasth: f64,
}

impl GraphicsState {
    /// Initial state for the given scale factor.
    pub fn new(k: f64) -> Self {
        Self {
            font_family: String::new(),
            font_style: String::new(),
            underline: false,
            linethrough: false,
            font_size_pt: 12.0,
            l_margin: 0.0,
            r_margin: 0.0,
            c_margin: 0.0,
            line_width: 0.567 / k,
            line_style: LineStyle::default(),
            draw_color: Color::BLACK,
            fill_color: Color::BLACK,
            text_color: Color::BLACK,
            color_flag: false,
            lasth: 0.0,
        }
    }

    /// Style string including decoration letters, e.g. `BU`.
    pub fn full_style(&self) -> String {
        let mut style = self.font_style.clone();
        if self.underline {
            style.push('U');
        }
        if self.linethrough {
            style.push('D');
        }
        style
    }

    /// Operators that put the PDF line and color state back in line with
    /// this snapshot.
    pub fn reapply_ops(&self, k: f64) -> String {
        format!(
            "{:.2} w {} J {} j [{}] {:.2} d {} {}",
            self.line_width * k,
            self.line_style.cap as u8,
            self.line_style.join as u8,
            dash_array(&self.line_style.dash),
            self.line_style.phase,
            self.draw_color.stroke_op(),
            self.fill_color.fill_op()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_operators() {
        assert_eq!(Color::Gray(0).stroke_op(), "0.000 G");
        assert_eq!(Color::Rgb(255, 0, 128).fill_op(), "1.000 0.000 0.502 rg");
        assert_eq!(Color::Cmyk(100.0, 50.0, 0.0, 10.0).stroke_op(), "1.000 0.500 0.000 0.100 K");
    }

    #[test]
    fn test_color_from_hex() {
        assert_eq!(Color::from_hex("#FF0080"), Some(Color::Rgb(255, 0, 128)));
        assert_eq!(Color::from_hex("#0f0"), Some(Color::Rgb(0, 255, 0)));
        assert_eq!(Color::from_hex("red"), None);
    }

    #[test]
    fn test_full_style() {
        let mut gs = GraphicsState::new(1.0);
        gs.font_style = "B".to_string();
        gs.underline = true;
        assert_eq!(gs.full_style(), "BU");
    }

    #[test]
    fn test_reapply_ops() {
        let mut gs = GraphicsState::new(1.0);
        gs.line_width = 0.2;
        gs.fill_color = Color::Gray(200);
        assert_eq!(gs.reapply_ops(1.0), "0.20 w 0 J 0 j [] 0.00 d 0.000 G 0.784 g");
    }
}
