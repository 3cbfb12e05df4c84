//! Configuration for PDF generation.
//!
//! [`DocumentConfig`] gathers everything fixed when a document is created:
//! unit, page format, orientation, margins, display preferences, metadata
//! and output options. It can be built with the `with_*` methods or loaded
//! from JSON.

use crate::error::{Error, Result};
use phf::phf_map;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Standard page formats, width and height in points.
static PAGE_FORMATS: phf::Map<&'static str, (f64, f64)> = phf_map! {
    "4A0" => (4767.87, 6740.79),
    "2A0" => (3370.39, 4767.87),
    "A0" => (2383.94, 3370.39),
    "A1" => (1683.78, 2383.94),
    "A2" => (1190.55, 1683.78),
    "A3" => (841.89, 1190.55),
    "A4" => (595.28, 841.89),
    "A5" => (419.53, 595.28),
    "A6" => (297.64, 419.53),
    "A7" => (209.76, 297.64),
    "A8" => (147.40, 209.76),
    "A9" => (104.88, 147.40),
    "A10" => (73.70, 104.88),
    "B0" => (2834.65, 4008.19),
    "B1" => (2004.09, 2834.65),
    "B2" => (1417.32, 2004.09),
    "B3" => (1000.63, 1417.32),
    "B4" => (708.66, 1000.63),
    "B5" => (498.90, 708.66),
    "B6" => (354.33, 498.90),
    "B7" => (249.45, 354.33),
    "B8" => (175.75, 249.45),
    "B9" => (124.72, 175.75),
    "B10" => (87.87, 124.72),
    "C0" => (2599.37, 3676.54),
    "C1" => (1836.85, 2599.37),
    "C2" => (1298.27, 1836.85),
    "C3" => (918.43, 1298.27),
    "C4" => (649.13, 918.43),
    "C5" => (459.21, 649.13),
    "C6" => (323.15, 459.21),
    "C7" => (229.61, 323.15),
    "C8" => (161.57, 229.61),
    "C9" => (113.39, 161.57),
    "C10" => (79.37, 113.39),
    "RA0" => (2437.80, 3458.27),
    "RA1" => (1729.13, 2437.80),
    "RA2" => (1218.90, 1729.13),
    "RA3" => (864.57, 1218.90),
    "RA4" => (609.45, 864.57),
    "SRA0" => (2551.18, 3628.35),
    "SRA1" => (1814.17, 2551.18),
    "SRA2" => (1275.59, 1814.17),
    "SRA3" => (907.09, 1275.59),
    "SRA4" => (637.80, 907.09),
    "LETTER" => (612.00, 792.00),
    "LEGAL" => (612.00, 1008.00),
    "EXECUTIVE" => (521.86, 756.00),
    "FOLIO" => (612.00, 936.00),
};

/// User unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// Point (1/72 inch)
    Pt,
    /// Millimeter
    #[default]
    Mm,
    /// Centimeter
    Cm,
    /// Inch
    In,
}

impl Unit {
    /// Scale factor: number of points in one user unit.
    pub fn scale_factor(&self) -> f64 {
        match self {
            Unit::Pt => 1.0,
            Unit::Mm => 72.0 / 25.4,
            Unit::Cm => 72.0 / 2.54,
            Unit::In => 72.0,
        }
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pt" => Ok(Unit::Pt),
            "mm" => Ok(Unit::Mm),
            "cm" => Ok(Unit::Cm),
            "in" => Ok(Unit::In),
            _ => Err(Error::config(format!("Incorrect unit: {}", s))),
        }
    }
}

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Height greater than width
    #[default]
    Portrait,
    /// Width greater than height
    Landscape,
}

impl FromStr for Orientation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "P" | "PORTRAIT" => Ok(Orientation::Portrait),
            "L" | "LANDSCAPE" => Ok(Orientation::Landscape),
            _ => Err(Error::config(format!("Incorrect orientation: {}", s))),
        }
    }
}

impl Orientation {
    /// Apply this orientation to a format size, swapping width and height
    /// for landscape.
    pub fn apply(&self, (w, h): (f64, f64)) -> (f64, f64) {
        match self {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }
}

/// Page format: a standard name or a custom size in user units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageFormat {
    /// Standard format name such as `A4` or `LETTER` (case-insensitive)
    Named(String),
    /// Custom width and height in user units
    Custom(f64, f64),
}

impl Default for PageFormat {
    fn default() -> Self {
        PageFormat::Named("A4".to_string())
    }
}

impl From<&str> for PageFormat {
    fn from(name: &str) -> Self {
        PageFormat::Named(name.to_string())
    }
}

impl PageFormat {
    /// Portrait width and height in points for scale factor `k`.
    pub fn size_pt(&self, k: f64) -> Result<(f64, f64)> {
        match self {
            PageFormat::Named(name) => PAGE_FORMATS
                .get(name.to_uppercase().as_str())
                .copied()
                .ok_or_else(|| Error::config(format!("Unknown page format: {}", name))),
            PageFormat::Custom(w, h) => Ok((w * k, h * k)),
        }
    }
}

/// Initial zoom of the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoomMode {
    /// Whole page on screen
    FullPage,
    /// Page width fills the window
    #[default]
    FullWidth,
    /// Real size (100%)
    Real,
    /// Viewer default
    Default,
    /// Zoom factor in percent
    Percent(f64),
}

impl FromStr for ZoomMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fullpage" => Ok(ZoomMode::FullPage),
            "fullwidth" => Ok(ZoomMode::FullWidth),
            "real" => Ok(ZoomMode::Real),
            "default" => Ok(ZoomMode::Default),
            _ => s
                .parse::<f64>()
                .map(ZoomMode::Percent)
                .map_err(|_| Error::config(format!("Incorrect zoom display mode: {}", s))),
        }
    }
}

/// Page layout of the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// One page at a time
    Single,
    /// Pages displayed continuously
    #[default]
    Continuous,
    /// Two columns of pages
    Two,
    /// Viewer default
    Default,
}

impl FromStr for LayoutMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "single" => Ok(LayoutMode::Single),
            "continuous" => Ok(LayoutMode::Continuous),
            "two" => Ok(LayoutMode::Two),
            "default" => Ok(LayoutMode::Default),
            _ => Err(Error::config(format!("Incorrect layout display mode: {}", s))),
        }
    }
}

/// Document information dictionary values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    /// Document title
    pub title: Option<String>,
    /// Document subject
    pub subject: Option<String>,
    /// Document author
    pub author: Option<String>,
    /// Keywords, space separated
    pub keywords: Option<String>,
    /// Application that created the original document
    pub creator: Option<String>,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Unit::Pt => "pt",
            Unit::Mm => "mm",
            Unit::Cm => "cm",
            Unit::In => "in",
        };
        write!(f, "{}", s)
    }
}

/// Page margins in user units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    /// Left margin
    pub left: f64,
    /// Top margin
    pub top: f64,
    /// Right margin
    pub right: f64,
}

/// PDF generation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Default page orientation
    pub orientation: Orientation,
    /// User unit
    pub unit: Unit,
    /// Default page format
    pub format: PageFormat,
    /// Write metadata strings as UTF-16BE
    pub unicode: bool,
    /// Right-to-left layout
    pub rtl: bool,
    /// Compress content streams
    pub compress: bool,
    /// Version written in the file header
    pub pdf_version: String,
    /// Page margins; one centimeter on each side when unset
    pub margins: Option<Margins>,
    /// Automatic page breaks
    pub auto_page_break: bool,
    /// Bottom margin triggering page breaks; two centimeters when unset
    pub break_margin: Option<f64>,
    /// Cell height as a multiple of the font size
    pub cell_height_ratio: f64,
    /// Ratio of image pixels to user units
    pub image_scale: f64,
    /// Draw the page header
    pub print_header: bool,
    /// Draw the page footer
    pub print_footer: bool,
    /// Distance between the page top and the header
    pub header_margin: f64,
    /// Distance between the page bottom and the footer
    pub footer_margin: f64,
    /// Initial viewer zoom
    pub zoom: ZoomMode,
    /// Initial viewer page layout
    pub layout: LayoutMode,
    /// Information dictionary
    pub metadata: Metadata,
    /// Placeholder replaced by the total number of pages
    pub alias_nb_pages: String,
    /// Fixed creation date, for reproducible output
    pub creation_date: Option<chrono::NaiveDateTime>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentConfig {
    /// Create new configuration with defaults: A4 portrait in millimeters.
    pub fn new() -> Self {
        Self {
            orientation: Orientation::Portrait,
            unit: Unit::Mm,
            format: PageFormat::default(),
            unicode: true,
            rtl: false,
            compress: true,
            pdf_version: "1.3".to_string(),
            margins: None,
            auto_page_break: true,
            break_margin: None,
            cell_height_ratio: 1.25,
            image_scale: 1.0,
            print_header: false,
            print_footer: false,
            header_margin: 10.0,
            footer_margin: 10.0,
            zoom: ZoomMode::FullWidth,
            layout: LayoutMode::Continuous,
            metadata: Metadata::default(),
            alias_nb_pages: "{nb}".to_string(),
            creation_date: None,
        }
    }

    /// Load configuration from a JSON document. Missing keys keep their
    /// defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that cannot be expressed in the types.
    pub fn validate(&self) -> Result<()> {
        self.format.size_pt(self.unit.scale_factor())?;
        if self.cell_height_ratio <= 0.0 {
            return Err(Error::config("Cell height ratio must be positive"));
        }
        if self.image_scale <= 0.0 {
            return Err(Error::config("Image scale must be positive"));
        }
        Ok(())
    }

    /// Set the default orientation.
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Set the user unit.
    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    /// Set the default page format.
    pub fn with_format(mut self, format: impl Into<PageFormat>) -> Self {
        self.format = format.into();
        self
    }

    /// Enable or disable UTF-16BE metadata strings.
    pub fn with_unicode(mut self, unicode: bool) -> Self {
        self.unicode = unicode;
        self
    }

    /// Enable or disable right-to-left layout.
    pub fn with_rtl(mut self, rtl: bool) -> Self {
        self.rtl = rtl;
        self
    }

    /// Enable or disable stream compression.
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Set the margins in user units.
    pub fn with_margins(mut self, left: f64, top: f64, right: f64) -> Self {
        self.margins = Some(Margins { left, top, right });
        self
    }

    /// Configure automatic page breaks.
    pub fn with_auto_page_break(mut self, auto: bool, margin: f64) -> Self {
        self.auto_page_break = auto;
        self.break_margin = Some(margin);
        self
    }

    /// Set the cell height ratio.
    pub fn with_cell_height_ratio(mut self, ratio: f64) -> Self {
        self.cell_height_ratio = ratio;
        self
    }

    /// Set the image scale.
    pub fn with_image_scale(mut self, scale: f64) -> Self {
        self.image_scale = scale;
        self
    }

    /// Enable or disable header and footer drawing.
    pub fn with_header_footer(mut self, header: bool, footer: bool) -> Self {
        self.print_header = header;
        self.print_footer = footer;
        self
    }

    /// Set the viewer display mode.
    pub fn with_display_mode(mut self, zoom: ZoomMode, layout: LayoutMode) -> Self {
        self.zoom = zoom;
        self.layout = layout;
        self
    }

    /// Set the document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.metadata.title = Some(title.into());
        self
    }

    /// Set the document author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.metadata.author = Some(author.into());
        self
    }

    /// Set the creation date.
    pub fn with_creation_date(mut self, date: chrono::NaiveDateTime) -> Self {
        self.creation_date = Some(date);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DocumentConfig::default();
        assert_eq!(config.unit, Unit::Mm);
        assert_eq!(config.orientation, Orientation::Portrait);
        assert!(config.compress);
        assert_eq!(config.pdf_version, "1.3");
        assert_eq!(config.cell_height_ratio, 1.25);
    }

    #[test]
    fn test_config_builder() {
        let config = DocumentConfig::new()
            .with_unit(Unit::Pt)
            .with_format("letter")
            .with_compress(false)
            .with_title("Report");
        assert_eq!(config.unit, Unit::Pt);
        assert_eq!(config.format.size_pt(1.0).unwrap(), (612.0, 792.0));
        assert!(!config.compress);
        assert_eq!(config.metadata.title.as_deref(), Some("Report"));
    }

    #[test]
    fn test_unit_parsing() {
        assert_eq!("MM".parse::<Unit>().unwrap(), Unit::Mm);
        let err = "furlong".parse::<Unit>().unwrap_err();
        assert_eq!(format!("{}", err), "Configuration error: Incorrect unit: furlong");
    }

    #[test]
    fn test_orientation_parsing() {
        assert_eq!("landscape".parse::<Orientation>().unwrap(), Orientation::Landscape);
        assert_eq!("p".parse::<Orientation>().unwrap(), Orientation::Portrait);
        assert!("sideways".parse::<Orientation>().is_err());
        assert_eq!(Orientation::Landscape.apply((1.0, 2.0)), (2.0, 1.0));
    }

    #[test]
    fn test_display_mode_parsing() {
        assert_eq!("real".parse::<ZoomMode>().unwrap(), ZoomMode::Real);
        assert_eq!("150".parse::<ZoomMode>().unwrap(), ZoomMode::Percent(150.0));
        assert!("huge".parse::<ZoomMode>().is_err());
        assert!("three".parse::<LayoutMode>().is_err());
    }

    #[test]
    fn test_custom_format() {
        let format = PageFormat::Custom(100.0, 200.0);
        assert_eq!(format.size_pt(2.0).unwrap(), (200.0, 400.0));
        assert!(PageFormat::from("A11").size_pt(1.0).is_err());
    }

    #[test]
    fn test_from_json() {
        let config = DocumentConfig::from_json(
            r#"{"unit": "pt", "format": [300, 400], "rtl": true, "zoom": {"percent": 75}}"#,
        )
        .unwrap();
        assert_eq!(config.unit, Unit::Pt);
        assert_eq!(config.format, PageFormat::Custom(300.0, 400.0));
        assert!(config.rtl);
        assert_eq!(config.zoom, ZoomMode::Percent(75.0));
        assert_eq!(config.layout, LayoutMode::Continuous);

        assert!(DocumentConfig::from_json(r#"{"format": "Z9"}"#).is_err());
    }
}
