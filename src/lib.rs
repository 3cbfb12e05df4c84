// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::enum_variant_names)]
#![allow(clippy::wrong_self_convention)]
#![allow(clippy::explicit_counter_loop)]
#![allow(clippy::doc_overindented_list_items)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::redundant_guards)]
#![allow(clippy::regex_creation_in_loops)]
#![allow(clippy::manual_find)]
#![allow(clippy::match_like_matches_macro)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]
#![cfg_attr(test, allow(unused_variables))]

//! # PDF Quill
//!
//! Incremental PDF generation with a cursor-based layout model.
//!
//! ## Core Features
//!
//! ### Layout
//! - **Pages**: standard and custom formats, per-page orientation, automatic page breaks
//! - **Cells**: single-line cells with borders, fill, alignment, stretching and links
//! - **Text Flow**: word wrapping with justification, first-line mode and height limits
//! - **MultiCell**: multi-line boxes whose borders follow the text across page breaks
//! - **HTML**: a small inline/block subset laid out with the text flow engine
//! - **Right-to-Left**: mirrored coordinates and pluggable bidi shaping
//!
//! ### Resources
//! - **Fonts**: the 14 core fonts with bundled metrics, embedded TrueType fonts
//! - **Images**: JPEG, PNG and GIF with deduplication by source
//! - **Links and Bookmarks**: internal and external links, a nested outline tree
//!
//! ### Output
//! - **Serializer**: cross-reference table with exact byte offsets, optional Flate compression
//! - **Aliases**: `{nb}` total-page placeholders resolved when the document closes
//!
//! ## Architecture
//! - [`Document`] owns the cursor, graphics state stack and per-page buffers
//! - [`writer`] turns finished pages and resources into the final byte stream
//! - Page headers, footers and break policy come from a [`PageDecorator`]
//!
//! ## Quick Start
//!
//! ```ignore
//! use pdf_quill::{Cell, Document, DocumentConfig, LineBreak, MultiCell};
//!
//! let mut doc = Document::new(DocumentConfig::new())?;
//! doc.add_page()?;
//! doc.set_font("helvetica", "B", 16.0)?;
//! doc.cell(Cell::new(0.0, 10.0).text("Title").ln(LineBreak::NextLine))?;
//! doc.set_font("times", "", 11.0)?;
//! doc.multi_cell(MultiCell::new(0.0, 5.0, "A long paragraph that wraps.").border("LTRB".parse()?))?;
//! doc.save("out.pdf")?;
//! ```
//!
//! ## Errors
//!
//! Every error is fatal for the document: the first failure is logged, passed
//! to the hook installed with [`Document::set_error_hook`], and every later
//! operation returns [`Error::Poisoned`].

// Error handling
pub mod error;

// Configuration
pub mod config;

// PDF object model
pub mod object;

// Text direction
pub mod text;

// Layout engine
pub mod document;

// Serialization and resources
pub mod writer;

pub use config::{DocumentConfig, LayoutMode, Margins, Metadata, Orientation, PageFormat, Unit, ZoomMode};
pub use document::{
    Align, Border, BorderSides, Cell, DocState, Document, DomNode, ErrorHook, HeaderData, HtmlParser, ImageAlign,
    ImageOptions, LineBreak, MultiCell, NodeStyle, PageDecorator, SimpleHtmlParser, StandardDecorator, Stretch,
    TextFlow, WriteOutcome,
};
pub use error::{Error, Result};
pub use text::{BidiShaper, IdentityShaper};
pub use writer::{Color, DrawStyle, ImageSource, ImageType, LineCap, LineJoin, LineStyle, LinkId, LinkTarget};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
