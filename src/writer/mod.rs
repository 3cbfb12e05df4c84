//! PDF writing module.
//!
//! This module holds the low-level pieces the [`Document`](crate::Document)
//! layout engine is built on.
//!
//! ## Architecture
//!
//! ```text
//! Document (cursor, cells, text flow)
//!     ↓
//! [ContentOp] (operators → page bytes)
//!     ↓
//! [PageBuffer] (append + splice at insertion marks)
//!     ↓
//! [PdfWriter] (pages, fonts, images, bookmarks, xref, trailer)
//!     ↓
//! [ObjectSerializer] (one-line object syntax)
//!     ↓
//! file bytes
//! ```

mod buffer;
mod content_stream;
pub mod encoding;
mod font_manager;
mod font_metrics;
mod graphics_state;
mod image_handler;
mod links;
mod object_serializer;
mod outline_builder;
mod pdf_writer;
mod truetype;

pub use buffer::{Mark, OutputBuffer, PageBuffer};
pub use content_stream::{dash_array, ContentOp, DrawStyle, LineCap, LineJoin, PaintOp, TextArrayItem};
pub use font_manager::{
    CidSystemInfo, Font, FontCatalog, FontDefinition, FontDescriptor, FontKind, FontProgram, FontRegistry,
    StandardFontCatalog,
};
pub use font_metrics::{core_font, core_font_name};
pub use graphics_state::{Color, GraphicsState, LineStyle};
pub use image_handler::{
    image_file_type, ColorSpace, ImageDecoder, ImageError, ImageInfo, ImageSource, ImageType,
    StandardImageDecoder,
};
pub use links::{LinkDest, LinkId, LinkTable, LinkTarget, PageLink};
pub use object_serializer::ObjectSerializer;
pub use outline_builder::{OutlineBuilder, OutlineItem, OutlineLinks};
pub use pdf_writer::{compress_data, FinishedPage, ObjectWriter, PdfWriter, PdfWriterConfig, Resources, PRODUCER};
pub use truetype::{truetype_definition, truetype_definition_from_file};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_writer_reserves_pages_and_resources() {
        let writer = ObjectWriter::new();
        assert_eq!(writer.next_id(), 3);
        assert!(PageBuffer::new().is_empty());
        assert_eq!(ObjectSerializer::new().serialize(&ObjectSerializer::reference(2)), b"2 0 R".to_vec());
    }
}
