//! Image handling for PDF generation.
//!
//! Images are represented as XObjects. JPEG data is embedded as-is with the
//! DCTDecode filter; PNG image data chunks are embedded as-is with FlateDecode
//! and a PNG predictor. Other formats supported by the `image` crate are
//! decoded to RGB and recompressed.
//!
//! # Color Spaces
//!
//! - DeviceRGB (3 components)
//! - DeviceGray (1 component)
//! - DeviceCMYK (4 components)
//! - Indexed over DeviceRGB (palette images)

use super::object_serializer::ObjectSerializer as S;
use crate::object::Object;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

/// Errors raised while loading an image.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// Unsupported image format
    #[error("Unsupported image type: {0}")]
    UnsupportedFormat(String),

    /// Failed to decode image
    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    /// Failed to compress image data
    #[error("Compression error: {0}")]
    CompressionError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Invalid image data
    #[error("Invalid image data: {0}")]
    InvalidData(String),
}

/// Image file types the decoder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageType {
    /// JPEG image (DCTDecode filter)
    Jpeg,
    /// PNG image (FlateDecode filter)
    Png,
    /// GIF image, decoded to RGB
    Gif,
}

impl ImageType {
    /// Short lowercase name (`jpeg`, `png`, `gif`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageType::Jpeg => "jpeg",
            ImageType::Png => "png",
            ImageType::Gif => "gif",
        }
    }

    /// Parse a type name or file extension, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageType::Jpeg),
            "png" => Some(ImageType::Png),
            "gif" => Some(ImageType::Gif),
            _ => None,
        }
    }

    /// Parse a MIME type such as `image/png`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        mime.to_ascii_lowercase()
            .strip_prefix("image/")
            .and_then(Self::from_name)
    }
}

/// Detect the image type from a MIME type, falling back to the file
/// extension.
pub fn image_file_type(file: Option<&str>, mime: Option<&str>) -> Option<ImageType> {
    if let Some(t) = mime.and_then(ImageType::from_mime) {
        return Some(t);
    }
    let file = file?;
    let ext = Path::new(file).extension()?.to_str()?;
    ImageType::from_name(ext)
}

/// Color space for image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    /// Grayscale (1 component per pixel)
    DeviceGray,
    /// RGB color (3 components per pixel)
    DeviceRGB,
    /// CMYK color (4 components per pixel)
    DeviceCMYK,
    /// Palette indices into an RGB lookup table
    Indexed,
}

impl ColorSpace {
    /// Get the number of color components.
    pub fn components(&self) -> u8 {
        match self {
            ColorSpace::DeviceGray | ColorSpace::Indexed => 1,
            ColorSpace::DeviceRGB => 3,
            ColorSpace::DeviceCMYK => 4,
        }
    }

    /// Get the PDF name for this color space.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            ColorSpace::DeviceGray => "DeviceGray",
            ColorSpace::DeviceRGB => "DeviceRGB",
            ColorSpace::DeviceCMYK => "DeviceCMYK",
            ColorSpace::Indexed => "Indexed",
        }
    }
}

/// Where an image comes from. The key deduplicates embeddings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Image file on disk
    File(PathBuf),
    /// In-memory image with a caller chosen name
    Bytes {
        /// Name used for deduplication and type detection
        name: String,
        /// Encoded image data
        data: Vec<u8>,
    },
}

impl ImageSource {
    /// Identifier used to embed identical sources only once.
    pub fn key(&self) -> String {
        match self {
            ImageSource::File(path) => path.to_string_lossy().into_owned(),
            ImageSource::Bytes { name, .. } => name.clone(),
        }
    }

    /// Encoded bytes of the image.
    pub fn read(&self) -> Result<Vec<u8>, ImageError> {
        match self {
            ImageSource::File(path) => std::fs::read(path)
                .map_err(|e| ImageError::IoError(format!("{}: {}", path.display(), e))),
            ImageSource::Bytes { data, .. } => Ok(data.clone()),
        }
    }
}

impl From<&str> for ImageSource {
    fn from(path: &str) -> Self {
        ImageSource::File(PathBuf::from(path))
    }
}

/// Decoded image parameters and data, ready to become an XObject.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    /// Width in pixels
    pub w: u32,
    /// Height in pixels
    pub h: u32,
    /// Color space
    pub cs: ColorSpace,
    /// Bits per component
    pub bpc: u8,
    /// Stream filter name
    pub filter: Option<&'static str>,
    /// PNG predictor parameters (colors, columns)
    pub predictor: Option<(u8, u32)>,
    /// Image data, released once written
    pub data: Option<Vec<u8>>,
    /// RGB palette for indexed images
    pub palette: Vec<u8>,
    /// Color key mask values
    pub transparency: Option<Vec<u16>>,
    /// Resource index, used as `/I{i}`
    pub i: usize,
    /// Object number, assigned at serialization
    pub n: u32,
}

impl ImageInfo {
    /// XObject stream for this image. Takes the data out of `self`.
    pub fn take_xobject(&mut self, palette_ref: Option<u32>) -> Object {
        let mut entries = vec![
            ("Type", S::name("XObject")),
            ("Subtype", S::name("Image")),
            ("Width", S::integer(i64::from(self.w))),
            ("Height", S::integer(i64::from(self.h))),
        ];
        match (self.cs, palette_ref) {
            (ColorSpace::Indexed, Some(pal)) => entries.push((
                "ColorSpace",
                S::array(vec![
                    S::name("Indexed"),
                    S::name("DeviceRGB"),
                    S::integer((self.palette.len() / 3) as i64 - 1),
                    S::reference(pal),
                ]),
            )),
            (cs, _) => {
                entries.push(("ColorSpace", S::name(cs.pdf_name())));
                if cs == ColorSpace::DeviceCMYK {
                    entries.push((
                        "Decode",
                        S::array([1, 0, 1, 0, 1, 0, 1, 0].iter().map(|v| S::integer(*v)).collect()),
                    ));
                }
            },
        }
        entries.push(("BitsPerComponent", S::integer(i64::from(self.bpc))));
        if let Some(filter) = self.filter {
            entries.push(("Filter", S::name(filter)));
        }
        if let Some((colors, columns)) = self.predictor {
            entries.push((
                "DecodeParms",
                S::dict(vec![
                    ("Predictor", S::integer(15)),
                    ("Colors", S::integer(i64::from(colors))),
                    ("BitsPerComponent", S::integer(i64::from(self.bpc))),
                    ("Columns", S::integer(i64::from(columns))),
                ]),
            ));
        }
        if let Some(trns) = &self.transparency {
            let mask = trns
                .iter()
                .flat_map(|v| [S::integer(i64::from(*v)), S::integer(i64::from(*v))])
                .collect();
            entries.push(("Mask", S::array(mask)));
        }
        S::stream(entries, self.data.take().unwrap_or_default())
    }
}

/// Decodes image files into [`ImageInfo`].
pub trait ImageDecoder {
    /// Decode `source`, which has already been identified as `kind`.
    fn decode(&self, source: &ImageSource, kind: ImageType) -> Result<ImageInfo, ImageError>;
}

/// Default decoder: JPEG and PNG headers are parsed directly, GIF goes
/// through the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardImageDecoder;

impl ImageDecoder for StandardImageDecoder {
    fn decode(&self, source: &ImageSource, kind: ImageType) -> Result<ImageInfo, ImageError> {
        let data = source.read()?;
        match kind {
            ImageType::Jpeg => parse_jpeg(data),
            ImageType::Png => parse_png(&data),
            ImageType::Gif => decode_with_image_crate(&data, image::ImageFormat::Gif),
        }
    }
}

fn empty_info(w: u32, h: u32, cs: ColorSpace, bpc: u8) -> ImageInfo {
    ImageInfo {
        w,
        h,
        cs,
        bpc,
        filter: None,
        predictor: None,
        data: None,
        palette: Vec::new(),
        transparency: None,
        i: 0,
        n: 0,
    }
}

/// Read dimensions and color space from a JPEG frame header.
pub fn parse_jpeg(data: Vec<u8>) -> Result<ImageInfo, ImageError> {
    if data.len() < 2 || data[0] != 0xFF || data[1] != 0xD8 {
        return Err(ImageError::InvalidData("Not a valid JPEG".to_string()));
    }

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }

        let marker = data[pos + 1];
        pos += 2;

        if marker == 0xFF || marker == 0x00 {
            continue;
        }

        // Start of frame markers
        if matches!(
            marker,
            0xC0 | 0xC1 | 0xC2 | 0xC3 | 0xC5 | 0xC6 | 0xC7 | 0xC9 | 0xCA | 0xCB | 0xCD | 0xCE | 0xCF
        ) {
            if pos + 7 >= data.len() {
                return Err(ImageError::InvalidData("Truncated JPEG header".to_string()));
            }

            let precision = data[pos + 2];
            let height = u32::from(u16::from_be_bytes([data[pos + 3], data[pos + 4]]));
            let width = u32::from(u16::from_be_bytes([data[pos + 5], data[pos + 6]]));
            let color_space = match data[pos + 7] {
                3 => ColorSpace::DeviceRGB,
                4 => ColorSpace::DeviceCMYK,
                _ => ColorSpace::DeviceGray,
            };

            let mut info = empty_info(width, height, color_space, if precision == 0 { 8 } else { precision });
            info.filter = Some("DCTDecode");
            info.data = Some(data);
            return Ok(info);
        }

        if pos + 2 > data.len() {
            break;
        }
        let length = u16::from_be_bytes([data[pos], data[pos + 1]]) as usize;
        pos += length;
    }

    Err(ImageError::InvalidData("Could not find JPEG dimensions".to_string()))
}

const PNG_SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";

fn invalid(msg: &str) -> ImageError {
    ImageError::InvalidData(msg.to_string())
}

/// Parse a PNG file, keeping the compressed image data as-is.
pub fn parse_png(data: &[u8]) -> Result<ImageInfo, ImageError> {
    let truncated = |_| invalid("Incorrect PNG file");
    let mut r = Cursor::new(data);

    let mut signature = [0u8; 8];
    r.read_exact(&mut signature).map_err(|_| invalid("Not a PNG file"))?;
    if &signature != PNG_SIGNATURE {
        return Err(invalid("Not a PNG file"));
    }

    let _ihdr_len = r.read_u32::<BigEndian>().map_err(truncated)?;
    let mut chunk = [0u8; 4];
    r.read_exact(&mut chunk).map_err(truncated)?;
    if &chunk != b"IHDR" {
        return Err(invalid("Incorrect PNG file"));
    }
    let w = r.read_u32::<BigEndian>().map_err(truncated)?;
    let h = r.read_u32::<BigEndian>().map_err(truncated)?;
    let bpc = r.read_u8().map_err(truncated)?;
    if bpc > 8 {
        return Err(invalid("16-bit depth not supported"));
    }
    let ct = r.read_u8().map_err(truncated)?;
    let cs = match ct {
        0 => ColorSpace::DeviceGray,
        2 => ColorSpace::DeviceRGB,
        3 => ColorSpace::Indexed,
        _ => return Err(invalid("Alpha channel not supported")),
    };
    if r.read_u8().map_err(truncated)? != 0 {
        return Err(invalid("Unknown compression method"));
    }
    if r.read_u8().map_err(truncated)? != 0 {
        return Err(invalid("Unknown filter method"));
    }
    if r.read_u8().map_err(truncated)? != 0 {
        return Err(invalid("Interlacing not supported"));
    }
    let _crc = r.read_u32::<BigEndian>().map_err(truncated)?;

    let mut palette = Vec::new();
    let mut transparency = None;
    let mut idat = Vec::new();
    loop {
        let Ok(len) = r.read_u32::<BigEndian>() else {
            break;
        };
        if r.read_exact(&mut chunk).is_err() {
            break;
        }
        let mut body = vec![0u8; len as usize];
        r.read_exact(&mut body).map_err(truncated)?;
        let _ = r.read_u32::<BigEndian>();
        match &chunk {
            b"PLTE" => palette = body,
            b"tRNS" => {
                transparency = match ct {
                    0 if body.len() >= 2 => Some(vec![u16::from(body[1])]),
                    2 if body.len() >= 6 => Some(vec![u16::from(body[1]), u16::from(body[3]), u16::from(body[5])]),
                    3 => body.iter().position(|&a| a == 0).map(|p| vec![p as u16]),
                    _ => None,
                };
            },
            b"IDAT" => idat.extend_from_slice(&body),
            b"IEND" => break,
            _ => {},
        }
    }

    if cs == ColorSpace::Indexed && palette.is_empty() {
        return Err(invalid("Missing palette"));
    }

    let mut info = empty_info(w, h, cs, bpc);
    info.filter = Some("FlateDecode");
    info.predictor = Some((if ct == 2 { 3 } else { 1 }, w));
    info.data = Some(idat);
    info.palette = palette;
    info.transparency = transparency;
    Ok(info)
}

/// Decode any format the `image` crate supports into flate-compressed RGB.
pub fn decode_with_image_crate(data: &[u8], format: image::ImageFormat) -> Result<ImageInfo, ImageError> {
    let img = image::load_from_memory_with_format(data, format)
        .map_err(|e| ImageError::DecodeError(e.to_string()))?;
    let rgb = img.to_rgb8();
    let (w, h) = rgb.dimensions();
    let mut info = empty_info(w, h, ColorSpace::DeviceRGB, 8);
    info.filter = Some("FlateDecode");
    info.data = Some(compress_image_data(rgb.as_raw())?);
    Ok(info)
}

/// Compress image data using Flate.
fn compress_image_data(data: &[u8]) -> Result<Vec<u8>, ImageError> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| ImageError::CompressionError(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| ImageError::CompressionError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_header(ct: u8, bpc: u8, interlace: u8) -> Vec<u8> {
        let mut png = PNG_SIGNATURE.to_vec();
        png.extend_from_slice(&13u32.to_be_bytes());
        png.extend_from_slice(b"IHDR");
        png.extend_from_slice(&2u32.to_be_bytes());
        png.extend_from_slice(&3u32.to_be_bytes());
        png.extend_from_slice(&[bpc, ct, 0, 0, interlace]);
        png.extend_from_slice(&[0, 0, 0, 0]);
        png
    }

    fn chunk(png: &mut Vec<u8>, kind: &[u8; 4], body: &[u8]) {
        png.extend_from_slice(&(body.len() as u32).to_be_bytes());
        png.extend_from_slice(kind);
        png.extend_from_slice(body);
        png.extend_from_slice(&[0, 0, 0, 0]);
    }

    #[test]
    fn test_image_file_type_by_extension() {
        assert_eq!(image_file_type(Some("/tmp/logo.gif"), None), Some(ImageType::Gif));
        assert_eq!(image_file_type(Some("/tmp/logo.PNG"), None), Some(ImageType::Png));
        assert_eq!(image_file_type(Some("/tmp/logo.jpg"), None), Some(ImageType::Jpeg));
        assert_eq!(image_file_type(Some("/tmp/logo.jpeg"), None).map(|t| t.as_str()), Some("jpeg"));
        assert_eq!(image_file_type(Some("/tmp/logo"), None), None);
        assert_eq!(image_file_type(Some(""), None), None);
        assert_eq!(image_file_type(None, None), None);
    }

    #[test]
    fn test_image_file_type_by_mime() {
        assert_eq!(image_file_type(None, Some("image/gif")), Some(ImageType::Gif));
        assert_eq!(image_file_type(None, Some("image/jpeg")), Some(ImageType::Jpeg));
        assert_eq!(image_file_type(Some("/tmp/logo.gif"), Some("image/png")), Some(ImageType::Png));
        assert_eq!(image_file_type(None, Some("text/html")), None);
    }

    #[test]
    fn test_parse_png_rgb() {
        let mut png = png_header(2, 8, 0);
        chunk(&mut png, b"tRNS", &[0, 1, 0, 2, 0, 3]);
        chunk(&mut png, b"IDAT", b"abc");
        chunk(&mut png, b"IDAT", b"def");
        chunk(&mut png, b"IEND", b"");

        let info = parse_png(&png).unwrap();
        assert_eq!((info.w, info.h, info.bpc), (2, 3, 8));
        assert_eq!(info.cs, ColorSpace::DeviceRGB);
        assert_eq!(info.predictor, Some((3, 2)));
        assert_eq!(info.data.as_deref(), Some(&b"abcdef"[..]));
        assert_eq!(info.transparency, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_parse_png_errors() {
        let msg = |data: &[u8]| format!("{}", parse_png(data).unwrap_err());
        assert!(msg(b"GIF89a").contains("Not a PNG file"));
        assert!(msg(&png_header(2, 16, 0)).contains("16-bit depth not supported"));
        assert!(msg(&png_header(6, 8, 0)).contains("Alpha channel not supported"));
        assert!(msg(&png_header(2, 8, 1)).contains("Interlacing not supported"));
        assert!(msg(&png_header(3, 8, 0)).contains("Missing palette"));
    }

    #[test]
    fn test_indexed_xobject() {
        let mut png = png_header(3, 8, 0);
        chunk(&mut png, b"PLTE", &[0, 0, 0, 255, 255, 255]);
        chunk(&mut png, b"tRNS", &[255, 0]);
        chunk(&mut png, b"IDAT", b"x");
        let mut info = parse_png(&png).unwrap();
        assert_eq!(info.transparency, Some(vec![1]));

        let xobject = S::new().serialize_to_string(&info.take_xobject(Some(9)));
        assert!(xobject.contains("/ColorSpace [/Indexed /DeviceRGB 1 9 0 R]"));
        assert!(xobject.contains("/Mask [1 1]"));
        assert!(xobject.contains("/DecodeParms <</Predictor 15 /Colors 1 /BitsPerComponent 8 /Columns 2>>"));
        assert!(info.data.is_none());
    }

    #[test]
    fn test_parse_jpeg_header() {
        let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00];
        jpeg.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08, 0x00, 0x20, 0x00, 0x40, 0x04]);
        jpeg.extend_from_slice(&[0u8; 12]);
        let info = parse_jpeg(jpeg).unwrap();
        assert_eq!((info.w, info.h), (64, 32));
        assert_eq!(info.cs, ColorSpace::DeviceCMYK);
        assert_eq!(info.filter, Some("DCTDecode"));
    }

    #[test]
    fn test_invalid_jpeg_header() {
        assert!(parse_jpeg(vec![0x00, 0x01, 0x02]).is_err());
    }

    #[test]
    fn test_cmyk_decode_array() {
        let mut info = empty_info(1, 1, ColorSpace::DeviceCMYK, 8);
        let s = S::new().serialize_to_string(&info.take_xobject(None));
        assert!(s.contains("/Decode [1 0 1 0 1 0 1 0]"));
    }
}
