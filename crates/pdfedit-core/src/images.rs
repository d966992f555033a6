//! Raster payload embedding as image XObjects
//!
//! Two containers are accepted, told apart by their magic bytes: PNG is
//! decoded to 8-bit samples and re-compressed with Flate (alpha goes to an
//! SMask), JPEG is passed through untouched under DCTDecode.

use crate::error::{PdfEditError, Result};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegDecoder;
use image::{ExtendedColorType, ImageDecoder};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::io::{Cursor, Write};

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

/// Identify the container from its leading bytes
pub fn sniff(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.starts_with(PNG_MAGIC) {
        Some(ImageFormat::Png)
    } else if bytes.starts_with(JPEG_MAGIC) {
        Some(ImageFormat::Jpeg)
    } else {
        None
    }
}

fn flate_compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| PdfEditError::ImageError(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| PdfEditError::ImageError(e.to_string()))
}

/// Add the payload to `doc` as an image XObject and return its id
pub fn embed_image(doc: &mut Document, bytes: &[u8]) -> Result<ObjectId> {
    match sniff(bytes) {
        Some(ImageFormat::Png) => embed_png(doc, bytes),
        Some(ImageFormat::Jpeg) => embed_jpeg(doc, bytes),
        None => Err(PdfEditError::ImageError("unrecognized image format".into())),
    }
}

fn embed_jpeg(doc: &mut Document, bytes: &[u8]) -> Result<ObjectId> {
    let decoder = JpegDecoder::new(Cursor::new(bytes))
        .map_err(|e| PdfEditError::ImageError(e.to_string()))?;
    let (width, height) = decoder.dimensions();
    let color_space = match decoder.original_color_type() {
        ExtendedColorType::L8 => "DeviceGray",
        ExtendedColorType::Rgb8 => "DeviceRGB",
        ExtendedColorType::Cmyk8 => "DeviceCMYK",
        other => {
            return Err(PdfEditError::ImageError(format!(
                "unsupported JPEG color type {other:?}"
            )))
        }
    };

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
        "Filter" => "DCTDecode",
    };
    if color_space == "DeviceCMYK" {
        // Adobe writes inverted CMYK JPEGs
        dict.set(
            "Decode",
            vec![1.into(), 0.into(), 1.into(), 0.into(), 1.into(), 0.into(), 1.into(), 0.into()],
        );
    }
    Ok(doc.add_object(Stream::new(dict, bytes.to_vec()).with_compression(false)))
}

fn embed_png(doc: &mut Document, bytes: &[u8]) -> Result<ObjectId> {
    let mut decoder = png::Decoder::new(bytes);
    decoder.set_transformations(png::Transformations::normalize_to_color8());
    let mut reader = decoder
        .read_info()
        .map_err(|e| PdfEditError::ImageError(e.to_string()))?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let frame = reader
        .next_frame(&mut buf)
        .map_err(|e| PdfEditError::ImageError(e.to_string()))?;
    let pixels = &buf[..frame.buffer_size()];
    let (width, height) = (frame.width, frame.height);

    let (color, alpha, color_space): (Vec<u8>, Option<Vec<u8>>, &str) = match frame.color_type {
        png::ColorType::Rgb => (pixels.to_vec(), None, "DeviceRGB"),
        png::ColorType::Grayscale => (pixels.to_vec(), None, "DeviceGray"),
        png::ColorType::Rgba => {
            let mut rgb = Vec::with_capacity(pixels.len() / 4 * 3);
            let mut alpha = Vec::with_capacity(pixels.len() / 4);
            for px in pixels.chunks_exact(4) {
                rgb.extend_from_slice(&px[..3]);
                alpha.push(px[3]);
            }
            (rgb, Some(alpha), "DeviceRGB")
        }
        png::ColorType::GrayscaleAlpha => {
            let mut gray = Vec::with_capacity(pixels.len() / 2);
            let mut alpha = Vec::with_capacity(pixels.len() / 2);
            for px in pixels.chunks_exact(2) {
                gray.push(px[0]);
                alpha.push(px[1]);
            }
            (gray, Some(alpha), "DeviceGray")
        }
        png::ColorType::Indexed => {
            return Err(PdfEditError::ImageError(
                "indexed PNG was not expanded".into(),
            ))
        }
    };

    let smask_id = match alpha.filter(|a| a.iter().any(|&v| v != 255)) {
        Some(alpha) => {
            let smask = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width as i64,
                    "Height" => height as i64,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                    "Filter" => "FlateDecode",
                },
                flate_compress(&alpha)?,
            )
            .with_compression(false);
            Some(doc.add_object(smask))
        }
        None => None,
    };

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };
    if let Some(id) = smask_id {
        dict.set("SMask", Object::Reference(id));
    }
    let stream = Stream::new(dict, flate_compress(&color)?).with_compression(false);
    Ok(doc.add_object(stream))
}
