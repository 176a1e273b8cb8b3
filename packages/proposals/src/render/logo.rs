// ABOUTME: Brand avatar decoding for the proposal header
// ABOUTME: Any PNG, JPEG, GIF, or WebP is flattened onto white and embedded as a Flate RGB XObject

use image::{DynamicImage, ImageFormat};
use lopdf::{dictionary, Stream};
use thiserror::Error;

/// Formats accepted as a brand avatar
pub const LOGO_FORMATS: [ImageFormat; 4] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

#[derive(Error, Debug)]
pub enum LogoError {
    #[error("unsupported image format")]
    UnsupportedFormat,
    #[error(transparent)]
    Decode(#[from] image::ImageError),
    #[error(transparent)]
    Pdf(#[from] lopdf::Error),
}

/// A decoded avatar ready to be placed on the page
#[derive(Debug, Clone)]
pub struct Logo {
    pub width: u32,
    pub height: u32,
    pub stream: Stream,
}

impl Logo {
    pub fn decode(bytes: &[u8]) -> Result<Self, LogoError> {
        let format = image::guess_format(bytes)?;
        if !LOGO_FORMATS.contains(&format) {
            return Err(LogoError::UnsupportedFormat);
        }
        let decoded = image::load_from_memory_with_format(bytes, format)?;
        let (width, height) = (decoded.width(), decoded.height());

        let mut stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            flatten_on_white(&decoded),
        );
        stream.compress()?;

        Ok(Self {
            width,
            height,
            stream,
        })
    }
}

/// RGB samples with any alpha composited over a white page
fn flatten_on_white(image: &DynamicImage) -> Vec<u8> {
    let rgba = image.to_rgba8();
    let mut samples = Vec::with_capacity(rgba.as_raw().len() / 4 * 3);
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = u16::from(a);
        for channel in [r, g, b] {
            let blended = (u16::from(channel) * alpha + 255 * (255 - alpha) + 127) / 255;
            samples.push(blended as u8);
        }
    }
    samples
}
