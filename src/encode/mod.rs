//! Encoder collaborators and output sinks.

pub mod buffered;
pub mod output;
pub mod png_stream;
pub mod sink;

use std::io::Write;

use crate::encode::buffered::BufferedImageEncoder;
use crate::encode::png_stream::PngStreamEncoder;
use crate::encode::sink::ImageEncoder;

/// Output image format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
}

impl ImageFormat {
    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }
}

/// Create the encoder for `format` writing to `out`.
///
/// PNG streams rows straight through; the other formats buffer the full image first.
pub fn create_encoder<W: Write + 'static>(
    format: ImageFormat,
    quality: f32,
    out: W,
) -> Box<dyn ImageEncoder> {
    match format {
        ImageFormat::Png => Box::new(PngStreamEncoder::new(out)),
        ImageFormat::Jpeg | ImageFormat::Webp => {
            Box::new(BufferedImageEncoder::new(out, format, quality))
        }
    }
}
