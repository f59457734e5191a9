use std::io::Write;

use crate::encode::ImageFormat;
use crate::encode::sink::{EncoderConfig, ImageEncoder};
use crate::foundation::error::{MapError, MapResult};

/// Collects the whole image, then encodes it with the `image` crate.
///
/// Used for formats without a row-streaming encoder (JPEG, WebP).
pub struct BufferedImageEncoder<W: Write> {
    out: W,
    format: ImageFormat,
    quality: f32,
    cfg: Option<EncoderConfig>,
    pixels: Vec<u8>,
}

impl<W: Write> BufferedImageEncoder<W> {
    pub fn new(out: W, format: ImageFormat, quality: f32) -> Self {
        Self {
            out,
            format,
            quality,
            cfg: None,
            pixels: Vec::new(),
        }
    }
}

impl<W: Write> ImageEncoder for BufferedImageEncoder<W> {
    fn begin(&mut self, cfg: &EncoderConfig) -> MapResult<()> {
        let len = usize::try_from(cfg.size().byte_len())
            .map_err(|_| MapError::encoding("image is too large to buffer"))?;
        self.pixels = Vec::with_capacity(len);
        self.cfg = Some(*cfg);
        Ok(())
    }

    fn write_rows(&mut self, rows: &[u8]) -> MapResult<()> {
        if self.cfg.is_none() {
            return Err(MapError::encoding("encoder was never started"));
        }
        self.pixels.extend_from_slice(rows);
        Ok(())
    }

    fn finish(&mut self) -> MapResult<()> {
        let cfg = self
            .cfg
            .take()
            .ok_or_else(|| MapError::encoding("encoder was never started"))?;
        if self.pixels.len() as u64 != cfg.size().byte_len() {
            return Err(MapError::encoding(format!(
                "expected {} bytes for {}x{}, got {}",
                cfg.size().byte_len(),
                cfg.width,
                cfg.height,
                self.pixels.len()
            )));
        }
        let pixels = std::mem::take(&mut self.pixels);

        match self.format {
            ImageFormat::Jpeg => {
                // JPEG has no alpha channel.
                let rgb: Vec<u8> = pixels
                    .chunks_exact(4)
                    .flat_map(|px| [px[0], px[1], px[2]])
                    .collect();
                let mut enc = image::codecs::jpeg::JpegEncoder::new_with_quality(
                    &mut self.out,
                    jpeg_quality(self.quality),
                );
                enc.encode(&rgb, cfg.width, cfg.height, image::ExtendedColorType::Rgb8)
                    .map_err(map_image_err)?;
            }
            ImageFormat::Webp => {
                image::codecs::webp::WebPEncoder::new_lossless(&mut self.out)
                    .encode(
                        &pixels,
                        cfg.width,
                        cfg.height,
                        image::ExtendedColorType::Rgba8,
                    )
                    .map_err(map_image_err)?;
            }
            ImageFormat::Png => {
                use image::ImageEncoder as _;
                image::codecs::png::PngEncoder::new(&mut self.out)
                    .write_image(
                        &pixels,
                        cfg.width,
                        cfg.height,
                        image::ExtendedColorType::Rgba8,
                    )
                    .map_err(map_image_err)?;
            }
        }
        self.out.flush()?;
        Ok(())
    }
}

/// Map a `(0, 1]` quality onto JPEG's `1..=100`.
pub(crate) fn jpeg_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

fn map_image_err(err: image::ImageError) -> MapError {
    match err {
        image::ImageError::IoError(e) => MapError::Io(e),
        other => MapError::encoding(other.to_string()),
    }
}
