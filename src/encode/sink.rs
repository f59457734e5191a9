use crate::foundation::core::PixelSize;
use crate::foundation::error::{MapError, MapResult};

/// Channel layout of the bytes handed to an encoder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ChannelLayout {
    /// 8-bit straight-alpha RGBA.
    #[default]
    Rgba8,
}

/// Configuration provided to an [`ImageEncoder`] before any rows arrive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncoderConfig {
    pub width: u32,
    pub height: u32,
    pub layout: ChannelLayout,
}

impl EncoderConfig {
    pub fn rgba8(size: PixelSize) -> Self {
        Self {
            width: size.width,
            height: size.height,
            layout: ChannelLayout::Rgba8,
        }
    }

    pub fn size(&self) -> PixelSize {
        PixelSize::new(self.width, self.height)
    }
}

/// Encoder contract for one image delivered as top-to-bottom rows.
///
/// `write_rows` receives whole rows in image order; the total across calls is exactly
/// `width * height * 4` bytes.
pub trait ImageEncoder {
    fn begin(&mut self, cfg: &EncoderConfig) -> MapResult<()>;
    fn write_rows(&mut self, rows: &[u8]) -> MapResult<()>;
    fn finish(&mut self) -> MapResult<()>;
}

impl<E: ImageEncoder + ?Sized> ImageEncoder for Box<E> {
    fn begin(&mut self, cfg: &EncoderConfig) -> MapResult<()> {
        (**self).begin(cfg)
    }

    fn write_rows(&mut self, rows: &[u8]) -> MapResult<()> {
        (**self).write_rows(rows)
    }

    fn finish(&mut self) -> MapResult<()> {
        (**self).finish()
    }
}

/// In-memory encoder for tests and debugging; keeps the raw bytes.
#[derive(Debug, Default)]
pub struct InMemoryEncoder {
    cfg: Option<EncoderConfig>,
    data: Vec<u8>,
    chunk_lens: Vec<usize>,
    finished: bool,
}

impl InMemoryEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<EncoderConfig> {
        self.cfg
    }

    /// Raw bytes in arrival order.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Length of each `write_rows` call.
    pub fn chunk_lens(&self) -> &[usize] {
        &self.chunk_lens
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl ImageEncoder for InMemoryEncoder {
    fn begin(&mut self, cfg: &EncoderConfig) -> MapResult<()> {
        self.cfg = Some(*cfg);
        self.data.clear();
        self.chunk_lens.clear();
        self.finished = false;
        Ok(())
    }

    fn write_rows(&mut self, rows: &[u8]) -> MapResult<()> {
        if self.cfg.is_none() || self.finished {
            return Err(MapError::encoding("in-memory encoder is not accepting rows"));
        }
        self.data.extend_from_slice(rows);
        self.chunk_lens.push(rows.len());
        Ok(())
    }

    fn finish(&mut self) -> MapResult<()> {
        self.finished = true;
        Ok(())
    }
}
