use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use crate::encode::sink::{EncoderConfig, ImageEncoder};
use crate::foundation::error::{MapError, MapResult};

type SinkError = Rc<RefCell<Option<io::Error>>>;

/// Writer wrapper that remembers the first sink failure.
///
/// The png stream writer owns its sink and writes the trailer and drops it without reporting
/// errors, so failures past that point are only visible through the shared slot. Dropping flushes
/// the inner writer.
struct TrackedSink<W: Write> {
    inner: W,
    error: SinkError,
}

impl<W: Write> TrackedSink<W> {
    fn record(&self, err: &io::Error) {
        let mut slot = self.error.borrow_mut();
        if slot.is_none() {
            *slot = Some(io::Error::new(err.kind(), err.to_string()));
        }
    }
}

impl<W: Write> Write for TrackedSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf).inspect_err(|e| self.record(e))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().inspect_err(|e| self.record(e))
    }
}

impl<W: Write> Drop for TrackedSink<W> {
    fn drop(&mut self) {
        if let Err(e) = self.inner.flush() {
            self.record(&e);
        }
    }
}

enum State<W: Write + 'static> {
    Ready(TrackedSink<W>),
    Streaming(png::StreamWriter<'static, TrackedSink<W>>),
    Done,
}

/// PNG encoder that compresses rows as they arrive instead of buffering the image.
///
/// The underlying writer is owned for the whole encode; an owned stream writer cannot borrow it.
/// `finish` flushes the writer and reports any failure the sink hit on the way.
pub struct PngStreamEncoder<W: Write + 'static> {
    state: State<W>,
    sink_error: SinkError,
}

impl<W: Write + 'static> PngStreamEncoder<W> {
    pub fn new(out: W) -> Self {
        let sink_error = SinkError::default();
        Self {
            state: State::Ready(TrackedSink {
                inner: out,
                error: Rc::clone(&sink_error),
            }),
            sink_error,
        }
    }
}

impl<W: Write + 'static> ImageEncoder for PngStreamEncoder<W> {
    fn begin(&mut self, cfg: &EncoderConfig) -> MapResult<()> {
        let State::Ready(out) = std::mem::replace(&mut self.state, State::Done) else {
            return Err(MapError::encoding("png encoder already started"));
        };
        let mut encoder = png::Encoder::new(out, cfg.width, cfg.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let stream = encoder
            .write_header()
            .and_then(|w| w.into_stream_writer())
            .map_err(map_png_err)?;
        self.state = State::Streaming(stream);
        Ok(())
    }

    fn write_rows(&mut self, rows: &[u8]) -> MapResult<()> {
        let State::Streaming(stream) = &mut self.state else {
            return Err(MapError::encoding("png encoder is not accepting rows"));
        };
        stream.write_all(rows)?;
        Ok(())
    }

    fn finish(&mut self) -> MapResult<()> {
        let State::Streaming(stream) = std::mem::replace(&mut self.state, State::Done) else {
            return Err(MapError::encoding("png encoder was never started"));
        };
        // Consuming the stream writer also drops the sink, which flushes it.
        let finished = stream.finish().map_err(map_png_err);
        if let Some(e) = self.sink_error.borrow_mut().take() {
            return Err(MapError::Io(e));
        }
        finished
    }
}

fn map_png_err(err: png::EncodingError) -> MapError {
    match err {
        png::EncodingError::IoError(e) => MapError::Io(e),
        other => MapError::encoding(format!("png: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::foundation::core::PixelSize;

    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn streams_rows_into_a_decodable_png() {
        let size = PixelSize::new(3, 2);
        let buf = SharedBuf::default();
        let mut enc = PngStreamEncoder::new(buf.clone());
        enc.begin(&EncoderConfig::rgba8(size)).unwrap();
        enc.write_rows(&[255, 0, 0, 255].repeat(3)).unwrap();
        enc.write_rows(&[0, 0, 255, 128].repeat(3)).unwrap();
        enc.finish().unwrap();

        let bytes = buf.0.borrow().clone();
        let img = image::load_from_memory_with_format(&bytes, image::ImageFormat::Png)
            .unwrap()
            .to_rgba8();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(2, 0).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(0, 1).0, [0, 0, 255, 128]);
    }

    struct DiskFull;

    impl Write for DiskFull {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::other("disk full"))
        }
    }

    #[test]
    fn buffered_sink_failure_surfaces_at_finish() {
        let size = PixelSize::new(2, 2);
        let mut enc = PngStreamEncoder::new(std::io::BufWriter::new(DiskFull));
        enc.begin(&EncoderConfig::rgba8(size)).unwrap();
        enc.write_rows(&[7; 16]).unwrap();

        let err = enc.finish().unwrap_err();
        assert!(matches!(err, MapError::Io(_)), "{err:?}");
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn unbuffered_sink_failure_is_an_io_error() {
        let mut enc = PngStreamEncoder::new(DiskFull);
        assert!(matches!(
            enc.begin(&EncoderConfig::rgba8(PixelSize::new(1, 1))),
            Err(MapError::Io(_))
        ));
    }

    #[test]
    fn misuse_is_reported() {
        let mut enc = PngStreamEncoder::new(Vec::new());
        assert!(enc.write_rows(&[0; 4]).is_err());
        assert!(enc.finish().is_err());
    }
}
