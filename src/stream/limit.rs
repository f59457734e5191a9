use crate::foundation::error::{MapError, MapResult};
use crate::stream::PixelSource;

/// Re-chunks a byte stream so every chunk is a whole number of rows.
///
/// Bytes that do not complete a row are held back and prefixed to the next input chunk. A short
/// remainder is only emitted once, as the final chunk at end of stream.
#[derive(Debug)]
pub struct RowLimiter<S> {
    inner: S,
    stride: usize,
    pending: Vec<u8>,
    finished: bool,
    emitted: u64,
}

impl<S> RowLimiter<S> {
    pub fn new(inner: S, stride: usize) -> MapResult<Self> {
        if stride == 0 {
            return Err(MapError::configuration("row stride must be non-zero"));
        }
        Ok(Self {
            inner,
            stride,
            pending: Vec::new(),
            finished: false,
            emitted: 0,
        })
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Bytes handed out so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    fn push(&mut self, chunk: Vec<u8>) -> Option<Vec<u8>> {
        if self.pending.is_empty() {
            self.pending = chunk;
        } else {
            self.pending.extend_from_slice(&chunk);
        }
        let aligned = self.pending.len() - self.pending.len() % self.stride;
        if aligned == 0 {
            return None;
        }
        let rest = self.pending.split_off(aligned);
        Some(std::mem::replace(&mut self.pending, rest))
    }
}

impl<S: PixelSource> PixelSource for RowLimiter<S> {
    fn next_chunk(&mut self) -> MapResult<Option<Vec<u8>>> {
        let chunk = self.next_aligned()?;
        if let Some(c) = &chunk {
            self.emitted += c.len() as u64;
        }
        Ok(chunk)
    }
}

impl<S: PixelSource> RowLimiter<S> {
    fn next_aligned(&mut self) -> MapResult<Option<Vec<u8>>> {
        while !self.finished {
            match self.inner.next_chunk()? {
                Some(chunk) => {
                    if let Some(rows) = self.push(chunk) {
                        return Ok(Some(rows));
                    }
                }
                None => {
                    self.finished = true;
                    if !self.pending.is_empty() {
                        return Ok(Some(std::mem::take(&mut self.pending)));
                    }
                }
            }
        }
        Ok(None)
    }
}
