//! Pull-based pixel byte streams.

pub mod limit;

use crate::foundation::error::{MapError, MapResult};

/// A finite stream of raw pixel bytes delivered in arbitrarily sized chunks.
///
/// `Ok(None)` marks the end of the stream; callers must not pull again afterwards.
pub trait PixelSource {
    fn next_chunk(&mut self) -> MapResult<Option<Vec<u8>>>;
}

impl<S: PixelSource + ?Sized> PixelSource for Box<S> {
    fn next_chunk(&mut self) -> MapResult<Option<Vec<u8>>> {
        (**self).next_chunk()
    }
}

/// Serves an owned buffer in fixed-size pieces.
#[derive(Clone, Debug)]
pub struct ChunkedBytes {
    data: Vec<u8>,
    pos: usize,
    chunk_len: usize,
}

impl ChunkedBytes {
    pub fn new(data: Vec<u8>, chunk_len: usize) -> MapResult<Self> {
        if chunk_len == 0 {
            return Err(MapError::configuration("chunk length must be non-zero"));
        }
        Ok(Self {
            data,
            pos: 0,
            chunk_len,
        })
    }
}

impl PixelSource for ChunkedBytes {
    fn next_chunk(&mut self) -> MapResult<Option<Vec<u8>>> {
        if self.pos >= self.data.len() {
            return Ok(None);
        }
        let end = (self.pos + self.chunk_len).min(self.data.len());
        let chunk = self.data[self.pos..end].to_vec();
        self.pos = end;
        Ok(Some(chunk))
    }
}

/// Reverse the order of `stride`-byte rows in place.
pub fn flip_rows(data: &mut [u8], stride: usize) {
    if stride == 0 {
        return;
    }
    let rows = data.len() / stride;
    for top in 0..rows / 2 {
        let bottom = rows - 1 - top;
        let (head, tail) = data.split_at_mut(bottom * stride);
        head[top * stride..(top + 1) * stride].swap_with_slice(&mut tail[..stride]);
    }
}

/// Drain `source` into one buffer.
pub fn collect_all<S: PixelSource + ?Sized>(source: &mut S) -> MapResult<Vec<u8>> {
    let mut out = Vec::new();
    while let Some(chunk) = source.next_chunk()? {
        out.extend_from_slice(&chunk);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunked_bytes_serves_everything_once() {
        let mut src = ChunkedBytes::new((0u8..10).collect(), 4).unwrap();
        assert_eq!(src.next_chunk().unwrap(), Some(vec![0, 1, 2, 3]));
        assert_eq!(src.next_chunk().unwrap(), Some(vec![4, 5, 6, 7]));
        assert_eq!(src.next_chunk().unwrap(), Some(vec![8, 9]));
        assert_eq!(src.next_chunk().unwrap(), None);
        assert!(ChunkedBytes::new(vec![], 0).is_err());
    }

    #[test]
    fn flip_rows_reverses_row_order() {
        let mut data = vec![1, 1, 2, 2, 3, 3];
        flip_rows(&mut data, 2);
        assert_eq!(data, vec![3, 3, 2, 2, 1, 1]);

        let mut even = vec![1, 2, 3, 4];
        flip_rows(&mut even, 1);
        assert_eq!(even, vec![4, 3, 2, 1]);
    }
}
