//! A helper that turns any `ReadAt` implementation into a standard `std::io::Read`.

use crate::ReadAt;

/// Turns a `ReadAt` into a `std::io::Read`.
///
/// The adapter keeps its own cursor and reads sequentially from the underlying
/// source, so small artifacts (such as a block index) can be parsed with the
/// usual `read_exact` helpers.
pub struct ReadAdapter<R> {
    inner: R,
    pos: u64,
    /// Cached size of the inner `ReadAt`
    size: Option<u64>,
}

impl<R> ReadAdapter<R> {
    /// Creates a new `ReadAdapter` reading from position 0.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pos: 0,
            size: None,
        }
    }

    /// Returns the current read position.
    pub fn position(&self) -> u64 {
        self.pos
    }
}

impl<R: ReadAt> ReadAdapter<R> {
    fn size(&mut self) -> std::io::Result<u64> {
        if let Some(size) = self.size {
            Ok(size)
        } else {
            let size = self.inner.size()?;
            self.size = Some(size);
            Ok(size)
        }
    }

    /// Number of bytes between the cursor and the end of the source.
    pub fn remaining(&mut self) -> std::io::Result<u64> {
        Ok(self.size()?.saturating_sub(self.pos))
    }
}

impl<R: ReadAt> std::io::Read for ReadAdapter<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let available = self.remaining()?;
        let to_read = std::cmp::min(buf.len() as u64, available);
        if to_read == 0 {
            return Ok(0);
        }

        let bytes = self.inner.read_at(self.pos..self.pos + to_read)?;
        let bytes_read = bytes.len();
        buf[..bytes_read].copy_from_slice(&bytes);
        self.pos += bytes_read as u64;
        Ok(bytes_read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_read_adapter_basic() {
        let mut adapter = ReadAdapter::new(b"Hello, World!".to_vec());

        let mut buf = [0u8; 5];
        assert_eq!(adapter.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"Hello");
        assert_eq!(adapter.position(), 5);
        assert_eq!(adapter.remaining().unwrap(), 8);

        let mut rest = Vec::new();
        adapter.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b", World!");
        assert_eq!(adapter.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_read_exact_short_source() {
        let mut adapter = ReadAdapter::new(vec![1u8, 2, 3]);
        let mut buf = [0u8; 8];
        let err = adapter.read_exact(&mut buf).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }
}
