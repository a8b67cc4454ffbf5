use std::io::BufRead;

/// Splits a byte stream into lines terminated by `\n`. One `\r` directly
/// before the `\n` (or before the end of the stream) is stripped from the line.
///
/// A bare `\r` inside a line is payload. Ending a line only at `\n` keeps the
/// reader from fetching the next block to look past a trailing `\r`.
pub struct LineReader<R> {
    inner: R,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R) -> LineReader<R> {
        LineReader { inner }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Reads one line into `out`, without its terminator.
    ///
    /// At most `max_len` payload bytes are stored; the remainder of a longer
    /// line is consumed and dropped, so the next call starts at the next line.
    ///
    /// Returns the number of bytes consumed from the stream, terminator
    /// included. Zero means end of stream.
    pub fn read_line(&mut self, out: &mut Vec<u8>, max_len: usize) -> std::io::Result<usize> {
        out.clear();
        let mut consumed = 0;
        let mut payload_len = 0;
        let mut ends_with_cr = false;
        loop {
            let buf = match self.inner.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if buf.is_empty() {
                break;
            }

            let (payload, used, done) = match buf.iter().position(|&b| b == b'\n') {
                Some(i) => (&buf[..i], i + 1, true),
                None => (buf, buf.len(), false),
            };
            if let Some(&last) = payload.last() {
                ends_with_cr = last == b'\r';
            }
            payload_len += payload.len();
            append_bounded(out, payload, max_len);
            self.inner.consume(used);
            consumed += used;
            if done {
                break;
            }
        }
        // The `\r` is only in `out` when nothing was truncated.
        if ends_with_cr && out.len() == payload_len {
            out.pop();
        }
        Ok(consumed)
    }
}

fn append_bounded(out: &mut Vec<u8>, bytes: &[u8], max_len: usize) {
    let room = max_len.saturating_sub(out.len());
    out.extend_from_slice(&bytes[..bytes.len().min(room)]);
}

#[cfg(test)]
mod tests {
    use std::io::BufReader;

    use super::LineReader;

    fn lines(data: &[u8], capacity: usize, max_len: usize) -> Vec<(Vec<u8>, usize)> {
        let mut reader = LineReader::new(BufReader::with_capacity(capacity, data));
        let mut out = Vec::new();
        let mut res = Vec::new();
        loop {
            let n = reader.read_line(&mut out, max_len).unwrap();
            if n == 0 {
                break;
            }
            res.push((out.clone(), n));
        }
        res
    }

    #[test]
    fn test_terminators() {
        for capacity in [1, 2, 3, 7, 64] {
            let res = lines(b"one\ntwo\r\nthree\rfour\nfive\r", capacity, usize::MAX);
            assert_eq!(
                res,
                vec![
                    (b"one".to_vec(), 4),
                    (b"two".to_vec(), 5),
                    (b"three\rfour".to_vec(), 11),
                    (b"five".to_vec(), 5),
                ],
                "capacity {capacity}"
            );
        }
    }

    #[test]
    fn test_only_one_trailing_cr_is_stripped() {
        for capacity in [1, 2, 64] {
            let res = lines(b"a\r\r\n\r\nb\rc", capacity, usize::MAX);
            assert_eq!(
                res,
                vec![
                    (b"a\r".to_vec(), 4),
                    (vec![], 2),
                    (b"b\rc".to_vec(), 3),
                ],
                "capacity {capacity}"
            );
        }
    }

    #[test]
    fn test_empty_lines() {
        let res = lines(b"\n\r\n\na", 4, usize::MAX);
        assert_eq!(
            res,
            vec![
                (vec![], 1),
                (vec![], 2),
                (vec![], 1),
                (b"a".to_vec(), 1)
            ]
        );
        assert!(lines(b"", 4, 10).is_empty());
    }

    #[test]
    fn test_truncation_consumes_whole_line() {
        for capacity in [1, 5, 128] {
            let res = lines(b"short\nthis line is too long\r\nnext\n", capacity, 8);
            assert_eq!(
                res,
                vec![
                    (b"short".to_vec(), 6),
                    (b"this lin".to_vec(), 23),
                    (b"next".to_vec(), 5),
                ]
            );
        }
        // The `\r` falls past the limit; the stored prefix is kept whole.
        let res = lines(b"abc\r\nabcd\r\n", 64, 3);
        assert_eq!(res, vec![(b"abc".to_vec(), 5), (b"abc".to_vec(), 6)]);
    }

    #[test]
    fn test_zero_max_len_skips_line() {
        let res = lines(b"abc\ndef\n", 2, 0);
        assert_eq!(res, vec![(vec![], 4), (vec![], 4)]);
    }
}
