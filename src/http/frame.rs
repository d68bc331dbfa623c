//! Header frame detection over an accumulating read buffer.
//!
//! The detector is fed the whole accumulation buffer after every socket read
//! and remembers how far it already scanned, so bytes are not rescanned and a
//! terminator split across two reads is still found.

use super::error::HttpError;

/// End of the header block.
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Default cap on the header block size.
pub const MAX_HEADER_BYTES: usize = 32 * 1024;

/// Outcome of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// More bytes are needed.
    Incomplete,
    /// `buf[..head_end]` is the header block; body bytes start at `body_start`.
    Complete { head_end: usize, body_start: usize },
}

#[derive(Debug, Clone)]
pub struct FrameDetector {
    offset: usize,
    limit: usize,
}

impl Default for FrameDetector {
    fn default() -> Self {
        Self::new(MAX_HEADER_BYTES)
    }
}

impl FrameDetector {
    pub fn new(limit: usize) -> Self {
        Self { offset: 0, limit }
    }

    /// Position the next scan starts from.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn reset(&mut self) {
        self.offset = 0;
    }

    /// Look for the header terminator in `buf`.
    ///
    /// Fails with [`HttpError::HeaderTooLarge`] once `buf` grows past the
    /// limit without a terminator, or when the terminator lies past it.
    pub fn scan(&mut self, buf: &[u8]) -> Result<Frame, HttpError> {
        let start = self.offset.min(buf.len());
        let found = buf[start..]
            .windows(HEADER_TERMINATOR.len())
            .position(|window| window == HEADER_TERMINATOR);

        match found {
            Some(pos) => {
                let head_end = start + pos;
                if head_end > self.limit {
                    return Err(HttpError::HeaderTooLarge { limit: self.limit });
                }
                let body_start = head_end + HEADER_TERMINATOR.len();
                self.offset = body_start;
                Ok(Frame::Complete {
                    head_end,
                    body_start,
                })
            }
            None if buf.len() > self.limit => Err(HttpError::HeaderTooLarge { limit: self.limit }),
            None => {
                // keep the last three bytes in range: they may open a terminator
                self.offset = buf.len().saturating_sub(HEADER_TERMINATOR.len() - 1);
                Ok(Frame::Incomplete)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUEST: &[u8] = b"GET /path?q=1 HTTP/1.1\r\nHost: example.org\r\nX-Long: abcdefghij\r\n\r\nBODY";

    fn feed(pieces: &[&[u8]]) -> (Vec<u8>, Frame) {
        let mut detector = FrameDetector::default();
        let mut buf = Vec::new();
        for piece in pieces {
            buf.extend_from_slice(piece);
            let frame = detector.scan(&buf).unwrap();
            assert!(detector.offset() <= buf.len());
            if frame != Frame::Incomplete {
                return (buf, frame);
            }
        }
        (buf, Frame::Incomplete)
    }

    #[test]
    fn split_position_does_not_change_the_head() {
        let (buf, whole) = feed(&[REQUEST]);
        let Frame::Complete { head_end, body_start } = whole else {
            panic!("terminator not found");
        };
        let expected = buf[..head_end].to_vec();
        assert_eq!(&buf[body_start..], b"BODY");

        for split in 1..REQUEST.len() {
            let (buf, frame) = feed(&[&REQUEST[..split], &REQUEST[split..]]);
            let Frame::Complete { head_end, .. } = frame else {
                panic!("terminator not found for split at {}", split);
            };
            assert_eq!(buf[..head_end], expected[..], "split at {}", split);
        }
    }

    #[test]
    fn byte_at_a_time() {
        let pieces: Vec<&[u8]> = REQUEST.chunks(1).collect();
        let (buf, frame) = feed(&pieces);
        let Frame::Complete { head_end, body_start } = frame else {
            panic!("terminator not found");
        };
        assert!(buf[..head_end].ends_with(b"abcdefghij"));
        assert_eq!(body_start, buf.len());
    }

    #[test]
    fn oversized_without_terminator_is_rejected() {
        let mut detector = FrameDetector::default();
        let mut buf = b"GET / HTTP/1.1\r\nX-Fill: ".to_vec();
        buf.resize(MAX_HEADER_BYTES + 1, b'a');
        let err = detector.scan(&buf).unwrap_err();
        assert!(matches!(err, HttpError::HeaderTooLarge { limit: MAX_HEADER_BYTES }));
    }

    #[test]
    fn block_at_the_limit_is_accepted() {
        let mut detector = FrameDetector::default();
        let mut buf = b"GET / HTTP/1.1\r\nX-Fill: ".to_vec();
        buf.resize(MAX_HEADER_BYTES, b'a');
        buf.extend_from_slice(HEADER_TERMINATOR);
        buf.extend_from_slice(b"trailing body bytes");
        assert_eq!(
            detector.scan(&buf).unwrap(),
            Frame::Complete {
                head_end: MAX_HEADER_BYTES,
                body_start: MAX_HEADER_BYTES + 4
            }
        );
    }

    #[test]
    fn incomplete_keeps_scanning_position() {
        let mut detector = FrameDetector::default();
        assert_eq!(detector.scan(b"GET / HTTP/1.1\r\n\r").unwrap(), Frame::Incomplete);
        assert_eq!(detector.offset(), 14);
        assert_eq!(detector.scan(b"").unwrap(), Frame::Incomplete);
        assert_eq!(detector.offset(), 0);
    }
}
