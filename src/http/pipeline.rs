//! Response body pipeline.
//!
//! Body bytes written by a handler pass through an ordered list of encoder
//! layers, innermost first, before they reach the socket:
//!
//! ```text
//! handler bytes → [gzip | deflate] → [chunked] → socket
//! ```
//!
//! Compression sits inside the chunk payload, so the chunk framing is what
//! reaches the wire.

use std::io::{self, Write};

use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;

/// Negotiated response content coding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentEncoding {
    #[default]
    Identity,
    Gzip,
    Deflate,
}

impl ContentEncoding {
    /// Pick a coding from a request `Accept-Encoding` value, gzip first.
    pub fn negotiate(accept_encoding: Option<&str>) -> Self {
        let Some(accept) = accept_encoding else {
            return Self::Identity;
        };
        let accept = accept.to_ascii_lowercase();
        if accept.contains("gzip") {
            Self::Gzip
        } else if accept.contains("deflate") {
            Self::Deflate
        } else {
            Self::Identity
        }
    }

    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            Self::Identity => None,
            Self::Gzip => Some("gzip"),
            Self::Deflate => Some("deflate"),
        }
    }
}

/// One stage of the output pipeline.
pub trait EncoderLayer: Send {
    /// Transform a slice of body bytes. May return nothing while buffering.
    fn encode(&mut self, data: &[u8]) -> io::Result<Vec<u8>>;

    /// Emit whatever the layer still holds plus its end-of-stream marker.
    fn finish(&mut self) -> io::Result<Vec<u8>>;
}

/// `<hex-length>\r\n<payload>\r\n` per write, `0\r\n\r\n` at the end.
#[derive(Debug, Default)]
pub struct ChunkedLayer;

impl EncoderLayer for ChunkedLayer {
    fn encode(&mut self, data: &[u8]) -> io::Result<Vec<u8>> {
        // an empty chunk would terminate the body
        if data.is_empty() {
            return Ok(Vec::new());
        }
        let mut out = Vec::with_capacity(data.len() + 12);
        write!(out, "{:x}\r\n", data.len())?;
        out.extend_from_slice(data);
        out.extend_from_slice(b"\r\n");
        Ok(out)
    }

    fn finish(&mut self) -> io::Result<Vec<u8>> {
        Ok(b"0\r\n\r\n".to_vec())
    }
}

pub struct GzipLayer {
    encoder: Option<GzEncoder<Vec<u8>>>,
}

impl Default for GzipLayer {
    fn default() -> Self {
        Self {
            encoder: Some(GzEncoder::new(Vec::new(), Compression::default())),
        }
    }
}

impl EncoderLayer for GzipLayer {
    fn encode(&mut self, data: &[u8]) -> io::Result<Vec<u8>> {
        let Some(encoder) = self.encoder.as_mut() else {
            return Err(io::Error::other("gzip stream already finished"));
        };
        encoder.write_all(data)?;
        Ok(std::mem::take(encoder.get_mut()))
    }

    fn finish(&mut self) -> io::Result<Vec<u8>> {
        self.encoder
            .take()
            .map(GzEncoder::finish)
            .transpose()
            .map(Option::unwrap_or_default)
    }
}

/// HTTP `deflate` coding: a zlib-wrapped DEFLATE stream.
pub struct DeflateLayer {
    encoder: Option<ZlibEncoder<Vec<u8>>>,
}

impl Default for DeflateLayer {
    fn default() -> Self {
        Self {
            encoder: Some(ZlibEncoder::new(Vec::new(), Compression::default())),
        }
    }
}

impl EncoderLayer for DeflateLayer {
    fn encode(&mut self, data: &[u8]) -> io::Result<Vec<u8>> {
        let Some(encoder) = self.encoder.as_mut() else {
            return Err(io::Error::other("deflate stream already finished"));
        };
        encoder.write_all(data)?;
        Ok(std::mem::take(encoder.get_mut()))
    }

    fn finish(&mut self) -> io::Result<Vec<u8>> {
        self.encoder
            .take()
            .map(ZlibEncoder::finish)
            .transpose()
            .map(Option::unwrap_or_default)
    }
}

/// Ordered encoder layers exposed as a single writer.
#[derive(Default)]
pub struct Pipeline {
    layers: Vec<Box<dyn EncoderLayer>>,
    finished: bool,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("layers", &self.layers.len())
            .field("finished", &self.finished)
            .finish()
    }
}

impl Pipeline {
    /// Pass-through pipeline.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Build the pipeline bottom-up: compression first, chunking outermost.
    pub fn build(encoding: ContentEncoding, chunked: bool) -> Self {
        let mut pipeline = Self::identity();
        match encoding {
            ContentEncoding::Gzip => pipeline.push(GzipLayer::default()),
            ContentEncoding::Deflate => pipeline.push(DeflateLayer::default()),
            ContentEncoding::Identity => {}
        }
        if chunked {
            pipeline.push(ChunkedLayer);
        }
        pipeline
    }

    /// Add a layer outside the existing ones.
    pub fn push(&mut self, layer: impl EncoderLayer + 'static) {
        self.layers.push(Box::new(layer));
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Wire bytes for `data`.
    pub fn encode(&mut self, data: &[u8]) -> io::Result<Vec<u8>> {
        if self.finished {
            return Err(io::Error::other("write after end of body"));
        }
        let mut buf = data.to_vec();
        for layer in &mut self.layers {
            buf = layer.encode(&buf)?;
        }
        Ok(buf)
    }

    /// Finish every layer, innermost first; what an inner layer flushes on
    /// finish still travels through the outer layers. Idempotent.
    pub fn finish(&mut self) -> io::Result<Vec<u8>> {
        if self.finished {
            return Ok(Vec::new());
        }
        self.finished = true;
        let mut carry = Vec::new();
        for layer in &mut self.layers {
            let mut out = layer.encode(&carry)?;
            out.extend(layer.finish()?);
            carry = out;
        }
        Ok(carry)
    }
}
