//! Request body ingestion and decoder selection.
//!
//! # Responsibilities
//! - Spool the body (bytes left over after the header block plus further
//!   socket reads) into a temp file, up to `Content-Length`
//! - Pick a decoder from the request content type
//! - Attach the raw body stream when no decoder claims the content type
//!
//! # Design Decisions
//! - Reads are bounded by the configured chunk size and clamped to the
//!   remaining byte count, so the next request's bytes are never consumed
//! - A declared `Content-Length` always bounds the body, zero included;
//!   only a request without the header keeps all leftover bytes
//! - A peer that ends the body early is tolerated: ingestion finalizes with
//!   what arrived and the shortfall is logged
//! - Temp file creation and decoders run on the blocking pool
//! - Multipart decoding is a collaborator registered by the application

use std::io::{Read, SeekFrom};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use super::error::HttpError;
use super::query::QueryValueCollection;
use super::request::HttpRequest;
use crate::resilience::timeouts::io_timeout;

/// Populates request fields from a spooled body.
pub trait BodyDecoder: Send + Sync {
    /// `body` is positioned at its start.
    fn decode(&self, request: &mut HttpRequest, body: &mut std::fs::File) -> Result<(), HttpError>;
}

/// `application/x-www-form-urlencoded` bodies into [`HttpRequest::post`].
#[derive(Debug, Default, Clone, Copy)]
pub struct UrlEncodedDecoder;

impl BodyDecoder for UrlEncodedDecoder {
    fn decode(&self, request: &mut HttpRequest, body: &mut std::fs::File) -> Result<(), HttpError> {
        let mut raw = Vec::new();
        body.read_to_end(&mut raw)?;
        request.post = QueryValueCollection::parse(&String::from_utf8_lossy(&raw));
        Ok(())
    }
}

/// Decoders keyed by media type.
#[derive(Clone)]
pub struct BodyDecoders {
    form: Arc<dyn BodyDecoder>,
    multipart: Option<Arc<dyn BodyDecoder>>,
}

impl Default for BodyDecoders {
    fn default() -> Self {
        Self {
            form: Arc::new(UrlEncodedDecoder),
            multipart: None,
        }
    }
}

impl std::fmt::Debug for BodyDecoders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyDecoders")
            .field("multipart", &self.multipart.is_some())
            .finish()
    }
}

impl BodyDecoders {
    pub fn with_form(mut self, decoder: impl BodyDecoder + 'static) -> Self {
        self.form = Arc::new(decoder);
        self
    }

    pub fn with_multipart(mut self, decoder: impl BodyDecoder + 'static) -> Self {
        self.multipart = Some(Arc::new(decoder));
        self
    }

    /// Decoder for a `Content-Type` value, parameters ignored.
    pub fn select(&self, content_type: Option<&str>) -> Option<&Arc<dyn BodyDecoder>> {
        let media = content_type?
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match media.as_str() {
            "application/x-www-form-urlencoded" => Some(&self.form),
            "multipart/form-data" => self.multipart.as_ref(),
            _ => None,
        }
    }

    /// Hand a spooled body to its decoder, or attach it as the raw input.
    pub async fn attach(&self, request: &mut HttpRequest, body: IngestedBody) -> Result<(), HttpError> {
        let mut file = body.file;
        let Some(decoder) = self.select(request.content_type.as_deref()).cloned() else {
            request.input = Some(tokio::fs::File::from_std(file));
            return Ok(());
        };

        let mut owned = std::mem::take(request);
        let (owned, result) = tokio::task::spawn_blocking(move || {
            let result = decoder.decode(&mut owned, &mut file);
            (owned, result)
        })
        .await
        .map_err(std::io::Error::other)?;
        *request = owned;
        result
    }
}

/// A body spooled to disk, rewound to its start.
#[derive(Debug)]
pub struct IngestedBody {
    pub file: std::fs::File,
    pub received: u64,
    pub expected: u64,
}

impl IngestedBody {
    /// The peer sent fewer bytes than it declared.
    pub fn is_partial(&self) -> bool {
        self.received < self.expected
    }
}

/// Whether a request carries a body to ingest.
///
/// A declared length decides on its own; without one, any bytes already
/// buffered behind the header block count as the body.
pub fn has_body(request: &HttpRequest, leftover: usize) -> bool {
    if request.is_get() {
        return false;
    }
    match request.content_length {
        Some(length) => length > 0,
        None => leftover > 0,
    }
}

/// Number of buffered bytes that belong to the body.
pub fn body_prefix_len(declared: Option<u64>, leftover: usize) -> usize {
    match declared {
        Some(length) => leftover.min(usize::try_from(length).unwrap_or(usize::MAX)),
        None => leftover,
    }
}

/// Spool `leftover` plus further reads from `reader` until `declared` bytes.
///
/// Without a declared length only the leftover is kept; otherwise the
/// leftover is clamped to the length and the rest is read in reads of at
/// most `chunk_size` bytes, one at a time.
pub async fn ingest<R>(
    reader: &mut R,
    leftover: &[u8],
    declared: Option<u64>,
    chunk_size: usize,
    read_timeout: Duration,
) -> Result<IngestedBody, HttpError>
where
    R: AsyncRead + Unpin,
{
    let spool = tokio::task::spawn_blocking(tempfile::tempfile)
        .await
        .map_err(std::io::Error::other)??;
    let mut file = tokio::fs::File::from_std(spool);

    let initial = &leftover[..body_prefix_len(declared, leftover.len())];
    let expected = declared.unwrap_or(initial.len() as u64);
    file.write_all(initial).await?;
    let mut received = initial.len() as u64;

    let mut chunk = vec![0u8; chunk_size.max(1)];
    while received < expected {
        let want = usize::try_from(expected - received)
            .unwrap_or(usize::MAX)
            .min(chunk.len());
        let n = io_timeout(read_timeout, reader.read(&mut chunk[..want])).await?;
        if n == 0 {
            tracing::debug!(received, expected, "peer ended request body early");
            break;
        }
        file.write_all(&chunk[..n]).await?;
        received += n as u64;
    }
    file.flush().await?;
    file.seek(SeekFrom::Start(0)).await?;

    let file = file.into_std().await;
    Ok(IngestedBody {
        file,
        received,
        expected,
    })
}
