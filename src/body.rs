//! Response body representations and text materialization.
//!
//! A handler can hand back its body in whichever shape is cheapest for it:
//! nothing at all, a buffer it already holds, a `String`, or a stream that is
//! still being produced (a file read in chunks, for instance). Middleware that
//! wants the body as text calls [`Body::materialize`], which knows the rule
//! for each shape.
//!
//! ```text
//! Empty          → ""
//! Bytes(buf)     → lossy UTF-8 decode, slot untouched
//! Text(s)        → s, slot untouched
//! Stream(s)      → drained once, slot becomes Bytes(drained)
//! ```

use std::fmt;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt, TryStreamExt};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::Frame;

use crate::error::{BoxError, Error};

/// A fallible stream of body chunks.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, BoxError>> + Send + 'static>>;

/// The body type handed to hyper.
pub(crate) type HttpBody = UnsyncBoxBody<Bytes, BoxError>;

/// An outgoing response body.
#[derive(Default)]
pub enum Body {
    /// No body at all.
    #[default]
    Empty,
    /// A raw byte buffer.
    Bytes(Bytes),
    /// Text that is already decoded.
    Text(String),
    /// Chunks produced asynchronously. Can be read exactly once.
    Stream(BodyStream),
}

impl Body {
    /// Wraps any fallible byte stream.
    pub fn from_stream<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        let stream = stream.map_err(|e: E| -> BoxError { e.into() });
        Self::Stream(Box::pin(stream))
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }

    /// Returns the body as text.
    ///
    /// Buffered variants are decoded without touching the slot. A stream is
    /// drained to completion and the slot is replaced with the drained bytes,
    /// so whoever reads the body next sees the same content the stream would
    /// have produced.
    ///
    /// If the stream fails part-way, the slot keeps whatever was read before
    /// the failure and [`Error::Body`] is returned.
    pub async fn materialize(&mut self) -> Result<String, Error> {
        let mut stream = match std::mem::take(self) {
            Self::Stream(stream) => stream,
            buffered => {
                let text = buffered.buffered_text();
                *self = buffered;
                return Ok(text);
            }
        };

        let mut drained = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(chunk) => drained.extend_from_slice(&chunk),
                Err(e) => {
                    *self = Self::Bytes(drained.freeze());
                    return Err(Error::Body(e));
                }
            }
        }

        // Decode after concatenation: a multi-byte character may straddle
        // two chunks.
        let drained = drained.freeze();
        let text = String::from_utf8_lossy(&drained).into_owned();
        *self = Self::Bytes(drained);
        Ok(text)
    }

    fn buffered_text(&self) -> String {
        match self {
            Self::Empty | Self::Stream(_) => String::new(),
            Self::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            Self::Text(text) => text.clone(),
        }
    }

    pub(crate) fn into_http(self) -> HttpBody {
        match self {
            Self::Empty => full(Bytes::new()),
            Self::Bytes(bytes) => full(bytes),
            Self::Text(text) => full(Bytes::from(text)),
            Self::Stream(stream) => StreamBody::new(stream.map_ok(Frame::data)).boxed_unsync(),
        }
    }
}

fn full(bytes: Bytes) -> HttpBody {
    Full::new(bytes).map_err(|never| match never {}).boxed_unsync()
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(bytes).finish(),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self { Self::Bytes(bytes) }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self { Self::Bytes(Bytes::from(bytes)) }
}

impl From<String> for Body {
    fn from(text: String) -> Self { Self::Text(text) }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self { Self::Bytes(Bytes::from_static(text.as_bytes())) }
}
