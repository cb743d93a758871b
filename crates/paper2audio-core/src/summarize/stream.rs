//! Incremental decoding of streamed JSON generation chunks.
//!
//! The local generation server answers with a sequence of JSON objects over
//! one response body, usually one per line. Objects can be split across
//! network reads, so bytes are buffered until a complete value is available.

use std::collections::VecDeque;
use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use serde::Deserialize;

use super::SummarizeError;

/// One decoded object from the generation stream. Other fields (`done`,
/// timings) are ignored; the body is read to its end.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct GenerateChunk {
    /// Partial narration text, if this chunk carries any.
    #[serde(default)]
    pub response: Option<String>,
    /// Server-side failure reported in-band.
    #[serde(default)]
    pub error: Option<String>,
}

/// Buffers raw bytes and yields every complete [`GenerateChunk`].
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    buf: Vec<u8>,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes` and return all chunks that are now complete.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<GenerateChunk>, serde_json::Error> {
        self.buf.extend_from_slice(bytes);

        let mut chunks = Vec::new();
        let consumed = {
            let mut values =
                serde_json::Deserializer::from_slice(&self.buf).into_iter::<GenerateChunk>();
            let mut consumed = 0;
            loop {
                match values.next() {
                    Some(Ok(chunk)) => {
                        consumed = values.byte_offset();
                        chunks.push(chunk);
                    }
                    // Incomplete trailing object: wait for more bytes.
                    Some(Err(e)) if e.is_eof() => break,
                    Some(Err(e)) => return Err(e),
                    None => break,
                }
            }
            consumed
        };
        self.buf.drain(..consumed);
        Ok(chunks)
    }

    /// Verify nothing but whitespace is left once the body has ended.
    pub fn finish(&self) -> Result<(), serde_json::Error> {
        if self.buf.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }
        serde_json::from_slice::<GenerateChunk>(&self.buf).map(|_| ())
    }
}

struct DecodeState<S> {
    body: Pin<Box<S>>,
    decoder: ChunkDecoder,
    pending: VecDeque<GenerateChunk>,
    done: bool,
}

/// Turn a byte stream into a lazy, finite stream of decoded chunks.
///
/// A clean end of the body ends the stream. A truncated trailing object or
/// a transport error is yielded once as an error, after which the stream
/// ends.
pub fn json_chunks<S, B, E>(body: S) -> impl Stream<Item = Result<GenerateChunk, SummarizeError>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<SummarizeError>,
{
    let state = DecodeState {
        body: Box::pin(body),
        decoder: ChunkDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    futures_util::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(chunk) = st.pending.pop_front() {
                return Some((Ok(chunk), st));
            }
            if st.done {
                return None;
            }
            match st.body.next().await {
                Some(Ok(bytes)) => match st.decoder.feed(bytes.as_ref()) {
                    Ok(chunks) => st.pending.extend(chunks),
                    Err(e) => {
                        st.done = true;
                        return Some((Err(e.into()), st));
                    }
                },
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(e.into()), st));
                }
                None => {
                    st.done = true;
                    if let Err(e) = st.decoder.finish() {
                        return Some((Err(e.into()), st));
                    }
                }
            }
        }
    })
}
