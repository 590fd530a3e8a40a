//! Chunked relay of provider audio.
//!
//! The provider body is re-cut into pieces of at most [`CHUNK_SIZE`] bytes and
//! each piece is yielded as soon as it is available, so nothing ever holds the
//! whole file. The relay stream owns the provider body; dropping it (stream
//! exhausted, upstream error, or the HTTP client going away) releases it.
use std::convert::Infallible;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::{debug, error, warn};

use crate::{AudioStream, ByteChunks};

/// Largest chunk forwarded to the HTTP body.
pub const CHUNK_SIZE: usize = 4096;

/// Owns the upstream body for the lifetime of a relay and reports on release.
struct UpstreamGuard {
    upstream: ByteChunks,
    bytes_sent: u64,
    chunks_sent: u64,
    finished: bool,
}

impl UpstreamGuard {
    fn new(upstream: ByteChunks) -> Self {
        Self {
            upstream,
            bytes_sent: 0,
            chunks_sent: 0,
            finished: false,
        }
    }

    fn record(&mut self, len: usize) {
        self.bytes_sent += len as u64;
        self.chunks_sent += 1;
    }

    /// Upstream ran to its end.
    fn finish(&mut self) {
        self.finished = true;
    }
}

impl Drop for UpstreamGuard {
    fn drop(&mut self) {
        if self.finished {
            debug!(
                bytes = self.bytes_sent,
                chunks = self.chunks_sent,
                "Audio relay finished, upstream stream released"
            );
        } else {
            warn!(
                bytes = self.bytes_sent,
                chunks = self.chunks_sent,
                "Audio relay closed early, upstream stream released"
            );
        }
    }
}

/// Relay `audio` as a body stream of chunks no larger than [`CHUNK_SIZE`].
///
/// Upstream errors cannot change a response whose headers are already sent,
/// so they are logged and the stream simply ends.
pub fn relay_chunks(audio: AudioStream) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    let mut guard = UpstreamGuard::new(audio.into_chunks());

    async_stream::stream! {
        loop {
            let mut buf = match guard.upstream.next().await {
                Some(Ok(buf)) => buf,
                Some(Err(e)) => {
                    error!("Error while relaying audio: {e}");
                    break;
                }
                None => {
                    guard.finish();
                    break;
                }
            };
            while !buf.is_empty() {
                let chunk = buf.split_to(buf.len().min(CHUNK_SIZE));
                guard.record(chunk.len());
                yield Ok::<Bytes, Infallible>(chunk);
            }
        }
    }
}
