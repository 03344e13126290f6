//! Compression of quarantined objects.
//!
//! Objects are compressed in memory before they are stored, and
//! decompressed as a stream while they are read back.

use crate::quarantine::config::QuarantineKind;

use flate2::write::{GzDecoder, GzEncoder};
use flate2::Compression;
use pin_project_lite::pin_project;
use std::io::{self, Write};
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

/// Size of the compressed-side read buffer.
const READ_CHUNK: usize = 16 * 1024;

impl QuarantineKind {
    /// Compresses `contents` into a finished, self-contained buffer.
    ///
    /// The encoder is finalized before the buffer is returned, so its
    /// length is the exact stored size.
    pub fn encode(&self, contents: &[u8]) -> io::Result<Vec<u8>> {
        match self {
            Self::Zip => {
                let mut encoder = GzEncoder::new(
                    Vec::with_capacity(contents.len() / 2 + 64),
                    Compression::fast(),
                );
                encoder.write_all(contents)?;
                encoder.finish()
            }
        }
    }

    /// Wraps a compressed stream in a decompressing reader.
    pub fn decoder<R: AsyncRead>(&self, inner: R) -> DecompressingReader<R> {
        match self {
            Self::Zip => DecompressingReader::gzip(inner),
        }
    }
}

pin_project! {
    /// Streams decompressed bytes out of a compressed async reader.
    ///
    /// Compressed chunks are pushed through a write-side decoder whose
    /// output buffer is drained into the caller's buffer.
    pub struct DecompressingReader<R> {
        #[pin]
        inner: R,
        decoder: GzDecoder<Vec<u8>>,
        chunk: Box<[u8]>,
        drained: usize,
        finished: bool,
    }
}

impl<R> DecompressingReader<R> {
    fn gzip(inner: R) -> Self {
        Self {
            inner,
            decoder: GzDecoder::new(Vec::new()),
            chunk: vec![0u8; READ_CHUNK].into_boxed_slice(),
            drained: 0,
            finished: false,
        }
    }
}

impl<R: AsyncRead> AsyncRead for DecompressingReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        out: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let mut this = self.project();
        loop {
            let decoded = this.decoder.get_ref();
            if *this.drained < decoded.len() {
                let pending = &decoded[*this.drained..];
                let n = pending.len().min(out.remaining());
                out.put_slice(&pending[..n]);
                *this.drained += n;
                if *this.drained == this.decoder.get_ref().len() {
                    this.decoder.get_mut().clear();
                    *this.drained = 0;
                }
                return Poll::Ready(Ok(()));
            }

            if *this.finished {
                return Poll::Ready(Ok(()));
            }

            let mut compressed = ReadBuf::new(this.chunk);
            ready!(this.inner.as_mut().poll_read(cx, &mut compressed))?;
            let filled = compressed.filled();
            if filled.is_empty() {
                this.decoder.try_finish()?;
                *this.finished = true;
            } else {
                this.decoder.write_all(filled)?;
            }
        }
    }
}
