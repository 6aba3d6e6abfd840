use std::io::IoSlice;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::trace::ClientTrace;

// hyper does not expose "request written" or "first byte" events, so the
// connection is handed to it wrapped in this stream, which reports them to
// the trace as the bytes go by.
pub struct TracedStream<T> {
    inner: T,
    trace: Arc<dyn ClientTrace>,
    wrote_any: bool,
    request_written: bool,
    first_byte_seen: bool,
}

impl<T> TracedStream<T> {
    pub fn new(inner: T, trace: Arc<dyn ClientTrace>) -> Self {
        Self {
            inner,
            trace,
            wrote_any: false,
            request_written: false,
            first_byte_seen: false,
        }
    }

    // A GET carries no body, so the headers are the whole request.
    fn notify_request_written(&mut self) {
        if self.wrote_any && !self.request_written {
            self.request_written = true;
            self.trace.wrote_headers();
            self.trace.wrote_request();
        }
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> AsyncRead for TracedStream<T> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let before = buf.filled().len();
        let result = Pin::new(&mut self.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = result {
            if !self.first_byte_seen && buf.filled().len() > before {
                self.notify_request_written();
                self.first_byte_seen = true;
                self.trace.got_first_response_byte();
            }
        }
        result
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> AsyncWrite for TracedStream<T> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize, std::io::Error>> {
        let result = Pin::new(&mut self.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(written)) = result {
            self.wrote_any |= written > 0;
        }
        result
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[IoSlice<'_>],
    ) -> Poll<Result<usize, std::io::Error>> {
        let result = Pin::new(&mut self.inner).poll_write_vectored(cx, bufs);
        if let Poll::Ready(Ok(written)) = result {
            self.wrote_any |= written > 0;
        }
        result
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), std::io::Error>> {
        let result = Pin::new(&mut self.inner).poll_flush(cx);
        if let Poll::Ready(Ok(())) = result {
            self.notify_request_written();
        }
        result
    }

    fn poll_shutdown(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), std::io::Error>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
