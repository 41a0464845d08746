//! Progress-reporting stream adapters / 带进度回调的流适配器
//!
//! The callback receives `(transferred_bytes, total_bytes)` after every chunk
//! that actually moved data.

use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::storage::ProgressCallback;

/// 读取时报告进度（上传）
pub struct ProgressReader<R> {
    inner: R,
    transferred: u64,
    total: u64,
    progress: Option<ProgressCallback>,
}

impl<R> ProgressReader<R> {
    pub fn new(inner: R, total: u64, progress: Option<ProgressCallback>) -> Self {
        Self { inner, transferred: 0, total, progress }
    }

    pub fn transferred(&self) -> u64 {
        self.transferred
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for ProgressReader<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let before = buf.filled().len();
        match Pin::new(&mut self.inner).poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                let read = (buf.filled().len() - before) as u64;
                if read > 0 {
                    self.transferred += read;
                    if let Some(ref cb) = self.progress {
                        cb(self.transferred, self.total);
                    }
                }
                Poll::Ready(Ok(()))
            }
            other => other,
        }
    }
}

/// 写入时报告进度（下载）
pub struct ProgressWriter<W> {
    inner: W,
    transferred: u64,
    total: u64,
    progress: Option<ProgressCallback>,
}

impl<W> ProgressWriter<W> {
    pub fn new(inner: W, total: u64, progress: Option<ProgressCallback>) -> Self {
        Self { inner, transferred: 0, total, progress }
    }

    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for ProgressWriter<W> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match Pin::new(&mut self.inner).poll_write(cx, buf) {
            Poll::Ready(Ok(written)) => {
                if written > 0 {
                    self.transferred += written as u64;
                    if let Some(ref cb) = self.progress {
                        cb(self.transferred, self.total);
                    }
                }
                Poll::Ready(Ok(written))
            }
            other => other,
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn recorder() -> (ProgressCallback, Arc<Mutex<Vec<(u64, u64)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let cb: ProgressCallback = Arc::new(move |done, total| sink.lock().push((done, total)));
        (cb, seen)
    }

    #[tokio::test]
    async fn test_reader_reports_progress() {
        let (cb, seen) = recorder();
        let data: &[u8] = b"0123456789";
        let mut reader = ProgressReader::new(data, 10, Some(cb));

        let mut chunk = [0u8; 4];
        let mut out = Vec::new();
        loop {
            let n = reader.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&chunk[..n]);
        }

        assert_eq!(out, data);
        assert_eq!(reader.transferred(), 10);
        assert_eq!(*seen.lock(), vec![(4, 10), (8, 10), (10, 10)]);
    }

    #[tokio::test]
    async fn test_writer_reports_progress() {
        let (cb, seen) = recorder();
        let mut writer = ProgressWriter::new(Vec::new(), 6, Some(cb));
        writer.write_all(b"abc").await.unwrap();
        writer.write_all(b"def").await.unwrap();
        writer.flush().await.unwrap();

        assert_eq!(writer.transferred(), 6);
        assert_eq!(*seen.lock(), vec![(3, 6), (6, 6)]);
        assert_eq!(writer.into_inner(), b"abcdef");
    }

    #[tokio::test]
    async fn test_without_callback() {
        let mut writer = ProgressWriter::new(Vec::new(), 0, None);
        writer.write_all(b"xyz").await.unwrap();
        assert_eq!(writer.transferred(), 3);
    }
}
