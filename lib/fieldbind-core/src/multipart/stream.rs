//! Streamed multipart body: a producer task feeding a bounded channel.

use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{Form, MultipartConfig, Part, PartContent};
use crate::cancel::CancelSignal;
use crate::{Error, Result, UploadSource};

/// Message from the producer.
enum Frame {
    Data(Bytes),
    Done,
    Failed(Error),
}

/// Body stream of a multipart form.
///
/// Yields the encoded form chunk by chunk and ends after the closing
/// boundary. A failed or cancelled producer yields its error as the last
/// item; the stream never ends silently on a truncated body.
#[derive(Debug)]
pub struct MultipartStream {
    receiver: mpsc::Receiver<Frame>,
    cancel: CancelSignal,
    finished: bool,
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Data(bytes) => write!(f, "Data({} bytes)", bytes.len()),
            Self::Done => f.write_str("Done"),
            Self::Failed(err) => write!(f, "Failed({err})"),
        }
    }
}

pub(super) fn spawn(
    form: Form,
    handle: &tokio::runtime::Handle,
    cancel: CancelSignal,
    config: &MultipartConfig,
) -> MultipartStream {
    let (sender, receiver) = mpsc::channel(config.channel_capacity.max(1));
    let producer = Producer {
        sender,
        cancel: cancel.clone(),
        chunk_size: config.chunk_size.max(1),
    };
    handle.spawn(producer.run(form));
    MultipartStream {
        receiver,
        cancel,
        finished: false,
    }
}

impl Stream for MultipartStream {
    type Item = Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        let item = match ready!(self.receiver.poll_recv(cx)) {
            Some(Frame::Data(bytes)) => return Poll::Ready(Some(Ok(bytes))),
            Some(Frame::Done) => None,
            Some(Frame::Failed(err)) => Some(Err(err)),
            None if self.cancel.is_cancelled() => Some(Err(Error::Cancelled)),
            None => Some(Err(Error::Multipart(
                "multipart producer stopped before the end of the body".to_string(),
            ))),
        };
        self.finished = true;
        Poll::Ready(item)
    }
}

struct Producer {
    sender: mpsc::Sender<Frame>,
    cancel: CancelSignal,
    chunk_size: usize,
}

impl Producer {
    async fn run(self, form: Form) {
        let part_count = form.parts.len();
        match self.write_form(&form).await {
            Ok(()) => {
                debug!(parts = part_count, "multipart body complete");
                // The consumer may be gone already; nothing is left to report.
                let _ = self.sender.send(Frame::Done).await;
            }
            Err(err) => {
                if err.is_cancelled() {
                    warn!("multipart body cancelled");
                } else {
                    warn!(error = %err, "multipart body failed");
                }
                let _ = self.sender.send(Frame::Failed(err)).await;
            }
        }
    }

    async fn write_form(&self, form: &Form) -> Result<()> {
        for part in &form.parts {
            self.write_part(part, &form.boundary).await?;
        }
        self.send(Bytes::from(format!("--{}--\r\n", form.boundary)))
            .await
    }

    async fn write_part(&self, part: &Part, boundary: &str) -> Result<()> {
        self.send(part.head(boundary)).await?;
        match &part.content {
            PartContent::Text(value) => self.send(Bytes::from(value.clone())).await?,
            PartContent::File(upload) => {
                let filename = part.filename().unwrap_or_default();
                self.write_file(upload.source())
                    .await
                    .map_err(|err| match err {
                        Error::Cancelled => Error::Cancelled,
                        err => Error::Multipart(format!(
                            "upload {} {filename:?}: {err}",
                            part.name()
                        )),
                    })?;
            }
        }
        self.send(Bytes::from_static(b"\r\n")).await
    }

    async fn write_file(&self, source: &UploadSource) -> Result<()> {
        match source {
            UploadSource::Bytes(bytes) => {
                let mut rest = bytes.clone();
                while !rest.is_empty() {
                    let chunk = rest.split_to(self.chunk_size.min(rest.len()));
                    self.send(chunk).await?;
                }
                Ok(())
            }
            UploadSource::Path(path) => {
                let file = self.guard(tokio::fs::File::open(path)).await??;
                self.copy(file).await
            }
            UploadSource::Reader(reader) => {
                let reader = reader
                    .take()
                    .await
                    .ok_or_else(|| Error::invalid("upload stream already consumed"))?;
                self.copy(reader).await
            }
        }
    }

    async fn copy(&self, mut reader: impl AsyncRead + Unpin) -> Result<()> {
        loop {
            let mut chunk = BytesMut::with_capacity(self.chunk_size);
            let read = self.guard(reader.read_buf(&mut chunk)).await??;
            if read == 0 {
                return Ok(());
            }
            self.send(chunk.freeze()).await?;
        }
    }

    /// Send a chunk, unless cancelled first.
    async fn send(&self, bytes: Bytes) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.guard(self.sender.send(Frame::Data(bytes)))
            .await?
            .map_err(|_| Error::Multipart("multipart body dropped".to_string()))
    }

    /// Run `future` unless cancellation fires first.
    async fn guard<F: Future>(&self, future: F) -> Result<F::Output> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Error::Cancelled),
            output = future => Ok(output),
        }
    }
}
