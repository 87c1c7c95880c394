//! A bounded, single-producer pipe of byte chunks.
//!
//! The [Writer] must call [Writer::close] to end the stream. If it is dropped first, the
//! [Reader] yields [Error::PipeAborted] so that a consumer never mistakes a partial body for a
//! complete one.

use crate::Error;
use bytes::Bytes;
use futures::{channel::mpsc, ready, SinkExt, Stream, StreamExt};
use std::{
    pin::Pin,
    task::{Context, Poll},
};

enum Frame {
    Data(Bytes),
    End,
}

/// Create a connected [Writer] and [Reader].
///
/// At most one chunk is in flight: [Writer::write] waits until the previous chunk was consumed.
pub fn channel() -> (Writer, Reader) {
    let (sender, receiver) = mpsc::channel(0);
    (
        Writer { sender },
        Reader {
            receiver,
            done: false,
        },
    )
}

/// Producing half of a pipe.
pub struct Writer {
    sender: mpsc::Sender<Frame>,
}

impl Writer {
    /// Send a chunk, failing with [Error::PipeClosed] if the [Reader] was dropped.
    pub async fn write(&mut self, chunk: Bytes) -> Result<(), Error> {
        self.sender
            .send(Frame::Data(chunk))
            .await
            .map_err(|_| Error::PipeClosed)
    }

    /// End the stream.
    pub async fn close(mut self) -> Result<(), Error> {
        self.sender
            .send(Frame::End)
            .await
            .map_err(|_| Error::PipeClosed)
    }
}

/// Consuming half of a pipe.
pub struct Reader {
    receiver: mpsc::Receiver<Frame>,
    done: bool,
}

impl Stream for Reader {
    type Item = Result<Bytes, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        match ready!(self.receiver.poll_next_unpin(cx)) {
            Some(Frame::Data(chunk)) => Poll::Ready(Some(Ok(chunk))),
            Some(Frame::End) => {
                self.done = true;
                Poll::Ready(None)
            }
            None => {
                self.done = true;
                Poll::Ready(Some(Err(Error::PipeAborted)))
            }
        }
    }
}
