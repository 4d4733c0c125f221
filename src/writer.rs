//! Dedicated writer task for outgoing responses.
//!
//! Handlers never touch the output stream directly. Each one holds a
//! [`ResponseSink`] and the writer task serializes whatever arrives, one JSON
//! document per line.
//!
//! # Architecture
//!
//! ```text
//! Handler 1 ─┐
//! Handler 2 ─┼─► mpsc::Sender<InteractionResponse> ─► Writer Task ─► stdout
//! Handler N ─┘
//! ```

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{FinderError, Result};
use crate::interaction::InteractionResponse;

/// Default channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Maximum responses to batch in a single write.
const MAX_BATCH_SIZE: usize = 64;

/// Handle for sending responses to the writer task.
///
/// Cheaply cloneable; one clone lives in every in-flight handler.
#[derive(Clone)]
pub struct ResponseSink {
    tx: mpsc::Sender<InteractionResponse>,
}

impl ResponseSink {
    /// Sink backed by a plain channel, for callers that consume responses
    /// themselves.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<InteractionResponse>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Queue a response, waiting while the channel is full.
    pub async fn send(&self, response: InteractionResponse) -> Result<()> {
        self.tx
            .send(response)
            .await
            .map_err(|_| FinderError::ConnectionClosed)
    }

    /// Responses queued but not yet written.
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Spawn the writer task over `writer`.
///
/// The task ends with `Ok(())` once every [`ResponseSink`] clone is dropped.
pub fn spawn_writer_task<W>(writer: W, capacity: usize) -> (ResponseSink, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (sink, rx) = ResponseSink::channel(capacity);
    let task = tokio::spawn(writer_loop(writer, rx));
    (sink, task)
}

async fn writer_loop<W>(mut writer: W, mut rx: mpsc::Receiver<InteractionResponse>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::with_capacity(4096);

    while let Some(first) = rx.recv().await {
        buf.clear();
        encode_line(&mut buf, &first)?;

        // Drain whatever else is already queued.
        let mut batched = 1;
        while batched < MAX_BATCH_SIZE {
            match rx.try_recv() {
                Ok(next) => {
                    encode_line(&mut buf, &next)?;
                    batched += 1;
                }
                Err(_) => break,
            }
        }

        writer.write_all(&buf).await?;
        writer.flush().await?;
        tracing::trace!("Wrote {} response(s)", batched);
    }

    Ok(())
}

fn encode_line(buf: &mut Vec<u8>, response: &InteractionResponse) -> Result<()> {
    serde_json::to_writer(&mut *buf, response)?;
    buf.push(b'\n');
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::MessageCreate;
    use tokio::io::{duplex, AsyncBufReadExt, BufReader};

    fn message(id: &str) -> InteractionResponse {
        InteractionResponse::Message {
            interaction_id: id.to_string(),
            message: MessageCreate::ephemeral_text("Pong!"),
        }
    }

    #[tokio::test]
    async fn test_writer_emits_one_line_per_response() {
        let (client, server) = duplex(64 * 1024);
        let (sink, task) = spawn_writer_task(client, 16);

        sink.send(message("1")).await.unwrap();
        sink.send(message("2")).await.unwrap();
        drop(sink);
        task.await.unwrap().unwrap();

        let mut lines = BufReader::new(server).lines();
        let first: InteractionResponse =
            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        let second: InteractionResponse =
            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();

        assert_eq!(first.interaction_id(), "1");
        assert_eq!(second.interaction_id(), "2");
        assert!(lines.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_send_after_writer_gone_fails() {
        let (sink, rx) = ResponseSink::channel(1);
        drop(rx);

        assert!(sink.is_closed());
        assert!(matches!(
            sink.send(message("1")).await,
            Err(FinderError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_pending_count_tracks_queue() {
        let (sink, mut rx) = ResponseSink::channel(4);
        assert_eq!(sink.pending_count(), 0);

        sink.send(message("1")).await.unwrap();
        assert_eq!(sink.pending_count(), 1);

        rx.recv().await.unwrap();
        assert_eq!(sink.pending_count(), 0);
    }
}
