//! Writer task for subordinate stdin.
//!
//! This module provides the single-writer actor that consumes the outbound
//! queue and writes each request as one line to the subordinate's stdin.
//!
//! Shutdown scenarios:
//! 1. Cancellation: queued requests that were never written are failed
//! 2. Channel closed: all senders dropped, nothing left to write
//! 3. Write error: only the request being written is failed; the reader
//!    task notices the dead process and tears the connection down

use std::sync::Arc;

use log::{debug, warn};
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{OutboundMessage, ResponseRouter};
use crate::bridge::transport::LineWriter;
use crate::error::BridgeError;

/// Queue capacity for outbound messages.
///
/// Bounds memory usage and provides backpressure to callers.
pub(crate) const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Handle to a running Writer Task.
///
/// Dropping the handle cancels the task.
pub(crate) struct WriterTaskHandle {
    /// Held to keep the task associated with its connection
    _join_handle: tokio::task::JoinHandle<()>,
    cancel_token: CancellationToken,
}

impl WriterTaskHandle {
    /// Stop the writer without draining the queue.
    pub(crate) fn cancel(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for WriterTaskHandle {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

/// Spawn a writer task that writes messages from the queue to stdin.
///
/// # Arguments
/// * `writer` - The LineWriter over the subordinate's stdin
/// * `rx` - Receiver for outbound messages
/// * `router` - ResponseRouter used to fail requests whose write failed
pub(crate) fn spawn_writer_task<W>(
    writer: LineWriter<W>,
    rx: mpsc::Receiver<OutboundMessage>,
    router: Arc<ResponseRouter>,
) -> WriterTaskHandle
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let cancel_token = CancellationToken::new();
    let token_clone = cancel_token.clone();

    let join_handle = tokio::spawn(writer_loop(writer, rx, router, token_clone));

    WriterTaskHandle {
        _join_handle: join_handle,
        cancel_token,
    }
}

/// The main writer loop - writes messages from queue to stdin.
///
/// Cancellation is observed both while waiting for the next message and
/// while a write is blocked on a full pipe.
async fn writer_loop<W: AsyncWrite + Unpin>(
    mut writer: LineWriter<W>,
    mut rx: mpsc::Receiver<OutboundMessage>,
    router: Arc<ResponseRouter>,
    cancel_token: CancellationToken,
) {
    loop {
        let msg = tokio::select! {
            biased;

            _ = cancel_token.cancelled() => None,

            msg = rx.recv() => match msg {
                Some(msg) => Some(msg),
                None => {
                    debug!(
                        target: "tweetbridge::bridge::writer",
                        "Writer channel closed"
                    );
                    return;
                }
            },
        };

        let Some(msg) = msg else {
            fail_queued(&mut rx, &router);
            return;
        };

        let written = tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                router.fail_request(msg.request_id, BridgeError::ConnectionClosed);
                fail_queued(&mut rx, &router);
                return;
            }

            result = writer.write_line(&msg.line) => result,
        };

        if let Err(e) = written {
            warn!(
                target: "tweetbridge::bridge::writer",
                "Write error for id={}: {}",
                msg.request_id,
                e
            );
            router.fail_request(msg.request_id, BridgeError::Io(e));
        }
    }
}

/// Fail every request still sitting in the queue.
fn fail_queued(rx: &mut mpsc::Receiver<OutboundMessage>, router: &ResponseRouter) {
    debug!(
        target: "tweetbridge::bridge::writer",
        "Writer task cancelled, failing queued requests"
    );
    rx.close();
    while let Ok(msg) = rx.try_recv() {
        router.fail_request(msg.request_id, BridgeError::ConnectionClosed);
    }
}
