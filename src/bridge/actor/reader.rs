//! Reader task for subordinate stdout.
//!
//! The Reader Task:
//! - Runs in a spawned tokio task
//! - Reads JSON lines from stdout using LineReader (noise already dropped)
//! - Routes responses via ResponseRouter to oneshot waiters
//! - Raises the readiness flag on the first successful result
//! - Logs and skips notifications
//! - Reports EOF or read errors through the `on_exit` callback

use std::future::Future;
use std::sync::Arc;

use log::{debug, trace, warn};
use tokio::io::AsyncRead;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{ResponseRouter, RouteResult};
use crate::bridge::protocol::InboundMessage;
use crate::bridge::transport::LineReader;

/// Why the reader loop stopped on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReaderEvent {
    /// stdout reached EOF (the process exited or closed it)
    Eof,
    /// Reading stdout failed
    Error(String),
}

/// Handle to a running Reader Task.
///
/// Dropping the handle cancels the loop. `on_exit` is not invoked for a
/// cancelled loop, only when the stream itself ends.
pub(crate) struct ReaderTaskHandle {
    /// Held to keep the task associated with its connection
    _join_handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

impl ReaderTaskHandle {
    /// Stop the reader loop.
    pub(crate) fn cancel(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for ReaderTaskHandle {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

/// Spawn a reader task that reads from stdout and routes responses.
///
/// # Arguments
/// * `reader` - The LineReader over the subordinate's stdout
/// * `router` - The ResponseRouter to route responses to waiters
/// * `ready` - Set to `true` when a non-error result is observed
/// * `on_exit` - Awaited once when stdout ends or fails
pub(crate) fn spawn_reader_task<R, F, Fut>(
    reader: LineReader<R>,
    router: Arc<ResponseRouter>,
    ready: watch::Sender<bool>,
    on_exit: F,
) -> ReaderTaskHandle
where
    R: AsyncRead + Unpin + Send + 'static,
    F: FnOnce(ReaderEvent) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let cancel_token = CancellationToken::new();
    let token_clone = cancel_token.clone();

    let join_handle = tokio::spawn(async move {
        if let Some(event) = reader_loop(reader, &router, &ready, token_clone).await {
            on_exit(event).await;
        }
    });

    ReaderTaskHandle {
        _join_handle: join_handle,
        cancel_token,
    }
}

/// The main reader loop - reads messages and routes them.
///
/// Returns `None` when cancelled, `Some(event)` when the stream ended.
async fn reader_loop<R: AsyncRead + Unpin>(
    mut reader: LineReader<R>,
    router: &ResponseRouter,
    ready: &watch::Sender<bool>,
    cancel_token: CancellationToken,
) -> Option<ReaderEvent> {
    loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                debug!(
                    target: "tweetbridge::bridge::reader",
                    "Reader task cancelled, shutting down"
                );
                return None;
            }

            result = reader.read_message() => {
                match result {
                    Ok(Some(message)) => handle_message(message, router, ready),
                    Ok(None) => {
                        debug!(
                            target: "tweetbridge::bridge::reader",
                            "Subordinate stdout reached EOF"
                        );
                        return Some(ReaderEvent::Eof);
                    }
                    Err(e) => {
                        warn!(
                            target: "tweetbridge::bridge::reader",
                            "Reader error: {}",
                            e
                        );
                        return Some(ReaderEvent::Error(e.to_string()));
                    }
                }
            }
        }
    }
}

/// Dispatch a single parsed message.
fn handle_message(message: serde_json::Value, router: &ResponseRouter, ready: &watch::Sender<bool>) {
    let classified = InboundMessage::classify(message);
    if classified.is_success() {
        ready.send_if_modified(|flag| !std::mem::replace(flag, true));
    }

    match classified {
        InboundMessage::Response { id, outcome } => match router.route(id, outcome) {
            RouteResult::Delivered => {}
            RouteResult::Unknown => debug!(
                target: "tweetbridge::bridge::reader",
                "Response for unknown request id={}, dropping",
                id
            ),
            RouteResult::ReceiverDropped => debug!(
                target: "tweetbridge::bridge::reader",
                "Waiter for id={} already gone, dropping",
                id
            ),
        },
        InboundMessage::Notification { method } => debug!(
            target: "tweetbridge::bridge::reader",
            "Received notification: {}, skipping",
            method
        ),
        InboundMessage::Other => trace!(
            target: "tweetbridge::bridge::reader",
            "Ignoring non-protocol JSON object"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::protocol::RequestId;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[test]
    fn handle_message_routes_response_and_sets_ready() {
        let router = ResponseRouter::new();
        let (ready_tx, ready_rx) = watch::channel(false);
        let _rx = router.register(RequestId::new(1), "tools/list").unwrap();

        handle_message(json!({"id": 1, "result": null}), &router, &ready_tx);

        assert_eq!(router.pending_count(), 0);
        assert!(*ready_rx.borrow());
    }

    #[test]
    fn unmatched_success_still_signals_ready() {
        let router = ResponseRouter::new();
        let (ready_tx, ready_rx) = watch::channel(false);

        handle_message(json!({"id": 77, "result": {}}), &router, &ready_tx);

        assert!(*ready_rx.borrow());
    }

    #[test]
    fn error_response_does_not_signal_ready() {
        let router = ResponseRouter::new();
        let (ready_tx, ready_rx) = watch::channel(false);
        let _rx = router.register(RequestId::new(1), "tools/list").unwrap();

        handle_message(
            json!({"id": 1, "error": {"message": "nope"}}),
            &router,
            &ready_tx,
        );

        assert_eq!(router.pending_count(), 0);
        assert!(!*ready_rx.borrow());
    }

    #[test]
    fn handle_message_ignores_notification() {
        let router = ResponseRouter::new();
        let (ready_tx, _ready_rx) = watch::channel(false);
        let _rx = router.register(RequestId::new(1), "tools/list").unwrap();

        handle_message(
            json!({"jsonrpc": "2.0", "method": "notifications/message", "params": {}}),
            &router,
            &ready_tx,
        );

        assert_eq!(router.pending_count(), 1);
    }

    #[tokio::test]
    async fn reader_task_routes_and_reports_eof() {
        let mock = tokio_test::io::Builder::new()
            .read(b"booting\n{\"id\":1,\"result\":{\"tools\":[]}}\n")
            .build();
        let router = Arc::new(ResponseRouter::new());
        let rx = router.register(RequestId::new(1), "tools/list").unwrap();
        let (ready_tx, _ready_rx) = watch::channel(false);
        let (exit_tx, exit_rx) = oneshot::channel();

        let _handle = spawn_reader_task(
            LineReader::new(mock),
            Arc::clone(&router),
            ready_tx,
            move |event| async move {
                let _ = exit_tx.send(event);
            },
        );

        assert_eq!(rx.await.unwrap().unwrap(), json!({"tools": []}));
        let event = tokio::time::timeout(Duration::from_secs(1), exit_rx)
            .await
            .expect("reader should finish")
            .unwrap();
        assert_eq!(event, ReaderEvent::Eof);
    }

    #[tokio::test]
    async fn cancelled_reader_does_not_report_exit() {
        let (_client, server) = tokio::io::duplex(64);
        let router = Arc::new(ResponseRouter::new());
        let (ready_tx, _ready_rx) = watch::channel(false);
        let (exit_tx, exit_rx) = oneshot::channel::<ReaderEvent>();

        let handle = spawn_reader_task(
            LineReader::new(server),
            router,
            ready_tx,
            move |event| async move {
                let _ = exit_tx.send(event);
            },
        );
        handle.cancel();

        // The closure (and its sender) is dropped without being called
        assert!(exit_rx.await.is_err());
    }
}
