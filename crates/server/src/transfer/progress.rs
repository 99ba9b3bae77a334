//! Per-upload progress channel.
//!
//! The ingest side holds a [`ProgressSender`]; the HTTP layer drains the
//! matching [`ProgressReceiver`]. Terminal events consume the sender, so a
//! transfer can report at most one of them and nothing after it.

use crate::transfer::error::TransferError;
use depot_core::{TransferProgressEvent, VersionRecord};
use futures::Stream;
use tokio::sync::mpsc;

/// The receiving side went away (client disconnected).
#[derive(Debug, thiserror::Error)]
#[error("progress consumer disconnected")]
pub struct ConsumerGone;

/// Create a connected sender/receiver pair.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProgressSender { tx }, ProgressReceiver { rx })
}

#[derive(Debug)]
pub struct ProgressSender {
    tx: mpsc::UnboundedSender<TransferProgressEvent>,
}

impl ProgressSender {
    /// Report a new whole percent.
    pub fn progress(&self, percent: u8) -> Result<(), ConsumerGone> {
        self.tx
            .send(TransferProgressEvent::Progress { percent })
            .map_err(|_| ConsumerGone)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Send the terminal success event.
    pub fn complete(self, record: VersionRecord) {
        self.finish(TransferProgressEvent::Completed { result: record });
    }

    /// Send the terminal failure event.
    pub fn fail(self, error: &TransferError) {
        self.finish(TransferProgressEvent::Failed {
            code: error.code().to_string(),
            error: error.to_string(),
        });
    }

    fn finish(self, event: TransferProgressEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Progress consumer gone before terminal event");
        }
    }
}

#[derive(Debug)]
pub struct ProgressReceiver {
    rx: mpsc::UnboundedReceiver<TransferProgressEvent>,
}

impl ProgressReceiver {
    /// Wait for the channel to close and return every event received.
    pub async fn collect(mut self) -> Vec<TransferProgressEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.rx.recv().await {
            events.push(event);
        }
        events
    }

    pub fn into_stream(mut self) -> impl Stream<Item = TransferProgressEvent> + Send {
        async_stream::stream! {
            while let Some(event) = self.rx.recv().await {
                yield event;
            }
        }
    }
}
