//! Outbound relay channel seam.
//!
//! The controller only knows how to `send` a frame; the transport behind it
//! (websocket, in-process hub, test collector) is the embedder's business.
//! Sends are fire-and-forget: a full or closed channel drops the frame with
//! a diagnostic and the synchronization stays best-effort.

#[cfg(test)]
#[path = "relay_test.rs"]
mod relay_test;

use frames::Frame;
use tokio::sync::mpsc;
use tracing::warn;

use crate::consts::RELAY_QUEUE_CAPACITY;

/// Fire-and-forget transport to the other participants.
pub trait RelayChannel: Send + Sync {
    /// Queue a frame for delivery. Never blocks, never errors out to the
    /// caller; failures are logged and the frame is dropped.
    fn send(&self, frame: Frame);
}

/// [`RelayChannel`] backed by a bounded tokio channel.
///
/// The receiving half is handed to whatever pumps frames onto the real
/// transport.
pub struct ChannelRelay {
    tx: mpsc::Sender<Frame>,
}

impl ChannelRelay {
    /// Create a relay with the default queue capacity. Returns the relay and
    /// the receiving half.
    #[must_use]
    pub fn new() -> (Self, mpsc::Receiver<Frame>) {
        Self::with_capacity(RELAY_QUEUE_CAPACITY)
    }

    /// Create a relay with an explicit queue capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Wrap an existing sender.
    #[must_use]
    pub fn from_sender(tx: mpsc::Sender<Frame>) -> Self {
        Self { tx }
    }
}

impl RelayChannel for ChannelRelay {
    fn send(&self, frame: Frame) {
        match self.tx.try_send(frame) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(frame)) => {
                warn!(event = %frame.event, "relay queue full; frame dropped");
            }
            Err(mpsc::error::TrySendError::Closed(frame)) => {
                warn!(event = %frame.event, "relay channel closed; frame dropped");
            }
        }
    }
}
