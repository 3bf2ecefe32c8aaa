//! Audio sinks.

use async_trait::async_trait;
use porter_core::traits::AudioSink;
use porter_core::{AudioUnit, Error, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Forwards each played unit to a channel; a unit counts as played once the
/// receiver has taken it.
pub struct ChannelSink {
    tx: mpsc::Sender<AudioUnit>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<AudioUnit>) -> Self {
        Self { tx }
    }

    /// Sink plus the receiving end, with room for `capacity` waiting units.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<AudioUnit>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl AudioSink for ChannelSink {
    async fn play(&self, unit: AudioUnit, cancel: &CancellationToken) -> Result<()> {
        let seq = unit.seq;
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(seq, "Playback cancelled before delivery");
                Ok(())
            }
            sent = self.tx.send(unit) => sent.map_err(|_| Error::playback("audio receiver dropped")),
        }
    }
}
