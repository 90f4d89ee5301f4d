use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::types::Overlay;

/// Where finished overlays go. Implementations own thread affinity: the
/// analysis worker only hands results over and never touches display state.
pub trait RenderSink: Send + 'static {
    fn present(&self, overlay: Overlay);
}

/// Posts overlays to a channel drained by the display-owning thread. When
/// the display has not picked up the previous overlay, the queued one is
/// stale and is replaced, so analysis never blocks and the newest readings
/// always win.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: Sender<Overlay>,
    stale: Receiver<Overlay>,
}

pub fn channel_sink(capacity: usize) -> (ChannelSink, Receiver<Overlay>) {
    let (tx, rx) = bounded(capacity);
    (
        ChannelSink {
            tx,
            stale: rx.clone(),
        },
        rx,
    )
}

impl RenderSink for ChannelSink {
    fn present(&self, overlay: Overlay) {
        if let Err(TrySendError::Full(overlay)) = self.tx.try_send(overlay) {
            let _ = self.stale.try_recv();
            if self.tx.try_send(overlay).is_err() {
                log::debug!("display busy, overlay dropped");
            }
        }
    }
}
