// src/reload.rs

//! Live-reload notification channel.
//!
//! A thin wrapper around a Tokio broadcast channel. Delivery is best effort:
//! only receivers subscribed at send time see an event, and a receiver that
//! falls behind skips what it missed.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::types::{AssetClass, ReloadScope};

/// Buffered events per subscriber before it starts lagging.
const CHANNEL_CAPACITY: usize = 32;

/// Event pushed to connected clients after a successful pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReloadEvent {
    pub asset: AssetClass,
    pub scope: ReloadScope,
}

impl ReloadEvent {
    pub fn for_asset(asset: AssetClass) -> Self {
        Self {
            asset,
            scope: asset.reload_scope(),
        }
    }

    /// Wire form sent over the WebSocket.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"scope":"full-reload"}"#.to_string())
    }
}

/// Cloneable fan-out point shared by pipelines and the dev server.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    tx: broadcast::Sender<ReloadEvent>,
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Send a reload event for `asset` to every current subscriber.
    ///
    /// Returns how many subscribers were reached (zero is not an error).
    pub fn broadcast(&self, asset: AssetClass) -> usize {
        let event = ReloadEvent::for_asset(asset);
        let reached = self.tx.send(event).unwrap_or(0);
        debug!(%asset, reached, "reload event broadcast");
        reached
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn late_subscribers_miss_earlier_events() {
        let hub = ReloadHub::new();
        assert_eq!(hub.broadcast(AssetClass::Page), 0);

        let mut rx = hub.subscribe();
        assert!(rx.try_recv().is_err());

        assert_eq!(hub.broadcast(AssetClass::Style), 1);
        let event = rx.try_recv().unwrap();
        assert_eq!(event.asset, AssetClass::Style);
        assert_eq!(event.scope, ReloadScope::InPlace);
    }

    #[test]
    fn fans_out_to_every_subscriber_in_order() {
        let hub = ReloadHub::new();
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        assert_eq!(hub.broadcast(AssetClass::Script), 2);
        assert_eq!(hub.broadcast(AssetClass::Image), 2);

        for rx in [&mut a, &mut b] {
            assert_eq!(rx.try_recv().unwrap().asset, AssetClass::Script);
            assert_eq!(rx.try_recv().unwrap().asset, AssetClass::Image);
        }
    }

    #[test]
    fn json_wire_form() {
        let json = ReloadEvent::for_asset(AssetClass::Font).to_json();
        assert_eq!(json, r#"{"asset":"font","scope":"full-reload"}"#);
    }
}
