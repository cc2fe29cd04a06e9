//! Network reachability as seen by the host.
//!
//! The OS monitor lives in the host app; it pushes each observed state into
//! `Reachability::update`. Subscribers are woken only when the state changes.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    #[default]
    None,
    /// Connected, but constrained (captive portal, low-data mode, ...).
    Limited,
    Full,
}

/// Interface the connection goes through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionSource {
    #[default]
    None,
    Wifi,
    Cellular,
    Ethernet,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReachabilityState {
    pub connectivity: Connectivity,
    pub source: ConnectionSource,
}

impl ReachabilityState {
    pub fn new(connectivity: Connectivity, source: ConnectionSource) -> Self {
        Self {
            connectivity,
            source,
        }
    }

    pub fn offline() -> Self {
        Self::default()
    }

    /// A connection can be used for requests.
    pub fn is_available(&self) -> bool {
        self.connectivity != Connectivity::None
    }
}

/// Latest reachability state plus change notifications.
#[derive(Debug)]
pub struct Reachability {
    tx: watch::Sender<ReachabilityState>,
}

impl Default for Reachability {
    fn default() -> Self {
        Self::new()
    }
}

impl Reachability {
    /// Starts offline until the host reports otherwise.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ReachabilityState::offline());
        Self { tx }
    }

    /// Record a state observed by the host. Returns `true` if it differed
    /// from the previous one.
    pub fn update(&self, state: ReachabilityState) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
        if changed {
            info!(
                connectivity = ?state.connectivity,
                source = ?state.source,
                "reachability changed"
            );
        }
        changed
    }

    pub fn current(&self) -> ReachabilityState {
        *self.tx.borrow()
    }

    pub fn is_available(&self) -> bool {
        self.current().is_available()
    }

    pub fn subscribe(&self) -> watch::Receiver<ReachabilityState> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unavailable() {
        let reachability = Reachability::new();
        assert!(!reachability.is_available());
        assert_eq!(reachability.current(), ReachabilityState::offline());
    }

    #[test]
    fn limited_and_full_are_available() {
        let reachability = Reachability::new();
        reachability.update(ReachabilityState::new(
            Connectivity::Limited,
            ConnectionSource::Cellular,
        ));
        assert!(reachability.is_available());
        reachability.update(ReachabilityState::new(Connectivity::Full, ConnectionSource::Wifi));
        assert!(reachability.is_available());
        reachability.update(ReachabilityState::offline());
        assert!(!reachability.is_available());
    }

    #[test]
    fn update_reports_only_changes() {
        let reachability = Reachability::new();
        let wifi = ReachabilityState::new(Connectivity::Full, ConnectionSource::Wifi);
        assert!(reachability.update(wifi));
        assert!(!reachability.update(wifi));
        assert!(!reachability.update(wifi));
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let reachability = Reachability::new();
        let mut rx = reachability.subscribe();
        assert!(!rx.has_changed().unwrap());

        reachability.update(ReachabilityState::new(Connectivity::Full, ConnectionSource::Ethernet));
        rx.changed().await.unwrap();
        let state = *rx.borrow_and_update();
        assert_eq!(state.source, ConnectionSource::Ethernet);
        assert!(state.is_available());

        reachability.update(state);
        assert!(!rx.has_changed().unwrap());
    }
}
