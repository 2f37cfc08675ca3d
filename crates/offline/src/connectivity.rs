//! Connectivity monitoring.
//!
//! The host tells us whether the remote store is reachable; the monitor turns
//! that stream of (possibly repeated) signals into a two-state machine and
//! fires a [`Reconnected`] event exactly once per offline to online edge.

use async_trait::async_trait;
use derive_more::Display;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use time::UtcDateTime;
use tokio::sync::{broadcast, watch};

/// Reconnection events are rare; a lagging subscriber only needs the latest.
const EVENT_CAPACITY: usize = 16;

/// A raw reachability signal from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reachability {
    Reachable,
    Unreachable,
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    #[display("online")]
    Online,
    #[display("offline")]
    Offline,
}
impl From<Reachability> for ConnectivityState {
    fn from(reachability: Reachability) -> Self {
        match reachability {
            Reachability::Reachable => Self::Online,
            Reachability::Unreachable => Self::Offline,
        }
    }
}

/// Fired once when the monitor goes from offline to online.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconnected {
    pub at: UtcDateTime,
}

pub type ReachabilityStream<'a> = Pin<Box<dyn Stream<Item = Reachability> + Send + 'a>>;

/// Where reachability signals come from.
///
/// The monitor never asks the host network stack directly, so tests can feed
/// it any sequence of signals they like.
#[async_trait]
pub trait ReachabilitySource: Send + Sync {
    /// Reachability right now, used for the initial state.
    async fn current(&self) -> Reachability;

    /// Signals as they happen. Repeats are allowed; the monitor ignores them.
    fn signals(&self) -> ReachabilityStream<'_>;
}

/// Two-state connectivity machine.
///
/// Cheap to share behind an `Arc`: every method takes `&self`.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    state: watch::Sender<ConnectivityState>,
    reconnected: broadcast::Sender<Reconnected>,
}
impl ConnectivityMonitor {
    pub fn new(initial: ConnectivityState) -> Self {
        let (reconnected, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: watch::Sender::new(initial),
            reconnected,
        }
    }

    /// Start from whatever the source reports right now.
    pub async fn from_source(source: &dyn ReachabilitySource) -> Self {
        Self::new(source.current().await.into())
    }

    pub fn state(&self) -> ConnectivityState {
        *self.state.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.state() == ConnectivityState::Online
    }

    /// Observe state changes.
    pub fn watch(&self) -> watch::Receiver<ConnectivityState> {
        self.state.subscribe()
    }

    /// Receive a [`Reconnected`] event for every offline to online edge from
    /// now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Reconnected> {
        self.reconnected.subscribe()
    }

    /// Feed one reachability signal into the state machine.
    ///
    /// Returns the event fired, if this signal completed an offline to online
    /// edge. Repeated signals for the current state are ignored, so flapping
    /// reachable, reachable, reachable fires at most once.
    pub fn signal(&self, reachability: Reachability) -> Option<Reconnected> {
        let next = ConnectivityState::from(reachability);
        let mut previous = next;
        // Compare-and-set under the channel lock: two callers racing the same
        // edge can't both see it.
        let changed = self.state.send_if_modified(|state| {
            previous = *state;
            let changed = *state != next;
            *state = next;
            changed
        });
        if !changed {
            return None;
        }
        tracing::info!(from = %previous, to = %next, "connectivity changed");
        match next {
            ConnectivityState::Online => {
                let event = Reconnected { at: UtcDateTime::now() };
                // No subscribers is fine; nobody is waiting to reconcile.
                let _ = self.reconnected.send(event);
                Some(event)
            },
            ConnectivityState::Offline => None,
        }
    }

    /// Drive the monitor from a stream of signals until it ends.
    pub async fn follow(&self, signals: impl Stream<Item = Reachability>) {
        let mut signals = std::pin::pin!(signals);
        while let Some(reachability) = signals.next().await {
            self.signal(reachability);
        }
    }
}
