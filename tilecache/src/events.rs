//! Tile events and observers.

use std::fmt;
use std::path::PathBuf;

use tracing::trace;

/// Something the host may want to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileEvent {
    /// A downloaded tile was written to the disk cache
    Saved { path: PathBuf },
    /// A tile arrived but no disk cache is configured; `path` is its relative id
    Received { path: PathBuf },
    /// New pixels are available; emitted once per coalesced redraw
    RedrawRequested,
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&TileEvent) + Send>;

/// Fan-out of [`TileEvent`]s to registered observers.
#[derive(Default)]
pub struct EventBus {
    observers: Vec<(SubscriptionId, Observer)>,
    next_id: u64,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&TileEvent) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Removes an observer. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    pub fn emit(&mut self, event: &TileEvent) {
        trace!(?event, observers = self.observers.len(), "Emitting tile event");
        for (_, observer) in &mut self.observers {
            observer(event);
        }
    }
}

/// Single pending-redraw flag.
#[derive(Debug, Default)]
pub struct RedrawFlag {
    pending: bool,
}

impl RedrawFlag {
    /// Marks a redraw as pending. Returns `true` only on the transition
    /// from idle, which is when the host should be notified.
    pub fn request(&mut self) -> bool {
        !std::mem::replace(&mut self.pending, true)
    }

    /// Clears the flag, returning whether a redraw was pending.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_observers_receive_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        let sink = Arc::clone(&seen);
        bus.subscribe(move |e| sink.lock().unwrap().push(e.clone()));

        bus.emit(&TileEvent::RedrawRequested);
        bus.emit(&TileEvent::Saved {
            path: PathBuf::from("/c/1/0/0.png"),
        });

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], TileEvent::RedrawRequested);
    }

    #[test]
    fn test_unsubscribe() {
        let count = Arc::new(Mutex::new(0));
        let mut bus = EventBus::new();
        let c = Arc::clone(&count);
        let id = bus.subscribe(move |_| *c.lock().unwrap() += 1);

        bus.emit(&TileEvent::RedrawRequested);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(&TileEvent::RedrawRequested);

        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn test_redraw_flag_coalesces() {
        let mut flag = RedrawFlag::default();
        assert!(flag.request());
        assert!(!flag.request());
        assert!(flag.is_pending());
        assert!(flag.take());
        assert!(!flag.take());
        assert!(flag.request());
    }
}
