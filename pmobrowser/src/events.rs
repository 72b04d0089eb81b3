use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::error::NavigationError;
use crate::models::{ResolvedTrack, Track};

/// Change notifications published by the navigation controller
#[derive(Debug, Clone, PartialEq)]
pub enum BrowserEvent {
    PathChanged(String),
    ContentChanged(Option<ResolvedTrack>),
    TabsChanged(Option<Vec<Track>>),
    NavigationErrorChanged(Option<NavigationError>),
}

#[derive(Clone, Default)]
pub struct BrowserEventBus {
    subscribers: Arc<Mutex<Vec<Sender<BrowserEvent>>>>,
}

impl BrowserEventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn subscribe(&self) -> Receiver<BrowserEvent> {
        let (tx, rx) = unbounded::<BrowserEvent>();
        {
            let mut subscribers = self
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            subscribers.push(tx);
        }
        rx
    }

    pub(crate) fn broadcast(&self, event: BrowserEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_reaches_every_subscriber() {
        let bus = BrowserEventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.broadcast(BrowserEvent::PathChanged("/albums".to_string()));

        assert_eq!(a.try_recv().unwrap(), BrowserEvent::PathChanged("/albums".to_string()));
        assert_eq!(b.try_recv().unwrap(), BrowserEvent::PathChanged("/albums".to_string()));
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let bus = BrowserEventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());

        bus.broadcast(BrowserEvent::ContentChanged(None));
        assert_eq!(bus.subscribers.lock().unwrap().len(), 1);
        assert_eq!(kept.try_recv().unwrap(), BrowserEvent::ContentChanged(None));
    }
}
