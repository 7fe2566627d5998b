//! Slot change notifications.
//!
//! The orchestrator calls [`ObserverRegistry::notify`] after every slot
//! transition. Observers are plain trait objects so any consumer (terminal
//! UI, web bridge, logger) can subscribe without framework coupling.
//!
//! ## Example
//!
//! ```ignore
//! let id = orchestrator.subscribe(Arc::new(|event: &SlotEvent| {
//!     println!("{} -> {:?}", event.kind, event.slot.status());
//! }));
//! // ...
//! orchestrator.unsubscribe(id);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::fetcher::ResourceKind;
use crate::slot::{ResourceSlot, SlotStatus};
use crate::types::{RiskBenchmark, RiskHistoryPoint, RiskMitigation, RiskScore, SubjectId};
use crate::Error;

/// Copy of one slot taken right after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotSnapshot {
    Score(ResourceSlot<RiskScore>),
    History(ResourceSlot<Vec<RiskHistoryPoint>>),
    Benchmark(ResourceSlot<RiskBenchmark>),
    Mitigations(ResourceSlot<Vec<RiskMitigation>>),
}

impl SlotSnapshot {
    pub fn kind(&self) -> ResourceKind {
        match self {
            SlotSnapshot::Score(_) => ResourceKind::Score,
            SlotSnapshot::History(_) => ResourceKind::History,
            SlotSnapshot::Benchmark(_) => ResourceKind::Benchmark,
            SlotSnapshot::Mitigations(_) => ResourceKind::Mitigations,
        }
    }

    pub fn status(&self) -> SlotStatus {
        match self {
            SlotSnapshot::Score(s) => s.status(),
            SlotSnapshot::History(s) => s.status(),
            SlotSnapshot::Benchmark(s) => s.status(),
            SlotSnapshot::Mitigations(s) => s.status(),
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            SlotSnapshot::Score(s) => s.error(),
            SlotSnapshot::History(s) => s.error(),
            SlotSnapshot::Benchmark(s) => s.error(),
            SlotSnapshot::Mitigations(s) => s.error(),
        }
    }
}

/// A single slot transition.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotEvent {
    /// Subject the slot belongs to (`None` after the subject was cleared).
    pub subject: Option<SubjectId>,
    /// Subject generation; bumps on every subject change.
    pub generation: u64,
    pub kind: ResourceKind,
    pub slot: SlotSnapshot,
}

/// Receives every slot transition exactly once while registered.
///
/// Called synchronously on the task that performed the transition, outside
/// the orchestrator's state lock, so observers may read the orchestrator.
pub trait SlotObserver: Send + Sync {
    fn on_slot_event(&self, event: &SlotEvent);
}

impl<F> SlotObserver for F
where
    F: Fn(&SlotEvent) + Send + Sync,
{
    fn on_slot_event(&self, event: &SlotEvent) {
        self(event)
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type ObserverList = Vec<(SubscriptionId, Arc<dyn SlotObserver>)>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
pub struct ObserverRegistry {
    next_id: AtomicU64,
    observers: Mutex<ObserverList>,
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.len())
            .finish()
    }
}

impl ObserverRegistry {
    pub fn subscribe(&self, observer: Arc<dyn SlotObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.observers).push((id, observer));
        id
    }

    /// Returns false if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = lock(&self.observers);
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    pub fn len(&self) -> usize {
        lock(&self.observers).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every observer registered when the round starts.
    ///
    /// The list is copied before delivery: (un)subscribing from inside a
    /// callback takes effect on the next round.
    pub fn notify(&self, event: &SlotEvent) {
        let round: Vec<Arc<dyn SlotObserver>> = lock(&self.observers)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in round {
            observer.on_slot_event(event);
        }
    }
}

/// Observer that forwards events into an unbounded channel.
///
/// Useful for consumers living on another task (e.g. a render loop).
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: UnboundedSender<SlotEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Arc<Self>, UnboundedReceiver<SlotEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Arc::new(Self { sender }), receiver)
    }
}

impl SlotObserver for ChannelObserver {
    fn on_slot_event(&self, event: &SlotEvent) {
        if self.sender.send(event.clone()).is_err() {
            tracing::debug!(kind = %event.kind, "Dropped slot event (receiver closed)");
        }
    }
}
