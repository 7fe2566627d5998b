//! Risk profile orchestrator: per-subject slots, concurrent fetches, cancellation.
//!
//! One [`RiskOrchestrator`] tracks the four resources of the active subject.
//! Handles are cheap clones of the same instance.
//!
//! # Concurrency
//!
//! - Different resource kinds fetch fully in parallel (`fetch_all`).
//! - A fetch identical to one already in flight (same kind and options) is
//!   coalesced: the caller awaits the running request, no second network call.
//! - A fetch for the same kind with different options supersedes the running
//!   one: the slot only accepts the latest-issued completion; earlier callers
//!   still receive their own result. This is deliberately not "last completed
//!   wins": a slow get-or-compute response landing after a recalculation
//!   would otherwise overwrite the newer score with an older one, so the slot
//!   follows the order in which requests were made rather than network timing.
//! - Changing the subject aborts every in-flight fetch. A completion that
//!   races the switch is discarded and its callers get [`Error::Cancelled`].
//!
//! Slot state sits behind one mutex that is never held across an await, so
//! each `(status, data, error, last_updated_at)` tuple changes atomically and
//! observers never see a half-applied transition.

mod state;


use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use futures_util::FutureExt;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

pub use state::ProfileSnapshot;
use state::{normalize, InFlight, ProfileState};

use crate::config::OrchestratorConfig;
use crate::derived;
use crate::fetcher::{ResourceFetcher, ResourceKind, RiskPayload, RiskRequest};
use crate::notify::{ObserverRegistry, SlotEvent, SlotObserver, SubscriptionId};
use crate::prelude::Result;
use crate::types::{
    RiskBenchmark, RiskDriver, RiskHistoryPoint, RiskLevel, RiskMitigation, RiskScore, RiskTrend,
    SubjectId,
};
use crate::Error;

const LOG_TARGET: &str = "supplier_risk_sdk::orchestrator";

/// Which slot(s) `clear_error` applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearTarget {
    Kind(ResourceKind),
    All,
}

impl From<ResourceKind> for ClearTarget {
    fn from(kind: ResourceKind) -> Self {
        ClearTarget::Kind(kind)
    }
}

struct Inner<F> {
    fetcher: Arc<F>,
    config: OrchestratorConfig,
    state: Mutex<ProfileState>,
    observers: ObserverRegistry,
}

impl<F> Inner<F> {
    fn lock_state(&self) -> MutexGuard<'_, ProfileState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify_all(&self, events: &[SlotEvent]) {
        for event in events {
            self.observers.notify(event);
        }
    }

    /// Land a finished fetch on its slot, unless the subject moved on or a
    /// newer request for the kind took over.
    fn complete(
        &self,
        kind: ResourceKind,
        generation: u64,
        seq: u64,
        result: Result<RiskPayload>,
    ) -> Result<RiskPayload> {
        let result = result.and_then(|payload| normalize(kind, payload));

        let event = {
            let mut state = self.lock_state();
            if state.profile.generation != generation {
                debug!(
                    target: LOG_TARGET,
                    kind = %kind,
                    generation,
                    current_generation = state.profile.generation,
                    "Discarding completion for previous subject"
                );
                return Err(Error::Cancelled);
            }
            if state.in_flight.get(&kind).map(|f| f.seq) != Some(seq) {
                debug!(target: LOG_TARGET, kind = %kind, seq, "Completion superseded by newer request");
                return result;
            }
            state.in_flight.remove(&kind);
            state.apply(kind, &result, Utc::now());
            state.event(kind)
        };

        match &result {
            Ok(_) => debug!(target: LOG_TARGET, kind = %kind, generation, "Slot ready"),
            Err(e) => warn!(
                target: LOG_TARGET,
                kind = %kind,
                generation,
                error = %e,
                error_kind = %e.kind(),
                "Slot failed"
            ),
        }
        self.observers.notify(&event);
        result
    }
}

impl<F> Drop for Inner<F> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, in_flight) in state.in_flight.drain() {
            in_flight.abort.abort();
        }
    }
}

/// Owner of the four resource slots for the active subject.
pub struct RiskOrchestrator<F> {
    inner: Arc<Inner<F>>,
}

impl<F> Clone for RiskOrchestrator<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F> std::fmt::Debug for RiskOrchestrator<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock_state();
        f.debug_struct("RiskOrchestrator")
            .field("subject", &state.profile.subject)
            .field("generation", &state.profile.generation)
            .field("in_flight", &state.in_flight.len())
            .field("observers", &self.inner.observers)
            .finish()
    }
}

impl<F: ResourceFetcher> RiskOrchestrator<F> {
    pub fn new(fetcher: F) -> Self {
        Self::with_config(fetcher, OrchestratorConfig::default())
    }

    pub fn with_config(fetcher: F, config: OrchestratorConfig) -> Self {
        Self::from_shared(Arc::new(fetcher), config)
    }

    /// Share one fetcher (and its connection pool) between orchestrators.
    pub fn from_shared(fetcher: Arc<F>, config: OrchestratorConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                config,
                state: Mutex::new(ProfileState::default()),
                observers: ObserverRegistry::default(),
            }),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    pub fn subject(&self) -> Option<SubjectId> {
        self.inner.lock_state().profile.subject.clone()
    }

    pub fn snapshot(&self) -> ProfileSnapshot {
        self.inner.lock_state().profile.clone()
    }

    pub fn subscribe(&self, observer: Arc<dyn SlotObserver>) -> SubscriptionId {
        self.inner.observers.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.observers.unsubscribe(id)
    }

    // =========================================================================
    // Subject lifecycle
    // =========================================================================

    /// Switch the active subject.
    ///
    /// When `subject` differs from the current one, every in-flight fetch is
    /// aborted and all four slots are reset to idle before the new subject
    /// becomes visible. `None` means no active subject: fetches become no-ops.
    /// Returns whether the subject changed.
    pub fn set_subject(&self, subject: Option<SubjectId>) -> bool {
        let events = {
            let mut state = self.inner.lock_state();
            if state.profile.subject == subject {
                return false;
            }

            for (kind, in_flight) in state.in_flight.drain() {
                debug!(target: LOG_TARGET, kind = %kind, seq = in_flight.seq, "Aborting in-flight fetch");
                in_flight.abort.abort();
            }
            let changed = state.reset_slots();
            state.profile.generation += 1;
            state.profile.subject = subject.clone();

            info!(
                target: LOG_TARGET,
                subject = subject.as_ref().map(SubjectId::as_str).unwrap_or("<none>"),
                generation = state.profile.generation,
                "Subject changed"
            );
            changed
                .into_iter()
                .map(|kind| state.event(kind))
                .collect::<Vec<_>>()
        };

        self.inner.notify_all(&events);
        true
    }

    /// Switch subject and immediately load its whole profile.
    pub async fn select_subject(&self, subject: Option<SubjectId>) -> ProfileSnapshot {
        self.set_subject(subject);
        self.fetch_all().await
    }

    // =========================================================================
    // Fetch operations
    // =========================================================================

    /// Fetch the score; `force_recalculate` asks the backend to recompute it.
    ///
    /// Returns `Ok(None)` without touching any slot when no subject is set.
    /// Failures are stored on the slot and returned.
    pub async fn fetch_score(&self, force_recalculate: bool) -> Result<Option<RiskScore>> {
        match self.run(RiskRequest::Score { force_recalculate }).await? {
            Some(RiskPayload::Score(score)) => Ok(Some(score)),
            Some(other) => Err(mismatch(ResourceKind::Score, &other)),
            None => Ok(None),
        }
    }

    /// Fetch the score history for the last `window_days`, ascending by date.
    pub async fn fetch_history(&self, window_days: u32) -> Result<Option<Vec<RiskHistoryPoint>>> {
        match self.run(RiskRequest::History { window_days }).await? {
            Some(RiskPayload::History(points)) => Ok(Some(points)),
            Some(other) => Err(mismatch(ResourceKind::History, &other)),
            None => Ok(None),
        }
    }

    pub async fn fetch_benchmark(&self) -> Result<Option<RiskBenchmark>> {
        match self.run(RiskRequest::Benchmark).await? {
            Some(RiskPayload::Benchmark(benchmark)) => Ok(Some(benchmark)),
            Some(other) => Err(mismatch(ResourceKind::Benchmark, &other)),
            None => Ok(None),
        }
    }

    pub async fn fetch_mitigations(&self) -> Result<Option<Vec<RiskMitigation>>> {
        match self.run(RiskRequest::Mitigations).await? {
            Some(RiskPayload::Mitigations(mitigations)) => Ok(Some(mitigations)),
            Some(other) => Err(mismatch(ResourceKind::Mitigations, &other)),
            None => Ok(None),
        }
    }

    /// Fetch all four resources concurrently.
    ///
    /// Never fails: each branch settles independently and its outcome is
    /// visible on its slot. Resolves once every branch has settled and
    /// returns the resulting snapshot.
    pub async fn fetch_all(&self) -> ProfileSnapshot {
        self.fetch_all_with(false).await
    }

    /// Like [`fetch_all`](Self::fetch_all), but the score branch asks the
    /// backend to recompute. Exactly one score request is issued.
    pub async fn recalculate_all(&self) -> ProfileSnapshot {
        self.fetch_all_with(true).await
    }

    async fn fetch_all_with(&self, force_recalculate: bool) -> ProfileSnapshot {
        let window_days = self.inner.config.history_window_days;
        let (score, history, benchmark, mitigations) = tokio::join!(
            self.fetch_score(force_recalculate),
            self.fetch_history(window_days),
            self.fetch_benchmark(),
            self.fetch_mitigations(),
        );

        let failures = [
            score.err(),
            history.err(),
            benchmark.err(),
            mitigations.err(),
        ];
        let failed = failures.iter().flatten().count();
        if failed > 0 {
            warn!(target: LOG_TARGET, failed, "fetch_all settled with failures; see slot errors");
        }
        self.snapshot()
    }

    /// Clear the error on one or all slots without touching status or data.
    pub fn clear_error(&self, target: impl Into<ClearTarget>) {
        let kinds = match target.into() {
            ClearTarget::Kind(kind) => vec![kind],
            ClearTarget::All => ResourceKind::ALL.to_vec(),
        };
        let events = {
            let mut state = self.inner.lock_state();
            let mut events = Vec::new();
            for kind in kinds {
                if state.clear_error(kind) {
                    events.push(state.event(kind));
                }
            }
            events
        };
        self.inner.notify_all(&events);
    }

    /// Start (or join) the fetch for `request`.
    ///
    /// The loading transition, the in-flight registration and the task spawn
    /// happen under one lock acquisition; the task is held at a start gate
    /// until the loading event has been delivered, so observers always see
    /// `loading` before the completion.
    async fn run(&self, request: RiskRequest) -> Result<Option<RiskPayload>> {
        let kind = request.kind();

        let (shared, started) = {
            let mut state = self.inner.lock_state();
            let Some(subject) = state.profile.subject.clone() else {
                return Ok(None);
            };

            let running = state
                .in_flight
                .get(&kind)
                .map(|f| (f.seq, f.request == request, f.shared.clone()));

            match running {
                Some((seq, true, shared)) => {
                    debug!(target: LOG_TARGET, kind = %kind, seq, "Coalescing with in-flight fetch");
                    (shared, None)
                }
                previous => {
                    if let Some((superseded_seq, _, _)) = previous {
                        debug!(
                            target: LOG_TARGET,
                            kind = %kind,
                            superseded_seq,
                            "Superseding in-flight fetch with different options"
                        );
                    }
                    let generation = state.profile.generation;
                    let seq = state.issue_seq();
                    state.begin_loading(kind);

                    let (start_tx, start_rx) = oneshot::channel::<()>();
                    let fetcher = Arc::clone(&self.inner.fetcher);
                    let weak = Arc::downgrade(&self.inner);
                    let handle = tokio::spawn(async move {
                        if start_rx.await.is_err() {
                            return Err(Error::Cancelled);
                        }
                        let result = fetcher.fetch(&subject, request).await;
                        match weak.upgrade() {
                            Some(inner) => inner.complete(kind, generation, seq, result),
                            None => Err(Error::Cancelled),
                        }
                    });
                    let abort = handle.abort_handle();

                    let weak = Arc::downgrade(&self.inner);
                    let shared = async move {
                        match handle.await {
                            Ok(result) => result,
                            Err(join_error) if join_error.is_cancelled() => Err(Error::Cancelled),
                            Err(join_error) => {
                                let error = Error::malformed(format!("fetch task panicked: {join_error}"));
                                match weak.upgrade() {
                                    Some(inner) => inner.complete(kind, generation, seq, Err(error)),
                                    None => Err(error),
                                }
                            }
                        }
                    }
                    .boxed()
                    .shared();

                    state.in_flight.insert(
                        kind,
                        InFlight {
                            request,
                            seq,
                            shared: shared.clone(),
                            abort,
                        },
                    );
                    debug!(target: LOG_TARGET, kind = %kind, seq, generation, "Fetch started");
                    (shared, Some((state.event(kind), start_tx)))
                }
            }
        };

        if let Some((loading_event, start_tx)) = started {
            self.inner.observers.notify(&loading_event);
            // Receiver gone means the subject already changed and the task was aborted.
            let _ = start_tx.send(());
        }

        shared.await.map(Some)
    }

    // =========================================================================
    // Derived views (always recomputed from the current slots)
    // =========================================================================

    /// Score drivers by descending weight, at most `n`.
    pub fn top_drivers(&self, n: usize) -> Vec<RiskDriver> {
        derived::top_drivers(&self.snapshot(), n)
    }

    pub fn current_trend(&self) -> Option<RiskTrend> {
        derived::current_trend(&self.snapshot())
    }

    /// Bucket `value`, or the current score when `None`, on the 0-100 scale.
    pub fn level_for(&self, value: Option<f64>) -> Option<RiskLevel> {
        derived::level_for(&self.snapshot(), value)
    }

    pub fn is_stale(&self, max_age: Duration) -> bool {
        derived::is_stale(&self.snapshot(), max_age, Utc::now())
    }

    /// True while any slot is loading.
    pub fn is_loading(&self) -> bool {
        derived::is_loading(&self.snapshot())
    }
}

fn mismatch(expected: ResourceKind, payload: &RiskPayload) -> Error {
    Error::malformed(format!(
        "expected {expected} payload, got {}",
        payload.kind()
    ))
}
