//! Slot storage behind the orchestrator's lock.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, Shared};
use tokio::task::AbortHandle;

use crate::fetcher::{ResourceKind, RiskPayload, RiskRequest};
use crate::notify::{SlotEvent, SlotSnapshot};
use crate::prelude::Result;
use crate::slot::{ResourceSlot, SlotStatus};
use crate::types::{
    sort_history, RiskBenchmark, RiskHistoryPoint, RiskMitigation, RiskScore, SubjectId,
};
use crate::Error;

pub(crate) type SharedFetch = Shared<BoxFuture<'static, Result<RiskPayload>>>;

/// Point-in-time copy of the whole profile: the subject and its four slots.
///
/// Derived views are computed from this, never cached beside it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileSnapshot {
    pub subject: Option<SubjectId>,
    pub generation: u64,
    pub score: ResourceSlot<RiskScore>,
    pub history: ResourceSlot<Vec<RiskHistoryPoint>>,
    pub benchmark: ResourceSlot<RiskBenchmark>,
    pub mitigations: ResourceSlot<Vec<RiskMitigation>>,
}

impl ProfileSnapshot {
    pub fn slot(&self, kind: ResourceKind) -> SlotSnapshot {
        match kind {
            ResourceKind::Score => SlotSnapshot::Score(self.score.clone()),
            ResourceKind::History => SlotSnapshot::History(self.history.clone()),
            ResourceKind::Benchmark => SlotSnapshot::Benchmark(self.benchmark.clone()),
            ResourceKind::Mitigations => SlotSnapshot::Mitigations(self.mitigations.clone()),
        }
    }

    pub fn status(&self, kind: ResourceKind) -> SlotStatus {
        match kind {
            ResourceKind::Score => self.score.status(),
            ResourceKind::History => self.history.status(),
            ResourceKind::Benchmark => self.benchmark.status(),
            ResourceKind::Mitigations => self.mitigations.status(),
        }
    }

    pub fn error(&self, kind: ResourceKind) -> Option<&Error> {
        match kind {
            ResourceKind::Score => self.score.error(),
            ResourceKind::History => self.history.error(),
            ResourceKind::Benchmark => self.benchmark.error(),
            ResourceKind::Mitigations => self.mitigations.error(),
        }
    }
}

/// A fetch currently running for one resource kind.
pub(crate) struct InFlight {
    pub(crate) request: RiskRequest,
    pub(crate) seq: u64,
    pub(crate) shared: SharedFetch,
    pub(crate) abort: AbortHandle,
}

#[derive(Default)]
pub(crate) struct ProfileState {
    pub(crate) profile: ProfileSnapshot,
    pub(crate) in_flight: HashMap<ResourceKind, InFlight>,
    pub(crate) next_seq: u64,
}

/// Check a payload belongs to `kind` and bring it into canonical form.
pub(crate) fn normalize(kind: ResourceKind, payload: RiskPayload) -> Result<RiskPayload> {
    if payload.kind() != kind {
        return Err(Error::malformed(format!(
            "expected {kind} payload, got {}",
            payload.kind()
        )));
    }
    Ok(match payload {
        RiskPayload::History(mut points) => {
            sort_history(&mut points);
            RiskPayload::History(points)
        }
        other => other,
    })
}

impl ProfileState {
    pub(crate) fn issue_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    pub(crate) fn begin_loading(&mut self, kind: ResourceKind) {
        let p = &mut self.profile;
        match kind {
            ResourceKind::Score => p.score.begin_loading(),
            ResourceKind::History => p.history.begin_loading(),
            ResourceKind::Benchmark => p.benchmark.begin_loading(),
            ResourceKind::Mitigations => p.mitigations.begin_loading(),
        }
    }

    /// Record a finished fetch on its slot. `result` must already be normalized.
    pub(crate) fn apply(
        &mut self,
        kind: ResourceKind,
        result: &Result<RiskPayload>,
        completed_at: DateTime<Utc>,
    ) {
        let p = &mut self.profile;
        match result {
            Ok(RiskPayload::Score(score)) => p.score.succeed(score.clone(), completed_at),
            Ok(RiskPayload::History(points)) => p.history.succeed(points.clone(), completed_at),
            Ok(RiskPayload::Benchmark(b)) => p.benchmark.succeed(b.clone(), completed_at),
            Ok(RiskPayload::Mitigations(m)) => p.mitigations.succeed(m.clone(), completed_at),
            Err(error) => match kind {
                ResourceKind::Score => p.score.fail(error.clone()),
                ResourceKind::History => p.history.fail(error.clone()),
                ResourceKind::Benchmark => p.benchmark.fail(error.clone()),
                ResourceKind::Mitigations => p.mitigations.fail(error.clone()),
            },
        }
    }

    pub(crate) fn clear_error(&mut self, kind: ResourceKind) -> bool {
        let p = &mut self.profile;
        match kind {
            ResourceKind::Score => p.score.clear_error(),
            ResourceKind::History => p.history.clear_error(),
            ResourceKind::Benchmark => p.benchmark.clear_error(),
            ResourceKind::Mitigations => p.mitigations.clear_error(),
        }
    }

    /// Reset every slot to idle; returns the kinds that actually changed.
    pub(crate) fn reset_slots(&mut self) -> Vec<ResourceKind> {
        let p = &mut self.profile;
        let changed = [
            (ResourceKind::Score, p.score.reset()),
            (ResourceKind::History, p.history.reset()),
            (ResourceKind::Benchmark, p.benchmark.reset()),
            (ResourceKind::Mitigations, p.mitigations.reset()),
        ];
        changed
            .into_iter()
            .filter_map(|(kind, changed)| changed.then_some(kind))
            .collect()
    }

    pub(crate) fn event(&self, kind: ResourceKind) -> SlotEvent {
        SlotEvent {
            subject: self.profile.subject.clone(),
            generation: self.profile.generation,
            kind,
            slot: self.profile.slot(kind),
        }
    }
}
