//! Resource fetching: one network call per resource kind, classified failures.
//!
//! [`ResourceFetcher`] is the seam between the orchestrator and the transport.
//! [`RiskClient`] is the production implementation over the REST API; tests
//! substitute scripted fetchers.

pub mod risk_client;

use std::fmt;

use async_trait::async_trait;

use crate::consts::DEFAULT_HISTORY_WINDOW_DAYS;
use crate::prelude::Result;
use crate::types::{RiskBenchmark, RiskHistoryPoint, RiskMitigation, RiskScore, SubjectId};

pub use risk_client::RiskClient;

/// The four independently fetched parts of a risk profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Score,
    History,
    Benchmark,
    Mitigations,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Score,
        ResourceKind::History,
        ResourceKind::Benchmark,
        ResourceKind::Mitigations,
    ];

    /// Returns a short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Score => "score",
            ResourceKind::History => "history",
            ResourceKind::Benchmark => "benchmark",
            ResourceKind::Mitigations => "mitigations",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A fetch request: the resource kind plus its options.
///
/// Two requests are the same request (and may share one network call) only
/// when kind and options are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskRequest {
    /// `force_recalculate` selects the recompute endpoint instead of get-or-compute.
    Score { force_recalculate: bool },
    History { window_days: u32 },
    Benchmark,
    Mitigations,
}

impl RiskRequest {
    pub fn kind(&self) -> ResourceKind {
        match self {
            RiskRequest::Score { .. } => ResourceKind::Score,
            RiskRequest::History { .. } => ResourceKind::History,
            RiskRequest::Benchmark => ResourceKind::Benchmark,
            RiskRequest::Mitigations => ResourceKind::Mitigations,
        }
    }

    /// Default options for `kind`.
    pub fn default_for(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Score => RiskRequest::Score {
                force_recalculate: false,
            },
            ResourceKind::History => RiskRequest::History {
                window_days: DEFAULT_HISTORY_WINDOW_DAYS,
            },
            ResourceKind::Benchmark => RiskRequest::Benchmark,
            ResourceKind::Mitigations => RiskRequest::Mitigations,
        }
    }
}

/// Typed, validated payload for one resource kind.
#[derive(Debug, Clone, PartialEq)]
pub enum RiskPayload {
    Score(RiskScore),
    History(Vec<RiskHistoryPoint>),
    Benchmark(RiskBenchmark),
    Mitigations(Vec<RiskMitigation>),
}

impl RiskPayload {
    pub fn kind(&self) -> ResourceKind {
        match self {
            RiskPayload::Score(_) => ResourceKind::Score,
            RiskPayload::History(_) => ResourceKind::History,
            RiskPayload::Benchmark(_) => ResourceKind::Benchmark,
            RiskPayload::Mitigations(_) => ResourceKind::Mitigations,
        }
    }
}

/// Performs a single network call for one resource and classifies its failure.
///
/// Implementations do not retry and do not refresh credentials. Timeouts are
/// theirs to enforce.
#[async_trait]
pub trait ResourceFetcher: Send + Sync + 'static {
    async fn fetch(&self, subject: &SubjectId, request: RiskRequest) -> Result<RiskPayload>;
}
