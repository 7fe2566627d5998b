//! Per-resource state cell.
//!
//! ```text
//! idle ──► loading ──► ready ──► loading ──► ready | failed
//!              │                    ▲
//!              └──► failed ─────────┘
//! ```
//!
//! No state is terminal. Entering `loading` keeps the last data so consumers
//! can render stale data with a loading indicator; entering `failed` keeps it
//! too (stale-but-available). Only `ready` replaces data and stamps the time.

use chrono::{DateTime, Utc};

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed,
}

/// State of one resource kind for the active subject.
///
/// Fields are read-only outside the crate; transitions go through the
/// orchestrator so the `(status, data, error, last_updated_at)` tuple always
/// changes as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSlot<T> {
    status: SlotStatus,
    data: Option<T>,
    error: Option<Error>,
    last_updated_at: Option<DateTime<Utc>>,
}

impl<T> Default for ResourceSlot<T> {
    fn default() -> Self {
        Self {
            status: SlotStatus::Idle,
            data: None,
            error: None,
            last_updated_at: None,
        }
    }
}

impl<T> ResourceSlot<T> {
    pub fn status(&self) -> SlotStatus {
        self.status
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Completion time of the last successful fetch.
    pub fn last_updated_at(&self) -> Option<DateTime<Utc>> {
        self.last_updated_at
    }

    pub fn is_loading(&self) -> bool {
        self.status == SlotStatus::Loading
    }

    /// True for a slot that has never been touched since creation or reset.
    pub fn is_pristine(&self) -> bool {
        self.status == SlotStatus::Idle
            && self.data.is_none()
            && self.error.is_none()
            && self.last_updated_at.is_none()
    }

    /// Enter `loading`. Data is kept; a previous error is dropped.
    pub(crate) fn begin_loading(&mut self) {
        self.status = SlotStatus::Loading;
        self.error = None;
    }

    /// Enter `ready` with fresh data fetched at `completed_at`.
    pub(crate) fn succeed(&mut self, data: T, completed_at: DateTime<Utc>) {
        self.status = SlotStatus::Ready;
        self.data = Some(data);
        self.error = None;
        self.last_updated_at = Some(completed_at);
    }

    /// Enter `failed`. Previous data (if any) stays available.
    pub(crate) fn fail(&mut self, error: Error) {
        self.status = SlotStatus::Failed;
        self.error = Some(error);
    }

    /// Drop the error without touching status or data. Returns whether anything changed.
    pub(crate) fn clear_error(&mut self) -> bool {
        self.error.take().is_some()
    }

    /// Back to `idle` with nothing held. Returns whether anything changed.
    pub(crate) fn reset(&mut self) -> bool {
        let changed = !self.is_pristine();
        *self = Self::default();
        changed
    }
}
