//! Consolidated type definitions for supplier risk profiles.
//!
//! This module contains the payload types returned by the risk REST API,
//! together with the schema checks applied to them at the fetcher boundary.

mod benchmark;
mod common;
mod history;
mod mitigation;
mod score;
mod subject;

pub use benchmark::*;
pub use common::{RiskLevel, RiskTrend};
pub use history::*;
pub use mitigation::*;
pub use score::{RiskDriver, RiskScore, SubScores};
pub use subject::*;

#[cfg(test)]
pub(crate) use score::fixtures;
