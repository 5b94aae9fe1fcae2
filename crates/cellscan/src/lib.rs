//! Risk-assessment quiz engine behind the CellScan screening portal.
//!
//! The [`quiz`] module holds the engine itself; [`config`], [`telemetry`] and [`error`]
//! carry the ambient pieces shared with the `cellscan-api` binary.

pub mod config;
pub mod error;
pub mod quiz;
pub mod telemetry;
