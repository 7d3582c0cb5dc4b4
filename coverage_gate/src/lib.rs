//! Coverage gate for CI pipelines.
//!
//! Reads the overall `line-rate` from a Cobertura XML report and compares it,
//! as a percentage, against a caller-supplied threshold.

pub mod app;
pub mod error;
pub mod gate;
pub mod report;

pub use error::{CoverageError, CoverageResult};
pub use gate::{Threshold, Verdict};
pub use report::{CoverageReport, LineRateSource};
