//! Threshold comparison.

use std::{fmt, num::ParseFloatError, str::FromStr};

use crate::report::CoverageReport;

/// Minimum acceptable line coverage, in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold(f64);

impl Threshold {
    pub fn new(percent: f64) -> Self {
        Self(percent)
    }

    pub fn percent(self) -> f64 {
        self.0
    }
}

impl FromStr for Threshold {
    type Err = ParseFloatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<f64>().map(Self)
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.0)
    }
}

/// Outcome of comparing a report against a threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub percentage: f64,
    pub threshold: Threshold,
    passed: bool,
}

impl Verdict {
    /// Compare inclusively: coverage equal to the threshold passes.
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn evaluate(report: &CoverageReport, threshold: Threshold) -> Self {
        let percentage = report.percentage();
        // Only a strict "below" fails; NaN on either side never does.
        let passed = !(percentage < threshold.percent());
        Self {
            percentage,
            threshold,
            passed,
        }
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn coverage_line(&self) -> String {
        format!("Current Line Coverage: {:.2}%", self.percentage)
    }

    pub fn outcome_line(&self) -> String {
        if self.passed {
            format!(
                "Line coverage {:.2}% meets or exceeds threshold {}",
                self.percentage, self.threshold
            )
        } else {
            format!(
                "Error: Line coverage {:.2}% is below threshold {}",
                self.percentage, self.threshold
            )
        }
    }
}
