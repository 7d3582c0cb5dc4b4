use std::{
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::{
    error::CoverageError,
    gate::{Threshold, Verdict},
    report::CoverageReport,
};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "coverage_gate",
    about = "Fail a CI step when Cobertura line coverage is below a threshold",
    long_about = None,
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct Args {
    /// Path to the Cobertura XML coverage report
    #[arg(value_name = "COVERAGE_XML_FILE")]
    pub coverage_xml_file: PathBuf,

    /// Minimum line coverage, in percent (e.g. 80)
    #[arg(value_name = "THRESHOLD_PERCENTAGE", allow_negative_numbers = true)]
    pub threshold_percentage: Threshold,
}

#[derive(Debug, Clone)]
pub struct GateConfig {
    pub report_path: PathBuf,
    pub threshold: Threshold,
}

impl From<Args> for GateConfig {
    fn from(value: Args) -> Self {
        Self {
            report_path: value.coverage_xml_file,
            threshold: value.threshold_percentage,
        }
    }
}

/// How a gate run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    BelowThreshold,
    InputError,
    OutputError,
}

impl Outcome {
    pub fn code(self) -> u8 {
        match self {
            Self::Passed => 0,
            Self::BelowThreshold | Self::InputError | Self::OutputError => 1,
        }
    }
}

impl From<Outcome> for ExitCode {
    fn from(value: Outcome) -> Self {
        ExitCode::from(value.code())
    }
}

/// Diagnostics go to stderr and default to `warn`, leaving the status lines alone.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

/// Print the clap error with usage to stderr.
///
/// Every parse failure exits 1 instead of clap's default 2. There are no
/// help or version flags, so no argument list skips the check with success.
pub fn usage_error(err: clap::Error) -> ExitCode {
    eprint!("{}", err.render());
    ExitCode::FAILURE
}

pub fn run(config: &GateConfig) -> Outcome {
    let stdout = io::stdout();
    let stderr = io::stderr();
    run_with(config, &mut stdout.lock(), &mut stderr.lock())
}

/// Run the gate, writing status lines to `out` and failures to `err`.
pub fn run_with(config: &GateConfig, out: &mut impl Write, err: &mut impl Write) -> Outcome {
    info!(
        report = %config.report_path.display(),
        threshold = config.threshold.percent(),
        "Checking line coverage",
    );

    match check(config, out, err) {
        Ok(outcome) => {
            debug!(?outcome, "Coverage gate finished");
            outcome
        }
        Err(write_err) => {
            error!(error = %write_err, "Failed to report coverage result");
            Outcome::OutputError
        }
    }
}

fn check(config: &GateConfig, out: &mut impl Write, err: &mut impl Write) -> Result<Outcome> {
    let report = match CoverageReport::load(&config.report_path) {
        Ok(report) => report,
        Err(load_err) => {
            info!(error = %load_err, "Coverage report unusable");
            writeln!(err, "{}", error_line(&load_err)).context("failed to write error line")?;
            return Ok(Outcome::InputError);
        }
    };

    let verdict = Verdict::evaluate(&report, config.threshold);
    debug!(
        source = %report.source(),
        percentage = verdict.percentage,
        passed = verdict.passed(),
        "Evaluated coverage",
    );

    writeln!(out, "{}", verdict.coverage_line()).context("failed to write coverage line")?;
    if verdict.passed() {
        writeln!(out, "{}", verdict.outcome_line()).context("failed to write pass line")?;
        Ok(Outcome::Passed)
    } else {
        out.flush().context("failed to flush stdout")?;
        writeln!(err, "{}", verdict.outcome_line()).context("failed to write failure line")?;
        Ok(Outcome::BelowThreshold)
    }
}

/// Stderr line for a report that could not be used.
pub fn error_line(err: &CoverageError) -> String {
    match err {
        CoverageError::NotFound { .. } | CoverageError::MissingLineRate { .. } => {
            format!("Error: {err}")
        }
        CoverageError::Io { .. }
        | CoverageError::Malformed { .. }
        | CoverageError::InvalidLineRate { .. } => {
            format!("Error parsing XML or checking coverage: {err}")
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use std::{fs, path::Path};

    use clap::error::ErrorKind;
    use tempfile::{tempdir, TempDir};

    use super::*;

    fn write_report(contents: &str) -> (TempDir, PathBuf) {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("coverage.cobertura.xml");
        fs::write(&path, contents).expect("write report");
        (dir, path)
    }

    fn gate(path: &Path, threshold: f64) -> (Outcome, String, String) {
        let config = GateConfig {
            report_path: path.to_path_buf(),
            threshold: Threshold::new(threshold),
        };
        let mut out = Vec::new();
        let mut err = Vec::new();
        let outcome = run_with(&config, &mut out, &mut err);
        (
            outcome,
            String::from_utf8(out).expect("utf8 stdout"),
            String::from_utf8(err).expect("utf8 stderr"),
        )
    }

    #[test]
    fn args__two_positionals__then_converts_to_config() {
        let args = Args::try_parse_from(["coverage_gate", "coverage.xml", "80"]).unwrap();
        let config = GateConfig::from(args);

        assert_eq!(config.report_path, PathBuf::from("coverage.xml"));
        assert_eq!(config.threshold.percent(), 80.0);
    }

    #[test]
    fn args__negative_threshold__then_accepted_as_value() {
        let args = Args::try_parse_from(["coverage_gate", "coverage.xml", "-5"]).unwrap();
        assert_eq!(args.threshold_percentage.percent(), -5.0);
    }

    #[test]
    fn args__missing_threshold__then_usage_error() {
        let err = Args::try_parse_from(["coverage_gate", "coverage.xml"]).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert!(err.use_stderr());
    }

    #[test]
    fn args__extra_positional__then_usage_error() {
        let err =
            Args::try_parse_from(["coverage_gate", "coverage.xml", "80", "90"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn args__non_numeric_threshold__then_value_validation_error() {
        let err = Args::try_parse_from(["coverage_gate", "coverage.xml", "abc"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn args__help_or_version_flag__then_rejected_as_unknown() {
        for argv in [
            vec!["coverage_gate", "coverage.xml", "--help"],
            vec!["coverage_gate", "coverage.xml", "-h"],
            vec!["coverage_gate", "coverage.xml", "--version"],
            vec!["coverage_gate", "--help"],
        ] {
            let err = Args::try_parse_from(argv.iter().copied()).unwrap_err();

            assert_eq!(err.kind(), ErrorKind::UnknownArgument, "argv: {argv:?}");
            assert!(err.use_stderr(), "argv: {argv:?}");
        }
    }

    #[test]
    fn outcome__codes__then_only_pass_is_zero() {
        assert_eq!(Outcome::Passed.code(), 0);
        assert_eq!(Outcome::BelowThreshold.code(), 1);
        assert_eq!(Outcome::InputError.code(), 1);
        assert_eq!(Outcome::OutputError.code(), 1);
    }

    #[test]
    fn run__root_rate_above_threshold__then_passes_on_stdout() {
        let (_dir, path) = write_report(r#"<coverage line-rate="0.85"/>"#);

        let (outcome, out, err) = gate(&path, 80.0);

        assert_eq!(outcome, Outcome::Passed);
        assert_eq!(
            out,
            "Current Line Coverage: 85.00%\nLine coverage 85.00% meets or exceeds threshold 80.00%\n"
        );
        assert!(err.is_empty());
    }

    #[test]
    fn run__root_rate_below_threshold__then_fails_on_stderr() {
        let (_dir, path) = write_report(r#"<coverage line-rate="0.75"/>"#);

        let (outcome, out, err) = gate(&path, 80.0);

        assert_eq!(outcome, Outcome::BelowThreshold);
        assert_eq!(out, "Current Line Coverage: 75.00%\n");
        assert_eq!(
            err,
            "Error: Line coverage 75.00% is below threshold 80.00%\n"
        );
    }

    #[test]
    fn run__package_fallback__then_passes() {
        let (_dir, path) = write_report(
            r#"<coverage><packages><package name="app" line-rate="0.92"/></packages></coverage>"#,
        );

        let (outcome, out, _) = gate(&path, 90.0);

        assert_eq!(outcome, Outcome::Passed);
        assert!(out.starts_with("Current Line Coverage: 92.00%\n"));
    }

    #[test]
    fn run__missing_file__then_reports_path() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nope.xml");

        let (outcome, out, err) = gate(&path, 80.0);

        assert_eq!(outcome, Outcome::InputError);
        assert!(out.is_empty());
        assert_eq!(
            err,
            format!("Error: Coverage XML file not found at {}\n", path.display())
        );
    }

    #[test]
    fn run__no_line_rate__then_could_not_find() {
        let (_dir, path) = write_report("<coverage><packages/></coverage>");

        let (outcome, _, err) = gate(&path, 80.0);

        assert_eq!(outcome, Outcome::InputError);
        assert_eq!(
            err,
            format!(
                "Error: Could not find 'line-rate' attribute in {}\n",
                path.display()
            )
        );
    }

    #[test]
    fn run__malformed_xml__then_generic_parse_error() {
        let (_dir, path) = write_report("<coverage line-rate=\"0.9\">");

        let (outcome, out, err) = gate(&path, 80.0);

        assert_eq!(outcome, Outcome::InputError);
        assert!(out.is_empty());
        assert!(err.starts_with("Error parsing XML or checking coverage: malformed XML in"));
    }

    #[test]
    fn run__non_numeric_line_rate__then_generic_parse_error() {
        let (_dir, path) = write_report(r#"<coverage line-rate="N/A"/>"#);

        let (outcome, _, err) = gate(&path, 80.0);

        assert_eq!(outcome, Outcome::InputError);
        assert!(err.starts_with("Error parsing XML or checking coverage:"));
        assert!(err.contains("\"N/A\""));
    }

    #[test]
    fn run__same_input_twice__then_identical_output() {
        let (_dir, path) = write_report(r#"<coverage line-rate="0.5"/>"#);

        assert_eq!(gate(&path, 75.0), gate(&path, 75.0));
    }

    #[test]
    fn init_tracing__called_twice__then_does_not_panic() {
        init_tracing();
        init_tracing();
    }
}
