use std::process::ExitCode;

use clap::Parser;
use coverage_gate::app::{self, Args, GateConfig};

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => return app::usage_error(err),
    };
    app::init_tracing();
    let config = GateConfig::from(args);
    app::run(&config).into()
}
