#![deny(
    warnings,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo
)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::Result;
use clap::Parser;
use nrc2tcx::{ExportSummary, cli, export_activity, utils};
use std::process::ExitCode;

#[macro_use]
extern crate nrc2tcx;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    utils::init_logging(cli.verbose, cli.quiet);

    dlog!(
        "mode=export database={} activity_id={} output={}",
        cli.database.display(),
        cli.activity_id,
        cli.output.display()
    );

    match run(&cli) {
        Ok(summary) => {
            tracing::info!(
                trackpoints = summary.trackpoints,
                samples = summary.samples,
                skipped_rows = summary.skipped_rows,
                "export done"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &cli::Cli) -> Result<ExportSummary> {
    export_activity(
        &cli.database,
        cli.activity_id,
        &cli.output,
        &cli.export_options(),
    )
    .map_err(|e| {
        let stage = e.stage();
        anyhow::Error::new(e).context(format!("{stage} failed"))
    })
}
