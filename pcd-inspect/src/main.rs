use anyhow::{Context, Result};
use clap::Parser;
use cli::{Arguments, OutputFormat};
use human_panic::setup_panic;
use log::{debug, error, info};
use pcd_common::{analyze_file, AnalyzeOptions};
use std::io::{stdout, Write};
use std::path::Path;
use std::process::ExitCode;

mod cli;
mod render;

fn inspect(path: &Path, options: &AnalyzeOptions, format: OutputFormat) -> Result<()> {
    let report = analyze_file(path, options)?;
    info!(
        "{}: {} header lines, {} sample records, {} notes",
        path.display(),
        report.header.lines.len(),
        report.records.len(),
        report.notes.len()
    );

    let mut out = stdout().lock();
    match format {
        OutputFormat::Text => render::write_text(&mut out, path, &report),
        OutputFormat::Json => render::write_json(&mut out, path, &report),
    }
    .with_context(|| format!("Failed to write the report for {}", path.display()))?;
    out.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    setup_panic!();

    // arg parsing
    let args = Arguments::parse();

    // logger
    // unwrap: will only fail, if the logger is already initialized - which it clearly is not
    simple_logger::init_with_level(args.log_level).unwrap();

    // run
    let options = AnalyzeOptions {
        sample_limit: args.samples,
    };
    let mut failed = false;
    for (i, path) in args.files.iter().enumerate() {
        if i > 0 && args.format == OutputFormat::Text {
            println!();
        }
        if let Err(e) = inspect(path, &options, args.format) {
            error!("{e}");
            debug!("{e:?}");
            failed = true;
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
