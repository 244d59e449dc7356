use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Inspects *.pcd (point cloud files as created by the pcl library): prints the header,
/// the layout of the point records and the first few points.
#[derive(Parser, Debug, Clone)]
pub struct Arguments {
    /// Verbosity of the log output.
    #[clap(long, default_value = "warn")]
    pub log_level: log::Level,

    /// Maximum number of points to decode from each file.
    #[clap(long, short = 'n', default_value_t = pcd_common::pcd::DEFAULT_SAMPLE_LIMIT)]
    pub samples: u64,

    /// Output format of the report.
    #[clap(long, short, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// The pcd files to inspect.
    #[clap(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human readable summary.
    Text,
    /// The full report as json.
    Json,
}
