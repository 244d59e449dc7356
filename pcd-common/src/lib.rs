#![deny(unused_must_use)]

pub mod io;
pub mod pcd;

pub use io::PcdError;
pub use pcd::{analyze, analyze_file, AnalyzeOptions, Note, PcdReport};
