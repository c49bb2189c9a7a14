//! JSON result files
//!
//! Output directory layout:
//!   results.json              # summary report
//!   hsv1_iterations.json      # per-iteration cells, when HSV-1 ran
//!   hsv2_iterations.json
//!   neonatal_iterations.json
//!   hsvqaly.log

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::runner::{Report, Results};

pub const REPORT_FILE: &str = "results.json";

/// Write bytes to a file atomically using write-then-rename pattern.
pub fn atomic_write_bytes(path: &Path, content: &[u8]) -> io::Result<()> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Serialize `value` as pretty JSON to `path`
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    let json = serde_json::to_vec_pretty(value).map_err(io::Error::other)?;
    atomic_write_bytes(path, &json)
}

fn write_file<T: Serialize + ?Sized>(
    output_dir: &Path,
    name: &str,
    value: &T,
    written: &mut Vec<PathBuf>,
) -> io::Result<()> {
    let path = output_dir.join(name);
    write_json(&path, value)?;
    written.push(path);
    Ok(())
}

/// Write the report and the raw iterations of every run that completed.
///
/// Returns the paths written, report first.
pub fn write_results(
    output_dir: &Path,
    report: &Report,
    results: &Results,
) -> io::Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)?;

    let mut written = Vec::new();
    write_file(output_dir, REPORT_FILE, report, &mut written)?;
    if let Some(run) = &results.hsv1 {
        write_file(output_dir, "hsv1_iterations.json", &run.iterations, &mut written)?;
    }
    if let Some(run) = &results.hsv2 {
        write_file(output_dir, "hsv2_iterations.json", &run.iterations, &mut written)?;
    }
    if let Some(run) = &results.neonatal {
        write_file(output_dir, "neonatal_iterations.json", &run.iterations, &mut written)?;
    }

    Ok(written)
}
