//! Report module: prints per-pass benchmark timings and exports them as JSON.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Raw timings of one benchmark procedure on one backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub backend: String,
    pub benchmark: String,
    /// One entry per pass, in milliseconds.
    pub samples_ms: Vec<f64>,
}

impl BenchmarkResult {
    pub fn new(backend: &str, benchmark: &str, samples_ms: Vec<f64>) -> Self {
        Self {
            backend: backend.to_string(),
            benchmark: benchmark.to_string(),
            samples_ms,
        }
    }
}

/// Render the report as text, one block per backend.
pub fn format_report(results: &[BenchmarkResult]) -> String {
    let mut out = String::new();
    let rule = "=".repeat(80);

    out.push_str(&format!("\n{rule}\n"));
    out.push_str("  ORM CRUD Latency Report (ms per pass)\n");
    out.push_str(&format!("{rule}\n"));

    let mut current_backend: Option<&str> = None;
    for result in results {
        if current_backend != Some(result.backend.as_str()) {
            current_backend = Some(result.backend.as_str());
            out.push_str(&format!("\n  Backend: {}\n", result.backend));
            out.push_str(&format!("  {}\n", "-".repeat(60)));
        }

        let samples: Vec<String> = result
            .samples_ms
            .iter()
            .map(|ms| format!("{ms:.3}"))
            .collect();
        out.push_str(&format!(
            "  {:18} {}\n",
            result.benchmark,
            samples.join(" ")
        ));
    }

    out.push_str(&format!("\n{rule}\n"));
    out
}

pub fn print_report(results: &[BenchmarkResult]) {
    println!("{}", format_report(results));
}

/// Write `results` to `path` as pretty-printed JSON.
pub fn write_json(path: &Path, results: &[BenchmarkResult]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create report file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, results)
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    writer.flush()?;
    Ok(())
}
