//! Standalone benchmark runner that prints the formatted report.
//!
//! Usage:
//!   cargo run --release -- [--backend memory|relational|blob|all]
//!                          [--bench NAME]... [--json PATH] [--db PATH]
//!                          [--log-level LEVEL] [--log-file PATH]
//!
//! Pass counts, batch sizes and the generator seed come from the
//! `ORM_BENCH_*` environment variables (a `.env` file is honoured).

use anyhow::{bail, Context, Result};
use log::LevelFilter;
use orm_core::{BenchmarkDriver, BenchmarkKind, DriverConfig, InMemoryBackend, OrmBackend};
use sqlite_bench::backend::{BlobBackend, RelationalBackend};
use sqlite_bench::report::{print_report, write_json, BenchmarkResult};
use std::env;
use std::path::PathBuf;
use std::process;
use std::str::FromStr;

const BACKEND_NAMES: [&str; 3] = ["memory", "relational", "blob"];

#[derive(Debug, PartialEq)]
struct Args {
    backends: Vec<String>,
    benchmarks: Vec<BenchmarkKind>,
    json: Option<PathBuf>,
    db: Option<PathBuf>,
    log_level: LevelFilter,
    log_file: Option<String>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            backends: BACKEND_NAMES.iter().map(|s| s.to_string()).collect(),
            benchmarks: BenchmarkKind::ALL.to_vec(),
            json: None,
            db: None,
            log_level: LevelFilter::Info,
            log_file: None,
        }
    }
}

fn parse_args<I: Iterator<Item = String>>(mut args: I) -> Result<Args> {
    let mut parsed = Args::default();
    let mut benchmarks = Vec::new();

    while let Some(arg) = args.next() {
        let mut value = || {
            args.next()
                .with_context(|| format!("missing value for {arg}"))
        };
        match arg.as_str() {
            "--backend" => {
                let name = value()?;
                parsed.backends = match name.as_str() {
                    "all" => BACKEND_NAMES.iter().map(|s| s.to_string()).collect(),
                    n if BACKEND_NAMES.contains(&n) => vec![n.to_string()],
                    _ => bail!("unknown backend '{name}'"),
                };
            }
            "--bench" => benchmarks.push(BenchmarkKind::from_str(&value()?)?),
            "--json" => parsed.json = Some(PathBuf::from(value()?)),
            "--db" => parsed.db = Some(PathBuf::from(value()?)),
            "--log-level" => {
                let level = value()?;
                parsed.log_level = LevelFilter::from_str(&level)
                    .with_context(|| format!("invalid log level '{level}'"))?;
            }
            "--log-file" => parsed.log_file = Some(value()?),
            other => bail!("unknown argument '{other}'"),
        }
    }

    if !benchmarks.is_empty() {
        parsed.benchmarks = benchmarks;
    }
    Ok(parsed)
}

fn open_backend(name: &str, args: &Args) -> Result<Box<dyn OrmBackend>> {
    let backend: Box<dyn OrmBackend> = match (name, args.db.as_deref()) {
        ("memory", _) => Box::new(InMemoryBackend::new()),
        ("relational", Some(path)) => Box::new(RelationalBackend::open(path)?),
        ("relational", None) => Box::new(RelationalBackend::open_in_memory()?),
        ("blob", Some(path)) => Box::new(BlobBackend::open(path)?),
        ("blob", None) => Box::new(BlobBackend::open_in_memory()?),
        _ => bail!("unknown backend '{name}'"),
    };
    Ok(backend)
}

fn run_backend(name: &str, args: &Args, config: &DriverConfig) -> Result<Vec<BenchmarkResult>> {
    let backend = open_backend(name, args)?;
    let mut driver = BenchmarkDriver::new(backend, config.clone())?;
    driver.warming_up()?;

    let mut results = Vec::with_capacity(args.benchmarks.len());
    for &kind in &args.benchmarks {
        eprint!("  Benchmarking {name}/{kind}...");
        let samples = driver.run(kind)?;
        eprintln!(" done");
        results.push(BenchmarkResult::new(name, kind.name(), samples));
    }
    Ok(results)
}

fn run(args: &Args) -> Result<()> {
    let config = DriverConfig::from_env()?;
    log::info!(
        "{} passes, simple batch {}, seed {:?}",
        config.passes,
        config.simple_batch,
        config.seed
    );

    let mut results = Vec::new();
    for name in &args.backends {
        results.extend(run_backend(name, args, &config)?);
    }

    print_report(&results);
    if let Some(path) = &args.json {
        write_json(path, &results)?;
        log::info!("Report written to {}", path.display());
    }
    Ok(())
}

fn main() {
    dotenvy::dotenv().ok();

    let args = parse_args(env::args().skip(1)).unwrap_or_else(|e| {
        eprintln!("{e:#}");
        process::exit(2);
    });

    orm_core::initialize_logger(args.log_level, args.log_file.as_deref()).unwrap_or_else(|e| {
        eprintln!("Failed to initialize logger: {}. Exiting.", e);
        process::exit(1);
    });

    if let Err(e) = run(&args) {
        log::error!("Benchmark run failed: {e:#}");
        process::exit(1);
    }
}
