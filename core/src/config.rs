//! Driver configuration: pass count, workload shapes and warm-up size.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

pub const DEFAULT_NUMBER_OF_PASSES: usize = 10;
pub const DEFAULT_SIMPLE_BATCH: usize = 1000;

pub const PASSES_ENV_VAR: &str = "ORM_BENCH_PASSES";
pub const SIMPLE_BATCH_ENV_VAR: &str = "ORM_BENCH_SIMPLE_BATCH";
pub const SEED_ENV_VAR: &str = "ORM_BENCH_SEED";

/// Size of one composite batch. `books` and `persons` are per library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadShape {
    pub libraries: usize,
    pub books: usize,
    pub persons: usize,
}

impl WorkloadShape {
    pub const fn new(libraries: usize, books: usize, persons: usize) -> Self {
        Self {
            libraries,
            books,
            persons,
        }
    }

    /// 50 libraries × 50 books × 50 persons.
    pub const fn balanced() -> Self {
        Self::new(50, 50, 50)
    }

    /// 5 libraries, 500 books and 400 persons each.
    pub const fn complex() -> Self {
        Self::new(5, 500, 400)
    }

    pub fn total_books(&self) -> usize {
        self.libraries * self.books
    }

    pub fn total_persons(&self) -> usize {
        self.libraries * self.persons
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarmUpConfig {
    pub iterations: usize,
    pub libraries: usize,
    pub books: usize,
    pub persons: usize,
}

impl Default for WarmUpConfig {
    fn default() -> Self {
        Self {
            iterations: 5,
            libraries: 2,
            books: 10,
            persons: 10,
        }
    }
}

impl WarmUpConfig {
    pub fn shape(&self) -> WorkloadShape {
        WorkloadShape::new(self.libraries, self.books, self.persons)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    pub passes: usize,
    pub simple_batch: usize,
    pub balanced: WorkloadShape,
    pub complex: WorkloadShape,
    pub warm_up: WarmUpConfig,
    /// Fixed generator seed. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            passes: DEFAULT_NUMBER_OF_PASSES,
            simple_batch: DEFAULT_SIMPLE_BATCH,
            balanced: WorkloadShape::balanced(),
            complex: WorkloadShape::complex(),
            warm_up: WarmUpConfig::default(),
            seed: None,
        }
    }
}

impl DriverConfig {
    /// Defaults overridden by `ORM_BENCH_PASSES`, `ORM_BENCH_SIMPLE_BATCH`
    /// and `ORM_BENCH_SEED` when they are set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(passes) = parse_var::<usize, _>(&lookup, PASSES_ENV_VAR)? {
            config.passes = passes;
        }
        if let Some(batch) = parse_var::<usize, _>(&lookup, SIMPLE_BATCH_ENV_VAR)? {
            config.simple_batch = batch;
        }
        config.seed = parse_var::<u64, _>(&lookup, SEED_ENV_VAR)?;

        config.validate()?;
        Ok(config)
    }

    pub fn with_passes(mut self, passes: usize) -> Self {
        self.passes = passes;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.passes == 0 {
            bail!("number of passes must be at least 1");
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => {
            let value = raw
                .trim()
                .parse::<T>()
                .with_context(|| format!("invalid value for {key}: '{raw}'"))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}
