//! Benchmark procedures layered on top of an [`OrmBackend`].
//!
//! Every procedure runs `config.passes` passes and returns one sample per
//! pass, in milliseconds. Only the backend call under test sits between
//! `profiler.start()` and `profiler.stop()`; data generation, seeding and
//! cleanup happen outside the timed region. Each pass deletes everything it
//! created, so pass *i* never leaves rows behind for pass *i + 1*.
//!
//! | Procedure | Before timing                 | Timed             | After timing            |
//! |-----------|-------------------------------|-------------------|-------------------------|
//! | write     | generate batch                | `write_*`         | delete batch            |
//! | read      | generate + write seed batch   | `read_*`          | delete read ∪ seed      |
//! | update    | seed, read back, mutate       | `update_*`        | delete read ∪ seed      |
//! | delete    | seed, read back               | `delete_*`        | delete seed \ read      |

use crate::backend::OrmBackend;
use crate::config::{DriverConfig, WorkloadShape};
use crate::generator::RandomObjectsGenerator;
use crate::model::{Book, ComplexData, Library};
use crate::profiler::SimpleProfiler;
use anyhow::{Context, Result, bail};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BenchmarkKind {
    WriteSimple,
    ReadSimple,
    UpdateSimple,
    DeleteSimple,
    WriteBalanced,
    ReadBalanced,
    UpdateBalanced,
    DeleteBalanced,
    WriteComplex,
    ReadComplex,
    UpdateComplex,
    DeleteComplex,
}

impl BenchmarkKind {
    pub const ALL: [BenchmarkKind; 12] = [
        BenchmarkKind::WriteSimple,
        BenchmarkKind::ReadSimple,
        BenchmarkKind::UpdateSimple,
        BenchmarkKind::DeleteSimple,
        BenchmarkKind::WriteBalanced,
        BenchmarkKind::ReadBalanced,
        BenchmarkKind::UpdateBalanced,
        BenchmarkKind::DeleteBalanced,
        BenchmarkKind::WriteComplex,
        BenchmarkKind::ReadComplex,
        BenchmarkKind::UpdateComplex,
        BenchmarkKind::DeleteComplex,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BenchmarkKind::WriteSimple => "write_simple",
            BenchmarkKind::ReadSimple => "read_simple",
            BenchmarkKind::UpdateSimple => "update_simple",
            BenchmarkKind::DeleteSimple => "delete_simple",
            BenchmarkKind::WriteBalanced => "write_balanced",
            BenchmarkKind::ReadBalanced => "read_balanced",
            BenchmarkKind::UpdateBalanced => "update_balanced",
            BenchmarkKind::DeleteBalanced => "delete_balanced",
            BenchmarkKind::WriteComplex => "write_complex",
            BenchmarkKind::ReadComplex => "read_complex",
            BenchmarkKind::UpdateComplex => "update_complex",
            BenchmarkKind::DeleteComplex => "delete_complex",
        }
    }
}

impl fmt::Display for BenchmarkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BenchmarkKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match BenchmarkKind::ALL.iter().find(|kind| kind.name() == s) {
            Some(kind) => Ok(*kind),
            None => bail!("unknown benchmark '{s}'"),
        }
    }
}

pub struct BenchmarkDriver<B: OrmBackend> {
    backend: B,
    generator: RandomObjectsGenerator,
    config: DriverConfig,
}

impl<B: OrmBackend> BenchmarkDriver<B> {
    /// Initialise `backend` and wrap it in a driver.
    pub fn new(mut backend: B, config: DriverConfig) -> Result<Self> {
        config.validate()?;
        backend
            .init_db()
            .with_context(|| format!("failed to initialise backend '{}'", backend.name()))?;

        let generator = match config.seed {
            Some(seed) => RandomObjectsGenerator::with_seed(seed),
            None => RandomObjectsGenerator::new(),
        };

        log::info!(
            "Backend '{}' ready: {} passes, simple batch {}",
            backend.name(),
            config.passes,
            config.simple_batch
        );

        Ok(Self {
            backend,
            generator,
            config,
        })
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Write and immediately delete a few small composite batches so that
    /// caches and prepared statements are hot before measuring.
    pub fn warming_up(&mut self) -> Result<()> {
        let shape = self.config.warm_up.shape();
        for _ in 0..self.config.warm_up.iterations {
            let mut data = self.generator.generate_complex(&shape);
            self.backend.write_complex(&mut data)?;
            self.backend.delete_complex(&data)?;
        }
        log::debug!(
            "Backend '{}' warmed up ({} iterations)",
            self.backend.name(),
            self.config.warm_up.iterations
        );
        Ok(())
    }

    pub fn run(&mut self, kind: BenchmarkKind) -> Result<Vec<f64>> {
        match kind {
            BenchmarkKind::WriteSimple => self.write_simple(),
            BenchmarkKind::ReadSimple => self.read_simple(),
            BenchmarkKind::UpdateSimple => self.update_simple(),
            BenchmarkKind::DeleteSimple => self.delete_simple(),
            BenchmarkKind::WriteBalanced => self.write_balanced(),
            BenchmarkKind::ReadBalanced => self.read_balanced(),
            BenchmarkKind::UpdateBalanced => self.update_balanced(),
            BenchmarkKind::DeleteBalanced => self.delete_balanced(),
            BenchmarkKind::WriteComplex => self.write_complex(),
            BenchmarkKind::ReadComplex => self.read_complex(),
            BenchmarkKind::UpdateComplex => self.update_complex(),
            BenchmarkKind::DeleteComplex => self.delete_complex(),
        }
    }

    /// Every benchmark in [`BenchmarkKind::ALL`] order.
    pub fn run_all(&mut self) -> Result<Vec<(BenchmarkKind, Vec<f64>)>> {
        let mut results = Vec::with_capacity(BenchmarkKind::ALL.len());
        for kind in BenchmarkKind::ALL {
            results.push((kind, self.run(kind)?));
        }
        Ok(results)
    }

    // ── Simple workload ─────────────────────────────────────────────

    pub fn write_simple(&mut self) -> Result<Vec<f64>> {
        let batch = self.config.simple_batch;
        self.measure(BenchmarkKind::WriteSimple.name(), |driver, profiler| {
            let mut books = driver.generator.generate_books(batch);

            profiler.start();
            driver.backend.write_simple(&mut books)?;
            let elapsed = profiler.stop();

            driver.backend.delete_simple(&books)?;
            Ok(elapsed)
        })
    }

    pub fn read_simple(&mut self) -> Result<Vec<f64>> {
        let batch = self.config.simple_batch;
        self.measure(BenchmarkKind::ReadSimple.name(), |driver, profiler| {
            let seed = driver.seed_books(batch)?;

            profiler.start();
            let books = driver.backend.read_simple(batch)?;
            let elapsed = profiler.stop();

            driver.backend.delete_simple(&books)?;
            driver.delete_leftover_books(&seed, &books)?;
            Ok(elapsed)
        })
    }

    pub fn update_simple(&mut self) -> Result<Vec<f64>> {
        let batch = self.config.simple_batch;
        self.measure(BenchmarkKind::UpdateSimple.name(), |driver, profiler| {
            let seed = driver.seed_books(batch)?;
            let mut books = driver.backend.read_simple(batch)?;
            for book in books.iter_mut() {
                book.author = driver.generator.next_string();
            }

            profiler.start();
            driver.backend.update_simple(&books)?;
            let elapsed = profiler.stop();

            driver.backend.delete_simple(&books)?;
            driver.delete_leftover_books(&seed, &books)?;
            Ok(elapsed)
        })
    }

    pub fn delete_simple(&mut self) -> Result<Vec<f64>> {
        let batch = self.config.simple_batch;
        self.measure(BenchmarkKind::DeleteSimple.name(), |driver, profiler| {
            let seed = driver.seed_books(batch)?;
            let books = driver.backend.read_simple(batch)?;

            profiler.start();
            driver.backend.delete_simple(&books)?;
            let elapsed = profiler.stop();

            driver.delete_leftover_books(&seed, &books)?;
            Ok(elapsed)
        })
    }

    // ── Balanced shape (50 × 50 × 50 by default) ───────────────────

    pub fn write_balanced(&mut self) -> Result<Vec<f64>> {
        let shape = self.config.balanced;
        self.write_complex_benchmark(BenchmarkKind::WriteBalanced.name(), shape)
    }

    pub fn read_balanced(&mut self) -> Result<Vec<f64>> {
        let shape = self.config.balanced;
        self.read_complex_benchmark(BenchmarkKind::ReadBalanced.name(), shape)
    }

    pub fn update_balanced(&mut self) -> Result<Vec<f64>> {
        let shape = self.config.balanced;
        self.update_complex_benchmark(BenchmarkKind::UpdateBalanced.name(), shape)
    }

    pub fn delete_balanced(&mut self) -> Result<Vec<f64>> {
        let shape = self.config.balanced;
        self.delete_complex_benchmark(BenchmarkKind::DeleteBalanced.name(), shape)
    }

    // ── Skewed complex shape (5 libraries, 500 books, 400 persons) ─

    pub fn write_complex(&mut self) -> Result<Vec<f64>> {
        let shape = self.config.complex;
        self.write_complex_benchmark(BenchmarkKind::WriteComplex.name(), shape)
    }

    pub fn read_complex(&mut self) -> Result<Vec<f64>> {
        let shape = self.config.complex;
        self.read_complex_benchmark(BenchmarkKind::ReadComplex.name(), shape)
    }

    pub fn update_complex(&mut self) -> Result<Vec<f64>> {
        let shape = self.config.complex;
        self.update_complex_benchmark(BenchmarkKind::UpdateComplex.name(), shape)
    }

    pub fn delete_complex(&mut self) -> Result<Vec<f64>> {
        let shape = self.config.complex;
        self.delete_complex_benchmark(BenchmarkKind::DeleteComplex.name(), shape)
    }

    // ── Composite procedures ────────────────────────────────────────

    pub fn write_complex_benchmark(
        &mut self,
        name: &str,
        shape: WorkloadShape,
    ) -> Result<Vec<f64>> {
        self.measure(name, |driver, profiler| {
            let mut data = driver.generator.generate_complex(&shape);

            profiler.start();
            driver.backend.write_complex(&mut data)?;
            let elapsed = profiler.stop();

            driver.backend.delete_complex(&data)?;
            Ok(elapsed)
        })
    }

    pub fn read_complex_benchmark(
        &mut self,
        name: &str,
        shape: WorkloadShape,
    ) -> Result<Vec<f64>> {
        self.measure(name, |driver, profiler| {
            let seed = driver.seed_complex(&shape)?;

            profiler.start();
            let data = driver
                .backend
                .read_complex(shape.libraries, shape.books, shape.persons)?;
            let elapsed = profiler.stop();

            driver.delete_leftover_complex(&seed, &data)?;
            driver.backend.delete_complex(&data)?;
            Ok(elapsed)
        })
    }

    pub fn update_complex_benchmark(
        &mut self,
        name: &str,
        shape: WorkloadShape,
    ) -> Result<Vec<f64>> {
        self.measure(name, |driver, profiler| {
            let seed = driver.seed_complex(&shape)?;
            let mut data = driver
                .backend
                .read_complex(shape.libraries, shape.books, shape.persons)?;

            for library in data.libraries.iter_mut() {
                library.name = driver.generator.next_string();
            }
            for book in data.books.iter_mut() {
                book.author = driver.generator.next_string();
            }
            for person in data.persons.iter_mut() {
                person.first_name = driver.generator.next_string();
                person.second_name = driver.generator.next_string();
            }

            profiler.start();
            driver.backend.update_complex(&data)?;
            let elapsed = profiler.stop();

            driver.delete_leftover_complex(&seed, &data)?;
            driver.backend.delete_complex(&data)?;
            Ok(elapsed)
        })
    }

    pub fn delete_complex_benchmark(
        &mut self,
        name: &str,
        shape: WorkloadShape,
    ) -> Result<Vec<f64>> {
        self.measure(name, |driver, profiler| {
            let seed = driver.seed_complex(&shape)?;
            let data = driver
                .backend
                .read_complex(shape.libraries, shape.books, shape.persons)?;

            profiler.start();
            driver.backend.delete_complex(&data)?;
            let elapsed = profiler.stop();

            driver.delete_leftover_complex(&seed, &data)?;
            Ok(elapsed)
        })
    }

    // ── Internals ───────────────────────────────────────────────────

    fn measure<F>(&mut self, name: &str, mut pass: F) -> Result<Vec<f64>>
    where
        F: FnMut(&mut Self, &mut SimpleProfiler) -> Result<f64>,
    {
        let mut profiler = SimpleProfiler::new();
        let mut samples = Vec::with_capacity(self.config.passes);

        for i in 0..self.config.passes {
            let elapsed = pass(self, &mut profiler).with_context(|| {
                format!("{} failed on backend '{}' in pass {i}", name, self.backend.name())
            })?;
            log::debug!("{}/{} pass {i}: {elapsed:.3}ms", self.backend.name(), name);
            samples.push(elapsed);
        }

        log::info!(
            "{}/{} finished {} passes",
            self.backend.name(),
            name,
            samples.len()
        );
        Ok(samples)
    }

    fn seed_books(&mut self, n: usize) -> Result<Vec<Book>> {
        let mut books = self.generator.generate_books(n);
        self.backend.write_simple(&mut books)?;
        Ok(books)
    }

    fn seed_complex(&mut self, shape: &WorkloadShape) -> Result<ComplexData> {
        let mut data = self.generator.generate_complex(shape);
        self.backend.write_complex(&mut data)?;
        Ok(data)
    }

    /// Delete the seeded books that the pass itself did not touch.
    fn delete_leftover_books(&mut self, seed: &[Book], seen: &[Book]) -> Result<()> {
        let seen_ids: HashSet<i64> = seen.iter().filter_map(|b| b.id).collect();
        let rest: Vec<Book> = seed
            .iter()
            .filter(|b| b.id.is_some_and(|id| !seen_ids.contains(&id)))
            .cloned()
            .collect();
        if !rest.is_empty() {
            self.backend.delete_simple(&rest)?;
        }
        Ok(())
    }

    fn delete_leftover_complex(&mut self, seed: &ComplexData, seen: &ComplexData) -> Result<()> {
        let rest = leftover_complex(seed, seen);
        if !rest.is_empty() {
            self.backend.delete_complex(&rest)?;
        }
        Ok(())
    }
}

/// Entities of `seed` whose ids do not appear in `seen`.
///
/// Leftover libraries carry empty member ranges; their members are listed
/// in the flat `books`/`persons` vectors.
fn leftover_complex(seed: &ComplexData, seen: &ComplexData) -> ComplexData {
    let library_ids: HashSet<i64> = seen.libraries.iter().filter_map(|l| l.id).collect();
    let book_ids: HashSet<i64> = seen.books.iter().filter_map(|b| b.id).collect();
    let person_ids: HashSet<i64> = seen.persons.iter().filter_map(|p| p.id).collect();

    ComplexData {
        libraries: seed
            .libraries
            .iter()
            .filter(|l| l.id.is_some_and(|id| !library_ids.contains(&id)))
            .map(|l| Library {
                id: l.id,
                name: l.name.clone(),
                books: 0..0,
                persons: 0..0,
            })
            .collect(),
        books: seed
            .books
            .iter()
            .filter(|b| b.id.is_some_and(|id| !book_ids.contains(&id)))
            .cloned()
            .collect(),
        persons: seed
            .persons
            .iter()
            .filter(|p| p.id.is_some_and(|id| !person_ids.contains(&id)))
            .cloned()
            .collect(),
    }
}
