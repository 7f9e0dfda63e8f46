//! Integration tests: both SQLite backends against the backend contract and
//! full driver runs.

use orm_core::{
    BenchmarkDriver, BenchmarkKind, ComplexData, DriverConfig, OrmBackend,
    RandomObjectsGenerator, WarmUpConfig, WorkloadShape,
};
use rusqlite::Connection;
use sqlite_bench::backend::{BlobBackend, RelationalBackend};

fn small_config() -> DriverConfig {
    let mut config = DriverConfig::default().with_passes(3).with_seed(42);
    config.simple_batch = 25;
    config.balanced = WorkloadShape::new(4, 5, 5);
    config.complex = WorkloadShape::new(2, 12, 8);
    config.warm_up = WarmUpConfig {
        iterations: 1,
        libraries: 1,
        books: 2,
        persons: 2,
    };
    config
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
        .unwrap()
}

fn relational() -> RelationalBackend {
    let mut backend = RelationalBackend::open_in_memory().expect("open");
    backend.init_db().expect("init_db");
    backend
}

fn blob() -> BlobBackend {
    let mut backend = BlobBackend::open_in_memory().expect("open");
    backend.init_db().expect("init_db");
    backend
}

// ── Contract checks shared by both backends ─────────────────────────

fn check_simple_crud(backend: &mut dyn OrmBackend) {
    let mut generator = RandomObjectsGenerator::with_seed(1);
    let mut books = generator.generate_books(30);

    backend.write_simple(&mut books).unwrap();
    assert!(books.iter().all(|b| b.id.is_some()));

    let mut read = backend.read_simple(30).unwrap();
    assert_eq!(read, books);
    assert_eq!(backend.read_simple(10).unwrap().len(), 10);

    for book in read.iter_mut() {
        book.author = generator.next_string();
    }
    backend.update_simple(&read).unwrap();
    assert_eq!(backend.read_simple(30).unwrap(), read);

    backend.delete_simple(&read).unwrap();
    assert!(backend.read_simple(30).unwrap().is_empty());
}

fn check_complex_crud(backend: &mut dyn OrmBackend) {
    let mut generator = RandomObjectsGenerator::with_seed(2);
    let mut data = generator.generate_complex(&WorkloadShape::new(3, 6, 4));

    backend.write_complex(&mut data).unwrap();
    assert!(data.libraries.iter().all(|l| l.id.is_some()));
    assert!(data.books.iter().all(|b| b.id.is_some()));
    assert!(data.persons.iter().all(|p| p.id.is_some()));

    let mut read = backend.read_complex(3, 6, 4).unwrap();
    assert_eq!(read, data);

    // per-library limits
    let partial = backend.read_complex(2, 2, 1).unwrap();
    assert_eq!(partial.len(), 2);
    assert_eq!(partial.book_count(), 4);
    assert_eq!(partial.person_count(), 2);
    assert_eq!(partial.library_books(1), &data.library_books(1)[..2]);

    // library members are not part of the simple workload
    assert!(backend.read_simple(100).unwrap().is_empty());

    for library in read.libraries.iter_mut() {
        library.name = generator.next_string();
    }
    for person in read.persons.iter_mut() {
        person.second_name = generator.next_string();
    }
    backend.update_complex(&read).unwrap();
    assert_eq!(backend.read_complex(3, 6, 4).unwrap(), read);

    backend.delete_complex(&read).unwrap();
    assert!(backend.read_complex(3, 6, 4).unwrap().is_empty());
}

fn check_unsaved_entities_rejected(backend: &mut dyn OrmBackend) {
    let mut generator = RandomObjectsGenerator::with_seed(3);
    let books = generator.generate_books(1);
    assert!(backend.update_simple(&books).is_err());
    assert!(backend.delete_simple(&books).is_err());

    let data = generator.generate_complex(&WorkloadShape::new(1, 1, 1));
    assert!(backend.update_complex(&data).is_err());
}

fn check_update_of_deleted_row_fails(backend: &mut dyn OrmBackend) {
    let mut books = RandomObjectsGenerator::with_seed(4).generate_books(1);
    backend.write_simple(&mut books).unwrap();
    backend.delete_simple(&books).unwrap();
    assert!(backend.update_simple(&books).is_err());
}

fn check_unbounded_limits(backend: &mut dyn OrmBackend) {
    let mut generator = RandomObjectsGenerator::with_seed(9);
    let mut books = generator.generate_books(3);
    backend.write_simple(&mut books).unwrap();
    let mut data = generator.generate_complex(&WorkloadShape::new(2, 4, 3));
    backend.write_complex(&mut data).unwrap();

    assert_eq!(backend.read_simple(usize::MAX).unwrap(), books);
    assert_eq!(backend.read_complex(usize::MAX, 10, 10).unwrap(), data);
    let everything = backend
        .read_complex(usize::MAX, usize::MAX, usize::MAX)
        .unwrap();
    assert_eq!(everything, data);

    backend.delete_simple(&books).unwrap();
    backend.delete_complex(&everything).unwrap();
}

fn check_library_delete_takes_remaining_members(backend: &mut dyn OrmBackend) {
    let mut generator = RandomObjectsGenerator::with_seed(10);
    let mut data = generator.generate_complex(&WorkloadShape::new(2, 5, 3));
    backend.write_complex(&mut data).unwrap();

    // hand over only the head of the first library
    let partial = backend.read_complex(1, 2, 1).unwrap();
    backend.delete_complex(&partial).unwrap();

    let rest = backend.read_complex(10, 10, 10).unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest.libraries[0].id, data.libraries[1].id);
    assert_eq!(rest.book_count(), 5);
    assert_eq!(rest.person_count(), 3);

    backend.delete_complex(&rest).unwrap();
}

// ── Relational backend ──────────────────────────────────────────────

#[test]
fn relational_simple_crud() {
    check_simple_crud(&mut relational());
}

#[test]
fn relational_complex_crud() {
    let mut backend = relational();
    check_complex_crud(&mut backend);
    assert_eq!(count(backend.connection(), "libraries"), 0);
    assert_eq!(count(backend.connection(), "books"), 0);
    assert_eq!(count(backend.connection(), "persons"), 0);
}

#[test]
fn relational_rejects_unsaved_entities() {
    check_unsaved_entities_rejected(&mut relational());
}

#[test]
fn relational_update_of_deleted_row_fails() {
    check_update_of_deleted_row_fails(&mut relational());
}

#[test]
fn relational_unbounded_limits() {
    check_unbounded_limits(&mut relational());
}

#[test]
fn relational_library_delete_takes_remaining_members() {
    let mut backend = relational();
    check_library_delete_takes_remaining_members(&mut backend);
    assert_eq!(count(backend.connection(), "books"), 0);
    assert_eq!(count(backend.connection(), "persons"), 0);
}

// ── Blob backend ────────────────────────────────────────────────────

#[test]
fn blob_simple_crud() {
    check_simple_crud(&mut blob());
}

#[test]
fn blob_complex_crud() {
    let mut backend = blob();
    check_complex_crud(&mut backend);
    assert_eq!(count(backend.connection(), "entities"), 0);
}

#[test]
fn blob_rejects_unsaved_entities() {
    check_unsaved_entities_rejected(&mut blob());
}

#[test]
fn blob_update_of_deleted_row_fails() {
    check_update_of_deleted_row_fails(&mut blob());
}

#[test]
fn blob_update_does_not_cross_entity_kinds() {
    let mut backend = blob();
    let mut data =
        RandomObjectsGenerator::with_seed(5).generate_complex(&WorkloadShape::new(1, 1, 0));
    backend.write_complex(&mut data).unwrap();

    // a book carrying the library's id must not overwrite the library row
    let mut impostor = data.books.clone();
    impostor[0].id = data.libraries[0].id;
    assert!(backend.update_simple(&impostor).is_err());

    backend.delete_complex(&data).unwrap();
}

#[test]
fn blob_unbounded_limits() {
    check_unbounded_limits(&mut blob());
}

#[test]
fn blob_library_delete_takes_remaining_members() {
    let mut backend = blob();
    check_library_delete_takes_remaining_members(&mut backend);
    assert_eq!(count(backend.connection(), "entities"), 0);
}

// ── Driver end to end ───────────────────────────────────────────────

#[test]
fn relational_full_run_leaves_tables_empty() {
    let mut backend = relational();
    {
        let mut driver = BenchmarkDriver::new(&mut backend, small_config()).unwrap();
        driver.warming_up().unwrap();
        let results = driver.run_all().unwrap();

        assert_eq!(results.len(), BenchmarkKind::ALL.len());
        for (kind, samples) in &results {
            assert_eq!(samples.len(), 3, "{kind} returned {} samples", samples.len());
            assert!(samples.iter().all(|ms| *ms >= 0.0));
        }
    }
    assert_eq!(count(backend.connection(), "libraries"), 0);
    assert_eq!(count(backend.connection(), "books"), 0);
    assert_eq!(count(backend.connection(), "persons"), 0);
}

#[test]
fn blob_full_run_leaves_table_empty() {
    let mut backend = blob();
    {
        let mut driver = BenchmarkDriver::new(&mut backend, small_config()).unwrap();
        driver.warming_up().unwrap();
        for (kind, samples) in driver.run_all().unwrap() {
            assert_eq!(samples.len(), 3, "{kind}");
        }
    }
    assert_eq!(count(backend.connection(), "entities"), 0);
}

#[test]
fn read_benchmark_cleans_up_preexisting_rows_it_reads() {
    let mut backend = relational();
    let mut existing = RandomObjectsGenerator::with_seed(6).generate_books(10);
    backend.write_simple(&mut existing).unwrap();

    {
        let mut driver = BenchmarkDriver::new(&mut backend, small_config()).unwrap();
        driver.read_simple().unwrap();
        driver.read_complex().unwrap();
    }

    // the older rows have the lowest ids, so they are read and then deleted
    assert_eq!(count(backend.connection(), "books"), 0);
    assert_eq!(count(backend.connection(), "libraries"), 0);
}

#[test]
fn file_backed_database_persists_between_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bench.db");

    let written: ComplexData = {
        let mut backend = RelationalBackend::open(&path).unwrap();
        backend.init_db().unwrap();
        let mut generator = RandomObjectsGenerator::with_seed(8);
        let mut data = generator.generate_complex(&WorkloadShape::new(2, 3, 3));
        backend.write_complex(&mut data).unwrap();
        data
    };

    let mut reopened = RelationalBackend::open(&path).unwrap();
    reopened.init_db().unwrap();
    assert_eq!(reopened.read_complex(2, 3, 3).unwrap(), written);
    reopened.delete_complex(&written).unwrap();
}

#[test]
fn open_in_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no").join("such").join("bench.db");
    assert!(RelationalBackend::open(&path).is_err());
    assert!(BlobBackend::open(&path).is_err());
}
