//! SQLite backends for the ORM CRUD latency benchmark
//!
//! Two storage strategies are compared against the in-memory baseline from
//! `orm_core`:
//! - **Relational**: one table per entity, members reference their library
//!   through a foreign key
//! - **Blob**: a single key-value table, every record stored as a
//!   `bincode`-encoded BLOB
//!
//! Run the suite: `cargo run --release`
//! Run criterion benches: `cargo bench`
//! Run tests: `cargo test`

pub mod backend;
pub mod report;
