//! Relational backend: one table per entity kind.
//!
//! Books and persons reference their library through a nullable
//! `library_id` foreign key (`NULL` for the simple workload). Deleting a
//! library cascades to whatever members are still attached to it. Every bulk
//! write runs inside a single transaction with cached prepared statements.

use super::{book_from_row, configure_connection, open_connection, person_from_row, sql_limit};
use anyhow::{bail, Result};
use orm_core::backend::{persisted_book_id, persisted_library_id, persisted_person_id};
use orm_core::{Book, ComplexData, OrmBackend};
use rusqlite::{params, Connection, Transaction};
use std::path::Path;

pub struct RelationalBackend {
    conn: Connection,
}

impl RelationalBackend {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(open_connection(None)?))
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(open_connection(Some(path))?))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn update_books(tx: &Transaction, books: &[Book]) -> Result<()> {
        let mut stmt =
            tx.prepare_cached("UPDATE books SET title = ?1, author = ?2 WHERE id = ?3")?;
        for book in books {
            let id = persisted_book_id(book)?;
            if stmt.execute(params![book.title, book.author, id])? == 0 {
                bail!("book {id} does not exist");
            }
        }
        Ok(())
    }

    fn delete_books(tx: &Transaction, books: &[Book]) -> Result<()> {
        let mut stmt = tx.prepare_cached("DELETE FROM books WHERE id = ?1")?;
        for book in books {
            stmt.execute(params![persisted_book_id(book)?])?;
        }
        Ok(())
    }
}

impl OrmBackend for RelationalBackend {
    fn name(&self) -> &'static str {
        "relational"
    }

    fn init_db(&mut self) -> Result<()> {
        configure_connection(&self.conn)?;
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS libraries (
                id   INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS books (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                title      TEXT NOT NULL,
                author     TEXT NOT NULL,
                library_id INTEGER REFERENCES libraries(id) ON DELETE CASCADE
            );
            CREATE TABLE IF NOT EXISTS persons (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name  TEXT NOT NULL,
                second_name TEXT NOT NULL,
                library_id  INTEGER REFERENCES libraries(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_books_library ON books(library_id, id);
            CREATE INDEX IF NOT EXISTS idx_persons_library ON persons(library_id, id);",
        )?;
        Ok(())
    }

    fn write_simple(&mut self, books: &mut [Book]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO books (title, author, library_id) VALUES (?1, ?2, NULL)",
            )?;
            for book in books.iter_mut() {
                book.id = Some(stmt.insert(params![book.title, book.author])?);
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn read_simple(&mut self, quantity: usize) -> Result<Vec<Book>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, title, author FROM books
             WHERE library_id IS NULL ORDER BY id LIMIT ?1",
        )?;
        let books = stmt
            .query_map(params![sql_limit(quantity)], book_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(books)
    }

    fn update_simple(&mut self, books: &[Book]) -> Result<()> {
        let tx = self.conn.transaction()?;
        Self::update_books(&tx, books)?;
        tx.commit()?;
        Ok(())
    }

    fn delete_simple(&mut self, books: &[Book]) -> Result<()> {
        let tx = self.conn.transaction()?;
        Self::delete_books(&tx, books)?;
        tx.commit()?;
        Ok(())
    }

    fn write_complex(&mut self, data: &mut ComplexData) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut library_stmt = tx.prepare_cached("INSERT INTO libraries (name) VALUES (?1)")?;
            for library in data.libraries.iter_mut() {
                library.id = Some(library_stmt.insert(params![library.name])?);
            }

            let mut book_stmt = tx.prepare_cached(
                "INSERT INTO books (title, author, library_id) VALUES (?1, ?2, ?3)",
            )?;
            let book_owners = data.book_owners();
            for (book, owner) in data.books.iter_mut().zip(book_owners) {
                book.id = Some(book_stmt.insert(params![book.title, book.author, owner])?);
            }

            let mut person_stmt = tx.prepare_cached(
                "INSERT INTO persons (first_name, second_name, library_id) VALUES (?1, ?2, ?3)",
            )?;
            let person_owners = data.person_owners();
            for (person, owner) in data.persons.iter_mut().zip(person_owners) {
                person.id = Some(person_stmt.insert(params![
                    person.first_name,
                    person.second_name,
                    owner
                ])?);
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn read_complex(
        &mut self,
        libraries: usize,
        books: usize,
        persons: usize,
    ) -> Result<ComplexData> {
        let mut library_stmt = self
            .conn
            .prepare_cached("SELECT id, name FROM libraries ORDER BY id LIMIT ?1")?;
        let mut book_stmt = self.conn.prepare_cached(
            "SELECT id, title, author FROM books
             WHERE library_id = ?1 ORDER BY id LIMIT ?2",
        )?;
        let mut person_stmt = self.conn.prepare_cached(
            "SELECT id, first_name, second_name FROM persons
             WHERE library_id = ?1 ORDER BY id LIMIT ?2",
        )?;

        let library_rows = library_stmt.query_map(params![sql_limit(libraries)], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut data = ComplexData::new();
        for library_row in library_rows {
            let (library_id, name) = library_row?;

            let owned_books = book_stmt
                .query_map(params![library_id, sql_limit(books)], book_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            let owned_persons = person_stmt
                .query_map(params![library_id, sql_limit(persons)], person_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            data.push_library_with_id(Some(library_id), name, owned_books, owned_persons);
        }
        Ok(data)
    }

    fn update_complex(&mut self, data: &ComplexData) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut library_stmt =
                tx.prepare_cached("UPDATE libraries SET name = ?1 WHERE id = ?2")?;
            for library in &data.libraries {
                let id = persisted_library_id(library)?;
                if library_stmt.execute(params![library.name, id])? == 0 {
                    bail!("library {id} does not exist");
                }
            }

            Self::update_books(&tx, &data.books)?;

            let mut person_stmt = tx.prepare_cached(
                "UPDATE persons SET first_name = ?1, second_name = ?2 WHERE id = ?3",
            )?;
            for person in &data.persons {
                let id = persisted_person_id(person)?;
                if person_stmt.execute(params![person.first_name, person.second_name, id])? == 0 {
                    bail!("person {id} does not exist");
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_complex(&mut self, data: &ComplexData) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut person_stmt = tx.prepare_cached("DELETE FROM persons WHERE id = ?1")?;
            for person in &data.persons {
                person_stmt.execute(params![persisted_person_id(person)?])?;
            }

            Self::delete_books(&tx, &data.books)?;

            let mut library_stmt = tx.prepare_cached("DELETE FROM libraries WHERE id = ?1")?;
            for library in &data.libraries {
                library_stmt.execute(params![persisted_library_id(library)?])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn deleting_a_library_cascades_to_members() {
        let mut backend = RelationalBackend::open_in_memory().unwrap();
        backend.init_db().unwrap();

        let mut data = ComplexData::new();
        data.push_library(
            "lib".into(),
            vec![Book::new("t".into(), "a".into())],
            vec![],
        );
        backend.write_complex(&mut data).unwrap();

        let only_library = ComplexData {
            libraries: data.libraries.clone(),
            ..ComplexData::default()
        };
        backend.delete_complex(&only_library).unwrap();

        assert_eq!(count(backend.connection(), "libraries"), 0);
        assert_eq!(count(backend.connection(), "books"), 0);
    }

    #[test]
    fn init_is_idempotent() {
        let mut backend = RelationalBackend::open_in_memory().unwrap();
        backend.init_db().unwrap();
        backend.init_db().unwrap();
    }
}
