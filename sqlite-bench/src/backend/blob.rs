//! Blob backend: every entity is a row in one key-value table.
//!
//! Rows carry only an id, an entity kind, the owning library id and a
//! `bincode`-encoded payload. This stands in for document/key-value stores
//! where records are serialized as a whole rather than mapped to columns.

use super::{configure_connection, open_connection, sql_limit};
use anyhow::{bail, Result};
use bincode::{Decode, Encode};
use orm_core::backend::{persisted_book_id, persisted_library_id, persisted_person_id};
use orm_core::{Book, ComplexData, OrmBackend, Person};
use rusqlite::{params, Connection, Transaction};
use std::path::Path;

const KIND_LIBRARY: u8 = 0;
const KIND_BOOK: u8 = 1;
const KIND_PERSON: u8 = 2;

#[derive(Debug, Encode, Decode)]
struct LibraryRecord {
    name: String,
}

#[derive(Debug, Encode, Decode)]
struct BookRecord {
    title: String,
    author: String,
}

#[derive(Debug, Encode, Decode)]
struct PersonRecord {
    first_name: String,
    second_name: String,
}

impl From<&Book> for BookRecord {
    fn from(book: &Book) -> Self {
        Self {
            title: book.title.clone(),
            author: book.author.clone(),
        }
    }
}

impl From<&Person> for PersonRecord {
    fn from(person: &Person) -> Self {
        Self {
            first_name: person.first_name.clone(),
            second_name: person.second_name.clone(),
        }
    }
}

fn encode<T: Encode>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::encode_to_vec(value, bincode::config::standard())?)
}

fn decode<T: Decode<()>>(bytes: &[u8]) -> Result<T> {
    let (value, _) = bincode::decode_from_slice(bytes, bincode::config::standard())?;
    Ok(value)
}

fn decode_book(id: i64, payload: &[u8]) -> Result<Book> {
    let record: BookRecord = decode(payload)?;
    Ok(Book {
        id: Some(id),
        title: record.title,
        author: record.author,
    })
}

fn decode_person(id: i64, payload: &[u8]) -> Result<Person> {
    let record: PersonRecord = decode(payload)?;
    Ok(Person {
        id: Some(id),
        first_name: record.first_name,
        second_name: record.second_name,
    })
}

pub struct BlobBackend {
    conn: Connection,
}

impl BlobBackend {
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

    fn insert(tx: &Transaction, kind: u8, owner: Option<i64>, payload: &[u8]) -> Result<i64> {
        let mut stmt =
            tx.prepare_cached("INSERT INTO entities (kind, owner, payload) VALUES (?1, ?2, ?3)")?;
        Ok(stmt.insert(params![kind, owner, payload])?)
    }

    fn update(tx: &Transaction, kind: u8, id: i64, payload: &[u8]) -> Result<()> {
        let mut stmt =
            tx.prepare_cached("UPDATE entities SET payload = ?1 WHERE id = ?2 AND kind = ?3")?;
        if stmt.execute(params![payload, id, kind])? == 0 {
            bail!("entity {id} of kind {kind} does not exist");
        }
        Ok(())
    }

    fn delete(tx: &Transaction, kind: u8, id: i64) -> Result<()> {
        let mut stmt = tx.prepare_cached("DELETE FROM entities WHERE id = ?1 AND kind = ?2")?;
        stmt.execute(params![id, kind])?;
        Ok(())
    }

    /// Delete a library and whatever members still name it as owner.
    fn delete_library(tx: &Transaction, id: i64) -> Result<()> {
        let mut members = tx.prepare_cached("DELETE FROM entities WHERE owner = ?1")?;
        members.execute(params![id])?;
        Self::delete(tx, KIND_LIBRARY, id)
    }

    /// Raw `(id, payload)` rows of one kind and owner, in id order.
    fn select(&self, kind: u8, owner: Option<i64>, limit: usize) -> Result<Vec<(i64, Vec<u8>)>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, payload FROM entities
             WHERE kind = ?1 AND owner IS ?2 ORDER BY id LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![kind, owner, sql_limit(limit)], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?;

        let out = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(out)
    }
}

impl OrmBackend for BlobBackend {
    fn name(&self) -> &'static str {
        "blob"
    }

    fn init_db(&mut self) -> Result<()> {
        configure_connection(&self.conn)?;
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS entities (
                id      INTEGER PRIMARY KEY AUTOINCREMENT,
                kind    INTEGER NOT NULL,
                owner   INTEGER,
                payload BLOB NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_entities_kind_owner ON entities(kind, owner, id);",
        )?;
        Ok(())
    }

    fn write_simple(&mut self, books: &mut [Book]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for book in books.iter_mut() {
            let payload = encode(&BookRecord::from(&*book))?;
            book.id = Some(Self::insert(&tx, KIND_BOOK, None, &payload)?);
        }
        tx.commit()?;
        Ok(())
    }

    fn read_simple(&mut self, quantity: usize) -> Result<Vec<Book>> {
        self.select(KIND_BOOK, None, quantity)?
            .into_iter()
            .map(|(id, payload)| decode_book(id, &payload))
            .collect()
    }

    fn update_simple(&mut self, books: &[Book]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for book in books {
            let payload = encode(&BookRecord::from(book))?;
            Self::update(&tx, KIND_BOOK, persisted_book_id(book)?, &payload)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_simple(&mut self, books: &[Book]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for book in books {
            Self::delete(&tx, KIND_BOOK, persisted_book_id(book)?)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn write_complex(&mut self, data: &mut ComplexData) -> Result<()> {
        let tx = self.conn.transaction()?;
        for library in data.libraries.iter_mut() {
            let payload = encode(&LibraryRecord {
                name: library.name.clone(),
            })?;
            library.id = Some(Self::insert(&tx, KIND_LIBRARY, None, &payload)?);
        }

        let book_owners = data.book_owners();
        for (book, owner) in data.books.iter_mut().zip(book_owners) {
            let payload = encode(&BookRecord::from(&*book))?;
            book.id = Some(Self::insert(&tx, KIND_BOOK, owner, &payload)?);
        }

        let person_owners = data.person_owners();
        for (person, owner) in data.persons.iter_mut().zip(person_owners) {
            let payload = encode(&PersonRecord::from(&*person))?;
            person.id = Some(Self::insert(&tx, KIND_PERSON, owner, &payload)?);
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
        let mut data = ComplexData::new();
        for (library_id, payload) in self.select(KIND_LIBRARY, None, libraries)? {
            let record: LibraryRecord = decode(&payload)?;

            let owned_books = self
                .select(KIND_BOOK, Some(library_id), books)?
                .into_iter()
                .map(|(id, payload)| decode_book(id, &payload))
                .collect::<Result<Vec<_>>>()?;
            let owned_persons = self
                .select(KIND_PERSON, Some(library_id), persons)?
                .into_iter()
                .map(|(id, payload)| decode_person(id, &payload))
                .collect::<Result<Vec<_>>>()?;

            data.push_library_with_id(Some(library_id), record.name, owned_books, owned_persons);
        }
        Ok(data)
    }

    fn update_complex(&mut self, data: &ComplexData) -> Result<()> {
        let tx = self.conn.transaction()?;
        for library in &data.libraries {
            let payload = encode(&LibraryRecord {
                name: library.name.clone(),
            })?;
            Self::update(&tx, KIND_LIBRARY, persisted_library_id(library)?, &payload)?;
        }
        for book in &data.books {
            let payload = encode(&BookRecord::from(book))?;
            Self::update(&tx, KIND_BOOK, persisted_book_id(book)?, &payload)?;
        }
        for person in &data.persons {
            let payload = encode(&PersonRecord::from(person))?;
            Self::update(&tx, KIND_PERSON, persisted_person_id(person)?, &payload)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_complex(&mut self, data: &ComplexData) -> Result<()> {
        let tx = self.conn.transaction()?;
        for person in &data.persons {
            Self::delete(&tx, KIND_PERSON, persisted_person_id(person)?)?;
        }
        for book in &data.books {
            Self::delete(&tx, KIND_BOOK, persisted_book_id(book)?)?;
        }
        for library in &data.libraries {
            Self::delete_library(&tx, persisted_library_id(library)?)?;
        }
        tx.commit()?;
        Ok(())
    }
}
