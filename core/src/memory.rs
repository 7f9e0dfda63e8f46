//! In-memory backend: ordered maps standing in for tables.
//!
//! Used as a zero-I/O baseline in the runner and as the reference backend
//! in tests. It also counts how many entities each operation touched.
//! Members are indexed by owning library, and removing a library removes
//! whatever members still point at it.

use crate::backend::{
    OrmBackend, persisted_book_id, persisted_library_id, persisted_person_id,
};
use crate::model::{Book, ComplexData, Person};
use anyhow::{Result, bail};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
struct BookRow {
    title: String,
    author: String,
    library: Option<i64>,
}

#[derive(Debug, Clone)]
struct PersonRow {
    first_name: String,
    second_name: String,
    library: Option<i64>,
}

/// Running totals of entities passed through each operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationCounts {
    pub books_written: usize,
    pub persons_written: usize,
    pub libraries_written: usize,
    pub books_updated: usize,
    pub persons_updated: usize,
    pub libraries_updated: usize,
    pub books_deleted: usize,
    pub persons_deleted: usize,
    pub libraries_deleted: usize,
    pub books_read: usize,
}

#[derive(Debug, Default)]
pub struct InMemoryBackend {
    initialized: bool,
    next_id: i64,
    books: BTreeMap<i64, BookRow>,
    persons: BTreeMap<i64, PersonRow>,
    libraries: BTreeMap<i64, String>,
    /// library id -> ids of the books it owns
    library_books: BTreeMap<i64, BTreeSet<i64>>,
    library_persons: BTreeMap<i64, BTreeSet<i64>>,
    counts: OperationCounts,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> OperationCounts {
        self.counts
    }

    pub fn book_count(&self) -> usize {
        self.books.len()
    }

    pub fn person_count(&self) -> usize {
        self.persons.len()
    }

    pub fn library_count(&self) -> usize {
        self.libraries.len()
    }

    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn ensure_initialized(&self) -> Result<()> {
        if !self.initialized {
            bail!("in-memory backend used before init_db");
        }
        Ok(())
    }

    fn insert_book(&mut self, book: &mut Book, library: Option<i64>) {
        let id = self.allocate_id();
        book.id = Some(id);
        if let Some(owner) = library {
            self.library_books.entry(owner).or_default().insert(id);
        }
        self.books.insert(
            id,
            BookRow {
                title: book.title.clone(),
                author: book.author.clone(),
                library,
            },
        );
        self.counts.books_written += 1;
    }

    fn insert_person(&mut self, person: &mut Person, library: Option<i64>) {
        let id = self.allocate_id();
        person.id = Some(id);
        if let Some(owner) = library {
            self.library_persons.entry(owner).or_default().insert(id);
        }
        self.persons.insert(
            id,
            PersonRow {
                first_name: person.first_name.clone(),
                second_name: person.second_name.clone(),
                library,
            },
        );
        self.counts.persons_written += 1;
    }

    fn update_book(&mut self, book: &Book) -> Result<()> {
        let id = persisted_book_id(book)?;
        match self.books.get_mut(&id) {
            Some(row) => {
                row.title.clone_from(&book.title);
                row.author.clone_from(&book.author);
                self.counts.books_updated += 1;
                Ok(())
            }
            None => bail!("book {id} does not exist"),
        }
    }

    fn remove_book(&mut self, id: i64) {
        if let Some(row) = self.books.remove(&id) {
            if let Some(owner) = row.library {
                if let Some(owned) = self.library_books.get_mut(&owner) {
                    owned.remove(&id);
                }
            }
            self.counts.books_deleted += 1;
        }
    }

    fn remove_person(&mut self, id: i64) {
        if let Some(row) = self.persons.remove(&id) {
            if let Some(owner) = row.library {
                if let Some(owned) = self.library_persons.get_mut(&owner) {
                    owned.remove(&id);
                }
            }
            self.counts.persons_deleted += 1;
        }
    }

    /// Remove a library together with every member still attached to it.
    fn remove_library(&mut self, id: i64) {
        if self.libraries.remove(&id).is_none() {
            return;
        }
        self.counts.libraries_deleted += 1;
        for book_id in self.library_books.remove(&id).unwrap_or_default() {
            self.remove_book(book_id);
        }
        for person_id in self.library_persons.remove(&id).unwrap_or_default() {
            self.remove_person(person_id);
        }
    }

    fn book_from_row(id: i64, row: &BookRow) -> Book {
        Book {
            id: Some(id),
            title: row.title.clone(),
            author: row.author.clone(),
        }
    }
}

impl OrmBackend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn init_db(&mut self) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn write_simple(&mut self, books: &mut [Book]) -> Result<()> {
        self.ensure_initialized()?;
        for book in books.iter_mut() {
            self.insert_book(book, None);
        }
        Ok(())
    }

    fn read_simple(&mut self, quantity: usize) -> Result<Vec<Book>> {
        self.ensure_initialized()?;
        let books: Vec<Book> = self
            .books
            .iter()
            .filter(|(_, row)| row.library.is_none())
            .take(quantity)
            .map(|(&id, row)| Self::book_from_row(id, row))
            .collect();
        self.counts.books_read += books.len();
        Ok(books)
    }

    fn update_simple(&mut self, books: &[Book]) -> Result<()> {
        self.ensure_initialized()?;
        for book in books {
            self.update_book(book)?;
        }
        Ok(())
    }

    fn delete_simple(&mut self, books: &[Book]) -> Result<()> {
        self.ensure_initialized()?;
        for book in books {
            self.remove_book(persisted_book_id(book)?);
        }
        Ok(())
    }

    fn write_complex(&mut self, data: &mut ComplexData) -> Result<()> {
        self.ensure_initialized()?;
        for library in data.libraries.iter_mut() {
            let id = self.allocate_id();
            library.id = Some(id);
            self.libraries.insert(id, library.name.clone());
            self.counts.libraries_written += 1;
        }

        let book_owners = data.book_owners();
        for (book, owner) in data.books.iter_mut().zip(book_owners) {
            self.insert_book(book, owner);
        }
        let person_owners = data.person_owners();
        for (person, owner) in data.persons.iter_mut().zip(person_owners) {
            self.insert_person(person, owner);
        }
        Ok(())
    }

    fn read_complex(
        &mut self,
        libraries: usize,
        books: usize,
        persons: usize,
    ) -> Result<ComplexData> {
        self.ensure_initialized()?;
        let mut data = ComplexData::new();

        for (&library_id, name) in self.libraries.iter().take(libraries) {
            let owned_books = self
                .library_books
                .get(&library_id)
                .into_iter()
                .flatten()
                .take(books)
                .filter_map(|id| self.books.get(id).map(|row| Self::book_from_row(*id, row)))
                .collect();
            let owned_persons = self
                .library_persons
                .get(&library_id)
                .into_iter()
                .flatten()
                .take(persons)
                .filter_map(|id| {
                    self.persons.get(id).map(|row| Person {
                        id: Some(*id),
                        first_name: row.first_name.clone(),
                        second_name: row.second_name.clone(),
                    })
                })
                .collect();
            data.push_library_with_id(
                Some(library_id),
                name.clone(),
                owned_books,
                owned_persons,
            );
        }

        self.counts.books_read += data.book_count();
        Ok(data)
    }

    fn update_complex(&mut self, data: &ComplexData) -> Result<()> {
        self.ensure_initialized()?;
        for library in &data.libraries {
            let id = persisted_library_id(library)?;
            match self.libraries.get_mut(&id) {
                Some(name) => name.clone_from(&library.name),
                None => bail!("library {id} does not exist"),
            }
            self.counts.libraries_updated += 1;
        }
        for book in &data.books {
            self.update_book(book)?;
        }
        for person in &data.persons {
            let id = persisted_person_id(person)?;
            match self.persons.get_mut(&id) {
                Some(row) => {
                    row.first_name.clone_from(&person.first_name);
                    row.second_name.clone_from(&person.second_name);
                }
                None => bail!("person {id} does not exist"),
            }
            self.counts.persons_updated += 1;
        }
        Ok(())
    }

    fn delete_complex(&mut self, data: &ComplexData) -> Result<()> {
        self.ensure_initialized()?;
        for person in &data.persons {
            self.remove_person(persisted_person_id(person)?);
        }
        for book in &data.books {
            self.remove_book(persisted_book_id(book)?);
        }
        for library in &data.libraries {
            self.remove_library(persisted_library_id(library)?);
        }
        Ok(())
    }
}
