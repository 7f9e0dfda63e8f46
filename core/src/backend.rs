//! The contract every storage backend implements.
//!
//! Each method corresponds to one CRUD operation the driver times. Backends
//! hold their own connection/session, opened in [`OrmBackend::init_db`] and
//! kept for the lifetime of the driver.

use crate::model::{Book, ComplexData, Library, Person};
use anyhow::{Result, anyhow};

pub trait OrmBackend {
    /// Human-readable name for reports.
    fn name(&self) -> &'static str;

    /// One-time setup (schema creation etc). Never timed.
    fn init_db(&mut self) -> Result<()>;

    // ── Simple workload ─────────────────────────────────────────────

    /// Persist all books, assigning their ids.
    fn write_simple(&mut self, books: &mut [Book]) -> Result<()>;

    /// Up to `quantity` persisted books that belong to no library, in id order.
    fn read_simple(&mut self, quantity: usize) -> Result<Vec<Book>>;

    /// Persist the current field values of already stored books.
    fn update_simple(&mut self, books: &[Book]) -> Result<()>;

    /// Remove books by id. Ids no longer stored are ignored; unsaved books are an error.
    fn delete_simple(&mut self, books: &[Book]) -> Result<()>;

    // ── Complex workload ────────────────────────────────────────────

    /// Persist libraries and their members, keeping ownership. Assigns ids.
    fn write_complex(&mut self, data: &mut ComplexData) -> Result<()>;

    /// Up to `libraries` libraries in id order, each with up to `books`
    /// books and `persons` persons it owns.
    fn read_complex(&mut self, libraries: usize, books: usize, persons: usize)
    -> Result<ComplexData>;

    fn update_complex(&mut self, data: &ComplexData) -> Result<()>;

    /// Remove all members of `data`, then its libraries. Members still
    /// attached to a removed library go with it.
    fn delete_complex(&mut self, data: &ComplexData) -> Result<()>;
}

impl<B: OrmBackend + ?Sized> OrmBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn init_db(&mut self) -> Result<()> {
        (**self).init_db()
    }

    fn write_simple(&mut self, books: &mut [Book]) -> Result<()> {
        (**self).write_simple(books)
    }

    fn read_simple(&mut self, quantity: usize) -> Result<Vec<Book>> {
        (**self).read_simple(quantity)
    }

    fn update_simple(&mut self, books: &[Book]) -> Result<()> {
        (**self).update_simple(books)
    }

    fn delete_simple(&mut self, books: &[Book]) -> Result<()> {
        (**self).delete_simple(books)
    }

    fn write_complex(&mut self, data: &mut ComplexData) -> Result<()> {
        (**self).write_complex(data)
    }

    fn read_complex(
        &mut self,
        libraries: usize,
        books: usize,
        persons: usize,
    ) -> Result<ComplexData> {
        (**self).read_complex(libraries, books, persons)
    }

    fn update_complex(&mut self, data: &ComplexData) -> Result<()> {
        (**self).update_complex(data)
    }

    fn delete_complex(&mut self, data: &ComplexData) -> Result<()> {
        (**self).delete_complex(data)
    }
}

impl<B: OrmBackend + ?Sized> OrmBackend for &mut B {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn init_db(&mut self) -> Result<()> {
        (**self).init_db()
    }

    fn write_simple(&mut self, books: &mut [Book]) -> Result<()> {
        (**self).write_simple(books)
    }

    fn read_simple(&mut self, quantity: usize) -> Result<Vec<Book>> {
        (**self).read_simple(quantity)
    }

    fn update_simple(&mut self, books: &[Book]) -> Result<()> {
        (**self).update_simple(books)
    }

    fn delete_simple(&mut self, books: &[Book]) -> Result<()> {
        (**self).delete_simple(books)
    }

    fn write_complex(&mut self, data: &mut ComplexData) -> Result<()> {
        (**self).write_complex(data)
    }

    fn read_complex(
        &mut self,
        libraries: usize,
        books: usize,
        persons: usize,
    ) -> Result<ComplexData> {
        (**self).read_complex(libraries, books, persons)
    }

    fn update_complex(&mut self, data: &ComplexData) -> Result<()> {
        (**self).update_complex(data)
    }

    fn delete_complex(&mut self, data: &ComplexData) -> Result<()> {
        (**self).delete_complex(data)
    }
}

// ── Helpers shared by backend implementations ────────────────────────

pub fn persisted_book_id(book: &Book) -> Result<i64> {
    book.id
        .ok_or_else(|| anyhow!("book '{}' has not been persisted", book.title))
}

pub fn persisted_person_id(person: &Person) -> Result<i64> {
    person.id.ok_or_else(|| {
        anyhow!(
            "person '{} {}' has not been persisted",
            person.first_name,
            person.second_name
        )
    })
}

pub fn persisted_library_id(library: &Library) -> Result<i64> {
    library
        .id
        .ok_or_else(|| anyhow!("library '{}' has not been persisted", library.name))
}
