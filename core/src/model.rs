//! Domain records exercised by the benchmarks.
//!
//! Entities carry an optional `id` that stays `None` until a backend has
//! persisted them. Composite workloads live in a [`ComplexData`] arena: the
//! flat `books` and `persons` vectors hold every member of the batch and each
//! [`Library`] points at its own contiguous slice of them.

use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Book {
    pub id: Option<i64>,
    pub title: String,
    pub author: String,
}

impl Book {
    pub fn new(title: String, author: String) -> Self {
        Self {
            id: None,
            title,
            author,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Person {
    pub id: Option<i64>,
    pub first_name: String,
    pub second_name: String,
}

impl Person {
    pub fn new(first_name: String, second_name: String) -> Self {
        Self {
            id: None,
            first_name,
            second_name,
        }
    }
}

/// Aggregate root of the complex workloads.
///
/// `books` and `persons` index into the owning [`ComplexData`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Library {
    pub id: Option<i64>,
    pub name: String,
    pub books: Range<usize>,
    pub persons: Range<usize>,
}

/// One batch of libraries together with every book and person they own.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComplexData {
    pub libraries: Vec<Library>,
    pub books: Vec<Book>,
    pub persons: Vec<Person>,
}

impl ComplexData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(libraries: usize, books: usize, persons: usize) -> Self {
        Self {
            libraries: Vec::with_capacity(libraries),
            books: Vec::with_capacity(books),
            persons: Vec::with_capacity(persons),
        }
    }

    /// Append a library owning exactly `books` and `persons`, in order.
    ///
    /// Returns the index of the new library.
    pub fn push_library(&mut self, name: String, books: Vec<Book>, persons: Vec<Person>) -> usize {
        self.push_library_with_id(None, name, books, persons)
    }

    /// Same as [`push_library`](Self::push_library) for an already persisted library.
    pub fn push_library_with_id(
        &mut self,
        id: Option<i64>,
        name: String,
        books: Vec<Book>,
        persons: Vec<Person>,
    ) -> usize {
        let book_start = self.books.len();
        self.books.extend(books);
        let person_start = self.persons.len();
        self.persons.extend(persons);

        self.libraries.push(Library {
            id,
            name,
            books: book_start..self.books.len(),
            persons: person_start..self.persons.len(),
        });
        self.libraries.len() - 1
    }

    pub fn library_books(&self, index: usize) -> &[Book] {
        &self.books[self.libraries[index].books.clone()]
    }

    pub fn library_persons(&self, index: usize) -> &[Person] {
        &self.persons[self.libraries[index].persons.clone()]
    }

    /// Number of libraries in the batch.
    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty() && self.books.is_empty() && self.persons.is_empty()
    }

    /// Owning library id of every book, by position.
    ///
    /// `None` for books outside every library range, or whose library has
    /// not been persisted yet.
    pub fn book_owners(&self) -> Vec<Option<i64>> {
        let mut owners = vec![None; self.books.len()];
        for library in &self.libraries {
            owners[library.books.clone()].fill(library.id);
        }
        owners
    }

    pub fn person_owners(&self) -> Vec<Option<i64>> {
        let mut owners = vec![None; self.persons.len()];
        for library in &self.libraries {
            owners[library.persons.clone()].fill(library.id);
        }
        owners
    }

    pub fn book_count(&self) -> usize {
        self.books.len()
    }

    pub fn person_count(&self) -> usize {
        self.persons.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn books(titles: &[&str]) -> Vec<Book> {
        titles
            .iter()
            .map(|t| Book::new(t.to_string(), "author".to_string()))
            .collect()
    }

    #[test]
    fn push_library_keeps_members_in_order() {
        let mut data = ComplexData::new();
        let first = data.push_library("a".into(), books(&["1", "2"]), vec![]);
        let second = data.push_library(
            "b".into(),
            books(&["3"]),
            vec![Person::new("x".into(), "y".into())],
        );

        assert_eq!(first, 0);
        assert_eq!(second, 1);
        assert_eq!(data.library_books(0), books(&["1", "2"]).as_slice());
        assert_eq!(data.library_books(1), books(&["3"]).as_slice());
        assert!(data.library_persons(0).is_empty());
        assert_eq!(data.library_persons(1)[0].first_name, "x");
        assert_eq!(data.book_count(), 3);
        assert_eq!(data.person_count(), 1);
    }

    #[test]
    fn member_ranges_never_overlap() {
        let mut data = ComplexData::new();
        for i in 0..4 {
            data.push_library(format!("lib{i}"), books(&["a", "b", "c"]), vec![]);
        }
        data.push_library(
            "with persons".into(),
            books(&["d"]),
            vec![Person::default(), Person::default()],
        );
        data.push_library("no persons".into(), vec![], vec![]);

        for pair in data.libraries.windows(2) {
            assert_eq!(pair[0].books.end, pair[1].books.start);
            assert_eq!(pair[0].persons.end, pair[1].persons.start);
        }
        assert_eq!(data.libraries.last().map(|l| l.books.end), Some(data.book_count()));
        assert_eq!(data.libraries.last().map(|l| l.persons.end), Some(data.person_count()));
    }

    #[test]
    fn owners_follow_library_ranges() {
        let mut data = ComplexData::new();
        data.push_library_with_id(Some(7), "a".into(), books(&["1", "2"]), vec![]);
        data.push_library("b".into(), books(&["3"]), vec![]);
        data.books.push(Book::default());

        assert_eq!(data.book_owners(), vec![Some(7), Some(7), None, None]);
        assert!(data.person_owners().is_empty());
    }

    #[test]
    fn empty_arena() {
        let data = ComplexData::with_capacity(5, 10, 10);
        assert!(data.is_empty());
        assert_eq!(data.len(), 0);
    }
}
