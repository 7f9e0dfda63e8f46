//! Random test data for the benchmark workloads.

use crate::config::WorkloadShape;
use crate::model::{Book, ComplexData, Person};
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const STRING_LEN: usize = 16;

pub struct RandomObjectsGenerator {
    rng: StdRng,
}

impl RandomObjectsGenerator {
    /// Generator seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Generator with a fixed seed, for reproducible workloads.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_string(&mut self) -> String {
        (&mut self.rng)
            .sample_iter(&Alphanumeric)
            .take(STRING_LEN)
            .map(char::from)
            .collect()
    }

    pub fn generate_books(&mut self, n: usize) -> Vec<Book> {
        (0..n)
            .map(|_| Book::new(self.next_string(), self.next_string()))
            .collect()
    }

    pub fn generate_persons(&mut self, n: usize) -> Vec<Person> {
        (0..n)
            .map(|_| Person::new(self.next_string(), self.next_string()))
            .collect()
    }

    /// Add a randomly named library owning `books` and `persons` to `data`.
    ///
    /// Returns the index of the library inside `data`.
    pub fn next_library(
        &mut self,
        data: &mut ComplexData,
        books: Vec<Book>,
        persons: Vec<Person>,
    ) -> usize {
        let name = self.next_string();
        data.push_library(name, books, persons)
    }

    /// Build a fresh batch of `shape.libraries` libraries, each owning
    /// `shape.books` books and `shape.persons` persons.
    pub fn generate_complex(&mut self, shape: &WorkloadShape) -> ComplexData {
        let mut data = ComplexData::with_capacity(
            shape.libraries,
            shape.total_books(),
            shape.total_persons(),
        );
        for _ in 0..shape.libraries {
            let books = self.generate_books(shape.books);
            let persons = self.generate_persons(shape.persons);
            self.next_library(&mut data, books, persons);
        }
        data
    }
}

impl Default for RandomObjectsGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_exact_counts() {
        let mut generator = RandomObjectsGenerator::new();
        for n in [0, 1, 17, 1000] {
            let books = generator.generate_books(n);
            let persons = generator.generate_persons(n);
            assert_eq!(books.len(), n);
            assert_eq!(persons.len(), n);
            assert!(books.iter().all(|b| b.id.is_none()
                && !b.title.is_empty()
                && !b.author.is_empty()));
            assert!(persons
                .iter()
                .all(|p| !p.first_name.is_empty() && !p.second_name.is_empty()));
        }
    }

    #[test]
    fn next_string_is_alphanumeric() {
        let mut generator = RandomObjectsGenerator::new();
        let s = generator.next_string();
        assert_eq!(s.len(), STRING_LEN);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(s, generator.next_string());
    }

    #[test]
    fn next_library_owns_exactly_the_given_members() {
        let mut generator = RandomObjectsGenerator::with_seed(7);
        let mut data = ComplexData::new();
        let books = generator.generate_books(3);
        let persons = generator.generate_persons(2);

        let idx = generator.next_library(&mut data, books.clone(), persons.clone());

        assert_eq!(data.library_books(idx), books.as_slice());
        assert_eq!(data.library_persons(idx), persons.as_slice());
        assert!(!data.libraries[idx].name.is_empty());
    }

    #[test]
    fn complex_batch_members_belong_to_one_library() {
        let mut generator = RandomObjectsGenerator::with_seed(8);
        let data = generator.generate_complex(&WorkloadShape::new(4, 6, 5));

        let mut next_book = 0;
        let mut next_person = 0;
        for library in &data.libraries {
            assert_eq!(library.books.start, next_book);
            assert_eq!(library.persons.start, next_person);
            next_book = library.books.end;
            next_person = library.persons.end;
        }
        assert_eq!(next_book, data.book_count());
        assert_eq!(next_person, data.person_count());
    }

    #[test]
    fn complex_shape_counts() {
        let mut generator = RandomObjectsGenerator::new();
        let shape = WorkloadShape::new(5, 500, 400);
        let data = generator.generate_complex(&shape);
        assert_eq!(data.len(), 5);
        assert_eq!(data.book_count(), 2500);
        assert_eq!(data.person_count(), 2000);
        for i in 0..data.len() {
            assert_eq!(data.library_books(i).len(), 500);
            assert_eq!(data.library_persons(i).len(), 400);
        }
    }

    #[test]
    fn same_seed_same_data() {
        let mut a = RandomObjectsGenerator::with_seed(0xDEAD_BEEF);
        let mut b = RandomObjectsGenerator::with_seed(0xDEAD_BEEF);
        assert_eq!(a.generate_books(10), b.generate_books(10));
        assert_eq!(
            a.generate_complex(&WorkloadShape::new(2, 3, 4)),
            b.generate_complex(&WorkloadShape::new(2, 3, 4))
        );
    }
}
