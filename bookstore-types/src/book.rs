//! Definitions of books, stock items and copy requests.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Key of a book in the catalog.
///
/// Valid ISBNs are strictly positive. The store rejects `0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Isbn(pub u64);

impl Isbn {
    /// Returns `true` if this ISBN can identify a book.
    pub fn is_valid(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Isbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Isbn {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// An inventory item as seen by the stock manager.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockBook {
    /// The catalog key.
    pub isbn: Isbn,
    /// Title of the book.
    pub title: String,
    /// Author of the book.
    pub author: String,
    /// Price per copy.
    pub price: f32,
    /// Number of copies currently in stock.
    pub num_copies: u64,
    /// How often a customer asked for more copies than were in stock.
    #[serde(default)]
    pub num_sale_misses: u64,
    /// How often the book was rated.
    #[serde(default)]
    pub num_times_rated: u64,
    /// Sum of all ratings.
    #[serde(default)]
    pub total_rating: u64,
    /// Whether the book is currently an editor pick.
    #[serde(default)]
    pub editor_pick: bool,
}

impl StockBook {
    /// Creates a new stock book without sales or rating history.
    pub fn new(
        isbn: impl Into<Isbn>,
        title: impl Into<String>,
        author: impl Into<String>,
        price: f32,
        num_copies: u64,
    ) -> Self {
        Self {
            isbn: isbn.into(),
            title: title.into(),
            author: author.into(),
            price,
            num_copies,
            num_sale_misses: 0,
            num_times_rated: 0,
            total_rating: 0,
            editor_pick: false,
        }
    }

    /// Marks the book as an editor pick.
    pub fn editor_pick(mut self, editor_pick: bool) -> Self {
        self.editor_pick = editor_pick;
        self
    }

    /// Average rating, or `None` if the book was never rated.
    pub fn average_rating(&self) -> Option<f32> {
        (self.num_times_rated > 0).then(|| self.total_rating as f32 / self.num_times_rated as f32)
    }

    /// Returns the customer-facing view of this book.
    pub fn to_book(&self) -> Book {
        Book {
            isbn: self.isbn,
            title: self.title.clone(),
            author: self.author.clone(),
            price: self.price,
        }
    }
}

/// A catalog entry as seen by customers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// The catalog key.
    pub isbn: Isbn,
    /// Title of the book.
    pub title: String,
    /// Author of the book.
    pub author: String,
    /// Price per copy.
    pub price: f32,
}

/// A number of copies of a single book, used to restock or to buy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct BookCopy {
    /// The book the copies refer to.
    pub isbn: Isbn,
    /// Number of copies.
    pub num_copies: u64,
}

impl BookCopy {
    /// Creates a request for `num_copies` copies of the given book.
    pub fn new(isbn: impl Into<Isbn>, num_copies: u64) -> Self {
        Self {
            isbn: isbn.into(),
            num_copies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isbn_zero_is_invalid() {
        assert!(!Isbn(0).is_valid());
        assert!(Isbn(3044560).is_valid());
    }

    #[test]
    fn average_rating_requires_ratings() {
        let mut book = StockBook::new(1, "Title", "Author", 10.0, 5);
        assert_eq!(book.average_rating(), None);

        book.num_times_rated = 2;
        book.total_rating = 7;
        assert_eq!(book.average_rating(), Some(3.5));
    }

    #[test]
    fn deserializes_with_defaults() {
        let book: StockBook = serde_json::from_str(
            r#"{"isbn":42,"title":"Blah","author":"Blah Author","price":10.0,"num_copies":100}"#,
        )
        .unwrap();

        assert_eq!(book, StockBook::new(42, "Blah", "Blah Author", 10.0, 100));
        assert!(!book.editor_pick);
    }
}
