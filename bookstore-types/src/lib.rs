//! Shared types describing the books flowing between the workload generator and a bookstore.
//!
//! - [`Isbn`] identifies a book in the catalog
//! - [`StockBook`] is the stock manager's full view of an inventory item
//! - [`Book`] is the customer-facing catalog entry
//! - [`BookCopy`] is a request to add or buy a number of copies of one book
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod book;

pub use book::{Book, BookCopy, Isbn, StockBook};
