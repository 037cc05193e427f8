use std::fmt::Debug;
use std::sync::Arc;

use bookstore_types::{Book, BookCopy, StockBook};

use crate::error::Result;

/// A type-erased [`StockManager`] that can be shared between tasks.
pub type SharedStockManager = Arc<dyn StockManager>;

/// A type-erased [`BookStore`] that can be shared between tasks.
pub type SharedBookStore = Arc<dyn BookStore>;

/// The stock manager's interface to a bookstore.
///
/// Implementations must accept concurrent calls. Every call is a complete request on its own.
#[async_trait::async_trait]
pub trait StockManager: Debug + Send + Sync + 'static {
    /// Returns every book in the inventory.
    async fn list_inventory(&self) -> Result<Vec<StockBook>>;

    /// Adds new books to the inventory.
    ///
    /// The batch is applied atomically: if any book is invalid or already present, nothing is
    /// added.
    async fn add_inventory(&self, books: &[StockBook]) -> Result<()>;

    /// Adds copies of books that are already in the inventory.
    async fn add_copies(&self, copies: &[BookCopy]) -> Result<()>;
}

/// The customer's interface to a bookstore.
#[async_trait::async_trait]
pub trait BookStore: Debug + Send + Sync + 'static {
    /// Returns at most `count` books currently flagged as editor picks.
    async fn editor_picks(&self, count: usize) -> Result<Vec<Book>>;

    /// Buys copies of the given books.
    ///
    /// The purchase is all or nothing.
    async fn purchase(&self, copies: &[BookCopy]) -> Result<()>;
}
