//! Scripted bookstores for exercising workers without real inventory semantics.
//!
//! ```
//! use bookstore_test::stubs::{Operation, StubStore};
//!
//! let store = StubStore::new().failing(Operation::Purchase);
//! assert_eq!(store.calls(Operation::Purchase), 0);
//! ```

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bookstore_service::{BookStore, Result, ServiceError, StockManager};
use bookstore_types::{Book, BookCopy, Isbn, StockBook};

/// The operations a [`StubStore`] serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// [`StockManager::list_inventory`]
    ListInventory,
    /// [`StockManager::add_inventory`]
    AddInventory,
    /// [`StockManager::add_copies`]
    AddCopies,
    /// [`BookStore::editor_picks`]
    EditorPicks,
    /// [`BookStore::purchase`]
    Purchase,
}

impl Operation {
    const ALL: [Operation; 5] = [
        Operation::ListInventory,
        Operation::AddInventory,
        Operation::AddCopies,
        Operation::EditorPicks,
        Operation::Purchase,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// What a stubbed operation does when called.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Behavior {
    #[default]
    Succeed,
    Fail,
    Panic,
}

/// A bookstore returning fixed data and recording how often each operation was called.
///
/// Clones share their call counters and the record of added books.
#[derive(Debug, Clone)]
pub struct StubStore {
    inventory: Arc<Vec<StockBook>>,
    editor_picks: Arc<Vec<Book>>,
    behaviors: [Behavior; 5],
    latency: Option<Duration>,
    calls: Arc<[AtomicUsize; 5]>,
    copies_requested: Arc<AtomicUsize>,
    added_isbns: Arc<Mutex<Vec<Isbn>>>,
}

impl Default for StubStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StubStore {
    /// Creates a stub with a small inventory where every operation succeeds.
    pub fn new() -> Self {
        let inventory: Vec<_> = (1..=10)
            .map(|i| StockBook::new(i, format!("Book {i}"), "Stub Author", 10.0, i * 10))
            .map(|book| {
                let pick = book.isbn.0 % 2 == 0;
                book.editor_pick(pick)
            })
            .collect();

        Self::with_inventory(inventory)
    }

    /// Creates a stub serving the given inventory. Editor picks are the flagged books.
    pub fn with_inventory(inventory: Vec<StockBook>) -> Self {
        let editor_picks = inventory
            .iter()
            .filter(|book| book.editor_pick)
            .map(StockBook::to_book)
            .collect();

        Self {
            inventory: Arc::new(inventory),
            editor_picks: Arc::new(editor_picks),
            behaviors: Default::default(),
            latency: None,
            calls: Default::default(),
            copies_requested: Default::default(),
            added_isbns: Default::default(),
        }
    }

    /// Makes every call of `operation` fail with a [`ServiceError`].
    pub fn failing(mut self, operation: Operation) -> Self {
        self.behaviors[operation.index()] = Behavior::Fail;
        self
    }

    /// Makes every call of `operation` panic.
    pub fn panicking(mut self, operation: Operation) -> Self {
        self.behaviors[operation.index()] = Behavior::Panic;
        self
    }

    /// Delays every call by the given duration.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Returns how often `operation` was called.
    pub fn calls(&self, operation: Operation) -> usize {
        self.calls[operation.index()].load(Ordering::Relaxed)
    }

    /// Returns the number of calls across all operations.
    pub fn total_calls(&self) -> usize {
        Operation::ALL.iter().map(|op| self.calls(*op)).sum()
    }

    /// Returns the sum of copies in all add-copies and purchase requests.
    pub fn copies_requested(&self) -> usize {
        self.copies_requested.load(Ordering::Relaxed)
    }

    /// Returns the ISBNs of all books submitted to successful add-inventory calls, in call order.
    pub fn added_isbns(&self) -> Vec<Isbn> {
        self.added_isbns
            .lock()
            .map(|isbns| isbns.clone())
            .unwrap_or_default()
    }

    async fn enter(&self, operation: Operation) -> Result<()> {
        self.calls[operation.index()].fetch_add(1, Ordering::Relaxed);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match self.behaviors[operation.index()] {
            Behavior::Succeed => Ok(()),
            Behavior::Fail => Err(ServiceError::generic(
                format!("{operation:?}"),
                "rejected by stub",
            )),
            Behavior::Panic => panic!("stub panicked during {operation:?}"),
        }
    }

    fn record_copies(&self, copies: &[BookCopy]) {
        let total: u64 = copies.iter().map(|copy| copy.num_copies).sum();
        self.copies_requested
            .fetch_add(total as usize, Ordering::Relaxed);
    }
}

#[async_trait::async_trait]
impl StockManager for StubStore {
    async fn list_inventory(&self) -> Result<Vec<StockBook>> {
        self.enter(Operation::ListInventory).await?;
        Ok(self.inventory.as_ref().clone())
    }

    async fn add_inventory(&self, books: &[StockBook]) -> Result<()> {
        self.enter(Operation::AddInventory).await?;
        if let Ok(mut added) = self.added_isbns.lock() {
            added.extend(books.iter().map(|book| book.isbn));
        }
        Ok(())
    }

    async fn add_copies(&self, copies: &[BookCopy]) -> Result<()> {
        self.enter(Operation::AddCopies).await?;
        self.record_copies(copies);
        Ok(())
    }
}

#[async_trait::async_trait]
impl BookStore for StubStore {
    async fn editor_picks(&self, count: usize) -> Result<Vec<Book>> {
        self.enter(Operation::EditorPicks).await?;
        Ok(self.editor_picks.iter().take(count).cloned().collect())
    }

    async fn purchase(&self, copies: &[BookCopy]) -> Result<()> {
        self.enter(Operation::Purchase).await?;
        self.record_copies(copies);
        Ok(())
    }
}
