//! In-memory bookstore.
//!
//! This provides both [`StockManager`] and [`BookStore`] backed by a `BTreeMap` behind a
//! read-write lock. The store is [`Clone`] so tests and the workload driver can hold a handle for
//! direct inspection while workers share another copy.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bookstore_types::{Book, BookCopy, Isbn, StockBook};
use rand::seq::IndexedRandom;

use crate::error::{Result, ServiceError};
use crate::store::{BookStore, StockManager};

type Inventory = BTreeMap<Isbn, StockBook>;

/// A bookstore that keeps its whole inventory in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inventory: Arc<RwLock<Inventory>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already contains the given books.
    pub fn with_books(books: &[StockBook]) -> Result<Self> {
        let store = Self::new();
        store.insert_books(books)?;
        Ok(store)
    }

    /// Returns a copy of the stored book, if present.
    pub fn get(&self, isbn: Isbn) -> Result<Option<StockBook>> {
        Ok(self.read()?.get(&isbn).cloned())
    }

    /// Returns the number of distinct books in the inventory.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    /// Returns `true` if the inventory holds no books.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inventory>> {
        self.inventory.read().map_err(|_| ServiceError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inventory>> {
        self.inventory.write().map_err(|_| ServiceError::Poisoned)
    }

    fn insert_books(&self, books: &[StockBook]) -> Result<()> {
        let mut inventory = self.write()?;

        let mut batch = BTreeMap::new();
        for book in books {
            validate_book(book)?;
            if inventory.contains_key(&book.isbn) || batch.contains_key(&book.isbn) {
                return Err(ServiceError::DuplicateIsbn(book.isbn));
            }
            batch.insert(book.isbn, book.clone());
        }

        tracing::trace!(count = batch.len(), "adding books to inventory");
        inventory.append(&mut batch);
        Ok(())
    }

    fn insert_copies(&self, copies: &[BookCopy]) -> Result<()> {
        let mut inventory = self.write()?;

        let requested = merge_requests(&inventory, copies)?;
        for (isbn, num_copies) in requested {
            if let Some(book) = inventory.get_mut(&isbn) {
                book.num_copies += num_copies;
            }
        }

        Ok(())
    }

    fn pick_editor_picks(&self, count: usize) -> Result<Vec<Book>> {
        let inventory = self.read()?;

        let picks: Vec<&StockBook> = inventory.values().filter(|book| book.editor_pick).collect();
        if count >= picks.len() {
            return Ok(picks.into_iter().map(StockBook::to_book).collect());
        }

        let mut rng = rand::rng();
        Ok(picks
            .choose_multiple(&mut rng, count)
            .map(|book| book.to_book())
            .collect())
    }

    fn sell_copies(&self, copies: &[BookCopy]) -> Result<()> {
        let mut inventory = self.write()?;

        let requested = merge_requests(&inventory, copies)?;

        let mut missing = Vec::new();
        for (isbn, &num_copies) in &requested {
            if let Some(book) = inventory.get_mut(isbn)
                && book.num_copies < num_copies
            {
                book.num_sale_misses += num_copies - book.num_copies;
                missing.push(*isbn);
            }
        }

        if !missing.is_empty() {
            tracing::trace!(?missing, "purchase rejected");
            return Err(ServiceError::InsufficientCopies { isbns: missing });
        }

        for (isbn, num_copies) in requested {
            if let Some(book) = inventory.get_mut(&isbn) {
                book.num_copies -= num_copies;
            }
        }

        Ok(())
    }
}

fn validate_book(book: &StockBook) -> Result<()> {
    if !book.isbn.is_valid() {
        return Err(ServiceError::InvalidIsbn(book.isbn));
    }

    let reason = if book.title.is_empty() {
        "empty title"
    } else if book.author.is_empty() {
        "empty author"
    } else if book.price.is_nan() || book.price < 0.0 {
        "negative price"
    } else if book.num_copies == 0 {
        "no copies"
    } else {
        return Ok(());
    };

    Err(ServiceError::InvalidBook {
        isbn: book.isbn,
        reason,
    })
}

/// Validates copy requests against the inventory and sums them up per book.
fn merge_requests(inventory: &Inventory, copies: &[BookCopy]) -> Result<BTreeMap<Isbn, u64>> {
    let mut requested = BTreeMap::new();

    for copy in copies {
        if !copy.isbn.is_valid() {
            return Err(ServiceError::InvalidIsbn(copy.isbn));
        }
        if copy.num_copies == 0 {
            return Err(ServiceError::InvalidCopies {
                isbn: copy.isbn,
                num_copies: copy.num_copies,
            });
        }
        if !inventory.contains_key(&copy.isbn) {
            return Err(ServiceError::UnknownIsbn(copy.isbn));
        }

        match requested.entry(copy.isbn) {
            Entry::Vacant(entry) => {
                entry.insert(copy.num_copies);
            }
            Entry::Occupied(mut entry) => *entry.get_mut() += copy.num_copies,
        }
    }

    Ok(requested)
}

#[async_trait::async_trait]
impl StockManager for InMemoryStore {
    async fn list_inventory(&self) -> Result<Vec<StockBook>> {
        Ok(self.read()?.values().cloned().collect())
    }

    async fn add_inventory(&self, books: &[StockBook]) -> Result<()> {
        self.insert_books(books)
    }

    async fn add_copies(&self, copies: &[BookCopy]) -> Result<()> {
        self.insert_copies(copies)
    }
}

#[async_trait::async_trait]
impl BookStore for InMemoryStore {
    async fn editor_picks(&self, count: usize) -> Result<Vec<Book>> {
        self.pick_editor_picks(count)
    }

    async fn purchase(&self, copies: &[BookCopy]) -> Result<()> {
        self.sell_copies(copies)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn book(isbn: u64, copies: u64) -> StockBook {
        StockBook::new(isbn, format!("Book {isbn}"), "Author", 10.0, copies)
    }

    fn store() -> InMemoryStore {
        InMemoryStore::with_books(&[
            book(1, 5),
            book(2, 1).editor_pick(true),
            book(3, 10).editor_pick(true),
            book(4, 3).editor_pick(true),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn lists_inventory() {
        let store = store();
        let books = store.list_inventory().await.unwrap();

        let isbns: Vec<_> = books.iter().map(|b| b.isbn.0).collect();
        assert_eq!(isbns, [1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn rejects_duplicate_books() {
        let store = store();

        let result = store.add_inventory(&[book(5, 1), book(1, 1)]).await;
        assert!(matches!(result, Err(ServiceError::DuplicateIsbn(Isbn(1)))));

        // nothing of the batch was applied
        assert!(store.get(Isbn(5)).unwrap().is_none());

        let result = store.add_inventory(&[book(6, 1), book(6, 2)]).await;
        assert!(matches!(result, Err(ServiceError::DuplicateIsbn(Isbn(6)))));
    }

    #[tokio::test]
    async fn rejects_invalid_books() {
        let store = InMemoryStore::new();

        let result = store.add_inventory(&[book(0, 1)]).await;
        assert!(matches!(result, Err(ServiceError::InvalidIsbn(_))));

        let result = store.add_inventory(&[book(1, 0)]).await;
        assert!(matches!(
            result,
            Err(ServiceError::InvalidBook {
                reason: "no copies",
                ..
            })
        ));

        let mut untitled = book(1, 1);
        untitled.title.clear();
        let result = store.add_inventory(&[untitled]).await;
        assert!(matches!(
            result,
            Err(ServiceError::InvalidBook {
                reason: "empty title",
                ..
            })
        ));

        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn adds_copies() {
        let store = store();

        store
            .add_copies(&[BookCopy::new(1, 2), BookCopy::new(1, 3), BookCopy::new(2, 1)])
            .await
            .unwrap();

        assert_eq!(store.get(Isbn(1)).unwrap().unwrap().num_copies, 10);
        assert_eq!(store.get(Isbn(2)).unwrap().unwrap().num_copies, 2);
    }

    #[tokio::test]
    async fn add_copies_rejects_unknown_isbn() {
        let store = store();

        let result = store
            .add_copies(&[BookCopy::new(1, 2), BookCopy::new(99, 1)])
            .await;
        assert!(matches!(result, Err(ServiceError::UnknownIsbn(Isbn(99)))));
        assert_eq!(store.get(Isbn(1)).unwrap().unwrap().num_copies, 5);

        let result = store.add_copies(&[BookCopy::new(1, 0)]).await;
        assert!(matches!(result, Err(ServiceError::InvalidCopies { .. })));
    }

    #[tokio::test]
    async fn editor_picks_are_bounded() {
        let store = store();

        let all = store.editor_picks(10).await.unwrap();
        let isbns: BTreeSet<_> = all.iter().map(|b| b.isbn.0).collect();
        assert_eq!(isbns, BTreeSet::from([2, 3, 4]));

        let some = store.editor_picks(2).await.unwrap();
        assert_eq!(some.len(), 2);
        let distinct: BTreeSet<_> = some.iter().map(|b| b.isbn).collect();
        assert_eq!(distinct.len(), 2);
        assert!(some.iter().all(|b| isbns.contains(&b.isbn.0)));

        assert!(store.editor_picks(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn purchase_takes_copies() {
        let store = store();

        store
            .purchase(&[BookCopy::new(1, 2), BookCopy::new(3, 10)])
            .await
            .unwrap();

        assert_eq!(store.get(Isbn(1)).unwrap().unwrap().num_copies, 3);
        assert_eq!(store.get(Isbn(3)).unwrap().unwrap().num_copies, 0);
    }

    #[tokio::test]
    async fn purchase_is_all_or_nothing() {
        let store = store();

        let result = store
            .purchase(&[BookCopy::new(1, 1), BookCopy::new(2, 3), BookCopy::new(4, 4)])
            .await;

        let Err(ServiceError::InsufficientCopies { isbns }) = result else {
            panic!("expected insufficient copies");
        };
        assert_eq!(isbns, [Isbn(2), Isbn(4)]);

        let first = store.get(Isbn(1)).unwrap().unwrap();
        assert_eq!(first.num_copies, 5);
        assert_eq!(first.num_sale_misses, 0);

        let second = store.get(Isbn(2)).unwrap().unwrap();
        assert_eq!(second.num_copies, 1);
        assert_eq!(second.num_sale_misses, 2);
    }

    #[tokio::test]
    async fn concurrent_purchases_never_oversell() {
        let store = InMemoryStore::with_books(&[book(1, 100)]).unwrap();

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    let mut sold = 0;
                    for _ in 0..10 {
                        if store.purchase(&[BookCopy::new(1, 1)]).await.is_ok() {
                            sold += 1;
                        }
                    }
                    sold
                })
            })
            .collect();

        let mut sold = 0;
        for task in tasks {
            sold += task.await.unwrap();
        }

        assert_eq!(sold, 100);
        assert_eq!(store.get(Isbn(1)).unwrap().unwrap().num_copies, 0);
    }
}
