//! The interfaces a bookstore exposes to its clients, and an in-memory implementation.
//!
//! A bookstore is split into two capabilities:
//!
//!  - [`StockManager`] lists the inventory and adds new books or copies
//!  - [`BookStore`] serves editor picks and sells copies to customers
//!
//! Both are async traits so that remote stores can be plugged in next to [`InMemoryStore`], which
//! keeps the whole inventory behind a lock in the current process.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

mod error;
mod in_memory;
mod store;

pub use error::{Result, ServiceError};
pub use in_memory::InMemoryStore;
pub use store::{BookStore, SharedBookStore, SharedStockManager, StockManager};
