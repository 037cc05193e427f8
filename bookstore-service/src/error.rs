use bookstore_types::Isbn;
use thiserror::Error;

/// Errors reported by a bookstore.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The ISBN cannot identify a book.
    #[error("invalid isbn {0}")]
    InvalidIsbn(Isbn),

    /// The ISBN is not part of the inventory.
    #[error("isbn {0} is not in the inventory")]
    UnknownIsbn(Isbn),

    /// A book with this ISBN is already in the inventory.
    #[error("isbn {0} is already in the inventory")]
    DuplicateIsbn(Isbn),

    /// A request asked for zero copies.
    #[error("invalid number of copies ({num_copies}) for isbn {isbn}")]
    InvalidCopies {
        /// The book the request referred to.
        isbn: Isbn,
        /// The rejected number of copies.
        num_copies: u64,
    },

    /// A new book carries invalid catalog data.
    #[error("invalid book {isbn}: {reason}")]
    InvalidBook {
        /// The rejected book.
        isbn: Isbn,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// A purchase asked for more copies than are in stock.
    #[error("not enough copies in stock for {isbns:?}")]
    InsufficientCopies {
        /// All books of the purchase that lacked copies.
        isbns: Vec<Isbn>,
    },

    /// A previous panic left the inventory in an unknown state.
    #[error("inventory lock poisoned")]
    Poisoned,

    /// Any other failure, specific to one store implementation.
    #[error("store error: {context}")]
    Generic {
        /// What the store was doing.
        context: String,
        /// The underlying failure.
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ServiceError {
    /// Creates a [`ServiceError::Generic`] from a context and an underlying cause.
    pub fn generic(
        context: impl Into<String>,
        cause: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Generic {
            context: context.into(),
            cause: cause.into(),
        }
    }
}

/// Result type for bookstore operations.
pub type Result<T, E = ServiceError> = std::result::Result<T, E>;
