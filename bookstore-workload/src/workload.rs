//! A module for defining a [`WorkloadConfiguration`] shared by all workers of a run.

use std::fmt;

use bookstore_service::{SharedBookStore, SharedStockManager};

use crate::error::{Error, Result};
use crate::sampler::Sampler;

/// The kinds of interactions a worker performs against the bookstore.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    /// A stock manager adds books that are not yet in the catalog.
    Rare,
    /// A stock manager restocks the books with the fewest copies.
    FrequentStock,
    /// A customer buys some of the editor picks.
    Customer,
}

impl InteractionKind {
    /// All interaction kinds, in threshold order.
    pub const ALL: [InteractionKind; 3] = [
        InteractionKind::Rare,
        InteractionKind::FrequentStock,
        InteractionKind::Customer,
    ];

    /// A short name used in logs and reports.
    pub fn name(self) -> &'static str {
        match self {
            InteractionKind::Rare => "rare",
            InteractionKind::FrequentStock => "frequent-stock",
            InteractionKind::Customer => "customer",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A builder for creating a [`WorkloadConfiguration`].
#[derive(Debug)]
pub struct WorkloadBuilder {
    stock_manager: SharedStockManager,
    book_store: SharedBookStore,
    sampler: Option<Sampler>,
    seed: u64,

    warm_up_runs: usize,
    measured_runs: usize,

    rare_threshold: f64,
    frequent_threshold: f64,

    num_books_to_add: usize,
    num_books_with_least_copies: usize,
    num_copies_to_add: u64,
    num_editor_picks_to_sample: usize,
    num_copies_to_buy: u64,
}

impl WorkloadBuilder {
    /// Number of iterations each worker runs before measuring.
    pub fn warm_up_runs(mut self, runs: usize) -> Self {
        self.warm_up_runs = runs;
        self
    }

    /// Number of timed iterations each worker runs.
    pub fn measured_runs(mut self, runs: usize) -> Self {
        self.measured_runs = runs;
        self
    }

    /// Cumulative percentages selecting the interaction of each iteration.
    ///
    /// A draw in `[0, rare)` runs a rare interaction, a draw in `[rare, frequent)` a frequent stock
    /// interaction, and any other draw a customer interaction.
    pub fn interaction_mix(mut self, rare: f64, frequent: f64) -> Self {
        self.rare_threshold = rare;
        self.frequent_threshold = frequent;
        self
    }

    /// Number of new books generated by a rare interaction.
    pub fn num_books_to_add(mut self, num: usize) -> Self {
        self.num_books_to_add = num;
        self
    }

    /// Number of books restocked by a frequent stock interaction.
    pub fn num_books_with_least_copies(mut self, num: usize) -> Self {
        self.num_books_with_least_copies = num;
        self
    }

    /// Number of copies added to each restocked book.
    pub fn num_copies_to_add(mut self, num: u64) -> Self {
        self.num_copies_to_add = num;
        self
    }

    /// Number of editor picks a customer requests and buys from.
    pub fn num_editor_picks_to_sample(mut self, num: usize) -> Self {
        self.num_editor_picks_to_sample = num;
        self
    }

    /// Number of copies a customer buys of each sampled book.
    pub fn num_copies_to_buy(mut self, num: u64) -> Self {
        self.num_copies_to_buy = num;
        self
    }

    /// Generator for the books added by rare interactions.
    pub fn sampler(mut self, sampler: Sampler) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// Base seed of the workers' random number generators.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validates the parameters and creates the configuration.
    pub fn build(self) -> Result<WorkloadConfiguration> {
        let rare = self.rare_threshold;
        let frequent = self.frequent_threshold;
        if !(0.0..=100.0).contains(&rare) || !(0.0..=100.0).contains(&frequent) {
            return Err(Error::invalid(format!(
                "interaction thresholds must be within [0, 100], got {rare} and {frequent}"
            )));
        }
        if rare > frequent {
            return Err(Error::invalid(format!(
                "rare threshold {rare} exceeds frequent threshold {frequent}"
            )));
        }

        let counts = [
            ("num_books_to_add", self.num_books_to_add as u64),
            (
                "num_books_with_least_copies",
                self.num_books_with_least_copies as u64,
            ),
            ("num_copies_to_add", self.num_copies_to_add),
            (
                "num_editor_picks_to_sample",
                self.num_editor_picks_to_sample as u64,
            ),
            ("num_copies_to_buy", self.num_copies_to_buy),
        ];
        if let Some((name, _)) = counts.iter().find(|(_, count)| *count == 0) {
            return Err(Error::invalid(format!("{name} must be positive")));
        }

        let sampler = match self.sampler {
            Some(sampler) => sampler,
            None => Sampler::builder().build()?,
        };
        if self.num_books_to_add as u64 > sampler.universe_size() {
            return Err(Error::invalid(format!(
                "num_books_to_add {} exceeds the {} ISBNs the generator draws from",
                self.num_books_to_add,
                sampler.universe_size()
            )));
        }

        Ok(WorkloadConfiguration {
            stock_manager: self.stock_manager,
            book_store: self.book_store,
            sampler,
            seed: self.seed,

            warm_up_runs: self.warm_up_runs,
            measured_runs: self.measured_runs,

            rare_threshold: rare,
            frequent_threshold: frequent,

            num_books_to_add: self.num_books_to_add,
            num_books_with_least_copies: self.num_books_with_least_copies,
            num_copies_to_add: self.num_copies_to_add,
            num_editor_picks_to_sample: self.num_editor_picks_to_sample,
            num_copies_to_buy: self.num_copies_to_buy,
        })
    }
}

/// Parameters of a load test, shared read-only by every worker.
///
/// There is no way to change a configuration after [`WorkloadBuilder::build`]. Workers hold it in
/// an `Arc` and read it concurrently.
#[derive(Debug)]
pub struct WorkloadConfiguration {
    stock_manager: SharedStockManager,
    book_store: SharedBookStore,
    sampler: Sampler,
    seed: u64,

    warm_up_runs: usize,
    measured_runs: usize,

    rare_threshold: f64,
    frequent_threshold: f64,

    num_books_to_add: usize,
    num_books_with_least_copies: usize,
    num_copies_to_add: u64,
    num_editor_picks_to_sample: usize,
    num_copies_to_buy: u64,
}

impl WorkloadConfiguration {
    /// Constructs a new builder running against the given store, with default parameters.
    pub fn builder(stock_manager: SharedStockManager, book_store: SharedBookStore) -> WorkloadBuilder {
        WorkloadBuilder {
            stock_manager,
            book_store,
            sampler: None,
            seed: rand::random(),

            warm_up_runs: 100,
            measured_runs: 500,

            rare_threshold: 10.0,
            frequent_threshold: 30.0,

            num_books_to_add: 5,
            num_books_with_least_copies: 5,
            num_copies_to_add: 10,
            num_editor_picks_to_sample: 10,
            num_copies_to_buy: 1,
        }
    }

    /// Maps a draw from `[0, 100)` to the interaction it selects.
    pub fn choose_interaction(&self, draw: f64) -> InteractionKind {
        if draw < self.rare_threshold {
            InteractionKind::Rare
        } else if draw < self.frequent_threshold {
            InteractionKind::FrequentStock
        } else {
            InteractionKind::Customer
        }
    }

    /// The stock manager interface of the store under test.
    pub fn stock_manager(&self) -> &SharedStockManager {
        &self.stock_manager
    }

    /// The customer interface of the store under test.
    pub fn book_store(&self) -> &SharedBookStore {
        &self.book_store
    }

    /// Generator for the books added by rare interactions.
    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }

    /// Base seed of the workers' random number generators.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of iterations each worker runs before measuring.
    pub fn warm_up_runs(&self) -> usize {
        self.warm_up_runs
    }

    /// Number of timed iterations each worker runs.
    pub fn measured_runs(&self) -> usize {
        self.measured_runs
    }

    /// Upper bound (exclusive) of draws selecting a rare interaction.
    pub fn rare_threshold(&self) -> f64 {
        self.rare_threshold
    }

    /// Upper bound (exclusive) of draws selecting a frequent stock interaction.
    pub fn frequent_threshold(&self) -> f64 {
        self.frequent_threshold
    }

    /// Number of new books generated by a rare interaction.
    pub fn num_books_to_add(&self) -> usize {
        self.num_books_to_add
    }

    /// Number of books restocked by a frequent stock interaction.
    pub fn num_books_with_least_copies(&self) -> usize {
        self.num_books_with_least_copies
    }

    /// Number of copies added to each restocked book.
    pub fn num_copies_to_add(&self) -> u64 {
        self.num_copies_to_add
    }

    /// Number of editor picks a customer requests and buys from.
    pub fn num_editor_picks_to_sample(&self) -> usize {
        self.num_editor_picks_to_sample
    }

    /// Number of copies a customer buys of each sampled book.
    pub fn num_copies_to_buy(&self) -> u64 {
        self.num_copies_to_buy
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bookstore_test::stubs::StubStore;

    use super::*;

    fn builder() -> WorkloadBuilder {
        let store = Arc::new(StubStore::new());
        WorkloadConfiguration::builder(store.clone(), store)
    }

    #[test]
    fn thresholds_are_cumulative() {
        let config = builder().interaction_mix(5.0, 20.0).build().unwrap();

        assert_eq!(config.choose_interaction(0.0), InteractionKind::Rare);
        assert_eq!(config.choose_interaction(4.99), InteractionKind::Rare);
        assert_eq!(config.choose_interaction(5.0), InteractionKind::FrequentStock);
        assert_eq!(config.choose_interaction(19.99), InteractionKind::FrequentStock);
        assert_eq!(config.choose_interaction(20.0), InteractionKind::Customer);
        assert_eq!(config.choose_interaction(99.99), InteractionKind::Customer);
    }

    #[test]
    fn zero_rare_threshold_never_selects_rare() {
        let config = builder().interaction_mix(0.0, 50.0).build().unwrap();
        assert_eq!(config.choose_interaction(0.0), InteractionKind::FrequentStock);
    }

    #[test]
    fn full_rare_threshold_always_selects_rare() {
        let config = builder().interaction_mix(100.0, 100.0).build().unwrap();
        assert_eq!(config.choose_interaction(0.0), InteractionKind::Rare);
        assert_eq!(config.choose_interaction(99.999), InteractionKind::Rare);
    }

    #[test]
    fn rejects_inconsistent_thresholds() {
        let result = builder().interaction_mix(40.0, 30.0).build();
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        let result = builder().interaction_mix(-1.0, 30.0).build();
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        let result = builder().interaction_mix(10.0, 100.5).build();
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        let result = builder().interaction_mix(f64::NAN, 30.0).build();
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn rejects_zero_counts() {
        let result = builder().num_copies_to_buy(0).build();
        let Err(Error::InvalidArgument(message)) = result else {
            panic!("expected invalid argument");
        };
        assert!(message.contains("num_copies_to_buy"));

        assert!(builder().num_books_with_least_copies(0).build().is_err());
        assert!(builder().num_editor_picks_to_sample(0).build().is_err());
    }

    #[test]
    fn rejects_more_new_books_than_isbns() {
        let sampler = || Sampler::builder().isbns(1..=3).build().unwrap();

        let result = builder().sampler(sampler()).num_books_to_add(5).build();
        let Err(Error::InvalidArgument(message)) = result else {
            panic!("expected invalid argument");
        };
        assert!(message.contains("num_books_to_add"));

        let config = builder().sampler(sampler()).num_books_to_add(3).build().unwrap();
        assert_eq!(config.num_books_to_add(), 3);
        assert_eq!(config.sampler().universe_size(), 3);
    }

    #[test]
    fn allows_empty_phases() {
        let config = builder().warm_up_runs(0).measured_runs(0).build().unwrap();
        assert_eq!(config.warm_up_runs(), 0);
        assert_eq!(config.measured_runs(), 0);
    }
}
