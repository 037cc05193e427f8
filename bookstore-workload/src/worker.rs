//! A single load-generating worker.
//!
//! Each [`Worker`] runs a warm-up phase followed by a measured phase. Every iteration draws a
//! number from `[0, 100)` and runs the interaction that the
//! [`WorkloadConfiguration`](crate::workload::WorkloadConfiguration) maps it to.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use bookstore_types::{BookCopy, Isbn, StockBook};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};
use crate::metrics::{InteractionMetrics, WorkerResult};
use crate::sampler;
use crate::workload::{InteractionKind, WorkloadConfiguration};

/// The phases a worker passes through, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum WorkerState {
    /// Constructed but not started.
    Created,
    /// Running iterations whose results are discarded.
    WarmingUp,
    /// Running timed iterations.
    Measuring,
    /// Finished and reported its result.
    Done,
}

/// Runs interactions against the store under test and measures them.
///
/// A worker is owned by exactly one task and consumed by [`Worker::run`].
#[derive(Debug)]
pub struct Worker {
    id: usize,
    config: Arc<WorkloadConfiguration>,
    rng: SmallRng,
    state: WorkerState,

    successful_customer_interactions: usize,
    total_customer_interactions: usize,
}

impl Worker {
    /// Creates worker number `id`, seeded from the configuration's base seed.
    pub fn new(id: usize, config: Arc<WorkloadConfiguration>) -> Self {
        let rng = SmallRng::seed_from_u64(config.seed().wrapping_add(id as u64));

        Self {
            id,
            config,
            rng,
            state: WorkerState::Created,
            successful_customer_interactions: 0,
            total_customer_interactions: 0,
        }
    }

    /// The index of this worker within its run.
    pub fn id(&self) -> usize {
        self.id
    }

    /// The phase this worker is in.
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Runs the warm-up and measured phases and returns the measurements.
    ///
    /// Errors reported by the store only fail the iteration they occur in. Any other error aborts
    /// the worker.
    pub async fn run(mut self) -> Result<WorkerResult> {
        tracing::debug!(worker = self.id, "starting worker");

        self.transition(WorkerState::WarmingUp);
        for _ in 0..self.config.warm_up_runs() {
            let kind = self.next_interaction();
            self.run_interaction(kind).await?;
        }

        self.transition(WorkerState::Measuring);
        self.successful_customer_interactions = 0;
        self.total_customer_interactions = 0;

        let measured_runs = self.config.measured_runs();
        let mut successful_interactions = 0;
        let mut interactions = InteractionMetrics::default();

        let start = Instant::now();
        for _ in 0..measured_runs {
            let kind = self.next_interaction();
            if kind == InteractionKind::Customer {
                self.total_customer_interactions += 1;
            }

            let interaction_start = Instant::now();
            let success = self.run_interaction(kind).await?;
            interactions.record(kind, interaction_start.elapsed(), success);

            if success {
                successful_interactions += 1;
                if kind == InteractionKind::Customer {
                    self.successful_customer_interactions += 1;
                }
            }
        }
        let elapsed = start.elapsed();

        self.transition(WorkerState::Done);
        tracing::debug!(
            worker = self.id,
            successful_interactions,
            elapsed = ?elapsed,
            "worker finished"
        );

        Ok(WorkerResult {
            successful_interactions,
            elapsed,
            measured_runs_requested: measured_runs,
            successful_customer_interactions: self.successful_customer_interactions,
            total_customer_interactions: self.total_customer_interactions,
            interactions,
        })
    }

    fn transition(&mut self, next: WorkerState) {
        debug_assert!(next > self.state, "{:?} -> {next:?}", self.state);
        tracing::trace!(worker = self.id, from = ?self.state, to = ?next, "worker transition");
        self.state = next;
    }

    fn next_interaction(&mut self) -> InteractionKind {
        let draw = self.rng.random_range(0.0..100.0_f64);
        self.config.choose_interaction(draw)
    }

    /// Runs one interaction and returns whether the store accepted it.
    async fn run_interaction(&mut self, kind: InteractionKind) -> Result<bool> {
        let result = match kind {
            InteractionKind::Rare => self.run_rare_interaction().await,
            InteractionKind::FrequentStock => self.run_frequent_stock_interaction().await,
            InteractionKind::Customer => self.run_customer_interaction().await,
        };

        match result {
            Ok(()) => Ok(true),
            Err(Error::Service(error)) => {
                tracing::debug!(
                    worker = self.id,
                    interaction = %kind,
                    error = &error as &dyn std::error::Error,
                    "interaction failed"
                );
                Ok(false)
            }
            Err(error) => Err(error),
        }
    }

    /// Adds books that are not yet part of the inventory.
    async fn run_rare_interaction(&mut self) -> Result<()> {
        let inventory = self.config.stock_manager().list_inventory().await?;
        let existing: BTreeSet<Isbn> = inventory.iter().map(|book| book.isbn).collect();

        let candidates = self
            .config
            .sampler()
            .next_set_of_stock_books(&mut self.rng, self.config.num_books_to_add())?;
        let new_books: Vec<StockBook> = candidates
            .into_iter()
            .filter(|book| !existing.contains(&book.isbn))
            .collect();

        if new_books.is_empty() {
            return Ok(());
        }

        self.config.stock_manager().add_inventory(&new_books).await?;
        Ok(())
    }

    /// Restocks the books with the fewest copies.
    async fn run_frequent_stock_interaction(&mut self) -> Result<()> {
        let inventory = self.config.stock_manager().list_inventory().await?;

        let k = self.config.num_books_with_least_copies().min(inventory.len());
        let selected = sampler::select_k_smallest(&inventory, k, |book| book.num_copies)?;
        if selected.is_empty() {
            return Ok(());
        }

        let num_copies = self.config.num_copies_to_add();
        let copies: Vec<BookCopy> = selected
            .iter()
            .map(|book| BookCopy::new(book.isbn, num_copies))
            .collect();

        self.config.stock_manager().add_copies(&copies).await?;
        Ok(())
    }

    /// Buys copies of a random subset of the editor picks.
    async fn run_customer_interaction(&mut self) -> Result<()> {
        let wanted = self.config.num_editor_picks_to_sample();
        let picks = self.config.book_store().editor_picks(wanted).await?;
        let isbns: BTreeSet<Isbn> = picks.iter().map(|book| book.isbn).collect();

        let count = wanted.min(isbns.len());
        let chosen = sampler::sample_without_replacement(&mut self.rng, &isbns, count)?;

        let num_copies = self.config.num_copies_to_buy();
        let copies: Vec<BookCopy> = chosen
            .into_iter()
            .map(|isbn| BookCopy::new(isbn, num_copies))
            .collect();

        self.config.book_store().purchase(&copies).await?;
        Ok(())
    }
}
