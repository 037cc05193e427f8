//! Random selection of books.
//!
//! The free functions are the selection algorithms used by workers:
//!
//!  - [`sample_without_replacement`] picks distinct keys uniformly at random
//!  - [`sample_with_replacement`] draws keys independently
//!  - [`select_k_smallest`] picks the `k` items with the smallest key
//!
//! [`Sampler`] builds on them to generate sets of new books for restocking the catalog.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use bookstore_types::{Isbn, StockBook};
use rand::Rng;
use rand::seq::{IndexedRandom, IteratorRandom};
use rand_distr::{Distribution, LogNormal};

use crate::error::{Error, Result};

const TITLE_WORDS: &[&str] = &[
    "Test", "Thrones", "Harry", "Unit", "Interstellar", "Garden", "Night", "River", "Silent",
    "Empire", "Winter", "Iron", "Glass", "Shadow", "Ocean", "Fire", "Kingdom", "Last", "Secret",
    "Storm",
];

const AUTHOR_NAMES: &[&str] = &[
    "George", "Joanne", "Ursula", "Isaac", "Agatha", "Terry", "Octavia", "Douglas", "Mary", "Neil",
    "Le Guin", "Asimov", "Christie", "Pratchett", "Butler", "Adams", "Shelley", "Gaiman",
];

/// Selects `count` distinct keys uniformly at random from `candidates`.
///
/// Every candidate is equally likely to be part of the result. Fails with
/// [`Error::InvalidArgument`] if `count` exceeds the number of candidates.
pub fn sample_without_replacement<K, R>(
    rng: &mut R,
    candidates: &BTreeSet<K>,
    count: usize,
) -> Result<BTreeSet<K>>
where
    K: Ord + Copy,
    R: Rng + ?Sized,
{
    if count > candidates.len() {
        return Err(Error::invalid(format!(
            "cannot sample {count} distinct keys from {} candidates",
            candidates.len()
        )));
    }

    // Reservoir sampling visits every candidate once and never yields a key twice.
    let sample = candidates.iter().copied().choose_multiple(rng, count);
    Ok(sample.into_iter().collect())
}

/// Draws `count` keys from `candidates`, each independently and uniformly at random.
///
/// The result may contain repetitions. Fails with [`Error::InvalidArgument`] if keys are requested
/// from an empty candidate slice.
pub fn sample_with_replacement<K, R>(rng: &mut R, candidates: &[K], count: usize) -> Result<Vec<K>>
where
    K: Copy,
    R: Rng + ?Sized,
{
    if candidates.is_empty() && count > 0 {
        return Err(Error::invalid(format!(
            "cannot sample {count} keys from an empty candidate set"
        )));
    }

    Ok((0..count)
        .filter_map(|_| candidates.choose(rng).copied())
        .collect())
}

/// Returns the `k` items with the smallest `key`.
///
/// The order of the returned items is unspecified, and so is which of several items with equal
/// keys are picked at the boundary. `items` is left untouched; the selection runs on a copy in
/// linear time on average. Fails with [`Error::InvalidArgument`] if `k` exceeds the number of
/// items.
pub fn select_k_smallest<T, K, F>(items: &[T], k: usize, key: F) -> Result<Vec<T>>
where
    T: Clone,
    K: Ord,
    F: FnMut(&T) -> K,
{
    if k > items.len() {
        return Err(Error::invalid(format!(
            "cannot select {k} items out of {}",
            items.len()
        )));
    }
    if k == 0 {
        return Ok(Vec::new());
    }

    let mut snapshot = items.to_vec();
    if k < snapshot.len() {
        snapshot.select_nth_unstable_by_key(k - 1, key);
        snapshot.truncate(k);
    }

    Ok(snapshot)
}

/// Selects `count` distinct integers uniformly at random from `range`.
fn sample_range<R>(rng: &mut R, range: &RangeInclusive<u64>, count: usize) -> Result<Vec<u64>>
where
    R: Rng + ?Sized,
{
    let len = range
        .end()
        .checked_sub(*range.start())
        .and_then(|span| usize::try_from(span).ok())
        .and_then(|span| span.checked_add(1))
        .ok_or_else(|| Error::invalid(format!("invalid range {range:?}")))?;

    if count > len {
        return Err(Error::invalid(format!(
            "cannot sample {count} distinct keys from a range of {len}"
        )));
    }

    let start = *range.start();
    Ok(rand::seq::index::sample(rng, len, count)
        .into_iter()
        .map(|index| start + index as u64)
        .collect())
}

/// A builder for creating a [`Sampler`].
#[derive(Debug)]
pub struct SamplerBuilder {
    isbns: RangeInclusive<u64>,
    p50_copies: u64,
    p99_copies: u64,
    max_price: f32,
    editor_pick_ratio: f64,
}

impl SamplerBuilder {
    /// The universe of ISBNs new books are drawn from.
    pub fn isbns(mut self, isbns: RangeInclusive<u64>) -> Self {
        self.isbns = isbns;
        self
    }

    /// Distribution of the number of copies of new books.
    pub fn copies_distribution(mut self, p50: u64, p99: u64) -> Self {
        self.p50_copies = p50;
        self.p99_copies = p99;
        self
    }

    /// Upper bound of the price of new books.
    pub fn max_price(mut self, max_price: f32) -> Self {
        self.max_price = max_price;
        self
    }

    /// Probability that a new book is flagged as an editor pick.
    pub fn editor_pick_ratio(mut self, ratio: f64) -> Self {
        self.editor_pick_ratio = ratio;
        self
    }

    /// Creates the sampler instance.
    pub fn build(self) -> Result<Sampler> {
        if self.isbns.is_empty() || *self.isbns.start() == 0 {
            return Err(Error::invalid(format!(
                "isbn universe {:?} must be a non-empty range of positive numbers",
                self.isbns
            )));
        }
        if self.p50_copies == 0 || self.p99_copies < self.p50_copies {
            return Err(Error::invalid(format!(
                "copies distribution needs 0 < p50 <= p99, got p50 {} and p99 {}",
                self.p50_copies, self.p99_copies
            )));
        }
        if !(self.max_price.is_finite() && self.max_price >= 1.0) {
            return Err(Error::invalid(format!(
                "max price must be at least 1, got {}",
                self.max_price
            )));
        }
        if !(0.0..=1.0).contains(&self.editor_pick_ratio) {
            return Err(Error::invalid(format!(
                "editor pick ratio must be within [0, 1], got {}",
                self.editor_pick_ratio
            )));
        }

        // Inspired by <https://stats.stackexchange.com/a/649432>
        let p50 = self.p50_copies as f64;
        let p99 = self.p99_copies as f64;
        let mu = p50.ln();
        let sigma = (p99.ln() - mu) / 2.3263;

        let copies_distribution = LogNormal::new(mu, sigma)
            .map_err(|err| Error::invalid(format!("invalid copies distribution: {err}")))?;

        Ok(Sampler {
            isbns: self.isbns,
            copies_distribution,
            max_price: self.max_price,
            editor_pick_ratio: self.editor_pick_ratio,
        })
    }
}

/// Generates random sets of new books.
///
/// The sampler itself is immutable and shared by all workers. Every call takes the caller's RNG.
#[derive(Debug, Clone)]
pub struct Sampler {
    /// The universe of ISBNs new books are drawn from.
    isbns: RangeInclusive<u64>,
    /// A distribution that generates copy counts for new books.
    copies_distribution: LogNormal<f64>,
    max_price: f32,
    editor_pick_ratio: f64,
}

impl Sampler {
    /// Constructs a new sampler builder with defaults.
    pub fn builder() -> SamplerBuilder {
        SamplerBuilder {
            isbns: 1..=1_000_000,
            p50_copies: 10,
            p99_copies: 100,
            max_price: 100.0,
            editor_pick_ratio: 0.5,
        }
    }

    /// Returns the universe of ISBNs new books are drawn from.
    pub fn isbns(&self) -> &RangeInclusive<u64> {
        &self.isbns
    }

    /// Number of distinct ISBNs in the universe, the most books a single call can generate.
    pub fn universe_size(&self) -> u64 {
        // `build` rejects empty ranges and ranges starting at 0, so this cannot overflow.
        self.isbns.end() - self.isbns.start() + 1
    }

    /// Generates `count` new books with distinct ISBNs.
    ///
    /// The books are not checked against any inventory, so some of them may already exist in the
    /// store.
    pub fn next_set_of_stock_books<R>(&self, rng: &mut R, count: usize) -> Result<Vec<StockBook>>
    where
        R: Rng + ?Sized,
    {
        let isbns = sample_range(rng, &self.isbns, count)?;

        isbns
            .into_iter()
            .map(|isbn| self.next_stock_book(rng, Isbn(isbn)))
            .collect()
    }

    fn next_stock_book<R>(&self, rng: &mut R, isbn: Isbn) -> Result<StockBook>
    where
        R: Rng + ?Sized,
    {
        let title = sample_with_replacement(rng, TITLE_WORDS, 3)?.join(" ");
        let author = sample_with_replacement(rng, AUTHOR_NAMES, 2)?.join(" ");
        let price = rng.random_range(1.0..=self.max_price);
        let num_copies = (self.copies_distribution.sample(rng) as u64).max(1);
        let editor_pick = rng.random_bool(self.editor_pick_ratio);

        Ok(StockBook::new(isbn, title, author, price, num_copies).editor_pick(editor_pick))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(7)
    }

    #[test]
    fn samples_distinct_subset() {
        let mut rng = rng();
        let candidates: BTreeSet<u64> = (1..=20).collect();

        for count in 0..=candidates.len() {
            let sample = sample_without_replacement(&mut rng, &candidates, count).unwrap();
            assert_eq!(sample.len(), count);
            assert!(sample.is_subset(&candidates));
        }
    }

    #[test]
    fn oversampling_fails() {
        let mut rng = rng();
        let candidates: BTreeSet<u64> = (1..=3).collect();

        for count in 4..10 {
            let result = sample_without_replacement(&mut rng, &candidates, count);
            assert!(matches!(result, Err(Error::InvalidArgument(_))));
        }

        let empty = BTreeSet::<u64>::new();
        assert!(sample_without_replacement(&mut rng, &empty, 0).unwrap().is_empty());
        assert!(sample_without_replacement(&mut rng, &empty, 1).is_err());
    }

    #[test]
    fn samples_uniformly() {
        let mut rng = rng();
        let candidates: BTreeSet<u64> = (0..10).collect();

        let mut hits: HashMap<u64, usize> = HashMap::new();
        for _ in 0..10_000 {
            for key in sample_without_replacement(&mut rng, &candidates, 3).unwrap() {
                *hits.entry(key).or_default() += 1;
            }
        }

        // every key is expected 3000 times
        for key in candidates {
            let count = hits[&key];
            assert!((2700..3300).contains(&count), "{key} hit {count} times");
        }
    }

    #[test]
    fn samples_with_replacement() {
        let mut rng = rng();

        let sample = sample_with_replacement(&mut rng, &[1, 2], 50).unwrap();
        assert_eq!(sample.len(), 50);
        assert!(sample.iter().all(|k| *k == 1 || *k == 2));

        assert!(sample_with_replacement::<u8, _>(&mut rng, &[], 0).unwrap().is_empty());
        assert!(sample_with_replacement::<u8, _>(&mut rng, &[], 1).is_err());
    }

    #[test]
    fn selects_k_smallest() {
        let items = [9, 3, 7, 1, 8, 3, 5, 2];

        for k in 0..=items.len() {
            let selected = select_k_smallest(&items, k, |item| *item).unwrap();
            assert_eq!(selected.len(), k);

            let mut rest = items.to_vec();
            for item in &selected {
                let pos = rest.iter().position(|r| r == item).unwrap();
                rest.swap_remove(pos);
            }

            let max_selected = selected.iter().max();
            let min_rest = rest.iter().min();
            if let (Some(max_selected), Some(min_rest)) = (max_selected, min_rest) {
                assert!(max_selected <= min_rest);
            }
        }

        assert_eq!(items, [9, 3, 7, 1, 8, 3, 5, 2]);
    }

    #[test]
    fn select_k_smallest_is_stable_in_values() {
        let books: Vec<StockBook> = [5, 1, 5, 5, 2, 1, 9]
            .into_iter()
            .enumerate()
            .map(|(i, copies)| StockBook::new(i as u64 + 1, "Title", "Author", 1.0, copies))
            .collect();

        let copies = |books: Vec<StockBook>| {
            let mut copies: Vec<_> = books.iter().map(|b| b.num_copies).collect();
            copies.sort_unstable();
            copies
        };

        let first = copies(select_k_smallest(&books, 4, |b| b.num_copies).unwrap());
        assert_eq!(first, [1, 1, 2, 5]);
        for _ in 0..10 {
            let again = copies(select_k_smallest(&books, 4, |b| b.num_copies).unwrap());
            assert_eq!(again, first);
        }
    }

    #[test]
    fn select_too_many_fails() {
        let result = select_k_smallest(&[1, 2, 3], 4, |i| *i);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn samples_ranges() {
        let mut rng = rng();

        let mut sample = sample_range(&mut rng, &(10..=14), 5).unwrap();
        sample.sort_unstable();
        assert_eq!(sample, [10, 11, 12, 13, 14]);

        assert!(sample_range(&mut rng, &(10..=14), 6).is_err());
    }

    #[test]
    fn generates_new_books() {
        let sampler = Sampler::builder()
            .isbns(100..=199)
            .copies_distribution(5, 50)
            .build()
            .unwrap();

        let books = sampler.next_set_of_stock_books(&mut rng(), 20).unwrap();
        assert_eq!(books.len(), 20);

        let isbns: BTreeSet<_> = books.iter().map(|b| b.isbn.0).collect();
        assert_eq!(isbns.len(), 20);
        assert!(isbns.iter().all(|isbn| (100..=199).contains(isbn)));

        for book in &books {
            assert!(book.num_copies >= 1);
            assert!(!book.title.is_empty());
            assert!(!book.author.is_empty());
            assert!((1.0..=100.0).contains(&book.price));
        }
    }

    #[test]
    fn generator_respects_universe_size() {
        let sampler = Sampler::builder().isbns(1..=3).build().unwrap();
        let result = sampler.next_set_of_stock_books(&mut rng(), 4);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn rejects_invalid_builders() {
        assert!(Sampler::builder().isbns(0..=10).build().is_err());
        assert!(Sampler::builder().copies_distribution(10, 5).build().is_err());
        assert!(Sampler::builder().copies_distribution(0, 5).build().is_err());
        assert!(Sampler::builder().editor_pick_ratio(1.5).build().is_err());
        assert!(Sampler::builder().max_price(0.5).build().is_err());
    }

    #[test]
    fn copies_percentiles_work() {
        let sampler = Sampler::builder()
            .copies_distribution(10, 1000)
            .build()
            .unwrap();

        let mut rng = rng();
        let mut copies: Vec<_> = (0..1000)
            .map(|_| sampler.next_stock_book(&mut rng, Isbn(1)).unwrap().num_copies)
            .collect();
        copies.sort_unstable();

        let p50 = copies[500];
        assert!((5..20).contains(&p50), "p50 was {p50}");
    }
}
