//! Shuffle service
//!
//! Picks the random source (seeded or thread-local) and enforces the
//! configured input bound.

use std::io::BufRead;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::application::{ApplicationError, ApplicationResult};
use crate::config::ShuffleSettings;
use crate::domain::{random_in_range, shuffled_from_iter};

pub struct ShuffleService {
    settings: ShuffleSettings,
}

impl ShuffleService {
    pub fn new(settings: ShuffleSettings) -> Self {
        Self { settings }
    }

    /// Shuffle `items` into a new vector. `seed` overrides the configured seed.
    pub fn shuffle_items<I>(&self, items: I, seed: Option<u64>) -> ApplicationResult<Vec<I::Item>>
    where
        I: IntoIterator,
    {
        let max_items = self.settings.max_items;
        let out = match seed.or(self.settings.seed) {
            Some(seed) => {
                debug!("seeded shuffle: {}", seed);
                shuffled_from_iter(items, max_items, &mut StdRng::seed_from_u64(seed))?
            }
            None => shuffled_from_iter(items, max_items, &mut rand::thread_rng())?,
        };
        Ok(out)
    }

    /// Shuffle the non-blank lines of `reader`. Blank lines do not count
    /// towards `max_items`; reading stops one line past the bound.
    pub fn shuffle_lines<B: BufRead>(
        &self,
        reader: B,
        seed: Option<u64>,
    ) -> ApplicationResult<Vec<String>> {
        itertools::process_results(reader.lines(), |lines| {
            self.shuffle_items(lines.filter(|line| !line.trim().is_empty()), seed)
        })
        .map_err(|e| ApplicationError::OperationFailed {
            context: "read input lines".to_string(),
            source: Box::new(e),
        })?
    }

    /// Uniform integer in `[min, max]`.
    pub fn random(&self, min: i64, max: i64, seed: Option<u64>) -> ApplicationResult<i64> {
        let value = match seed.or(self.settings.seed) {
            Some(seed) => random_in_range(min, max, &mut StdRng::seed_from_u64(seed))?,
            None => random_in_range(min, max, &mut rand::thread_rng())?,
        };
        Ok(value)
    }
}
