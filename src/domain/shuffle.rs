//! Uniform random permutations (Fisher-Yates).
//!
//! `shuffle` mutates the caller's slice and returns nothing; `shuffled` and
//! `shuffled_from_iter` hand back a fresh `Vec` and leave the input alone.
//! Uniformity holds as long as the supplied `Rng` is uniform.

use rand::Rng;
use tracing::{instrument, trace};

use crate::domain::error::{DomainError, DomainResult};

/// Shuffle `data` in place: exactly `len - 1` swaps, each draw from `[0, i]`.
pub fn shuffle<T, G: Rng + ?Sized>(data: &mut [T], rng: &mut G) {
    for i in (1..data.len()).rev() {
        let j = rng.gen_range(0..=i);
        data.swap(i, j);
    }
}

/// Copy `data`, then shuffle the copy.
pub fn shuffled<T: Clone, G: Rng + ?Sized>(data: &[T], rng: &mut G) -> Vec<T> {
    let mut out = data.to_vec();
    shuffle(&mut out, rng);
    out
}

/// Drain an external iterator and shuffle the result.
///
/// An iterator yielding more than `max_items` is rejected with
/// `InvalidArgument` rather than consumed forever.
#[instrument(level = "debug", skip(items, rng))]
pub fn shuffled_from_iter<I, G>(items: I, max_items: usize, rng: &mut G) -> DomainResult<Vec<I::Item>>
where
    I: IntoIterator,
    G: Rng + ?Sized,
{
    let mut out: Vec<I::Item> = items.into_iter().take(max_items.saturating_add(1)).collect();
    if out.len() > max_items {
        return Err(DomainError::InvalidArgument(format!(
            "input exceeds {} items",
            max_items
        )));
    }
    trace!("shuffling {} items", out.len());
    shuffle(&mut out, rng);
    Ok(out)
}

/// Uniform integer in `[min, max]`, both ends inclusive.
pub fn random_in_range<G: Rng + ?Sized>(min: i64, max: i64, rng: &mut G) -> DomainResult<i64> {
    if min > max {
        return Err(DomainError::InvalidArgument(format!(
            "empty range: {} > {}",
            min, max
        )));
    }
    Ok(rng.gen_range(min..=max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_shuffle_empty_vector() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut v: Vec<usize> = vec![];
        shuffle(&mut v, &mut rng);
        assert!(v.is_empty(), "Empty vector should remain empty after shuffle");
    }

    #[test]
    fn test_shuffle_single_element_vector() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut v = vec![42];
        shuffle(&mut v, &mut rng);
        assert_eq!(v, vec![42]);
    }

    #[test]
    fn test_shuffle_same_seed_same_order() {
        let data: Vec<u32> = (0..32).collect();
        let a = shuffled(&data, &mut StdRng::seed_from_u64(7));
        let b = shuffled(&data, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
        assert_eq!(data, (0..32).collect::<Vec<_>>(), "input must be untouched");
    }

    #[test]
    fn test_shuffled_from_iter_rejects_oversized_input() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = shuffled_from_iter(0.., 10, &mut rng).unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
    }

    #[test]
    fn test_shuffled_from_iter_accepts_exact_bound() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut out = shuffled_from_iter(0..10, 10, &mut rng).unwrap();
        out.sort();
        assert_eq!(out, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_random_in_range_is_inclusive() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = [false; 3];
        for _ in 0..200 {
            let v = random_in_range(1, 3, &mut rng).unwrap();
            assert!((1..=3).contains(&v));
            seen[(v - 1) as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
        assert_eq!(random_in_range(5, 5, &mut rng).unwrap(), 5);
        assert!(random_in_range(2, 1, &mut rng).is_err());
    }
}
