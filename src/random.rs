use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Every random choice the generators make goes through this trait, so a
/// test can replace the entropy with a scripted sequence.
pub trait RandomSource {
    /// Uniform index in `0..len`. `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize;

    /// Uniform integer in `low..=high`.
    fn int_in(&mut self, low: i64, high: i64) -> i64;

    /// True with probability `p`.
    fn chance(&mut self, p: f64) -> bool;

    fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            Some(&items[self.index(items.len())])
        }
    }

    /// Fisher-Yates shuffle in place.
    fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.index(i + 1);
            items.swap(i, j);
        }
    }
}

/// Adapter over any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngSource<R> {
    rng: R,
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngSource<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    fn int_in(&mut self, low: i64, high: i64) -> i64 {
        if low >= high {
            return low;
        }
        self.rng.gen_range(low..=high)
    }

    fn chance(&mut self, p: f64) -> bool {
        self.rng.gen_bool(p.clamp(0.0, 1.0))
    }
}

/// Replays a fixed list of values, cycling when it runs out.
///
/// `index(len)` yields `value % len`, `int_in(low, high)` yields
/// `low + value % (high - low + 1)`, and `chance(p)` is true when
/// `value % 100 < p * 100`. So `0` means "first option / lowest value / yes"
/// and `99` means "no" for any probability below one.
#[derive(Debug, Clone)]
pub struct SequenceSource {
    values: Vec<u64>,
    position: usize,
}

impl SequenceSource {
    pub fn new(values: Vec<u64>) -> Self {
        assert!(!values.is_empty(), "SequenceSource needs at least one value");
        Self { values, position: 0 }
    }

    fn next_value(&mut self) -> u64 {
        let value = self.values[self.position % self.values.len()];
        self.position += 1;
        value
    }

    /// Number of values consumed so far.
    pub fn consumed(&self) -> usize {
        self.position
    }
}

impl RandomSource for SequenceSource {
    fn index(&mut self, len: usize) -> usize {
        (self.next_value() % len as u64) as usize
    }

    fn int_in(&mut self, low: i64, high: i64) -> i64 {
        if low >= high {
            self.next_value();
            return low;
        }
        let span = (high - low + 1) as u64;
        low + (self.next_value() % span) as i64
    }

    fn chance(&mut self, p: f64) -> bool {
        let threshold = (p.clamp(0.0, 1.0) * 100.0).round() as u64;
        self.next_value() % 100 < threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_source_replays_and_cycles() {
        let mut source = SequenceSource::new(vec![0, 7, 99]);
        assert_eq!(source.index(4), 0);
        assert_eq!(source.int_in(1, 5), 3);
        assert!(!source.chance(0.5));
        // cycles back to the first value
        assert!(source.chance(0.3));
        assert_eq!(source.consumed(), 4);
    }

    #[test]
    fn test_rng_source_stays_in_bounds() {
        let mut source = RngSource::seeded(7);
        for _ in 0..500 {
            let value = source.int_in(-3, 3);
            assert!((-3..=3).contains(&value));
            assert!(source.index(5) < 5);
        }
        assert_eq!(source.int_in(4, 4), 4);
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let mut source = RngSource::seeded(42);
        let mut items = vec!["a", "b", "c", "d", "e"];
        source.shuffle(&mut items);
        let mut sorted = items.clone();
        sorted.sort();
        assert_eq!(sorted, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_choose_empty_slice() {
        let mut source = SequenceSource::new(vec![1]);
        let empty: [u8; 0] = [];
        assert!(source.choose(&empty).is_none());
        assert_eq!(source.choose(&[10, 20, 30]), Some(&20));
    }
}
