use rand::seq::SliceRandom;
use rand::Rng;
use tracing::warn;

use crate::model::turn_pair::TurnPair;

/// Default number of few-shot examples per prompt.
pub const DEFAULT_EXAMPLES: usize = 8;

/// Draw up to `k` distinct pairs uniformly at random.
///
/// Returns fewer than `k` when the corpus is smaller, and an empty vector when
/// there is nothing to sample; callers then fall back to an example-free prompt.
pub fn select_examples<'a, R: Rng + ?Sized>(
    pairs: &'a [TurnPair],
    k: usize,
    rng: &mut R,
) -> Vec<&'a TurnPair> {
    if pairs.is_empty() {
        warn!("no example pairs available; prompt will carry no examples");
        return Vec::new();
    }
    pairs.choose_multiple(rng, k.min(pairs.len())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn corpus(n: usize) -> Vec<TurnPair> {
        (0..n)
            .map(|i| TurnPair {
                user: format!("q{i}"),
                speaker: format!("a{i}"),
            })
            .collect()
    }

    #[test]
    fn sample_is_bounded_by_k() {
        let pairs = corpus(20);
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(select_examples(&pairs, DEFAULT_EXAMPLES, &mut rng).len(), 8);
    }

    #[test]
    fn small_corpus_returns_everything_without_duplicates() {
        let pairs = corpus(3);
        let mut rng = StdRng::seed_from_u64(7);
        let picked = select_examples(&pairs, 8, &mut rng);
        assert_eq!(picked.len(), 3);
        let distinct: HashSet<&str> = picked.iter().map(|p| p.user.as_str()).collect();
        assert_eq!(distinct.len(), 3);
    }

    #[test]
    fn empty_corpus_yields_empty_sample() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(select_examples(&[], 8, &mut rng).is_empty());
    }
}
