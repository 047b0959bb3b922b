//! Sampling strategies.
//!
//! Each strategy fills `out` with positions of the resident table, never the
//! candidate's. When the table holds no more than `size` other entries, every
//! one of them is returned instead.
//!
//! | Strategy    | Draws                                        | Distinct |
//! |-------------|----------------------------------------------|----------|
//! | `Guess`     | uniform picks, retried on repeats            | yes      |
//! | `Reservoir` | one pass of reservoir sampling               | yes      |
//! | `Shuffle`   | prefix of a uniformly shuffled position list | yes      |

use rand::Rng;
use rand::seq::SliceRandom;

use crate::config::SampleStrategy;

/// Fills `out` with up to `size` table positions other than `candidate`.
pub(crate) fn draw<R: Rng>(
    strategy: SampleStrategy,
    len: usize,
    candidate: Option<usize>,
    size: usize,
    rng: &mut R,
    out: &mut Vec<usize>,
) {
    out.clear();
    let others = len - usize::from(candidate.is_some_and(|c| c < len));
    if others <= size {
        out.extend((0..len).filter(|&i| Some(i) != candidate));
        return;
    }
    match strategy {
        SampleStrategy::Guess => guess(len, candidate, size, rng, out),
        SampleStrategy::Reservoir => reservoir(len, candidate, size, rng, out),
        SampleStrategy::Shuffle => shuffle(len, candidate, size, rng, out),
    }
}

fn guess<R: Rng>(
    len: usize,
    candidate: Option<usize>,
    size: usize,
    rng: &mut R,
    out: &mut Vec<usize>,
) {
    while out.len() < size {
        let index = rng.random_range(0..len);
        if Some(index) != candidate && !out.contains(&index) {
            out.push(index);
        }
    }
}

fn reservoir<R: Rng>(
    len: usize,
    candidate: Option<usize>,
    size: usize,
    rng: &mut R,
    out: &mut Vec<usize>,
) {
    let mut seen = 0usize;
    for index in (0..len).filter(|&i| Some(i) != candidate) {
        seen += 1;
        if out.len() < size {
            out.push(index);
        } else {
            let slot = rng.random_range(0..seen);
            if slot < size {
                out[slot] = index;
            }
        }
    }
}

fn shuffle<R: Rng>(
    len: usize,
    candidate: Option<usize>,
    size: usize,
    rng: &mut R,
    out: &mut Vec<usize>,
) {
    out.extend((0..len).filter(|&i| Some(i) != candidate));
    out.shuffle(rng);
    out.truncate(size);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn sample(strategy: SampleStrategy, len: usize, candidate: Option<usize>, size: usize) -> Vec<usize> {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut out = Vec::new();
        draw(strategy, len, candidate, size, &mut rng, &mut out);
        out
    }

    #[test]
    fn underflow_returns_every_other_entry() {
        for &strategy in SampleStrategy::ALL {
            let mut out = sample(strategy, 4, Some(2), 8);
            out.sort_unstable();
            assert_eq!(out, vec![0, 1, 3], "{strategy}");
        }
    }

    #[test]
    fn exact_fit_returns_every_other_entry() {
        for &strategy in SampleStrategy::ALL {
            let mut out = sample(strategy, 3, Some(0), 2);
            out.sort_unstable();
            assert_eq!(out, vec![1, 2], "{strategy}");
        }
    }

    #[test]
    fn empty_table_yields_nothing() {
        for &strategy in SampleStrategy::ALL {
            assert!(sample(strategy, 0, None, 4).is_empty());
            assert!(sample(strategy, 1, Some(0), 4).is_empty());
        }
    }

    #[test]
    fn guess_draws_exactly_size_picks() {
        let out = sample(SampleStrategy::Guess, 100, Some(5), 10);
        assert_eq!(out.len(), 10);
        assert!(out.iter().all(|&i| i < 100 && i != 5));
    }

    #[test]
    fn guess_never_repeats_a_position() {
        for seed in 0..200 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut out = Vec::new();
            draw(SampleStrategy::Guess, 3, Some(2), 2, &mut rng, &mut out);
            out.sort_unstable();
            assert_eq!(out, vec![0, 1], "seed {seed}");
        }
    }

    #[test]
    fn every_strategy_draws_distinct_positions() {
        for &strategy in SampleStrategy::ALL {
            let mut out = sample(strategy, 100, Some(42), 10);
            assert_eq!(out.len(), 10);
            assert!(!out.contains(&42));
            out.sort_unstable();
            out.dedup();
            assert_eq!(out.len(), 10, "{strategy}");
        }
    }
}
