use serde::Serialize;

/// Output of a constrained design generator.
///
/// `satisfied` is false when the bounded search gave up on the soft order
/// constraints; the balance counts hold either way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan<T> {
    pub trials: Vec<T>,
    pub satisfied: bool,
    pub attempts: usize,
}

impl<T> Plan<T> {
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }
}

/// Swap-repair of local order constraints.
///
/// `violates(seq, k)` must only look at positions up to `k` and no further
/// back than `reach`. Each violation is resolved by swapping its element with
/// the nearest later element (earlier ones as a fallback) whose swap leaves
/// both neighbourhoods clean. Returns whether the sequence ends clean.
pub(crate) fn repair<T, F>(seq: &mut [T], violates: F, reach: usize, max_passes: usize) -> bool
where
    F: Fn(&[T], usize) -> bool,
{
    let n = seq.len();
    let clean_from = |seq: &[T], p: usize| (p..=(p + reach).min(n - 1)).all(|k| !violates(seq, k));

    for _ in 0..max_passes {
        let mut clean = true;
        for i in 0..n {
            if !violates(seq, i) {
                continue;
            }
            clean = false;
            for j in (i + 1..n).chain((0..i).rev()) {
                seq.swap(i, j);
                if clean_from(seq, i) && clean_from(seq, j) {
                    break;
                }
                seq.swap(i, j);
            }
        }
        if clean {
            return true;
        }
    }
    (0..n).all(|k| !violates(seq, k))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adjacent_repeat(seq: &[u8], k: usize) -> bool {
        k > 0 && seq[k] == seq[k - 1]
    }

    #[test]
    fn repair_breaks_adjacent_repeats() {
        let mut seq = vec![1, 1, 1, 2, 2, 2, 3, 3, 3];
        assert!(repair(&mut seq, adjacent_repeat, 1, 10));
        assert!((1..seq.len()).all(|k| seq[k] != seq[k - 1]));
        let mut sorted = seq.clone();
        sorted.sort();
        assert_eq!(sorted, vec![1, 1, 1, 2, 2, 2, 3, 3, 3]);
    }

    #[test]
    fn impossible_repair_reports_failure() {
        let mut seq = vec![7, 7, 7, 1];
        assert!(!repair(&mut seq, adjacent_repeat, 1, 5));
    }

    #[test]
    fn empty_sequence_is_clean() {
        let mut seq: Vec<u8> = Vec::new();
        assert!(repair(&mut seq, adjacent_repeat, 1, 5));
    }
}
