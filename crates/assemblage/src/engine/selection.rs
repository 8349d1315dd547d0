//! Index selection over per-item values.
//!
//! Receivers and senders are both chosen by computing one value per item and handing the
//! values to one of these helpers, dispatched by [`SelectionRule`] in [`select_index`].
//! Ties resolve to the lowest index. When randomness is required, pass an RNG that
//! implements [rand::RngCore].
use rand::RngCore;

use crate::settings::SelectionRule;

/// Generate a random float in the range [0, 1].
///
/// `u32::MAX` rounds up to 1.0 in f32, so callers indexing with the result must clamp.
#[inline]
pub(crate) fn rand01(rng: &mut dyn RngCore) -> f32 {
    (rng.next_u32() as f32) / ((u32::MAX as f32) + 1.0)
}

pub fn select_index(rule: SelectionRule, values: &[f32], rng: &mut dyn RngCore) -> Option<usize> {
    match rule {
        SelectionRule::Random => select_random(values.len(), rng),
        SelectionRule::Min => select_min(values),
        SelectionRule::Max => select_max(values),
        SelectionRule::Last => select_last(values.len()),
        SelectionRule::WeightedRandom => select_wrc_index(values, rng),
    }
}

/// Uniform index in `0..len`.
pub fn select_random(len: usize, rng: &mut dyn RngCore) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let i = (rand01(rng) * len as f32) as usize;
    Some(i.min(len - 1))
}

pub fn select_min(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, b)) if v.total_cmp(&b).is_ge() => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

pub fn select_max(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, b)) if v.total_cmp(&b).is_le() => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

pub fn select_last(len: usize) -> Option<usize> {
    len.checked_sub(1)
}

/// Weighted random choice: draws an index with probability proportional to its weight.
///
/// Builds the cumulative sum of the non-negative weights and returns the first index whose
/// running total exceeds a uniform draw in `[0, total)`. Falls back to a uniform draw when
/// every weight is zero.
pub fn select_wrc_index(weights: &[f32], rng: &mut dyn RngCore) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }
    let mut cumulative = Vec::with_capacity(weights.len());
    let mut total = 0.0f32;
    for &w in weights {
        if w.is_finite() && w > 0.0 {
            total += w;
        }
        cumulative.push(total);
    }
    if total <= 0.0 {
        return select_random(weights.len(), rng);
    }

    let roll = rand01(rng) * total;
    let index = cumulative
        .iter()
        .position(|&c| c > roll)
        .unwrap_or(weights.len() - 1);
    // a roll rounding up to `total` lands on trailing zero weights; step back to a real one
    let index = (0..=index)
        .rev()
        .find(|&i| weights[i].is_finite() && weights[i] > 0.0)
        .unwrap_or(index);
    Some(index)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    struct FixedRng {
        value: u32,
    }

    impl RngCore for FixedRng {
        fn next_u32(&mut self) -> u32 {
            self.value
        }

        fn next_u64(&mut self) -> u64 {
            self.value as u64
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            let bytes = self.value.to_le_bytes();
            for (i, b) in dest.iter_mut().enumerate() {
                *b = bytes[i % 4];
            }
        }
    }

    #[test]
    fn rand01_reaches_one_at_the_top() {
        assert_eq!(rand01(&mut FixedRng { value: 0 }), 0.0);
        // u32::MAX rounds to 2^32 in f32
        assert_eq!(rand01(&mut FixedRng { value: u32::MAX }), 1.0);
        let mid = rand01(&mut FixedRng { value: u32::MAX / 2 });
        assert!(mid > 0.0 && mid < 1.0);
    }

    #[test]
    fn min_and_max_prefer_first_tie() {
        let values = [3.0, 1.0, 5.0, 1.0, 5.0];
        assert_eq!(select_min(&values), Some(1));
        assert_eq!(select_max(&values), Some(2));
        assert_eq!(select_min(&[]), None);
        assert_eq!(select_last(values.len()), Some(4));
        assert_eq!(select_last(0), None);
    }

    #[test]
    fn random_stays_in_range() {
        let mut rng = FixedRng { value: u32::MAX };
        assert_eq!(select_random(3, &mut rng), Some(2));
        let mut rng = FixedRng { value: 0 };
        assert_eq!(select_random(3, &mut rng), Some(0));
        assert_eq!(select_random(0, &mut rng), None);
    }

    #[test]
    fn wrc_follows_cumulative_weights() {
        let weights = [1.0, 3.0];
        let mut low = FixedRng { value: 0 };
        assert_eq!(select_wrc_index(&weights, &mut low), Some(0));
        let mut high = FixedRng {
            value: (0.5 * u32::MAX as f32) as u32,
        };
        assert_eq!(select_wrc_index(&weights, &mut high), Some(1));
        let mut top = FixedRng { value: u32::MAX };
        assert_eq!(select_wrc_index(&[2.0, 0.0], &mut top), Some(0));
    }

    #[test]
    fn wrc_with_zero_weights_is_uniform() {
        let mut rng = FixedRng { value: u32::MAX };
        assert_eq!(select_wrc_index(&[0.0, 0.0, 0.0], &mut rng), Some(2));
        assert_eq!(select_wrc_index(&[], &mut rng), None);
    }

    #[test]
    fn wrc_distribution_matches_weights() {
        let mut rng = StdRng::seed_from_u64(0xC0FFEE);
        let n = 40_000;
        let hits = (0..n)
            .filter(|_| select_wrc_index(&[1.0, 3.0], &mut rng) == Some(1))
            .count();
        let ratio = hits as f32 / n as f32;
        assert!((ratio - 0.75).abs() < 0.015, "ratio {ratio}");
    }

    #[test]
    fn dispatch_by_rule() {
        let mut rng = FixedRng { value: 0 };
        let values = [2.0, 9.0, 4.0];
        assert_eq!(select_index(SelectionRule::Min, &values, &mut rng), Some(0));
        assert_eq!(select_index(SelectionRule::Max, &values, &mut rng), Some(1));
        assert_eq!(select_index(SelectionRule::Last, &values, &mut rng), Some(2));
    }
}
