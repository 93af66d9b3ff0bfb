/// Picks `count` indices spread evenly over `0..len` by linear interpolation.
///
/// Keeps both ends when `count >= 2`; a single pick takes the newest index.
/// Never repeats an index, so `count >= len` returns every index once.
pub fn linspace_indices(len: usize, count: usize) -> Vec<usize> {
    if len == 0 || count == 0 {
        return Vec::new();
    }
    if count >= len {
        return (0..len).collect();
    }
    if count == 1 {
        return vec![len - 1];
    }
    let step = (len - 1) as f64 / (count - 1) as f64;
    (0..count)
        .map(|k| ((k as f64 * step).round() as usize).min(len - 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downsamples_keeping_both_ends() {
        assert_eq!(linspace_indices(10, 4), vec![0, 3, 6, 9]);
    }

    #[test]
    fn never_pads_short_inputs() {
        assert_eq!(linspace_indices(3, 8), vec![0, 1, 2]);
    }

    #[test]
    fn single_pick_is_newest() {
        assert_eq!(linspace_indices(5, 1), vec![4]);
    }

    #[test]
    fn indices_are_strictly_increasing() {
        let picks = linspace_indices(100, 59);
        assert_eq!(picks.len(), 59);
        assert!(picks.windows(2).all(|w| w[0] < w[1]));
    }
}
