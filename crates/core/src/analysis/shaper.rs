//! Named reshaping functions applied to a smoothed magnitude frame.
//!
//! Index 0 of a frame holds the lowest frequency. Most material carries the
//! bulk of its energy in the low/mid range, so an unshaped frame slopes down
//! from left to right; shapers reorder it for other visual emphases.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

/// Pure frame-to-frame transform.
pub type ShaperFn = fn(&[f32]) -> Vec<f32>;

/// Shaper used when none (or an unknown one) is requested.
pub const DEFAULT_SHAPER: &str = "Slope";

static SHAPERS: Lazy<BTreeMap<&'static str, ShaperFn>> = Lazy::new(|| {
    let mut shapers: BTreeMap<&'static str, ShaperFn> = BTreeMap::new();
    shapers.insert(DEFAULT_SHAPER, slope);
    shapers.insert("Peak", peak);
    shapers
});

/// Names of every registered shaper, in a stable order.
pub fn shaper_names() -> impl Iterator<Item = &'static str> {
    SHAPERS.keys().copied()
}

/// Looks a shaper up by name, ignoring ASCII case.
pub fn resolve_shaper(name: &str) -> Option<ShaperFn> {
    SHAPERS
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, shaper)| *shaper)
}

/// Applies the named shaper, falling back to [`DEFAULT_SHAPER`] for names
/// that are not registered.
pub fn apply_shaper(name: &str, frequency: &[f32]) -> Vec<f32> {
    match resolve_shaper(name) {
        Some(shaper) => shaper(frequency),
        None => {
            tracing::warn!(shaper = name, "shaper not found, applying default");
            slope(frequency)
        }
    }
}

/// Identity: low frequencies stay on the left.
pub fn slope(frequency: &[f32]) -> Vec<f32> {
    frequency.to_vec()
}

/// Folds the frame so the midpoint carries the lowest bin and both ends
/// taper off towards the high end.
pub fn peak(frequency: &[f32]) -> Vec<f32> {
    let len = frequency.len();
    let mid = len / 2;

    (0..len)
        .map(|i| {
            if i <= mid {
                frequency[mid - i]
            } else {
                frequency[i - mid - 1]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slope_is_identity() {
        let input = [5.0, 4.0, 3.0, 1.0];
        assert_eq!(apply_shaper("Slope", &input), input.to_vec());
    }

    #[test]
    fn peak_centres_the_lowest_bin() {
        for len in [1usize, 2, 5, 8, 33] {
            let input: Vec<f32> = (0..len).map(|i| 100.0 - i as f32).collect();
            let shaped = peak(&input);
            assert_eq!(shaped.len(), len);
            assert_eq!(shaped[len / 2], input[0]);
        }
    }

    #[test]
    fn peak_tapers_symmetrically() {
        let shaped = peak(&[9.0, 7.0, 5.0, 3.0, 1.0]);
        assert_eq!(shaped, vec![5.0, 7.0, 9.0, 9.0, 7.0]);
    }

    #[test]
    fn lookup_ignores_case() {
        assert!(resolve_shaper("peak").is_some());
        assert!(resolve_shaper("SLOPE").is_some());
        assert!(resolve_shaper("wobble").is_none());
    }

    #[test]
    fn unknown_shaper_falls_back_to_default() {
        let input = [1.0, 2.0, 3.0];
        assert_eq!(apply_shaper("wobble", &input), input.to_vec());
    }
}
