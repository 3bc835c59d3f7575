//! Edit distance and the similarity ratio derived from it

use crate::base::Score;

/// Levenshtein distance (unit-cost insertions, deletions, substitutions).
///
/// Uses two rolling rows, so memory is O(min(|a|, |b|)).
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    // Keep the shorter string as the row
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return long.len();
    }

    let mut previous: Vec<usize> = (0..=short.len()).collect();
    let mut current: Vec<usize> = vec![0; short.len() + 1];

    for (i, cl) in long.iter().enumerate() {
        current[0] = i + 1;
        for (j, cs) in short.iter().enumerate() {
            let insertion = previous[j + 1] + 1;
            let deletion = current[j] + 1;
            let substitution = previous[j] + usize::from(cl != cs);
            current[j + 1] = insertion.min(deletion).min(substitution);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[short.len()]
}

/// Length-normalized similarity in `[0, 100]`:
/// `100 * (1 - levenshtein(a, b) / max(|a|, |b|))`.
///
/// Two empty strings are identical, hence 100.
pub fn similarity(a: &str, b: &str) -> Score {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 100.0;
    }
    100.0 * (1.0 - levenshtein(a, b) as Score / longest as Score)
}

#[cfg(test)]
mod tests {
    use ntest::assert_about_eq;
    use rstest::rstest;

    use super::{levenshtein, similarity};

    #[rstest]
    #[case("", "", 0)]
    #[case("", "E14", 3)]
    #[case("E149WB", "", 6)]
    #[case("E149WB", "E149WB", 0)]
    #[case("E149WB", "E149WA", 1)]
    #[case("E149WB", "E14WB", 1)]
    #[case("E149WB", "E149XWB", 1)]
    #[case("KITTEN", "SITTING", 3)]
    fn test_levenshtein(#[case] a: &str, #[case] b: &str, #[case] expected: usize) {
        assert_eq!(levenshtein(a, b), expected);
        // Distance is symmetric
        assert_eq!(levenshtein(b, a), expected);
    }

    #[test]
    fn test_similarity_bounds() {
        assert_about_eq!(similarity("", ""), 100.0, 1e-9);
        assert_about_eq!(similarity("E149WB", "E149WB"), 100.0, 1e-9);
        assert_about_eq!(similarity("ABC", "XYZ"), 0.0, 1e-9);

        let s = similarity("E149WB", "E149WA");
        assert!(s > 80.0 && s < 100.0, "Unexpected similarity {}", s);
    }
}
