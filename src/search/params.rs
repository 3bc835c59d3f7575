//! Query-dependent tuning derived from input length
//!
//! The breakpoints are a contract: radius 1 touches roughly 5-8% of the
//! BK-tree, radius 2 touches 17-25%, radius 3 is too broad for a dataset
//! in the millions, so the radius must shrink for short, already-ambiguous
//! inputs.

/// Radius used when the caller disables dynamic distance
pub const FIXED_MAX_DISTANCE: usize = 2;

/// Maximum edit distance for the BK-tree radius search
pub fn max_distance_for(len: usize) -> usize {
    if len <= 3 {
        1
    } else {
        2
    }
}

/// Prefix-filter length. UK postcodes open with a 1-2 letter area and a
/// 1-2 digit district, so 3-4 characters capture that structural segment.
pub fn prefix_length_for(len: usize) -> usize {
    if len <= 2 {
        len
    } else if len <= 4 {
        3
    } else {
        4
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{max_distance_for, prefix_length_for};

    #[rstest]
    #[case(0, 1)]
    #[case(1, 1)]
    #[case(3, 1)]
    #[case(4, 2)]
    #[case(6, 2)]
    #[case(8, 2)]
    fn test_max_distance_breakpoints(#[case] len: usize, #[case] expected: usize) {
        assert_eq!(max_distance_for(len), expected);
    }

    #[rstest]
    #[case(0, 0)]
    #[case(1, 1)]
    #[case(2, 2)]
    #[case(3, 3)]
    #[case(4, 3)]
    #[case(5, 4)]
    #[case(8, 4)]
    fn test_prefix_length_breakpoints(#[case] len: usize, #[case] expected: usize) {
        assert_eq!(prefix_length_for(len), expected);
    }
}
