//! Cursor filter.
//!
//! Pollers keep no server-side state. Instead each request carries the
//! serials it has already processed, compressed into half-open intervals:
//!
//! ```text
//! {offset: 5, length: 3}  =>  serials 5, 6, 7
//! {offset: 9, length: 0}  =>  nothing
//! ```
//!
//! The scheme is advisory. A serial outside every range is simply resent.

use serde::{Deserialize, Serialize};

/// One half-open interval `[offset, offset + length)` of seen serials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenRange {
    /// First serial in the interval.
    pub offset: i64,
    /// Number of consecutive serials. Zero or negative means empty.
    pub length: i64,
}

impl SeenRange {
    /// Build a range covering `length` serials starting at `offset`.
    pub fn new(offset: i64, length: i64) -> Self {
        Self { offset, length }
    }

    /// Exclusive upper bound, saturating instead of wrapping.
    fn end(&self) -> i64 {
        self.offset.saturating_add(self.length)
    }

    /// True if `serial` lies inside this interval.
    pub fn contains(&self, serial: i64) -> bool {
        serial >= self.offset && serial < self.end()
    }
}

/// True iff `serial` lies in any interval of `ranges`.
///
/// Empty `ranges` means nothing has been seen.
pub fn is_seen(serial: i64, ranges: &[SeenRange]) -> bool {
    ranges.iter().any(|r| r.contains(serial))
}

/// Compress a set of serials into the fewest covering ranges.
///
/// Input order and duplicates do not matter. Output is ascending.
pub fn compress<I>(serials: I) -> Vec<SeenRange>
where
    I: IntoIterator<Item = i64>,
{
    let mut sorted: Vec<i64> = serials.into_iter().collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut ranges: Vec<SeenRange> = Vec::new();
    for serial in sorted {
        match ranges.last_mut() {
            Some(last) if last.end() == serial => last.length += 1,
            _ => ranges.push(SeenRange::new(serial, 1)),
        }
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Per-integer membership, the reference semantics.
    fn naive(serial: i64, ranges: &[SeenRange]) -> bool {
        ranges.iter().any(|r| {
            let mut n = r.offset;
            while n < r.offset + r.length {
                if n == serial {
                    return true;
                }
                n += 1;
            }
            false
        })
    }

    #[test]
    fn test_empty_ranges_see_nothing() {
        assert!(!is_seen(0, &[]));
        assert!(!is_seen(42, &[]));
    }

    #[test]
    fn test_half_open_bounds() {
        let ranges = [SeenRange::new(5, 3)];
        assert!(!is_seen(4, &ranges));
        assert!(is_seen(5, &ranges));
        assert!(is_seen(7, &ranges));
        assert!(!is_seen(8, &ranges));
    }

    #[test]
    fn test_non_positive_length_is_empty() {
        assert!(!is_seen(5, &[SeenRange::new(5, 0)]));
        assert!(!is_seen(5, &[SeenRange::new(5, -3)]));
        assert!(!is_seen(3, &[SeenRange::new(5, -3)]));
    }

    #[test]
    fn test_matches_naive_membership() {
        let ranges = [
            SeenRange::new(-4, 2),
            SeenRange::new(1, 1),
            SeenRange::new(3, 5),
            SeenRange::new(6, 4),
            SeenRange::new(20, 0),
            SeenRange::new(30, -2),
        ];
        for serial in -10..40 {
            assert_eq!(is_seen(serial, &ranges), naive(serial, &ranges), "serial {serial}");
        }
    }

    #[test]
    fn test_overflowing_range_does_not_wrap() {
        let ranges = [SeenRange::new(i64::MAX - 1, 10)];
        assert!(is_seen(i64::MAX - 1, &ranges));
        assert!(!is_seen(0, &ranges));
    }

    #[test]
    fn test_compress_collapses_runs() {
        let ranges = compress([7, 1, 2, 3, 3, 9, 8, 12]);
        assert_eq!(
            ranges,
            vec![SeenRange::new(1, 3), SeenRange::new(7, 3), SeenRange::new(12, 1)]
        );
        for serial in 0..15 {
            let expected = [1, 2, 3, 7, 8, 9, 12].contains(&serial);
            assert_eq!(is_seen(serial, &ranges), expected);
        }
    }

    #[test]
    fn test_compress_empty() {
        assert!(compress(Vec::new()).is_empty());
    }
}
