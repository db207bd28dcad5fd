//! Byte-range bookkeeping for the delta engine. Ranges are always in
//! output-file coordinates (already offset by the header length), stored as
//! half-open `[start, end)` intervals.

use itertools::Itertools;

/// A set of half-open byte ranges, kept sorted and merged by
/// [`coalesce_adjacent`].
pub type RangeSet = Vec<(u64, u64)>;

/// Sorts and merges adjacent or overlapping ranges into the fewest
/// intervals that cover the same bytes.
pub fn coalesce_adjacent(mut ranges: RangeSet) -> RangeSet {
    ranges.sort_by_key(|r| r.0);
    ranges
        .into_iter()
        .coalesce(|a, b| if b.0 <= a.1 { Ok((a.0, a.1.max(b.1))) } else { Err((a, b)) })
        .collect()
}

/// Splits a (already coalesced) range set into batches of at most
/// `max_ranges_per_request` entries, for servers that cap the number of
/// ranges honored per request.
pub fn batch(ranges: &RangeSet, max_ranges_per_request: usize) -> Vec<RangeSet> {
    if max_ranges_per_request == 0 {
        return vec![ranges.clone()];
    }
    ranges
        .iter()
        .copied()
        .chunks(max_ranges_per_request)
        .into_iter()
        .map(|chunk| chunk.collect())
        .collect()
}

/// Renders a range set as an HTTP `Range` header value, e.g.
/// `bytes=0-1023,2048-4095` (end-inclusive, per RFC 7233).
pub fn to_range_header(ranges: &RangeSet) -> String {
    let parts: Vec<String> = ranges.iter().map(|(start, end)| format!("{}-{}", start, end - 1)).collect();
    format!("bytes={}", parts.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coalesce_merges_overlapping_and_adjacent() {
        let ranges = vec![(10, 20), (0, 5), (5, 10), (25, 30)];
        let merged = coalesce_adjacent(ranges);
        assert_eq!(merged, vec![(0, 20), (25, 30)]);
    }

    #[test]
    fn coalesce_leaves_disjoint_ranges_separate() {
        let ranges = vec![(0, 5), (100, 105)];
        let merged = coalesce_adjacent(ranges);
        assert_eq!(merged, vec![(0, 5), (100, 105)]);
    }

    #[test]
    fn batch_splits_into_ceil_division_groups() {
        let ranges = vec![(0, 1), (1, 2), (2, 3), (3, 4), (4, 5)];
        let batches = batch(&ranges, 2);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0], vec![(0, 1), (1, 2)]);
        assert_eq!(batches[2], vec![(4, 5)]);
    }

    #[test]
    fn range_header_is_end_inclusive() {
        let ranges = vec![(0, 1024), (2048, 4096)];
        assert_eq!(to_range_header(&ranges), "bytes=0-1023,2048-4095");
    }
}
