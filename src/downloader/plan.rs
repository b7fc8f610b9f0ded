//! Range planning: split `[0, total_size)` into contiguous inclusive byte ranges.

use crate::error::{Error, Result};
use crate::types::ByteRange;

/// Partition a resource of `total_size` bytes into `chunk_count` ranges.
///
/// Every range but the last covers `total_size / chunk_count` bytes; the last one ends
/// at `total_size - 1` and so absorbs the remainder of the integer division (up to
/// `chunk_count - 1` extra bytes).
///
/// `chunk_count` is clamped to `total_size` so no range is empty. A zero-byte resource
/// yields no ranges at all.
///
/// # Errors
///
/// Returns [`Error::InvalidPlan`] if `chunk_count` is 0.
///
/// # Examples
///
/// ```
/// use range_dl::plan_ranges;
///
/// let ranges = plan_ranges(105, 10).unwrap();
/// assert_eq!(ranges.len(), 10);
/// assert_eq!((ranges[0].start, ranges[0].end), (0, 9));
/// assert_eq!((ranges[9].start, ranges[9].end), (90, 104));
/// ```
pub fn plan_ranges(total_size: u64, chunk_count: usize) -> Result<Vec<ByteRange>> {
    if chunk_count == 0 {
        return Err(Error::InvalidPlan(
            "chunk count must be at least 1".to_string(),
        ));
    }
    if total_size == 0 {
        return Ok(Vec::new());
    }

    let count = (chunk_count as u64).min(total_size);
    let size = total_size / count;

    let ranges = (0..count)
        .map(|i| {
            let start = i * size;
            let end = if i == count - 1 {
                total_size - 1
            } else {
                (i + 1) * size - 1
            };
            ByteRange::new(i as usize, start, end)
        })
        .collect();

    Ok(ranges)
}
