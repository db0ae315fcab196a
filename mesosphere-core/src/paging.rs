//! Offset/limit windows over ordered results.

/// Returns the window of `items` starting at `offset` holding at most `limit` elements.
///
/// A negative offset counts as zero and a negative limit as zero. Without a
/// limit the window runs to the end. Order is preserved and the input is not
/// touched.
///
/// # Example
///
/// ```
/// use mesosphere_core::paging::page;
///
/// let items = ["a", "b", "c", "d"];
/// assert_eq!(page(&items, Some(2), Some(1)), vec!["b", "c"]);
/// assert_eq!(page(&items, None, Some(-5)), items.to_vec());
/// assert!(page(&items, Some(-1), None).is_empty());
/// ```
pub fn page<T: Clone>(items: &[T], limit: Option<i64>, offset: Option<i64>) -> Vec<T> {
    let (start, end) = window(items.len(), limit, offset);
    items[start..end].to_vec()
}

/// Resolves `limit`/`offset` to a `start..end` range within `len` elements.
pub fn window(len: usize, limit: Option<i64>, offset: Option<i64>) -> (usize, usize) {
    let start = clamp_to_len(offset.unwrap_or(0), len);
    let end = match limit {
        None => len,
        Some(limit) => start.saturating_add(clamp_to_len(limit, len)).min(len),
    };
    (start, end)
}

fn clamp_to_len(value: i64, len: usize) -> usize {
    usize::try_from(value.max(0)).map_or(len, |v| v.min(len))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITEMS: [&str; 4] = ["a", "b", "c", "d"];

    #[test]
    fn test_limit_and_offset() {
        assert_eq!(page(&ITEMS, Some(2), Some(1)), vec!["b", "c"]);
    }

    #[test]
    fn test_no_limit_runs_to_end() {
        assert_eq!(page(&ITEMS, None, Some(2)), vec!["c", "d"]);
        assert_eq!(page(&ITEMS, None, None), ITEMS.to_vec());
    }

    #[test]
    fn test_negative_offset_is_zero() {
        assert_eq!(page(&ITEMS, None, Some(-5)), page(&ITEMS, None, Some(0)));
    }

    #[test]
    fn test_negative_limit_is_empty() {
        assert!(page(&ITEMS, Some(-1), None).is_empty());
    }

    #[test]
    fn test_offset_past_end_is_empty() {
        assert!(page(&ITEMS, Some(3), Some(10)).is_empty());
        assert!(page(&ITEMS, None, Some(i64::MAX)).is_empty());
    }

    #[test]
    fn test_limit_past_end_is_truncated() {
        assert_eq!(page(&ITEMS, Some(i64::MAX), Some(3)), vec!["d"]);
    }

    #[test]
    fn test_window_on_empty_input() {
        assert_eq!(window(0, Some(5), Some(5)), (0, 0));
    }
}
