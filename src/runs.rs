//! Splitting the input into sorted runs.

use std::cmp;

use crate::smallsort::insertion_sort_shift_left;

/// Half-open span `[start, start + len)` of a slice that is known to be sorted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Run {
    pub start: usize,
    pub len: usize,
}

impl Run {
    pub const fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    pub const fn end(&self) -> usize {
        self.start + self.len
    }

    /// `self` immediately followed by `next`, as one run.
    pub fn join(self, next: Run) -> Run {
        debug_assert_eq!(self.end(), next.start);

        Run::new(self.start, self.len + next.len)
    }
}

/// Finds a streak of presorted elements starting at the beginning of the slice. Returns the first
/// value that is not part of said streak, and a bool denoting whether the streak was reversed.
/// Streaks can be non-decreasing or strictly decreasing, only the latter may be reversed without
/// reordering equal elements.
pub fn find_streak<T, F>(v: &[T], is_less: &mut F) -> (usize, bool)
where
    F: FnMut(&T, &T) -> bool,
{
    let len = v.len();

    if len < 2 {
        return (len, false);
    }

    let mut end = 2;

    if is_less(&v[1], &v[0]) {
        while end < len && is_less(&v[end], &v[end - 1]) {
            end += 1;
        }

        (end, true)
    } else {
        while end < len && !is_less(&v[end], &v[end - 1]) {
            end += 1;
        }

        (end, false)
    }
}

/// Divides `v` into consecutive ascending runs covering the whole slice, left to right.
///
/// Descending streaks are reversed in place. Streaks shorter than `min_run` are extended to
/// `min_run` elements (or the end of the slice) with insertion sort.
pub fn find_runs<T, F>(v: &mut [T], min_run: usize, is_less: &mut F) -> Vec<Run>
where
    F: FnMut(&T, &T) -> bool,
{
    let len = v.len();
    let mut runs = Vec::new();
    let mut start = 0;

    while start < len {
        let (streak_len, was_reversed) = find_streak(&v[start..], is_less);
        if was_reversed {
            v[start..start + streak_len].reverse();
        }

        let mut end = start + streak_len;
        if streak_len < min_run {
            end = cmp::min(start + min_run, len);
            insertion_sort_shift_left(&mut v[start..end], streak_len.max(1), is_less);
        }

        runs.push(Run::new(start, end - start));
        start = end;
    }

    runs
}
