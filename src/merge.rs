//! Stable merge of two adjacent sorted runs with a scratch area the size of the left run.
//!
//! The left run is moved into the scratch area first. Then the smaller head of the two inputs is
//! written to the next destination slot until one side is exhausted. How a value is written
//! depends on the kind of scratch:
//!
//! - [`Scratch::Overwrite`] is disposable memory. Values are moved bitwise and whatever sat in the
//!   destination before is gone (it was moved out earlier).
//! - [`Scratch::Exchange`] is a live part of the slice being sorted. Every write is a swap, so the
//!   values that used to live in the scratch area travel through the merged span and end up back
//!   in the scratch area, in an order that [`ScratchBlock::restore`] can undo.
//!
//! Both support galloping: after a configurable number of consecutive wins by the same side, the
//! number of elements of that side that still precede the other side's head is found with an
//! exponential search and moved in one go.

use std::mem;
use std::ops::Range;
use std::ptr;
use std::slice;

use crate::runs::Run;

/// Which input of a merge still had elements when the other one ran dry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Summary of a finished merge.
///
/// The `rest` elements of the `remaining` side form the tail of the merged span.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MergeReport {
    pub remaining: Side,
    pub rest: usize,
    /// Number of galloping searches performed.
    pub gallops: usize,
}

/// Where the left run is parked during a merge, and how destination slots are written.
pub enum Scratch<'a, T> {
    /// Uninitialized memory with capacity for the left run. Must be empty.
    Overwrite(&'a mut Vec<T>),
    /// A region of the merged slice, disjoint from both runs, holding live values.
    Exchange(&'a mut ScratchBlock),
}

/// A region of the slice used as swap space by exchange merges.
///
/// Remembers, for each slot, which slot the value currently stored there originally came from.
/// Between merges the region holds the same values it started with, only permuted.
#[derive(Debug)]
pub struct ScratchBlock {
    start: usize,
    origins: Vec<usize>,
    // Origins of the displaced values while a merge is running, in the order they currently sit
    // in the merged span. Circular, `queued` entries starting at `head`.
    displaced: Vec<usize>,
    head: usize,
    queued: usize,
}

impl ScratchBlock {
    pub fn new(start: usize, len: usize) -> Self {
        Self {
            start,
            origins: (0..len).collect(),
            displaced: vec![0; len],
            head: 0,
            queued: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.len()
    }

    /// Puts every value of the region back into the slot it occupied when `self` was created.
    pub fn restore<T>(&mut self, v: &mut [T]) {
        debug_assert_eq!(self.queued, 0);

        let slots = &mut v[self.range()];
        for slot in 0..self.origins.len() {
            while self.origins[slot] != slot {
                let home = self.origins[slot];
                slots.swap(slot, home);
                self.origins.swap(slot, home);
            }
        }
    }

    // The value from `slot` left the scratch area and now sits at the back of the displaced
    // values.
    fn stash(&mut self, slot: usize) {
        let back = (self.head + self.queued) % self.len();
        self.displaced[back] = self.origins[slot];
        self.queued += 1;
    }

    // The frontmost displaced value was swapped back into `slot`.
    fn settle(&mut self, slot: usize) {
        self.origins[slot] = self.displaced[self.head];
        self.head = (self.head + 1) % self.len();
        self.queued -= 1;
    }

    // The frontmost displaced value was swapped behind all the others.
    fn recycle(&mut self) {
        let back = (self.head + self.queued) % self.len();
        self.displaced[back] = self.displaced[self.head];
        self.head = (self.head + 1) % self.len();
    }
}

/// Returns how many leading elements of the sorted `run` order before `pivot`. With `take_equal`
/// elements equal to `pivot` count as preceding it, otherwise they don't.
///
/// Probes `1, 2, 4, ...` elements deep before finishing with a binary search, so the cost is
/// logarithmic in the answer rather than in `run.len()`.
pub fn following_less_equal<T, F>(run: &[T], pivot: &T, take_equal: bool, is_less: &mut F) -> usize
where
    F: FnMut(&T, &T) -> bool,
{
    let mut precedes = |elem: &T| {
        if take_equal {
            !is_less(pivot, elem)
        } else {
            is_less(elem, pivot)
        }
    };

    let len = run.len();
    let mut lo = 0;
    let mut probe = 1;

    while probe <= len && precedes(&run[probe - 1]) {
        lo = probe;
        probe *= 2;
    }

    // run[..lo] precedes, run[probe - 1] does not.
    let mut hi = if probe > len { len } else { probe - 1 };

    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if precedes(&run[mid]) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }

    lo
}

/// Merges the adjacent sorted runs `left` and `right` of `v` into one sorted span.
///
/// Equal elements keep their order, with the left run first if `left_wins_ties`, otherwise the
/// right run first. `gallop` is the galloping threshold, `None` disables it.
///
/// Panics if the runs are not adjacent or in bounds, or if `scratch` is too small or overlaps
/// the runs.
#[cfg_attr(feature = "no_inline_sub_functions", inline(never))]
pub fn merge<T, F>(
    v: &mut [T],
    left: Run,
    right: Run,
    scratch: Scratch<'_, T>,
    left_wins_ties: bool,
    gallop: Option<usize>,
    is_less: &mut F,
) -> MergeReport
where
    F: FnMut(&T, &T) -> bool,
{
    assert_eq!(
        left.end(),
        right.start,
        "merged runs must be adjacent, got {left:?} and {right:?}"
    );
    assert!(
        right.end() <= v.len(),
        "run {right:?} out of bounds for slice of length {}",
        v.len()
    );

    if right.len == 0 || mem::size_of::<T>() == 0 {
        return MergeReport {
            remaining: Side::Left,
            rest: left.len,
            gallops: 0,
        };
    }

    if left.len == 0 {
        return MergeReport {
            remaining: Side::Right,
            rest: right.len,
            gallops: 0,
        };
    }

    match scratch {
        Scratch::Overwrite(buf) => {
            assert!(
                buf.is_empty() && buf.capacity() >= left.len,
                "overwrite scratch must be empty with capacity for {} elements",
                left.len
            );

            // SAFETY: the runs are in bounds, non-empty, and `T` is not zero-sized, `buf` has
            // room for the left run and owns no values.
            unsafe {
                let buf_ptr = buf.as_mut_ptr();
                merge_overwrite(v, left, right, buf_ptr, left_wins_ties, gallop, is_less)
            }
        }
        Scratch::Exchange(block) => {
            let area = block.range();
            assert!(
                block.len() >= left.len,
                "scratch block of length {} can't hold left run {left:?}",
                block.len()
            );
            assert!(
                area.end <= v.len() && (area.end <= left.start || area.start >= right.end()),
                "scratch block {area:?} must be in bounds and disjoint from {left:?} and {right:?}"
            );

            merge_exchange(v, left, right, block, left_wins_ties, gallop, is_less)
        }
    }
}

/// Merges two adjacent runs of `v`, allocating scratch space for the left run for the duration
/// of the call. Ties go to the left run.
pub fn merge_runs<T, F>(
    v: &mut [T],
    left: Run,
    right: Run,
    gallop: Option<usize>,
    is_less: &mut F,
) -> MergeReport
where
    F: FnMut(&T, &T) -> bool,
{
    let mut buf = Vec::with_capacity(left.len);

    merge(v, left, right, Scratch::Overwrite(&mut buf), true, gallop, is_less)
}

// Counts consecutive wins of each side.
struct Streak {
    threshold: Option<usize>,
    left: usize,
    right: usize,
}

impl Streak {
    fn new(threshold: Option<usize>) -> Self {
        Self {
            threshold,
            left: 0,
            right: 0,
        }
    }

    // Returns true if the left side should gallop now.
    fn left_won(&mut self) -> bool {
        self.left += 1;
        self.right = 0;
        self.threshold.is_some_and(|t| self.left >= t)
    }

    fn right_won(&mut self) -> bool {
        self.right += 1;
        self.left = 0;
        self.threshold.is_some_and(|t| self.right >= t)
    }

    fn reset(&mut self) {
        self.left = 0;
        self.right = 0;
    }
}

#[inline]
fn right_goes_first<T, F>(left: &T, right: &T, left_wins_ties: bool, is_less: &mut F) -> bool
where
    F: FnMut(&T, &T) -> bool,
{
    if left_wins_ties {
        is_less(right, left)
    } else {
        !is_less(left, right)
    }
}

/// # Safety
///
/// Both runs must be non-empty, adjacent and in bounds of `v`. `buf` must be valid for writes of
/// `left.len` elements and must not overlap `v`. `T` must not be a zero-sized type.
unsafe fn merge_overwrite<T, F>(
    v: &mut [T],
    left: Run,
    right: Run,
    buf: *mut T,
    left_wins_ties: bool,
    gallop: Option<usize>,
    is_less: &mut F,
) -> MergeReport
where
    F: FnMut(&T, &T) -> bool,
{
    let arr_ptr = v.as_mut_ptr();
    let mut streak = Streak::new(gallop);
    let mut gallops = 0;

    // Intermediate state of the process is always tracked by `hole`, which serves two purposes:
    // 1. Protects integrity of `v` from panics in `is_less`.
    // 2. Fills the remaining hole in `v` if the right run gets consumed first.
    //
    // The gap in `v` always has exactly the length of the unconsumed part of `buf` and ends where
    // the unconsumed part of the right run begins.
    //
    // SAFETY: all pointers stay within the runs of `v` and the first `left.len` slots of `buf`.
    unsafe {
        ptr::copy_nonoverlapping(arr_ptr.add(left.start), buf, left.len);

        let mut hole = MergeHole {
            start: buf,
            end: buf.add(left.len),
            dest: arr_ptr.add(left.start),
        };

        let mut right_ptr = arr_ptr.add(right.start);
        let right_end = arr_ptr.add(right.end());

        while hole.start < hole.end && right_ptr < right_end {
            if right_goes_first(&*hole.start, &*right_ptr, left_wins_ties, is_less) {
                ptr::copy_nonoverlapping(right_ptr, hole.dest, 1);
                right_ptr = right_ptr.add(1);
                hole.dest = hole.dest.add(1);

                if streak.right_won() && hole.start < hole.end && right_ptr < right_end {
                    let pending = slice::from_raw_parts(right_ptr, distance(right_ptr, right_end));
                    let count =
                        following_less_equal(pending, &*hole.start, !left_wins_ties, is_less);

                    // The gap may be shorter than `count`.
                    ptr::copy(right_ptr, hole.dest, count);
                    right_ptr = right_ptr.add(count);
                    hole.dest = hole.dest.add(count);

                    gallops += 1;
                    streak.reset();
                }
            } else {
                ptr::copy_nonoverlapping(hole.start, hole.dest, 1);
                hole.start = hole.start.add(1);
                hole.dest = hole.dest.add(1);

                if streak.left_won() && hole.start < hole.end && right_ptr < right_end {
                    let pending = slice::from_raw_parts(hole.start, distance(hole.start, hole.end));
                    let count =
                        following_less_equal(pending, &*right_ptr, left_wins_ties, is_less);

                    ptr::copy_nonoverlapping(hole.start, hole.dest, count);
                    hole.start = hole.start.add(count);
                    hole.dest = hole.dest.add(count);

                    gallops += 1;
                    streak.reset();
                }
            }
        }

        if hole.start < hole.end {
            MergeReport {
                remaining: Side::Left,
                rest: distance(hole.start, hole.end),
                gallops,
            }
        } else {
            MergeReport {
                remaining: Side::Right,
                rest: distance(right_ptr, right_end),
                gallops,
            }
        }
        // Finally, `hole` gets dropped. If the left run was not fully consumed, whatever remains
        // of it will now be copied into the hole in `v`.
    }
}

// SAFETY: caller guarantees both pointers belong to the same allocation and `start <= end`.
unsafe fn distance<T>(start: *const T, end: *const T) -> usize {
    unsafe { end.offset_from(start) as usize }
}

// When dropped, copies the range `start..end` into `dest..`.
struct MergeHole<T> {
    start: *mut T,
    end: *mut T,
    dest: *mut T,
}

impl<T> Drop for MergeHole<T> {
    fn drop(&mut self) {
        // SAFETY: `T` is not a zero-sized type, and these are pointers into the scratch buffer and
        // the gap in the slice of matching length.
        unsafe {
            let len = distance(self.start, self.end);
            ptr::copy_nonoverlapping(self.start, self.dest, len);
        }
    }
}

// Invariant: the values displaced from the scratch area occupy `v[dest..right]`, in the order
// recorded by the scratch block.
struct ExchangeCursor {
    dest: usize,
    taken: usize,
    right: usize,
}

impl ExchangeCursor {
    fn take_left<T>(&mut self, v: &mut [T], block: &mut ScratchBlock) {
        v.swap(self.dest, block.start + self.taken);
        block.settle(self.taken);
        self.taken += 1;
        self.dest += 1;
    }

    fn take_right<T>(&mut self, v: &mut [T], block: &mut ScratchBlock) {
        v.swap(self.dest, self.right);
        block.recycle();
        self.right += 1;
        self.dest += 1;
    }
}

fn merge_exchange<T, F>(
    v: &mut [T],
    left: Run,
    right: Run,
    block: &mut ScratchBlock,
    left_wins_ties: bool,
    gallop: Option<usize>,
    is_less: &mut F,
) -> MergeReport
where
    F: FnMut(&T, &T) -> bool,
{
    debug_assert_eq!(block.queued, 0);

    for i in 0..left.len {
        v.swap(left.start + i, block.start + i);
        block.stash(i);
    }

    let buf = block.start;
    let right_end = right.end();
    let mut cursor = ExchangeCursor {
        dest: left.start,
        taken: 0,
        right: right.start,
    };
    let mut streak = Streak::new(gallop);
    let mut gallops = 0;

    while cursor.taken < left.len && cursor.right < right_end {
        if right_goes_first(
            &v[buf + cursor.taken],
            &v[cursor.right],
            left_wins_ties,
            is_less,
        ) {
            cursor.take_right(v, block);

            if streak.right_won() && cursor.taken < left.len && cursor.right < right_end {
                let count = following_less_equal(
                    &v[cursor.right..right_end],
                    &v[buf + cursor.taken],
                    !left_wins_ties,
                    is_less,
                );
                for _ in 0..count {
                    cursor.take_right(v, block);
                }

                gallops += 1;
                streak.reset();
            }
        } else {
            cursor.take_left(v, block);

            if streak.left_won() && cursor.taken < left.len && cursor.right < right_end {
                let count = following_less_equal(
                    &v[buf + cursor.taken..buf + left.len],
                    &v[cursor.right],
                    left_wins_ties,
                    is_less,
                );
                for _ in 0..count {
                    cursor.take_left(v, block);
                }

                gallops += 1;
                streak.reset();
            }
        }
    }

    let report = if cursor.taken < left.len {
        MergeReport {
            remaining: Side::Left,
            rest: left.len - cursor.taken,
            gallops,
        }
    } else {
        MergeReport {
            remaining: Side::Right,
            rest: right_end - cursor.right,
            gallops,
        }
    };

    while cursor.taken < left.len {
        cursor.take_left(v, block);
    }

    report
}
