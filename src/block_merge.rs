//! Stable merge of two adjacent sorted runs that keeps no more than a handful of values outside
//! the slice.
//!
//! The merged span is cut into blocks of `L = floor(sqrt(n))` elements. The last two block slots
//! (`buffer`, one full block, and `remained`, the leftover `n % L` elements) are kept aside. The
//! other blocks are ordered by their first element and then merged pairwise from left to right,
//! using `buffer` as swap space. Finally the kept-aside tail is sorted and folded back in with a
//! backward pass over blocks of `L + n % L` elements.
//!
//! Bookkeeping is limited to `O(sqrt n)` indices: a tag per block and the origin tracking of the
//! scratch blocks.

use crate::merge::{following_less_equal, merge, Scratch, ScratchBlock, Side};
use crate::runs::Run;
use crate::smallsort::selection_sort;

/// A block is a run that only exists inside a block merge.
pub type Block = Run;

/// Merges the adjacent sorted runs `left` and `right` of `v` in place. Stable.
///
/// `gallop` is forwarded to the pairwise block merges, `None` disables galloping.
///
/// Panics if the runs are not adjacent or out of bounds.
#[cfg_attr(feature = "no_inline_sub_functions", inline(never))]
pub fn block_merge<T, F>(
    v: &mut [T],
    left: Run,
    right: Run,
    gallop: Option<usize>,
    is_less: &mut F,
) where
    F: FnMut(&T, &T) -> bool,
{
    assert_eq!(
        left.end(),
        right.start,
        "block merge requires adjacent runs, got {left:?} and {right:?}"
    );
    assert!(
        right.end() <= v.len(),
        "run {right:?} out of bounds for slice of length {}",
        v.len()
    );

    if left.len == 0 || right.len == 0 || !is_less(&v[right.start], &v[right.start - 1]) {
        // Already in order.
        return;
    }

    let base = left.start;
    let len = left.len + right.len;
    let tail = base + len;
    let block_len = floor_sqrt(len);

    if len <= 4 * block_len {
        selection_sort(&mut v[base..tail], is_less);
        return;
    }

    // The part of the left run that shares a block with the start of the right run gets merged
    // into the right run first, afterwards every block belongs to exactly one of the two runs.
    let straddle = left.len % block_len;
    if straddle != 0 {
        rotate_merge(
            v,
            Run::new(right.start - straddle, straddle),
            right,
            is_less,
        );
    }

    let left_blocks = left.len / block_len;
    if left_blocks == 0 {
        return;
    }

    let forward_blocks = len / block_len - 1;
    let backward_len = block_len + len % block_len;

    // If all forward blocks come from the left run they are sorted already, and the right run
    // lies entirely in the tail.
    if left_blocks < forward_blocks {
        let buffer = base + forward_blocks * block_len;
        let mut tags = (0..forward_blocks).collect::<Vec<_>>();
        select_blocks(&mut v[base..buffer], block_len, &mut tags, is_less);

        let mut scratch = ScratchBlock::new(buffer, block_len);
        merge_forward(v, base, block_len, &tags, left_blocks, &mut scratch, gallop, is_less);
        scratch.restore(v);
    }

    selection_sort(&mut v[tail - 2 * backward_len..tail], is_less);

    let mut scratch = ScratchBlock::new(tail - backward_len, backward_len);
    let mut hi = tail - 2 * backward_len;
    while hi > base {
        if !is_less(&v[hi], &v[hi - 1]) {
            break;
        }

        let lo = hi.saturating_sub(backward_len).max(base);
        merge(
            v,
            Run::new(lo, hi - lo),
            Run::new(hi, backward_len),
            Scratch::Exchange(&mut scratch),
            true,
            gallop,
            is_less,
        );
        hi = lo;
    }
    scratch.restore(v);

    selection_sort(&mut v[tail - backward_len..tail], is_less);
}

/// Merges the adjacent sorted runs `left` and `right` of `v` by rotations, without any scratch.
/// Stable.
///
/// Each element of `left` is rotated past the elements of `right` that are smaller than it, so
/// the cost is `O(left.len * left.len + right.len)` moves. Only worth it when `left` is short.
pub fn rotate_merge<T, F>(v: &mut [T], left: Run, right: Run, is_less: &mut F)
where
    F: FnMut(&T, &T) -> bool,
{
    assert_eq!(
        left.end(),
        right.start,
        "rotate merge requires adjacent runs, got {left:?} and {right:?}"
    );

    let mut start = left.start;
    let mut left_len = left.len;
    let mut right_len = right.len;

    while left_len > 0 && right_len > 0 {
        let mid = start + left_len;
        let count = following_less_equal(&v[mid..mid + right_len], &v[start], false, is_less);
        if count > 0 {
            v[start..mid + count].rotate_left(left_len);
            start += count;
            right_len -= count;
        }

        // v[start] is in its final place, so is every following left element that the right
        // head does not undercut.
        start += 1;
        left_len -= 1;
        while left_len > 0 && right_len > 0 && !is_less(&v[start + left_len], &v[start]) {
            start += 1;
            left_len -= 1;
        }
    }
}

fn floor_sqrt(n: usize) -> usize {
    let mut root = (n as f64).sqrt() as usize;

    while root > 0 && root.saturating_mul(root) > n {
        root -= 1;
    }
    while (root + 1).saturating_mul(root + 1) <= n {
        root += 1;
    }

    root
}

// Swaps the `len` elements starting at `a` with the `len` elements starting at `b`.
fn swap_blocks<T>(v: &mut [T], a: usize, b: usize, len: usize) {
    debug_assert!(a + len <= b);

    let (head, rest) = v.split_at_mut(b);
    head[a..a + len].swap_with_slice(&mut rest[..len]);
}

// Selection sort of the blocks of `v` by their first element. Equal first elements are ordered by
// tag, so blocks of the left run stay ahead of blocks of the right run and blocks of the same run
// keep their order.
fn select_blocks<T, F>(v: &mut [T], block_len: usize, tags: &mut [usize], is_less: &mut F)
where
    F: FnMut(&T, &T) -> bool,
{
    let count = tags.len();
    debug_assert_eq!(v.len(), count * block_len);

    for i in 0..count.saturating_sub(1) {
        let mut min = i;
        for j in (i + 1)..count {
            let candidate = &v[j * block_len];
            let current = &v[min * block_len];
            if is_less(candidate, current) || (!is_less(current, candidate) && tags[j] < tags[min])
            {
                min = j;
            }
        }

        if min != i {
            swap_blocks(v, i * block_len, min * block_len, block_len);
            tags.swap(i, min);
        }
    }
}

// Left to right pass over the selected blocks. The unfinished tail of everything merged so far is
// carried as a fragment from one run, each following block from the other run gets merged with
// it. A block from the same run as the fragment finalizes the fragment.
#[allow(clippy::too_many_arguments)]
fn merge_forward<T, F>(
    v: &mut [T],
    base: usize,
    block_len: usize,
    tags: &[usize],
    left_blocks: usize,
    scratch: &mut ScratchBlock,
    gallop: Option<usize>,
    is_less: &mut F,
) where
    F: FnMut(&T, &T) -> bool,
{
    let mut fragment = Block::new(base, block_len);
    let mut fragment_from_left = tags[0] < left_blocks;

    for (i, &tag) in tags.iter().enumerate().skip(1) {
        let block = Block::new(base + i * block_len, block_len);
        let block_from_left = tag < left_blocks;

        if block_from_left == fragment_from_left {
            fragment = block;
            continue;
        }

        // Ties go to whichever operand came from the left run.
        let report = merge(
            v,
            fragment,
            block,
            Scratch::Exchange(scratch),
            fragment_from_left,
            gallop,
            is_less,
        );

        fragment = Block::new(block.end() - report.rest, report.rest);
        if report.remaining == Side::Right {
            fragment_from_left = block_from_left;
        }
    }
}
