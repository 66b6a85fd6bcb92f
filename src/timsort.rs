//! Run-stack driver.

use crate::block_merge::block_merge;
use crate::policy::{Policy, WhatMerge};
use crate::runs::{find_runs, Run};

/// Sorts `v` stably with `is_less`, merging runs as `policy` dictates.
///
/// Panics if `policy` lets the run stack grow beyond `2 * log2(v.len()) + 4` entries, which only
/// happens when it refuses to merge runs that a terminating policy would merge.
#[cfg_attr(feature = "no_inline_sub_functions", inline(never))]
pub fn merge_sort<T, F, P>(v: &mut [T], is_less: &mut F, policy: &P)
where
    F: FnMut(&T, &T) -> bool,
    P: Policy + ?Sized,
{
    let len = v.len();

    if len < 2 {
        // These inputs are always sorted.
        return;
    }

    let min_run = policy.min_run(len).clamp(1, len);
    let gallop = policy.gallop();
    let max_depth = 2 * (usize::BITS - len.leading_zeros()) as usize + 4;

    let mut runs = find_runs(v, min_run, is_less).into_iter();
    let Some(mut top) = runs.next() else {
        return;
    };

    // Runs below `top`, bottom to top.
    let mut stack: Vec<Run> = Vec::new();

    for run in runs {
        let mut x = run;
        let mut y = top;

        while let Some(z) = stack.pop() {
            match policy.what_merge(x.len, y.len, z.len) {
                WhatMerge::MergeXY => {
                    x = merge_pair(v, y, x, gallop, is_less);
                    y = z;
                }
                WhatMerge::MergeYZ => {
                    y = merge_pair(v, z, y, gallop, is_less);
                }
                WhatMerge::NoMerge => {
                    stack.push(z);
                    break;
                }
            }
        }

        if policy.need_merge(x.len, y.len) {
            top = merge_pair(v, y, x, gallop, is_less);
        } else {
            stack.push(y);
            top = x;
        }

        assert!(
            stack.len() < max_depth,
            "run stack grew to {} entries for {len} elements, the merge policy does not keep \
             run lengths balanced",
            stack.len() + 1
        );
    }

    // Merge whatever is left, unconditionally.
    while let Some(below) = stack.pop() {
        top = merge_pair(v, below, top, gallop, is_less);
    }

    debug_assert!(top.start == 0 && top.len == len);
}

fn merge_pair<T, F>(
    v: &mut [T],
    left: Run,
    right: Run,
    gallop: Option<usize>,
    is_less: &mut F,
) -> Run
where
    F: FnMut(&T, &T) -> bool,
{
    block_merge(v, left, right, gallop, is_less);

    left.join(right)
}
