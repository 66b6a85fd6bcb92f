//! Decisions that shape the run stack: how long runs must be, when adjacent runs get merged and
//! whether merges gallop.

/// Upper bound for the minimum run length produced by [`DefaultPolicy::min_run`].
pub const MAX_MIN_RUN: usize = 64;

/// Outcome of looking at the three topmost runs of the stack.
///
/// `x` is the most recently pushed run, `y` the one below it and `z` the one below `y`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WhatMerge {
    /// Put `z` back and stop balancing.
    NoMerge,
    /// Merge `y` and `x`.
    MergeXY,
    /// Merge `z` and `y`.
    MergeYZ,
}

/// Tuning interface consumed by [`crate::timsort::merge_sort`].
///
/// All functions must be pure. A policy that keeps answering "no merge" no matter how the stack
/// looks makes the driver panic once the stack outgrows a logarithmic bound.
pub trait Policy {
    /// Minimum length of a run for an input of `len` elements. Values larger than `len` are
    /// clamped by the caller.
    fn min_run(&self, len: usize) -> usize;

    /// Whether the two topmost runs must be merged right away.
    fn need_merge(&self, x: usize, y: usize) -> bool;

    /// Which pair, if any, of the three topmost runs to merge.
    fn what_merge(&self, x: usize, y: usize, z: usize) -> WhatMerge;

    /// Number of consecutive wins by one side of a merge after which the merge switches to
    /// galloping. `None` disables galloping.
    fn gallop(&self) -> Option<usize>;
}

/// Classic TimSort balancing, galloping off unless asked for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DefaultPolicy {
    gallop: Option<usize>,
}

impl DefaultPolicy {
    pub const fn new() -> Self {
        Self { gallop: None }
    }

    /// Enables galloping after `threshold` consecutive wins. Zero behaves like one.
    pub const fn with_gallop(threshold: usize) -> Self {
        let threshold = if threshold == 0 { 1 } else { threshold };

        Self {
            gallop: Some(threshold),
        }
    }
}

impl Policy for DefaultPolicy {
    /// Takes the six most significant bits of `len` and adds one if any of the remaining bits are
    /// set. This keeps `len / min_run` at or slightly below a power of two, so the final merges are
    /// balanced.
    fn min_run(&self, mut len: usize) -> usize {
        let mut remainder = 0;

        while len >= MAX_MIN_RUN {
            remainder |= len & 1;
            len >>= 1;
        }

        len + remainder
    }

    fn need_merge(&self, x: usize, y: usize) -> bool {
        y <= x
    }

    fn what_merge(&self, x: usize, y: usize, z: usize) -> WhatMerge {
        if z > x + y && y > x {
            WhatMerge::NoMerge
        } else if z <= x + y {
            if x < z {
                WhatMerge::MergeXY
            } else {
                WhatMerge::MergeYZ
            }
        } else if y <= x {
            WhatMerge::MergeXY
        } else {
            WhatMerge::NoMerge
        }
    }

    fn gallop(&self) -> Option<usize> {
        self.gallop
    }
}
