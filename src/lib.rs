//! Stable TimSort variant whose merges need no buffer proportional to the input.
//!
//! Runs are found and balanced like in TimSort, but every merge of two runs is an in-place block
//! merge (see [`block_merge`]), so sorting allocates only `O(sqrt n)` indices of bookkeeping plus
//! the run list.

use std::cmp::Ordering;
use std::mem;

pub mod block_merge;
pub mod merge;
pub mod policy;
pub mod runs;
pub mod smallsort;
pub mod timsort;

pub use policy::{DefaultPolicy, Policy};

#[inline]
pub fn sort<T>(v: &mut [T])
where
    T: Ord,
{
    stable_sort(v, |a, b| a.cmp(b), &DefaultPolicy::new());
}

#[inline]
pub fn sort_by<T, F>(v: &mut [T], compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    stable_sort(v, compare, &DefaultPolicy::new());
}

#[inline]
pub fn sort_by_key<T, K, F>(v: &mut [T], mut f: F)
where
    K: Ord,
    F: FnMut(&T) -> K,
{
    stable_sort(v, |a, b| f(a).cmp(&f(b)), &DefaultPolicy::new());
}

#[inline]
pub fn sort_with_policy<T, P>(v: &mut [T], policy: &P)
where
    T: Ord,
    P: Policy + ?Sized,
{
    stable_sort(v, |a, b| a.cmp(b), policy);
}

#[inline]
pub fn sort_by_with_policy<T, F, P>(v: &mut [T], compare: F, policy: &P)
where
    F: FnMut(&T, &T) -> Ordering,
    P: Policy + ?Sized,
{
    stable_sort(v, compare, policy);
}

////////////////////////////////////////////////////////////////////////////////
// Sorting
////////////////////////////////////////////////////////////////////////////////

#[inline]
fn stable_sort<T, F, P>(v: &mut [T], mut compare: F, policy: &P)
where
    F: FnMut(&T, &T) -> Ordering,
    P: Policy + ?Sized,
{
    if mem::size_of::<T>() == 0 {
        // Sorting has no meaningful behavior on zero-sized types. Do nothing.
        return;
    }

    timsort::merge_sort(v, &mut |a, b| compare(a, b) == Ordering::Less, policy);
}
