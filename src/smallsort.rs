//! Quadratic sorts for short ranges.

use std::mem;
use std::ptr;

/// Inserts `v[v.len() - 1]` into pre-sorted sequence `v[..v.len() - 1]` so that whole `v[..]`
/// becomes sorted.
///
/// # Safety
///
/// `v.len()` must be at least 2.
unsafe fn insert_tail<T, F>(v: &mut [T], is_less: &mut F)
where
    F: FnMut(&T, &T) -> bool,
{
    debug_assert!(v.len() >= 2);

    let arr_ptr = v.as_mut_ptr();
    let i = v.len() - 1;

    // SAFETY: caller ensures v.len() >= 2, so i and i - 1 are in bounds.
    unsafe {
        let i_ptr = arr_ptr.add(i);

        // Equal elements never move past each other, which is what keeps this stable.
        if is_less(&*i_ptr, &*i_ptr.sub(1)) {
            // From here on only `tmp` is handed to `is_less`, it is the value that gets written
            // back, so every comparison stays observable.
            let tmp = mem::ManuallyDrop::new(ptr::read(i_ptr));

            // If `is_less` panics, `hole` is dropped and fills the gap with `tmp`, so `v` still
            // holds every element exactly once.
            let mut hole = InsertionHole {
                src: &*tmp,
                dest: i_ptr.sub(1),
            };
            ptr::copy_nonoverlapping(hole.dest, i_ptr, 1);

            for j in (0..(i - 1)).rev() {
                let j_ptr = arr_ptr.add(j);
                if !is_less(&*tmp, &*j_ptr) {
                    break;
                }

                ptr::copy_nonoverlapping(j_ptr, hole.dest, 1);
                hole.dest = j_ptr;
            }
            // `hole` gets dropped and thus copies `tmp` into the remaining hole in `v`.
        }
    }

    // When dropped, copies from `src` into `dest`.
    struct InsertionHole<T> {
        src: *const T,
        dest: *mut T,
    }

    impl<T> Drop for InsertionHole<T> {
        fn drop(&mut self) {
            // SAFETY: `src` points to the value taken out of the slice, `dest` to the gap it
            // leaves behind.
            unsafe {
                ptr::copy_nonoverlapping(self.src, self.dest, 1);
            }
        }
    }
}

/// Sorts `v` assuming `v[..offset]` is already sorted. Stable.
///
/// Panics if `offset` is zero or larger than `v.len()`.
#[cfg_attr(feature = "no_inline_sub_functions", inline(never))]
pub fn insertion_sort_shift_left<T, F>(v: &mut [T], offset: usize, is_less: &mut F)
where
    F: FnMut(&T, &T) -> bool,
{
    let len = v.len();

    assert!(
        offset != 0 && offset <= len,
        "insertion sort offset {offset} out of range for length {len}"
    );

    // Shift each element of the unsorted region v[i..] as far left as is needed to make v sorted.
    for i in offset..len {
        // SAFETY: offset >= 1, so the subslice has at least two elements.
        unsafe {
            insert_tail(&mut v[..=i], is_less);
        }
    }
}

/// Stable selection sort. Needs no storage besides the slice itself.
///
/// The smallest remaining element is rotated into place instead of swapped, so elements that are
/// skipped over keep their relative order.
pub fn selection_sort<T, F>(v: &mut [T], is_less: &mut F)
where
    F: FnMut(&T, &T) -> bool,
{
    let len = v.len();

    for i in 0..len.saturating_sub(1) {
        let mut min = i;
        for j in (i + 1)..len {
            if is_less(&v[j], &v[min]) {
                min = j;
            }
        }

        if min != i {
            v[i..=min].rotate_right(1);
        }
    }
}
