use std::env;
use std::str::FromStr;

use once_cell::sync::OnceCell;

use rand::prelude::*;

use zipf::ZipfDistribution;

/// Provides a set of patterns useful for testing and benchmarking sorting algorithms.
/// Currently limited to i32 values.
///
/// All random patterns draw from a generator seeded with [`random_init_seed`], so a failing run
/// can be repeated by setting `OVERRIDE_SEED`.

// --- Public ---

pub fn random(len: usize) -> Vec<i32> {
    //     .
    // : . : :
    // :.:::.::

    random_vec(len)
}

pub fn random_uniform<R>(len: usize, range: R) -> Vec<i32>
where
    R: Into<rand::distributions::Uniform<i32>>,
{
    // :.:.:.::
    let mut rng = new_seed();

    let dist: rand::distributions::Uniform<i32> = range.into();

    (0..len).map(|_| dist.sample(&mut rng)).collect()
}

pub fn random_zipf(len: usize, exponent: f64) -> Vec<i32> {
    // https://en.wikipedia.org/wiki/Zipf's_law
    if len == 0 {
        return Vec::new();
    }

    let mut rng = new_seed();

    let dist = ZipfDistribution::new(len, exponent).unwrap();

    (0..len).map(|_| dist.sample(&mut rng) as i32).collect()
}

pub fn random_sorted(len: usize, sorted_percent: f64) -> Vec<i32> {
    //     .:
    //   .:::. :
    // .::::::.::
    // [----][--]
    //  ^      ^
    //  |      |
    // sorted  |
    //     unsorted

    let mut v = random_vec(len);
    let sorted_len = ((len as f64) * (sorted_percent / 100.0)).round() as usize;

    v[0..sorted_len].sort_unstable();

    v
}

pub fn all_equal(len: usize) -> Vec<i32> {
    // ......
    // ::::::

    (0..len).map(|_| 66).collect::<Vec<_>>()
}

pub fn ascending(len: usize) -> Vec<i32> {
    //     .:
    //   .:::
    // .:::::

    (0..len as i32).collect::<Vec<_>>()
}

pub fn descending(len: usize) -> Vec<i32> {
    // :.
    // :::.
    // :::::.

    (0..len as i32).rev().collect::<Vec<_>>()
}

pub fn saw_ascending(len: usize, saw_count: usize) -> Vec<i32> {
    //   .:  .:
    // .:::.:::

    let mut vals = random_vec(len);
    for chunk in vals.chunks_mut(chunk_len(len, saw_count)) {
        chunk.sort();
    }

    vals
}

pub fn saw_descending(len: usize, saw_count: usize) -> Vec<i32> {
    // :.  :.
    // :::.:::.

    let mut vals = random_vec(len);
    for chunk in vals.chunks_mut(chunk_len(len, saw_count)) {
        chunk.sort_by_key(|&e| std::cmp::Reverse(e));
    }

    vals
}

pub fn saw_mixed(len: usize, saw_count: usize) -> Vec<i32> {
    // :.  :.    .::.    .:
    // :::.:::..::::::..:::

    let mut vals = random_vec(len);
    let chunk_len = chunk_len(len, saw_count);
    let saw_directions = random_uniform((len / chunk_len) + 1, 0..=1);

    for (chunk, direction) in vals.chunks_mut(chunk_len).zip(saw_directions) {
        if direction == 0 {
            chunk.sort();
        } else {
            chunk.sort_by_key(|&e| std::cmp::Reverse(e));
        }
    }

    vals
}

pub fn pipe_organ(len: usize) -> Vec<i32> {
    //   .:.
    // .:::::.

    let mut vals = random_vec(len);

    let (first_half, second_half) = vals.split_at_mut(len / 2);
    first_half.sort();
    second_half.sort_by_key(|&e| std::cmp::Reverse(e));

    vals
}

/// Concatenation of sorted runs, cycling through `run_lens` for their lengths. The last run may
/// be cut short.
pub fn sorted_runs(len: usize, run_lens: &[usize]) -> Vec<i32> {
    //   .:   .:  .:::
    // .:::.::::.:::::

    assert!(
        run_lens.iter().all(|&run_len| run_len > 0),
        "run lengths must be positive"
    );

    let mut vals = random_vec(len);
    let mut start = 0;
    for &run_len in run_lens.iter().cycle() {
        if start >= len {
            break;
        }

        let end = std::cmp::min(start + run_len, len);
        vals[start..end].sort();
        start = end;
    }

    vals
}

/// Strictly descending prefix of `descending_len` elements followed by an ascending suffix that
/// interleaves with it.
pub fn descending_then_ascending(len: usize, descending_len: usize) -> Vec<i32> {
    // :.
    // :::.  .:
    // :::::.:::

    let descending_len = std::cmp::min(descending_len, len);

    (0..descending_len as i32)
        .rev()
        .map(|val| val * 2)
        .chain((0..(len - descending_len) as i32).map(|val| val * 2 + 1))
        .collect()
}

/// Seed used by every random pattern in this process. Taken from `OVERRIDE_SEED` if set.
pub fn random_init_seed() -> u64 {
    static SEED: OnceCell<u64> = OnceCell::new();

    *SEED.get_or_init(|| {
        env::var("OVERRIDE_SEED")
            .ok()
            .map(|seed| u64::from_str(&seed).expect("OVERRIDE_SEED must be a u64"))
            .unwrap_or_else(|| thread_rng().gen())
    })
}

// --- Private ---

fn new_seed() -> StdRng {
    rand::SeedableRng::seed_from_u64(random_init_seed())
}

fn random_vec(len: usize) -> Vec<i32> {
    let mut rng = new_seed();

    (0..len).map(|_| rng.gen::<i32>()).collect()
}

fn chunk_len(len: usize, saw_count: usize) -> usize {
    (len / saw_count.max(1)).max(1)
}
