//! Size-bounded partitioning of a string list by shared prefixes.
//!
//! Strings are cut where neighbours in sorted order share the shortest
//! prefix, so each part keeps strings that start alike.

use crate::error::{Error, Result};

/// Length in bytes of the longest common prefix of `a` and `b`.
pub fn common_prefix_len(a: &str, b: &str) -> usize {
    a.bytes().zip(b.bytes()).take_while(|(x, y)| x == y).count()
}

/// Split `strings` in two at the weakest shared prefix, returning the
/// smaller part first.
///
/// Among the cut points with the shortest common prefix, the first one that
/// leaves both parts with at least `min_size` strings wins. If there is none,
/// the last such cut is taken and the smaller part is topped up from the
/// larger one, recursively. Requires `2 * min_size <= strings.len()`.
pub fn split_by_prefix<S: AsRef<str> + Ord>(
    mut strings: Vec<S>,
    min_size: usize,
) -> Result<(Vec<S>, Vec<S>)> {
    if 2 * min_size > strings.len() {
        return Err(Error::InvalidConfig(format!(
            "cannot split {} strings into two parts of at least {min_size}",
            strings.len()
        )));
    }
    strings.sort();
    Ok(split_sorted(strings, min_size))
}

fn split_sorted<S: AsRef<str> + Ord>(mut strings: Vec<S>, min_size: usize) -> (Vec<S>, Vec<S>) {
    if strings.len() < 2 {
        return (Vec::new(), strings);
    }
    let prefixes: Vec<usize> = strings
        .windows(2)
        .map(|pair| common_prefix_len(pair[0].as_ref(), pair[1].as_ref()))
        .collect();
    let weakest = prefixes.iter().copied().min().unwrap_or(0);

    let mut cut = 0;
    for (i, &prefix) in prefixes.iter().enumerate() {
        if prefix != weakest {
            continue;
        }
        cut = i + 1;
        if cut >= min_size && strings.len() - cut >= min_size {
            let tail = strings.split_off(cut);
            return smaller_first(strings, tail);
        }
    }

    let tail = strings.split_off(cut);
    let (mut small, large) = smaller_first(strings, tail);
    let (top_up, large) = split_sorted(large, min_size - small.len());
    small.extend(top_up);
    small.sort();
    smaller_first(small, large)
}

fn smaller_first<S>(a: Vec<S>, b: Vec<S>) -> (Vec<S>, Vec<S>) {
    if a.len() > b.len() { (b, a) } else { (a, b) }
}

/// Partition `strings` into parts of at most `max_size` strings, each cut
/// made by [`split_by_prefix`] with parts of at least `min_size`.
///
/// Requires `max_size >= 1` and `2 * min_size <= max_size`.
pub fn partition_by_prefix<S: AsRef<str> + Ord>(
    strings: Vec<S>,
    min_size: usize,
    max_size: usize,
) -> Result<Vec<Vec<S>>> {
    if max_size == 0 || 2 * min_size > max_size {
        return Err(Error::InvalidConfig(format!(
            "part sizes must satisfy 1 <= max and 2 * min <= max, \
             got min {min_size}, max {max_size}"
        )));
    }
    let mut done = Vec::new();
    let mut pending = vec![strings];
    while let Some(part) = pending.pop() {
        if part.len() <= max_size {
            done.push(part);
            continue;
        }
        let (small, large) = split_by_prefix(part, min_size)?;
        pending.push(small);
        pending.push(large);
    }
    Ok(done)
}
