//! Path similarity used to rank replacement candidates for a broken link.
//!
//! The score blends segment overlap (weight 0.6) with character-level edit
//! similarity of the joined path (weight 0.4). Segment overlap is a
//! membership test: every segment of the first path that appears anywhere in
//! the second counts, so a repeated segment can count more than once.
//! Confidence thresholds downstream are tuned against that behavior.

use std::collections::HashSet;

const SEGMENT_WEIGHT: f64 = 0.6;
const EDIT_WEIGHT: f64 = 0.4;

/// Lower-cased, non-empty `/`-separated segments of `path`.
pub fn path_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.to_lowercase())
        .collect()
}

/// True when the two paths have at least one segment in common, ignoring case.
pub fn shares_segment(path_a: &str, path_b: &str) -> bool {
    let b: HashSet<String> = path_segments(path_b).into_iter().collect();
    path_segments(path_a).iter().any(|segment| b.contains(segment))
}

/// Similarity of two URL paths in `[0, 1]`.
pub fn similarity(path_a: &str, path_b: &str) -> f64 {
    let a = path_segments(path_a);
    let b = path_segments(path_b);

    match (a.is_empty(), b.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        _ => {}
    }

    let b_set: HashSet<&String> = b.iter().collect();
    let matching = a.iter().filter(|segment| b_set.contains(segment)).count();
    let segment_similarity = matching as f64 / a.len().max(b.len()) as f64;

    let joined_a = a.join("/");
    let joined_b = b.join("/");
    let longest = joined_a.chars().count().max(joined_b.chars().count());
    let edit_similarity = if longest == 0 {
        1.0
    } else {
        1.0 - levenshtein(&joined_a, &joined_b) as f64 / longest as f64
    };

    SEGMENT_WEIGHT * segment_similarity + EDIT_WEIGHT * edit_similarity
}

/// Character edit distance with unit costs for insert, delete and substitute.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Two rows of the full table are enough.
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}
