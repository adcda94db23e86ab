//! Normalized edit-distance similarity.
//!
//! `similarity(a, b) = (max_len - levenshtein(a, b)) / max_len`, with lengths
//! counted in Unicode scalar values and unit costs for insertion, deletion and
//! substitution. Case folding is the caller's responsibility.

/// Classic Levenshtein distance over `char`s, using two rolling rows.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1) // deletion
                .min(curr[j] + 1) // insertion
                .min(prev[j] + cost); // substitution
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Similarity in `[0, 1]`; 1.0 for identical strings (including two empty ones).
///
/// # Examples
///
/// ```
/// use wikilink_core::similarity;
///
/// assert_eq!(similarity("Timeline", "Timeline"), 1.0);
/// assert!((similarity("kitten", "sitting") - 4.0 / 7.0).abs() < 1e-9);
/// ```
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let distance = levenshtein_distance(a, b);
    (max_len - distance) as f64 / max_len as f64
}
