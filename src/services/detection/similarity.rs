// String Similarity
// Levenshtein distance and the normalized similarity used by fuzzy matching

/// Edit distance over Unicode scalar values.
pub fn levenshtein(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// `(max_len - distance) / max_len`, in `[0, 1]`. Two empty strings are identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let distance = strsim::levenshtein(a, b).min(max_len);
    (max_len - distance) as f64 / max_len as f64
}

/// Cheap upper bound on similarity from lengths alone; lets callers skip the
/// quadratic distance when the lengths already rule a match out.
pub fn length_bound(a_len: usize, b_len: usize) -> f64 {
    let max_len = a_len.max(b_len);
    if max_len == 0 {
        return 1.0;
    }
    a_len.min(b_len) as f64 / max_len as f64
}
