//! Edit distances used by candidate ordering and scoring

use dom_snapshot::PathStep;

/// Levenshtein distance with unit insert/delete cost and a caller supplied
/// substitution cost.
pub fn weighted_levenshtein<T, F>(a: &[T], b: &[T], substitution: F) -> f64
where
    F: Fn(&T, &T) -> f64,
{
    if a.is_empty() {
        return b.len() as f64;
    }
    if b.is_empty() {
        return a.len() as f64;
    }

    let mut previous: Vec<f64> = (0..=b.len()).map(|j| j as f64).collect();
    let mut current = vec![0.0; b.len() + 1];
    for (i, left) in a.iter().enumerate() {
        current[0] = (i + 1) as f64;
        for (j, right) in b.iter().enumerate() {
            let replace = previous[j] + substitution(left, right);
            let delete = previous[j + 1] + 1.0;
            let insert = current[j] + 1.0;
            current[j + 1] = replace.min(delete).min(insert);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// Character-level Levenshtein distance.
pub fn char_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    weighted_levenshtein(&a, &b, |x, y| if x == y { 0.0 } else { 1.0 }) as usize
}

/// Path edit distance. Same tag at another position costs half a
/// substitution.
pub fn path_distance(a: &[PathStep], b: &[PathStep]) -> f64 {
    weighted_levenshtein(a, b, |x, y| {
        if x == y {
            0.0
        } else if x.tag == y.tag {
            0.5
        } else {
            1.0
        }
    })
}
