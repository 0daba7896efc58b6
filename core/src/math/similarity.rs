use ndarray::Array2;

/// Length of the longest common subsequence of two character sequences.
fn common_subsequence_len(lhs: &[char], rhs: &[char]) -> usize {
    let mut table = Array2::<usize>::zeros((lhs.len() + 1, rhs.len() + 1));
    for i in 1..=lhs.len() {
        for j in 1..=rhs.len() {
            table[[i, j]] = if lhs[i - 1] == rhs[j - 1] {
                table[[i - 1, j - 1]] + 1
            } else {
                table[[i - 1, j]].max(table[[i, j - 1]])
            };
        }
    }
    table[[lhs.len(), rhs.len()]]
}

/// Insert/delete edit-distance similarity in `[0, 1]`, case-insensitive.
///
/// Equals `1 - indel_distance / (|a| + |b|)`, i.e. `2 * lcs / (|a| + |b|)`.
pub fn similarity_ratio(lhs: &str, rhs: &str) -> f64 {
    let lhs: Vec<char> = lhs.to_uppercase().chars().collect();
    let rhs: Vec<char> = rhs.to_uppercase().chars().collect();
    let total = lhs.len() + rhs.len();
    if total == 0 {
        return 0.0;
    }
    2.0 * common_subsequence_len(&lhs, &rhs) as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_scores_one() {
        assert_eq!(similarity_ratio("SN7414N", "sn7414n"), 1.0);
    }

    #[test]
    fn disjoint_or_empty_text_scores_zero() {
        assert_eq!(similarity_ratio("", ""), 0.0);
        assert_eq!(similarity_ratio("", "LM745"), 0.0);
        assert_eq!(similarity_ratio("QQQ", "LM745"), 0.0);
    }

    #[test]
    fn single_insertion_is_penalized_by_total_length() {
        // lcs = 5, total = 11
        let ratio = similarity_ratio("LM745", "LM7456");
        assert!((ratio - 10.0 / 11.0).abs() < 1e-12);
    }
}
