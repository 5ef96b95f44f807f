//! Bigram name similarity (Sørensen–Dice)

use std::collections::HashMap;

/// 相似度达到该阈值即视为可能重名
pub const SIMILARITY_LIMIT: f64 = 0.64;

/// Dice coefficient over character bigrams, whitespace ignored
///
/// 相同字符串为 1.0；任一字符串不足两个字符为 0.0。
pub fn compare_two_strings(first: &str, second: &str) -> f64 {
    let first: Vec<char> = first.chars().filter(|c| !c.is_whitespace()).collect();
    let second: Vec<char> = second.chars().filter(|c| !c.is_whitespace()).collect();

    if first == second {
        return 1.0;
    }
    if first.len() < 2 || second.len() < 2 {
        return 0.0;
    }

    let mut bigrams: HashMap<(char, char), usize> = HashMap::new();
    for pair in first.windows(2) {
        *bigrams.entry((pair[0], pair[1])).or_default() += 1;
    }

    let mut intersection = 0usize;
    for pair in second.windows(2) {
        if let Some(count) = bigrams.get_mut(&(pair[0], pair[1]))
            && *count > 0
        {
            *count -= 1;
            intersection += 1;
        }
    }

    (2 * intersection) as f64 / (first.len() + second.len() - 2) as f64
}

/// Case-insensitive similarity check against [`SIMILARITY_LIMIT`]
pub fn is_similar(first: &str, second: &str) -> bool {
    compare_two_strings(&first.to_lowercase(), &second.to_lowercase()) >= SIMILARITY_LIMIT
}
