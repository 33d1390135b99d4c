//! Token-sort fuzzy similarity on a 0–100 scale.
//!
//! Both sides are lowercased, every non-alphanumeric character becomes a
//! space, and the resulting words are sorted before comparing, so word order
//! does not matter. The sorted strings are compared with the Indel ratio
//! `2 * lcs / (len_a + len_b)`, i.e. a Levenshtein distance where only
//! insertions and deletions are allowed (a substitution costs 2).

use unicode_normalization::UnicodeNormalization;

/// Canonical comparison key of a text: processed words in sorted order.
#[must_use]
pub fn token_sort_key(text: &str) -> String {
    let processed: String = text
        .nfc()
        .collect::<String>()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let mut tokens: Vec<&str> = processed.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Ratio between two keys produced by [`token_sort_key`].
///
/// An empty key never matches anything, itself included.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn key_ratio(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    let ratio = (2 * lcs_length(&a, &b)) as f64 / total as f64;
    (ratio.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// 最長共通部分列の長さ（2行DP）。
fn lcs_length(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0_usize; b.len() + 1];
    let mut curr = vec![0_usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// 2つのテキストの類似度（0〜100）。語順に依存せず、対称。
#[must_use]
pub fn similarity(a: &str, b: &str) -> u8 {
    key_ratio(&token_sort_key(a), &token_sort_key(b))
}
