//! Title canonicalisation before fuzzy matching.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Editorial markers stripped from the head of a title. Matched after
/// lowercasing, so the alternation is lowercase only.
static EDITORIAL_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:breaking|watch|live|update|exclusive|opinion|analysis|última hora|último minuto|en vivo|en directo|urgente|opinión|análisis|exclusiva):\s*",
    )
    .expect("compile editorial prefix pattern")
});

/// タイトルを比較用に正規化する。
///
/// 小文字化（Unicode 全体のケースマッピング、アクセント付き大文字も含む）と NFC 合成を行い、
/// 空白の連続を1つにまとめてから、先頭の編集マーカー（`BREAKING:`、`EN VIVO:` など）を
/// 残らなくなるまで取り除く。どんな入力でも失敗せず、冪等。
#[must_use]
pub fn normalize_title(title: &str) -> String {
    let folded: String = title.to_lowercase().nfc().collect();
    let mut normalized = folded.split_whitespace().collect::<Vec<_>>().join(" ");

    while let Some(marker) = EDITORIAL_PREFIX.find(&normalized) {
        normalized = normalized[marker.end()..].to_string();
    }

    normalized
}
