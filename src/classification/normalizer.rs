//! スペイン語ニュース本文の正規化処理。
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static NON_LETTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-záéíóúñ\s]").expect("compile non-letter regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("compile whitespace regex"));

/// テキストを分類用の正規形に変換する。
///
/// 小文字化したうえで、英字・スペイン語のアクセント付き母音・`ñ`・空白以外を
/// 空白に置き換え、連続する空白を 1 つにまとめて前後を除去する。
/// 分解済みのアクセント（`a` + U+0301）は事前に NFC で合成される。
#[must_use]
pub fn normalize_text(input: &str) -> String {
    if input.trim().is_empty() {
        return String::new();
    }
    let composed = input.nfc().collect::<String>().to_lowercase();
    let letters_only = NON_LETTER_RE.replace_all(&composed, " ");
    WHITESPACE_RE
        .replace_all(&letters_only, " ")
        .trim()
        .to_string()
}

/// 正規化済みテキストを空白で分割する。
pub fn tokens(normalized: &str) -> impl Iterator<Item = &str> {
    normalized.split(' ').filter(|token| !token.is_empty())
}
