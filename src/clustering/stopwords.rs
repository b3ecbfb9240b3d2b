//! スペイン語ストップワード一覧。
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;
use rustc_hash::FxHashSet;

use crate::classification::normalize_text;

const DEFAULT_STOPWORDS: &str = include_str!("../resources/stopwords_es.txt");

static BUILTIN: Lazy<Arc<StopwordList>> = Lazy::new(|| Arc::new(StopwordList::parse(DEFAULT_STOPWORDS)));

/// ベクトル化の前に取り除く語の集合。
#[derive(Debug, Clone, Default)]
pub struct StopwordList {
    words: FxHashSet<String>,
}

impl StopwordList {
    /// 1 行 1 語の形式を読み取る。空行と `#` で始まる行は無視する。
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let words = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(normalize_text)
            .filter(|word| !word.is_empty())
            .collect();
        Self { words }
    }

    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.words.contains(token)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// 組み込みのスペイン語ストップワード。
#[must_use]
pub fn builtin_stopwords() -> Arc<StopwordList> {
    Arc::clone(&BUILTIN)
}

/// パスが指定されればそのファイルを、なければ組み込み一覧を返す。
///
/// # Errors
/// ファイルを読み込めなかった場合にエラーを返す。
pub fn load_stopwords<P: AsRef<Path>>(path: Option<P>) -> io::Result<Arc<StopwordList>> {
    match path {
        Some(path) => Ok(Arc::new(StopwordList::parse(&fs::read_to_string(path)?))),
        None => Ok(builtin_stopwords()),
    }
}
