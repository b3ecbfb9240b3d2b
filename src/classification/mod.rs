//! ニュース見出しのトピック分類のための高水準API。
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub mod dictionary;
pub mod keywords;
pub mod normalizer;

pub use dictionary::{DictionaryError, builtin_dictionary, load_dictionary};
pub use keywords::{CategoryScores, KeywordDictionary, KeywordSet};
pub use normalizer::normalize_text;

/// 固定の分類カテゴリ。宣言順が同点時のフォールバック順になる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Sports,
    Politics,
    Technology,
}

impl Category {
    pub const COUNT: usize = 3;
    pub const ALL: [Category; Self::COUNT] =
        [Category::Sports, Category::Politics, Category::Technology];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Sports => 0,
            Self::Politics => 1,
            Self::Technology => 2,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sports => "sports",
            Self::Politics => "politics",
            Self::Technology => "technology",
        }
    }

    /// 画面表示用のラベル。
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Sports => "Deportes",
            Self::Politics => "Política",
            Self::Technology => "Tecnología",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 判定がどの段階で決まったか。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// 最高スコアのカテゴリが 1 つだけだった。
    Clear,
    /// 同点候補のうち exclusive 語を含むカテゴリが選ばれた。
    ExclusiveTerm,
    /// 同点を崩せず列挙順の先頭が選ばれた。
    EnumerationOrder,
}

/// 1 文書分の分類結果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub category: Category,
    pub scores: CategoryScores,
    pub resolution: Resolution,
}

/// 文書単位のキーワード分類器。辞書は共有参照で保持し変更しない。
#[derive(Debug, Clone)]
pub struct TopicClassifier {
    dictionary: Arc<KeywordDictionary>,
}

impl Default for TopicClassifier {
    fn default() -> Self {
        Self::new(builtin_dictionary())
    }
}

impl TopicClassifier {
    #[must_use]
    pub fn new(dictionary: Arc<KeywordDictionary>) -> Self {
        Self { dictionary }
    }

    #[must_use]
    pub fn dictionary(&self) -> &KeywordDictionary {
        &self.dictionary
    }

    #[must_use]
    pub fn shared_dictionary(&self) -> Arc<KeywordDictionary> {
        Arc::clone(&self.dictionary)
    }

    /// 生テキストを分類する。必ずいずれか 1 つのカテゴリを返す。
    #[must_use]
    pub fn classify(&self, document: &str) -> Category {
        self.verdict(document).category
    }

    /// 生テキストを正規化してから判定する。
    #[must_use]
    pub fn verdict(&self, document: &str) -> Verdict {
        self.verdict_normalized(&normalize_text(document))
    }

    /// 正規化済みテキストを判定する。
    ///
    /// 最高スコアが単独ならそのカテゴリ。同点なら列挙順に候補を見て、
    /// exclusive 語が部分文字列として現れる最初のカテゴリ。
    /// それもなければ候補の先頭（キーワードが 1 つもない文書は `Sports`）。
    #[must_use]
    pub fn verdict_normalized(&self, normalized: &str) -> Verdict {
        let scores = self.dictionary.score_all(normalized);
        let candidates = scores.leaders();

        if let [only] = candidates.as_slice() {
            return Verdict {
                category: *only,
                scores,
                resolution: Resolution::Clear,
            };
        }

        if let Some(category) = candidates.iter().copied().find(|candidate| {
            self.dictionary
                .get(*candidate)
                .has_exclusive_substring(normalized)
        }) {
            return Verdict {
                category,
                scores,
                resolution: Resolution::ExclusiveTerm,
            };
        }

        Verdict {
            category: candidates.first().copied().unwrap_or(Category::Sports),
            scores,
            resolution: Resolution::EnumerationOrder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> TopicClassifier {
        TopicClassifier::default()
    }

    #[test]
    fn category_order_is_fixed() {
        assert_eq!(
            Category::ALL,
            [Category::Sports, Category::Politics, Category::Technology]
        );
        for (position, category) in Category::ALL.iter().enumerate() {
            assert_eq!(category.index(), position);
        }
        assert!(Category::Sports < Category::Technology);
    }

    #[test]
    fn category_serializes_in_snake_case() {
        let json = serde_json::to_string(&Category::Technology).expect("serialize");
        assert_eq!(json, "\"technology\"");
        assert_eq!(Category::Politics.display_name(), "Política");
    }

    #[test]
    fn clear_winner_is_resolved_directly() {
        let verdict = classifier().verdict("El presidente anunció nuevas medidas económicas");
        assert_eq!(verdict.category, Category::Politics);
        assert_eq!(verdict.resolution, Resolution::Clear);
        // presidente(2+5) + medidas(2) + económicas(2)
        assert_eq!(verdict.scores.get(Category::Politics), 11);
    }

    #[test]
    fn no_keywords_falls_back_to_sports() {
        let verdict = classifier().verdict("the weather is nice today");
        assert_eq!(verdict.category, Category::Sports);
        assert_eq!(verdict.resolution, Resolution::EnumerationOrder);
        assert_eq!(verdict.scores, CategoryScores([0, 0, 0]));
    }

    #[test]
    fn tie_is_broken_by_exclusive_substring() {
        // "sistema" puntúa 2 en política y tecnología; "algoritmos" contiene "algoritmo"
        let verdict = classifier().verdict("nuevo sistema de algoritmos");
        assert_eq!(verdict.scores.get(Category::Politics), 2);
        assert_eq!(verdict.scores.get(Category::Technology), 2);
        assert_eq!(verdict.category, Category::Technology);
        assert_eq!(verdict.resolution, Resolution::ExclusiveTerm);
    }

    #[test]
    fn tie_without_exclusive_terms_uses_enumeration_order() {
        let verdict = classifier().verdict("el sistema");
        assert_eq!(verdict.category, Category::Politics);
        assert_eq!(verdict.resolution, Resolution::EnumerationOrder);
    }

    #[test]
    fn multi_word_exclusive_term_breaks_tie() {
        // 技術側は inteligencia + artificial で 4 点、スポーツ側は equipo + partido で 4 点
        let verdict = classifier().verdict("El equipo del partido usa inteligencia artificial");
        assert_eq!(verdict.scores.get(Category::Sports), 4);
        assert_eq!(verdict.scores.get(Category::Technology), 4);
        assert_eq!(verdict.category, Category::Technology);
    }
}
