//! カテゴリ別キーワード集合とスコア計算。
use aho_corasick::AhoCorasick;
use rustc_hash::FxHashSet;

use super::Category;
use super::normalizer::tokens;

/// `general` 集合の一致 1 件あたりの重み。
pub const GENERAL_WEIGHT: u32 = 2;
/// `exclusive` 集合の一致 1 件あたりの重み。
pub const EXCLUSIVE_WEIGHT: u32 = 5;

/// 1 カテゴリ分のキーワード定義。
///
/// `exclusive` はスコアの加重と同点時の決着の両方に使われる。
#[derive(Debug, Clone)]
pub struct KeywordSet {
    general: FxHashSet<String>,
    exclusive: FxHashSet<String>,
    exclusive_matcher: AhoCorasick,
}

impl KeywordSet {
    /// 語の集合から `KeywordSet` を構築する。
    ///
    /// # Errors
    /// 部分一致用のオートマトン構築に失敗した場合にエラーを返す。
    pub fn new<G, E>(general: G, exclusive: E) -> Result<Self, aho_corasick::BuildError>
    where
        G: IntoIterator,
        G::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        let general: FxHashSet<String> = general.into_iter().map(Into::into).collect();
        let exclusive: FxHashSet<String> = exclusive.into_iter().map(Into::into).collect();
        let mut patterns: Vec<&str> = exclusive.iter().map(String::as_str).collect();
        patterns.sort_unstable();
        let exclusive_matcher = AhoCorasick::new(&patterns)?;
        Ok(Self {
            general,
            exclusive,
            exclusive_matcher,
        })
    }

    #[must_use]
    pub fn general(&self) -> &FxHashSet<String> {
        &self.general
    }

    #[must_use]
    pub fn exclusive(&self) -> &FxHashSet<String> {
        &self.exclusive
    }

    /// トークン集合との重み付き一致スコア。
    #[must_use]
    pub fn score_tokens(&self, unique_tokens: &FxHashSet<&str>) -> u32 {
        let general_hits = unique_tokens
            .iter()
            .filter(|token| self.general.contains(**token))
            .count();
        let exclusive_hits = unique_tokens
            .iter()
            .filter(|token| self.exclusive.contains(**token))
            .count();
        to_u32(general_hits) * GENERAL_WEIGHT + to_u32(exclusive_hits) * EXCLUSIVE_WEIGHT
    }

    /// `exclusive` のいずれかが正規化済みテキストに部分文字列として現れるか。
    ///
    /// トークン単位ではなく生の文字列で照合するため、長い語の一部や
    /// 複数語からなる語（`inteligencia artificial`）にも一致する。
    #[must_use]
    pub fn has_exclusive_substring(&self, normalized: &str) -> bool {
        self.exclusive_matcher.is_match(normalized)
    }
}

/// 3 カテゴリ分のキーワード辞書。起動時に一度だけ構築され、以後は不変。
#[derive(Debug, Clone)]
pub struct KeywordDictionary {
    sets: [KeywordSet; Category::COUNT],
}

impl KeywordDictionary {
    #[must_use]
    pub fn new(sports: KeywordSet, politics: KeywordSet, technology: KeywordSet) -> Self {
        Self {
            sets: [sports, politics, technology],
        }
    }

    #[must_use]
    pub fn get(&self, category: Category) -> &KeywordSet {
        &self.sets[category.index()]
    }

    /// いずれかのカテゴリの `general` 集合に含まれるか。
    #[must_use]
    pub fn is_general_term(&self, term: &str) -> bool {
        self.sets.iter().any(|set| set.general.contains(term))
    }

    /// 正規化済みテキストのカテゴリ別スコア。
    ///
    /// 重複トークンは 1 回として数える。
    #[must_use]
    pub fn score(&self, normalized: &str, category: Category) -> u32 {
        let unique = unique_tokens(normalized);
        self.get(category).score_tokens(&unique)
    }

    /// 全カテゴリのスコアを列挙順で返す。
    #[must_use]
    pub fn score_all(&self, normalized: &str) -> CategoryScores {
        let unique = unique_tokens(normalized);
        let mut scores = [0; Category::COUNT];
        for category in Category::ALL {
            scores[category.index()] = self.get(category).score_tokens(&unique);
        }
        CategoryScores(scores)
    }
}

/// カテゴリ列挙順に並んだスコア。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CategoryScores(pub [u32; Category::COUNT]);

impl CategoryScores {
    #[must_use]
    pub fn get(&self, category: Category) -> u32 {
        self.0[category.index()]
    }

    #[must_use]
    pub fn max(&self) -> u32 {
        self.0.iter().copied().max().unwrap_or(0)
    }

    /// 最高スコアに並ぶカテゴリを列挙順で返す。
    #[must_use]
    pub fn leaders(&self) -> Vec<Category> {
        let max = self.max();
        Category::ALL
            .into_iter()
            .filter(|category| self.get(*category) == max)
            .collect()
    }
}

fn unique_tokens(normalized: &str) -> FxHashSet<&str> {
    tokens(normalized).collect()
}

fn to_u32(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_set() -> KeywordSet {
        KeywordSet::new(["gol", "equipo", "partido"], ["gol", "inteligencia artificial"])
            .expect("keyword set")
    }

    #[test]
    fn score_weights_general_and_exclusive_hits() {
        let set = sample_set();
        let unique: FxHashSet<&str> = ["gol", "equipo", "lluvia"].into_iter().collect();
        // gol: general(2) + exclusive(5), equipo: general(2)
        assert_eq!(set.score_tokens(&unique), 9);
    }

    #[test]
    fn repeated_tokens_count_once() {
        let dictionary = KeywordDictionary::new(
            sample_set(),
            KeywordSet::new(Vec::<String>::new(), Vec::<String>::new()).expect("empty"),
            KeywordSet::new(Vec::<String>::new(), Vec::<String>::new()).expect("empty"),
        );
        assert_eq!(
            dictionary.score("gol gol gol", Category::Sports),
            dictionary.score("gol", Category::Sports)
        );
    }

    #[test]
    fn multi_word_terms_never_match_tokens_but_match_substrings() {
        let set = sample_set();
        let text = "la inteligencia artificial avanza";
        let unique: FxHashSet<&str> = tokens(text).collect();
        assert_eq!(set.score_tokens(&unique), 0);
        assert!(set.has_exclusive_substring(text));
    }

    #[test]
    fn substring_check_matches_inside_longer_words() {
        let set = sample_set();
        assert!(set.has_exclusive_substring("un golazo histórico"));
        assert!(!set.has_exclusive_substring("un partido aburrido"));
    }

    #[test]
    fn leaders_preserve_enumeration_order() {
        let scores = CategoryScores([2, 0, 2]);
        assert_eq!(scores.max(), 2);
        assert_eq!(
            scores.leaders(),
            vec![Category::Sports, Category::Technology]
        );
    }
}
