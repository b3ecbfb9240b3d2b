//! カテゴリごとの代表キーワード抽出と要約。
use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use super::types::CategorySummary;
use crate::classification::normalizer::tokens;
use crate::classification::{Category, KeywordDictionary};

/// 代表キーワードの抽出条件。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordSelection {
    pub limit: usize,
    /// この文字数以上のトークンだけを残す。
    pub min_chars: usize,
}

impl Default for KeywordSelection {
    fn default() -> Self {
        Self {
            limit: 5,
            min_chars: 4,
        }
    }
}

/// 正規化済みテキスト群から、いずれかのカテゴリの general 語に含まれる
/// トークンを頻度降順で取り出す。同数は先に現れた方が前。
#[must_use]
pub fn representative_keywords<'a, I>(
    normalized: I,
    dictionary: &KeywordDictionary,
    selection: KeywordSelection,
) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut order: Vec<&'a str> = Vec::new();
    let mut counts: FxHashMap<&'a str, usize> = FxHashMap::default();
    for text in normalized {
        for token in tokens(text) {
            let count = counts.entry(token).or_insert_with(|| {
                order.push(token);
                0
            });
            *count += 1;
        }
    }

    let mut candidates: Vec<(&str, usize)> = order
        .into_iter()
        .filter(|token| token.chars().count() >= selection.min_chars)
        .filter(|token| dictionary.is_general_term(token))
        .map(|token| (token, counts.get(token).copied().unwrap_or_default()))
        .collect();
    // 安定ソートなので同数は出現順のまま
    candidates.sort_by(|a, b| b.1.cmp(&a.1));
    candidates
        .into_iter()
        .take(selection.limit)
        .map(|(token, _)| token.to_string())
        .collect()
}

/// 文書が 1 件以上あるカテゴリについて要約を作る。並びは列挙順。
///
/// `normalized` はカテゴリごとの正規化済みテキストで、`groups` と同じ順序。
#[must_use]
pub fn summarize(
    groups: &BTreeMap<Category, Vec<String>>,
    normalized: &BTreeMap<Category, Vec<&str>>,
    dictionary: &KeywordDictionary,
    selection: KeywordSelection,
) -> Vec<CategorySummary> {
    groups
        .iter()
        .filter(|(_, documents)| !documents.is_empty())
        .map(|(&category, documents)| {
            let texts = normalized
                .get(&category)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let keywords =
                representative_keywords(texts.iter().copied(), dictionary, selection);
            CategorySummary {
                category,
                name: category.display_name(),
                count: documents.len(),
                documents: documents.clone(),
                keyword_summary: keywords.join(", "),
                keywords,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::builtin_dictionary;

    #[test]
    fn keeps_only_long_dictionary_terms() {
        let dictionary = builtin_dictionary();
        let keywords = representative_keywords(
            ["el gol del equipo en el estadio", "otro gol y otro partido del equipo"],
            &dictionary,
            KeywordSelection::default(),
        );
        assert_eq!(keywords, vec!["equipo", "estadio", "partido"]);
    }

    #[test]
    fn ties_keep_first_appearance() {
        let dictionary = builtin_dictionary();
        let keywords = representative_keywords(
            ["senado congreso gobierno senado congreso gobierno"],
            &dictionary,
            KeywordSelection::default(),
        );
        assert_eq!(keywords, vec!["senado", "congreso", "gobierno"]);
    }

    #[test]
    fn limit_caps_the_list() {
        let dictionary = builtin_dictionary();
        let keywords = representative_keywords(
            ["equipo estadio partido torneo jugador entrenador liga"],
            &dictionary,
            KeywordSelection {
                limit: 2,
                ..KeywordSelection::default()
            },
        );
        assert_eq!(keywords.len(), 2);
        assert_eq!(keywords[0], "equipo");
    }

    #[test]
    fn summaries_skip_empty_categories() {
        let dictionary = builtin_dictionary();
        let groups = BTreeMap::from([
            (Category::Sports, vec!["Gran partido".to_string()]),
            (Category::Politics, Vec::new()),
            (Category::Technology, Vec::new()),
        ]);
        let normalized = BTreeMap::from([(Category::Sports, vec!["gran partido"])]);
        let summaries = summarize(&groups, &normalized, &dictionary, KeywordSelection::default());

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].name, "Deportes");
        assert_eq!(summaries[0].count, 1);
        assert_eq!(summaries[0].keyword_summary, "partido");
    }
}
