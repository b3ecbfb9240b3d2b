//! 文書バッチの TF-IDF 行列を構築する。
use std::sync::Arc;

use rustc_hash::FxHashMap;
use sprs::{CsMat, TriMat};
use thiserror::Error;

use super::stopwords::StopwordList;
use crate::classification::normalizer::tokens;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VectorizeError {
    #[error("empty vocabulary; perhaps the documents only contain stop words")]
    EmptyVocabulary,
    #[error(
        "after pruning, no terms remain ({candidates} candidate terms, max_df={max_df}, min_df={min_df})"
    )]
    NoTermsRemain {
        candidates: usize,
        max_df: String,
        min_df: usize,
    },
}

/// 語彙の制約。
#[derive(Debug, Clone, PartialEq)]
pub struct VectorizerSettings {
    /// 語彙の上限。コーパス全体の出現回数が多い順に残す。
    pub max_features: usize,
    /// 最低文書頻度。
    pub min_df: usize,
    /// 文書頻度の上限（文書数に対する割合）。これを超える語は除外する。
    pub max_df: f64,
    /// n-gram の範囲（両端を含む）。
    pub ngram_range: (usize, usize),
}

impl Default for VectorizerSettings {
    fn default() -> Self {
        Self {
            max_features: 1000,
            min_df: 1,
            max_df: 0.8,
            ngram_range: (1, 2),
        }
    }
}

/// 行が文書、列が語彙の L2 正規化済み TF-IDF 行列。
#[derive(Debug, Clone)]
pub struct TfidfMatrix {
    pub matrix: CsMat<f32>,
    /// 列番号順（アルファベット順）の語彙。
    pub vocabulary: Vec<String>,
    pub idf: Vec<f32>,
}

impl TfidfMatrix {
    #[must_use]
    pub fn n_documents(&self) -> usize {
        self.matrix.rows()
    }

    #[must_use]
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }
}

#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    settings: VectorizerSettings,
    stopwords: Arc<StopwordList>,
}

impl TfidfVectorizer {
    #[must_use]
    pub fn new(settings: VectorizerSettings, stopwords: Arc<StopwordList>) -> Self {
        Self {
            settings,
            stopwords,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &VectorizerSettings {
        &self.settings
    }

    /// 正規化済みテキストを語（n-gram）の列に分解する。
    ///
    /// 2 文字未満の語とストップワードを除いてから n-gram を組み立てる。
    #[must_use]
    pub fn analyze(&self, normalized: &str) -> Vec<String> {
        let words: Vec<&str> = tokens(normalized)
            .filter(|token| token.chars().count() >= 2)
            .filter(|token| !self.stopwords.contains(token))
            .collect();

        let (min_n, max_n) = self.settings.ngram_range;
        let mut terms = Vec::new();
        for n in min_n.max(1)..=max_n.max(min_n.max(1)) {
            if n > words.len() {
                break;
            }
            terms.extend(words.windows(n).map(|window| window.join(" ")));
        }
        terms
    }

    /// 語彙を学習し、同じ文書群を行列に変換する。
    ///
    /// # Errors
    /// 語が 1 つも得られない場合、もしくは文書頻度の制約ですべての語が
    /// 除外された場合にエラーを返す。
    pub fn fit_transform(&self, documents: &[String]) -> Result<TfidfMatrix, VectorizeError> {
        let n_docs = documents.len();
        let doc_counts: Vec<FxHashMap<String, u32>> = documents
            .iter()
            .map(|doc| {
                let mut counts: FxHashMap<String, u32> = FxHashMap::default();
                for term in self.analyze(doc) {
                    *counts.entry(term).or_insert(0) += 1;
                }
                counts
            })
            .collect();

        let mut doc_freq: FxHashMap<&str, usize> = FxHashMap::default();
        let mut corpus_freq: FxHashMap<&str, u64> = FxHashMap::default();
        for counts in &doc_counts {
            for (term, count) in counts {
                *doc_freq.entry(term.as_str()).or_insert(0) += 1;
                *corpus_freq.entry(term.as_str()).or_insert(0) += u64::from(*count);
            }
        }
        if doc_freq.is_empty() {
            return Err(VectorizeError::EmptyVocabulary);
        }

        #[allow(clippy::cast_precision_loss)]
        let max_doc_count = self.settings.max_df * n_docs as f64;
        let mut kept: Vec<(&str, u64)> = doc_freq
            .iter()
            .filter(|(_, df)| {
                #[allow(clippy::cast_precision_loss)]
                let df_value = **df as f64;
                **df >= self.settings.min_df && df_value <= max_doc_count
            })
            .map(|(term, _)| (*term, corpus_freq.get(term).copied().unwrap_or(0)))
            .collect();
        if kept.is_empty() {
            return Err(VectorizeError::NoTermsRemain {
                candidates: doc_freq.len(),
                max_df: self.settings.max_df.to_string(),
                min_df: self.settings.min_df,
            });
        }

        kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        kept.truncate(self.settings.max_features);
        let mut vocabulary: Vec<String> = kept.iter().map(|(term, _)| (*term).to_string()).collect();
        vocabulary.sort_unstable();

        let vocab_index: FxHashMap<&str, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(idx, term)| (term.as_str(), idx))
            .collect();

        // idf(t) = ln((1 + n) / (1 + df(t))) + 1
        #[allow(clippy::cast_precision_loss)]
        let idf: Vec<f32> = vocabulary
            .iter()
            .map(|term| {
                let df = doc_freq.get(term.as_str()).copied().unwrap_or(0) as f32;
                ((1.0 + n_docs as f32) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        let mut triplets = TriMat::new((n_docs, vocabulary.len()));
        for (row, counts) in doc_counts.iter().enumerate() {
            let weighted: Vec<(usize, f32)> = counts
                .iter()
                .filter_map(|(term, count)| {
                    vocab_index.get(term.as_str()).map(|&col| {
                        #[allow(clippy::cast_precision_loss)]
                        let tf = *count as f32;
                        (col, tf * idf[col])
                    })
                })
                .collect();
            let norm = weighted.iter().map(|(_, value)| value * value).sum::<f32>().sqrt();
            if norm <= 0.0 {
                continue;
            }
            for (col, value) in weighted {
                triplets.add_triplet(row, col, value / norm);
            }
        }
        let matrix: CsMat<f32> = triplets.to_csr();

        tracing::debug!(
            documents = n_docs,
            candidate_terms = doc_freq.len(),
            vocabulary = vocabulary.len(),
            "tfidf matrix built"
        );

        Ok(TfidfMatrix {
            matrix,
            vocabulary,
            idf,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::stopwords::builtin_stopwords;

    fn vectorizer() -> TfidfVectorizer {
        TfidfVectorizer::new(VectorizerSettings::default(), builtin_stopwords())
    }

    fn docs(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn analyze_drops_stopwords_and_builds_bigrams() {
        let terms = vectorizer().analyze("el gobierno aprueba la reforma");
        assert_eq!(
            terms,
            vec![
                "gobierno",
                "aprueba",
                "reforma",
                "gobierno aprueba",
                "aprueba reforma"
            ]
        );
    }

    #[test]
    fn analyze_drops_single_character_tokens() {
        let terms = vectorizer().analyze("x gol z");
        assert_eq!(terms, vec!["gol"]);
    }

    #[test]
    fn terms_in_too_many_documents_are_excluded() {
        let matrix = vectorizer()
            .fit_transform(&docs(&[
                "noticia gol estadio",
                "noticia presidente congreso",
                "noticia software chip",
            ]))
            .expect("matrix");
        assert!(!matrix.vocabulary.iter().any(|term| term == "noticia"));
        assert!(matrix.vocabulary.iter().any(|term| term == "gol estadio"));
        assert_eq!(matrix.n_documents(), 3);
    }

    #[test]
    fn vocabulary_is_sorted_and_capped() {
        let settings = VectorizerSettings {
            max_features: 2,
            ngram_range: (1, 1),
            ..VectorizerSettings::default()
        };
        let matrix = TfidfVectorizer::new(settings, builtin_stopwords())
            .fit_transform(&docs(&["gol gol gol messi", "ley ley senado", "chip"]))
            .expect("matrix");
        assert_eq!(matrix.vocabulary, vec!["gol", "ley"]);
    }

    #[test]
    fn rows_are_unit_length() {
        let matrix = vectorizer()
            .fit_transform(&docs(&["gol estadio portero", "ley senado", "chip software"]))
            .expect("matrix");
        for row in matrix.matrix.outer_iterator() {
            let norm: f32 = row.iter().map(|(_, value)| value * value).sum();
            assert!((norm - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn idf_is_smoothed_and_favours_rare_terms() {
        let matrix = vectorizer()
            .fit_transform(&docs(&["gol estadio", "gol senado", "chip"]))
            .expect("matrix");
        assert_eq!(matrix.idf.len(), matrix.vocabulary_size());

        let idf_of = |term: &str| {
            let col = matrix
                .vocabulary
                .iter()
                .position(|candidate| candidate == term)
                .expect("term in vocabulary");
            matrix.idf[col]
        };
        // ln((1 + 3) / (1 + df)) + 1
        assert!((idf_of("gol") - ((4.0_f32 / 3.0).ln() + 1.0)).abs() < 1e-5);
        assert!((idf_of("chip") - (2.0_f32.ln() + 1.0)).abs() < 1e-5);
        assert!(idf_of("chip") > idf_of("gol"));
    }

    #[test]
    fn only_stopwords_is_an_empty_vocabulary() {
        let error = vectorizer()
            .fit_transform(&docs(&["de la que", "el en y", "los del se"]))
            .expect_err("no terms");
        assert_eq!(error, VectorizeError::EmptyVocabulary);
    }

    #[test]
    fn identical_documents_are_pruned_away() {
        let error = vectorizer()
            .fit_transform(&docs(&["gol estadio", "gol estadio", "gol estadio"]))
            .expect_err("all terms exceed max_df");
        assert!(matches!(error, VectorizeError::NoTermsRemain { .. }));
    }
}
