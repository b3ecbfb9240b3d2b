//! JSON で定義されたキーワード辞書の読み込みと検証。
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Category;
use super::keywords::{KeywordDictionary, KeywordSet};

const DEFAULT_DICTIONARY_JSON: &str = include_str!("../resources/keyword_dictionary.json");

static BUILTIN: Lazy<Arc<KeywordDictionary>> = Lazy::new(|| {
    let file: DictionaryFile =
        serde_json::from_str(DEFAULT_DICTIONARY_JSON).expect("embedded keyword dictionary parses");
    Arc::new(
        file.into_dictionary()
            .expect("embedded keyword dictionary is valid"),
    )
});

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("failed to read keyword dictionary from {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse keyword dictionary json")]
    Parse(#[from] serde_json::Error),
    #[error("invalid term {term:?} in {category} {set} keywords: {reason}")]
    InvalidTerm {
        category: &'static str,
        set: &'static str,
        term: String,
        reason: &'static str,
    },
    #[error("{category} has no keywords at all")]
    EmptyCategory { category: &'static str },
    #[error("failed to build keyword matcher")]
    Matcher(#[from] aho_corasick::BuildError),
}

/// 辞書ファイル 1 カテゴリ分の定義。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct KeywordSetFile {
    pub general: Vec<String>,
    #[serde(default)]
    pub exclusive: Vec<String>,
}

/// 辞書ファイルの全体構造。3 カテゴリすべてが必須。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DictionaryFile {
    pub sports: KeywordSetFile,
    pub politics: KeywordSetFile,
    pub technology: KeywordSetFile,
}

impl DictionaryFile {
    fn get(&self, category: Category) -> &KeywordSetFile {
        match category {
            Category::Sports => &self.sports,
            Category::Politics => &self.politics,
            Category::Technology => &self.technology,
        }
    }

    fn validate(&self) -> Result<(), DictionaryError> {
        for category in Category::ALL {
            let set = self.get(category);
            if set.general.is_empty() && set.exclusive.is_empty() {
                return Err(DictionaryError::EmptyCategory {
                    category: category.as_str(),
                });
            }
            for (name, terms) in [("general", &set.general), ("exclusive", &set.exclusive)] {
                for term in terms {
                    if let Some(reason) = term_problem(term) {
                        return Err(DictionaryError::InvalidTerm {
                            category: category.as_str(),
                            set: name,
                            term: term.clone(),
                            reason,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// 検証したうえで実行時の辞書に変換する。
    ///
    /// # Errors
    /// 空の語や大文字を含む語がある場合、もしくは照合器の構築に失敗した場合にエラーを返す。
    pub fn into_dictionary(self) -> Result<KeywordDictionary, DictionaryError> {
        self.validate()?;
        let build = |set: KeywordSetFile| KeywordSet::new(set.general, set.exclusive);
        Ok(KeywordDictionary::new(
            build(self.sports)?,
            build(self.politics)?,
            build(self.technology)?,
        ))
    }

    /// 実行中の辞書から書き出し用の構造を再構成する（語はソート済み）。
    #[must_use]
    pub fn from_dictionary(dictionary: &KeywordDictionary) -> Self {
        let export = |category: Category| {
            let set = dictionary.get(category);
            let mut general: Vec<String> = set.general().iter().cloned().collect();
            let mut exclusive: Vec<String> = set.exclusive().iter().cloned().collect();
            general.sort_unstable();
            exclusive.sort_unstable();
            KeywordSetFile { general, exclusive }
        };
        Self {
            sports: export(Category::Sports),
            politics: export(Category::Politics),
            technology: export(Category::Technology),
        }
    }
}

fn term_problem(term: &str) -> Option<&'static str> {
    if term.trim().is_empty() {
        return Some("term is blank");
    }
    if term.trim() != term {
        return Some("term has surrounding whitespace");
    }
    if term.to_lowercase() != term {
        return Some("term must be lowercase");
    }
    None
}

/// 組み込み辞書への共有参照を返す。
#[must_use]
pub fn builtin_dictionary() -> Arc<KeywordDictionary> {
    Arc::clone(&BUILTIN)
}

/// パスが指定されればそのファイルを、なければ組み込み辞書を読み込む。
///
/// # Errors
/// ファイルの読み込み・パース・検証のいずれかに失敗した場合にエラーを返す。
pub fn load_dictionary<P: AsRef<Path>>(
    path: Option<P>,
) -> Result<Arc<KeywordDictionary>, DictionaryError> {
    let Some(path) = path else {
        return Ok(builtin_dictionary());
    };
    let raw = fs::read_to_string(path.as_ref()).map_err(|source| DictionaryError::Read {
        path: path.as_ref().to_path_buf(),
        source,
    })?;
    let file: DictionaryFile = serde_json::from_str(&raw)?;
    Ok(Arc::new(file.into_dictionary()?))
}
