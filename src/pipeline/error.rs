//! 分類パイプラインのエラー分類。
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::clustering::VectorizeError;

/// キャンセルを確認するステージ境界。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Classification,
    Vectorization,
    Clustering,
    Aggregation,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Classification => "classification",
            Self::Vectorization => "vectorization",
            Self::Clustering => "clustering",
            Self::Aggregation => "aggregation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    /// バッチが空、もしくはすべての行が空白だった。
    #[error("no documents to classify: the batch is empty or every line is blank")]
    EmptyInput,
    /// 呼び出し側が要求する最小件数に届かない。
    #[error("at least {required} documents are required, got {actual}")]
    InsufficientData { required: usize, actual: usize },
    #[error("batch of {actual} documents exceeds the limit of {limit}")]
    TooManyDocuments { limit: usize, actual: usize },
    #[error("classification cancelled before {stage}")]
    Cancelled { stage: Stage },
    /// ベクトル化・クラスタリング中の失敗。部分的な結果は返さない。
    #[error("clustering pipeline failed: {0}")]
    Pipeline(String),
}

impl ClassifyError {
    /// API やメトリクスで使う短い識別子。
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::EmptyInput => "input",
            Self::InsufficientData { .. } => "insufficient_data",
            Self::TooManyDocuments { .. } => "too_many_documents",
            Self::Cancelled { .. } => "cancelled",
            Self::Pipeline(_) => "pipeline",
        }
    }
}

impl From<VectorizeError> for ClassifyError {
    fn from(error: VectorizeError) -> Self {
        Self::Pipeline(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vectorize_errors_become_pipeline_errors() {
        let error: ClassifyError = VectorizeError::EmptyVocabulary.into();
        assert_eq!(error.kind(), "pipeline");
        assert!(error.to_string().contains("empty vocabulary"));
    }

    #[test]
    fn cancelled_message_names_the_stage() {
        let error = ClassifyError::Cancelled {
            stage: Stage::Clustering,
        };
        assert_eq!(
            error.to_string(),
            "classification cancelled before clustering"
        );
    }
}
