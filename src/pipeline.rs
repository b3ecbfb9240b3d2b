//! 見出しバッチの分類パイプライン。
pub mod aggregate;
pub mod error;
pub mod orchestrator;
pub mod reconcile;
pub mod types;

pub use aggregate::KeywordSelection;
pub use error::{ClassifyError, Stage};
pub use orchestrator::{ClassificationPipeline, PipelineSettings};
pub use types::{
    CategorySummary, ClassificationResult, ClusterSummary, ClusteringReport, DocumentAssignment,
};

/// 前後の空白を除き、空になった文書を捨てる。順序は保つ。
#[must_use]
pub fn prepare_documents<S: AsRef<str>>(documents: &[S]) -> Vec<String> {
    documents
        .iter()
        .map(|doc| doc.as_ref().trim())
        .filter(|doc| !doc.is_empty())
        .map(str::to_string)
        .collect()
}

/// 1 行 1 文書のテキストを文書列に分割する。
#[must_use]
pub fn split_lines(text: &str) -> Vec<String> {
    prepare_documents(&text.lines().collect::<Vec<_>>())
}
