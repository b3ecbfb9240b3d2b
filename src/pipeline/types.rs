//! Classification result types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::classification::{Category, CategoryScores, Resolution};

/// 1 文書分の最終判定。
#[derive(Debug, Clone, Serialize)]
pub struct DocumentAssignment {
    /// 受理された文書列での位置。
    pub index: usize,
    pub text: String,
    pub category: Category,
    pub scores: BTreeMap<Category, u32>,
    pub resolution: Resolution,
    /// 診断用のクラスタ番号。クラスタリングを実行しなかった場合は `None`。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<usize>,
}

pub(crate) fn score_map(scores: &CategoryScores) -> BTreeMap<Category, u32> {
    Category::ALL
        .into_iter()
        .map(|category| (category, scores.get(category)))
        .collect()
}

/// 文書が 1 件以上あるカテゴリの要約。
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategorySummary {
    pub category: Category,
    pub name: &'static str,
    pub count: usize,
    pub documents: Vec<String>,
    pub keywords: Vec<String>,
    /// `keywords` を `", "` で連結したもの。
    pub keyword_summary: String,
}

/// 空でないクラスタの診断情報。
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClusterSummary {
    pub cluster: usize,
    pub documents: Vec<usize>,
    /// メンバーの最終カテゴリで最も多いもの（同数は列挙順）。
    pub dominant_category: Category,
}

/// クラスタリング段の結果。最終カテゴリには影響しない。
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClusteringReport {
    Completed {
        clusters: Vec<ClusterSummary>,
        inertia: f32,
        iterations: usize,
        vocabulary_size: usize,
    },
    Skipped {
        reason: String,
    },
    Disabled,
}

impl ClusteringReport {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// バッチ全体の分類結果。
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationResult {
    pub batch_id: Uuid,
    pub processed_at: DateTime<Utc>,
    /// 入力順の判定一覧。
    pub assignments: Vec<DocumentAssignment>,
    /// 3 カテゴリすべてを含むグループ（空のカテゴリは空配列）。
    pub groups: BTreeMap<Category, Vec<String>>,
    pub summaries: Vec<CategorySummary>,
    pub clustering: ClusteringReport,
}

impl ClassificationResult {
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.assignments.len()
    }

    /// 入力順のカテゴリ列。
    #[must_use]
    pub fn categories(&self) -> Vec<Category> {
        self.assignments
            .iter()
            .map(|assignment| assignment.category)
            .collect()
    }

    #[must_use]
    pub fn group(&self, category: Category) -> &[String] {
        self.groups.get(&category).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn summary(&self, category: Category) -> Option<&CategorySummary> {
        self.summaries
            .iter()
            .find(|summary| summary.category == category)
    }
}
