//! 文書単位の判定をカテゴリ別にまとめる。クラスタ番号は判定に使わない。
use std::collections::BTreeMap;

use super::types::ClusterSummary;
use crate::classification::{Category, Verdict};
use crate::clustering::ClusterAssignment;

/// 判定結果をカテゴリごとに入力順のまま集める。3 カテゴリすべてのキーを持つ。
#[must_use]
pub fn group_by_category(documents: &[String], verdicts: &[Verdict]) -> BTreeMap<Category, Vec<String>> {
    let mut groups: BTreeMap<Category, Vec<String>> = Category::ALL
        .into_iter()
        .map(|category| (category, Vec::new()))
        .collect();
    for (document, verdict) in documents.iter().zip(verdicts) {
        groups
            .entry(verdict.category)
            .or_default()
            .push(document.clone());
    }
    groups
}

/// 空でないクラスタごとに、メンバーの最終カテゴリで最も多いものを添える。
#[must_use]
pub fn summarize_clusters(assignment: &ClusterAssignment, verdicts: &[Verdict]) -> Vec<ClusterSummary> {
    assignment
        .clusters
        .iter()
        .map(|(&cluster, members)| {
            let mut tally = [0usize; Category::COUNT];
            for &index in members {
                if let Some(verdict) = verdicts.get(index) {
                    tally[verdict.category.index()] += 1;
                }
            }
            // 同数なら列挙順で先のカテゴリ
            let dominant_category = Category::ALL
                .into_iter()
                .rev()
                .max_by_key(|category| tally[category.index()])
                .unwrap_or(Category::Sports);
            ClusterSummary {
                cluster,
                documents: members.clone(),
                dominant_category,
            }
        })
        .collect()
}
