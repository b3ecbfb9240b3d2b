//! Batch classification orchestrator.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::aggregate::{self, KeywordSelection};
use super::error::{ClassifyError, Stage};
use super::prepare_documents;
use super::reconcile;
use super::types::{ClassificationResult, ClusteringReport, DocumentAssignment, score_map};
use crate::classification::{Category, TopicClassifier, Verdict, normalize_text};
use crate::clustering::{CLUSTER_COUNT, ClusterAssignment, TfidfMatrix, VectorClusterer};
use crate::observability::metrics::Metrics;

/// オーケストレーターの動作設定。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// `false` の場合、ベクトル化とクラスタリングを行わない。
    pub clustering_enabled: bool,
    pub keywords: KeywordSelection,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            clustering_enabled: true,
            keywords: KeywordSelection::default(),
        }
    }
}

/// 正規化、個別分類、クラスタリング、集約を順に実行する。
///
/// 最終カテゴリは常に個別分類の結果で、クラスタ番号は診断用に添えるだけ。
#[derive(Debug, Clone)]
pub struct ClassificationPipeline {
    classifier: TopicClassifier,
    clusterer: VectorClusterer,
    settings: PipelineSettings,
    metrics: Option<Arc<Metrics>>,
}

impl Default for ClassificationPipeline {
    fn default() -> Self {
        Self::new(
            TopicClassifier::default(),
            VectorClusterer::default(),
            PipelineSettings::default(),
        )
    }
}

impl ClassificationPipeline {
    #[must_use]
    pub fn new(
        classifier: TopicClassifier,
        clusterer: VectorClusterer,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            classifier,
            clusterer,
            settings,
            metrics: None,
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[must_use]
    pub fn classifier(&self) -> &TopicClassifier {
        &self.classifier
    }

    #[must_use]
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// キャンセルなしでバッチを分類する。
    ///
    /// # Errors
    /// 空入力、もしくはクラスタリング段の失敗時にエラーを返す。
    pub fn classify_batch<S: AsRef<str>>(
        &self,
        documents: &[S],
    ) -> Result<ClassificationResult, ClassifyError> {
        self.classify_batch_with_cancel(documents, &CancellationToken::new())
    }

    /// バッチを分類する。トークンはステージの境界ごとに確認する。
    ///
    /// # Errors
    /// 空入力、キャンセル、クラスタリング段の失敗時にエラーを返す。
    pub fn classify_batch_with_cancel<S: AsRef<str>>(
        &self,
        documents: &[S],
        cancel: &CancellationToken,
    ) -> Result<ClassificationResult, ClassifyError> {
        let started = Instant::now();
        if let Some(metrics) = &self.metrics {
            metrics.batches_total.inc();
            metrics.active_batches.inc();
        }

        let outcome = self.run(documents, cancel);

        if let Some(metrics) = &self.metrics {
            metrics.active_batches.dec();
            metrics
                .batch_duration
                .observe(started.elapsed().as_secs_f64());
            match &outcome {
                Ok(result) => metrics.record_result(result),
                Err(ClassifyError::Cancelled { .. }) => metrics.batches_cancelled.inc(),
                Err(_) => metrics.batches_failed.inc(),
            }
        }

        match &outcome {
            Ok(result) => tracing::info!(
                batch_id = %result.batch_id,
                documents = result.document_count(),
                clustering = result.clustering.is_completed(),
                elapsed_ms = started.elapsed().as_millis(),
                "batch classified"
            ),
            Err(error @ ClassifyError::Pipeline(_)) => tracing::error!(
                error = %error,
                kind = error.kind(),
                "batch classification failed"
            ),
            Err(error) => tracing::warn!(
                error = %error,
                kind = error.kind(),
                "batch classification stopped"
            ),
        }
        outcome
    }

    fn run<S: AsRef<str>>(
        &self,
        documents: &[S],
        cancel: &CancellationToken,
    ) -> Result<ClassificationResult, ClassifyError> {
        let documents = prepare_documents(documents);
        if documents.is_empty() {
            return Err(ClassifyError::EmptyInput);
        }
        let batch_id = Uuid::new_v4();
        tracing::debug!(%batch_id, documents = documents.len(), "batch classification started");

        checkpoint(cancel, Stage::Classification)?;
        let normalized: Vec<String> = documents.iter().map(|doc| normalize_text(doc)).collect();
        let verdicts: Vec<Verdict> = normalized
            .iter()
            .map(|text| self.classifier.verdict_normalized(text))
            .collect();

        let clustered = self.cluster(&normalized, &verdicts, cancel)?;

        self.assemble(batch_id, documents, &normalized, verdicts, clustered, cancel)
    }

    /// グループ化とキーワード集約を行い、結果を組み立てる。
    fn assemble(
        &self,
        batch_id: Uuid,
        documents: Vec<String>,
        normalized: &[String],
        verdicts: Vec<Verdict>,
        (clustering, labels): (ClusteringReport, Option<Vec<usize>>),
        cancel: &CancellationToken,
    ) -> Result<ClassificationResult, ClassifyError> {
        checkpoint(cancel, Stage::Aggregation)?;
        let groups = reconcile::group_by_category(&documents, &verdicts);
        let mut normalized_by_category: BTreeMap<Category, Vec<&str>> = BTreeMap::new();
        for (text, verdict) in normalized.iter().zip(&verdicts) {
            normalized_by_category
                .entry(verdict.category)
                .or_default()
                .push(text.as_str());
        }
        let summaries = aggregate::summarize(
            &groups,
            &normalized_by_category,
            self.classifier.dictionary(),
            self.settings.keywords,
        );

        let assignments = documents
            .into_iter()
            .zip(verdicts)
            .enumerate()
            .map(|(index, (text, verdict))| DocumentAssignment {
                index,
                text,
                category: verdict.category,
                scores: score_map(&verdict.scores),
                resolution: verdict.resolution,
                cluster: labels.as_ref().and_then(|labels| labels.get(index).copied()),
            })
            .collect();

        Ok(ClassificationResult {
            batch_id,
            processed_at: Utc::now(),
            assignments,
            groups,
            summaries,
            clustering,
        })
    }

    fn cluster(
        &self,
        normalized: &[String],
        verdicts: &[Verdict],
        cancel: &CancellationToken,
    ) -> Result<(ClusteringReport, Option<Vec<usize>>), ClassifyError> {
        if !self.settings.clustering_enabled {
            return Ok((ClusteringReport::Disabled, None));
        }
        if normalized.len() < CLUSTER_COUNT {
            tracing::warn!(
                documents = normalized.len(),
                "too few documents for clustering, reporting classifier groups only"
            );
            return Ok((
                ClusteringReport::Skipped {
                    reason: format!(
                        "clustering needs at least {CLUSTER_COUNT} documents, got {}",
                        normalized.len()
                    ),
                },
                None,
            ));
        }

        checkpoint(cancel, Stage::Vectorization)?;
        let vectorize_started = Instant::now();
        let matrix = self.clusterer.vectorize(normalized)?;
        if let Some(metrics) = &self.metrics {
            metrics
                .vectorize_duration
                .observe(vectorize_started.elapsed().as_secs_f64());
        }

        self.partition(&matrix, verdicts, cancel)
    }

    fn partition(
        &self,
        matrix: &TfidfMatrix,
        verdicts: &[Verdict],
        cancel: &CancellationToken,
    ) -> Result<(ClusteringReport, Option<Vec<usize>>), ClassifyError> {
        checkpoint(cancel, Stage::Clustering)?;
        let kmeans_started = Instant::now();
        let assignment: ClusterAssignment = self.clusterer.partition(matrix);
        if let Some(metrics) = &self.metrics {
            metrics
                .kmeans_duration
                .observe(kmeans_started.elapsed().as_secs_f64());
        }
        tracing::debug!(
            vocabulary = assignment.vocabulary_size,
            inertia = assignment.inertia,
            iterations = assignment.iterations,
            clusters = assignment.clusters.len(),
            "k-means finished"
        );

        let clusters = reconcile::summarize_clusters(&assignment, verdicts);
        Ok((
            ClusteringReport::Completed {
                clusters,
                inertia: assignment.inertia,
                iterations: assignment.iterations,
                vocabulary_size: assignment.vocabulary_size,
            },
            Some(assignment.labels),
        ))
    }
}

fn checkpoint(cancel: &CancellationToken, stage: Stage) -> Result<(), ClassifyError> {
    if cancel.is_cancelled() {
        tracing::info!(%stage, "classification cancelled");
        return Err(ClassifyError::Cancelled { stage });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::Resolution;

    #[test]
    fn blank_batch_is_rejected() {
        let pipeline = ClassificationPipeline::default();
        let error = pipeline.classify_batch(&["   ", ""]).unwrap_err();
        assert_eq!(error, ClassifyError::EmptyInput);
    }

    #[test]
    fn cancelled_token_stops_before_classification() {
        let pipeline = ClassificationPipeline::default();
        let token = CancellationToken::new();
        token.cancel();
        let error = pipeline
            .classify_batch_with_cancel(&["gol en el estadio"], &token)
            .unwrap_err();
        assert_eq!(
            error,
            ClassifyError::Cancelled {
                stage: Stage::Classification
            }
        );
    }

    fn prepared(raw: &[&str]) -> (Vec<String>, Vec<Verdict>) {
        let classifier = TopicClassifier::default();
        let normalized: Vec<String> = raw.iter().map(|doc| normalize_text(doc)).collect();
        let verdicts = normalized
            .iter()
            .map(|text| classifier.verdict_normalized(text))
            .collect();
        (normalized, verdicts)
    }

    fn cancelled() -> CancellationToken {
        let token = CancellationToken::new();
        token.cancel();
        token
    }

    #[test]
    fn cancelled_token_stops_before_vectorization() {
        let pipeline = ClassificationPipeline::default();
        let (normalized, verdicts) =
            prepared(&["gol en el estadio", "el senado vota la ley", "nuevo chip"]);

        let error = pipeline
            .cluster(&normalized, &verdicts, &cancelled())
            .unwrap_err();
        assert_eq!(
            error,
            ClassifyError::Cancelled {
                stage: Stage::Vectorization
            }
        );
    }

    #[test]
    fn cancelled_token_stops_before_kmeans() {
        let pipeline = ClassificationPipeline::default();
        let (normalized, verdicts) =
            prepared(&["gol en el estadio", "el senado vota la ley", "nuevo chip"]);
        let matrix = pipeline
            .clusterer
            .vectorize(&normalized)
            .expect("vectorized");

        let error = pipeline
            .partition(&matrix, &verdicts, &cancelled())
            .unwrap_err();
        assert_eq!(
            error,
            ClassifyError::Cancelled {
                stage: Stage::Clustering
            }
        );

        let (report, labels) = pipeline
            .partition(&matrix, &verdicts, &CancellationToken::new())
            .expect("partitioned");
        assert!(report.is_completed());
        assert_eq!(labels.as_ref().map(Vec::len), Some(3));
    }

    #[test]
    fn cancelled_token_stops_before_aggregation() {
        let pipeline = ClassificationPipeline::default();
        let raw = ["gol en el estadio", "el senado vota la ley", "nuevo chip"];
        let (normalized, verdicts) = prepared(&raw);
        let documents: Vec<String> = raw.iter().map(ToString::to_string).collect();

        let error = pipeline
            .assemble(
                Uuid::new_v4(),
                documents.clone(),
                &normalized,
                verdicts.clone(),
                (ClusteringReport::Disabled, None),
                &cancelled(),
            )
            .unwrap_err();
        assert_eq!(
            error,
            ClassifyError::Cancelled {
                stage: Stage::Aggregation
            }
        );

        let batch_id = Uuid::new_v4();
        let result = pipeline
            .assemble(
                batch_id,
                documents,
                &normalized,
                verdicts,
                (ClusteringReport::Disabled, None),
                &CancellationToken::new(),
            )
            .expect("assembled");
        assert_eq!(result.batch_id, batch_id);
        assert_eq!(
            result.categories(),
            vec![Category::Sports, Category::Politics, Category::Technology]
        );
    }

    #[test]
    fn small_batches_skip_clustering() {
        let pipeline = ClassificationPipeline::default();
        let result = pipeline
            .classify_batch(&["gol en el estadio", "el senado vota"])
            .expect("classified");
        assert!(matches!(result.clustering, ClusteringReport::Skipped { .. }));
        assert!(result.assignments.iter().all(|a| a.cluster.is_none()));
        assert_eq!(
            result.categories(),
            vec![Category::Sports, Category::Politics]
        );
    }

    #[test]
    fn disabled_clustering_is_reported() {
        let pipeline = ClassificationPipeline::new(
            TopicClassifier::default(),
            VectorClusterer::default(),
            PipelineSettings {
                clustering_enabled: false,
                ..PipelineSettings::default()
            },
        );
        let result = pipeline
            .classify_batch(&["a", "b", "c", "d"])
            .expect("classified");
        assert_eq!(result.clustering, ClusteringReport::Disabled);
        assert_eq!(result.group(Category::Sports).len(), 4);
        assert!(
            result
                .assignments
                .iter()
                .all(|a| a.resolution == Resolution::EnumerationOrder)
        );
    }

    #[test]
    fn documents_are_trimmed_before_classification() {
        let pipeline = ClassificationPipeline::default();
        let result = pipeline
            .classify_batch(&["  nuevo software  ", "", "ley"])
            .expect("classified");
        assert_eq!(result.document_count(), 2);
        assert_eq!(result.assignments[0].text, "nuevo software");
        assert_eq!(result.assignments[1].index, 1);
    }
}
