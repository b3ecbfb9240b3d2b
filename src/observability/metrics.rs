/// Prometheusメトリクス定義。
use prometheus::{
    Histogram, IntCounter, IntCounterVec, IntGauge, Registry, histogram_opts,
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, register_int_gauge_with_registry,
};
use std::sync::Arc;

use crate::classification::Resolution;
use crate::pipeline::{ClassificationResult, ClusteringReport};

const STAGE_BUCKETS: &[f64] = &[0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0];

/// メトリクスコレクター。
#[derive(Debug, Clone)]
pub struct Metrics {
    // カウンター
    pub batches_total: IntCounter,
    pub batches_failed: IntCounter,
    pub batches_cancelled: IntCounter,
    pub documents_classified: IntCounterVec,
    pub tie_breaks: IntCounterVec,
    pub clustering_skipped: IntCounter,

    // ヒストグラム
    pub batch_duration: Histogram,
    pub vectorize_duration: Histogram,
    pub kmeans_duration: Histogram,

    // ゲージ
    pub active_batches: IntGauge,
}

impl Metrics {
    /// 新しいメトリクスコレクターを作成する。
    pub fn new(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        Ok(Self {
            batches_total: register_int_counter_with_registry!(
                "news_topic_batches_total",
                "Total number of classification batches received",
                registry
            )?,
            batches_failed: register_int_counter_with_registry!(
                "news_topic_batches_failed_total",
                "Number of batches that ended with an error",
                registry
            )?,
            batches_cancelled: register_int_counter_with_registry!(
                "news_topic_batches_cancelled_total",
                "Number of batches cancelled between stages",
                registry
            )?,
            documents_classified: register_int_counter_vec_with_registry!(
                "news_topic_documents_classified_total",
                "Documents classified, by final category",
                &["category"],
                registry
            )?,
            tie_breaks: register_int_counter_vec_with_registry!(
                "news_topic_tie_breaks_total",
                "Score ties resolved, by resolution rule",
                &["resolution"],
                registry
            )?,
            clustering_skipped: register_int_counter_with_registry!(
                "news_topic_clustering_skipped_total",
                "Batches too small to cluster",
                registry
            )?,
            batch_duration: register_histogram_with_registry!(
                histogram_opts!(
                    "news_topic_batch_duration_seconds",
                    "End-to-end batch classification time",
                    STAGE_BUCKETS.to_vec()
                ),
                registry
            )?,
            vectorize_duration: register_histogram_with_registry!(
                histogram_opts!(
                    "news_topic_vectorize_duration_seconds",
                    "TF-IDF vectorization time",
                    STAGE_BUCKETS.to_vec()
                ),
                registry
            )?,
            kmeans_duration: register_histogram_with_registry!(
                histogram_opts!(
                    "news_topic_kmeans_duration_seconds",
                    "k-means clustering time",
                    STAGE_BUCKETS.to_vec()
                ),
                registry
            )?,
            active_batches: register_int_gauge_with_registry!(
                "news_topic_active_batches",
                "Batches currently being classified",
                registry
            )?,
        })
    }

    /// 成功したバッチの内訳を記録する。
    pub fn record_result(&self, result: &ClassificationResult) {
        for assignment in &result.assignments {
            self.documents_classified
                .with_label_values(&[assignment.category.as_str()])
                .inc();
            let rule = match assignment.resolution {
                Resolution::Clear => continue,
                Resolution::ExclusiveTerm => "exclusive_term",
                Resolution::EnumerationOrder => "enumeration_order",
            };
            self.tie_breaks.with_label_values(&[rule]).inc();
        }
        if matches!(result.clustering, ClusteringReport::Skipped { .. }) {
            self.clustering_skipped.inc();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ClassificationPipeline;

    #[test]
    fn records_categories_and_tie_breaks() {
        let registry = Arc::new(Registry::new());
        let metrics = Metrics::new(Arc::clone(&registry)).expect("metrics");
        let result = ClassificationPipeline::default()
            .classify_batch(&["gol en el estadio", "el sistema"])
            .expect("classified");

        metrics.record_result(&result);

        assert_eq!(
            metrics
                .documents_classified
                .with_label_values(&["sports"])
                .get(),
            1
        );
        assert_eq!(
            metrics
                .tie_breaks
                .with_label_values(&["enumeration_order"])
                .get(),
            1
        );
        assert_eq!(metrics.clustering_skipped.get(), 1);
    }

    #[test]
    fn registering_twice_on_one_registry_fails() {
        let registry = Arc::new(Registry::new());
        Metrics::new(Arc::clone(&registry)).expect("first");
        assert!(Metrics::new(registry).is_err());
    }
}
