use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;

use crate::{
    api,
    classification::{KeywordDictionary, TopicClassifier, load_dictionary},
    clustering::{VectorClusterer, VectorizerSettings, load_stopwords},
    config::Config,
    observability::Telemetry,
    pipeline::{ClassificationPipeline, PipelineSettings},
    util::kmeans::KMeansSettings,
};

#[derive(Clone)]
pub(crate) struct AppState {
    registry: Arc<ComponentRegistry>,
}

pub struct ComponentRegistry {
    config: Arc<Config>,
    telemetry: Telemetry,
    dictionary: Arc<KeywordDictionary>,
    pipeline: Arc<ClassificationPipeline>,
}

impl AppState {
    pub(crate) fn new(registry: ComponentRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub(crate) fn telemetry(&self) -> &Telemetry {
        &self.registry.telemetry
    }

    pub(crate) fn config(&self) -> &Config {
        &self.registry.config
    }

    pub(crate) fn dictionary(&self) -> &KeywordDictionary {
        &self.registry.dictionary
    }

    pub(crate) fn pipeline(&self) -> Arc<ClassificationPipeline> {
        Arc::clone(&self.registry.pipeline)
    }
}

impl ComponentRegistry {
    /// 構成情報と依存をまとめて初期化し、アプリケーションの共有レジストリを構築する。
    ///
    /// # Errors
    /// Telemetry の初期化や辞書・ストップワードの読み込みが失敗した場合はエラーを返す。
    pub fn build(config: Config) -> Result<Self> {
        let telemetry = Telemetry::new(config.log_format())?;
        Self::with_telemetry(config, telemetry)
    }

    /// 初期化済みの Telemetry を使ってレジストリを構築する。
    ///
    /// # Errors
    /// 辞書・ストップワードの読み込みが失敗した場合はエラーを返す。
    pub fn with_telemetry(config: Config, telemetry: Telemetry) -> Result<Self> {
        let config = Arc::new(config);
        let dictionary = load_dictionary(config.keywords_path())
            .context("failed to load keyword dictionary")?;
        let stopwords =
            load_stopwords(config.stopwords_path()).context("failed to load stopword list")?;

        let vectorizer = VectorizerSettings {
            max_features: config.max_features(),
            max_df: config.max_df(),
            ..VectorizerSettings::default()
        };
        let kmeans = KMeansSettings {
            n_init: config.kmeans_restarts(),
            max_iter: config.kmeans_max_iter(),
            seed: config.kmeans_seed(),
            ..KMeansSettings::default()
        };
        let settings = PipelineSettings {
            clustering_enabled: config.clustering_enabled(),
            ..PipelineSettings::default()
        };
        let pipeline = Arc::new(
            ClassificationPipeline::new(
                TopicClassifier::new(Arc::clone(&dictionary)),
                VectorClusterer::new(vectorizer, kmeans, stopwords),
                settings,
            )
            .with_metrics(telemetry.shared_metrics()),
        );
        tracing::info!(
            keywords_path = ?config.keywords_path(),
            stopwords_path = ?config.stopwords_path(),
            clustering_enabled = config.clustering_enabled(),
            "component registry built"
        );

        Ok(Self {
            config,
            telemetry,
            dictionary,
            pipeline,
        })
    }

    #[must_use]
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    #[must_use]
    pub fn pipeline(&self) -> Arc<ClassificationPipeline> {
        Arc::clone(&self.pipeline)
    }
}

pub fn build_router(registry: ComponentRegistry) -> Router {
    let state = AppState::new(registry);
    api::router(state)
}
