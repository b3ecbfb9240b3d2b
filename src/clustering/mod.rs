//! バッチ全体の TF-IDF ベクトルを k-means で 3 群に分ける。
//!
//! ここでの群分けは診断情報であり、最終カテゴリの決定には使われない。
use std::collections::BTreeMap;
use std::sync::Arc;

pub mod stopwords;
pub mod vectorizer;

pub use stopwords::{StopwordList, builtin_stopwords, load_stopwords};
pub use vectorizer::{TfidfMatrix, TfidfVectorizer, VectorizeError, VectorizerSettings};

use crate::util::kmeans::{KMeans, KMeansSettings};

/// 教師なしクラスタ数。
pub const CLUSTER_COUNT: usize = 3;

/// クラスタリングの割り当て結果。
#[derive(Debug, Clone)]
pub struct ClusterAssignment {
    /// 文書ごとのクラスタ番号（`0..CLUSTER_COUNT`）。
    pub labels: Vec<usize>,
    /// メンバーのいるクラスタのみ。値は文書インデックス（昇順）。
    pub clusters: BTreeMap<usize, Vec<usize>>,
    pub inertia: f32,
    pub iterations: usize,
    pub vocabulary_size: usize,
}

impl ClusterAssignment {
    fn from_kmeans(result: KMeans, vocabulary_size: usize) -> Self {
        let mut clusters: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (index, &label) in result.assignments.iter().enumerate() {
            clusters.entry(label).or_default().push(index);
        }
        Self {
            labels: result.assignments,
            clusters,
            inertia: result.inertia,
            iterations: result.iterations,
            vocabulary_size,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VectorClusterer {
    vectorizer: TfidfVectorizer,
    kmeans: KMeansSettings,
}

impl Default for VectorClusterer {
    fn default() -> Self {
        Self::new(
            VectorizerSettings::default(),
            KMeansSettings::default(),
            builtin_stopwords(),
        )
    }
}

impl VectorClusterer {
    /// クラスタ数は常に [`CLUSTER_COUNT`] に固定される。
    #[must_use]
    pub fn new(
        vectorizer: VectorizerSettings,
        kmeans: KMeansSettings,
        stopwords: Arc<StopwordList>,
    ) -> Self {
        Self {
            vectorizer: TfidfVectorizer::new(vectorizer, stopwords),
            kmeans: KMeansSettings {
                k: CLUSTER_COUNT,
                ..kmeans
            },
        }
    }

    #[must_use]
    pub fn kmeans_settings(&self) -> &KMeansSettings {
        &self.kmeans
    }

    /// 正規化済み文書群をベクトル化する。
    ///
    /// # Errors
    /// 語彙が空になった場合に [`VectorizeError`] を返す。
    pub fn vectorize(&self, normalized: &[String]) -> Result<TfidfMatrix, VectorizeError> {
        self.vectorizer.fit_transform(normalized)
    }

    /// ベクトル化済みの行列を分割する。
    #[must_use]
    pub fn partition(&self, matrix: &TfidfMatrix) -> ClusterAssignment {
        let result = KMeans::fit(&matrix.matrix, &self.kmeans);
        ClusterAssignment::from_kmeans(result, matrix.vocabulary_size())
    }

    /// ベクトル化と分割をまとめて行う。
    ///
    /// # Errors
    /// 語彙が空になった場合に [`VectorizeError`] を返す。
    pub fn cluster(&self, normalized: &[String]) -> Result<ClusterAssignment, VectorizeError> {
        let matrix = self.vectorize(normalized)?;
        Ok(self.partition(&matrix))
    }
}
