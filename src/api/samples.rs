use axum::Json;
use serde::Serialize;

use crate::analysis::sample_documents;

#[derive(Debug, Serialize)]
pub(crate) struct SamplesResponse {
    documents: Vec<String>,
    /// `/v1/classify` の `text` にそのまま渡せる形。
    text: String,
}

pub(crate) async fn list() -> Json<SamplesResponse> {
    let documents = sample_documents();
    let text = documents.join("\n");
    Json(SamplesResponse { documents, text })
}
