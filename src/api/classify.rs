use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::{
    app::AppState,
    pipeline::{ClassifyError, prepare_documents, split_lines},
};

/// `documents` と `text`（1 行 1 文書）のどちらか一方を受け付ける。
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ClassifyRequest {
    #[serde(default)]
    documents: Option<Vec<String>>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    kind: &'static str,
}

fn error_body(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Response {
    let body = Json(ErrorResponse {
        error: message.into(),
        kind,
    });
    (status, body).into_response()
}

fn status_for(error: &ClassifyError) -> StatusCode {
    match error {
        ClassifyError::EmptyInput => StatusCode::BAD_REQUEST,
        ClassifyError::InsufficientData { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ClassifyError::TooManyDocuments { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        ClassifyError::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
        ClassifyError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn classify_error_response(error: &ClassifyError) -> Response {
    error_body(status_for(error), error.kind(), error.to_string())
}

impl ClassifyRequest {
    fn into_documents(self) -> Result<Vec<String>, Response> {
        match (self.documents, self.text) {
            (Some(documents), None) => Ok(prepare_documents(&documents)),
            (None, Some(text)) => Ok(split_lines(&text)),
            (Some(_), Some(_)) => Err(error_body(
                StatusCode::BAD_REQUEST,
                "input",
                "provide either `documents` or `text`, not both",
            )),
            (None, None) => Err(error_body(
                StatusCode::BAD_REQUEST,
                "input",
                "request body must include `documents` or `text`",
            )),
        }
    }
}

/// 件数の上下限を確認してから、ブロッキングプールでバッチを分類する。
///
/// タイムアウトした場合やクライアントが切断した場合はトークンをキャンセルし、
/// パイプラインは次のステージ境界で止まる。
pub(crate) async fn classify(
    State(state): State<AppState>,
    payload: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return error_body(StatusCode::BAD_REQUEST, "input", rejection.body_text());
        }
    };
    let documents = match payload.into_documents() {
        Ok(documents) => documents,
        Err(response) => return response,
    };

    let config = state.config();
    if documents.is_empty() {
        return classify_error_response(&ClassifyError::EmptyInput);
    }
    if documents.len() < config.min_documents() {
        return classify_error_response(&ClassifyError::InsufficientData {
            required: config.min_documents(),
            actual: documents.len(),
        });
    }
    if documents.len() > config.max_documents() {
        return classify_error_response(&ClassifyError::TooManyDocuments {
            limit: config.max_documents(),
            actual: documents.len(),
        });
    }

    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();
    let worker_token = token.clone();
    let pipeline = state.pipeline();
    let task = tokio::task::spawn_blocking(move || {
        pipeline.classify_batch_with_cancel(&documents, &worker_token)
    });

    let timeout = config.request_timeout();
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(Ok(result))) => (StatusCode::OK, Json(result)).into_response(),
        Ok(Ok(Err(error))) => {
            if matches!(error, ClassifyError::Pipeline(_)) {
                error!(error = %error, "classification pipeline failed");
            }
            classify_error_response(&error)
        }
        Ok(Err(join_error)) => {
            error!(error = %join_error, "classification task aborted");
            error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                "classification task aborted",
            )
        }
        Err(_) => {
            token.cancel();
            warn!(timeout_ms = timeout.as_millis(), "classification timed out");
            error_body(
                StatusCode::GATEWAY_TIMEOUT,
                "timeout",
                format!("classification exceeded {} ms", timeout.as_millis()),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{body::Body, http::Request, http::StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::{
        analysis::synthetic_documents,
        app::{ComponentRegistry, build_router},
        config::Config,
        observability::Telemetry,
    };

    fn app(config: Config) -> axum::Router {
        let telemetry = Telemetry::without_tracing().expect("telemetry");
        let registry = ComponentRegistry::with_telemetry(config, telemetry).expect("registry builds");
        build_router(registry)
    }

    async fn post(app: axum::Router, body: String) -> (StatusCode, Value) {
        let request = Request::post("/v1/classify")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .expect("request builds");
        let response = app.oneshot(request).await.expect("request succeeds");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let payload = serde_json::from_slice(&bytes).expect("valid json");
        (status, payload)
    }

    #[tokio::test]
    async fn classifies_documents_array() {
        let body = json!({
            "documents": [
                "El Barcelona ganó 3-0 contra el Real Madrid",
                "El presidente anunció nuevas medidas económicas",
                "Google presenta avances en computación cuántica",
            ]
        });
        let (status, payload) = post(app(Config::default()), body.to_string()).await;

        assert_eq!(status, StatusCode::OK);
        let categories: Vec<&str> = payload["assignments"]
            .as_array()
            .expect("assignments")
            .iter()
            .map(|a| a["category"].as_str().expect("category"))
            .collect();
        assert_eq!(categories, vec!["sports", "politics", "technology"]);
        assert_eq!(payload["groups"]["politics"].as_array().map(Vec::len), Some(1));
        assert_eq!(payload["clustering"]["status"], "completed");
    }

    #[tokio::test]
    async fn classifies_line_separated_text() {
        let body = json!({ "text": "gol en el estadio\n\nel senado vota\nnuevo software libre\n" });
        let (status, payload) = post(app(Config::default()), body.to_string()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["assignments"].as_array().map(Vec::len), Some(3));
        assert_eq!(payload["summaries"][0]["name"], "Deportes");
    }

    #[tokio::test]
    async fn too_few_documents_is_unprocessable() {
        let body = json!({ "documents": ["gol", "   ", "senado"] });
        let (status, payload) = post(app(Config::default()), body.to_string()).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(payload["kind"], "insufficient_data");
    }

    #[tokio::test]
    async fn blank_batch_is_bad_request() {
        let body = json!({ "text": "\n  \n" });
        let (status, payload) = post(app(Config::default()), body.to_string()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload["kind"], "input");
    }

    #[tokio::test]
    async fn ambiguous_or_malformed_bodies_are_rejected() {
        let both = json!({ "documents": ["a"], "text": "b" });
        let (status, _) = post(app(Config::default()), both.to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, payload) = post(app(Config::default()), "{not json".to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload["kind"], "input");
    }

    #[tokio::test]
    async fn oversized_batches_are_rejected() {
        let config = Config::default().with_document_limits(1, 2);
        let body = json!({ "documents": ["a", "b", "c"] });
        let (status, payload) = post(app(config), body.to_string()).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(payload["kind"], "too_many_documents");
    }

    #[tokio::test]
    async fn slow_batches_time_out() {
        let config = Config::default().with_request_timeout(Duration::from_millis(1));
        let body = json!({ "documents": synthetic_documents(3000) });
        let (status, payload) = post(app(config), body.to_string()).await;

        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(payload["kind"], "timeout");
    }
}
