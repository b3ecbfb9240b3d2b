use axum::{Json, extract::State};
use serde::Serialize;

use crate::app::AppState;
use crate::classification::Category;

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) struct HealthReport {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

/// 辞書は起動時に検証済みなので、読み込まれた語数を添えて常に ready を返す。
pub(crate) async fn ready(State(state): State<AppState>) -> Json<HealthReport> {
    state.telemetry().record_ready_probe();

    let dictionary = state.dictionary();
    let terms: usize = Category::ALL
        .into_iter()
        .map(|category| {
            let set = dictionary.get(category);
            set.general().len() + set.exclusive().len()
        })
        .sum();

    Json(HealthReport {
        status: "ready",
        detail: Some(format!("{} categories, {terms} keywords", Category::COUNT)),
    })
}

pub(crate) async fn live(State(state): State<AppState>) -> Json<HealthReport> {
    state.telemetry().record_live_probe();
    Json(HealthReport {
        status: "live",
        detail: None,
    })
}
