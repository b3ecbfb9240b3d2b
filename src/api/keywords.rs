use axum::{Json, extract::State};

use crate::app::AppState;
use crate::classification::dictionary::DictionaryFile;

/// 現在有効なキーワード辞書を辞書ファイルと同じ形式で返す。
pub(crate) async fn dictionary(State(state): State<AppState>) -> Json<DictionaryFile> {
    Json(DictionaryFile::from_dictionary(state.dictionary()))
}
