use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use tracing::info;

use crate::adapters::http::state::HttpState;

pub async fn get_config(State(st): State<HttpState>) -> impl IntoResponse {
    Json(json!({
        "config": &*st.config,
        "warning_distances": st.config.warning_distances(),
    }))
}

pub async fn stop(State(st): State<HttpState>) -> impl IntoResponse {
    info!("🛑 Parada solicitada desde el dashboard");
    st.cancel.cancel();
    Json(json!({ "ok": true }))
}
