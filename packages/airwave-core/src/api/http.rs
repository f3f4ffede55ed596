//! HTTP route handlers.

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;

use crate::api::stream::stream_audio;
use crate::api::AppState;
use crate::protocol_constants::SERVICE_ID;

/// Creates the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(stream_audio))
        .route("/stream", get(stream_audio))
        .route("/health", get(health_check))
        .route("/api/status", get(get_status))
        .with_state(state)
}

/// Liveness probe: "Is the process running?"
async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": SERVICE_ID,
    }))
}

/// Current station status: listeners, track, and pacing.
async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let now_playing = state.now_playing.track().and_then(|track| {
        track
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    });

    Json(json!({
        "listeners": state.registry.member_count(),
        "nowPlaying": now_playing,
        "tracksStarted": state.now_playing.tracks_started(),
        "chunksBroadcast": state.now_playing.chunks_broadcast(),
        "chunkSize": state.config.streaming.chunk_size,
        "pacingMs": state.config.streaming.pacing_interval_ms,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::to_bytes;
    use serde_json::Value;

    use crate::state::Config;
    use crate::stream::{ConnectionRegistry, NowPlaying};

    fn test_state() -> AppState {
        let config = Config::default();
        AppState {
            registry: Arc::new(ConnectionRegistry::new(config.streaming.chunk_size)),
            now_playing: Arc::new(NowPlaying::new()),
            config: Arc::new(config),
        }
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_service() {
        let body = json_body(health_check().await.into_response()).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "airwave");
    }

    #[tokio::test]
    async fn status_counts_listeners() {
        let state = test_state();
        let _a = state.registry.connect("a");
        let _b = state.registry.connect("b");

        let body = json_body(get_status(State(state)).await.into_response()).await;
        assert_eq!(body["listeners"], 2);
        assert_eq!(body["nowPlaying"], Value::Null);
        assert_eq!(body["chunkSize"], 4096);
        assert_eq!(body["pacingMs"], 150);
    }
}
