//! On-demand trigger endpoint — POST /scheduler/run?command=<name>.
//!
//! A 200 only acknowledges that the request entered the dispatch loop's
//! queue, not that the task ran: unknown names are accepted here and then
//! logged-and-dropped by the loop, asynchronously. A missing or empty name
//! is the one thing rejected synchronously.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::app::AppState;

#[derive(Debug, Deserialize)]
pub struct TriggerParams {
    #[serde(default)]
    pub command: String,
}

pub async fn trigger_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TriggerParams>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let name = params.command.trim();
    if name.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "command name missing from request"})),
        ));
    }

    state.trigger_tx.try_send(name.to_string()).map_err(|e| {
        warn!(task = %name, error = %e, "trigger queue unavailable");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "trigger queue unavailable"})),
        )
    })?;

    info!(task = %name, "trigger accepted");
    Ok(Json(json!({"ok": true, "task": name})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn state_with_channel(cap: usize) -> (Arc<AppState>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(cap);
        (Arc::new(AppState::new(tx)), rx)
    }

    #[tokio::test]
    async fn empty_command_is_rejected() {
        let (state, _rx) = state_with_channel(1);
        let params = TriggerParams {
            command: "  ".to_string(),
        };
        let err = trigger_handler(State(state), Query(params))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn named_command_is_enqueued() {
        let (state, mut rx) = state_with_channel(1);
        let params = TriggerParams {
            command: "importer".to_string(),
        };
        trigger_handler(State(state), Query(params)).await.unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("importer"));
    }

    #[tokio::test]
    async fn unknown_names_are_still_accepted() {
        // Lookup happens in the dispatch loop; the boundary only enqueues.
        let (state, mut rx) = state_with_channel(1);
        let params = TriggerParams {
            command: "no-such-task".to_string(),
        };
        trigger_handler(State(state), Query(params)).await.unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("no-such-task"));
    }
}
