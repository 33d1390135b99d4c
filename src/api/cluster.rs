use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, warn};
use uuid::Uuid;

use crate::{
    app::AppState,
    pipeline::{ClusterParams, RunSummary},
    scheduler::JobContext,
};

/// 手動実行リクエスト。指定が無い項目は設定値を使う。
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RunRequest {
    window_hours: Option<u32>,
    similarity_threshold: Option<u8>,
}

impl RunRequest {
    fn apply(&self, base: ClusterParams) -> ClusterParams {
        let mut params = base;
        if let Some(window_hours) = self.window_hours {
            params = params.with_window_hours(window_hours);
        }
        if let Some(threshold) = self.similarity_threshold {
            params = params.with_similarity_threshold(threshold);
        }
        params
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RunResponse {
    ok: bool,
    run_id: Uuid,
    clusters: usize,
    multi_source: usize,
    scored: usize,
}

impl From<RunSummary> for RunResponse {
    fn from(summary: RunSummary) -> Self {
        Self {
            ok: true,
            run_id: summary.run_id,
            clusters: summary.clusters,
            multi_source: summary.multi_source,
            scored: summary.scored,
        }
    }
}

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({ "ok": false, "error": message.into() })),
    )
        .into_response()
}

fn authorized(headers: &HeaderMap, expected: Option<&str>) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| token.trim() == expected)
}

pub(crate) async fn run_clusters(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !authorized(&headers, state.config().trigger_token()) {
        warn!("rejected cluster run with missing or invalid bearer token");
        return failure(StatusCode::UNAUTHORIZED, "unauthorized");
    }

    let request = if body.iter().all(u8::is_ascii_whitespace) {
        RunRequest::default()
    } else {
        match serde_json::from_slice::<RunRequest>(&body) {
            Ok(request) => request,
            Err(err) => {
                return failure(StatusCode::BAD_REQUEST, format!("invalid request body: {err}"));
            }
        }
    };

    let params = request.apply(state.config().cluster_params());
    if let Err(err) = params.validate() {
        return failure(StatusCode::BAD_REQUEST, err.to_string());
    }

    state.telemetry().record_manual_run_invocation();
    match state
        .scheduler()
        .run_job(JobContext::new(params, "manual"))
        .await
    {
        Ok(summary) => (StatusCode::OK, Json(RunResponse::from(summary))).into_response(),
        Err(err) => {
            let message = format!("{err:#}");
            error!(error = %message, "manual cluster run failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, message)
        }
    }
}
