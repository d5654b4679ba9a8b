use axum::{
    Json,
    extract::{Multipart, Query, State},
    http::StatusCode,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::{
    session,
    web::{
        AppState, auth,
        responses::{ApiError, json_error, snapshot_response, status_for},
        uploads::read_candidates,
    },
    workflow::{Completion, SelectionSource, WorkflowSnapshot},
};

type ApiResult = Result<(StatusCode, Json<WorkflowSnapshot>), ApiError>;

#[derive(Debug, Default, Deserialize)]
pub struct SelectionQuery {
    #[serde(default)]
    pub source: SelectionSource,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DragEvent {
    Enter,
    Over,
    Leave,
}

#[derive(Debug, Deserialize)]
pub struct DragRequest {
    pub event: DragEvent,
}

#[derive(Debug, Deserialize)]
pub struct CopyRequest {
    pub url: String,
}

pub async fn get_state(State(state): State<AppState>, jar: CookieJar) -> ApiResult {
    let session = auth::require_session(&state, &jar).await?;
    let guard = session.lock().await;
    let workflow = guard.workflow().ok_or_else(auth::unauthorized)?;
    Ok(snapshot_response(StatusCode::OK, workflow))
}

pub async fn select_files(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<SelectionQuery>,
    mut multipart: Multipart,
) -> ApiResult {
    let session = auth::require_session(&state, &jar).await?;
    let candidates = read_candidates(&mut multipart)
        .await
        .map_err(|err| json_error(err.status(), err.message()))?;

    let mut guard = session.lock().await;
    let workflow = guard.workflow_mut().ok_or_else(auth::unauthorized)?;
    let received = candidates.len();
    let outcome = match query.source {
        SelectionSource::Picker => workflow.select_files(candidates).map(<[_]>::len),
        SelectionSource::Drop => workflow.drop_files(candidates).map(<[_]>::len),
    };

    match outcome {
        Ok(staged) => {
            info!(received, staged, source = ?query.source, "selection staged");
            Ok(snapshot_response(StatusCode::OK, workflow))
        }
        Err(err) => {
            warn!(received, source = ?query.source, %err, "selection rejected");
            Ok(snapshot_response(status_for(&err), workflow))
        }
    }
}

pub async fn drag(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<DragRequest>,
) -> ApiResult {
    let session = auth::require_session(&state, &jar).await?;
    let mut guard = session.lock().await;
    let workflow = guard.workflow_mut().ok_or_else(auth::unauthorized)?;

    match request.event {
        DragEvent::Enter => workflow.drag_enter(),
        DragEvent::Over => workflow.drag_over(),
        DragEvent::Leave => workflow.drag_leave(),
    }

    Ok(snapshot_response(StatusCode::OK, workflow))
}

pub async fn reset_selection(State(state): State<AppState>, jar: CookieJar) -> ApiResult {
    let session = auth::require_session(&state, &jar).await?;
    let mut guard = session.lock().await;
    let workflow = guard.workflow_mut().ok_or_else(auth::unauthorized)?;
    workflow.reset();
    Ok(snapshot_response(StatusCode::OK, workflow))
}

/// Starts the staged batch and waits for it.
///
/// The transfers run on a detached task, so the batch still completes when
/// this request is dropped; the script then sees the outcome in `/api/state`.
pub async fn start_upload(State(state): State<AppState>, jar: CookieJar) -> ApiResult {
    let session = auth::require_session(&state, &jar).await?;

    let batch = {
        let mut guard = session.lock().await;
        let workflow = guard.workflow_mut().ok_or_else(auth::unauthorized)?;
        match workflow.begin_upload() {
            Ok(Some(batch)) => batch,
            Ok(None) => return Ok(snapshot_response(StatusCode::CONFLICT, workflow)),
            Err(err) => return Ok(snapshot_response(status_for(&err), workflow)),
        }
    };

    info!(batch = batch.id(), files = batch.file_count(), "upload started");
    let completion = session::spawn_batch(session.clone(), state.store(), batch)
        .await
        .map_err(|err| {
            error!(?err, "upload task did not complete");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Upload task failed")
        })?;

    let status = match completion {
        Completion::Published(_) => StatusCode::OK,
        Completion::Failed => StatusCode::BAD_GATEWAY,
        Completion::Discarded => StatusCode::CONFLICT,
    };

    let guard = session.lock().await;
    let workflow = guard.workflow().ok_or_else(auth::unauthorized)?;
    Ok(snapshot_response(status, workflow))
}

/// Copies one of the published URLs; the outcome travels in the snapshot.
pub async fn copy_url(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<CopyRequest>,
) -> ApiResult {
    let session = auth::require_session(&state, &jar).await?;
    let mut guard = session.lock().await;
    let workflow = guard.workflow_mut().ok_or_else(auth::unauthorized)?;

    if !workflow.results().iter().any(|result| result.url == request.url) {
        return Err(json_error(StatusCode::NOT_FOUND, "Unknown result URL"));
    }

    // Failure is already recorded on the workflow and logged there.
    let _ = workflow.copy_result_url(&request.url, state.clipboard());
    Ok(snapshot_response(StatusCode::OK, workflow))
}
