use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::InterviewError,
    extractors::AppJson,
    handlers::ApiError,
    models::{QuestionResponse, SessionView, SubmitCodeRequest},
    services::AppState,
};

/// POST /api/v1/sessions - start a new practice session
pub async fn create_session(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let purged = state.store.purge_expired(state.clock.now()).await;
    if purged > 0 {
        tracing::debug!("Purged {} expired sessions", purged);
    }

    let session = state.sessions.start_session().await.map_err(|e| {
        tracing::error!("Failed to start session: {}", e);
        ApiError::from(e)
    })?;

    let view = SessionView::new(&session, state.sessions.status(&session));
    state.store.insert(session).await;

    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/sessions/{id}
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.store.get(session_id).await?;
    let status = state.sessions.status(&session);
    Ok(Json(SessionView::new(&session, status)))
}

/// POST /api/v1/sessions/{id}/question - swap in a different question
pub async fn new_question(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!("New question requested for session: {}", session_id);

    let mut session = state.store.get(session_id).await?;
    let question = state.sessions.request_new_question(&mut session).await?;
    state
        .store
        .replace_question(session_id, question.clone())
        .await?;

    Ok(Json(QuestionResponse {
        question,
        status: state.sessions.status(&session).into(),
    }))
}

/// POST /api/v1/sessions/{id}/submissions - evaluate candidate code
pub async fn submit_code(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
    AppJson(mut req): AppJson<SubmitCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.email = req.normalized_email();
    if let Err(e) = req.validate() {
        return Err(InterviewError::Validation(e.to_string()).into());
    }

    tracing::info!("Submitting code for session: {}", session_id);

    let session = state.store.get(session_id).await?;
    let submission = state
        .sessions
        .submit(&session, &req.code, req.email.as_deref())
        .await?;

    // The session may have been purged while the provider was evaluating;
    // the candidate still gets the feedback that was produced.
    if let Err(e) = state.store.push_submission(submission.clone()).await {
        tracing::warn!(
            "Submission {} not kept in history: {}",
            submission.id,
            e
        );
    }

    Ok((StatusCode::CREATED, Json(submission)))
}

/// GET /api/v1/sessions/{id}/submissions
pub async fn list_submissions(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let submissions = state.store.submissions(session_id).await?;
    Ok(Json(submissions))
}
