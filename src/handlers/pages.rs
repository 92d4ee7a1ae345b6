use axum::{
    extract::{Form as ExtractForm, Path, State},
    http::{HeaderMap, Method, Uri},
    response::Html,
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::forms::request::{FormPayload, RequestInfo};
use crate::handlers::AppState;
use crate::render::CSRF_FIELD_NAME;
use crate::services::binding::ContentRequest;

async fn render_content(
    state: &AppState,
    content_id: u64,
    info: RequestInfo,
    payload: FormPayload,
) -> Result<Html<String>, ApiError> {
    let content = state.database.get_content(content_id)?;
    let request = ContentRequest {
        info,
        payload,
        csrf_token: Some(state.csrf.issue(content.id)),
    };
    let outcome = state.binding.render(&content, &request).await?;
    Ok(Html(outcome.into_html()))
}

// Embedded form page
pub async fn show_content(
    State(state): State<Arc<AppState>>,
    Path(content_id): Path<u64>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Html<String>, ApiError> {
    let info = RequestInfo::from_parts(&method, uri.path(), &headers);
    render_content(&state, content_id, info, FormPayload::default()).await
}

// Embedded form submission
pub async fn submit_content(
    State(state): State<Arc<AppState>>,
    Path(content_id): Path<u64>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    ExtractForm(pairs): ExtractForm<Vec<(String, String)>>,
) -> Result<Html<String>, ApiError> {
    info!("Received submission for content {}", content_id);
    let payload = FormPayload::from(pairs);

    let token_ok = payload
        .get(CSRF_FIELD_NAME)
        .is_some_and(|token| state.csrf.verify(token, content_id));
    if !token_ok {
        warn!("Rejected submission for content {}: bad CSRF token", content_id);
        return Err(ApiError::Forbidden("CSRF token missing or incorrect".to_string()));
    }

    let info = RequestInfo::from_parts(&method, uri.path(), &headers);
    render_content(&state, content_id, info, payload).await
}
