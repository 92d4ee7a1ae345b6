use axum::{
    extract::{Json as ExtractJson, Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{ApiError, StoreError};
use crate::handlers::AppState;
use crate::models::content::FormContent;
use crate::models::field::FormField;
use crate::models::field_types::FIELD_TYPES;
use crate::models::form::Form;
use crate::models::submission::{display, SortedData, SubmissionMeta};

/// Reject admin requests without the configured bearer token.
pub async fn require_admin_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(expected) = &state.admin_auth_token {
        let provided = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));
        if provided != Some(expected.as_str()) {
            warn!("Rejected admin request to {}", request.uri().path());
            return Err(ApiError::Unauthorized);
        }
    }
    Ok(next.run(request).await)
}

// ---- forms ----

pub async fn list_forms(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Form>>, ApiError> {
    Ok(Json(state.database.list_forms()?))
}

pub async fn create_form(
    State(state): State<Arc<AppState>>,
    ExtractJson(form): ExtractJson<Form>,
) -> Result<(StatusCode, Json<Form>), ApiError> {
    info!("Received request to create form: {}", form.title);
    let form = state.database.create_form(form)?;
    Ok((StatusCode::CREATED, Json(form)))
}

pub async fn get_form(
    State(state): State<Arc<AppState>>,
    Path(form_id): Path<u64>,
) -> Result<Json<Form>, ApiError> {
    Ok(Json(state.database.get_form(form_id)?))
}

pub async fn update_form(
    State(state): State<Arc<AppState>>,
    Path(form_id): Path<u64>,
    ExtractJson(form): ExtractJson<Form>,
) -> Result<Json<Form>, ApiError> {
    info!("Received request to update form {}", form_id);
    Ok(Json(state.database.update_form(form_id, form)?))
}

pub async fn delete_form(
    State(state): State<Arc<AppState>>,
    Path(form_id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    info!("Received request to delete form {}", form_id);
    state.database.delete_form(form_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- fields ----

pub async fn list_fields(
    State(state): State<Arc<AppState>>,
    Path(form_id): Path<u64>,
) -> Result<Json<Vec<FormField>>, ApiError> {
    state.database.get_form(form_id)?;
    Ok(Json(state.database.fields_for_form(form_id)?))
}

pub async fn create_field(
    State(state): State<Arc<AppState>>,
    Path(form_id): Path<u64>,
    ExtractJson(field): ExtractJson<FormField>,
) -> Result<(StatusCode, Json<FormField>), ApiError> {
    info!("Received request to add field '{}' to form {}", field.name, form_id);
    let field = state.database.create_field(form_id, field)?;
    Ok((StatusCode::CREATED, Json(field)))
}

pub async fn update_field(
    State(state): State<Arc<AppState>>,
    Path(field_id): Path<u64>,
    ExtractJson(field): ExtractJson<FormField>,
) -> Result<Json<FormField>, ApiError> {
    Ok(Json(state.database.update_field(field_id, field)?))
}

pub async fn delete_field(
    State(state): State<Arc<AppState>>,
    Path(field_id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    state.database.delete_field(field_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- submissions ----

#[derive(Debug, Default, Deserialize)]
pub struct SubmissionParams {
    /// Comma-separated meta entries: `datetime`, `date`, `time`, `path`.
    #[serde(default)]
    pub include: Option<String>,
}

impl SubmissionParams {
    fn meta(&self) -> Result<BTreeSet<SubmissionMeta>, ApiError> {
        let Some(raw) = &self.include else {
            return Ok(BTreeSet::new());
        };
        raw.split(',')
            .filter(|item| !item.trim().is_empty())
            .map(|item| item.parse::<SubmissionMeta>().map_err(ApiError::BadRequest))
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct SubmissionView {
    pub id: u64,
    pub submitted: DateTime<Utc>,
    pub path: String,
    pub data: SortedData,
}

pub async fn list_submissions(
    State(state): State<Arc<AppState>>,
    Path(form_id): Path<u64>,
    Query(params): Query<SubmissionParams>,
) -> Result<Json<Vec<SubmissionView>>, ApiError> {
    let include = params.meta()?;
    state.database.get_form(form_id)?;
    let fields = state.database.fields_for_form(form_id)?;

    let views = state
        .database
        .submissions_for_form(form_id)?
        .into_iter()
        .map(|submission| SubmissionView {
            data: submission.sorted_data(&fields, &include),
            id: submission.id,
            submitted: submission.submitted,
            path: submission.path,
        })
        .collect();
    Ok(Json(views))
}

/// CSV of every submission, one column per display key seen in any row.
pub async fn export_submissions(
    State(state): State<Arc<AppState>>,
    Path(form_id): Path<u64>,
) -> Result<Response, ApiError> {
    let form = state.database.get_form(form_id)?;
    let fields = state.database.fields_for_form(form_id)?;
    let include = BTreeSet::from([SubmissionMeta::DateTime, SubmissionMeta::Path]);
    let hidden = &state.settings.hidden_fields;

    let rows: Vec<SortedData> = state
        .database
        .submissions_for_form(form_id)?
        .iter()
        .map(|submission| submission.sorted_data(&fields, &include))
        .collect();

    let mut columns: IndexSet<&str> = IndexSet::new();
    for row in &rows {
        for key in row.keys() {
            if !hidden.iter().any(|h| h == key) {
                columns.insert(key.as_str());
            }
        }
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&columns).map_err(StoreError::from)?;
    for row in &rows {
        let record: Vec<String> = columns
            .iter()
            .map(|column| {
                row.get(*column).map(display).unwrap_or_default()
            })
            .collect();
        writer.write_record(&record).map_err(StoreError::from)?;
    }
    let body = writer
        .into_inner()
        .map_err(|e| StoreError::Io(e.into_error()))?;

    info!("Exported {} submissions of form {}", rows.len(), form.id);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"form-{}-submissions.csv\"", form.id),
            ),
        ],
        body,
    )
        .into_response())
}

// ---- contents ----

pub async fn list_contents(State(state): State<Arc<AppState>>) -> Result<Json<Vec<FormContent>>, ApiError> {
    Ok(Json(state.database.list_contents()?))
}

pub async fn create_content(
    State(state): State<Arc<AppState>>,
    ExtractJson(content): ExtractJson<FormContent>,
) -> Result<(StatusCode, Json<FormContent>), ApiError> {
    info!("Received request to embed form {}", content.form_id);
    let content = state.database.create_content(content)?;
    Ok((StatusCode::CREATED, Json(content)))
}

pub async fn get_content(
    State(state): State<Arc<AppState>>,
    Path(content_id): Path<u64>,
) -> Result<Json<FormContent>, ApiError> {
    Ok(Json(state.database.get_content(content_id)?))
}

pub async fn delete_content(
    State(state): State<Arc<AppState>>,
    Path(content_id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    state.database.delete_content(content_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- registry ----

#[derive(Debug, Serialize)]
pub struct FieldTypeView {
    pub tag: &'static str,
    pub label: &'static str,
}

pub async fn list_field_types() -> Json<Vec<FieldTypeView>> {
    Json(
        FIELD_TYPES
            .iter()
            .map(|entry| FieldTypeView {
                tag: entry.tag,
                label: entry.label,
            })
            .collect(),
    )
}
