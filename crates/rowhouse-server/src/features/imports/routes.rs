//! Import routes
//!
//! File submission (sync and async), previewing, progress polling, record
//! queries, and import management.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::commands::{
    delete::handle as handle_delete, submit::handle as handle_submit, DeleteImportCommand,
    DeleteImportError, SubmitImportCommand, SubmitMode,
};
use super::queries::{
    get_import::handle as handle_get_import, get_progress::handle as handle_get_progress,
    list_imports::handle as handle_list_imports, list_records::handle as handle_list_records,
    preview::handle as handle_preview, search_records::handle as handle_search_records,
    GetImportError, GetImportQuery, GetProgressError, GetProgressQuery, ListImportsQuery,
    ListRecordsError, ListRecordsQuery, PreviewQuery, SearchRecordsError, SearchRecordsQuery,
};
use crate::error::{AppError, AppResult};
use crate::features::FeatureState;
use crate::models::ParserOptions;

/// Multipart uploads up to 256 MiB.
const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// Create import routes
pub fn import_routes() -> Router<FeatureState> {
    Router::new()
        .route("/imports", post(submit_import).get(list_imports))
        .route("/imports/preview", post(preview_import))
        .route("/imports/:job_id", get(get_import).delete(delete_import))
        .route("/imports/:job_id/progress", get(get_progress))
        .route("/imports/:job_id/records", get(list_records))
        .route("/imports/:job_id/records/search", get(search_records))
        .route("/formats", get(supported_formats))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Parser options and submission mode, all optional query parameters.
#[derive(Debug, Default, Deserialize)]
struct ImportOptionsQuery {
    mode: Option<String>,
    delimiter: Option<char>,
    has_header: Option<bool>,
    skip_rows: Option<usize>,
    batch_size: Option<usize>,
    sheet_name: Option<String>,
    preview_rows: Option<usize>,
}

impl ImportOptionsQuery {
    fn mode(&self) -> AppResult<SubmitMode> {
        match self.mode.as_deref() {
            Some(mode) => mode.parse(),
            None => Ok(SubmitMode::Async),
        }
    }

    fn to_options(&self) -> ParserOptions {
        let defaults = ParserOptions::default();
        ParserOptions {
            delimiter: self.delimiter.unwrap_or(defaults.delimiter),
            has_header: self.has_header.unwrap_or(defaults.has_header),
            skip_rows: self.skip_rows.unwrap_or(defaults.skip_rows),
            batch_size: self.batch_size.unwrap_or(defaults.batch_size),
            sheet_name: self.sheet_name.clone(),
            preview_rows: self.preview_rows.unwrap_or(defaults.preview_rows),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PageQuery {
    page: Option<i64>,
    page_size: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: String,
}

/// Pull the `file` part out of a multipart upload.
async fn read_upload(multipart: &mut Multipart) -> AppResult<(String, Vec<u8>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart payload: {e}")))?
    {
        if field.name() == Some("file") {
            let file_name = field
                .file_name()
                .map(str::to_string)
                .ok_or_else(|| AppError::Validation("file part must carry a filename".into()))?;
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("failed to read upload: {e}")))?;
            return Ok((file_name, bytes.to_vec()));
        }
    }
    Err(AppError::Validation(
        "multipart field 'file' is required".into(),
    ))
}

/// Submit a file for import
///
/// POST /imports?mode=sync|async&delimiter=,&has_header=true&skip_rows=0
async fn submit_import(
    State(state): State<FeatureState>,
    Query(query): Query<ImportOptionsQuery>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let (file_name, content) = read_upload(&mut multipart).await?;
    let mode = query.mode()?;

    let command = SubmitImportCommand {
        file_name,
        content,
        options: query.to_options(),
        mode,
    };
    let details = handle_submit(state.submission.clone(), command)
        .await
        .map_err(AppError::from)?;

    let status = match mode {
        SubmitMode::Async => StatusCode::ACCEPTED,
        SubmitMode::Sync => StatusCode::OK,
    };
    Ok((status, Json(json!(details))).into_response())
}

/// Preview the first rows of a file without importing it
///
/// POST /imports/preview?delimiter=,&has_header=true&preview_rows=10
async fn preview_import(
    State(state): State<FeatureState>,
    Query(query): Query<ImportOptionsQuery>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let (file_name, content) = read_upload(&mut multipart).await?;

    let response = handle_preview(
        state.registry.clone(),
        PreviewQuery {
            file_name,
            content,
            options: query.to_options(),
        },
    )
    .await
    .map_err(AppError::from)?;

    Ok((StatusCode::OK, Json(json!(response))).into_response())
}

/// List import jobs, newest first
///
/// GET /imports?page=1&page_size=20
async fn list_imports(
    State(state): State<FeatureState>,
    Query(page): Query<PageQuery>,
) -> AppResult<Response> {
    let response = handle_list_imports(
        state.repos.jobs.clone(),
        ListImportsQuery {
            page: page.page,
            page_size: page.page_size,
        },
    )
    .await?;
    Ok((StatusCode::OK, Json(json!(response))).into_response())
}

/// Get a specific import job
///
/// GET /imports/:job_id
async fn get_import(
    State(state): State<FeatureState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<Response> {
    let job = handle_get_import(state.repos.jobs.clone(), GetImportQuery { job_id }).await?;
    Ok((StatusCode::OK, Json(json!(job))).into_response())
}

/// Poll an import's progress projection
///
/// GET /imports/:job_id/progress
async fn get_progress(
    State(state): State<FeatureState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<Response> {
    let progress =
        handle_get_progress(state.repos.jobs.clone(), GetProgressQuery { job_id }).await?;
    Ok((StatusCode::OK, Json(json!(progress))).into_response())
}

/// Page through an import's records
///
/// GET /imports/:job_id/records?page=1&page_size=50
async fn list_records(
    State(state): State<FeatureState>,
    Path(job_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> AppResult<Response> {
    let response = handle_list_records(
        state.repos.clone(),
        ListRecordsQuery {
            job_id,
            page: page.page,
            page_size: page.page_size,
        },
    )
    .await?;
    Ok((StatusCode::OK, Json(json!(response))).into_response())
}

/// Search an import's records
///
/// GET /imports/:job_id/records/search?q=term
async fn search_records(
    State(state): State<FeatureState>,
    Path(job_id): Path<Uuid>,
    Query(search): Query<SearchQuery>,
) -> AppResult<Response> {
    let hits = handle_search_records(
        state.repos.clone(),
        SearchRecordsQuery {
            job_id,
            term: search.q,
        },
    )
    .await?;
    Ok((StatusCode::OK, Json(json!({ "items": hits }))).into_response())
}

/// Delete an import and everything it owns
///
/// DELETE /imports/:job_id
async fn delete_import(
    State(state): State<FeatureState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<Response> {
    let response = handle_delete(state.repos.clone(), DeleteImportCommand { job_id }).await?;
    Ok((StatusCode::OK, Json(json!(response))).into_response())
}

/// Enumerate supported file extensions
///
/// GET /formats
async fn supported_formats(State(state): State<FeatureState>) -> Response {
    let formats: Vec<String> = state
        .registry
        .supported_extensions()
        .iter()
        .map(|ext| format!(".{ext}"))
        .collect();
    (StatusCode::OK, Json(json!({ "formats": formats }))).into_response()
}

impl From<GetImportError> for AppError {
    fn from(err: GetImportError) -> Self {
        match err {
            GetImportError::NotFound => AppError::NotFound("import job not found".into()),
            GetImportError::Repo(e) => e.into(),
        }
    }
}

impl From<GetProgressError> for AppError {
    fn from(err: GetProgressError) -> Self {
        match err {
            GetProgressError::NotFound => AppError::NotFound("import job not found".into()),
            GetProgressError::Repo(e) => e.into(),
        }
    }
}

impl From<ListRecordsError> for AppError {
    fn from(err: ListRecordsError) -> Self {
        match err {
            ListRecordsError::JobNotFound => AppError::NotFound("import job not found".into()),
            ListRecordsError::Repo(e) => e.into(),
        }
    }
}

impl From<SearchRecordsError> for AppError {
    fn from(err: SearchRecordsError) -> Self {
        match err {
            SearchRecordsError::TermRequired => AppError::Validation(err.to_string()),
            SearchRecordsError::JobNotFound => AppError::NotFound("import job not found".into()),
            SearchRecordsError::Repo(e) => e.into(),
        }
    }
}

impl From<DeleteImportError> for AppError {
    fn from(err: DeleteImportError) -> Self {
        match err {
            DeleteImportError::NotFound => AppError::NotFound("import job not found".into()),
            DeleteImportError::Repo(e) => e.into(),
        }
    }
}
