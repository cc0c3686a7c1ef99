use crate::error::ApiError;
use crate::state::AppState;
use astra_core::FileRecord;
use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct FileUploadResponse {
    pub id: String,
    pub name: String,
    pub message: String,
}

/// GET /api/files
pub async fn list_files(State(state): State<AppState>) -> Json<Vec<FileRecord>> {
    Json(state.registry.list().await)
}

/// POST /api/files/upload (multipart, field `file`)
#[tracing::instrument(skip(state, multipart))]
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<FileUploadResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Multipart error: {}", e)))?
    {
        if field.name().unwrap_or("") != "file" {
            continue;
        }

        let name = field.file_name().unwrap_or("upload").to_string();
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(format!("Failed to read field: {}", e)))?;

        let record = state.registry.put(&name, &mime_type, &data).await?;

        info!(id = %record.id, name = %record.name, size = record.size, "File uploaded via API");

        return Ok(Json(FileUploadResponse {
            id: record.id,
            name: record.name,
            message: "File uploaded successfully".to_string(),
        }));
    }

    Err(ApiError::Validation(
        "Missing 'file' field in multipart form".to_string(),
    ))
}

/// GET /api/files/:id
pub async fn file_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FileRecord>, ApiError> {
    Ok(Json(state.registry.get(&id).await?))
}

/// GET /api/files/:id/download
pub async fn download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let record = state.registry.get(&id).await?;
    let bytes = state.registry.read_content(&id).await?;

    let headers = [
        (header::CONTENT_TYPE, record.mime_type.clone()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", record.name),
        ),
    ];
    Ok((headers, bytes).into_response())
}

/// DELETE /api/files/:id
#[tracing::instrument(skip(state))]
pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.registry.delete(&id).await?;
    Ok(Json(json!({ "message": "File deleted successfully" })))
}

/// POST /api/files/:id/analyze
#[tracing::instrument(skip(state))]
pub async fn analyze(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let record = state.registry.get(&id).await?;
    let report = state.resolver.analyze_file(&record).await;
    Ok(Json(json!({
        "file_id": record.id,
        "analysis": report,
    })))
}
