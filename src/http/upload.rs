// POST /api/upload - multipart media upload into the object store.

use axum::{
    extract::{Multipart, State},
    Json,
};
use futures::future::try_join_all;
use serde_json::{json, Value};

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};

/// 10 MiB per file.
const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<Value>> {
    let mut files: Vec<(String, Vec<u8>)> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("malformed multipart body: {}", e)))?
    {
        if field.name() != Some("files") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("failed to read upload: {}", e)))?;
        if bytes.len() > MAX_FILE_BYTES {
            return Err(AppError::Validation(format!(
                "file {} exceeds the upload size limit",
                filename
            )));
        }
        files.push((filename, bytes.to_vec()));
    }

    if files.is_empty() {
        return Err(AppError::BadRequest("No files uploaded".to_string()));
    }

    let storage = state.services.storage.clone();
    let urls = try_join_all(
        files
            .into_iter()
            .map(|(filename, bytes)| {
                let storage = storage.clone();
                async move { storage.store(&filename, bytes).await }
            }),
    )
    .await?;

    Ok(Json(json!({
        "files": urls
            .into_iter()
            .map(|url| json!({ "original": url }))
            .collect::<Vec<_>>(),
    })))
}
