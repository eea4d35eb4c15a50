use std::io::ErrorKind;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Deserialize, Debug, Default)]
pub struct ArtifactQuery {
    #[serde(default)]
    pub download: bool,
}

/// Content type for a persisted artifact file name, or `None` if the name is
/// not one this server writes (`img_*.{png,jpeg,json}`, no path separators).
pub fn artifact_content_type(file_name: &str) -> Option<&'static str> {
    let (stem, extension) = file_name.rsplit_once('.')?;
    let plain = stem.starts_with("img_")
        && stem
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !plain {
        return None;
    }
    match extension {
        "png" => Some("image/png"),
        "jpeg" => Some("image/jpeg"),
        "json" => Some("application/json"),
        _ => None,
    }
}

pub async fn get_artifact(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
    Query(query): Query<ArtifactQuery>,
) -> AppResult<Response> {
    let content_type = artifact_content_type(&file_name)
        .ok_or_else(|| AppError::NotFound(format!("Artifact {file_name}")))?;

    let path = state.output_dir().join(&file_name);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(AppError::NotFound(format!("Artifact {file_name}")));
        }
        Err(e) => {
            return Err(AppError::Internal(format!(
                "failed to read {}: {e}",
                path.display()
            )));
        }
    };

    let mut response = ([(header::CONTENT_TYPE, content_type)], bytes).into_response();
    if query.download {
        let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{file_name}\""))
            .map_err(|e| AppError::Internal(e.to_string()))?;
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, disposition);
    }
    Ok(response)
}
