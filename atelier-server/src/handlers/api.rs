use std::io::Cursor;

use anyhow::Result;
use atelier_core::{GenerationForm, GenerationRequest};
use axum::extract::{Json, State};
use base64::{prelude::BASE64_STANDARD, Engine};
use image::DynamicImage;
use serde::Serialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Serialize)]
pub struct GenerationResponse {
    pub prompt: String,
    pub timestamp: String,
    pub images: Vec<ImageResponse>,
}

#[derive(Serialize)]
pub struct ImageResponse {
    pub basename: String,
    pub png: String,
    pub jpeg: String,
    pub metadata: String,
    /// Base64-encoded PNG of the watermarked image.
    pub image: String,
}

/// Encodes an image as a base64 PNG.
fn image_to_base64_png(img: &DynamicImage) -> Result<String> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(BASE64_STANDARD.encode(&bytes))
}

pub async fn generate_images(
    State(state): State<AppState>,
    Json(form): Json<GenerationForm>,
) -> AppResult<Json<GenerationResponse>> {
    let request = GenerationRequest::try_from(form)?;
    let outcome = state.generate(request).await?;

    let images = outcome
        .artifacts
        .iter()
        .map(|generated| {
            let artifact = &generated.artifact;
            Ok(ImageResponse {
                basename: artifact.basename.clone(),
                png: format!("/artifacts/{}", artifact.png_file_name()),
                jpeg: format!("/artifacts/{}", artifact.jpeg_file_name()),
                metadata: format!("/artifacts/{}", artifact.json_file_name()),
                image: image_to_base64_png(&generated.image)
                    .map_err(|e| AppError::Internal(format!("failed to encode image: {e}")))?,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(Json(GenerationResponse {
        prompt: outcome.prompt,
        timestamp: outcome.timestamp,
        images,
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "model": state.model_id(),
        "device": state.device(),
    }))
}
