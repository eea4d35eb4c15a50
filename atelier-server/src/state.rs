use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use atelier_core::{GenerationOutcome, GenerationRequest, Pipeline};

use crate::error::{AppError, AppResult};

/// Shared application state. The pipeline (and the model it owns) sits
/// behind a mutex, so generations run one at a time.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Mutex<Pipeline>>,
    output_dir: Arc<PathBuf>,
    model_id: Arc<str>,
    device: Arc<str>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            output_dir: Arc::new(pipeline.writer().output_dir().to_path_buf()),
            model_id: Arc::from(pipeline.model_id()),
            device: Arc::from(pipeline.device()),
            pipeline: Arc::new(Mutex::new(pipeline)),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    /// Runs `request` on a blocking thread, waiting for any generation
    /// already in progress to finish first.
    pub async fn generate(&self, request: GenerationRequest) -> AppResult<GenerationOutcome> {
        let pipeline = Arc::clone(&self.pipeline);
        let outcome = tokio::task::spawn_blocking(move || {
            let mut pipeline = pipeline.lock().unwrap_or_else(PoisonError::into_inner);
            let mut logged_decile = 0;
            let mut on_progress = |fraction: f32| {
                let percent = (fraction * 100.0).round() as u32;
                if percent / 10 > logged_decile {
                    logged_decile = percent / 10;
                    tracing::info!("Generation progress: {percent}%");
                }
            };
            pipeline.run(&request, Some(&mut on_progress))
        })
        .await
        .map_err(|e| AppError::Internal(format!("generation task failed: {e}")))??;
        Ok(outcome)
    }
}
