use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use image::DynamicImage;

use crate::{
    compose_prompt, timestamp_now, ArtifactWriter, GenerationRequest, GenerationResult,
    ModelLike, ModelParams, PersistedArtifact, Watermark,
};

/// One watermarked image and the files it was saved to.
pub struct GeneratedArtifact {
    pub image: DynamicImage,
    pub artifact: PersistedArtifact,
}

pub struct GenerationOutcome {
    /// Prompt after style composition, as sent to the model.
    pub prompt: String,
    pub timestamp: String,
    pub artifacts: Vec<GeneratedArtifact>,
}

/// Owns the loaded model for the lifetime of the process and runs requests
/// through compose -> generate -> watermark -> persist.
pub struct Pipeline {
    model: Box<dyn ModelLike>,
    watermark: Watermark,
    writer: ArtifactWriter,
}

impl Pipeline {
    pub fn new(
        model: Box<dyn ModelLike>,
        watermark: Watermark,
        output_dir: impl Into<std::path::PathBuf>,
    ) -> Self {
        let writer = ArtifactWriter::new(output_dir, model.model_id(), model.device());
        Self {
            model,
            watermark,
            writer,
        }
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    pub fn device(&self) -> &str {
        self.model.device()
    }

    pub fn writer(&self) -> &ArtifactWriter {
        &self.writer
    }

    /// Runs one request to completion. Either every requested image is
    /// generated, stamped and saved, or an error is returned.
    pub fn run(
        &mut self,
        request: &GenerationRequest,
        progress: Option<&mut dyn FnMut(f32)>,
    ) -> GenerationResult<GenerationOutcome> {
        let prompt = compose_prompt(request.prompt(), request.style());
        let params = ModelParams {
            prompt: prompt.clone(),
            negative_prompt: request.negative_prompt().to_string(),
            steps: request.steps(),
            guidance_scale: request.guidance_scale(),
            num_images: request.num_images(),
        };

        tracing::info!(
            prompt = %prompt,
            steps = params.steps,
            guidance_scale = params.guidance_scale,
            num_images = params.num_images,
            "Starting generation"
        );
        let images = self.model.run(&params, progress)?;
        if images.len() != request.num_images() {
            return Err(anyhow!(
                "model returned {} images, expected {}",
                images.len(),
                request.num_images()
            )
            .into());
        }

        let timestamp = self.unused_timestamp(images.len());
        let parameters = request.parameters();
        let mut artifacts = Vec::with_capacity(images.len());
        for (index, mut image) in images.into_iter().enumerate() {
            self.watermark.stamp(&mut image);
            let artifact = self
                .writer
                .write(&image, &prompt, &parameters, &timestamp, Some(index))?;
            artifacts.push(GeneratedArtifact { image, artifact });
        }

        Ok(GenerationOutcome {
            prompt,
            timestamp,
            artifacts,
        })
    }

    /// Current timestamp, or the next one whose artifact names are all free.
    /// Callers hold `&mut self`, so no other run can claim it in between.
    fn unused_timestamp(&self, count: usize) -> String {
        let mut timestamp = timestamp_now();
        while self.writer.is_taken(&timestamp, count) {
            tracing::debug!(timestamp = %timestamp, "Artifact names taken, waiting for the next second");
            thread::sleep(Duration::from_millis(100));
            timestamp = timestamp_now();
        }
        timestamp
    }
}
