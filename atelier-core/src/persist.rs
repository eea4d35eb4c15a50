use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;

use crate::GenerationParameters;

pub const DEFAULT_OUTPUT_DIR: &str = "generated_images";
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
pub const JPEG_QUALITY: u8 = 95;

/// Current local time in the artifact naming format (`YYYYMMDD_HHMMSS`).
pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

fn basename(timestamp: &str, index: usize) -> String {
    format!("img_{timestamp}_{index}")
}

/// JSON sidecar written next to every image.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ArtifactMetadata {
    pub prompt: String,
    pub timestamp: String,
    pub parameters: GenerationParameters,
    pub model: String,
    pub device: String,
}

/// The three files written for one generated image.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PersistedArtifact {
    pub basename: String,
    pub png_path: PathBuf,
    pub jpeg_path: PathBuf,
    pub json_path: PathBuf,
}

impl PersistedArtifact {
    fn new(output_dir: &Path, basename: String) -> Self {
        Self {
            png_path: output_dir.join(format!("{basename}.png")),
            jpeg_path: output_dir.join(format!("{basename}.jpeg")),
            json_path: output_dir.join(format!("{basename}.json")),
            basename,
        }
    }

    fn exists(&self) -> bool {
        self.png_path.exists() || self.jpeg_path.exists() || self.json_path.exists()
    }

    pub fn png_file_name(&self) -> String {
        format!("{}.png", self.basename)
    }

    pub fn jpeg_file_name(&self) -> String {
        format!("{}.jpeg", self.basename)
    }

    pub fn json_file_name(&self) -> String {
        format!("{}.json", self.basename)
    }
}

/// Writes artifacts under a fixed output directory. The model identifier and
/// device are fixed for the writer's lifetime, like the model they describe.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output_dir: PathBuf,
    model: String,
    device: String,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl Into<PathBuf>, model: &str, device: &str) -> Self {
        Self {
            output_dir: output_dir.into(),
            model: model.to_string(),
            device: device.to_string(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// True when any file of `img_<timestamp>_<index>` exists for an index
    /// below `count`.
    pub fn is_taken(&self, timestamp: &str, count: usize) -> bool {
        (0..count).any(|index| {
            PersistedArtifact::new(&self.output_dir, basename(timestamp, index)).exists()
        })
    }

    /// Writes `img_<timestamp>_<index>.{png,jpeg,json}`, creating the output
    /// directory if needed. `index` defaults to 0. Existing artifacts are
    /// never overwritten.
    ///
    /// The three writes are not atomic: a failure part-way leaves the files
    /// written so far in place.
    pub fn write(
        &self,
        image: &DynamicImage,
        prompt: &str,
        parameters: &GenerationParameters,
        timestamp: &str,
        index: Option<usize>,
    ) -> Result<PersistedArtifact> {
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!(
                "failed to create output directory {}",
                self.output_dir.display()
            )
        })?;

        let artifact =
            PersistedArtifact::new(&self.output_dir, basename(timestamp, index.unwrap_or(0)));
        if artifact.exists() {
            bail!("artifact {} already exists", artifact.basename);
        }

        image
            .save_with_format(&artifact.png_path, ImageFormat::Png)
            .with_context(|| format!("failed to write {}", artifact.png_path.display()))?;

        // JPEG has no alpha channel.
        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        let jpeg_file = File::create(&artifact.jpeg_path)
            .with_context(|| format!("failed to create {}", artifact.jpeg_path.display()))?;
        let mut jpeg_writer = BufWriter::new(jpeg_file);
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg_writer, JPEG_QUALITY))
            .with_context(|| format!("failed to write {}", artifact.jpeg_path.display()))?;
        jpeg_writer.flush()?;

        let metadata = ArtifactMetadata {
            prompt: prompt.to_string(),
            timestamp: timestamp.to_string(),
            parameters: parameters.clone(),
            model: self.model.clone(),
            device: self.device.clone(),
        };
        let json_file = File::create(&artifact.json_path)
            .with_context(|| format!("failed to create {}", artifact.json_path.display()))?;
        let mut json_writer = BufWriter::new(json_file);
        let mut serializer = serde_json::Serializer::with_formatter(
            &mut json_writer,
            PrettyFormatter::with_indent(b"    "),
        );
        metadata
            .serialize(&mut serializer)
            .with_context(|| format!("failed to write {}", artifact.json_path.display()))?;
        json_writer.flush()?;

        tracing::info!(basename = %artifact.basename, dir = %self.output_dir.display(), "Saved artifact");
        Ok(artifact)
    }
}

/// Reads back a metadata sidecar.
pub fn read_metadata(path: &Path) -> Result<ArtifactMetadata> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))
}
