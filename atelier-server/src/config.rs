use std::path::PathBuf;

use atelier_core::{DeviceMap, ImageSize, DEFAULT_OUTPUT_DIR};
use clap::Parser;

pub const DEFAULT_MODEL: &str = "stable-diffusion-v1-5/stable-diffusion-v1-5";

// Define command line arguments
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Atelier image generation server")]
pub struct Args {
    /// Use CPU instead of GPU
    #[arg(long, env = "ATELIER_CPU")]
    pub cpu: bool,

    /// Hugging Face repository of the model to load
    #[arg(long, env = "ATELIER_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Host address to bind the server to
    #[arg(long, env = "ATELIER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind the server to
    #[arg(long, env = "ATELIER_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Directory generated images and their metadata are written to
    #[arg(long, env = "ATELIER_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// TrueType font for the watermark. Falls back to system fonts, then to a
    /// built-in bitmap font.
    #[arg(long, env = "ATELIER_WATERMARK_FONT")]
    pub watermark_font: Option<PathBuf>,

    /// Output width in pixels (multiple of 8). Defaults to the model's native size.
    #[arg(long, env = "ATELIER_WIDTH")]
    pub width: Option<usize>,

    /// Output height in pixels (multiple of 8). Defaults to the model's native size.
    #[arg(long, env = "ATELIER_HEIGHT")]
    pub height: Option<usize>,
}

impl Args {
    pub fn device_map(&self) -> DeviceMap {
        DeviceMap::from_cpu_flag(self.cpu)
    }

    pub fn image_size(&self) -> ImageSize {
        ImageSize {
            width: self.width,
            height: self.height,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
