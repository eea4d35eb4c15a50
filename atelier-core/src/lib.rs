pub mod device_map;
pub mod error;
pub mod loader;
mod loader_factory;
pub mod persist;
pub mod pipeline;
mod prompt;
pub mod request;
pub mod stable_diffusion;
mod util;
pub mod watermark;

pub use device_map::*;
pub use error::*;
use image::DynamicImage;
pub use loader::*;
pub use loader_factory::*;
pub use persist::*;
pub use pipeline::*;
pub use prompt::compose_prompt;
pub use request::*;
pub use stable_diffusion::{StableDiffusionLoader, StableDiffusionModel, StableDiffusionVersion};
pub(crate) use util::*;
pub use watermark::{Watermark, WATERMARK_TEXT};

/// What the generation adapter forwards to the model for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    pub prompt: String,
    pub negative_prompt: String,
    pub steps: usize,
    pub guidance_scale: f64,
    pub num_images: usize,
}

/// A loaded text-to-image model.
///
/// `run` blocks until every image is produced. The progress callback, when
/// given, is called synchronously once per denoising step with the completed
/// fraction in `(0, 1]`.
pub trait ModelLike: Send {
    fn model_id(&self) -> &str;

    /// Compute backend the model was placed on at load time.
    fn device(&self) -> &str;

    fn run(
        &mut self,
        params: &ModelParams,
        progress: Option<&mut dyn FnMut(f32)>,
    ) -> anyhow::Result<Vec<DynamicImage>>;
}
