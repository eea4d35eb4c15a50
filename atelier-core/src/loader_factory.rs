use anyhow::{anyhow, Result};
use hf_hub::api::tokio::Api;

use crate::stable_diffusion::{StableDiffusionLoader, StableDiffusionVersion};
use crate::{DeviceMap, ImageSize, Loader, ModelLike};

/// Enum of supported model types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModelType {
    StableDiffusion,
}

impl ModelType {
    /// Detect model type from model name
    pub fn from_name(model_name: &str) -> Option<Self> {
        let name_upper = model_name.to_uppercase().replace('_', "-");

        if name_upper.contains("STABLE-DIFFUSION") {
            Some(ModelType::StableDiffusion)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModelVariant {
    StableDiffusion(StableDiffusionVersion),
}

impl ModelVariant {
    /// Detect model variant from model name
    pub fn from_name(model_name: &str) -> Option<Self> {
        let name_upper = model_name.to_uppercase().replace('_', "-");

        if name_upper.contains("STABLE-DIFFUSION") {
            Some(ModelVariant::StableDiffusion(
                if name_upper.contains("2-1") || name_upper.contains("2.1") {
                    StableDiffusionVersion::V2_1
                } else {
                    // v1.5 unless the name says otherwise
                    StableDiffusionVersion::V1_5
                },
            ))
        } else {
            None
        }
    }
}

/// Load a model based on its name, automatically detecting the appropriate loader
pub async fn load_model(
    model_name: &str,
    api: Api,
    device_map: DeviceMap,
    size: ImageSize,
) -> Result<Box<dyn ModelLike>> {
    let model_type = ModelType::from_name(model_name)
        .ok_or_else(|| anyhow!("Unsupported model type: {}", model_name))?;
    let model_variant = ModelVariant::from_name(model_name)
        .ok_or_else(|| anyhow!("Unsupported model variant: {}", model_name))?;

    tracing::info!(
        model = model_name,
        "Loading model (detected type: {:?}/variant: {:?})",
        model_type,
        model_variant
    );

    match (model_type, model_variant) {
        (ModelType::StableDiffusion, ModelVariant::StableDiffusion(version)) => {
            let model =
                StableDiffusionLoader::load(model_name, version, api, device_map, size).await?;
            Ok(Box::new(model))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_stable_diffusion_versions() {
        assert_eq!(
            ModelVariant::from_name("stable-diffusion-v1-5/stable-diffusion-v1-5"),
            Some(ModelVariant::StableDiffusion(StableDiffusionVersion::V1_5))
        );
        assert_eq!(
            ModelVariant::from_name("runwayml/stable-diffusion-v1-5"),
            Some(ModelVariant::StableDiffusion(StableDiffusionVersion::V1_5))
        );
        assert_eq!(
            ModelVariant::from_name("stabilityai/stable-diffusion-2-1"),
            Some(ModelVariant::StableDiffusion(StableDiffusionVersion::V2_1))
        );
        assert_eq!(
            ModelType::from_name("my_org/Stable_Diffusion_v1_5"),
            Some(ModelType::StableDiffusion)
        );
    }

    #[test]
    fn unknown_models_are_unsupported() {
        assert_eq!(ModelType::from_name("black-forest-labs/FLUX.1-schnell"), None);
        assert_eq!(ModelVariant::from_name("openai/clip-vit-base-patch32"), None);
    }
}
