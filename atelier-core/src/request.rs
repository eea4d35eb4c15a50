use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

pub const STEPS_RANGE: RangeInclusive<usize> = 10..=100;
pub const GUIDANCE_RANGE: RangeInclusive<f64> = 1.0..=20.0;
pub const NUM_IMAGES_RANGE: RangeInclusive<usize> = 1..=4;

pub const DEFAULT_PROMPT: &str = "A futuristic city at sunset";
pub const DEFAULT_NEGATIVE_PROMPT: &str = "blurry, low quality, distorted";
pub const DEFAULT_STEPS: usize = 50;
pub const DEFAULT_GUIDANCE: f64 = 7.5;
pub const DEFAULT_NUM_IMAGES: usize = 1;

/// Named style presets. Each one maps to a fixed prompt suffix, see
/// [`crate::compose_prompt`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StylePreset {
    #[default]
    None,
    Cinematic,
    Anime,
    #[serde(rename = "Oil Painting")]
    OilPainting,
}

impl StylePreset {
    pub const ALL: [StylePreset; 4] = [
        StylePreset::None,
        StylePreset::Cinematic,
        StylePreset::Anime,
        StylePreset::OilPainting,
    ];

    /// Label shown in the style selector; also the serialized form.
    pub fn label(&self) -> &'static str {
        match self {
            StylePreset::None => "None",
            StylePreset::Cinematic => "Cinematic",
            StylePreset::Anime => "Anime",
            StylePreset::OilPainting => "Oil Painting",
        }
    }
}

impl fmt::Display for StylePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw values as submitted by the user. Missing fields take the form defaults.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GenerationForm {
    pub prompt: String,
    pub negative_prompt: String,
    pub steps: usize,
    pub guidance_scale: f64,
    pub style: StylePreset,
    pub num_images: usize,
}

impl Default for GenerationForm {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            negative_prompt: DEFAULT_NEGATIVE_PROMPT.to_string(),
            steps: DEFAULT_STEPS,
            guidance_scale: DEFAULT_GUIDANCE,
            style: StylePreset::None,
            num_images: DEFAULT_NUM_IMAGES,
        }
    }
}

/// A validated generation request. Only obtainable through
/// `GenerationRequest::try_from(GenerationForm)`, so every instance satisfies
/// the parameter bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    prompt: String,
    negative_prompt: String,
    steps: usize,
    guidance_scale: f64,
    style: StylePreset,
    num_images: usize,
}

impl TryFrom<GenerationForm> for GenerationRequest {
    type Error = GenerationError;

    fn try_from(form: GenerationForm) -> Result<Self, Self::Error> {
        if form.prompt.trim().is_empty() {
            return Err(GenerationError::InvalidRequest(
                "prompt must not be empty".to_string(),
            ));
        }
        if !STEPS_RANGE.contains(&form.steps) {
            return Err(GenerationError::InvalidRequest(format!(
                "steps must be between {} and {}, got {}",
                STEPS_RANGE.start(),
                STEPS_RANGE.end(),
                form.steps
            )));
        }
        // NaN fails `contains` as well.
        if !GUIDANCE_RANGE.contains(&form.guidance_scale) {
            return Err(GenerationError::InvalidRequest(format!(
                "guidance scale must be between {:.1} and {:.1}, got {}",
                GUIDANCE_RANGE.start(),
                GUIDANCE_RANGE.end(),
                form.guidance_scale
            )));
        }
        if !NUM_IMAGES_RANGE.contains(&form.num_images) {
            return Err(GenerationError::InvalidRequest(format!(
                "number of images must be between {} and {}, got {}",
                NUM_IMAGES_RANGE.start(),
                NUM_IMAGES_RANGE.end(),
                form.num_images
            )));
        }

        Ok(Self {
            prompt: form.prompt,
            negative_prompt: form.negative_prompt,
            steps: form.steps,
            guidance_scale: form.guidance_scale,
            style: form.style,
            num_images: form.num_images,
        })
    }
}

impl GenerationRequest {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn negative_prompt(&self) -> &str {
        &self.negative_prompt
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn guidance_scale(&self) -> f64 {
        self.guidance_scale
    }

    pub fn style(&self) -> StylePreset {
        self.style
    }

    pub fn num_images(&self) -> usize {
        self.num_images
    }

    /// The parameter set recorded in each artifact's metadata sidecar.
    pub fn parameters(&self) -> GenerationParameters {
        GenerationParameters {
            negative_prompt: self.negative_prompt.clone(),
            steps: self.steps,
            guidance_scale: self.guidance_scale,
            style: self.style,
            num_images: self.num_images,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GenerationParameters {
    pub negative_prompt: String,
    pub steps: usize,
    pub guidance_scale: f64,
    pub style: StylePreset,
    pub num_images: usize,
}
