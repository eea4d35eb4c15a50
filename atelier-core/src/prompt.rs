use crate::StylePreset;

impl StylePreset {
    /// Suffix appended to the user prompt, including its leading separator.
    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            StylePreset::None => None,
            StylePreset::Cinematic => {
                Some(", 4k, highly detailed, dramatic lighting, shallow depth of field")
            }
            StylePreset::Anime => Some(", anime style, studio ghibli, vibrant colors"),
            StylePreset::OilPainting => Some(", oil painting, thick brushstrokes, van gogh style"),
        }
    }
}

/// Builds the prompt actually sent to the model.
pub fn compose_prompt(prompt: &str, style: StylePreset) -> String {
    match style.suffix() {
        Some(suffix) => format!("{prompt}{suffix}"),
        None => prompt.to_string(),
    }
}
