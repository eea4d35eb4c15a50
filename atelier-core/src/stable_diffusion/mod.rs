use anyhow::{Context, Error, Result};
use candle_core::{DType, Device, IndexOp, Module, Tensor};
use candle_transformers::models::stable_diffusion::{
    self, clip::ClipTextTransformer, unet_2d::UNet2DConditionModel, vae::AutoEncoderKL,
    StableDiffusionConfig,
};
use hf_hub::api::tokio::Api;
use image::DynamicImage;
use tokenizers::Tokenizer;

use crate::{
    device_label, select_best_device, tensor_to_image, DeviceMap, ImageSize, Loader, ModelLike,
    ModelParams,
};

// Latent scaling factor shared by the v1.5 and v2.1 autoencoders.
const VAE_SCALE: f64 = 0.18215;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StableDiffusionVersion {
    V1_5,
    V2_1,
}

impl StableDiffusionVersion {
    fn config(&self, size: ImageSize) -> StableDiffusionConfig {
        match self {
            Self::V1_5 => StableDiffusionConfig::v1_5(None, size.height, size.width),
            Self::V2_1 => StableDiffusionConfig::v2_1(None, size.height, size.width),
        }
    }

    fn display_name(&self) -> &'static str {
        match self {
            Self::V1_5 => "Stable Diffusion v1.5",
            Self::V2_1 => "Stable Diffusion v2.1",
        }
    }

    fn tokenizer_repo(&self) -> &'static str {
        "openai/clip-vit-base-patch32"
    }
}

enum ModelFile {
    TextEncoder,
    Unet,
    Vae,
}

impl ModelFile {
    fn path(&self, use_f16: bool) -> &'static str {
        match (self, use_f16) {
            (Self::TextEncoder, _) => "text_encoder/model.safetensors",
            (Self::Unet, true) => "unet/diffusion_pytorch_model.fp16.safetensors",
            (Self::Unet, false) => "unet/diffusion_pytorch_model.safetensors",
            (Self::Vae, true) => "vae/diffusion_pytorch_model.fp16.safetensors",
            (Self::Vae, false) => "vae/diffusion_pytorch_model.safetensors",
        }
    }
}

pub struct StableDiffusionModel {
    version: StableDiffusionVersion,
    device: Device,
    dtype: DType,
    config: StableDiffusionConfig,
    tokenizer: Tokenizer,
    pad_id: u32,
    text_model: ClipTextTransformer,
    unet: UNet2DConditionModel,
    vae: AutoEncoderKL,
}

impl StableDiffusionModel {
    /// Encodes a prompt into CLIP hidden states of shape (1, seq_len, dim).
    fn encode_text(&self, text: &str) -> Result<Tensor> {
        let max_len = self.config.clip.max_position_embeddings;
        let mut tokens = self
            .tokenizer
            .encode(text, true)
            .map_err(Error::msg)?
            .get_ids()
            .to_vec();
        if tokens.len() > max_len {
            tracing::warn!(
                tokens = tokens.len(),
                max_len,
                "Prompt exceeds the text encoder context and was truncated"
            );
            tokens.truncate(max_len);
        }
        tokens.resize(max_len, self.pad_id);
        let tokens = Tensor::new(tokens.as_slice(), &self.device)?.unsqueeze(0)?;
        Ok(self.text_model.forward(&tokens)?)
    }
}

impl ModelLike for StableDiffusionModel {
    fn model_id(&self) -> &str {
        self.version.display_name()
    }

    fn device(&self) -> &str {
        device_label(&self.device)
    }

    fn run(
        &mut self,
        params: &ModelParams,
        mut progress: Option<&mut dyn FnMut(f32)>,
    ) -> Result<Vec<DynamicImage>> {
        let batch = params.num_images;
        let use_guidance = params.guidance_scale > 1.0;

        // --- Text embeddings, unconditional (negative prompt) first ---
        let cond = self.encode_text(&params.prompt)?.repeat((batch, 1, 1))?;
        let text_embeddings = if use_guidance {
            let uncond = self
                .encode_text(&params.negative_prompt)?
                .repeat((batch, 1, 1))?;
            Tensor::cat(&[uncond, cond], 0)?
        } else {
            cond
        }
        .to_dtype(self.dtype)?;

        // --- Initial noise ---
        let mut scheduler = self.config.build_scheduler(params.steps)?;
        let latents = Tensor::randn(
            0f32,
            1f32,
            (batch, 4, self.config.height / 8, self.config.width / 8),
            &self.device,
        )?;
        let mut latents = (latents * scheduler.init_noise_sigma())?.to_dtype(self.dtype)?;

        // --- Denoising loop ---
        let timesteps = scheduler.timesteps().to_vec();
        let total = timesteps.len();
        for (index, &timestep) in timesteps.iter().enumerate() {
            let model_input = if use_guidance {
                Tensor::cat(&[&latents, &latents], 0)?
            } else {
                latents.clone()
            };
            let model_input = scheduler.scale_model_input(model_input, timestep)?;
            let noise_pred = self
                .unet
                .forward(&model_input, timestep as f64, &text_embeddings)?;
            let noise_pred = if use_guidance {
                let chunks = noise_pred.chunk(2, 0)?;
                let (uncond, text) = (&chunks[0], &chunks[1]);
                (uncond + ((text - uncond)? * params.guidance_scale)?)?
            } else {
                noise_pred
            };
            latents = scheduler.step(&noise_pred, timestep, &latents)?;

            tracing::debug!(step = index + 1, total, "Denoising step complete");
            if let Some(callback) = progress.as_deref_mut() {
                callback((index + 1) as f32 / total as f32);
            }
        }

        // --- Decode the latents and convert to images ---
        let decoded = self.vae.decode(&(latents / VAE_SCALE)?)?;
        let decoded = ((decoded / 2.)? + 0.5)?.to_device(&Device::Cpu)?;
        let decoded = (decoded.clamp(0f32, 1.)? * 255.)?.to_dtype(DType::U8)?;

        let (decoded_batch, _, _, _) = decoded.dims4()?;
        if decoded_batch != batch {
            anyhow::bail!("model decoded {decoded_batch} images, expected {batch}");
        }
        (0..batch)
            .map(|i| tensor_to_image(&decoded.i(i)?))
            .collect()
    }
}

pub struct StableDiffusionLoader;

impl Loader for StableDiffusionLoader {
    type Model = StableDiffusionModel;
    type Variant = StableDiffusionVersion;

    async fn load(
        repo_id: &str,
        version: StableDiffusionVersion,
        api: Api,
        device_map: DeviceMap,
        size: ImageSize,
    ) -> Result<Self::Model> {
        for dim in [size.width, size.height].into_iter().flatten() {
            if dim == 0 || dim % 8 != 0 {
                anyhow::bail!("image width and height must be positive multiples of 8, got {dim}");
            }
        }

        // Configure device.
        let device = select_best_device(device_map).context("failed to set up device")?;
        let use_f16 = !device.is_cpu();
        let dtype = if use_f16 { DType::F16 } else { DType::F32 };
        tracing::info!(device = device_label(&device), ?dtype, "Selected device");

        let config = version.config(size);
        let repo = api.repo(hf_hub::Repo::model(repo_id.to_string()));

        // --- Tokenizer ---
        let tokenizer_file = api
            .model(version.tokenizer_repo().to_string())
            .get("tokenizer.json")
            .await
            .context("failed to get CLIP tokenizer")?;
        let tokenizer = Tokenizer::from_file(tokenizer_file)
            .map_err(Error::msg)
            .context("failed to load CLIP tokenizer")?;
        let pad_token = config.clip.pad_with.as_deref().unwrap_or("<|endoftext|>");
        let pad_id = *tokenizer
            .get_vocab(true)
            .get(pad_token)
            .with_context(|| format!("tokenizer has no padding token {pad_token:?}"))?;

        // --- Text encoder (always loaded in f32, cast after encoding) ---
        let text_encoder_file = repo
            .get(ModelFile::TextEncoder.path(use_f16))
            .await
            .context("failed to get text encoder weights")?;
        let text_model = stable_diffusion::build_clip_transformer(
            &config.clip,
            text_encoder_file,
            &device,
            DType::F32,
        )
        .context("failed to load text encoder")?;

        // --- UNet ---
        let unet_file = repo
            .get(ModelFile::Unet.path(use_f16))
            .await
            .context("failed to get UNet weights")?;
        let unet = config
            .build_unet(unet_file, &device, 4, cfg!(feature = "flash-attn"), dtype)
            .context("failed to load UNet")?;

        // --- Autoencoder ---
        let vae_file = repo
            .get(ModelFile::Vae.path(use_f16))
            .await
            .context("failed to get autoencoder weights")?;
        let vae = config
            .build_vae(vae_file, &device, dtype)
            .context("failed to load autoencoder")?;

        tracing::info!(
            model = version.display_name(),
            width = config.width,
            height = config.height,
            "Model loaded"
        );

        Ok(StableDiffusionModel {
            version,
            device,
            dtype,
            config,
            tokenizer,
            pad_id,
            text_model,
            unet,
            vae,
        })
    }
}
