use anyhow::{Context, Result};
use atelier_core::{load_model, Pipeline, Watermark};
use axum::Router;
use hf_hub::api::tokio::Api;

use crate::config::Args;
use crate::routes;
use crate::state::AppState;

/// Loads the model and assembles the router. A model that fails to load is
/// fatal: no router is built and nothing can be served.
pub async fn build_app(args: &Args, api: Api) -> Result<Router> {
    let model = match load_model(&args.model, api, args.device_map(), args.image_size()).await {
        Ok(model) => model,
        Err(e) => {
            tracing::error!(error = ?e, model = %args.model, "Model initialization failed, not starting the server");
            return Err(e).context("model initialization failed");
        }
    };

    let watermark = Watermark::new(args.watermark_font.as_deref());
    if watermark.uses_bitmap_font() {
        tracing::info!("No TrueType font found, watermark uses the built-in bitmap font");
    }

    let pipeline = Pipeline::new(model, watermark, args.output_dir.clone());
    tracing::info!(
        model = pipeline.model_id(),
        device = pipeline.device(),
        output_dir = %args.output_dir.display(),
        "Pipeline ready"
    );
    Ok(routes::router(AppState::new(pipeline)))
}
