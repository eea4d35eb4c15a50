use std::future::Future;

use anyhow::Result;
use hf_hub::api::tokio::Api;

use crate::{DeviceMap, ModelLike};

/// Output size requested at load time. `None` keeps the model's native size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageSize {
    pub width: Option<usize>,
    pub height: Option<usize>,
}

pub trait Loader {
    type Model: ModelLike;
    type Variant;

    fn load(
        repo_id: &str,
        variant: Self::Variant,
        api: Api,
        device_map: DeviceMap,
        size: ImageSize,
    ) -> impl Future<Output = Result<Self::Model>>
    where
        Self: Sized;
}
