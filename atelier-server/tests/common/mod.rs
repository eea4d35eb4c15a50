#![allow(dead_code)]

use std::path::Path;

use atelier_core::{ModelLike, ModelParams, Pipeline, Watermark};
use atelier_server::routes;
use atelier_server::state::AppState;
use axum::body::Body;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use image::{DynamicImage, Rgb, RgbImage};
use tower::ServiceExt;

/// Stand-in for the diffusion model: returns flat grey images.
pub struct FakeModel {
    pub fail: bool,
}

impl ModelLike for FakeModel {
    fn model_id(&self) -> &str {
        "Fake Diffusion"
    }

    fn device(&self) -> &str {
        "cpu"
    }

    fn run(
        &mut self,
        params: &ModelParams,
        mut progress: Option<&mut dyn FnMut(f32)>,
    ) -> anyhow::Result<Vec<DynamicImage>> {
        if self.fail {
            anyhow::bail!("CUDA out of memory at /opt/models/unet");
        }
        for step in 0..params.steps {
            if let Some(callback) = progress.as_deref_mut() {
                callback((step + 1) as f32 / params.steps as f32);
            }
        }
        Ok((0..params.num_images)
            .map(|_| DynamicImage::ImageRgb8(RgbImage::from_pixel(256, 256, Rgb([40, 40, 40]))))
            .collect())
    }
}

pub fn build_test_app(output_dir: &Path) -> Router {
    build_app_with(FakeModel { fail: false }, output_dir)
}

pub fn build_failing_app(output_dir: &Path) -> Router {
    build_app_with(FakeModel { fail: true }, output_dir)
}

fn build_app_with(model: FakeModel, output_dir: &Path) -> Router {
    let pipeline = Pipeline::new(Box::new(model), Watermark::bitmap(), output_dir);
    routes::router(AppState::new(pipeline))
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_form(app: Router, uri: &str, body: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}
