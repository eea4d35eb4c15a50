//! Integration tests for the form, results, download and JSON endpoints,
//! driven through the router with a fake model.

mod common;

use axum::http::{header, StatusCode};
use common::{
    body_bytes, body_json, body_text, build_failing_app, build_test_app, file_names, get,
    post_form, post_json,
};
use serde_json::json;

// ---------------------------------------------------------------------------
// Form
// ---------------------------------------------------------------------------

#[tokio::test]
async fn index_renders_the_parameter_form() {
    let dir = tempfile::tempdir().unwrap();
    let response = get(build_test_app(dir.path()), "/").await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("<form method=\"post\" action=\"/generate\">"));
    assert!(html.contains("name=\"negative_prompt\""));
    assert!(html.contains("name=\"guidance_scale\""));
    assert!(html.contains("name=\"style\""));
    assert!(html.contains("name=\"num_images\""));
}

#[tokio::test]
async fn form_submission_renders_results_with_downloads() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("generated_images");
    let app = build_test_app(&output);

    let response = post_form(
        app,
        "/generate",
        "prompt=A+futuristic+city+at+sunset&negative_prompt=blurry&steps=50\
         &guidance_scale=7.5&style=Cinematic&num_images=2",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;

    let files = file_names(&output);
    assert_eq!(files.len(), 6);
    for file in files.iter().filter(|f| !f.ends_with(".json")) {
        assert!(
            html.contains(&format!("/artifacts/{file}?download=true")),
            "missing download link for {file}"
        );
    }
    assert!(html.contains("dramatic lighting"));
    assert!(html.contains("Generated Output 2"));
}

#[tokio::test]
async fn out_of_range_form_values_show_an_error_banner() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("generated_images");
    let app = build_test_app(&output);

    let response = post_form(app, "/generate", "prompt=a+cat&steps=5").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let html = body_text(response).await;
    assert!(html.contains("class=\"error\""));
    assert!(html.contains("steps must be between 10 and 100"));
    // The submitted prompt is kept in the form.
    assert!(html.contains(">a cat</textarea>"));
    assert!(file_names(&output).is_empty());
}

#[tokio::test]
async fn malformed_form_values_show_an_error_banner() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("generated_images");
    let app = build_test_app(&output);

    let response = post_form(app, "/generate", "prompt=a+cat&steps=abc").await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = body_text(response).await;
    assert!(html.contains("class=\"error\""));
    assert!(html.contains("steps"));
    assert!(html.contains("<form method=\"post\" action=\"/generate\">"));
    assert!(file_names(&output).is_empty());
}

#[tokio::test]
async fn model_failure_is_reported_generically() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("generated_images");
    let app = build_failing_app(&output);

    let response = post_form(app, "/generate", "prompt=a+cat").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let html = body_text(response).await;
    assert!(html.contains("Image generation failed"));
    assert!(!html.contains("/opt/models"));
    assert!(file_names(&output).is_empty());
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn artifacts_are_served_and_downloadable() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(dir.path());

    let response = post_json(app.clone(), "/v1/images/generations", json!({"prompt": "a cat"})).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let png_url = body["images"][0]["png"].as_str().unwrap().to_string();
    let jpeg_url = body["images"][0]["jpeg"].as_str().unwrap().to_string();

    let response = get(app.clone(), &png_url).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert!(response.headers().get(header::CONTENT_DISPOSITION).is_none());
    let png = image::load_from_memory(&body_bytes(response).await).unwrap();
    assert_eq!((png.width(), png.height()), (256, 256));

    let response = get(app, &format!("{jpeg_url}?download=true")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"img_"));
    assert!(disposition.ends_with(".jpeg\""));
}

#[tokio::test]
async fn unknown_or_foreign_files_are_not_served() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("secret.txt"), "nope").unwrap();
    let app = build_test_app(dir.path());

    let response = get(app.clone(), "/artifacts/secret.txt").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(app.clone(), "/artifacts/img_20250101_000000_0.png").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(app, "/artifacts/..%2Fsecret.txt").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// JSON API
// ---------------------------------------------------------------------------

#[tokio::test]
async fn json_api_returns_every_image_and_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(dir.path());

    let response = post_json(
        app.clone(),
        "/v1/images/generations",
        json!({
            "prompt": "A futuristic city at sunset",
            "style": "Cinematic",
            "steps": 50,
            "guidance_scale": 7.5,
            "num_images": 3
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let timestamp = body["timestamp"].as_str().unwrap().to_string();
    let images = body["images"].as_array().unwrap();
    assert_eq!(images.len(), 3);
    for (index, image) in images.iter().enumerate() {
        assert_eq!(image["basename"], format!("img_{timestamp}_{index}"));
        assert!(!image["image"].as_str().unwrap().is_empty());
    }
    assert_eq!(file_names(dir.path()).len(), 9);

    let metadata_url = images[0]["metadata"].as_str().unwrap();
    let metadata = body_json(get(app, metadata_url).await).await;
    assert_eq!(metadata["parameters"]["steps"], 50);
    assert_eq!(metadata["parameters"]["style"], "Cinematic");
    assert_eq!(metadata["parameters"]["guidance_scale"], 7.5);
    assert_eq!(metadata["model"], "Fake Diffusion");
    assert_eq!(metadata["device"], "cpu");
    assert_eq!(metadata["timestamp"], timestamp);
}

#[tokio::test]
async fn json_api_rejects_invalid_requests() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(dir.path());

    let response = post_json(
        app,
        "/v1/images/generations",
        json!({"prompt": "a cat", "num_images": 5}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "INVALID_REQUEST");
    assert!(file_names(dir.path()).is_empty());
}

#[tokio::test]
async fn json_api_hides_failure_details() {
    let dir = tempfile::tempdir().unwrap();
    let response = post_json(
        build_failing_app(dir.path()),
        "/v1/images/generations",
        json!({"prompt": "a cat"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["code"], "GENERATION_FAILED");
    assert!(!body["error"].as_str().unwrap().contains("CUDA"));
}

#[tokio::test]
async fn health_reports_model_and_device() {
    let dir = tempfile::tempdir().unwrap();
    let response = get(build_test_app(dir.path()), "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model"], "Fake Diffusion");
    assert_eq!(body["device"], "cpu");
}
