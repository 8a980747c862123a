#![allow(dead_code)]

use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::http::header;
use actix_web::test::TestRequest;
use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use image_classing::ml::{ModelTrainer, TrainerError, TrainingOutcome, VerificationReport};
use image_classing::{AppConfig, AppState, db};
use rand::Rng;
use serde_json::json;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

pub const PASSWORD: &str = "correct horse battery";
const BOUNDARY: &str = "----image-classing-test-boundary";

/// Trainer double that writes a model file and remembers how often it ran.
#[derive(Default)]
pub struct CountingTrainer {
    pub train_calls: AtomicUsize,
    pub verify_calls: AtomicUsize,
}

impl CountingTrainer {
    pub fn train_calls(&self) -> usize {
        self.train_calls.load(Ordering::SeqCst)
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelTrainer for CountingTrainer {
    async fn train(
        &self,
        training_data_dir: &Path,
        model_dir: &Path,
    ) -> Result<TrainingOutcome, TrainerError> {
        self.train_calls.fetch_add(1, Ordering::SeqCst);
        let mut classes = Vec::new();
        let mut entries = tokio::fs::read_dir(training_data_dir)
            .await
            .map_err(|e| TrainerError::InvalidResponse(e.to_string()))?;
        while let Ok(Some(entry)) = entries.next_entry().await {
            classes.push(entry.file_name().to_string_lossy().into_owned());
        }
        classes.sort();
        tokio::fs::write(model_dir.join("model.json"), b"{}")
            .await
            .map_err(|e| TrainerError::InvalidResponse(e.to_string()))?;
        Ok(TrainingOutcome { classes })
    }

    async fn verify(
        &self,
        _model_dir: &Path,
        _verify_data_dir: &Path,
    ) -> Result<VerificationReport, TrainerError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        Ok(VerificationReport {
            classes: vec!["cats".into()],
            images: Vec::new(),
            exec_time_ms: Some(1.0),
        })
    }
}

/// Everything a test needs to drive the app. The temp dirs live as long as
/// this does.
pub struct TestContext {
    pub state: AppState,
    pub trainer: Arc<CountingTrainer>,
    pub uploads: TempDir,
    pub frontend: TempDir,
}

pub async fn create_test_context() -> TestContext {
    create_test_context_with(|_| {}).await
}

/// Like `create_test_context`, with a chance to adjust the config first.
pub async fn create_test_context_with(adjust: impl FnOnce(&mut AppConfig)) -> TestContext {
    let uploads = TempDir::new().unwrap();
    let frontend = TempDir::new().unwrap();
    std::fs::write(frontend.path().join("index.html"), "<html></html>").unwrap();

    let mut config = AppConfig::default();
    config.session.secret = "integration-test-secret-value".into();
    config.storage.uploads_dir = uploads.path().to_path_buf();
    config.server.frontend_dir = frontend.path().to_path_buf();
    adjust(&mut config);

    let pool = db::connect_in_memory().await.unwrap();
    let trainer = Arc::new(CountingTrainer::default());
    let state = AppState::new(&config, pool, trainer.clone());

    TestContext {
        state,
        trainer,
        uploads,
        frontend,
    }
}

pub fn register_request(username: &str, password: &str) -> TestRequest {
    TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "username": username, "password": password }))
}

pub fn login_request(username: &str, password: &str) -> TestRequest {
    TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": username, "password": password }))
}

/// The session cookie set by a login response.
pub fn session_cookie<B>(resp: &ServiceResponse<B>) -> Cookie<'static> {
    resp.response()
        .cookies()
        .find(|c| c.name() == "classing_session")
        .map(|c| c.into_owned())
        .expect("login sets the session cookie")
}

pub fn project_uri(project: &str) -> String {
    format!("/api/image-classing/projects/{}", project)
}

pub fn label_uri(project: &str, data_type: &str, label: &str) -> String {
    format!(
        "/api/image-classing/projects/{}/{}/labels/{}",
        project, data_type, label
    )
}

/// Builds a multipart body carrying each `(file_name, bytes)` in the
/// `images` field.
pub fn multipart_upload(uri: &str, cookie: Cookie<'static>, files: &[(&str, &[u8])]) -> TestRequest {
    let mut body = Vec::new();
    for (name, bytes) in files {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"images\"; filename=\"{}\"\r\n",
                name
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    TestRequest::post()
        .uri(uri)
        .cookie(cookie)
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(body)
}

pub fn small_png() -> Vec<u8> {
    encode_png(RgbImage::from_pixel(8, 8, Rgb([200, 30, 30])))
}

/// Random noise compresses badly, so this comfortably exceeds the 500 KiB
/// threshold.
pub fn noisy_png(side: u32) -> Vec<u8> {
    let mut rng = rand::rng();
    let img = RgbImage::from_fn(side, side, |_, _| Rgb([rng.random(), rng.random(), rng.random()]));
    encode_png(img)
}

fn encode_png(img: RgbImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}
