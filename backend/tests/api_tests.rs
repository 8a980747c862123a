mod common;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use actix_web::App;
use common::*;
use image_classing::jobs::JobKey;
use serde_json::{Value, json};
use std::time::Duration;

macro_rules! sign_in {
    ($app:expr, $username:expr) => {{
        let resp = test::call_service(&$app, register_request($username, PASSWORD).to_request()).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let resp = test::call_service(&$app, login_request($username, PASSWORD).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        session_cookie(&resp)
    }};
}

macro_rules! create_project {
    ($app:expr, $cookie:expr, $name:expr) => {{
        let req = TestRequest::post()
            .uri("/api/image-classing/projects")
            .cookie($cookie.clone())
            .set_json(json!({ "projectName": $name }))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }};
}

macro_rules! add_label {
    ($app:expr, $cookie:expr, $project:expr, $data_type:expr, $label:expr) => {{
        let req = TestRequest::post()
            .uri(&format!("{}/{}/labels", project_uri($project), $data_type))
            .cookie($cookie.clone())
            .set_json(json!({ "labelName": $label }))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }};
}

macro_rules! upload {
    ($app:expr, $cookie:expr, $project:expr, $label:expr, $files:expr) => {{
        let uri = format!("{}/upload", label_uri($project, "training-data", $label));
        let resp = test::call_service(&$app, multipart_upload(&uri, $cookie.clone(), $files).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        body["images"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect::<Vec<String>>()
    }};
}

#[actix_web::test]
async fn register_login_and_duplicate_registration() {
    let ctx = create_test_context().await;
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;

    let _cookie = sign_in!(app, "alice");
    assert!(ctx.uploads.path().join("alice").join("image-classing").is_dir());

    let resp = test::call_service(&app, register_request("alice", "another").to_request()).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "username already exists");
}

#[actix_web::test]
async fn login_failures_look_the_same() {
    let ctx = create_test_context().await;
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;
    let _cookie = sign_in!(app, "alice");

    let wrong_password = test::call_service(&app, login_request("alice", "nope").to_request()).await;
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    let wrong_password: Value = test::read_body_json(wrong_password).await;

    let unknown_user = test::call_service(&app, login_request("mallory", "nope").to_request()).await;
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    let unknown_user: Value = test::read_body_json(unknown_user).await;

    assert_eq!(wrong_password, unknown_user);
}

#[actix_web::test]
async fn profile_reports_the_session_user() {
    let ctx = create_test_context().await;
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;

    let anonymous: Value = test::call_and_read_body_json(
        &app,
        TestRequest::get().uri("/api/auth/profile").to_request(),
    )
    .await;
    assert_eq!(anonymous["success"], false);

    let cookie = sign_in!(app, "alice");
    let profile: Value = test::call_and_read_body_json(
        &app,
        TestRequest::get()
            .uri("/api/auth/profile")
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(profile["success"], true);
    assert_eq!(profile["user"]["username"], "alice");
}

#[actix_web::test]
async fn protected_routes_need_a_session() {
    let ctx = create_test_context().await;
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;

    let resp = test::call_service(
        &app,
        TestRequest::get()
            .uri("/api/image-classing/projects")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = test::call_service(
        &app,
        TestRequest::get()
            .uri("/uploads/alice/image-classing/pets/model/model.json")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn project_lifecycle() {
    let ctx = create_test_context().await;
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;
    let cookie = sign_in!(app, "alice");

    create_project!(app, cookie, "pets");
    let project_dir = ctx.uploads.path().join("alice/image-classing/pets");
    assert!(project_dir.join("training-data").is_dir());
    assert!(project_dir.join("verify-data").is_dir());

    let dup = TestRequest::post()
        .uri("/api/image-classing/projects")
        .cookie(cookie.clone())
        .set_json(json!({ "projectName": "pets" }))
        .to_request();
    assert_eq!(test::call_service(&app, dup).await.status(), StatusCode::CONFLICT);

    let list: Value = test::call_and_read_body_json(
        &app,
        TestRequest::get()
            .uri("/api/image-classing/projects")
            .cookie(cookie.clone())
            .to_request(),
    )
    .await;
    assert_eq!(list["projects"], json!(["pets"]));

    let details: Value = test::call_and_read_body_json(
        &app,
        TestRequest::get()
            .uri(&project_uri("pets"))
            .cookie(cookie.clone())
            .to_request(),
    )
    .await;
    assert_eq!(details["project"]["id"], "pets");
    assert_eq!(details["project"]["trained"], false);

    let resp = test::call_service(
        &app,
        TestRequest::delete()
            .uri(&project_uri("pets"))
            .cookie(cookie.clone())
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(!project_dir.exists());

    let resp = test::call_service(
        &app,
        TestRequest::get()
            .uri(&project_uri("pets"))
            .cookie(cookie.clone())
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn busy_projects_cannot_be_renamed_or_deleted() {
    let ctx = create_test_context().await;
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;
    let cookie = sign_in!(app, "alice");
    create_project!(app, cookie, "pets");

    let user = ctx
        .state
        .users
        .get_user_by_username("alice")
        .await
        .unwrap()
        .unwrap();
    let training = JobKey::training(user.id, "pets");
    ctx.state.jobs.board().start(&training).unwrap();

    let rename = TestRequest::put()
        .uri(&format!("{}/rename", project_uri("pets")))
        .cookie(cookie.clone())
        .set_json(json!({ "newProjectName": "animals" }))
        .to_request();
    assert_eq!(test::call_service(&app, rename).await.status(), StatusCode::CONFLICT);
    let delete = TestRequest::delete()
        .uri(&project_uri("pets"))
        .cookie(cookie.clone())
        .to_request();
    assert_eq!(test::call_service(&app, delete).await.status(), StatusCode::CONFLICT);
    assert!(ctx.uploads.path().join("alice/image-classing/pets").is_dir());

    ctx.state.jobs.board().complete(&training);
    let delete = TestRequest::delete()
        .uri(&project_uri("pets"))
        .cookie(cookie.clone())
        .to_request();
    assert_eq!(test::call_service(&app, delete).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn unknown_data_type_is_not_found() {
    let ctx = create_test_context().await;
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;
    let cookie = sign_in!(app, "alice");
    create_project!(app, cookie, "pets");

    let resp = test::call_service(
        &app,
        TestRequest::get()
            .uri(&format!("{}/test-data/labels", project_uri("pets")))
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn renaming_a_label_keeps_its_images() {
    let ctx = create_test_context().await;
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;
    let cookie = sign_in!(app, "alice");
    create_project!(app, cookie, "pets");
    add_label!(app, cookie, "pets", "training-data", "cats");

    let png = small_png();
    let stored = upload!(app, cookie, "pets", "cats", &[("tabby.png", png.as_slice())]);
    assert_eq!(stored.len(), 1);

    let resp = test::call_service(
        &app,
        TestRequest::put()
            .uri(&format!("{}/rename", label_uri("pets", "training-data", "cats")))
            .cookie(cookie.clone())
            .set_json(json!({ "newLabelName": "felines" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let labels: Value = test::call_and_read_body_json(
        &app,
        TestRequest::get()
            .uri(&format!("{}/training-data/labels", project_uri("pets")))
            .cookie(cookie.clone())
            .to_request(),
    )
    .await;
    assert_eq!(labels["labels"], json!(["felines"]));

    let images: Value = test::call_and_read_body_json(
        &app,
        TestRequest::get()
            .uri(&format!("{}/images", label_uri("pets", "training-data", "felines")))
            .cookie(cookie.clone())
            .to_request(),
    )
    .await;
    assert_eq!(images["images"], json!(stored));
}

#[actix_web::test]
async fn large_uploads_are_compressed_and_small_ones_kept() {
    let ctx = create_test_context().await;
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;
    let cookie = sign_in!(app, "alice");
    create_project!(app, cookie, "pets");
    add_label!(app, cookie, "pets", "training-data", "cats");

    let large = noisy_png(600);
    assert!(large.len() > 500 * 1024);
    let small = small_png();

    let stored = upload!(
        app,
        cookie,
        "pets",
        "cats",
        &[("big.png", large.as_slice()), ("small.png", small.as_slice())]
    );
    assert_eq!(stored.len(), 2);

    let label_dir = ctx.uploads.path().join("alice/image-classing/pets/training-data/cats");
    let mut sizes = Vec::new();
    for name in &stored {
        assert!(name.ends_with(".png"));
        let bytes = std::fs::read(label_dir.join(name)).unwrap();
        assert!(bytes.len() <= 500 * 1024);
        sizes.push(bytes);
    }
    assert!(sizes.iter().any(|bytes| *bytes == small));
}

#[actix_web::test]
async fn uploads_reject_unsupported_files() {
    let ctx = create_test_context().await;
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;
    let cookie = sign_in!(app, "alice");
    create_project!(app, cookie, "pets");
    add_label!(app, cookie, "pets", "training-data", "cats");

    let png = small_png();
    let uri = format!("{}/upload", label_uri("pets", "training-data", "cats"));
    let req = multipart_upload(
        &uri,
        cookie.clone(),
        &[("ok.png", png.as_slice()), ("notes.txt", b"hello".as_slice())],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let label_dir = ctx.uploads.path().join("alice/image-classing/pets/training-data/cats");
    assert_eq!(std::fs::read_dir(label_dir).unwrap().count(), 0);
}

#[actix_web::test]
async fn oversized_files_are_refused_without_leftovers() {
    let ctx = create_test_context_with(|config| config.storage.max_upload_bytes = 1024).await;
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;
    let cookie = sign_in!(app, "alice");
    create_project!(app, cookie, "pets");
    add_label!(app, cookie, "pets", "training-data", "cats");

    let small = small_png();
    let large = noisy_png(64);
    assert!(small.len() < 1024 && large.len() > 1024);

    let uri = format!("{}/upload", label_uri("pets", "training-data", "cats"));
    let req = multipart_upload(
        &uri,
        cookie.clone(),
        &[("small.png", small.as_slice()), ("large.png", large.as_slice())],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let label_dir = ctx.uploads.path().join("alice/image-classing/pets/training-data/cats");
    assert_eq!(std::fs::read_dir(&label_dir).unwrap().count(), 0);

    let stored = upload!(app, cookie, "pets", "cats", &[("small.png", small.as_slice())]);
    assert_eq!(stored.len(), 1);
    assert_eq!(std::fs::read_dir(&label_dir).unwrap().count(), 1);
}

#[actix_web::test]
async fn moving_images_creates_the_target_label() {
    let ctx = create_test_context().await;
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;
    let cookie = sign_in!(app, "alice");
    create_project!(app, cookie, "pets");
    add_label!(app, cookie, "pets", "training-data", "cats");

    let png = small_png();
    let stored = upload!(app, cookie, "pets", "cats", &[("a.png", png.as_slice())]);
    let name = stored[0].clone();

    let resp = test::call_service(
        &app,
        TestRequest::post()
            .uri(&format!("{}/move-images", label_uri("pets", "training-data", "cats")))
            .cookie(cookie.clone())
            .set_json(json!({ "targetLabel": "dogs", "images": [name] }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let training = ctx.uploads.path().join("alice/image-classing/pets/training-data");
    assert!(!training.join("cats").join(&name).exists());
    assert_eq!(std::fs::read(training.join("dogs").join(&name)).unwrap(), png);
}

#[actix_web::test]
async fn training_requires_a_push_connection() {
    let ctx = create_test_context().await;
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;
    let cookie = sign_in!(app, "alice");
    create_project!(app, cookie, "pets");

    let resp = test::call_service(
        &app,
        TestRequest::post()
            .uri(&format!("{}/train", project_uri("pets")))
            .cookie(cookie.clone())
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["message"].as_str().unwrap().contains("not connected"));
    assert_eq!(ctx.trainer.train_calls(), 0);
}

#[actix_web::test]
async fn verification_before_training_is_not_found() {
    let ctx = create_test_context().await;
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;
    let cookie = sign_in!(app, "alice");
    create_project!(app, cookie, "pets");
    add_label!(app, cookie, "pets", "verify-data", "batch");

    let resp = test::call_service(
        &app,
        TestRequest::post()
            .uri(&format!("{}/verify", label_uri("pets", "verify-data", "batch")))
            .cookie(cookie.clone())
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["message"].as_str().unwrap().contains("model not found"));
    assert_eq!(ctx.trainer.verify_calls(), 0);
}

#[actix_web::test]
async fn training_with_a_connected_session_completes() {
    let ctx = create_test_context().await;
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;
    let cookie = sign_in!(app, "alice");
    create_project!(app, cookie, "pets");
    add_label!(app, cookie, "pets", "training-data", "cats");

    let events = test::call_service(
        &app,
        TestRequest::get()
            .uri("/api/events")
            .cookie(cookie.clone())
            .to_request(),
    )
    .await;
    assert_eq!(events.status(), StatusCode::OK);

    let resp = test::call_service(
        &app,
        TestRequest::post()
            .uri(&format!("{}/train", project_uri("pets")))
            .cookie(cookie.clone())
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let mut info = Value::Null;
    for _ in 0..50 {
        info = test::call_and_read_body_json(
            &app,
            TestRequest::get()
                .uri(&format!("{}/model-info", project_uri("pets")))
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        if info["modelInfo"]["trainingStatus"] == "completed" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(info["modelInfo"]["trainingStatus"], "completed");
    assert_eq!(info["modelInfo"]["trained"], true);
    assert_eq!(info["modelInfo"]["classes"], json!(["cats"]));
    assert_eq!(ctx.trainer.train_calls(), 1);

    drop(events);
}

#[actix_web::test]
async fn uploads_are_private_to_their_owner() {
    let ctx = create_test_context().await;
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;
    let alice = sign_in!(app, "alice");
    let bob = sign_in!(app, "bob");
    create_project!(app, alice, "pets");
    add_label!(app, alice, "pets", "training-data", "cats");

    let png = small_png();
    let stored = upload!(app, alice, "pets", "cats", &[("a.png", png.as_slice())]);
    let uri = format!(
        "/uploads/alice/image-classing/pets/training-data/cats/{}",
        stored[0]
    );

    let own = test::call_service(&app, TestRequest::get().uri(&uri).cookie(alice).to_request()).await;
    assert_eq!(own.status(), StatusCode::OK);
    assert_eq!(test::read_body(own).await.as_ref(), png.as_slice());

    let other = test::call_service(&app, TestRequest::get().uri(&uri).cookie(bob).to_request()).await;
    assert_eq!(other.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn uploads_never_serve_directories_or_missing_files() {
    let ctx = create_test_context().await;
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;
    let alice = sign_in!(app, "alice");
    create_project!(app, alice, "pets");
    add_label!(app, alice, "pets", "training-data", "cats");

    for uri in [
        "/uploads/alice/image-classing/pets/training-data/cats",
        "/uploads/alice/image-classing/pets/training-data/cats/ghost.png",
    ] {
        let resp = test::call_service(
            &app,
            TestRequest::get().uri(uri).cookie(alice.clone()).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[actix_web::test]
async fn logout_ends_the_session() {
    let ctx = create_test_context().await;
    let app = test::init_service(App::new().configure(|cfg| ctx.state.configure(cfg))).await;
    let cookie = sign_in!(app, "alice");

    let resp = test::call_service(
        &app,
        TestRequest::post()
            .uri("/api/auth/logout")
            .cookie(cookie.clone())
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(
        &app,
        TestRequest::get()
            .uri("/api/image-classing/projects")
            .cookie(cookie.clone())
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let again = test::call_service(
        &app,
        TestRequest::post()
            .uri("/api/auth/logout")
            .to_request(),
    )
    .await;
    assert_eq!(again.status(), StatusCode::OK);
}
