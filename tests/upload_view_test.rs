//! Integration tests for session media upload and listing.

mod common;

use axum::http::StatusCode;
use common::fixtures::jpeg;
use common::{assert_error, assert_ok, assert_status, MultipartBody, TestApp};
use pretty_assertions::assert_eq;
use serde_json::Value;

fn three_photos() -> MultipartBody {
    MultipartBody::new()
        .file("photo1", "cover.jpg", "image/jpeg", &jpeg(64, 48, 10))
        .file("photo2", "b.jpg", "image/jpeg", &jpeg(64, 48, 120))
        .file("photo3", "c.jpg", "image/jpeg", &jpeg(64, 48, 240))
}

#[tokio::test]
async fn test_upload_stores_photos_and_gif() {
    let app = TestApp::new().await;

    let response = app
        .post_multipart("/upload?sessionId=booth-1", three_photos(), &[])
        .await;

    assert_ok(&response);
    let json: Value = response.json();
    assert_eq!(json["success"], true);
    assert_eq!(json["sessionId"], "booth-1");
    assert_eq!(
        json["bucketUrl"],
        "https://firebasestorage.googleapis.com/v0/b/test-bucket"
    );
    assert_eq!(json["count"], 4);

    let files = json["files"].as_array().unwrap();
    let names: Vec<&str> = files
        .iter()
        .map(|f| f["uploadedName"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec!["booth-1-1.jpg", "booth-1-2.jpg", "booth-1-3.jpg", "booth-1-gif.gif"]
    );
    assert_eq!(files[0]["filename"], "cover.jpg");
    assert_eq!(files[0]["photoIndex"], "1");
    assert_eq!(files[3]["filename"], "generated.gif");
    assert_eq!(files[3]["photoIndex"], "gif");
    assert_eq!(
        files[1]["url"],
        "https://firebasestorage.googleapis.com/v0/b/test-bucket/o/booth-1-2.jpg?alt=media"
    );

    let gif = app.store.get("booth-1-gif.gif").await.unwrap();
    assert!(gif.starts_with(b"GIF89a"));
}

#[tokio::test]
async fn test_upload_session_from_form_field() {
    let app = TestApp::new().await;
    let form = MultipartBody::new()
        .file("photo1", "a.png", "image/png", &common::fixtures::gradient_png(8, 8))
        .text("sessionId", "form_session");

    let response = app.post_multipart("/upload", form, &[]).await;

    assert_ok(&response);
    assert_eq!(app.store.names().await, vec!["form_session-1.png"]);
}

#[tokio::test]
async fn test_query_session_takes_precedence() {
    let app = TestApp::new().await;
    let form = MultipartBody::new()
        .text("sessionId", "from-form")
        .file("photo1", "a.jpg", "image/jpeg", &jpeg(8, 8, 0));

    let response = app
        .post_multipart("/upload?sessionId=from-query", form, &[])
        .await;

    assert_ok(&response);
    assert_eq!(app.store.names().await, vec!["from-query-1.jpg"]);
}

#[tokio::test]
async fn test_video_and_gif_fields_are_not_gif_frames() {
    let app = TestApp::new().await;
    let form = MultipartBody::new()
        .file("photo1", "a.jpg", "image/jpeg", &jpeg(8, 8, 0))
        .file("video1", "clip.mp4", "video/mp4", b"\x00\x00\x00\x18ftypmp42")
        .file("gif", "anim.gif", "image/gif", b"GIF89a");

    let response = app
        .post_multipart("/upload?sessionId=mixed", form, &[])
        .await;

    assert_ok(&response);
    let json: Value = response.json();
    assert_eq!(json["count"], 3);
    let mut names = app.store.names().await;
    names.sort();
    assert_eq!(names, vec!["mixed-1.jpg", "mixed-1.mp4", "mixed-gif.gif"]);
}

#[tokio::test]
async fn test_upload_requires_session() {
    let app = TestApp::new().await;
    let form = MultipartBody::new().file("photo1", "a.jpg", "image/jpeg", &jpeg(8, 8, 0));

    let response = app.post_multipart("/upload", form, &[]).await;

    assert_error(
        &response,
        StatusCode::BAD_REQUEST,
        "sessionId is required. Send it as query parameter or in request body.",
    );
}

#[tokio::test]
async fn test_upload_rejects_invalid_session() {
    let app = TestApp::new().await;
    let form = MultipartBody::new().file("photo1", "a.jpg", "image/jpeg", &jpeg(8, 8, 0));

    let response = app
        .post_multipart("/upload?sessionId=bad%20id", form, &[])
        .await;

    assert_status(&response, StatusCode::BAD_REQUEST);
    let json: Value = response.json();
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("Invalid sessionId format."));
    assert!(app.store.names().await.is_empty());
}

#[tokio::test]
async fn test_upload_without_files() {
    let app = TestApp::new().await;
    let form = MultipartBody::new().text("note", "nothing here");

    let response = app
        .post_multipart("/upload?sessionId=empty", form, &[])
        .await;

    assert_error(&response, StatusCode::BAD_REQUEST, "No files uploaded.");
}

#[tokio::test]
async fn test_upload_rejects_disallowed_type() {
    let app = TestApp::new().await;
    let form = MultipartBody::new()
        .file("photo1", "a.jpg", "image/jpeg", &jpeg(8, 8, 0))
        .file("doc", "notes.txt", "text/plain", b"hello");

    let response = app.post_multipart("/upload?sessionId=s1", form, &[]).await;

    assert_error(
        &response,
        StatusCode::BAD_REQUEST,
        "Invalid file type: notes.txt. Allowed types: .jpg, .jpeg, .png, .gif, .webp, .mp4",
    );
    assert!(app.store.names().await.is_empty());
}

#[tokio::test]
async fn test_upload_rejects_mismatched_extension() {
    let app = TestApp::new().await;
    let form = MultipartBody::new().file("photo1", "a.exe", "image/jpeg", &jpeg(8, 8, 0));

    let response = app.post_multipart("/upload?sessionId=s1", form, &[]).await;

    assert_status(&response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_rejects_too_many_files() {
    let app = TestApp::new().await;
    let photo = jpeg(4, 4, 0);
    let form = (1..=11).fold(MultipartBody::new(), |form, i| {
        form.file(&format!("photo{i}"), &format!("{i}.jpg"), "image/jpeg", &photo)
    });

    let response = app.post_multipart("/upload?sessionId=s1", form, &[]).await;

    assert_error(
        &response,
        StatusCode::BAD_REQUEST,
        "Too many files. Maximum is 10 files per request.",
    );
}

#[tokio::test]
async fn test_upload_rejects_oversized_file() {
    let app = TestApp::new().await;
    let big = vec![0u8; 10 * 1024 * 1024 + 1];
    let form = MultipartBody::new().file("photo1", "big.jpg", "image/jpeg", &big);

    let response = app.post_multipart("/upload?sessionId=s1", form, &[]).await;

    assert_error(
        &response,
        StatusCode::BAD_REQUEST,
        "File big.jpg exceeds maximum size of 10MB.",
    );
}

#[tokio::test]
async fn test_view_lists_session_in_display_order() {
    let app = TestApp::new().await;
    app.post_multipart("/upload?sessionId=booth-2", three_photos(), &[])
        .await;
    // A different session sharing the prefix must not leak in
    let other = MultipartBody::new().file("photo1", "x.jpg", "image/jpeg", &jpeg(8, 8, 0));
    app.post_multipart("/upload?sessionId=booth-20", other, &[])
        .await;

    let response = app.get("/view?sessionId=booth-2").await;

    assert_ok(&response);
    let json: Value = response.json();
    assert_eq!(json["success"], true);
    assert_eq!(json["count"], 4);
    let indexes: Vec<&str> = json["files"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["photoIndex"].as_str().unwrap())
        .collect();
    assert_eq!(indexes, vec!["1", "2", "3", "gif"]);
    assert_eq!(json["files"][3]["contentType"], "image/gif");
    assert!(json["files"][0]["size"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_view_unknown_session_is_not_found() {
    let app = TestApp::new().await;

    let response = app.get("/view?sessionId=nobody").await;

    assert_status(&response, StatusCode::NOT_FOUND);
    let json: Value = response.json();
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "No files found for this sessionId");
    assert_eq!(json["sessionId"], "nobody");
    assert_eq!(json["files"], serde_json::json!([]));
}

#[tokio::test]
async fn test_view_requires_session() {
    let app = TestApp::new().await;

    let response = app.get("/view").await;

    assert_error(
        &response,
        StatusCode::BAD_REQUEST,
        "sessionId is required as query parameter.",
    );
}
